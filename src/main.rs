use std::io::{self, Write};
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::Result;
use tokio::sync::mpsc;
use tracing::info;

use tabula::app::action::Action;
use tabula::app::effect_runner::EffectRunner;
use tabula::app::session::SessionContext;
use tabula::app::state::AppState;
use tabula::cli::{Args, Driver};
use tabula::error;
use tabula::infra::adapters::PostgresGateway;
use tabula::infra::config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    error::install_hooks()?;
    error::init_tracing()?;

    let args = Args::parse();
    let config_path = match args.config {
        Some(path) => path,
        None => AppConfig::default_path()?,
    };
    let config = AppConfig::load(&config_path)?;
    let settings = config.session_settings();

    let gateway = PostgresGateway::new(args.dsn.clone())
        .with_psql_path(config.gateway.psql_path.clone())
        .with_timeout_secs(config.gateway.timeout_secs);
    let database_name = PostgresGateway::extract_database_name(gateway.dsn());
    info!(database = %database_name, "session opened");

    let (action_tx, action_rx) = mpsc::unbounded_channel::<Action>();
    let state = AppState::new(settings.page_size);
    let session = Arc::new(SessionContext::new(Arc::new(gateway), action_tx, settings));
    let mut driver = Driver::new(state, EffectRunner::new(session), action_rx);

    driver
        .send(Action::SessionOpened {
            database_name,
            auto_select: false,
        })
        .await?;
    let text = driver
        .execute(args.command, &config.tables.default_base_name)
        .await?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", text)?;
    Ok(())
}
