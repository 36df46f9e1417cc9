use std::io::{self, Write};
use std::panic;

use color_eyre::eyre::Result;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "tabula=info";

pub fn install_hooks() -> Result<()> {
    let hook_builder = color_eyre::config::HookBuilder::default().display_env_section(false);
    let (panic_hook, eyre_hook) = hook_builder.into_hooks();
    eyre_hook.install()?;

    panic::set_hook(Box::new(move |panic_info| {
        let _ = writeln!(io::stderr(), "{}", panic_hook.panic_report(panic_info));
    }));

    Ok(())
}

/// Logs go to stderr so stdout stays clean for table output.
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| color_eyre::eyre::eyre!(e))?;
    Ok(())
}
