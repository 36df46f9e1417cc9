pub use tabula_app as app;
pub use tabula_domain as domain;
pub use tabula_infra as infra;

pub mod cli;
pub mod error;
pub mod output;
