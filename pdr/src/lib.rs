#![forbid(unsafe_code)]

pub mod cases;
pub mod config;
pub mod model;
pub mod report;

pub use cases::{library, Case, CaseOutcome, Expected};
pub use config::{find_config, load_options, ConfigError};
pub use model::{ModelError, ModelFile, Term};
pub use report::Report;
