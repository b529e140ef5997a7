//! Configuration module for the Herald runtime.
//!
//! Layered loading (defaults, files, environment, overrides) and validation
//! of logging and dispatch settings.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, load_config, load_config_from_file, profile_from_env};
pub use schema::{
    DispatchConfig, HeraldConfig, LogFormat, LogOutput, LoggingConfig, SpanEventConfig,
};
pub use validation::validate_config;
