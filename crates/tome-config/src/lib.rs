//! Configuration system for Tome.
//!
//! Provides TOML-based configuration with:
//! - Optional sections for every pipeline stage and both services
//! - Config file layering (user config dir + project-local `tome.toml`)
//! - Validation of the complexity tier table and other ranges

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, config_dir, load_config, load_config_file, log_dir, save_config,
    user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
