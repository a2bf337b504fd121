//! Configuration file support.
//!
//! `~/.planetile/config.ini` overlays the built-in defaults. Missing keys keep
//! their defaults; present keys are validated before anything is started.

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    CacheSettings, ConfigFile, LoggingSettings, OriginSettings, PrefetchSettings, RedisSettings,
};
