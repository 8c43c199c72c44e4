//! Storage infrastructure: configuration file persistence.

pub mod config;

pub use config::{
    config_file_path, load_config, save_config, ClientConfig, ConfigError, CONFIG_PATH_ENV,
};
