//! Process-level runtime support shared by the academy binaries:
//! layered configuration, home directory resolution and logging.

pub mod config;
pub mod logging;
pub mod paths;

pub use config::{
    default_logging_config, AppConfig, AppConfigProvider, CliArgs, ConfigProvider,
    DatabaseConfig, LoggingConfig, Section, ServerConfig,
};
