pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, LogFormat};

pub use adapters::webdriver::{DriverService, SessionOptions, WebDriverClient};
pub use app::pipelines::FormPipeline;
pub use adapters::storage::LocalStorage;
pub use config::toml_config::TomlConfig;
pub use core::engine::AutomationEngine;
pub use utils::error::{BotError, Result};
