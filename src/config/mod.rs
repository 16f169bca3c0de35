pub mod toml_config;

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use clap::{Parser, ValueEnum};
#[cfg(feature = "cli")]
use toml_config::TomlConfig;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "sheet-form-bot")]
#[command(about = "Fills a web form for every row of a spreadsheet and records the result")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Input spreadsheet (.xlsx)
    #[arg(long)]
    pub input: Option<String>,

    /// HTML page with the form (file path or URL)
    #[arg(long)]
    pub page: Option<String>,

    /// Directory for the generated spreadsheet
    #[arg(long)]
    pub output_dir: Option<String>,

    /// File name of the generated spreadsheet
    #[arg(long)]
    pub output_file: Option<String>,

    /// Connect to a running WebDriver server instead of starting chromedriver
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// chromedriver executable
    #[arg(long)]
    pub driver_path: Option<String>,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,

    /// Read the spreadsheet and list the rows without opening a browser
    #[arg(long)]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 載入設定檔（若有），再套用命令列覆蓋
    pub fn resolve(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut TomlConfig) {
        if let Some(input) = &self.input {
            config.input.path = input.clone();
        }
        if let Some(page) = &self.page {
            config.page.path = page.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output.directory = dir.clone();
        }
        if let Some(file) = &self.output_file {
            config.output.file_name = file.clone();
        }
        if let Some(url) = &self.webdriver_url {
            config.browser.webdriver_url = Some(url.clone());
        }
        if let Some(driver) = &self.driver_path {
            config.browser.driver_path = driver.clone();
        }
        if self.headless {
            config.browser.headless = true;
        }
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_no_flags_keeps_defaults() {
        let cli = CliConfig::parse_from(["sheet-form-bot"]);
        let config = cli.resolve().unwrap();

        assert_eq!(config, TomlConfig::default());
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn test_flags_override_config() {
        let cli = CliConfig::parse_from([
            "sheet-form-bot",
            "--input",
            "lote.xlsx",
            "--output-dir",
            "saida",
            "--webdriver-url",
            "http://localhost:4444",
            "--headless",
            "--log-format",
            "json",
        ]);
        let config = cli.resolve().unwrap();

        assert_eq!(config.input.path, "lote.xlsx");
        assert_eq!(config.output.directory, "saida");
        assert_eq!(
            config.browser.webdriver_url.as_deref(),
            Some("http://localhost:4444")
        );
        assert!(config.browser.headless);
        assert_eq!(cli.log_format, LogFormat::Json);
    }
}
