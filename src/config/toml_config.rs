use crate::domain::model::{ColumnNames, Locator, LocatorKind};
use crate::domain::ports::{ConfigProvider, FormLayout, StatusRules};
use crate::utils::error::{BotError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 完整設定；每個區段都有預設值，空檔案即等同原始的寫死設定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub input: InputConfig,
    pub page: PageConfig,
    pub output: OutputConfig,
    pub browser: BrowserConfig,
    pub form: FormConfig,
    pub status: StatusConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub path: String,
    pub columns: ColumnNames,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: "Base de Dados/Processos.xlsx".to_string(),
            columns: ColumnNames::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// Local HTML file or http(s)/file URL.
    pub path: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            path: "Paginas HTML/index.html".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: String,
    pub file_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "Arquivos Gerados".to_string(),
            file_name: "Processos Finalizados.xlsx".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Use an already running WebDriver server instead of spawning one.
    pub webdriver_url: Option<String>,
    pub driver_path: String,
    pub port: u16,
    pub browser_name: String,
    pub headless: bool,
    pub startup_timeout_secs: u64,
    pub args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: None,
            driver_path: "chromedriver".to_string(),
            port: 9515,
            browser_name: "chrome".to_string(),
            headless: false,
            startup_timeout_secs: 30,
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    pub menu_button: Locator,
    pub menu_wait_ms: u64,
    /// How the city entry of the dropdown menu is located; the value is the row's city.
    pub city_link: LocatorKind,
    pub name_field: Locator,
    pub name_wait_ms: u64,
    pub lawyer_field: Locator,
    pub process_number_field: Locator,
    pub submit_button: Locator,
    pub default_wait_ms: u64,
    pub dialog_poll_ms: u64,
    /// Unset means wait for the result dialog forever.
    pub result_timeout_secs: Option<u64>,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            menu_button: Locator::tag_name("button"),
            menu_wait_ms: 40_000,
            city_link: LocatorKind::PartialLinkText,
            name_field: Locator::id("nome"),
            name_wait_ms: 3_000,
            lawyer_field: Locator::id("advogado"),
            process_number_field: Locator::id("numero"),
            submit_button: Locator::class_name("registerbtn"),
            default_wait_ms: 10_000,
            dialog_poll_ms: 1_000,
            result_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub success_marker: String,
    pub found_label: String,
    pub not_found_label: String,
}

impl Default for StatusConfig {
    fn default() -> Self {
        let rules = StatusRules::default();
        Self {
            success_marker: rules.success_marker,
            found_label: rules.found_label,
            not_found_label: rules.not_found_label,
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BotError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| BotError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${WEBDRIVER_URL})；未定義的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| BotError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("input.path", &self.input.path)?;
        validation::validate_spreadsheet_path(&self.input.path)?;
        validation::validate_path("page.path", &self.page.path)?;
        validation::validate_path("output.directory", &self.output.directory)?;
        validation::validate_path("output.file_name", &self.output.file_name)?;
        validation::validate_spreadsheet_path(&self.output.file_name)?;

        if let Some(url) = &self.browser.webdriver_url {
            validation::validate_webdriver_url("browser.webdriver_url", url)?;
        } else {
            // 沒有外部 WebDriver 時必須能自行啟動 driver
            if self.browser.driver_path.trim().is_empty() {
                return Err(BotError::MissingConfigError {
                    field: "browser.driver_path (or browser.webdriver_url)".to_string(),
                });
            }
            validation::validate_positive_number("browser.port", u64::from(self.browser.port), 1)?;
        }
        validation::validate_non_empty_string("browser.browser_name", &self.browser.browser_name)?;
        validation::validate_positive_number(
            "browser.startup_timeout_secs",
            self.browser.startup_timeout_secs,
            1,
        )?;

        validation::validate_positive_number("form.dialog_poll_ms", self.form.dialog_poll_ms, 1)?;
        if let Some(timeout) = self.form.result_timeout_secs {
            validation::validate_positive_number("form.result_timeout_secs", timeout, 1)?;
        }
        for (field, locator) in [
            ("form.menu_button", &self.form.menu_button),
            ("form.name_field", &self.form.name_field),
            ("form.lawyer_field", &self.form.lawyer_field),
            ("form.process_number_field", &self.form.process_number_field),
            ("form.submit_button", &self.form.submit_button),
        ] {
            validation::validate_non_empty_string(field, &locator.value)?;
        }

        validation::validate_non_empty_string("status.success_marker", &self.status.success_marker)?;
        if self.status.found_label == self.status.not_found_label {
            return Err(BotError::InvalidConfigValueError {
                field: "status.not_found_label".to_string(),
                value: self.status.not_found_label.clone(),
                reason: "Must differ from status.found_label".to_string(),
            });
        }

        let columns = &self.input.columns;
        for (field, value) in [
            ("input.columns.name", &columns.name),
            ("input.columns.lawyer", &columns.lawyer),
            ("input.columns.process_number", &columns.process_number),
            ("input.columns.city", &columns.city),
            ("input.columns.status", &columns.status),
        ] {
            validation::validate_non_empty_string(field, value)?;
        }

        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &str {
        &self.input.path
    }

    fn page(&self) -> &str {
        &self.page.path
    }

    fn output_dir(&self) -> &str {
        &self.output.directory
    }

    fn output_file_name(&self) -> &str {
        &self.output.file_name
    }

    fn columns(&self) -> &ColumnNames {
        &self.input.columns
    }

    fn form_layout(&self) -> FormLayout {
        let form = &self.form;
        FormLayout {
            menu_button: form.menu_button.clone(),
            menu_wait: Duration::from_millis(form.menu_wait_ms),
            city_link: form.city_link,
            name_field: form.name_field.clone(),
            name_wait: Duration::from_millis(form.name_wait_ms),
            lawyer_field: form.lawyer_field.clone(),
            process_number_field: form.process_number_field.clone(),
            submit_button: form.submit_button.clone(),
            default_wait: Duration::from_millis(form.default_wait_ms),
            dialog_poll: Duration::from_millis(form.dialog_poll_ms),
            result_timeout: form.result_timeout_secs.map(Duration::from_secs),
        }
    }

    fn status_rules(&self) -> StatusRules {
        StatusRules {
            success_marker: self.status.success_marker.clone(),
            found_label: self.status.found_label.clone(),
            not_found_label: self.status.not_found_label.clone(),
        }
    }
}
