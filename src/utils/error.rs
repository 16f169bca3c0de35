use std::fmt;
use thiserror::Error;

/// 自動化流程中的各個步驟，用於錯誤訊息與日誌
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormStep {
    OpenPage,
    OpenMenu,
    SelectCity,
    FillFields,
    Submit,
    AwaitResult,
    UpdateStatus,
    CloseTab,
}

impl fmt::Display for FormStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FormStep::OpenPage => "opening the form page",
            FormStep::OpenMenu => "clicking the dropdown button",
            FormStep::SelectCity => "selecting the city in the dropdown menu",
            FormStep::FillFields => "filling the form fields",
            FormStep::Submit => "clicking the register button",
            FormStep::AwaitResult => "waiting for the result dialog",
            FormStep::UpdateStatus => "updating the row status",
            FormStep::CloseTab => "closing the tab",
        };
        f.write_str(text)
    }
}

#[derive(Error, Debug)]
pub enum BotError {
    #[error("WebDriver request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("File not allowed: {path} (only .xlsx spreadsheets are accepted)")]
    UnsupportedFile { path: String },

    #[error("Spreadsheet error: {message}")]
    SpreadsheetError { message: String },

    #[error("Required column '{column}' not found in spreadsheet header")]
    MissingColumn { column: String },

    #[error("WebDriver error '{error}': {message}")]
    WebDriverError { error: String, message: String },

    #[error("Element {locator} not found after {waited_ms}ms")]
    ElementNotFound { locator: String, waited_ms: u64 },

    #[error("No result dialog appeared within {waited_secs}s")]
    DialogTimeout { waited_secs: u64 },

    #[error("Failed to start browser driver: {message}")]
    DriverLaunchError { message: String },

    #[error("Error while {step}. Details: {source}")]
    StepFailed {
        step: FormStep,
        #[source]
        source: Box<BotError>,
    },

    #[error("Row count changed during processing: expected {expected}, got {actual}")]
    RowCountMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Browser,
    Output,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl BotError {
    /// 包裝某個步驟的錯誤，保留原始錯誤作為 source
    pub fn step(step: FormStep, source: BotError) -> Self {
        BotError::StepFailed {
            step,
            source: Box::new(source),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            BotError::ConfigError { .. }
            | BotError::ConfigValidationError { .. }
            | BotError::InvalidConfigValueError { .. }
            | BotError::MissingConfigError { .. } => ErrorCategory::Configuration,
            BotError::UnsupportedFile { .. }
            | BotError::SpreadsheetError { .. }
            | BotError::MissingColumn { .. } => ErrorCategory::Input,
            BotError::HttpError(_)
            | BotError::WebDriverError { .. }
            | BotError::ElementNotFound { .. }
            | BotError::DialogTimeout { .. }
            | BotError::DriverLaunchError { .. } => ErrorCategory::Browser,
            BotError::StepFailed { source, .. } => source.category(),
            BotError::RowCountMismatch { .. } => ErrorCategory::Output,
            BotError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BotError::ElementNotFound { .. } | BotError::DialogTimeout { .. } => {
                ErrorSeverity::Medium
            }
            BotError::StepFailed { source, .. } => source.severity(),
            BotError::DriverLaunchError { .. } | BotError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            BotError::ConfigError { .. }
            | BotError::ConfigValidationError { .. }
            | BotError::InvalidConfigValueError { .. }
            | BotError::MissingConfigError { .. } => {
                "Check the TOML configuration file and command line flags".to_string()
            }
            BotError::UnsupportedFile { .. } => {
                "Convert the input data to an .xlsx spreadsheet".to_string()
            }
            BotError::SpreadsheetError { .. } => {
                "Make sure the spreadsheet exists and is not open in another program".to_string()
            }
            BotError::MissingColumn { column } => format!(
                "Add a '{}' column to the first row of the spreadsheet or set [input.columns] in the config",
                column
            ),
            BotError::HttpError(_) | BotError::WebDriverError { .. } => {
                "Check that chromedriver is running and matches the installed Chrome version"
                    .to_string()
            }
            BotError::ElementNotFound { .. } => {
                "Check the [form] selectors against the page and increase the wait time if the page is slow"
                    .to_string()
            }
            BotError::DialogTimeout { .. } => {
                "Increase form.result_timeout_secs or remove it to wait indefinitely".to_string()
            }
            BotError::DriverLaunchError { .. } => {
                "Install chromedriver, put it on PATH or set browser.driver_path / --webdriver-url"
                    .to_string()
            }
            BotError::StepFailed { source, .. } => source.recovery_suggestion(),
            BotError::RowCountMismatch { .. } => {
                "This is a bug; please report it together with the input spreadsheet".to_string()
            }
            BotError::IoError(_) => "Check file permissions and available disk space".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Input => format!("Could not read the input spreadsheet: {}", self),
            ErrorCategory::Browser => format!("Browser automation failed: {}", self),
            ErrorCategory::Output => format!("Could not produce the output: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
