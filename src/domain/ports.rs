use crate::domain::model::{ColumnNames, Locator, LocatorKind, ProcessTable};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 表單頁面的元素定位與等待設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormLayout {
    pub menu_button: Locator,
    pub menu_wait: Duration,
    pub city_link: LocatorKind,
    pub name_field: Locator,
    pub name_wait: Duration,
    pub lawyer_field: Locator,
    pub process_number_field: Locator,
    pub submit_button: Locator,
    pub default_wait: Duration,
    pub dialog_poll: Duration,
    pub result_timeout: Option<Duration>,
}

/// 結果對話框文字如何對應到狀態
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRules {
    pub success_marker: String,
    pub found_label: String,
    pub not_found_label: String,
}

impl Default for StatusRules {
    fn default() -> Self {
        Self {
            success_marker: "Processo encontrado com sucesso".to_string(),
            found_label: "Encontrado".to_string(),
            not_found_label: "Não encontrado".to_string(),
        }
    }
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn page(&self) -> &str;
    fn output_dir(&self) -> &str;
    fn output_file_name(&self) -> &str;
    fn columns(&self) -> &ColumnNames;
    fn form_layout(&self) -> FormLayout;
    fn status_rules(&self) -> StatusRules;

    fn output_path(&self) -> String {
        Path::new(self.output_dir())
            .join(self.output_file_name())
            .to_string_lossy()
            .into_owned()
    }
}

/// 瀏覽器操作介面；正式環境由 WebDriver 客戶端實作
#[async_trait]
pub trait Browser: Send + Sync {
    /// Handle to a located element, only valid within this browser session.
    type Element: Send + Sync;

    async fn navigate(&self, url: &str) -> Result<()>;
    async fn maximize_window(&self) -> Result<()>;
    /// Looks an element up, polling until `wait` elapses.
    async fn find_element(&self, locator: &Locator, wait: Duration) -> Result<Self::Element>;
    async fn is_displayed(&self, element: &Self::Element) -> Result<bool>;
    async fn click(&self, element: &Self::Element) -> Result<()>;
    async fn send_keys(&self, element: &Self::Element, text: &str) -> Result<()>;
    async fn tabs(&self) -> Result<Vec<String>>;
    async fn activate_tab(&self, handle: &str) -> Result<()>;
    /// Closes the current tab and returns the remaining handles.
    async fn close_tab(&self) -> Result<Vec<String>>;
    /// Text of the open JavaScript dialog, `None` when no dialog is open.
    async fn dialog_text(&self) -> Result<Option<String>>;
    async fn accept_dialog(&self) -> Result<()>;
    async fn quit(&self) -> Result<()>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<ProcessTable>;
    async fn transform(&self, table: ProcessTable) -> Result<ProcessTable>;
    async fn load(&self, table: ProcessTable) -> Result<String>;

    /// Releases external resources; the engine calls it after every run,
    /// whether the run succeeded or not.
    async fn finish(&self) -> Result<()> {
        Ok(())
    }
}
