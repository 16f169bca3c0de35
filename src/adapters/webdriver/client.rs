use crate::domain::model::{Locator, QueryKind};
use crate::domain::ports::Browser;
use crate::utils::error::{BotError, Result};
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::{CmdError, ErrorStatus, NewSessionError};
use fantoccini::wd::WindowHandle;
use fantoccini::{Client, ClientBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use serde_json::{json, Map, Value};
use std::time::Duration;

const DEFAULT_ELEMENT_POLL: Duration = Duration::from_millis(250);

/// Options used when opening a new WebDriver session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub browser_name: String,
    pub headless: bool,
    pub args: Vec<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            browser_name: "chrome".to_string(),
            headless: false,
            args: Vec::new(),
        }
    }
}

impl SessionOptions {
    pub fn capabilities(&self) -> Map<String, Value> {
        let mut args = self.args.clone();
        if self.headless && !args.iter().any(|a| a.starts_with("--headless")) {
            args.push("--headless=new".to_string());
        }

        let mut caps = Map::new();
        caps.insert("browserName".to_string(), json!(self.browser_name));
        // 保留未處理的對話框，讓我們自己讀取與關閉
        caps.insert("unhandledPromptBehavior".to_string(), json!("ignore"));
        caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
        caps
    }
}

/// [`Browser`] backed by a `fantoccini` WebDriver session.
pub struct WebDriverClient {
    client: Client,
    session_id: String,
    element_poll: Duration,
}

impl WebDriverClient {
    pub async fn connect(base_url: &str, options: &SessionOptions) -> Result<Self> {
        tracing::debug!("Creating WebDriver session at {}", base_url);
        let client = ClientBuilder::new(HttpConnector::new())
            .capabilities(options.capabilities())
            .connect(base_url)
            .await
            .map_err(session_error)?;

        let session_id = client
            .session_id()
            .await
            .map_err(command_error)?
            .unwrap_or_default();

        tracing::info!("🌐 WebDriver session {} started", session_id);
        Ok(Self {
            client,
            session_id,
            element_poll: DEFAULT_ELEMENT_POLL,
        })
    }

    pub fn with_element_poll(mut self, poll: Duration) -> Self {
        self.element_poll = poll;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

fn session_error(e: NewSessionError) -> BotError {
    BotError::WebDriverError {
        error: "session not created".to_string(),
        message: e.to_string(),
    }
}

fn command_error(e: CmdError) -> BotError {
    let error = match &e {
        CmdError::Standard(wd) => format!("{:?}", wd.error),
        CmdError::WaitTimeout => "timeout".to_string(),
        _ => "command failed".to_string(),
    };
    BotError::WebDriverError {
        error,
        message: e.to_string(),
    }
}

fn is_no_such_alert(e: &CmdError) -> bool {
    matches!(e, CmdError::Standard(wd) if matches!(wd.error, ErrorStatus::NoSuchAlert))
}

fn window_handle(handle: &str) -> Result<WindowHandle> {
    WindowHandle::try_from(handle.to_string()).map_err(|e| BotError::WebDriverError {
        error: "invalid window handle".to_string(),
        message: format!("{:?}", e),
    })
}

#[async_trait]
impl Browser for WebDriverClient {
    type Element = Element;

    async fn navigate(&self, url: &str) -> Result<()> {
        self.client.goto(url).await.map_err(command_error)
    }

    async fn maximize_window(&self) -> Result<()> {
        self.client.maximize_window().await.map_err(command_error)
    }

    async fn find_element(&self, locator: &Locator, wait: Duration) -> Result<Element> {
        let (kind, selector) = locator.query();
        let query = match kind {
            QueryKind::Css => fantoccini::Locator::Css(&selector),
            QueryKind::LinkText => fantoccini::Locator::LinkText(&selector),
            QueryKind::XPath => fantoccini::Locator::XPath(&selector),
        };

        self.client
            .wait()
            .at_most(wait)
            .every(self.element_poll)
            .for_element(query)
            .await
            .map_err(|e| match e {
                CmdError::WaitTimeout => BotError::ElementNotFound {
                    locator: locator.to_string(),
                    waited_ms: wait.as_millis() as u64,
                },
                other => command_error(other),
            })
    }

    async fn is_displayed(&self, element: &Element) -> Result<bool> {
        element.is_displayed().await.map_err(command_error)
    }

    async fn click(&self, element: &Element) -> Result<()> {
        element.click().await.map_err(command_error)
    }

    async fn send_keys(&self, element: &Element, text: &str) -> Result<()> {
        element.send_keys(text).await.map_err(command_error)
    }

    async fn tabs(&self) -> Result<Vec<String>> {
        let handles = self.client.windows().await.map_err(command_error)?;
        Ok(handles.into_iter().map(String::from).collect())
    }

    async fn activate_tab(&self, handle: &str) -> Result<()> {
        self.client
            .switch_to_window(window_handle(handle)?)
            .await
            .map_err(command_error)
    }

    async fn close_tab(&self) -> Result<Vec<String>> {
        self.client.close_window().await.map_err(command_error)?;
        self.tabs().await
    }

    async fn dialog_text(&self) -> Result<Option<String>> {
        match self.client.get_alert_text().await {
            Ok(text) => Ok(Some(text)),
            Err(e) if is_no_such_alert(&e) => Ok(None),
            Err(e) => Err(command_error(e)),
        }
    }

    async fn accept_dialog(&self) -> Result<()> {
        self.client.accept_alert().await.map_err(command_error)
    }

    async fn quit(&self) -> Result<()> {
        self.client.clone().close().await.map_err(command_error)?;
        tracing::info!("🛑 WebDriver session {} closed", self.session_id);
        Ok(())
    }
}
