use crate::utils::error::{BotError, Result};
use reqwest::Client;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};

const READY_POLL: Duration = Duration::from_millis(200);

/// chromedriver 行程的生命週期管理
///
/// Either owns a spawned driver process (killed on [`DriverService::stop`] or
/// drop) or points at a WebDriver server started elsewhere.
pub struct DriverService {
    url: String,
    child: Option<Child>,
}

impl DriverService {
    /// Attach to an already running WebDriver server.
    pub fn external(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            child: None,
        }
    }

    pub async fn spawn(driver_path: &str, port: u16, startup_timeout: Duration) -> Result<Self> {
        tracing::info!("🚗 Starting {} on port {}", driver_path, port);

        let child = Command::new(driver_path)
            .arg(format!("--port={}", port))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BotError::DriverLaunchError {
                message: format!("could not execute '{}': {}", driver_path, e),
            })?;

        let service = Self {
            url: format!("http://127.0.0.1:{}", port),
            child: Some(child),
        };
        service.wait_until_ready(startup_timeout).await?;
        Ok(service)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// 輪詢 `/status` 直到 driver 回報 ready
    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<()> {
        let client = Client::new();
        let status_url = format!("{}/status", self.url);
        let started = Instant::now();

        loop {
            match client.get(&status_url).send().await {
                Ok(response) if response.status().is_success() => {
                    let body: serde_json::Value = response.json().await?;
                    let ready = body
                        .pointer("/value/ready")
                        .and_then(serde_json::Value::as_bool)
                        .unwrap_or(false);
                    if ready {
                        tracing::debug!("WebDriver ready after {:?}", started.elapsed());
                        return Ok(());
                    }
                }
                Ok(response) => {
                    tracing::debug!("WebDriver status returned {}", response.status());
                }
                Err(e) => {
                    tracing::trace!("WebDriver not reachable yet: {}", e);
                }
            }

            if started.elapsed() >= timeout {
                return Err(BotError::DriverLaunchError {
                    message: format!(
                        "{} did not become ready within {}s",
                        self.url,
                        timeout.as_secs()
                    ),
                });
            }
            tokio::time::sleep(READY_POLL).await;
        }
    }

    pub async fn stop(mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            child.kill().await?;
            tracing::debug!("WebDriver process stopped");
        }
        Ok(())
    }
}
