use crate::adapters::xlsx;
use crate::core::classify::classify;
use crate::domain::model::{Locator, ProcessRecord, ProcessTable};
use crate::domain::ports::{Browser, ConfigProvider, FormLayout, Pipeline, StatusRules, Storage};
use crate::utils::error::{BotError, FormStep, Result};
use crate::utils::validation;
use std::future::Future;
use std::time::{Duration, Instant};

const VISIBILITY_POLL: Duration = Duration::from_millis(250);

/// Pipeline 實作：讀取試算表、逐列填寫表單、寫回結果
pub struct FormPipeline<S: Storage, B: Browser, C: ConfigProvider> {
    storage: S,
    browser: B,
    config: C,
}

impl<S: Storage, B: Browser, C: ConfigProvider> FormPipeline<S, B, C> {
    pub fn new(storage: S, browser: B, config: C) -> Self {
        Self {
            storage,
            browser,
            config,
        }
    }

    async fn open_page(&self) -> Result<()> {
        let url = validation::resolve_page_url(self.config.page())?;
        tracing::info!("🌐 Opening {}", url);
        self.browser.navigate(url.as_str()).await?;
        self.browser.maximize_window().await
    }

    async fn process_rows(
        &self,
        table: &mut ProcessTable,
        layout: &FormLayout,
        rules: &StatusRules,
    ) -> Result<()> {
        run_step(FormStep::OpenPage, self.open_page()).await?;

        for index in 0..table.len() {
            let record = table
                .record(index)
                .ok_or_else(|| BotError::SpreadsheetError {
                    message: format!("Row {} disappeared while processing", index),
                })?;
            tracing::info!(
                "📝 Row {}/{}: {} ({})",
                index + 1,
                table.len(),
                record.process_number,
                record.city
            );

            run_step(FormStep::OpenMenu, self.open_menu(layout)).await?;
            run_step(FormStep::SelectCity, self.select_city(layout, &record.city)).await?;
            run_step(FormStep::FillFields, self.fill_fields(layout, &record)).await?;
            run_step(FormStep::Submit, self.submit(layout)).await?;
            let result = run_step(FormStep::AwaitResult, self.await_result(layout)).await?;
            run_step(
                FormStep::UpdateStatus,
                self.update_status(table, index, &result, rules),
            )
            .await?;
            run_step(FormStep::CloseTab, self.close_tab()).await?;
        }

        Ok(())
    }

    async fn open_menu(&self, layout: &FormLayout) -> Result<()> {
        let button = self
            .browser
            .find_element(&layout.menu_button, layout.menu_wait)
            .await?;
        self.wait_visible(&layout.menu_button, &button, layout.menu_wait)
            .await?;
        self.browser.click(&button).await
    }

    async fn wait_visible(
        &self,
        locator: &Locator,
        element: &B::Element,
        wait: Duration,
    ) -> Result<()> {
        let started = Instant::now();
        while !self.browser.is_displayed(element).await? {
            if started.elapsed() >= wait {
                return Err(BotError::ElementNotFound {
                    locator: format!("{} (visible)", locator),
                    waited_ms: wait.as_millis() as u64,
                });
            }
            tokio::time::sleep(VISIBILITY_POLL).await;
        }
        Ok(())
    }

    async fn select_city(&self, layout: &FormLayout, city: &str) -> Result<()> {
        // 空白列沒有城市可選，部分連結文字會比對到任何連結
        if city.trim().is_empty() {
            return Err(BotError::SpreadsheetError {
                message: "row has no city to select".to_string(),
            });
        }
        let link = Locator::new(layout.city_link, city);
        let element = self
            .browser
            .find_element(&link, layout.default_wait)
            .await?;
        self.browser.click(&element).await
    }

    async fn fill_fields(&self, layout: &FormLayout, record: &ProcessRecord) -> Result<()> {
        // 城市連結會開新分頁，切到最後一個
        let tabs = self.browser.tabs().await?;
        if let Some(last) = tabs.last() {
            self.browser.activate_tab(last).await?;
        }

        let fields = [
            (&layout.name_field, layout.name_wait, record.name.as_str()),
            (&layout.lawyer_field, layout.default_wait, record.lawyer.as_str()),
            (
                &layout.process_number_field,
                layout.default_wait,
                record.process_number.as_str(),
            ),
        ];
        for (locator, wait, value) in fields {
            let element = self.browser.find_element(locator, wait).await?;
            self.browser.send_keys(&element, value).await?;
        }
        Ok(())
    }

    async fn submit(&self, layout: &FormLayout) -> Result<()> {
        let button = self
            .browser
            .find_element(&layout.submit_button, layout.default_wait)
            .await?;
        self.browser.click(&button).await?;
        // 確認對話框
        self.browser.accept_dialog().await
    }

    async fn await_result(&self, layout: &FormLayout) -> Result<String> {
        let started = Instant::now();
        loop {
            if let Some(text) = self.browser.dialog_text().await? {
                tracing::info!("💬 {}", text);
                return Ok(text);
            }
            if let Some(timeout) = layout.result_timeout {
                if started.elapsed() >= timeout {
                    return Err(BotError::DialogTimeout {
                        waited_secs: timeout.as_secs(),
                    });
                }
            }
            tokio::time::sleep(layout.dialog_poll).await;
        }
    }

    async fn update_status(
        &self,
        table: &mut ProcessTable,
        index: usize,
        result: &str,
        rules: &StatusRules,
    ) -> Result<()> {
        self.browser.accept_dialog().await?;
        let label = classify(result, rules).label(rules);
        tracing::debug!("Row {} status -> {}", index + 1, label);
        table.set_status(index, label)
    }

    async fn close_tab(&self) -> Result<()> {
        let remaining = self.browser.close_tab().await?;
        if let Some(last) = remaining.last() {
            self.browser.activate_tab(last).await?;
        }
        Ok(())
    }
}

/// 讀取並解析輸入試算表
pub async fn read_table<S: Storage, C: ConfigProvider>(storage: &S, config: &C) -> Result<ProcessTable> {
    let input = config.input_path();
    validation::validate_spreadsheet_path(input)?;

    tracing::debug!("Reading spreadsheet {}", input);
    let data = storage.read_file(input).await?;
    xlsx::parse_workbook(&data, config.columns())
}

/// Reads the input and lists the rows that would be submitted, without a browser.
pub async fn dry_run<S: Storage, C: ConfigProvider>(storage: &S, config: &C) -> Result<ProcessTable> {
    let table = read_table(storage, config).await?;

    for (index, record) in table.records().enumerate() {
        tracing::info!(
            "  • {} | {} | {} | {} | {}",
            index + 1,
            record.name,
            record.lawyer,
            record.process_number,
            record.city
        );
    }
    tracing::info!(
        "🔍 {} rows would be submitted, output would go to {}",
        table.len(),
        config.output_path()
    );
    Ok(table)
}

async fn run_step<T>(step: FormStep, action: impl Future<Output = Result<T>>) -> Result<T> {
    action.await.map_err(|e| {
        tracing::error!("❌ Error while {}: {}", step, e);
        BotError::step(step, e)
    })
}

#[async_trait::async_trait]
impl<S: Storage, B: Browser, C: ConfigProvider> Pipeline for FormPipeline<S, B, C> {
    async fn extract(&self) -> Result<ProcessTable> {
        read_table(&self.storage, &self.config).await
    }

    async fn transform(&self, mut table: ProcessTable) -> Result<ProcessTable> {
        let layout = self.config.form_layout();
        let rules = self.config.status_rules();

        self.process_rows(&mut table, &layout, &rules).await?;
        Ok(table)
    }

    async fn load(&self, table: ProcessTable) -> Result<String> {
        let output_path = self.config.output_path();

        let data = xlsx::render_workbook(&table)?;
        tracing::debug!("Writing workbook ({} bytes) to {}", data.len(), output_path);
        self.storage.write_file(&output_path, &data).await?;

        tracing::info!("✅ File created successfully: {}", output_path);
        Ok(output_path)
    }

    async fn finish(&self) -> Result<()> {
        tracing::debug!("Closing the browser session");
        self.browser.quit().await
    }
}
