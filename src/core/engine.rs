use crate::core::Pipeline;
use crate::domain::model::RunSummary;
use crate::utils::error::{BotError, Result};
use chrono::Utc;

pub struct AutomationEngine<P: Pipeline> {
    pipeline: P,
    found_label: String,
    not_found_label: String,
}

impl<P: Pipeline> AutomationEngine<P> {
    pub fn new(pipeline: P, found_label: &str, not_found_label: &str) -> Self {
        Self {
            pipeline,
            found_label: found_label.to_string(),
            not_found_label: not_found_label.to_string(),
        }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let outcome = self.run_phases().await;

        // 不論成功與否都釋放瀏覽器
        if let Err(e) = self.pipeline.finish().await {
            tracing::warn!("⚠️ Cleanup after the run failed: {}", e);
        }

        outcome
    }

    async fn run_phases(&self) -> Result<RunSummary> {
        let started_at = Utc::now();
        tracing::info!("🚀 Starting form automation");

        // Extract
        tracing::info!("📥 Reading spreadsheet...");
        let table = self.pipeline.extract().await?;
        let expected = table.len();
        tracing::info!("Read {} rows", expected);

        // Transform
        tracing::info!("🤖 Submitting forms...");
        let table = self.pipeline.transform(table).await?;
        if table.len() != expected {
            return Err(BotError::RowCountMismatch {
                expected,
                actual: table.len(),
            });
        }

        let found = table.count_status(&self.found_label);
        let not_found = table.count_status(&self.not_found_label);
        tracing::info!("Processed {} rows ({} found, {} not found)", expected, found, not_found);

        // Load
        tracing::info!("💾 Writing results...");
        let output_path = self.pipeline.load(table).await?;

        Ok(RunSummary {
            output_path,
            rows: expected,
            found,
            not_found,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ColumnNames, ProcessTable};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct StaticPipeline {
        drop_row: bool,
        fail_extract: bool,
        fail_load: bool,
        finished: AtomicBool,
    }

    fn table() -> ProcessTable {
        let headers = ["Nome", "Advogado", "Processo", "Cidade", "Status"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows = vec![
            vec!["Ana".into(), "Dr. A".into(), "1".into(), "Recife".into(), "".into()],
            vec!["Bia".into(), "Dr. B".into(), "2".into(), "Natal".into(), "".into()],
        ];
        ProcessTable::new(headers, rows, &ColumnNames::default()).unwrap()
    }

    #[async_trait]
    impl Pipeline for StaticPipeline {
        async fn extract(&self) -> Result<ProcessTable> {
            if self.fail_extract {
                return Err(BotError::MissingColumn {
                    column: "Cidade".to_string(),
                });
            }
            Ok(table())
        }

        async fn transform(&self, mut table: ProcessTable) -> Result<ProcessTable> {
            table.set_status(0, "Encontrado")?;
            table.set_status(1, "Não encontrado")?;
            if self.drop_row {
                let headers = table.headers().to_vec();
                let rows = table.rows()[..1].to_vec();
                return ProcessTable::new(headers, rows, &ColumnNames::default());
            }
            Ok(table)
        }

        async fn load(&self, _table: ProcessTable) -> Result<String> {
            if self.fail_load {
                return Err(BotError::IoError(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only directory",
                )));
            }
            Ok("out/result.xlsx".to_string())
        }

        async fn finish(&self) -> Result<()> {
            self.finished.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_run_counts_statuses() {
        let engine = AutomationEngine::new(
            StaticPipeline::default(),
            "Encontrado",
            "Não encontrado",
        );
        let summary = engine.run().await.unwrap();

        assert_eq!(summary.rows, 2);
        assert_eq!(summary.found, 1);
        assert_eq!(summary.not_found, 1);
        assert_eq!(summary.output_path, "out/result.xlsx");
        assert!(summary.finished_at >= summary.started_at);
        assert!(engine.pipeline.finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_run_rejects_row_count_change() {
        let engine = AutomationEngine::new(
            StaticPipeline {
                drop_row: true,
                ..StaticPipeline::default()
            },
            "Encontrado",
            "Não encontrado",
        );
        let err = engine.run().await.unwrap_err();

        assert!(matches!(
            err,
            BotError::RowCountMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[tokio::test]
    async fn test_finish_runs_when_extract_or_load_fails() {
        let engine = AutomationEngine::new(
            StaticPipeline {
                fail_extract: true,
                ..StaticPipeline::default()
            },
            "Encontrado",
            "Não encontrado",
        );
        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, BotError::MissingColumn { .. }));
        assert!(engine.pipeline.finished.load(Ordering::SeqCst));

        let engine = AutomationEngine::new(
            StaticPipeline {
                fail_load: true,
                ..StaticPipeline::default()
            },
            "Encontrado",
            "Não encontrado",
        );
        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, BotError::IoError(_)));
        assert!(engine.pipeline.finished.load(Ordering::SeqCst));
    }
}
