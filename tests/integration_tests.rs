use anyhow::Result;
use httpmock::prelude::*;
use serde_json::json;
use sheet_form_bot::adapters::xlsx;
use sheet_form_bot::app::pipelines::form_pipeline::dry_run;
use sheet_form_bot::domain::model::ColumnNames;
use sheet_form_bot::{
    AutomationEngine, BotError, FormPipeline, LocalStorage, SessionOptions, TomlConfig,
    WebDriverClient,
};
use tempfile::TempDir;

const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// 建立測試用的輸入試算表（含一個額外欄位）
fn write_input_workbook(dir: &TempDir) -> Result<()> {
    let mut book = umya_spreadsheet::new_file();
    let sheet = book.get_active_sheet_mut();

    let header = ["Nome", "Advogado", "Processo", "Cidade", "Status", "Observação"];
    for (col, value) in header.iter().enumerate() {
        sheet.get_cell_mut((col as u32 + 1, 1)).set_value(*value);
    }
    let rows = [
        ["Ana Souza", "Dr. Lima", "0001234-56", "Recife", "", "urgente"],
        ["Bruno Alves", "Dra. Reis", "0009876-54", "Natal", "", ""],
        ["Carla Dias", "Dr. Melo", "0005555", "Olinda", "", "revisar"],
    ];
    for (r, row) in rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            if !value.is_empty() {
                // 全部以文字寫入，包含看起來像數字的處理編號
                sheet
                    .get_cell_mut((col as u32 + 1, r as u32 + 2))
                    .set_value_string(*value);
            }
        }
    }

    std::fs::create_dir_all(dir.path().join("Base de Dados"))?;
    umya_spreadsheet::writer::xlsx::write(&book, dir.path().join("Base de Dados/Processos.xlsx"))
        .map_err(|e| anyhow::anyhow!("failed to write fixture: {}", e))?;
    Ok(())
}

fn mock_session(server: &MockServer) {
    server.mock(|when, then| {
        when.method(POST).path("/session");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({ "value": { "sessionId": "s1", "capabilities": {} } }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/session/s1/url");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({ "value": "about:blank" }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/session/s1/url");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({ "value": null }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/session/s1/window/maximize");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({ "value": { "x": 0, "y": 0, "width": 1280, "height": 800 } }));
    });
}

fn mock_quit(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(DELETE).path("/session/s1");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({ "value": null }));
    })
}

/// 模擬 chromedriver 的所有端點，結果對話框固定回傳 `dialog`
fn mock_webdriver(server: &MockServer, dialog: &str) {
    mock_session(server);
    for path in [
        "/session/s1/element/el-1/click",
        "/session/s1/element/el-1/value",
        "/session/s1/window",
        "/session/s1/alert/accept",
    ] {
        server.mock(|when, then| {
            when.method(POST).path(path);
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({ "value": null }));
        });
    }
    for (method, path, value) in [
        (POST, "/session/s1/element", json!({ (ELEMENT_KEY): "el-1" })),
        (GET, "/session/s1/element/el-1/displayed", json!(true)),
        (GET, "/session/s1/window/handles", json!(["main", "form"])),
        (DELETE, "/session/s1/window", json!(["main"])),
        (GET, "/session/s1/alert/text", json!(dialog)),
    ] {
        server.mock(|when, then| {
            when.method(method).path(path);
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({ "value": value }));
        });
    }
}

fn test_config(server: &MockServer) -> TomlConfig {
    let mut config = TomlConfig::default();
    config.page.path = server.url("/index.html");
    config.browser.webdriver_url = Some(server.base_url());
    config.form.dialog_poll_ms = 10;
    config
}

async fn run_engine(dir: &TempDir, config: TomlConfig) -> sheet_form_bot::Result<String> {
    let browser = WebDriverClient::connect(
        config.browser.webdriver_url.as_deref().unwrap_or_default(),
        &SessionOptions::default(),
    )
    .await?;
    let storage = LocalStorage::new(dir.path());
    let found = config.status.found_label.clone();
    let not_found = config.status.not_found_label.clone();
    let pipeline = FormPipeline::new(storage, browser, config);

    let summary = AutomationEngine::new(pipeline, &found, &not_found)
        .run()
        .await?;
    Ok(summary.output_path)
}

#[tokio::test]
async fn test_end_to_end_all_found() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_input_workbook(&temp_dir)?;

    let server = MockServer::start();
    mock_webdriver(&server, "Processo encontrado com sucesso!");
    let quit = mock_quit(&server);
    let output_path = run_engine(&temp_dir, test_config(&server)).await?;

    quit.assert();
    assert!(output_path.ends_with("Processos Finalizados.xlsx"));

    let written = temp_dir
        .path()
        .join("Arquivos Gerados")
        .join("Processos Finalizados.xlsx");
    assert!(written.exists());

    let table = xlsx::parse_workbook(&std::fs::read(&written)?, &ColumnNames::default())?;
    assert_eq!(table.len(), 3);
    assert_eq!(table.count_status("Encontrado"), 3);
    assert_eq!(table.headers().last().map(String::as_str), Some("Observação"));
    assert_eq!(table.rows()[2][5], "revisar");
    assert_eq!(table.record(2).map(|r| r.process_number), Some("0005555".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_end_to_end_not_found_keeps_row_count() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_input_workbook(&temp_dir)?;

    let server = MockServer::start();
    mock_webdriver(&server, "Processo não encontrado na base");
    mock_quit(&server);

    let mut config = test_config(&server);
    config.output.directory = "saida/lote-1".to_string();
    run_engine(&temp_dir, config).await?;

    let written = temp_dir.path().join("saida/lote-1/Processos Finalizados.xlsx");
    let table = xlsx::parse_workbook(&std::fs::read(&written)?, &ColumnNames::default())?;
    assert_eq!(table.len(), 3);
    for record in table.records() {
        assert_eq!(record.status, "Não encontrado");
    }
    Ok(())
}

#[tokio::test]
async fn test_missing_element_aborts_batch_and_closes_session() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_input_workbook(&temp_dir)?;

    let server = MockServer::start();
    mock_session(&server);
    server.mock(|when, then| {
        when.method(POST).path("/session/s1/element");
        then.status(404)
            .header("Content-Type", "application/json")
            .json_body(json!({
                "value": {
                    "error": "no such element",
                    "message": "Unable to locate element",
                    "stacktrace": ""
                }
            }));
    });
    let quit = mock_quit(&server);

    let mut config = test_config(&server);
    config.form.menu_wait_ms = 0;
    let err = run_engine(&temp_dir, config).await.unwrap_err();

    assert!(matches!(err, BotError::StepFailed { .. }));
    assert!(err.to_string().contains("clicking the dropdown button"));
    quit.assert();
    assert!(!temp_dir.path().join("Arquivos Gerados").exists());
    Ok(())
}

#[tokio::test]
async fn test_non_xlsx_input_is_rejected_and_session_closed() -> Result<()> {
    let temp_dir = TempDir::new()?;
    std::fs::write(temp_dir.path().join("Processos.csv"), "Nome,Advogado\n")?;

    let server = MockServer::start();
    mock_session(&server);
    let quit = mock_quit(&server);

    let mut config = test_config(&server);
    config.input.path = "Processos.csv".to_string();
    let err = run_engine(&temp_dir, config).await.unwrap_err();

    assert!(matches!(err, BotError::UnsupportedFile { .. }));
    quit.assert();
    Ok(())
}

#[tokio::test]
async fn test_missing_input_closes_session() -> Result<()> {
    let temp_dir = TempDir::new()?;

    let server = MockServer::start();
    mock_session(&server);
    let quit = mock_quit(&server);

    let err = run_engine(&temp_dir, test_config(&server)).await.unwrap_err();

    assert!(matches!(err, BotError::IoError(_)));
    quit.assert();
    Ok(())
}

#[tokio::test]
async fn test_dry_run_reads_rows_from_disk() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_input_workbook(&temp_dir)?;

    let storage = LocalStorage::new(temp_dir.path());
    let table = dry_run(&storage, &TomlConfig::default()).await?;

    assert_eq!(table.len(), 3);
    let cities: Vec<String> = table.records().map(|r| r.city).collect();
    assert_eq!(cities, ["Recife", "Natal", "Olinda"]);
    assert!(!temp_dir.path().join("Arquivos Gerados").exists());
    Ok(())
}
