use clap::Parser;
use sheet_form_bot::app::pipelines::form_pipeline::dry_run;
use sheet_form_bot::utils::error::{BotError, ErrorSeverity};
use sheet_form_bot::utils::{logger, validation::Validate};
use sheet_form_bot::{
    AutomationEngine, CliConfig, DriverService, FormPipeline, LocalStorage, LogFormat,
    SessionOptions, TomlConfig, WebDriverClient,
};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 初始化日誌
    match cli.log_format {
        LogFormat::Text => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }

    tracing::info!("Starting sheet-form-bot");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 載入並驗證配置
    let config = match cli.resolve().and_then(|config| config.validate().map(|_| config)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let storage = LocalStorage::new(".");

    if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - the browser will not be opened");
        return match dry_run(&storage, &config).await {
            Ok(table) => {
                println!("🔍 {} rows would be submitted", table.len());
                Ok(())
            }
            Err(e) => exit_with(e),
        };
    }

    let service = match start_driver(&config).await {
        Ok(service) => service,
        Err(e) => exit_with(e),
    };

    let result = run(storage, &service, config).await;

    if let Err(e) = service.stop().await {
        tracing::warn!("⚠️ Failed to stop WebDriver: {}", e);
    }

    match result {
        Ok(()) => Ok(()),
        Err(e) => exit_with(e),
    }
}

async fn start_driver(config: &TomlConfig) -> sheet_form_bot::Result<DriverService> {
    match &config.browser.webdriver_url {
        Some(url) => {
            tracing::info!("🔌 Using WebDriver at {}", url);
            Ok(DriverService::external(url))
        }
        None => {
            DriverService::spawn(
                &config.browser.driver_path,
                config.browser.port,
                Duration::from_secs(config.browser.startup_timeout_secs),
            )
            .await
        }
    }
}

async fn run(
    storage: LocalStorage,
    service: &DriverService,
    config: TomlConfig,
) -> sheet_form_bot::Result<()> {
    let options = SessionOptions {
        browser_name: config.browser.browser_name.clone(),
        headless: config.browser.headless,
        args: config.browser.args.clone(),
    };
    let browser = WebDriverClient::connect(service.url(), &options).await?;

    let found_label = config.status.found_label.clone();
    let not_found_label = config.status.not_found_label.clone();
    let pipeline = FormPipeline::new(storage, browser, config);
    let engine = AutomationEngine::new(pipeline, &found_label, &not_found_label);

    let summary = engine.run().await?;
    tracing::info!("✅ Form automation completed successfully!");
    tracing::info!(
        "📊 {} rows: {} found, {} not found in {}s",
        summary.rows,
        summary.found,
        summary.not_found,
        summary.elapsed().num_seconds()
    );
    println!("✅ File created successfully");
    println!("📁 Output saved to: {}", summary.output_path);
    Ok(())
}

fn exit_with(e: BotError) -> ! {
    tracing::error!(
        "❌ Form automation failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
