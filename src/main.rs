use agentos_serve::domain::ports::Serve;
use agentos_serve::utils::error::BootstrapError;
use agentos_serve::utils::{logger, validation::Validate};
use agentos_serve::{Bootstrapper, CliConfig, HttpServer, Settings};
use clap::Parser;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.log_json {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting agentos-serve");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(
                "❌ agentos-serve failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(config: CliConfig) -> Result<(), BootstrapError> {
    config.validate()?;

    let mut settings = Settings::load()?;
    config.apply_to(&mut settings);
    settings.validate()?;

    let mut bootstrapper = Bootstrapper::new(settings.loader_options());
    let report = bootstrapper.run(&config.paths, config.name.as_deref())?;

    // 報告寫到 stderr
    eprintln!("{}", report.config.summary(report.loaded_files));
    if !report.skipped.is_empty() {
        eprintln!("Skipped {} file(s).", report.skipped.len());
    }

    let server = HttpServer::new(settings.server.host.clone(), settings.server.port);
    eprintln!("Serving '{}' on {}", report.config.name, server.address());

    server
        .serve(report.config)
        .await
        .map_err(|e| BootstrapError::ServerError {
            message: format!("{:#}", e),
        })
}
