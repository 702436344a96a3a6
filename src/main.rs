use clap::Parser;
use logi_tower::app::{bootstrap, console};
use logi_tower::config::cli::ConsoleLine;
use logi_tower::utils::error::{ErrorSeverity, WarehouseError};
use logi_tower::utils::{logger, validation::Validate};
use logi_tower::{AllocationController, CliConfig, LocalLedger};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

fn exit_with(e: &WarehouseError) -> ! {
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
    let exit_code = match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::High => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };

    if config.json_logs() {
        logger::init_json_logger(cli.verbose, config.logging.level.as_deref());
    } else {
        logger::init_cli_logger(cli.verbose, config.logging.level.as_deref());
    }
    tracing::info!("🚀 Starting logi-tower");
    if cli.verbose {
        tracing::debug!("Resolved config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        exit_with(&e);
    }

    let ledger = match &config.ledger.path {
        Some(path) => {
            tracing::info!("📁 Ledger snapshot: {}", path);
            LocalLedger::open(path).unwrap_or_else(|e| exit_with(&e))
        }
        None => {
            tracing::warn!("No ledger path configured, state lives in memory only");
            LocalLedger::in_memory()
        }
    };

    if let Err(e) = bootstrap::seed_if_empty(&ledger, &config.seed_slots()).await {
        exit_with(&e);
    }

    let controller = match AllocationController::new(ledger, config.tower_settings()).await {
        Ok(controller) => controller,
        Err(e) => exit_with(&e),
    };

    run_console(&controller).await?;
    tracing::info!("✅ Control tower stopped");
    Ok(())
}

async fn run_console(controller: &AllocationController<LocalLedger>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let command = match ConsoleLine::parse_line(&line) {
            Ok(parsed) => parsed.command,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        match console::execute(controller, command).await {
            Ok(reply) => {
                stdout.write_all(reply.output.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
                if reply.quit {
                    break;
                }
            }
            Err(e) => {
                tracing::error!(
                    "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
                    e,
                    e.category(),
                    e.severity()
                );
                eprintln!("❌ {}", e.user_friendly_message());
                eprintln!("💡 {}", e.recovery_suggestion());
            }
        }
    }

    Ok(())
}
