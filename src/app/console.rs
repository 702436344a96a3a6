use crate::app::audit::write_events_csv;
use crate::config::cli::ConsoleCommand;
use crate::core::controller::AllocationController;
use crate::core::outcome::ConsolidateOutcome;
use crate::domain::model::ItemId;
use crate::domain::ports::Ledger;
use crate::utils::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleReply {
    pub output: String,
    pub quit: bool,
}

impl ConsoleReply {
    fn text(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            quit: false,
        }
    }
}

/// 執行一行主控台指令並產生回覆
pub async fn execute<L: Ledger>(
    controller: &AllocationController<L>,
    command: ConsoleCommand,
) -> Result<ConsoleReply> {
    let reply = match command {
        ConsoleCommand::Ingest {
            size,
            destination,
            fragile,
        } => {
            let item = controller
                .ingest(size, &destination.join(" "), fragile)
                .await?;
            ConsoleReply::text(format!(
                "Package {} generated and added to conveyor.",
                item.id
            ))
        }
        ConsoleCommand::Process => ConsoleReply::text(controller.process_next().await?.to_string()),
        ConsoleCommand::Consolidate { capacity } => {
            match controller.consolidate(capacity).await? {
                ConsolidateOutcome::Loaded(report) => {
                    let body = serde_json::json!({
                        "truck_capacity": report.capacity,
                        "filled_size": report.total_size,
                        "optimized_packages": report.selection,
                        "space_utilization": format!("{:.1}%", report.utilization()),
                        "execution_logs": report.execution_logs,
                    });
                    ConsoleReply::text(serde_json::to_string_pretty(&body)?)
                }
                other => ConsoleReply::text(other.to_string()),
            }
        }
        ConsoleCommand::Load { item_id } => {
            let outcome = controller.load(&ItemId::from(item_id)).await?;
            ConsoleReply::text(outcome.to_string())
        }
        ConsoleCommand::Rollback { item_id } => {
            let outcome = controller.rollback(&ItemId::from(item_id)).await?;
            ConsoleReply::text(outcome.action_log().join("\n"))
        }
        ConsoleCommand::Unload => {
            let unloaded = controller.unload_all().await?;
            ConsoleReply::text(format!("Unloaded {} packages from truck.", unloaded.len()))
        }
        ConsoleCommand::Retry => {
            let count = controller.requeue_dead_letters().await;
            ConsoleReply::text(format!("Requeued {} packages.", count))
        }
        ConsoleCommand::Reload => {
            let count = controller.reload().await?;
            ConsoleReply::text(format!("Inventory reloaded: {} free bins.", count))
        }
        ConsoleCommand::Status => {
            let status = controller.status().await;
            ConsoleReply::text(serde_json::to_string_pretty(&status)?)
        }
        ConsoleCommand::Events { csv } => {
            let events = controller.ledger().events().await?;
            match csv {
                Some(path) => {
                    let file = std::fs::File::create(&path)?;
                    write_events_csv(&events, file)?;
                    ConsoleReply::text(format!("Exported {} events to {}", events.len(), path))
                }
                None => ConsoleReply::text(
                    events
                        .iter()
                        .map(|event| format!("{} {}", event, event.detail))
                        .collect::<Vec<_>>()
                        .join("\n"),
                ),
            }
        }
        ConsoleCommand::Quit => ConsoleReply {
            output: "Bye.".to_string(),
            quit: true,
        },
    };

    Ok(reply)
}
