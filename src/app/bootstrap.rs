use crate::adapters::LocalLedger;
use crate::config::toml_config::SlotConfig;
use crate::utils::error::Result;

/// Provisions the configured slots, but only into a ledger that has none yet.
pub async fn seed_if_empty(ledger: &LocalLedger, slots: &[SlotConfig]) -> Result<usize> {
    if ledger.slot_count().await > 0 {
        tracing::debug!("Ledger already has bins, skipping seed");
        return Ok(0);
    }

    for slot in slots {
        ledger.provision_slot(slot.capacity, &slot.location).await?;
    }
    if !slots.is_empty() {
        tracing::info!("🏗️ Created {} bins from configuration", slots.len());
    }
    Ok(slots.len())
}
