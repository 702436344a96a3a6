use crate::domain::model::Event;
use crate::utils::error::Result;
use std::io::Write;

/// 將稽核紀錄輸出為 CSV
pub fn write_events_csv<W: Write>(events: &[Event], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["id", "tracking_id", "bin_id", "timestamp", "status", "details"])?;

    for event in events {
        let slot = event.slot_id.map(|id| id.to_string()).unwrap_or_default();
        csv_writer.write_record([
            event.id.to_string().as_str(),
            event.item_id.as_str(),
            slot.as_str(),
            event.timestamp.to_rfc3339().as_str(),
            event.status.as_str(),
            event.detail.as_str(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}
