//! Plain-text rendering of daemon responses

use std::fmt::Write;

use smartupd_api::events::UpdaterEvent;
use smartupd_api::responses::OptionsResponse;
use smartupd_api::{HistoryRecord, SensorSnapshot};

const MISSING: &str = "-";

fn column_width<'a>(header: &str, values: impl Iterator<Item = &'a str>) -> usize {
    values.map(str::len).fold(header.len(), usize::max)
}

/// Pending updates as a table
pub fn snapshot(snapshot: &SensorSnapshot) -> String {
    let mut out = String::new();
    if snapshot.is_empty() {
        let _ = writeln!(out, "No pending updates");
    } else {
        let name_w = column_width("NAME", snapshot.updates.iter().map(|u| u.name.as_str()));
        let id_w = column_width(
            "ENTITY",
            snapshot.updates.iter().map(|u| u.entity_id.as_str()),
        );
        let _ = writeln!(out, "{:name_w$}  {:id_w$}  INSTALLED -> LATEST", "NAME", "ENTITY");
        for update in &snapshot.updates {
            let _ = writeln!(
                out,
                "{:name_w$}  {:id_w$}  {} -> {}",
                update.name,
                update.entity_id,
                update.installed_version.as_deref().unwrap_or(MISSING),
                update.latest_version,
            );
        }
    }
    let _ = writeln!(
        out,
        "{} pending, refreshed {}",
        snapshot.count,
        snapshot.refreshed_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    out
}

/// History records, newest first
pub fn history(records: &[HistoryRecord]) -> String {
    if records.is_empty() {
        return "No updates recorded\n".to_string();
    }
    let name_w = column_width("NAME", records.iter().map(|r| r.name.as_str()));
    let mut out = String::new();
    let _ = writeln!(out, "{:19}  {:name_w$}  VERSION", "WHEN", "NAME");
    for record in records {
        let _ = writeln!(
            out,
            "{:19}  {:name_w$}  {} -> {}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.name,
            record.old_version,
            record.new_version,
        );
    }
    out
}

pub fn options(options: &OptionsResponse) -> String {
    let entities = if options.auto_update_entities.is_empty() {
        "(none)".to_string()
    } else {
        options.auto_update_entities.join(", ")
    };
    format!(
        "auto_update_time:     {}\nauto_update_entities: {}\nauto_restart:         {}\n",
        options.auto_update_time, entities, options.auto_restart
    )
}

/// One line per streamed event
pub fn event(event: &UpdaterEvent) -> String {
    match event {
        UpdaterEvent::SnapshotRefreshed { count } => format!("snapshot refreshed: {count} pending"),
        UpdaterEvent::UpdateApplied { entity_id, record } => format!(
            "updated {entity_id}: {} -> {}",
            record.old_version, record.new_version
        ),
        UpdaterEvent::UpdateUnchanged { entity_id, version } => {
            format!("{entity_id} still at {version}")
        }
        UpdaterEvent::AutoUpdateStarted { entities } => {
            format!("auto-update started: {}", entities.join(", "))
        }
        UpdaterEvent::RestartScheduled { delay_secs } => {
            format!("host restart in {delay_secs}s")
        }
        UpdaterEvent::IntegrationReloaded => "integration reloaded".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone, Utc};
    use smartupd_api::UpdateCandidate;

    use super::*;

    fn record() -> HistoryRecord {
        let tz = FixedOffset::east_opt(3600).unwrap();
        HistoryRecord {
            name: "Mushroom".to_string(),
            old_version: "3.2.0".to_string(),
            new_version: "3.3.0".to_string(),
            timestamp: tz.with_ymd_and_hms(2024, 5, 1, 3, 0, 12).unwrap(),
        }
    }

    #[test]
    fn test_snapshot_table() {
        let snap = SensorSnapshot::new(
            vec![UpdateCandidate {
                name: "Mushroom".to_string(),
                entity_id: "update.mushroom_update".to_string(),
                installed_version: None,
                latest_version: "3.3.0".to_string(),
            }],
            Utc.with_ymd_and_hms(2024, 5, 1, 1, 0, 0).unwrap(),
        );
        let text = snapshot(&snap);
        assert!(text.contains("update.mushroom_update"));
        assert!(text.contains("- -> 3.3.0"));
        assert!(text.contains("1 pending, refreshed 2024-05-01 01:00:00 UTC"));
    }

    #[test]
    fn test_empty_snapshot() {
        let snap = SensorSnapshot::new(Vec::new(), Utc::now());
        assert!(snapshot(&snap).starts_with("No pending updates"));
    }

    #[test]
    fn test_history_uses_local_offset_time() {
        let text = history(&[record()]);
        assert!(text.contains("2024-05-01 03:00:12"));
        assert!(text.contains("3.2.0 -> 3.3.0"));
    }

    #[test]
    fn test_options_without_entities() {
        let text = options(&OptionsResponse {
            auto_update_time: "03:00:00".to_string(),
            auto_update_entities: Vec::new(),
            auto_restart: false,
        });
        assert!(text.contains("(none)"));
    }

    #[test]
    fn test_event_lines() {
        assert_eq!(
            event(&UpdaterEvent::UpdateApplied {
                entity_id: "update.mushroom_update".to_string(),
                record: record(),
            }),
            "updated update.mushroom_update: 3.2.0 -> 3.3.0"
        );
        assert_eq!(
            event(&UpdaterEvent::RestartScheduled { delay_secs: 60 }),
            "host restart in 60s"
        );
    }
}
