use chrono::NaiveDate;
use serde::Serialize;

use super::domain::KarinProcess;
use super::ledger::Authority;

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("failed to write audit row: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush audit export: {0}")]
    Flush(String),
}

#[derive(Debug, Serialize)]
struct AuditRow<'a> {
    record_type: &'static str,
    date: NaiveDate,
    stage: &'a str,
    authority: &'a str,
    record_id: &'a str,
    actor: &'a str,
    status: &'a str,
    notes: &'a str,
}

/// Stage history followed by every authority notification, as CSV.
pub fn export_csv(process: &KarinProcess) -> Result<String, AuditError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    for entry in &process.stage_history {
        writer.serialize(AuditRow {
            record_type: "stage_transition",
            date: entry.date,
            stage: entry.stage.key(),
            authority: "",
            record_id: "",
            actor: &entry.actor_name,
            status: entry.stage.label(),
            notes: entry.notes.as_deref().unwrap_or(""),
        })?;
    }

    for authority in Authority::ALL {
        for record in process.notifications.records(authority) {
            writer.serialize(AuditRow {
                record_type: "authority_notification",
                date: record.date,
                stage: "",
                authority: authority.key(),
                record_id: &record.id,
                actor: &record.notified_by_name,
                status: record.status.label(),
                notes: record.tracking_number.as_deref().unwrap_or(""),
            })?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| AuditError::Flush(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| AuditError::Flush(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::karin::domain::StageHistoryEntry;
    use crate::workflows::karin::ledger::{NotificationDraft, NotificationMethod};
    use crate::workflows::karin::stage::Stage;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn exports_history_then_notifications() {
        let mut process = KarinProcess::open(date(2024, 3, 4));
        process.stage_history.push(StageHistoryEntry {
            stage: Stage::ComplaintFiled,
            date: date(2024, 3, 4),
            actor_id: "usr-1".to_string(),
            actor_name: "María González".to_string(),
            notes: Some("Denuncia por correo, con anexos".to_string()),
        });
        process.notifications.append(
            Authority::Dt,
            NotificationDraft {
                date: date(2024, 4, 10),
                method: NotificationMethod::Sistema,
                contact_person: None,
                tracking_number: Some("DT-2024-991".to_string()),
                document_id: None,
                proof_of_delivery_id: None,
                status: None,
                notified_by: "usr-1".to_string(),
                notified_by_name: None,
            },
            "María González".to_string(),
        );

        let csv = export_csv(&process).expect("export");
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "record_type,date,stage,authority,record_id,actor,status,notes"
        );
        assert!(lines[1].starts_with("stage_transition,2024-03-04,complaint_filed,"));
        assert!(lines[1].ends_with("\"Denuncia por correo, con anexos\""));
        assert!(lines[2].starts_with("authority_notification,2024-04-10,,dt,dt-001,"));
        assert_eq!(lines.len(), 3);
    }
}
