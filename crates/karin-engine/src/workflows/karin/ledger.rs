use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Authorities that must be notified during a Ley Karin procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authority {
    /// Dirección del Trabajo.
    Dt,
    /// SUSESO or the employer's mutual insurer.
    Suseso,
    /// Inspección del Trabajo.
    Inspection,
}

impl Authority {
    pub const ALL: [Self; 3] = [Self::Dt, Self::Suseso, Self::Inspection];

    pub const fn key(self) -> &'static str {
        match self {
            Self::Dt => "dt",
            Self::Suseso => "suseso",
            Self::Inspection => "inspection",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Dt => "Dirección del Trabajo",
            Self::Suseso => "SUSESO / Mutualidad",
            Self::Inspection => "Inspección del Trabajo",
        }
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown authority '{0}'")]
pub struct UnknownAuthority(pub String);

impl FromStr for Authority {
    type Err = UnknownAuthority;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dt" => Ok(Self::Dt),
            "suseso" | "mutualidad" => Ok(Self::Suseso),
            "inspection" | "inspeccion" => Ok(Self::Inspection),
            other => Err(UnknownAuthority(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationMethod {
    Email,
    Presencial,
    CartaCertificada,
    Sistema,
}

/// Delivery status. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pendiente,
    Enviada,
    Recibida,
    Respondida,
}

impl NotificationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pendiente => "pendiente",
            Self::Enviada => "enviada",
            Self::Recibida => "recibida",
            Self::Respondida => "respondida",
        }
    }

    pub fn can_move_to(self, next: Self) -> bool {
        next > self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    pub date: NaiveDate,
    pub method: NotificationMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_person: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_of_delivery_id: Option<String>,
    pub status: NotificationStatus,
    pub notified_by: String,
    pub notified_by_name: String,
}

/// Caller-supplied fields of a new notification; the ledger assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDraft {
    pub date: NaiveDate,
    pub method: NotificationMethod,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub proof_of_delivery_id: Option<String>,
    #[serde(default)]
    pub status: Option<NotificationStatus>,
    pub notified_by: String,
    #[serde(default)]
    pub notified_by_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("notification {id} not found in the {authority} ledger")]
    NotFound { authority: Authority, id: String },
    #[error("notification {id} can only move forward, not from {} to {}", .from.label(), .to.label())]
    BackwardTransition {
        id: String,
        from: NotificationStatus,
        to: NotificationStatus,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityLog {
    #[serde(default)]
    pub records: Vec<NotificationRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_notification_date: Option<NaiveDate>,
}

/// Append-only notification ledger, one list per authority.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityNotifications {
    #[serde(default)]
    pub dt: AuthorityLog,
    #[serde(default)]
    pub suseso: AuthorityLog,
    #[serde(default)]
    pub inspection: AuthorityLog,
}

impl AuthorityNotifications {
    pub fn log(&self, authority: Authority) -> &AuthorityLog {
        match authority {
            Authority::Dt => &self.dt,
            Authority::Suseso => &self.suseso,
            Authority::Inspection => &self.inspection,
        }
    }

    fn log_mut(&mut self, authority: Authority) -> &mut AuthorityLog {
        match authority {
            Authority::Dt => &mut self.dt,
            Authority::Suseso => &mut self.suseso,
            Authority::Inspection => &mut self.inspection,
        }
    }

    pub fn records(&self, authority: Authority) -> &[NotificationRecord] {
        &self.log(authority).records
    }

    pub fn initial_notification_date(&self, authority: Authority) -> Option<NaiveDate> {
        self.log(authority).initial_notification_date
    }

    /// Record a notification. The first record for an authority also stamps
    /// its initial notification date; later ones leave it alone.
    pub fn append(
        &mut self,
        authority: Authority,
        draft: NotificationDraft,
        notified_by_name: String,
    ) -> &NotificationRecord {
        let log = self.log_mut(authority);
        let id = format!("{}-{:03}", authority.key(), log.records.len() + 1);

        if log.initial_notification_date.is_none() {
            log.initial_notification_date = Some(draft.date);
        }

        log.records.push(NotificationRecord {
            id,
            date: draft.date,
            method: draft.method,
            contact_person: draft.contact_person,
            tracking_number: draft.tracking_number,
            document_id: draft.document_id,
            proof_of_delivery_id: draft.proof_of_delivery_id,
            status: draft.status.unwrap_or(NotificationStatus::Enviada),
            notified_by: draft.notified_by,
            notified_by_name: draft.notified_by_name.unwrap_or(notified_by_name),
        });

        &log.records[log.records.len() - 1]
    }

    pub fn update_status(
        &mut self,
        authority: Authority,
        record_id: &str,
        status: NotificationStatus,
    ) -> Result<&NotificationRecord, LedgerError> {
        let record = self
            .log_mut(authority)
            .records
            .iter_mut()
            .find(|record| record.id == record_id)
            .ok_or_else(|| LedgerError::NotFound {
                authority,
                id: record_id.to_string(),
            })?;

        if !record.status.can_move_to(status) {
            return Err(LedgerError::BackwardTransition {
                id: record.id.clone(),
                from: record.status,
                to: status,
            });
        }

        record.status = status;
        Ok(record)
    }
}
