use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::CaseId;
use super::ledger::{Authority, NotificationStatus};
use super::stage::Stage;

/// Semantic events emitted by the engine. Delivery belongs to the
/// dispatcher; the engine never waits on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum KarinEvent {
    StageAdvanced {
        case_id: CaseId,
        from: Stage,
        to: Stage,
        actor_id: String,
        deadline: NaiveDate,
    },
    SubsanationRequested {
        case_id: CaseId,
        actor_id: String,
        deadline: NaiveDate,
    },
    ReportReviewRequired {
        case_id: CaseId,
        deadline: NaiveDate,
    },
    DeadlineUrgent {
        case_id: CaseId,
        milestone: String,
        end_date: NaiveDate,
        days_remaining: i64,
        overdue: bool,
    },
    NotificationRecorded {
        case_id: CaseId,
        authority: Authority,
        record_id: String,
        status: NotificationStatus,
    },
}

impl KarinEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::StageAdvanced { .. } => "stage_advanced",
            Self::SubsanationRequested { .. } => "subsanation_requested",
            Self::ReportReviewRequired { .. } => "report_review_required",
            Self::DeadlineUrgent { .. } => "deadline_urgent",
            Self::NotificationRecorded { .. } => "notification_recorded",
        }
    }

    pub fn case_id(&self) -> &CaseId {
        match self {
            Self::StageAdvanced { case_id, .. }
            | Self::SubsanationRequested { case_id, .. }
            | Self::ReportReviewRequired { case_id, .. }
            | Self::DeadlineUrgent { case_id, .. }
            | Self::NotificationRecorded { case_id, .. } => case_id,
        }
    }
}
