use super::deadline::DeadlineCalculator;
use super::domain::{
    DtResolution, FinalReport, InvestigationPlan, InvestigationReport, KarinProcess,
    StageHistoryEntry,
};
use super::gate::{ComplianceError, ComplianceGate};
use super::stage::{Stage, UnknownStage};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidTransition {
    #[error("the process is closed and cannot advance")]
    Terminal,
    #[error(transparent)]
    UnknownStage(#[from] UnknownStage),
    #[error("subsanation can only be requested from reception, not from {}", .from.key())]
    SubsanationNotAllowed { from: Stage },
    #[error("no statutory deadline can be computed from {date}")]
    DateOutOfRange { date: NaiveDate },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot advance: {0}")]
    Compliance(#[from] ComplianceError),
    #[error("invalid transition: {0}")]
    Invalid(#[from] InvalidTransition),
}

/// Who performed an action, as written into the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub name: String,
}

/// Stage-specific data merged into the process after a successful advance.
/// Only the fields that are present are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageData {
    #[serde(default)]
    pub investigation_plan: Option<InvestigationPlan>,
    #[serde(default)]
    pub report: Option<InvestigationReport>,
    #[serde(default)]
    pub final_report: Option<FinalReport>,
    #[serde(default)]
    pub dt_resolution: Option<DtResolution>,
}

impl StageData {
    fn merge_into(self, process: &mut KarinProcess) {
        if let Some(plan) = self.investigation_plan {
            process.investigation_plan = Some(plan);
        }
        if let Some(report) = self.report {
            process.report = Some(report);
        }
        if let Some(final_report) = self.final_report {
            process.final_report = Some(final_report);
        }
        if let Some(resolution) = self.dt_resolution {
            process.dt_resolution = Some(resolution);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvanceRequest {
    pub actor: Actor,
    pub on: NaiveDate,
    pub notes: Option<String>,
    pub data: StageData,
}

/// Outcome of a stage change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageChange {
    pub from: Stage,
    pub to: Stage,
    pub entered_on: NaiveDate,
    pub deadline: NaiveDate,
}

impl KarinProcess {
    /// Move to the next stage if the gate allows it. On error the process is
    /// left exactly as it was.
    pub fn advance(
        &mut self,
        request: AdvanceRequest,
        gate: &ComplianceGate,
        calculator: &DeadlineCalculator,
    ) -> Result<StageChange, TransitionError> {
        let next = gate.authorize(self)?;
        let change = self.enter(next, &request.actor, request.notes, request.on, calculator)?;
        request.data.merge_into(self);
        Ok(change)
    }

    /// Branch into subsanation when the complaint needs to be corrected.
    pub fn enter_subsanation(
        &mut self,
        actor: &Actor,
        notes: Option<String>,
        on: NaiveDate,
        calculator: &DeadlineCalculator,
    ) -> Result<StageChange, TransitionError> {
        if self.stage != Stage::Reception {
            return Err(InvalidTransition::SubsanationNotAllowed { from: self.stage }.into());
        }
        self.enter(Stage::Subsanation, actor, notes, on, calculator)
    }

    fn enter(
        &mut self,
        next: Stage,
        actor: &Actor,
        notes: Option<String>,
        on: NaiveDate,
        calculator: &DeadlineCalculator,
    ) -> Result<StageChange, TransitionError> {
        let entered_on = self.stage_dates.get(&next).copied().unwrap_or(on);
        let deadline = match self.deadlines.get(&next) {
            Some(deadline) => *deadline,
            None => calculator
                .checked_deadline_for(next, entered_on, self.investigation_extended)
                .ok_or(InvalidTransition::DateOutOfRange { date: entered_on })?,
        };

        let previous = self.stage;
        self.stage_history.push(StageHistoryEntry {
            stage: previous,
            date: on,
            actor_id: actor.id.clone(),
            actor_name: actor.name.clone(),
            notes,
        });
        self.stage = next;
        self.stage_dates.insert(next, entered_on);
        self.deadlines.insert(next, deadline);
        self.status_label = next.status_label().to_string();

        Ok(StageChange {
            from: previous,
            to: next,
            entered_on,
            deadline,
        })
    }
}
