use super::domain::KarinProcess;
use super::ledger::Authority;
use super::stage::Stage;
use super::transition::{InvalidTransition, TransitionError};

/// Unmet requirement that blocks leaving a stage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComplianceError {
    #[error("the complainant must be informed of their rights before leaving reception")]
    RightsNotInformed,
    #[error("at least one precautionary measure must be selected")]
    NoPrecautionaryMeasures,
    #[error("an investigation plan is required before the investigation starts")]
    MissingInvestigationPlan,
    #[error("at least one interview must be recorded")]
    NoInterviews,
    #[error("testimonies awaiting signature: {}", .pending.join(", "))]
    UnsignedTestimonies { pending: Vec<String> },
    #[error("the investigation report has not been drafted")]
    MissingReport,
    #[error("the investigation report has not been approved")]
    ReportNotApproved,
    #[error("the final report has not been issued")]
    MissingFinalReport,
    #[error("{} has not been notified", .0.label())]
    AuthorityNotNotified(Authority),
}

/// Per-stage advancement rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplianceGate;

impl ComplianceGate {
    /// Check whether `stage` may be left given the process data. Stages
    /// without a rule always pass.
    pub fn check(&self, stage: Stage, process: &KarinProcess) -> Result<(), ComplianceError> {
        match stage {
            Stage::Reception if !process.informed_rights => Err(ComplianceError::RightsNotInformed),
            Stage::PrecautionaryMeasures if process.precautionary_measures.is_empty() => {
                Err(ComplianceError::NoPrecautionaryMeasures)
            }
            Stage::DecisionToInvestigate if process.investigation_plan.is_none() => {
                Err(ComplianceError::MissingInvestigationPlan)
            }
            Stage::Investigation => check_investigation(process),
            Stage::ReportCreation if process.report.is_none() => {
                Err(ComplianceError::MissingReport)
            }
            Stage::ReportApproval if !process.report_approved => {
                Err(ComplianceError::ReportNotApproved)
            }
            Stage::DtNotification => check_notified(process, Authority::Dt),
            Stage::SusesoNotification => check_notified(process, Authority::Suseso),
            Stage::FinalReport if process.final_report.is_none() => {
                Err(ComplianceError::MissingFinalReport)
            }
            _ => Ok(()),
        }
    }

    pub fn can_advance(&self, stage: Stage, process: &KarinProcess) -> bool {
        self.check(stage, process).is_ok()
    }

    /// Validate leaving the current stage and return its successor.
    pub fn authorize(&self, process: &KarinProcess) -> Result<Stage, TransitionError> {
        if process.is_closed() {
            return Err(InvalidTransition::Terminal.into());
        }
        self.check(process.stage, process)?;
        Ok(process.stage.next())
    }
}

fn check_investigation(process: &KarinProcess) -> Result<(), ComplianceError> {
    if process.interviews.is_empty() {
        return Err(ComplianceError::NoInterviews);
    }

    let pending: Vec<String> = process
        .testimonies
        .iter()
        .filter(|testimony| !testimony.has_signed())
        .map(|testimony| testimony.id.clone())
        .collect();
    if !pending.is_empty() {
        return Err(ComplianceError::UnsignedTestimonies { pending });
    }

    Ok(())
}

fn check_notified(process: &KarinProcess, authority: Authority) -> Result<(), ComplianceError> {
    match process.notifications.initial_notification_date(authority) {
        Some(_) => Ok(()),
        None => Err(ComplianceError::AuthorityNotNotified(authority)),
    }
}
