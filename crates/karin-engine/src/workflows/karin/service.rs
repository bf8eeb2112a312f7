use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::audit::{self, AuditError};
use super::checklist::{ChecklistStats, ComplianceChecklist, ComplianceItem};
use super::deadline::DeadlineCalculator;
use super::domain::{CaseId, KarinCase, KarinProcess, RegisteredDocument};
use super::events::KarinEvent;
use super::folio::{CounterStore, Folio, FolioAllocator};
use super::gate::ComplianceGate;
use super::ledger::{
    Authority, LedgerError, NotificationDraft, NotificationRecord, NotificationStatus,
};
use super::repository::{ActorDirectory, CaseStore, NotificationDispatcher, StoreError};
use super::stage::Stage;
use super::tracker::{Deadline, DeadlineStatus, DeadlineTracker};
use super::transition::{Actor, AdvanceRequest, StageChange, StageData, TransitionError};
use super::updates::{ProcessError, ProcessUpdate};

/// Service composing the gate, deadline calculator, folio allocator and the
/// persistence and notification collaborators.
pub struct KarinProcessService<S, C, N, D> {
    cases: Arc<S>,
    folios: FolioAllocator<C>,
    dispatcher: Arc<N>,
    directory: Arc<D>,
    gate: ComplianceGate,
    calculator: Arc<DeadlineCalculator>,
    checklist: ComplianceChecklist,
}

/// Current position of a process on the procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageInfo {
    pub case_id: CaseId,
    pub stage: Stage,
    pub label: &'static str,
    pub description: &'static str,
    pub status_label: String,
    pub step: u8,
    pub final_step: u8,
    pub progress_percent: u8,
    pub started_on: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    pub can_advance: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplianceStatus {
    pub case_id: CaseId,
    pub stage: Stage,
    pub items: Vec<ComplianceItem>,
    pub stats: ChecklistStats,
}

impl<S, C, N, D> KarinProcessService<S, C, N, D>
where
    S: CaseStore + 'static,
    C: CounterStore + 'static,
    N: NotificationDispatcher + 'static,
    D: ActorDirectory + 'static,
{
    pub fn new(
        cases: Arc<S>,
        counters: Arc<C>,
        dispatcher: Arc<N>,
        directory: Arc<D>,
        calculator: DeadlineCalculator,
    ) -> Self {
        Self {
            cases,
            folios: FolioAllocator::new(counters),
            dispatcher,
            directory,
            gate: ComplianceGate,
            calculator: Arc::new(calculator),
            checklist: ComplianceChecklist,
        }
    }

    pub fn calculator(&self) -> &DeadlineCalculator {
        &self.calculator
    }

    /// Start the Ley Karin procedure on a case flagged for it.
    pub fn open_process(
        &self,
        case_id: &CaseId,
        on: NaiveDate,
    ) -> Result<KarinProcess, ServiceError> {
        let (_, process) = self.mutate(case_id, |case| {
            if !case.is_karin_case {
                return Err(ServiceError::NotKarinCase(case.id.clone()));
            }
            if case.process.is_some() {
                return Err(ServiceError::AlreadyOpened(case.id.clone()));
            }
            let process = KarinProcess::open(on);
            case.process = Some(process.clone());
            Ok(process)
        })?;

        info!(case_id = %case_id, created_on = %on, "ley karin process opened");
        Ok(process)
    }

    /// Move the case to its next stage, or explain which requirement blocks it.
    pub fn advance_stage(
        &self,
        case_id: &CaseId,
        actor_id: &str,
        notes: Option<String>,
        on: NaiveDate,
        data: StageData,
    ) -> Result<StageChange, ServiceError> {
        let actor = self.actor(actor_id);
        let result = self.mutate(case_id, |case| {
            let request = AdvanceRequest {
                actor: actor.clone(),
                on,
                notes: notes.clone(),
                data: data.clone(),
            };
            let change = process_mut(case)?.advance(request, &self.gate, &self.calculator)?;
            Ok(change)
        });

        let (_, change) = match result {
            Ok(outcome) => outcome,
            Err(ServiceError::Transition(err)) => {
                info!(case_id = %case_id, reason = %err, "stage advance refused");
                return Err(ServiceError::Transition(err));
            }
            Err(err) => return Err(err),
        };

        info!(
            case_id = %case_id,
            from = %change.from,
            to = %change.to,
            deadline = %change.deadline,
            actor_id,
            "stage advanced"
        );
        self.emit(KarinEvent::StageAdvanced {
            case_id: case_id.clone(),
            from: change.from,
            to: change.to,
            actor_id: actor.id.clone(),
            deadline: change.deadline,
        });
        if change.to == Stage::ReportApproval {
            self.emit(KarinEvent::ReportReviewRequired {
                case_id: case_id.clone(),
                deadline: change.deadline,
            });
        }

        Ok(change)
    }

    /// Send the complaint back for correction from reception.
    pub fn enter_subsanation(
        &self,
        case_id: &CaseId,
        actor_id: &str,
        notes: Option<String>,
        on: NaiveDate,
    ) -> Result<StageChange, ServiceError> {
        let actor = self.actor(actor_id);
        let (_, change) = self.mutate(case_id, |case| {
            let change =
                process_mut(case)?.enter_subsanation(&actor, notes.clone(), on, &self.calculator)?;
            Ok(change)
        })?;

        info!(case_id = %case_id, deadline = %change.deadline, "subsanation requested");
        self.emit(KarinEvent::SubsanationRequested {
            case_id: case_id.clone(),
            actor_id: actor.id,
            deadline: change.deadline,
        });
        Ok(change)
    }

    /// Apply a sub-operation such as recording an interview or extending the
    /// investigation.
    pub fn apply_update(
        &self,
        case_id: &CaseId,
        update: ProcessUpdate,
    ) -> Result<KarinProcess, ServiceError> {
        let kind = update.kind();
        let (case, _) = self.mutate(case_id, |case| {
            process_mut(case)?.apply(update.clone(), &self.calculator)?;
            Ok(())
        })?;

        debug!(case_id = %case_id, update = kind, "process updated");
        owned_process(case)
    }

    pub fn record_notification(
        &self,
        case_id: &CaseId,
        authority: Authority,
        draft: NotificationDraft,
    ) -> Result<NotificationRecord, ServiceError> {
        let notified_by_name = self
            .directory
            .resolve_display_name(&draft.notified_by)
            .unwrap_or_else(|| draft.notified_by.clone());

        let (_, record) = self.mutate(case_id, |case| {
            let record = process_mut(case)?.notifications.append(
                authority,
                draft.clone(),
                notified_by_name.clone(),
            );
            Ok(record.clone())
        })?;

        info!(
            case_id = %case_id,
            authority = %authority,
            record_id = %record.id,
            "authority notification recorded"
        );
        self.emit(KarinEvent::NotificationRecorded {
            case_id: case_id.clone(),
            authority,
            record_id: record.id.clone(),
            status: record.status,
        });
        Ok(record)
    }

    pub fn update_notification_status(
        &self,
        case_id: &CaseId,
        authority: Authority,
        record_id: &str,
        status: NotificationStatus,
    ) -> Result<NotificationRecord, ServiceError> {
        let (_, record) = self.mutate(case_id, |case| {
            let record = process_mut(case)?
                .notifications
                .update_status(authority, record_id, status)?;
            Ok(record.clone())
        })?;

        info!(
            case_id = %case_id,
            authority = %authority,
            record_id,
            status = status.label(),
            "notification status updated"
        );
        Ok(record)
    }

    /// Issue a folio for a document of the case without registering it.
    pub fn allocate_folio(
        &self,
        case_id: &CaseId,
        document_type: &str,
    ) -> Result<Folio, ServiceError> {
        let stored = self.cases.load_case(case_id)?;
        let case = stored.case;
        if !case.is_karin_case {
            return Err(ServiceError::NotKarinCase(case.id));
        }
        Ok(self.folios.allocate(&case.company_id, &case.code, document_type))
    }

    /// Issue a folio and attach the document to the process. The folio is
    /// allocated once even if the save has to be retried, and only after the
    /// process is known to accept documents.
    pub fn register_document(
        &self,
        case_id: &CaseId,
        document_type: &str,
        title: &str,
        on: NaiveDate,
    ) -> Result<RegisteredDocument, ServiceError> {
        let case = self.cases.load_case(case_id)?.case;
        let (company_id, case_code) = (case.company_id.clone(), case.code.clone());
        if owned_process(case)?.is_closed() {
            return Err(ProcessError::Closed.into());
        }

        let folio = self.folios.allocate(&company_id, &case_code, document_type);
        let document = RegisteredDocument {
            folio: folio.value,
            document_type: document_type.to_string(),
            title: title.to_string(),
            registered_on: on,
            degraded_folio: folio.degraded,
        };

        self.mutate(case_id, |case| {
            let process = process_mut(case)?;
            if process.is_closed() {
                return Err(ProcessError::Closed.into());
            }
            process.documents.push(document.clone());
            Ok(())
        })?;

        info!(case_id = %case_id, folio = %document.folio, "document registered");
        Ok(document)
    }

    pub fn audit_export(&self, case_id: &CaseId) -> Result<String, ServiceError> {
        let process = self.load_process(case_id)?;
        Ok(audit::export_csv(&process)?)
    }

    /// Deadlines relevant to the current stage. Urgent and overdue ones are
    /// also pushed to the dispatcher.
    pub fn active_deadlines(
        &self,
        case_id: &CaseId,
        now: NaiveDate,
    ) -> Result<Vec<Deadline>, ServiceError> {
        let process = self.load_process(case_id)?;
        let deadlines = DeadlineTracker::new(&self.calculator).active_deadlines(&process, now);

        for deadline in deadlines.iter().filter(|deadline| deadline.is_urgent) {
            let overdue = deadline.status == DeadlineStatus::Overdue;
            if overdue {
                warn!(
                    case_id = %case_id,
                    milestone = deadline.key,
                    end_date = %deadline.end_date,
                    "statutory deadline overdue"
                );
            }
            self.emit(KarinEvent::DeadlineUrgent {
                case_id: case_id.clone(),
                milestone: deadline.key.to_string(),
                end_date: deadline.end_date,
                days_remaining: deadline.days_remaining,
                overdue,
            });
        }

        Ok(deadlines)
    }

    /// Every milestone, for dashboards.
    pub fn all_deadlines(
        &self,
        case_id: &CaseId,
        now: NaiveDate,
    ) -> Result<Vec<Deadline>, ServiceError> {
        let process = self.load_process(case_id)?;
        Ok(DeadlineTracker::new(&self.calculator).track_all(&process, now))
    }

    pub fn compliance_status(&self, case_id: &CaseId) -> Result<ComplianceStatus, ServiceError> {
        let process = self.load_process(case_id)?;
        let (items, stats) = self.checklist.evaluate(&process);
        Ok(ComplianceStatus {
            case_id: case_id.clone(),
            stage: process.stage,
            items,
            stats,
        })
    }

    pub fn stage_info(&self, case_id: &CaseId) -> Result<StageInfo, ServiceError> {
        let process = self.load_process(case_id)?;
        let stage = process.stage;
        let blocked_by = if process.is_closed() {
            None
        } else {
            self.gate
                .check(stage, &process)
                .err()
                .map(|err| err.to_string())
        };

        Ok(StageInfo {
            case_id: case_id.clone(),
            stage,
            label: stage.label(),
            description: stage.description(),
            status_label: process.status_label.clone(),
            step: stage.step(),
            final_step: Stage::final_step(),
            progress_percent: stage.progress_percent(),
            started_on: process.current_stage_started_on(),
            deadline: process.deadline(stage),
            can_advance: !process.is_closed() && blocked_by.is_none(),
            blocked_by,
        })
    }

    pub fn process(&self, case_id: &CaseId) -> Result<KarinProcess, ServiceError> {
        self.load_process(case_id)
    }

    fn load_process(&self, case_id: &CaseId) -> Result<KarinProcess, ServiceError> {
        let stored = self.cases.load_case(case_id)?;
        owned_process(stored.case)
    }

    fn actor(&self, actor_id: &str) -> Actor {
        let name = self
            .directory
            .resolve_display_name(actor_id)
            .unwrap_or_else(|| actor_id.to_string());
        Actor {
            id: actor_id.to_string(),
            name,
        }
    }

    fn emit(&self, event: KarinEvent) {
        let name = event.name();
        if let Err(err) = self.dispatcher.notify(event) {
            warn!(event = name, error = %err, "karin event dispatch failed");
        }
    }

    /// Load, change and save the case as one read-modify-write. A version
    /// conflict reloads and re-applies once before giving up.
    fn mutate<T, F>(&self, case_id: &CaseId, mut change: F) -> Result<(KarinCase, T), ServiceError>
    where
        F: FnMut(&mut KarinCase) -> Result<T, ServiceError>,
    {
        let mut retried = false;
        loop {
            let stored = self.cases.load_case(case_id)?;
            let mut case = stored.case;
            let output = change(&mut case)?;

            match self.cases.save_case(case.clone(), Some(stored.version)) {
                Ok(_) => return Ok((case, output)),
                Err(StoreError::Conflict { .. }) if !retried => {
                    warn!(case_id = %case_id, "case modified concurrently; retrying once");
                    retried = true;
                }
                Err(StoreError::Conflict { .. }) => {
                    return Err(ServiceError::ConcurrentModification(case_id.clone()));
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn process_mut(case: &mut KarinCase) -> Result<&mut KarinProcess, ServiceError> {
    if !case.is_karin_case {
        return Err(ServiceError::NotKarinCase(case.id.clone()));
    }
    let id = case.id.clone();
    case.process
        .as_mut()
        .ok_or(ServiceError::ProcessNotOpened(id))
}

fn owned_process(case: KarinCase) -> Result<KarinProcess, ServiceError> {
    if !case.is_karin_case {
        return Err(ServiceError::NotKarinCase(case.id));
    }
    case.process.ok_or(ServiceError::ProcessNotOpened(case.id))
}

/// Error raised by the process service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Audit(#[from] AuditError),
    #[error("case {0} is not a Ley Karin case")]
    NotKarinCase(CaseId),
    #[error("case {0} has no Ley Karin process yet")]
    ProcessNotOpened(CaseId),
    #[error("case {0} already has a Ley Karin process")]
    AlreadyOpened(CaseId),
    #[error("case {0} was modified concurrently; reload and try again")]
    ConcurrentModification(CaseId),
}
