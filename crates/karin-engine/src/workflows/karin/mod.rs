//! Ley Karin (Ley 21.643) investigation procedure: statutory stages, deadlines
//! on a business-day calendar, compliance gating, authority notifications and
//! document folios.

pub mod audit;
pub mod calendar;
pub mod checklist;
pub mod deadline;
pub mod domain;
pub mod events;
pub mod folio;
mod gate;
pub mod ledger;
pub mod repository;
pub mod router;
pub mod service;
pub mod stage;
pub mod tracker;
mod transition;
mod updates;

#[cfg(test)]
mod tests;

pub use audit::{export_csv, AuditError};
pub use calendar::{BusinessCalendar, DayCountMode};
pub use checklist::{
    ChecklistStats, ComplianceCategory, ComplianceChecklist, ComplianceItem, Priority,
};
pub use deadline::{DeadlineCalculator, StatuteParameters, StatutoryTerm};
pub use domain::{
    AdoptedMeasure, CaseId, DtResolution, FinalReport, Interview, InvestigationPlan,
    InvestigationReport, KarinCase, KarinProcess, MeasureStatus, RegisteredDocument,
    ReportRevision, RevisionStatus, SignatureState, StageHistoryEntry, Testimony,
};
pub use events::KarinEvent;
pub use folio::{CounterError, CounterStore, Folio, FolioAllocator, InMemoryCounterStore};
pub use gate::{ComplianceError, ComplianceGate};
pub use ledger::{
    Authority, AuthorityNotifications, LedgerError, NotificationDraft, NotificationMethod,
    NotificationRecord, NotificationStatus, UnknownAuthority,
};
pub use repository::{
    ActorDirectory, CaseStore, DispatchError, InMemoryCaseStore, NotificationDispatcher,
    StoreError, StoredCase,
};
pub use router::{karin_router, status_for};
pub use service::{ComplianceStatus, KarinProcessService, ServiceError, StageInfo};
pub use stage::{Stage, UnknownStage};
pub use tracker::{Deadline, DeadlineStatus, DeadlineTracker, Milestone, MILESTONES};
pub use transition::{
    Actor, AdvanceRequest, InvalidTransition, StageChange, StageData, TransitionError,
};
pub use updates::{ProcessError, ProcessUpdate};
