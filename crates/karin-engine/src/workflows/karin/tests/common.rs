use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::to_bytes;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::karin::domain::{
    CaseId, Interview, InvestigationPlan, InvestigationReport, KarinCase, SignatureState,
    Testimony,
};
use crate::workflows::karin::events::KarinEvent;
use crate::workflows::karin::folio::{CounterError, CounterStore, InMemoryCounterStore};
use crate::workflows::karin::repository::{
    ActorDirectory, CaseStore, DispatchError, InMemoryCaseStore, NotificationDispatcher,
    StoreError, StoredCase,
};
use crate::workflows::karin::{DeadlineCalculator, KarinProcessService, ProcessUpdate, StageData};

pub(super) const CASE: &str = "case-1";
pub(super) const INVESTIGATOR: &str = "usr-inv";

pub(super) type TestService =
    KarinProcessService<InMemoryCaseStore, InMemoryCounterStore, MemoryDispatcher, StaticDirectory>;

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(super) fn case_id() -> CaseId {
    CaseId(CASE.to_string())
}

pub(super) fn karin_case(id: &str) -> KarinCase {
    KarinCase {
        id: CaseId(id.to_string()),
        code: "ABC12345".to_string(),
        company_id: "acme".to_string(),
        is_karin_case: true,
        process: None,
    }
}

pub(super) fn build_service() -> (TestService, Arc<InMemoryCaseStore>, Arc<MemoryDispatcher>) {
    let store = Arc::new(InMemoryCaseStore::new());
    store.insert(karin_case(CASE)).expect("seed case");
    let dispatcher = Arc::new(MemoryDispatcher::default());
    let service = KarinProcessService::new(
        store.clone(),
        Arc::new(InMemoryCounterStore::new()),
        dispatcher.clone(),
        Arc::new(StaticDirectory::default()),
        DeadlineCalculator::default(),
    );
    (service, store, dispatcher)
}

/// Opens the process on Monday 2023-12-18 and walks it, fully compliant,
/// into the investigation stage on 2024-01-02.
pub(super) fn walk_to_investigation<S, C, N, D>(service: &KarinProcessService<S, C, N, D>)
where
    S: CaseStore + 'static,
    C: CounterStore + 'static,
    N: NotificationDispatcher + 'static,
    D: ActorDirectory + 'static,
{
    let id = case_id();
    service.open_process(&id, date(2023, 12, 18)).expect("open");
    advance(service, date(2023, 12, 18));
    service
        .apply_update(&id, ProcessUpdate::InformRights)
        .expect("rights informed");
    advance(service, date(2023, 12, 19));
    service
        .apply_update(
            &id,
            ProcessUpdate::PrecautionaryMeasures {
                measures: vec!["separacion_espacios".to_string()],
                justification: Some("Comparten oficina".to_string()),
            },
        )
        .expect("measures");
    advance(service, date(2023, 12, 20));
    service
        .apply_update(
            &id,
            ProcessUpdate::InvestigationPlan {
                plan: InvestigationPlan {
                    investigator_id: INVESTIGATOR.to_string(),
                    summary: "Entrevistas a denunciante, denunciado y testigos".to_string(),
                    scheduled_interviews: vec!["Denunciante".to_string()],
                    referred_to_dt: false,
                },
            },
        )
        .expect("plan");
    advance(service, date(2024, 1, 2));
}

/// Continues from investigation into report approval on 2024-02-05.
pub(super) fn walk_to_report_approval<S, C, N, D>(service: &KarinProcessService<S, C, N, D>)
where
    S: CaseStore + 'static,
    C: CounterStore + 'static,
    N: NotificationDispatcher + 'static,
    D: ActorDirectory + 'static,
{
    let id = case_id();
    service
        .apply_update(
            &id,
            ProcessUpdate::Interview {
                interview: Interview {
                    id: "int-1".to_string(),
                    interviewee: "Denunciante".to_string(),
                    date: date(2024, 1, 10),
                    summary: "Relata hechos reiterados".to_string(),
                },
            },
        )
        .expect("interview");
    service
        .apply_update(
            &id,
            ProcessUpdate::Testimony {
                testimony: Testimony {
                    id: "tes-1".to_string(),
                    deponent: "Testigo".to_string(),
                    date: date(2024, 1, 11),
                    signature: SignatureState::Signed,
                },
            },
        )
        .expect("testimony");
    advance(service, date(2024, 2, 1));
    service
        .apply_update(
            &id,
            ProcessUpdate::Report {
                report: InvestigationReport {
                    author_id: INVESTIGATOR.to_string(),
                    drafted_on: date(2024, 2, 2),
                    conclusions: "Hechos acreditados".to_string(),
                    proposed_measures: vec!["Amonestación escrita".to_string()],
                },
            },
        )
        .expect("report");
    advance(service, date(2024, 2, 5));
}

pub(super) fn advance<S, C, N, D>(service: &KarinProcessService<S, C, N, D>, on: NaiveDate)
where
    S: CaseStore + 'static,
    C: CounterStore + 'static,
    N: NotificationDispatcher + 'static,
    D: ActorDirectory + 'static,
{
    service
        .advance_stage(&case_id(), INVESTIGATOR, None, on, StageData::default())
        .expect("advance allowed");
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}

#[derive(Default)]
pub(super) struct MemoryDispatcher {
    events: Mutex<Vec<KarinEvent>>,
}

impl MemoryDispatcher {
    pub(super) fn events(&self) -> Vec<KarinEvent> {
        self.events.lock().expect("dispatcher mutex poisoned").clone()
    }

    pub(super) fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(KarinEvent::name).collect()
    }
}

impl NotificationDispatcher for MemoryDispatcher {
    fn notify(&self, event: KarinEvent) -> Result<(), DispatchError> {
        self.events
            .lock()
            .expect("dispatcher mutex poisoned")
            .push(event);
        Ok(())
    }
}

pub(super) struct FailingDispatcher;

impl NotificationDispatcher for FailingDispatcher {
    fn notify(&self, _event: KarinEvent) -> Result<(), DispatchError> {
        Err(DispatchError::Transport("smtp offline".to_string()))
    }
}

pub(super) struct StaticDirectory {
    names: HashMap<String, String>,
}

impl Default for StaticDirectory {
    fn default() -> Self {
        let mut names = HashMap::new();
        names.insert(INVESTIGATOR.to_string(), "Carolina Rojas".to_string());
        names.insert("usr-hr".to_string(), "Pedro Soto".to_string());
        Self { names }
    }
}

impl ActorDirectory for StaticDirectory {
    fn resolve_display_name(&self, actor_id: &str) -> Option<String> {
        self.names.get(actor_id).cloned()
    }
}

/// Case store whose next `conflicts` saves lose the optimistic race.
pub(super) struct ConflictingStore {
    inner: InMemoryCaseStore,
    conflicts: AtomicUsize,
    pub(super) saves: AtomicUsize,
}

impl ConflictingStore {
    pub(super) fn new(conflicts: usize) -> Self {
        let inner = InMemoryCaseStore::new();
        inner.insert(karin_case(CASE)).expect("seed case");
        Self {
            inner,
            conflicts: AtomicUsize::new(conflicts),
            saves: AtomicUsize::new(0),
        }
    }

    pub(super) fn arm(&self, conflicts: usize) {
        self.conflicts.store(conflicts, Ordering::SeqCst);
    }

    pub(super) fn load(&self) -> StoredCase {
        self.inner.load_case(&case_id()).expect("case present")
    }
}

impl CaseStore for ConflictingStore {
    fn load_case(&self, id: &CaseId) -> Result<StoredCase, StoreError> {
        self.inner.load_case(id)
    }

    fn save_case(&self, case: KarinCase, expected_version: Option<u64>) -> Result<u64, StoreError> {
        let remaining = self.conflicts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.conflicts.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Conflict {
                id: case.id,
                expected: expected_version.unwrap_or(0),
                actual: expected_version.unwrap_or(0) + 1,
            });
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save_case(case, expected_version)
    }
}

pub(super) struct UnavailableStore;

impl CaseStore for UnavailableStore {
    fn load_case(&self, _id: &CaseId) -> Result<StoredCase, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn save_case(&self, _case: KarinCase, _expected: Option<u64>) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

pub(super) struct BrokenCounters;

impl CounterStore for BrokenCounters {
    fn increment_and_get(&self, _company: &str, _key: &str) -> Result<u64, CounterError> {
        Err(CounterError::Unavailable("counter table locked".to_string()))
    }
}
