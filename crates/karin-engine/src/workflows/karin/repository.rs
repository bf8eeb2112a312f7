use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::domain::{CaseId, KarinCase};
use super::events::KarinEvent;

/// A case as read from storage, with the version used for optimistic writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCase {
    pub case: KarinCase,
    pub version: u64,
}

/// Persistence of case documents. Implementations must reject a save whose
/// `expected_version` no longer matches.
pub trait CaseStore: Send + Sync {
    fn load_case(&self, id: &CaseId) -> Result<StoredCase, StoreError>;
    /// Write the case and return the new version. `None` skips the check;
    /// `Some(0)` only succeeds for a case the store has never seen.
    fn save_case(&self, case: KarinCase, expected_version: Option<u64>)
        -> Result<u64, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("case {0} not found")]
    NotFound(CaseId),
    #[error("case {id} was modified concurrently (expected version {expected}, found {actual})")]
    Conflict {
        id: CaseId,
        expected: u64,
        actual: u64,
    },
    #[error("case store unavailable: {0}")]
    Unavailable(String),
}

/// Outbound event hook, e.g. e-mail or in-app notifications.
pub trait NotificationDispatcher: Send + Sync {
    fn notify(&self, event: KarinEvent) -> Result<(), DispatchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Resolves actor ids to names for the stage history.
pub trait ActorDirectory: Send + Sync {
    fn resolve_display_name(&self, actor_id: &str) -> Option<String>;
}

/// Case store keeping versioned documents in process memory.
#[derive(Default)]
pub struct InMemoryCaseStore {
    cases: Mutex<HashMap<CaseId, StoredCase>>,
}

impl InMemoryCaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a case at version 1, replacing any previous copy.
    pub fn insert(&self, case: KarinCase) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        guard.insert(case.id.clone(), StoredCase { case, version: 1 });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.cases.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<CaseId, StoredCase>>, StoreError> {
        self.cases
            .lock()
            .map_err(|_| StoreError::Unavailable("case store lock poisoned".to_string()))
    }
}

impl CaseStore for InMemoryCaseStore {
    fn load_case(&self, id: &CaseId) -> Result<StoredCase, StoreError> {
        self.lock()?
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn save_case(
        &self,
        case: KarinCase,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError> {
        let mut guard = self.lock()?;
        let current = guard.get(&case.id).map_or(0, |stored| stored.version);

        if let Some(expected) = expected_version {
            if expected != current {
                return Err(StoreError::Conflict {
                    id: case.id,
                    expected,
                    actual: current,
                });
            }
        }

        let version = current + 1;
        guard.insert(case.id.clone(), StoredCase { case, version });
        Ok(version)
    }
}
