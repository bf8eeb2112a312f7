use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Atomic counter storage shared by every case of a company.
pub trait CounterStore: Send + Sync {
    /// Increment the counter and return the new value in one step.
    fn increment_and_get(&self, company_id: &str, counter_key: &str) -> Result<u64, CounterError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CounterError {
    #[error("counter store unavailable: {0}")]
    Unavailable(String),
}

/// Counter store keeping its values in process memory.
#[derive(Default)]
pub struct InMemoryCounterStore {
    counters: Mutex<HashMap<(String, String), u64>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for InMemoryCounterStore {
    fn increment_and_get(&self, company_id: &str, counter_key: &str) -> Result<u64, CounterError> {
        let mut guard = self
            .counters
            .lock()
            .map_err(|_| CounterError::Unavailable("counter lock poisoned".to_string()))?;
        let value = guard
            .entry((company_id.to_string(), counter_key.to_string()))
            .or_insert(0);
        *value += 1;
        Ok(*value)
    }
}

/// Document reference number such as `DECL-ABC12345-001`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folio {
    pub value: String,
    /// Issued from the clock because the counter store failed.
    pub degraded: bool,
}

impl fmt::Display for Folio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

pub struct FolioAllocator<C> {
    counters: Arc<C>,
}

impl<C> Clone for FolioAllocator<C> {
    fn clone(&self) -> Self {
        Self {
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<C> FolioAllocator<C>
where
    C: CounterStore,
{
    pub fn new(counters: Arc<C>) -> Self {
        Self { counters }
    }

    /// Issue the next folio for `document_type`. Never fails: a counter
    /// outage yields a timestamp folio instead.
    pub fn allocate(&self, company_id: &str, case_code: &str, document_type: &str) -> Folio {
        let prefix = type_prefix(document_type);
        let counter_key = format!("folio:{prefix}");

        match self.counters.increment_and_get(company_id, &counter_key) {
            Ok(counter) => Folio {
                value: format!("{prefix}-{case_code}-{counter:03}"),
                degraded: false,
            },
            Err(err) => {
                let millis = Utc::now().timestamp_millis();
                warn!(
                    error = %err,
                    company_id,
                    case_code,
                    document_type,
                    "folio counter unavailable; issuing timestamp folio"
                );
                Folio {
                    value: format!("{prefix}-{case_code}-T{millis}"),
                    degraded: true,
                }
            }
        }
    }
}

/// First four alphanumeric characters, uppercased and padded with `X`.
fn type_prefix(document_type: &str) -> String {
    let mut prefix: String = document_type
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(4)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    while prefix.len() < 4 {
        prefix.push('X');
    }
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::thread;

    struct BrokenCounters;

    impl CounterStore for BrokenCounters {
        fn increment_and_get(&self, _: &str, _: &str) -> Result<u64, CounterError> {
            Err(CounterError::Unavailable("connection refused".to_string()))
        }
    }

    #[test]
    fn formats_type_case_and_counter() {
        let allocator = FolioAllocator::new(Arc::new(InMemoryCounterStore::new()));
        let first = allocator.allocate("acme", "ABC12345", "declaracion");
        let second = allocator.allocate("acme", "XYZ00001", "declaracion");
        assert_eq!(first.value, "DECL-ABC12345-001");
        assert_eq!(second.value, "DECL-XYZ00001-002");
        assert!(!first.degraded);
    }

    #[test]
    fn counters_are_per_company_and_type() {
        let allocator = FolioAllocator::new(Arc::new(InMemoryCounterStore::new()));
        allocator.allocate("acme", "C1", "acta");
        assert_eq!(allocator.allocate("acme", "C1", "informe").value, "INFO-C1-001");
        assert_eq!(allocator.allocate("globex", "C9", "acta").value, "ACTA-C9-001");
        assert_eq!(allocator.allocate("acme", "C1", "acta").value, "ACTA-C1-002");
    }

    #[test]
    fn short_types_are_padded() {
        assert_eq!(type_prefix("dt"), "DTXX");
        assert_eq!(type_prefix("ca-rta"), "CART");
    }

    #[test]
    fn concurrent_allocation_yields_distinct_increasing_counters() {
        let allocator = FolioAllocator::new(Arc::new(InMemoryCounterStore::new()));
        let per_thread = 25;
        let threads = 8;

        let counters: Vec<u64> = thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    let allocator = allocator.clone();
                    scope.spawn(move || {
                        let mut seen = Vec::with_capacity(per_thread);
                        for _ in 0..per_thread {
                            let folio = allocator.allocate("acme", "ABC12345", "declaracion");
                            let counter = folio
                                .value
                                .rsplit('-')
                                .next()
                                .and_then(|raw| raw.parse::<u64>().ok())
                                .expect("numeric counter");
                            seen.push(counter);
                        }
                        seen
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| handle.join().expect("thread completes"))
                .collect()
        });

        let distinct: BTreeSet<u64> = counters.iter().copied().collect();
        assert_eq!(distinct.len(), per_thread * threads);
        assert_eq!(distinct.first(), Some(&1));
        assert_eq!(distinct.last(), Some(&((per_thread * threads) as u64)));
    }

    #[test]
    fn each_caller_sees_strictly_increasing_counters() {
        let allocator = FolioAllocator::new(Arc::new(InMemoryCounterStore::new()));
        let results: Vec<Vec<String>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let allocator = allocator.clone();
                    scope.spawn(move || {
                        (0..10)
                            .map(|_| allocator.allocate("acme", "C1", "acta").value)
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("thread completes"))
                .collect()
        });

        for folios in results {
            assert!(folios.windows(2).all(|pair| pair[0] < pair[1]));
        }
    }

    #[test]
    fn counter_failure_falls_back_to_timestamp_folio() {
        let allocator = FolioAllocator::new(Arc::new(BrokenCounters));
        let folio = allocator.allocate("acme", "ABC12345", "declaracion");
        assert!(folio.degraded);
        assert!(folio.value.starts_with("DECL-ABC12345-T"));
        let millis = folio.value.trim_start_matches("DECL-ABC12345-T");
        assert!(millis.parse::<i64>().is_ok());
    }
}
