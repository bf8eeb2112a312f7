use chrono::NaiveDate;
use karin_engine::workflows::karin::{
    ActorDirectory, DispatchError, KarinEvent, NotificationDispatcher,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

const RECENT_EVENT_LIMIT: usize = 256;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Writes engine events to the log and keeps the latest ones in memory.
#[derive(Default)]
pub(crate) struct TracingDispatcher {
    recent: Mutex<Vec<KarinEvent>>,
}

impl TracingDispatcher {
    pub(crate) fn recent(&self) -> Vec<KarinEvent> {
        match self.recent.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl NotificationDispatcher for TracingDispatcher {
    fn notify(&self, event: KarinEvent) -> Result<(), DispatchError> {
        let payload = serde_json::to_string(&event)
            .map_err(|err| DispatchError::Transport(err.to_string()))?;
        info!(
            event = event.name(),
            case_id = %event.case_id(),
            %payload,
            "karin event dispatched"
        );

        let mut guard = match self.recent.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("event buffer mutex poisoned; recovering");
                poisoned.into_inner()
            }
        };
        if guard.len() == RECENT_EVENT_LIMIT {
            guard.remove(0);
        }
        guard.push(event);
        Ok(())
    }
}

/// Actor names supplied at startup, e.g. `KARIN_ACTORS=usr-1=Ana Pérez,usr-2=Luis Díaz`.
#[derive(Debug, Default, Clone)]
pub(crate) struct StaticActorDirectory {
    names: HashMap<String, String>,
}

impl StaticActorDirectory {
    pub(crate) fn from_env() -> Self {
        std::env::var("KARIN_ACTORS")
            .map(|raw| Self::parse(&raw))
            .unwrap_or_default()
    }

    pub(crate) fn parse(raw: &str) -> Self {
        let names = raw
            .split(',')
            .filter_map(|entry| {
                let (id, name) = entry.split_once('=')?;
                let (id, name) = (id.trim(), name.trim());
                if id.is_empty() || name.is_empty() {
                    warn!(entry, "ignoring malformed actor entry");
                    return None;
                }
                Some((id.to_string(), name.to_string()))
            })
            .collect();
        Self { names }
    }

    pub(crate) fn with_actor(mut self, id: &str, name: &str) -> Self {
        self.names.insert(id.to_string(), name.to_string());
        self
    }
}

impl ActorDirectory for StaticActorDirectory {
    fn resolve_display_name(&self, actor_id: &str) -> Option<String> {
        self.names.get(actor_id).cloned()
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use karin_engine::workflows::karin::CaseId;

    #[test]
    fn directory_parses_pairs_and_skips_garbage() {
        let directory =
            StaticActorDirectory::parse("usr-1=Ana Pérez, usr-2 = Luis Díaz,broken,=x");
        assert_eq!(
            directory.resolve_display_name("usr-1").as_deref(),
            Some("Ana Pérez")
        );
        assert_eq!(
            directory.resolve_display_name("usr-2").as_deref(),
            Some("Luis Díaz")
        );
        assert_eq!(directory.resolve_display_name("broken"), None);
    }

    #[test]
    fn dispatcher_keeps_recent_events() {
        let dispatcher = TracingDispatcher::default();
        dispatcher
            .notify(KarinEvent::ReportReviewRequired {
                case_id: CaseId("case-9".to_string()),
                deadline: NaiveDate::from_ymd_opt(2024, 2, 8).expect("valid date"),
            })
            .expect("dispatched");

        let recent = dispatcher.recent();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].name(), "report_review_required");
    }

    #[test]
    fn parse_date_reports_bad_input() {
        assert!(parse_date(" 2024-03-04 ").is_ok());
        let error = parse_date("04/03/2024").expect_err("wrong format");
        assert!(error.contains("YYYY-MM-DD"));
    }
}
