//! Shared application state for the form server.

use std::collections::HashMap;
use std::sync::Arc;

use formflow::core::catalog::FormCatalog;
use formflow::core::session::{FormSession, Recorder, SessionView};
use rand::{Rng, distributions::Alphanumeric};
use tokio::sync::{Mutex, broadcast};

/// Events broadcast to SSE clients when a session changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    SessionCreated { session_id: String },
    FieldUpdated { session_id: String, field: String },
    StepChanged { session_id: String, step: usize },
    Submitted { session_id: String },
    SessionReset { session_id: String },
    SessionClosed { session_id: String },
}

/// One session behind its own lock, so it handles one event at a time.
pub type SharedSession = Arc<Mutex<FormSession>>;

/// Shared state accessible from all request handlers.
///
/// The `sessions` lock only guards the id map; it is released before a
/// session is locked and used.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<FormCatalog>,
    pub sessions: Arc<Mutex<HashMap<String, SharedSession>>>,
    pub recorder: Arc<dyn Recorder + Send + Sync>,
    /// Message stored under the `submit` key when the recorder fails.
    pub submit_failure: String,
    /// Broadcast sender for session change events.
    pub event_tx: Arc<broadcast::Sender<ChangeEvent>>,
}

impl AppState {
    pub fn new(
        catalog: FormCatalog,
        recorder: Arc<dyn Recorder + Send + Sync>,
        submit_failure: String,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            catalog: Arc::new(catalog),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            recorder,
            submit_failure,
            event_tx: Arc::new(event_tx),
        }
    }

    /// Start a session of `form_id`. Returns `None` for unknown forms.
    pub async fn create_session(&self, form_id: &str) -> Option<(String, SessionView)> {
        let schema = self.catalog.get(form_id)?.clone();
        let session = FormSession::new(Arc::new(schema))
            .with_submit_failure_message(self.submit_failure.clone());
        let view = session.view();
        let session_id = new_session_id();
        self.sessions
            .lock()
            .await
            .insert(session_id.clone(), Arc::new(Mutex::new(session)));
        self.notify(ChangeEvent::SessionCreated {
            session_id: session_id.clone(),
        });
        Some((session_id, view))
    }

    /// Handle of session `id`, if it exists.
    pub async fn session(&self, id: &str) -> Option<SharedSession> {
        self.sessions.lock().await.get(id).cloned()
    }

    /// Broadcast an event. Having no subscribers is not an error.
    pub fn notify(&self, event: ChangeEvent) {
        let _ = self.event_tx.send(event);
    }
}

/// Random 12-character session id.
pub fn new_session_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(12)
        .collect();
    format!("s-{}", suffix.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use formflow::io::recorder::LogRecorder;

    #[tokio::test]
    async fn create_session_registers_and_notifies() {
        let state = AppState::new(
            FormCatalog::builtin(),
            Arc::new(LogRecorder),
            "failed".to_string(),
        );
        let mut rx = state.event_tx.subscribe();

        let (id, view) = state.create_session("checkout").await.expect("session");
        assert_eq!(view.current_step, 1);
        assert!(state.sessions.lock().await.contains_key(&id));
        assert_eq!(
            rx.try_recv().expect("event"),
            ChangeEvent::SessionCreated { session_id: id }
        );
    }

    #[tokio::test]
    async fn create_session_rejects_unknown_form() {
        let state = AppState::new(
            FormCatalog::builtin(),
            Arc::new(LogRecorder),
            "failed".to_string(),
        );
        assert!(state.create_session("spaceship").await.is_none());
        assert!(state.sessions.lock().await.is_empty());
    }

    #[test]
    fn session_ids_are_prefixed_and_distinct() {
        let a = new_session_id();
        let b = new_session_id();
        assert!(a.starts_with("s-"));
        assert_eq!(a.len(), 14);
        assert_ne!(a, b);
    }
}
