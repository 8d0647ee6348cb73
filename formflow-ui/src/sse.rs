//! Server-Sent Events stream of session changes.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::warn;

use crate::state::{AppState, ChangeEvent};

#[derive(Debug, Serialize)]
struct SsePayload {
    #[serde(rename = "type")]
    event_type: &'static str,
    session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<usize>,
}

impl SsePayload {
    fn session(event_type: &'static str, session_id: &str) -> Self {
        SsePayload {
            event_type,
            session_id: session_id.to_string(),
            field: None,
            step: None,
        }
    }
}

impl From<&ChangeEvent> for SsePayload {
    fn from(event: &ChangeEvent) -> Self {
        match event {
            ChangeEvent::SessionCreated { session_id } => {
                SsePayload::session("session_created", session_id)
            }
            ChangeEvent::FieldUpdated { session_id, field } => SsePayload {
                field: Some(field.clone()),
                ..SsePayload::session("field_updated", session_id)
            },
            ChangeEvent::StepChanged { session_id, step } => SsePayload {
                step: Some(*step),
                ..SsePayload::session("step_changed", session_id)
            },
            ChangeEvent::Submitted { session_id } => SsePayload::session("submitted", session_id),
            ChangeEvent::SessionReset { session_id } => {
                SsePayload::session("session_reset", session_id)
            }
            ChangeEvent::SessionClosed { session_id } => {
                SsePayload::session("session_closed", session_id)
            }
        }
    }
}

/// SSE endpoint handler.
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.event_tx.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("connected").data("{}"));

        loop {
            match rx.recv().await {
                Ok(change_event) => {
                    let payload = SsePayload::from(&change_event);
                    if let Ok(json) = serde_json::to_string(&payload) {
                        yield Ok(Event::default().event("change").data(json));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "SSE client lagged, some events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_json(event: ChangeEvent) -> serde_json::Value {
        serde_json::to_value(SsePayload::from(&event)).expect("serialize payload")
    }

    #[test]
    fn field_updates_carry_the_field_name() {
        let json = payload_json(ChangeEvent::FieldUpdated {
            session_id: "s-1".to_string(),
            field: "email".to_string(),
        });
        assert_eq!(
            json,
            serde_json::json!({"type": "field_updated", "session_id": "s-1", "field": "email"})
        );
    }

    #[test]
    fn step_changes_carry_the_step() {
        let json = payload_json(ChangeEvent::StepChanged {
            session_id: "s-1".to_string(),
            step: 2,
        });
        assert_eq!(
            json,
            serde_json::json!({"type": "step_changed", "session_id": "s-1", "step": 2})
        );
    }

    #[test]
    fn lifecycle_events_omit_optional_keys() {
        let json = payload_json(ChangeEvent::Submitted {
            session_id: "s-9".to_string(),
        });
        assert_eq!(json, serde_json::json!({"type": "submitted", "session_id": "s-9"}));
    }
}
