/// Live update stream (SSE)
///
/// # Endpoint
///
/// `GET /v1/events`
///
/// Streams change notifications for projects the caller owned or belonged to
/// at the time of the change. Delivery is best effort: nothing is replayed
/// on reconnect, and a subscriber that falls too far behind skips the
/// oldest events.
///
/// # SSE Event Format
///
/// ```text
/// event: task_updated
/// data: {"kind":"task_updated","project_id":"...","task_id":"...","actor":"...","at":"2025-01-04T12:00:00Z"}
///
/// : keep-alive
/// ```
///
/// # Example
///
/// ```bash
/// curl -N -H "Authorization: Bearer <token>" http://localhost:8080/v1/events
/// ```

use crate::app::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Extension,
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use taskboard_shared::auth::middleware::AuthContext;
use taskboard_shared::events::ChangeEvent;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::StreamExt as _;
use uuid::Uuid;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

fn to_sse(event: &ChangeEvent) -> Option<Event> {
    match Event::default().event(event.kind.as_str()).json_data(event) {
        Ok(sse) => Some(sse),
        Err(e) => {
            tracing::error!(
                error = %e,
                kind = event.kind.as_str(),
                "Failed to encode change event"
            );
            None
        }
    }
}

fn forward(
    user_id: Uuid,
    message: Result<ChangeEvent, BroadcastStreamRecvError>,
) -> Option<Result<Event, Infallible>> {
    match message {
        Ok(event) if event.is_visible_to(user_id) => to_sse(&event).map(Ok),
        Ok(_) => None,
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(user_id = %user_id, skipped, "Event subscriber lagged; events dropped");
            None
        }
    }
}

/// Subscribes the caller to change notifications
pub async fn stream_events(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let user_id = auth.user_id;
    let receiver = state.relay.subscribe();
    tracing::debug!(
        user_id = %user_id,
        subscribers = state.relay.subscriber_count(),
        "Event stream opened"
    );

    let stream =
        BroadcastStream::new(receiver).filter_map(move |message| forward(user_id, message));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskboard_shared::events::ChangeKind;

    fn event(audience: Vec<Uuid>) -> ChangeEvent {
        ChangeEvent::new(
            ChangeKind::TaskCreated,
            Uuid::new_v4(),
            Some(Uuid::new_v4()),
            Uuid::new_v4(),
            audience,
        )
    }

    #[test]
    fn test_forward_only_to_audience() {
        let member = Uuid::new_v4();
        let outsider = Uuid::new_v4();

        assert!(forward(member, Ok(event(vec![member]))).is_some());
        assert!(forward(outsider, Ok(event(vec![member]))).is_none());
    }

    #[test]
    fn test_forward_skips_lag_notices() {
        assert!(forward(Uuid::new_v4(), Err(BroadcastStreamRecvError::Lagged(3))).is_none());
    }
}
