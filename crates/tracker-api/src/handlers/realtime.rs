//! Live subscription endpoint (`GET /api/realtime`).
//!
//! An authenticated client receives an SSE stream: first a
//! `{"type":"connected"}` frame, then every event dispatched to its user,
//! with `: ping` comments while idle. The sink is registered before the
//! response is returned and deregistered when the response body is dropped.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use tracker_core::{ConnectionRegistry, Event, Frame, LiveSink, SinkId, UserId};
use tracker_core::logging::{COMPONENT_SUBSCRIPTION, SUBSYSTEM_REALTIME};

use crate::auth::{bearer_token, verify_token};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RealtimeQuery {
    pub token: Option<String>,
}

/// Deregisters a sink when the response stream is dropped.
struct SubscriptionGuard {
    registry: Arc<ConnectionRegistry>,
    user: UserId,
    sink_id: SinkId,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.registry.deregister(self.user, self.sink_id);
        info!(
            subsystem = SUBSYSTEM_REALTIME,
            component = COMPONENT_SUBSCRIPTION,
            user_id = %self.user,
            sink_id = %self.sink_id,
            "Realtime client disconnected"
        );
    }
}

/// Frames for one subscription: `connected` first, then whatever the
/// dispatcher writes to the sink. Ends when the sink's senders are gone.
fn subscription_stream(
    connected: Frame,
    rx: mpsc::Receiver<Frame>,
    guard: SubscriptionGuard,
) -> impl Stream<Item = Frame> {
    let dispatched = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        rx.recv().await.map(|frame| (frame, (rx, guard)))
    });
    stream::once(async move { connected }).chain(dispatched)
}

pub async fn subscribe(
    State(state): State<AppState>,
    Query(query): Query<RealtimeQuery>,
    headers: HeaderMap,
) -> Response {
    let token = query
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| bearer_token(&headers));

    let Some(token) = token else {
        debug!(
            subsystem = SUBSYSTEM_REALTIME,
            component = COMPONENT_SUBSCRIPTION,
            "Subscription rejected: no token"
        );
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let user = match verify_token(state.jwt_secret(), token) {
        Ok(user) => user,
        Err(e) => {
            debug!(
                subsystem = SUBSYSTEM_REALTIME,
                component = COMPONENT_SUBSCRIPTION,
                error = %e,
                "Subscription rejected"
            );
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    let connected: Frame = match Event::Connected.to_json() {
        Ok(json) => json.into(),
        Err(e) => return ApiError::from(e).into_response(),
    };

    let (sink, rx) = LiveSink::channel(state.realtime.sink_buffer);
    let guard = SubscriptionGuard {
        registry: state.registry.clone(),
        user,
        sink_id: sink.id(),
    };
    state.registry.register(user, sink);
    info!(
        subsystem = SUBSYSTEM_REALTIME,
        component = COMPONENT_SUBSCRIPTION,
        user_id = %user,
        sink_id = %guard.sink_id,
        connected_users = state.registry.user_count(),
        "Realtime client connected"
    );

    let events = subscription_stream(connected, rx, guard)
        .take_until(state.shutdown_signal())
        .map(|frame| Ok::<_, Infallible>(SseEvent::default().data(&*frame)));
    let sse = Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(state.realtime.keepalive)
            .text("ping"),
    );

    ([(header::CACHE_CONTROL, "no-cache")], sse).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stream_yields_connected_then_dispatched() {
        let registry = Arc::new(ConnectionRegistry::new());
        let user = UserId::random();
        let (sink, rx) = LiveSink::channel(4);
        let guard = SubscriptionGuard {
            registry: registry.clone(),
            user,
            sink_id: sink.id(),
        };
        registry.register(user, sink.clone());

        let mut stream = Box::pin(subscription_stream(Frame::from("hello"), rx, guard));
        sink.try_write(Frame::from("second")).unwrap();

        assert_eq!(&*stream.next().await.unwrap(), "hello");
        assert_eq!(&*stream.next().await.unwrap(), "second");
        assert!(registry.is_connected(user));

        drop(stream);
        assert!(!registry.is_connected(user));
        assert_eq!(registry.sink_count(), 0);
    }

    #[tokio::test]
    async fn test_stream_ends_when_senders_dropped() {
        let registry = Arc::new(ConnectionRegistry::new());
        let user = UserId::random();
        let (sink, rx) = LiveSink::channel(4);
        let guard = SubscriptionGuard {
            registry: registry.clone(),
            user,
            sink_id: sink.id(),
        };
        drop(sink);

        let frames: Vec<Frame> = subscription_stream(Frame::from("hello"), rx, guard)
            .collect()
            .await;
        assert_eq!(frames.len(), 1);
    }
}
