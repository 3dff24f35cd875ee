use std::convert::Infallible;

use async_stream::stream;
use axum::{
    extract::State,
    http::HeaderName,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use mediatorr_core::scan::ScanEventFrame;
use serde_json::Value;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};
use tracing::{debug, warn};

use crate::handlers::scan::status_payload;
use crate::infra::app_state::AppState;

const KEEP_ALIVE_TEXT: &str = "heartbeat";

/// Live scan feed: a `status` snapshot first, then every bus frame.
///
/// The subscription is taken before the snapshot is read so nothing emitted
/// in between is lost.
pub async fn scan_events_sse_handler(State(state): State<AppState>) -> impl IntoResponse {
    let receiver = state.events.subscribe().into_receiver();
    let snapshot = status_payload(&state).await;
    let keep_alive = state.config.events.keep_alive;
    debug!(subscribers = state.events.receiver_count(), "sse client connected");

    let stream = stream! {
        yield Ok::<Event, Infallible>(status_event(&snapshot));

        let mut frames = BroadcastStream::new(receiver);
        while let Some(item) = frames.next().await {
            match item {
                Ok(frame) => {
                    if let Some(event) = frame_to_event(frame) {
                        yield Ok(event);
                    }
                }
                Err(err) => {
                    warn!("scan event broadcast error: {err}");
                }
            }
        }
    };

    (
        [(HeaderName::from_static("x-accel-buffering"), "no")],
        Sse::new(stream).keep_alive(
            KeepAlive::new().interval(keep_alive).text(KEEP_ALIVE_TEXT),
        ),
    )
}

fn status_event(snapshot: &Value) -> Event {
    Event::default().event("status").data(snapshot.to_string())
}

fn frame_to_event(frame: ScanEventFrame) -> Option<Event> {
    let name = frame.event.event_name();
    frame
        .event
        .to_json()
        .map(|data| {
            Event::default()
                .event(name)
                .id(frame.sequence.to_string())
                .data(data)
        })
        .map_err(|err| {
            warn!("failed to serialize scan event: {err}");
            err
        })
        .ok()
}
