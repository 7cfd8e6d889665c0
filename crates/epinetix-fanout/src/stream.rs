//! SSE stream composition for belief-change observers, with keep-alive.

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::response::sse::Event;
use futures::stream::{Stream, StreamExt};
use tokio_stream::wrappers::IntervalStream;

use crate::bus::BeliefChangeMessage;

/// Default keep-alive interval in seconds.
pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 15;

const KEEP_ALIVE_COMMENT: &str = "keepalive";

/// Emits `Event::default().comment(...)` at a fixed interval so proxies don't
/// time out an idle belief-change subscription.
pub struct KeepAliveStream {
    interval: IntervalStream,
}

impl KeepAliveStream {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: IntervalStream::new(tokio::time::interval(interval)),
        }
    }

    #[must_use]
    pub fn default_interval() -> Self {
        Self::new(Duration::from_secs(DEFAULT_KEEP_ALIVE_SECS))
    }
}

impl Stream for KeepAliveStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.interval).poll_next(cx) {
            Poll::Ready(Some(_instant)) => {
                Poll::Ready(Some(Ok(Event::default().comment(KEEP_ALIVE_COMMENT))))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Turn one [`BeliefChangeMessage`] into an SSE data event.
fn belief_change_to_sse(message: &BeliefChangeMessage) -> Event {
    let json = serde_json::to_string(message).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to serialize belief-change message");
        "{}".to_string()
    });
    Event::default().event("belief-change").data(json)
}

/// Compose a belief-change message stream with keep-alives.
///
/// Mirrors the subscribe-before-replay composition used for other event
/// streams in this system: callers must declare their Zenoh subscriber
/// before this is invoked so no broadcast is missed between subscribe and
/// stream construction.
pub fn build_belief_change_stream<S>(
    messages: S,
    keep_alive_interval: Duration,
) -> impl Stream<Item = Result<Event, Infallible>> + Send
where
    S: Stream<Item = BeliefChangeMessage> + Send + 'static,
{
    let events = messages.map(|message| Ok(belief_change_to_sse(&message)));
    futures::stream::select(events, KeepAliveStream::new(keep_alive_interval))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keep_alive_stream_emits_comments() {
        let stream = KeepAliveStream::new(Duration::from_millis(10));
        let mut stream = Box::pin(stream);

        let event = tokio::time::timeout(Duration::from_millis(100), stream.next())
            .await
            .expect("should receive within timeout")
            .expect("stream should yield event");
        assert!(event.is_ok());
    }

    #[tokio::test]
    async fn belief_change_stream_emits_message_then_keep_alive() {
        let message = BeliefChangeMessage {
            storyfragment_id: "sf1".to_string(),
            affected_panes: vec!["pane1".to_string()],
        };
        let messages = futures::stream::iter(vec![message]);
        let stream = build_belief_change_stream(messages, Duration::from_millis(200));
        let mut stream = Box::pin(stream);

        let first = tokio::time::timeout(Duration::from_millis(50), stream.next())
            .await
            .expect("should receive within timeout")
            .expect("stream should yield an event");
        assert!(first.is_ok());
    }
}
