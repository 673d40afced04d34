//! Paced emission of stream events as an HTTP body.
//!
//! Events are produced by a spawned task and handed to the response body over a
//! bounded channel. When the client goes away hyper drops the body, the next
//! send fails and the task stops without producing the remaining events.

use super::StreamEvent;
use bytes::Bytes;
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::Frame;
use std::convert::Infallible;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Delay between consecutive events unless configured otherwise
pub const DEFAULT_EVENT_DELAY: Duration = Duration::from_millis(10);

/// Response body carrying server-sent events
pub type SseBody = UnsyncBoxBody<Bytes, Infallible>;

/// How an emitting task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed { sent: usize },
    Disconnected { sent: usize },
}

/// A body fed by a background task, plus the task handle
pub struct PacedStream {
    pub body: SseBody,
    pub task: JoinHandle<StreamOutcome>,
}

/// Spawn a task emitting `events` in order with `delay` between them.
///
/// Must be called from within a tokio runtime.
pub fn paced_stream<I>(events: I, delay: Duration) -> PacedStream
where
    I: IntoIterator<Item = StreamEvent>,
    I::IntoIter: Send + 'static,
{
    let (mut tx, rx) = mpsc::channel::<Bytes>(1);
    let events = events.into_iter();

    let task = tokio::spawn(async move {
        let mut sent = 0usize;
        for event in events {
            if sent > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if tx.send(Bytes::from(event.to_sse())).await.is_err() {
                debug!("Stream receiver dropped after {} event(s)", sent);
                return StreamOutcome::Disconnected { sent };
            }
            sent += 1;
        }
        StreamOutcome::Completed { sent }
    });

    let body = StreamBody::new(rx.map(|chunk| Ok::<_, Infallible>(Frame::data(chunk))));
    PacedStream {
        body: body.boxed_unsync(),
        task,
    }
}
