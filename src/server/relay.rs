//! Streams token fragments from a model call into an HTTP response body.
//!
//! The relay pulls one fragment, frames it, and waits for the sink to accept
//! it before pulling the next, so a slow client slows the backend read rather
//! than growing a buffer. The sink is closed exactly once on every exit path.

use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures_util::{Stream, StreamExt};
use serde_json::json;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::core::errors::GENERIC_ERROR_MESSAGE;
use crate::llm::TokenFragment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Fragment bytes verbatim over a chunked body.
    Raw,
    /// One server-sent event per fragment.
    Sse,
}

impl Framing {
    pub fn frame_text(&self, text: &str) -> Bytes {
        match self {
            Framing::Raw => Bytes::copy_from_slice(text.as_bytes()),
            Framing::Sse => {
                let mut event = String::with_capacity(text.len() + 8);
                for line in text.split('\n') {
                    event.push_str("data: ");
                    event.push_str(line);
                    event.push('\n');
                }
                event.push('\n');
                Bytes::from(event)
            }
        }
    }

    /// Terminal payload sent in place of the failure detail.
    pub fn frame_error(&self) -> Bytes {
        let payload = json!({ "error": GENERIC_ERROR_MESSAGE }).to_string();
        self.frame_text(&payload)
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Framing::Raw => "text/plain; charset=utf-8",
            Framing::Sse => "text/event-stream",
        }
    }

    pub fn response(self, body: Body) -> Response {
        match self {
            Framing::Raw => ([(header::CONTENT_TYPE, self.content_type())], body).into_response(),
            Framing::Sse => (
                [
                    (header::CONTENT_TYPE, self.content_type()),
                    (header::CACHE_CONTROL, "no-cache"),
                    (header::CONNECTION, "keep-alive"),
                ],
                body,
            )
                .into_response(),
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("client disconnected")]
pub struct SinkClosed;

/// Destination for framed bytes.
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Resolves once the frame has been accepted downstream.
    async fn write(&mut self, frame: Bytes) -> Result<(), SinkClosed>;

    /// Ends the response. Called once by [`SinkGuard`].
    fn close(&mut self);

    /// Resolves when the client has gone away.
    async fn closed(&self);
}

/// Feeds an axum response body through a channel with room for one frame.
pub struct ChannelSink {
    tx: Option<mpsc::Sender<Result<Bytes, Infallible>>>,
}

impl ChannelSink {
    pub fn channel() -> (Self, Body) {
        let (tx, rx) = mpsc::channel(1);
        let body = Body::from_stream(ReceiverStream::new(rx));
        (Self { tx: Some(tx) }, body)
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn write(&mut self, frame: Bytes) -> Result<(), SinkClosed> {
        match &self.tx {
            Some(tx) => tx.send(Ok(frame)).await.map_err(|_| SinkClosed),
            None => Err(SinkClosed),
        }
    }

    fn close(&mut self) {
        // Dropping the sender ends the body stream.
        self.tx = None;
    }

    async fn closed(&self) {
        match &self.tx {
            Some(tx) => tx.closed().await,
            None => {}
        }
    }
}

/// Owns a sink and closes it when dropped.
pub struct SinkGuard<S: FrameSink> {
    sink: S,
}

impl<S: FrameSink> SinkGuard<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

impl<S: FrameSink> Drop for SinkGuard<S> {
    fn drop(&mut self) {
        self.sink.close();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Completed { fragments: usize },
    Failed { fragments: usize },
    Disconnected { fragments: usize },
}

pub async fn relay<St, E, S>(source: St, sink: S, framing: Framing) -> RelayOutcome
where
    St: Stream<Item = Result<TokenFragment, E>> + Send + Unpin,
    E: Display,
    S: FrameSink,
{
    let mut guard = SinkGuard::new(sink);
    pump(source, &mut guard, framing).await
}

/// Awaits `open` and relays the stream it yields. Failing to open is
/// reported in-band as a single error payload.
pub async fn relay_opening<F, St, E, OE, S>(open: F, sink: S, framing: Framing) -> RelayOutcome
where
    F: Future<Output = Result<St, OE>> + Send,
    St: Stream<Item = Result<TokenFragment, E>> + Send + Unpin,
    E: Display,
    OE: Display,
    S: FrameSink,
{
    let mut guard = SinkGuard::new(sink);

    let opened = tokio::select! {
        biased;
        _ = guard.sink().closed() => {
            tracing::debug!("Client disconnected before the stream opened");
            return RelayOutcome::Disconnected { fragments: 0 };
        }
        opened = open => opened,
    };

    match opened {
        Ok(source) => pump(source, &mut guard, framing).await,
        Err(e) => {
            tracing::error!("Failed to open token stream: {}", e);
            let _ = guard.sink_mut().write(framing.frame_error()).await;
            RelayOutcome::Failed { fragments: 0 }
        }
    }
}

async fn pump<St, E, S>(mut source: St, guard: &mut SinkGuard<S>, framing: Framing) -> RelayOutcome
where
    St: Stream<Item = Result<TokenFragment, E>> + Send + Unpin,
    E: Display,
    S: FrameSink,
{
    let mut fragments = 0;
    loop {
        let next = tokio::select! {
            biased;
            _ = guard.sink().closed() => {
                tracing::debug!("Client disconnected after {} fragments", fragments);
                return RelayOutcome::Disconnected { fragments };
            }
            next = source.next() => next,
        };

        match next {
            None => return RelayOutcome::Completed { fragments },
            Some(Ok(fragment)) => {
                if fragment.text.is_empty() {
                    continue;
                }
                if guard
                    .sink_mut()
                    .write(framing.frame_text(&fragment.text))
                    .await
                    .is_err()
                {
                    tracing::debug!("Client disconnected after {} fragments", fragments);
                    return RelayOutcome::Disconnected { fragments };
                }
                fragments += 1;
            }
            Some(Err(e)) => {
                tracing::error!("Token stream failed after {} fragments: {}", fragments, e);
                let _ = guard.sink_mut().write(framing.frame_error()).await;
                return RelayOutcome::Failed { fragments };
            }
        }
    }
}

/// Spawns the relay task for `open` and returns the response it writes into.
pub fn stream_response<F, St, E, OE>(framing: Framing, open: F) -> Response
where
    F: Future<Output = Result<St, OE>> + Send + 'static,
    St: Stream<Item = Result<TokenFragment, E>> + Send + Unpin + 'static,
    E: Display + Send + 'static,
    OE: Display + Send + 'static,
{
    let (sink, body) = ChannelSink::channel();
    tokio::spawn(async move {
        let outcome = relay_opening(open, sink, framing).await;
        tracing::debug!("Relay finished: {:?}", outcome);
    });
    framing.response(body)
}
