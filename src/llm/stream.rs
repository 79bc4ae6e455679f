//! Pull-based token sequence produced by a streaming chat call.
//!
//! A `TokenStream` owns the task that reads from the backend. Consumers pull
//! fragments one at a time; calling [`TokenStream::cancel`] or dropping the
//! stream aborts that task, which drops the HTTP response and closes the
//! backend connection.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::error::LlmError;
use super::types::TokenFragment;

type Item = Result<TokenFragment, LlmError>;

/// One fragment in flight: the backend read waits until the consumer pulls.
const FRAGMENT_BUFFER: usize = 1;

/// Producer half handed to the backend reader task.
#[derive(Clone)]
pub struct FragmentSender {
    tx: mpsc::Sender<Item>,
}

impl FragmentSender {
    /// Returns `false` once the consumer is gone; the producer should stop.
    pub async fn send_text(&self, text: impl Into<String>) -> bool {
        self.tx.send(Ok(TokenFragment::new(text))).await.is_ok()
    }

    pub async fn send_error(&self, err: LlmError) -> bool {
        self.tx.send(Err(err)).await.is_ok()
    }
}

pub struct TokenStream {
    rx: mpsc::Receiver<Item>,
    producer: Option<JoinHandle<()>>,
}

impl TokenStream {
    /// Spawns `produce` as the backend reader task for this stream.
    pub fn spawn<F, Fut>(produce: F) -> Self
    where
        F: FnOnce(FragmentSender) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(FRAGMENT_BUFFER);
        let handle = tokio::spawn(produce(FragmentSender { tx }));
        Self {
            rx,
            producer: Some(handle),
        }
    }

    /// A finished sequence over already-known items.
    pub fn from_results<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Item>,
    {
        let items: Vec<Item> = items.into_iter().collect();
        let (tx, rx) = mpsc::channel(items.len().max(1));
        for item in items {
            // Capacity covers every item, so this never fails.
            let _ = tx.try_send(item);
        }
        Self { rx, producer: None }
    }

    pub fn from_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_results(fragments.into_iter().map(|s| Ok(TokenFragment::new(s))))
    }

    /// Next fragment, or `None` when the backend signalled completion.
    pub async fn next_fragment(&mut self) -> Option<Item> {
        self.rx.recv().await
    }

    /// Stops the producer and discards anything still buffered.
    pub fn cancel(&mut self) {
        self.rx.close();
        if let Some(handle) = self.producer.take() {
            handle.abort();
        }
    }

    /// Drains the stream into one string, failing on the first error.
    pub async fn collect_text(mut self) -> Result<String, LlmError> {
        let mut text = String::new();
        while let Some(item) = self.next_fragment().await {
            text.push_str(&item?.text);
        }
        Ok(text)
    }
}

impl Stream for TokenStream {
    type Item = Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for TokenStream {
    fn drop(&mut self) {
        if let Some(handle) = self.producer.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn yields_fragments_in_order_then_ends() {
        let mut stream = TokenStream::from_fragments(["a", "b", "c"]);
        let mut seen = Vec::new();
        while let Some(item) = stream.next_fragment().await {
            seen.push(item.unwrap().text);
        }
        assert_eq!(seen, vec!["a", "b", "c"]);
        assert!(stream.next_fragment().await.is_none());
    }

    #[tokio::test]
    async fn collect_text_stops_at_first_error() {
        let stream = TokenStream::from_results([
            Ok(TokenFragment::new("partial")),
            Err(LlmError::InvalidResponse("boom".to_string())),
            Ok(TokenFragment::new("never")),
        ]);
        let err = stream.collect_text().await.unwrap_err();
        assert_eq!(err, LlmError::InvalidResponse("boom".to_string()));
    }

    #[tokio::test]
    async fn spawned_producer_feeds_consumer() {
        let stream = TokenStream::spawn(|tx| async move {
            for word in ["Hello", ", ", "world"] {
                if !tx.send_text(word).await {
                    return;
                }
            }
        });
        assert_eq!(stream.collect_text().await.unwrap(), "Hello, world");
    }

    #[tokio::test]
    async fn dropping_stream_stops_producer() {
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = stopped.clone();

        let mut stream = TokenStream::spawn(|tx| async move {
            loop {
                if !tx.send_text("tick").await {
                    flag.store(true, Ordering::SeqCst);
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });

        let first = stream.next_fragment().await.unwrap().unwrap();
        assert_eq!(first.text, "tick");
        let handle = stream.producer.take().unwrap();
        drop(stream);

        let result = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(result.is_ok(), "producer should finish after the stream is dropped");
        assert!(stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn producer_stays_one_fragment_ahead() {
        let sent = Arc::new(AtomicUsize::new(0));
        let counter = sent.clone();

        let mut stream = TokenStream::spawn(|tx| async move {
            for i in 0..100 {
                if !tx.send_text(format!("t{}", i)).await {
                    return;
                }
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sent.load(Ordering::SeqCst), 1);

        assert_eq!(stream.next_fragment().await.unwrap().unwrap().text, "t0");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sent.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cancel_aborts_producer() {
        let mut stream = TokenStream::spawn(|_tx| async move {
            std::future::pending::<()>().await;
        });
        stream.cancel();
        assert!(stream.producer.is_none());
        assert!(stream.next_fragment().await.is_none());
    }
}
