//! Streaming list results.
//!
//! [`list_stream`] spawns a producer task that walks the pages of a list
//! endpoint and pushes every item into a bounded queue. The consumer side
//! is a [`ListStream`], which yields the items in fetch order and then at
//! most one terminal error.
//!
//! The queue holds [`STREAM_CAPACITY`] items. Once it is full the producer
//! suspends, so a slow consumer never causes unbounded buffering.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::client::UpwindClient;
use crate::error::{Result, UpwindError};
use crate::pagination::{next_page, Endpoint, Page, PageCursor};

/// Items buffered between the producer and the consumer.
pub const STREAM_CAPACITY: usize = 100;

/// Chunks buffered by [`ListStream::into_chunks`].
pub const CHUNK_CAPACITY: usize = 10;

/// Start streaming a list endpoint from `first`.
///
/// The producer runs on its own task and stops on the first error, on
/// cancellation, when the last page has been sent, or when the consumer
/// drops the stream. It uses a child of `cancel`, so cancelling the
/// returned stream leaves the caller's token untouched.
pub fn list_stream<T>(
    client: UpwindClient,
    endpoint: Endpoint,
    first: PageCursor,
    cancel: &CancellationToken,
) -> ListStream<T>
where
    T: DeserializeOwned + Send + 'static,
{
    let (item_tx, item_rx) = mpsc::channel(STREAM_CAPACITY);
    let (outcome_tx, outcome_rx) = oneshot::channel();
    let cancel = cancel.child_token();
    let producer_cancel = cancel.clone();

    tokio::spawn(async move {
        let result = produce(&client, &endpoint, first, &item_tx, &producer_cancel).await;
        if let Err(err) = &result {
            tracing::debug!(path = %endpoint.path, error = %err, "list stream stopped");
        }
        // posted before the item sender drops, so the consumer sees it
        // right after the last item
        let _ = outcome_tx.send(result);
        drop(item_tx);
    });

    ListStream::from_channels(item_rx, outcome_rx, cancel)
}

async fn produce<T: DeserializeOwned>(
    client: &UpwindClient,
    endpoint: &Endpoint,
    mut cursor: PageCursor,
    items: &mpsc::Sender<T>,
    cancel: &CancellationToken,
) -> Result<()> {
    let refresh_every = client.config().connection_refresh_pages;
    let mut pages: u64 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(UpwindError::Cancelled);
        }

        let Page { items: batch, next } = next_page::<T>(client, endpoint, &cursor, cancel).await?;
        pages += 1;

        for item in batch {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(UpwindError::Cancelled),
                sent = items.send(item) => {
                    if sent.is_err() {
                        tracing::debug!("list stream consumer went away");
                        return Ok(());
                    }
                }
            }
        }

        let Some(next) = next else {
            tracing::debug!(pages, "list stream complete");
            return Ok(());
        };

        if refresh_every > 0 && pages % refresh_every == 0 {
            client.refresh_transport().await?;
        }
        cursor = next;
    }
}

/// Items of a list call followed by at most one terminal error.
///
/// Implements [`Stream`] with `Item = Result<T>`: every `Ok` is an item in
/// fetch order, and an `Err` is always the last element.
#[derive(Debug)]
pub struct ListStream<T> {
    items: mpsc::Receiver<T>,
    error: ErrorSignal,
    cancel: CancellationToken,
}

/// Raw item half of a [`ListStream`].
pub type ItemStream<T> = ReceiverStream<T>;

/// Single-slot outcome of a [`ListStream`] producer.
///
/// The producer posts `Ok(())` or its error exactly once. A producer that
/// goes away without posting (a panic, or an aborted task) reads as
/// [`UpwindError::Interrupted`], never as a clean finish.
#[derive(Debug)]
pub struct ErrorSignal {
    rx: Option<oneshot::Receiver<Result<()>>>,
}

fn interrupted() -> UpwindError {
    UpwindError::Interrupted("producer ended without reporting an outcome".to_string())
}

fn terminal_error(
    received: std::result::Result<Result<()>, oneshot::error::RecvError>,
) -> Option<UpwindError> {
    match received {
        Ok(outcome) => outcome.err(),
        Err(_) => Some(interrupted()),
    }
}

impl ErrorSignal {
    /// Wait for the producer to finish and return its error, if any.
    pub async fn wait(mut self) -> Option<UpwindError> {
        let rx = self.rx.take()?;
        terminal_error(rx.await)
    }

    /// Take the error if the producer has already finished.
    pub fn try_take(&mut self) -> Option<UpwindError> {
        let rx = self.rx.as_mut()?;
        match rx.try_recv() {
            Ok(outcome) => {
                self.rx = None;
                outcome.err()
            }
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                self.rx = None;
                Some(interrupted())
            }
        }
    }
}

/// Outcome of [`ListStream::collect_all`].
#[derive(Debug)]
pub struct Collected<T> {
    /// Everything received before the stream ended.
    pub items: Vec<T>,
    /// The terminal error, if the stream failed.
    pub error: Option<UpwindError>,
}

impl<T> Collected<T> {
    /// Discard the partial items on failure.
    ///
    /// # Errors
    ///
    /// Returns the stream's terminal error, if any.
    pub fn into_result(self) -> Result<Vec<T>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.items),
        }
    }
}

impl<T> ListStream<T> {
    pub(crate) fn from_channels(
        items: mpsc::Receiver<T>,
        outcome: oneshot::Receiver<Result<()>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            items,
            error: ErrorSignal { rx: Some(outcome) },
            cancel,
        }
    }

    /// Stop the producer. Buffered items are still delivered, followed by
    /// a [`UpwindError::Cancelled`] error.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Split into the raw item stream and the error signal.
    pub fn into_parts(self) -> (ItemStream<T>, ErrorSignal) {
        (ReceiverStream::new(self.items), self.error)
    }

    /// Drain everything into memory.
    ///
    /// Items received before a failure are kept alongside the error.
    pub async fn collect_all(mut self) -> Collected<T> {
        let mut items = Vec::new();
        while let Some(next) = self.next().await {
            match next {
                Ok(item) => items.push(item),
                Err(err) => {
                    return Collected {
                        items,
                        error: Some(err),
                    }
                }
            }
        }
        Collected { items, error: None }
    }

    /// Call `handler` with consecutive batches of `size` items.
    ///
    /// A final partial batch is handed over when the stream ends, including
    /// when it ends with an error. A handler error cancels the producer and
    /// is returned immediately.
    ///
    /// # Errors
    ///
    /// Returns the first handler error or the stream's terminal error.
    pub async fn for_each_chunk<F, Fut>(mut self, size: usize, mut handler: F) -> Result<()>
    where
        F: FnMut(Vec<T>) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let size = size.max(1);
        let mut chunk = Vec::with_capacity(size);

        while let Some(next) = self.next().await {
            let item = match next {
                Ok(item) => item,
                Err(err) => {
                    if !chunk.is_empty() {
                        handler(chunk).await?;
                    }
                    return Err(err);
                }
            };

            chunk.push(item);
            if chunk.len() >= size {
                let full = std::mem::replace(&mut chunk, Vec::with_capacity(size));
                if let Err(err) = handler(full).await {
                    self.cancel();
                    return Err(err);
                }
            }
        }

        if !chunk.is_empty() {
            handler(chunk).await?;
        }
        Ok(())
    }
}

impl<T: Send + 'static> ListStream<T> {
    /// Re-expose the items as a stream of batches of `size`.
    ///
    /// Batching runs on its own task with [`CHUNK_CAPACITY`] batches of
    /// buffering. The last batch may be short; a terminal error follows it.
    pub fn into_chunks(mut self, size: usize) -> ChunkStream<T> {
        let size = size.max(1);
        let (tx, rx) = mpsc::channel(CHUNK_CAPACITY);
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let mut chunk = Vec::with_capacity(size);
            while let Some(next) = self.next().await {
                match next {
                    Ok(item) => {
                        chunk.push(item);
                        if chunk.len() >= size {
                            let full = std::mem::replace(&mut chunk, Vec::with_capacity(size));
                            if tx.send(Ok(full)).await.is_err() {
                                self.cancel();
                                return;
                            }
                        }
                    }
                    Err(err) => {
                        if !chunk.is_empty() && tx.send(Ok(chunk)).await.is_err() {
                            return;
                        }
                        let _ = tx.send(Err(err)).await;
                        return;
                    }
                }
            }
            if !chunk.is_empty() {
                let _ = tx.send(Ok(chunk)).await;
            }
        });

        ChunkStream {
            inner: ReceiverStream::new(rx),
            cancel,
        }
    }
}

impl<T> Stream for ListStream<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        match this.items.poll_recv(cx) {
            Poll::Ready(Some(item)) => Poll::Ready(Some(Ok(item))),
            Poll::Pending => Poll::Pending,
            Poll::Ready(None) => {
                // queue closed: the outcome is already posted or the
                // producer is about to finish
                let Some(rx) = this.error.rx.as_mut() else {
                    return Poll::Ready(None);
                };
                match Pin::new(rx).poll(cx) {
                    Poll::Ready(result) => {
                        this.error.rx = None;
                        Poll::Ready(terminal_error(result).map(Err))
                    }
                    Poll::Pending => Poll::Pending,
                }
            }
        }
    }
}

/// Batches produced by [`ListStream::into_chunks`].
#[derive(Debug)]
pub struct ChunkStream<T> {
    inner: ReceiverStream<Result<Vec<T>>>,
    cancel: CancellationToken,
}

impl<T> ChunkStream<T> {
    /// Stop the underlying producer.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl<T> Stream for ChunkStream<T> {
    type Item = Result<Vec<T>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}
