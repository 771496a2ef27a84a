//! Periodic refetch with generation tracking.
//!
//! Every fetch is issued a `FetchTicket`. Only the most recently issued
//! generation may deliver a result; a stopped poller delivers nothing.

use crate::util::send_or_log;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Events buffered between the poll tasks and the UI loop.
const EVENT_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    /// Whether this fetch shows a loading state and surfaces its error.
    pub show_loading: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent<T> {
    Started(FetchTicket),
    Finished {
        ticket: FetchTicket,
        result: Result<T, String>,
    },
}

/// Monotonic generation counter shared by a poller and its fetch tasks.
#[derive(Debug, Clone, Default)]
pub struct Generations(Arc<AtomicU64>);

impl Generations {
    /// Issue the next generation; it becomes the latest.
    pub fn issue(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn latest(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn is_latest(&self, generation: u64) -> bool {
        self.latest() == generation
    }
}

type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, String>> + Send + Sync>;

struct Inner<T> {
    fetch: FetchFn<T>,
    generations: Generations,
    cancel: CancellationToken,
    tx: mpsc::Sender<PollEvent<T>>,
}

impl<T: Send + 'static> Inner<T> {
    fn launch(&self, show_loading: bool) -> FetchTicket {
        let ticket = FetchTicket {
            generation: self.generations.issue(),
            show_loading,
        };
        let fetch = (self.fetch)();
        let cancel = self.cancel.clone();
        let generations = self.generations.clone();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            if cancel.is_cancelled() {
                return;
            }
            send_or_log(&tx, PollEvent::Started(ticket), "poll start").await;

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!("Fetch generation {} cancelled", ticket.generation);
                    return;
                }
                result = fetch => result,
            };

            if cancel.is_cancelled() {
                return;
            }
            if !generations.is_latest(ticket.generation) {
                tracing::debug!(
                    "Dropping result of generation {} (latest is {})",
                    ticket.generation,
                    generations.latest()
                );
                return;
            }
            send_or_log(&tx, PollEvent::Finished { ticket, result }, "poll result").await;
        });

        ticket
    }
}

/// A cancellable timer-driven fetch loop.
///
/// The first fetch runs immediately with a loading state; later ones every
/// `interval`, silently. Dropping the poller stops it.
pub struct Poller<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Send + 'static> Poller<T> {
    pub fn spawn<F, Fut, E>(fetch: F, interval: Duration, tx: mpsc::Sender<PollEvent<T>>) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Display + 'static,
    {
        let fetch: FetchFn<T> = Arc::new(move || {
            fetch()
                .map(|result| result.map_err(|e| e.to_string()))
                .boxed()
        });
        let inner = Arc::new(Inner {
            fetch,
            generations: Generations::default(),
            cancel: CancellationToken::new(),
            tx,
        });

        let timer = Arc::clone(&inner);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut first = true;
            loop {
                tokio::select! {
                    biased;
                    _ = timer.cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                timer.launch(first);
                first = false;
            }
            tracing::debug!("Poll timer stopped");
        });

        Self { inner }
    }

    /// Start a fetch now, superseding anything in flight.
    pub fn refresh(&self, show_loading: bool) -> Option<FetchTicket> {
        if self.is_stopped() {
            return None;
        }
        Some(self.inner.launch(show_loading))
    }

    /// Stop the timer and abandon in-flight fetches. Idempotent.
    pub fn stop(&self) {
        self.inner.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        self.inner.cancel.cancel();
    }
}

/// A poller together with the receiving end of its events, owned by one view.
pub struct PollHandle<T> {
    poller: Poller<T>,
    rx: mpsc::Receiver<PollEvent<T>>,
}

impl<T: Send + 'static> PollHandle<T> {
    pub fn start<F, Fut, E>(fetch: F, interval: Duration) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Display + 'static,
    {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        Self {
            poller: Poller::spawn(fetch, interval, tx),
            rx,
        }
    }

    /// Next queued event without blocking (UI tick).
    pub fn try_next(&mut self) -> Option<PollEvent<T>> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next event; `None` once the poller is gone.
    pub async fn next(&mut self) -> Option<PollEvent<T>> {
        self.rx.recv().await
    }

    pub fn refresh(&self, show_loading: bool) -> Option<FetchTicket> {
        self.poller.refresh(show_loading)
    }

    pub fn stop(&self) {
        self.poller.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.poller.is_stopped()
    }
}
