use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use crate::models::token::find_duplicate_id;
use crate::sources::TokenBackend;
use super::{NotificationGate, TokenStore, VisibilityProbe};

/// What a single retrieval cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FetchOutcome {
    Applied { total: usize, newly_appeared: usize },
    /// Completed after a newer response was already applied.
    Discarded,
    Failed,
}

#[derive(Debug, Default)]
pub struct PollerStats {
    pub issued: AtomicU64,
    pub succeeded: AtomicU64,
    pub failed: AtomicU64,
    pub discarded: AtomicU64,
}

/// Periodic snapshot retrieval feeding the store and the notification gate.
///
/// Cheap to clone; clones share the same timer and counters.
#[derive(Clone)]
pub struct Poller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    backend: Arc<dyn TokenBackend>,
    store: Arc<TokenStore>,
    gate: Arc<NotificationGate>,
    visibility: Arc<dyn VisibilityProbe>,
    timer: Mutex<Option<JoinHandle<()>>>,
    discard_stale: AtomicBool,
    next_sequence: AtomicU64,
    /// Held across the staleness check and the reconcile.
    newest_applied: Mutex<u64>,
    stats: PollerStats,
}

impl Poller {
    pub fn new(
        backend: Arc<dyn TokenBackend>,
        store: Arc<TokenStore>,
        gate: Arc<NotificationGate>,
        visibility: Arc<dyn VisibilityProbe>,
    ) -> Self {
        Self {
            inner: Arc::new(PollerInner {
                backend,
                store,
                gate,
                visibility,
                timer: Mutex::new(None),
                discard_stale: AtomicBool::new(false),
                next_sequence: AtomicU64::new(0),
                newest_applied: Mutex::new(0),
                stats: PollerStats::default(),
            }),
        }
    }

    /// Enables the sequence guard: a response issued before the newest
    /// applied one is dropped instead of overwriting it.
    pub fn with_stale_guard(self, enabled: bool) -> Self {
        self.inner.discard_stale.store(enabled, Ordering::Relaxed);
        self
    }

    /// Fetches immediately, then every `period`. No-op while already running
    /// or when `period` is zero.
    pub fn start(&self, period: Duration) {
        if period.is_zero() {
            tracing::warn!("poller not started: interval must be greater than zero");
            return;
        }

        let mut timer = self.inner.timer.lock();
        if timer.as_ref().is_some_and(|handle| !handle.is_finished()) {
            tracing::debug!("poller already running");
            return;
        }

        let poller = self.clone();
        *timer = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                // Detached so stop() never cancels a fetch in flight.
                let cycle = poller.clone();
                tokio::spawn(async move {
                    cycle.fetch_now().await;
                });
            }
        }));
        tracing::info!("poller started ({} ms interval)", period.as_millis());
    }

    /// Cancels future ticks. Fetches already issued still land in the store.
    pub fn stop(&self) {
        if let Some(handle) = self.inner.timer.lock().take() {
            handle.abort();
            tracing::info!("poller stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .timer
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// One retrieval cycle, independent of the schedule.
    pub async fn fetch_now(&self) -> FetchOutcome {
        let inner = &self.inner;
        let sequence = inner.next_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        inner.stats.issued.fetch_add(1, Ordering::Relaxed);

        let tokens = match inner.backend.fetch_tokens().await {
            Ok(tokens) => tokens,
            Err(e) => {
                inner.stats.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("fetch #{} from {} failed: {}", sequence, inner.backend.name(), e);
                return FetchOutcome::Failed;
            }
        };

        if let Some(id) = find_duplicate_id(&tokens) {
            inner.stats.failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("fetch #{} rejected: duplicate token id {}", sequence, id);
            return FetchOutcome::Failed;
        }

        let total = tokens.len();
        let newly_appeared = if inner.discard_stale.load(Ordering::Relaxed) {
            let mut newest = inner.newest_applied.lock();
            if *newest > sequence {
                inner.stats.discarded.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("fetch #{} discarded, #{} already applied", sequence, *newest);
                return FetchOutcome::Discarded;
            }
            *newest = sequence;
            inner.store.reconcile(tokens).len()
        } else {
            inner.store.reconcile(tokens).len()
        };
        inner.stats.succeeded.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("fetch #{}: {} tokens, {} new", sequence, total, newly_appeared);

        inner.gate.maybe_notify(newly_appeared, inner.visibility.is_hidden());

        FetchOutcome::Applied { total, newly_appeared }
    }

    pub fn stats(&self) -> &PollerStats {
        &self.inner.stats
    }
}
