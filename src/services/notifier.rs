use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, OnceCell};
use crate::models::{LaunchNotice, PermissionState};

/// Host permission prompt. Asked at most once per gate.
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    async fn request(&self) -> PermissionState;
}

/// Answers the prompt with a fixed, configured decision.
pub struct StaticPermission(pub PermissionState);

#[async_trait]
impl PermissionProvider for StaticPermission {
    async fn request(&self) -> PermissionState {
        self.0
    }
}

/// "Is the page hidden from the operator right now?"
pub trait VisibilityProbe: Send + Sync {
    fn is_hidden(&self) -> bool;
}

/// Visibility flag flipped by whatever hosts the page.
pub struct PageVisibility {
    hidden: AtomicBool,
}

impl PageVisibility {
    pub fn new(hidden: bool) -> Self {
        Self { hidden: AtomicBool::new(hidden) }
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.hidden.store(hidden, Ordering::Relaxed);
    }
}

impl VisibilityProbe for PageVisibility {
    fn is_hidden(&self) -> bool {
        self.hidden.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NotifyError {
    #[error("notifications unsupported: {0}")]
    Unsupported(String),
    #[error("no one is listening")]
    NoSubscribers,
}

/// Where emitted notices go.
pub trait NotificationSink: Send + Sync {
    fn dispatch(&self, notice: &LaunchNotice) -> Result<(), NotifyError>;
}

pub struct LogSink;

impl NotificationSink for LogSink {
    fn dispatch(&self, notice: &LaunchNotice) -> Result<(), NotifyError> {
        tracing::info!("🔔 {}", notice.message);
        Ok(())
    }
}

/// Logs and fans notices out to live subscribers (websocket clients).
pub struct BroadcastSink {
    tx: broadcast::Sender<LaunchNotice>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LaunchNotice> {
        self.tx.subscribe()
    }
}

impl NotificationSink for BroadcastSink {
    fn dispatch(&self, notice: &LaunchNotice) -> Result<(), NotifyError> {
        tracing::info!("🔔 {}", notice.message);
        self.tx
            .send(notice.clone())
            .map(|_| ())
            .map_err(|_| NotifyError::NoSubscribers)
    }
}

/// Decides whether a batch of new launches becomes a notification.
pub struct NotificationGate {
    provider: Arc<dyn PermissionProvider>,
    permission: OnceCell<PermissionState>,
    sink: Arc<dyn NotificationSink>,
}

impl NotificationGate {
    pub fn new(provider: Arc<dyn PermissionProvider>, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            provider,
            permission: OnceCell::new(),
            sink,
        }
    }

    /// Negotiates permission on first call; later calls return the cached answer.
    pub async fn request_permission(&self) -> PermissionState {
        *self.permission
            .get_or_init(|| async {
                let state = self.provider.request().await;
                tracing::info!("notification permission: {}", state);
                state
            })
            .await
    }

    /// `Default` until `request_permission` has completed.
    pub fn permission(&self) -> PermissionState {
        self.permission.get().copied().unwrap_or_default()
    }

    /// Emits one notice iff there is something new, the page is hidden and
    /// permission was granted. Anything else is dropped, never queued.
    pub fn maybe_notify(&self, newly_appeared: usize, page_hidden: bool) -> Option<LaunchNotice> {
        if newly_appeared == 0 || !page_hidden {
            return None;
        }
        if self.permission() != PermissionState::Granted {
            tracing::debug!("{} new tokens, notification permission not granted", newly_appeared);
            return None;
        }

        let notice = LaunchNotice::new(newly_appeared);
        if let Err(e) = self.sink.dispatch(&notice) {
            tracing::debug!("notification dispatch failed: {}", e);
        }
        Some(notice)
    }
}
