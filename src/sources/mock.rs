use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, oneshot};
use crate::models::Token;
use super::{BackendError, TokenBackend};

pub(crate) type Responder = oneshot::Sender<Result<Vec<Token>, BackendError>>;

/// Scripted backend for engine tests.
///
/// Fetches pop queued responses (an empty queue yields an empty snapshot).
/// A gated backend instead hands every fetch's responder to the test, so the
/// test decides when and in which order fetches complete.
pub(crate) struct MockBackend {
    responses: Mutex<VecDeque<Result<Vec<Token>, BackendError>>>,
    gate: Option<mpsc::UnboundedSender<Responder>>,
    scam_result: Mutex<Result<(), BackendError>>,
    scam_calls: Mutex<Vec<String>>,
    fetch_calls: AtomicUsize,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            gate: None,
            scam_result: Mutex::new(Ok(())),
            scam_calls: Mutex::new(Vec::new()),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn gated() -> (Self, mpsc::UnboundedReceiver<Responder>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut backend = Self::new();
        backend.gate = Some(tx);
        (backend, rx)
    }

    pub(crate) fn push(&self, response: Result<Vec<Token>, BackendError>) {
        self.responses.lock().push_back(response);
    }

    pub(crate) fn fail_mark_scam(&self, error: BackendError) {
        *self.scam_result.lock() = Err(error);
    }

    pub(crate) fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn scam_calls(&self) -> Vec<String> {
        self.scam_calls.lock().clone()
    }
}

#[async_trait]
impl TokenBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_tokens(&self) -> Result<Vec<Token>, BackendError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            let (tx, rx) = oneshot::channel();
            if gate.send(tx).is_err() {
                return Err(BackendError::Network("gate closed".to_string()));
            }
            return rx
                .await
                .unwrap_or_else(|_| Err(BackendError::Network("responder dropped".to_string())));
        }

        self.responses.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn mark_scam(&self, pair_address: &str) -> Result<(), BackendError> {
        self.scam_calls.lock().push(pair_address.to_string());
        self.scam_result.lock().clone()
    }
}
