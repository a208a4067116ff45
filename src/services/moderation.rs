use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use crate::models::{Token, TokenId};
use crate::sources::{BackendError, TokenBackend};
use super::{Poller, TokenStore};

/// A token id as handed over by a caller: numeric, or numeric text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawTokenId {
    Numeric(i64),
    Text(String),
}

impl RawTokenId {
    pub fn resolve(&self) -> Option<TokenId> {
        match self {
            RawTokenId::Numeric(id) => Some(*id),
            RawTokenId::Text(text) => {
                let text = text.trim();
                if let Ok(id) = text.parse::<i64>() {
                    return Some(id);
                }
                // "7.0" names the same token as 7.
                text.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }
        }
    }
}

impl fmt::Display for RawTokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawTokenId::Numeric(id) => write!(f, "{}", id),
            RawTokenId::Text(text) => write!(f, "{:?}", text),
        }
    }
}

macro_rules! raw_id_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for RawTokenId {
            fn from(id: $t) -> Self {
                RawTokenId::Numeric(id as i64)
            }
        })*
    };
}

raw_id_from_int!(i64, i32, u32, u16, u8);

impl From<&str> for RawTokenId {
    fn from(id: &str) -> Self {
        RawTokenId::Text(id.to_string())
    }
}

impl From<String> for RawTokenId {
    fn from(id: String) -> Self {
        RawTokenId::Text(id)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModerationError {
    #[error("not a token id: {0}")]
    InvalidId(String),
    #[error("token {0} is not in the current snapshot")]
    UnknownToken(TokenId),
    #[error("mark_scam for {pair_address} failed: {source}")]
    Request {
        pair_address: String,
        #[source]
        source: BackendError,
    },
}

/// Flags tokens as scams and resynchronizes once the backend accepts.
pub struct ModerationClient {
    backend: Arc<dyn TokenBackend>,
    store: Arc<TokenStore>,
    poller: Poller,
}

impl ModerationClient {
    pub fn new(backend: Arc<dyn TokenBackend>, store: Arc<TokenStore>, poller: Poller) -> Self {
        Self { backend, store, poller }
    }

    /// The flagged row stays in the store until a refreshed snapshot drops it.
    pub async fn mark_as_scam(&self, raw_id: impl Into<RawTokenId>) -> Result<Arc<Token>, ModerationError> {
        let raw_id = raw_id.into();
        let Some(id) = raw_id.resolve() else {
            tracing::error!("mark as scam: invalid token id {}", raw_id);
            return Err(ModerationError::InvalidId(raw_id.to_string()));
        };

        let Some(token) = self.store.lookup(id) else {
            tracing::error!("mark as scam: token {} not found", id);
            return Err(ModerationError::UnknownToken(id));
        };

        if let Err(e) = self.backend.mark_scam(&token.pair_address).await {
            tracing::error!("error marking {} as scam: {}", token.pair_address, e);
            return Err(ModerationError::Request {
                pair_address: token.pair_address.clone(),
                source: e,
            });
        }

        tracing::info!("marked {} ({}) as scam", token.pair_address, token.pair_name);
        self.poller.fetch_now().await;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::token::sample;
    use crate::models::PermissionState;
    use crate::services::notifier::{LogSink, PageVisibility, StaticPermission};
    use crate::services::NotificationGate;
    use crate::sources::mock::MockBackend;

    fn setup(ids: &[TokenId]) -> (Arc<MockBackend>, Arc<TokenStore>, ModerationClient) {
        let backend = Arc::new(MockBackend::new());
        let store = Arc::new(TokenStore::new());
        store.reconcile(ids.iter().map(|&id| sample(id, "2024-05-01T00:00:00Z")).collect());

        let gate = Arc::new(NotificationGate::new(
            Arc::new(StaticPermission(PermissionState::Granted)),
            Arc::new(LogSink),
        ));
        let poller = Poller::new(
            backend.clone(),
            store.clone(),
            gate,
            Arc::new(PageVisibility::new(false)),
        );
        let client = ModerationClient::new(backend.clone(), store.clone(), poller);
        (backend, store, client)
    }

    #[tokio::test]
    async fn unknown_id_makes_no_network_call() {
        let (backend, _store, client) = setup(&[1, 2]);

        let result = client.mark_as_scam(999).await;
        assert_eq!(result.unwrap_err(), ModerationError::UnknownToken(999));
        assert!(backend.scam_calls().is_empty());
        assert_eq!(backend.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn text_and_numeric_ids_resolve_alike() {
        let (backend, _store, client) = setup(&[7]);
        for _ in 0..2 {
            backend.push(Ok(vec![sample(7, "2024-05-01T00:00:00Z")]));
        }

        let by_text = client.mark_as_scam("7").await.unwrap();
        let by_number = client.mark_as_scam(7).await.unwrap();

        assert_eq!(by_text.id, by_number.id);
        assert_eq!(backend.scam_calls(), vec!["0xpair0007".to_string(); 2]);
    }

    #[tokio::test]
    async fn success_posts_pair_address_and_refetches() {
        let (backend, store, client) = setup(&[3, 4]);
        backend.push(Ok(vec![sample(4, "2024-05-01T00:00:00Z")]));

        let flagged = client.mark_as_scam(3u32).await.unwrap();

        assert_eq!(flagged.pair_address, "0xpair0003");
        assert_eq!(backend.scam_calls(), vec!["0xpair0003".to_string()]);
        assert_eq!(backend.fetch_calls(), 1);
        assert!(store.lookup(3).is_none());
    }

    #[tokio::test]
    async fn backend_rejection_leaves_store_untouched() {
        let (backend, store, client) = setup(&[5]);
        backend.fail_mark_scam(BackendError::Status(500));

        let result = client.mark_as_scam("5").await;

        assert!(matches!(result, Err(ModerationError::Request { .. })));
        assert_eq!(backend.fetch_calls(), 0);
        assert!(store.lookup(5).is_some());
    }

    #[tokio::test]
    async fn garbage_id_is_rejected_without_network() {
        let (backend, _store, client) = setup(&[1]);

        let result = client.mark_as_scam("seven").await;
        assert!(matches!(result, Err(ModerationError::InvalidId(_))));
        assert!(backend.scam_calls().is_empty());
    }

    #[test]
    fn resolves_raw_ids() {
        assert_eq!(RawTokenId::from(" 12 ").resolve(), Some(12));
        assert_eq!(RawTokenId::from("7.0").resolve(), Some(7));
        assert_eq!(RawTokenId::from("7.5").resolve(), None);
        assert_eq!(RawTokenId::from("").resolve(), None);
        assert_eq!(RawTokenId::from(-3).resolve(), Some(-3));
    }

    #[test]
    fn decodes_raw_ids_from_json() {
        let numeric: RawTokenId = serde_json::from_str("7").unwrap();
        let text: RawTokenId = serde_json::from_str("\"7\"").unwrap();
        assert_eq!(numeric.resolve(), text.resolve());
    }
}
