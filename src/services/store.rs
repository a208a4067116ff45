use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::watch;
use crate::models::{Token, TokenId};

/// Authoritative snapshot of listed tokens plus every id seen this session.
///
/// A reconciliation replaces the snapshot wholesale and grows the seen set;
/// both happen under one write lock so readers never observe a half-applied
/// snapshot.
pub struct TokenStore {
    state: RwLock<StoreState>,
    announce_initial: bool,
    revision: watch::Sender<u64>,
}

#[derive(Default)]
struct StoreState {
    snapshot: Vec<Arc<Token>>,
    index: HashMap<TokenId, usize>,
    seen: HashSet<TokenId>,
    reconciliations: u64,
}

impl TokenStore {
    /// Store whose first reconciliation seeds the seen set silently.
    pub fn new() -> Self {
        Self::with_initial_announce(false)
    }

    /// Store that reports the whole first snapshot as newly appeared.
    pub fn announcing_initial() -> Self {
        Self::with_initial_announce(true)
    }

    pub fn with_initial_announce(announce_initial: bool) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: RwLock::new(StoreState::default()),
            announce_initial,
            revision,
        }
    }

    /// Applies a fresh snapshot and returns the tokens never seen before.
    pub fn reconcile(&self, snapshot: Vec<Token>) -> Vec<Arc<Token>> {
        let mut state = self.state.write();
        let first = state.reconciliations == 0;

        let mut newly_appeared = Vec::new();
        let mut index = HashMap::with_capacity(snapshot.len());
        let mut rows = Vec::with_capacity(snapshot.len());

        for (pos, token) in snapshot.into_iter().enumerate() {
            let token = Arc::new(token);
            if state.seen.insert(token.id) && (!first || self.announce_initial) {
                newly_appeared.push(token.clone());
            }
            index.entry(token.id).or_insert(pos);
            rows.push(token);
        }

        state.snapshot = rows;
        state.index = index;
        state.reconciliations += 1;
        let revision = state.reconciliations;
        drop(state);

        self.revision.send_replace(revision);

        tracing::debug!(
            "reconciled revision {}: {} new, {} total",
            revision,
            newly_appeared.len(),
            self.len()
        );
        newly_appeared
    }

    pub fn lookup(&self, id: TokenId) -> Option<Arc<Token>> {
        let state = self.state.read();
        state.index.get(&id).map(|&pos| state.snapshot[pos].clone())
    }

    /// Current snapshot in server order (pointer clones only).
    pub fn snapshot(&self) -> Vec<Arc<Token>> {
        self.state.read().snapshot.clone()
    }

    pub fn len(&self) -> usize {
        self.state.read().snapshot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_seen(&self, id: TokenId) -> bool {
        self.state.read().seen.contains(&id)
    }

    pub fn seen_count(&self) -> usize {
        self.state.read().seen.len()
    }

    pub fn reconciliations(&self) -> u64 {
        self.state.read().reconciliations
    }

    /// Receiver that observes the reconciliation counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}
