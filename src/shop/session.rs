//! Conversation Sessions
//!
//! Per-conversation state (menu position, cart, last search results, chat
//! history) and the registry that hands out one exclusively-locked session
//! per conversation id.

use crate::catalog::ProductSnapshot;
use crate::intent::{ChatTurn, Role};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// History turns kept before pruning kicks in.
pub const HISTORY_MAX: usize = 20;
/// Trailing turns retained (plus the leading system turn) after a prune.
pub const HISTORY_KEEP: usize = 12;

/// Which menu governs dispatch for the next inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MenuState {
    #[default]
    Main,
    /// Free-text product search; messages go to the search/cart flow.
    Searching,
}

/// One cart entry. Product ids are unique within a cart; a repeated add
/// merges into the existing line.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    /// Captured at add time, not re-fetched at checkout.
    pub unit_price: f64,
    pub quantity: u32,
    /// Stock as seen by the search that produced the add. Only used for the
    /// validation that created this line and for the checkout decrement.
    pub stock_snapshot: u32,
}

impl CartLine {
    pub fn subtotal(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}

/// Mutable per-conversation state. Owned by at most one in-flight handler
/// at a time (the registry wraps each session in its own mutex).
#[derive(Debug, Default)]
pub struct Session {
    pub menu: MenuState,
    pub cart: Vec<CartLine>,
    pub recent_results: Vec<ProductSnapshot>,
    pub history: Vec<ChatTurn>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore the initial state in place: main menu, empty cart, no
    /// results, no history.
    pub fn reset(&mut self) {
        self.menu = MenuState::Main;
        self.cart.clear();
        self.recent_results.clear();
        self.history.clear();
    }

    /// Seed the extractor history with the system turn, once.
    pub fn seed_history(&mut self, system_prompt: &str) {
        if self.history.is_empty() {
            self.history.push(ChatTurn::system(system_prompt));
        }
    }

    pub fn push_turn(&mut self, turn: ChatTurn) {
        self.history.push(turn);
    }

    /// Bound the history: past [`HISTORY_MAX`] turns, keep the leading
    /// system turn plus the last [`HISTORY_KEEP`].
    pub fn prune_history(&mut self) {
        if self.history.len() <= HISTORY_MAX {
            return;
        }
        let tail_start = self.history.len() - HISTORY_KEEP;
        let mut pruned = Vec::with_capacity(HISTORY_KEEP + 1);
        if self.history.first().map(|t| t.role) == Some(Role::System) {
            pruned.push(self.history[0].clone());
        }
        pruned.extend(self.history[tail_start..].iter().cloned());
        self.history = pruned;
    }

    pub fn cart_total(&self) -> f64 {
        self.cart.iter().map(CartLine::subtotal).sum()
    }
}

/// Registry of live sessions, keyed by conversation id.
///
/// `get_or_create` hands out an `Arc<Mutex<Session>>`; holding that lock for
/// the duration of a handler serializes processing per conversation while
/// distinct conversations proceed in parallel. Sessions are never removed;
/// they live for the process lifetime.
#[derive(Default)]
pub struct SessionRegistry {
    inner: Mutex<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the session for `conversation_id`, creating it with initial
    /// state on first contact. Idempotent.
    pub async fn get_or_create(&self, conversation_id: &str) -> Arc<Mutex<Session>> {
        let mut map = self.inner.lock().await;
        map.entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Session::new())))
            .clone()
    }

    /// Number of sessions seen so far (diagnostics only).
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}
