//! Dialogue state types

use crate::catalog::Catalog;
use crate::store::{ChatId, UserId};
use chrono::{DateTime, Utc};

/// Per-user dialogue state.
///
/// Deliberately tiny: everything durable lives in the store, so losing this
/// on restart only abandons an in-flight amount entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DialogueState {
    /// Buttons drive everything; free text is not expected
    #[default]
    Idle,
    /// The next free-text message is the amount for this category
    AwaitingAmount { category: String },
}

/// Read-only context for a single transition: the catalog plus everything
/// the executor looked up about the sender before dispatching.
pub struct TurnContext<'a> {
    pub catalog: &'a Catalog,
    pub sender: &'a Sender,
    /// `Some` when the sender is already registered
    pub registered_at: Option<DateTime<Utc>>,
    pub is_admin: bool,
    /// Configured admin, named in the access-denied notice
    pub admin_id: Option<UserId>,
}

/// Who an inbound event came from, as reported by the channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub user: UserId,
    pub chat: ChatId,
    pub name: String,
}
