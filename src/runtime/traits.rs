//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::dialogue::Keyboard;
use crate::store::{ChatId, MessageRef};
use async_trait::async_trait;
use thiserror::Error;

/// Channel-side failures, split by what the executor can do about them
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The referenced message no longer exists or cannot be touched
    #[error("Message is gone")]
    MessageGone,
    #[error("Channel transport error: {0}")]
    Transport(String),
}

/// Outbound side of a chat platform.
///
/// Delivery is at-least-once; the engine tolerates duplicate delivery of
/// its own operations. Inbound events arrive separately as
/// [`Inbound`](crate::dialogue::Inbound) envelopes.
#[async_trait]
pub trait ChatChannel: Send + Sync {
    /// Send a message, returning the handle needed to edit or delete it later
    async fn send(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageRef, ChannelError>;

    /// Edit a previously sent message in place
    async fn edit(
        &self,
        message: &MessageRef,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageRef, ChannelError>;

    /// Delete a previously sent message
    async fn delete(&self, message: &MessageRef) -> Result<(), ChannelError>;

    /// Answer a button press with a short toast
    async fn ack(&self, callback_id: &str, text: &str) -> Result<(), ChannelError>;
}
