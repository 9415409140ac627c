//! Line-delimited JSON dev channel
//!
//! Drives the full engine without a platform transport: inbound events
//! arrive as one JSON object per stdin line, outbound display operations
//! leave as one JSON object per stdout line. A real platform adapter
//! implements [`ChatChannel`] against its API and classifies inbound
//! traffic the same way `classify` does here.

use crate::dialogue::{Button, Command, Event, Inbound, Keyboard, Sender};
use crate::runtime::{ChannelError, ChatChannel, Dispatcher};
use crate::store::{ChatId, MessageId, MessageRef, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::io::{AsyncBufReadExt, BufReader};

/// One inbound stdin line. Button presses carry `callback`; everything
/// else is message text.
#[derive(Debug, Deserialize)]
struct InboundLine {
    user: i64,
    chat: i64,
    name: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    callback: Option<String>,
    #[serde(default)]
    callback_id: Option<String>,
}

/// One outbound stdout line
#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum DisplayOp<'a> {
    Send {
        chat: i64,
        message: i64,
        text: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        keyboard: Option<&'a Keyboard>,
    },
    Edit {
        chat: i64,
        message: i64,
        text: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        keyboard: Option<&'a Keyboard>,
    },
    Delete {
        chat: i64,
        message: i64,
    },
    Ack {
        callback_id: &'a str,
        text: &'a str,
    },
}

/// Channel adapter writing display operations to stdout
pub struct StdioChannel {
    next_message_id: AtomicI64,
}

impl StdioChannel {
    pub fn new() -> Self {
        Self {
            next_message_id: AtomicI64::new(1),
        }
    }

    fn emit(&self, op: &DisplayOp) -> Result<(), ChannelError> {
        write_line(io::stdout().lock(), op)
    }
}

/// One display operation as one JSON line. A write failure (stdout closed
/// by the peer) surfaces as a transport error instead of killing the task.
fn write_line(mut out: impl Write, op: &DisplayOp) -> Result<(), ChannelError> {
    let line = serde_json::to_string(op).map_err(|e| ChannelError::Transport(e.to_string()))?;
    writeln!(out, "{line}").map_err(|e| ChannelError::Transport(e.to_string()))
}

impl Default for StdioChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatChannel for StdioChannel {
    async fn send(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageRef, ChannelError> {
        let msg = MessageRef {
            chat,
            message: MessageId(self.next_message_id.fetch_add(1, Ordering::SeqCst)),
        };
        self.emit(&DisplayOp::Send {
            chat: chat.0,
            message: msg.message.0,
            text,
            keyboard,
        })?;
        Ok(msg)
    }

    async fn edit(
        &self,
        message: &MessageRef,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageRef, ChannelError> {
        self.emit(&DisplayOp::Edit {
            chat: message.chat.0,
            message: message.message.0,
            text,
            keyboard,
        })?;
        Ok(*message)
    }

    async fn delete(&self, message: &MessageRef) -> Result<(), ChannelError> {
        self.emit(&DisplayOp::Delete {
            chat: message.chat.0,
            message: message.message.0,
        })
    }

    async fn ack(&self, callback_id: &str, text: &str) -> Result<(), ChannelError> {
        self.emit(&DisplayOp::Ack { callback_id, text })
    }
}

/// Classify one parsed line into an engine event.
///
/// `None` drops the line: no payload at all, or a button payload the
/// engine does not recognize.
fn classify(line: InboundLine) -> Option<Inbound> {
    let sender = Sender {
        user: UserId(line.user),
        chat: ChatId(line.chat),
        name: line.name,
    };
    let event = if let Some(data) = line.callback {
        let Some(button) = Button::decode(&data) else {
            tracing::warn!(data = %data, "Dropping unrecognized button payload");
            return None;
        };
        Event::ButtonPress {
            button,
            callback_id: line.callback_id.unwrap_or_default(),
        }
    } else if let Some(text) = line.text {
        match Command::parse(&text) {
            Some(command) => Event::Command(command),
            None => Event::FreeText { text },
        }
    } else {
        return None;
    };
    Some(Inbound { sender, event })
}

/// Read inbound events from stdin until EOF, feeding the dispatcher
pub async fn run_stdin_loop<C: ChatChannel + 'static>(
    dispatcher: &Dispatcher<C>,
) -> io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let parsed: InboundLine = match serde_json::from_str(trimmed) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping unparsable input line");
                continue;
            }
        };
        if let Some(inbound) = classify(parsed) {
            dispatcher.dispatch(inbound).await;
        }
    }
    Ok(())
}
