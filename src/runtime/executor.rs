//! Per-user session executor
//!
//! One `UserSession` per active user, consuming that user's inbound events
//! in arrival order. Each event goes through the pure dialogue transition;
//! the resulting effects are performed here against the store and the
//! channel, including the live-message bookkeeping.

use super::traits::{ChannelError, ChatChannel};
use crate::admin;
use crate::catalog::Catalog;
use crate::dialogue::{
    transition, DialogueState, Effect, Event, Inbound, Keyboard, Sender, TurnContext,
    DATE_TIME_FORMAT,
};
use crate::periods;
use crate::report::format_report;
use crate::store::{Expense, ExpenseStore, MessageRef, StoreError, User, UserId};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Failure that aborts the remaining effects of the current event.
///
/// Store failures the user can be told about are reported in-band and do
/// not become a `SessionError`; only a broken channel (or a store failure
/// that invalidates the rest of the effect list) cuts the turn short.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Session executor for a single user
pub struct UserSession<C: ChatChannel> {
    user: UserId,
    state: DialogueState,
    store: ExpenseStore,
    catalog: Arc<Catalog>,
    channel: Arc<C>,
    admin_id: Option<UserId>,
    log_path: PathBuf,
    event_rx: mpsc::Receiver<Inbound>,
}

impl<C: ChatChannel> UserSession<C> {
    pub fn new(
        user: UserId,
        store: ExpenseStore,
        catalog: Arc<Catalog>,
        channel: Arc<C>,
        admin_id: Option<UserId>,
        log_path: PathBuf,
        event_rx: mpsc::Receiver<Inbound>,
    ) -> Self {
        Self {
            user,
            state: DialogueState::Idle,
            store,
            catalog,
            channel,
            admin_id,
            log_path,
            event_rx,
        }
    }

    /// Consume inbound events until the dispatcher drops the sender side
    pub async fn run(mut self) {
        tracing::debug!(user = %self.user, "Starting user session");
        while let Some(inbound) = self.event_rx.recv().await {
            self.process(inbound).await;
        }
        tracing::debug!(user = %self.user, "User session stopped");
    }

    /// Apply one inbound event: pure transition, then effects in order
    pub(crate) async fn process(&mut self, inbound: Inbound) {
        let Inbound { sender, event } = inbound;

        let registered_at = match self.store.registration(sender.user) {
            Ok(registered_at) => registered_at,
            Err(e) => {
                tracing::error!(user = %sender.user, error = %e, "Registration lookup failed");
                if let Err(e) = self.send_error_notice(&sender).await {
                    tracing::error!(user = %sender.user, error = %e, "Error notice failed");
                }
                return;
            }
        };

        let callback_id = match &event {
            Event::ButtonPress { callback_id, .. } => Some(callback_id.clone()),
            _ => None,
        };

        let ctx = TurnContext {
            catalog: self.catalog.as_ref(),
            sender: &sender,
            registered_at,
            is_admin: self.admin_id == Some(sender.user),
            admin_id: self.admin_id,
        };
        let result = transition(&self.state, &ctx, event);
        tracing::debug!(
            user = %sender.user,
            state = ?self.state,
            next = ?result.new_state,
            effects = result.effects.len(),
            "Applied transition"
        );

        // Commit the state before any I/O; a failed effect must not leave
        // the dialogue pointing at the pre-transition state.
        self.state = result.new_state;

        for effect in result.effects {
            if let Err(e) = self
                .execute_effect(&sender, callback_id.as_deref(), effect)
                .await
            {
                tracing::error!(user = %sender.user, error = %e, "Aborting remaining effects");
                break;
            }
        }
    }

    async fn execute_effect(
        &self,
        sender: &Sender,
        callback_id: Option<&str>,
        effect: Effect,
    ) -> Result<(), SessionError> {
        tracing::debug!(user = %sender.user, ?effect, "Executing effect");
        match effect {
            Effect::RegisterSender => self.register_sender(sender).await,
            Effect::SendText { text } => {
                self.channel.send(sender.chat, &text, None).await?;
                Ok(())
            }
            Effect::SendScreen { screen } => {
                let (text, keyboard) = screen.render(self.catalog.as_ref());
                let msg = self
                    .channel
                    .send(sender.chat, &text, Some(&keyboard))
                    .await?;
                self.track(sender.user, msg);
                Ok(())
            }
            Effect::ReplaceScreen { screen } => {
                let (text, keyboard) = screen.render(self.catalog.as_ref());
                self.show(sender, &text, Some(&keyboard)).await?;
                Ok(())
            }
            Effect::DeleteLive => {
                if let Some(live) = self.live_handle(sender.user) {
                    if let Err(e) = self.channel.delete(&live).await {
                        tracing::warn!(user = %sender.user, error = %e, "Delete of live message failed");
                    }
                }
                Ok(())
            }
            Effect::Acknowledge { text } => {
                if let Some(id) = callback_id {
                    if let Err(e) = self.channel.ack(id, &text).await {
                        tracing::warn!(user = %sender.user, error = %e, "Acknowledge failed");
                    }
                }
                Ok(())
            }
            Effect::RecordExpense { category, amount } => {
                self.record_expense(sender, &category, amount).await
            }
            Effect::ShowReport { period_key } => self.show_report(sender, &period_key).await,
            Effect::SendUserCount => self.send_user_count(sender).await,
            Effect::SendLogFile => self.send_log_file(sender).await,
        }
    }

    async fn register_sender(&self, sender: &Sender) -> Result<(), SessionError> {
        let user = User {
            id: sender.user,
            name: sender.name.clone(),
            registered_at: Utc::now(),
        };
        match self.store.register_user(&user) {
            Ok(()) => {
                tracing::info!(user = %sender.user, name = %sender.name, "Registered new user");
                Ok(())
            }
            // A racing second /start: the first insert won, nothing to do
            Err(StoreError::DuplicateUser(_)) => {
                tracing::debug!(user = %sender.user, "Already registered");
                Ok(())
            }
            Err(e) => {
                tracing::error!(user = %sender.user, error = %e, "Registration failed");
                self.send_error_notice(sender).await?;
                Err(e.into())
            }
        }
    }

    async fn record_expense(
        &self,
        sender: &Sender,
        category: &str,
        amount: f64,
    ) -> Result<(), SessionError> {
        let occurred_at = Utc::now();
        let expense = Expense {
            user_id: sender.user,
            occurred_at,
            category: category.to_string(),
            amount,
        };
        if let Err(e) = self.store.record_expense(&expense) {
            // Tell the user and let the menu redraw proceed
            tracing::error!(user = %sender.user, error = %e, "Could not store expense");
            self.send_error_notice(sender).await?;
            return Ok(());
        }

        let date = occurred_at.format(DATE_TIME_FORMAT).to_string();
        let amount_text = format!("{amount:.2}");
        let label = self.catalog.category_label(category).unwrap_or(category);
        let text = self.catalog.messages.expense_added.fill(&[
            ("date", &date),
            ("category", label),
            ("amount", &amount_text),
        ]);
        self.channel.send(sender.chat, &text, None).await?;
        Ok(())
    }

    async fn show_report(&self, sender: &Sender, period_key: &str) -> Result<(), SessionError> {
        let (start, end) = periods::resolve(period_key, Utc::now());
        let sums = match self.store.sum_by_category(sender.user, start, end) {
            Ok(sums) => sums,
            Err(e) => {
                tracing::error!(user = %sender.user, error = %e, "Report query failed");
                self.send_error_notice(sender).await?;
                return Ok(());
            }
        };
        let label = self.catalog.period_label(period_key).unwrap_or(period_key);
        let text = format_report(self.catalog.as_ref(), label, &sums);
        // The report replaces the live menu; it carries no buttons, the
        // fresh main menu arrives as the next effect.
        self.show(sender, &text, None).await?;
        Ok(())
    }

    async fn send_user_count(&self, sender: &Sender) -> Result<(), SessionError> {
        let count = match self.store.user_count() {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(user = %sender.user, error = %e, "User count query failed");
                self.send_error_notice(sender).await?;
                return Ok(());
            }
        };
        let text = admin::user_count_report(self.catalog.as_ref(), Utc::now(), count);
        self.channel.send(sender.chat, &text, None).await?;
        Ok(())
    }

    async fn send_log_file(&self, sender: &Sender) -> Result<(), SessionError> {
        let contents = match tokio::fs::read_to_string(&self.log_path).await {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!(path = %self.log_path.display(), error = %e, "Could not read log file");
                let text = self.catalog.messages.log_read_failed.fill(&[]);
                self.channel.send(sender.chat, &text, None).await?;
                return Ok(());
            }
        };
        let chunks = admin::chunk_log(&contents);
        tracing::debug!(user = %sender.user, chunks = chunks.len(), "Sending log file");
        for chunk in chunks {
            self.channel.send(sender.chat, &chunk, None).await?;
        }
        Ok(())
    }

    /// Edit the live message into `text`; fall back to a fresh send when
    /// there is no live message or the platform refuses the edit.
    async fn show(
        &self,
        sender: &Sender,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), ChannelError> {
        if let Some(live) = self.live_handle(sender.user) {
            match self.channel.edit(&live, text, keyboard).await {
                Ok(msg) => {
                    self.track(sender.user, msg);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(user = %sender.user, error = %e, "Edit failed, sending fresh message");
                }
            }
        }
        let msg = self.channel.send(sender.chat, text, keyboard).await?;
        self.track(sender.user, msg);
        Ok(())
    }

    async fn send_error_notice(&self, sender: &Sender) -> Result<(), ChannelError> {
        let text = self.catalog.messages.something_went_wrong.fill(&[]);
        self.channel.send(sender.chat, &text, None).await?;
        Ok(())
    }

    fn live_handle(&self, user: UserId) -> Option<MessageRef> {
        match self.store.display_handle(user) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(user = %user, error = %e, "Live-message lookup failed");
                None
            }
        }
    }

    /// Persist `msg` as the user's live message, last write wins
    fn track(&self, user: UserId, msg: MessageRef) {
        if let Err(e) = self.store.set_display_handle(user, msg) {
            tracing::warn!(user = %user, error = %e, "Could not persist live-message handle");
        }
    }
}
