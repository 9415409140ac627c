//! Per-user dispatch of inbound events
//!
//! One session task per active user: events for the same user are processed
//! strictly in arrival order, while different users never wait on each
//! other. Sessions are spawned lazily on the first event and live for the
//! life of the process.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::UserSession;
pub use traits::{ChannelError, ChatChannel};

use crate::catalog::Catalog;
use crate::dialogue::Inbound;
use crate::store::{ExpenseStore, UserId};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// Queue depth per user session; dispatch awaits when a user falls behind
const SESSION_QUEUE: usize = 32;

/// Handle to a running user session
struct SessionHandle {
    event_tx: mpsc::Sender<Inbound>,
    task: tokio::task::JoinHandle<()>,
}

/// Routes inbound events to per-user sessions, creating them on demand
pub struct Dispatcher<C: ChatChannel + 'static> {
    store: ExpenseStore,
    catalog: Arc<Catalog>,
    channel: Arc<C>,
    admin_id: Option<UserId>,
    log_path: PathBuf,
    /// Active sessions by user
    sessions: RwLock<HashMap<UserId, SessionHandle>>,
}

impl<C: ChatChannel + 'static> Dispatcher<C> {
    pub fn new(
        store: ExpenseStore,
        catalog: Arc<Catalog>,
        channel: Arc<C>,
        admin_id: Option<UserId>,
        log_path: PathBuf,
    ) -> Self {
        Self {
            store,
            catalog,
            channel,
            admin_id,
            log_path,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Deliver one inbound event to its user's session, starting the
    /// session first if none is running
    pub async fn dispatch(&self, inbound: Inbound) {
        let user = inbound.sender.user;
        let event_tx = self.get_or_spawn(user).await;
        if event_tx.send(inbound).await.is_err() {
            // The session task is gone; drop the stale handle so the next
            // event starts a fresh one
            tracing::warn!(user = %user, "Session queue closed, event dropped");
            self.sessions.write().await.remove(&user);
        }
    }

    async fn get_or_spawn(&self, user: UserId) -> mpsc::Sender<Inbound> {
        // Fast path: already running
        {
            let sessions = self.sessions.read().await;
            if let Some(handle) = sessions.get(&user) {
                return handle.event_tx.clone();
            }
        }

        let mut sessions = self.sessions.write().await;
        // A racing dispatch may have spawned it between the two locks;
        // two sessions for one user would break event ordering
        if let Some(handle) = sessions.get(&user) {
            return handle.event_tx.clone();
        }

        let (event_tx, event_rx) = mpsc::channel(SESSION_QUEUE);
        let session = UserSession::new(
            user,
            self.store.clone(),
            Arc::clone(&self.catalog),
            Arc::clone(&self.channel),
            self.admin_id,
            self.log_path.clone(),
            event_rx,
        );
        let task = tokio::spawn(async move {
            session.run().await;
        });
        tracing::debug!(user = %user, "Started user session");

        sessions.insert(
            user,
            SessionHandle {
                event_tx: event_tx.clone(),
                task,
            },
        );
        event_tx
    }

    /// Close every session queue and wait for already-queued events to
    /// finish executing
    pub async fn shutdown(&self) {
        let sessions = std::mem::take(&mut *self.sessions.write().await);
        for (user, handle) in sessions {
            drop(handle.event_tx);
            if let Err(e) = handle.task.await {
                tracing::warn!(user = %user, error = %e, "Session task failed");
            }
        }
    }
}
