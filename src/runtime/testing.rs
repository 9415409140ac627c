//! Mock implementations for testing
//!
//! These mocks enable end-to-end engine tests without real I/O: a channel
//! that records every display operation, and a harness driving one user's
//! session directly against an in-memory store.

use super::traits::{ChannelError, ChatChannel};
use super::UserSession;
use crate::catalog::Catalog;
use crate::dialogue::{Button, Command, Event, Inbound, Keyboard, Sender};
use crate::store::{ChatId, ExpenseStore, MessageId, MessageRef, UserId};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

// ============================================================================
// Mock Channel
// ============================================================================

/// One outbound operation as seen by the mock channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOp {
    Send {
        msg: MessageRef,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Edit {
        target: MessageRef,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Delete {
        target: MessageRef,
    },
    Ack {
        callback_id: String,
        text: String,
    },
}

/// Mock channel recording every display operation
pub struct MockChannel {
    ops: Mutex<Vec<ChannelOp>>,
    next_message_id: AtomicI64,
    fail_edits: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MockChannel {
    pub fn new() -> Self {
        Self {
            ops: Mutex::new(Vec::new()),
            next_message_id: AtomicI64::new(1),
            fail_edits: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent edit fail as if the target were gone
    pub fn fail_edits(&self, fail: bool) {
        self.fail_edits.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent delete fail as if the target were gone
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of the recorded operations
    pub fn ops(&self) -> Vec<ChannelOp> {
        self.ops.lock().unwrap().clone()
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatChannel for MockChannel {
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
        self.ops.lock().unwrap().push(ChannelOp::Send {
            msg,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(msg)
    }

    async fn edit(
        &self,
        message: &MessageRef,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageRef, ChannelError> {
        if self.fail_edits.load(Ordering::SeqCst) {
            return Err(ChannelError::MessageGone);
        }
        self.ops.lock().unwrap().push(ChannelOp::Edit {
            target: *message,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(*message)
    }

    async fn delete(&self, message: &MessageRef) -> Result<(), ChannelError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(ChannelError::MessageGone);
        }
        self.ops
            .lock()
            .unwrap()
            .push(ChannelOp::Delete { target: *message });
        Ok(())
    }

    async fn ack(&self, callback_id: &str, text: &str) -> Result<(), ChannelError> {
        self.ops.lock().unwrap().push(ChannelOp::Ack {
            callback_id: callback_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}

// ============================================================================
// Test Session Harness
// ============================================================================

/// One user's session driven directly, with the store and channel exposed
/// for assertions
pub struct TestSession {
    pub store: ExpenseStore,
    pub channel: Arc<MockChannel>,
    pub sender: Sender,
    session: UserSession<MockChannel>,
    _event_tx: mpsc::Sender<Inbound>,
}

impl TestSession {
    pub fn new() -> Self {
        Self::build(ExpenseStore::open_in_memory().unwrap(), None, None)
    }

    pub fn with_admin(admin: UserId) -> Self {
        Self::build(ExpenseStore::open_in_memory().unwrap(), Some(admin), None)
    }

    pub fn with_admin_and_log(admin: UserId, log_path: PathBuf) -> Self {
        Self::build(
            ExpenseStore::open_in_memory().unwrap(),
            Some(admin),
            Some(log_path),
        )
    }

    /// Fresh session over an existing store, as after a process restart
    pub fn restarted(store: ExpenseStore) -> Self {
        Self::build(store, None, None)
    }

    fn build(store: ExpenseStore, admin_id: Option<UserId>, log_path: Option<PathBuf>) -> Self {
        let channel = Arc::new(MockChannel::new());
        let sender = Sender {
            user: UserId(11),
            chat: ChatId(100),
            name: "Ada".to_string(),
        };
        let (event_tx, event_rx) = mpsc::channel(4);
        let session = UserSession::new(
            sender.user,
            store.clone(),
            Arc::new(Catalog::fixture()),
            Arc::clone(&channel),
            admin_id,
            log_path.unwrap_or_else(|| PathBuf::from("/nonexistent/expense-bot.log")),
            event_rx,
        );
        Self {
            store,
            channel,
            sender,
            session,
            _event_tx: event_tx,
        }
    }

    /// Feed one event through the session as the fixture sender
    pub async fn event(&mut self, event: Event) {
        let inbound = Inbound {
            sender: self.sender.clone(),
            event,
        };
        self.session.process(inbound).await;
    }

    pub async fn command(&mut self, text: &str) {
        let command = Command::parse(text).expect("not a command");
        self.event(Event::Command(command)).await;
    }

    pub async fn press(&mut self, data: &str) {
        let button = Button::decode(data).expect("bad button payload");
        self.event(Event::ButtonPress {
            button,
            callback_id: format!("cb-{data}"),
        })
        .await;
    }

    pub async fn text(&mut self, text: &str) {
        self.event(Event::FreeText {
            text: text.to_string(),
        })
        .await;
    }

    /// Persisted live-message handle for the fixture user
    pub fn live_handle(&self) -> Option<MessageRef> {
        self.store.display_handle(self.sender.user).unwrap()
    }
}

impl Default for TestSession {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::Screen;
    use crate::periods;
    use crate::runtime::Dispatcher;
    use crate::store::Expense;
    use chrono::Utc;

    #[tokio::test]
    async fn test_start_registers_and_tracks_menu() {
        let mut s = TestSession::new();
        s.command("/start").await;

        assert!(s.store.registration(s.sender.user).unwrap().is_some());

        let ops = s.channel.ops();
        assert_eq!(ops.len(), 2);
        match &ops[0] {
            ChannelOp::Send { text, keyboard, .. } => {
                assert_eq!(text, "Welcome, Ada!");
                assert!(keyboard.is_none());
            }
            other => panic!("Expected welcome send, got {other:?}"),
        }
        match &ops[1] {
            ChannelOp::Send {
                msg,
                text,
                keyboard,
            } => {
                assert_eq!(text, "Select an action:");
                assert!(keyboard.is_some());
                assert_eq!(s.live_handle(), Some(*msg));
            }
            other => panic!("Expected menu send, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_second_start_deletes_live_and_welcomes_back() {
        let mut s = TestSession::new();
        s.command("/start").await;
        let live = s.live_handle().unwrap();

        s.command("/start").await;

        let ops = s.channel.ops();
        assert_eq!(ops.len(), 5);
        assert_eq!(ops[2], ChannelOp::Delete { target: live });
        match &ops[3] {
            ChannelOp::Send { text, .. } => {
                assert!(text.starts_with("Welcome back, Ada! Registered on"));
            }
            other => panic!("Expected welcome-back send, got {other:?}"),
        }
        // The fresh menu becomes the live message
        match &ops[4] {
            ChannelOp::Send { msg, .. } => assert_eq!(s.live_handle(), Some(*msg)),
            other => panic!("Expected menu send, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_delete_does_not_abort_the_turn() {
        let mut s = TestSession::new();
        s.command("/start").await;

        s.channel.fail_deletes(true);
        s.command("/start").await;

        // No delete is recorded; welcome-back and the fresh menu still go out
        let ops = s.channel.ops();
        assert_eq!(ops.len(), 4);
        match &ops[2] {
            ChannelOp::Send { text, .. } => {
                assert!(text.starts_with("Welcome back, Ada!"));
            }
            other => panic!("Expected welcome-back send, got {other:?}"),
        }
        match &ops[3] {
            ChannelOp::Send { msg, .. } => assert_eq!(s.live_handle(), Some(*msg)),
            other => panic!("Expected menu send, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_expense_flow_edits_menus_in_place() {
        let mut s = TestSession::new();
        s.command("/start").await;
        let live = s.live_handle().unwrap();

        s.press("menu:new").await;
        s.press("category:groceries").await;
        s.text("12.50").await;

        let (start, end) = periods::resolve("day", Utc::now());
        let sums = s.store.sum_by_category(s.sender.user, start, end).unwrap();
        assert!((sums["groceries"] - 12.5).abs() < f64::EPSILON);

        let ops = s.channel.ops();
        // welcome, menu, edit->categories, ack, edit->amount, confirmation, menu
        assert_eq!(ops.len(), 7);
        match &ops[2] {
            ChannelOp::Edit { target, text, .. } => {
                assert_eq!(*target, live);
                assert_eq!(text, "Select a category:");
            }
            other => panic!("Expected category-menu edit, got {other:?}"),
        }
        assert_eq!(
            ops[3],
            ChannelOp::Ack {
                callback_id: "cb-category:groceries".to_string(),
                text: "Category: Groceries".to_string(),
            }
        );
        match &ops[4] {
            ChannelOp::Edit { target, text, .. } => {
                assert_eq!(*target, live);
                assert_eq!(text, "Enter the amount:");
            }
            other => panic!("Expected amount-prompt edit, got {other:?}"),
        }
        match &ops[5] {
            ChannelOp::Send { text, keyboard, .. } => {
                assert!(text.starts_with("Added"));
                assert!(text.contains("Groceries"));
                assert!(text.ends_with("12.50"));
                assert!(keyboard.is_none());
            }
            other => panic!("Expected confirmation send, got {other:?}"),
        }
        // Fresh menu under the confirmation takes over as live
        match &ops[6] {
            ChannelOp::Send { msg, text, .. } => {
                assert_eq!(text, "Select an action:");
                assert_eq!(s.live_handle(), Some(*msg));
            }
            other => panic!("Expected menu send, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bad_amount_reprompts_then_accepts() {
        let mut s = TestSession::new();
        s.command("/start").await;
        s.press("menu:new").await;
        s.press("category:health").await;

        s.text("twelve").await;
        match s.channel.ops().last().unwrap() {
            ChannelOp::Send { text, .. } => {
                assert_eq!(text, "That is not a number, try again.");
            }
            other => panic!("Expected re-prompt send, got {other:?}"),
        }

        // The capture stayed armed; a valid amount still lands
        s.text("5").await;
        let (start, end) = periods::resolve("day", Utc::now());
        let sums = s.store.sum_by_category(s.sender.user, start, end).unwrap();
        assert!((sums["health"] - 5.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_report_replaces_live_message() {
        let mut s = TestSession::new();
        s.command("/start").await;
        let live = s.live_handle().unwrap();

        for (category, amount) in [("groceries", 10.0), ("health", 2.5)] {
            s.store
                .record_expense(&Expense {
                    user_id: s.sender.user,
                    occurred_at: Utc::now(),
                    category: category.to_string(),
                    amount,
                })
                .unwrap();
        }

        s.press("menu:list").await;
        s.press("period:day").await;

        let ops = s.channel.ops();
        // welcome, menu, edit->periods, ack, edit->report, fresh menu
        assert_eq!(ops.len(), 6);
        match &ops[2] {
            ChannelOp::Edit { text, .. } => assert_eq!(text, "Select a period:"),
            other => panic!("Expected period-menu edit, got {other:?}"),
        }
        assert_eq!(
            ops[3],
            ChannelOp::Ack {
                callback_id: "cb-period:day".to_string(),
                text: "Period: Day".to_string(),
            }
        );
        assert_eq!(
            ops[4],
            ChannelOp::Edit {
                target: live,
                text: "Spending by category for Day:\nGroceries: 10.00\nHealth: 2.50\n\nTotal: 12.50"
                    .to_string(),
                keyboard: None,
            }
        );
        match &ops[5] {
            ChannelOp::Send { msg, text, .. } => {
                assert_eq!(text, "Select an action:");
                assert_eq!(s.live_handle(), Some(*msg));
            }
            other => panic!("Expected menu send, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_edit_fallback_sends_fresh_tracked_message() {
        let mut s = TestSession::new();
        s.command("/start").await;
        let live = s.live_handle().unwrap();

        s.channel.fail_edits(true);
        s.press("menu:new").await;

        match s.channel.ops().last().unwrap() {
            ChannelOp::Send { msg, text, .. } => {
                assert_eq!(text, "Select a category:");
                assert_ne!(*msg, live);
                assert_eq!(s.live_handle(), Some(*msg));
            }
            other => panic!("Expected fallback send, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_restart_reuses_persisted_handle() {
        let mut s = TestSession::new();
        s.command("/start").await;
        let live = s.live_handle().unwrap();

        // New session over the same store, as after a process restart
        let mut s2 = TestSession::restarted(s.store.clone());
        s2.press("menu:new").await;

        let ops = s2.channel.ops();
        match &ops[0] {
            ChannelOp::Edit { target, .. } => assert_eq!(*target, live),
            other => panic!("Expected edit of the persisted live message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_admin_command_denied_for_other_users() {
        let mut s = TestSession::with_admin(UserId(999));
        s.command("/start").await;
        s.command("/countusers").await;

        let ops = s.channel.ops();
        match &ops[3] {
            ChannelOp::Send { text, .. } => {
                assert_eq!(text, "Admin only. Admin id: 999, your id: 11.");
            }
            other => panic!("Expected denial send, got {other:?}"),
        }
        // Denial redraws the menu
        match ops.last().unwrap() {
            ChannelOp::Send { text, .. } => assert_eq!(text, "Select an action:"),
            other => panic!("Expected menu send, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_admin_user_count() {
        // Fixture sender is the admin
        let mut s = TestSession::with_admin(UserId(11));
        s.command("/start").await;
        let before = s.channel.ops().len();

        s.command("/countusers").await;

        let ops = s.channel.ops();
        // One plain send, no menu redraw
        assert_eq!(ops.len(), before + 1);
        match ops.last().unwrap() {
            ChannelOp::Send { text, keyboard, .. } => {
                assert!(text.starts_with("As of"));
                assert!(text.ends_with("registered users: 1"));
                assert!(keyboard.is_none());
            }
            other => panic!("Expected count send, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_admin_logs_sends_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot.log");
        std::fs::write(&path, "line one\nline two\n").unwrap();

        let mut s = TestSession::with_admin_and_log(UserId(11), path);
        s.command("/logs").await;

        let ops = s.channel.ops();
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            ChannelOp::Send { text, .. } => assert_eq!(text, "line one\nline two\n"),
            other => panic!("Expected log-chunk send, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_admin_logs_unreadable_file() {
        // Default harness log path does not exist
        let mut s = TestSession::with_admin(UserId(11));
        s.command("/logs").await;

        match s.channel.ops().last().unwrap() {
            ChannelOp::Send { text, .. } => assert_eq!(text, "Could not read the log file."),
            other => panic!("Expected failure notice, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stale_button_produces_no_output() {
        let mut s = TestSession::new();
        s.command("/start").await;
        let before = s.channel.ops().len();

        s.press("category:vices").await;

        assert_eq!(s.channel.ops().len(), before);
    }

    /// Screens rendered through the executor match direct rendering
    #[tokio::test]
    async fn test_screen_payloads_survive_the_channel() {
        let mut s = TestSession::new();
        s.command("/start").await;
        s.press("menu:new").await;

        let (_, expected) = Screen::CategoryMenu.render(&Catalog::fixture());
        match s.channel.ops().last().unwrap() {
            ChannelOp::Edit { keyboard, .. } => assert_eq!(keyboard.as_ref(), Some(&expected)),
            other => panic!("Expected category-menu edit, got {other:?}"),
        }
    }

    /// Dispatcher spawns one session per user, keeps per-user order, and
    /// drains queued events on shutdown
    #[tokio::test]
    async fn test_dispatcher_routes_per_user() {
        let store = ExpenseStore::open_in_memory().unwrap();
        let channel = Arc::new(MockChannel::new());
        let dispatcher = Dispatcher::new(
            store.clone(),
            Arc::new(Catalog::fixture()),
            Arc::clone(&channel),
            None,
            PathBuf::from("/nonexistent/expense-bot.log"),
        );

        let ada = Sender {
            user: UserId(1),
            chat: ChatId(10),
            name: "Ada".to_string(),
        };
        let bob = Sender {
            user: UserId(2),
            chat: ChatId(20),
            name: "Bob".to_string(),
        };

        // Ada runs a whole expense entry; Bob just registers. The amount
        // only lands if her events are processed in dispatch order.
        let ada_events = [
            Event::Command(Command::Start),
            Event::ButtonPress {
                button: Button::NewExpense,
                callback_id: "cb-1".to_string(),
            },
            Event::ButtonPress {
                button: Button::Category("groceries".to_string()),
                callback_id: "cb-2".to_string(),
            },
            Event::FreeText {
                text: "12.50".to_string(),
            },
        ];
        for event in ada_events {
            dispatcher
                .dispatch(Inbound {
                    sender: ada.clone(),
                    event,
                })
                .await;
        }
        dispatcher
            .dispatch(Inbound {
                sender: bob.clone(),
                event: Event::Command(Command::Start),
            })
            .await;

        dispatcher.shutdown().await;

        assert!(store.registration(UserId(1)).unwrap().is_some());
        assert!(store.registration(UserId(2)).unwrap().is_some());

        let (start, end) = periods::resolve("day", Utc::now());
        let sums = store.sum_by_category(UserId(1), start, end).unwrap();
        assert!((sums["groceries"] - 12.5).abs() < f64::EPSILON);

        // Bob's chat saw exactly his own welcome and menu
        let bob_texts: Vec<String> = channel
            .ops()
            .iter()
            .filter_map(|op| match op {
                ChannelOp::Send { msg, text, .. } if msg.chat == bob.chat => Some(text.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(bob_texts.len(), 2);
        assert_eq!(bob_texts[0], "Welcome, Bob!");
        assert_eq!(bob_texts[1], "Select an action:");
    }
}
