//! Effects produced by dialogue transitions

use super::screens::Screen;

/// Effects to be executed in order after a transition.
///
/// The transition stays pure by describing I/O here; the runtime executor
/// performs it and owns the failure policy per effect.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Insert the sender into the user table
    RegisterSender,

    /// Plain text message; never tracked as the live message
    SendText { text: String },

    /// Send a screen as a fresh message and track it as the live message
    SendScreen { screen: Screen },

    /// Edit the live message into a screen; falls back to a fresh send when
    /// there is no live message or the edit fails
    ReplaceScreen { screen: Screen },

    /// Best-effort delete of the live message
    DeleteLive,

    /// Answer the triggering button press with a short toast
    Acknowledge { text: String },

    /// Persist one expense stamped with the current time, then confirm it
    RecordExpense { category: String, amount: f64 },

    /// Resolve the period, query sums, edit the live message into the report
    ShowReport { period_key: String },

    /// Admin: send the registered-user count
    SendUserCount,

    /// Admin: stream the log file in chunks
    SendLogFile,
}

impl Effect {
    pub fn text(text: impl Into<String>) -> Self {
        Effect::SendText { text: text.into() }
    }

    pub fn screen(screen: Screen) -> Self {
        Effect::SendScreen { screen }
    }

    pub fn replace(screen: Screen) -> Self {
        Effect::ReplaceScreen { screen }
    }
}
