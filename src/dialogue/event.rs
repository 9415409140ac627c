//! Inbound events and their wire payloads

use super::state::Sender;

/// One inbound event plus its sender, as delivered by the channel layer
#[derive(Debug, Clone)]
pub struct Inbound {
    pub sender: Sender,
    pub event: Event,
}

/// Inbound event, already classified by the channel layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Slash command
    Command(Command),
    /// Inline-button press; `callback_id` is echoed on acknowledgement
    ButtonPress { button: Button, callback_id: String },
    /// Any other message text
    FreeText { text: String },
}

/// Recognized slash commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    CountUsers,
    Logs,
    /// Slash-prefixed but not one of ours
    Unknown(String),
}

impl Command {
    /// Parse message text as a command; `None` when it is plain text
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.trim().strip_prefix('/')?;
        let name = rest.split_whitespace().next().unwrap_or("");
        Some(match name {
            "start" => Self::Start,
            "help" => Self::Help,
            "countusers" => Self::CountUsers,
            "logs" => Self::Logs,
            _ => Self::Unknown(name.to_string()),
        })
    }
}

/// Inline-button payload, carried end to end in the button's callback data.
/// One discriminated type instead of per-button handlers keeps every press
/// flowing through the same transition dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Button {
    NewExpense,
    MyExpenses,
    Category(String),
    Period(String),
    Back(BackTarget),
}

/// Where a Back button leads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackTarget {
    MainMenu,
    CategoryMenu,
}

impl Button {
    /// Encoding placed into the button's callback data
    pub fn encode(&self) -> String {
        match self {
            Self::NewExpense => "menu:new".to_string(),
            Self::MyExpenses => "menu:list".to_string(),
            Self::Category(key) => format!("category:{key}"),
            Self::Period(key) => format!("period:{key}"),
            Self::Back(BackTarget::MainMenu) => "back:main".to_string(),
            Self::Back(BackTarget::CategoryMenu) => "back:categories".to_string(),
        }
    }

    /// Decode callback data. `None` for stale or foreign payloads, which the
    /// runtime drops with a log line.
    pub fn decode(data: &str) -> Option<Self> {
        let (kind, value) = data.split_once(':')?;
        match (kind, value) {
            ("menu", "new") => Some(Self::NewExpense),
            ("menu", "list") => Some(Self::MyExpenses),
            ("back", "main") => Some(Self::Back(BackTarget::MainMenu)),
            ("back", "categories") => Some(Self::Back(BackTarget::CategoryMenu)),
            ("category", key) if !key.is_empty() => Some(Self::Category(key.to_string())),
            ("period", key) if !key.is_empty() => Some(Self::Period(key.to_string())),
            _ => None,
        }
    }
}
