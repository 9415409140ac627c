//! Pure dialogue transition function
//!
//! Every inbound event for a user flows through `transition`: one match on
//! `(state, event)` replaces the per-button handler registry a bot framework
//! would hand us. The function is pure; the runtime executor performs the
//! returned effects and owns all I/O.

use super::event::{BackTarget, Button, Command, Event};
use super::screens::Screen;
use super::state::{DialogueState, TurnContext};
use super::Effect;
use thiserror::Error;

/// Timestamp format used in user-facing texts
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Result of a dialogue transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: DialogueState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: DialogueState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Why an amount string was rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("empty input")]
    Empty,
    #[error("not a number")]
    NotANumber,
    #[error("amount must be positive")]
    NotPositive,
}

/// Parse free text as an expense amount: a finite, positive decimal
pub fn parse_amount(text: &str) -> Result<f64, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }
    let value: f64 = trimmed.parse().map_err(|_| ValidationError::NotANumber)?;
    // "inf" and "NaN" parse as floats; they are not amounts
    if !value.is_finite() {
        return Err(ValidationError::NotANumber);
    }
    if value <= 0.0 {
        return Err(ValidationError::NotPositive);
    }
    Ok(value)
}

/// Pure transition function.
///
/// Total over every `(state, event)` pair: anything unexpected lands on the
/// unknown-action flow or is dropped, so no inbound event can wedge a user.
pub fn transition(state: &DialogueState, ctx: &TurnContext, event: Event) -> TransitionResult {
    match (state, event) {
        // ==================== Commands ====================
        // Commands win over an armed amount capture: "/start" mid-entry
        // abandons the entry rather than being parsed as an amount.
        (_, Event::Command(Command::Start)) => start(ctx),
        (_, Event::Command(Command::Help)) => {
            text_then_menu(ctx.catalog.messages.help.fill(&[]))
        }
        (state, Event::Command(Command::CountUsers)) => {
            admin_command(state, ctx, Effect::SendUserCount)
        }
        (state, Event::Command(Command::Logs)) => admin_command(state, ctx, Effect::SendLogFile),
        (_, Event::Command(Command::Unknown(_))) => {
            text_then_menu(ctx.catalog.messages.unknown_action.fill(&[]))
        }

        // ==================== Button presses ====================
        (state, Event::ButtonPress { button, .. }) => button_press(state, ctx, button),

        // ==================== Free text ====================
        (DialogueState::AwaitingAmount { category }, Event::FreeText { text }) => {
            amount_entered(ctx, category, &text)
        }
        (DialogueState::Idle, Event::FreeText { .. }) => {
            text_then_menu(ctx.catalog.messages.unknown_action.fill(&[]))
        }
    }
}

fn start(ctx: &TurnContext) -> TransitionResult {
    let messages = &ctx.catalog.messages;
    match ctx.registered_at {
        None => TransitionResult::new(DialogueState::Idle)
            .with_effect(Effect::RegisterSender)
            .with_effect(Effect::text(
                messages.welcome.fill(&[("name", &ctx.sender.name)]),
            ))
            .with_effect(Effect::screen(Screen::MainMenu)),
        Some(registered_at) => {
            let date = registered_at.format(DATE_TIME_FORMAT).to_string();
            TransitionResult::new(DialogueState::Idle)
                .with_effect(Effect::DeleteLive)
                .with_effect(Effect::text(
                    messages
                        .welcome_back
                        .fill(&[("name", &ctx.sender.name), ("date", &date)]),
                ))
                .with_effect(Effect::screen(Screen::MainMenu))
        }
    }
}

/// Delete the live message, say something, put a fresh main menu under it
fn text_then_menu(text: String) -> TransitionResult {
    TransitionResult::new(DialogueState::Idle)
        .with_effect(Effect::DeleteLive)
        .with_effect(Effect::text(text))
        .with_effect(Effect::screen(Screen::MainMenu))
}

fn admin_command(state: &DialogueState, ctx: &TurnContext, effect: Effect) -> TransitionResult {
    if ctx.is_admin {
        // Diagnostics leave the menu and any armed capture alone
        return TransitionResult::new(state.clone()).with_effect(effect);
    }
    let admin_id = ctx
        .admin_id
        .map_or_else(|| "unset".to_string(), |id| id.to_string());
    text_then_menu(ctx.catalog.messages.access_denied.fill(&[
        ("admin_id", &admin_id),
        ("user_id", &ctx.sender.user.to_string()),
    ]))
}

fn button_press(state: &DialogueState, ctx: &TurnContext, button: Button) -> TransitionResult {
    match button {
        Button::NewExpense => TransitionResult::new(DialogueState::Idle)
            .with_effect(Effect::replace(Screen::CategoryMenu)),
        Button::MyExpenses => TransitionResult::new(DialogueState::Idle)
            .with_effect(Effect::replace(Screen::PeriodMenu)),
        Button::Back(BackTarget::MainMenu) => {
            TransitionResult::new(DialogueState::Idle).with_effect(Effect::replace(Screen::MainMenu))
        }
        Button::Back(BackTarget::CategoryMenu) => TransitionResult::new(DialogueState::Idle)
            .with_effect(Effect::replace(Screen::CategoryMenu)),

        Button::Category(key) => match ctx.catalog.category_label(&key) {
            Some(label) => {
                let ack = ctx
                    .catalog
                    .messages
                    .category_chosen
                    .fill(&[("category", label)]);
                TransitionResult::new(DialogueState::AwaitingAmount {
                    category: key.clone(),
                })
                .with_effect(Effect::Acknowledge { text: ack })
                .with_effect(Effect::replace(Screen::AmountPrompt { category: key }))
            }
            // A button from a catalog this process no longer has; drop it
            None => {
                tracing::warn!(
                    user = %ctx.sender.user,
                    category = %key,
                    "Dropping button press for unknown category"
                );
                TransitionResult::new(state.clone())
            }
        },

        Button::Period(key) => {
            // Unknown period keys still flow through: the resolver returns a
            // zero-width range and the report comes back empty.
            let label = ctx
                .catalog
                .period_label(&key)
                .unwrap_or(key.as_str())
                .to_string();
            let ack = ctx.catalog.messages.period_chosen.fill(&[("period", &label)]);
            TransitionResult::new(DialogueState::Idle)
                .with_effect(Effect::Acknowledge { text: ack })
                .with_effect(Effect::ShowReport { period_key: key })
                .with_effect(Effect::screen(Screen::MainMenu))
        }
    }
}

fn amount_entered(ctx: &TurnContext, category: &str, text: &str) -> TransitionResult {
    match parse_amount(text) {
        Ok(amount) => TransitionResult::new(DialogueState::Idle)
            .with_effect(Effect::RecordExpense {
                category: category.to_string(),
                amount,
            })
            .with_effect(Effect::screen(Screen::MainMenu)),
        Err(_) => TransitionResult::new(DialogueState::AwaitingAmount {
            category: category.to_string(),
        })
        .with_effect(Effect::text(ctx.catalog.messages.not_a_number.fill(&[]))),
    }
}
