//! Per-user dialogue engine
//!
//! Implements the Elm Architecture pattern: a pure transition over
//! `(state, event)` yielding effects, executed elsewhere.

mod effect;
pub mod event;
pub mod screens;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::{BackTarget, Button, Command, Event, Inbound};
pub use screens::{Keyboard, KeyboardButton, Screen};
pub use state::{DialogueState, Sender, TurnContext};
pub use transition::{transition, TransitionResult, DATE_TIME_FORMAT};
