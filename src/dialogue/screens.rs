//! Menu screens and their keyboard layouts
//!
//! A `Screen` is the engine's name for one renderable menu; `render` turns
//! it into text plus button rows using the catalog's labels. Layouts follow
//! the menus users see: the main menu stacks its two actions, categories go
//! two per row, periods one per row, and every submenu ends with a Back row.

use super::event::{BackTarget, Button};
use crate::catalog::Catalog;
use serde::Serialize;

/// The button screens the engine can show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    MainMenu,
    CategoryMenu,
    AmountPrompt { category: String },
    PeriodMenu,
}

/// Rows of labeled buttons attached to an outbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Keyboard {
    pub rows: Vec<Vec<KeyboardButton>>,
}

/// One inline button: visible label plus callback payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyboardButton {
    pub label: String,
    pub data: String,
}

impl KeyboardButton {
    fn new(label: &str, button: &Button) -> Self {
        Self {
            label: label.to_string(),
            data: button.encode(),
        }
    }
}

impl Screen {
    /// Message text and keyboard for this screen
    pub fn render(&self, catalog: &Catalog) -> (String, Keyboard) {
        match self {
            Self::MainMenu => (
                catalog.messages.select_action.fill(&[]),
                Keyboard {
                    rows: vec![
                        vec![KeyboardButton::new(
                            &catalog.buttons.new_expense,
                            &Button::NewExpense,
                        )],
                        vec![KeyboardButton::new(
                            &catalog.buttons.my_expenses,
                            &Button::MyExpenses,
                        )],
                    ],
                },
            ),
            Self::CategoryMenu => {
                let mut rows: Vec<Vec<KeyboardButton>> = catalog
                    .categories
                    .chunks(2)
                    .map(|pair| {
                        pair.iter()
                            .map(|entry| {
                                KeyboardButton::new(
                                    &entry.label,
                                    &Button::Category(entry.key.clone()),
                                )
                            })
                            .collect()
                    })
                    .collect();
                rows.push(vec![back_button(catalog, BackTarget::MainMenu)]);
                (
                    catalog.messages.select_category.fill(&[]),
                    Keyboard { rows },
                )
            }
            Self::AmountPrompt { category } => {
                let label = catalog.category_label(category).unwrap_or(category);
                (
                    catalog.messages.enter_amount.fill(&[("category", label)]),
                    Keyboard {
                        rows: vec![vec![back_button(catalog, BackTarget::CategoryMenu)]],
                    },
                )
            }
            Self::PeriodMenu => {
                let mut rows: Vec<Vec<KeyboardButton>> = catalog
                    .periods
                    .iter()
                    .map(|entry| {
                        vec![KeyboardButton::new(
                            &entry.label,
                            &Button::Period(entry.key.clone()),
                        )]
                    })
                    .collect();
                rows.push(vec![back_button(catalog, BackTarget::MainMenu)]);
                (catalog.messages.select_period.fill(&[]), Keyboard { rows })
            }
        }
    }
}

fn back_button(catalog: &Catalog, target: BackTarget) -> KeyboardButton {
    KeyboardButton::new(&catalog.buttons.back, &Button::Back(target))
}
