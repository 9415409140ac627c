//! Static catalog: category and period tables, button labels, message
//! templates
//!
//! Loaded once at startup from JSON files. Array order in the files is
//! display order for menus and for report lines. A missing file or a missing
//! template key is a startup failure, never a runtime fallback.

use crate::config::ConfigError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;

/// One category or period: the stable key used in button payloads and
/// storage, plus the human label shown on the button.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    pub key: String,
    pub label: String,
}

/// Labels for the fixed menu buttons
#[derive(Debug, Clone, Deserialize)]
pub struct ButtonLabels {
    pub new_expense: String,
    pub my_expenses: String,
    pub back: String,
}

/// Message template with `{placeholder}` substitution
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct Template(String);

impl Template {
    /// Render with the given placeholder values. Placeholders the template
    /// does not use are silently dropped.
    pub fn fill(&self, vars: &[(&str, &str)]) -> String {
        let mut out = self.0.clone();
        for (name, value) in vars {
            out = out.replace(&format!("{{{name}}}"), value);
        }
        out
    }
}

/// All user-visible message templates. Typed deserialization makes every
/// key required, so a stale messages.json fails at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageTemplates {
    pub welcome: Template,
    pub welcome_back: Template,
    pub select_action: Template,
    pub help: Template,
    pub unknown_action: Template,
    pub select_category: Template,
    pub category_chosen: Template,
    pub enter_amount: Template,
    pub not_a_number: Template,
    pub expense_added: Template,
    pub select_period: Template,
    pub period_chosen: Template,
    pub report_header: Template,
    pub report_total: Template,
    pub something_went_wrong: Template,
    pub access_denied: Template,
    pub user_count: Template,
    pub log_read_failed: Template,
}

/// The full static catalog
#[derive(Debug, Clone)]
pub struct Catalog {
    pub categories: Vec<CatalogEntry>,
    pub periods: Vec<CatalogEntry>,
    pub buttons: ButtonLabels,
    pub messages: MessageTemplates,
}

impl Catalog {
    /// Load the four catalog tables from `dir`
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let catalog = Self {
            categories: read_json(dir, "categories.json")?,
            periods: read_json(dir, "periods.json")?,
            buttons: read_json(dir, "buttons.json")?,
            messages: read_json(dir, "messages.json")?,
        };
        if catalog.categories.is_empty() {
            return Err(ConfigError::CatalogEmpty("categories"));
        }
        if catalog.periods.is_empty() {
            return Err(ConfigError::CatalogEmpty("periods"));
        }
        Ok(catalog)
    }

    /// Label for a category key, `None` when the key is not in the catalog
    pub fn category_label(&self, key: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.label.as_str())
    }

    /// Label for a period key, `None` when the key is not in the catalog
    pub fn period_label(&self, key: &str) -> Option<&str> {
        self.periods
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.label.as_str())
    }

    /// Small in-code catalog for tests
    #[cfg(test)]
    pub fn fixture() -> Self {
        fn entry(key: &str, label: &str) -> CatalogEntry {
            CatalogEntry {
                key: key.to_string(),
                label: label.to_string(),
            }
        }
        fn t(text: &str) -> Template {
            Template(text.to_string())
        }

        Self {
            categories: vec![
                entry("groceries", "Groceries"),
                entry("health", "Health"),
                entry("restaurants", "Restaurants"),
                entry("other", "Other"),
            ],
            periods: vec![
                entry("day", "Day"),
                entry("week", "Week"),
                entry("month", "Month"),
                entry("quarter", "Quarter"),
                entry("halfyear", "Half-year"),
                entry("year", "Year"),
            ],
            buttons: ButtonLabels {
                new_expense: "New expense".to_string(),
                my_expenses: "My expenses".to_string(),
                back: "Back".to_string(),
            },
            messages: MessageTemplates {
                welcome: t("Welcome, {name}!"),
                welcome_back: t("Welcome back, {name}! Registered on {date}."),
                select_action: t("Select an action:"),
                help: t("Help text."),
                unknown_action: t("Unknown action."),
                select_category: t("Select a category:"),
                category_chosen: t("Category: {category}"),
                enter_amount: t("Enter the amount:"),
                not_a_number: t("That is not a number, try again."),
                expense_added: t("Added {date} {category} {amount}"),
                select_period: t("Select a period:"),
                period_chosen: t("Period: {period}"),
                report_header: t("Spending by category for {period}:"),
                report_total: t("Total: {total}"),
                something_went_wrong: t("Something went wrong, try again."),
                access_denied: t("Admin only. Admin id: {admin_id}, your id: {user_id}."),
                user_count: t("As of {date} registered users: {count}"),
                log_read_failed: t("Could not read the log file."),
            },
        }
    }
}

fn read_json<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<T, ConfigError> {
    let path = dir.join(file);
    let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::CatalogRead {
        file: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::CatalogParse {
        file: path.display().to_string(),
        source,
    })
}
