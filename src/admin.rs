//! Admin-only diagnostics: user-count text and log-file chunking

use crate::catalog::Catalog;
use chrono::{DateTime, Utc};

/// Upper bound on one outbound message, in characters
pub const MESSAGE_LIMIT: usize = 4096;

/// Date format used in the user-count report
const COUNT_DATE_FORMAT: &str = "%d/%m/%Y";

/// Render the registered-user count text
pub fn user_count_report(catalog: &Catalog, now: DateTime<Utc>, count: i64) -> String {
    let date = now.format(COUNT_DATE_FORMAT).to_string();
    let count = count.to_string();
    catalog
        .messages
        .user_count
        .fill(&[("date", &date), ("count", &count)])
}

/// Split log contents into chunks of at most [`MESSAGE_LIMIT`] characters.
///
/// Splits on character boundaries, so a chunk is always valid UTF-8 even
/// when the limit falls inside a multibyte character's worth of bytes.
/// Empty contents produce no chunks.
pub fn chunk_log(contents: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    for ch in contents.chars() {
        if current_len == MESSAGE_LIMIT {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current.push(ch);
        current_len += 1;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
