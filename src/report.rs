//! Spending-report formatting

use crate::catalog::Catalog;
use std::collections::BTreeMap;

/// Render per-category sums into the report text.
///
/// Lines follow catalog order, so the report is stable run to run.
/// Categories recorded under an older catalog no longer present in it are
/// appended after the known ones, ordered by key. The grand total is the sum
/// of the displayed lines.
pub fn format_report(
    catalog: &Catalog,
    period_label: &str,
    sums: &BTreeMap<String, f64>,
) -> String {
    let mut out = catalog
        .messages
        .report_header
        .fill(&[("period", period_label)]);
    out.push('\n');

    let mut total = 0.0;
    for entry in &catalog.categories {
        if let Some(amount) = sums.get(&entry.key) {
            out.push_str(&format!("{}: {amount:.2}\n", entry.label));
            total += amount;
        }
    }
    for (key, amount) in sums {
        if catalog.category_label(key).is_none() {
            out.push_str(&format!("{key}: {amount:.2}\n"));
            total += amount;
        }
    }

    out.push('\n');
    out.push_str(
        &catalog
            .messages
            .report_total
            .fill(&[("total", &format!("{total:.2}"))]),
    );
    out
}
