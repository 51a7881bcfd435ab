// 📊 Report - combined gateway / action-type view of Stats
// Each gateway line is followed by its action-type lines, amounts shown as
// "CUR: local / inplay" with two decimals.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::difference::Selector;
use crate::parser::Record;
use crate::schema::Source;
use crate::reconciliation::{BucketStats, CurrencyAmounts, Stats, COMPOSITE_SEPARATOR};

/// One action-type line under a gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionLine {
    pub action_type: String,
    pub stats: BucketStats,
}

/// A gateway line with its action-type lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayGroup {
    pub gateway: String,
    pub stats: BucketStats,
    pub actions: Vec<ActionLine>,
}

impl GatewayGroup {
    pub fn selector(&self) -> Selector {
        Selector::gateway(&self.gateway)
    }
}

impl ActionLine {
    pub fn selector(&self, gateway: &str) -> Selector {
        Selector::composite(gateway, &self.action_type)
    }
}

/// Group composite buckets under their gateway
///
/// A composite key belongs to the longest gateway that prefixes it followed
/// by the separator, so gateway names containing the separator still group
/// correctly.
pub fn combined(stats: &Stats) -> Vec<GatewayGroup> {
    let mut actions: BTreeMap<&str, Vec<ActionLine>> = BTreeMap::new();

    for (key, bucket) in &stats.by_action_type {
        let owner = stats
            .by_gateway
            .keys()
            .filter_map(|gateway| {
                key.strip_prefix(gateway.as_str())
                    .and_then(|rest| rest.strip_prefix(COMPOSITE_SEPARATOR))
                    .map(|action_type| (gateway.as_str(), action_type))
            })
            .max_by_key(|(gateway, _)| gateway.len());

        if let Some((gateway, action_type)) = owner {
            actions.entry(gateway).or_default().push(ActionLine {
                action_type: action_type.to_string(),
                stats: bucket.clone(),
            });
        }
    }

    stats
        .by_gateway
        .iter()
        .map(|(gateway, bucket)| GatewayGroup {
            gateway: gateway.clone(),
            stats: bucket.clone(),
            actions: actions.remove(gateway.as_str()).unwrap_or_default(),
        })
        .collect()
}

pub fn format_amount(currency: &str, amounts: &CurrencyAmounts) -> String {
    format!(
        "{}: {:.2} / {:.2}",
        currency,
        amounts.local.round_dp(2),
        amounts.inplay.round_dp(2)
    )
}

/// All currencies of a bucket, one entry each
pub fn format_amounts(stats: &BucketStats) -> Vec<String> {
    stats
        .amounts
        .iter()
        .map(|(currency, amounts)| format_amount(currency, amounts))
        .collect()
}

/// Rows shown per side when previewing difference details
pub const DETAIL_ROW_LIMIT: usize = 100;

/// Up to `limit` rows joined with ", ", then a count of what was left out
pub fn preview_rows(rows: &[Record], limit: usize) -> Vec<String> {
    let mut lines: Vec<String> = rows.iter().take(limit).map(|row| row.join(", ")).collect();
    if rows.len() > limit {
        lines.push(format!("...and {} more records", rows.len() - limit));
    }
    lines
}

// ============================================================================
// TEXT RENDERING
// ============================================================================

const LABEL_WIDTH: usize = 32;

fn push_line(out: &mut String, label: &str, stats: &BucketStats) {
    let amounts = format_amounts(stats).join(", ");
    // writing into a String cannot fail
    let _ = writeln!(
        out,
        "{:<width$} {:>8} {:>8} {:>10}  {}",
        label,
        stats.local,
        stats.inplay,
        stats.difference,
        amounts,
        width = LABEL_WIDTH
    );
}

/// Totals table followed by the combined comparison table
pub fn render_text(stats: &Stats) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{:<10} {:>8}", "Source", "Count");
    let _ = writeln!(out, "{:<10} {:>8}", Source::Local.name(), stats.total_rows.local);
    let _ = writeln!(out, "{:<10} {:>8}", Source::Inplay.name(), stats.total_rows.inplay);
    out.push('\n');

    let _ = writeln!(
        out,
        "{:<width$} {:>8} {:>8} {:>10}  {}",
        "Gateway / Action Type",
        Source::Local.name(),
        Source::Inplay.name(),
        "Difference",
        "Amounts",
        width = LABEL_WIDTH
    );
    let _ = writeln!(out, "{}", "─".repeat(LABEL_WIDTH + 40));

    for group in combined(stats) {
        push_line(&mut out, &group.gateway, &group.stats);
        for action in &group.actions {
            push_line(&mut out, &format!("  {}", action.action_type), &action.stats);
        }
    }

    out
}
