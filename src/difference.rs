// 🔍 Difference Extractor - orphan rows per bucket
// For one gateway (or gateway + action type) bucket, find the rows present in
// one ledger but not the other, paired by match key.
//
// Scoped to a single bucket on purpose: the same key can legitimately show up
// under several buckets in real data.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

use crate::classify::{classify, match_key, normalize_gateway_value, or_unknown, Classification};
use crate::parser::{LedgerFile, Record};
use crate::reconciliation::{composite_key, split_composite_key};
use crate::schema::Source;

// ============================================================================
// SELECTOR
// ============================================================================

/// Which bucket to drill into
///
/// Components are normalized like classified rows, so an empty component and
/// `"unknown"` select the same blank-field bucket in both modes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selector {
    Gateway(String),
    GatewayAction { gateway: String, action_type: String },
}

impl Selector {
    pub fn gateway(gateway: &str) -> Self {
        Selector::Gateway(normalize_gateway_value(gateway))
    }

    pub fn composite(gateway: &str, action_type: &str) -> Self {
        Selector::GatewayAction {
            gateway: normalize_gateway_value(gateway),
            action_type: or_unknown(action_type),
        }
    }

    /// Build from the wire form: a gateway name, or `"{gateway}|{actionType}"`
    ///
    /// A composite value splits at its first `|`, so a gateway whose name
    /// contains `|` cannot be selected this way. Use [`Selector::composite`]
    /// with the parts kept apart, as `report::combined` does.
    pub fn from_value(value: &str, is_gateway_level: bool) -> Self {
        if is_gateway_level {
            Selector::gateway(value)
        } else {
            let (gateway, action_type) = split_composite_key(value);
            Selector::composite(gateway, action_type)
        }
    }

    pub fn is_gateway_level(&self) -> bool {
        matches!(self, Selector::Gateway(_))
    }

    fn selects(&self, class: &Classification) -> bool {
        match self {
            Selector::Gateway(gateway) => class.gateway == *gateway,
            Selector::GatewayAction { gateway, action_type } => {
                class.gateway == *gateway && class.action_type == *action_type
            }
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Gateway(gateway) => f.write_str(gateway),
            Selector::GatewayAction { gateway, action_type } => {
                f.write_str(&composite_key(gateway, action_type))
            }
        }
    }
}

// ============================================================================
// DIFFERENCE DETAILS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifferenceDetails {
    /// Local rows of the bucket with no inplay counterpart
    pub local_only: Vec<Record>,

    /// Inplay rows of the bucket with no local counterpart
    pub inplay_only: Vec<Record>,

    /// Local rows of the bucket whose key was found in inplay
    pub local_matched: usize,

    /// Inplay rows of the bucket whose key was found in local
    pub inplay_matched: usize,
}

impl DifferenceDetails {
    pub fn is_clean(&self) -> bool {
        self.local_only.is_empty() && self.inplay_only.is_empty()
    }
}

/// Rows of one ledger that fall into the selected bucket
fn bucket_rows<'a>(files: &'a [LedgerFile], source: Source, selector: &Selector) -> Vec<&'a Record> {
    files
        .iter()
        .flat_map(|file| file.data_rows())
        .filter(|record| selector.selects(&classify(record, source)))
        .collect()
}

/// Split one side into (orphans, matched count) against the other side's keys
fn orphans(rows: &[&Record], source: Source, other_keys: &HashSet<String>) -> (Vec<Record>, usize) {
    let mut only = Vec::new();
    let mut matched = 0;

    for record in rows {
        if other_keys.contains(&match_key(record, source)) {
            matched += 1;
        } else {
            only.push((*record).clone());
        }
    }

    (only, matched)
}

/// Symmetric difference by match key inside one bucket
pub fn difference_details(
    local: &[LedgerFile],
    inplay: &[LedgerFile],
    selector: &Selector,
) -> DifferenceDetails {
    let local_rows = bucket_rows(local, Source::Local, selector);
    let inplay_rows = bucket_rows(inplay, Source::Inplay, selector);

    let local_keys: HashSet<String> = local_rows
        .iter()
        .map(|record| match_key(record, Source::Local))
        .collect();
    let inplay_keys: HashSet<String> = inplay_rows
        .iter()
        .map(|record| match_key(record, Source::Inplay))
        .collect();

    let (local_only, local_matched) = orphans(&local_rows, Source::Local, &inplay_keys);
    let (inplay_only, inplay_matched) = orphans(&inplay_rows, Source::Inplay, &local_keys);

    debug!(
        selector = %selector,
        local_rows = local_rows.len(),
        inplay_rows = inplay_rows.len(),
        local_only = local_only.len(),
        inplay_only = inplay_only.len(),
        "extracted bucket differences"
    );

    DifferenceDetails {
        local_only,
        inplay_only,
        local_matched,
        inplay_matched,
    }
}

// ============================================================================
// TESTS
// ============================================================================
