// 📐 Source Schemas - Column layouts per ledger
// Both ledgers describe the same transactions with different column positions.
// Every positional read in the crate goes through a FieldMap.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ReconError;

// ============================================================================
// SOURCE
// ============================================================================

/// Source - which ledger a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Our own transaction ledger
    Local,
    /// The partner (InPlay) export
    Inplay,
}

impl Source {
    /// Human-readable name for display
    pub fn name(&self) -> &str {
        match self {
            Source::Local => "Local",
            Source::Inplay => "InPlay",
        }
    }

    /// Short code, also the wire value
    pub fn code(&self) -> &str {
        match self {
            Source::Local => "local",
            Source::Inplay => "inplay",
        }
    }

    /// Column layout for this source
    pub fn field_map(&self) -> &'static FieldMap {
        match self {
            Source::Local => &LOCAL_FIELDS,
            Source::Inplay => &INPLAY_FIELDS,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Source {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Source::Local),
            "inplay" => Ok(Source::Inplay),
            other => Err(ReconError::InvalidInput(format!("unknown source: {}", other))),
        }
    }
}

// ============================================================================
// FIELD MAP
// ============================================================================

/// FieldMap - semantic field name → column position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMap {
    pub consumer_id: usize,
    pub payment_tool_token: usize,
    pub gateway: usize,
    pub action_type: usize,
    pub amount: usize,
    pub currency: usize,
    pub event_date: usize,

    /// Percentage discount applied by a voucher; `None` when the source
    /// encodes full vouchers in the gateway column instead
    pub voucher_discount: Option<usize>,
}

/// Local ledger layout (see `LOCAL_HEADERS`)
pub const LOCAL_FIELDS: FieldMap = FieldMap {
    consumer_id: 2,
    payment_tool_token: 5,
    gateway: 7,
    action_type: 8,
    amount: 13,
    currency: 14,
    event_date: 16,
    voucher_discount: Some(25),
};

/// Partner export layout. Full vouchers arrive as gateway `Voucher100`.
pub const INPLAY_FIELDS: FieldMap = FieldMap {
    consumer_id: 14,
    payment_tool_token: 23,
    gateway: 10,
    action_type: 9,
    amount: 12,
    currency: 13,
    event_date: 1,
    voucher_discount: None,
};

/// Column list of the local ledger, in positional order
pub const LOCAL_HEADERS: [&str; 33] = [
    "payment_history_id",
    "merchant_id",
    "consumer_id",
    "transaction_token",
    "payment_tool_info",
    "payment_tool_token",
    "payment_method_name",
    "gateway_name",
    "action_type",
    "item_access_id",
    "item_id",
    "item_type",
    "item_title",
    "charged_amount",
    "currency_iso",
    "issued_by",
    "created_at",
    "note",
    "consumer_email",
    "timestamp",
    "ip_address",
    "continent",
    "country",
    "country_iso",
    "voucher_code",
    "voucher_discount",
    "expires_at",
    "access_fee_description",
    "exchange_rate",
    "settlement_currency",
    "dacast_conversion_rate_to_account_currency",
    "dacast_fee",
    "dacast_item_title",
];

/// Read a cell, treating a missing position as empty
pub fn cell(record: &[String], position: usize) -> &str {
    record.get(position).map(String::as_str).unwrap_or("")
}
