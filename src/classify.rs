// 🏷️ Row Classifier + Match-Key Deriver
// Turns a positional record into (gateway, action type, amount, currency)
// and into the key used to pair records across ledgers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::schema::{cell, Source};

/// Gateway bucket for full-voucher payments
pub const VOUCHER_GATEWAY: &str = "Voucher";

/// Gateway literal the partner export uses for full vouchers
pub const INPLAY_VOUCHER_GATEWAY: &str = "Voucher100";

/// Placeholder for blank gateway, action type or currency
pub const UNKNOWN: &str = "unknown";

const FULL_VOUCHER_DISCOUNTS: [&str; 2] = ["100", "100.00"];

const MATCH_KEY_SEPARATOR: char = '_';

// ============================================================================
// CLASSIFICATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub gateway: String,
    pub action_type: String,
    pub amount: Decimal,
    pub currency: String,
}

/// Classify a record under its source's column layout
pub fn classify(record: &[String], source: Source) -> Classification {
    let fields = source.field_map();

    Classification {
        gateway: normalize_gateway(record, source),
        action_type: or_unknown(cell(record, fields.action_type)),
        amount: parse_amount(cell(record, fields.amount)),
        currency: or_unknown(cell(record, fields.currency)),
    }
}

/// Gateway bucket for a record
///
/// A 100% voucher discount wins over whatever the gateway column says.
pub fn normalize_gateway(record: &[String], source: Source) -> String {
    let fields = source.field_map();

    if let Some(position) = fields.voucher_discount {
        if is_full_voucher(cell(record, position)) {
            return VOUCHER_GATEWAY.to_string();
        }
    }

    normalize_gateway_value(cell(record, fields.gateway))
}

/// Same rules as `normalize_gateway`, minus the voucher-discount column
pub fn normalize_gateway_value(raw: &str) -> String {
    if raw.trim().is_empty() {
        UNKNOWN.to_string()
    } else if raw == INPLAY_VOUCHER_GATEWAY {
        VOUCHER_GATEWAY.to_string()
    } else {
        raw.to_string()
    }
}

/// Blank → "unknown", anything else verbatim
pub fn or_unknown(raw: &str) -> String {
    if raw.trim().is_empty() {
        UNKNOWN.to_string()
    } else {
        raw.to_string()
    }
}

fn is_full_voucher(discount: &str) -> bool {
    FULL_VOUCHER_DISCOUNTS.contains(&discount.trim())
}

/// Parse an amount cell; anything unparseable counts as zero
pub fn parse_amount(raw: &str) -> Decimal {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Decimal::ZERO;
    }

    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .unwrap_or(Decimal::ZERO)
}

// ============================================================================
// MATCH KEY
// ============================================================================

/// Cross-source join key: `{payment_tool_token}_{consumer_id}`
pub fn match_key(record: &[String], source: Source) -> String {
    let fields = source.field_map();
    format!(
        "{}{}{}",
        cell(record, fields.payment_tool_token),
        MATCH_KEY_SEPARATOR,
        cell(record, fields.consumer_id)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromPrimitive;

    fn row(cells: &[(usize, &str)]) -> Vec<String> {
        let width = cells.iter().map(|(i, _)| i + 1).max().unwrap_or(0);
        let mut record = vec![String::new(); width];
        for (i, value) in cells {
            record[*i] = value.to_string();
        }
        record
    }

    #[test]
    fn test_local_full_voucher_overrides_gateway() {
        for discount in ["100", "100.00"] {
            let record = row(&[(7, "Stripe"), (8, "Purchase"), (25, discount)]);
            let class = classify(&record, Source::Local);
            assert_eq!(class.gateway, "Voucher");
            assert_eq!(class.action_type, "Purchase");
        }

        let partial = row(&[(7, "Stripe"), (25, "50")]);
        assert_eq!(classify(&partial, Source::Local).gateway, "Stripe");
    }

    #[test]
    fn test_inplay_voucher100_is_voucher() {
        let record = row(&[(9, "Purchase"), (10, "Voucher100")]);
        assert_eq!(classify(&record, Source::Inplay).gateway, "Voucher");
    }

    #[test]
    fn test_inplay_ignores_local_voucher_column() {
        // position 25 means nothing in the partner layout
        let record = row(&[(10, "Paypal"), (25, "100")]);
        assert_eq!(classify(&record, Source::Inplay).gateway, "Paypal");
    }

    #[test]
    fn test_blank_fields_become_unknown() {
        let record = row(&[(7, "   "), (13, "abc")]);
        let class = classify(&record, Source::Local);

        assert_eq!(class.gateway, "unknown");
        assert_eq!(class.action_type, "unknown");
        assert_eq!(class.currency, "unknown");
        assert_eq!(class.amount, Decimal::ZERO);
    }

    #[test]
    fn test_short_record_is_total() {
        let class = classify(&["only".to_string()], Source::Inplay);
        assert_eq!(class.gateway, "unknown");
        assert_eq!(class.amount, Decimal::ZERO);
    }

    #[test]
    fn test_parse_amount_variants() {
        assert_eq!(parse_amount("10.00"), Decimal::from_f64(10.0).unwrap());
        assert_eq!(parse_amount(" -2.5 "), Decimal::from_f64(-2.5).unwrap());
        assert_eq!(parse_amount("1e2"), Decimal::from(100));
        assert_eq!(parse_amount(""), Decimal::ZERO);
        assert_eq!(parse_amount("n/a"), Decimal::ZERO);
    }

    #[test]
    fn test_match_key_shape_is_shared() {
        let local = row(&[(2, "c1"), (5, "tok1")]);
        let inplay = row(&[(14, "c1"), (23, "tok1")]);

        assert_eq!(match_key(&local, Source::Local), "tok1_c1");
        assert_eq!(match_key(&local, Source::Local), match_key(&inplay, Source::Inplay));
        assert_eq!(match_key(&[], Source::Local), "_");
    }
}
