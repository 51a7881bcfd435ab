// ⚖️ Reconciliation Aggregator - counts and amounts per bucket
// Scans both ledgers once and tallies rows per gateway and per
// (gateway, action type), with per-currency amount sums.
//
// difference = |local - inplay|, computed once every row has been counted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::classify::classify;
use crate::parser::LedgerFile;
use crate::schema::Source;

/// Separator in composite `"{gateway}|{actionType}"` keys
pub const COMPOSITE_SEPARATOR: char = '|';

// ============================================================================
// STATS TYPES
// ============================================================================

/// Amount totals for one currency in one bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyAmounts {
    pub local: Decimal,
    pub inplay: Decimal,
}

/// Counts for one bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketStats {
    pub local: usize,
    pub inplay: usize,

    /// |local - inplay|, set by the final pass
    pub difference: usize,

    /// Currency code → sums, saturating at `Decimal::MAX` / `Decimal::MIN`
    pub amounts: BTreeMap<String, CurrencyAmounts>,
}

impl BucketStats {
    fn record(&mut self, source: Source, currency: &str, amount: Decimal) {
        let sums = self.amounts.entry(currency.to_string()).or_default();
        match source {
            Source::Local => {
                self.local += 1;
                sums.local = sums.local.saturating_add(amount);
            }
            Source::Inplay => {
                self.inplay += 1;
                sums.inplay = sums.inplay.saturating_add(amount);
            }
        }
    }

    fn settle(&mut self) {
        self.difference = self.local.abs_diff(self.inplay);
    }

    pub fn is_balanced(&self) -> bool {
        self.difference == 0
    }
}

/// Aggregation table keyed by gateway or by composite key
pub type RowCounts = BTreeMap<String, BucketStats>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalRows {
    pub local: usize,
    pub inplay: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub by_gateway: RowCounts,
    pub by_action_type: RowCounts,
    pub total_rows: TotalRows,
}

impl Stats {
    pub fn gateway(&self, gateway: &str) -> Option<&BucketStats> {
        self.by_gateway.get(gateway)
    }

    pub fn action_type(&self, gateway: &str, action_type: &str) -> Option<&BucketStats> {
        self.by_action_type.get(&composite_key(gateway, action_type))
    }

    /// Buckets whose counts disagree
    pub fn unbalanced_gateways(&self) -> impl Iterator<Item = (&String, &BucketStats)> {
        self.by_gateway.iter().filter(|(_, stats)| !stats.is_balanced())
    }
}

pub fn composite_key(gateway: &str, action_type: &str) -> String {
    format!("{}{}{}", gateway, COMPOSITE_SEPARATOR, action_type)
}

/// Split a composite key at its first separator
pub fn split_composite_key(key: &str) -> (&str, &str) {
    key.split_once(COMPOSITE_SEPARATOR).unwrap_or((key, ""))
}

// ============================================================================
// AGGREGATOR
// ============================================================================

/// Tally both ledgers
///
/// The argument position decides the column layout: `local` files are read
/// with the local layout whatever their `source` field says.
pub fn aggregate(local: &[LedgerFile], inplay: &[LedgerFile]) -> Stats {
    let mut stats = Stats::default();

    for (source, files) in [(Source::Local, local), (Source::Inplay, inplay)] {
        for file in files {
            for record in file.data_rows() {
                let class = classify(record, source);

                stats
                    .by_gateway
                    .entry(class.gateway.clone())
                    .or_default()
                    .record(source, &class.currency, class.amount);

                stats
                    .by_action_type
                    .entry(composite_key(&class.gateway, &class.action_type))
                    .or_default()
                    .record(source, &class.currency, class.amount);
            }
        }
    }

    for bucket in stats
        .by_gateway
        .values_mut()
        .chain(stats.by_action_type.values_mut())
    {
        bucket.settle();
    }

    stats.total_rows = TotalRows {
        local: local.iter().map(LedgerFile::data_row_count).sum(),
        inplay: inplay.iter().map(LedgerFile::data_row_count).sum(),
    };

    debug!(
        local_rows = stats.total_rows.local,
        inplay_rows = stats.total_rows.inplay,
        gateways = stats.by_gateway.len(),
        action_buckets = stats.by_action_type.len(),
        "aggregated ledgers"
    );

    stats
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Record;

    fn s(values: &[&str]) -> Record {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn local_row(token: &str, consumer: &str, gateway: &str, action: &str, amount: &str, currency: &str) -> Record {
        let mut record = vec![String::new(); 26];
        record[2] = consumer.to_string();
        record[5] = token.to_string();
        record[7] = gateway.to_string();
        record[8] = action.to_string();
        record[13] = amount.to_string();
        record[14] = currency.to_string();
        record
    }

    fn inplay_row(token: &str, consumer: &str, gateway: &str, action: &str, amount: &str, currency: &str) -> Record {
        let mut record = vec![String::new(); 24];
        record[9] = action.to_string();
        record[10] = gateway.to_string();
        record[12] = amount.to_string();
        record[13] = currency.to_string();
        record[14] = consumer.to_string();
        record[23] = token.to_string();
        record
    }

    fn file(source: Source, rows: Vec<Record>) -> LedgerFile {
        let mut all = vec![s(&["header"])];
        all.extend(rows);
        LedgerFile::new(format!("{}.csv", source.code()), all, source)
    }

    #[test]
    fn test_matching_scenario_balances() {
        let local = file(
            Source::Local,
            vec![s(&["m1", "c1", "", "", "", "tok1", "", "GatewayA", "Purchase", "", "", "", "", "10.00", "USD"])],
        );
        let inplay = file(
            Source::Inplay,
            vec![inplay_row("tok1", "", "GatewayA", "Purchase", "10.00", "USD")],
        );

        let stats = aggregate(&[local], &[inplay]);
        let gateway = stats.gateway("GatewayA").unwrap();

        assert_eq!(gateway.local, 1);
        assert_eq!(gateway.inplay, 1);
        assert_eq!(gateway.difference, 0);
        assert_eq!(gateway.amounts.len(), 1);
        assert_eq!(gateway.amounts["USD"].local, Decimal::from(10));
        assert_eq!(gateway.amounts["USD"].inplay, Decimal::from(10));
        assert_eq!(stats.action_type("GatewayA", "Purchase").unwrap().difference, 0);

        println!("✅ Matching scenario: {:?}", gateway);
    }

    #[test]
    fn test_total_rows_ignore_classification() {
        let local = file(
            Source::Local,
            vec![s(&[]), s(&["garbage"]), local_row("t", "c", "Stripe", "Refund", "x", "")],
        );
        let second_local = file(Source::Local, vec![local_row("t2", "c2", "", "", "", "")]);
        let empty_inplay = LedgerFile::new("empty.csv", vec![], Source::Inplay);

        let stats = aggregate(&[local, second_local], &[empty_inplay]);

        assert_eq!(stats.total_rows, TotalRows { local: 4, inplay: 0 });
        let bucket_total: usize = stats.by_gateway.values().map(|b| b.local).sum();
        assert_eq!(bucket_total, 4);
        assert_eq!(stats.gateway("unknown").unwrap().local, 3);
    }

    #[test]
    fn test_difference_is_absolute() {
        let local = file(
            Source::Local,
            vec![local_row("a", "1", "Stripe", "Purchase", "5", "EUR")],
        );
        let inplay = file(
            Source::Inplay,
            vec![
                inplay_row("a", "1", "Stripe", "Purchase", "5", "EUR"),
                inplay_row("b", "2", "Stripe", "Purchase", "7", "EUR"),
                inplay_row("c", "3", "Stripe", "Refund", "-7", "USD"),
            ],
        );

        let stats = aggregate(&[local], &[inplay]);

        for bucket in stats.by_gateway.values().chain(stats.by_action_type.values()) {
            assert_eq!(bucket.difference, bucket.local.abs_diff(bucket.inplay));
        }
        let stripe = stats.gateway("Stripe").unwrap();
        assert_eq!(stripe.difference, 2);
        assert_eq!(stripe.amounts["EUR"], CurrencyAmounts { local: Decimal::from(5), inplay: Decimal::from(12) });
        assert_eq!(stripe.amounts["USD"].local, Decimal::ZERO);
        assert_eq!(stripe.amounts["USD"].inplay, Decimal::from(-7));
        assert_eq!(stats.unbalanced_gateways().count(), 1);
    }

    #[test]
    fn test_voucher_buckets_merge_across_sources() {
        let mut full_voucher = local_row("v", "1", "Stripe", "Purchase", "0", "USD");
        full_voucher[25] = "100".to_string();
        let local = file(Source::Local, vec![full_voucher]);
        let inplay = file(
            Source::Inplay,
            vec![inplay_row("v", "1", "Voucher100", "Purchase", "0", "USD")],
        );

        let stats = aggregate(&[local], &[inplay]);

        assert!(stats.gateway("Stripe").is_none());
        assert!(stats.gateway("Voucher100").is_none());
        let voucher = stats.action_type("Voucher", "Purchase").unwrap();
        assert_eq!((voucher.local, voucher.inplay), (1, 1));
    }

    #[test]
    fn test_aggregate_is_idempotent_and_order_free() {
        let rows = vec![
            inplay_row("a", "1", "Stripe", "Purchase", "0.1", "USD"),
            inplay_row("b", "2", "Stripe", "Purchase", "0.2", "USD"),
            inplay_row("c", "3", "Paypal", "Refund", "0.3", "EUR"),
            inplay_row("d", "4", "", "", "", ""),
        ];
        let mut reversed = rows.clone();
        reversed.reverse();

        let local = file(Source::Local, vec![local_row("a", "1", "Stripe", "Purchase", "0.1", "USD")]);
        let forward = aggregate(&[local.clone()], &[file(Source::Inplay, rows.clone())]);
        let again = aggregate(&[local.clone()], &[file(Source::Inplay, rows)]);
        let backward = aggregate(&[local], &[file(Source::Inplay, reversed)]);

        assert_eq!(forward, again);
        assert_eq!(forward, backward);
        assert_eq!(
            serde_json::to_string(&forward).unwrap(),
            serde_json::to_string(&backward).unwrap()
        );
    }

    #[test]
    fn test_stats_json_shape() {
        let stats = aggregate(&[file(Source::Local, vec![local_row("a", "1", "Stripe", "Purchase", "10.5", "USD")])], &[]);
        let json = serde_json::to_value(&stats).unwrap();

        assert_eq!(json["totalRows"]["local"], 1);
        assert_eq!(json["byGateway"]["Stripe"]["difference"], 1);
        assert_eq!(json["byActionType"]["Stripe|Purchase"]["amounts"]["USD"]["local"], 10.5);
    }

    #[test]
    fn test_huge_amounts_saturate() {
        let row = |amount: &str| {
            let mut record = vec![String::new(); 15];
            record[7] = "Stripe".to_string();
            record[13] = amount.to_string();
            record[14] = "USD".to_string();
            record
        };
        let max = Decimal::MAX.to_string();
        let min = Decimal::MIN.to_string();

        let local = vec![LedgerFile::new(
            "local.csv",
            vec![s(&["header"]), row(&max), row(&max), row(&max)],
            Source::Local,
        )];
        let negative = vec![LedgerFile::new(
            "negative.csv",
            vec![s(&["header"]), row(&min), row(&min)],
            Source::Local,
        )];

        let stats = aggregate(&local, &[]);
        let stripe = stats.gateway("Stripe").unwrap();
        assert_eq!(stripe.local, 3);
        assert_eq!(stripe.amounts["USD"].local, Decimal::MAX);

        let stats = aggregate(&negative, &[]);
        assert_eq!(stats.gateway("Stripe").unwrap().amounts["USD"].local, Decimal::MIN);

        println!("✅ Sums clamp at {} / {}", max, min);
    }

    #[test]
    fn test_split_composite_key() {
        assert_eq!(split_composite_key("Stripe|Purchase"), ("Stripe", "Purchase"));
        assert_eq!(split_composite_key("Stripe"), ("Stripe", ""));
        assert_eq!(composite_key("unknown", "unknown"), "unknown|unknown");
    }
}
