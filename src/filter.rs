// 🔎 Record Filters - field match + inclusive date range
// Narrows the working set before aggregation and difference extraction.
// Row 0 (the header) always survives.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ReconError;
use crate::parser::{LedgerFile, Record};
use crate::schema::{cell, Source};
use crate::temporal::{parse_row_date, DateConvention};

// ============================================================================
// FILTER OPTIONS
// ============================================================================

/// Column to read in each source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPair {
    pub local: usize,
    pub inplay: usize,
}

impl ColumnPair {
    pub fn for_source(&self, source: Source) -> usize {
        match source {
            Source::Local => self.local,
            Source::Inplay => self.inplay,
        }
    }
}

/// Named fields that exist in both ledgers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterField {
    Gateway,
    ActionType,
    Currency,
    ConsumerId,
    PaymentToolToken,
    EventDate,
}

impl FilterField {
    pub fn columns(&self) -> ColumnPair {
        let pick = |source: Source| {
            let fields = source.field_map();
            match self {
                FilterField::Gateway => fields.gateway,
                FilterField::ActionType => fields.action_type,
                FilterField::Currency => fields.currency,
                FilterField::ConsumerId => fields.consumer_id,
                FilterField::PaymentToolToken => fields.payment_tool_token,
                FilterField::EventDate => fields.event_date,
            }
        };

        ColumnPair {
            local: pick(Source::Local),
            inplay: pick(Source::Inplay),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            FilterField::Gateway => "Gateway",
            FilterField::ActionType => "Action Type",
            FilterField::Currency => "Currency",
            FilterField::ConsumerId => "Consumer ID",
            FilterField::PaymentToolToken => "Payment Tool Token",
            FilterField::EventDate => "Date",
        }
    }
}

impl FromStr for FilterField {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "gateway" => Ok(FilterField::Gateway),
            "action_type" | "action" => Ok(FilterField::ActionType),
            "currency" => Ok(FilterField::Currency),
            "consumer_id" | "consumer" => Ok(FilterField::ConsumerId),
            "payment_tool_token" | "token" => Ok(FilterField::PaymentToolToken),
            "event_date" | "date" => Ok(FilterField::EventDate),
            other => Err(ReconError::InvalidInput(format!("unknown filter field: {}", other))),
        }
    }
}

/// Case-insensitive substring match on one column per source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMatch {
    pub columns: ColumnPair,
    pub needle: String,
}

impl FieldMatch {
    pub fn new(columns: ColumnPair, needle: impl Into<String>) -> Self {
        FieldMatch {
            columns,
            needle: needle.into(),
        }
    }

    pub fn on(field: FilterField, needle: impl Into<String>) -> Self {
        Self::new(field.columns(), needle)
    }

    fn matches(&self, record: &[String], source: Source) -> bool {
        // a row too short to have the column never matches
        match record.get(self.columns.for_source(source)) {
            Some(value) => value.to_lowercase().contains(&self.needle.to_lowercase()),
            None => false,
        }
    }
}

/// Inclusive calendar-date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    fn matches(&self, record: &[String], source: Source, convention: DateConvention) -> bool {
        let raw = cell(record, source.field_map().event_date);
        match parse_row_date(raw, convention) {
            Some(dt) => self.contains(dt.date()),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub field_match: Option<FieldMatch>,
    pub date_range: Option<DateRange>,
}

impl FilterOptions {
    pub fn is_empty(&self) -> bool {
        self.field_match.is_none() && self.date_range.is_none()
    }

    fn keeps(&self, record: &[String], source: Source, convention: DateConvention) -> bool {
        let field_ok = self
            .field_match
            .as_ref()
            .map_or(true, |m| m.matches(record, source));
        let date_ok = self
            .date_range
            .as_ref()
            .map_or(true, |r| r.matches(record, source, convention));
        field_ok && date_ok
    }
}

// ============================================================================
// APPLY
// ============================================================================

/// Filter the rows of one file, header first and always kept
///
/// `source` picks the column layout, so a file is read the same way here as
/// by the aggregator it is handed to next.
pub fn filter_rows(
    file: &LedgerFile,
    source: Source,
    options: &FilterOptions,
    convention: DateConvention,
) -> Vec<Record> {
    file.rows
        .iter()
        .enumerate()
        .filter(|(index, row)| *index == 0 || options.keeps(row, source, convention))
        .map(|(_, row)| row.clone())
        .collect()
}

/// Filter every file of a batch
pub fn filter_files(
    files: &[LedgerFile],
    source: Source,
    options: &FilterOptions,
    convention: DateConvention,
) -> Vec<LedgerFile> {
    if options.is_empty() {
        return files.to_vec();
    }

    files
        .iter()
        .map(|file| LedgerFile::new(file.name.clone(), filter_rows(file, source, options, convention), file.source))
        .collect()
}
