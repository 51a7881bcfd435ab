// 🗂️ Comparison Session - caller-owned "current files" per source
// The engine stays stateless; this is where uploads replace each other and
// where late local-data responses are told apart from current ones.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::difference::{difference_details, DifferenceDetails, Selector};
use crate::error::Result;
use crate::filter::{filter_files, FilterOptions};
use crate::parser::LedgerFile;
use crate::reconciliation::{aggregate, Stats};
use crate::schema::{cell, Source};
use crate::temporal::{parse_row_date, DateConvention};

/// Local-data request issued for one inplay upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub generation: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response belonged to the current upload and replaced local data
    Applied { rows: usize },
    /// A newer inplay upload exists; the response was dropped
    Superseded,
}

/// Earliest and latest event date across the data rows of `files`
pub fn date_span(files: &[LedgerFile], convention: DateConvention) -> Option<(NaiveDate, NaiveDate)> {
    files
        .iter()
        .flat_map(|file| {
            let position = file.source.field_map().event_date;
            file.data_rows()
                .iter()
                .filter_map(move |record| parse_row_date(cell(record, position), convention))
        })
        .map(|dt| dt.date())
        .fold(None, |span, date| match span {
            None => Some((date, date)),
            Some((lo, hi)) => Some((lo.min(date), hi.max(date))),
        })
}

#[derive(Debug, Clone, Default)]
pub struct ComparisonSession {
    local: Vec<LedgerFile>,
    inplay: Vec<LedgerFile>,
    convention: DateConvention,
    filter: FilterOptions,
    generation: u64,
}

impl ComparisonSession {
    pub fn new(convention: DateConvention) -> Self {
        Self {
            convention,
            ..Self::default()
        }
    }

    pub fn convention(&self) -> DateConvention {
        self.convention
    }

    pub fn files(&self, source: Source) -> &[LedgerFile] {
        match source {
            Source::Local => &self.local,
            Source::Inplay => &self.inplay,
        }
    }

    /// Replace the files of one source with a new batch
    pub fn load(&mut self, source: Source, files: Vec<LedgerFile>) {
        info!(
            source = %source,
            files = files.len(),
            rows = files.iter().map(LedgerFile::data_row_count).sum::<usize>(),
            "loaded batch"
        );

        match source {
            Source::Local => self.local = files,
            Source::Inplay => {
                self.inplay = files;
                self.generation += 1;
            }
        }
    }

    /// Replace the inplay files and describe the local data they call for
    ///
    /// Any request issued before this call becomes stale.
    pub fn load_inplay(&mut self, files: Vec<LedgerFile>) -> Option<FetchRequest> {
        self.load(Source::Inplay, files);

        let (start_date, end_date) = date_span(&self.inplay, self.convention)?;
        Some(FetchRequest {
            generation: self.generation,
            start_date,
            end_date,
        })
    }

    pub fn is_current(&self, request: &FetchRequest) -> bool {
        request.generation == self.generation
    }

    /// Apply the outcome of a local-data fetch
    ///
    /// Stale results are dropped whether they succeeded or not. A current
    /// failure is returned and leaves the loaded local files untouched.
    pub fn apply_fetch(&mut self, request: &FetchRequest, result: Result<LedgerFile>) -> Result<FetchOutcome> {
        if !self.is_current(request) {
            warn!(
                generation = request.generation,
                current = self.generation,
                "dropping superseded local data response"
            );
            return Ok(FetchOutcome::Superseded);
        }

        let file = result?;
        let rows = file.data_row_count();
        self.load(Source::Local, vec![file]);

        Ok(FetchOutcome::Applied { rows })
    }

    pub fn filter(&self) -> &FilterOptions {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: FilterOptions) {
        self.filter = filter;
    }

    pub fn clear_filter(&mut self) {
        self.filter = FilterOptions::default();
    }

    /// Files of one source after the active filter
    pub fn working_set(&self, source: Source) -> Vec<LedgerFile> {
        filter_files(self.files(source), source, &self.filter, self.convention)
    }

    pub fn stats(&self) -> Stats {
        aggregate(&self.working_set(Source::Local), &self.working_set(Source::Inplay))
    }

    pub fn difference(&self, selector: &Selector) -> DifferenceDetails {
        difference_details(
            &self.working_set(Source::Local),
            &self.working_set(Source::Inplay),
            selector,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReconError;
    use crate::filter::{FieldMatch, FilterField};
    use crate::parser::Record;

    fn inplay_row(date: &str, gateway: &str, token: &str) -> Record {
        let mut record = vec![String::new(); 24];
        record[1] = date.to_string();
        record[9] = "Purchase".to_string();
        record[10] = gateway.to_string();
        record[23] = token.to_string();
        record
    }

    fn local_row(gateway: &str, token: &str) -> Record {
        let mut record = vec![String::new(); 26];
        record[5] = token.to_string();
        record[7] = gateway.to_string();
        record[8] = "Purchase".to_string();
        record
    }

    fn file(name: &str, source: Source, rows: Vec<Record>) -> LedgerFile {
        let mut all = vec![vec!["header".to_string()]];
        all.extend(rows);
        LedgerFile::new(name, all, source)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_span_skips_unparseable() {
        let files = vec![file(
            "inplay.csv",
            Source::Inplay,
            vec![
                inplay_row("10/09/2024 10:00", "A", "1"),
                inplay_row("bogus", "A", "2"),
                inplay_row("02/09/2024 09:00", "A", "3"),
            ],
        )];

        assert_eq!(
            date_span(&files, DateConvention::DayFirst),
            Some((date(2024, 9, 2), date(2024, 9, 10)))
        );
        assert_eq!(date_span(&[], DateConvention::DayFirst), None);
    }

    #[test]
    fn test_load_inplay_issues_request_for_span() {
        let mut session = ComparisonSession::new(DateConvention::MonthFirst);
        let request = session
            .load_inplay(vec![file(
                "inplay.csv",
                Source::Inplay,
                vec![inplay_row("09/01/2024 10:00", "A", "1"), inplay_row("09/15/2024 10:00", "A", "2")],
            )])
            .unwrap();

        assert_eq!(request.start_date, date(2024, 9, 1));
        assert_eq!(request.end_date, date(2024, 9, 15));
        assert!(session.is_current(&request));

        let no_dates = session.load_inplay(vec![file("x.csv", Source::Inplay, vec![inplay_row("", "A", "1")])]);
        assert!(no_dates.is_none());
        assert!(!session.is_current(&request));
    }

    #[test]
    fn test_superseded_fetch_is_ignored() {
        let mut session = ComparisonSession::new(DateConvention::DayFirst);
        let first = session
            .load_inplay(vec![file("a.csv", Source::Inplay, vec![inplay_row("01/09/2024 10:00", "A", "1")])])
            .unwrap();
        let second = session
            .load_inplay(vec![file("b.csv", Source::Inplay, vec![inplay_row("05/09/2024 10:00", "A", "1")])])
            .unwrap();

        let late = file("late", Source::Local, vec![local_row("A", "stale")]);
        let outcome = session.apply_fetch(&first, Ok(late)).unwrap();
        assert_eq!(outcome, FetchOutcome::Superseded);
        assert!(session.files(Source::Local).is_empty());

        let stale_error = session.apply_fetch(&first, Err(ReconError::Fetch { status: 500, message: String::new() }));
        assert_eq!(stale_error.unwrap(), FetchOutcome::Superseded);

        let fresh = file("fresh", Source::Local, vec![local_row("A", "1")]);
        let outcome = session.apply_fetch(&second, Ok(fresh)).unwrap();
        assert_eq!(outcome, FetchOutcome::Applied { rows: 1 });
        assert_eq!(session.files(Source::Local)[0].name, "fresh");
    }

    #[test]
    fn test_failed_fetch_keeps_previous_local_data() {
        let mut session = ComparisonSession::new(DateConvention::DayFirst);
        session.load(Source::Local, vec![file("kept.csv", Source::Local, vec![local_row("A", "1")])]);

        let request = session
            .load_inplay(vec![file("in.csv", Source::Inplay, vec![inplay_row("01/09/2024 10:00", "A", "1")])])
            .unwrap();
        let result = session.apply_fetch(
            &request,
            Err(ReconError::Fetch { status: 503, message: "down".to_string() }),
        );

        assert!(matches!(result, Err(ReconError::Fetch { status: 503, .. })));
        assert_eq!(session.files(Source::Local)[0].name, "kept.csv");
        assert_eq!(session.stats().total_rows.local, 1);
    }

    #[test]
    fn test_parse_failure_leaves_other_source_loaded() {
        let mut session = ComparisonSession::new(DateConvention::DayFirst);
        session.load(Source::Local, vec![file("local.csv", Source::Local, vec![local_row("A", "1")])]);

        let bad: &[u8] = b"id,gateway\n1,\xff\xfe\n";
        let parsed = crate::parser::parse_ledger(bad, "broken.csv", Source::Inplay);
        assert!(matches!(parsed, Err(ReconError::Parse { ref name, .. }) if name == "broken.csv"));

        if let Ok(inplay) = parsed {
            session.load_inplay(vec![inplay]);
        }

        assert_eq!(session.files(Source::Local).len(), 1);
        assert!(session.files(Source::Inplay).is_empty());
        assert_eq!(session.stats().total_rows.local, 1);
    }

    #[test]
    fn test_new_batch_replaces_previous() {
        let mut session = ComparisonSession::default();
        session.load(Source::Local, vec![file("one.csv", Source::Local, vec![local_row("A", "1")])]);
        session.load(
            Source::Local,
            vec![
                file("two.csv", Source::Local, vec![local_row("B", "2")]),
                file("three.csv", Source::Local, vec![local_row("B", "3")]),
            ],
        );

        let stats = session.stats();
        assert_eq!(stats.total_rows.local, 2);
        assert!(stats.gateway("A").is_none());
        assert_eq!(stats.gateway("B").unwrap().local, 2);
    }

    #[test]
    fn test_filter_applies_to_stats_and_differences() {
        let mut session = ComparisonSession::new(DateConvention::DayFirst);
        session.load(
            Source::Local,
            vec![file("l.csv", Source::Local, vec![local_row("Stripe", "1"), local_row("Paypal", "2")])],
        );
        session.load(
            Source::Inplay,
            vec![file("i.csv", Source::Inplay, vec![inplay_row("", "Paypal", "9")])],
        );
        session.set_filter(FilterOptions {
            field_match: Some(FieldMatch::on(FilterField::Gateway, "pay")),
            date_range: None,
        });

        let stats = session.stats();
        assert_eq!(stats.total_rows.local, 1);
        assert!(stats.gateway("Stripe").is_none());

        let details = session.difference(&Selector::gateway("Paypal"));
        assert_eq!(details.local_only.len(), 1);
        assert_eq!(details.inplay_only.len(), 1);

        session.clear_filter();
        assert_eq!(session.stats().total_rows.local, 2);
    }

    #[test]
    fn test_filter_and_stats_read_files_with_the_same_layout() {
        let mut session = ComparisonSession::new(DateConvention::DayFirst);
        // local rows uploaded under an inplay tag
        let mut row = local_row("Stripe", "1");
        row[10] = "Paypal".to_string();
        session.load(Source::Local, vec![file("l.csv", Source::Inplay, vec![row])]);
        session.set_filter(FilterOptions {
            field_match: Some(FieldMatch::on(FilterField::Gateway, "stripe")),
            date_range: None,
        });

        let stats = session.stats();
        assert_eq!(stats.total_rows.local, 1);
        assert_eq!(stats.gateway("Stripe").unwrap().local, 1);
        assert!(stats.gateway("Paypal").is_none());
    }
}
