// 🗄️ Local Ledger Store - SQLite + WAL
// Holds the local ledger in `transaction_lines` so the API can serve the
// slice matching an inplay upload's date span.

use chrono::{Duration, NaiveDate};
use rusqlite::{params_from_iter, Connection};
use tracing::{debug, info};

use crate::error::Result;
use crate::parser::{LedgerFile, Record};
use crate::schema::{cell, Source, LOCAL_FIELDS, LOCAL_HEADERS};
use crate::temporal::{parse_row_date, DateConvention};

/// Name of the file served by `get_local_data`
pub const LOCAL_DATA_NAME: &str = "database-data";

const STORED_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const QUERY_DATE_FORMAT: &str = "%Y-%m-%d";

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // payment_history_id is the natural key; NULLs (blank ids) never collide
    let columns = LOCAL_HEADERS
        .iter()
        .map(|name| {
            if *name == LOCAL_HEADERS[0] {
                format!("{} TEXT UNIQUE", name)
            } else {
                format!("{} TEXT", name)
            }
        })
        .collect::<Vec<_>>()
        .join(",\n            ");

    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS transaction_lines (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            {}
        )",
            columns
        ),
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_created_at ON transaction_lines(created_at)",
        [],
    )?;

    Ok(())
}

/// Bring `created_at` into the stored sortable form when it can be read
fn normalize_created_at(raw: &str, convention: DateConvention) -> String {
    parse_row_date(raw, convention)
        .map(|dt| dt.format(STORED_DATE_FORMAT).to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Insert the data rows of a local ledger file
///
/// Rows are padded/truncated to the local column list. Rows whose
/// `payment_history_id` already exists are skipped.
pub fn insert_lines(conn: &Connection, file: &LedgerFile, convention: DateConvention) -> Result<usize> {
    let placeholders = (1..=LOCAL_HEADERS.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO transaction_lines ({}) VALUES ({})",
        LOCAL_HEADERS.join(", "),
        placeholders
    );
    let mut stmt = conn.prepare(&sql)?;

    let mut inserted = 0;
    let mut duplicates = 0;

    for record in file.data_rows() {
        let values: Vec<Option<String>> = (0..LOCAL_HEADERS.len())
            .map(|position| {
                let value = cell(record, position);
                if position == 0 && value.trim().is_empty() {
                    None
                } else if position == LOCAL_FIELDS.event_date {
                    Some(normalize_created_at(value, convention))
                } else {
                    Some(value.to_string())
                }
            })
            .collect();

        match stmt.execute(params_from_iter(values.iter())) {
            Ok(_) => inserted += 1,
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                duplicates += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(file = %file.name, inserted, duplicates, "imported local ledger rows");

    Ok(inserted)
}

/// Rows with `created_at` on any day in `[start, end]`, oldest first
///
/// The header row is the local column list. When `end` is the last
/// representable day the range has no upper bound.
pub fn get_local_data(conn: &Connection, start: NaiveDate, end: NaiveDate) -> Result<LedgerFile> {
    let lower = start.format(QUERY_DATE_FORMAT).to_string();
    let upper = end
        .checked_add_signed(Duration::days(1))
        .map(|day| day.format(QUERY_DATE_FORMAT).to_string());

    let bound = if upper.is_some() { "AND created_at < ?2" } else { "" };
    let sql = format!(
        "SELECT {}
         FROM transaction_lines
         WHERE created_at >= ?1 {}
         ORDER BY created_at, id",
        LOCAL_HEADERS.join(", "),
        bound
    );
    let mut stmt = conn.prepare(&sql)?;

    let params: Vec<String> = std::iter::once(lower).chain(upper).collect();
    let data = stmt
        .query_map(params_from_iter(params.iter()), |row| {
            (0..LOCAL_HEADERS.len())
                .map(|i| row.get::<_, Option<String>>(i).map(Option::unwrap_or_default))
                .collect::<rusqlite::Result<Record>>()
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    debug!(%start, %end, rows = data.len(), "loaded local data");

    let mut rows = Vec::with_capacity(data.len() + 1);
    rows.push(LOCAL_HEADERS.iter().map(|h| h.to_string()).collect());
    rows.extend(data);

    Ok(LedgerFile::new(LOCAL_DATA_NAME, rows, Source::Local))
}

pub fn verify_count(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM transaction_lines", [], |row| row.get(0))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_line(id: &str, gateway: &str, created_at: &str) -> Record {
        let mut record = vec![String::new(); LOCAL_HEADERS.len()];
        record[0] = id.to_string();
        record[7] = gateway.to_string();
        record[16] = created_at.to_string();
        record
    }

    fn local_file(rows: Vec<Record>) -> LedgerFile {
        let mut all = vec![LOCAL_HEADERS.iter().map(|h| h.to_string()).collect()];
        all.extend(rows);
        LedgerFile::new("local.csv", all, Source::Local)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn open() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_import_twice_skips_duplicates() {
        let conn = open();
        let file = local_file(vec![
            local_line("1", "Stripe", "2024-09-01 10:00:00"),
            local_line("2", "Paypal", "2024-09-02 10:00:00"),
            local_line("", "Stripe", "2024-09-02 11:00:00"),
        ]);

        let first = insert_lines(&conn, &file, DateConvention::DayFirst).unwrap();
        let second = insert_lines(&conn, &file, DateConvention::DayFirst).unwrap();

        assert_eq!(first, 3);
        // blank ids are stored as NULL and never collide
        assert_eq!(second, 1);
        assert_eq!(verify_count(&conn).unwrap(), 4);

        println!("✅ Idempotent import: {} then {}", first, second);
    }

    #[test]
    fn test_range_is_inclusive_and_ordered() {
        let conn = open();
        let file = local_file(vec![
            local_line("late", "A", "2024-09-15 23:59:59"),
            local_line("early", "A", "2024-09-01 00:00:00"),
            local_line("before", "A", "2024-08-31 23:59:59"),
            local_line("after", "A", "2024-09-16 00:00:00"),
        ]);
        insert_lines(&conn, &file, DateConvention::DayFirst).unwrap();

        let data = get_local_data(&conn, date(2024, 9, 1), date(2024, 9, 15)).unwrap();
        let ids: Vec<&str> = data.data_rows().iter().map(|r| r[0].as_str()).collect();

        assert_eq!(data.name, "database-data");
        assert_eq!(data.source, Source::Local);
        assert_eq!(data.header().unwrap().len(), 33);
        assert_eq!(ids, vec!["early", "late"]);
    }

    #[test]
    fn test_import_normalizes_slash_dates() {
        let conn = open();
        let file = local_file(vec![local_line("1", "A", "05/09/2024 14:00")]);
        insert_lines(&conn, &file, DateConvention::DayFirst).unwrap();

        let data = get_local_data(&conn, date(2024, 9, 5), date(2024, 9, 5)).unwrap();
        assert_eq!(data.data_row_count(), 1);
        assert_eq!(data.data_rows()[0][16], "2024-09-05 14:00:00");
    }

    #[test]
    fn test_last_representable_end_date_is_open_ended() {
        let conn = open();
        let file = local_file(vec![
            local_line("old", "A", "2023-12-31 23:00:00"),
            local_line("new", "A", "2024-01-01 00:00:00"),
            local_line("later", "A", "2099-06-01 12:00:00"),
        ]);
        insert_lines(&conn, &file, DateConvention::DayFirst).unwrap();

        let data = get_local_data(&conn, date(2024, 1, 1), NaiveDate::MAX).unwrap();
        let ids: Vec<&str> = data.data_rows().iter().map(|r| r[0].as_str()).collect();

        assert_eq!(ids, vec!["new", "later"]);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let conn = open();
        let file = local_file(vec![vec!["only-id".to_string()]]);
        insert_lines(&conn, &file, DateConvention::DayFirst).unwrap();

        let count = verify_count(&conn).unwrap();
        assert_eq!(count, 1);
    }
}
