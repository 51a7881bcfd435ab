// 🌐 Local-Data Client - fetches the local ledger slice for a date span
// GET {base}/local-data?startDate=YYYY-MM-DD&endDate=YYYY-MM-DD

use chrono::NaiveDate;
use reqwest::Client;
use tracing::{info, warn};

use crate::error::{ReconError, Result};
use crate::parser::LedgerFile;
use crate::schema::Source;

const QUERY_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct LocalDataClient {
    client: Client,
    base_url: String,
}

impl LocalDataClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch local rows dated `start..=end`
    ///
    /// A non-success status is a `ReconError::Fetch`; the returned file is
    /// always tagged as local.
    pub async fn fetch(&self, start: NaiveDate, end: NaiveDate) -> Result<LedgerFile> {
        let url = format!("{}/local-data", self.base_url);
        let start_date = start.format(QUERY_DATE_FORMAT).to_string();
        let end_date = end.format(QUERY_DATE_FORMAT).to_string();

        info!(%url, %start_date, %end_date, "fetching local data");

        let response = self
            .client
            .get(&url)
            .query(&[("startDate", &start_date), ("endDate", &end_date)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %message, "local data request failed");
            return Err(ReconError::Fetch {
                status: status.as_u16(),
                message,
            });
        }

        let mut file: LedgerFile = response.json().await?;
        file.source = Source::Local;

        info!(rows = file.data_row_count(), "received local data");
        Ok(file)
    }
}
