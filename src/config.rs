use serde::Deserialize;
use std::path::PathBuf;

use crate::error::{ReconError, Result};
use crate::temporal::DateConvention;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Address the API server binds to
    pub bind_address: String,
    /// SQLite file holding the local ledger
    pub database_path: PathBuf,
    /// Base URL of the local-data API, e.g. `http://localhost:3001/api`
    pub local_data_url: String,
    /// How inplay dates are read when no convention is given per upload
    pub date_convention: DateConvention,
}

impl Config {
    /// Read settings from the environment (and `.env`, when present)
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let date_convention = match std::env::var("DATE_CONVENTION") {
            Ok(value) => value
                .parse()
                .map_err(|e: ReconError| ReconError::Config(format!("DATE_CONVENTION: {}", e)))?,
            Err(_) => DateConvention::default(),
        };

        Ok(Self {
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:3001".to_string()),
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "transactions.db".to_string())
                .into(),
            local_data_url: std::env::var("LOCAL_DATA_URL")
                .unwrap_or_else(|_| "http://localhost:3001/api".to_string()),
            date_convention,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3001".to_string(),
            database_path: PathBuf::from("transactions.db"),
            local_data_url: "http://localhost:3001/api".to_string(),
            date_convention: DateConvention::default(),
        }
    }
}
