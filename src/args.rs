use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand};
use ledger_recon::{DateConvention, DateRange, FieldMatch, FilterField, FilterOptions};
use std::path::PathBuf;

/// Reconcile a local ledger against an inplay (partner) ledger.
#[derive(Parser, Debug)]
#[clap(version)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the combined gateway / action-type comparison
    Compare {
        #[clap(flatten)]
        input: InputArgs,

        /// Print the raw stats as JSON instead of a table
        #[clap(long)]
        json: bool,
    },

    /// Show the unmatched rows of one bucket
    Diff {
        #[clap(flatten)]
        input: InputArgs,

        /// Gateway of the bucket ("unknown" for blank gateways)
        #[clap(long)]
        gateway: String,

        /// Narrow the bucket to one action type
        #[clap(long)]
        action_type: Option<String>,

        /// Write local-only.csv and inplay-only.csv here
        #[clap(long)]
        out_dir: Option<PathBuf>,
    },

    /// Fetch the local rows covering the inplay files' dates and compare
    Fetch {
        /// Inplay files
        #[clap(long, required = true, num_args = 1..)]
        inplay: Vec<PathBuf>,

        /// Date convention of the inplay files
        #[clap(long)]
        date_format: Option<DateConvention>,

        /// Base URL of the local-data API (defaults to LOCAL_DATA_URL)
        #[clap(long)]
        url: Option<String>,

        /// Where to save the fetched local rows
        #[clap(long, default_value = "local-data.csv")]
        out: PathBuf,
    },

    /// Load local ledger files into the SQLite store
    ImportLocal {
        /// Local ledger files
        #[clap(required = true)]
        files: Vec<PathBuf>,

        /// Database file (defaults to DATABASE_PATH)
        #[clap(long)]
        db: Option<PathBuf>,

        /// Convention used to read slash dates in created_at
        #[clap(long)]
        date_format: Option<DateConvention>,
    },

    /// Browse the comparison in the terminal
    Ui {
        #[clap(flatten)]
        input: InputArgs,

        /// Directory for downloads from the UI
        #[clap(long, default_value = ".")]
        export_dir: PathBuf,
    },
}

/// Files and filters shared by the comparison commands
#[derive(Debug, ClapArgs)]
pub struct InputArgs {
    /// Local ledger files
    #[clap(long, num_args = 1..)]
    pub local: Vec<PathBuf>,

    /// Inplay ledger files
    #[clap(long, num_args = 1..)]
    pub inplay: Vec<PathBuf>,

    /// day-first or month-first (defaults to DATE_CONVENTION)
    #[clap(long)]
    pub date_format: Option<DateConvention>,

    /// Keep rows dated on or after this day (YYYY-MM-DD)
    #[clap(long, requires = "to")]
    pub from: Option<NaiveDate>,

    /// Keep rows dated on or before this day (YYYY-MM-DD)
    #[clap(long, requires = "from")]
    pub to: Option<NaiveDate>,

    /// Column to match: gateway, action-type, currency, consumer-id, token, date
    #[clap(long, requires = "pattern")]
    pub field: Option<FilterField>,

    /// Case-insensitive text the field must contain
    #[clap(long = "match", requires = "field")]
    pub pattern: Option<String>,
}

impl InputArgs {
    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            field_match: match (self.field, &self.pattern) {
                (Some(field), Some(pattern)) => Some(FieldMatch::on(field, pattern.clone())),
                _ => None,
            },
            date_range: match (self.from, self.to) {
                (Some(start), Some(end)) => Some(DateRange::new(start, end)),
                _ => None,
            },
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
