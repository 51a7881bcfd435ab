mod args;

// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use args::{Command, InputArgs};
use ledger_recon::{
    export_to_path, insert_lines, load_ledger, load_ledgers, report, setup_database, verify_count,
    ComparisonSession, Config, DateConvention, FetchOutcome, LedgerFile, LocalDataClient, Record,
    Selector, Source,
};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,ledger_recon=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let args = args::parse();

    // The TUI owns the terminal; keep log lines off it
    if !matches!(args.command, Command::Ui { .. }) {
        init_tracing();
    }

    let config = Config::from_env()?;

    match args.command {
        Command::Compare { input, json } => run_compare(&config, &input, json),
        Command::Diff {
            input,
            gateway,
            action_type,
            out_dir,
        } => run_diff(&config, &input, &gateway, action_type.as_deref(), out_dir.as_deref()),
        Command::Fetch {
            inplay,
            date_format,
            url,
            out,
        } => run_fetch(&config, &inplay, date_format, url, &out),
        Command::ImportLocal {
            files,
            db,
            date_format,
        } => run_import(&config, &files, db, date_format),
        Command::Ui { input, export_dir } => run_ui_mode(&config, &input, export_dir),
    }
}

/// Build a session from the input files and filters
fn load_session(config: &Config, input: &InputArgs) -> Result<ComparisonSession> {
    let convention = input.date_format.unwrap_or(config.date_convention);
    let mut session = ComparisonSession::new(convention);

    let local = load_ledgers(&input.local, Source::Local).context("Failed to load local files")?;
    session.load(Source::Local, local);

    let inplay = load_ledgers(&input.inplay, Source::Inplay).context("Failed to load inplay files")?;
    session.load(Source::Inplay, inplay);

    session.set_filter(input.filter_options());
    Ok(session)
}

fn run_compare(config: &Config, input: &InputArgs, json: bool) -> Result<()> {
    let session = load_session(config, input)?;
    let stats = session.stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("⚖️  Combined Comparison");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if let (Some(field), Some(pattern)) = (input.field, &input.pattern) {
        println!("🔎 Filter: {} contains \"{}\"", field.label(), pattern);
    }
    if let (Some(from), Some(to)) = (input.from, input.to) {
        println!("📅 Dates: {} → {} ({})", from, to, session.convention());
    }
    print!("{}", report::render_text(&stats));

    let unbalanced = stats.unbalanced_gateways().count();
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if unbalanced == 0 {
        println!("✅ Every gateway balances");
    } else {
        println!("⚠️  {} gateway(s) with count differences", unbalanced);
    }

    Ok(())
}

/// Header of the first file of a side, so exports stay readable
fn with_header(files: &[LedgerFile], rows: &[Record]) -> Vec<Record> {
    files
        .first()
        .and_then(|file| file.header().cloned())
        .into_iter()
        .chain(rows.iter().cloned())
        .collect()
}

fn run_diff(
    config: &Config,
    input: &InputArgs,
    gateway: &str,
    action_type: Option<&str>,
    out_dir: Option<&Path>,
) -> Result<()> {
    let session = load_session(config, input)?;
    let selector = match action_type {
        Some(action_type) => Selector::composite(gateway, action_type),
        None => Selector::gateway(gateway),
    };
    let details = session.difference(&selector);

    println!("🔍 Difference Details for {}", selector);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✓ Matched: local {} / inplay {}", details.local_matched, details.inplay_matched);

    println!("\nInPlay Records ({})", details.inplay_only.len());
    for line in report::preview_rows(&details.inplay_only, report::DETAIL_ROW_LIMIT) {
        println!("  {}", line);
    }
    println!("\nLocal Records ({})", details.local_only.len());
    for line in report::preview_rows(&details.local_only, report::DETAIL_ROW_LIMIT) {
        println!("  {}", line);
    }

    if let Some(dir) = out_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

        let local = with_header(session.files(Source::Local), &details.local_only);
        let inplay = with_header(session.files(Source::Inplay), &details.inplay_only);
        export_to_path(&local, &dir.join("local-only.csv"))?;
        export_to_path(&inplay, &dir.join("inplay-only.csv"))?;

        println!("\n💾 Exported to {}", dir.display());
    }

    if details.is_clean() {
        println!("\n✅ No unmatched rows");
    }

    Ok(())
}

fn run_fetch(
    config: &Config,
    inplay: &[PathBuf],
    date_format: Option<DateConvention>,
    url: Option<String>,
    out: &Path,
) -> Result<()> {
    let mut session = ComparisonSession::new(date_format.unwrap_or(config.date_convention));

    let files = load_ledgers(inplay, Source::Inplay).context("Failed to load inplay files")?;
    let Some(request) = session.load_inplay(files) else {
        anyhow::bail!("No parseable dates in the inplay files; nothing to fetch");
    };

    let client = LocalDataClient::new(url.unwrap_or_else(|| config.local_data_url.clone()));
    println!(
        "🌐 Fetching local data {} → {} from {}",
        request.start_date,
        request.end_date,
        client.base_url()
    );

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(client.fetch(request.start_date, request.end_date));

    match session.apply_fetch(&request, result).context("Local data fetch failed")? {
        FetchOutcome::Applied { rows } => println!("✓ Received {} local rows", rows),
        FetchOutcome::Superseded => anyhow::bail!("Local data response was superseded"),
    }

    if let Some(local) = session.files(Source::Local).first() {
        export_to_path(&local.rows, out)?;
        println!("💾 Saved local data to {}", out.display());
    }

    println!();
    print!("{}", report::render_text(&session.stats()));

    Ok(())
}

fn run_import(
    config: &Config,
    files: &[PathBuf],
    db: Option<PathBuf>,
    date_format: Option<DateConvention>,
) -> Result<()> {
    println!("🗄️  Local Ledger Import - CSV → SQLite + WAL");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let db_path = db.unwrap_or_else(|| config.database_path.clone());
    let convention = date_format.unwrap_or(config.date_convention);

    // 1. Setup database
    println!("\n🔧 Setting up database...");
    let conn = Connection::open(&db_path)
        .with_context(|| format!("Failed to open {}", db_path.display()))?;
    setup_database(&conn)?;
    println!("✓ Database initialized with WAL mode: {}", db_path.display());

    // 2. Insert rows
    let mut total_rows = 0;
    let mut inserted = 0;
    for path in files {
        println!("\n📂 Loading {}...", path.display());
        let file = load_ledger(path, Source::Local)?;
        total_rows += file.data_row_count();

        let count = insert_lines(&conn, &file, convention)?;
        println!("✓ Inserted {} of {} rows", count, file.data_row_count());
        inserted += count;
    }

    // 3. Verify count
    println!("\n🔍 Verifying database...");
    let count = verify_count(&conn)?;
    println!("✓ Database contains {} rows", count);

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Import complete: {} new, {} skipped", inserted, total_rows - inserted);

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &Config, input: &InputArgs, export_dir: PathBuf) -> Result<()> {
    println!("🖥️  Loading ledgers...");
    let session = load_session(config, input)?;

    let mut app = ui::App::new(session, export_dir);
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &Config, _input: &InputArgs, _export_dir: PathBuf) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: ledger-recon compare");
    std::process::exit(1);
}
