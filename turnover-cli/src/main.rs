//! Turnover CLI - export bank account transactions to CSV and email

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use turnover_core::adapters::duckdb::DuckDbStore;
use turnover_core::adapters::smtp::Mailer;
use turnover_core::config::{load_recipient_file, parse_recipient};
use turnover_core::{
    Config, ExportService, ExportSummary, MailSink, SmtpSettings, TransactionRepository,
};

/// Turnover - fetch, deduplicate and export bank account transactions
#[derive(Parser)]
#[command(name = "turnover", version, about, long_about = None)]
struct Cli {
    /// Online banking username
    #[arg(long, env = "TURNOVER_USERNAME")]
    username: String,

    /// Pre-hashed online banking password
    #[arg(long, env = "TURNOVER_PASSWORD_HASH")]
    password_hash: String,

    /// Portal base URL
    #[arg(long, env = "TURNOVER_BASE_URL")]
    base_url: Option<String>,

    /// Fetch transactions starting this many days back
    #[arg(long, default_value_t = 1)]
    max_age_days: i64,

    /// Fetch transactions up to this many days back
    #[arg(long, default_value_t = 0)]
    min_age_days: i64,

    /// Keep the per-account CSV files after the run
    #[arg(long)]
    save_csv: bool,

    /// Directory CSV files are written into
    #[arg(long, default_value = ".")]
    csv_dir: PathBuf,

    /// Export only transactions not seen in earlier runs
    #[arg(long)]
    only_new: bool,

    /// Deduplication database file (default: ~/.turnover/turnover.duckdb)
    #[arg(long, env = "TURNOVER_DB_FILE")]
    db_file: Option<PathBuf>,

    /// Deduplication table name
    #[arg(long, default_value = "transactions")]
    table: String,

    /// Email recipient as account-id:address (repeatable)
    #[arg(long = "email", value_name = "ACCOUNT:ADDRESS")]
    emails: Vec<String>,

    /// File with one account-id:address mapping per line
    #[arg(long, value_name = "FILE")]
    email_file: Option<PathBuf>,

    /// SMTP relay host
    #[arg(long, env = "TURNOVER_SMTP_HOST")]
    smtp_host: Option<String>,

    /// SMTP relay port
    #[arg(long, env = "TURNOVER_SMTP_PORT", default_value_t = 587)]
    smtp_port: u16,

    /// SMTP username (also the From address)
    #[arg(long, env = "TURNOVER_SMTP_USERNAME")]
    smtp_username: Option<String>,

    /// SMTP password
    #[arg(long, env = "TURNOVER_SMTP_PASSWORD")]
    smtp_password: Option<String>,

    /// Connect to the SMTP relay without STARTTLS
    #[arg(long)]
    smtp_no_tls: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let json = cli.json;
    let config = build_config(cli)?;
    config.validate()?;

    let repository: Option<Arc<dyn TransactionRepository>> = if config.only_new {
        if let Some(parent) = config.db_file.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let store = DuckDbStore::new(&config.db_file, &config.table_name)
            .with_context(|| format!("cannot open store {}", config.db_file.display()))?;
        Some(Arc::new(store))
    } else {
        None
    };

    let mailer: Option<Box<dyn MailSink>> = config
        .smtp
        .clone()
        .map(|settings| Box::new(Mailer::new(settings)) as Box<dyn MailSink>);

    let service = ExportService::new(config, repository, mailer);
    let summary = service.run()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    print_summary(&summary);

    Ok(())
}

fn build_config(cli: Cli) -> Result<Config> {
    let mut recipients = match &cli.email_file {
        Some(path) => load_recipient_file(path)
            .with_context(|| format!("cannot read {}", path.display()))?,
        None => Default::default(),
    };
    for raw in &cli.emails {
        let (account, email) = parse_recipient(raw)?;
        recipients.insert(account, email);
    }

    // Host, username and password travel together; a partial set is a
    // config error. The port alone has a usable default.
    let smtp_parts = [
        cli.smtp_host.is_some(),
        cli.smtp_username.is_some(),
        cli.smtp_password.is_some(),
    ];
    let smtp = match (cli.smtp_host, cli.smtp_username, cli.smtp_password) {
        (Some(host), Some(username), Some(password)) => Some(SmtpSettings {
            host,
            port: cli.smtp_port,
            username,
            password,
            use_tls: !cli.smtp_no_tls,
        }),
        _ if smtp_parts.iter().any(|set| *set) => {
            anyhow::bail!("SMTP host, username and password must be given together");
        }
        _ => None,
    };

    let db_file = match cli.db_file {
        Some(path) => path,
        None => default_db_file()?,
    };

    let defaults = Config::default();
    Ok(Config {
        username: cli.username,
        password_hash: cli.password_hash,
        base_url: cli.base_url.unwrap_or(defaults.base_url),
        max_age_days: cli.max_age_days,
        min_age_days: cli.min_age_days,
        only_new: cli.only_new,
        db_file,
        table_name: cli.table,
        save_to_csv: cli.save_csv,
        csv_dir: cli.csv_dir,
        recipients,
        smtp,
    })
}

fn default_db_file() -> Result<PathBuf> {
    let home = dirs::home_dir().context("cannot determine the home directory")?;
    Ok(home.join(".turnover").join("turnover.duckdb"))
}

fn print_summary(summary: &ExportSummary) {
    println!(
        "Transactions from {} to {}",
        summary.start_date, summary.end_date
    );
    println!();

    for account in &summary.accounts {
        println!("{} {}", "Exported:".green(), account.account);
        println!("  Discovered: {}", account.discovered);
        println!("  New: {}", account.exported);
        println!("  Skipped: {} (already exported)", account.skipped_existing);
        if let Some(file) = &account.file {
            println!("  File: {}", file);
        }
        if let Some(recipient) = &account.emailed_to {
            println!("  Emailed to: {}", recipient);
        }
        if let Some(error) = &account.email_error {
            println!("  {} {}", "Email failed:".red(), error);
        }
        println!();
    }

    if summary.accounts.is_empty() {
        println!("{}", "No new transactions in the window.".yellow());
    }
}
