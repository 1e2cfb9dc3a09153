// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use subtracker::{
    count_label, default_backup_file_name, format_amount, init_logging, AppConfig,
    BackupDocument, Frequency, LogTarget, SqliteStore, SubscriptionBook, SubscriptionForm, Theme,
};

#[derive(Debug, Parser)]
#[command(name = "subtracker", version, about = "Track recurring subscription payments")]
struct Cli {
    /// Database file (overrides SUBTRACKER_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive terminal UI (default)
    Tui,
    /// List subscriptions in display order
    List,
    /// Count and monthly/yearly totals
    Summary,
    /// Add a subscription; DATE is the last billing date, the next one is stored
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        amount: String,
        /// YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Weekly, Biweekly, Monthly or Yearly
        #[arg(long, default_value = "Monthly")]
        frequency: String,
    },
    /// Change fields of an existing subscription
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        frequency: Option<String>,
    },
    /// Delete a subscription
    Remove { id: String },
    /// Write a JSON backup (default: subtracker-backup-<today>.json)
    Export { path: Option<PathBuf> },
    /// Merge a JSON backup into the current subscriptions
    Import { path: PathBuf },
    /// Show or set the appearance (system, light, dark)
    Theme { theme: Option<String> },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(db) = cli.db {
        config = config.with_db_path(db);
    }

    match cli.command.unwrap_or(Command::Tui) {
        Command::Tui => run_ui_mode(&config),
        command => {
            init_logging(config.log_format, &LogTarget::Stderr, "warn")?;
            let store = SqliteStore::open(&config.db_path)?;
            let mut book = SubscriptionBook::open(store);
            run_command(command, &mut book)
        }
    }
}

fn run_command(command: Command, book: &mut SubscriptionBook<SqliteStore>) -> Result<()> {
    match command {
        Command::Tui => anyhow::bail!("the terminal UI is started without a subcommand"),
        Command::List => print_list(book),
        Command::Summary => print_summary(book),
        Command::Add {
            name,
            amount,
            date,
            frequency,
        } => {
            let date = date.unwrap_or_else(|| SubscriptionForm::default().date);
            let form = SubscriptionForm::new(&name, &amount, &date, Frequency::from(frequency));
            warn_unknown_frequency(&form.frequency);

            let sub = book.add(&form).context("Subscription not saved")?;
            println!("✓ Added {} ({})", sub.name, sub.id);
            println!("  Next due: {}", sub.date);
        }
        Command::Edit {
            id,
            name,
            amount,
            date,
            frequency,
        } => {
            let existing = book
                .get(&id)
                .with_context(|| format!("No subscription with id {}", id))?;

            let mut form = SubscriptionForm::from_subscription(existing);
            if let Some(name) = name {
                form.name = name;
            }
            if let Some(amount) = amount {
                form.amount = amount;
            }
            if let Some(date) = date {
                form.date = date;
            }
            if let Some(frequency) = frequency {
                form.frequency = Frequency::from(frequency);
                warn_unknown_frequency(&form.frequency);
            }

            let sub = book.update(&id, &form).context("Subscription not saved")?;
            println!("✓ Updated {} ({})", sub.name, sub.id);
        }
        Command::Remove { id } => {
            let removed = book.remove(&id)?;
            println!("✓ Removed {}", removed.name);
        }
        Command::Export { path } => {
            let path = path.unwrap_or_else(|| default_backup_file_name(Local::now().date_naive()));
            book.export().write_to(&path)?;
            println!(
                "✓ Exported {} to {}",
                count_label(book.len()).to_lowercase(),
                path.display()
            );
        }
        Command::Import { path } => {
            let document = BackupDocument::read_from(&path)?;
            let report = book.import(document);
            if report.updated == 0 && report.added == 0 {
                println!("Nothing imported from {}", path.display());
            } else {
                println!(
                    "✓ Imported from {}: {} updated, {} added",
                    path.display(),
                    report.updated,
                    report.added
                );
            }
        }
        Command::Theme { theme } => match theme {
            None => println!("{}", book.settings().selected_theme),
            Some(raw) => {
                let theme = Theme::parse(&raw).with_context(|| {
                    format!("Unknown theme '{}': use system, light or dark", raw)
                })?;
                book.set_theme(theme);
                println!("✓ Appearance set to {}", theme.label());
            }
        },
    }

    Ok(())
}

fn warn_unknown_frequency(frequency: &Frequency) {
    if !frequency.is_known() {
        eprintln!(
            "⚠️  Unknown frequency '{}': it will not count toward totals",
            frequency
        );
    }
}

fn print_list(book: &SubscriptionBook<SqliteStore>) {
    if book.is_empty() {
        println!("No subscriptions yet");
        return;
    }

    println!(
        "{:<36}  {:<24}  {:>10}  {:<9}  {}",
        "ID", "Name", "Amount", "Frequency", "Due"
    );
    println!("{}", "━".repeat(96));
    for sub in book.subscriptions() {
        println!(
            "{:<36}  {:<24}  {:>10}  {:<9}  {}",
            sub.id,
            sub.name,
            format_amount(sub.amount),
            sub.frequency,
            sub.date.format("%b %-d, %Y")
        );
    }
    println!("{}", "━".repeat(96));
    println!("{}", count_label(book.len()));
}

fn print_summary(book: &SubscriptionBook<SqliteStore>) {
    let summary = book.summary();
    println!("📊 {}", count_label(summary.count));
    println!("   Total Monthly Cost: {}", format_amount(summary.monthly_total));
    println!("   Total Yearly Cost:  {}", format_amount(summary.yearly_total));
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &AppConfig) -> Result<()> {
    let store = SqliteStore::open(&config.db_path)?;
    init_logging(
        config.log_format,
        &LogTarget::File(config.log_path.clone()),
        "info",
    )?;

    let book = SubscriptionBook::open(store);
    let mut app = ui::App::new(book);
    ui::run_ui(&mut app)?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &AppConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use a subcommand: subtracker --help");
    std::process::exit(1);
}
