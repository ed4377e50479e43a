mod app;
mod backup;
mod config;
mod date;
mod db;
mod error;
mod models;
mod parser;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use app::Tracker;
use config::{Config, DEFAULT_PAGE_SIZE};
use db::Database;
use models::{Record, Status};

#[derive(Parser)]
#[command(name = "trackjobs")]
#[command(about = "Track job applications pasted from LinkedIn and Greenhouse")]
struct Cli {
    /// Database file (defaults to the user data directory)
    #[arg(long, global = true, env = "TRACKJOBS_DB")]
    db: Option<PathBuf>,

    /// Maximum number of results for list and company search
    #[arg(long, global = true, env = "TRACKJOBS_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Copy the database into this directory on exit
    #[arg(long, global = true, env = "TRACKJOBS_BACKUP_DIR")]
    backup_dir: Option<PathBuf>,

    /// Upload the database to this URL on exit (needs TRACKJOBS_BACKUP_TOKEN)
    #[arg(long, global = true, env = "TRACKJOBS_BACKUP_URL")]
    backup_url: Option<String>,

    #[arg(long, hide = true, env = "TRACKJOBS_BACKUP_TOKEN", hide_env_values = true)]
    backup_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a pasted job posting and save it
    Track {
        /// File with the pasted page content (reads stdin if omitted)
        file: Option<PathBuf>,

        /// Platform the content came from (linkedin, greenhouse)
        #[arg(short, long, default_value = "linkedin")]
        platform: String,

        /// Extra note to attach
        #[arg(short, long)]
        note: Option<String>,

        /// Print the parsed application as JSON without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// List the most recent applications
    List {
        #[arg(long)]
        json: bool,
    },

    /// Show application details
    Show {
        /// Application ID
        id: i64,
    },

    /// Find applications by company name
    Company {
        /// Part of the company name (case-insensitive)
        name: String,

        #[arg(long)]
        json: bool,
    },

    /// Full-text search over company, position and notes
    Search {
        /// Words or "quoted phrases"
        query: String,

        #[arg(long)]
        json: bool,
    },

    /// Change an application's status
    Status {
        /// Application ID
        id: i64,

        /// SUBMITTED, REJECTED, PHONE_SCREEN, REMOTE_INTERVIEW, ON_SITE_INTERVIEW
        status: String,
    },

    /// Append a note to an application
    Note {
        /// Application ID
        id: i64,

        text: String,
    },

    /// Delete an application
    Delete {
        /// Application ID
        id: i64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trackjobs=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::new(cli.db, cli.page_size)
        .with_backup_dir(cli.backup_dir)
        .with_backup_url(cli.backup_url, cli.backup_token);

    let db = Database::open(&config.db_path)
        .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?;
    let backup = backup::resolve_backup(&config.backup);
    let mut tracker = Tracker::new(db, backup, config.page_size).with_backup_timeout(config.backup.wait);

    let outcome = run(&mut tracker, cli.command);
    finish(outcome, tracker.shutdown().context("Failed to close database"))
}

/// The command's error wins; a shutdown failure after it is only logged.
fn finish(outcome: Result<()>, shutdown: Result<()>) -> Result<()> {
    match (outcome, shutdown) {
        (Err(e), Err(close)) => {
            tracing::error!("{close:#}");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(()), shutdown) => shutdown,
    }
}

fn run(tracker: &mut Tracker, command: Commands) -> Result<()> {
    match command {
        Commands::Track {
            file,
            platform,
            note,
            dry_run,
        } => {
            let content = read_input(file.as_ref())?;
            let mut record = tracker.extract(&content, &platform)?;
            if let Some(note) = note {
                record.append_note(note.trim());
            }

            if dry_run {
                println!("{}", serde_json::to_string_pretty(&record)?);
                return Ok(());
            }

            let id = tracker.save(&mut record)?;
            println!("Tracked application #{}: {} at {}", id, record.position, record.company);
        }

        Commands::List { json } => {
            let records = tracker.list_all()?;
            print_records(&records, json, "No applications tracked yet.")?;
            if !json && records.len() == tracker.page_size() {
                println!("(showing the {} most recent)", records.len());
            }
        }

        Commands::Show { id } => match tracker.get(id)? {
            Some(record) => print_details(&record),
            None => println!("Application #{} not found.", id),
        },

        Commands::Company { name, json } => {
            let records = tracker.search_by_company(&name)?;
            print_records(&records, json, "No matching companies.")?;
        }

        Commands::Search { query, json } => {
            let records = tracker.full_text_search(&query)?;
            print_records(&records, json, "No matches.")?;
        }

        Commands::Status { id, status } => {
            let status: Status = status.parse()?;
            let record = tracker.set_status(id, status)?;
            println!("#{} {} at {} is now {}", id, record.position, record.company, record.status);
        }

        Commands::Note { id, text } => {
            tracker.add_note(id, &text)?;
            println!("Added note to application #{}", id);
        }

        Commands::Delete { id } => {
            tracker.delete(id)?;
            println!("Deleted application #{}", id);
        }
    }

    Ok(())
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read pasted content from stdin")?;
            Ok(content)
        }
    }
}

fn print_records(records: &[Record], json: bool, empty_message: &str) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("{}", empty_message);
        return Ok(());
    }

    println!(
        "{:<6} {:<11} {:<18} {:<24} {:<20} {:<22}",
        "ID", "APPLIED", "STATUS", "COMPANY", "POSITION", "SALARY"
    );
    println!("{}", "-".repeat(104));
    for record in records {
        println!(
            "{:<6} {:<11} {:<18} {:<24} {:<20} {:<22}",
            record.id.unwrap_or_default(),
            record.date_applied,
            record.status,
            truncate(&record.company, 22),
            truncate(&record.position, 18),
            truncate(&record.salary_range, 22)
        );
    }
    Ok(())
}

fn print_details(record: &Record) {
    println!("Application #{}", record.id.unwrap_or_default());
    println!("Company: {}", record.company);
    println!("Position: {}", record.position);
    println!("Status: {}", record.status);
    println!("Applied: {}", record.date_applied);
    if !record.location.is_empty() {
        println!("Location: {}", record.location);
    }
    if !record.workplace_type.is_empty() {
        println!("Workplace: {}", record.workplace_type);
    }
    if !record.salary_range.is_empty() {
        println!("Salary: {}", record.salary_range);
    }
    if !record.website.is_empty() {
        println!("Website: {}", record.website);
    }
    if !record.notes.is_empty() {
        println!("\n--- Notes ---");
        for line in record.notes.lines() {
            println!("{}", textwrap::fill(line, 78));
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
