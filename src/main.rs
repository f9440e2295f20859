use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use feedmail::app::{App, Delivery, FeedOutcome, RunSummary};
use feedmail::config::Config;
use feedmail::storage::{Database, DatabaseError};

/// Get the config directory path (~/.config/feedmail/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let config_dir = PathBuf::from(home).join(".config").join("feedmail");
    Ok(config_dir)
}

/// Create `dir` if needed and restrict it to the current user.
fn prepare_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }

    // SEC-007: Set directory permissions on Unix (user-only access)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(dir, perms) {
                    tracing::warn!(
                        path = %dir.display(),
                        error = %e,
                        "Failed to set config directory permissions to 0700"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %dir.display(),
                    error = %e,
                    "Failed to read config directory metadata"
                );
            }
        }
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(
    name = "feedmail",
    version,
    about = "Deliver RSS/Atom feed entries as email"
)]
struct Cli {
    /// Config file (default: ~/.config/feedmail/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// State database (default: ~/.config/feedmail/state.db)
    #[arg(long, global = true, value_name = "FILE")]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Subscribe to a feed
    Add {
        name: String,
        url: String,
        /// Recipient, when it differs from the default
        to: Option<String>,
    },
    /// Unsubscribe from a feed and forget what it sent
    Remove { name: String },
    /// List subscriptions
    List,
    /// Forget seen entries so the next run sends everything again
    Reset { name: String },
    /// Fetch feeds and mail new entries
    Run {
        /// Feeds to run (default: all)
        names: Vec<String>,
        /// Record new entries as seen without sending anything
        #[arg(long, conflicts_with = "stdout")]
        no_send: bool,
        /// Print messages to stdout instead of mailing them
        #[arg(long)]
        stdout: bool,
    },
}

fn init_tracing(config: &Config) {
    // RUST_LOG wins over the `verbose` option
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_options().verbose))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(summary: &RunSummary) {
    for (name, outcome) in &summary.outcomes {
        match outcome {
            FeedOutcome::Done(report) if report.emitted > 0 => {
                eprintln!("{}: {} new entries", name, report.emitted);
            }
            FeedOutcome::Done(_) | FeedOutcome::Inactive => {}
            FeedOutcome::Failed(e) => eprintln!("Error: {}: {:#}", name, e),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_dir = get_config_dir()?;
    let config_path = match cli.config {
        Some(path) => path,
        None => {
            prepare_dir(&config_dir)?;
            config_dir.join("config.toml")
        }
    };
    let db_path = match cli.data {
        Some(path) => path,
        None => {
            prepare_dir(&config_dir)?;
            config_dir.join("state.db")
        }
    };

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    init_tracing(&config);

    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another feedmail run appears to be using {}. Please wait for it to finish.",
                db_path.display()
            );
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    let mut app = App::new(config, config_path, db).context("Failed to create application")?;

    match cli.command {
        Command::Add { name, url, to } => {
            let feed = app.add(&name, &url, to.as_deref())?;
            println!("Added {}", feed);
        }
        Command::Remove { name } => {
            app.remove(&name).await?;
            println!("Removed {}", name);
        }
        Command::List => {
            for feed in app.feeds()? {
                if feed.options.active {
                    println!("{}", feed);
                } else {
                    println!("{} (inactive)", feed);
                }
            }
        }
        Command::Reset { name } => {
            app.reset(&name).await?;
            println!("Reset {}", name);
        }
        Command::Run {
            names,
            no_send,
            stdout,
        } => {
            let delivery = if no_send {
                Delivery::Record
            } else if stdout {
                Delivery::Stdout
            } else {
                Delivery::Mail
            };

            // Interrupting drops the in-flight feed without saving its state
            let summary = tokio::select! {
                summary = app.run(&names, delivery) => summary?,
                _ = tokio::signal::ctrl_c() => {
                    tracing::warn!("Interrupted, abandoning run");
                    eprintln!("Interrupted");
                    std::process::exit(130);
                }
            };

            print_summary(&summary);
            let failures = summary.failures();
            if failures > 0 {
                eprintln!("{} feed(s) failed", failures);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
