//! Stockroom CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::Path;
use stockroom::open_repo;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "stock")]
#[command(author = "Stockroom Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Versioned array storage for git projects")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize a stockroom repository in the current directory
    Init {
        /// User name recorded in commits
        #[arg(short, long)]
        name: String,
        /// User email recorded in commits
        #[arg(short, long)]
        email: String,
        /// Overwrite an existing repository
        #[arg(long)]
        overwrite: bool,
    },

    /// Commit staged state in the current directory's repository
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,
    },

    /// Show repository status
    Status,

    /// Show commit history, newest first
    Log {
        /// Maximum number of commits to show
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
}

/// Commit whatever a write checkout of the repository at `root` has staged
fn run_commit(root: &Path, message: &str) -> Result<String> {
    let repo = open_repo(root)?;
    let mut co = repo.checkout_write()?;
    let outcome = co.commit(message);
    co.close()?;
    repo.close_environments()?;
    let id = outcome?;
    Ok(id.to_hex())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Init {
            name,
            email,
            overwrite,
        } => {
            stockroom::init_repo(&name, &email, overwrite)?;
            println!("Initialized stockroom repository in {}", cwd.display());
        }

        Commands::Commit { message } => {
            let id = run_commit(&cwd, &message)?;
            println!("Committed {}", id);
        }

        Commands::Status => {
            let repo = open_repo(&cwd)?;
            println!("uuid:  {}", repo.uuid());
            let (name, email) = repo.user_identity();
            println!("user:  {} <{}>", name, email);
            match repo.head()? {
                Some((rev, id)) => {
                    println!("head:  rev {} ({})", rev, id);
                    let reader = repo.checkout_read()?;
                    for name in reader.arrayset_names() {
                        let view = reader.arrayset(name)?;
                        println!(
                            "aset:  {} {} ({} samples)",
                            name,
                            view.schema(),
                            view.len()
                        );
                    }
                }
                None => println!("head:  no commits yet"),
            }
            repo.close_environments()?;
        }

        Commands::Log { limit } => {
            let repo = open_repo(&cwd)?;
            for record in repo.log(limit)? {
                let when = chrono::DateTime::from_timestamp(record.timestamp, 0)
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| record.timestamp.to_string());
                println!("commit {}", record.id());
                println!("Author: {} <{}>", record.author, record.email);
                println!("Date:   {}", when);
                println!();
                println!("    {}", record.message);
                println!();
            }
            repo.close_environments()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom::fixtures::RepoFixture;

    #[test]
    fn test_commit_subcommand_parses() {
        let cli = Cli::try_parse_from(["stock", "commit", "-m", "store batch"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Commit { message } if message == "store batch"
        ));
    }

    #[test]
    fn test_commit_with_nothing_staged_fails_cleanly() {
        let fixture = RepoFixture::new().unwrap();
        let err = run_commit(fixture.root(), "empty").unwrap_err();
        assert!(err.to_string().contains("nothing to commit"));
        // The writer lock must not leak on the error path
        let repo = fixture.open_repo().unwrap();
        assert!(repo.checkout_write().is_ok());
        repo.close_environments().unwrap();
    }
}
