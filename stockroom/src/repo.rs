//! Repository discovery and initialization
//!
//! Stockroom rides inside a git project: the data directory lives next to
//! `.git` and is kept out of version control via `.gitignore`.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use stockroom_core::{Repository, Settings};

/// Data directory created inside the project root
pub const DATA_DIR: &str = ".stock";

/// `.gitignore` entry for the data directory
const GITIGNORE_ENTRY: &str = ".stock/";

/// Path of the stockroom data directory inside `root`
pub fn data_dir(root: &Path) -> PathBuf {
    root.join(DATA_DIR)
}

/// Initialize a stockroom repository in the current working directory
pub fn init_repo(name: &str, email: &str, overwrite: bool) -> Result<()> {
    let cwd = std::env::current_dir()?;
    init_repo_at(&cwd, name, email, overwrite)
}

/// Initialize a stockroom repository at `root` with default settings
pub fn init_repo_at(root: &Path, name: &str, email: &str, overwrite: bool) -> Result<()> {
    init_repo_with(root, name, email, overwrite, Settings::default())
}

/// Initialize a stockroom repository at `root` with explicit settings
pub fn init_repo_with(
    root: &Path,
    name: &str,
    email: &str,
    overwrite: bool,
    settings: Settings,
) -> Result<()> {
    if !root.join(".git").is_dir() {
        bail!(
            "{:?} is not a git repository; run `git init` before initializing stockroom",
            root
        );
    }

    ensure_gitignore_entry(root)?;
    let repo = Repository::init(&data_dir(root), name, email, overwrite, settings)
        .with_context(|| format!("Failed to initialize stockroom repository at {:?}", root))?;
    tracing::info!(uuid = %repo.uuid(), "Stockroom repository ready at {:?}", root);
    repo.close_environments()?;
    Ok(())
}

/// Open the stockroom repository rooted at `root`
pub fn open_repo(root: &Path) -> Result<Repository> {
    Repository::open(&data_dir(root))
        .with_context(|| format!("No stockroom repository at {:?}", root))
}

fn ensure_gitignore_entry(root: &Path) -> Result<()> {
    let gitignore = root.join(".gitignore");
    let contents = if gitignore.exists() {
        fs::read_to_string(&gitignore)?
    } else {
        String::new()
    };
    if contents.lines().any(|line| line.trim() == GITIGNORE_ENTRY) {
        return Ok(());
    }
    let mut updated = contents;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(GITIGNORE_ENTRY);
    updated.push('\n');
    fs::write(&gitignore, updated)?;
    Ok(())
}
