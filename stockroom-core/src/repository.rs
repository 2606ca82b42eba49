//! Repository lifecycle and storage environments
//!
//! Layout on disk:
//! ```text
//! {root}/
//!   config.json     — uuid, user identity, settings snapshot
//!   refdb.sqlite    — commits and refs (WAL mode)
//!   packed/         — zstd pack backend
//!   plain/          — raw collection backend
//!   LOCK            — present while a write checkout is open
//! ```

use crate::backend::{BackendCode, BackendStore, PackedStore, PlainStore};
use crate::checkout::{ReadCheckout, WriteCheckout};
use crate::error::StoreError;
use crate::object::{CommitRecord, ObjectId};
use crate::settings::Settings;
use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Repository configuration written at init time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    pub uuid: String,
    pub user_name: String,
    pub user_email: String,
    pub created_at: i64,
    pub settings: Settings,
}

fn open_refdb(root: &Path, settings: &Settings) -> crate::error::Result<Connection> {
    let db_path = root.join("refdb.sqlite");
    let conn = Connection::open(&db_path)
        .map_err(|e| StoreError::Database(format!("Failed to open ref database: {}", e)))?;

    let setup = || -> rusqlite::Result<()> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "mmap_size", settings.map_size as i64)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS commits (
                rev INTEGER PRIMARY KEY,
                id TEXT NOT NULL,
                record BLOB NOT NULL
            );
            CREATE TABLE IF NOT EXISTS refs (
                name TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    };
    setup().map_err(|e| StoreError::Database(format!("Failed to set up ref database: {}", e)))?;
    Ok(conn)
}

/// Open storage environments for one repository
///
/// Shared (via `Arc`) between the repository handle and its checkouts so a
/// teardown through either is observed by all.
pub struct Environments {
    refdb: Mutex<Option<Connection>>,
    packed: PackedStore,
    plain: PlainStore,
    closed: AtomicBool,
}

impl Environments {
    fn open(root: &Path, settings: &Settings) -> crate::error::Result<Self> {
        let refdb = open_refdb(root, settings)?;
        let packed = PackedStore::open(&root.join("packed"), settings.packed)?;
        let plain = PlainStore::open(&root.join("plain"), settings.plain)?;
        Ok(Self {
            refdb: Mutex::new(Some(refdb)),
            packed,
            plain,
            closed: AtomicBool::new(false),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Flush backends and close the ref database. Idempotent; every
    /// operation after this fails with `StoreError::Closed`.
    pub fn close(&self) -> crate::error::Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.packed.flush()?;
        self.plain.flush()?;
        let mut guard = self.refdb.lock().unwrap();
        guard.take();
        tracing::debug!("Closed storage environments");
        Ok(())
    }

    pub(crate) fn store(&self, code: BackendCode) -> crate::error::Result<&dyn BackendStore> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        Ok(match code {
            BackendCode::Packed00 => &self.packed,
            BackendCode::Plain10 => &self.plain,
        })
    }

    pub(crate) fn flush_backends(&self) -> crate::error::Result<()> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        self.packed.flush()?;
        self.plain.flush()
    }

    fn with_refdb<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> crate::error::Result<T> {
        let guard = self.refdb.lock().unwrap();
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;
        f(conn).map_err(|e| StoreError::Database(e.to_string()))
    }

    pub(crate) fn head_rev(&self) -> crate::error::Result<Option<u64>> {
        let value: Option<String> = self.with_refdb(|conn| {
            conn.query_row("SELECT value FROM refs WHERE name = 'head'", [], |r| {
                r.get(0)
            })
            .optional()
        })?;
        Ok(value.and_then(|s| s.parse().ok()))
    }

    pub(crate) fn commit_at(&self, rev: u64) -> crate::error::Result<CommitRecord> {
        let bytes: Vec<u8> = self.with_refdb(|conn| {
            conn.query_row(
                "SELECT record FROM commits WHERE rev = ?1",
                [rev as i64],
                |r| r.get(0),
            )
        })?;
        CommitRecord::from_bytes(&bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    pub(crate) fn head_commit(&self) -> crate::error::Result<Option<(u64, CommitRecord)>> {
        match self.head_rev()? {
            Some(rev) => Ok(Some((rev, self.commit_at(rev)?))),
            None => Ok(None),
        }
    }

    /// Append a commit and advance head
    pub(crate) fn record_commit(
        &self,
        record: &CommitRecord,
    ) -> crate::error::Result<(u64, ObjectId)> {
        let id = record.id();
        let bytes = record
            .to_bytes()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let rev = self.with_refdb(|conn| {
            let next: i64 =
                conn.query_row("SELECT COALESCE(MAX(rev), 0) + 1 FROM commits", [], |r| {
                    r.get(0)
                })?;
            conn.execute(
                "INSERT INTO commits (rev, id, record) VALUES (?1, ?2, ?3)",
                rusqlite::params![next, id.to_hex(), bytes],
            )?;
            conn.execute(
                "INSERT INTO refs (name, value) VALUES ('head', ?1)
                 ON CONFLICT(name) DO UPDATE SET value = excluded.value",
                rusqlite::params![next.to_string()],
            )?;
            Ok(next)
        })?;
        Ok((rev as u64, id))
    }

    pub(crate) fn log(&self, limit: usize) -> crate::error::Result<Vec<CommitRecord>> {
        let rows: Vec<Vec<u8>> = self.with_refdb(|conn| {
            let mut stmt = conn.prepare("SELECT record FROM commits ORDER BY rev DESC LIMIT ?1")?;
            let rows = stmt.query_map([limit as i64], |r| r.get::<_, Vec<u8>>(0))?;
            rows.collect()
        })?;
        rows.iter()
            .map(|b| {
                CommitRecord::from_bytes(b).map_err(|e| StoreError::Serialization(e.to_string()))
            })
            .collect()
    }
}

/// Repository handle
pub struct Repository {
    root: PathBuf,
    config: RepoConfig,
    env: Arc<Environments>,
}

impl Repository {
    /// Initialize a repository at `root` with a user identity
    ///
    /// Errors if the directory already holds a repository and `overwrite`
    /// is false; with `overwrite`, existing contents are cleared first.
    pub fn init(
        root: &Path,
        user_name: &str,
        user_email: &str,
        overwrite: bool,
        settings: Settings,
    ) -> Result<Self> {
        if root.join("config.json").exists() {
            if !overwrite {
                bail!("repository already initialized at {:?}", root);
            }
            fs::remove_dir_all(root)
                .with_context(|| format!("Failed to clear repository at {:?}", root))?;
            tracing::info!("Overwriting existing repository at {:?}", root);
        }
        fs::create_dir_all(root)
            .with_context(|| format!("Failed to create repository directory {:?}", root))?;

        let config = RepoConfig {
            uuid: uuid::Uuid::new_v4().to_string(),
            user_name: user_name.to_string(),
            user_email: user_email.to_string(),
            created_at: chrono::Utc::now().timestamp(),
            settings,
        };
        let data = serde_json::to_string_pretty(&config)?;
        fs::write(root.join("config.json"), data)?;

        let env = Environments::open(root, &config.settings)?;
        tracing::info!(uuid = %config.uuid, "Initialized repository at {:?}", root);

        Ok(Self {
            root: root.to_path_buf(),
            config,
            env: Arc::new(env),
        })
    }

    /// Open an existing repository
    pub fn open(root: &Path) -> Result<Self> {
        let config_path = root.join("config.json");
        if !config_path.exists() {
            bail!("no repository at {:?} (missing config.json)", root);
        }
        let config: RepoConfig = serde_json::from_str(&fs::read_to_string(&config_path)?)
            .with_context(|| format!("Failed to read repository config at {:?}", config_path))?;
        let env = Environments::open(root, &config.settings)?;
        Ok(Self {
            root: root.to_path_buf(),
            config,
            env: Arc::new(env),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn uuid(&self) -> &str {
        &self.config.uuid
    }

    pub fn user_identity(&self) -> (&str, &str) {
        (&self.config.user_name, &self.config.user_email)
    }

    pub fn settings(&self) -> &Settings {
        &self.config.settings
    }

    fn lock_path(&self) -> PathBuf {
        self.root.join("LOCK")
    }

    /// Open a write-mode checkout
    ///
    /// Holds the advisory writer lock until the checkout is closed.
    pub fn checkout_write(&self) -> Result<WriteCheckout> {
        if self.env.is_closed() {
            return Err(StoreError::Closed.into());
        }
        let parent = self.env.head_commit()?;

        let lock_path = self.lock_path();
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StoreError::LockHeld(lock_path).into());
            }
            Err(e) => return Err(e.into()),
        }

        tracing::debug!("Opened write checkout at {:?}", self.root);
        Ok(WriteCheckout::new(
            Arc::clone(&self.env),
            lock_path,
            self.config.user_name.clone(),
            self.config.user_email.clone(),
            parent,
        ))
    }

    /// Open a read-only checkout at head
    pub fn checkout_read(&self) -> Result<ReadCheckout> {
        let (rev, record) = self
            .env
            .head_commit()?
            .context("no commits yet; nothing to check out")?;
        Ok(ReadCheckout::new(Arc::clone(&self.env), rev, record))
    }

    /// Current head revision and commit id, if any commits exist
    pub fn head(&self) -> Result<Option<(u64, ObjectId)>> {
        Ok(self
            .env
            .head_commit()?
            .map(|(rev, record)| (rev, record.id())))
    }

    /// Commit history, newest first
    pub fn log(&self, limit: usize) -> Result<Vec<CommitRecord>> {
        Ok(self.env.log(limit)?)
    }

    /// Tear down storage environments
    ///
    /// Safe to call more than once; all operations through this handle and
    /// its checkouts fail afterwards.
    pub fn close_environments(&self) -> Result<()> {
        self.env.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_and_reopen_keeps_uuid() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        let repo = Repository::init(&root, "s", "a@b.c", false, Settings::small_for_tests())
            .unwrap();
        let uuid = repo.uuid().to_string();
        assert_eq!(uuid.len(), 36);
        drop(repo);

        let repo = Repository::open(&root).unwrap();
        assert_eq!(repo.uuid(), uuid);
        assert_eq!(repo.user_identity(), ("s", "a@b.c"));
        assert_eq!(repo.settings(), &Settings::small_for_tests());
    }

    #[test]
    fn test_init_refuses_existing_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        let repo = Repository::init(&root, "s", "a@b.c", false, Settings::small_for_tests())
            .unwrap();
        drop(repo);

        assert!(
            Repository::init(&root, "s", "a@b.c", false, Settings::small_for_tests()).is_err()
        );
        let repo =
            Repository::init(&root, "t", "x@y.z", true, Settings::small_for_tests()).unwrap();
        assert_eq!(repo.user_identity(), ("t", "x@y.z"));
    }

    #[test]
    fn test_writer_lock_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        let repo = Repository::init(&root, "s", "a@b.c", false, Settings::small_for_tests())
            .unwrap();

        let co = repo.checkout_write().unwrap();
        assert!(repo.checkout_write().is_err());
        co.close().unwrap();
        assert!(repo.checkout_write().is_ok());
    }

    #[test]
    fn test_close_environments_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        let repo = Repository::init(&root, "s", "a@b.c", false, Settings::small_for_tests())
            .unwrap();

        repo.close_environments().unwrap();
        repo.close_environments().unwrap();
        assert!(repo.head().is_err());
        assert!(repo.checkout_write().is_err());
    }
}
