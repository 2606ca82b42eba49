//! Write and read checkouts

use crate::arrayset::{ArraysetView, Arraysets};
use crate::error::StoreError;
use crate::object::{CommitRecord, ObjectId};
use crate::repository::Environments;
use anyhow::{Result, bail};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Write-mode checkout
///
/// Holds the repository writer lock. Arrayset declarations and sample adds
/// stage against this checkout; `commit` makes them durable, `close`
/// releases the lock and discards anything uncommitted.
pub struct WriteCheckout {
    env: Arc<Environments>,
    lock_path: PathBuf,
    author: String,
    email: String,
    parent: Option<ObjectId>,
    arraysets: Arraysets,
    released: bool,
}

impl WriteCheckout {
    pub(crate) fn new(
        env: Arc<Environments>,
        lock_path: PathBuf,
        author: String,
        email: String,
        head: Option<(u64, CommitRecord)>,
    ) -> Self {
        let (parent, arraysets) = match head {
            Some((_, record)) => (
                Some(record.id()),
                Arraysets::from_manifests(Arc::clone(&env), &record.manifests),
            ),
            None => (None, Arraysets::new(Arc::clone(&env))),
        };
        Self {
            env,
            lock_path,
            author,
            email,
            parent,
            arraysets,
            released: false,
        }
    }

    pub fn arraysets(&self) -> &Arraysets {
        &self.arraysets
    }

    pub fn arraysets_mut(&mut self) -> &mut Arraysets {
        &mut self.arraysets
    }

    /// Record staged state as a new commit and advance head
    pub fn commit(&mut self, message: &str) -> Result<ObjectId> {
        if self.released {
            return Err(StoreError::Closed.into());
        }
        if message.trim().is_empty() {
            bail!("empty commit message");
        }
        if !self.arraysets.any_dirty() {
            bail!("nothing to commit");
        }

        let record = CommitRecord {
            parent: self.parent,
            author: self.author.clone(),
            email: self.email.clone(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
            manifests: self.arraysets.manifests(),
        };

        // Sample data must be durable before the ref advances
        self.env.flush_backends()?;
        let (rev, id) = self.env.record_commit(&record)?;
        self.parent = Some(id);
        self.arraysets.clear_dirty();
        tracing::info!(rev, id = %id.short_hex(), "Committed: {}", message);
        Ok(id)
    }

    /// Release the writer lock
    pub fn close(mut self) -> Result<()> {
        self.release()?;
        Ok(())
    }

    fn release(&mut self) -> std::io::Result<()> {
        if !self.released {
            self.released = true;
            fs::remove_file(&self.lock_path)?;
        }
        Ok(())
    }
}

impl Drop for WriteCheckout {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

/// Read-only checkout pinned to one commit
pub struct ReadCheckout {
    env: Arc<Environments>,
    rev: u64,
    record: CommitRecord,
}

impl ReadCheckout {
    pub(crate) fn new(env: Arc<Environments>, rev: u64, record: CommitRecord) -> Self {
        Self { env, rev, record }
    }

    pub fn rev(&self) -> u64 {
        self.rev
    }

    pub fn commit_id(&self) -> ObjectId {
        self.record.id()
    }

    pub fn record(&self) -> &CommitRecord {
        &self.record
    }

    pub fn arrayset_names(&self) -> impl Iterator<Item = &str> {
        self.record.manifests.keys().map(String::as_str)
    }

    pub fn has_arrayset(&self, name: &str) -> bool {
        self.record.manifests.contains_key(name)
    }

    /// View over one arrayset at this commit
    pub fn arrayset(&self, name: &str) -> crate::error::Result<ArraysetView> {
        let manifest = self
            .record
            .manifests
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::ArraysetNotFound(name.to_string()))?;
        Ok(ArraysetView::new(
            Arc::clone(&self.env),
            name.to_string(),
            manifest,
        ))
    }
}
