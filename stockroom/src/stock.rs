//! The `StockRoom` façade
//!
//! A simplified view over a checkout for storing labelled arrays. Labelled
//! data lives in one reserved arrayset whose schema is fixed by the first
//! array stored.

use crate::repo::open_repo;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use stockroom_core::{NdArray, ObjectId, Repository, WriteCheckout};

/// Reserved arrayset for labelled data
pub const DATA_ARRAYSET: &str = "data";

/// Simplified handle over a stockroom repository
pub struct StockRoom {
    root: PathBuf,
    repo: Repository,
    writer: Option<WriteCheckout>,
}

impl StockRoom {
    /// Open the stockroom in the current working directory
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::open_at(&cwd)
    }

    /// Open the stockroom rooted at `root`
    pub fn open_at(root: &Path) -> Result<Self> {
        let repo = open_repo(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            repo,
            writer: None,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The wrapped repository handle, exposed for teardown
    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    fn writer(&mut self) -> Result<&mut WriteCheckout> {
        if self.writer.is_none() {
            let co = self.repo.checkout_write()?;
            self.writer = Some(co);
        }
        self.writer.as_mut().context("write checkout unavailable")
    }

    /// Stage an array under `label`
    pub fn put_array(&mut self, label: &str, array: &NdArray) -> Result<()> {
        let co = self.writer()?;
        if !co.arraysets().contains(DATA_ARRAYSET) {
            co.arraysets_mut().init_arrayset(DATA_ARRAYSET, array)?;
        }
        let aset = co
            .arraysets_mut()
            .get_mut(DATA_ARRAYSET)
            .context("data arrayset missing")?;
        aset.add(label, array)?;
        Ok(())
    }

    /// Read a labelled array, preferring staged state over head
    pub fn get_array(&self, label: &str) -> Result<NdArray> {
        if let Some(co) = self.writer.as_ref() {
            if let Some(aset) = co.arraysets().get(DATA_ARRAYSET) {
                return Ok(aset.get(label)?);
            }
        }
        let reader = self.repo.checkout_read()?;
        Ok(reader.arrayset(DATA_ARRAYSET)?.get(label)?)
    }

    /// Commit staged arrays and release the write checkout
    pub fn commit(&mut self, message: &str) -> Result<ObjectId> {
        let co = self
            .writer
            .as_mut()
            .context("nothing staged; no open write checkout")?;
        let id = co.commit(message)?;
        if let Some(co) = self.writer.take() {
            co.close()?;
        }
        Ok(id)
    }

    /// Close any open write checkout, discarding uncommitted staged arrays
    pub fn close(mut self) -> Result<()> {
        if let Some(co) = self.writer.take() {
            co.close()?;
        }
        Ok(())
    }
}
