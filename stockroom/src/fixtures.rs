//! Test-scoped fixtures
//!
//! Mirrors the setup chain used throughout the test suites: a managed
//! temporary directory, a git-scaffolded stockroom repository inside it, a
//! repository seeded with one arrayset, and an open `StockRoom`. Each layer
//! tears its resources down on drop.

use crate::repo::{data_dir, init_repo_with};
use crate::stock::StockRoom;
use anyhow::Result;
use std::fs;
use std::path::Path;
use stockroom_core::{NdArray, Repository, Settings};
use tempfile::TempDir;

/// Name of the arrayset seeded by [`RepoFixture::with_aset`]
pub const ASET_NAME: &str = "aset";

/// A per-test temporary root carrying scaled-down storage settings
///
/// The directory exists for the lifetime of the value and is removed on
/// drop.
pub struct TempRepoDir {
    dir: TempDir,
    settings: Settings,
}

impl TempRepoDir {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
            settings: Settings::small_for_tests(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

/// A temporary directory holding an initialized stockroom repository
///
/// Creates `.git/` and `.gitignore` scaffolding, then initializes the
/// repository with user `s <a@b.c>` and overwrite enabled.
pub struct RepoFixture {
    tmp: TempRepoDir,
}

impl RepoFixture {
    pub fn new() -> Result<Self> {
        let tmp = TempRepoDir::new()?;
        fs::create_dir(tmp.path().join(".git"))?;
        fs::write(tmp.path().join(".gitignore"), "")?;
        init_repo_with(tmp.path(), "s", "a@b.c", true, tmp.settings().clone())?;
        Ok(Self { tmp })
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    pub fn settings(&self) -> &Settings {
        self.tmp.settings()
    }

    /// Open the underlying repository handle
    pub fn open_repo(&self) -> Result<Repository> {
        Ok(Repository::open(&data_dir(self.root()))?)
    }

    /// Seed the repository with arrayset `aset`
    ///
    /// Declares the arrayset from a 4x5 i64 prototype, stores the 0..20
    /// arange as sample `"0"`, and commits `"init aset"`.
    pub fn with_aset(self) -> Result<Self> {
        let repo = self.open_repo()?;
        let proto = NdArray::arange_i64(20).reshape(&[4, 5])?;

        let mut co = repo.checkout_write()?;
        let aset = co.arraysets_mut().init_arrayset(ASET_NAME, &proto)?;
        aset.add("0", &proto)?;
        co.commit("init aset")?;
        co.close()?;
        repo.close_environments()?;
        Ok(self)
    }
}

/// A seeded repository with an open `StockRoom`
///
/// Teardown closes the wrapped repository's storage environments before the
/// temporary directory is removed.
pub struct StockFixture {
    stock: Option<StockRoom>,
    fixture: RepoFixture,
}

impl StockFixture {
    pub fn new() -> Result<Self> {
        let fixture = RepoFixture::new()?.with_aset()?;
        let stock = StockRoom::open_at(fixture.root())?;
        Ok(Self {
            stock: Some(stock),
            fixture,
        })
    }

    pub fn root(&self) -> &Path {
        self.fixture.root()
    }

    pub fn stock(&self) -> &StockRoom {
        self.stock.as_ref().expect("stock present until drop")
    }

    pub fn stock_mut(&mut self) -> &mut StockRoom {
        self.stock.as_mut().expect("stock present until drop")
    }
}

impl Drop for StockFixture {
    fn drop(&mut self) {
        if let Some(stock) = self.stock.take() {
            let _ = stock.repo().close_environments();
        }
    }
}
