//! Fixture correctness tests
//!
//! Each fixture layer must leave the filesystem and repository in the state
//! the next layer assumes, and tear everything down afterwards.

use std::path::PathBuf;
use stockroom::fixtures::{ASET_NAME, RepoFixture, StockFixture, TempRepoDir};
use stockroom::{DATA_DIR, StockRoom};
use stockroom_core::DType;

#[test]
fn test_tmpdir_exists_during_and_removed_after() {
    let path: PathBuf;
    {
        let tmp = TempRepoDir::new().unwrap();
        path = tmp.path().to_path_buf();
        assert!(path.is_dir());
        assert_eq!(tmp.settings().map_size, 2_000_000);
        assert_eq!(tmp.settings().packed.collection_count, 10);
        assert_eq!(tmp.settings().packed.collection_size, 50);
    }
    assert!(!path.exists());
}

#[test]
fn test_repo_fixture_scaffolding() {
    let fixture = RepoFixture::new().unwrap();
    let root = fixture.root();

    assert!(root.join(".git").is_dir());
    assert!(root.join(".gitignore").is_file());
    assert!(root.join(DATA_DIR).join("config.json").is_file());

    let gitignore = std::fs::read_to_string(root.join(".gitignore")).unwrap();
    assert!(gitignore.lines().any(|line| line.trim() == ".stock/"));

    let repo = fixture.open_repo().unwrap();
    assert_eq!(repo.user_identity(), ("s", "a@b.c"));
    assert!(repo.head().unwrap().is_none());
    repo.close_environments().unwrap();
}

#[test]
fn test_repo_fixture_removed_after_drop() {
    let path: PathBuf;
    {
        let fixture = RepoFixture::new().unwrap();
        path = fixture.root().to_path_buf();
        assert!(path.join(DATA_DIR).is_dir());
    }
    assert!(!path.exists());
}

#[test]
fn test_with_aset_seeds_arrayset_and_commits_once() {
    let fixture = RepoFixture::new().unwrap().with_aset().unwrap();
    let repo = fixture.open_repo().unwrap();

    let log = repo.log(10).unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].message, "init aset");
    assert_eq!(log[0].author, "s");
    assert_eq!(log[0].email, "a@b.c");
    assert!(log[0].is_initial());

    let reader = repo.checkout_read().unwrap();
    assert!(reader.has_arrayset(ASET_NAME));
    let view = reader.arrayset(ASET_NAME).unwrap();
    assert_eq!(view.schema().dtype, DType::I64);
    assert_eq!(view.schema().shape, vec![4, 5]);
    assert_eq!(view.len(), 1);

    let sample = view.get("0").unwrap();
    let values = sample.as_i64().unwrap();
    assert_eq!(values.len(), 20);
    assert_eq!(values[0], 0);
    assert_eq!(values[19], 19);

    repo.close_environments().unwrap();
}

#[test]
fn test_stock_fixture_constructible_over_seeded_repo() {
    let fixture = StockFixture::new().unwrap();
    let stock = fixture.stock();
    assert_eq!(stock.repo().user_identity(), ("s", "a@b.c"));
    assert_eq!(stock.repo().log(10).unwrap().len(), 1);
}

#[test]
fn test_stock_opens_from_root_once_arrayset_exists() {
    let fixture = RepoFixture::new().unwrap().with_aset().unwrap();
    let stock = StockRoom::open_at(fixture.root()).unwrap();
    assert!(!stock.repo().uuid().is_empty());
    stock.repo().close_environments().unwrap();
}

#[test]
fn test_stock_open_fails_without_repository() {
    let tmp = TempRepoDir::new().unwrap();
    assert!(StockRoom::open_at(tmp.path()).is_err());
}
