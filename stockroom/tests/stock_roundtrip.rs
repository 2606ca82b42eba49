//! StockRoom behavior over a real repository

use stockroom::StockRoom;
use stockroom::fixtures::RepoFixture;
use stockroom_core::{DType, NdArray};

#[test]
fn test_put_commit_get_roundtrip() {
    let fixture = RepoFixture::new().unwrap();
    let mut stock = StockRoom::open_at(fixture.root()).unwrap();

    let sample = NdArray::arange_i64(12).reshape(&[3, 4]).unwrap();
    stock.put_array("batch-1", &sample).unwrap();
    stock.commit("store batch-1").unwrap();

    assert_eq!(stock.get_array("batch-1").unwrap(), sample);
    stock.repo().close_environments().unwrap();
}

#[test]
fn test_staged_arrays_visible_before_commit() {
    let fixture = RepoFixture::new().unwrap();
    let mut stock = StockRoom::open_at(fixture.root()).unwrap();

    let sample = NdArray::zeros(DType::F64, &[8, 8]);
    stock.put_array("weights", &sample).unwrap();
    assert_eq!(stock.get_array("weights").unwrap(), sample);

    stock.close().unwrap();
}

#[test]
fn test_commit_without_staging_fails() {
    let fixture = RepoFixture::new().unwrap();
    let mut stock = StockRoom::open_at(fixture.root()).unwrap();
    assert!(stock.commit("nothing here").is_err());
    stock.repo().close_environments().unwrap();
}

#[test]
fn test_labelled_arrays_survive_reopen() {
    let fixture = RepoFixture::new().unwrap();
    let sample = NdArray::arange_i64(20).reshape(&[4, 5]).unwrap();

    {
        let mut stock = StockRoom::open_at(fixture.root()).unwrap();
        stock.put_array("batch-1", &sample).unwrap();
        stock.commit("store batch-1").unwrap();
        stock.repo().close_environments().unwrap();
    }

    let stock = StockRoom::open_at(fixture.root()).unwrap();
    assert_eq!(stock.get_array("batch-1").unwrap(), sample);
    stock.repo().close_environments().unwrap();
}

#[test]
fn test_schema_fixed_by_first_array() {
    let fixture = RepoFixture::new().unwrap();
    let mut stock = StockRoom::open_at(fixture.root()).unwrap();

    stock
        .put_array("a", &NdArray::zeros(DType::I64, &[2, 2]))
        .unwrap();
    assert!(
        stock
            .put_array("b", &NdArray::zeros(DType::F64, &[3]))
            .is_err()
    );

    stock.close().unwrap();
}
