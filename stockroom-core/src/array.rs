//! Typed n-dimensional array values
//!
//! Samples are stored as a dtype, a shape, and a row-major little-endian
//! byte buffer. This is the unit of data tracked by arraysets.

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};

/// Element type of an array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DType {
    I64,
    F64,
    U8,
    Bool,
}

impl DType {
    /// Size of one element in bytes
    pub fn size_bytes(&self) -> usize {
        match self {
            DType::I64 | DType::F64 => 8,
            DType::U8 | DType::Bool => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DType::I64 => "i64",
            DType::F64 => "f64",
            DType::U8 => "u8",
            DType::Bool => "bool",
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An n-dimensional array value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NdArray {
    dtype: DType,
    shape: Vec<usize>,
    data: Vec<u8>,
}

impl NdArray {
    /// Build an array from raw parts, validating the buffer length
    pub fn from_parts(dtype: DType, shape: Vec<usize>, data: Vec<u8>) -> Result<Self> {
        let expected = shape.iter().product::<usize>() * dtype.size_bytes();
        if data.len() != expected {
            return Err(StoreError::ShapeMismatch(format!(
                "buffer of {} bytes cannot hold shape {:?} of {}",
                data.len(),
                shape,
                dtype
            )));
        }
        Ok(Self { dtype, shape, data })
    }

    /// Zero-filled array
    pub fn zeros(dtype: DType, shape: &[usize]) -> Self {
        let len = shape.iter().product::<usize>() * dtype.size_bytes();
        Self {
            dtype,
            shape: shape.to_vec(),
            data: vec![0u8; len],
        }
    }

    /// Build a 1-d i64 array from values, then optionally `reshape`
    pub fn from_i64(shape: &[usize], values: &[i64]) -> Result<Self> {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::from_parts(DType::I64, shape.to_vec(), data)
    }

    pub fn from_f64(shape: &[usize], values: &[f64]) -> Result<Self> {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::from_parts(DType::F64, shape.to_vec(), data)
    }

    pub fn from_u8(shape: &[usize], values: &[u8]) -> Result<Self> {
        Self::from_parts(DType::U8, shape.to_vec(), values.to_vec())
    }

    /// 1-d i64 array holding 0..n
    pub fn arange_i64(n: usize) -> Self {
        let values: Vec<i64> = (0..n as i64).collect();
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self {
            dtype: DType::I64,
            shape: vec![n],
            data,
        }
    }

    /// Reinterpret the buffer under a new shape with the same element count
    pub fn reshape(self, shape: &[usize]) -> Result<Self> {
        if shape.iter().product::<usize>() != self.element_count() {
            return Err(StoreError::ShapeMismatch(format!(
                "cannot reshape {:?} into {:?}",
                self.shape, shape
            )));
        }
        Ok(Self {
            dtype: self.dtype,
            shape: shape.to_vec(),
            data: self.data,
        })
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Raw little-endian buffer
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn nbytes(&self) -> usize {
        self.data.len()
    }

    /// Read the buffer back as i64 values
    pub fn as_i64(&self) -> Result<Vec<i64>> {
        if self.dtype != DType::I64 {
            return Err(StoreError::ShapeMismatch(format!(
                "cannot read {} array as i64",
                self.dtype
            )));
        }
        Ok(self
            .data
            .chunks_exact(8)
            .map(|c| i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect())
    }

    /// Read the buffer back as f64 values
    pub fn as_f64(&self) -> Result<Vec<f64>> {
        if self.dtype != DType::F64 {
            return Err(StoreError::ShapeMismatch(format!(
                "cannot read {} array as f64",
                self.dtype
            )));
        }
        Ok(self
            .data
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_sizes() {
        assert_eq!(DType::I64.size_bytes(), 8);
        assert_eq!(DType::F64.size_bytes(), 8);
        assert_eq!(DType::U8.size_bytes(), 1);
        assert_eq!(DType::Bool.size_bytes(), 1);
    }

    #[test]
    fn test_arange_reshape() {
        let arr = NdArray::arange_i64(20).reshape(&[4, 5]).unwrap();
        assert_eq!(arr.shape(), &[4, 5]);
        assert_eq!(arr.element_count(), 20);
        assert_eq!(arr.nbytes(), 160);
        let values = arr.as_i64().unwrap();
        assert_eq!(values[0], 0);
        assert_eq!(values[19], 19);
    }

    #[test]
    fn test_bad_reshape() {
        let arr = NdArray::arange_i64(20);
        assert!(arr.reshape(&[3, 5]).is_err());
    }

    #[test]
    fn test_from_parts_length_check() {
        let result = NdArray::from_parts(DType::I64, vec![2, 2], vec![0u8; 7]);
        assert!(result.is_err());
    }

    #[test]
    fn test_f64_roundtrip() {
        let arr = NdArray::from_f64(&[3], &[1.5, -2.0, 0.25]).unwrap();
        assert_eq!(arr.as_f64().unwrap(), vec![1.5, -2.0, 0.25]);
        assert!(arr.as_i64().is_err());
    }

    #[test]
    fn test_zeros() {
        let arr = NdArray::zeros(DType::U8, &[10, 10]);
        assert_eq!(arr.nbytes(), 100);
        assert!(arr.data().iter().all(|b| *b == 0));
    }
}
