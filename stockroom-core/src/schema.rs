//! Arrayset schemas
//!
//! A schema is derived from a prototype array at arrayset creation time and
//! constrains every sample added afterwards.

use crate::array::{DType, NdArray};
use serde::{Deserialize, Serialize};

/// Fixed dtype and shape every sample in an arrayset must match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArraySchema {
    pub dtype: DType,
    pub shape: Vec<usize>,
}

impl ArraySchema {
    /// Derive a schema from a prototype array
    pub fn from_prototype(prototype: &NdArray) -> Self {
        Self {
            dtype: prototype.dtype(),
            shape: prototype.shape().to_vec(),
        }
    }

    /// Whether an array conforms to this schema
    pub fn matches(&self, array: &NdArray) -> bool {
        array.dtype() == self.dtype && array.shape() == self.shape.as_slice()
    }

    /// Size of one conforming sample in bytes
    pub fn sample_nbytes(&self) -> usize {
        self.shape.iter().product::<usize>() * self.dtype.size_bytes()
    }
}

impl std::fmt::Display for ArraySchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{:?}", self.dtype, self.shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_from_prototype() {
        let proto = NdArray::arange_i64(20).reshape(&[4, 5]).unwrap();
        let schema = ArraySchema::from_prototype(&proto);
        assert_eq!(schema.dtype, DType::I64);
        assert_eq!(schema.shape, vec![4, 5]);
        assert_eq!(schema.sample_nbytes(), 160);
    }

    #[test]
    fn test_schema_matches() {
        let proto = NdArray::zeros(DType::F64, &[2, 3]);
        let schema = ArraySchema::from_prototype(&proto);
        assert!(schema.matches(&NdArray::zeros(DType::F64, &[2, 3])));
        assert!(!schema.matches(&NdArray::zeros(DType::F64, &[3, 2])));
        assert!(!schema.matches(&NdArray::zeros(DType::I64, &[2, 3])));
    }
}
