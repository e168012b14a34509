//! Tensor shapes: an element type plus ordered (size, stride) dimensions.

use std::fmt;

use crate::dtype::DataType;
use crate::error::{Error, Result};

/// One dimension of a tensor layout.
///
/// Strides are in elements, not bytes, and may be negative to describe
/// reversed iteration over an underlying buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimension {
    pub size: u64,
    pub stride: i64,
}

/// The shape of a tensor: element type and dimensions in declaration order.
///
/// Shapes are built by appending dimensions one at a time; there is no
/// removal operation. Rank is the number of dimensions appended so far.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TensorShape {
    elem_type: DataType,
    dims: Vec<Dimension>,
}

impl TensorShape {
    /// An empty (rank-0, scalar) shape of the given element type.
    pub fn new(elem_type: DataType) -> Self {
        Self {
            elem_type,
            dims: Vec::new(),
        }
    }

    /// A dense row-major shape: the last dimension has stride 1, and each
    /// earlier stride is the product of all later sizes.
    pub fn dense(elem_type: DataType, sizes: &[u64]) -> Self {
        let mut strides = vec![0i64; sizes.len()];
        let mut stride: i64 = 1;
        for (i, &size) in sizes.iter().enumerate().rev() {
            strides[i] = stride;
            stride *= size as i64;
        }
        let mut shape = Self::new(elem_type);
        for (&size, &stride) in sizes.iter().zip(&strides) {
            shape.add_dim(size, stride);
        }
        shape
    }

    /// Append a dimension. Order-preserving; dimensions are never removed.
    pub fn add_dim(&mut self, size: u64, stride: i64) {
        self.dims.push(Dimension { size, stride });
    }

    pub fn elem_type(&self) -> DataType {
        self.elem_type
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    pub fn dim_size(&self, dim: usize) -> Result<u64> {
        self.dim(dim).map(|d| d.size)
    }

    pub fn dim_stride(&self, dim: usize) -> Result<i64> {
        self.dim(dim).map(|d| d.stride)
    }

    fn dim(&self, dim: usize) -> Result<Dimension> {
        self.dims.get(dim).copied().ok_or(Error::DimOutOfRange {
            dim,
            rank: self.dims.len(),
        })
    }

    /// Sizes only, in declaration order.
    pub fn sizes(&self) -> Vec<u64> {
        self.dims.iter().map(|d| d.size).collect()
    }
}

impl fmt::Display for TensorShape {
    /// Canonical text form, e.g. `f32[3:4, 4:1]` for a dense 3x4 matrix.
    /// Stable for identical shapes, so it doubles as an equality witness in
    /// diagnostics and tests.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}[", self.elem_type)?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", d.size, d.stride)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_query() {
        let mut shape = TensorShape::new(DataType::F32);
        shape.add_dim(3, 4);
        shape.add_dim(4, 1);
        assert_eq!(shape.rank(), 2);
        assert_eq!(shape.dim_size(0).unwrap(), 3);
        assert_eq!(shape.dim_stride(0).unwrap(), 4);
        assert_eq!(shape.dim_size(1).unwrap(), 4);
        assert_eq!(shape.dim_stride(1).unwrap(), 1);
    }

    #[test]
    fn test_out_of_range_query() {
        let mut shape = TensorShape::new(DataType::F32);
        shape.add_dim(3, 1);
        assert_eq!(
            shape.dim_size(1),
            Err(Error::DimOutOfRange { dim: 1, rank: 1 })
        );
        assert_eq!(
            shape.dim_stride(7),
            Err(Error::DimOutOfRange { dim: 7, rank: 1 })
        );
    }

    #[test]
    fn test_dense_strides_are_row_major() {
        let shape = TensorShape::dense(DataType::F32, &[2, 3, 4]);
        assert_eq!(shape.dim_stride(0).unwrap(), 12);
        assert_eq!(shape.dim_stride(1).unwrap(), 4);
        assert_eq!(shape.dim_stride(2).unwrap(), 1);
    }

    #[test]
    fn test_negative_strides_allowed() {
        let mut shape = TensorShape::new(DataType::I32);
        shape.add_dim(5, -1);
        assert_eq!(shape.dim_stride(0).unwrap(), -1);
    }

    #[test]
    fn test_display_canonical() {
        let shape = TensorShape::dense(DataType::F32, &[3, 4]);
        assert_eq!(shape.to_string(), "f32[3:4, 4:1]");
        assert_eq!(TensorShape::new(DataType::F64).to_string(), "f64[]");
        // same construction, same text
        assert_eq!(
            TensorShape::dense(DataType::F32, &[3, 4]).to_string(),
            shape.to_string()
        );
    }
}
