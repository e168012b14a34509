//! Error types for IR construction and shape inference.

use thiserror::Error;

use crate::poly::PolyOp;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for all fallible IR operations.
///
/// Every failure carries enough context to be forwarded verbatim across a
/// handle-based boundary as a (code, message) pair; see [`Error::code`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// A node was used where a tensor-spec variant is required.
    #[error("{context} must be a tensor spec, got {found}")]
    NotTensorSpec {
        context: &'static str,
        found: &'static str,
    },

    /// Dimension index past the end of a shape.
    #[error("dimension {dim} is out of range for rank {rank}")]
    DimOutOfRange { dim: usize, rank: usize },

    /// A call named a function the inference registry does not know.
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// An index list whose length disagrees with the referenced tensor.
    #[error("{context}: expected rank {expected}, got {found}")]
    RankMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    /// A contraction input spec without a tensor to read from.
    #[error("contraction input spec must reference a tensor")]
    MissingReference,

    /// An output spec reached shape inference without output sizes.
    #[error("output spec requires output sizes")]
    MissingOutputSizes,

    /// Output sizes that do not pair up one-to-one with the index list.
    #[error("{sizes} output sizes do not match {indices} indices")]
    OutputSizesMismatch { sizes: usize, indices: usize },

    /// Operand shapes that cannot be broadcast together.
    #[error("{func}: cannot broadcast size {left} against size {right}")]
    BroadcastMismatch { func: String, left: u64, right: u64 },

    /// A call with the wrong number of arguments for a known function.
    #[error("{func} expects {expected} arguments, got {found}")]
    CallArity {
        func: String,
        expected: &'static str,
        found: usize,
    },

    /// A polynomial operator applied to the wrong number of operands.
    #[error("polynomial {op:?} expects {expected} operands, got {found}")]
    PolyArity {
        op: PolyOp,
        expected: &'static str,
        found: usize,
    },
}

impl Error {
    /// Stable numeric code for this error kind, for boundary layers that
    /// report errors as (code, message) pairs. Zero is reserved for success.
    pub fn code(&self) -> u32 {
        match self {
            Error::NotTensorSpec { .. } => 1,
            Error::DimOutOfRange { .. } => 2,
            Error::UnknownFunction(_) => 3,
            Error::RankMismatch { .. } => 4,
            Error::MissingReference => 5,
            Error::MissingOutputSizes => 6,
            Error::OutputSizesMismatch { .. } => 7,
            Error::BroadcastMismatch { .. } => 8,
            Error::CallArity { .. } => 9,
            Error::PolyArity { .. } => 10,
        }
    }
}
