//! Tessera: frontend IR for a tensor-contraction DSL
//!
//! Tessera builds and validates the intermediate representation consumed by
//! a scheduling/codegen backend: a shared, immutable DAG of expression
//! nodes, a polynomial algebra for index arithmetic inside contractions,
//! and shape inference over finished expressions.
//!
//! # Architecture
//!
//! - **dtype**: scalar element types and promotion rules
//! - **shape**: tensor shapes as (size, stride) dimension lists
//! - **poly**: polynomial index expressions over named index variables
//! - **expr**: expression nodes and contraction assembly
//! - **infer**: shape inference and the built-in function registry
//! - **error**: the crate-wide error type
//!
//! # Example
//!
//! ```
//! use tessera::prelude::*;
//!
//! let x = Expr::param(TensorShape::dense(DataType::F32, &[3, 4]), "x");
//! let i = PolyExpr::index(0, "i");
//! let j = PolyExpr::index(1, "j");
//! let read = Expr::tensor_spec(Some(x), vec![i.clone(), j.clone()], None).unwrap();
//! let out = Expr::tensor_spec(None, vec![i, j], Some(vec![3, 4])).unwrap();
//! let sum = ContractionBuilder::new(AggOp::Sum, ComboOp::None, out)
//!     .input(read)
//!     .build()
//!     .unwrap();
//! assert_eq!(evaluate_shape(&sum).unwrap().to_string(), "f32[3:4, 4:1]");
//! ```

pub mod dtype;
pub mod error;
pub mod expr;
pub mod infer;
pub mod poly;
pub mod shape;

pub use dtype::DataType;
pub use error::{Error, Result};
pub use expr::{AggOp, ComboOp, Constraint, Contraction, ContractionBuilder, Expr, ExprRef, TensorSpec};
pub use infer::evaluate_shape;
pub use poly::{PolyArith, PolyExpr, PolyOp, PolyRef};
pub use shape::{Dimension, TensorShape};

/// Prelude module with commonly used types and functions
pub mod prelude {
    pub use crate::dtype::DataType;
    pub use crate::error::{Error, Result};
    pub use crate::expr::{
        AggOp, ComboOp, ContractionBuilder, Expr, ExprRef, TensorSpec,
    };
    pub use crate::infer::evaluate_shape;
    pub use crate::poly::{PolyArith, PolyExpr, PolyOp, PolyRef};
    pub use crate::shape::{Dimension, TensorShape};
}
