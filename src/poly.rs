//! Polynomial index expressions.
//!
//! A small, pure expression language over named index variables and integer
//! literals, used to describe how tensor elements are addressed across a
//! contraction's iteration space. Nothing here evaluates to a concrete
//! integer; indices are free variables bound later by the iteration space.
//! This module only builds trees, enforces operator arity, and prints a
//! deterministic text form.

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

/// A shared polynomial expression node.
pub type PolyRef = Arc<PolyExpr>;

/// Arithmetic operators over index expressions.
///
/// `Neg` takes exactly one operand; every other operator takes two or more,
/// applied left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolyOp {
    Neg,
    Add,
    Sub,
    Mul,
    Div,
}

impl PolyOp {
    fn symbol(&self) -> &'static str {
        match self {
            PolyOp::Neg | PolyOp::Sub => "-",
            PolyOp::Add => "+",
            PolyOp::Mul => "*",
            PolyOp::Div => "/",
        }
    }
}

/// A node in a polynomial index expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PolyExpr {
    /// A named index variable. `id` disambiguates same-named indices from
    /// different scopes.
    Index { id: usize, name: String },
    /// An integer literal.
    Literal(i64),
    /// An operator applied to shared operands, in input order.
    Op { op: PolyOp, args: Vec<PolyRef> },
}

impl PolyExpr {
    /// A named index variable with an opaque identity key.
    pub fn index(id: usize, name: impl Into<String>) -> PolyRef {
        Arc::new(PolyExpr::Index {
            id,
            name: name.into(),
        })
    }

    /// An integer literal.
    pub fn literal(value: i64) -> PolyRef {
        Arc::new(PolyExpr::Literal(value))
    }

    /// An operator node over already-built operands.
    ///
    /// Fails with [`Error::PolyArity`] if the operand count violates the
    /// operator's arity; no node is produced in that case.
    pub fn op(op: PolyOp, args: Vec<PolyRef>) -> Result<PolyRef> {
        match op {
            PolyOp::Neg if args.len() != 1 => Err(Error::PolyArity {
                op,
                expected: "exactly 1",
                found: args.len(),
            }),
            PolyOp::Neg => Ok(Arc::new(PolyExpr::Op { op, args })),
            _ if args.len() < 2 => Err(Error::PolyArity {
                op,
                expected: "at least 2",
                found: args.len(),
            }),
            _ => Ok(Arc::new(PolyExpr::Op { op, args })),
        }
    }
}

impl fmt::Display for PolyExpr {
    /// Deterministic text form preserving operand order, e.g. `(i + j + 1)`.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PolyExpr::Index { name, .. } => write!(f, "{name}"),
            PolyExpr::Literal(value) => write!(f, "{value}"),
            PolyExpr::Op {
                op: PolyOp::Neg,
                args,
            } => write!(f, "-{}", args[0]),
            PolyExpr::Op { op, args } => {
                write!(f, "(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", op.symbol())?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Arithmetic over shared polynomial nodes.
///
/// `std::ops` cannot be implemented for `Arc<PolyExpr>` directly, so the
/// binary forms live on this extension trait instead. The two-operand
/// constructors cannot violate the arity rules and therefore never fail.
pub trait PolyArith {
    fn neg(self) -> PolyRef;
    fn add(self, rhs: PolyRef) -> PolyRef;
    fn sub(self, rhs: PolyRef) -> PolyRef;
    fn mul(self, rhs: PolyRef) -> PolyRef;
    fn div(self, rhs: PolyRef) -> PolyRef;
}

fn binary(op: PolyOp, lhs: PolyRef, rhs: PolyRef) -> PolyRef {
    Arc::new(PolyExpr::Op {
        op,
        args: vec![lhs, rhs],
    })
}

impl PolyArith for PolyRef {
    fn neg(self) -> PolyRef {
        Arc::new(PolyExpr::Op {
            op: PolyOp::Neg,
            args: vec![self],
        })
    }

    fn add(self, rhs: PolyRef) -> PolyRef {
        binary(PolyOp::Add, self, rhs)
    }

    fn sub(self, rhs: PolyRef) -> PolyRef {
        binary(PolyOp::Sub, self, rhs)
    }

    fn mul(self, rhs: PolyRef) -> PolyRef {
        binary(PolyOp::Mul, self, rhs)
    }

    fn div(self, rhs: PolyRef) -> PolyRef {
        binary(PolyOp::Div, self, rhs)
    }
}
