//! Shape inference over expression DAGs.
//!
//! Walks a fully built expression pre-order (children in operand order) and
//! derives the resulting [`TensorShape`], or reports the first structural
//! error encountered. No partial shape is ever returned.
//!
//! Calls are resolved against a process-wide, read-only registry of built-in
//! shape rules, initialized on first use.

use std::sync::OnceLock;

use log::{debug, trace};
use rustc_hash::FxHashMap;

use crate::dtype::DataType;
use crate::error::{Error, Result};
use crate::expr::{Contraction, Expr, ExprRef, TensorSpec};
use crate::shape::TensorShape;

/// A shape rule for one built-in function: operand shapes in, result shape
/// out. The function name is passed through for error messages.
type ShapeRule = fn(&str, &[TensorShape]) -> Result<TensorShape>;

/// Elementwise arithmetic: any positive arity, broadcast all operands,
/// promote element types.
const ELEMENTWISE: &[&str] = &[
    "add", "sub", "mul", "div", "neg", "abs", "exp", "log", "sqrt", "sin", "cos", "tan", "tanh",
    "pow", "max", "min", "recip", "floor", "ceil", "round",
];

/// Comparisons: broadcast like elementwise but always produce booleans.
const COMPARISONS: &[&str] = &["cmp_eq", "cmp_ne", "cmp_lt", "cmp_gt", "cmp_le", "cmp_ge"];

fn registry() -> &'static FxHashMap<&'static str, ShapeRule> {
    static REGISTRY: OnceLock<FxHashMap<&'static str, ShapeRule>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut rules: FxHashMap<&'static str, ShapeRule> = FxHashMap::default();
        for name in ELEMENTWISE {
            rules.insert(name, elementwise_rule);
        }
        for name in COMPARISONS {
            rules.insert(name, comparison_rule);
        }
        rules.insert("cond", cond_rule);
        rules
    })
}

/// Infers the shape of a fully built expression.
pub fn evaluate_shape(expr: &ExprRef) -> Result<TensorShape> {
    let shape = eval(expr)?;
    debug!("inferred shape of {expr}: {shape}");
    Ok(shape)
}

fn eval(expr: &Expr) -> Result<TensorShape> {
    trace!("inferring shape of {} node", expr.kind());
    match expr {
        Expr::Param { shape, .. } => Ok(shape.clone()),
        Expr::IntConst(_) => Ok(TensorShape::new(DataType::I64)),
        Expr::FloatConst(_) => Ok(TensorShape::new(DataType::F64)),
        Expr::Call { func, args } => {
            let mut shapes = Vec::with_capacity(args.len());
            for arg in args {
                shapes.push(eval(arg)?);
            }
            let rule = registry()
                .get(func.as_str())
                .ok_or_else(|| Error::UnknownFunction(func.clone()))?;
            rule(func, &shapes)
        }
        Expr::TensorSpec(spec) => match &spec.reference {
            Some(reference) => read_spec_shape(spec, reference),
            // A bare output spec carries no element type of its own;
            // contractions supply one from their inputs.
            None => output_spec_shape(spec, DataType::F32),
        },
        Expr::Contraction(c) => contraction_shape(c),
    }
}

/// A read spec has the referenced tensor's shape, once the index list is
/// known to cover every dimension.
fn read_spec_shape(spec: &TensorSpec, reference: &ExprRef) -> Result<TensorShape> {
    let shape = eval(reference)?;
    if spec.index.len() != shape.rank() {
        return Err(Error::RankMismatch {
            context: "tensor spec index",
            expected: shape.rank(),
            found: spec.index.len(),
        });
    }
    Ok(shape)
}

/// An output spec describes a fresh tensor: declared sizes with canonical
/// row-major strides, one dimension per polynomial index.
fn output_spec_shape(spec: &TensorSpec, elem_type: DataType) -> Result<TensorShape> {
    if spec.output_sizes.is_empty() && !spec.index.is_empty() {
        return Err(Error::MissingOutputSizes);
    }
    if spec.output_sizes.len() != spec.index.len() {
        return Err(Error::OutputSizesMismatch {
            sizes: spec.output_sizes.len(),
            indices: spec.index.len(),
        });
    }
    Ok(TensorShape::dense(elem_type, &spec.output_sizes))
}

fn contraction_shape(c: &Contraction) -> Result<TensorShape> {
    let mut elem_type: Option<DataType> = None;
    for input in &c.inputs {
        let spec = input.as_tensor_spec().ok_or(Error::NotTensorSpec {
            context: "contraction input",
            found: input.kind(),
        })?;
        let reference = spec.reference.as_ref().ok_or(Error::MissingReference)?;
        let shape = read_spec_shape(spec, reference)?;
        elem_type = Some(match elem_type {
            Some(t) => t.promote(shape.elem_type()),
            None => shape.elem_type(),
        });
    }
    // With no inputs the element type falls back to the default value's
    // type, then f32.
    let elem_type = match elem_type {
        Some(t) => t,
        None => match &c.use_default {
            Some(default) => eval(default)?.elem_type(),
            None => DataType::F32,
        },
    };
    let output = c.output.as_tensor_spec().ok_or(Error::NotTensorSpec {
        context: "contraction output",
        found: c.output.kind(),
    })?;
    output_spec_shape(output, elem_type)
}

/// Broadcasts two size lists numpy-style: trailing dimensions align, equal
/// sizes or a 1 combine, anything else is an error.
fn broadcast_sizes(func: &str, lhs: &[u64], rhs: &[u64]) -> Result<Vec<u64>> {
    let rank = lhs.len().max(rhs.len());
    let mut out = vec![0u64; rank];
    for i in 0..rank {
        let l = if i < rank - lhs.len() { 1 } else { lhs[i - (rank - lhs.len())] };
        let r = if i < rank - rhs.len() { 1 } else { rhs[i - (rank - rhs.len())] };
        out[i] = match (l, r) {
            (l, r) if l == r => l,
            (1, r) => r,
            (l, 1) => l,
            (l, r) => {
                return Err(Error::BroadcastMismatch {
                    func: func.to_string(),
                    left: l,
                    right: r,
                })
            }
        };
    }
    Ok(out)
}

fn elementwise_rule(func: &str, shapes: &[TensorShape]) -> Result<TensorShape> {
    let Some(first) = shapes.first() else {
        return Err(Error::CallArity {
            func: func.to_string(),
            expected: "at least 1",
            found: 0,
        });
    };
    let mut sizes = first.sizes();
    let mut elem_type = first.elem_type();
    for shape in &shapes[1..] {
        sizes = broadcast_sizes(func, &sizes, &shape.sizes())?;
        elem_type = elem_type.promote(shape.elem_type());
    }
    Ok(TensorShape::dense(elem_type, &sizes))
}

fn comparison_rule(func: &str, shapes: &[TensorShape]) -> Result<TensorShape> {
    let broadcast = elementwise_rule(func, shapes)?;
    Ok(TensorShape::dense(DataType::Bool, &broadcast.sizes()))
}

fn cond_rule(func: &str, shapes: &[TensorShape]) -> Result<TensorShape> {
    if shapes.len() != 3 {
        return Err(Error::CallArity {
            func: func.to_string(),
            expected: "exactly 3",
            found: shapes.len(),
        });
    }
    let mut sizes = shapes[0].sizes();
    for shape in &shapes[1..] {
        sizes = broadcast_sizes(func, &sizes, &shape.sizes())?;
    }
    let elem_type = shapes[1].elem_type().promote(shapes[2].elem_type());
    Ok(TensorShape::dense(elem_type, &sizes))
}
