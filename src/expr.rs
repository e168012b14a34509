//! Expression nodes for the tensor-computation DAG.
//!
//! Nodes are shared and immutable: constructors return fresh `Arc`-wrapped
//! nodes that only ever reference already-built children, so the graph is
//! acyclic by construction. The one staged piece is [`ContractionBuilder`],
//! whose fields become immutable once `build` succeeds.

use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::error::{Error, Result};
use crate::poly::PolyRef;
use crate::shape::TensorShape;

/// A shared expression node.
pub type ExprRef = Arc<Expr>;

/// How multiple iteration-space points writing the same output element
/// combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggOp {
    None,
    Sum,
    Max,
    Min,
    Prod,
    /// At most one writer per output element; verified downstream.
    Assign,
}

impl fmt::Display for AggOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            AggOp::None => "none",
            AggOp::Sum => "sum",
            AggOp::Max => "max",
            AggOp::Min => "min",
            AggOp::Prod => "prod",
            AggOp::Assign => "assign",
        };
        write!(f, "{name}")
    }
}

/// How multiple input reads at one iteration-space point combine before
/// aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComboOp {
    None,
    Multiply,
    Add,
    /// Equality test producing a selector.
    Eq,
    /// Ternary select; consumes three combination operands downstream.
    Cond,
}

impl ComboOp {
    fn separator(&self) -> &'static str {
        match self {
            ComboOp::None => ", ",
            ComboOp::Multiply => " * ",
            ComboOp::Add => " + ",
            ComboOp::Eq => " == ",
            ComboOp::Cond => " ? ",
        }
    }
}

impl fmt::Display for ComboOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ComboOp::None => "none",
            ComboOp::Multiply => "multiply",
            ComboOp::Add => "add",
            ComboOp::Eq => "eq",
            ComboOp::Cond => "cond",
        };
        write!(f, "{name}")
    }
}

/// A tensor access pattern: either a read through an existing tensor or the
/// output slot of a contraction.
///
/// With a `reference`, the spec denotes a read: one polynomial index per
/// dimension of the referenced tensor. Without one, it denotes the
/// contraction's output, and `output_sizes` gives the eventual dimension
/// sizes (one per index).
#[derive(Debug, Clone, PartialEq)]
pub struct TensorSpec {
    pub reference: Option<ExprRef>,
    pub index: Vec<PolyRef>,
    pub output_sizes: Vec<u64>,
}

impl TensorSpec {
    pub fn is_output(&self) -> bool {
        self.reference.is_none()
    }
}

/// An iteration-space constraint: `0 <= poly < bound`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub poly: PolyRef,
    pub bound: u64,
}

/// A contraction: aggregates combined reads from input tensor specs into an
/// output tensor spec over the iteration space spanned by the polynomial
/// indices.
///
/// `output` and every element of `inputs` are guaranteed to be
/// [`Expr::TensorSpec`] nodes; [`ContractionBuilder::build`] refuses
/// anything else.
#[derive(Debug, Clone, PartialEq)]
pub struct Contraction {
    pub agg_op: AggOp,
    pub combo_op: ComboOp,
    pub output: ExprRef,
    pub inputs: Vec<ExprRef>,
    pub constraints: Vec<Constraint>,
    /// Disables downstream index-expression simplification around strided
    /// access. Pass-through; not validated here.
    pub no_defract: bool,
    /// Fill value for output elements the iteration space never writes.
    pub use_default: Option<ExprRef>,
}

/// One node of the tensor-computation DAG.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A named, shaped input. Names need not be unique.
    Param { shape: TensorShape, name: String },
    IntConst(i64),
    FloatConst(f64),
    /// Function application. Arity and operand types are not validated
    /// here; shape inference resolves the name against the built-in
    /// registry.
    Call { func: String, args: Vec<ExprRef> },
    TensorSpec(TensorSpec),
    Contraction(Contraction),
}

impl Expr {
    /// A named parameter with a known shape.
    pub fn param(shape: TensorShape, name: impl Into<String>) -> ExprRef {
        Arc::new(Expr::Param {
            shape,
            name: name.into(),
        })
    }

    /// An integer literal.
    pub fn int(value: i64) -> ExprRef {
        Arc::new(Expr::IntConst(value))
    }

    /// A floating-point literal.
    pub fn float(value: f64) -> ExprRef {
        Arc::new(Expr::FloatConst(value))
    }

    /// A call to a named function over already-built arguments.
    pub fn call(func: impl Into<String>, args: Vec<ExprRef>) -> ExprRef {
        Arc::new(Expr::Call {
            func: func.into(),
            args,
        })
    }

    /// A tensor spec node.
    ///
    /// With a `reference` the node is a read spec and `output_sizes` is
    /// ignored. Without one it is an output spec; `output_sizes`, when
    /// supplied, must pair one-to-one with `index` (supplying them later is
    /// not possible, but omitting them entirely is tolerated until shape
    /// inference, which then fails).
    pub fn tensor_spec(
        reference: Option<ExprRef>,
        index: Vec<PolyRef>,
        output_sizes: Option<Vec<u64>>,
    ) -> Result<ExprRef> {
        let output_sizes = match (&reference, output_sizes) {
            (Some(_), _) | (None, None) => Vec::new(),
            (None, Some(sizes)) => {
                if sizes.len() != index.len() {
                    return Err(Error::OutputSizesMismatch {
                        sizes: sizes.len(),
                        indices: index.len(),
                    });
                }
                sizes
            }
        };
        Ok(Arc::new(Expr::TensorSpec(TensorSpec {
            reference,
            index,
            output_sizes,
        })))
    }

    /// The tensor-spec payload, if this node is one.
    pub fn as_tensor_spec(&self) -> Option<&TensorSpec> {
        match self {
            Expr::TensorSpec(spec) => Some(spec),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Expr::Param { .. } => "param",
            Expr::IntConst(_) => "int-const",
            Expr::FloatConst(_) => "float-const",
            Expr::Call { .. } => "call",
            Expr::TensorSpec(_) => "tensor-spec",
            Expr::Contraction(_) => "contraction",
        }
    }
}

impl fmt::Display for Expr {
    /// Deterministic structural text form, e.g.
    /// `out[i, j]:[3, 4] = sum(x[i, k] * y[k, j])`.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Param { name, .. } => write!(f, "{name}"),
            Expr::IntConst(value) => write!(f, "{value}"),
            Expr::FloatConst(value) => write!(f, "{value:?}"),
            Expr::Call { func, args } => {
                write!(f, "{func}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Expr::TensorSpec(spec) => {
                if let Some(reference) = &spec.reference {
                    write!(f, "{reference}[")?;
                } else {
                    write!(f, "out[")?;
                }
                for (i, idx) in spec.index.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{idx}")?;
                }
                write!(f, "]")?;
                if spec.is_output() && !spec.output_sizes.is_empty() {
                    write!(f, ":[")?;
                    for (i, size) in spec.output_sizes.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{size}")?;
                    }
                    write!(f, "]")?;
                }
                Ok(())
            }
            Expr::Contraction(c) => {
                write!(f, "{} = {}(", c.output, c.agg_op)?;
                for (i, input) in c.inputs.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", c.combo_op.separator())?;
                    }
                    write!(f, "{input}")?;
                }
                write!(f, ")")?;
                for constraint in &c.constraints {
                    write!(f, ", {} < {}", constraint.poly, constraint.bound)?;
                }
                if c.no_defract {
                    write!(f, " no_defract")?;
                }
                if let Some(default) = &c.use_default {
                    write!(f, " default {default}")?;
                }
                Ok(())
            }
        }
    }
}

/// Assembles a [`Contraction`] node, validating that the output and every
/// input are tensor specs before anything is published.
///
/// Assembly is atomic: on failure no node is produced and nothing is
/// retained.
pub struct ContractionBuilder {
    agg_op: AggOp,
    combo_op: ComboOp,
    output: ExprRef,
    inputs: Vec<ExprRef>,
    constraints: Vec<Constraint>,
    no_defract: bool,
    use_default: Option<ExprRef>,
}

impl ContractionBuilder {
    /// Starts a contraction writing into `output` under the given operators.
    pub fn new(agg_op: AggOp, combo_op: ComboOp, output: ExprRef) -> Self {
        Self {
            agg_op,
            combo_op,
            output,
            inputs: Vec::new(),
            constraints: Vec::new(),
            no_defract: false,
            use_default: None,
        }
    }

    /// Appends an input spec. Input order is significant: it determines
    /// which tensor each combination operand binds to.
    pub fn input(mut self, input: ExprRef) -> Self {
        self.inputs.push(input);
        self
    }

    /// Attaches an iteration-space constraint `0 <= poly < bound`.
    pub fn constraint(mut self, poly: PolyRef, bound: u64) -> Self {
        self.constraints.push(Constraint { poly, bound });
        self
    }

    /// Disables downstream defractionalization for this contraction.
    pub fn no_defract(mut self, no_defract: bool) -> Self {
        self.no_defract = no_defract;
        self
    }

    /// Fill value for output elements never written by the iteration space.
    pub fn use_default(mut self, default: ExprRef) -> Self {
        self.use_default = Some(default);
        self
    }

    /// Validates and publishes the contraction node.
    pub fn build(self) -> Result<ExprRef> {
        if self.output.as_tensor_spec().is_none() {
            return Err(Error::NotTensorSpec {
                context: "contraction output",
                found: self.output.kind(),
            });
        }
        for input in &self.inputs {
            if input.as_tensor_spec().is_none() {
                return Err(Error::NotTensorSpec {
                    context: "contraction input",
                    found: input.kind(),
                });
            }
        }
        let node = Expr::Contraction(Contraction {
            agg_op: self.agg_op,
            combo_op: self.combo_op,
            output: self.output,
            inputs: self.inputs,
            constraints: self.constraints,
            no_defract: self.no_defract,
            use_default: self.use_default,
        });
        debug!("assembled contraction: {node}");
        Ok(Arc::new(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DataType;
    use crate::poly::PolyExpr;

    fn param_2x3() -> ExprRef {
        Expr::param(TensorShape::dense(DataType::F32, &[2, 3]), "x")
    }

    fn read_spec(reference: ExprRef) -> ExprRef {
        let i = PolyExpr::index(0, "i");
        let j = PolyExpr::index(1, "j");
        Expr::tensor_spec(Some(reference), vec![i, j], None).unwrap()
    }

    fn output_spec(sizes: &[u64]) -> ExprRef {
        let index: Vec<_> = (0..sizes.len())
            .map(|d| PolyExpr::index(d, format!("o{d}")))
            .collect();
        Expr::tensor_spec(None, index, Some(sizes.to_vec())).unwrap()
    }

    #[test]
    fn test_param_display() {
        assert_eq!(param_2x3().to_string(), "x");
    }

    #[test]
    fn test_literal_display() {
        assert_eq!(Expr::int(-4).to_string(), "-4");
        assert_eq!(Expr::float(2.5).to_string(), "2.5");
        assert_eq!(Expr::float(3.0).to_string(), "3.0");
    }

    #[test]
    fn test_call_display_preserves_argument_order() {
        let call = Expr::call("add", vec![Expr::int(1), Expr::float(2.0)]);
        assert_eq!(call.to_string(), "add(1, 2.0)");
    }

    #[test]
    fn test_tensor_spec_display() {
        let spec = read_spec(param_2x3());
        assert_eq!(spec.to_string(), "x[i, j]");

        let out = output_spec(&[4, 8]);
        assert_eq!(out.to_string(), "out[o0, o1]:[4, 8]");
    }

    #[test]
    fn test_output_sizes_must_match_index_count() {
        let i = PolyExpr::index(0, "i");
        let err = Expr::tensor_spec(None, vec![i], Some(vec![4, 8])).unwrap_err();
        assert_eq!(
            err,
            Error::OutputSizesMismatch {
                sizes: 2,
                indices: 1,
            }
        );
    }

    #[test]
    fn test_output_sizes_ignored_for_read_spec() {
        let i = PolyExpr::index(0, "i");
        let j = PolyExpr::index(1, "j");
        let spec =
            Expr::tensor_spec(Some(param_2x3()), vec![i, j], Some(vec![9])).unwrap();
        let payload = spec.as_tensor_spec().unwrap();
        assert!(payload.output_sizes.is_empty());
    }

    #[test]
    fn test_contraction_rejects_non_spec_output() {
        for bad in [
            param_2x3(),
            Expr::int(1),
            Expr::call("add", vec![Expr::int(1), Expr::int(2)]),
        ] {
            let kind = bad.kind();
            let err = ContractionBuilder::new(AggOp::Sum, ComboOp::Multiply, bad)
                .build()
                .unwrap_err();
            assert_eq!(
                err,
                Error::NotTensorSpec {
                    context: "contraction output",
                    found: kind,
                }
            );
        }
    }

    #[test]
    fn test_contraction_rejects_non_spec_input() {
        let err = ContractionBuilder::new(AggOp::Sum, ComboOp::Multiply, output_spec(&[2]))
            .input(read_spec(param_2x3()))
            .input(Expr::float(1.0))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            Error::NotTensorSpec {
                context: "contraction input",
                found: "float-const",
            }
        );
    }

    #[test]
    fn test_contraction_preserves_input_order() {
        let a = Expr::param(TensorShape::dense(DataType::F32, &[2, 3]), "a");
        let b = Expr::param(TensorShape::dense(DataType::F32, &[2, 3]), "b");
        let spec_a = read_spec(a);
        let spec_b = read_spec(b);
        let node = ContractionBuilder::new(AggOp::Sum, ComboOp::Multiply, output_spec(&[2, 3]))
            .input(spec_a.clone())
            .input(spec_b.clone())
            .build()
            .unwrap();
        let Expr::Contraction(c) = node.as_ref() else {
            panic!("expected contraction");
        };
        assert_eq!(c.inputs, vec![spec_a, spec_b]);
        assert_eq!(
            node.to_string(),
            "out[o0, o1]:[2, 3] = sum(a[i, j] * b[i, j])"
        );
    }

    #[test]
    fn test_contraction_passthrough_fields() {
        let k = PolyExpr::index(9, "k");
        let node = ContractionBuilder::new(AggOp::Max, ComboOp::None, output_spec(&[4]))
            .constraint(k.clone(), 10)
            .no_defract(true)
            .use_default(Expr::float(0.0))
            .build()
            .unwrap();
        let Expr::Contraction(c) = node.as_ref() else {
            panic!("expected contraction");
        };
        assert_eq!(c.constraints, vec![Constraint { poly: k, bound: 10 }]);
        assert!(c.no_defract);
        assert_eq!(c.use_default, Some(Expr::float(0.0)));
        assert_eq!(
            node.to_string(),
            "out[o0]:[4] = max(), k < 10 no_defract default 0.0"
        );
    }

    #[test]
    fn test_nodes_are_shared() {
        let x = param_2x3();
        let a = Expr::call("exp", vec![x.clone()]);
        let b = Expr::call("sqrt", vec![x.clone()]);
        let Expr::Call { args: args_a, .. } = a.as_ref() else {
            unreachable!()
        };
        let Expr::Call { args: args_b, .. } = b.as_ref() else {
            unreachable!()
        };
        assert!(Arc::ptr_eq(&args_a[0], &args_b[0]));
        assert!(Arc::ptr_eq(&args_a[0], &x));
    }

    #[test]
    fn test_display_is_deterministic() {
        let build = || {
            let x = param_2x3();
            let spec = read_spec(x);
            ContractionBuilder::new(AggOp::Sum, ComboOp::None, output_spec(&[2, 3]))
                .input(spec)
                .build()
                .unwrap()
                .to_string()
        };
        assert_eq!(build(), build());
    }
}
