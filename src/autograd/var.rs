use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::activation::activation::ActivationFunction;
use crate::error::{GanError, Result};
use crate::math::tensor::Tensor;

pub type NodeId = u64;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

fn next_id() -> NodeId {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// A node in the computation graph.
///
/// Cloning a `Var` is cheap and shares the node. Values are immutable; an
/// optimizer "updates" a parameter by replacing its leaf with a new one.
#[derive(Clone)]
pub struct Var(pub(crate) Rc<Node>);

pub(crate) struct Node {
    pub(crate) id: NodeId,
    pub(crate) value: Tensor,
    pub(crate) requires_grad: bool,
    /// `None` for leaves and for results computed only from constants.
    pub(crate) op: Option<Op>,
}

/// How a node was produced. Shapes noted as `input -> output`.
pub(crate) enum Op {
    Add(Var, Var),
    Sub(Var, Var),
    Mul(Var, Var),
    Div(Var, Var),
    /// `[n, k] x [k, m] -> [n, m]`
    MatMul(Var, Var),
    Transpose(Var),
    /// `[n, m] + [1, m] -> [n, m]`
    AddBias(Var, Var),
    /// `[n, m] -> [1, m]`
    SumRows(Var),
    /// `[1, m] -> [n, m]`
    BroadcastRows(Var),
    /// `[n, m] -> [n, 1]`
    SumCols(Var),
    /// `[n, 1] -> [n, m]`
    BroadcastCols(Var),
    /// any -> `[1]`
    Sum(Var),
    /// `[1]` -> any
    Expand(Var),
    Scale(Var, f64),
    AddScalar(Var),
    Sqrt(Var),
    Reshape(Var),
    Activation(Var, ActivationFunction),
}

impl Op {
    pub(crate) fn inputs(&self) -> Vec<&Var> {
        match self {
            Op::Add(a, b) | Op::Sub(a, b) | Op::Mul(a, b) | Op::Div(a, b)
            | Op::MatMul(a, b) | Op::AddBias(a, b) => vec![a, b],
            Op::Transpose(a) | Op::SumRows(a) | Op::BroadcastRows(a) | Op::SumCols(a)
            | Op::BroadcastCols(a) | Op::Sum(a) | Op::Expand(a) | Op::Scale(a, _)
            | Op::AddScalar(a) | Op::Sqrt(a) | Op::Reshape(a) | Op::Activation(a, _) => vec![a],
        }
    }
}

impl Var {
    /// A leaf that takes no part in differentiation.
    pub fn constant(value: Tensor) -> Var {
        Var::leaf(value, false)
    }

    /// A leaf whose gradient is tracked (parameters, penalty interpolates).
    pub fn variable(value: Tensor) -> Var {
        Var::leaf(value, true)
    }

    fn leaf(value: Tensor, requires_grad: bool) -> Var {
        Var(Rc::new(Node { id: next_id(), value, requires_grad, op: None }))
    }

    fn from_op(value: Tensor, op: Op) -> Var {
        let requires_grad = op.inputs().iter().any(|v| v.requires_grad());
        let op = if requires_grad { Some(op) } else { None };
        Var(Rc::new(Node { id: next_id(), value, requires_grad, op }))
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn value(&self) -> &Tensor {
        &self.0.value
    }

    pub fn shape(&self) -> &[usize] {
        self.0.value.shape()
    }

    pub fn requires_grad(&self) -> bool {
        self.0.requires_grad
    }

    pub fn is_leaf(&self) -> bool {
        self.0.op.is_none()
    }

    pub(crate) fn op(&self) -> Option<&Op> {
        self.0.op.as_ref()
    }

    /// Stop-gradient: same values, cut from the graph.
    pub fn detach(&self) -> Var {
        Var::constant(self.0.value.clone())
    }

    pub fn to_scalar(&self) -> Result<f64> {
        self.0.value.to_scalar()
    }

    pub fn add(&self, rhs: &Var) -> Result<Var> {
        let value = self.value().zip_map(rhs.value(), "add", |a, b| a + b)?;
        Ok(Var::from_op(value, Op::Add(self.clone(), rhs.clone())))
    }

    pub fn sub(&self, rhs: &Var) -> Result<Var> {
        let value = self.value().zip_map(rhs.value(), "sub", |a, b| a - b)?;
        Ok(Var::from_op(value, Op::Sub(self.clone(), rhs.clone())))
    }

    pub fn mul(&self, rhs: &Var) -> Result<Var> {
        let value = self.value().zip_map(rhs.value(), "mul", |a, b| a * b)?;
        Ok(Var::from_op(value, Op::Mul(self.clone(), rhs.clone())))
    }

    pub fn div(&self, rhs: &Var) -> Result<Var> {
        let value = self.value().zip_map(rhs.value(), "div", |a, b| a / b)?;
        Ok(Var::from_op(value, Op::Div(self.clone(), rhs.clone())))
    }

    pub fn matmul(&self, rhs: &Var) -> Result<Var> {
        let value = self.value().matmul(rhs.value())?;
        Ok(Var::from_op(value, Op::MatMul(self.clone(), rhs.clone())))
    }

    pub fn transpose(&self) -> Result<Var> {
        let value = self.value().transpose()?;
        Ok(Var::from_op(value, Op::Transpose(self.clone())))
    }

    /// Adds a `[1, m]` row to every row of a `[n, m]` matrix.
    pub fn add_bias(&self, bias: &Var) -> Result<Var> {
        let n = self.value().batch_size();
        let value = self.value().zip_map(&bias.value().broadcast_rows(n)?, "add_bias", |a, b| a + b)?;
        Ok(Var::from_op(value, Op::AddBias(self.clone(), bias.clone())))
    }

    pub fn sum_rows(&self) -> Result<Var> {
        let value = self.value().sum_rows()?;
        Ok(Var::from_op(value, Op::SumRows(self.clone())))
    }

    pub fn broadcast_rows(&self, n: usize) -> Result<Var> {
        let value = self.value().broadcast_rows(n)?;
        Ok(Var::from_op(value, Op::BroadcastRows(self.clone())))
    }

    pub fn sum_cols(&self) -> Result<Var> {
        let value = self.value().sum_cols()?;
        Ok(Var::from_op(value, Op::SumCols(self.clone())))
    }

    pub fn broadcast_cols(&self, m: usize) -> Result<Var> {
        let value = self.value().broadcast_cols(m)?;
        Ok(Var::from_op(value, Op::BroadcastCols(self.clone())))
    }

    /// Sum of all elements, shape `[1]`.
    pub fn sum(&self) -> Result<Var> {
        let value = Tensor::scalar(self.value().sum_all());
        Ok(Var::from_op(value, Op::Sum(self.clone())))
    }

    pub fn mean(&self) -> Result<Var> {
        let n = self.value().numel();
        if n == 0 {
            return Err(GanError::Autograd("mean of an empty tensor".to_string()));
        }
        Ok(self.sum()?.scale(1.0 / n as f64))
    }

    pub fn expand(&self, shape: &[usize]) -> Result<Var> {
        let value = self.value().expand(shape)?;
        Ok(Var::from_op(value, Op::Expand(self.clone())))
    }

    pub fn scale(&self, factor: f64) -> Var {
        let value = self.value().map(|x| x * factor);
        Var::from_op(value, Op::Scale(self.clone(), factor))
    }

    pub fn neg(&self) -> Var {
        self.scale(-1.0)
    }

    pub fn add_scalar(&self, offset: f64) -> Var {
        let value = self.value().map(|x| x + offset);
        Var::from_op(value, Op::AddScalar(self.clone()))
    }

    pub fn square(&self) -> Result<Var> {
        self.mul(self)
    }

    pub fn sqrt(&self) -> Var {
        let value = self.value().map(f64::sqrt);
        Var::from_op(value, Op::Sqrt(self.clone()))
    }

    pub fn reshape(&self, shape: &[usize]) -> Result<Var> {
        let value = self.value().reshape(shape)?;
        Ok(Var::from_op(value, Op::Reshape(self.clone())))
    }

    /// `[n, ...] -> [n, prod(...)]`
    pub fn flatten_samples(&self) -> Result<Var> {
        let n = self.value().batch_size();
        let per_sample = if n == 0 { 0 } else { self.value().numel() / n };
        self.reshape(&[n, per_sample])
    }

    pub fn activate(&self, act: ActivationFunction) -> Var {
        if act == ActivationFunction::Identity {
            return self.clone();
        }
        let value = self.value().map(|x| act.function(x));
        Var::from_op(value, Op::Activation(self.clone(), act))
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Var")
            .field("id", &self.id())
            .field("shape", &self.shape())
            .field("requires_grad", &self.requires_grad())
            .field("leaf", &self.is_leaf())
            .finish()
    }
}
