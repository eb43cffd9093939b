//! Reverse-mode automatic differentiation over [`Tensor`](crate::math::tensor::Tensor).
//!
//! Backward rules are written with the same differentiable operations as the
//! forward pass, so `grad(.., create_graph = true)` returns gradients that can
//! be differentiated again. The gradient penalty relies on this.

mod backward;
mod var;

pub use backward::{grad, Gradients};
pub use var::{NodeId, Var};
