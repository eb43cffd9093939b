use std::collections::{HashMap, HashSet};

use crate::error::{GanError, Result};
use crate::math::tensor::Tensor;

use super::var::{NodeId, Op, Var};

/// First-order gradients of one backward pass, keyed by leaf node.
///
/// Every call to [`Var::backward`] yields a fresh value, so there is never
/// stale accumulation from a previous step to clear.
#[derive(Debug, Default)]
pub struct Gradients {
    grads: HashMap<NodeId, Tensor>,
}

impl Gradients {
    pub fn get(&self, var: &Var) -> Option<&Tensor> {
        self.grads.get(&var.id())
    }

    pub fn len(&self) -> usize {
        self.grads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grads.is_empty()
    }
}

impl Var {
    /// Gradients of `self` (seeded with ones) with respect to every leaf that
    /// requires them. Nothing of the backward pass is kept in the graph.
    pub fn backward(&self) -> Result<Gradients> {
        if !self.requires_grad() {
            return Err(GanError::Autograd(
                "backward called on a value that does not require gradients".to_string(),
            ));
        }
        let order = topological_order(self);
        let mut grads = propagate(self, &order, false)?;
        let leaves = order
            .iter()
            .filter(|v| v.is_leaf())
            .filter_map(|v| grads.remove(&v.id()).map(|g| (v.id(), g.value().clone())))
            .collect();
        Ok(Gradients { grads: leaves })
    }
}

/// Gradient of `output` with respect to each of `inputs`, with the output
/// seeded by ones of its own shape.
///
/// With `create_graph` the returned gradients are graph nodes themselves:
/// anything computed from them can be differentiated again, back into every
/// parameter the forward pass used. Inputs that do not influence
/// `output` get a zero gradient.
pub fn grad(output: &Var, inputs: &[&Var], create_graph: bool) -> Result<Vec<Var>> {
    let mut grads = if output.requires_grad() {
        let order = topological_order(output);
        propagate(output, &order, create_graph)?
    } else {
        HashMap::new()
    };
    Ok(inputs
        .iter()
        .map(|input| {
            grads
                .remove(&input.id())
                .unwrap_or_else(|| Var::constant(Tensor::zeros(input.shape())))
        })
        .collect())
}

/// Nodes reachable from `root` through gradient-carrying edges, inputs
/// before the nodes that consume them.
fn topological_order(root: &Var) -> Vec<Var> {
    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = vec![(root.clone(), false)];

    while let Some((var, expanded)) = stack.pop() {
        if expanded {
            order.push(var);
            continue;
        }
        if !var.requires_grad() || !visited.insert(var.id()) {
            continue;
        }
        stack.push((var.clone(), true));
        if let Some(op) = var.op() {
            for input in op.inputs() {
                if input.requires_grad() && !visited.contains(&input.id()) {
                    stack.push((input.clone(), false));
                }
            }
        }
    }
    order
}

fn propagate(output: &Var, order: &[Var], create_graph: bool) -> Result<HashMap<NodeId, Var>> {
    let mut grads: HashMap<NodeId, Var> = HashMap::new();
    grads.insert(output.id(), Var::constant(Tensor::ones(output.shape())));

    for node in order.iter().rev() {
        let Some(op) = node.op() else { continue };
        let Some(upstream) = grads.get(&node.id()).cloned() else { continue };

        for (input, contribution) in local_gradients(node, op, &upstream, create_graph)? {
            let total = match grads.remove(&input.id()) {
                Some(existing) => existing.add(&contribution)?,
                None => contribution,
            };
            grads.insert(input.id(), total);
        }
    }
    Ok(grads)
}

/// Vector-Jacobian products of one node, expressed with differentiable
/// `Var` operations so the backward pass can itself be differentiated.
fn local_gradients(node: &Var, op: &Op, upstream: &Var, create_graph: bool) -> Result<Vec<(Var, Var)>> {
    let keep = |v: &Var| if create_graph { v.clone() } else { v.detach() };
    let g = keep(upstream);
    let mut out = Vec::with_capacity(2);

    match op {
        Op::Add(a, b) => {
            push(&mut out, a, || Ok(g.clone()))?;
            push(&mut out, b, || Ok(g.clone()))?;
        }
        Op::Sub(a, b) => {
            push(&mut out, a, || Ok(g.clone()))?;
            push(&mut out, b, || Ok(g.neg()))?;
        }
        Op::Mul(a, b) => {
            push(&mut out, a, || g.mul(&keep(b)))?;
            push(&mut out, b, || g.mul(&keep(a)))?;
        }
        Op::Div(a, b) => {
            // y = a / b: dy/da = 1 / b, dy/db = -y / b
            push(&mut out, a, || g.div(&keep(b)))?;
            push(&mut out, b, || Ok(g.mul(&keep(node))?.div(&keep(b))?.neg()))?;
        }
        Op::MatMul(a, b) => {
            push(&mut out, a, || g.matmul(&keep(b).transpose()?))?;
            push(&mut out, b, || keep(a).transpose()?.matmul(&g))?;
        }
        Op::Transpose(a) => push(&mut out, a, || g.transpose())?,
        Op::AddBias(x, bias) => {
            push(&mut out, x, || Ok(g.clone()))?;
            push(&mut out, bias, || g.sum_rows())?;
        }
        Op::SumRows(a) => push(&mut out, a, || g.broadcast_rows(a.value().batch_size()))?,
        Op::BroadcastRows(a) => push(&mut out, a, || g.sum_rows())?,
        Op::SumCols(a) => push(&mut out, a, || g.broadcast_cols(a.shape()[1]))?,
        Op::BroadcastCols(a) => push(&mut out, a, || g.sum_cols())?,
        Op::Sum(a) => push(&mut out, a, || g.expand(a.shape()))?,
        Op::Expand(a) => push(&mut out, a, || g.sum())?,
        Op::Scale(a, factor) => push(&mut out, a, || Ok(g.scale(*factor)))?,
        Op::AddScalar(a) => push(&mut out, a, || Ok(g.clone()))?,
        Op::Sqrt(a) => {
            // d sqrt(x) = 1 / (2 sqrt(x))
            push(&mut out, a, || g.scale(0.5).div(&keep(node)))?;
        }
        Op::Reshape(a) => push(&mut out, a, || g.reshape(a.shape()))?,
        Op::Activation(a, act) => {
            push(&mut out, a, || {
                if act.is_piecewise_linear() {
                    let slope = Var::constant(a.value().map(|x| act.derivative(x)));
                    return g.mul(&slope);
                }
                // Smooth activations: write the derivative through the output
                // so second derivatives flow.
                let y = keep(node);
                let slope = match act {
                    crate::activation::activation::ActivationFunction::Tanh => {
                        y.square()?.neg().add_scalar(1.0)
                    }
                    crate::activation::activation::ActivationFunction::Sigmoid => {
                        y.mul(&y.neg().add_scalar(1.0))?
                    }
                    _ => Var::constant(a.value().map(|x| act.derivative(x))),
                };
                g.mul(&slope)
            })?;
        }
    }
    Ok(out)
}

fn push<F>(out: &mut Vec<(Var, Var)>, input: &Var, contribution: F) -> Result<()>
where
    F: FnOnce() -> Result<Var>,
{
    if input.requires_grad() {
        out.push((input.clone(), contribution()?));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationFunction;
    use approx::assert_abs_diff_eq;

    fn t(shape: &[usize], data: &[f64]) -> Tensor {
        Tensor::new(shape.to_vec(), data.to_vec()).unwrap()
    }

    /// Central differences of a scalar function of one tensor.
    fn numeric_grad<F>(x: &Tensor, f: F) -> Vec<f64>
    where
        F: Fn(&Tensor) -> f64,
    {
        let h = 1e-6;
        (0..x.numel())
            .map(|i| {
                let mut plus = x.data().to_vec();
                let mut minus = x.data().to_vec();
                plus[i] += h;
                minus[i] -= h;
                let fp = f(&t(x.shape(), &plus));
                let fm = f(&t(x.shape(), &minus));
                (fp - fm) / (2.0 * h)
            })
            .collect()
    }

    #[test]
    fn dense_tanh_layer_matches_finite_differences() {
        let x = t(&[2, 3], &[0.1, -0.4, 0.7, 1.2, 0.3, -0.8]);
        let w0 = t(&[3, 2], &[0.5, -0.3, 0.2, 0.8, -0.6, 0.1]);
        let b = t(&[1, 2], &[0.05, -0.02]);

        let loss_of = |w: &Tensor| -> f64 {
            Var::constant(x.clone())
                .matmul(&Var::constant(w.clone())).unwrap()
                .add_bias(&Var::constant(b.clone())).unwrap()
                .activate(ActivationFunction::Tanh)
                .square().unwrap()
                .mean().unwrap()
                .to_scalar().unwrap()
        };

        let w = Var::variable(w0.clone());
        let loss = Var::constant(x.clone())
            .matmul(&w).unwrap()
            .add_bias(&Var::constant(b.clone())).unwrap()
            .activate(ActivationFunction::Tanh)
            .square().unwrap()
            .mean().unwrap();
        let grads = loss.backward().unwrap();
        let analytic = grads.get(&w).unwrap();

        for (a, n) in analytic.data().iter().zip(numeric_grad(&w0, loss_of)) {
            assert_abs_diff_eq!(*a, n, epsilon = 1e-6);
        }
    }

    #[test]
    fn second_derivative_of_cube() {
        // f(x) = x^3, f'(x) = 3x^2, f''(x) = 6x
        let x = Var::variable(t(&[1], &[2.0]));
        let y = x.mul(&x).unwrap().mul(&x).unwrap();
        let dy = grad(&y, &[&x], true).unwrap().remove(0);
        assert_abs_diff_eq!(dy.to_scalar().unwrap(), 12.0, epsilon = 1e-12);
        assert!(dy.requires_grad());

        let d2y = grad(&dy, &[&x], false).unwrap().remove(0);
        assert_abs_diff_eq!(d2y.to_scalar().unwrap(), 12.0, epsilon = 1e-12);
        assert!(!d2y.requires_grad());
    }

    #[test]
    fn gradient_norm_penalty_reaches_weights() {
        // score(x) = x . w, so d score / dx = w for every row and the
        // penalty (|w| - 1)^2 has gradient 2 (|w| - 1) w / |w|.
        let w = Var::variable(t(&[2, 1], &[3.0, 4.0]));
        let x = Var::variable(t(&[3, 2], &[0.1, 0.2, -0.3, 0.4, 0.5, -0.6]));
        let score = x.matmul(&w).unwrap();
        let g = grad(&score, &[&x], true).unwrap().remove(0);
        let norm = g.square().unwrap().sum_cols().unwrap().sqrt();
        let penalty = norm.add_scalar(-1.0).square().unwrap().mean().unwrap();
        assert_abs_diff_eq!(penalty.to_scalar().unwrap(), 16.0, epsilon = 1e-12);

        let grads = penalty.backward().unwrap();
        let dw = grads.get(&w).unwrap();
        assert_abs_diff_eq!(dw.data()[0], 2.0 * 4.0 * 3.0 / 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(dw.data()[1], 2.0 * 4.0 * 4.0 / 5.0, epsilon = 1e-9);
    }

    #[test]
    fn detach_stops_gradient_flow() {
        let w = Var::variable(t(&[1], &[3.0]));
        let y = w.mul(&w).unwrap().detach();
        let z = y.mul(&w).unwrap();
        let grads = z.backward().unwrap();
        // Only the direct use of w contributes: dz/dw = y = 9.
        assert_abs_diff_eq!(grads.get(&w).unwrap().data()[0], 9.0);
    }

    #[test]
    fn unrelated_inputs_get_zero_gradient() {
        let a = Var::variable(t(&[2], &[1.0, 2.0]));
        let b = Var::variable(t(&[2], &[3.0, 4.0]));
        let y = a.sum().unwrap();
        let grads = grad(&y, &[&a, &b], false).unwrap();
        assert_eq!(grads[0].value().data(), &[1.0, 1.0]);
        assert_eq!(grads[1].value().data(), &[0.0, 0.0]);
    }

    #[test]
    fn shared_subexpressions_accumulate() {
        let a = Var::variable(t(&[1], &[2.0]));
        let b = a.scale(3.0);
        let y = b.add(&b).unwrap().add(&a).unwrap();
        let grads = y.backward().unwrap();
        assert_abs_diff_eq!(grads.get(&a).unwrap().data()[0], 7.0);
    }

    #[test]
    fn backward_on_constant_is_an_error() {
        let c = Var::constant(Tensor::scalar(1.0));
        assert!(matches!(c.backward(), Err(GanError::Autograd(_))));
    }
}
