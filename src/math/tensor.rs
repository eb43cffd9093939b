use rand::Rng;
use serde::{Serialize, Deserialize};
use std::f64::consts::PI;

use crate::error::{GanError, Result};

/// Dense row-major `f64` array with an arbitrary shape.
///
/// Batches of images are `[batch, channels, height, width]`; everything the
/// dense layers touch is rank 2 (`[rows, cols]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl Tensor {
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Tensor> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(GanError::shape("Tensor::new", &shape, &[data.len()]));
        }
        Ok(Tensor { shape, data })
    }

    pub fn zeros(shape: &[usize]) -> Tensor {
        Tensor::full(shape, 0.0)
    }

    pub fn ones(shape: &[usize]) -> Tensor {
        Tensor::full(shape, 1.0)
    }

    pub fn full(shape: &[usize], value: f64) -> Tensor {
        let n = shape.iter().product();
        Tensor { shape: shape.to_vec(), data: vec![value; n] }
    }

    /// One-element tensor of shape `[1]`.
    pub fn scalar(value: f64) -> Tensor {
        Tensor { shape: vec![1], data: vec![value] }
    }

    /// Uniform samples on [0, 1).
    pub fn rand_uniform<R: Rng + ?Sized>(shape: &[usize], rng: &mut R) -> Tensor {
        let n: usize = shape.iter().product();
        let data = (0..n).map(|_| rng.gen::<f64>()).collect();
        Tensor { shape: shape.to_vec(), data }
    }

    /// Standard normal samples.
    pub fn randn<R: Rng + ?Sized>(shape: &[usize], rng: &mut R) -> Tensor {
        let n: usize = shape.iter().product();
        let data = (0..n).map(|_| sample_standard_normal(rng)).collect();
        Tensor { shape: shape.to_vec(), data }
    }

    /// He initialization: samples from N(0, sqrt(2 / rows)).
    ///
    /// Recommended before (Leaky)ReLU layers. Weights are laid out
    /// `[fan_in, fan_out]`, so `rows` is the fan-in.
    pub fn he<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Tensor {
        Tensor::scaled_normal(rows, cols, (2.0 / rows as f64).sqrt(), rng)
    }

    /// Xavier (Glorot) initialization: samples from N(0, sqrt(1 / rows)).
    ///
    /// Recommended before Sigmoid/Tanh/Identity layers.
    pub fn xavier<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Tensor {
        Tensor::scaled_normal(rows, cols, (1.0 / rows as f64).sqrt(), rng)
    }

    fn scaled_normal<R: Rng + ?Sized>(rows: usize, cols: usize, std_dev: f64, rng: &mut R) -> Tensor {
        let data = (0..rows * cols)
            .map(|_| sample_standard_normal(rng) * std_dev)
            .collect();
        Tensor { shape: vec![rows, cols], data }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Size of the leading (batch) dimension.
    pub fn batch_size(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    /// The single value of a one-element tensor.
    pub fn to_scalar(&self) -> Result<f64> {
        if self.data.len() != 1 {
            return Err(GanError::shape("to_scalar", &self.shape, &[1]));
        }
        Ok(self.data[0])
    }

    pub fn reshape(&self, shape: &[usize]) -> Result<Tensor> {
        let n: usize = shape.iter().product();
        if n != self.data.len() {
            return Err(GanError::shape("reshape", &self.shape, shape));
        }
        Ok(Tensor { shape: shape.to_vec(), data: self.data.clone() })
    }

    pub fn map<F>(&self, functor: F) -> Tensor
    where
        F: Fn(f64) -> f64,
    {
        Tensor {
            shape: self.shape.clone(),
            data: self.data.iter().map(|&x| functor(x)).collect(),
        }
    }

    /// Element-wise combination of two same-shape tensors.
    pub fn zip_map<F>(&self, rhs: &Tensor, op: &'static str, functor: F) -> Result<Tensor>
    where
        F: Fn(f64, f64) -> f64,
    {
        if self.shape != rhs.shape {
            return Err(GanError::shape(op, &self.shape, &rhs.shape));
        }
        Ok(Tensor {
            shape: self.shape.clone(),
            data: self.data.iter().zip(rhs.data.iter()).map(|(&a, &b)| functor(a, b)).collect(),
        })
    }

    fn dims2(&self, op: &'static str) -> Result<(usize, usize)> {
        match self.shape.as_slice() {
            &[rows, cols] => Ok((rows, cols)),
            _ => Err(GanError::shape(op, &self.shape, &[0, 0])),
        }
    }

    pub fn transpose(&self) -> Result<Tensor> {
        let (rows, cols) = self.dims2("transpose")?;
        let mut data = vec![0.0; rows * cols];
        for i in 0..rows {
            for j in 0..cols {
                data[j * rows + i] = self.data[i * cols + j];
            }
        }
        Ok(Tensor { shape: vec![cols, rows], data })
    }

    /// `[n, k] x [k, m] -> [n, m]`
    pub fn matmul(&self, rhs: &Tensor) -> Result<Tensor> {
        let (n, k) = self.dims2("matmul")?;
        let (k2, m) = rhs.dims2("matmul")?;
        if k != k2 {
            return Err(GanError::shape("matmul", &self.shape, &rhs.shape));
        }
        let mut data = vec![0.0; n * m];
        for i in 0..n {
            let out_row = &mut data[i * m..(i + 1) * m];
            for p in 0..k {
                let a = self.data[i * k + p];
                if a == 0.0 {
                    continue;
                }
                let rhs_row = &rhs.data[p * m..(p + 1) * m];
                for (o, &b) in out_row.iter_mut().zip(rhs_row) {
                    *o += a * b;
                }
            }
        }
        Ok(Tensor { shape: vec![n, m], data })
    }

    pub fn sum_all(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn min(&self) -> f64 {
        self.data.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// `[n, m] -> [1, m]`
    pub fn sum_rows(&self) -> Result<Tensor> {
        let (n, m) = self.dims2("sum_rows")?;
        let mut data = vec![0.0; m];
        for i in 0..n {
            for (acc, &x) in data.iter_mut().zip(&self.data[i * m..(i + 1) * m]) {
                *acc += x;
            }
        }
        Ok(Tensor { shape: vec![1, m], data })
    }

    /// `[n, m] -> [n, 1]`
    pub fn sum_cols(&self) -> Result<Tensor> {
        let (n, m) = self.dims2("sum_cols")?;
        let data = (0..n).map(|i| self.data[i * m..(i + 1) * m].iter().sum()).collect();
        Ok(Tensor { shape: vec![n, 1], data })
    }

    /// `[1, m] -> [n, m]`
    pub fn broadcast_rows(&self, n: usize) -> Result<Tensor> {
        let (one, m) = self.dims2("broadcast_rows")?;
        if one != 1 {
            return Err(GanError::shape("broadcast_rows", &self.shape, &[1, m]));
        }
        let mut data = Vec::with_capacity(n * m);
        for _ in 0..n {
            data.extend_from_slice(&self.data);
        }
        Ok(Tensor { shape: vec![n, m], data })
    }

    /// `[n, 1] -> [n, m]`
    pub fn broadcast_cols(&self, m: usize) -> Result<Tensor> {
        let (n, one) = self.dims2("broadcast_cols")?;
        if one != 1 {
            return Err(GanError::shape("broadcast_cols", &self.shape, &[n, 1]));
        }
        let data = self.data.iter().flat_map(|&x| std::iter::repeat(x).take(m)).collect();
        Ok(Tensor { shape: vec![n, m], data })
    }

    /// Repeats a one-element tensor over `shape`.
    pub fn expand(&self, shape: &[usize]) -> Result<Tensor> {
        Ok(Tensor::full(shape, self.to_scalar()?))
    }

    /// Stacks same-shape samples along a new leading dimension.
    pub fn stack(samples: &[Tensor]) -> Result<Tensor> {
        let first = samples.first().ok_or(GanError::EmptyDataset)?;
        let mut data = Vec::with_capacity(first.numel() * samples.len());
        for sample in samples {
            if sample.shape != first.shape {
                return Err(GanError::shape("stack", &first.shape, &sample.shape));
            }
            data.extend_from_slice(&sample.data);
        }
        let mut shape = vec![samples.len()];
        shape.extend_from_slice(&first.shape);
        Ok(Tensor { shape, data })
    }

    /// The `index`-th sample along the leading dimension.
    pub fn select(&self, index: usize) -> Result<Tensor> {
        let n = self.batch_size();
        if index >= n {
            return Err(GanError::shape("select", &self.shape, &[index]));
        }
        let per = self.data.len() / n;
        Ok(Tensor {
            shape: self.shape[1..].to_vec(),
            data: self.data[index * per..(index + 1) * per].to_vec(),
        })
    }
}

impl Default for Tensor {
    fn default() -> Self {
        Tensor { shape: vec![0], data: vec![] }
    }
}

/// Samples a single value from N(0, 1) using the Box-Muller transform.
fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // Draw two independent uniform samples in (0, 1] to avoid log(0).
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = 1.0 - rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
