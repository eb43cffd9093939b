use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{GanError, Result};
use crate::math::tensor::Tensor;

/// One mini-batch: images `[n, c, h, w]` and their class labels.
/// The trainer ignores the labels.
#[derive(Debug, Clone)]
pub struct Batch {
    pub images: Tensor,
    pub labels: Vec<usize>,
}

/// A finite sequence of batches that can be replayed once per epoch.
pub trait DataSource {
    /// Number of batches one call to [`batches`](DataSource::batches) yields.
    fn num_batches(&self) -> usize;

    /// Starts a new pass over the data.
    fn batches(&mut self) -> Box<dyn Iterator<Item = Result<Batch>> + '_>;
}

/// Mini-batches over samples held in memory.
///
/// Each sample is one `[c, h, w]` image. The last batch of a pass is smaller
/// when the sample count is not a multiple of `batch_size`.
pub struct DataLoader {
    samples: Vec<(Tensor, usize)>,
    batch_size: usize,
    shuffle: bool,
    rng: StdRng,
}

impl DataLoader {
    pub fn new(samples: Vec<(Tensor, usize)>, batch_size: usize) -> Result<DataLoader> {
        if batch_size == 0 {
            return Err(GanError::Config("batch_size must be at least 1".to_string()));
        }
        if let Some((first, _)) = samples.first() {
            if let Some((odd, _)) = samples.iter().find(|(s, _)| s.shape() != first.shape()) {
                return Err(GanError::shape("DataLoader sample", first.shape(), odd.shape()));
            }
        }
        Ok(DataLoader {
            samples,
            batch_size,
            shuffle: false,
            rng: StdRng::from_entropy(),
        })
    }

    /// Reorders samples at the start of every pass.
    #[must_use]
    pub fn shuffled(mut self, seed: Option<u64>) -> Self {
        self.shuffle = true;
        self.rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl DataSource for DataLoader {
    fn num_batches(&self) -> usize {
        (self.samples.len() + self.batch_size - 1) / self.batch_size
    }

    fn batches(&mut self) -> Box<dyn Iterator<Item = Result<Batch>> + '_> {
        let mut order: Vec<usize> = (0..self.samples.len()).collect();
        if self.shuffle {
            order.shuffle(&mut self.rng);
        }
        let samples = &self.samples;
        let batch_size = self.batch_size;

        Box::new((0..order.len()).step_by(batch_size).map(move |start| {
            let end = (start + batch_size).min(order.len());
            let picked = &order[start..end];
            let images: Vec<Tensor> = picked.iter().map(|&i| samples[i].0.clone()).collect();
            let labels = picked.iter().map(|&i| samples[i].1).collect();
            Ok(Batch { images: Tensor::stack(&images)?, labels })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(n: usize) -> Vec<(Tensor, usize)> {
        (0..n).map(|i| (Tensor::full(&[1, 2, 2], i as f64), i % 3)).collect()
    }

    #[test]
    fn final_batch_is_ragged() {
        let mut loader = DataLoader::new(samples(10), 4).unwrap();
        assert_eq!(loader.num_batches(), 3);
        let sizes: Vec<usize> = loader.batches().map(|b| b.unwrap().images.batch_size()).collect();
        assert_eq!(sizes, [4, 4, 2]);
    }

    #[test]
    fn every_pass_covers_all_samples_once() {
        let mut loader = DataLoader::new(samples(7), 3).unwrap().shuffled(Some(9));
        for _ in 0..2 {
            let mut seen: Vec<f64> = loader.batches()
                .flat_map(|b| {
                    let images = b.unwrap().images;
                    (0..images.batch_size()).map(move |i| images.select(i).unwrap().data()[0]).collect::<Vec<_>>()
                })
                .collect();
            seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
            assert_eq!(seen, (0..7).map(|i| i as f64).collect::<Vec<_>>());
        }
    }

    #[test]
    fn rejects_mixed_sample_shapes() {
        let mut s = samples(2);
        s.push((Tensor::zeros(&[3, 2, 2]), 0));
        assert!(DataLoader::new(s, 2).is_err());
    }

    #[test]
    fn rejects_zero_batch_size() {
        assert!(matches!(DataLoader::new(samples(2), 0), Err(GanError::Config(_))));
    }
}
