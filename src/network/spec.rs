use std::path::Path;

use serde::{Serialize, Deserialize};
use crate::activation::activation::ActivationFunction;
use crate::error::{GanError, Result};

/// Describes one layer in a network specification.
///
/// Fields:
/// - `size`:       number of neurons in this layer
/// - `input_size`: number of neurons feeding into this layer (i.e. the output
///                 size of the previous layer, or the raw input dimension for
///                 the first layer)
/// - `activation`: activation function applied after the linear transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub size: usize,
    pub input_size: usize,
    pub activation: ActivationFunction,
}

/// A fully serializable description of a network architecture.
///
/// `NetworkSpec` can be saved to / loaded from JSON independently of the
/// trained weights. `ferrite-gan train` writes one per model next to the
/// checkpoint, so a run directory records which shapes its checkpoint
/// belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Human-readable name used as the file stem.
    pub name: String,
    /// Ordered list of layer descriptions (input → output).
    pub layers: Vec<LayerSpec>,
}

impl NetworkSpec {
    /// Checks that the network is non-empty and that consecutive layers chain.
    pub fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(GanError::Config(format!("network '{}' has no layers", self.name)));
        }
        for (i, pair) in self.layers.windows(2).enumerate() {
            if pair[0].size != pair[1].input_size {
                return Err(GanError::Config(format!(
                    "network '{}': layer {} outputs {} values but layer {} expects {}",
                    self.name, i, pair[0].size, i + 1, pair[1].input_size
                )));
            }
        }
        if self.layers.iter().any(|l| l.size == 0 || l.input_size == 0) {
            return Err(GanError::Config(format!("network '{}' has a zero-width layer", self.name)));
        }
        Ok(())
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map(|l| l.input_size).unwrap_or(0)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map(|l| l.size).unwrap_or(0)
    }

    /// Serializes the spec to a pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a `NetworkSpec` from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<NetworkSpec> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(size: usize, input_size: usize) -> LayerSpec {
        LayerSpec { size, input_size, activation: ActivationFunction::ReLU }
    }

    #[test]
    fn validate_rejects_broken_chain() {
        let spec = NetworkSpec { name: "bad".into(), layers: vec![layer(8, 4), layer(2, 7)] };
        assert!(matches!(spec.validate(), Err(GanError::Config(_))));
    }

    #[test]
    fn json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("critic.json");
        let path = path.to_str().unwrap();
        let spec = NetworkSpec { name: "critic".into(), layers: vec![layer(8, 4), layer(1, 8)] };
        spec.save_json(path).unwrap();
        assert_eq!(NetworkSpec::load_json(path).unwrap(), spec);
    }
}
