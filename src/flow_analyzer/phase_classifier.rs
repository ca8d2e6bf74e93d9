//! Inference side of the learned signal policy: a small pretrained
//! classifier mapping normalized queue counts to a two-class phase
//! preference. Training happens elsewhere; this module only loads the
//! resulting parameters and runs the forward pass.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared_data::QueueState;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model parameters not found at {0}")]
    NotFound(String),
    #[error("failed to read model parameters: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse model parameters: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("model parameter shape mismatch: {0}")]
    Shape(String),
}

/// A two-class phase preference over the intersection's axes.
///
/// The returned pair is a probability distribution: component 0 prefers the
/// north-south phase, component 1 the east-west phase. Kept as a one-method
/// trait so tests can substitute fixed probabilities for a real artifact.
pub trait PhaseClassifier {
    fn predict(&self, state: [f32; 4]) -> [f32; 2];
}

/// Parameters of one dense layer; `weight` rows are output neurons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weight: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
}

impl DenseLayer {
    fn forward(&self, input: &[f32]) -> Vec<f32> {
        self.weight
            .iter()
            .zip(&self.bias)
            .map(|(row, bias)| {
                row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + bias
            })
            .collect()
    }

    fn check(&self, name: &str, inputs: usize, outputs: usize) -> Result<(), ModelError> {
        if self.weight.len() != outputs || self.bias.len() != outputs {
            return Err(ModelError::Shape(format!(
                "{} must have {} outputs, found {} weight rows and {} biases",
                name,
                outputs,
                self.weight.len(),
                self.bias.len()
            )));
        }
        for (index, row) in self.weight.iter().enumerate() {
            if row.len() != inputs {
                return Err(ModelError::Shape(format!(
                    "{} row {} has {} inputs, expected {}",
                    name,
                    index,
                    row.len(),
                    inputs
                )));
            }
        }
        Ok(())
    }
}

/// The pretrained queue-to-phase classifier: dense 4 -> 32, ReLU,
/// dense 32 -> 2, softmax.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficBrain {
    pub layer1: DenseLayer,
    pub layer2: DenseLayer,
}

const HIDDEN_NEURONS: usize = 32;

impl TrafficBrain {
    /// Loads pretrained parameters. A missing artifact is reported as
    /// [`ModelError::NotFound`] so callers can abort before any simulation
    /// work; there is no untrained fallback.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        if !path.exists() {
            return Err(ModelError::NotFound(path.display().to_string()));
        }
        let file = File::open(path)?;
        let brain: TrafficBrain = serde_json::from_reader(BufReader::new(file))?;
        brain.validate()?;
        Ok(brain)
    }

    fn validate(&self) -> Result<(), ModelError> {
        self.layer1.check("layer1", 4, HIDDEN_NEURONS)?;
        self.layer2.check("layer2", HIDDEN_NEURONS, 2)?;
        Ok(())
    }
}

impl PhaseClassifier for TrafficBrain {
    fn predict(&self, state: [f32; 4]) -> [f32; 2] {
        let hidden: Vec<f32> = self
            .layer1
            .forward(&state)
            .into_iter()
            .map(|v| v.max(0.0))
            .collect();
        let logits = self.layer2.forward(&hidden);
        softmax2([logits[0], logits[1]])
    }
}

fn softmax2(logits: [f32; 2]) -> [f32; 2] {
    // Subtract the max so large logits cannot overflow the exponentials.
    let max = logits[0].max(logits[1]);
    let e0 = (logits[0] - max).exp();
    let e1 = (logits[1] - max).exp();
    let sum = e0 + e1;
    [e0 / sum, e1 / sum]
}

/// Queue counts scaled by the saturation constant. Deliberately unclamped:
/// queues beyond saturation produce values above 1.0, which the classifier
/// accepts as ordinary input.
pub fn normalize_queues(queues: &QueueState, saturation: f64) -> [f32; 4] {
    queues.as_array().map(|count| (count as f64 / saturation) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn tiny_brain() -> TrafficBrain {
        // Hidden neuron 0 sees the NS axis, neuron 1 the EW axis; the rest
        // stay silent. Output logits mirror those two neurons.
        let mut weight1 = vec![vec![0.0; 4]; HIDDEN_NEURONS];
        weight1[0] = vec![1.0, 1.0, 0.0, 0.0];
        weight1[1] = vec![0.0, 0.0, 1.0, 1.0];
        let mut weight2 = vec![vec![0.0; HIDDEN_NEURONS]; 2];
        weight2[0][0] = 1.0;
        weight2[1][1] = 1.0;
        TrafficBrain {
            layer1: DenseLayer {
                weight: weight1,
                bias: vec![0.0; HIDDEN_NEURONS],
            },
            layer2: DenseLayer {
                weight: weight2,
                bias: vec![0.0; 2],
            },
        }
    }

    #[test]
    fn predictions_are_a_probability_distribution() {
        let brain = tiny_brain();
        let probs = brain.predict([0.4, 0.2, 0.1, 0.0]);
        assert!(probs[0] >= 0.0 && probs[1] >= 0.0);
        assert!((probs[0] + probs[1] - 1.0).abs() < 1e-6);
        assert!(probs[0] > probs[1]);
    }

    #[test]
    fn heavier_axis_wins_the_preference() {
        let brain = tiny_brain();
        let ns_heavy = brain.predict([1.0, 1.0, 0.0, 0.0]);
        let ew_heavy = brain.predict([0.0, 0.0, 1.0, 1.0]);
        assert!(ns_heavy[0] > ns_heavy[1]);
        assert!(ew_heavy[1] > ew_heavy[0]);
    }

    #[test]
    fn normalization_is_unclamped_above_saturation() {
        let queues = QueueState {
            north: 75,
            south: 50,
            east: 25,
            west: 0,
        };
        let normalized = normalize_queues(&queues, 50.0);
        assert!((normalized[0] - 1.5).abs() < 1e-6);
        assert!((normalized[1] - 1.0).abs() < 1e-6);
        assert!((normalized[2] - 0.5).abs() < 1e-6);
        assert_eq!(normalized[3], 0.0);
    }

    #[test]
    fn missing_artifact_is_reported_as_not_found() {
        let path = Path::new("definitely/not/here.json");
        match TrafficBrain::load(path) {
            Err(ModelError::NotFound(reported)) => {
                assert!(reported.contains("not/here.json"));
            }
            other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn parameters_round_trip_through_json() {
        let brain = tiny_brain();
        let path = std::env::temp_dir().join("signal_control_brain_roundtrip.json");
        let mut file = File::create(&path).unwrap();
        file.write_all(serde_json::to_string(&brain).unwrap().as_bytes())
            .unwrap();

        let loaded = TrafficBrain::load(&path).unwrap();
        let probs = loaded.predict([0.2, 0.2, 0.6, 0.6]);
        assert!(probs[1] > probs[0]);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn malformed_shapes_are_rejected() {
        let mut brain = tiny_brain();
        brain.layer1.weight[3] = vec![1.0, 2.0];
        assert!(matches!(brain.validate(), Err(ModelError::Shape(_))));

        let mut brain = tiny_brain();
        brain.layer2.bias = vec![0.0; 3];
        assert!(matches!(brain.validate(), Err(ModelError::Shape(_))));
    }
}
