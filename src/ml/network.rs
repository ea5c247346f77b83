//! Built-in feed-forward classifier.
//!
//! Dense layers with ReLU activations and inverted dropout, a softmax output
//! layer, categorical cross-entropy loss and mini-batch SGD with Nesterov
//! momentum and time-based learning rate decay. Weights are saved as pretty
//! JSON.

use std::path::Path;
use std::time::Instant;

use log::{debug, info};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};
use crate::ml::backend::{Classifier, ClassifierBackend, FitOutcome, argmax};
use crate::ml::dataset::TrainingMatrix;
use crate::ml::{TrainingConfig, TrainingStats};

/// Extension of classifier files written by [`MlpBackend`].
pub const MLP_EXTENSION: &str = "mlp.json";

/// Probability floor used inside the log of the loss.
const EPSILON: f32 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Softmax,
}

/// Fully connected layer. `weights` is row-major, one row per output unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    inputs: usize,
    outputs: usize,
    activation: Activation,
    weights: Vec<f32>,
    biases: Vec<f32>,
}

impl DenseLayer {
    /// Glorot-uniform weights, zero biases.
    fn new<R: Rng + ?Sized>(
        inputs: usize,
        outputs: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        let limit = (6.0 / (inputs + outputs) as f32).sqrt();
        let weights = (0..inputs * outputs)
            .map(|_| rng.random_range(-limit..limit))
            .collect();

        DenseLayer {
            inputs,
            outputs,
            activation,
            weights,
            biases: vec![0.0; outputs],
        }
    }

    fn pre_activation(&self, input: &[f32]) -> Vec<f32> {
        self.weights
            .chunks_exact(self.inputs)
            .zip(&self.biases)
            .map(|(row, bias)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + bias)
            .collect()
    }

    fn activate(&self, z: &[f32]) -> Vec<f32> {
        match self.activation {
            Activation::Relu => z.iter().map(|&v| v.max(0.0)).collect(),
            Activation::Softmax => softmax(z),
        }
    }
}

fn softmax(z: &[f32]) -> Vec<f32> {
    let max = z.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = z.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}

/// Intermediate values of one training forward pass.
struct ForwardPass {
    /// Layer inputs: `activations[0]` is the feature row, the last entry is the
    /// output distribution.
    activations: Vec<Vec<f32>>,
    /// Pre-activations of each layer.
    pre_activations: Vec<Vec<f32>>,
    /// Dropout scale per hidden unit (`0` or `1 / keep`).
    masks: Vec<Vec<f32>>,
}

/// Gradients or momentum buffers shaped like the network parameters.
#[derive(Clone)]
struct ParameterBuffers {
    weights: Vec<Vec<f32>>,
    biases: Vec<Vec<f32>>,
}

impl ParameterBuffers {
    fn zeros(layers: &[DenseLayer]) -> Self {
        ParameterBuffers {
            weights: layers.iter().map(|l| vec![0.0; l.weights.len()]).collect(),
            biases: layers.iter().map(|l| vec![0.0; l.biases.len()]).collect(),
        }
    }

    fn clear(&mut self) {
        self.weights.iter_mut().for_each(|w| w.fill(0.0));
        self.biases.iter_mut().for_each(|b| b.fill(0.0));
    }
}

/// Multi-layer perceptron classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedForwardNetwork {
    layers: Vec<DenseLayer>,
    dropout: f32,
}

impl FeedForwardNetwork {
    /// Randomly initialized network `input → hidden.. → output`.
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        hidden_layers: &[usize],
        output_size: usize,
        dropout: f32,
        rng: &mut R,
    ) -> Result<Self> {
        if input_size == 0 || output_size == 0 {
            return Err(ChatError::empty_dataset(format!(
                "cannot build a {input_size} → {output_size} network"
            )));
        }

        let mut layers = Vec::with_capacity(hidden_layers.len() + 1);
        let mut inputs = input_size;
        for &width in hidden_layers {
            layers.push(DenseLayer::new(inputs, width, Activation::Relu, rng));
            inputs = width;
        }
        layers.push(DenseLayer::new(inputs, output_size, Activation::Softmax, rng));

        Ok(FeedForwardNetwork { layers, dropout })
    }

    /// Output distribution for one feature row, dropout disabled.
    pub fn predict(&self, input: &[f32]) -> Result<Vec<f32>> {
        if input.len() != self.input_size() {
            return Err(ChatError::inference(format!(
                "expected {} features, got {}",
                self.input_size(),
                input.len()
            )));
        }

        let mut activation = input.to_vec();
        for layer in &self.layers {
            activation = layer.activate(&layer.pre_activation(&activation));
        }
        Ok(activation)
    }

    fn forward_train<R: Rng + ?Sized>(&self, input: &[f32], rng: &mut R) -> ForwardPass {
        let keep = 1.0 - self.dropout;
        let hidden = self.layers.len() - 1;
        let mut pass = ForwardPass {
            activations: vec![input.to_vec()],
            pre_activations: Vec::with_capacity(self.layers.len()),
            masks: Vec::with_capacity(hidden),
        };

        for (i, layer) in self.layers.iter().enumerate() {
            let Some(previous) = pass.activations.last() else {
                break;
            };
            let z = layer.pre_activation(previous);
            let mut a = layer.activate(&z);

            if i < hidden {
                let mask: Vec<f32> = (0..a.len())
                    .map(|_| {
                        if self.dropout == 0.0 || rng.random::<f32>() < keep {
                            1.0 / keep
                        } else {
                            0.0
                        }
                    })
                    .collect();
                a.iter_mut().zip(&mask).for_each(|(v, m)| *v *= m);
                pass.masks.push(mask);
            }

            pass.pre_activations.push(z);
            pass.activations.push(a);
        }

        pass
    }

    /// Accumulate the gradients of one row into `grads`. Returns the row loss.
    fn backward(&self, pass: &ForwardPass, target: &[f32], grads: &mut ParameterBuffers) -> f32 {
        let Some(output) = pass.activations.last() else {
            return 0.0;
        };
        let loss = -target
            .iter()
            .zip(output)
            .map(|(y, p)| y * p.max(EPSILON).ln())
            .sum::<f32>();

        // Softmax + cross-entropy: dL/dz = p - y.
        let mut delta: Vec<f32> = output.iter().zip(target).map(|(p, y)| p - y).collect();

        for l in (0..self.layers.len()).rev() {
            let layer = &self.layers[l];
            let input = &pass.activations[l];

            for (o, d) in delta.iter().enumerate() {
                grads.biases[l][o] += d;
                let row = &mut grads.weights[l][o * layer.inputs..(o + 1) * layer.inputs];
                row.iter_mut().zip(input).for_each(|(g, x)| *g += d * x);
            }

            if l == 0 {
                break;
            }

            let mask = &pass.masks[l - 1];
            let z = &pass.pre_activations[l - 1];
            delta = (0..layer.inputs)
                .map(|i| {
                    if z[i] <= 0.0 || mask[i] == 0.0 {
                        return 0.0;
                    }
                    let back: f32 = delta
                        .iter()
                        .enumerate()
                        .map(|(o, d)| layer.weights[o * layer.inputs + i] * d)
                        .sum();
                    back * mask[i]
                })
                .collect();
        }

        loss
    }

    /// Nesterov momentum update with the batch-averaged gradients.
    fn apply_gradients(
        &mut self,
        grads: &ParameterBuffers,
        velocity: &mut ParameterBuffers,
        batch_len: usize,
        learning_rate: f32,
        momentum: f32,
    ) {
        let scale = 1.0 / batch_len as f32;
        let step = |param: &mut f32, v: &mut f32, g: f32| {
            let g = g * scale;
            *v = momentum * *v - learning_rate * g;
            *param += momentum * *v - learning_rate * g;
        };

        for (l, layer) in self.layers.iter_mut().enumerate() {
            for ((w, v), g) in layer
                .weights
                .iter_mut()
                .zip(velocity.weights[l].iter_mut())
                .zip(&grads.weights[l])
            {
                step(w, v, *g);
            }
            for ((b, v), g) in layer
                .biases
                .iter_mut()
                .zip(velocity.biases[l].iter_mut())
                .zip(&grads.biases[l])
            {
                step(b, v, *g);
            }
        }
    }

    /// Train on `matrix`, reporting `(epoch, mean_loss)` after each epoch.
    pub fn fit<R: Rng + ?Sized>(
        &mut self,
        matrix: &TrainingMatrix,
        config: &TrainingConfig,
        rng: &mut R,
        on_epoch: &mut dyn FnMut(usize, f32),
    ) -> Result<TrainingStats> {
        config.validate()?;
        if matrix.rows() == 0 {
            return Err(ChatError::empty_dataset("training matrix has no rows"));
        }
        if matrix.input_size() != self.input_size() || matrix.output_size() != self.output_size()
        {
            return Err(ChatError::other(format!(
                "matrix is {}x{}, network expects {}x{}",
                matrix.input_size(),
                matrix.output_size(),
                self.input_size(),
                self.output_size()
            )));
        }

        let start = Instant::now();
        let mut grads = ParameterBuffers::zeros(&self.layers);
        let mut velocity = ParameterBuffers::zeros(&self.layers);
        let mut order: Vec<usize> = (0..matrix.rows()).collect();
        let mut iterations = 0usize;
        let mut epoch_losses = Vec::with_capacity(config.epochs);

        for epoch in 1..=config.epochs {
            order.shuffle(rng);
            let mut epoch_loss = 0.0;

            for batch in order.chunks(config.batch_size) {
                grads.clear();
                for &row in batch {
                    let pass = self.forward_train(&matrix.features[row], rng);
                    epoch_loss += self.backward(&pass, &matrix.targets[row], &mut grads);
                }

                let learning_rate =
                    config.learning_rate / (1.0 + config.decay * iterations as f32);
                self.apply_gradients(
                    &grads,
                    &mut velocity,
                    batch.len(),
                    learning_rate,
                    config.momentum,
                );
                iterations += 1;
            }

            let mean_loss = epoch_loss / matrix.rows() as f32;
            if !mean_loss.is_finite() {
                return Err(ChatError::other(format!(
                    "training diverged at epoch {epoch} (loss {mean_loss})"
                )));
            }
            debug!("Epoch {epoch}/{}: loss {mean_loss:.4}", config.epochs);
            on_epoch(epoch, mean_loss);
            epoch_losses.push(mean_loss);
        }

        let training_accuracy = self.accuracy(matrix)?;
        let stats = TrainingStats {
            epochs: epoch_losses.len(),
            final_loss: epoch_losses.last().copied().unwrap_or_default(),
            epoch_losses,
            training_accuracy,
            training_time_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "Trained {} network in {} ms: loss {:.4}, accuracy {:.2}",
            self.describe(),
            stats.training_time_ms,
            stats.final_loss,
            stats.training_accuracy
        );
        Ok(stats)
    }

    /// Share of rows whose argmax prediction matches the target.
    pub fn accuracy(&self, matrix: &TrainingMatrix) -> Result<f32> {
        if matrix.rows() == 0 {
            return Ok(0.0);
        }

        let mut correct = 0;
        for (features, target) in matrix.features.iter().zip(&matrix.targets) {
            let output = self.predict(features)?;
            if argmax(&output) == argmax(target) {
                correct += 1;
            }
        }
        Ok(correct as f32 / matrix.rows() as f32)
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.inputs)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, |l| l.outputs)
    }

    /// Layer widths, e.g. `12-128-64-3`.
    pub fn describe(&self) -> String {
        let mut widths = vec![self.input_size().to_string()];
        widths.extend(self.layers.iter().map(|l| l.outputs.to_string()));
        widths.join("-")
    }

    /// Save the network as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| ChatError::write(path, e))?;
        Ok(())
    }

    /// Load a network saved by [`FeedForwardNetwork::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ChatError::artifact_missing(format!("classifier {}: {e}", path.display()))
        })?;

        let network: FeedForwardNetwork = serde_json::from_str(&content).map_err(|e| {
            ChatError::backend_unavailable(format!(
                "{} is not an mlp classifier: {e}",
                path.display()
            ))
        })?;

        network.check_shapes().map_err(|msg| {
            ChatError::backend_unavailable(format!("{}: {msg}", path.display()))
        })?;
        Ok(network)
    }

    fn check_shapes(&self) -> std::result::Result<(), String> {
        let Some(last) = self.layers.last() else {
            return Err("network has no layers".to_string());
        };
        if last.activation != Activation::Softmax {
            return Err("output layer must be softmax".to_string());
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(format!("invalid dropout {}", self.dropout));
        }

        let mut inputs = self.input_size();
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.inputs != inputs
                || layer.inputs == 0
                || layer.weights.len() != layer.inputs * layer.outputs
                || layer.biases.len() != layer.outputs
            {
                return Err(format!("layer {i} has inconsistent dimensions"));
            }
            inputs = layer.outputs;
        }
        Ok(())
    }
}

impl Classifier for FeedForwardNetwork {
    fn predict_proba(&self, features: &[f32]) -> Result<Vec<f32>> {
        self.predict(features)
    }

    fn input_size(&self) -> usize {
        FeedForwardNetwork::input_size(self)
    }

    fn output_size(&self) -> usize {
        FeedForwardNetwork::output_size(self)
    }

    fn save(&self, path: &Path) -> Result<()> {
        FeedForwardNetwork::save(self, path)
    }

    fn name(&self) -> &'static str {
        "mlp"
    }
}

/// Backend producing [`FeedForwardNetwork`] classifiers.
#[derive(Debug, Clone, Default)]
pub struct MlpBackend;

impl MlpBackend {
    pub fn new() -> Self {
        MlpBackend
    }
}

impl ClassifierBackend for MlpBackend {
    fn name(&self) -> &'static str {
        "mlp"
    }

    fn extension(&self) -> &'static str {
        MLP_EXTENSION
    }

    fn fit(
        &self,
        matrix: &TrainingMatrix,
        config: &TrainingConfig,
        rng: &mut StdRng,
        on_epoch: &mut dyn FnMut(usize, f32),
    ) -> Result<FitOutcome> {
        let mut network = FeedForwardNetwork::new(
            matrix.input_size(),
            &config.hidden_layers,
            matrix.output_size(),
            config.dropout,
            rng,
        )?;
        let stats = network.fit(matrix, config, rng, on_epoch)?;

        Ok(FitOutcome {
            classifier: Box::new(network),
            stats,
        })
    }

    fn load(&self, path: &Path) -> Result<Box<dyn Classifier>> {
        Ok(Box::new(FeedForwardNetwork::load(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use tempfile::TempDir;

    fn xor_like_matrix() -> TrainingMatrix {
        // Three disjoint word groups, one per class.
        TrainingMatrix {
            features: vec![
                vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0],
                vec![0.0, 0.0, 1.0, 0.0, 0.0, 0.0],
                vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0],
                vec![0.0, 0.0, 0.0, 0.0, 1.0, 0.0],
                vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0],
            ],
            targets: vec![
                vec![1.0, 0.0, 0.0],
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0],
                vec![0.0, 0.0, 1.0],
            ],
        }
    }

    fn quick_config() -> TrainingConfig {
        TrainingConfig {
            epochs: 200,
            batch_size: 2,
            hidden_layers: vec![16],
            dropout: 0.0,
            learning_rate: 0.05,
            seed: Some(11),
            ..Default::default()
        }
    }

    #[test]
    fn test_predict_is_distribution() {
        let mut rng = StdRng::seed_from_u64(1);
        let network = FeedForwardNetwork::new(4, &[8, 4], 3, 0.5, &mut rng).unwrap();

        let output = network.predict(&[1.0, 0.0, 1.0, 0.0]).unwrap();
        assert_eq!(output.len(), 3);
        assert!((output.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!(output.iter().all(|p| *p >= 0.0));
        assert_eq!(network.describe(), "4-8-4-3");
    }

    #[test]
    fn test_predict_wrong_width() {
        let mut rng = StdRng::seed_from_u64(1);
        let network = FeedForwardNetwork::new(4, &[8], 2, 0.0, &mut rng).unwrap();

        let result = network.predict(&[1.0, 0.0]);
        assert!(matches!(result, Err(ChatError::Inference(_))));
    }

    #[test]
    fn test_fit_learns_separable_data() {
        let matrix = xor_like_matrix();
        let config = quick_config();
        let mut rng = StdRng::seed_from_u64(11);
        let mut network = FeedForwardNetwork::new(6, &[16], 3, 0.0, &mut rng).unwrap();

        let mut epochs_seen = 0;
        let stats = network
            .fit(&matrix, &config, &mut rng, &mut |_, _| epochs_seen += 1)
            .unwrap();

        assert_eq!(epochs_seen, 200);
        assert_eq!(stats.epochs, 200);
        assert!(stats.final_loss < stats.epoch_losses[0]);
        assert_eq!(stats.training_accuracy, 1.0);
    }

    #[test]
    fn test_fit_with_dropout_reduces_loss() {
        let matrix = xor_like_matrix();
        let config = TrainingConfig {
            dropout: 0.5,
            hidden_layers: vec![32, 16],
            ..quick_config()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let mut network = FeedForwardNetwork::new(6, &[32, 16], 3, 0.5, &mut rng).unwrap();

        let stats = network.fit(&matrix, &config, &mut rng, &mut |_, _| {}).unwrap();
        assert!(stats.final_loss < stats.epoch_losses[0]);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("model.mlp.json");
        let mut rng = StdRng::seed_from_u64(3);
        let network = FeedForwardNetwork::new(3, &[4], 2, 0.5, &mut rng).unwrap();

        network.save(&path).unwrap();
        let loaded = FeedForwardNetwork::load(&path).unwrap();

        let input = [1.0, 0.0, 1.0];
        let expected = network.predict(&input).unwrap();
        let actual = loaded.predict(&input).unwrap();
        for (a, b) in expected.iter().zip(&actual) {
            assert!((a - b).abs() < 1e-6);
        }
        assert_eq!(loaded.describe(), "3-4-2");
    }

    #[test]
    fn test_load_garbage_is_backend_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("model.mlp.json");
        std::fs::write(&path, "not a real model").unwrap();

        let result = FeedForwardNetwork::load(&path);
        assert!(matches!(result, Err(ChatError::BackendUnavailable(_))));
    }

    #[test]
    fn test_load_inconsistent_shapes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("model.mlp.json");
        let mut rng = StdRng::seed_from_u64(3);
        let mut network = FeedForwardNetwork::new(3, &[4], 2, 0.5, &mut rng).unwrap();
        network.layers[0].biases.pop();
        network.save(&path).unwrap();

        let result = FeedForwardNetwork::load(&path);
        assert!(matches!(result, Err(ChatError::BackendUnavailable(_))));
    }

    #[test]
    fn test_backend_fit() {
        let backend = MlpBackend::new();
        let mut rng = StdRng::seed_from_u64(2);
        let outcome = backend
            .fit(&xor_like_matrix(), &quick_config(), &mut rng, &mut |_, _| {})
            .unwrap();

        assert_eq!(outcome.classifier.input_size(), 6);
        assert_eq!(outcome.classifier.output_size(), 3);
        assert_eq!(outcome.classifier.name(), "mlp");
    }
}
