//! Convolutional perception network using the Burn framework

use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::{Linear, LinearConfig, Relu};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::ElementConversion;
use burn::tensor::activation::{log_softmax, softmax};
use burn::tensor::backend::AutodiffBackend;
use ndarray::Array3;

use crate::error::TrainError;

/// Configuration for the perception network
#[derive(Debug, Config)]
pub struct PerceptionConfig {
    /// Screen side length; the network outputs one score per screen cell
    pub screen_size: usize,
    /// Input channels (frames per state)
    pub channels: usize,
    /// Convolution output channels
    pub filters: usize,
    pub kernel_size: usize,
    /// Pool window side, also its stride
    pub pool_size: usize,
    /// Adam step size
    pub learning_rate: f64,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            screen_size: 64,
            channels: 1,
            filters: 256,
            kernel_size: 5,
            pool_size: 2,
            learning_rate: 1e-3,
        }
    }
}

impl PerceptionConfig {
    /// Side of the convolution output (valid padding, stride 1)
    pub fn conv_output_size(&self) -> usize {
        (self.screen_size + 1).saturating_sub(self.kernel_size)
    }

    pub fn pooled_size(&self) -> usize {
        self.conv_output_size() / self.pool_size.max(1)
    }

    pub fn flatten_size(&self) -> usize {
        self.filters * self.pooled_size() * self.pooled_size()
    }

    /// Smallest screen leaving at least one cell after convolution and pooling
    pub fn min_screen_size(&self) -> usize {
        self.kernel_size + self.pool_size.max(1) - 1
    }

    pub fn nb_actions(&self) -> usize {
        self.screen_size * self.screen_size
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> PerceptionNetwork<B> {
        PerceptionNetwork::new(device, self)
    }
}

/// Conv -> ReLU -> max-pool -> flatten -> dense, scored with softmax
#[derive(Module, Debug)]
pub struct PerceptionNetwork<B: Backend> {
    conv: Conv2d<B>,
    pool: MaxPool2d,
    output: Linear<B>,
    activation: Relu,
}

impl<B: Backend> PerceptionNetwork<B> {
    pub fn new(device: &B::Device, config: &PerceptionConfig) -> Self {
        let conv = Conv2dConfig::new(
            [config.channels, config.filters],
            [config.kernel_size, config.kernel_size],
        )
        .init(device);
        let pool = MaxPool2dConfig::new([config.pool_size, config.pool_size])
            .with_strides([config.pool_size, config.pool_size])
            .init();
        let output = LinearConfig::new(config.flatten_size(), config.nb_actions()).init(device);

        Self {
            conv,
            pool,
            output,
            activation: Relu::new(),
        }
    }

    /// Raw logits, `images` is `[batch, channels, height, width]`
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.activation.forward(self.conv.forward(images));
        let x = self.pool.forward(x);
        self.output.forward(x.flatten(1, 3))
    }

    /// One probability per screen cell
    pub fn scores(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        softmax(self.forward(images), 1)
    }

    pub fn save_weights(&self, path: &str) -> Result<(), TrainError> {
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        self.clone()
            .save_file(path, &recorder)
            .map_err(|err| TrainError::Checkpoint {
                path: path.to_string(),
                message: format!("{:?}", err),
            })?;
        tracing::info!("Saved weights to {}", path);
        Ok(())
    }

    pub fn load_weights(self, path: &str, device: &B::Device) -> Result<Self, TrainError> {
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let network = self
            .load_file(path, &recorder, device)
            .map_err(|err| TrainError::Checkpoint {
                path: path.to_string(),
                message: format!("{:?}", err),
            })?;
        tracing::info!("Loaded weights from {}", path);
        Ok(network)
    }
}

/// Stacks `(height, width, channels)` images into a `[batch, channels, height, width]` tensor.
///
/// All images must share the shape of the first.
pub fn images_to_tensor<B: Backend>(
    images: &[Array3<f32>],
    device: &B::Device,
) -> Result<Tensor<B, 4>, TrainError> {
    let first = images
        .first()
        .ok_or_else(|| TrainError::Tensor("empty image batch".to_string()))?;
    let (height, width, channels) = first.dim();
    if let Some(image) = images.iter().find(|image| image.dim() != first.dim()) {
        return Err(TrainError::Tensor(format!(
            "image of shape {:?} in a batch of {:?}",
            image.dim(),
            first.dim()
        )));
    }

    let flat: Vec<f32> = images.iter().flat_map(|image| image.iter().copied()).collect();
    Ok(Tensor::<B, 1>::from_floats(flat.as_slice(), device)
        .reshape([images.len(), height, width, channels])
        .permute([0, 3, 1, 2]))
}

/// Loss and accuracy of one optimisation step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchMetrics {
    pub loss: f32,
    pub accuracy: f32,
}

/// The network paired with Adam and categorical cross-entropy.
///
/// A supervised step towards given target distributions; the deep-Q driver
/// only runs inference and performs no Q updates.
pub struct PerceptionTrainer<B: AutodiffBackend, O: Optimizer<PerceptionNetwork<B>, B>> {
    model: PerceptionNetwork<B>,
    optimizer: O,
    learning_rate: f64,
}

/// Pairs `model` with a fresh Adam optimiser at the configured step size
pub fn compile<B: AutodiffBackend>(
    model: PerceptionNetwork<B>,
    config: &PerceptionConfig,
) -> PerceptionTrainer<B, impl Optimizer<PerceptionNetwork<B>, B>> {
    PerceptionTrainer {
        model,
        optimizer: AdamConfig::new().init::<B, PerceptionNetwork<B>>(),
        learning_rate: config.learning_rate,
    }
}

impl<B: AutodiffBackend, O: Optimizer<PerceptionNetwork<B>, B>> PerceptionTrainer<B, O> {
    /// One gradient step towards `targets`, a probability row per image
    pub fn train_batch(&mut self, images: Tensor<B, 4>, targets: Tensor<B, 2>) -> BatchMetrics {
        let logits = self.model.forward(images);

        let hits = logits
            .clone()
            .argmax(1)
            .equal(targets.clone().argmax(1))
            .float()
            .mean();
        let loss = -(targets * log_softmax(logits, 1)).sum_dim(1).mean();

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = self
            .optimizer
            .step(self.learning_rate, self.model.clone(), grads);

        BatchMetrics {
            loss: loss.into_scalar().elem::<f32>(),
            accuracy: hits.into_scalar().elem::<f32>(),
        }
    }

    pub fn model(&self) -> &PerceptionNetwork<B> {
        &self.model
    }

    pub fn into_model(self) -> PerceptionNetwork<B> {
        self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use ndarray::Array3;

    type TestBackend = NdArray;
    type TestAutodiffBackend = Autodiff<NdArray>;

    fn small_config() -> PerceptionConfig {
        PerceptionConfig {
            screen_size: 8,
            channels: 1,
            filters: 2,
            kernel_size: 3,
            pool_size: 2,
            learning_rate: 1e-2,
        }
    }

    #[test]
    fn test_reference_config_sizes() {
        let config = PerceptionConfig::default();
        assert_eq!(config.conv_output_size(), 60);
        assert_eq!(config.pooled_size(), 30);
        assert_eq!(config.flatten_size(), 256 * 30 * 30);
        assert_eq!(config.nb_actions(), 4096);
    }

    #[test]
    fn test_images_to_tensor_layout() {
        let device = Default::default();
        let mut image = Array3::zeros((8, 8, 1));
        image[[2, 5, 0]] = 4.0;

        let tensor = images_to_tensor::<TestBackend>(&[image.clone(), image], &device).unwrap();
        assert_eq!(tensor.dims(), [2, 1, 8, 8]);

        let values: Vec<f32> = tensor.into_data().to_vec().unwrap();
        assert_eq!(values[2 * 8 + 5], 4.0);
        assert_eq!(values[64 + 2 * 8 + 5], 4.0);
        assert_eq!(values.iter().filter(|&&v| v != 0.0).count(), 2);
    }

    #[test]
    fn test_images_to_tensor_rejects_bad_batches() {
        let device = Default::default();
        assert!(matches!(
            images_to_tensor::<TestBackend>(&[], &device),
            Err(TrainError::Tensor(_))
        ));

        let mixed = [Array3::zeros((8, 8, 1)), Array3::zeros((4, 4, 1))];
        assert!(matches!(
            images_to_tensor::<TestBackend>(&mixed, &device),
            Err(TrainError::Tensor(_))
        ));
    }

    #[test]
    fn test_smallest_screen_runs_forward() {
        let device = Default::default();
        let reference = PerceptionConfig::default();
        assert_eq!(reference.min_screen_size(), 6);

        let config = PerceptionConfig {
            screen_size: reference.min_screen_size(),
            filters: 2,
            ..reference
        };
        assert_eq!(config.pooled_size(), 1);

        let network = config.init::<TestBackend>(&device);
        let images = images_to_tensor(&[Array3::zeros((6, 6, 1))], &device).unwrap();
        assert_eq!(network.scores(images).dims(), [1, 36]);
    }

    #[test]
    fn test_scores_are_distribution_per_cell() {
        let device = Default::default();
        let config = small_config();
        let network = config.init::<TestBackend>(&device);

        let images = vec![Array3::from_elem((8, 8, 1), 1.0); 3];
        let scores = network.scores(images_to_tensor(&images, &device).unwrap());
        assert_eq!(scores.dims(), [3, 64]);

        let sums: Vec<f32> = scores.sum_dim(1).into_data().to_vec().unwrap();
        for sum in sums {
            assert!((sum - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_train_batch_reduces_loss() {
        let device = Default::default();
        let config = small_config();
        let mut trainer = compile(config.init::<TestAutodiffBackend>(&device), &config);

        let mut image = Array3::zeros((8, 8, 1));
        image[[1, 1, 0]] = 4.0;
        let images = images_to_tensor::<TestAutodiffBackend>(&[image], &device).unwrap();
        let mut target = vec![0.0f32; 64];
        target[9] = 1.0;
        let targets = Tensor::<TestAutodiffBackend, 1>::from_floats(target.as_slice(), &device)
            .reshape([1, 64]);

        let first = trainer.train_batch(images.clone(), targets.clone());
        let mut last = first;
        for _ in 0..30 {
            last = trainer.train_batch(images.clone(), targets.clone());
        }

        assert!(first.loss.is_finite());
        assert!(last.loss < first.loss);
        assert_eq!(last.accuracy, 1.0);
    }

    #[test]
    fn test_weights_round_trip_through_file() {
        let device = Default::default();
        let config = small_config();
        let network = config.init::<TestBackend>(&device);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights");
        let path = path.to_str().unwrap();

        network.save_weights(path).unwrap();
        let restored = config
            .init::<TestBackend>(&device)
            .load_weights(path, &device)
            .unwrap();

        let images = images_to_tensor(&[Array3::from_elem((8, 8, 1), 3.0)], &device).unwrap();
        let expected: Vec<f32> = network.forward(images.clone()).into_data().to_vec().unwrap();
        let actual: Vec<f32> = restored.forward(images).into_data().to_vec().unwrap();
        assert_eq!(expected, actual);
    }

    #[test]
    fn test_missing_weights_file_is_checkpoint_error() {
        let device = Default::default();
        let network = small_config().init::<TestBackend>(&device);
        let result = network.load_weights("/nonexistent/hallucinice/weights", &device);
        assert!(matches!(result, Err(TrainError::Checkpoint { .. })));
    }
}
