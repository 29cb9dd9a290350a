//! CNN Model Architecture for Face-Mask Classification
//!
//! Two valid-padding convolution blocks followed by three dense layers.
//! The head applies a per-class sigmoid rather than a softmax, so the two
//! scores are independent values in (0, 1).

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, Relu,
    },
    tensor::{activation::sigmoid, backend::Backend, Tensor},
};

/// Configuration for the FaceMaskCnn model
#[derive(Config, Debug)]
pub struct FaceMaskCnnConfig {
    /// Number of output classes
    #[config(default = "2")]
    pub num_classes: usize,

    /// Input image size (square images)
    #[config(default = "128")]
    pub image_size: usize,

    /// Number of input channels (3 for RGB)
    #[config(default = "3")]
    pub in_channels: usize,

    /// Filters of the first convolution
    #[config(default = "32")]
    pub conv1_filters: usize,

    /// Filters of the second convolution
    #[config(default = "64")]
    pub conv2_filters: usize,

    /// Side of both convolution kernels
    #[config(default = "3")]
    pub kernel_size: usize,

    /// Units of the first dense layer
    #[config(default = "128")]
    pub dense1_units: usize,

    /// Units of the second dense layer
    #[config(default = "64")]
    pub dense2_units: usize,

    /// Dropout rate after each hidden dense layer
    #[config(default = "0.5")]
    pub dropout: f64,
}

impl FaceMaskCnnConfig {
    /// Spatial side after one valid convolution and one 2x2 pool
    fn block_output(&self, side: usize) -> usize {
        (side + 1 - self.kernel_size) / 2
    }

    /// Length of the flattened feature vector fed to the first dense layer
    ///
    /// 128 -> conv 126 -> pool 63 -> conv 61 -> pool 30, so 64 * 30 * 30.
    pub fn flattened_features(&self) -> usize {
        let side = self.block_output(self.block_output(self.image_size));
        self.conv2_filters * side * side
    }

    /// Create the model on `device`
    pub fn init<B: Backend>(&self, device: &B::Device) -> FaceMaskCnn<B> {
        FaceMaskCnn::new(self, device)
    }
}

/// Face-mask classifier CNN
///
/// Architecture:
/// - Conv(3->32, 3x3, valid) + ReLU + MaxPool(2x2)
/// - Conv(32->64, 3x3, valid) + ReLU + MaxPool(2x2)
/// - Flatten
/// - Dense(128) + ReLU + Dropout(0.5)
/// - Dense(64) + ReLU + Dropout(0.5)
/// - Dense(2) + sigmoid
#[derive(Module, Debug)]
pub struct FaceMaskCnn<B: Backend> {
    pub conv1: Conv2d<B>,
    pub pool1: MaxPool2d,
    pub conv2: Conv2d<B>,
    pub pool2: MaxPool2d,

    pub fc1: Linear<B>,
    pub dropout1: Dropout,
    pub fc2: Linear<B>,
    pub dropout2: Dropout,
    pub output: Linear<B>,

    relu: Relu,
    num_classes: usize,
}

impl<B: Backend> FaceMaskCnn<B> {
    /// Create a new model from configuration
    pub fn new(config: &FaceMaskCnnConfig, device: &B::Device) -> Self {
        let kernel = [config.kernel_size, config.kernel_size];

        // Valid padding is Conv2dConfig's default
        let conv1 = Conv2dConfig::new([config.in_channels, config.conv1_filters], kernel).init(device);
        let conv2 =
            Conv2dConfig::new([config.conv1_filters, config.conv2_filters], kernel).init(device);

        let pool1 = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();
        let pool2 = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        let fc1 = LinearConfig::new(config.flattened_features(), config.dense1_units).init(device);
        let fc2 = LinearConfig::new(config.dense1_units, config.dense2_units).init(device);
        let output = LinearConfig::new(config.dense2_units, config.num_classes).init(device);

        Self {
            conv1,
            pool1,
            conv2,
            pool2,
            fc1,
            dropout1: DropoutConfig::new(config.dropout).init(),
            fc2,
            dropout2: DropoutConfig::new(config.dropout).init(),
            output,
            relu: Relu::new(),
            num_classes: config.num_classes,
        }
    }

    /// Forward pass through the network
    ///
    /// # Arguments
    /// * `x` - Input tensor of shape [batch_size, 3, 128, 128], values in [0, 1]
    ///
    /// # Returns
    /// * Sigmoid scores of shape [batch_size, num_classes]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool1.forward(self.relu.forward(self.conv1.forward(x)));
        let x = self.pool2.forward(self.relu.forward(self.conv2.forward(x)));

        // Flatten: [B, C, H, W] -> [B, C * H * W]
        let [batch_size, channels, height, width] = x.dims();
        let x = x.reshape([batch_size, channels * height * width]);

        let x = self.dropout1.forward(self.relu.forward(self.fc1.forward(x)));
        let x = self.dropout2.forward(self.relu.forward(self.fc2.forward(x)));

        sigmoid(self.output.forward(x))
    }

    /// Get the number of output classes
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_flattened_features() {
        assert_eq!(FaceMaskCnnConfig::new().flattened_features(), 64 * 30 * 30);
        assert_eq!(
            FaceMaskCnnConfig::new().with_image_size(32).flattened_features(),
            64 * 6 * 6
        );
    }

    #[test]
    fn test_output_shape_and_range() {
        let device = Default::default();
        let model = FaceMaskCnnConfig::new().init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::ones([2, 3, 128, 128], &device);
        let output = model.forward(input);
        assert_eq!(output.dims(), [2, 2]);

        let scores: Vec<f32> = output.into_data().to_vec().unwrap();
        assert!(scores.iter().all(|&s| s > 0.0 && s < 1.0));
    }

    #[test]
    fn test_small_input_config() {
        let device = Default::default();
        let config = FaceMaskCnnConfig::new().with_image_size(32);
        let model = FaceMaskCnn::<TestBackend>::new(&config, &device);

        let input = Tensor::<TestBackend, 4>::zeros([3, 3, 32, 32], &device);
        assert_eq!(model.forward(input).dims(), [3, 2]);
        assert_eq!(model.num_classes(), 2);
    }
}
