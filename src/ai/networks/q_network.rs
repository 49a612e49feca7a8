use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkBytesRecorder, Recorder, RecorderError};

use crate::game::CELLS;

/// Action-value network for tic-tac-toe.
///
/// ```text
/// Input:  [batch, 9]   perspective board (+1 own, -1 opponent, 0 empty)
/// FC1:    9 -> hidden, ReLU
/// FC2:    hidden -> hidden, ReLU
/// Head:   hidden -> 9  (Q-values, one per cell)
/// ```
#[derive(Module, Debug)]
pub struct QNetwork<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
    head: Linear<B>,
    relu: Relu,
}

#[derive(Config, Debug)]
pub struct QNetworkConfig {
    #[config(default = 64)]
    pub hidden_size: usize,
}

impl QNetworkConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> QNetwork<B> {
        QNetwork {
            fc1: LinearConfig::new(CELLS, self.hidden_size).init(device),
            fc2: LinearConfig::new(self.hidden_size, self.hidden_size).init(device),
            head: LinearConfig::new(self.hidden_size, CELLS).init(device),
            relu: Relu::new(),
        }
    }
}

impl<B: Backend> QNetwork<B> {
    /// Forward pass: input [batch, 9] -> output [batch, 9] Q-values.
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.relu.forward(self.fc1.forward(input));
        let x = self.relu.forward(self.fc2.forward(x));
        self.head.forward(x)
    }

    /// Serialize the parameters to an opaque byte snapshot.
    pub fn snapshot(&self) -> Result<Vec<u8>, RecorderError> {
        let recorder = NamedMpkBytesRecorder::<FullPrecisionSettings>::default();
        Recorder::<B>::record(&recorder, self.clone().into_record(), ())
    }

    /// Replace the parameters with those of a snapshot taken from a network
    /// of the same shape.
    pub fn restore(self, bytes: Vec<u8>, device: &B::Device) -> Result<Self, RecorderError> {
        let recorder = NamedMpkBytesRecorder::<FullPrecisionSettings>::default();
        let record: <Self as Module<B>>::Record = Recorder::<B>::load(&recorder, bytes, device)?;
        Ok(self.load_record(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_network_output_shape() {
        let device = Default::default();
        let network = QNetworkConfig::new().init::<TestBackend>(&device);

        let input = Tensor::zeros([4, 9], &device);
        let output = network.forward(input);
        assert_eq!(output.shape().dims, [4, 9]);
    }

    #[test]
    fn test_snapshot_restore_reproduces_outputs() {
        let device = Default::default();
        let config = QNetworkConfig::new().with_hidden_size(16);
        let source = config.init::<TestBackend>(&device);
        let fresh = config.init::<TestBackend>(&device);

        let bytes = source.snapshot().unwrap();
        let restored = fresh.restore(bytes, &device).unwrap();

        let input = Tensor::<TestBackend, 2>::ones([1, 9], &device);
        let a: Vec<f32> = source.forward(input.clone()).into_data().iter::<f32>().collect();
        let b: Vec<f32> = restored.forward(input).into_data().iter::<f32>().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_restore_rejects_garbage() {
        let device = Default::default();
        let network = QNetworkConfig::new().init::<TestBackend>(&device);
        assert!(network.restore(vec![1, 2, 3], &device).is_err());
    }
}
