use serde::{Deserialize, Serialize};

use crate::ai::algorithms::DqnConfig;

pub const CHECKPOINT_FORMAT_VERSION: u32 = 1;

/// Hyperparameters recorded in checkpoint metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointHyperparameters {
    pub learning_rate: f64,
    pub gamma: f32,
    pub batch_size: usize,
    pub target_update_interval: usize,
    pub replay_capacity: usize,
    pub min_replay_size: usize,
    pub epsilon_start: f32,
    pub epsilon_end: f32,
    pub epsilon_decay_steps: usize,
    pub hidden_size: usize,
}

impl From<&DqnConfig> for CheckpointHyperparameters {
    fn from(config: &DqnConfig) -> Self {
        CheckpointHyperparameters {
            learning_rate: config.learning_rate,
            gamma: config.gamma,
            batch_size: config.batch_size,
            target_update_interval: config.target_update_interval,
            replay_capacity: config.replay_capacity,
            min_replay_size: config.min_replay_size,
            epsilon_start: config.epsilon_start,
            epsilon_end: config.epsilon_end,
            epsilon_decay_steps: config.epsilon_decay_steps,
            hidden_size: config.hidden_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub format_version: u32,
    pub timestamp: u64,
    pub hyperparameters: CheckpointHyperparameters,
}

/// Everything a checkpoint persists, written as one MessagePack unit.
///
/// Only `q_network` is mandatory. Older checkpoints may lack the target
/// network, the optimizer state or the counters; loading fills those in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointBlob {
    #[serde(default)]
    pub metadata: Option<CheckpointMetadata>,
    #[serde(with = "serde_bytes")]
    pub q_network: Vec<u8>,
    #[serde(default, with = "serde_bytes")]
    pub target_network: Option<Vec<u8>>,
    #[serde(default, with = "serde_bytes")]
    pub optimizer: Option<Vec<u8>>,
    #[serde(default)]
    pub step_count: usize,
    #[serde(default)]
    pub epsilon: Option<f32>,
    #[serde(default)]
    pub train_updates: usize,
}

/// What a successful load restored beyond the online network.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreReport {
    pub target_restored: bool,
    pub optimizer_restored: bool,
    pub metadata: Option<CheckpointMetadata>,
}
