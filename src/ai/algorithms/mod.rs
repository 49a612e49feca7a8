mod dqn;

pub use dqn::{double_dqn_targets, huber_loss, DqnAgent, DqnConfig, TrainingState};
