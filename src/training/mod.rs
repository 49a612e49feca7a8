//! Training infrastructure: self-play driver, pending-transition slots,
//! replay buffer, interactive session, metrics and the episode trainer.

pub mod episode;
pub mod metrics;
pub mod pending;
pub mod replay_buffer;
pub mod session;
pub mod trainer;

pub use episode::{evaluate, play_self_play_episode, EpisodeTrace, EvaluationReport};
pub use session::{InteractiveSession, SessionStatus};
pub use trainer::{Trainer, TrainerConfig, TrainingSummary};
