mod agent;
pub mod algorithms;
pub mod networks;
pub mod policy;
mod random;
pub mod state_encoding;

pub use agent::{
    Agent, TrainOutcome, Transition, UpdateMetrics, DRAW_REWARD, LOSS_REWARD, WIN_REWARD,
};
pub use algorithms::{DqnAgent, DqnConfig, TrainingState};
pub use networks::{QNetwork, QNetworkConfig};
pub use policy::{Difficulty, EpsilonSchedule};
pub use random::RandomAgent;
