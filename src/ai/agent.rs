use crate::ai::state_encoding::{ActionMask, StateVector};
use crate::game::GameState;

pub const WIN_REWARD: f32 = 1.0;
pub const LOSS_REWARD: f32 = -1.0;
pub const DRAW_REWARD: f32 = 0.0;

/// A single step of experience for RL training.
///
/// `next_state` is the position the mover will face after the opponent's
/// reply is known, encoded from the perspective of whoever moves next;
/// `next_valid_mask` lists the moves available there.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: StateVector,
    pub action: usize,
    pub reward: f32,
    pub next_state: StateVector,
    pub done: bool,
    pub next_valid_mask: ActionMask,
}

impl Transition {
    /// Close out a transition with its terminal reward.
    pub fn finish(mut self, reward: f32) -> Self {
        self.reward = reward;
        self.done = true;
        self
    }
}

/// Metrics returned from a training update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UpdateMetrics {
    pub loss: f32,
    pub train_updates: usize,
    pub target_synced: bool,
}

/// Result of asking the trainer for one gradient step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrainOutcome {
    /// The replay buffer holds fewer transitions than required; nothing ran.
    NotReady { buffered: usize, required: usize },
    Updated(UpdateMetrics),
}

impl TrainOutcome {
    pub fn loss(&self) -> Option<f32> {
        match self {
            TrainOutcome::Updated(metrics) => Some(metrics.loss),
            TrainOutcome::NotReady { .. } => None,
        }
    }
}

/// Anything that can pick a move for the side to play.
pub trait Agent {
    /// Select a cell for the player on turn, exploring with probability
    /// `epsilon`. `None` when the position has no legal move.
    fn select_action(&mut self, state: &GameState, epsilon: f32) -> Option<usize>;

    /// Return the agent's display name.
    fn name(&self) -> &str;
}
