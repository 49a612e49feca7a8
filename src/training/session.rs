use log::debug;

use crate::ai::state_encoding::{encode_state, next_action_mask, StateVector};
use crate::ai::{Difficulty, DqnAgent, Transition, DRAW_REWARD, LOSS_REWARD, WIN_REWARD};
use crate::error::TrainingError;
use crate::game::{GameOutcome, GameState, Player};

/// Where an interactive game stands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionStatus {
    InProgress { to_move: Player },
    Finished(GameOutcome),
}

impl SessionStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, SessionStatus::Finished(_))
    }
}

/// Agent's last move, waiting for the human reply to complete it.
#[derive(Debug, Clone)]
struct PendingMove {
    state: StateVector,
    action: usize,
}

/// One human-vs-agent game.
///
/// The agent plays at a fixed serving difficulty. Every agent move becomes a
/// transition once the human reply is known, so that `next_state` is the
/// position the agent actually faces next. With learning enabled each
/// completed transition also advances the training schedule and runs the
/// configured gradient steps.
pub struct InteractiveSession {
    state: GameState,
    agent_side: Player,
    difficulty: Difficulty,
    learning: bool,
    pending: Option<PendingMove>,
}

impl InteractiveSession {
    pub fn new(agent_side: Player, difficulty: Difficulty) -> Self {
        InteractiveSession {
            state: GameState::initial(),
            agent_side,
            difficulty,
            learning: false,
            pending: None,
        }
    }

    pub fn with_learning(mut self, learning: bool) -> Self {
        self.learning = learning;
        self
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn agent_side(&self) -> Player {
        self.agent_side
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn status(&self) -> SessionStatus {
        match self.state.outcome() {
            Some(outcome) => SessionStatus::Finished(outcome),
            None => SessionStatus::InProgress {
                to_move: self.state.current_player(),
            },
        }
    }

    /// Let the agent move. Returns the chosen cell, or `None` if the game is
    /// already over.
    pub fn agent_move(&mut self, agent: &mut DqnAgent) -> Result<Option<usize>, TrainingError> {
        if self.state.is_terminal() {
            return Ok(None);
        }
        if self.state.current_player() != self.agent_side {
            return Err(TrainingError::OutOfTurn("agent"));
        }

        let board = *self.state.board();
        let encoded = encode_state(&board, self.agent_side);
        let Some(action) = agent.request_action(&board, self.agent_side, self.difficulty) else {
            return Ok(None);
        };
        self.state = self.state.apply_move(action)?;

        match self.state.outcome() {
            Some(outcome) => {
                let reward = match outcome {
                    GameOutcome::Winner(_) => WIN_REWARD,
                    GameOutcome::Draw => DRAW_REWARD,
                };
                let after = *self.state.board();
                let terminal = Transition {
                    state: encoded,
                    action,
                    reward,
                    next_state: encode_state(&after, self.agent_side),
                    done: true,
                    next_valid_mask: next_action_mask(&after),
                };
                self.commit(agent, terminal);
            }
            None => {
                self.pending = Some(PendingMove {
                    state: encoded,
                    action,
                });
            }
        }
        Ok(Some(action))
    }

    /// Apply the human's move and complete the agent's pending transition.
    pub fn human_move(
        &mut self,
        agent: &mut DqnAgent,
        cell: usize,
    ) -> Result<SessionStatus, TrainingError> {
        if self.state.is_terminal() || self.state.current_player() == self.agent_side {
            return Err(TrainingError::OutOfTurn("human"));
        }
        self.state = self.state.apply_move(cell)?;

        if let Some(pending) = self.pending.take() {
            let after = *self.state.board();
            let (reward, done) = match self.state.outcome() {
                Some(GameOutcome::Winner(_)) => (LOSS_REWARD, true),
                Some(GameOutcome::Draw) => (DRAW_REWARD, true),
                None => (0.0, false),
            };
            let transition = Transition {
                state: pending.state,
                action: pending.action,
                reward,
                next_state: encode_state(&after, self.agent_side),
                done,
                next_valid_mask: next_action_mask(&after),
            };
            self.commit(agent, transition);
        }
        Ok(self.status())
    }

    /// Drop an agent move that can no longer be completed, e.g. when the game
    /// is abandoned. Returns whether anything was discarded.
    pub fn finalize(&mut self) -> bool {
        let discarded = self.pending.take().is_some();
        if discarded {
            debug!("discarding unfinished agent transition");
        }
        discarded
    }

    /// Start a new game with the same settings.
    pub fn reset(&mut self) {
        self.finalize();
        self.state = GameState::initial();
    }

    fn commit(&mut self, agent: &mut DqnAgent, transition: Transition) {
        agent.remember(transition);
        if self.learning {
            agent.advance_epsilon();
            agent.train_after_ply();
        }
    }
}
