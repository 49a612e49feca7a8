use log::trace;

use crate::ai::state_encoding::{encode_state, next_action_mask};
use crate::ai::{
    Agent, DqnAgent, RandomAgent, Transition, DRAW_REWARD, LOSS_REWARD, WIN_REWARD,
};
use crate::error::TrainingError;
use crate::game::{GameOutcome, GameState, Player};
use crate::training::metrics::EpisodeResult;
use crate::training::pending::PendingTransitions;

/// Result of playing a single self-play episode.
pub struct EpisodeTrace {
    /// Every transition pushed to the replay buffer, in push order.
    pub transitions: Vec<Transition>,
    pub result: EpisodeResult,
    /// Loss of the last gradient step run during the episode.
    pub last_loss: Option<f32>,
}

/// Play one self-play episode with the agent on both sides.
///
/// Each ply follows the training epsilon, then advances it and runs the
/// configured gradient steps. A ply's transition reaches the replay buffer
/// once the same side moves again, or at the end of the game, where the
/// losing (or drawing) side's last transition is closed with its final
/// reward.
pub fn play_self_play_episode(agent: &mut DqnAgent) -> Result<EpisodeTrace, TrainingError> {
    let mut state = GameState::initial();
    let mut pending = PendingTransitions::new();
    let mut transitions = Vec::with_capacity(9);
    let mut last_loss = None;
    let mut plies = 0;

    while !state.is_terminal() {
        let mover = state.current_player();
        let board = *state.board();
        let encoded = encode_state(&board, mover);
        let legal = state.legal_actions();

        let action = agent
            .act_training(&encoded, &legal)
            .ok_or(TrainingError::NoLegalMove)?;
        if !legal.contains(&action) {
            return Err(TrainingError::IllegalAction { action, legal });
        }
        state = state.apply_move(action)?;
        plies += 1;

        // The next decision belongs to the opponent, so both the next state
        // and its mask are taken from their side.
        let after = *state.board();
        let transition = Transition {
            state: encoded,
            action,
            reward: 0.0,
            next_state: encode_state(&after, mover.other()),
            done: false,
            next_valid_mask: next_action_mask(&after),
        };

        let committed = match state.outcome() {
            Some(outcome) => {
                let (mover_reward, opponent_reward) = match outcome {
                    GameOutcome::Winner(_) => (WIN_REWARD, LOSS_REWARD),
                    GameOutcome::Draw => (DRAW_REWARD, DRAW_REWARD),
                };
                pending.settle(mover, transition.finish(mover_reward), opponent_reward)
            }
            None => pending.replace(mover, transition).into_iter().collect(),
        };
        for t in committed {
            agent.remember(t.clone());
            transitions.push(t);
        }

        agent.advance_epsilon();
        if let Some(loss) = agent.train_after_ply() {
            last_loss = Some(loss);
        }
        trace!("ply {plies}: {} -> {action}", mover.name());
    }

    let winner = match state.outcome() {
        Some(GameOutcome::Winner(p)) => Some(p),
        _ => None,
    };

    Ok(EpisodeTrace {
        transitions,
        result: EpisodeResult {
            winner,
            game_length: plies,
        },
        last_loss,
    })
}

/// Play one game between two agents at epsilon 0. Returns the outcome.
pub fn play_match(
    agent: &mut dyn Agent,
    opponent: &mut dyn Agent,
    agent_side: Player,
) -> Result<GameOutcome, TrainingError> {
    let mut state = GameState::initial();

    loop {
        if let Some(outcome) = state.outcome() {
            return Ok(outcome);
        }
        let legal = state.legal_actions();
        let chosen = if state.current_player() == agent_side {
            agent.select_action(&state, 0.0)
        } else {
            opponent.select_action(&state, 0.0)
        };
        let action = chosen.ok_or(TrainingError::NoLegalMove)?;
        if !legal.contains(&action) {
            return Err(TrainingError::IllegalAction { action, legal });
        }
        state = state.apply_move(action)?;
    }
}

/// Tally of an evaluation run from the evaluated agent's side.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EvaluationReport {
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
}

impl EvaluationReport {
    pub fn games(&self) -> usize {
        self.wins + self.draws + self.losses
    }

    pub fn win_rate(&self) -> f32 {
        self.rate(self.wins)
    }

    pub fn draw_rate(&self) -> f32 {
        self.rate(self.draws)
    }

    pub fn loss_rate(&self) -> f32 {
        self.rate(self.losses)
    }

    fn rate(&self, count: usize) -> f32 {
        match self.games() {
            0 => 0.0,
            n => count as f32 / n as f32,
        }
    }
}

/// Greedy agent vs uniform random over `games` games, alternating sides.
pub fn evaluate(agent: &mut dyn Agent, games: usize) -> Result<EvaluationReport, TrainingError> {
    evaluate_against(agent, &mut RandomAgent::new(), games)
}

pub fn evaluate_against(
    agent: &mut dyn Agent,
    opponent: &mut dyn Agent,
    games: usize,
) -> Result<EvaluationReport, TrainingError> {
    let mut report = EvaluationReport::default();
    for game_idx in 0..games {
        let side = if game_idx % 2 == 0 { Player::X } else { Player::O };
        match play_match(agent, opponent, side)? {
            GameOutcome::Winner(winner) if winner == side => report.wins += 1,
            GameOutcome::Winner(_) => report.losses += 1,
            GameOutcome::Draw => report.draws += 1,
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::DqnConfig;
    use crate::game::Board;

    fn agent(seed: u64) -> DqnAgent {
        DqnAgent::new(DqnConfig {
            batch_size: 8,
            min_replay_size: 16,
            replay_capacity: 500,
            target_update_interval: 10,
            epsilon_decay_steps: 50,
            hidden_size: 16,
            seed: Some(seed),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_episode_yields_one_transition_per_ply() {
        let mut agent = agent(1);
        for _ in 0..20 {
            let before = agent.replay_buffer().len();
            let trace = play_self_play_episode(&mut agent).unwrap();
            let plies = trace.result.game_length;
            assert!((5..=9).contains(&plies));
            assert_eq!(trace.transitions.len(), plies);
            assert_eq!(agent.replay_buffer().len() - before, plies);
        }
    }

    #[test]
    fn test_episode_terminal_rewards() {
        let mut agent = agent(2);
        for _ in 0..30 {
            let trace = play_self_play_episode(&mut agent).unwrap();
            let done: Vec<&Transition> = trace.transitions.iter().filter(|t| t.done).collect();
            assert_eq!(done.len(), 2);

            let mut rewards: Vec<f32> = done.iter().map(|t| t.reward).collect();
            rewards.sort_by(f32::total_cmp);
            match trace.result.winner {
                Some(_) => assert_eq!(rewards, vec![LOSS_REWARD, WIN_REWARD]),
                None => assert_eq!(rewards, vec![DRAW_REWARD, DRAW_REWARD]),
            }
            for t in trace.transitions.iter().filter(|t| !t.done) {
                assert_eq!(t.reward, 0.0);
            }
        }
    }

    #[test]
    fn test_terminal_transition_has_empty_mask() {
        let mut agent = agent(3);
        let trace = play_self_play_episode(&mut agent).unwrap();
        let last = trace.transitions.last().unwrap();
        assert!(last.done);
        assert_eq!(last.next_valid_mask, [false; 9]);
    }

    #[test]
    fn test_next_state_from_opponent_view() {
        let mut agent = agent(4);
        let trace = play_self_play_episode(&mut agent).unwrap();
        let first = trace
            .transitions
            .iter()
            .find(|t| t.state == [0.0; 9])
            .unwrap();
        // X's first stone shows up as the opponent's (-1) in O's view.
        let mut expected = [0.0; 9];
        expected[first.action] = -1.0;
        assert_eq!(first.next_state, expected);
        let opened = Board::new().with_move(first.action, Player::X).unwrap();
        assert_eq!(first.next_valid_mask, opened.valid_mask());
    }

    #[test]
    fn test_self_play_advances_epsilon_per_ply() {
        let mut agent = agent(5);
        let mut plies = 0;
        for _ in 0..3 {
            plies += play_self_play_episode(&mut agent).unwrap().result.game_length;
        }
        assert_eq!(agent.step_count(), plies);
        assert_eq!(agent.epsilon(), agent.config().epsilon_schedule().at(plies));
    }

    #[test]
    fn test_self_play_trains_once_buffer_ready() {
        let mut agent = agent(6);
        let mut saw_loss = false;
        for _ in 0..10 {
            saw_loss |= play_self_play_episode(&mut agent).unwrap().last_loss.is_some();
        }
        assert!(saw_loss);
        assert!(agent.train_updates() > 0);
    }

    #[test]
    fn test_self_play_runs_configured_steps_per_ply() {
        let mut agent = DqnAgent::new(DqnConfig {
            train_steps_per_ply: 3,
            ..agent(8).config().clone()
        })
        .unwrap();
        while agent.replay_buffer().len() < 16 {
            play_self_play_episode(&mut agent).unwrap();
        }

        for _ in 0..3 {
            let before = agent.train_updates();
            let plies = play_self_play_episode(&mut agent).unwrap().result.game_length;
            assert_eq!(agent.train_updates() - before, 3 * plies);
        }
    }

    #[test]
    fn test_play_match_random_vs_random() {
        let mut a = RandomAgent::seeded(1);
        let mut b = RandomAgent::seeded(2);
        let outcome = play_match(&mut a, &mut b, Player::O).unwrap();
        assert!(matches!(outcome, GameOutcome::Winner(_) | GameOutcome::Draw));
    }

    #[test]
    fn test_evaluate_counts_every_game() {
        let mut agent = agent(7);
        let before = agent.training_state();
        let report = evaluate(&mut agent, 10).unwrap();
        assert_eq!(report.games(), 10);
        let total = report.win_rate() + report.draw_rate() + report.loss_rate();
        assert!((total - 1.0).abs() < 1e-6);
        assert_eq!(agent.training_state(), before);
    }
}
