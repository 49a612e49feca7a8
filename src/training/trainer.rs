use log::{info, warn};

use crate::ai::DqnAgent;
use crate::checkpoint::{CheckpointStore, LoadOutcome};
use crate::error::TrainingError;
use crate::training::episode::{evaluate, play_self_play_episode, EvaluationReport};
use crate::training::metrics::TrainingMetrics;

/// Trainer configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub num_episodes: usize,
    /// Self-play episodes run when no checkpoint exists yet.
    pub bootstrap_episodes: usize,
    pub log_interval: usize,
    /// 0 disables periodic evaluation.
    pub eval_interval: usize,
    pub eval_games: usize,
    /// 0 disables periodic checkpoints; the final one is always written.
    pub checkpoint_interval: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            num_episodes: 3_000,
            bootstrap_episodes: 2_500,
            log_interval: 500,
            eval_interval: 500,
            eval_games: 100,
            checkpoint_interval: 1_000,
        }
    }
}

/// Summary of a training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    pub episodes: usize,
    pub plies: usize,
    pub train_updates: usize,
    pub final_epsilon: f32,
    pub final_eval: Option<EvaluationReport>,
}

/// Self-play trainer for DQN agents.
pub struct Trainer {
    config: TrainerConfig,
    store: Option<CheckpointStore>,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Trainer {
            config,
            store: None,
        }
    }

    /// Persist checkpoints through `store` during and after training.
    pub fn with_store(mut self, store: CheckpointStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Run `num_episodes` self-play episodes.
    pub fn train(&self, agent: &mut DqnAgent) -> Result<TrainingSummary, TrainingError> {
        self.run(agent, self.config.num_episodes)
    }

    /// Load the checkpoint, or train `bootstrap_episodes` and save when there
    /// is none, so a serving agent never starts from random weights.
    pub fn load_or_bootstrap(&self, agent: &mut DqnAgent) -> Result<LoadOutcome, TrainingError> {
        if let Some(store) = &self.store {
            let outcome = store.load(agent)?;
            if outcome.is_loaded() {
                return Ok(outcome);
            }
            info!("no checkpoint at {}, bootstrapping", store.path().display());
        }
        self.run(agent, self.config.bootstrap_episodes)?;
        Ok(LoadOutcome::NotFound)
    }

    fn run(&self, agent: &mut DqnAgent, episodes: usize) -> Result<TrainingSummary, TrainingError> {
        let mut metrics = TrainingMetrics::new();
        let window = self.config.log_interval.max(1);
        let start_step = agent.step_count();

        info!("Starting DQN self-play training for {episodes} episodes");

        for episode in 1..=episodes {
            let trace = play_self_play_episode(agent)?;
            if let Some(loss) = trace.last_loss {
                metrics.record_update(loss);
            }
            metrics.record_episode(trace.result);

            if episode % window == 0 {
                info!(
                    "Episode {}/{} | eps: {:.3} | loss: {:.4} | x_win({}): {:.1}% | draw: {:.1}% | avg_len: {:.1} | updates: {}",
                    episode,
                    episodes,
                    agent.epsilon(),
                    metrics.average_loss(window),
                    window,
                    metrics.x_win_rate(window) * 100.0,
                    metrics.draw_rate(window) * 100.0,
                    metrics.average_game_length(window),
                    agent.train_updates(),
                );
            }

            if self.config.eval_interval > 0 && episode % self.config.eval_interval == 0 {
                self.log_evaluation(agent)?;
            }

            if self.config.checkpoint_interval > 0
                && episode % self.config.checkpoint_interval == 0
                && episode != episodes
            {
                self.save(agent)?;
            }
        }

        self.save(agent)?;
        let final_eval = if self.config.eval_games > 0 {
            Some(self.log_evaluation(agent)?)
        } else {
            None
        };

        info!(
            "Training complete. Episodes: {}, updates: {}",
            metrics.total_episodes(),
            agent.train_updates()
        );

        Ok(TrainingSummary {
            episodes: metrics.total_episodes(),
            plies: agent.step_count() - start_step,
            train_updates: agent.train_updates(),
            final_epsilon: agent.epsilon(),
            final_eval,
        })
    }

    fn log_evaluation(&self, agent: &mut DqnAgent) -> Result<EvaluationReport, TrainingError> {
        let report = evaluate(agent, self.config.eval_games)?;
        info!(
            "  >> Eval vs Random ({} games): win {:.1}% | draw {:.1}% | loss {:.1}%",
            report.games(),
            report.win_rate() * 100.0,
            report.draw_rate() * 100.0,
            report.loss_rate() * 100.0,
        );
        Ok(report)
    }

    fn save(&self, agent: &DqnAgent) -> Result<(), TrainingError> {
        match &self.store {
            Some(store) => {
                store.save(agent)?;
            }
            None => warn!("no checkpoint store configured, skipping save"),
        }
        Ok(())
    }
}
