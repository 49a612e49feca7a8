use std::time::{SystemTime, UNIX_EPOCH};

use burn::backend::{Autodiff, NdArray};
use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkBytesRecorder, Recorder, RecorderError};
use burn::tensor::{ElementConversion, TensorData};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::ai::agent::{Agent, TrainOutcome, Transition, UpdateMetrics};
use crate::ai::networks::{QNetwork, QNetworkConfig};
use crate::ai::policy::{mask_actions, masked_argmax, select_action, Difficulty, EpsilonSchedule};
use crate::ai::state_encoding::{
    encode_actions, encode_state, encode_state_tensor, encode_states_batch, tensor_to_vec,
    StateVector,
};
use crate::checkpoint::{
    CheckpointBlob, CheckpointHyperparameters, CheckpointMetadata, RestoreReport,
    CHECKPOINT_FORMAT_VERSION,
};
use crate::error::{CheckpointError, ConfigError};
use crate::game::{Board, GameState, Player, CELLS};
use crate::training::replay_buffer::ReplayBuffer;

type InferBackend = NdArray<f32>;
type TrainBackend = Autodiff<InferBackend>;
type QOptimizer = OptimizerAdaptor<Adam, QNetwork<TrainBackend>, TrainBackend>;
type OptimizerRecord = <QOptimizer as Optimizer<QNetwork<TrainBackend>, TrainBackend>>::Record;

/// DQN hyperparameters.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DqnConfig {
    pub learning_rate: f64,
    pub gamma: f32,
    pub epsilon_start: f32,
    pub epsilon_end: f32,
    pub epsilon_decay_steps: usize,
    pub target_update_interval: usize,
    pub batch_size: usize,
    pub replay_capacity: usize,
    pub min_replay_size: usize,
    pub train_steps_per_ply: usize,
    pub hidden_size: usize,
    pub seed: Option<u64>,
}

impl Default for DqnConfig {
    fn default() -> Self {
        DqnConfig {
            learning_rate: 1e-3,
            gamma: 0.99,
            epsilon_start: 1.0,
            epsilon_end: 0.05,
            epsilon_decay_steps: 30_000,
            target_update_interval: 500,
            batch_size: 64,
            replay_capacity: 50_000,
            min_replay_size: 1_000,
            train_steps_per_ply: 1,
            hidden_size: 64,
            seed: None,
        }
    }
}

impl DqnConfig {
    pub fn epsilon_schedule(&self) -> EpsilonSchedule {
        EpsilonSchedule::new(self.epsilon_start, self.epsilon_end, self.epsilon_decay_steps)
    }

    fn network_config(&self) -> QNetworkConfig {
        QNetworkConfig::new().with_hidden_size(self.hidden_size)
    }

    /// Check the hyperparameters an agent cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: &str| Err(ConfigError::Validation(msg.into()));

        if self.learning_rate <= 0.0 {
            return fail("dqn.learning_rate must be > 0");
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return fail("dqn.gamma must be in [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.epsilon_start) {
            return fail("dqn.epsilon_start must be in [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.epsilon_end) {
            return fail("dqn.epsilon_end must be in [0, 1]");
        }
        if self.epsilon_end > self.epsilon_start {
            return fail("dqn.epsilon_end must be <= dqn.epsilon_start");
        }
        if self.batch_size == 0 {
            return fail("dqn.batch_size must be > 0");
        }
        if self.replay_capacity < self.batch_size {
            return fail("dqn.replay_capacity must be >= dqn.batch_size");
        }
        if self.min_replay_size < self.batch_size {
            return fail("dqn.min_replay_size must be >= dqn.batch_size");
        }
        if self.target_update_interval == 0 {
            return fail("dqn.target_update_interval must be > 0");
        }
        if self.train_steps_per_ply == 0 {
            return fail("dqn.train_steps_per_ply must be >= 1");
        }
        if self.hidden_size == 0 {
            return fail("dqn.hidden_size must be > 0");
        }
        Ok(())
    }
}

/// Counters and exploration rate that evolve during training.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingState {
    /// Plies played under the training schedule; drives epsilon decay.
    pub step_count: usize,
    /// Completed gradient steps; drives target sync.
    pub train_updates: usize,
    /// Current training exploration rate.
    pub epsilon: f32,
}

/// Double DQN agent with online + target networks, replay buffer, and Adam
/// optimizer.
///
/// The training epsilon lives here and only moves through
/// [`DqnAgent::advance_epsilon`]. Serving callers pass their own epsilon to
/// every selection call, so a game in progress never disturbs the schedule.
pub struct DqnAgent {
    q_network: QNetwork<TrainBackend>,
    target_network: QNetwork<InferBackend>,
    optimizer: QOptimizer,
    replay_buffer: ReplayBuffer,
    config: DqnConfig,
    device: <TrainBackend as Backend>::Device,
    state: TrainingState,
    rng: StdRng,
}

impl DqnAgent {
    /// Build a fresh agent. Rejects configurations that would make training
    /// divide by zero or sample from an empty buffer.
    pub fn new(config: DqnConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let device = Default::default();
        let rng = match config.seed {
            Some(seed) => {
                TrainBackend::seed(seed);
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_os_rng(),
        };
        let q_network: QNetwork<TrainBackend> = config.network_config().init(&device);
        let target_network = q_network.valid();
        let optimizer = AdamConfig::new().init();
        let replay_buffer = ReplayBuffer::new(config.replay_capacity);
        let state = TrainingState {
            step_count: 0,
            train_updates: 0,
            epsilon: config.epsilon_start,
        };

        Ok(DqnAgent {
            q_network,
            target_network,
            optimizer,
            replay_buffer,
            config,
            device,
            state,
            rng,
        })
    }

    pub fn config(&self) -> &DqnConfig {
        &self.config
    }

    /// Q-values of the online network for one state.
    pub fn q_values(&self, state: &StateVector) -> [f32; CELLS] {
        predict(&self.q_network.valid(), state, &self.device)
    }

    /// Epsilon-greedy action for `state` among `valid`, with the caller's
    /// epsilon. `None` when `valid` is empty.
    pub fn act(&mut self, state: &StateVector, valid: &[usize], epsilon: f32) -> Option<usize> {
        let network = &self.q_network;
        let device = &self.device;
        select_action(valid, epsilon, &mut self.rng, || {
            predict(&network.valid(), state, device)
        })
    }

    /// Action under the current training epsilon.
    pub fn act_training(&mut self, state: &StateVector, valid: &[usize]) -> Option<usize> {
        let epsilon = self.state.epsilon;
        self.act(state, valid, epsilon)
    }

    /// Serving query: a move for `player` on `board` at the given skill tier.
    pub fn request_action(
        &mut self,
        board: &Board,
        player: Player,
        difficulty: Difficulty,
    ) -> Option<usize> {
        if board.is_terminal() {
            return None;
        }
        let state = encode_state(board, player);
        self.act(&state, &board.valid_actions(), difficulty.epsilon())
    }

    pub fn remember(&mut self, transition: Transition) {
        self.replay_buffer.push(transition);
    }

    pub fn replay_buffer(&self) -> &ReplayBuffer {
        &self.replay_buffer
    }

    /// Count one training ply and move epsilon along the schedule.
    pub fn advance_epsilon(&mut self) -> f32 {
        self.state.step_count += 1;
        self.state.epsilon = self.config.epsilon_schedule().at(self.state.step_count);
        self.state.epsilon
    }

    /// One Double DQN gradient step on a uniformly sampled batch.
    pub fn train_step(&mut self) -> TrainOutcome {
        // Guard against min_replay_size < batch_size.
        let required = self.config.min_replay_size.max(self.config.batch_size);
        if self.replay_buffer.len() < required {
            return TrainOutcome::NotReady {
                buffered: self.replay_buffer.len(),
                required,
            };
        }

        let batch: Vec<Transition> = self
            .replay_buffer
            .sample(self.config.batch_size, &mut self.rng)
            .into_iter()
            .cloned()
            .collect();
        let targets = self.td_targets(&batch);
        let loss = self.gradient_step(&batch, targets);

        self.state.train_updates += 1;
        let target_synced = self.state.train_updates % self.config.target_update_interval == 0;
        if target_synced {
            self.sync_target();
            debug!("target network synced at update {}", self.state.train_updates);
        }

        TrainOutcome::Updated(UpdateMetrics {
            loss,
            train_updates: self.state.train_updates,
            target_synced,
        })
    }

    /// Run the configured number of gradient steps for one ply. Returns the
    /// loss of the last step that ran.
    pub fn train_after_ply(&mut self) -> Option<f32> {
        let mut last_loss = None;
        for _ in 0..self.config.train_steps_per_ply {
            if let Some(loss) = self.train_step().loss() {
                last_loss = Some(loss);
            }
        }
        last_loss
    }

    /// Double DQN bootstrap targets: the online network picks the next
    /// action, the target network scores it.
    fn td_targets(&self, batch: &[Transition]) -> Vec<f32> {
        let next_states: Vec<StateVector> = batch.iter().map(|t| t.next_state).collect();
        let online = self.q_network.valid();
        let next_online = tensor_to_vec(
            online.forward(encode_states_batch::<InferBackend>(&next_states, &self.device)),
        );
        let next_target = tensor_to_vec(
            self.target_network
                .forward(encode_states_batch::<InferBackend>(&next_states, &self.device)),
        );
        double_dqn_targets(batch, &next_online, &next_target, self.config.gamma)
    }

    fn gradient_step(&mut self, batch: &[Transition], targets: Vec<f32>) -> f32 {
        let batch_size = batch.len();
        let states: Vec<StateVector> = batch.iter().map(|t| t.state).collect();
        let actions: Vec<usize> = batch.iter().map(|t| t.action).collect();

        // Q(s, a) for the taken actions: [B, 1]
        let q_all = self
            .q_network
            .forward(encode_states_batch::<TrainBackend>(&states, &self.device));
        let q_taken = q_all.gather(1, encode_actions::<TrainBackend>(&actions, &self.device));

        let targets = Tensor::<TrainBackend, 2>::from_data(
            TensorData::new(targets, [batch_size, 1]),
            &self.device,
        );

        let loss = huber_loss(q_taken, targets);
        let loss_val: f32 = loss.clone().into_scalar().elem();

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.q_network);
        self.q_network = self
            .optimizer
            .step(self.config.learning_rate, self.q_network.clone(), grads);

        loss_val
    }

    /// Hard-copy the online parameters into the target network.
    pub fn sync_target(&mut self) {
        self.target_network = self.q_network.valid();
    }

    pub fn epsilon(&self) -> f32 {
        self.state.epsilon
    }

    pub fn step_count(&self) -> usize {
        self.state.step_count
    }

    pub fn train_updates(&self) -> usize {
        self.state.train_updates
    }

    pub fn training_state(&self) -> TrainingState {
        self.state
    }

    /// Parameter snapshot of the online network.
    pub fn online_snapshot(&self) -> Result<Vec<u8>, RecorderError> {
        self.q_network.valid().snapshot()
    }

    /// Parameter snapshot of the target network.
    pub fn target_snapshot(&self) -> Result<Vec<u8>, RecorderError> {
        self.target_network.snapshot()
    }

    /// Package every trainable and transient field for persistence.
    pub fn to_checkpoint(&self) -> Result<CheckpointBlob, CheckpointError> {
        let save_err = |e: RecorderError| CheckpointError::ModelSave(e.to_string());
        let recorder = NamedMpkBytesRecorder::<FullPrecisionSettings>::default();
        let optimizer = Recorder::<TrainBackend>::record(&recorder, self.optimizer.to_record(), ())
            .map_err(save_err)?;
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        Ok(CheckpointBlob {
            metadata: Some(CheckpointMetadata {
                format_version: CHECKPOINT_FORMAT_VERSION,
                timestamp,
                hyperparameters: CheckpointHyperparameters::from(&self.config),
            }),
            q_network: self.online_snapshot().map_err(save_err)?,
            target_network: Some(self.target_snapshot().map_err(save_err)?),
            optimizer: Some(optimizer),
            step_count: self.state.step_count,
            epsilon: Some(self.state.epsilon),
            train_updates: self.state.train_updates,
        })
    }

    /// Adopt the state held in `blob`.
    ///
    /// Fails without touching the agent if the online parameters cannot be
    /// decoded. A missing target network is rebuilt from the online one; a
    /// missing or incompatible optimizer state is replaced by a fresh one.
    pub fn restore_checkpoint(
        &mut self,
        blob: CheckpointBlob,
    ) -> Result<RestoreReport, CheckpointError> {
        let net_config = self.config.network_config();
        let q_network = net_config
            .init::<TrainBackend>(&self.device)
            .restore(blob.q_network, &self.device)
            .map_err(|e| CheckpointError::NetworkParams(e.to_string()))?;

        let (target_network, target_restored) = match blob.target_network {
            Some(bytes) => match net_config
                .init::<InferBackend>(&self.device)
                .restore(bytes, &self.device)
            {
                Ok(target) => (target, true),
                Err(e) => {
                    warn!("target network unreadable ({e}), copying online network");
                    (q_network.valid(), false)
                }
            },
            None => {
                warn!("checkpoint has no target network, copying online network");
                (q_network.valid(), false)
            }
        };

        let (optimizer, optimizer_restored) = match blob.optimizer {
            Some(bytes) => match self.decode_optimizer(bytes) {
                Ok(optimizer) => (optimizer, true),
                Err(e) => {
                    warn!("optimizer state incompatible ({e}), starting fresh");
                    (AdamConfig::new().init(), false)
                }
            },
            None => {
                warn!("checkpoint has no optimizer state, starting fresh");
                (AdamConfig::new().init(), false)
            }
        };

        self.q_network = q_network;
        self.target_network = target_network;
        self.optimizer = optimizer;
        self.state = TrainingState {
            step_count: blob.step_count,
            train_updates: blob.train_updates,
            epsilon: blob.epsilon.unwrap_or(self.config.epsilon_end),
        };

        Ok(RestoreReport {
            target_restored,
            optimizer_restored,
            metadata: blob.metadata,
        })
    }

    fn decode_optimizer(&self, bytes: Vec<u8>) -> Result<QOptimizer, RecorderError> {
        let recorder = NamedMpkBytesRecorder::<FullPrecisionSettings>::default();
        let record: OptimizerRecord = Recorder::<TrainBackend>::load(&recorder, bytes, &self.device)?;
        let optimizer: QOptimizer = AdamConfig::new().init();
        Ok(optimizer.load_record(record))
    }
}

impl Agent for DqnAgent {
    fn select_action(&mut self, state: &GameState, epsilon: f32) -> Option<usize> {
        let encoded = encode_state(state.board(), state.current_player());
        self.act(&encoded, &state.legal_actions(), epsilon)
    }

    fn name(&self) -> &str {
        "DQN"
    }
}

fn predict(
    network: &QNetwork<InferBackend>,
    state: &StateVector,
    device: &<InferBackend as Backend>::Device,
) -> [f32; CELLS] {
    let input = encode_state_tensor::<InferBackend>(state, device);
    let values = tensor_to_vec(network.forward(input));
    let mut q = [0.0; CELLS];
    q.copy_from_slice(&values[..CELLS]);
    q
}

/// `reward + (1 - done) * gamma * Q_target(s', argmax_{a in mask} Q_online(s', a))`.
///
/// Rows whose mask is empty contribute a next value of exactly zero,
/// whatever the networks output.
pub fn double_dqn_targets(
    batch: &[Transition],
    next_online: &[f32],
    next_target: &[f32],
    gamma: f32,
) -> Vec<f32> {
    batch
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let row = i * CELLS..(i + 1) * CELLS;
            let best = masked_argmax(&next_online[row], mask_actions(&t.next_valid_mask));
            let next_value = match best {
                Some(action) => next_target[i * CELLS + action],
                None => 0.0,
            };
            let continuing = if t.done { 0.0 } else { 1.0 };
            t.reward + continuing * gamma * next_value
        })
        .collect()
}

/// Smooth L1 (Huber, delta = 1) loss averaged over the batch.
pub fn huber_loss<B: Backend>(predictions: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    let abs = (predictions - targets).abs();
    let quadratic = abs.clone().clamp_max(1.0);
    let linear = abs - quadratic.clone();
    (quadratic.clone() * quadratic).mul_scalar(0.5).add(linear).mean()
}
