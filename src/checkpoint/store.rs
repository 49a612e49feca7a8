use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::ai::DqnAgent;
use crate::checkpoint::metadata::{CheckpointBlob, RestoreReport};
use crate::error::CheckpointError;

/// Where the checkpoint lives.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    pub path: PathBuf,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        CheckpointConfig {
            path: PathBuf::from("models/dqn_tictactoe.mpk"),
        }
    }
}

/// Result of a load attempt that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// No checkpoint file exists; the agent is untouched.
    NotFound,
    Loaded(RestoreReport),
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded(_))
    }
}

/// Saves and loads a single-file agent checkpoint.
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CheckpointStore { path: path.into() }
    }

    pub fn from_config(config: &CheckpointConfig) -> Self {
        Self::new(config.path.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Persist the agent's networks, optimizer state and counters.
    pub fn save(&self, agent: &DqnAgent) -> Result<PathBuf, CheckpointError> {
        let blob = agent.to_checkpoint()?;
        let bytes = rmp_serde::to_vec_named(&blob)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        // Atomic rename
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, bytes)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        info!(
            "saved checkpoint to {} (steps={}, updates={})",
            self.path.display(),
            blob.step_count,
            blob.train_updates
        );
        Ok(self.path.clone())
    }

    /// Restore `agent` from disk. A missing file is not an error.
    pub fn load(&self, agent: &mut DqnAgent) -> Result<LoadOutcome, CheckpointError> {
        if !self.exists() {
            return Ok(LoadOutcome::NotFound);
        }
        let bytes = fs::read(&self.path)?;
        let blob: CheckpointBlob =
            rmp_serde::from_slice(&bytes).map_err(|e| CheckpointError::Decode {
                path: self.path.clone(),
                source: e,
            })?;
        let report = agent.restore_checkpoint(blob)?;

        info!(
            "loaded checkpoint from {} (steps={}, epsilon={:.3})",
            self.path.display(),
            agent.step_count(),
            agent.epsilon()
        );
        Ok(LoadOutcome::Loaded(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::state_encoding::encode_state;
    use crate::ai::{DqnConfig, TrainOutcome, Transition};
    use crate::checkpoint::CHECKPOINT_FORMAT_VERSION;
    use crate::game::{Board, Player, CELLS};

    fn config() -> DqnConfig {
        DqnConfig {
            batch_size: 4,
            min_replay_size: 4,
            hidden_size: 16,
            epsilon_end: 0.1,
            seed: Some(5),
            ..Default::default()
        }
    }

    fn filled_agent(config: DqnConfig, n: usize) -> DqnAgent {
        let mut agent = DqnAgent::new(config).unwrap();
        for i in 0..n {
            let action = i % CELLS;
            let next = Board::new().with_move(action, Player::X).unwrap();
            agent.remember(Transition {
                state: encode_state(&Board::new(), Player::X),
                action,
                reward: if i % 2 == 0 { 1.0 } else { 0.0 },
                next_state: encode_state(&next, Player::O),
                done: i % 2 == 0,
                next_valid_mask: next.valid_mask(),
            });
        }
        agent
    }

    fn write_blob(path: &Path, blob: &CheckpointBlob) {
        fs::write(path, rmp_serde::to_vec_named(blob).unwrap()).unwrap();
    }

    const SAMPLE_STATE: [f32; 9] = [1.0, 0.0, -1.0, 0.0, 1.0, 0.0, 0.0, -1.0, 0.0];

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("nested/agent.mpk"));

        let mut agent = filled_agent(config(), 8);
        assert!(matches!(agent.train_step(), TrainOutcome::Updated(_)));
        for _ in 0..3 {
            agent.advance_epsilon();
        }
        let saved = store.save(&agent).unwrap();
        assert!(saved.exists());

        let mut restored = DqnAgent::new(DqnConfig {
            seed: Some(77),
            ..config()
        })
        .unwrap();
        let LoadOutcome::Loaded(report) = store.load(&mut restored).unwrap() else {
            panic!("expected a checkpoint");
        };
        assert!(report.target_restored);
        assert!(report.optimizer_restored);
        let metadata = report.metadata.unwrap();
        assert_eq!(metadata.format_version, CHECKPOINT_FORMAT_VERSION);
        assert_eq!(metadata.hyperparameters.hidden_size, 16);

        assert_eq!(restored.training_state(), agent.training_state());
        assert_eq!(restored.q_values(&SAMPLE_STATE), agent.q_values(&SAMPLE_STATE));
        // Replay memory is not persisted.
        assert!(restored.replay_buffer().is_empty());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("absent.mpk"));
        let mut agent = DqnAgent::new(config()).unwrap();
        let before = agent.training_state();

        assert_eq!(store.load(&mut agent).unwrap(), LoadOutcome::NotFound);
        assert_eq!(agent.training_state(), before);
    }

    #[test]
    fn test_corrupt_optimizer_falls_back_to_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.mpk");
        let agent = filled_agent(config(), 8);
        let mut blob = agent.to_checkpoint().unwrap();
        blob.optimizer = Some(vec![0xde, 0xad]);
        write_blob(&path, &blob);

        let mut restored = DqnAgent::new(config()).unwrap();
        let outcome = CheckpointStore::new(&path).load(&mut restored).unwrap();
        let LoadOutcome::Loaded(report) = outcome else {
            panic!("expected a checkpoint");
        };
        assert!(!report.optimizer_restored);
        assert!(report.target_restored);
        assert_eq!(restored.q_values(&SAMPLE_STATE), agent.q_values(&SAMPLE_STATE));
    }

    #[test]
    fn test_corrupt_target_copies_online_network() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.mpk");
        let mut agent = filled_agent(config(), 8);
        agent.train_step();
        let mut blob = agent.to_checkpoint().unwrap();
        blob.target_network = Some(vec![0x93, 0x01]);
        write_blob(&path, &blob);

        let mut restored = DqnAgent::new(config()).unwrap();
        let LoadOutcome::Loaded(report) = CheckpointStore::new(&path).load(&mut restored).unwrap()
        else {
            panic!("expected a checkpoint");
        };
        assert!(!report.target_restored);
        assert!(report.optimizer_restored);
        assert_eq!(
            restored.target_snapshot().unwrap(),
            restored.online_snapshot().unwrap()
        );
        assert_eq!(restored.q_values(&SAMPLE_STATE), agent.q_values(&SAMPLE_STATE));
    }

    #[test]
    fn test_failed_rename_removes_tmp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory at the target path makes the rename fail.
        let target = dir.path().join("agent.mpk");
        fs::create_dir_all(target.join("occupied")).unwrap();
        let store = CheckpointStore::new(&target);

        assert!(store.save(&DqnAgent::new(config()).unwrap()).is_err());
        assert!(!dir.path().join("agent.mpk.tmp").exists());
    }

    #[test]
    fn test_parameter_snapshots_are_stored_as_binary() {
        let agent = filled_agent(config(), 8);
        let blob = agent.to_checkpoint().unwrap();
        let payload = blob.q_network.len()
            + blob.target_network.as_ref().map_or(0, Vec::len)
            + blob.optimizer.as_ref().map_or(0, Vec::len);
        let encoded = rmp_serde::to_vec_named(&blob).unwrap();
        assert!(encoded.len() < payload + 1024);

        let decoded: CheckpointBlob = rmp_serde::from_slice(&encoded).unwrap();
        assert_eq!(decoded.q_network, blob.q_network);
        assert_eq!(decoded.optimizer, blob.optimizer);
    }

    #[test]
    fn test_legacy_checkpoint_copies_online_into_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.mpk");
        let agent = DqnAgent::new(config()).unwrap();
        let blob = CheckpointBlob {
            metadata: None,
            q_network: agent.online_snapshot().unwrap(),
            target_network: None,
            optimizer: None,
            step_count: 0,
            epsilon: None,
            train_updates: 0,
        };
        write_blob(&path, &blob);

        let mut restored = DqnAgent::new(DqnConfig {
            seed: Some(8),
            ..config()
        })
        .unwrap();
        let LoadOutcome::Loaded(report) = CheckpointStore::new(&path).load(&mut restored).unwrap()
        else {
            panic!("expected a checkpoint");
        };
        assert!(!report.target_restored);
        assert!(!report.optimizer_restored);
        assert_eq!(
            restored.target_snapshot().unwrap(),
            restored.online_snapshot().unwrap()
        );
        assert_eq!(restored.epsilon(), 0.1);
    }

    #[test]
    fn test_unreadable_network_leaves_agent_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.mpk");
        let mut blob = DqnAgent::new(config()).unwrap().to_checkpoint().unwrap();
        blob.q_network = vec![1, 2, 3];
        blob.step_count = 999;
        write_blob(&path, &blob);

        let mut agent = DqnAgent::new(config()).unwrap();
        let before_state = agent.training_state();
        let before_q = agent.q_values(&SAMPLE_STATE);

        let err = CheckpointStore::new(&path).load(&mut agent).unwrap_err();
        assert!(matches!(err, CheckpointError::NetworkParams(_)));
        assert_eq!(agent.training_state(), before_state);
        assert_eq!(agent.q_values(&SAMPLE_STATE), before_q);
    }

    #[test]
    fn test_garbage_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.mpk");
        fs::write(&path, b"not a checkpoint").unwrap();
        let mut agent = DqnAgent::new(config()).unwrap();
        let err = CheckpointStore::new(&path).load(&mut agent).unwrap_err();
        assert!(matches!(err, CheckpointError::Decode { .. }));
    }

    #[test]
    fn test_config_default_path() {
        let store = CheckpointStore::from_config(&CheckpointConfig::default());
        assert_eq!(store.path(), Path::new("models/dqn_tictactoe.mpk"));
    }
}
