use std::path::PathBuf;

use crate::game::MoveError;

/// Errors that can occur during checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("failed to decode checkpoint {path}: {source}")]
    Decode {
        path: PathBuf,
        source: rmp_serde::decode::Error,
    },

    #[error("failed to encode checkpoint: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("failed to save model: {0}")]
    ModelSave(String),

    #[error("value network parameters could not be recovered: {0}")]
    NetworkParams(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during training and play.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("agent selected illegal action {action} (legal: {legal:?})")]
    IllegalAction { action: usize, legal: Vec<usize> },

    #[error("no legal move available")]
    NoLegalMove,

    #[error("illegal move: {0}")]
    Move(#[from] MoveError),

    #[error("it is not the {0}'s turn")]
    OutOfTurn(&'static str),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}
