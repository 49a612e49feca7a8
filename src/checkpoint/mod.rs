mod metadata;
mod store;

pub use metadata::{
    CheckpointBlob, CheckpointHyperparameters, CheckpointMetadata, RestoreReport,
    CHECKPOINT_FORMAT_VERSION,
};
pub use store::{CheckpointConfig, CheckpointStore, LoadOutcome};
