use burn::prelude::*;
use burn::tensor::TensorData;

use crate::game::{Board, Player, CELLS};

/// Board seen from the acting side: own stones +1, opponent -1, empty 0.
pub type StateVector = [f32; CELLS];

/// Per-cell legality of the next move; all `false` for a terminal position.
pub type ActionMask = [bool; CELLS];

/// Encode `board` from `player`'s perspective.
pub fn encode_state(board: &Board, player: Player) -> StateVector {
    board.to_perspective(player).encoded().map(f32::from)
}

/// Legal-move mask used for bootstrapping. A finished game has no next move,
/// so its mask is empty even if cells remain.
pub fn next_action_mask(board: &Board) -> ActionMask {
    if board.is_terminal() {
        [false; CELLS]
    } else {
        board.valid_mask()
    }
}

/// Encode a single state as a tensor of shape [1, 9].
pub fn encode_state_tensor<B: Backend>(state: &StateVector, device: &B::Device) -> Tensor<B, 2> {
    encode_states_batch::<B>(std::slice::from_ref(state), device)
}

/// Encode multiple states as a batched tensor of shape [batch, 9].
pub fn encode_states_batch<B: Backend>(states: &[StateVector], device: &B::Device) -> Tensor<B, 2> {
    let flat: Vec<f32> = states.iter().flatten().copied().collect();
    Tensor::<B, 2>::from_data(TensorData::new(flat, [states.len(), CELLS]), device)
}

/// Encode taken actions as an index tensor of shape [batch, 1] for `gather`.
pub fn encode_actions<B: Backend>(actions: &[usize], device: &B::Device) -> Tensor<B, 2, Int> {
    let data: Vec<i64> = actions.iter().map(|&a| a as i64).collect();
    Tensor::<B, 2, Int>::from_data(TensorData::new(data, [actions.len(), 1]), device)
}

/// Flatten a tensor's values into host memory.
pub fn tensor_to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Vec<f32> {
    tensor.into_data().iter::<f32>().collect()
}
