//! Core tic-tac-toe logic: an immutable 3x3 board with pure win/draw/move
//! queries, player sides, and a game state machine with immutable
//! transitions.

mod board;
mod player;
mod state;

pub use board::{Board, BoardParseError, Cell, CELLS, SIZE, WIN_LINES};
pub use player::Player;
pub use state::{GameOutcome, GameState, MoveError};
