use super::board::{Board, MoveError as BoardMoveError};
use super::Player;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Winner(Player),
    Draw,
}

impl GameOutcome {
    /// Outcome of a board, `None` while the game is in progress.
    pub fn of(board: &Board) -> Option<GameOutcome> {
        if let Some(player) = board.winner() {
            Some(GameOutcome::Winner(player))
        } else if board.is_full() {
            Some(GameOutcome::Draw)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error(transparent)]
    Board(#[from] BoardMoveError),
    #[error("the game is already over")]
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameState {
    board: Board,
    current_player: Player,
    outcome: Option<GameOutcome>,
}

impl GameState {
    /// Create initial game state
    pub fn initial() -> Self {
        GameState {
            board: Board::new(),
            current_player: Player::X, // X starts
            outcome: None,
        }
    }

    /// Resume from an arbitrary board with `to_move` on turn.
    pub fn from_board(board: Board, to_move: Player) -> Self {
        GameState {
            board,
            current_player: to_move,
            outcome: GameOutcome::of(&board),
        }
    }

    pub fn current_player(&self) -> Player {
        self.current_player
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    /// Empty cells, or nothing once the game is over.
    pub fn legal_actions(&self) -> Vec<usize> {
        if self.is_terminal() {
            return Vec::new();
        }
        self.board.valid_actions()
    }

    /// Apply a move and return new state (immutable)
    pub fn apply_move(&self, cell: usize) -> Result<GameState, MoveError> {
        if self.is_terminal() {
            return Err(MoveError::GameOver);
        }

        let board = self.board.with_move(cell, self.current_player)?;
        Ok(GameState {
            board,
            current_player: self.current_player.other(),
            outcome: GameOutcome::of(&board),
        })
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::initial()
    }
}
