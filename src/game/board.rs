use super::Player;

pub const SIZE: usize = 3;
pub const CELLS: usize = SIZE * SIZE;

/// The eight three-in-a-row combinations: rows, columns, diagonals.
pub const WIN_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    X,
    O,
}

impl Cell {
    /// Absolute encoding: X = +1, O = -1, empty = 0.
    pub fn value(self) -> i8 {
        match self {
            Cell::Empty => 0,
            Cell::X => 1,
            Cell::O => -1,
        }
    }

    fn from_value(value: i8) -> Cell {
        match value.signum() {
            1 => Cell::X,
            -1 => Cell::O,
            _ => Cell::Empty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("cell {0} is already occupied")]
    Occupied(usize),
    #[error("cell {0} is outside the 3x3 board")]
    InvalidCell(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardParseError {
    #[error("expected {CELLS} cells, got {0}")]
    WrongLength(usize),
}

/// Immutable 3x3 board, cells indexed 0..9 row-major.
///
/// Every query is a pure function of the cell contents; boards are `Copy`
/// and moves produce a new board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Board {
    cells: [Cell; CELLS],
}

impl Board {
    /// Create a new empty board
    pub fn new() -> Self {
        Board {
            cells: [Cell::Empty; CELLS],
        }
    }

    /// Build a board from its absolute encoding (+1 X, -1 O, 0 empty).
    pub fn from_encoded(values: [i8; CELLS]) -> Self {
        Board {
            cells: values.map(Cell::from_value),
        }
    }

    /// Convert an external character representation (`'X'`, `'O'`, anything
    /// else empty) plus the agent's marker into an absolute board and the
    /// agent's side.
    pub fn from_external(cells: &[char], agent_marker: char) -> Result<(Board, Player), BoardParseError> {
        if cells.len() != CELLS {
            return Err(BoardParseError::WrongLength(cells.len()));
        }
        let mut board = Board::new();
        for (slot, &c) in board.cells.iter_mut().zip(cells) {
            *slot = match c {
                'X' | 'x' => Cell::X,
                'O' | 'o' => Cell::O,
                _ => Cell::Empty,
            };
        }
        Ok((board, Player::from_marker(agent_marker)))
    }

    pub fn get(&self, index: usize) -> Cell {
        self.cells[index]
    }

    pub fn cells(&self) -> &[Cell; CELLS] {
        &self.cells
    }

    /// Place `player`'s stone on `index`, returning the new board.
    pub fn with_move(&self, index: usize, player: Player) -> Result<Board, MoveError> {
        if index >= CELLS {
            return Err(MoveError::InvalidCell(index));
        }
        if self.cells[index] != Cell::Empty {
            return Err(MoveError::Occupied(index));
        }
        let mut next = *self;
        next.cells[index] = player.to_cell();
        Ok(next)
    }

    /// Absolute encoding of every cell.
    pub fn encoded(&self) -> [i8; CELLS] {
        self.cells.map(Cell::value)
    }

    /// The first satisfied three-in-a-row combination, if any.
    pub fn winning_line(&self) -> Option<[usize; 3]> {
        WIN_LINES.iter().copied().find(|line| {
            let sum: i8 = line.iter().map(|&i| self.cells[i].value()).sum();
            sum.abs() == 3
        })
    }

    pub fn winner(&self) -> Option<Player> {
        self.winning_line().map(|line| match self.cells[line[0]] {
            Cell::X => Player::X,
            _ => Player::O,
        })
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|&c| c != Cell::Empty)
    }

    /// No empty cell and no winner.
    pub fn is_draw(&self) -> bool {
        self.is_full() && self.winner().is_none()
    }

    pub fn is_terminal(&self) -> bool {
        self.is_full() || self.winner().is_some()
    }

    /// Empty cell indices in ascending order.
    pub fn valid_actions(&self) -> Vec<usize> {
        (0..CELLS)
            .filter(|&i| self.cells[i] == Cell::Empty)
            .collect()
    }

    pub fn valid_mask(&self) -> [bool; CELLS] {
        self.cells.map(|c| c == Cell::Empty)
    }

    /// The board as seen by `player`: their stones become X (+1), the
    /// opponent's become O (-1). Applying it twice with the same player
    /// returns the original board.
    pub fn to_perspective(&self, player: Player) -> Board {
        let sign = player.sign();
        Board::from_encoded(self.encoded().map(|v| v * sign))
    }

    /// Count of stones on the board.
    pub fn stones(&self) -> usize {
        self.cells.iter().filter(|&&c| c != Cell::Empty).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(values: [i8; CELLS]) -> Board {
        Board::from_encoded(values)
    }

    #[test]
    fn test_new_board_is_empty() {
        let board = Board::new();
        for i in 0..CELLS {
            assert_eq!(board.get(i), Cell::Empty);
        }
        assert_eq!(board.valid_actions(), (0..9).collect::<Vec<_>>());
        assert!(board.winner().is_none());
        assert!(!board.is_draw());
    }

    #[test]
    fn test_with_move() {
        let board = Board::new().with_move(4, Player::X).unwrap();
        assert_eq!(board.get(4), Cell::X);
        assert_eq!(board.with_move(4, Player::O), Err(MoveError::Occupied(4)));
        assert_eq!(board.with_move(9, Player::O), Err(MoveError::InvalidCell(9)));
    }

    #[test]
    fn test_every_line_wins() {
        for line in WIN_LINES {
            let mut values = [0i8; CELLS];
            for i in line {
                values[i] = -1;
            }
            let b = board(values);
            assert_eq!(b.winner(), Some(Player::O));
            assert_eq!(b.winning_line(), Some(line));
        }
    }

    #[test]
    fn test_scripted_game_reports_top_row() {
        let plies = [
            (0, Player::X),
            (4, Player::O),
            (1, Player::X),
            (5, Player::O),
            (2, Player::X),
        ];
        let mut b = Board::new();
        for (n, &(cell, player)) in plies.iter().enumerate() {
            b = b.with_move(cell, player).unwrap();
            if n + 1 < plies.len() {
                assert!(b.winner().is_none(), "no winner expected after ply {}", n + 1);
            }
        }
        assert_eq!(b.winner(), Some(Player::X));
        assert_eq!(b.winning_line(), Some([0, 1, 2]));
    }

    #[test]
    fn test_full_board_without_line_is_draw() {
        // X O X
        // X O O
        // O X X
        let b = board([1, -1, 1, 1, -1, -1, -1, 1, 1]);
        assert!(b.is_full());
        assert!(b.winner().is_none());
        assert!(b.is_draw());
        assert!(b.is_terminal());
        assert!(b.valid_actions().is_empty());
    }

    #[test]
    fn test_winner_and_draw_are_exclusive() {
        // Full board with a line is a win, not a draw.
        let b = board([1, 1, 1, -1, -1, 1, 1, -1, -1]);
        assert_eq!(b.winner(), Some(Player::X));
        assert!(!b.is_draw());
    }

    #[test]
    fn test_winner_and_draw_exclusive_over_all_reachable_boards() {
        fn walk(b: Board, to_move: Player, seen: &mut usize) {
            *seen += 1;
            assert!(!(b.winner().is_some() && b.is_draw()));
            if b.is_terminal() {
                return;
            }
            for a in b.valid_actions() {
                walk(b.with_move(a, to_move).unwrap(), to_move.other(), seen);
            }
        }
        let mut seen = 0;
        walk(Board::new(), Player::X, &mut seen);
        assert_eq!(seen, 549_946);
    }

    #[test]
    fn test_perspective_is_self_inverse() {
        let b = board([1, -1, 0, 0, 1, -1, 0, 0, 1]);
        for p in [Player::X, Player::O] {
            assert_eq!(b.to_perspective(p).to_perspective(p), b);
        }
        assert_eq!(b.to_perspective(Player::O).encoded(), [-1, 1, 0, 0, -1, 1, 0, 0, -1]);
    }

    #[test]
    fn test_valid_actions_ascending() {
        let b = board([1, 0, -1, 0, 0, 1, -1, 0, 0]);
        assert_eq!(b.valid_actions(), vec![1, 3, 4, 7, 8]);
        let mask = b.valid_mask();
        assert!(mask[1] && !mask[0] && !mask[2]);
    }

    #[test]
    fn test_from_external() {
        let cells = ['X', ' ', 'O', ' ', 'X', ' ', ' ', ' ', 'O'];
        let (b, agent) = Board::from_external(&cells, 'O').unwrap();
        assert_eq!(agent, Player::O);
        assert_eq!(b.encoded(), [1, 0, -1, 0, 1, 0, 0, 0, -1]);
        assert_eq!(
            Board::from_external(&cells[..4], 'X'),
            Err(BoardParseError::WrongLength(4))
        );
    }
}
