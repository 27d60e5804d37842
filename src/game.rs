//! Game state: board, tetromino catalog, active piece, lock and line clear.

/// Default board size in cells (columns x rows).
pub const DEFAULT_COLS: u16 = 10;
pub const DEFAULT_ROWS: u16 = 20;

/// Smallest playable board. The spawn anchor is fixed at column 3 and the
/// widest pattern spans 4 columns, so a narrower board could lock cells past
/// the right edge; the tallest pattern spans 4 rows.
pub const MIN_COLS: u16 = 7;
pub const MIN_ROWS: u16 = 4;

/// Points awarded per cleared row; no bonus for multi-line clears.
pub const POINTS_PER_ROW: u32 = 10;

/// Fixed spawn anchor (top-left of the pattern bounding box). The piece
/// starts two rows above the visible board, centre-biased horizontally.
pub const SPAWN_X: i32 = 3;
pub const SPAWN_Y: i32 = -2;

/// One rotation pattern: a square 0/1 occupancy grid.
pub type Pattern = &'static [&'static [u8]];

/// Tetromino kinds (I, O, T, S, Z, J, L).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TetrominoKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

const I_PATTERNS: [Pattern; 2] = [
    &[
        &[0, 0, 0, 0],
        &[1, 1, 1, 1],
        &[0, 0, 0, 0],
        &[0, 0, 0, 0],
    ],
    &[
        &[0, 0, 1, 0],
        &[0, 0, 1, 0],
        &[0, 0, 1, 0],
        &[0, 0, 1, 0],
    ],
];

const O_PATTERNS: [Pattern; 1] = [&[&[1, 1], &[1, 1]]];

const T_PATTERNS: [Pattern; 4] = [
    &[&[0, 0, 0], &[1, 1, 1], &[0, 1, 0]],
    &[&[0, 1, 0], &[1, 1, 0], &[0, 1, 0]],
    &[&[0, 1, 0], &[1, 1, 1], &[0, 0, 0]],
    &[&[0, 1, 0], &[0, 1, 1], &[0, 1, 0]],
];

const S_PATTERNS: [Pattern; 2] = [
    &[&[0, 1, 1], &[1, 1, 0], &[0, 0, 0]],
    &[&[0, 1, 0], &[0, 1, 1], &[0, 0, 1]],
];

const Z_PATTERNS: [Pattern; 2] = [
    &[&[1, 1, 0], &[0, 1, 1], &[0, 0, 0]],
    &[&[0, 0, 1], &[0, 1, 1], &[0, 1, 0]],
];

const J_PATTERNS: [Pattern; 4] = [
    &[&[1, 0, 0], &[1, 1, 1], &[0, 0, 0]],
    &[&[0, 1, 1], &[0, 1, 0], &[0, 1, 0]],
    &[&[0, 0, 0], &[1, 1, 1], &[0, 0, 1]],
    &[&[0, 1, 0], &[0, 1, 0], &[1, 1, 0]],
];

const L_PATTERNS: [Pattern; 4] = [
    &[&[0, 0, 1], &[1, 1, 1], &[0, 0, 0]],
    &[&[0, 1, 0], &[0, 1, 0], &[0, 1, 1]],
    &[&[0, 0, 0], &[1, 1, 1], &[1, 0, 0]],
    &[&[1, 1, 0], &[0, 1, 0], &[0, 1, 0]],
];

impl TetrominoKind {
    pub const ALL: [Self; 7] = [Self::I, Self::O, Self::T, Self::S, Self::Z, Self::J, Self::L];

    /// Ordered rotation patterns for this kind. All patterns of one kind
    /// share the same square dimensions.
    pub fn patterns(self) -> &'static [Pattern] {
        match self {
            Self::I => &I_PATTERNS,
            Self::O => &O_PATTERNS,
            Self::T => &T_PATTERNS,
            Self::S => &S_PATTERNS,
            Self::Z => &Z_PATTERNS,
            Self::J => &J_PATTERNS,
            Self::L => &L_PATTERNS,
        }
    }

    /// Colour index 0..7 for theme.piece_color():
    /// green, yellow, red, blue, magenta, cyan, orange.
    pub fn color_index(self) -> u8 {
        match self {
            Self::S => 0, // green
            Self::T => 1, // yellow
            Self::Z => 2, // red
            Self::O => 3, // blue
            Self::L => 4, // magenta (purple)
            Self::I => 5, // cyan
            Self::J => 6, // orange
        }
    }
}

/// Single cell: either empty or a locked block of a given colour index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Block(u8),
}

/// Board: grid of cells. Row 0 is the top; dimensions never change after
/// creation.
#[derive(Debug, Clone)]
pub struct Board {
    cols: usize,
    rows: usize,
    cells: Vec<Vec<Cell>>,
}

impl Board {
    pub fn new(cols: u16, rows: u16) -> Self {
        let (cols, rows) = (cols as usize, rows as usize);
        Self {
            cols,
            rows,
            cells: vec![vec![Cell::Empty; cols]; rows],
        }
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        self.cells.get(row).and_then(|r| r.get(col)).copied()
    }

    #[inline]
    pub fn is_empty(&self, row: usize, col: usize) -> bool {
        self.get(row, col) == Some(Cell::Empty)
    }

    /// Sets a cell to a locked colour. Out-of-range coordinates are a
    /// programming error, not a runtime condition.
    pub fn occupy(&mut self, row: usize, col: usize, color: u8) {
        assert!(
            row < self.rows && col < self.cols,
            "occupy out of bounds: ({row}, {col})"
        );
        self.cells[row][col] = Cell::Block(color);
    }

    pub fn is_row_full(&self, row: usize) -> bool {
        self.cells[row].iter().all(|c| *c != Cell::Empty)
    }

    /// Shifts every row above `row` down by one (row `k` takes the values of
    /// row `k - 1`, for `k` from `row` down to 1), then empties row 0. This
    /// removes the full row's content and compacts the stack above it.
    pub fn collapse_row(&mut self, row: usize) {
        for k in (1..=row).rev() {
            self.cells[k] = self.cells[k - 1].clone();
        }
        for cell in &mut self.cells[0] {
            *cell = Cell::Empty;
        }
    }

    /// Collision predicate: true if moving `pattern` anchored at `(x, y)` by
    /// `(dx, dy)` would place an occupied cell outside the column bounds,
    /// below the floor, or on a non-empty board cell. Cells above row 0 are
    /// permitted and skipped.
    pub fn collides(&self, x: i32, y: i32, dx: i32, dy: i32, pattern: Pattern) -> bool {
        for (r, pattern_row) in pattern.iter().enumerate() {
            for (c, &occupied) in pattern_row.iter().enumerate() {
                if occupied == 0 {
                    continue;
                }
                let new_x = x + c as i32 + dx;
                let new_y = y + r as i32 + dy;
                if new_x < 0 || new_x >= self.cols as i32 || new_y >= self.rows as i32 {
                    return true;
                }
                if new_y < 0 {
                    continue;
                }
                if !self.is_empty(new_y as usize, new_x as usize) {
                    return true;
                }
            }
        }
        false
    }
}

/// Deterministic piece source: small LCG, seedable for reproducible games.
#[derive(Debug, Clone)]
pub struct PieceRng {
    state: u32,
}

impl PieceRng {
    pub fn from_seed(seed: u32) -> Self {
        Self { state: seed }
    }

    fn next_rand(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1103515245).wrapping_add(12345);
        self.state >> 16
    }

    /// Uniform pick over the 7 kinds.
    pub fn next_kind(&mut self) -> TetrominoKind {
        TetrominoKind::ALL[(self.next_rand() as usize) % TetrominoKind::ALL.len()]
    }
}

impl Default for PieceRng {
    fn default() -> Self {
        Self::from_seed(0x1234_5678)
    }
}

/// Current falling piece: kind, cyclic rotation index and anchor position.
/// `y` may be negative while the piece is still partly above the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub kind: TetrominoKind,
    pub pattern_index: usize,
    pub x: i32,
    pub y: i32,
}

impl Piece {
    pub fn spawn(kind: TetrominoKind) -> Self {
        Self {
            kind,
            pattern_index: 0,
            x: SPAWN_X,
            y: SPAWN_Y,
        }
    }

    #[inline]
    pub fn pattern(&self) -> Pattern {
        self.kind.patterns()[self.pattern_index]
    }
}

/// Session aggregate: board, active piece, score and game-over flag, owned by
/// the app loop. Exactly one active piece exists; locking replaces it.
#[derive(Debug)]
pub struct GameState {
    pub board: Board,
    pub piece: Piece,
    pub score: u32,
    pub lines_cleared: u32,
    pub game_over: bool,
    /// Rows cleared by the most recent lock; drained by the app for the
    /// line-clear flash.
    pub last_clear_rows: Vec<usize>,
    rng: PieceRng,
}

impl GameState {
    pub fn new(cols: u16, rows: u16, seed: u32) -> Self {
        let mut rng = PieceRng::from_seed(seed);
        let piece = Piece::spawn(rng.next_kind());
        Self {
            board: Board::new(cols, rows),
            piece,
            score: 0,
            lines_cleared: 0,
            game_over: false,
            last_clear_rows: Vec::new(),
            rng,
        }
    }

    pub fn move_left(&mut self) {
        if self.game_over {
            return;
        }
        if !self
            .board
            .collides(self.piece.x, self.piece.y, -1, 0, self.piece.pattern())
        {
            self.piece.x -= 1;
        }
    }

    pub fn move_right(&mut self) {
        if self.game_over {
            return;
        }
        if !self
            .board
            .collides(self.piece.x, self.piece.y, 1, 0, self.piece.pattern())
        {
            self.piece.x += 1;
        }
    }

    /// Rotate to the next pattern. On collision, try a single-cell kick:
    /// left when the anchor is past the horizontal midline, right otherwise
    /// (a position heuristic, not true wall-side detection). If the kicked
    /// position still collides the rotation is rejected entirely.
    pub fn rotate(&mut self) {
        if self.game_over {
            return;
        }
        let patterns = self.piece.kind.patterns();
        let next_index = (self.piece.pattern_index + 1) % patterns.len();
        let next_pattern = patterns[next_index];
        let mut kick = 0;
        if self
            .board
            .collides(self.piece.x, self.piece.y, 0, 0, next_pattern)
        {
            kick = if self.piece.x > self.board.cols() as i32 / 2 {
                -1
            } else {
                1
            };
        }
        if !self
            .board
            .collides(self.piece.x, self.piece.y, kick, 0, next_pattern)
        {
            self.piece.x += kick;
            self.piece.pattern_index = next_index;
        }
    }

    /// Move the piece down one row, or lock it and spawn a replacement when
    /// it rests on the floor or on locked blocks. Also the soft-drop path.
    /// Returns true when the piece locked.
    pub fn move_down(&mut self) -> bool {
        if self.game_over {
            return false;
        }
        if self
            .board
            .collides(self.piece.x, self.piece.y, 0, 1, self.piece.pattern())
        {
            self.lock_piece();
            true
        } else {
            self.piece.y += 1;
            false
        }
    }

    /// Write the piece into the board, clear and score full rows, then spawn
    /// the next piece. A cell above row 0 raises game over; in-bounds cells
    /// of the same lock are still written.
    fn lock_piece(&mut self) {
        let pattern = self.piece.pattern();
        let color = self.piece.kind.color_index();
        for (r, pattern_row) in pattern.iter().enumerate() {
            for (c, &occupied) in pattern_row.iter().enumerate() {
                if occupied == 0 {
                    continue;
                }
                let row = self.piece.y + r as i32;
                if row < 0 {
                    self.game_over = true;
                    continue;
                }
                self.board
                    .occupy(row as usize, (self.piece.x + c as i32) as usize, color);
            }
        }

        // Scan top to bottom; each full row collapses immediately before the
        // scan continues, so stacked full rows are each caught in turn.
        self.last_clear_rows.clear();
        for row in 0..self.board.rows() {
            if self.board.is_row_full(row) {
                self.board.collapse_row(row);
                self.score += POINTS_PER_ROW;
                self.lines_cleared += 1;
                self.last_clear_rows.push(row);
            }
        }

        self.piece = Piece::spawn(self.rng.next_kind());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_state() -> GameState {
        GameState::new(DEFAULT_COLS, DEFAULT_ROWS, 1)
    }

    fn fill_row_except(board: &mut Board, row: usize, gap: Option<usize>) {
        for col in 0..board.cols() {
            if Some(col) != gap {
                board.occupy(row, col, 0);
            }
        }
    }

    #[test]
    fn test_collapse_row_takes_contents_of_row_above() {
        let mut board = Board::new(10, 20);
        fill_row_except(&mut board, 19, None);
        board.occupy(18, 0, 6);
        board.occupy(18, 7, 2);
        board.occupy(0, 4, 1);
        board.collapse_row(19);
        assert_eq!(board.get(19, 0), Some(Cell::Block(6)));
        assert_eq!(board.get(19, 7), Some(Cell::Block(2)));
        assert!(board.is_empty(19, 1));
        // Row 0's old content moved to row 1; row 0 is now empty.
        assert_eq!(board.get(1, 4), Some(Cell::Block(1)));
        assert!((0..10).all(|c| board.is_empty(0, c)));
        assert_eq!(board.rows(), 20);
        assert_eq!(board.cols(), 10);
    }

    #[test]
    fn test_collapse_row_zero_just_empties_top() {
        let mut board = Board::new(10, 20);
        board.occupy(0, 3, 5);
        board.occupy(1, 3, 5);
        board.collapse_row(0);
        assert!(board.is_empty(0, 3));
        assert_eq!(board.get(1, 3), Some(Cell::Block(5)));
    }

    #[test]
    #[should_panic(expected = "occupy out of bounds")]
    fn test_occupy_out_of_bounds_panics() {
        let mut board = Board::new(10, 20);
        board.occupy(20, 0, 0);
    }

    #[test]
    fn test_blocked_moves_leave_piece_unchanged() {
        let mut state = empty_state();
        state.piece = Piece::spawn(TetrominoKind::O);
        // O occupies columns x and x+1; walk to the left wall.
        for _ in 0..3 {
            state.move_left();
        }
        assert_eq!(state.piece.x, 0);
        let before = state.piece.clone();
        state.move_left();
        assert_eq!(state.piece, before);
        // And the right wall.
        for _ in 0..8 {
            state.move_right();
        }
        assert_eq!(state.piece.x, 8);
        let before = state.piece.clone();
        state.move_right();
        assert_eq!(state.piece, before);
    }

    #[test]
    fn test_rotation_cycle_returns_to_first_pattern() {
        for kind in TetrominoKind::ALL {
            let mut state = empty_state();
            state.piece = Piece {
                kind,
                pattern_index: 0,
                x: 3,
                y: 5,
            };
            let n = kind.patterns().len();
            for _ in 0..n {
                state.rotate();
            }
            assert_eq!(state.piece.pattern_index, 0, "kind {kind:?}");
        }
    }

    #[test]
    fn test_descent_from_spawn_until_floor_lock() {
        let mut state = empty_state();
        state.piece = Piece::spawn(TetrominoKind::O);
        assert_eq!((state.piece.x, state.piece.y), (SPAWN_X, SPAWN_Y));
        // O is 2x2: unobstructed descent moves y by exactly 1 per call until
        // y + 2 == 20, i.e. 20 moves from y = -2 to y = 18.
        for expected_y in -1..=18 {
            assert!(!state.move_down());
            assert_eq!(state.piece.y, expected_y);
        }
        // The next call locks instead of moving.
        assert!(state.move_down());
        assert!(!state.game_over);
        assert_eq!(state.board.get(18, 3), Some(Cell::Block(3)));
        assert_eq!(state.board.get(18, 4), Some(Cell::Block(3)));
        assert_eq!(state.board.get(19, 3), Some(Cell::Block(3)));
        assert_eq!(state.board.get(19, 4), Some(Cell::Block(3)));
        assert_eq!(state.score, 0);
        // Replacement piece spawned at the fixed anchor.
        assert_eq!((state.piece.x, state.piece.y), (SPAWN_X, SPAWN_Y));
    }

    #[test]
    fn test_lock_above_top_raises_game_over() {
        let mut state = empty_state();
        state.board.occupy(0, 3, 0);
        state.piece = Piece {
            kind: TetrominoKind::O,
            pattern_index: 0,
            x: 3,
            y: -1,
        };
        state.move_down();
        assert!(state.game_over);
        // The in-bounds cells of the same lock were still written.
        assert_eq!(state.board.get(0, 4), Some(Cell::Block(3)));
        // Game over halts further operations.
        let before = state.piece.clone();
        state.move_down();
        state.move_left();
        state.rotate();
        assert_eq!(state.piece, before);
    }

    #[test]
    fn test_single_row_clear_scores_ten() {
        let mut state = empty_state();
        fill_row_except(&mut state.board, 19, Some(5));
        state.board.occupy(18, 0, 6);
        // Vertical I in column x + 2 = 5, rows 16..=19 once dropped.
        state.piece = Piece {
            kind: TetrominoKind::I,
            pattern_index: 1,
            x: 3,
            y: 16,
        };
        state.move_down();
        assert_eq!(state.score, 10);
        assert_eq!(state.lines_cleared, 1);
        // Row 18's prior contents appear at row 19.
        assert_eq!(state.board.get(19, 0), Some(Cell::Block(6)));
        assert_eq!(state.board.get(19, 5), Some(Cell::Block(5)));
        assert!(state.board.is_empty(19, 1));
        assert!((0..10).all(|c| state.board.is_empty(0, c)));
    }

    #[test]
    fn test_two_simultaneous_full_rows_score_twenty() {
        let mut state = empty_state();
        fill_row_except(&mut state.board, 18, Some(3));
        fill_row_except(&mut state.board, 19, Some(3));
        // Vertical I fills the column-3 gap of both rows.
        state.piece = Piece {
            kind: TetrominoKind::I,
            pattern_index: 1,
            x: 1,
            y: 16,
        };
        state.move_down();
        assert_eq!(state.score, 20);
        assert_eq!(state.lines_cleared, 2);
        assert!(state.board.is_empty(19, 0));
        assert!(!state.game_over);
    }

    #[test]
    fn test_lock_without_full_rows_leaves_score_unchanged() {
        let mut state = empty_state();
        state.piece = Piece::spawn(TetrominoKind::T);
        // Drop until the T locks on the floor (y = 17, then one more call).
        for _ in 0..25 {
            state.move_down();
        }
        let blocks = (0..20)
            .flat_map(|r| (0..10).map(move |c| (r, c)))
            .filter(|&(r, c)| !state.board.is_empty(r, c))
            .count();
        assert!(blocks >= 4);
        // One T locked on an otherwise empty board can never fill a row.
        assert_eq!(state.score, 0);
        assert_eq!(state.lines_cleared, 0);
    }

    #[test]
    fn test_rotate_kicks_left_past_the_midline() {
        let mut state = empty_state();
        // Vertical I flush with the right wall (occupied column x + 2 = 9).
        state.piece = Piece {
            kind: TetrominoKind::I,
            pattern_index: 1,
            x: 7,
            y: 5,
        };
        state.rotate();
        // Horizontal pattern at x = 7 would reach column 10; x > cols / 2 so
        // the kick is -1 and the rotation commits one cell to the left.
        assert_eq!(state.piece.pattern_index, 0);
        assert_eq!(state.piece.x, 6);
    }

    #[test]
    fn test_rejected_rotation_changes_nothing() {
        let mut state = empty_state();
        state.piece = Piece {
            kind: TetrominoKind::I,
            pattern_index: 1,
            x: 7,
            y: 5,
        };
        // Block the kicked position too: horizontal I at x = 6 spans
        // columns 6..=9 on row 6.
        state.board.occupy(6, 6, 0);
        let before = state.piece.clone();
        state.rotate();
        assert_eq!(state.piece, before);
    }

    #[test]
    fn test_move_down_reports_lock_even_at_the_spawn_row() {
        let mut state = empty_state();
        // Blocks directly under the spawn footprint: the piece locks on the
        // very first descent, so its y never changes before the replacement
        // spawns at the same anchor.
        state.board.occupy(0, 3, 0);
        state.piece = Piece::spawn(TetrominoKind::O);
        assert!(state.move_down());
        assert!(state.game_over);
        assert_eq!(state.piece.y, SPAWN_Y);
        // Once the game is over no further lock is reported.
        assert!(!state.move_down());
    }

    #[test]
    fn test_narrowest_board_drops_and_locks_without_panic() {
        let mut state = GameState::new(MIN_COLS, DEFAULT_ROWS, 1);
        // Horizontal I is the widest pattern: columns 3..=6 on a 7-wide board.
        state.piece = Piece::spawn(TetrominoKind::I);
        for _ in 0..25 {
            state.move_down();
        }
        assert_eq!(state.board.get(19, 3), Some(Cell::Block(5)));
        assert_eq!(state.board.get(19, 6), Some(Cell::Block(5)));
        assert!(!state.game_over);
    }

    #[test]
    fn test_piece_rng_is_reproducible() {
        let mut a = PieceRng::from_seed(42);
        let mut b = PieceRng::from_seed(42);
        let seq_a: Vec<_> = (0..10).map(|_| a.next_kind()).collect();
        let seq_b: Vec<_> = (0..10).map(|_| b.next_kind()).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn test_all_patterns_of_a_kind_are_square_and_same_size() {
        for kind in TetrominoKind::ALL {
            let patterns = kind.patterns();
            let size = patterns[0].len();
            for pattern in patterns {
                assert_eq!(pattern.len(), size);
                assert!(pattern.iter().all(|row| row.len() == size));
            }
        }
    }
}
