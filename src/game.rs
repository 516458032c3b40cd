use std::collections::VecDeque;

use rand::Rng;
use ratatui::style::Color;

// ============================================================================
// Configuration
// ============================================================================

pub const COLS: usize = 10;
pub const ROWS: usize = 20;
pub const PREVIEW_COUNT: usize = 3;

/// Gravity interval; the host timer delivers one `tick()` per interval.
pub const TICK_MS: u64 = 1000;

/// Pieces enter the board partially above the visible area.
pub const SPAWN_ROW: i16 = -2;

// Scoring
pub const SCORE_SINGLE: u32 = 40;
pub const SCORE_DOUBLE: u32 = 100;
pub const SCORE_TRIPLE: u32 = 300;
pub const SCORE_TETRIS: u32 = 1200;
pub const DROP_POINTS: u32 = 1;
pub const HARD_DROP_POINTS: u32 = 2;

/// Points awarded for one lock event: a flat drop award (doubled for hard
/// drops) plus the line-clear bonus.
pub fn score_delta(cleared: u32, hard_drop: bool) -> u32 {
    let drop_points = if hard_drop { HARD_DROP_POINTS } else { DROP_POINTS };
    let clear_points = match cleared {
        0 => 0,
        1 => SCORE_SINGLE,
        2 => SCORE_DOUBLE,
        3 => SCORE_TRIPLE,
        _ => SCORE_TETRIS,
    };
    drop_points + clear_points
}

// ============================================================================
// Piece Catalog
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PieceKind {
    I,
    J,
    L,
    O,
    S,
    Z,
    T,
}

impl PieceKind {
    pub const ALL: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::J,
        PieceKind::L,
        PieceKind::O,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::T,
    ];

    /// Occupancy matrix in the default orientation. Always square; the side
    /// length is the rotation footprint (I: 4, O: 2, the rest: 3).
    pub fn matrix(&self) -> Vec<Vec<u8>> {
        match self {
            PieceKind::I => vec![
                vec![0, 0, 0, 0],
                vec![1, 1, 1, 1],
                vec![0, 0, 0, 0],
                vec![0, 0, 0, 0],
            ],
            PieceKind::J => vec![
                vec![1, 0, 0],
                vec![1, 1, 1],
                vec![0, 0, 0],
            ],
            PieceKind::L => vec![
                vec![0, 0, 1],
                vec![1, 1, 1],
                vec![0, 0, 0],
            ],
            PieceKind::O => vec![
                vec![1, 1],
                vec![1, 1],
            ],
            PieceKind::S => vec![
                vec![0, 1, 1],
                vec![1, 1, 0],
                vec![0, 0, 0],
            ],
            PieceKind::Z => vec![
                vec![1, 1, 0],
                vec![0, 1, 1],
                vec![0, 0, 0],
            ],
            PieceKind::T => vec![
                vec![0, 1, 0],
                vec![1, 1, 1],
                vec![0, 0, 0],
            ],
        }
    }

    /// Display color for this kind.
    pub fn color(&self) -> Color {
        match self {
            PieceKind::I => Color::Cyan,
            PieceKind::O => Color::Yellow,
            PieceKind::T => Color::Magenta,
            PieceKind::S => Color::Green,
            PieceKind::Z => Color::Red,
            PieceKind::J => Color::Blue,
            PieceKind::L => Color::Rgb(255, 165, 0),
        }
    }

    fn random() -> Self {
        let mut rng = rand::thread_rng();
        PieceKind::ALL[rng.gen_range(0..PieceKind::ALL.len())]
    }
}

// ============================================================================
// Active Piece
// ============================================================================

/// The falling piece: its kind, an owned (possibly rotated) copy of the
/// catalog matrix, and the board coordinate of the matrix's top-left cell.
#[derive(Clone, Debug)]
pub struct Piece {
    pub kind: PieceKind,
    pub matrix: Vec<Vec<u8>>,
    pub row: i16,
    pub col: i16,
}

impl Piece {
    /// Spawn above the visible board at a random column chosen so the full
    /// matrix width fits within the walls.
    pub fn spawn(kind: PieceKind) -> Self {
        let matrix = kind.matrix();
        let width = matrix.len() as i16;
        let col = rand::thread_rng().gen_range(0..=(COLS as i16 - width));
        Self {
            kind,
            matrix,
            row: SPAWN_ROW,
            col,
        }
    }

    pub fn at(kind: PieceKind, row: i16, col: i16) -> Self {
        Self {
            kind,
            matrix: kind.matrix(),
            row,
            col,
        }
    }

    /// Absolute board coordinates of every set matrix bit.
    pub fn cells(&self) -> Vec<(i16, i16)> {
        let mut cells = Vec::with_capacity(4);
        for (r, matrix_row) in self.matrix.iter().enumerate() {
            for (c, &bit) in matrix_row.iter().enumerate() {
                if bit != 0 {
                    cells.push((self.row + r as i16, self.col + c as i16));
                }
            }
        }
        cells
    }

    /// 90-degree clockwise rotation: `out[i][j] = m[N-1-j][i]`.
    pub fn rotated(&self) -> Self {
        let n = self.matrix.len();
        let mut matrix = vec![vec![0u8; n]; n];
        for (i, row) in matrix.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = self.matrix[n - 1 - j][i];
            }
        }
        Self {
            matrix,
            ..self.clone()
        }
    }

    fn shifted(&self, d_row: i16, d_col: i16) -> Self {
        Self {
            row: self.row + d_row,
            col: self.col + d_col,
            ..self.clone()
        }
    }
}

// ============================================================================
// Types
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cell {
    Empty,
    Filled(PieceKind),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameStatus {
    Running,
    Paused,
    GameOver,
}

/// Named inputs delivered by the host; the gravity `tick()` arrives
/// separately from the timer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    MoveLeft,
    MoveRight,
    SoftDrop,
    Rotate,
    HardDrop,
    Pause,
    Resume,
    Restart,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum GameEvent {
    PieceLocked,
    LinesCleared(u32),
    Paused,
    Resumed,
    Restarted,
    GameOver,
}

// ============================================================================
// Piece Provider Trait
// ============================================================================

/// Source of upcoming piece kinds feeding the preview queue.
pub trait PieceProvider {
    fn next_kind(&mut self) -> PieceKind;
}

/// Uniform independent draws; no bag fairness.
struct RandomPieceProvider;

impl PieceProvider for RandomPieceProvider {
    fn next_kind(&mut self) -> PieceKind {
        PieceKind::random()
    }
}

/// Cycles through a fixed script; used by tests that need determinism.
pub struct SequencePieceProvider {
    kinds: Vec<PieceKind>,
    index: usize,
}

impl SequencePieceProvider {
    pub fn new(kinds: Vec<PieceKind>) -> Self {
        Self { kinds, index: 0 }
    }
}

impl PieceProvider for SequencePieceProvider {
    fn next_kind(&mut self) -> PieceKind {
        let kind = self.kinds[self.index % self.kinds.len()];
        self.index += 1;
        kind
    }
}

// ============================================================================
// Game
// ============================================================================

pub struct Game {
    pub grid: Vec<Vec<Cell>>,
    pub current_piece: Piece,
    pub queue: VecDeque<PieceKind>,
    pub score: u32,
    pub status: GameStatus,
    provider: Box<dyn PieceProvider>,
    events: Vec<GameEvent>,
}

fn empty_rows() -> Vec<Vec<Cell>> {
    vec![vec![Cell::Empty; COLS]; ROWS]
}

// ============================================================================
// Game Logic
// ============================================================================

impl Game {
    pub fn new() -> Self {
        Self::with_provider(Box::new(RandomPieceProvider))
    }

    pub fn with_provider(mut provider: Box<dyn PieceProvider>) -> Self {
        let mut queue = VecDeque::with_capacity(PREVIEW_COUNT);
        for _ in 0..PREVIEW_COUNT {
            queue.push_back(provider.next_kind());
        }

        // Consume the head for the first piece, keeping the queue at three.
        let first = queue.pop_front().unwrap_or_else(PieceKind::random);
        queue.push_back(provider.next_kind());

        Self {
            grid: empty_rows(),
            current_piece: Piece::spawn(first),
            queue,
            score: 0,
            status: GameStatus::Running,
            provider,
            events: Vec::new(),
        }
    }

    /// Construct with a prepared grid and piece; tests use this to set up
    /// exact scenarios.
    pub fn with_grid(grid: Vec<Vec<Cell>>, current_piece: Piece) -> Self {
        let mut provider = RandomPieceProvider;

        let mut queue = VecDeque::with_capacity(PREVIEW_COUNT);
        for _ in 0..PREVIEW_COUNT {
            queue.push_back(provider.next_kind());
        }

        Self {
            grid,
            current_piece,
            queue,
            score: 0,
            status: GameStatus::Running,
            provider: Box::new(provider),
            events: Vec::new(),
        }
    }

    /// True iff every set cell of `piece` is inside the walls, above the
    /// floor, and not overlapping a settled cell. Rows above the board only
    /// face the wall and floor checks; nothing is stored up there.
    pub fn is_valid_position(&self, piece: &Piece) -> bool {
        for (row, col) in piece.cells() {
            if col < 0 || col >= COLS as i16 {
                return false;
            }
            if row >= ROWS as i16 {
                return false;
            }
            if row >= 0 && self.grid[row as usize][col as usize] != Cell::Empty {
                return false;
            }
        }
        true
    }

    /// Write the piece's kind into the board; cells still above row 0 are
    /// dropped silently.
    fn stamp_piece(&mut self) {
        let kind = self.current_piece.kind;
        for (row, col) in self.current_piece.cells() {
            if row >= 0 && row < ROWS as i16 {
                self.grid[row as usize][col as usize] = Cell::Filled(kind);
            }
        }
        self.events.push(GameEvent::PieceLocked);
    }

    /// Remove every full row, pushing a blank row in at the top for each.
    /// Returns the number of rows cleared.
    pub fn clear_rows(&mut self) -> u32 {
        let mut cleared = 0;
        let mut row = 0;

        while row < ROWS {
            if self.grid[row].iter().all(|cell| *cell != Cell::Empty) {
                self.grid.remove(row);
                self.grid.insert(0, vec![Cell::Empty; COLS]);
                cleared += 1;
                // Same index again: the row above just shifted into it.
            } else {
                row += 1;
            }
        }

        if cleared > 0 {
            self.events.push(GameEvent::LinesCleared(cleared));
        }

        cleared
    }

    /// The piece can descend no further. One that never made it past the
    /// spawn zone ends the game without being stamped or scored; otherwise
    /// it settles, full rows collapse, the score grows, and the next piece
    /// enters from the queue.
    fn lock(&mut self, hard_drop: bool) {
        if self.current_piece.row <= 0 {
            self.status = GameStatus::GameOver;
            self.events.push(GameEvent::GameOver);
            return;
        }

        self.stamp_piece();
        let cleared = self.clear_rows();
        self.score += score_delta(cleared, hard_drop);
        self.spawn_next();
    }

    fn spawn_next(&mut self) {
        let kind = self.queue.pop_front().unwrap_or_else(PieceKind::random);
        self.queue.push_back(self.provider.next_kind());
        self.current_piece = Piece::spawn(kind);
    }

    fn try_shift(&mut self, d_row: i16, d_col: i16) -> bool {
        if self.status != GameStatus::Running {
            return false;
        }
        let moved = self.current_piece.shifted(d_row, d_col);
        if self.is_valid_position(&moved) {
            self.current_piece = moved;
            true
        } else {
            false
        }
    }

    pub fn move_left(&mut self) -> bool {
        self.try_shift(0, -1)
    }

    pub fn move_right(&mut self) -> bool {
        self.try_shift(0, 1)
    }

    /// All-or-nothing clockwise rotation; no wall kicks. The O piece is
    /// rotation-invariant, so the request is skipped before any validity
    /// check.
    pub fn rotate(&mut self) -> bool {
        if self.status != GameStatus::Running {
            return false;
        }
        if self.current_piece.kind == PieceKind::O {
            return false;
        }
        let rotated = self.current_piece.rotated();
        if self.is_valid_position(&rotated) {
            self.current_piece = rotated;
            true
        } else {
            false
        }
    }

    /// One gravity step: descend if possible, lock otherwise.
    pub fn tick(&mut self) {
        if self.status != GameStatus::Running {
            return;
        }
        if !self.try_shift(1, 0) {
            self.lock(false);
        }
    }

    /// Player-requested single step; same path as gravity.
    pub fn soft_drop(&mut self) {
        self.tick();
    }

    /// Settle at the lowest valid row and lock immediately.
    pub fn hard_drop(&mut self) {
        if self.status != GameStatus::Running {
            return;
        }

        // Probe on a scratch copy, bounded by the board height.
        let mut probe = self.current_piece.clone();
        for _ in 0..ROWS {
            let lower = probe.shifted(1, 0);
            if self.is_valid_position(&lower) {
                probe = lower;
            } else {
                break;
            }
        }
        self.current_piece = probe;
        self.lock(true);
    }

    pub fn pause(&mut self) {
        if self.status == GameStatus::Running {
            self.status = GameStatus::Paused;
            self.events.push(GameEvent::Paused);
        }
    }

    pub fn resume(&mut self) {
        if self.status == GameStatus::Paused {
            self.status = GameStatus::Running;
            self.events.push(GameEvent::Resumed);
        }
    }

    /// Reinitialize everything; valid from any status.
    pub fn restart(&mut self) {
        self.grid = empty_rows();
        self.score = 0;

        self.queue.clear();
        for _ in 0..PREVIEW_COUNT {
            let kind = self.provider.next_kind();
            self.queue.push_back(kind);
        }
        self.spawn_next();

        self.status = GameStatus::Running;
        self.events.clear();
        self.events.push(GameEvent::Restarted);
    }

    /// Dispatch one named input. While paused only `Resume` applies, and
    /// after game over only `Restart`; the individual operations enforce
    /// that, so inputs that don't apply right now fall through silently.
    pub fn apply(&mut self, action: Action) {
        match action {
            Action::MoveLeft => {
                self.move_left();
            }
            Action::MoveRight => {
                self.move_right();
            }
            Action::SoftDrop => self.soft_drop(),
            Action::Rotate => {
                self.rotate();
            }
            Action::HardDrop => self.hard_drop(),
            Action::Pause => self.pause(),
            Action::Resume => self.resume(),
            Action::Restart => self.restart(),
        }
    }

    // ------------------------------------------------------------------
    // Read surface for the UI
    // ------------------------------------------------------------------

    /// The board with the falling piece overlaid; cells above row 0 are
    /// clipped. This is what the renderer draws.
    pub fn render_grid(&self) -> Vec<Vec<Cell>> {
        let mut visual = self.grid.clone();

        for (row, col) in self.current_piece.cells() {
            if row >= 0 && row < ROWS as i16 && col >= 0 && col < COLS as i16 {
                visual[row as usize][col as usize] = Cell::Filled(self.current_piece.kind);
            }
        }

        visual
    }

    /// Head of the preview queue, shown as the "next" piece.
    pub fn next_kind(&self) -> Option<PieceKind> {
        self.queue.front().copied()
    }

    /// Takes and clears all pending events.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_row_full(&self, row: usize) -> bool {
        self.grid[row].iter().all(|cell| *cell != Cell::Empty)
    }

    pub fn filled_count_in_row(&self, row: usize) -> usize {
        self.grid[row]
            .iter()
            .filter(|cell| **cell != Cell::Empty)
            .count()
    }

    pub fn total_filled_cells(&self) -> usize {
        self.grid
            .iter()
            .flatten()
            .filter(|cell| **cell != Cell::Empty)
            .count()
    }

    pub fn is_game_over(&self) -> bool {
        self.status == GameStatus::GameOver
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

pub mod test_helpers {
    use super::*;

    pub fn empty_grid() -> Vec<Vec<Cell>> {
        vec![vec![Cell::Empty; COLS]; ROWS]
    }

    pub fn fill_row(grid: &mut Vec<Vec<Cell>>, row: usize) {
        for col in 0..COLS {
            grid[row][col] = Cell::Filled(PieceKind::T);
        }
    }

    pub fn fill_row_with_gap(grid: &mut Vec<Vec<Cell>>, row: usize, gap_col: usize) {
        for col in 0..COLS {
            if col != gap_col {
                grid[row][col] = Cell::Filled(PieceKind::T);
            }
        }
    }
}
