//! Win-line detection

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::board::{ActiveRegion, Board, Player, Pos};

// ============================================================================
// DIRECTIONS
// ============================================================================

/// Unit step (dx, dy, dz) along a line
pub type Direction = (i8, i8, i8);

/// Rows along X and Z, rods along Y, and the two X-Z diagonals
pub const PLANAR_DIRECTIONS: [Direction; 5] = [
    (1, 0, 0),
    (0, 0, 1),
    (0, 1, 0),
    (1, 0, 1),
    (1, 0, -1),
];

/// All 13 distinct line directions through a cube
pub const SPATIAL_DIRECTIONS: [Direction; 13] = [
    (1, 0, 0),
    (0, 1, 0),
    (0, 0, 1),
    (1, 1, 0),
    (1, -1, 0),
    (1, 0, 1),
    (1, 0, -1),
    (0, 1, 1),
    (0, 1, -1),
    (1, 1, 1),
    (1, 1, -1),
    (1, -1, 1),
    (1, -1, -1),
];

/// Which line directions count for scoring, applied uniformly in every mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionSet {
    #[default]
    Planar,
    Spatial,
}

impl DirectionSet {
    pub fn directions(self) -> &'static [Direction] {
        match self {
            DirectionSet::Planar => &PLANAR_DIRECTIONS,
            DirectionSet::Spatial => &SPATIAL_DIRECTIONS,
        }
    }
}

/// Coarse class of a direction, used by positional weights
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    /// Straight along X or Z
    Axis,
    /// Straight up a rod
    Vertical,
    Diagonal,
}

pub fn line_kind(d: Direction) -> LineKind {
    match d {
        (0, _, 0) => LineKind::Vertical,
        (_, 0, 0) | (0, 0, _) => LineKind::Axis,
        _ => LineKind::Diagonal,
    }
}

// ============================================================================
// RUNS
// ============================================================================

/// A full line of one player's pieces
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinRun {
    pub player: Player,
    pub direction: Direction,
    pub cells: Vec<Pos>,
}

/// Every run found in one detection pass. Runs may share cells.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MatchSet {
    pub runs: Vec<WinRun>,
}

impl MatchSet {
    /// Distinct matched cells, in first-seen order
    pub fn cells(&self) -> Vec<Pos> {
        let mut seen = FxHashSet::default();
        self.runs
            .iter()
            .flat_map(|run| run.cells.iter().copied())
            .filter(|pos| seen.insert(*pos))
            .collect()
    }

    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    pub fn cell_count(&self) -> usize {
        self.cells().len()
    }

    pub fn contains(&self, pos: Pos) -> bool {
        self.runs.iter().any(|run| run.cells.contains(&pos))
    }
}

/// A candidate line: a start cell plus a direction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub start: Pos,
    pub direction: Direction,
    pub len: u8,
}

impl Window {
    pub fn cells(&self) -> impl Iterator<Item = Pos> {
        let (dx, dy, dz) = self.direction;
        let start = self.start;
        (0..self.len as i16).map(move |i| {
            Pos::new(
                (start.x as i16 + dx as i16 * i) as u8,
                (start.y as i16 + dy as i16 * i) as u8,
                (start.z as i16 + dz as i16 * i) as u8,
            )
        })
    }
}

/// Inclusive range of start coordinates on one axis so that `len` steps of
/// `d` stay within [lo, hi]
fn start_range(lo: i16, hi: i16, len: i16, d: i8) -> (i16, i16) {
    match d {
        1 => (lo, hi - (len - 1)),
        -1 => (lo + len - 1, hi),
        _ => (lo, hi),
    }
}

// ============================================================================
// DETECTOR
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct LineDetector {
    pub directions: DirectionSet,
}

impl LineDetector {
    pub fn new(directions: DirectionSet) -> Self {
        Self { directions }
    }

    /// Every window of `region.side` cells that fits inside the region
    pub fn windows(&self, region: ActiveRegion) -> impl Iterator<Item = Window> + '_ {
        let len = region.side as i16;
        let lo = region.start as i16;
        let hi = lo + len - 1;
        let y_hi = region.height as i16 - 1;

        self.directions
            .directions()
            .iter()
            .filter(move |_| len > 0)
            .flat_map(move |&direction| {
                let (dx, dy, dz) = direction;
                let (x0, x1) = start_range(lo, hi, len, dx);
                let (y0, y1) = start_range(0, y_hi, len, dy);
                let (z0, z1) = start_range(lo, hi, len, dz);
                (x0..=x1).flat_map(move |x| {
                    (y0..=y1).flat_map(move |y| {
                        (z0..=z1).map(move |z| Window {
                            start: Pos::new(x as u8, y as u8, z as u8),
                            direction,
                            len: len as u8,
                        })
                    })
                })
            })
    }

    /// All runs owned entirely by `player`, or `None` when there are none
    pub fn find_runs(&self, board: &Board, player: Player) -> Option<MatchSet> {
        let runs: Vec<WinRun> = self
            .windows(board.region())
            .filter(|w| w.cells().all(|pos| board.get(pos) == Some(player)))
            .map(|w| WinRun {
                player,
                direction: w.direction,
                cells: w.cells().collect(),
            })
            .collect();

        if runs.is_empty() {
            None
        } else {
            Some(MatchSet { runs })
        }
    }

    pub fn has_run(&self, board: &Board, player: Player) -> bool {
        self.windows(board.region())
            .any(|w| w.cells().all(|pos| board.get(pos) == Some(player)))
    }

    /// Required line length for the board's current region
    pub fn required_length(&self, board: &Board) -> u8 {
        board.region().side
    }
}
