//! Rod grid geometry, placement and gravity

use serde::{Deserialize, Serialize};

use crate::error::PlacementError;

// ============================================================================
// CORE TYPES
// ============================================================================

/// Player identity, also the owner of an occupied cell
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Player {
    One = 1,
    Two = 2,
}

impl Player {
    pub fn opponent(self) -> Self {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    /// Zero-based index for per-player arrays
    pub fn index(self) -> usize {
        match self {
            Player::One => 0,
            Player::Two => 1,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Player::One),
            2 => Some(Player::Two),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        self as u8
    }
}

/// A rod on the board, addressed by (x, z)
pub type Column = (u8, u8);

/// Cell coordinates; y grows upward from the base of the rod
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pos {
    pub x: u8,
    pub y: u8,
    pub z: u8,
}

impl Pos {
    pub const fn new(x: u8, y: u8, z: u8) -> Self {
        Self { x, y, z }
    }

    pub fn column(&self) -> Column {
        (self.x, self.z)
    }
}

/// A piece moved by gravity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fall {
    pub from: Pos,
    pub to: Pos,
    pub player: Player,
}

/// Centered playable sub-grid of the allocated board.
///
/// `side` is both the width/depth of the region and the required line
/// length; `height` caps how tall a rod may grow this round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveRegion {
    pub start: u8,
    pub side: u8,
    pub height: u8,
}

impl ActiveRegion {
    /// Region covering a whole `size`-wide board
    pub const fn full(size: u8, height: u8) -> Self {
        Self { start: 0, side: size, height }
    }

    /// `side`-wide cube centered in a `board_size`-wide board
    pub fn centered(board_size: u8, side: u8) -> Self {
        let side = side.min(board_size);
        Self {
            start: (board_size - side) / 2,
            side,
            height: side,
        }
    }

    /// True if the region lies inside a `size`-wide board of rods
    /// `height` tall
    pub fn fits(&self, size: u8, height: u8) -> bool {
        self.start as usize + self.side as usize <= size as usize && self.height <= height
    }

    /// Last in-region x/z index (inclusive)
    pub fn end(&self) -> u8 {
        self.start + self.side.saturating_sub(1)
    }

    pub fn contains_column(&self, x: u8, z: u8) -> bool {
        (self.start..self.start + self.side).contains(&x)
            && (self.start..self.start + self.side).contains(&z)
    }

    pub fn contains(&self, pos: Pos) -> bool {
        self.contains_column(pos.x, pos.z) && pos.y < self.height
    }

    /// Placements available in this region
    pub fn capacity(&self) -> u32 {
        self.side as u32 * self.side as u32 * self.height as u32
    }

    /// In-region rods, x-major
    pub fn columns(&self) -> impl Iterator<Item = Column> {
        let (lo, hi) = (self.start, self.start + self.side);
        (lo..hi).flat_map(move |x| (lo..hi).map(move |z| (x, z)))
    }
}

// ============================================================================
// BOARD
// ============================================================================

/// Dense occupancy grid; each rod is stored contiguously bottom-up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    size: u8,
    height: u8,
    cells: Vec<Option<Player>>,
    region: ActiveRegion,
}

impl Board {
    /// Empty `size`×`height`×`size` board whose whole extent is active
    pub fn new(size: u8, height: u8) -> Self {
        let len = size as usize * size as usize * height as usize;
        Self {
            size,
            height,
            cells: vec![None; len],
            region: ActiveRegion::full(size, height),
        }
    }

    pub fn size(&self) -> u8 {
        self.size
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    pub fn region(&self) -> ActiveRegion {
        self.region
    }

    /// Swap the active region; cells are kept as they are
    pub fn set_region(&mut self, region: ActiveRegion) {
        debug_assert!(region.fits(self.size, self.height));
        self.region = region;
    }

    fn rod_offset(&self, x: u8, z: u8) -> usize {
        (x as usize * self.size as usize + z as usize) * self.height as usize
    }

    pub fn in_bounds(&self, pos: Pos) -> bool {
        pos.x < self.size && pos.z < self.size && pos.y < self.height
    }

    fn index(&self, pos: Pos) -> usize {
        self.rod_offset(pos.x, pos.z) + pos.y as usize
    }

    fn rod(&self, x: u8, z: u8) -> &[Option<Player>] {
        let start = self.rod_offset(x, z);
        &self.cells[start..start + self.height as usize]
    }

    /// Owner of a cell; out-of-bounds cells read as empty
    pub fn get(&self, pos: Pos) -> Option<Player> {
        if !self.in_bounds(pos) {
            return None;
        }
        self.cells[self.index(pos)]
    }

    pub(crate) fn set(&mut self, pos: Pos, cell: Option<Player>) {
        if self.in_bounds(pos) {
            let idx = self.index(pos);
            self.cells[idx] = cell;
        }
    }

    /// Lowest empty cell of a rod within this round's height
    pub fn first_empty_height(&self, x: u8, z: u8) -> Option<u8> {
        if x >= self.size || z >= self.size {
            return None;
        }
        self.rod(x, z)[..self.region.height as usize]
            .iter()
            .position(Option::is_none)
            .map(|y| y as u8)
    }

    pub fn is_full(&self, x: u8, z: u8) -> bool {
        self.first_empty_height(x, z).is_none()
    }

    pub fn in_region(&self, x: u8, z: u8) -> bool {
        x < self.size && z < self.size && self.region.contains_column(x, z)
    }

    /// Height a piece would land at, without placing it
    pub fn landing_height(&self, x: u8, z: u8) -> Result<u8, PlacementError> {
        if !self.in_region(x, z) {
            return Err(PlacementError::OutOfActiveRegion { x, z });
        }
        self.first_empty_height(x, z)
            .ok_or(PlacementError::RodFull { x, z })
    }

    /// Drop a piece onto rod (x, z), returning the height it landed at
    pub fn place(&mut self, x: u8, z: u8, player: Player) -> Result<u8, PlacementError> {
        let y = self.landing_height(x, z)?;
        self.set(Pos::new(x, y, z), Some(player));
        Ok(y)
    }

    /// In-region rods that can still take a piece
    pub fn valid_columns(&self) -> Vec<Column> {
        self.region
            .columns()
            .filter(|&(x, z)| !self.is_full(x, z))
            .collect()
    }

    /// Empty the given cells. Gravity is not applied.
    pub fn clear(&mut self, positions: &[Pos]) {
        for &pos in positions {
            self.set(pos, None);
        }
    }

    /// Compact every rod toward y=0, preserving order, and report each move
    pub fn apply_gravity(&mut self) -> Vec<Fall> {
        let mut falls = Vec::new();
        for x in 0..self.size {
            for z in 0..self.size {
                let base = self.rod_offset(x, z);
                let mut write = 0usize;
                for read in 0..self.height as usize {
                    let Some(player) = self.cells[base + read] else {
                        continue;
                    };
                    if write != read {
                        self.cells[base + write] = Some(player);
                        self.cells[base + read] = None;
                        falls.push(Fall {
                            from: Pos::new(x, read as u8, z),
                            to: Pos::new(x, write as u8, z),
                            player,
                        });
                    }
                    write += 1;
                }
            }
        }
        falls
    }

    /// Replay moves reported by [`Board::apply_gravity`] on another copy
    pub fn apply_falls(&mut self, falls: &[Fall]) {
        for fall in falls {
            self.set(fall.from, None);
            self.set(fall.to, Some(fall.player));
        }
    }

    /// Gravity invariant: every rod is a contiguous stack from y=0
    pub fn is_settled(&self) -> bool {
        (0..self.size).all(|x| {
            (0..self.size).all(|z| {
                let rod = self.rod(x, z);
                let filled = rod.iter().take_while(|c| c.is_some()).count();
                rod[filled..].iter().all(Option::is_none)
            })
        })
    }

    /// Pieces anywhere on the allocated board, not just the active region
    pub fn occupied_count(&self) -> u32 {
        self.cells.iter().filter(|c| c.is_some()).count() as u32
    }

    pub fn occupied(&self) -> impl Iterator<Item = (Pos, Player)> + '_ {
        (0..self.size).flat_map(move |x| {
            (0..self.size).flat_map(move |z| {
                (0..self.height).filter_map(move |y| {
                    let pos = Pos::new(x, y, z);
                    self.get(pos).map(|p| (pos, p))
                })
            })
        })
    }

    /// Plain-text dump, one layer per block, top layer first
    pub fn render(&self) -> String {
        let mut out = String::new();
        for y in (0..self.height).rev() {
            out.push_str(&format!("y={}\n", y));
            for z in 0..self.size {
                for x in 0..self.size {
                    let c = match self.get(Pos::new(x, y, z)) {
                        Some(Player::One) => 'X',
                        Some(Player::Two) => 'O',
                        None if self.region.contains(Pos::new(x, y, z)) => '.',
                        None => ' ',
                    };
                    out.push(c);
                    out.push(' ');
                }
                out.push('\n');
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_stacks_upward() {
        let mut board = Board::new(3, 3);
        assert_eq!(board.place(1, 1, Player::One), Ok(0));
        assert_eq!(board.place(1, 1, Player::Two), Ok(1));
        assert_eq!(board.get(Pos::new(1, 1, 1)), Some(Player::Two));
        assert_eq!(board.first_empty_height(1, 1), Some(2));
    }

    #[test]
    fn test_place_full_rod() {
        let mut board = Board::new(2, 2);
        board.place(0, 0, Player::One).unwrap();
        board.place(0, 0, Player::One).unwrap();
        assert!(board.is_full(0, 0));
        assert_eq!(
            board.place(0, 0, Player::Two),
            Err(PlacementError::RodFull { x: 0, z: 0 })
        );
    }

    #[test]
    fn test_place_outside_region() {
        let mut board = Board::new(5, 5);
        board.set_region(ActiveRegion::centered(5, 3));
        assert_eq!(
            board.place(0, 2, Player::One),
            Err(PlacementError::OutOfActiveRegion { x: 0, z: 2 })
        );
        assert_eq!(
            board.place(9, 9, Player::One),
            Err(PlacementError::OutOfActiveRegion { x: 9, z: 9 })
        );
        assert_eq!(board.place(1, 3, Player::One), Ok(0));
    }

    #[test]
    fn test_region_height_caps_rod() {
        let mut board = Board::new(5, 5);
        board.set_region(ActiveRegion::centered(5, 3));
        for _ in 0..3 {
            board.place(2, 2, Player::One).unwrap();
        }
        assert!(board.is_full(2, 2));
        board.set_region(ActiveRegion::centered(5, 4));
        assert_eq!(board.first_empty_height(2, 2), Some(3));
    }

    #[test]
    fn test_centered_region() {
        let r = ActiveRegion::centered(5, 3);
        assert_eq!((r.start, r.end(), r.height), (1, 3, 3));
        let r = ActiveRegion::centered(5, 4);
        assert_eq!((r.start, r.end()), (0, 3));
        assert_eq!(r.capacity(), 64);
        assert_eq!(r.columns().count(), 16);
    }

    #[test]
    fn test_gravity_compacts_and_reports() {
        let mut board = Board::new(2, 4);
        board.set(Pos::new(0, 1, 0), Some(Player::One));
        board.set(Pos::new(0, 3, 0), Some(Player::Two));
        assert!(!board.is_settled());

        let falls = board.apply_gravity();
        assert!(board.is_settled());
        assert_eq!(board.get(Pos::new(0, 0, 0)), Some(Player::One));
        assert_eq!(board.get(Pos::new(0, 1, 0)), Some(Player::Two));
        assert_eq!(falls.len(), 2);
        assert_eq!(falls[1].from, Pos::new(0, 3, 0));
        assert_eq!(falls[1].to, Pos::new(0, 1, 0));
    }

    #[test]
    fn test_apply_falls_matches_gravity() {
        let mut board = Board::new(3, 3);
        board.set(Pos::new(2, 2, 1), Some(Player::Two));
        board.set(Pos::new(1, 1, 1), Some(Player::One));
        let mut copy = board.clone();

        let falls = board.apply_gravity();
        copy.apply_falls(&falls);
        assert_eq!(board, copy);
    }

    #[test]
    fn test_occupied_count_spans_whole_board() {
        let mut board = Board::new(5, 5);
        board.place(0, 0, Player::One).unwrap();
        board.set_region(ActiveRegion::centered(5, 3));
        board.place(2, 2, Player::Two).unwrap();
        assert_eq!(board.occupied_count(), 2);
        assert_eq!(board.occupied().count(), 2);
    }
}
