//! Grid store: gems indexed by (row, col) plus the obstacle layers (layout mask, ice, locks).

use std::collections::BTreeSet;
use std::fmt;

/// Reference board size.
pub const DEFAULT_ROWS: usize = 8;
pub const DEFAULT_COLS: usize = 8;
pub const DEFAULT_NUM_COLORS: u8 = 6;

/// Ice never stacks deeper than this.
pub const MAX_ICE_LAYERS: u8 = 2;

/// A board coordinate. Ordering is row-major, which keeps cell sets deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

impl Pos {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// True if the two cells share an edge.
    pub fn is_adjacent(self, other: Self) -> bool {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col) == 1
    }

    /// Cell offset by (dr, dc); `None` when it would go below zero.
    pub fn offset(self, dr: isize, dc: isize) -> Option<Self> {
        let row = self.row.checked_add_signed(dr)?;
        let col = self.col.checked_add_signed(dc)?;
        Some(Self { row, col })
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Line orientation, shared by striped gems and match runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn perpendicular(self) -> Self {
        match self {
            Self::Horizontal => Self::Vertical,
            Self::Vertical => Self::Horizontal,
        }
    }
}

/// What a gem is. A bomb has no colour, so it can never join an ordinary run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GemKind {
    Normal(u8),
    /// Horizontal stripes clear the row, vertical stripes clear the column.
    Striped { color: u8, axis: Axis },
    Wrapped(u8),
    Bomb,
}

impl GemKind {
    pub fn color(self) -> Option<u8> {
        match self {
            Self::Normal(c) | Self::Wrapped(c) | Self::Striped { color: c, .. } => Some(c),
            Self::Bomb => None,
        }
    }

    pub fn is_special(self) -> bool {
        !matches!(self, Self::Normal(_))
    }

    pub fn is_bomb(self) -> bool {
        matches!(self, Self::Bomb)
    }

    pub fn is_striped(self) -> bool {
        matches!(self, Self::Striped { .. })
    }

    pub fn is_wrapped(self) -> bool {
        matches!(self, Self::Wrapped(_))
    }
}

/// Stable identity so a presentation layer can follow a gem as it falls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GemId(pub u32);

/// A placed gem. Its position is the cell that holds it; there is no second copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gem {
    pub id: GemId,
    pub kind: GemKind,
}

/// Rectangular board. Every layer is a flat row-major `Vec` of `rows * cols`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Option<Gem>>,
    /// false = permanent hole.
    layout: Vec<bool>,
    ice: Vec<u8>,
    locks: Vec<bool>,
    next_id: u32,
}

impl Grid {
    /// Empty grid, all cells active, no obstacles.
    pub fn new(rows: usize, cols: usize) -> Self {
        let n = rows * cols;
        Self {
            rows,
            cols,
            cells: vec![None; n],
            layout: vec![true; n],
            ice: vec![0; n],
            locks: vec![false; n],
            next_id: 0,
        }
    }

    /// Build a grid from text rows, one char per cell:
    /// `0`-`9` plain gem of that colour, `*` bomb, `.` empty active cell, `#` hole.
    /// Rows shorter than the longest row are padded with holes.
    pub fn parse(rows: &[&str]) -> Self {
        let cols = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        let mut grid = Self::new(rows.len(), cols);
        for (r, line) in rows.iter().enumerate() {
            let chars: Vec<char> = line.chars().collect();
            for c in 0..cols {
                let pos = Pos::new(r, c);
                match chars.get(c).copied().unwrap_or('#') {
                    '#' => grid.set_active(pos, false),
                    '*' => {
                        grid.place(pos, GemKind::Bomb);
                    }
                    ch => {
                        if let Some(d) = ch.to_digit(10) {
                            grid.place(pos, GemKind::Normal(d as u8));
                        }
                    }
                }
            }
        }
        grid
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn in_bounds(&self, pos: Pos) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    #[inline]
    fn index(&self, pos: Pos) -> Option<usize> {
        self.in_bounds(pos).then(|| pos.row * self.cols + pos.col)
    }

    /// Every coordinate in row-major order, holes included.
    pub fn positions(&self) -> impl Iterator<Item = Pos> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| Pos::new(row, col)))
    }

    /// Every active coordinate in row-major order.
    pub fn active_positions(&self) -> impl Iterator<Item = Pos> + '_ {
        self.positions().filter(|&p| self.is_active(p))
    }

    /// Layout mask lookup; out of range reads as inactive.
    #[inline]
    pub fn is_active(&self, pos: Pos) -> bool {
        self.index(pos).is_some_and(|i| self.layout[i])
    }

    /// Marks a cell as a hole (or reopens it). Closing a cell drops its gem and obstacles.
    pub fn set_active(&mut self, pos: Pos, active: bool) {
        if let Some(i) = self.index(pos) {
            self.layout[i] = active;
            if !active {
                self.cells[i] = None;
                self.ice[i] = 0;
                self.locks[i] = false;
            }
        }
    }

    #[inline]
    pub fn get(&self, pos: Pos) -> Option<&Gem> {
        self.index(pos).and_then(|i| self.cells[i].as_ref())
    }

    pub fn kind_at(&self, pos: Pos) -> Option<GemKind> {
        self.get(pos).map(|g| g.kind)
    }

    pub fn color_at(&self, pos: Pos) -> Option<u8> {
        self.kind_at(pos).and_then(GemKind::color)
    }

    /// Puts `gem` at `pos`. Refused (returns false) for holes and out-of-range cells.
    pub fn set(&mut self, pos: Pos, gem: Gem) -> bool {
        match self.index(pos) {
            Some(i) if self.layout[i] => {
                self.cells[i] = Some(gem);
                true
            }
            _ => false,
        }
    }

    /// Creates a fresh gem at `pos`. Returns it, or `None` if the cell cannot hold one.
    pub fn place(&mut self, pos: Pos, kind: GemKind) -> Option<Gem> {
        if !self.is_active(pos) {
            return None;
        }
        let gem = Gem {
            id: GemId(self.next_id),
            kind,
        };
        self.next_id = self.next_id.wrapping_add(1);
        self.set(pos, gem);
        Some(gem)
    }

    /// Changes a gem's kind in place, keeping its identity.
    pub fn set_kind(&mut self, pos: Pos, kind: GemKind) -> bool {
        match self.index(pos).and_then(|i| self.cells[i].as_mut()) {
            Some(gem) => {
                gem.kind = kind;
                true
            }
            None => false,
        }
    }

    /// Removes and returns the gem at `pos`.
    pub fn take(&mut self, pos: Pos) -> Option<Gem> {
        self.index(pos).and_then(|i| self.cells[i].take())
    }

    pub fn clear(&mut self, pos: Pos) {
        self.take(pos);
    }

    /// Exchanges the contents of two cells. No validation; callers check adjacency,
    /// locks and layout first.
    pub fn swap(&mut self, a: Pos, b: Pos) {
        if let (Some(i), Some(j)) = (self.index(a), self.index(b)) {
            self.cells.swap(i, j);
        }
    }

    #[inline]
    pub fn is_locked(&self, pos: Pos) -> bool {
        self.index(pos).is_some_and(|i| self.locks[i])
    }

    /// No-op on holes.
    pub fn set_locked(&mut self, pos: Pos, locked: bool) {
        if let Some(i) = self.index(pos).filter(|&i| self.layout[i]) {
            self.locks[i] = locked;
        }
    }

    #[inline]
    pub fn ice_layers(&self, pos: Pos) -> u8 {
        self.index(pos).map_or(0, |i| self.ice[i])
    }

    /// Clamped to `MAX_ICE_LAYERS`; no-op on holes.
    pub fn set_ice(&mut self, pos: Pos, layers: u8) {
        if let Some(i) = self.index(pos).filter(|&i| self.layout[i]) {
            self.ice[i] = layers.min(MAX_ICE_LAYERS);
        }
    }

    /// Positions holding a gem of this colour (specials of that colour included).
    pub fn cells_of_color(&self, color: u8) -> BTreeSet<Pos> {
        self.positions()
            .filter(|&p| self.color_at(p) == Some(color))
            .collect()
    }

    pub fn gem_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn all_ice_cleared(&self) -> bool {
        self.ice.iter().all(|&l| l == 0)
    }

    pub fn all_locks_cleared(&self) -> bool {
        self.locks.iter().all(|&l| !l)
    }

    pub fn ice_remaining(&self) -> usize {
        self.ice.iter().filter(|&&l| l > 0).count()
    }

    pub fn locks_remaining(&self) -> usize {
        self.locks.iter().filter(|&&l| l).count()
    }

    pub fn has_obstacles(&self) -> bool {
        self.layout.iter().any(|&a| !a) || !self.all_ice_cleared() || !self.all_locks_cleared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reads_colours_bombs_and_holes() {
        let grid = Grid::parse(&["01#", "*.2"]);
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.cols(), 3);
        assert_eq!(grid.color_at(Pos::new(0, 1)), Some(1));
        assert!(!grid.is_active(Pos::new(0, 2)));
        assert_eq!(grid.kind_at(Pos::new(1, 0)), Some(GemKind::Bomb));
        assert!(grid.is_active(Pos::new(1, 1)));
        assert!(grid.get(Pos::new(1, 1)).is_none());
        assert_eq!(grid.gem_count(), 4);
    }

    #[test]
    fn out_of_range_reads_as_inactive() {
        let grid = Grid::new(2, 2);
        assert!(!grid.is_active(Pos::new(2, 0)));
        assert!(!grid.is_active(Pos::new(0, 5)));
        assert!(!grid.is_locked(Pos::new(9, 9)));
        assert_eq!(grid.ice_layers(Pos::new(9, 9)), 0);
    }

    #[test]
    fn holes_refuse_gems_and_obstacles() {
        let mut grid = Grid::parse(&["0#"]);
        let hole = Pos::new(0, 1);
        assert!(grid.place(hole, GemKind::Normal(1)).is_none());
        grid.set_ice(hole, 2);
        grid.set_locked(hole, true);
        assert_eq!(grid.ice_layers(hole), 0);
        assert!(!grid.is_locked(hole));
    }

    #[test]
    fn swap_twice_restores_positions() {
        let mut grid = Grid::parse(&["012", "345"]);
        let before = grid.clone();
        grid.swap(Pos::new(0, 1), Pos::new(1, 1));
        assert_eq!(grid.color_at(Pos::new(0, 1)), Some(4));
        assert_eq!(grid.color_at(Pos::new(1, 1)), Some(1));
        grid.swap(Pos::new(0, 1), Pos::new(1, 1));
        assert_eq!(grid, before);
    }

    #[test]
    fn set_kind_keeps_identity() {
        let mut grid = Grid::parse(&["3"]);
        let pos = Pos::new(0, 0);
        let id = grid.get(pos).map(|g| g.id);
        assert!(grid.set_kind(pos, GemKind::Wrapped(3)));
        assert_eq!(grid.get(pos).map(|g| g.id), id);
        assert!(grid.kind_at(pos).is_some_and(GemKind::is_wrapped));
    }

    #[test]
    fn ice_is_clamped() {
        let mut grid = Grid::new(1, 1);
        grid.set_ice(Pos::new(0, 0), 7);
        assert_eq!(grid.ice_layers(Pos::new(0, 0)), MAX_ICE_LAYERS);
        assert!(grid.has_obstacles());
    }

    #[test]
    fn adjacency_is_orthogonal_only() {
        let p = Pos::new(3, 3);
        assert!(p.is_adjacent(Pos::new(3, 4)));
        assert!(p.is_adjacent(Pos::new(2, 3)));
        assert!(!p.is_adjacent(Pos::new(4, 4)));
        assert!(!p.is_adjacent(p));
        assert_eq!(Pos::new(0, 0).offset(-1, 0), None);
    }
}
