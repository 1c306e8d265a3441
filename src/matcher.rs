//! Match detection: horizontal/vertical runs of three or more, classified into shapes.

use crate::grid::{Axis, Grid, Pos};
use std::collections::BTreeSet;

/// Shortest run that counts as a match.
pub const MIN_RUN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Line3,
    Line4,
    /// Five or longer.
    Line5,
    L,
    T,
}

impl Shape {
    fn for_line(len: usize) -> Self {
        match len {
            0..=3 => Self::Line3,
            4 => Self::Line4,
            _ => Self::Line5,
        }
    }
}

/// One classified match. `direction` is `None` for L/T groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchGroup {
    /// Cells in discovery order; the spawn fallback picks the middle entry.
    pub cells: Vec<Pos>,
    pub shape: Shape,
    pub direction: Option<Axis>,
    pub color: u8,
}

impl MatchGroup {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, pos: Pos) -> bool {
        self.cells.contains(&pos)
    }

    pub fn middle(&self) -> Option<Pos> {
        self.cells.get(self.cells.len() / 2).copied()
    }
}

#[derive(Debug)]
struct Run {
    cells: Vec<Pos>,
    color: u8,
}

impl Run {
    fn shares_cell(&self, other: &Run) -> bool {
        self.cells.iter().any(|c| other.cells.contains(c))
    }
}

/// Scans one line of cells (a row or a column) for runs of `MIN_RUN` or more.
/// A run starts at any coloured gem and extends while the colour repeats;
/// empty cells, holes and bombs all break it.
fn scan_line(grid: &Grid, line: impl Iterator<Item = Pos>, out: &mut Vec<Run>) {
    let mut current: Vec<Pos> = Vec::new();
    let mut color: Option<u8> = None;
    for pos in line {
        let here = grid.color_at(pos);
        if here.is_some() && here == color {
            current.push(pos);
            continue;
        }
        if let Some(c) = color.filter(|_| current.len() >= MIN_RUN) {
            out.push(Run {
                cells: std::mem::take(&mut current),
                color: c,
            });
        }
        current.clear();
        color = here;
        if here.is_some() {
            current.push(pos);
        }
    }
    if let Some(c) = color.filter(|_| current.len() >= MIN_RUN) {
        out.push(Run {
            cells: current,
            color: c,
        });
    }
}

fn horizontal_runs(grid: &Grid) -> Vec<Run> {
    let mut runs = Vec::new();
    for row in 0..grid.rows() {
        scan_line(grid, (0..grid.cols()).map(|col| Pos::new(row, col)), &mut runs);
    }
    runs
}

fn vertical_runs(grid: &Grid) -> Vec<Run> {
    let mut runs = Vec::new();
    for col in 0..grid.cols() {
        scan_line(grid, (0..grid.rows()).map(|row| Pos::new(row, col)), &mut runs);
    }
    runs
}

/// Finds and classifies every match on the board.
///
/// Each horizontal run is tested against each vertical run of the same colour; a
/// shared cell merges the pair into one L/T group (T when either run is longer than
/// three). Runs not consumed by any intersection become line groups. Output order is
/// intersections first, then leftover horizontal runs, then leftover vertical runs.
pub fn classify_matches(grid: &Grid) -> Vec<MatchGroup> {
    let h_runs = horizontal_runs(grid);
    let v_runs = vertical_runs(grid);
    let mut used_h = vec![false; h_runs.len()];
    let mut used_v = vec![false; v_runs.len()];
    let mut groups = Vec::new();

    for (hi, h) in h_runs.iter().enumerate() {
        for (vi, v) in v_runs.iter().enumerate() {
            if h.color != v.color || !h.shares_cell(v) {
                continue;
            }
            let mut cells = h.cells.clone();
            cells.extend(v.cells.iter().filter(|c| !h.cells.contains(c)));
            let shape = if h.cells.len() > MIN_RUN || v.cells.len() > MIN_RUN {
                Shape::T
            } else {
                Shape::L
            };
            groups.push(MatchGroup {
                cells,
                shape,
                direction: None,
                color: h.color,
            });
            used_h[hi] = true;
            used_v[vi] = true;
        }
    }

    let leftovers = h_runs
        .into_iter()
        .zip(used_h)
        .map(|(run, used)| (run, used, Axis::Horizontal))
        .chain(
            v_runs
                .into_iter()
                .zip(used_v)
                .map(|(run, used)| (run, used, Axis::Vertical)),
        );
    for (run, used, axis) in leftovers {
        if used {
            continue;
        }
        groups.push(MatchGroup {
            shape: Shape::for_line(run.cells.len()),
            direction: Some(axis),
            color: run.color,
            cells: run.cells,
        });
    }
    groups
}

/// Flat, de-duplicated union of every matched cell.
pub fn all_matches(grid: &Grid) -> BTreeSet<Pos> {
    classify_matches(grid)
        .into_iter()
        .flat_map(|g| g.cells)
        .collect()
}

/// Cheaper "is anything matched" check; stops at the first run.
pub fn has_match(grid: &Grid) -> bool {
    let mut runs = Vec::new();
    for row in 0..grid.rows() {
        scan_line(grid, (0..grid.cols()).map(|col| Pos::new(row, col)), &mut runs);
        if !runs.is_empty() {
            return true;
        }
    }
    for col in 0..grid.cols() {
        scan_line(grid, (0..grid.rows()).map(|row| Pos::new(row, col)), &mut runs);
        if !runs.is_empty() {
            return true;
        }
    }
    false
}
