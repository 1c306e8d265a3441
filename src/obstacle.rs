//! Ice and lock resolution against a destroy set.

use crate::grid::{Grid, Pos};
use std::collections::BTreeSet;

const NEIGHBOURS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// One ice layer knocked off a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IceHit {
    pub pos: Pos,
    pub remaining: u8,
}

impl IceHit {
    pub fn cleared(self) -> bool {
        self.remaining == 0
    }
}

/// Obstacle changes produced by one destroy set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObstacleChanges {
    pub ice: Vec<IceHit>,
    pub unlocked: Vec<Pos>,
}

impl ObstacleChanges {
    pub fn is_empty(&self) -> bool {
        self.ice.is_empty() && self.unlocked.is_empty()
    }

    pub fn ice_cleared(&self) -> impl Iterator<Item = Pos> + '_ {
        self.ice.iter().filter(|h| h.cleared()).map(|h| h.pos)
    }
}

/// Knocks one layer off every iced cell that was destroyed or borders a destroyed
/// cell. A cell loses at most one layer per call however many neighbours hit it.
pub fn crack_ice(grid: &mut Grid, destroyed: &BTreeSet<Pos>) -> Vec<IceHit> {
    let mut touched = BTreeSet::new();
    for &pos in destroyed {
        touched.insert(pos);
        touched.extend(
            NEIGHBOURS
                .iter()
                .filter_map(|&(dr, dc)| pos.offset(dr, dc)),
        );
    }

    let mut hits = Vec::new();
    for pos in touched {
        if !grid.is_active(pos) {
            continue;
        }
        let layers = grid.ice_layers(pos);
        if layers == 0 {
            continue;
        }
        let remaining = layers - 1;
        grid.set_ice(pos, remaining);
        hits.push(IceHit { pos, remaining });
    }
    hits
}

/// Same as [`crack_ice`] but reports only the cells whose ice is now gone.
pub fn break_ice(grid: &mut Grid, destroyed: &BTreeSet<Pos>) -> Vec<Pos> {
    crack_ice(grid, destroyed)
        .into_iter()
        .filter(|h| h.cleared())
        .map(|h| h.pos)
        .collect()
}

/// Unlocks destroyed cells. Adjacency does not break locks.
pub fn break_locks(grid: &mut Grid, destroyed: &BTreeSet<Pos>) -> Vec<Pos> {
    let mut unlocked = Vec::new();
    for &pos in destroyed {
        if grid.is_active(pos) && grid.is_locked(pos) {
            grid.set_locked(pos, false);
            unlocked.push(pos);
        }
    }
    unlocked
}

/// Applies both obstacle rules for one destroy set.
pub fn resolve(grid: &mut Grid, destroyed: &BTreeSet<Pos>) -> ObstacleChanges {
    ObstacleChanges {
        ice: crack_ice(grid, destroyed),
        unlocked: break_locks(grid, destroyed),
    }
}
