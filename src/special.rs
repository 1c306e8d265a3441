//! Special gems: what a match spawns, what a special clears, and special+special combos.

use crate::grid::{Axis, GemKind, Grid, Pos};
use crate::matcher::{MatchGroup, Shape};
use std::collections::BTreeSet;

/// A special gem to materialise after a match resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spawn {
    pub pos: Pos,
    pub kind: GemKind,
}

/// Destroy set and spawns for one pass of ordinary matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Never contains a spawn cell.
    pub destroyed: BTreeSet<Pos>,
    pub spawns: Vec<Spawn>,
    /// Pre-existing specials that fired, in firing order.
    pub activated: Vec<Pos>,
}

fn row_cells(grid: &Grid, row: usize, out: &mut BTreeSet<Pos>) {
    out.extend((0..grid.cols()).map(|col| Pos::new(row, col)).filter(|&p| grid.is_active(p)));
}

fn col_cells(grid: &Grid, col: usize, out: &mut BTreeSet<Pos>) {
    out.extend((0..grid.rows()).map(|row| Pos::new(row, col)).filter(|&p| grid.is_active(p)));
}

/// Square of side `2 * radius + 1` around `center`, clipped to the board.
fn square(grid: &Grid, center: Pos, radius: isize, out: &mut BTreeSet<Pos>) {
    for dr in -radius..=radius {
        for dc in -radius..=radius {
            if let Some(p) = center.offset(dr, dc).filter(|&p| grid.is_active(p)) {
                out.insert(p);
            }
        }
    }
}

/// Rows `center.row - radius ..= center.row + radius`, clipped.
fn band_rows(grid: &Grid, center: Pos, radius: isize, out: &mut BTreeSet<Pos>) {
    for dr in -radius..=radius {
        if let Some(row) = center.row.checked_add_signed(dr).filter(|&r| r < grid.rows()) {
            row_cells(grid, row, out);
        }
    }
}

fn band_cols(grid: &Grid, center: Pos, radius: isize, out: &mut BTreeSet<Pos>) {
    for dc in -radius..=radius {
        if let Some(col) = center.col.checked_add_signed(dc).filter(|&c| c < grid.cols()) {
            col_cells(grid, col, out);
        }
    }
}

/// Which special a classified match produces, and where.
///
/// The spawn lands on `swap_target` when that cell is part of the group, otherwise
/// on the group's middle cell.
pub fn spawn_for_group(group: &MatchGroup, swap_target: Option<Pos>) -> Option<Spawn> {
    let kind = match group.shape {
        Shape::Line3 => return None,
        Shape::Line4 => GemKind::Striped {
            color: group.color,
            axis: group.direction.unwrap_or(Axis::Horizontal).perpendicular(),
        },
        Shape::Line5 => GemKind::Bomb,
        Shape::L | Shape::T => GemKind::Wrapped(group.color),
    };
    let pos = swap_target
        .filter(|&p| group.contains(p))
        .or_else(|| group.middle())?;
    Some(Spawn { pos, kind })
}

/// Cells a special clears on its own. Bombs clear nothing without a target colour.
pub fn activation_cells(grid: &Grid, pos: Pos) -> BTreeSet<Pos> {
    let mut cells = BTreeSet::new();
    match grid.kind_at(pos) {
        Some(GemKind::Striped {
            axis: Axis::Horizontal,
            ..
        }) => row_cells(grid, pos.row, &mut cells),
        Some(GemKind::Striped {
            axis: Axis::Vertical,
            ..
        }) => col_cells(grid, pos.col, &mut cells),
        Some(GemKind::Wrapped(_)) => square(grid, pos, 1, &mut cells),
        Some(GemKind::Bomb | GemKind::Normal(_)) | None => {}
    }
    cells
}

/// Every cell currently holding a gem of `color`.
pub fn bomb_activation_cells(grid: &Grid, color: u8) -> BTreeSet<Pos> {
    grid.cells_of_color(color)
}

/// Bomb swapped with a plain gem: every gem of that colour plus the bomb itself.
pub fn bomb_blast_cells(grid: &Grid, bomb: Pos, color: u8) -> BTreeSet<Pos> {
    let mut cells = bomb_activation_cells(grid, color);
    cells.insert(bomb);
    cells
}

/// Cells cleared when a swap pairs two specials directly. `a` is where the moving
/// gem now sits and centres the area combos; `b` is its partner.
///
/// Returns `None` unless both gems are special.
pub fn combination_cells(grid: &Grid, a: Pos, b: Pos) -> Option<BTreeSet<Pos>> {
    let ka = grid.kind_at(a)?;
    let kb = grid.kind_at(b)?;
    if !ka.is_special() || !kb.is_special() {
        return None;
    }

    let mut cells = BTreeSet::new();
    match (ka, kb) {
        (GemKind::Bomb, GemKind::Bomb) => {
            cells.extend(grid.active_positions());
        }
        (GemKind::Bomb, other) | (other, GemKind::Bomb) => {
            let bomb = if ka.is_bomb() { a } else { b };
            let color = other.color()?;
            for cc in bomb_activation_cells(grid, color) {
                cells.insert(cc);
                match other {
                    GemKind::Striped {
                        axis: Axis::Horizontal,
                        ..
                    } => row_cells(grid, cc.row, &mut cells),
                    GemKind::Striped {
                        axis: Axis::Vertical,
                        ..
                    } => col_cells(grid, cc.col, &mut cells),
                    GemKind::Wrapped(_) => square(grid, cc, 1, &mut cells),
                    _ => {}
                }
            }
            cells.insert(bomb);
        }
        (GemKind::Striped { .. }, GemKind::Striped { .. }) => {
            for p in [a, b] {
                row_cells(grid, p.row, &mut cells);
                col_cells(grid, p.col, &mut cells);
            }
        }
        (GemKind::Wrapped(_), GemKind::Wrapped(_)) => square(grid, a, 2, &mut cells),
        _ => {
            // striped + wrapped, either order
            band_rows(grid, a, 1, &mut cells);
            band_cols(grid, a, 1, &mut cells);
        }
    }
    Some(cells)
}

/// Resolves one pass of ordinary matches into a destroy set plus spawns.
///
/// Specials caught in a match fire (unless they sit on a spawn cell). Specials caught
/// by those blasts fire once more; anything they reach is destroyed without further
/// expansion, so chains stop two levels deep.
pub fn resolve_groups(grid: &Grid, groups: &[MatchGroup], swap_target: Option<Pos>) -> Resolution {
    let mut spawns: Vec<Spawn> = Vec::new();
    for group in groups {
        if let Some(spawn) = spawn_for_group(group, swap_target) {
            // first claim on a cell wins
            if !spawns.iter().any(|s| s.pos == spawn.pos) {
                spawns.push(spawn);
            }
        }
    }
    let is_spawn = |p: &Pos| spawns.iter().any(|s| s.pos == *p);

    let matched: BTreeSet<Pos> = groups.iter().flat_map(|g| g.cells.iter().copied()).collect();
    let mut activated = Vec::new();
    let mut extra = BTreeSet::new();
    for &pos in &matched {
        let fires = grid.kind_at(pos).is_some_and(GemKind::is_special);
        if fires && !is_spawn(&pos) {
            extra.extend(activation_cells(grid, pos));
            activated.push(pos);
        }
    }

    let first_wave: Vec<Pos> = extra.iter().copied().collect();
    for pos in first_wave {
        if matched.contains(&pos) || activated.contains(&pos) || is_spawn(&pos) {
            continue;
        }
        let fires = grid
            .kind_at(pos)
            .is_some_and(|k| k.is_special() && !k.is_bomb());
        if fires {
            extra.extend(activation_cells(grid, pos));
            activated.push(pos);
        }
    }

    let destroyed = matched
        .union(&extra)
        .copied()
        .filter(|p| !is_spawn(p))
        .collect();
    Resolution {
        destroyed,
        spawns,
        activated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::classify_matches;

    /// 8x8 board with no runs and no possible moves: colour = (2r + c) mod 6.
    fn quiet_board() -> Grid {
        let rows: Vec<String> = (0..8)
            .map(|r| (0..8).map(|c| char::from(b'0' + ((2 * r + c) % 6) as u8)).collect())
            .collect();
        let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        Grid::parse(&refs)
    }

    fn striped(grid: &Grid, pos: Pos, axis: Axis) -> GemKind {
        GemKind::Striped {
            color: grid.color_at(pos).unwrap_or(0),
            axis,
        }
    }

    #[test]
    fn line4_spawns_perpendicular_stripes_on_swap_cell() {
        let grid = Grid::parse(&["1111", "2323"]);
        let groups = classify_matches(&grid);
        let spawn = spawn_for_group(&groups[0], Some(Pos::new(0, 2))).unwrap();
        assert_eq!(spawn.pos, Pos::new(0, 2));
        assert_eq!(
            spawn.kind,
            GemKind::Striped {
                color: 1,
                axis: Axis::Vertical
            }
        );
    }

    #[test]
    fn spawn_falls_back_to_middle_cell() {
        let grid = Grid::parse(&["1111", "2323"]);
        let groups = classify_matches(&grid);
        let spawn = spawn_for_group(&groups[0], Some(Pos::new(1, 0))).unwrap();
        assert_eq!(spawn.pos, Pos::new(0, 2));
        let spawn = spawn_for_group(&groups[0], None).unwrap();
        assert_eq!(spawn.pos, Pos::new(0, 2));
    }

    #[test]
    fn shapes_map_to_specials() {
        let line5 = classify_matches(&Grid::parse(&["44444", "12121"]));
        assert_eq!(spawn_for_group(&line5[0], None).map(|s| s.kind), Some(GemKind::Bomb));
        let l = classify_matches(&Grid::parse(&["555", "501", "523"]));
        assert_eq!(
            spawn_for_group(&l[0], None).map(|s| s.kind),
            Some(GemKind::Wrapped(5))
        );
        let line3 = classify_matches(&Grid::parse(&["333", "121"]));
        assert_eq!(spawn_for_group(&line3[0], None), None);
    }

    #[test]
    fn striped_and_wrapped_activation_patterns() {
        let mut grid = quiet_board();
        let p = Pos::new(3, 4);
        grid.set_kind(p, striped(&grid, p, Axis::Horizontal));
        let cells = activation_cells(&grid, p);
        assert_eq!(cells.len(), 8);
        assert!(cells.iter().all(|c| c.row == 3));

        grid.set_kind(p, GemKind::Wrapped(0));
        assert_eq!(activation_cells(&grid, p).len(), 9);
        let corner = Pos::new(0, 0);
        grid.set_kind(corner, GemKind::Wrapped(0));
        assert_eq!(activation_cells(&grid, corner).len(), 4);
    }

    #[test]
    fn bomb_activation_needs_a_colour() {
        let mut grid = quiet_board();
        grid.set_kind(Pos::new(4, 4), GemKind::Bomb);
        assert!(activation_cells(&grid, Pos::new(4, 4)).is_empty());
    }

    #[test]
    fn bomb_blast_takes_every_gem_of_the_colour() {
        let mut grid = Grid::parse(&[
            "30000000", "03000000", "00000000", "00000000", "00000000", "00000300",
            "00000000", "00000000",
        ]);
        grid.set_kind(Pos::new(4, 4), GemKind::Bomb);
        let cells = bomb_blast_cells(&grid, Pos::new(4, 4), 3);
        let expected: BTreeSet<Pos> = [(0, 0), (1, 1), (5, 5), (4, 4)]
            .into_iter()
            .map(|(r, c)| Pos::new(r, c))
            .collect();
        assert_eq!(cells, expected);
    }

    #[test]
    fn two_stripes_clear_a_double_cross() {
        let mut grid = quiet_board();
        let (a, b) = (Pos::new(2, 3), Pos::new(2, 2));
        grid.set_kind(a, striped(&grid, a, Axis::Vertical));
        grid.set_kind(b, striped(&grid, b, Axis::Horizontal));
        let cells = combination_cells(&grid, a, b).unwrap();
        assert_eq!(cells.len(), 22);
        assert!(cells.iter().all(|p| p.row == 2 || p.col == 2 || p.col == 3));
    }

    #[test]
    fn two_wrapped_clear_five_by_five() {
        let mut grid = quiet_board();
        let (a, b) = (Pos::new(4, 4), Pos::new(4, 5));
        grid.set_kind(a, GemKind::Wrapped(1));
        grid.set_kind(b, GemKind::Wrapped(2));
        assert_eq!(combination_cells(&grid, a, b).map(|c| c.len()), Some(25));
    }

    #[test]
    fn striped_with_wrapped_clears_fat_cross() {
        let mut grid = quiet_board();
        let (a, b) = (Pos::new(4, 4), Pos::new(5, 4));
        grid.set_kind(a, GemKind::Wrapped(1));
        grid.set_kind(b, striped(&grid, b, Axis::Vertical));
        // 3 rows + 3 cols on 8x8: 24 + 24 - 9
        assert_eq!(combination_cells(&grid, a, b).map(|c| c.len()), Some(39));
    }

    #[test]
    fn double_bomb_clears_board() {
        let mut grid = Grid::parse(&["01#", "234", "512"]);
        grid.set_kind(Pos::new(1, 1), GemKind::Bomb);
        grid.set_kind(Pos::new(1, 2), GemKind::Bomb);
        let cells = combination_cells(&grid, Pos::new(1, 1), Pos::new(1, 2)).unwrap();
        assert_eq!(cells.len(), 8);
    }

    #[test]
    fn bomb_with_striped_sweeps_lines_through_each_colour_cell() {
        let mut grid = Grid::parse(&["0123", "1230", "2301", "3022"]);
        let bomb = Pos::new(0, 0);
        grid.set_kind(bomb, GemKind::Bomb);
        let partner = Pos::new(0, 1);
        grid.set_kind(
            partner,
            GemKind::Striped {
                color: 1,
                axis: Axis::Horizontal,
            },
        );
        // colour 1 sits at (0,1), (1,0) and (2,3): rows 0 to 2
        let cells = combination_cells(&grid, bomb, partner).unwrap();
        assert_eq!(cells.len(), 12);
        assert!(cells.iter().all(|p| p.row <= 2));
    }

    #[test]
    fn plain_pairs_are_not_combinations() {
        let mut grid = quiet_board();
        assert_eq!(combination_cells(&grid, Pos::new(0, 0), Pos::new(0, 1)), None);
        let p = Pos::new(0, 0);
        grid.set_kind(p, striped(&grid, p, Axis::Vertical));
        assert_eq!(combination_cells(&grid, p, Pos::new(0, 1)), None);
    }

    #[test]
    fn matched_special_fires_and_spawn_cell_survives() {
        // row 0 is a line4 of colour 1; (0,0) is a vertical striped gem of colour 1
        let mut grid = Grid::parse(&["1111", "2323", "3232", "2323"]);
        grid.set_kind(
            Pos::new(0, 0),
            GemKind::Striped {
                color: 1,
                axis: Axis::Vertical,
            },
        );
        let groups = classify_matches(&grid);
        let res = resolve_groups(&grid, &groups, Some(Pos::new(0, 2)));
        assert_eq!(res.spawns.len(), 1);
        assert_eq!(res.spawns[0].pos, Pos::new(0, 2));
        assert!(!res.destroyed.contains(&Pos::new(0, 2)));
        assert_eq!(res.activated, vec![Pos::new(0, 0)]);
        // row 0 minus the spawn cell, plus column 0
        assert_eq!(res.destroyed.len(), 3 + 3);
    }

    #[test]
    fn chains_stop_after_second_level() {
        // row 0 matches and fires the vertical stripe at (0,0), which reaches the
        // horizontal stripe at (2,0); the wrapped gem at (2,3) is only destroyed
        let mut grid = Grid::parse(&["1114", "2325", "3234", "2325", "3234"]);
        grid.set_kind(
            Pos::new(0, 0),
            GemKind::Striped {
                color: 1,
                axis: Axis::Vertical,
            },
        );
        grid.set_kind(
            Pos::new(2, 0),
            GemKind::Striped {
                color: 3,
                axis: Axis::Horizontal,
            },
        );
        grid.set_kind(Pos::new(2, 3), GemKind::Wrapped(4));
        let groups = classify_matches(&grid);
        assert_eq!(groups.len(), 1);
        let res = resolve_groups(&grid, &groups, None);
        assert_eq!(res.activated, vec![Pos::new(0, 0), Pos::new(2, 0)]);
        assert!(res.destroyed.contains(&Pos::new(2, 3)));
        assert!(!res.destroyed.contains(&Pos::new(1, 2)));
        assert!(!res.destroyed.contains(&Pos::new(3, 3)));
    }
}
