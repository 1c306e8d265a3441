//! Cascade controller: swap validation, the resolve/settle loop and deadlock recovery.
//!
//! A turn is driven one event at a time so a front-end can pace it:
//! [`Board::begin_swap`] validates and arms the board, then [`Board::advance`] yields
//! [`Event`]s until it returns [`Event::Settled`]. [`Board::request_swap`] runs the
//! whole turn in one call.

use crate::grid::{Gem, GemId, GemKind, Grid, Pos};
use crate::level::{BoardSpec, LevelError};
use crate::matcher::{self, MatchGroup};
use crate::obstacle::{self, ObstacleChanges};
use crate::special::{self, Spawn};
use log::{debug, info, trace, warn};
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use thiserror::Error;

/// Points per gem removed by an ordinary match.
pub const BASE_POINTS: u64 = 10;
/// Points per gem removed by a special combination or colour bomb.
pub const COMBO_BASE_POINTS: u64 = 15;
pub const RESHUFFLE_ATTEMPTS: u32 = 100;
/// Reshuffles allowed in one turn before the board is left as is.
pub const MAX_RESHUFFLES_PER_TURN: u32 = 3;
const FILL_ATTEMPTS: u32 = 50;

const RIGHT_AND_DOWN: [(isize, isize); 2] = [(0, 1), (1, 0)];

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    #[error("cell {0} is outside the board")]
    OutOfBounds(Pos),

    #[error("a cascade is still resolving")]
    Busy,

    #[error("the game is over")]
    Finished,
}

/// Why a swap was refused. None of these cost a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotAdjacent,
    /// A hole or an empty cell.
    Inactive,
    Locked,
    NoMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Match,
    /// Two specials swapped together.
    Combination,
    /// A bomb swapped with a coloured gem.
    ColorBomb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted(StepKind),
    Rejected(Rejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    /// `swap_target` is only set on the first pass after a player swap.
    Match { swap_target: Option<Pos> },
    /// `a` holds the gem the player moved.
    Combination { a: Pos, b: Pos },
    ColorBomb { bomb: Pos, color: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Resolving(Trigger),
    Settling,
    Deadlock,
}

/// One destroy pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeStep {
    pub kind: StepKind,
    /// 1 for the pass triggered by the swap, +1 per chained pass.
    pub combo: u32,
    /// Empty for combination and colour-bomb passes.
    pub groups: Vec<MatchGroup>,
    /// Specials whose blast contributed to `destroyed`.
    pub activated: Vec<Pos>,
    pub destroyed: BTreeSet<Pos>,
    pub spawned: Vec<Spawn>,
    pub obstacles: ObstacleChanges,
    pub score: u64,
}

impl CascadeStep {
    pub fn is_special_combination(&self) -> bool {
        self.kind != StepKind::Match
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fall {
    pub id: GemId,
    pub from: Pos,
    pub to: Pos,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Refill {
    pub falls: Vec<Fall>,
    pub spawned: Vec<(Pos, Gem)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reshuffle {
    pub attempts: u32,
    /// Attempts ran out and the last permutation was kept anyway.
    pub exhausted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Cleared(CascadeStep),
    Refilled(Refill),
    Reshuffled(Reshuffle),
    /// The turn is over; input may resume.
    Settled { deadlock_handled: bool },
}

/// Everything one accepted swap did, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub events: Vec<Event>,
    pub score: u64,
    pub deadlock_handled: bool,
    pub board: Grid,
}

impl Turn {
    pub fn steps(&self) -> impl Iterator<Item = &CascadeStep> {
        self.events.iter().filter_map(|e| match e {
            Event::Cleared(step) => Some(step),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapOutcome {
    Rejected(Rejection),
    Accepted(Turn),
}

fn is_movable(grid: &Grid, pos: Pos) -> bool {
    grid.get(pos).is_some() && !grid.is_locked(pos)
}

/// First swap, scanning row-major and trying right before down, that would make a
/// match or moves a bomb. Locked, empty and inactive cells are skipped.
pub fn find_hint(grid: &Grid) -> Option<(Pos, Pos)> {
    let mut scratch = grid.clone();
    for pos in grid.active_positions() {
        if !is_movable(grid, pos) {
            continue;
        }
        for (dr, dc) in RIGHT_AND_DOWN {
            let Some(other) = pos.offset(dr, dc).filter(|&p| is_movable(grid, p)) else {
                continue;
            };
            let bomb = [pos, other]
                .iter()
                .any(|&p| grid.kind_at(p).is_some_and(GemKind::is_bomb));
            if bomb {
                return Some((pos, other));
            }
            scratch.swap(pos, other);
            let hit = matcher::has_match(&scratch);
            scratch.swap(pos, other);
            if hit {
                return Some((pos, other));
            }
        }
    }
    None
}

/// True if any swap would make a match. An unlocked bomb anywhere always counts.
pub fn has_valid_moves(grid: &Grid) -> bool {
    let loose_bomb = grid
        .active_positions()
        .any(|p| !grid.is_locked(p) && grid.kind_at(p).is_some_and(GemKind::is_bomb));
    loose_bomb || find_hint(grid).is_some()
}

#[derive(Debug, Clone)]
pub struct Board {
    grid: Grid,
    num_colors: u8,
    rng: StdRng,
    phase: Phase,
    combo: u32,
    reshuffles_this_turn: u32,
    deadlock_handled: bool,
}

impl Board {
    /// Builds a fresh board from level data. The result never starts with a match;
    /// if a fill leaves no valid move the board is refilled.
    pub fn init(spec: &BoardSpec, seed: u64) -> Result<Self, LevelError> {
        spec.validate(0)?;
        let mut grid = Grid::new(spec.rows, spec.cols);
        for pos in grid.positions().collect::<Vec<_>>() {
            grid.set_active(pos, spec.is_active(pos.row, pos.col));
        }
        // Obstacles go on first so the playability check sees the real locks.
        for ice in &spec.ice {
            grid.set_ice(Pos::new(ice.row, ice.col), ice.layers);
        }
        for &[row, col] in &spec.locks {
            grid.set_locked(Pos::new(row, col), true);
        }
        let mut board = Self::from_grid(grid, spec.num_types, seed);

        for attempt in 1..=FILL_ATTEMPTS {
            board.fill_without_matches();
            if has_valid_moves(&board.grid) {
                break;
            }
            if attempt == FILL_ATTEMPTS {
                warn!("no playable fill found after {FILL_ATTEMPTS} attempts, reshuffling");
                if board.reshuffle().exhausted {
                    board.fill_without_matches();
                }
            }
        }

        debug!(
            "board {}x{} with {} colours, {} iced, {} locked",
            spec.rows,
            spec.cols,
            spec.num_types,
            board.grid.ice_remaining(),
            board.grid.locks_remaining()
        );
        Ok(board)
    }

    /// Wraps an existing grid as-is. Refills draw colours `0..num_colors`.
    pub fn from_grid(grid: Grid, num_colors: u8, seed: u64) -> Self {
        Self {
            grid,
            num_colors: num_colors.max(1),
            rng: StdRng::seed_from_u64(seed),
            phase: Phase::Idle,
            combo: 0,
            reshuffles_this_turn: 0,
            deadlock_handled: false,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn num_colors(&self) -> u8 {
        self.num_colors
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    /// False while a turn is in flight.
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    pub fn has_valid_moves(&self) -> bool {
        has_valid_moves(&self.grid)
    }

    pub fn find_hint(&self) -> Option<(Pos, Pos)> {
        find_hint(&self.grid)
    }

    fn random_color(&mut self) -> u8 {
        self.rng.random_range(0..self.num_colors)
    }

    /// Fills every active cell, avoiding three in a row to the left or above.
    fn fill_without_matches(&mut self) {
        let positions: Vec<Pos> = self.grid.active_positions().collect();
        for pos in positions {
            let mut banned = Vec::with_capacity(2);
            for (dr, dc) in [(0, -1), (-1, 0)] {
                let near = pos.offset(dr, dc).and_then(|p| self.grid.color_at(p));
                let far = pos.offset(2 * dr, 2 * dc).and_then(|p| self.grid.color_at(p));
                if let Some(c) = near.filter(|_| near == far) {
                    banned.push(c);
                }
            }
            let allowed: Vec<u8> = (0..self.num_colors).filter(|c| !banned.contains(c)).collect();
            let color = match allowed.choose(&mut self.rng) {
                Some(&c) => c,
                None => self.random_color(),
            };
            self.grid.place(pos, GemKind::Normal(color));
        }
    }

    /// Validates a swap and arms the cascade. On rejection the board is unchanged.
    pub fn begin_swap(&mut self, a: Pos, b: Pos) -> Result<Verdict, EngineError> {
        if self.phase != Phase::Idle {
            return Err(EngineError::Busy);
        }
        for p in [a, b] {
            if !self.grid.in_bounds(p) {
                return Err(EngineError::OutOfBounds(p));
            }
        }

        let rejection = if !a.is_adjacent(b) {
            Some(Rejection::NotAdjacent)
        } else if self.grid.get(a).is_none() || self.grid.get(b).is_none() {
            Some(Rejection::Inactive)
        } else if self.grid.is_locked(a) || self.grid.is_locked(b) {
            Some(Rejection::Locked)
        } else {
            None
        };
        if let Some(r) = rejection {
            trace!("swap {a} <-> {b} rejected: {r:?}");
            return Ok(Verdict::Rejected(r));
        }

        self.grid.swap(a, b);
        // the gem the player dragged now sits on b
        let trigger = if special::combination_cells(&self.grid, b, a).is_some() {
            Trigger::Combination { a: b, b: a }
        } else if let Some(t) = self.color_bomb_trigger(a, b) {
            t
        } else if matcher::has_match(&self.grid) {
            Trigger::Match { swap_target: Some(b) }
        } else {
            self.grid.swap(a, b);
            trace!("swap {a} <-> {b} rejected: no match");
            return Ok(Verdict::Rejected(Rejection::NoMatch));
        };

        self.combo = 0;
        self.reshuffles_this_turn = 0;
        self.deadlock_handled = false;
        self.phase = Phase::Resolving(trigger);
        let kind = match trigger {
            Trigger::Match { .. } => StepKind::Match,
            Trigger::Combination { .. } => StepKind::Combination,
            Trigger::ColorBomb { .. } => StepKind::ColorBomb,
        };
        Ok(Verdict::Accepted(kind))
    }

    fn color_bomb_trigger(&self, a: Pos, b: Pos) -> Option<Trigger> {
        [(a, b), (b, a)].into_iter().find_map(|(bomb, other)| {
            let is_bomb = self.grid.kind_at(bomb).is_some_and(GemKind::is_bomb);
            let color = self.grid.color_at(other)?;
            is_bomb.then_some(Trigger::ColorBomb { bomb, color })
        })
    }

    /// Runs the next stage of the current turn. Returns `None` when idle.
    pub fn advance(&mut self) -> Option<Event> {
        match self.phase {
            Phase::Idle => None,
            Phase::Resolving(trigger) => {
                let step = self.resolve(trigger);
                self.phase = Phase::Settling;
                Some(Event::Cleared(step))
            }
            Phase::Settling => {
                let refill = self.settle();
                self.phase = if matcher::has_match(&self.grid) {
                    Phase::Resolving(Trigger::Match { swap_target: None })
                } else {
                    Phase::Deadlock
                };
                Some(Event::Refilled(refill))
            }
            Phase::Deadlock => {
                let stuck = !has_valid_moves(&self.grid);
                if !stuck || self.reshuffles_this_turn >= MAX_RESHUFFLES_PER_TURN {
                    if stuck {
                        warn!("board still has no valid moves after {MAX_RESHUFFLES_PER_TURN} reshuffles");
                    }
                    self.phase = Phase::Idle;
                    return Some(Event::Settled {
                        deadlock_handled: self.deadlock_handled,
                    });
                }
                info!("deadlock: no valid moves, reshuffling");
                let reshuffle = self.reshuffle();
                self.reshuffles_this_turn += 1;
                self.deadlock_handled = true;
                self.phase = if matcher::has_match(&self.grid) {
                    Phase::Resolving(Trigger::Match { swap_target: None })
                } else {
                    Phase::Deadlock
                };
                Some(Event::Reshuffled(reshuffle))
            }
        }
    }

    /// Plays a whole turn synchronously.
    pub fn request_swap(&mut self, a: Pos, b: Pos) -> Result<SwapOutcome, EngineError> {
        if let Verdict::Rejected(r) = self.begin_swap(a, b)? {
            return Ok(SwapOutcome::Rejected(r));
        }
        let mut events = Vec::new();
        let mut score = 0;
        let mut deadlock_handled = false;
        while let Some(event) = self.advance() {
            match &event {
                Event::Cleared(step) => score += step.score,
                Event::Settled {
                    deadlock_handled: handled,
                } => deadlock_handled = *handled,
                Event::Refilled(_) | Event::Reshuffled(_) => {}
            }
            events.push(event);
        }
        Ok(SwapOutcome::Accepted(Turn {
            events,
            score,
            deadlock_handled,
            board: self.grid.clone(),
        }))
    }

    fn resolve(&mut self, trigger: Trigger) -> CascadeStep {
        self.combo += 1;
        let (kind, groups, mut destroyed, spawned, activated) = match trigger {
            Trigger::Match { swap_target } => {
                let groups = matcher::classify_matches(&self.grid);
                let res = special::resolve_groups(&self.grid, &groups, swap_target);
                (StepKind::Match, groups, res.destroyed, res.spawns, res.activated)
            }
            Trigger::Combination { a, b } => {
                let cells = special::combination_cells(&self.grid, a, b).unwrap_or_default();
                (StepKind::Combination, Vec::new(), cells, Vec::new(), vec![a, b])
            }
            Trigger::ColorBomb { bomb, color } => {
                let cells = special::bomb_blast_cells(&self.grid, bomb, color);
                (StepKind::ColorBomb, Vec::new(), cells, Vec::new(), vec![bomb])
            }
        };
        destroyed.retain(|&p| self.grid.get(p).is_some());

        let obstacles = obstacle::resolve(&mut self.grid, &destroyed);
        for &pos in &destroyed {
            self.grid.clear(pos);
        }
        for spawn in &spawned {
            if self.grid.get(spawn.pos).is_some() {
                self.grid.set_kind(spawn.pos, spawn.kind);
            } else {
                self.grid.place(spawn.pos, spawn.kind);
            }
        }

        let base = match kind {
            StepKind::Match => BASE_POINTS,
            StepKind::Combination | StepKind::ColorBomb => COMBO_BASE_POINTS,
        };
        let score = destroyed.len() as u64 * base * u64::from(self.combo);
        debug!(
            "{kind:?} pass x{}: {} destroyed, {} spawned, +{score}",
            self.combo,
            destroyed.len(),
            spawned.len()
        );
        CascadeStep {
            kind,
            combo: self.combo,
            groups,
            activated,
            destroyed,
            spawned,
            obstacles,
            score,
        }
    }

    /// Drops gems into the gaps below them, then fills what is left with fresh gems.
    /// Holes act as floors. Locks belong to the cell, so gems fall through a locked
    /// cell and whatever lands there is held by the lock.
    fn settle(&mut self) -> Refill {
        let mut refill = Refill::default();
        for col in 0..self.grid.cols() {
            let mut write: Option<usize> = None;
            for row in (0..self.grid.rows()).rev() {
                let pos = Pos::new(row, col);
                if !self.grid.is_active(pos) {
                    write = None;
                    continue;
                }
                match (self.grid.get(pos).is_some(), write) {
                    (false, None) => write = Some(row),
                    (true, Some(w)) => {
                        let to = Pos::new(w, col);
                        if let Some(gem) = self.grid.take(pos) {
                            self.grid.set(to, gem);
                            refill.falls.push(Fall {
                                id: gem.id,
                                from: pos,
                                to,
                            });
                        }
                        // every cell between `pos` and `to` was empty
                        write = Some(w - 1);
                    }
                    _ => {}
                }
            }
        }

        let empty: Vec<Pos> = self
            .grid
            .active_positions()
            .filter(|&p| self.grid.get(p).is_none())
            .collect();
        for pos in empty {
            let color = self.random_color();
            if let Some(gem) = self.grid.place(pos, GemKind::Normal(color)) {
                refill.spawned.push((pos, gem));
            }
        }
        refill
    }

    /// Permutes the plain, unlocked gems until the board has no match and at least
    /// one valid move. After `RESHUFFLE_ATTEMPTS` the last permutation is kept.
    pub fn reshuffle(&mut self) -> Reshuffle {
        let slots: Vec<Pos> = self
            .grid
            .active_positions()
            .filter(|&p| {
                !self.grid.is_locked(p) && matches!(self.grid.kind_at(p), Some(GemKind::Normal(_)))
            })
            .collect();
        let mut gems: Vec<Gem> = slots.iter().filter_map(|&p| self.grid.get(p).copied()).collect();

        for attempt in 1..=RESHUFFLE_ATTEMPTS {
            gems.shuffle(&mut self.rng);
            for (&pos, &gem) in slots.iter().zip(&gems) {
                self.grid.set(pos, gem);
            }
            if !matcher::has_match(&self.grid) && has_valid_moves(&self.grid) {
                info!("reshuffled after {attempt} attempt(s)");
                return Reshuffle {
                    attempts: attempt,
                    exhausted: false,
                };
            }
        }
        warn!("reshuffle gave up after {RESHUFFLE_ATTEMPTS} attempts, keeping the last one");
        Reshuffle {
            attempts: RESHUFFLE_ATTEMPTS,
            exhausted: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::IceSpec;

    /// Colours 0 0 1 0 on the top row: only (0,2)<->(0,3) makes a match.
    fn one_move_grid() -> Grid {
        Grid::parse(&["0010", "2345", "4523"])
    }

    fn quiet_board() -> Grid {
        let rows: Vec<String> = (0..8)
            .map(|r| (0..8).map(|c| char::from(b'0' + ((2 * r + c) % 6) as u8)).collect())
            .collect();
        let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        Grid::parse(&refs)
    }

    fn drain(board: &mut Board) -> Vec<Event> {
        std::iter::from_fn(|| board.advance()).collect()
    }

    #[test]
    fn init_fills_without_matches() {
        for seed in 0..20 {
            let board = Board::init(&BoardSpec::default(), seed).unwrap();
            assert!(matcher::classify_matches(board.grid()).is_empty());
            assert_eq!(board.grid().gem_count(), 64);
        }
    }

    #[test]
    fn init_is_deterministic_per_seed() {
        let spec = BoardSpec::default();
        let a = Board::init(&spec, 7).unwrap();
        let b = Board::init(&spec, 7).unwrap();
        assert_eq!(a.grid(), b.grid());
    }

    #[test]
    fn init_applies_layout_and_obstacles() {
        let spec = BoardSpec {
            rows: 4,
            cols: 4,
            num_types: 4,
            layout: Some(vec![
                vec![0, 1, 1, 1],
                vec![1, 1, 1, 1],
                vec![1, 1, 1, 1],
                vec![1, 1, 1, 0],
            ]),
            ice: vec![IceSpec {
                row: 1,
                col: 1,
                layers: 2,
            }],
            locks: vec![[2, 2]],
        };
        let board = Board::init(&spec, 3).unwrap();
        let grid = board.grid();
        assert!(!grid.is_active(Pos::new(0, 0)));
        assert!(grid.get(Pos::new(3, 3)).is_none());
        assert_eq!(grid.gem_count(), 14);
        assert_eq!(grid.ice_layers(Pos::new(1, 1)), 2);
        assert!(grid.is_locked(Pos::new(2, 2)));
    }

    #[test]
    fn init_counts_locks_when_checking_for_moves() {
        // Everything below the top row is locked, so a playable board needs a top-row swap.
        let locks = (1..3).flat_map(|r| (0..3).map(move |c| [r, c])).collect();
        let spec = BoardSpec {
            rows: 3,
            cols: 3,
            num_types: 3,
            layout: None,
            ice: Vec::new(),
            locks,
        };
        for seed in 0..30 {
            let board = Board::init(&spec, seed).unwrap();
            assert_eq!(board.grid().locks_remaining(), 6);
            assert!(matcher::classify_matches(board.grid()).is_empty());
            let Some((a, b)) = board.find_hint() else {
                panic!("seed {seed} dealt a board with no legal swap");
            };
            assert_eq!((a.row, b.row), (0, 0), "seed {seed}");
        }
    }

    #[test]
    fn init_rejects_bad_spec() {
        let spec = BoardSpec {
            num_types: 0,
            ..BoardSpec::default()
        };
        assert!(Board::init(&spec, 1).is_err());
    }

    #[test]
    fn rejected_swaps_leave_board_untouched() {
        let mut grid = one_move_grid();
        grid.set_locked(Pos::new(1, 0), true);
        let mut board = Board::from_grid(grid.clone(), 6, 1);
        let cases = [
            (Pos::new(0, 0), Pos::new(0, 2), Rejection::NotAdjacent),
            (Pos::new(0, 0), Pos::new(1, 0), Rejection::Locked),
            (Pos::new(0, 0), Pos::new(0, 1), Rejection::NoMatch),
            (Pos::new(1, 1), Pos::new(1, 2), Rejection::NoMatch),
        ];
        for (a, b, why) in cases {
            assert_eq!(board.begin_swap(a, b), Ok(Verdict::Rejected(why)));
            assert_eq!(board.grid(), &grid);
            assert!(board.is_idle());
        }
    }

    #[test]
    fn empty_cells_and_holes_reject() {
        let mut board = Board::from_grid(Grid::parse(&["0.#"]), 3, 1);
        assert_eq!(
            board.begin_swap(Pos::new(0, 0), Pos::new(0, 1)),
            Ok(Verdict::Rejected(Rejection::Inactive))
        );
        assert_eq!(
            board.begin_swap(Pos::new(0, 1), Pos::new(0, 2)),
            Ok(Verdict::Rejected(Rejection::Inactive))
        );
    }

    #[test]
    fn out_of_bounds_is_an_error() {
        let mut board = Board::from_grid(one_move_grid(), 6, 1);
        assert_eq!(
            board.begin_swap(Pos::new(0, 3), Pos::new(0, 4)),
            Err(EngineError::OutOfBounds(Pos::new(0, 4)))
        );
    }

    #[test]
    fn busy_while_cascade_in_flight() {
        let mut board = Board::from_grid(one_move_grid(), 6, 1);
        assert_eq!(
            board.begin_swap(Pos::new(0, 2), Pos::new(0, 3)),
            Ok(Verdict::Accepted(StepKind::Match))
        );
        assert!(!board.is_idle());
        assert_eq!(
            board.begin_swap(Pos::new(1, 0), Pos::new(1, 1)),
            Err(EngineError::Busy)
        );
        let events = drain(&mut board);
        assert!(matches!(events.last(), Some(Event::Settled { .. })));
        assert!(board.is_idle());
        assert_eq!(board.advance(), None);
    }

    #[test]
    fn accepted_swap_scores_first_pass() {
        let mut board = Board::from_grid(one_move_grid(), 6, 11);
        let outcome = board.request_swap(Pos::new(0, 2), Pos::new(0, 3)).unwrap();
        let SwapOutcome::Accepted(turn) = outcome else {
            panic!("swap should be accepted");
        };
        let first = turn.steps().next().unwrap();
        assert_eq!(first.kind, StepKind::Match);
        assert_eq!(first.combo, 1);
        let expected: BTreeSet<Pos> = (0..3).map(|c| Pos::new(0, c)).collect();
        assert_eq!(first.destroyed, expected);
        assert_eq!(first.score, 30);
        assert!(turn.score >= 30);
        assert_eq!(turn.score, turn.steps().map(|s| s.score).sum::<u64>());
        assert!(matcher::classify_matches(&turn.board).is_empty());
        assert_eq!(turn.board.gem_count(), 12);
    }

    #[test]
    fn combo_grows_per_pass() {
        for seed in 0..10 {
            let mut board = Board::init(&BoardSpec::default(), seed).unwrap();
            let Some((a, b)) = board.find_hint() else {
                continue;
            };
            if let Ok(SwapOutcome::Accepted(turn)) = board.request_swap(a, b) {
                for (i, step) in turn.steps().enumerate() {
                    assert_eq!(step.combo as usize, i + 1);
                }
            }
        }
    }

    #[test]
    fn two_stripes_swap_into_a_cross() {
        let mut grid = quiet_board();
        for (pos, axis) in [
            (Pos::new(2, 2), crate::grid::Axis::Horizontal),
            (Pos::new(2, 3), crate::grid::Axis::Vertical),
        ] {
            let color = grid.color_at(pos).unwrap();
            grid.set_kind(pos, GemKind::Striped { color, axis });
        }
        let mut board = Board::from_grid(grid, 6, 5);
        assert_eq!(
            board.begin_swap(Pos::new(2, 2), Pos::new(2, 3)),
            Ok(Verdict::Accepted(StepKind::Combination))
        );
        let Some(Event::Cleared(step)) = board.advance() else {
            panic!("expected a cleared step");
        };
        assert_eq!(step.destroyed.len(), 22);
        assert_eq!(step.score, 22 * COMBO_BASE_POINTS);
        assert!(step.is_special_combination());
    }

    #[test]
    fn gravity_compacts_columns_and_refills() {
        let mut board = Board::from_grid(Grid::parse(&["0", ".", "1", "."]), 3, 2);
        let ids: Vec<GemId> = [0, 2]
            .iter()
            .filter_map(|&r| board.grid().get(Pos::new(r, 0)).map(|g| g.id))
            .collect();
        let refill = board.settle();
        assert_eq!(board.grid().get(Pos::new(3, 0)).map(|g| g.id), Some(ids[1]));
        assert_eq!(board.grid().get(Pos::new(2, 0)).map(|g| g.id), Some(ids[0]));
        assert_eq!(refill.falls.len(), 2);
        assert_eq!(refill.spawned.len(), 2);
        assert_eq!(board.grid().gem_count(), 4);
    }

    #[test]
    fn holes_stop_falling_gems() {
        let mut board = Board::from_grid(Grid::parse(&["0", "#", "."]), 3, 2);
        let refill = board.settle();
        assert!(refill.falls.is_empty());
        assert_eq!(board.grid().color_at(Pos::new(0, 0)), Some(0));
        assert_eq!(refill.spawned.len(), 1);
    }

    #[test]
    fn gems_fall_through_locked_cells() {
        let mut grid = Grid::parse(&["0", "1", "."]);
        grid.set_locked(Pos::new(1, 0), true);
        let mut board = Board::from_grid(grid, 3, 2);
        let refill = board.settle();
        let moves: Vec<(Pos, Pos)> = refill.falls.iter().map(|f| (f.from, f.to)).collect();
        assert_eq!(
            moves,
            vec![
                (Pos::new(1, 0), Pos::new(2, 0)),
                (Pos::new(0, 0), Pos::new(1, 0)),
            ]
        );
        assert_eq!(board.grid().color_at(Pos::new(2, 0)), Some(1));
        assert_eq!(board.grid().color_at(Pos::new(1, 0)), Some(0));
        assert!(board.grid().is_locked(Pos::new(1, 0)));
        assert!(!board.grid().is_locked(Pos::new(2, 0)));
        assert_eq!(refill.spawned.len(), 1);
        assert_eq!(refill.spawned[0].0, Pos::new(0, 0));
    }

    /// Swapping (2,2)<->(2,3) clears three 0s on the bottom row. The holes stagger
    /// where a one-colour refill lands, so the settled board has no match and no move.
    fn deadlocking_grid() -> Grid {
        Grid::parse(&["#2##", "#34#", "0010"])
    }

    #[test]
    fn deadlock_reshuffles_until_the_per_turn_limit() {
        let mut grid = deadlocking_grid();
        // Only the bottom row can be shuffled; no order of 0 3 4 1 makes a move.
        for (r, c) in [(0, 1), (1, 1), (1, 2)] {
            grid.set_locked(Pos::new(r, c), true);
        }
        let mut board = Board::from_grid(grid, 1, 9);
        assert_eq!(
            board.begin_swap(Pos::new(2, 2), Pos::new(2, 3)),
            Ok(Verdict::Accepted(StepKind::Match))
        );
        let events = drain(&mut board);
        assert_eq!(events.len(), 3 + MAX_RESHUFFLES_PER_TURN as usize);
        let Event::Cleared(step) = &events[0] else {
            panic!("expected a cleared step first, got {:?}", events[0]);
        };
        let cleared: BTreeSet<Pos> = [(2, 0), (2, 1), (2, 2)]
            .into_iter()
            .map(|(r, c)| Pos::new(r, c))
            .collect();
        assert_eq!(step.destroyed, cleared);
        let Event::Refilled(refill) = &events[1] else {
            panic!("expected a refill, got {:?}", events[1]);
        };
        let spawned: Vec<Pos> = refill.spawned.iter().map(|&(p, _)| p).collect();
        assert_eq!(spawned, vec![Pos::new(0, 1), Pos::new(1, 2), Pos::new(2, 0)]);
        for event in &events[2..events.len() - 1] {
            assert!(
                matches!(event, Event::Reshuffled(Reshuffle { exhausted: true, .. })),
                "{event:?}"
            );
        }
        assert_eq!(
            events.last(),
            Some(&Event::Settled {
                deadlock_handled: true
            })
        );
        assert!(board.is_idle());
        assert!(!board.has_valid_moves());
        assert_eq!(board.grid().color_at(Pos::new(1, 1)), Some(2));
        assert_eq!(board.grid().locks_remaining(), 3);
    }

    #[test]
    fn deadlock_after_a_turn_is_reshuffled_into_play() {
        let mut board = Board::from_grid(deadlocking_grid(), 1, 9);
        let Ok(SwapOutcome::Accepted(turn)) = board.request_swap(Pos::new(2, 2), Pos::new(2, 3))
        else {
            panic!("the bottom-row swap should be accepted");
        };
        assert!(turn.deadlock_handled);
        assert!(matches!(turn.events[0], Event::Cleared(_)));
        assert!(matches!(turn.events[1], Event::Refilled(_)));
        assert!(matches!(turn.events[2], Event::Reshuffled(_)));
        assert_eq!(
            turn.events.last(),
            Some(&Event::Settled {
                deadlock_handled: true
            })
        );
        if let Event::Reshuffled(Reshuffle {
            exhausted: false, ..
        }) = turn.events[2]
        {
            assert_eq!(turn.events.len(), 4);
            assert!(board.has_valid_moves());
            assert!(matcher::classify_matches(board.grid()).is_empty());
        }
        assert_eq!(board.grid().gem_count(), 7);
    }

    #[test]
    fn hint_prefers_row_major_right_then_down() {
        let grid = one_move_grid();
        assert_eq!(find_hint(&grid), Some((Pos::new(0, 2), Pos::new(0, 3))));
        assert!(has_valid_moves(&grid));
    }

    #[test]
    fn locked_cells_are_never_hinted() {
        let mut grid = one_move_grid();
        grid.set_locked(Pos::new(0, 3), true);
        if let Some((a, b)) = find_hint(&grid) {
            assert_ne!(a, Pos::new(0, 3));
            assert_ne!(b, Pos::new(0, 3));
        }
    }

    #[test]
    fn bomb_counts_as_valid_move() {
        let mut grid = quiet_board();
        assert!(!has_valid_moves(&grid));
        grid.set_kind(Pos::new(5, 5), GemKind::Bomb);
        assert!(has_valid_moves(&grid));
        assert_eq!(find_hint(&grid), Some((Pos::new(4, 5), Pos::new(5, 5))));
    }

    #[test]
    fn reshuffle_recovers_from_deadlock() {
        let mut board = Board::from_grid(quiet_board(), 6, 42);
        assert!(!board.has_valid_moves());
        let ids = |grid: &Grid| -> BTreeSet<GemId> {
            grid.positions().filter_map(|p| grid.get(p).map(|g| g.id)).collect()
        };
        let before = ids(board.grid());
        let result = board.reshuffle();
        assert_eq!(ids(board.grid()), before);
        if !result.exhausted {
            assert!(board.has_valid_moves());
            assert!(matcher::classify_matches(board.grid()).is_empty());
        }
    }
}
