//! Level catalogue: board shape, obstacles, move budget and score goals.

use crate::grid::{DEFAULT_COLS, DEFAULT_NUM_COLORS, DEFAULT_ROWS, MAX_ICE_LAYERS};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_MAX_MOVES: u32 = 20;
pub const DEFAULT_TARGET_SCORE: u64 = 5000;

pub const MIN_SIDE: usize = 3;
pub const MAX_SIDE: usize = 16;
pub const MIN_COLORS: u8 = 3;

const BUILTIN_LEVELS: &str = include_str!("../assets/levels.json");

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("failed to read level file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid level JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("level {level}: board must be between {min}x{min} and {max}x{max}, got {rows}x{cols}", min = MIN_SIDE, max = MAX_SIDE)]
    BadDimensions { level: u32, rows: usize, cols: usize },

    #[error("level {level}: colour count must be between {min} and {max}, got {num_types}", min = MIN_COLORS, max = DEFAULT_NUM_COLORS)]
    BadColorCount { level: u32, num_types: u8 },

    #[error("level {level}: layout must be {rows}x{cols}")]
    LayoutShape { level: u32, rows: usize, cols: usize },

    #[error("level {level}: {what} at ({row}, {col}) is outside the board")]
    OutOfBounds {
        level: u32,
        what: &'static str,
        row: usize,
        col: usize,
    },

    #[error("level {level}: {what} at ({row}, {col}) sits on a hole")]
    OnHole {
        level: u32,
        what: &'static str,
        row: usize,
        col: usize,
    },

    #[error("level {level}: ice at ({row}, {col}) has {layers} layers (max {max})", max = MAX_ICE_LAYERS)]
    IceLayers {
        level: u32,
        row: usize,
        col: usize,
        layers: u8,
    },

    #[error("level {0}: move budget and target score must be positive")]
    NoGoal(u32),

    #[error("level pack is empty")]
    Empty,

    #[error("no level numbered {0}")]
    Unknown(u32),
}

/// `[row, col]` or `[row, col, layers]`; a missing or zero layer count means one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum IceEntry {
    Layered(usize, usize, u8),
    Single(usize, usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "IceEntry")]
pub struct IceSpec {
    pub row: usize,
    pub col: usize,
    pub layers: u8,
}

impl From<IceEntry> for IceSpec {
    fn from(entry: IceEntry) -> Self {
        let (row, col, layers) = match entry {
            IceEntry::Layered(row, col, layers) => (row, col, layers),
            IceEntry::Single(row, col) => (row, col, 0),
        };
        Self {
            row,
            col,
            layers: layers.max(1),
        }
    }
}

/// Board configuration handed to [`crate::cascade::Board::init`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoardSpec {
    pub rows: usize,
    pub cols: usize,
    pub num_types: u8,
    /// Row-major `1` = playable, `0` = hole. Absent means fully playable.
    pub layout: Option<Vec<Vec<u8>>>,
    pub ice: Vec<IceSpec>,
    pub locks: Vec<[usize; 2]>,
}

impl Default for BoardSpec {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            num_types: DEFAULT_NUM_COLORS,
            layout: None,
            ice: Vec::new(),
            locks: Vec::new(),
        }
    }
}

impl BoardSpec {
    pub fn is_active(&self, row: usize, col: usize) -> bool {
        if row >= self.rows || col >= self.cols {
            return false;
        }
        match &self.layout {
            Some(layout) => layout
                .get(row)
                .and_then(|r| r.get(col))
                .is_some_and(|&v| v != 0),
            None => true,
        }
    }

    /// Bounds-only validation. `level` is used for error messages.
    pub fn validate(&self, level: u32) -> Result<(), LevelError> {
        let side = MIN_SIDE..=MAX_SIDE;
        if !side.contains(&self.rows) || !side.contains(&self.cols) {
            return Err(LevelError::BadDimensions {
                level,
                rows: self.rows,
                cols: self.cols,
            });
        }
        if !(MIN_COLORS..=DEFAULT_NUM_COLORS).contains(&self.num_types) {
            return Err(LevelError::BadColorCount {
                level,
                num_types: self.num_types,
            });
        }
        if let Some(layout) = &self.layout {
            if layout.len() != self.rows || layout.iter().any(|r| r.len() != self.cols) {
                return Err(LevelError::LayoutShape {
                    level,
                    rows: self.rows,
                    cols: self.cols,
                });
            }
        }

        let cells = self
            .ice
            .iter()
            .map(|i| ("ice", i.row, i.col))
            .chain(self.locks.iter().map(|&[r, c]| ("lock", r, c)));
        for (what, row, col) in cells {
            if row >= self.rows || col >= self.cols {
                return Err(LevelError::OutOfBounds {
                    level,
                    what,
                    row,
                    col,
                });
            }
            if !self.is_active(row, col) {
                return Err(LevelError::OnHole {
                    level,
                    what,
                    row,
                    col,
                });
            }
        }
        if let Some(ice) = self.ice.iter().find(|i| i.layers > MAX_ICE_LAYERS) {
            return Err(LevelError::IceLayers {
                level,
                row: ice.row,
                col: ice.col,
                layers: ice.layers,
            });
        }
        Ok(())
    }
}

fn default_max_moves() -> u32 {
    DEFAULT_MAX_MOVES
}

fn default_target_score() -> u64 {
    DEFAULT_TARGET_SCORE
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub level: u32,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub board: BoardSpec,
    #[serde(default = "default_max_moves")]
    pub max_moves: u32,
    #[serde(default = "default_target_score")]
    pub target_score: u64,
    /// Scores for one, two and three stars.
    #[serde(default)]
    pub star_thresholds: Option<[u64; 3]>,
}

impl Level {
    /// A plain level with the reference board and no obstacles.
    pub fn classic(level: u32) -> Self {
        Self {
            level,
            name: String::new(),
            board: BoardSpec::default(),
            max_moves: DEFAULT_MAX_MOVES,
            target_score: DEFAULT_TARGET_SCORE,
            star_thresholds: None,
        }
    }

    /// The pack compiled into the binary.
    pub fn builtin() -> Result<Vec<Level>, LevelError> {
        Self::parse_pack(BUILTIN_LEVELS)
    }

    pub fn load(path: &Path) -> Result<Vec<Level>, LevelError> {
        let text = fs::read_to_string(path)?;
        Self::parse_pack(&text)
    }

    /// Parses a JSON array of levels, validates each and sorts them by number.
    pub fn parse_pack(json: &str) -> Result<Vec<Level>, LevelError> {
        let mut levels: Vec<Level> = serde_json::from_str(json)?;
        if levels.is_empty() {
            return Err(LevelError::Empty);
        }
        for level in &levels {
            level.validate()?;
        }
        levels.sort_by_key(|l| l.level);
        Ok(levels)
    }

    pub fn validate(&self) -> Result<(), LevelError> {
        self.board.validate(self.level)?;
        if self.max_moves == 0 || self.target_score == 0 {
            return Err(LevelError::NoGoal(self.level));
        }
        Ok(())
    }

    pub fn thresholds(&self) -> [u64; 3] {
        self.star_thresholds.unwrap_or([
            self.target_score,
            self.target_score * 3 / 2,
            self.target_score * 2,
        ])
    }

    pub fn stars_for(&self, score: u64) -> u8 {
        let [one, two, three] = self.thresholds();
        if score >= three {
            3
        } else if score >= two {
            2
        } else if score >= one {
            1
        } else {
            0
        }
    }

    pub fn title(&self) -> String {
        if self.name.is_empty() {
            format!("Level {}", self.level)
        } else {
            format!("{}. {}", self.level, self.name)
        }
    }
}

pub fn find(levels: &[Level], number: u32) -> Result<&Level, LevelError> {
    levels
        .iter()
        .find(|l| l.level == number)
        .ok_or(LevelError::Unknown(number))
}

pub fn next(levels: &[Level], number: u32) -> Option<&Level> {
    levels.iter().find(|l| l.level > number)
}

/// The level played before `number` in pack order, if any.
pub fn previous(levels: &[Level], number: u32) -> Option<&Level> {
    levels.iter().rev().find(|l| l.level < number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_pack_is_valid() {
        let levels = Level::builtin().unwrap();
        assert!(levels.len() >= 6);
        assert_eq!(levels[0].level, 1);
        assert!(levels.windows(2).all(|w| w[0].level < w[1].level));
        assert!(levels.iter().any(|l| !l.board.ice.is_empty()));
        assert!(levels.iter().any(|l| !l.board.locks.is_empty()));
        assert!(levels.iter().any(|l| l.board.layout.is_some()));
    }

    #[test]
    fn missing_keys_take_defaults() {
        let levels = Level::parse_pack(r#"[{ "level": 1 }]"#).unwrap();
        let l = &levels[0];
        assert_eq!((l.board.rows, l.board.cols), (8, 8));
        assert_eq!(l.board.num_types, 6);
        assert_eq!(l.max_moves, 20);
        assert_eq!(l.target_score, 5000);
        assert_eq!(l.title(), "Level 1");
    }

    #[test]
    fn ice_layers_default_to_one() {
        let json = r#"[{ "level": 2, "ice": [[0, 0], [1, 1, 0], [2, 2, 2]] }]"#;
        let levels = Level::parse_pack(json).unwrap();
        let layers: Vec<u8> = levels[0].board.ice.iter().map(|i| i.layers).collect();
        assert_eq!(layers, vec![1, 1, 2]);
    }

    #[test]
    fn rejects_bad_configuration() {
        let cases = [
            r#"[{ "level": 1, "rows": 2 }]"#,
            r#"[{ "level": 1, "numTypes": 9 }]"#,
            r#"[{ "level": 1, "rows": 3, "cols": 3, "layout": [[1,1,1],[1,1,1]] }]"#,
            r#"[{ "level": 1, "locks": [[8, 0]] }]"#,
            r#"[{ "level": 1, "ice": [[0, 0, 3]] }]"#,
            r#"[{ "level": 1, "maxMoves": 0 }]"#,
            r#"[{ "level": 1, "rows": 3, "cols": 3, "layout": [[0,1,1],[1,1,1],[1,1,1]], "ice": [[0, 0]] }]"#,
            r#"[]"#,
            r#"{ "level": 1 }"#,
        ];
        for json in cases {
            assert!(Level::parse_pack(json).is_err(), "accepted {json}");
        }
    }

    #[test]
    fn stars_follow_thresholds() {
        let mut level = Level::classic(1);
        level.star_thresholds = Some([100, 200, 300]);
        assert_eq!(level.stars_for(99), 0);
        assert_eq!(level.stars_for(100), 1);
        assert_eq!(level.stars_for(250), 2);
        assert_eq!(level.stars_for(1000), 3);
        level.star_thresholds = None;
        assert_eq!(level.stars_for(5000), 1);
        assert_eq!(level.stars_for(10_000), 3);
    }

    #[test]
    fn lookup_by_number() {
        let levels = vec![Level::classic(1), Level::classic(2), Level::classic(4)];
        assert_eq!(find(&levels, 2).map(|l| l.level).ok(), Some(2));
        assert!(matches!(find(&levels, 3), Err(LevelError::Unknown(3))));
        assert_eq!(next(&levels, 2).map(|l| l.level), Some(4));
        assert!(next(&levels, 4).is_none());
    }
}
