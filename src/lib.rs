//! Match-3 gem engine: grid store, match detection, special gems, obstacles and the
//! cascade controller, plus the level/session/progress layer a front-end plays through.

pub mod cascade;
pub mod grid;
pub mod level;
pub mod matcher;
pub mod obstacle;
pub mod progress;
pub mod session;
pub mod special;

pub use cascade::{Board, EngineError, Event, Rejection, SwapOutcome, Verdict};
pub use grid::{GemKind, Grid, Pos};
pub use level::{BoardSpec, Level, LevelError};
pub use session::{Outcome, Session};
