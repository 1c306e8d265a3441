//! One play-through of a level: score, move budget and the win/lose verdict.

use crate::cascade::{Board, EngineError, Event, SwapOutcome, Turn, Verdict};
use crate::grid::{Grid, Pos};
use crate::level::{Level, LevelError};
use log::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    InProgress,
    Won,
    Lost,
}

#[derive(Debug, Clone)]
pub struct Session {
    level: Level,
    board: Board,
    score: u64,
    moves_left: u32,
    moves_made: u32,
    best_combo: u32,
    outcome: Outcome,
}

impl Session {
    pub fn new(level: Level, seed: u64) -> Result<Self, LevelError> {
        level.validate()?;
        let board = Board::init(&level.board, seed)?;
        Ok(Self::with_board(level, board))
    }

    /// Starts a session on a prepared board.
    pub fn with_board(level: Level, board: Board) -> Self {
        Self {
            moves_left: level.max_moves,
            level,
            board,
            score: 0,
            moves_made: 0,
            best_combo: 0,
            outcome: Outcome::InProgress,
        }
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn grid(&self) -> &Grid {
        self.board.grid()
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn moves_left(&self) -> u32 {
        self.moves_left
    }

    pub fn moves_made(&self) -> u32 {
        self.moves_made
    }

    pub fn best_combo(&self) -> u32 {
        self.best_combo
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn is_over(&self) -> bool {
        self.outcome != Outcome::InProgress
    }

    /// True when no turn is resolving.
    pub fn is_idle(&self) -> bool {
        self.board.is_idle()
    }

    pub fn stars(&self) -> u8 {
        self.level.stars_for(self.score)
    }

    /// Score as a fraction of the target, capped at 1.
    pub fn progress(&self) -> f64 {
        (self.score as f64 / self.level.target_score as f64).min(1.0)
    }

    pub fn hint(&self) -> Option<(Pos, Pos)> {
        self.board.find_hint()
    }

    /// Validates a swap. An accepted swap costs exactly one move.
    pub fn begin_swap(&mut self, a: Pos, b: Pos) -> Result<Verdict, EngineError> {
        if self.is_over() {
            return Err(EngineError::Finished);
        }
        let verdict = self.board.begin_swap(a, b)?;
        if let Verdict::Accepted(_) = verdict {
            self.moves_left = self.moves_left.saturating_sub(1);
            self.moves_made += 1;
        }
        Ok(verdict)
    }

    /// Runs the next cascade stage and folds it into the running totals.
    pub fn advance(&mut self) -> Option<Event> {
        let event = self.board.advance()?;
        match &event {
            Event::Cleared(step) => {
                self.score += step.score;
                self.best_combo = self.best_combo.max(step.combo);
            }
            Event::Settled { .. } => self.update_outcome(),
            Event::Refilled(_) | Event::Reshuffled(_) => {}
        }
        Some(event)
    }

    fn update_outcome(&mut self) {
        self.outcome = if self.score >= self.level.target_score {
            Outcome::Won
        } else if self.moves_left == 0 {
            Outcome::Lost
        } else {
            Outcome::InProgress
        };
        if self.is_over() {
            info!(
                "level {} {:?} with {} points in {} moves",
                self.level.level, self.outcome, self.score, self.moves_made
            );
        }
    }

    /// Plays a swap and its whole cascade in one call.
    pub fn play_swap(&mut self, a: Pos, b: Pos) -> Result<SwapOutcome, EngineError> {
        if let Verdict::Rejected(r) = self.begin_swap(a, b)? {
            return Ok(SwapOutcome::Rejected(r));
        }
        let before = self.score;
        let mut events = Vec::new();
        let mut deadlock_handled = false;
        while let Some(event) = self.advance() {
            if let Event::Settled {
                deadlock_handled: handled,
            } = event
            {
                deadlock_handled = handled;
            }
            events.push(event);
        }
        Ok(SwapOutcome::Accepted(Turn {
            events,
            score: self.score - before,
            deadlock_handled,
            board: self.grid().clone(),
        }))
    }
}
