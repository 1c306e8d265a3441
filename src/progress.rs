//! Persist level progress to disk (XDG config or ~/.config/gemtui).
//!
//! The file is plain `key=value` lines:
//! `level.<n>.completed=1`, `level.<n>.stars=<0..3>`, `level.<n>.best=<score>`.
//! Unknown keys and malformed values are ignored.

use crate::level::Level;
use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

const FILENAME: &str = "progress";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelRecord {
    pub completed: bool,
    pub stars: u8,
    pub best: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Progress {
    records: BTreeMap<u32, LevelRecord>,
}

/// Returns the path to the progress file (config dir / gemtui / progress).
pub fn default_path() -> PathBuf {
    let home_config = || {
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from("."))
    };
    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => home_config(),
    };
    base.join("gemtui").join(FILENAME)
}

impl Progress {
    pub fn parse(text: &str) -> Self {
        let mut progress = Self::default();
        for line in text.lines() {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            let mut parts = key.trim().split('.');
            let (Some("level"), Some(n), Some(field), None) =
                (parts.next(), parts.next(), parts.next(), parts.next())
            else {
                continue;
            };
            let Ok(level) = n.parse::<u32>() else {
                continue;
            };
            let value = value.trim();
            let record = progress.records.entry(level).or_default();
            match field {
                "completed" => record.completed = value == "1" || value == "true",
                "stars" => record.stars = value.parse::<u8>().unwrap_or(0).min(3),
                "best" => record.best = value.parse().unwrap_or(0),
                _ => {}
            }
        }
        progress
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (level, r) in &self.records {
            let _ = writeln!(out, "level.{level}.completed={}", u8::from(r.completed));
            let _ = writeln!(out, "level.{level}.stars={}", r.stars);
            let _ = writeln!(out, "level.{level}.best={}", r.best);
        }
        out
    }

    /// Missing file reads as empty progress.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Self::parse(&text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Save to disk. Creates the config directory if needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.render())?;
        Ok(())
    }

    pub fn record(&self, level: u32) -> LevelRecord {
        self.records.get(&level).copied().unwrap_or_default()
    }

    /// The first level of the pack is always open; any other level needs the one
    /// before it in the pack completed. Numbering gaps are skipped.
    pub fn is_unlocked(&self, levels: &[Level], level: u32) -> bool {
        crate::level::previous(levels, level).is_none_or(|prev| self.record(prev.level).completed)
    }

    /// Marks a level completed, keeping the best stars and score seen so far.
    /// Returns true when `score` beats the previous best.
    pub fn complete_level(&mut self, level: u32, score: u64, stars: u8) -> bool {
        let record = self.records.entry(level).or_default();
        let new_best = score > record.best;
        record.completed = true;
        record.stars = record.stars.max(stars.min(3));
        record.best = record.best.max(score);
        new_best
    }

    /// Keeps a best score for a failed attempt without completing the level.
    pub fn record_attempt(&mut self, level: u32, score: u64) -> bool {
        let record = self.records.entry(level).or_default();
        let new_best = score > record.best;
        record.best = record.best.max(score);
        new_best
    }

    pub fn total_stars(&self) -> u32 {
        self.records.values().map(|r| u32::from(r.stars)).sum()
    }

    pub fn completed_count(&self) -> usize {
        self.records.values().filter(|r| r.completed).count()
    }

    pub fn reset(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reads_records_and_skips_junk() {
        let text = "level.1.completed=1\nlevel.1.stars=2\nlevel.1.best=4200\n\
                    garbage\nlevel.x.stars=3\nlevel.2.stars=9\nlevel.2.best=abc\n";
        let p = Progress::parse(text);
        assert_eq!(
            p.record(1),
            LevelRecord {
                completed: true,
                stars: 2,
                best: 4200
            }
        );
        assert_eq!(p.record(2).stars, 3);
        assert_eq!(p.record(2).best, 0);
        assert_eq!(p.record(7), LevelRecord::default());
    }

    #[test]
    fn render_then_parse_keeps_records() {
        let mut p = Progress::default();
        p.complete_level(1, 3000, 2);
        p.record_attempt(2, 900);
        assert_eq!(Progress::parse(&p.render()), p);
    }

    #[test]
    fn unlocking_follows_completion() {
        let levels = Level::builtin().unwrap();
        let mut p = Progress::default();
        assert!(p.is_unlocked(&levels, 1));
        assert!(!p.is_unlocked(&levels, 2));
        p.complete_level(1, 100, 1);
        assert!(p.is_unlocked(&levels, 2));
        assert!(!p.is_unlocked(&levels, 3));
    }

    #[test]
    fn unlocking_skips_gaps_in_numbering() {
        let levels = Level::parse_pack(r#"[{ "level": 5 }, { "level": 1 }, { "level": 2 }]"#).unwrap();
        let mut p = Progress::default();
        assert!(p.is_unlocked(&levels, 1));
        assert!(!p.is_unlocked(&levels, 5));
        p.complete_level(1, 100, 1);
        assert!(!p.is_unlocked(&levels, 5));
        p.complete_level(2, 100, 1);
        assert!(p.is_unlocked(&levels, 5));

        let late_start = Level::parse_pack(r#"[{ "level": 3 }, { "level": 4 }]"#).unwrap();
        assert!(Progress::default().is_unlocked(&late_start, 3));
        assert!(!Progress::default().is_unlocked(&late_start, 4));
    }

    #[test]
    fn completion_keeps_best_values() {
        let mut p = Progress::default();
        assert!(p.complete_level(3, 5000, 3));
        assert!(!p.complete_level(3, 2000, 1));
        assert_eq!(p.record(3).stars, 3);
        assert_eq!(p.record(3).best, 5000);
        p.complete_level(4, 10, 2);
        assert_eq!(p.total_stars(), 5);
        assert_eq!(p.completed_count(), 2);
        p.reset();
        assert_eq!(p.total_stars(), 0);
    }

    #[test]
    fn save_and_load_round_trip_on_disk() {
        let dir = std::env::temp_dir().join(format!("gemtui-progress-{}", std::process::id()));
        let path = dir.join("nested").join(FILENAME);
        let mut p = Progress::default();
        p.complete_level(1, 1234, 1);
        p.save(&path).unwrap();
        assert_eq!(Progress::load(&path).unwrap(), p);
        let _ = fs::remove_dir_all(&dir);
        assert_eq!(Progress::load(&path).unwrap(), Progress::default());
    }
}
