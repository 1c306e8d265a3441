//! Gemtui: match-3 gem puzzle in the terminal.

mod app;
mod input;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use gemtui::Level;
use gemtui::progress::{self, Progress};
use std::path::{Path, PathBuf};

/// Options derived from CLI that affect pacing and level setup.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub start_level: u32,
    pub seed: Option<u64>,
    pub colors: Option<u8>,
    pub moves: Option<u32>,
    pub step_delay_ms: u64,
    pub frame_rate: f64,
    pub animations: bool,
    pub show_menu: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let levels = match &args.levels {
        Some(path) => Level::load(path)
            .with_context(|| format!("failed to load levels from {}", path.display()))?,
        None => Level::builtin()?,
    };
    let progress_path = progress::default_path();
    let mut progress = Progress::load(&progress_path).unwrap_or_default();
    if args.reset_progress {
        progress.reset();
        progress.save(&progress_path)?;
        log::info!("progress reset at {}", progress_path.display());
    }
    let config = GameConfig {
        start_level: args.level,
        seed: args.seed,
        colors: args.colors,
        moves: args.moves,
        step_delay_ms: if args.no_animation {
            0
        } else {
            args.step_delay_ms
        },
        frame_rate: args.frame_rate.clamp(5.0, 120.0),
        animations: !args.no_animation,
        show_menu: !args.no_menu,
    };
    let mut app = App::new(config, theme, levels, progress, progress_path)?;
    app.run()?;
    Ok(())
}

/// Records go to a file; stderr would tear the alternate screen.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Match-3 gem puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "gemtui",
    version,
    about = "Match-3 gem puzzle in the terminal. Swap neighbours to line up three or more of a colour.",
    long_about = "Gemtui is a terminal match-3 puzzle.\n\n\
        Swap two neighbouring gems to make a row or column of three or more of one colour. \
        Four in a line makes a striped gem, an L or T makes a wrapped gem and five in a line \
        makes a colour bomb. Swap two specials together for a bigger blast. Break ice and \
        locks by clearing the gems on them. Reach the target score before the moves run out.\n\n\
        CONTROLS (normal):\n  Arrows      Move cursor   Enter/Space Select / swap   ?  Hint\n  P           Pause         R           Restart level   Q / Esc  Quit\n\n\
        CONTROLS (vim):\n  h/j/k/l     Move cursor   Space       Select / swap\n\n\
        With a gem selected, an arrow swaps it in that direction. Use --theme to load a \
        btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Level to open (skips the level select when combined with --no-menu).
    #[arg(short, long, default_value = "1", value_name = "N")]
    pub level: u32,

    /// JSON level pack replacing the built-in levels.
    #[arg(long, value_name = "FILE")]
    pub levels: Option<PathBuf>,

    /// RNG seed; the same seed deals the same boards.
    #[arg(short, long, value_name = "N")]
    pub seed: Option<u64>,

    /// Override the number of gem colours for every level (3..=6).
    #[arg(short, long, value_name = "N")]
    pub colors: Option<u8>,

    /// Override the move budget for every level.
    #[arg(short, long, value_name = "N")]
    pub moves: Option<u32>,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Disable clear animation (each cascade resolves at once).
    #[arg(long)]
    pub no_animation: bool,

    /// Skip the level select and start playing immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Pause between cascade steps in ms.
    #[arg(long, default_value = "220", value_name = "MS")]
    pub step_delay_ms: u64,

    /// Target render frames per second (clamped to 5..=120).
    #[arg(long, default_value = "60.0", value_name = "RATE", value_parser = parse_frame_rate)]
    pub frame_rate: f64,

    /// Write log records to this file (filter with RUST_LOG).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Forget completed levels, stars and best scores.
    #[arg(long)]
    pub reset_progress: bool,
}

fn parse_frame_rate(s: &str) -> Result<f64, String> {
    let rate: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(format!("frame rate must be a positive number, got {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rate_must_be_a_positive_number() {
        for bad in ["nan", "NaN", "inf", "-inf", "0", "-30", "fast"] {
            assert!(
                Args::try_parse_from(["gemtui", "--frame-rate", bad]).is_err(),
                "{bad} was accepted"
            );
        }
        let args = Args::try_parse_from(["gemtui", "--frame-rate", "30"]).unwrap();
        assert!((args.frame_rate - 30.0).abs() < f64::EPSILON);
        let args = Args::try_parse_from(["gemtui"]).unwrap();
        assert!((args.frame_rate - 60.0).abs() < f64::EPSILON);
    }
}
