//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

const fn rgb(hex: u32) -> Color {
    Color::Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

const ONEDARK_GEMS: [Color; 6] = [
    rgb(0xE06C75), // red
    rgb(0x98C379), // green
    rgb(0x61AFEF), // blue
    rgb(0xE5C07B), // yellow
    rgb(0xC678DD), // magenta
    rgb(0x56B6C2), // cyan
];

const HIGH_CONTRAST_GEMS: [Color; 6] = [
    rgb(0xFF0000),
    rgb(0x00FF00),
    rgb(0x0088FF),
    rgb(0xFFFF00),
    rgb(0xFF00FF),
    rgb(0x00FFFF),
];

/// Tol's bright scheme; no red/green pair carries meaning on its own.
const COLORBLIND_GEMS: [Color; 6] = [
    rgb(0x0077BB),
    rgb(0xEE7733),
    rgb(0x009988),
    rgb(0xCC3311),
    rgb(0xEE3377),
    rgb(0xBBBB00),
];

/// One Dark palette plus board colours, optionally loaded from a theme file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Gem colours by colour index.
    pub gems: [Color; 6],
    /// Board background.
    pub bg: Color,
    /// Alternate checker shade for board cells.
    pub cell_alt: Color,
    pub hole: Color,
    /// Ice with one layer left; two layers use `ice_deep`.
    pub ice: Color,
    pub ice_deep: Color,
    pub lock: Color,
    pub cursor: Color,
    pub selected: Color,
    pub hint: Color,
    /// Borders.
    pub div_line: Color,
    /// Text (score, moves).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

impl Theme {
    pub const fn onedark_default() -> Self {
        Self {
            gems: ONEDARK_GEMS,
            bg: rgb(0x282C34),
            cell_alt: rgb(0x31353F),
            hole: rgb(0x1E2127),
            ice: rgb(0x3E6A8A),
            ice_deep: rgb(0x6FA8DC),
            lock: rgb(0xD19A66),
            cursor: rgb(0x5C6370),
            selected: rgb(0xABB2BF),
            hint: rgb(0x4B5D3A),
            div_line: rgb(0x3F444F),
            main_fg: rgb(0xABB2BF),
            title: rgb(0xE5C07B),
            inactive_fg: rgb(0x5C6370),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark if `path` is None or missing.
    /// `palette` then overrides the gem colours.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => {
                let s = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&s))
            }
            _ => Self::onedark_default(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.gems = HIGH_CONTRAST_GEMS;
                self.cursor = Color::White;
                self.selected = Color::Yellow;
            }
            crate::Palette::Colorblind => self.gems = COLORBLIND_GEMS,
        }
    }

    /// Keys follow onedark.theme; anything missing keeps the One Dark value.
    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |keys: &[&str], fallback: Color| {
            keys.iter()
                .find_map(|k| map.get(*k).and_then(|v| parse_hex(v).ok()))
                .unwrap_or(fallback)
        };
        let d = Self::onedark_default();
        Self {
            gems: [
                get(&["cpu_end", "temp_end"], d.gems[0]),
                get(&["mem_box", "cpu_start"], d.gems[1]),
                get(&["cpu_box"], d.gems[2]),
                get(&["title", "cpu_mid"], d.gems[3]),
                get(&["net_box"], d.gems[4]),
                get(&["hi_fg", "proc_misc"], d.gems[5]),
            ],
            bg: get(&["main_bg"], d.bg),
            cell_alt: get(&["meter_bg"], d.cell_alt),
            hole: get(&["hole"], d.hole),
            ice: get(&["ice"], d.ice),
            ice_deep: get(&["ice_deep"], d.ice_deep),
            lock: get(&["lock"], d.lock),
            cursor: get(&["selected_bg"], d.cursor),
            selected: get(&["selected_fg"], d.selected),
            hint: get(&["hint"], d.hint),
            div_line: get(&["div_line"], d.div_line),
            main_fg: get(&["main_fg"], d.main_fg),
            title: get(&["title"], d.title),
            inactive_fg: get(&["inactive_fg"], d.inactive_fg),
        }
    }

    #[inline]
    pub fn gem_color(&self, index: u8) -> Color {
        self.gems[(index as usize) % self.gems.len()]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(value) = rest.strip_prefix('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if !value.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |range: std::ops::Range<usize>| {
        s.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(invalid)
    };
    let (r, g, b) = match s.len() {
        6 => (channel(0..2)?, channel(2..4)?, channel(4..6)?),
        3 => (channel(0..1)? * 17, channel(1..2)? * 17, channel(2..3)? * 17),
        _ => return Err(invalid()),
    };
    Ok(Color::Rgb(r, g, b))
}
