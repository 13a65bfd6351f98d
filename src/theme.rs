//! Colours: btop-style theme files, palette presets and `--colors` overrides.

use chainfall::engine::Kind;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Number of distinct kind colours; kinds past this wrap around.
pub const KIND_COLORS: usize = 8;

#[derive(Debug, Clone)]
pub struct Theme {
    /// Cell colours by kind index: green, yellow, red, blue, magenta, cyan, orange, white.
    pub kinds: [Color; KIND_COLORS],
    /// Playfield background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (score, chain).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Ghost piece and secondary text.
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("too many colours: got {0}, at most {KIND_COLORS}")]
    TooMany(usize),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

const fn rgb(hex: u32) -> Color {
    Color::Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

const ONEDARK_KINDS: [Color; KIND_COLORS] = [
    rgb(0x98C379),
    rgb(0xE5C07B),
    rgb(0xE06C75),
    rgb(0x61AFEF),
    rgb(0xC678DD),
    rgb(0x56B6C2),
    rgb(0xD19A66),
    rgb(0xDCDFE4),
];

const HIGH_CONTRAST_KINDS: [Color; KIND_COLORS] = [
    rgb(0x00FF00),
    rgb(0xFFFF00),
    rgb(0xFF0000),
    rgb(0x0088FF),
    rgb(0xFF00FF),
    rgb(0x00FFFF),
    rgb(0xFF8800),
    rgb(0xFFFFFF),
];

/// Avoids pairing red with green.
const COLORBLIND_KINDS: [Color; KIND_COLORS] = [
    rgb(0x0077BB),
    rgb(0xEE7733),
    rgb(0x009988),
    rgb(0xCC3311),
    rgb(0xEE3377),
    rgb(0xBBBB00),
    rgb(0x33BBEE),
    rgb(0xBBBBBB),
];

impl Theme {
    pub fn onedark_default() -> Self {
        Self {
            kinds: ONEDARK_KINDS,
            bg: rgb(0x31353F),
            div_line: rgb(0x3F444F),
            main_fg: rgb(0xABB2BF),
            title: rgb(0xE5C07B),
            inactive_fg: rgb(0x5C6370),
        }
    }

    /// Loads a btop-style file (`theme[key]="value"`), then applies `palette`.
    /// One Dark when `path` is None or missing.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => {
                let s = std::fs::read_to_string(p)?;
                log::info!("loaded theme from {}", p.display());
                Self::from_map(&parse_theme_file(&s))
            }
            Some(p) => {
                log::warn!("theme file {} not found, using defaults", p.display());
                Self::default()
            }
            None => Self::default(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => self.kinds = HIGH_CONTRAST_KINDS,
            crate::Palette::Colorblind => self.kinds = COLORBLIND_KINDS,
        }
    }

    /// Replaces the first `colors.len()` kind colours, in order.
    pub fn apply_overrides(&mut self, colors: &[String]) -> Result<(), ThemeError> {
        if colors.len() > KIND_COLORS {
            return Err(ThemeError::TooMany(colors.len()));
        }
        for (slot, hex) in self.kinds.iter_mut().zip(colors) {
            *slot = parse_hex(hex)?;
        }
        Ok(())
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let d = Self::onedark_default();
        let mut kinds = d.kinds;
        let keys: [&[&str]; 6] = [
            &["mem_box", "cpu_start"],
            &["title", "cpu_mid"],
            &["cpu_end", "temp_end"],
            &["cpu_box"],
            &["net_box"],
            &["hi_fg", "proc_misc"],
        ];
        for (slot, names) in kinds.iter_mut().zip(keys) {
            if let Some(c) = names.iter().find_map(|k| get(k)) {
                *slot = c;
            }
        }
        Self {
            kinds,
            bg: get("meter_bg").unwrap_or(d.bg),
            div_line: get("div_line").unwrap_or(d.div_line),
            main_fg: get("main_fg").unwrap_or(d.main_fg),
            title: get("title").unwrap_or(d.title),
            inactive_fg: get("inactive_fg").unwrap_or(d.inactive_fg),
        }
    }

    #[inline]
    pub fn kind_color(&self, kind: Kind) -> Color {
        self.kinds[usize::from(kind.0) % KIND_COLORS]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines().map(str::trim) {
        if line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some((key, rest)) = stripped.split_once(']') else {
            continue;
        };
        let Some((_, value)) = rest.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'');
        if !value.is_empty() {
            map.insert(key.trim().to_string(), value.to_string());
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
    if !s.is_ascii() {
        return Err(invalid());
    }
    match s.len() {
        6 => Ok(Color::Rgb(channel(&s[0..2])?, channel(&s[2..4])?, channel(&s[4..6])?)),
        3 => Ok(Color::Rgb(
            channel(&s[0..1])? * 17,
            channel(&s[1..2])? * 17,
            channel(&s[2..3])? * 17,
        )),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("zzzzzz").is_err());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[meter_bg]="#31353F""##);
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
    }

    #[test]
    fn test_overrides_replace_leading_kinds() {
        let mut theme = Theme::default();
        theme
            .apply_overrides(&["#000000".to_string(), "#FFFFFF".to_string()])
            .unwrap();
        assert_eq!(theme.kind_color(Kind(0)), Color::Rgb(0, 0, 0));
        assert_eq!(theme.kind_color(Kind(1)), Color::Rgb(255, 255, 255));
        assert_eq!(theme.kind_color(Kind(2)), ONEDARK_KINDS[2]);
        assert_eq!(theme.kind_color(Kind(10)), theme.kind_color(Kind(2)));
    }

    #[test]
    fn test_too_many_overrides() {
        let colors = vec!["#000".to_string(); KIND_COLORS + 1];
        assert!(matches!(
            Theme::default().apply_overrides(&colors),
            Err(ThemeError::TooMany(_))
        ));
    }
}
