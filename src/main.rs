//! chainfall: falling-block chain puzzle in the terminal.

mod app;
mod input;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use chainfall::{GameConfig, Variant};
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;
    let config = build_config(&args)?;
    let mut theme = theme::Theme::load(args.theme.as_deref(), args.palette)
        .context("failed to load theme")?;
    theme
        .apply_overrides(&args.colors)
        .context("invalid --colors")?;
    let mut app = App::new(config, theme, args.tick_rate)?;
    app.run()
}

/// Logs go to `--log-file` only; stderr would tear the alternate screen.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Config file (or the variant preset), then CLI overrides.
fn build_config(args: &Args) -> Result<GameConfig> {
    let mut config = match &args.config {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => GameConfig::preset(args.variant.unwrap_or_default()),
    };
    if let Some(variant) = args.variant {
        config.variant = variant;
    }
    if let Some(rows) = args.rows {
        config.rows = rows;
    }
    if let Some(cols) = args.cols {
        config.cols = cols;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.validate().context("invalid configuration")?;
    log::debug!("config: {config:?}");
    Ok(config)
}

/// Falling-block chain puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "chainfall",
    version,
    about = "Falling-block chain puzzle in the terminal: match groups, clear them, chain the cascades.",
    long_about = "chainfall drops pairs (or tetrominoes) into a grid. Groups of matching cells clear; \
        whatever loses its support falls, and any new match extends the chain for a bigger multiplier. \
        The swap variant is match-3: swap neighbouring cells instead.\n\n\
        CONTROLS (falling):\n  Left/Right  Move    Up/x      Rotate CW   z/u   Rotate CCW\n  Down        Soft drop   Enter/Space Hard drop   P  Pause   R  Restart   Q / Esc  Quit\n\n\
        CONTROLS (swap):\n  Arrows / hjkl  Move cursor   Enter/Space  Pick, then swap with a neighbour"
)]
pub struct Args {
    /// JSON config file (camelCase keys). Missing keys take the variant defaults.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Game variant; overrides the config file.
    #[arg(short, long)]
    pub variant: Option<Variant>,

    /// Piece sequence seed; random when not set.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Grid height in cells.
    #[arg(long, value_name = "ROWS")]
    pub rows: Option<usize>,

    /// Grid width in cells.
    #[arg(long, value_name = "COLS")]
    pub cols: Option<usize>,

    /// Write logs here (level from RUST_LOG, default info). No logging otherwise.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Path to theme file (btop-style theme[key]="value"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Kind colours as hex, in kind order (e.g. --colors '#ff0000,#00ff00').
    #[arg(long, value_delimiter = ',', value_name = "HEX")]
    pub colors: Vec<String>,

    /// Frames per second; each frame advances the game by the real elapsed time.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub tick_rate: f64,
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
    fn test_cli_overrides_preset() {
        let args = Args::parse_from(["chainfall", "--variant", "swap", "--rows", "10", "--seed", "3"]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.variant, Variant::Swap);
        assert_eq!(config.rows, 10);
        assert_eq!(config.cols, GameConfig::preset(Variant::Swap).cols);
        assert_eq!(config.seed, Some(3));
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = Args::parse_from(["chainfall", "--cols", "0"]);
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn test_colors_split_on_commas() {
        let args = Args::parse_from(["chainfall", "--colors", "#fff,#000"]);
        assert_eq!(args.colors, vec!["#fff", "#000"]);
    }

    #[test]
    fn test_args_verify() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
