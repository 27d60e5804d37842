//! Gridfall — classic falling-block tetromino puzzle game in the terminal.

mod app;
mod game;
mod input;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};

/// Options derived from CLI that affect game behaviour.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub drop_ms: u64,
    pub seed: u32,
    pub no_animation: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let config = GameConfig {
        drop_ms: args.drop_ms,
        seed: args
            .seed
            .unwrap_or_else(|| std::process::id() ^ 0x9E37_79B9),
        no_animation: args.no_animation,
    };
    let mut app = App::new(args, config, theme)?;
    app.run()?;
    Ok(())
}

/// Classic falling-block puzzle game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "gridfall",
    version,
    about = "Classic falling-block tetromino puzzle in the terminal. Stack pieces; clear full rows to score.",
    long_about = "Gridfall is a terminal rendition of the classic falling-block puzzle.\n\n\
        Pieces spawn at the top of the board and fall once per second. Move and rotate them \
        so they lock into complete rows; every full row is cleared for 10 points and the \
        stack above it drops down. The game ends when a piece locks above the top of the board.\n\n\
        CONTROLS (normal):\n  Left/Right  Move    Up    Rotate    Down    Soft drop\n  P  Pause    Q / Esc  Quit\n\n\
        CONTROLS (vim):\n  h/l  Move    k or i  Rotate    j  Soft drop    p  Pause    q  Quit\n\n\
        Hold a movement key to keep the piece moving. Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Board width in columns (minimum 7: the spawn column plus the widest piece).
    #[arg(
        long,
        default_value_t = game::DEFAULT_COLS,
        value_parser = clap::value_parser!(u16).range(i64::from(game::MIN_COLS)..),
        value_name = "COLS"
    )]
    pub width: u16,

    /// Board height in rows (minimum 4: the tallest piece).
    #[arg(
        long,
        default_value_t = game::DEFAULT_ROWS,
        value_parser = clap::value_parser!(u16).range(i64::from(game::MIN_ROWS)..),
        value_name = "ROWS"
    )]
    pub height: u16,

    /// Automatic drop interval in ms.
    #[arg(long, default_value = "1000", value_name = "MS")]
    pub drop_ms: u64,

    /// Seed for the piece sequence (reproducible games). Random if not set.
    #[arg(long, value_name = "N")]
    pub seed: Option<u32>,

    /// Disable the row-clear flash animation.
    #[arg(long)]
    pub no_animation: bool,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,
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
    fn test_board_size_flags_reject_boards_too_small_for_a_piece() {
        assert!(Args::try_parse_from(["gridfall", "--width", "4"]).is_err());
        assert!(Args::try_parse_from(["gridfall", "--width", "6"]).is_err());
        assert!(Args::try_parse_from(["gridfall", "--height", "3"]).is_err());
    }

    #[test]
    fn test_smallest_allowed_board_parses() {
        let args = Args::try_parse_from(["gridfall", "--width", "7", "--height", "4"]).unwrap();
        assert_eq!((args.width, args.height), (7, 4));
    }
}
