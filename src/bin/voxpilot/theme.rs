//! Colors for the screen chrome and the intent verdict.

use ratatui::style::Color;
use voxpilot::intent::KnownIntent;

/// Style for labels outside the trained vocabulary.
pub(crate) const NEUTRAL_INTENT_COLOR: Color = Color::Gray;

/// Panel frame color shared by all blocks.
pub(crate) const BORDER_COLOR: Color = Color::DarkGray;

/// Panel title accent.
pub(crate) const TITLE_COLOR: Color = Color::Cyan;

/// Live take indicator in the status line.
pub(crate) const RECORDING_COLOR: Color = Color::LightRed;

/// Alert overlay frame.
pub(crate) const ALERT_COLOR: Color = Color::Yellow;

/// Secondary text: placeholders, timestamps, key hints.
pub(crate) const MUTED_COLOR: Color = Color::DarkGray;

/// Fixed palette for the four trained commands.
pub(crate) fn builtin_intent_color(intent: KnownIntent) -> Color {
    match intent {
        KnownIntent::Avancer => Color::Green,
        KnownIntent::Stop => Color::Red,
        KnownIntent::Gauche => Color::Blue,
        KnownIntent::Droite => Color::Magenta,
    }
}

/// Parse a color name or `#rrggbb` value from a styles file.
pub(crate) fn parse_color(value: &str) -> Option<Color> {
    let trimmed = value.trim();
    if let Some(hex) = trimmed.strip_prefix('#') {
        return parse_hex_color(hex);
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "black" => Some(Color::Black),
        "red" => Some(Color::Red),
        "green" => Some(Color::Green),
        "yellow" => Some(Color::Yellow),
        "blue" => Some(Color::Blue),
        "magenta" | "purple" => Some(Color::Magenta),
        "cyan" => Some(Color::Cyan),
        "gray" | "grey" => Some(Color::Gray),
        "darkgray" | "darkgrey" => Some(Color::DarkGray),
        "white" => Some(Color::White),
        "lightred" => Some(Color::LightRed),
        "lightgreen" => Some(Color::LightGreen),
        "lightyellow" => Some(Color::LightYellow),
        "lightblue" => Some(Color::LightBlue),
        "lightmagenta" => Some(Color::LightMagenta),
        "lightcyan" => Some(Color::LightCyan),
        _ => None,
    }
}

fn parse_hex_color(hex: &str) -> Option<Color> {
    if hex.len() != 6 || !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_intents_keep_their_colors() {
        assert_eq!(builtin_intent_color(KnownIntent::Avancer), Color::Green);
        assert_eq!(builtin_intent_color(KnownIntent::Stop), Color::Red);
        assert_eq!(builtin_intent_color(KnownIntent::Gauche), Color::Blue);
        assert_eq!(builtin_intent_color(KnownIntent::Droite), Color::Magenta);
    }

    #[test]
    fn parse_color_accepts_names() {
        assert_eq!(parse_color("red"), Some(Color::Red));
        assert_eq!(parse_color("Yellow"), Some(Color::Yellow));
        assert_eq!(parse_color(" cyan "), Some(Color::Cyan));
        assert_eq!(parse_color("purple"), Some(Color::Magenta));
        assert_eq!(parse_color("grey"), Some(Color::Gray));
    }

    #[test]
    fn parse_color_accepts_hex() {
        assert_eq!(parse_color("#ffaa00"), Some(Color::Rgb(0xff, 0xaa, 0x00)));
        assert_eq!(parse_color("#000000"), Some(Color::Rgb(0, 0, 0)));
    }

    #[test]
    fn parse_color_rejects_garbage() {
        assert_eq!(parse_color(""), None);
        assert_eq!(parse_color("blurple"), None);
        assert_eq!(parse_color("#ff"), None);
        assert_eq!(parse_color("#ggiijj"), None);
        assert_eq!(parse_color("#ffaa001"), None);
    }
}
