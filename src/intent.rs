//! Intent vocabulary and confidence display rules.

/// Commands the classifier was trained on. Labels arrive uppercase from the
/// server and are matched exactly; anything else renders with neutral styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownIntent {
    Avancer,
    Stop,
    Gauche,
    Droite,
}

impl KnownIntent {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "AVANCER" => Some(KnownIntent::Avancer),
            "STOP" => Some(KnownIntent::Stop),
            "GAUCHE" => Some(KnownIntent::Gauche),
            "DROITE" => Some(KnownIntent::Droite),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            KnownIntent::Avancer => "AVANCER",
            KnownIntent::Stop => "STOP",
            KnownIntent::Gauche => "GAUCHE",
            KnownIntent::Droite => "DROITE",
        }
    }
}

/// Render a 0..=1 confidence as a whole-number percentage.
pub fn format_confidence(fraction: f64) -> String {
    format!("{:.0}%", fraction * 100.0)
}
