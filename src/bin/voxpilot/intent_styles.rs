//! Optional intent color overrides so retrained vocabularies stay readable.
//!
//! The four trained commands keep their fixed colors; a styles file can only
//! add colors for labels the client does not know. Example:
//!
//! ```yaml
//! intents:
//!   RECULER: yellow
//!   PIVOTER: "#ffaa00"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ratatui::style::Color;
use serde::Deserialize;
use voxpilot::config::AppConfig;
use voxpilot::intent::KnownIntent;
use voxpilot::log_debug;

use crate::theme;

#[derive(Debug, Clone, Default)]
pub(crate) struct IntentStyles {
    overrides: BTreeMap<String, Color>,
    source_path: Option<PathBuf>,
}

impl IntentStyles {
    pub(crate) fn load(config: &AppConfig) -> Self {
        match &config.intent_styles {
            Some(path) => Self::load_from_path(path),
            None => Self::default(),
        }
    }

    /// Missing or invalid files degrade to the built-in palette; the problem
    /// is logged rather than surfaced, matching how other optional config is
    /// treated.
    pub(crate) fn load_from_path(path: &Path) -> Self {
        let mut styles = Self {
            overrides: BTreeMap::new(),
            source_path: Some(path.to_path_buf()),
        };
        if !path.exists() {
            return styles;
        }
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) => {
                log_debug(&format!(
                    "intent styles file unreadable ({}): {err}",
                    path.display()
                ));
                return styles;
            }
        };
        match parse_styles(&contents) {
            Ok(overrides) => {
                styles.overrides = overrides;
                log_debug(&format!(
                    "loaded {} intent styles from {}",
                    styles.overrides.len(),
                    path.display()
                ));
            }
            Err(err) => {
                log_debug(&format!(
                    "intent styles file invalid ({}): {err}",
                    path.display()
                ));
            }
        }
        styles
    }

    pub(crate) fn len(&self) -> usize {
        self.overrides.len()
    }

    pub(crate) fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Color for an intent label: fixed palette first, then overrides, then
    /// neutral. Lookup is exact, matching how the server labels arrive.
    pub(crate) fn color_for(&self, label: &str) -> Color {
        if let Some(intent) = KnownIntent::from_label(label) {
            return theme::builtin_intent_color(intent);
        }
        self.overrides
            .get(label)
            .copied()
            .unwrap_or(theme::NEUTRAL_INTENT_COLOR)
    }
}

#[derive(Debug, Deserialize)]
struct RawStyleFile {
    #[serde(default)]
    intents: BTreeMap<String, String>,
}

fn parse_styles(raw: &str) -> Result<BTreeMap<String, Color>, String> {
    let parsed: RawStyleFile =
        serde_yaml::from_str(raw).map_err(|err| format!("yaml parse error: {err}"))?;
    let mut overrides = BTreeMap::new();
    for (label, value) in parsed.intents {
        let label = label.trim().to_string();
        if label.is_empty() {
            return Err("intent label cannot be empty".to_string());
        }
        if KnownIntent::from_label(&label).is_some() {
            return Err(format!(
                "intent '{label}' has a fixed color and cannot be overridden"
            ));
        }
        let Some(color) = theme::parse_color(&value) else {
            return Err(format!("unknown color '{value}' for intent '{label}'"));
        };
        overrides.insert(label, color);
    }
    Ok(overrides)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn parse_for_test(yaml: &str) -> IntentStyles {
        IntentStyles {
            overrides: parse_styles(yaml).expect("valid yaml"),
            source_path: None,
        }
    }

    #[test]
    fn overrides_color_unknown_labels() {
        let styles = parse_for_test(
            r##"
intents:
  RECULER: yellow
  PIVOTER: "#ffaa00"
"##,
        );

        assert_eq!(styles.color_for("RECULER"), Color::Yellow);
        assert_eq!(styles.color_for("PIVOTER"), Color::Rgb(0xff, 0xaa, 0x00));
    }

    #[test]
    fn builtin_labels_keep_fixed_colors() {
        let styles = parse_for_test(
            r#"
intents:
  RECULER: yellow
"#,
        );

        assert_eq!(styles.color_for("AVANCER"), Color::Green);
        assert_eq!(styles.color_for("STOP"), Color::Red);
        assert_eq!(styles.color_for("GAUCHE"), Color::Blue);
        assert_eq!(styles.color_for("DROITE"), Color::Magenta);
    }

    #[test]
    fn unstyled_labels_fall_back_to_neutral() {
        let styles = IntentStyles::default();
        assert_eq!(styles.color_for("TOURNER"), theme::NEUTRAL_INTENT_COLOR);
        assert_eq!(styles.color_for(""), theme::NEUTRAL_INTENT_COLOR);
    }

    #[test]
    fn parse_rejects_builtin_override() {
        let err = parse_styles(
            r#"
intents:
  STOP: green
"#,
        )
        .expect_err("builtin override");
        assert!(err.contains("fixed color"), "got {err}");
    }

    #[test]
    fn parse_rejects_unknown_color() {
        let err = parse_styles(
            r#"
intents:
  RECULER: blurple
"#,
        )
        .expect_err("bad color");
        assert!(err.contains("unknown color"), "got {err}");
    }

    #[test]
    fn parse_rejects_empty_label() {
        let err = parse_styles(
            r#"
intents:
  "": red
"#,
        )
        .expect_err("empty label");
        assert!(err.contains("label cannot be empty"), "got {err}");
    }

    #[test]
    fn missing_file_keeps_empty_overrides() {
        let styles = IntentStyles::load_from_path(Path::new("/nonexistent/styles.yaml"));
        assert_eq!(styles.len(), 0);
        assert!(styles.source_path().is_some());
    }

    #[test]
    fn load_from_path_reads_styles_file() {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let mut dir = std::env::temp_dir();
        dir.push(format!(
            "voxpilot-styles-{}-{}",
            now,
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::create_dir_all(&dir).expect("create styles dir");
        let path = dir.join("styles.yaml");
        fs::write(
            &path,
            r#"
intents:
  RECULER: yellow
"#,
        )
        .expect("write styles file");

        let styles = IntentStyles::load_from_path(&path);
        assert_eq!(styles.len(), 1);
        assert_eq!(styles.color_for("RECULER"), Color::Yellow);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn invalid_file_degrades_to_builtin_palette() {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let mut dir = std::env::temp_dir();
        dir.push(format!(
            "voxpilot-styles-bad-{}-{}",
            now,
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::create_dir_all(&dir).expect("create styles dir");
        let path = dir.join("styles.yaml");
        fs::write(&path, "intents:\n  STOP: green\n").expect("write styles file");

        let styles = IntentStyles::load_from_path(&path);
        assert_eq!(styles.len(), 0);
        assert_eq!(styles.color_for("STOP"), Color::Red);

        let _ = fs::remove_dir_all(&dir);
    }
}
