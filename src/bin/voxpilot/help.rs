//! Keyboard reference shown by the help overlay.

pub(crate) struct Shortcut {
    pub(crate) key: &'static str,
    pub(crate) description: &'static str,
}

pub(crate) const SHORTCUTS: &[Shortcut] = &[
    Shortcut {
        key: "r",
        description: "Start or stop recording",
    },
    Shortcut {
        key: "f",
        description: "Type a path to an audio file",
    },
    Shortcut {
        key: "s / Enter",
        description: "Send the armed audio to the server",
    },
    Shortcut {
        key: "x",
        description: "Discard the armed clip or file",
    },
    Shortcut {
        key: "h / ?",
        description: "Toggle this help",
    },
    Shortcut {
        key: "q / Esc",
        description: "Quit",
    },
];

/// Shortcut table as pre-padded lines for the overlay paragraph.
pub(crate) fn help_lines() -> Vec<String> {
    let key_width = SHORTCUTS
        .iter()
        .map(|shortcut| shortcut.key.len())
        .max()
        .unwrap_or(0);
    SHORTCUTS
        .iter()
        .map(|shortcut| format!("  {:<key_width$}  {}", shortcut.key, shortcut.description))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortcuts_defined() {
        assert!(!SHORTCUTS.is_empty());
        for shortcut in SHORTCUTS {
            assert!(!shortcut.key.is_empty());
            assert!(!shortcut.description.is_empty());
        }
    }

    #[test]
    fn shortcut_keys_are_unique() {
        for (i, a) in SHORTCUTS.iter().enumerate() {
            for b in &SHORTCUTS[i + 1..] {
                assert_ne!(a.key, b.key);
            }
        }
    }

    #[test]
    fn help_lines_contain_every_shortcut() {
        let lines = help_lines();
        assert_eq!(lines.len(), SHORTCUTS.len());
        for (line, shortcut) in lines.iter().zip(SHORTCUTS) {
            assert!(line.contains(shortcut.key), "missing key in '{line}'");
            assert!(
                line.contains(shortcut.description),
                "missing description in '{line}'"
            );
        }
    }

    #[test]
    fn help_lines_align_descriptions() {
        let lines = help_lines();
        let columns: Vec<usize> = lines
            .iter()
            .zip(SHORTCUTS)
            .map(|(line, shortcut)| line.find(shortcut.description).expect("description present"))
            .collect();
        assert!(columns.windows(2).all(|pair| pair[0] == pair[1]));
    }
}
