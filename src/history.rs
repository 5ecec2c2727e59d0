//! In-memory log of processed commands, newest first.
//!
//! Entries live for the session only. Each row keeps the raw confidence so the
//! display layer can reformat it however it likes.

use chrono::{Local, NaiveTime};

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// Local wall-clock time the result arrived, hour:minute.
    pub time_label: String,
    pub transcription: String,
    pub intent: String,
    pub confidence: f64,
}

impl HistoryEntry {
    pub fn new(transcription: String, intent: String, confidence: f64) -> Self {
        Self {
            time_label: format_time_label(Local::now().time()),
            transcription,
            intent,
            confidence,
        }
    }
}

fn format_time_label(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Session history with the most recent command first.
#[derive(Debug, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn prepend(&mut self, entry: HistoryEntry) {
        self.entries.insert(0, entry);
    }

    /// Rows in display order, newest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(transcription: &str) -> HistoryEntry {
        HistoryEntry {
            time_label: "12:00".to_string(),
            transcription: transcription.to_string(),
            intent: "STOP".to_string(),
            confidence: 0.9,
        }
    }

    #[test]
    fn time_label_is_hour_minute() {
        let time = NaiveTime::from_hms_opt(9, 7, 33).expect("valid time");
        assert_eq!(format_time_label(time), "09:07");

        let afternoon = NaiveTime::from_hms_opt(14, 5, 0).expect("valid time");
        assert_eq!(format_time_label(afternoon), "14:05");
    }

    #[test]
    fn newest_entry_comes_first() {
        let mut history = History::default();
        history.prepend(entry("first"));
        history.prepend(entry("second"));
        history.prepend(entry("third"));

        let rows: Vec<&str> = history
            .entries()
            .iter()
            .map(|e| e.transcription.as_str())
            .collect();
        assert_eq!(rows, ["third", "second", "first"]);
    }

    #[test]
    fn history_is_unbounded() {
        let mut history = History::default();
        for i in 0..500 {
            history.prepend(entry(&format!("cmd {i}")));
        }
        assert_eq!(history.len(), 500);
    }

    #[test]
    fn starts_empty() {
        let history = History::default();
        assert!(history.is_empty());
        assert!(history.entries().is_empty());
    }

    #[test]
    fn new_entry_captures_current_time_shape() {
        let entry = HistoryEntry::new("avance".to_string(), "AVANCER".to_string(), 0.97);
        assert_eq!(entry.time_label.len(), 5);
        assert_eq!(entry.time_label.as_bytes()[2], b':');
    }
}
