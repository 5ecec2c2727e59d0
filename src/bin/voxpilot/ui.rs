//! Terminal UI: render loop, layout, and overlays.
//!
//! The screen is three stacked panels. The top panel shows the latest server
//! reply (or a busy spinner while a submission is in flight), the middle panel
//! lists past commands newest first, and the bottom panel carries the status
//! line, recording indicator, and key hints. Help and error alerts render as
//! centered overlays on top of the panels.

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use unicode_width::UnicodeWidthStr;

use voxpilot::history::HistoryEntry;
use voxpilot::intent::format_confidence;
use voxpilot::terminal_restore::TerminalRestoreGuard;
use voxpilot::text::ellipsize;

use crate::app::{App, RecordPhase};
use crate::intent_styles::IntentStyles;
use crate::theme;

const POLL_INTERVAL_MS: u64 = 100;

const SPINNER: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

pub(crate) fn run_app(app: &mut App) -> Result<()> {
    let guard = TerminalRestoreGuard::new();
    guard.enable_raw_mode()?;
    let mut stdout = io::stdout();
    guard.enter_alt_screen(&mut stdout)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = app_loop(&mut terminal, app);
    guard.restore();
    result
}

fn app_loop<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        app.poll_jobs();
        terminal.draw(|frame| draw(frame, app))?;

        if event::poll(Duration::from_millis(POLL_INTERVAL_MS))? {
            if let Event::Key(key) = event::read()? {
                if app.on_key(key) {
                    return Ok(());
                }
            }
        }
    }
}

pub(crate) fn draw(frame: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Min(5),
            Constraint::Length(4),
        ])
        .split(frame.size());

    draw_result_panel(frame, app, rows[0]);
    draw_history_panel(frame, app, rows[1]);
    draw_status_panel(frame, app, rows[2]);

    if app.show_help {
        draw_help_overlay(frame);
    }
    if let Some(message) = &app.alert {
        draw_alert_overlay(frame, message);
    }
}

fn draw_result_panel(frame: &mut Frame, app: &App, area: Rect) {
    let lines = if app.submit_in_flight() {
        vec![Line::from(vec![
            Span::styled(
                format!("{} ", spinner_glyph(app.tick)),
                Style::default().fg(theme::TITLE_COLOR),
            ),
            Span::raw(app.status.clone()),
        ])]
    } else if let Some(entry) = app.history.entries().first() {
        vec![
            Line::from(format!("\"{}\"", entry.transcription)),
            Line::from(vec![
                Span::raw("Intent: "),
                Span::styled(
                    entry.intent.clone(),
                    Style::default()
                        .fg(app.styles.color_for(&entry.intent))
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!(
                    "   Confidence: {}",
                    format_confidence(entry.confidence)
                )),
            ]),
            Line::from(Span::styled(
                format!("at {}", entry.time_label),
                Style::default().fg(theme::MUTED_COLOR),
            )),
        ]
    } else {
        vec![Line::from(Span::styled(
            "No command processed yet.",
            Style::default().fg(theme::MUTED_COLOR),
        ))]
    };

    let panel = Paragraph::new(Text::from(lines))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("Result")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme::BORDER_COLOR)),
        );
    frame.render_widget(panel, area);
}

fn draw_history_panel(frame: &mut Frame, app: &App, area: Rect) {
    let visible = (area.height.saturating_sub(2) as usize).max(1);
    let width = area.width.saturating_sub(2);

    let lines: Vec<Line> = if app.history.is_empty() {
        vec![Line::from(Span::styled(
            "No commands yet.",
            Style::default().fg(theme::MUTED_COLOR),
        ))]
    } else {
        app.history
            .entries()
            .iter()
            .take(visible)
            .map(|entry| history_line(entry, &app.styles, width))
            .collect()
    };

    let panel = Paragraph::new(Text::from(lines)).block(
        Block::default()
            .title(format!("History ({})", app.history.len()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme::BORDER_COLOR)),
    );
    frame.render_widget(panel, area);
}

/// One history row: time, quoted transcription, colored intent, confidence.
/// The transcription is ellipsized so the fixed columns always fit.
fn history_line(entry: &HistoryEntry, styles: &IntentStyles, width: u16) -> Line<'static> {
    let confidence = format_confidence(entry.confidence);
    let fixed = entry.time_label.chars().count()
        + entry.intent.chars().count()
        + confidence.chars().count()
        + 8; // quotes plus column gaps
    let budget = (width as usize).saturating_sub(fixed).max(8);
    let transcription = ellipsize(&entry.transcription, budget);

    Line::from(vec![
        Span::styled(
            entry.time_label.clone(),
            Style::default().fg(theme::MUTED_COLOR),
        ),
        Span::raw(format!("  \"{transcription}\"  ")),
        Span::styled(
            entry.intent.clone(),
            Style::default()
                .fg(styles.color_for(&entry.intent))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("  {confidence}")),
    ])
}

fn draw_status_panel(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(buffer) = &app.file_prompt {
        let panel = Paragraph::new(Text::from(vec![
            Line::from(buffer.clone()),
            Line::from(Span::styled(
                "Enter to confirm, Esc to cancel.",
                Style::default().fg(theme::MUTED_COLOR),
            )),
        ]))
        .block(
            Block::default()
                .title("Audio file path")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme::TITLE_COLOR)),
        );
        frame.render_widget(panel, area);

        let cursor_x = (area.x + 1)
            .saturating_add(buffer.as_str().width() as u16)
            .min(area.right().saturating_sub(2));
        frame.set_cursor(cursor_x, area.y + 1);
        return;
    }

    let panel = Paragraph::new(Text::from(vec![status_line(app), hints_line(app)])).block(
        Block::default()
            .title("Status")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme::BORDER_COLOR)),
    );
    frame.render_widget(panel, area);
}

fn status_line(app: &App) -> Line<'static> {
    if app.submit_in_flight() {
        return Line::from(vec![
            Span::styled(
                format!("{} ", spinner_glyph(app.tick)),
                Style::default().fg(theme::TITLE_COLOR),
            ),
            Span::raw(app.status.clone()),
        ]);
    }

    match app.phase {
        RecordPhase::Recording => Line::from(vec![
            Span::styled(
                recording_label(app.record_elapsed_secs()),
                Style::default()
                    .fg(theme::RECORDING_COLOR)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {:.1} dB  ", app.meter.level_db()),
                Style::default().fg(theme::TITLE_COLOR),
            ),
            Span::raw(app.status.clone()),
        ]),
        RecordPhase::Finalizing => Line::from(vec![
            Span::styled(
                format!("{} ", spinner_glyph(app.tick)),
                Style::default().fg(theme::RECORDING_COLOR),
            ),
            Span::raw(app.status.clone()),
        ]),
        RecordPhase::Idle => Line::from(app.status.clone()),
    }
}

fn hints_line(app: &App) -> Line<'static> {
    let source = app
        .source
        .as_ref()
        .map(|source| source.label())
        .unwrap_or_else(|| "none".to_string());
    Line::from(Span::styled(
        format!("Source: {source}  [r] Record  [f] File  [s] Send  [x] Discard  [h] Help  [q] Quit"),
        Style::default().fg(theme::MUTED_COLOR),
    ))
}

fn recording_label(elapsed_secs: u64) -> String {
    format!("● REC {}", format_elapsed(elapsed_secs))
}

fn format_elapsed(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn spinner_glyph(tick: u64) -> char {
    SPINNER[(tick as usize) % SPINNER.len()]
}

fn draw_help_overlay(frame: &mut Frame) {
    let area = overlay_area(50, 50, frame.size());
    frame.render_widget(Clear, area);

    let lines: Vec<Line> = crate::help::help_lines()
        .into_iter()
        .map(Line::from)
        .collect();
    let panel = Paragraph::new(Text::from(lines)).block(
        Block::default()
            .title("Keys")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme::TITLE_COLOR)),
    );
    frame.render_widget(panel, area);
}

fn draw_alert_overlay(frame: &mut Frame, message: &str) {
    let area = overlay_area(60, 30, frame.size());
    frame.render_widget(Clear, area);

    let text = Text::from(vec![
        Line::from(message.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key to dismiss.",
            Style::default().fg(theme::MUTED_COLOR),
        )),
    ]);
    let panel = Paragraph::new(text).wrap(Wrap { trim: false }).block(
        Block::default()
            .title("Error")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme::ALERT_COLOR)),
    );
    frame.render_widget(panel, area);
}

/// Centered rectangle taking the given percentage of the enclosing area.
fn overlay_area(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);
    horizontal[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use ratatui::backend::TestBackend;
    use voxpilot::client::{ConfidenceValue, PredictClient, Prediction};
    use voxpilot::config::AppConfig;
    use voxpilot::submit::SubmitJobMessage;

    fn test_app() -> App {
        let config = AppConfig::parse_from(["voxpilot"]);
        let client =
            PredictClient::new("http://127.0.0.1:1/predict".to_string()).expect("client builds");
        App::new(config, None, client, IntentStyles::default())
    }

    #[test]
    fn spinner_glyph_cycles() {
        assert_eq!(spinner_glyph(0), spinner_glyph(SPINNER.len() as u64));
        assert_ne!(spinner_glyph(0), spinner_glyph(1));
    }

    #[test]
    fn elapsed_label_counts_minutes_and_seconds() {
        assert_eq!(format_elapsed(0), "00:00");
        assert_eq!(format_elapsed(75), "01:15");
        assert_eq!(recording_label(5), "● REC 00:05");
    }

    #[test]
    fn overlay_area_stays_inside_the_frame() {
        let area = Rect::new(0, 0, 100, 40);
        let popup = overlay_area(60, 30, area);
        assert_eq!(popup.width, 60);
        assert_eq!(popup.height, 12);
        assert!(popup.x >= area.x && popup.right() <= area.right());
        assert!(popup.y >= area.y && popup.bottom() <= area.bottom());
    }

    #[test]
    fn history_line_ellipsizes_long_transcriptions() {
        let entry = HistoryEntry {
            time_label: "12:04".to_string(),
            transcription: "a".repeat(200),
            intent: "STOP".to_string(),
            confidence: 0.9,
        };
        let line = history_line(&entry, &IntentStyles::default(), 60);
        let rendered: String = line.spans.iter().map(|span| span.content.as_ref()).collect();
        assert!(rendered.contains('…'));
        assert!(rendered.chars().count() <= 60);
    }

    #[test]
    fn history_line_keeps_short_transcriptions_whole() {
        let entry = HistoryEntry {
            time_label: "12:04".to_string(),
            transcription: "avance un peu".to_string(),
            intent: "AVANCER".to_string(),
            confidence: 1.0,
        };
        let line = history_line(&entry, &IntentStyles::default(), 80);
        let rendered: String = line.spans.iter().map(|span| span.content.as_ref()).collect();
        assert!(rendered.contains("\"avance un peu\""));
    }

    #[test]
    fn draw_renders_all_panels() {
        let mut app = test_app();
        app.handle_submit_message(SubmitJobMessage::Prediction(Prediction {
            transcription: "arrête-toi".to_string(),
            intent: "STOP".to_string(),
            confidence: ConfidenceValue::Number(0.97),
        }));

        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).expect("terminal");
        terminal.draw(|frame| draw(frame, &app)).expect("draw");

        let rendered: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(rendered.contains("Result"));
        assert!(rendered.contains("History (1)"));
        assert!(rendered.contains("Status"));
        assert!(rendered.contains("STOP"));
        assert!(rendered.contains("97%"));
    }

    #[test]
    fn draw_shows_placeholder_before_first_command() {
        let app = test_app();
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).expect("terminal");
        terminal.draw(|frame| draw(frame, &app)).expect("draw");

        let rendered: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(rendered.contains("No command processed yet."));
        assert!(rendered.contains("No commands yet."));
    }
}
