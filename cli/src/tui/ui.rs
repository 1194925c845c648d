use aiterm_runtime_api::RuntimeStatus;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::app::{App, Entry};

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Model status
            Constraint::Min(0),    // Transcript
            Constraint::Length(3), // Input
        ])
        .split(f.area());

    draw_status(f, app, chunks[0]);
    draw_transcript(f, app, chunks[1]);
    draw_input(f, app, chunks[2]);
}

fn draw_status(f: &mut Frame, app: &App, area: Rect) {
    let status_style = match app.status {
        RuntimeStatus::Ready => Style::default().fg(Color::Green),
        RuntimeStatus::Loading => Style::default().fg(Color::Yellow),
        RuntimeStatus::Unloaded | RuntimeStatus::Error => Style::default().fg(Color::Red),
    };

    let loading_indicator = if app.is_busy() { "⏳ " } else { "" };

    let status = Paragraph::new(Line::from(vec![
        Span::styled(loading_indicator, Style::default().fg(Color::Yellow)),
        Span::styled(app.status_text(), status_style.add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled(
            " Enter: send | Esc: quit | PgUp/PgDn: scroll ",
            Style::default().fg(Color::DarkGray),
        ),
    ]))
    .block(Block::default().borders(Borders::ALL).title(" aiterm "));

    f.render_widget(status, area);
}

fn draw_transcript(f: &mut Frame, app: &App, area: Rect) {
    let lines: Vec<Line> = app.transcript.entries().iter().flat_map(entry_lines).collect();

    // Keep the newest line in view unless the user scrolled back
    let inner = area.height.saturating_sub(2);
    let width = area.width.saturating_sub(2);
    let total = wrapped_height(&lines, width);
    let bottom = total.saturating_sub(inner);
    let offset = bottom.saturating_sub(app.scroll);

    let transcript = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((offset, 0))
        .block(Block::default().borders(Borders::ALL).title(" Terminal "));

    f.render_widget(transcript, area);
}

fn draw_input(f: &mut Frame, app: &App, area: Rect) {
    let (text, style, title) = if app.is_busy() {
        (
            "Processing...".to_string(),
            Style::default().fg(Color::DarkGray),
            " Waiting for the model ",
        )
    } else if app.input.is_empty() {
        (
            "▋ Enter a command or question...".to_string(),
            Style::default().fg(Color::DarkGray),
            " Input ",
        )
    } else {
        (
            format!("{}▋", app.input),
            Style::default().fg(Color::Yellow),
            " Input ",
        )
    };

    let input = Paragraph::new(text)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title(title));

    f.render_widget(input, area);
}

/// One display line per text line; AI text gets a green prefix on its first.
fn entry_lines(entry: &Entry) -> Vec<Line<'_>> {
    let stamp = Span::styled(
        format!("[{}] ", entry.time.format("%H:%M:%S")),
        Style::default().fg(Color::DarkGray),
    );

    entry
        .text
        .split('\n')
        .enumerate()
        .map(|(i, text)| {
            let mut spans = Vec::with_capacity(3);
            if i == 0 {
                spans.push(stamp.clone());
                if entry.from_ai {
                    spans.push(Span::styled(
                        "AI: ",
                        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                    ));
                }
            }
            spans.push(Span::raw(text));
            Line::from(spans)
        })
        .collect()
}

/// Rows `lines` occupy once wrapped to `width` columns (approximate).
fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    if width == 0 {
        return 0;
    }
    let rows: usize = lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width as usize))
        .sum();
    rows.min(u16::MAX as usize) as u16
}
