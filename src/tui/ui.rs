use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::markup::{self, StyledSpan};
use crate::tui::{CerebroApp, InputMode, TuiState};

const LOADER_FRAMES: &[&str] = &[
    "▰▱▱▱▱", "▰▰▱▱▱", "▰▰▰▱▱", "▰▰▰▰▱", "▰▰▰▰▰", "▱▰▰▰▰", "▱▱▰▰▰", "▱▱▱▰▰", "▱▱▱▱▰",
];

const DISCLAIMER: &str =
    "CereBroBot may display inaccurate info, including about people, so double-check its responses.";

/// Render the UI
pub fn render_ui(f: &mut Frame, app: &CerebroApp, state: &TuiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Status bar
            Constraint::Min(5),    // Recent prompts and result
            Constraint::Length(3), // Input box
            Constraint::Length(1), // Disclaimer
        ])
        .split(f.size());

    render_status_bar(f, app, state, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25), Constraint::Percentage(75)])
        .split(chunks[1]);

    render_recent(f, app, body[0]);
    if app.chat().show_result {
        render_result(f, app, state, body[1]);
    } else {
        render_greeting(f, body[1]);
    }

    render_input_box(f, app, state, chunks[2]);

    let disclaimer = Paragraph::new(DISCLAIMER).style(Style::default().fg(Color::DarkGray));
    f.render_widget(disclaimer, chunks[3]);
}

fn render_status_bar(f: &mut Frame, app: &CerebroApp, state: &TuiState, area: Rect) {
    let chat = app.chat();
    let (status, color) = if chat.loading {
        ("Thinking", Color::Yellow)
    } else if app.is_revealing() {
        ("Answering", Color::Cyan)
    } else {
        ("Ready", Color::Green)
    };

    let keys = match state.input_mode {
        InputMode::Editing => "Enter send · ↑/↓ history · Ctrl+N new chat · Esc normal mode",
        InputMode::Normal => "e edit · n new chat · q quit",
    };

    let status_text = Line::from(vec![
        Span::styled("Model: ", Style::default().fg(Color::Gray)),
        Span::styled(app.model_name(), Style::default().fg(Color::Green)),
        Span::styled(" | ", Style::default().fg(Color::Gray)),
        Span::styled(status, Style::default().fg(color)),
        Span::styled(" | ", Style::default().fg(Color::Gray)),
        Span::styled(keys, Style::default().fg(Color::DarkGray)),
    ]);

    let status_bar = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("CereBroBot"));

    f.render_widget(status_bar, area);
}

fn render_recent(f: &mut Frame, app: &CerebroApp, area: Rect) {
    let items: Vec<ListItem> = app
        .chat()
        .turns
        .iter()
        .rev()
        .map(|turn| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    turn.answered_at.format("%H:%M ").to_string(),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(turn.prompt.as_str()),
            ]))
        })
        .collect();

    let recent = List::new(items).block(Block::default().borders(Borders::ALL).title("Recent"));
    f.render_widget(recent, area);
}

fn render_greeting(f: &mut Frame, area: Rect) {
    let greeting = Text::from(vec![
        Line::from(""),
        Line::from(Span::styled(
            "Hello, Developer.",
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "How can I help you?",
            Style::default().fg(Color::Gray),
        )),
    ]);

    let widget = Paragraph::new(greeting).block(Block::default().borders(Borders::ALL));
    f.render_widget(widget, area);
}

fn render_result(f: &mut Frame, app: &CerebroApp, state: &TuiState, area: Rect) {
    let chat = app.chat();

    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                "You: ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(chat.recent_prompt.as_str()),
        ]),
        Line::from(""),
    ];

    if chat.loading {
        let frame = LOADER_FRAMES[state.frame / 4 % LOADER_FRAMES.len()];
        lines.push(Line::from(Span::styled(
            frame,
            Style::default().fg(Color::Magenta),
        )));
    } else if chat.result_data.is_empty() && !app.is_revealing() {
        lines.push(Line::from(Span::styled(
            "No response found.",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )));
    } else {
        lines.extend(markup_lines(&chat.result_data));
    }

    let result = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title("CereBroBot"))
        .wrap(Wrap { trim: false });

    f.render_widget(result, area);
}

/// Markup to styled ratatui lines
fn markup_lines(markup: &str) -> Vec<Line<'static>> {
    markup::lines(markup)
        .into_iter()
        .map(|spans| {
            Line::from(
                spans
                    .into_iter()
                    .map(|StyledSpan { text, bold }| {
                        let style = if bold {
                            Style::default().add_modifier(Modifier::BOLD)
                        } else {
                            Style::default()
                        };
                        Span::styled(text, style)
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .collect()
}

fn render_input_box(f: &mut Frame, app: &CerebroApp, state: &TuiState, area: Rect) {
    let chat = app.chat();
    let editing = state.input_mode == InputMode::Editing;

    let input = Paragraph::new(chat.input.as_str())
        .style(Style::default())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Enter a prompt here")
                .style(Style::default().fg(if chat.loading || !editing {
                    Color::DarkGray
                } else {
                    Color::White
                })),
        );

    f.render_widget(input, area);

    if editing && !chat.loading {
        f.set_cursor(cursor_x(area, &chat.input), area.y + 1);
    }
}

/// Column after the typed text, kept inside the box border.
fn cursor_x(area: Rect, input: &str) -> u16 {
    let typed = u16::try_from(input.chars().count()).unwrap_or(u16::MAX);
    let last = area.right().saturating_sub(2).max(area.x);
    area.x.saturating_add(1).saturating_add(typed).min(last)
}
