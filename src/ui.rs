use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use tui_textarea::TextArea;

use crate::app_state::{AppState, Focus};
use crate::preferences::PreferenceField;

const ACCENT: Color = Color::Rgb(102, 126, 234);

pub fn draw_ui(f: &mut ratatui::Frame, app: &mut AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),                  // Header
            Constraint::Length(3),                  // Preferences
            Constraint::Min(5),                     // Transcript
            Constraint::Length(app.input_height()), // Input
            Constraint::Length(1),                  // Status line
        ])
        .split(f.area());

    render_header(f, chunks[0]);
    render_preferences(f, app, chunks[1]);

    let title = format!("Chat - {}", app.backend_label);
    app.transcript.render(f, chunks[2], &title);

    render_input_area(f, app, chunks[3]);
    render_status_line(f, app, chunks[4]);

    if app.show_help {
        let area = f.area();
        render_help_screen(f, area);
    }
}

fn render_header(f: &mut ratatui::Frame, area: Rect) {
    let lines = vec![
        Line::from(Span::styled(
            "🍛 Meal Prep Planner",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Your AI assistant for planning Indian meals that fit your busy student life abroad",
            Style::default().fg(Color::Gray),
        )),
    ];
    let header = Paragraph::new(lines).block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(header, area);
}

fn render_preferences(f: &mut ratatui::Frame, app: &AppState, area: Rect) {
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 5); 5])
        .split(area);

    let prefs = app.session.preferences();
    for (field, cell) in PreferenceField::ALL.iter().zip(cells.iter()) {
        let focused = app.focus == Focus::Preference(*field);
        let border_style = if focused {
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let value = prefs.display_value(*field);
        let is_set = match field {
            PreferenceField::Country => prefs.country.is_some(),
            PreferenceField::Diet => prefs.diet.is_some(),
            PreferenceField::BudgetLevel => prefs.budget_level.is_some(),
            PreferenceField::PrepTime => prefs.prep_time.is_some(),
            PreferenceField::PreferredStore => prefs.preferred_store.is_some(),
        };
        let value_style = if is_set {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let text = if focused {
            format!("◀ {} ▶", value)
        } else {
            value
        };

        let control = Paragraph::new(Span::styled(text, value_style))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border_style)
                    .title(field.label()),
            );
        f.render_widget(control, *cell);
    }
}

fn render_input_area(f: &mut ratatui::Frame, app: &mut AppState, area: Rect) {
    let sending = app.session.is_sending();
    let focused = app.focus == Focus::Input;

    let title = if sending {
        "Sending...".to_string()
    } else {
        "Message (Enter to send, Shift+Enter for new line)".to_string()
    };
    let border_style = if sending {
        Style::default().fg(Color::DarkGray)
    } else if focused {
        Style::default().fg(ACCENT)
    } else {
        Style::default().fg(Color::Gray)
    };
    style_textarea(&mut app.textarea, title, border_style, focused && !sending);

    f.render_widget(&app.textarea, area);
}

fn style_textarea(textarea: &mut TextArea<'static>, title: String, border_style: Style, active: bool) {
    textarea.set_block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(title),
    );
    let cursor = if active {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    };
    textarea.set_cursor_style(cursor);
    textarea.set_cursor_line_style(Style::default());
}

fn render_status_line(f: &mut ratatui::Frame, app: &AppState, area: Rect) {
    let state = if app.session.is_sending() { "Sending" } else { "Idle" };
    let status = Line::from(vec![
        Span::styled(format!(" {} ", state), Style::default().fg(Color::Black).bg(ACCENT)),
        Span::styled(
            " Tab: switch field  ◀/▶: change preference  PgUp/PgDn: scroll  F1: help  Esc: quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    f.render_widget(Paragraph::new(status), area);
}

fn render_help_screen(f: &mut ratatui::Frame, area: Rect) {
    let popup = centered_rect(60, 60, area);
    let help = vec![
        Line::from(Span::styled("Keys", Style::default().add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from("Enter            send message"),
        Line::from("Shift/Alt+Enter  new line"),
        Line::from("Tab / Shift+Tab  move between input and preferences"),
        Line::from("◀ ▶ / ▲ ▼        change the focused preference"),
        Line::from("Del / Backspace  clear the focused preference"),
        Line::from("PgUp / PgDn      scroll the chat"),
        Line::from("Ctrl+Home/End    jump to top / bottom"),
        Line::from("F1 or ?          toggle this help"),
        Line::from("Esc / Ctrl+C     quit"),
    ];
    let paragraph = Paragraph::new(help)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(Clear, popup);
    f.render_widget(paragraph, popup);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
