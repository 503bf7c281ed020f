use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};

use crate::conversation::{Message, Role};

#[derive(Debug, Clone)]
struct Entry {
    role: Role,
    time: String,
    content: String,
}

/// Scrollable chat transcript with a scrollbar.
///
/// Scrolling is measured in wrapped display lines. While `follow` is set the
/// view sticks to the bottom, so every appended message is scrolled into view;
/// scrolling up releases it and scrolling back to the end re-attaches it.
pub struct ScrollableTextArea {
    entries: Vec<Entry>,
    pending: Option<String>,
    pub scroll_position: usize,
    pub max_scroll: usize,
    follow: bool,
}

impl ScrollableTextArea {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            pending: None,
            scroll_position: 0,
            max_scroll: 0,
            follow: true,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn add_message(&mut self, message: &Message) {
        self.entries.push(Entry {
            role: message.role(),
            time: message.time_label(),
            content: message.content().to_string(),
        });
        // Auto-scroll to bottom when new message is added
        self.scroll_to_bottom();
    }

    /// Show or hide a trailing indicator line (e.g. "Thinking...").
    pub fn set_pending(&mut self, pending: Option<&str>) {
        let pending = pending.map(str::to_string);
        if pending != self.pending {
            self.pending = pending;
            if self.pending.is_some() {
                self.scroll_to_bottom();
            }
        }
    }

    pub fn is_following(&self) -> bool {
        self.follow
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_position = self.scroll_position.saturating_sub(lines);
        self.follow = false;
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_position = (self.scroll_position + lines).min(self.max_scroll);
        if self.scroll_position == self.max_scroll {
            self.follow = true;
        }
    }

    pub fn scroll_to_bottom(&mut self) {
        self.follow = true;
        self.scroll_position = self.max_scroll;
    }

    pub fn scroll_to_top(&mut self) {
        self.follow = false;
        self.scroll_position = 0;
    }

    /// Every display line at `width` columns: a header per message, its
    /// wrapped content, and a blank separator.
    pub fn wrapped_lines(&self, width: usize) -> Vec<Line<'static>> {
        let width = width.max(1);
        let mut lines = Vec::new();

        for entry in &self.entries {
            let sender_style = match entry.role {
                Role::User => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                Role::Assistant => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            };
            lines.push(Line::from(vec![
                Span::styled(format!("[{}] ", entry.time), Style::default().fg(Color::DarkGray)),
                Span::styled(format!("{}:", entry.role), sender_style),
            ]));

            let body_style = if entry.role == Role::Assistant && entry.content.starts_with("Error:") {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::White)
            };
            for wrapped in textwrap::wrap(&entry.content, width) {
                lines.push(Line::from(Span::styled(wrapped.into_owned(), body_style)));
            }
            lines.push(Line::default());
        }

        if let Some(pending) = &self.pending {
            lines.push(Line::from(Span::styled(
                pending.clone(),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        lines
    }

    /// Recompute the scroll range for a viewport of `height` lines.
    pub fn update_scroll(&mut self, total_lines: usize, height: usize) {
        self.max_scroll = total_lines.saturating_sub(height);
        if self.follow {
            self.scroll_position = self.max_scroll;
        } else {
            self.scroll_position = self.scroll_position.min(self.max_scroll);
        }
    }

    pub fn render(&mut self, f: &mut ratatui::Frame, area: Rect, title: &str) {
        // Split area to leave space for scrollbar
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(area);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(title.to_string())
            .title_style(Style::default().fg(Color::Blue));
        let inner = block.inner(chunks[0]);

        let lines = self.wrapped_lines(inner.width as usize);
        self.update_scroll(lines.len(), inner.height as usize);

        let paragraph = Paragraph::new(Text::from(lines))
            .block(block)
            .scroll((self.scroll_position.min(u16::MAX as usize) as u16, 0));
        f.render_widget(paragraph, chunks[0]);

        if self.max_scroll > 0 {
            let mut scrollbar_state = ScrollbarState::new(self.max_scroll).position(self.scroll_position);

            let scrollbar = Scrollbar::default()
                .orientation(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"))
                .track_symbol(Some("│"))
                .thumb_symbol("█");

            f.render_stateful_widget(scrollbar, chunks[1], &mut scrollbar_state);
        }
    }
}

impl Default for ScrollableTextArea {
    fn default() -> Self {
        Self::new()
    }
}
