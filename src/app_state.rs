use std::sync::Arc;
use tokio::sync::mpsc;
use tui_textarea::TextArea;

use crate::constants::{INPUT_MAX_LINES, INPUT_MIN_LINES, THINKING_INDICATOR};
use crate::orchestrator::{deliver, Exchange, ExchangeOutcome, Intent, Session};
use crate::preferences::{PreferenceChange, PreferenceField};
use crate::transport::ChatTransport;
use crate::ui_components::ScrollableTextArea;

/// Which control receives key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    Preference(PreferenceField),
}

impl Focus {
    // Input, then the five preference controls in form order.
    fn order() -> [Focus; 6] {
        let [a, b, c, d, e] = PreferenceField::ALL;
        [
            Focus::Input,
            Focus::Preference(a),
            Focus::Preference(b),
            Focus::Preference(c),
            Focus::Preference(d),
            Focus::Preference(e),
        ]
    }

    pub fn next(self) -> Self {
        let order = Self::order();
        let i = order.iter().position(|f| *f == self).unwrap_or(0);
        order[(i + 1) % order.len()]
    }

    pub fn previous(self) -> Self {
        let order = Self::order();
        let i = order.iter().position(|f| *f == self).unwrap_or(0);
        order[(i + order.len() - 1) % order.len()]
    }
}

/// Everything the terminal UI needs between frames.
pub struct AppState {
    pub session: Session,
    pub textarea: TextArea<'static>,
    pub focus: Focus,
    pub transcript: ScrollableTextArea,
    pub show_help: bool,
    pub backend_label: String,
    transport: Arc<dyn ChatTransport>,
    outcome_tx: mpsc::Sender<ExchangeOutcome>,
    outcome_rx: mpsc::Receiver<ExchangeOutcome>,
}

impl AppState {
    pub fn new(transport: Arc<dyn ChatTransport>, backend_label: impl Into<String>) -> Self {
        Self::with_session(Session::new(), transport, backend_label)
    }

    pub fn with_session(
        session: Session,
        transport: Arc<dyn ChatTransport>,
        backend_label: impl Into<String>,
    ) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::channel(8);
        let mut app = Self {
            session,
            textarea: new_textarea(),
            focus: Focus::Input,
            transcript: ScrollableTextArea::new(),
            show_help: false,
            backend_label: backend_label.into(),
            transport,
            outcome_tx,
            outcome_rx,
        };
        app.sync_transcript();
        app
    }

    pub fn input_text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    /// Height of the input box including its border: grows with the text, capped.
    pub fn input_height(&self) -> u16 {
        let lines = self.textarea.lines().len().min(u16::MAX as usize) as u16;
        lines.clamp(INPUT_MIN_LINES, INPUT_MAX_LINES) + 2
    }

    /// Send the input box contents. Ignored while sending or when the input is blank.
    pub fn submit_input(&mut self) -> bool {
        if self.session.is_sending() {
            return false;
        }
        let text = self.input_text();
        match self.session.handle(Intent::Submit(text)) {
            Some(exchange) => {
                self.textarea = new_textarea();
                self.sync_transcript();
                self.spawn_exchange(exchange);
                true
            }
            None => false,
        }
    }

    fn spawn_exchange(&self, exchange: Exchange) {
        let transport = self.transport.clone();
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let outcome = deliver(transport.as_ref(), exchange).await;
            if tx.send(outcome).await.is_err() {
                tracing::warn!("UI closed before the exchange finished");
            }
        });
    }

    /// Apply any finished exchanges without blocking. Returns whether anything changed.
    pub fn process_outcomes(&mut self) -> bool {
        let mut changed = false;
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            changed |= self.finish(outcome);
        }
        changed
    }

    /// Wait for the next finished exchange.
    pub async fn next_outcome(&mut self) -> bool {
        match self.outcome_rx.recv().await {
            Some(outcome) => self.finish(outcome),
            None => false,
        }
    }

    fn finish(&mut self, outcome: ExchangeOutcome) -> bool {
        let applied = self.session.complete(outcome);
        if applied {
            self.focus = Focus::Input;
            self.sync_transcript();
        }
        applied
    }

    pub fn update_preference(&mut self, change: PreferenceChange) {
        self.session.handle(Intent::UpdatePreference(change));
    }

    pub fn step_preference(&mut self, field: PreferenceField, forward: bool) {
        let change = self.session.preferences().step(field, forward);
        self.update_preference(change);
    }

    pub fn paste(&mut self, text: &str) {
        if self.focus == Focus::Input && !self.session.is_sending() {
            self.textarea.insert_str(text);
        }
    }

    /// Bring the transcript widget in line with the conversation.
    pub fn sync_transcript(&mut self) {
        let messages = self.session.conversation().messages();
        for message in &messages[self.transcript.len().min(messages.len())..] {
            self.transcript.add_message(message);
        }
        let pending = self.session.is_sending().then_some(THINKING_INDICATOR);
        self.transcript.set_pending(pending);
    }
}

fn new_textarea() -> TextArea<'static> {
    let mut textarea = TextArea::default();
    textarea.set_placeholder_text("Type your message... (Enter to send, Shift+Enter for new line)");
    textarea.set_max_histories(100);
    textarea
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::transport::ChatReply;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl ChatTransport for Echo {
        async fn send(&self, message: &str) -> Result<ChatReply, TransportError> {
            Ok(ChatReply {
                reply: format!("echo: {}", message.lines().next().unwrap_or_default()),
            })
        }
    }

    fn app() -> AppState {
        AppState::new(Arc::new(Echo), "http://localhost:8000")
    }

    #[test]
    fn test_focus_cycles_through_input_and_preferences() {
        let mut focus = Focus::Input;
        for _ in 0..6 {
            focus = focus.next();
        }
        assert_eq!(focus, Focus::Input);
        assert_eq!(Focus::Input.previous(), Focus::Preference(PreferenceField::PreferredStore));
        assert_eq!(Focus::Input.next(), Focus::Preference(PreferenceField::Country));
    }

    #[test]
    fn test_new_app_shows_greeting() {
        let app = app();
        assert_eq!(app.transcript.len(), 1);
        assert_eq!(app.focus, Focus::Input);
    }

    #[test]
    fn test_input_height_grows_and_caps() {
        let mut app = app();
        assert_eq!(app.input_height(), INPUT_MIN_LINES + 2);
        app.textarea.insert_str("one\ntwo\nthree");
        assert_eq!(app.input_height(), 5);
        app.textarea.insert_str("\n4\n5\n6\n7\n8\n9");
        assert_eq!(app.input_height(), INPUT_MAX_LINES + 2);
    }

    #[test]
    fn test_blank_input_is_not_submitted() {
        let mut app = app();
        app.textarea.insert_str("   ");
        assert!(!app.submit_input());
        assert_eq!(app.session.conversation().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_round_trip() {
        let mut app = app();
        app.textarea.insert_str("Plan my week");
        assert!(app.submit_input());
        assert!(app.session.is_sending());
        assert!(app.input_text().is_empty());
        assert_eq!(app.transcript.len(), 2);

        // Input is disabled while sending.
        app.textarea.insert_str("again");
        assert!(!app.submit_input());

        assert!(app.next_outcome().await);
        assert!(!app.session.is_sending());
        assert_eq!(app.session.conversation().len(), 3);
        assert_eq!(
            app.session.conversation().last().unwrap().content(),
            "echo: Plan my week"
        );
        assert_eq!(app.transcript.len(), 3);
    }

    #[test]
    fn test_step_preference_updates_session() {
        let mut app = app();
        app.step_preference(PreferenceField::Country, true);
        assert!(app.session.preferences().country.is_some());
        app.step_preference(PreferenceField::PrepTime, true);
        assert_eq!(app.session.preferences().prep_time.unwrap().minutes(), 45);
    }
}
