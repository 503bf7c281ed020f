//! The conversation state machine.
//!
//! A [`Session`] owns the transcript, the preferences and the `Idle`/`Sending`
//! state, and is the only thing that mutates them. Presentation layers feed it
//! [`Intent`]s. A submit that is accepted yields an [`Exchange`]; the caller
//! runs it against a [`ChatTransport`] (inline or on a spawned task) and hands
//! the [`ExchangeOutcome`] back with [`Session::complete`].

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::context::compose_outgoing;
use crate::conversation::{Conversation, Message};
use crate::error::{user_facing_message, TransportError};
use crate::preferences::{PreferenceChange, PreferenceStore, Preferences};
use crate::transport::{ChatReply, ChatTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ChatState {
    #[default]
    Idle,
    Sending,
}

/// What a presentation layer can ask the session to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Submit(String),
    UpdatePreference(PreferenceChange),
}

/// An accepted submission waiting for the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub id: u64,
    /// User text with the preference context block appended.
    pub outgoing: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeOutcome {
    pub id: u64,
    pub result: Result<ChatReply, TransportError>,
}

/// Run one exchange against the backend.
pub async fn deliver<T: ChatTransport + ?Sized>(transport: &T, exchange: Exchange) -> ExchangeOutcome {
    debug!(id = exchange.id, len = exchange.outgoing.len(), "Delivering exchange");
    let result = transport.send(&exchange.outgoing).await;
    ExchangeOutcome {
        id: exchange.id,
        result,
    }
}

#[derive(Debug)]
pub struct Session {
    id: Uuid,
    conversation: Conversation,
    preferences: PreferenceStore,
    state: ChatState,
    next_exchange: u64,
    in_flight: Option<u64>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_preferences(Preferences::session_default())
    }

    pub fn with_preferences(preferences: Preferences) -> Self {
        let id = Uuid::new_v4();
        info!(session = %id, "Session started");
        Self {
            id,
            conversation: Conversation::with_greeting(),
            preferences: PreferenceStore::new(preferences),
            state: ChatState::Idle,
            next_exchange: 0,
            in_flight: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn preferences(&self) -> Preferences {
        self.preferences.snapshot()
    }

    pub fn subscribe_preferences(&self) -> watch::Receiver<Preferences> {
        self.preferences.subscribe()
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn is_sending(&self) -> bool {
        self.state == ChatState::Sending
    }

    /// Apply an intent. Returns the exchange to deliver when a submit moved the
    /// session from `Idle` to `Sending`; every other intent returns `None`.
    pub fn handle(&mut self, intent: Intent) -> Option<Exchange> {
        match intent {
            Intent::Submit(text) => self.begin(&text),
            Intent::UpdatePreference(change) => {
                if self.preferences.apply(change) {
                    debug!(field = ?change.field(), "Preference updated");
                }
                None
            }
        }
    }

    fn begin(&mut self, text: &str) -> Option<Exchange> {
        let text = text.trim();
        if text.is_empty() {
            debug!("Ignoring empty submission");
            return None;
        }
        if self.is_sending() {
            warn!("Ignoring submission while an exchange is in flight");
            return None;
        }

        self.conversation.push(Message::user(text));
        let outgoing = compose_outgoing(text, &self.preferences.snapshot());

        let id = self.next_exchange;
        self.next_exchange += 1;
        self.in_flight = Some(id);
        self.state = ChatState::Sending;
        info!(session = %self.id, exchange = id, "Exchange started");

        Some(Exchange { id, outgoing })
    }

    /// Finish the in-flight exchange: append the reply, or a readable error, and
    /// return to `Idle`. Outcomes for any other exchange are dropped.
    pub fn complete(&mut self, outcome: ExchangeOutcome) -> bool {
        if self.in_flight != Some(outcome.id) {
            warn!(exchange = outcome.id, "Dropping outcome for an exchange that is not in flight");
            return false;
        }

        let content = match outcome.result {
            Ok(reply) => reply.reply,
            Err(err) => {
                warn!(exchange = outcome.id, error = %err, "Exchange failed");
                user_facing_message(&err)
            }
        };
        self.conversation.push(Message::assistant(content));
        self.in_flight = None;
        self.state = ChatState::Idle;
        info!(session = %self.id, exchange = outcome.id, "Exchange finished");
        true
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// A session bound to a transport, for callers that can await the exchange inline.
pub struct Orchestrator<T> {
    session: Session,
    transport: T,
}

impl<T: ChatTransport> Orchestrator<T> {
    pub fn new(transport: T) -> Self {
        Self::with_session(Session::new(), transport)
    }

    pub fn with_session(session: Session, transport: T) -> Self {
        Self { session, transport }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn update_preference(&mut self, change: PreferenceChange) {
        self.session.handle(Intent::UpdatePreference(change));
    }

    /// Submit text and wait for the reply. Returns whether an exchange ran.
    pub async fn submit(&mut self, text: &str) -> bool {
        self.dispatch(Intent::Submit(text.to_string())).await
    }

    pub async fn dispatch(&mut self, intent: Intent) -> bool {
        match self.session.handle(intent) {
            Some(exchange) => {
                let outcome = deliver(&self.transport, exchange).await;
                self.session.complete(outcome)
            }
            None => false,
        }
    }
}
