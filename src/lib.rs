pub mod app_state;
pub mod chat;
pub mod constants;
pub mod context;
pub mod conversation;
pub mod error;
pub mod events;
pub mod logging;
pub mod orchestrator;
pub mod preferences;
pub mod transport;
pub mod ui;
pub mod ui_components;
pub mod web_server;

pub use context::compose_outgoing;
pub use conversation::{Conversation, Message, Role};
pub use error::{ConfigError, ErrorCategory, TransportError};
pub use orchestrator::{ChatState, Exchange, ExchangeOutcome, Intent, Orchestrator, Session};
pub use preferences::{
    BudgetLevel, Country, Diet, PreferenceChange, PreferenceField, Preferences, PrepTime, Store,
};
pub use transport::{ChatReply, ChatTransport, Endpoints, Environment, HttpChatClient};
