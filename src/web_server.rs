use anyhow::{Context, Result};
use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
    serve, Json, Router,
};
use minijinja::{context, Environment};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::constants::THINKING_INDICATOR;
use crate::conversation::{Message, Role};
use crate::orchestrator::{deliver, Intent, Session};
use crate::preferences::{Choice, PreferenceChange, PreferenceField, Preferences, PrepTime};
use crate::transport::ChatTransport;

/// Shared state for every request: one session for the whole server.
#[derive(Clone)]
pub struct WebState {
    templates: Arc<Environment<'static>>,
    session: Arc<Mutex<Session>>,
    transport: Arc<dyn ChatTransport>,
}

impl WebState {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Result<Self> {
        Self::with_session(Session::new(), transport)
    }

    pub fn with_session(session: Session, transport: Arc<dyn ChatTransport>) -> Result<Self> {
        let templates = create_minijinja_env().context("Failed to initialize template engine")?;
        Ok(Self {
            templates: Arc::new(templates),
            session: Arc::new(Mutex::new(session)),
            transport,
        })
    }

    pub fn session(&self) -> Arc<Mutex<Session>> {
        self.session.clone()
    }
}

// Templates are compiled into the binary so `serve` works from any directory.
fn create_minijinja_env() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template("index.html", include_str!("../templates/index.html"))?;
    Ok(env)
}

#[derive(Debug, Serialize)]
struct MessageView {
    role: Role,
    sender: String,
    time: String,
    content: String,
    is_error: bool,
}

impl From<&Message> for MessageView {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role(),
            sender: message.role().to_string(),
            time: message.time_label(),
            content: message.content().to_string(),
            is_error: message.role() == Role::Assistant && message.content().starts_with("Error:"),
        }
    }
}

#[derive(Debug, Serialize)]
struct OptionView {
    value: &'static str,
    label: &'static str,
}

#[derive(Debug, Serialize)]
struct FieldView {
    key: &'static str,
    label: &'static str,
    placeholder: &'static str,
    /// Wire value of the current selection, empty when unset.
    value: String,
    options: Vec<OptionView>,
}

fn field_views(prefs: &Preferences) -> Vec<FieldView> {
    PreferenceField::ALL
        .iter()
        .map(|&field| {
            let value = match field {
                PreferenceField::Country => prefs.country.map(|c| c.wire().to_string()),
                PreferenceField::Diet => prefs.diet.map(|d| d.wire().to_string()),
                PreferenceField::BudgetLevel => prefs.budget_level.map(|b| b.wire().to_string()),
                PreferenceField::PrepTime => prefs.prep_time.map(|p| p.minutes().to_string()),
                PreferenceField::PreferredStore => prefs.preferred_store.map(|s| s.wire().to_string()),
            };
            FieldView {
                key: field.key(),
                label: field.label(),
                placeholder: field.placeholder(),
                value: value.unwrap_or_default(),
                options: field
                    .options()
                    .into_iter()
                    .map(|(value, label)| OptionView { value, label })
                    .collect(),
            }
        })
        .collect()
}

fn prep_steps() -> Vec<u16> {
    (PrepTime::MIN..=PrepTime::MAX).step_by(PrepTime::STEP as usize).collect()
}

async fn index_handler(State(state): State<WebState>) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let (messages, fields, sending) = {
        let session = state.session.lock().await;
        let messages: Vec<MessageView> = session.conversation().iter().map(MessageView::from).collect();
        (messages, field_views(&session.preferences()), session.is_sending())
    };

    state
        .templates
        .get_template("index.html")
        .and_then(|tmpl| {
            tmpl.render(context! {
                title => "Meal Prep Planner",
                messages => messages,
                fields => fields,
                prep_steps => prep_steps(),
                sending => sending,
                thinking => THINKING_INDICATOR,
            })
        })
        .map(Html)
        .map_err(|e| {
            error!("Failed to get or render template: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("Internal Server Error: {}", e)),
            )
        })
}

/// Preference changes for every field present in a form. An empty value
/// clears the field; any invalid value rejects the whole form.
fn preference_changes(form: &HashMap<String, String>) -> Result<Vec<PreferenceChange>, (StatusCode, String)> {
    let mut changes = Vec::new();
    for field in PreferenceField::ALL {
        if let Some(value) = form.get(field.key()) {
            let change = PreferenceChange::parse(field, value)
                .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
            changes.push(change);
        }
    }
    Ok(changes)
}

async fn preferences_handler(
    State(state): State<WebState>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Redirect, (StatusCode, String)> {
    let changes = preference_changes(&form)?;
    let mut session = state.session.lock().await;
    for change in changes {
        session.handle(Intent::UpdatePreference(change));
    }
    Ok(Redirect::to("/"))
}

/// The send form carries the preference controls too, so whatever is selected
/// when the message goes out is what the context block reflects.
async fn send_handler(
    State(state): State<WebState>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Redirect, (StatusCode, String)> {
    let changes = preference_changes(&form)?;
    let message = form.get("message").cloned().unwrap_or_default();

    let exchange = {
        let mut session = state.session.lock().await;
        for change in changes {
            session.handle(Intent::UpdatePreference(change));
        }
        session.handle(Intent::Submit(message))
    };

    if let Some(exchange) = exchange {
        // The exchange runs on its own task so the session returns to Idle even
        // if the client goes away and this request future is dropped.
        let session = state.session.clone();
        let transport = state.transport.clone();
        let task = tokio::spawn(async move {
            let outcome = deliver(transport.as_ref(), exchange).await;
            session.lock().await.complete(outcome);
        });
        if let Err(e) = task.await {
            error!("Exchange task failed: {}", e);
        }
    }
    Ok(Redirect::to("/#end"))
}

async fn transcript_handler(State(state): State<WebState>) -> impl IntoResponse {
    let session = state.session.lock().await;
    Json(json!({
        "sessionId": session.id().to_string(),
        "state": session.state(),
        "preferences": session.preferences(),
        "messages": session.conversation().messages(),
    }))
}

async fn healthz_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/preferences", post(preferences_handler))
        .route("/send", post(send_handler))
        .route("/api/transcript", get(transcript_handler))
        .route("/healthz", get(healthz_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http()) // Add request logging
}

pub async fn start_web_server(port: u16, transport: Arc<dyn ChatTransport>) -> Result<()> {
    let state = WebState::new(transport)?;
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Web server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to address {}", addr))?;

    serve(listener, app.into_make_service())
        .await
        .context("Web server failed")?;

    Ok(())
}
