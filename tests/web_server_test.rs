use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use mealprep::error::TransportError;
use mealprep::preferences::{BudgetLevel, Country, PrepTime};
use mealprep::transport::{ChatReply, ChatTransport, HttpChatClient};
use mealprep::web_server::{router, WebState};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Echo;

#[async_trait]
impl ChatTransport for Echo {
    async fn send(&self, message: &str) -> Result<ChatReply, TransportError> {
        Ok(ChatReply {
            reply: format!("echo: {}", message),
        })
    }
}

/// Echoes after a delay, so a request can still be in flight when another arrives.
struct SlowEcho(Duration);

#[async_trait]
impl ChatTransport for SlowEcho {
    async fn send(&self, message: &str) -> Result<ChatReply, TransportError> {
        tokio::time::sleep(self.0).await;
        Ok(ChatReply {
            reply: format!("echo: {}", message),
        })
    }
}

fn server_with(transport: Arc<dyn ChatTransport>) -> (TestServer, WebState) {
    let state = WebState::new(transport).unwrap();
    let server = TestServer::new(router(state.clone())).unwrap();
    (server, state)
}

#[tokio::test]
async fn test_index_renders_greeting_and_form() {
    let (server, _) = server_with(Arc::new(Echo));
    let response = server.get("/").await;
    response.assert_status_ok();

    let html = response.text();
    assert!(html.contains("Meal Prep Planner"));
    assert!(html.contains("Namaste!"));
    assert!(html.contains(r#"name="country""#));
    assert!(html.contains(r#"<option value="30" selected>30 minutes</option>"#));
    assert!(html.contains(r#"id="end""#));
    // Preference controls are submitted along with every message
    assert!(html.contains(r#"<select name="country" form="chat">"#));
    assert!(html.contains(r#"formaction="/preferences""#));
    // Input grows with its content in browsers without `field-sizing`
    assert!(html.contains("Math.min(input.scrollHeight, 150)"));
}

#[tokio::test]
async fn test_healthz() {
    let (server, _) = server_with(Arc::new(Echo));
    let response = server.get("/healthz").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_send_appends_exchange_and_redirects_to_end() {
    let (server, state) = server_with(Arc::new(Echo));

    let response = server.post("/send").form(&[("message", "Hello")]).await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/#end");

    let session = state.session();
    let session = session.lock().await;
    let messages = session.conversation().messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].content(), "Hello");
    assert!(messages[2].content().starts_with("echo: Hello"));
    assert!(!session.is_sending());
}

#[tokio::test]
async fn test_blank_send_is_ignored() {
    let (server, state) = server_with(Arc::new(Echo));
    server
        .post("/send")
        .form(&[("message", "   ")])
        .await
        .assert_status(StatusCode::SEE_OTHER);
    assert_eq!(state.session().lock().await.conversation().len(), 1);
}

#[tokio::test]
async fn test_preferences_form_updates_session() {
    let (server, state) = server_with(Arc::new(Echo));
    let response = server
        .post("/preferences")
        .form(&[
            ("country", "UK"),
            ("diet", ""),
            ("budget", "Low"),
            ("prep_time", "60"),
            ("store", ""),
        ])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/");

    let prefs = state.session().lock().await.preferences();
    assert_eq!(prefs.country, Some(Country::Uk));
    assert_eq!(prefs.diet, None);
    assert_eq!(prefs.budget_level, Some(BudgetLevel::Low));
    assert_eq!(prefs.prep_time, Some(PrepTime::new(60)));
    assert_eq!(prefs.preferred_store, None);
}

#[tokio::test]
async fn test_invalid_preference_is_rejected_without_changes() {
    let (server, state) = server_with(Arc::new(Echo));
    let response = server
        .post("/preferences")
        .form(&[("country", "Canada"), ("diet", "Pescatarian")])
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.text().contains("Pescatarian"));

    assert_eq!(state.session().lock().await.preferences().country, None);
}

#[tokio::test]
async fn test_transcript_json_includes_preferences_and_messages() {
    let (server, _) = server_with(Arc::new(Echo));
    server
        .post("/preferences")
        .form(&[("country", "Canada")])
        .await;
    server.post("/send").form(&[("message", "Plan my week")]).await;

    let body: Value = server.get("/api/transcript").await.json();
    assert_eq!(body["state"], "Idle");
    assert_eq!(body["preferences"]["country"], "Canada");
    assert_eq!(body["preferences"]["prepTime"], 30);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1]["role"], "user");
    assert_eq!(messages[1]["content"], "Plan my week");
    assert_eq!(messages[2]["role"], "assistant");
    assert_eq!(
        messages[2]["content"],
        "echo: Plan my week\n\nUser Preferences:\nCountry: Canada\nPrep Time: 30 minutes"
    );
}

#[test_log::test(tokio::test)]
async fn test_backend_failure_is_rendered_in_page() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "detail": "OPENAI_API_KEY missing" })))
        .mount(&backend)
        .await;

    let client = HttpChatClient::new(&backend.uri()).unwrap();
    let (server, _) = server_with(Arc::new(client));
    server.post("/send").form(&[("message", "Hi")]).await;

    let html = server.get("/").await.text();
    assert!(html.contains("message assistant error"));
    assert!(html.contains("OpenAI API key is not configured"));
    assert!(!html.contains("OPENAI_API_KEY missing"));
}

#[tokio::test]
async fn test_send_applies_selected_preferences_before_submitting() {
    let (server, state) = server_with(Arc::new(Echo));
    server
        .post("/send")
        .form(&[
            ("message", "Plan my week"),
            ("country", "UK"),
            ("diet", ""),
            ("budget", "High"),
            ("prep_time", "45"),
            ("store", ""),
        ])
        .await
        .assert_status(StatusCode::SEE_OTHER);

    let session = state.session();
    let session = session.lock().await;
    let prefs = session.preferences();
    assert_eq!(prefs.country, Some(Country::Uk));
    assert_eq!(prefs.budget_level, Some(BudgetLevel::High));
    assert_eq!(prefs.prep_time, Some(PrepTime::new(45)));
    assert_eq!(
        session.conversation().last().unwrap().content(),
        "echo: Plan my week\n\nUser Preferences:\nCountry: UK\nBudget: High\nPrep Time: 45 minutes"
    );
}

#[tokio::test]
async fn test_send_with_invalid_preference_sends_nothing() {
    let (server, state) = server_with(Arc::new(Echo));
    let response = server
        .post("/send")
        .form(&[("message", "Plan my week"), ("store", "Costco")])
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.text().contains("Costco"));
    assert_eq!(state.session().lock().await.conversation().len(), 1);
}

#[tokio::test]
async fn test_second_send_while_in_flight_is_ignored() {
    let (server, state) = server_with(Arc::new(SlowEcho(Duration::from_millis(300))));

    let first = async { server.post("/send").form(&[("message", "first")]).await };
    let second = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        server.post("/send").form(&[("message", "second")]).await
    };
    let (first, second) = tokio::join!(first, second);
    first.assert_status(StatusCode::SEE_OTHER);
    second.assert_status(StatusCode::SEE_OTHER);

    let session = state.session();
    let session = session.lock().await;
    let messages = session.conversation().messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].content(), "first");
    assert!(messages[2].content().starts_with("echo: first"));
    assert!(!session.is_sending());
}

#[tokio::test]
async fn test_exchange_completes_after_client_disconnects() {
    let (server, state) = server_with(Arc::new(SlowEcho(Duration::from_millis(300))));

    // The client gives up long before the backend answers
    let abandoned = tokio::time::timeout(Duration::from_millis(50), async {
        server.post("/send").form(&[("message", "first")]).await
    })
    .await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(600)).await;
    {
        let session = state.session();
        let session = session.lock().await;
        assert!(!session.is_sending());
        assert_eq!(session.conversation().len(), 3);
        assert!(session.conversation().last().unwrap().content().starts_with("echo: first"));
    }

    server
        .post("/send")
        .form(&[("message", "second")])
        .await
        .assert_status(StatusCode::SEE_OTHER);
    let session = state.session();
    let session = session.lock().await;
    assert_eq!(session.conversation().len(), 5);
    assert!(session.conversation().last().unwrap().content().starts_with("echo: second"));
}
