use mealprep::conversation::Role;
use mealprep::orchestrator::{ChatState, Orchestrator, Session};
use mealprep::preferences::{Country, Diet, PreferenceChange, Preferences, PrepTime};
use mealprep::transport::HttpChatClient;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn orchestrator_for(server: &MockServer) -> Orchestrator<HttpChatClient> {
    Orchestrator::new(HttpChatClient::new(&server.uri()).unwrap())
}

#[test_log::test(tokio::test)]
async fn test_reply_is_appended_as_assistant_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reply": "X" })))
        .mount(&server)
        .await;

    let mut orchestrator = orchestrator_for(&server).await;
    let before = orchestrator.session().conversation().len();
    assert!(orchestrator.submit("Hello").await);

    let conversation = orchestrator.session().conversation();
    assert_eq!(conversation.len(), before + 2);
    let last = conversation.last().unwrap();
    assert_eq!(last.role(), Role::Assistant);
    assert_eq!(last.content(), "X");
    assert_eq!(orchestrator.session().state(), ChatState::Idle);
}

#[test_log::test(tokio::test)]
async fn test_preferences_are_appended_to_the_outgoing_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({
            "message": "Plan my week\n\nUser Preferences:\nCountry: Canada\nDiet: Veg\nPrep Time: 30 minutes"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reply": "Plan ready" })))
        .expect(1)
        .mount(&server)
        .await;

    let prefs = Preferences {
        country: Some(Country::Canada),
        diet: Some(Diet::Veg),
        budget_level: None,
        prep_time: Some(PrepTime::new(30)),
        preferred_store: None,
    };
    let client = HttpChatClient::new(&server.uri()).unwrap();
    let mut orchestrator = Orchestrator::with_session(Session::with_preferences(prefs), client);

    assert!(orchestrator.submit("Plan my week").await);
    // The transcript keeps the text as typed
    let messages = orchestrator.session().conversation().messages();
    assert_eq!(messages[messages.len() - 2].content(), "Plan my week");
    assert_eq!(messages[messages.len() - 1].content(), "Plan ready");
}

#[test_log::test(tokio::test)]
async fn test_no_preferences_sends_text_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({ "message": "Hi" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reply": "Hello!" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut orchestrator = orchestrator_for(&server).await;
    orchestrator.update_preference(PreferenceChange::PrepTime(None));
    assert!(orchestrator.submit("Hi").await);
}

#[test_log::test(tokio::test)]
async fn test_failure_still_grows_conversation_by_two() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "detail": "OPENAI_API_KEY missing" })))
        .mount(&server)
        .await;

    let mut orchestrator = orchestrator_for(&server).await;
    let before = orchestrator.session().conversation().len();
    assert!(orchestrator.submit("Plan my week").await);

    let conversation = orchestrator.session().conversation();
    assert_eq!(conversation.len(), before + 2);
    let last = conversation.last().unwrap();
    assert_eq!(last.role(), Role::Assistant);
    assert_eq!(
        last.content(),
        "Error: OpenAI API key is not configured. Please check your backend setup."
    );
    assert_eq!(orchestrator.session().state(), ChatState::Idle);
}

#[test_log::test(tokio::test)]
async fn test_blank_submission_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reply": "X" })))
        .expect(0)
        .mount(&server)
        .await;

    let mut orchestrator = orchestrator_for(&server).await;
    let before = orchestrator.session().conversation().len();
    assert!(!orchestrator.submit("   \n ").await);
    assert_eq!(orchestrator.session().conversation().len(), before);
}
