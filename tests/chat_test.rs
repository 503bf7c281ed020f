use mealprep::chat::run_line_chat;
use mealprep::orchestrator::Orchestrator;
use mealprep::transport::HttpChatClient;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test_log::test(tokio::test)]
async fn test_line_chat_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({
            "message": "Plan my week\n\nUser Preferences:\nCountry: Canada\nDiet: Veg\nPrep Time: 30 minutes"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reply": "Monday: rajma chawal" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut orchestrator = Orchestrator::new(HttpChatClient::new(&server.uri()).unwrap());
    let input: &[u8] = b"/set country Canada\n/set diet Vegetarian\n/prefs\n\nPlan my week\n/quit\nnever sent\n";
    let mut output = Vec::new();

    run_line_chat(&mut orchestrator, input, &mut output).await.unwrap();

    let output = String::from_utf8(output).unwrap();
    assert!(output.contains("Assistant: Namaste!"));
    assert!(output.contains("Country: Canada"));
    assert!(output.contains("Diet: Vegetarian"));
    assert!(output.contains("Budget Level: Select Budget"));
    assert!(output.contains("Thinking..."));
    assert!(output.contains("Assistant: Monday: rajma chawal"));
    // Everything after /quit is ignored
    assert_eq!(orchestrator.session().conversation().len(), 3);
}

#[test_log::test(tokio::test)]
async fn test_line_chat_reports_bad_commands_and_continues() {
    let server = MockServer::start().await;
    let mut orchestrator = Orchestrator::new(HttpChatClient::new(&server.uri()).unwrap());
    let input: &[u8] = b"/set diet pizza\n/frobnicate\n";
    let mut output = Vec::new();

    run_line_chat(&mut orchestrator, input, &mut output).await.unwrap();

    let output = String::from_utf8(output).unwrap();
    assert!(output.contains("Unknown diet value: 'pizza'"));
    assert!(output.contains("Unknown command 'frobnicate'"));
    assert_eq!(orchestrator.session().conversation().len(), 1);
}
