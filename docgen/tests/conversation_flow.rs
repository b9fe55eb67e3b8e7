use std::time::Duration;

use docgen::conversation::GENERATION_APOLOGY;
use docgen::{
    Config, ConversationController, DocumentType, ErrorKind, FeedbackError, FormController,
    HttpTransport, Role, SendOutcome, SubmitOutcome,
};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default().with_base_url(&server.uri()).unwrap();
    config.retry_backoff = Duration::ZERO;
    config
}

fn conversation(config: &Config) -> ConversationController<HttpTransport> {
    ConversationController::new(config.adapter().unwrap())
}

async fn mount_generation(server: &MockServer, doc_id: &str) {
    Mock::given(method("POST"))
        .and(path("/api/generate_document"))
        .and(body_partial_json(json!({ "steps": "Mix reagent A and B", "type": "sop" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "content": "1. Mix...",
            "type": "sop",
            "doc_id": doc_id
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn generated_turn_is_rateable() {
    let server = MockServer::start().await;
    mount_generation(&server, "abc123").await;
    let ctl = conversation(&config_for(&server));
    ctl.set_document_type(DocumentType::Sop);
    ctl.set_input("Mix reagent A and B");

    let outcome = ctl.send_message().await;

    assert_eq!(outcome, SendOutcome::Generated { doc_id: "abc123".into() });
    let turns = ctl.snapshot();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[1].doc_id.as_deref(), Some("abc123"));
    assert!(turns[1].feedback_eligible);
}

#[tokio::test]
async fn feedback_acknowledgement_closes_turn() {
    let server = MockServer::start().await;
    mount_generation(&server, "abc123").await;
    Mock::given(method("POST"))
        .and(path("/api/feedback"))
        .and(body_json(json!({ "doc_id": "abc123", "score": 5 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;
    let ctl = conversation(&config_for(&server));
    ctl.set_input("Mix reagent A and B");
    ctl.send_message().await;

    ctl.set_feedback_rating("abc123", 5).unwrap();
    ctl.submit_feedback("abc123").await.unwrap();

    let turns = ctl.snapshot();
    assert_eq!(turns.len(), 3);
    assert!(!turns[1].feedback_eligible);
    assert_eq!(turns[2].role, Role::Assistant);
    assert!(!turns[2].feedback_eligible);
}

#[tokio::test]
async fn timed_out_generation_apologises() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate_document"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true, "doc_id": "late" }))
                .set_delay(Duration::from_secs(2)),
        )
        .expect(2)
        .mount(&server)
        .await;
    let mut config = config_for(&server);
    config.timeout = Duration::from_millis(200);
    let ctl = conversation(&config);
    ctl.set_input("Mix reagent A and B");

    let outcome = ctl.send_message().await;

    assert!(matches!(outcome, SendOutcome::Failed(ref e) if e.kind() == ErrorKind::Timeout));
    let turns = ctl.snapshot();
    assert_eq!(turns.last().unwrap().content, GENERATION_APOLOGY);
    assert!(!ctl.is_loading());
}

#[tokio::test]
async fn feedback_for_unknown_document_is_rejected_locally() {
    let server = MockServer::start().await;
    mount_generation(&server, "abc123").await;
    Mock::given(method("POST"))
        .and(path("/api/feedback"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(0)
        .mount(&server)
        .await;
    let ctl = conversation(&config_for(&server));
    ctl.set_input("Mix reagent A and B");
    ctl.send_message().await;

    let err = ctl.submit_feedback("not-a-doc").await.unwrap_err();

    assert_eq!(err, FeedbackError::UnknownDocument("not-a-doc".into()));
    assert_eq!(ctl.snapshot().len(), 2);
}

#[tokio::test]
async fn form_generates_with_explicit_roles() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate_document"))
        .and(body_json(json!({
            "steps": "Mix reagent A and B",
            "roles": "Lab tech",
            "notes": "Wear gloves",
            "type": "batch"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "content": "Batch record...",
            "type": "batch",
            "doc_id": "batch-7"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let form = FormController::new(config_for(&server).adapter().unwrap());
    form.set_steps("Mix reagent A and B");
    form.set_roles("Lab tech");
    form.set_notes("Wear gloves");
    form.set_document_type(DocumentType::Batch);

    assert_eq!(
        form.on_submit().await,
        SubmitOutcome::Shown { doc_id: "batch-7".into() }
    );
    assert_eq!(form.response().unwrap().kind, "batch");
}
