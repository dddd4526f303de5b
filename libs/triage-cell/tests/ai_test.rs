use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::{BookingService, InMemoryAppointmentStore};
use shared_config::AppConfig;
use shared_models::locale::Locale;
use shared_utils::test_utils::TestConfig;
use triage_cell::services::replies::ReplyKey;
use triage_cell::{
    ChatRequest, InMemorySessionStore, OpenAiReplyGenerator, ReplyGenerator, Session, Stage,
    TriageService, TriageSettings, TurnRole,
};

fn ai_config() -> AppConfig {
    TestConfig {
        openai_api_key: "sk-test".to_string(),
        ..TestConfig::default()
    }
    .to_app_config()
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

fn session_with_turn(text: &str) -> Session {
    let mut session = Session::new("s1".to_string(), Locale::En, "UTC", Utc::now());
    session.stage = Stage::CollectHistory;
    session.push_turn(TurnRole::User, text);
    session
}

#[tokio::test]
async fn test_generator_posts_prompt_and_history() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o",
            "max_tokens": 300
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            "  I'm sorry to hear that. When did it start?  ",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let generator = OpenAiReplyGenerator::with_base_url(&ai_config(), &mock_server.uri());
    let session = session_with_turn("my head hurts");
    let reply = generator
        .generate(&session, "my head hurts", ReplyKey::AskHistory, "When did it start?")
        .await;

    assert_eq!(reply.as_deref(), Some("I'm sorry to hear that. When did it start?"));

    let requests = mock_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[1], json!({ "role": "user", "content": "my head hurts" }));
}

#[tokio::test]
async fn test_generator_falls_back_on_errors_and_empty_text() {
    let mock_server = MockServer::start().await;
    let generator = OpenAiReplyGenerator::with_base_url(&ai_config(), &mock_server.uri());
    let session = session_with_turn("hello");

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({ "error": "rate limited" })))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    assert!(generator.generate(&session, "hello", ReplyKey::AskName, "Name?").await.is_none());

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("   ")))
        .mount(&mock_server)
        .await;
    assert!(generator.generate(&session, "hello", ReplyKey::AskName, "Name?").await.is_none());
}

#[tokio::test]
async fn test_generator_never_words_fixed_replies() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("freeform")))
        .expect(0)
        .mount(&mock_server)
        .await;

    let generator = OpenAiReplyGenerator::with_base_url(&ai_config(), &mock_server.uri());
    let session = session_with_turn("I have chest pain");
    for key in [ReplyKey::EmergencySafety, ReplyKey::ConfirmSummary, ReplyKey::BookingConfirmed] {
        assert!(generator.generate(&session, "x", key, "canned").await.is_none());
    }
}

#[tokio::test]
async fn test_chat_uses_generated_text_for_collection_prompts() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            "Hi there! What brings you in today?",
        )))
        .mount(&mock_server)
        .await;

    let config = ai_config();
    let generator: Arc<dyn ReplyGenerator> =
        Arc::new(OpenAiReplyGenerator::with_base_url(&config, &mock_server.uri()));
    let booking = Arc::new(BookingService::new(&config, Arc::new(InMemoryAppointmentStore::new()), None));
    let triage = TriageService::new(
        Arc::new(InMemorySessionStore::new(Duration::minutes(90))),
        booking,
        Some(generator),
        TriageSettings::from_config(&config),
    );

    let response = triage
        .handle_message(ChatRequest {
            message: "hello".to_string(),
            session_id: None,
            locale: None,
            timezone: None,
        })
        .await
        .unwrap();
    assert_eq!(response.reply, "Hi there! What brings you in today?");

    let response = triage
        .handle_message(ChatRequest {
            message: "I think I'm having a stroke".to_string(),
            session_id: Some(response.session_id),
            locale: None,
            timezone: None,
        })
        .await
        .unwrap();
    assert_eq!(response.stage, Stage::EmergencyEscalated);
    assert!(response.reply.starts_with("Your symptoms sound urgent."));
}

#[tokio::test]
async fn test_slow_completion_falls_back_to_canned_reply() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("too late"))
                .set_delay(std::time::Duration::from_secs(30)),
        )
        .mount(&mock_server)
        .await;

    let config = ai_config();
    let generator: Arc<dyn ReplyGenerator> = Arc::new(
        OpenAiReplyGenerator::with_base_url(&config, &mock_server.uri())
            .with_timeout(std::time::Duration::from_millis(200)),
    );
    let booking = Arc::new(BookingService::new(&config, Arc::new(InMemoryAppointmentStore::new()), None));
    let triage = TriageService::new(
        Arc::new(InMemorySessionStore::new(Duration::minutes(90))),
        booking,
        Some(generator),
        TriageSettings::from_config(&config),
    );

    let turn = triage.handle_message(ChatRequest {
        message: "hello".to_string(),
        session_id: None,
        locale: None,
        timezone: None,
    });
    let response = tokio::time::timeout(std::time::Duration::from_secs(5), turn)
        .await
        .expect("turn finishes without waiting on the completion")
        .unwrap();

    assert_eq!(response.stage, Stage::CollectSymptoms);
    assert!(response.reply.starts_with("Welcome to Medikah!"));
}
