use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_database::SupabaseClient;
use shared_models::locale::Locale;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};
use triage_cell::{Session, SessionStore, Stage, SupabaseSessionStore, TriageError};

fn store(server: &MockServer) -> SupabaseSessionStore {
    let config = TestConfig::with_supabase(&server.uri()).to_app_config();
    SupabaseSessionStore::new(Arc::new(SupabaseClient::new(&config)), Duration::minutes(90))
}

#[tokio::test]
async fn test_load_live_session() {
    let mock_server = MockServer::start().await;
    let updated_at = Utc::now() - Duration::minutes(5);

    Mock::given(method("GET"))
        .and(path("/rest/v1/conversation_sessions"))
        .and(query_param("session_id", "eq.abc123"))
        .and(header("apikey", "test-service-role-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::session_row("abc123", "collect_email", updated_at)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = store(&mock_server).get("abc123", Utc::now()).await.unwrap().unwrap();
    assert_eq!(session.id, "abc123");
    assert_eq!(session.stage, Stage::CollectEmail);
    assert!(!session.revising);
}

#[tokio::test]
async fn test_expired_row_reads_as_absent() {
    let mock_server = MockServer::start().await;
    let updated_at = Utc::now() - Duration::hours(2);

    Mock::given(method("GET"))
        .and(path("/rest/v1/conversation_sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::session_row("old", "collect_name", updated_at)
        ])))
        .mount(&mock_server)
        .await;

    assert!(store(&mock_server).get("old", Utc::now()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_missing_row_reads_as_absent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/conversation_sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    assert!(store(&mock_server).get("nope", Utc::now()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_save_upserts_row() {
    let mock_server = MockServer::start().await;
    let mut session = Session::new("abc123".to_string(), Locale::Es, "America/Mexico_City", Utc::now());
    session.stage = Stage::CollectHistory;
    session.symptom_overview = Some("dolor de cabeza".to_string());

    Mock::given(method("POST"))
        .and(path("/rest/v1/conversation_sessions"))
        .and(header("Prefer", "resolution=merge-duplicates,return=representation"))
        .and(body_partial_json(json!({
            "session_id": "abc123",
            "stage": "collect_history",
            "locale": "es",
            "timezone": "America/Mexico_City",
            "symptom_overview": "dolor de cabeza"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    store(&mock_server).save(&session).await.unwrap();
}

#[tokio::test]
async fn test_database_errors_are_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/conversation_sessions"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(MockSupabaseResponses::error_response("boom", "XX000")),
        )
        .mount(&mock_server)
        .await;

    assert_matches!(
        store(&mock_server).get("abc123", Utc::now()).await,
        Err(TriageError::Store(_))
    );
}
