// libs/triage-cell/src/services/session_store.rs
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use shared_database::supabase::SupabaseClient;

use crate::models::{Session, TriageError};

pub const SESSIONS_TABLE: &str = "conversation_sessions";

const SESSION_TOKEN_BYTES: usize = 16;

/// Unguessable session identifier: 128 random bits, hex encoded.
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Session persistence. An expired session reads as absent.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: &str, now: DateTime<Utc>) -> Result<Option<Session>, TriageError>;

    async fn save(&self, session: &Session) -> Result<(), TriageError>;
}

pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: &str, now: DateTime<Utc>) -> Result<Option<Session>, TriageError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(id) {
            Some(session) if session.is_expired(now, self.ttl) => {
                info!("Session {} expired; discarding", id);
                sessions.remove(id);
                Ok(None)
            }
            Some(session) => Ok(Some(session.clone())),
            None => Ok(None),
        }
    }

    async fn save(&self, session: &Session) -> Result<(), TriageError> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }
}

pub struct SupabaseSessionStore {
    supabase: Arc<SupabaseClient>,
    ttl: Duration,
}

impl SupabaseSessionStore {
    pub fn new(supabase: Arc<SupabaseClient>, ttl: Duration) -> Self {
        Self { supabase, ttl }
    }
}

#[async_trait]
impl SessionStore for SupabaseSessionStore {
    async fn get(&self, id: &str, now: DateTime<Utc>) -> Result<Option<Session>, TriageError> {
        let rows: Vec<Value> = self
            .supabase
            .select_eq(SESSIONS_TABLE, "session_id", id)
            .await
            .map_err(|e| {
                error!("Failed to load session {}: {}", id, e);
                TriageError::Store(e.to_string())
            })?;

        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };

        let session: Session = serde_json::from_value(row)
            .map_err(|e| TriageError::Store(format!("Failed to parse session: {}", e)))?;

        if session.is_expired(now, self.ttl) {
            info!("Session {} expired", id);
            return Ok(None);
        }
        Ok(Some(session))
    }

    async fn save(&self, session: &Session) -> Result<(), TriageError> {
        let row = serde_json::to_value(session).map_err(|e| TriageError::Store(e.to_string()))?;

        self.supabase
            .upsert(SESSIONS_TABLE, row)
            .await
            .map_err(|e| {
                error!("Failed to save session {}: {}", session.id, e);
                TriageError::Store(e.to_string())
            })?;

        debug!("Session {} saved at stage {}", session.id, session.stage);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_models::locale::Locale;

    #[test]
    fn test_session_tokens_are_random_hex() {
        let first = generate_session_token();
        let second = generate_session_token();
        assert_eq!(first.len(), 32);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_in_memory_expiry_removes_session() {
        let store = InMemorySessionStore::new(Duration::minutes(90));
        let created = Utc::now();
        store
            .save(&Session::new("abc".to_string(), Locale::En, "UTC", created))
            .await
            .unwrap();

        assert!(store.get("abc", created + Duration::minutes(89)).await.unwrap().is_some());
        assert!(store.get("abc", created + Duration::minutes(91)).await.unwrap().is_none());
        assert_eq!(store.len().await, 0);
    }
}
