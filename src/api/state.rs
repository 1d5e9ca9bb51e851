//! Shared handler state: the catalog, live sessions and the outbound sinks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, QuizError};
use crate::leads::{EventSink, LeadSink, ProgressSource, TracingEventSink};
use crate::quiz::{Catalog, QuizSession};

/// Supplies ids for new sessions.
pub trait SessionIdProvider: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidSessionIds;

impl SessionIdProvider for UuidSessionIds {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// In-memory map of live quiz sessions. Sessions never share state.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, QuizSession>>,
}

impl SessionRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn insert(&self, session: QuizSession) {
        info!(session_id = %session.id, "Quiz session started");
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session);
    }

    /// Put back a session rebuilt from storage unless one is already live.
    pub async fn restore(&self, session: QuizSession) {
        self.sessions
            .write()
            .await
            .entry(session.id.clone())
            .or_insert(session);
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    /// Snapshot of a session.
    pub async fn get(&self, id: &str) -> Result<QuizSession, QuizError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| QuizError::SessionNotFound { id: id.to_string() })
    }

    /// Run `f` against a session under the write lock.
    ///
    /// Returns the closure's result with a snapshot taken after it ran.
    pub async fn update<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut QuizSession) -> Result<T, QuizError>,
    ) -> Result<(T, QuizSession), QuizError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| QuizError::SessionNotFound { id: id.to_string() })?;
        let out = f(session)?;
        Ok((out, session.clone()))
    }

    /// Drop sessions not updated within `idle`. Returns how many were removed.
    pub async fn prune_stale(&self, idle: Duration) -> usize {
        let idle = TimeDelta::from_std(idle).unwrap_or(TimeDelta::MAX);
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| now - session.updated_at < idle);
        let pruned = before - sessions.len();
        if pruned > 0 {
            info!(pruned, remaining = sessions.len(), "Pruned idle quiz sessions");
        } else {
            debug!(remaining = sessions.len(), "No idle quiz sessions to prune");
        }
        pruned
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub sessions: Arc<SessionRegistry>,
    pub leads: Arc<dyn LeadSink>,
    pub events: Arc<dyn EventSink>,
    pub ids: Arc<dyn SessionIdProvider>,
    /// Where pruned or pre-restart sessions are reloaded from.
    pub history: Option<Arc<dyn ProgressSource>>,
}

impl AppState {
    /// State with UUID session ids and log-based analytics.
    pub fn new(catalog: Catalog, leads: Arc<dyn LeadSink>) -> Self {
        Self {
            catalog: Arc::new(catalog),
            sessions: SessionRegistry::new(),
            leads,
            events: Arc::new(TracingEventSink),
            ids: Arc::new(UuidSessionIds),
            history: None,
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_ids(mut self, ids: Arc<dyn SessionIdProvider>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_history(mut self, history: Arc<dyn ProgressSource>) -> Self {
        self.history = Some(history);
        self
    }

    /// Make sure `id` is live, reloading it from stored progress if needed.
    pub async fn ensure_session(&self, id: &str) -> Result<(), Error> {
        if self.sessions.contains(id).await {
            return Ok(());
        }
        let not_found = || QuizError::SessionNotFound { id: id.to_string() };
        let history = self.history.as_ref().ok_or_else(not_found)?;
        let record = history.load(id).await?.ok_or_else(not_found)?;

        let session = record.into_session(&self.catalog);
        info!(
            session_id = %id,
            status = %session.status,
            "Quiz session resumed from stored progress"
        );
        self.sessions.restore(session).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::DatabaseError;
    use crate::leads::ProgressRecord;
    use crate::leads::sink::testing::RecordingSink;
    use crate::quiz::AnswerSet;

    #[test]
    fn uuid_ids_are_unique() {
        let ids = UuidSessionIds;
        assert_ne!(ids.next_id(), ids.next_id());
        assert!(Uuid::parse_str(&ids.next_id()).is_ok());
    }

    #[tokio::test]
    async fn registry_update_returns_snapshot() {
        let catalog = Catalog::builtin();
        let registry = SessionRegistry::new();
        registry.insert(QuizSession::new("s-1")).await;

        let (response, snapshot) = registry
            .update("s-1", |s| s.respond(&catalog, "situation", "er"))
            .await
            .unwrap();
        assert!(response.selection.auto_advance);
        assert!(snapshot.answers.is("situation", "er"));
        assert_eq!(registry.get("s-1").await.unwrap().answers, snapshot.answers);
    }

    #[tokio::test]
    async fn missing_session_is_not_found() {
        let registry = SessionRegistry::new();
        assert!(registry.is_empty().await);
        let err = registry.get("ghost").await.unwrap_err();
        assert_eq!(err, QuizError::SessionNotFound { id: "ghost".into() });

        let err = registry
            .update("ghost", |_| Ok::<_, QuizError>(()))
            .await
            .unwrap_err();
        assert!(matches!(err, QuizError::SessionNotFound { .. }));
    }

    #[tokio::test]
    async fn prune_drops_only_idle_sessions() {
        let registry = SessionRegistry::new();
        let mut idle = QuizSession::new("idle");
        idle.updated_at = Utc::now() - TimeDelta::hours(2);
        registry.insert(idle).await;
        registry.insert(QuizSession::new("active")).await;

        let pruned = registry.prune_stale(Duration::from_secs(3600)).await;
        assert_eq!(pruned, 1);
        assert_eq!(registry.len().await, 1);
        assert!(registry.get("active").await.is_ok());
        assert!(matches!(
            registry.get("idle").await,
            Err(QuizError::SessionNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn prune_keeps_recently_updated_sessions() {
        let catalog = Catalog::builtin();
        let registry = SessionRegistry::new();
        let mut session = QuizSession::new("s-1");
        session.started_at = Utc::now() - TimeDelta::hours(3);
        session.updated_at = session.started_at;
        registry.insert(session).await;

        registry
            .update("s-1", |s| s.respond(&catalog, "situation", "er"))
            .await
            .unwrap();
        assert_eq!(registry.prune_stale(Duration::from_secs(3600)).await, 0);
        assert_eq!(registry.len().await, 1);
    }

    struct StoredRows(Vec<ProgressRecord>);

    #[async_trait]
    impl ProgressSource for StoredRows {
        async fn load(&self, session_id: &str) -> Result<Option<ProgressRecord>, DatabaseError> {
            Ok(self.0.iter().find(|r| r.session_id == session_id).cloned())
        }
    }

    fn stored(session_id: &str, question: &str, answers: AnswerSet) -> ProgressRecord {
        let now = Utc::now();
        ProgressRecord {
            session_id: session_id.into(),
            started_at: now,
            last_updated: now,
            current_question: Some(question.into()),
            completed: false,
            drop_off_point: None,
            contact: None,
            answers,
            estimate: None,
        }
    }

    #[tokio::test]
    async fn pruned_session_is_resumed_from_history() {
        let rows = StoredRows(vec![stored(
            "s-1",
            "hospital_services",
            AnswerSet::new().with("situation", "er"),
        )]);
        let state = AppState::new(Catalog::builtin(), Arc::new(RecordingSink::default()))
            .with_history(Arc::new(rows));

        state.ensure_session("s-1").await.unwrap();
        let session = state.sessions.get("s-1").await.unwrap();
        assert!(session.answers.is("situation", "er"));
        assert_eq!(
            session.current_step_id(&state.catalog).as_deref(),
            Some("hospital_services")
        );

        let err = state.ensure_session("s-2").await.unwrap_err();
        assert!(matches!(err, Error::Quiz(QuizError::SessionNotFound { .. })));
    }

    #[tokio::test]
    async fn live_session_wins_over_history() {
        let rows = StoredRows(vec![stored("s-1", "emergency", AnswerSet::new())]);
        let state = AppState::new(Catalog::builtin(), Arc::new(RecordingSink::default()))
            .with_history(Arc::new(rows));
        state.sessions.insert(QuizSession::new("s-1")).await;

        state.ensure_session("s-1").await.unwrap();
        let session = state.sessions.get("s-1").await.unwrap();
        assert_eq!(session.current_step_id(&state.catalog).as_deref(), Some("situation"));
    }

    #[tokio::test]
    async fn without_history_missing_is_not_found() {
        let state = AppState::new(Catalog::builtin(), Arc::new(RecordingSink::default()));
        let err = state.ensure_session("ghost").await.unwrap_err();
        assert!(matches!(err, Error::Quiz(QuizError::SessionNotFound { .. })));
    }

    #[tokio::test]
    async fn failed_update_leaves_session_untouched() {
        let catalog = Catalog::builtin();
        let registry = SessionRegistry::new();
        registry.insert(QuizSession::new("s-1")).await;

        let err = registry
            .update("s-1", |s| s.respond(&catalog, "situation", "astronaut"))
            .await
            .unwrap_err();
        assert!(matches!(err, QuizError::UnknownOption { .. }));
        assert!(registry.get("s-1").await.unwrap().answers.is_empty());
        assert_eq!(registry.len().await, 1);
    }
}
