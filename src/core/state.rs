use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::core::{config::Settings, redis::RedisHandle, shutdown::Shutdown};
use crate::services::exam_backend::ExamBackend;
use crate::session::orchestrator::SessionOrchestrator;
use crate::session::store::TimeStore;

pub(crate) type SharedSession = Arc<Mutex<SessionOrchestrator>>;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    redis: RedisHandle,
    time_store: Arc<dyn TimeStore>,
    backend: Arc<dyn ExamBackend>,
    sessions: RwLock<HashMap<String, SharedSession>>,
    start_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    shutdown: Shutdown,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        redis: RedisHandle,
        time_store: Arc<dyn TimeStore>,
        backend: Arc<dyn ExamBackend>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            inner: Arc::new(InnerState {
                settings,
                redis,
                time_store,
                backend,
                sessions: RwLock::new(HashMap::new()),
                start_locks: Mutex::new(HashMap::new()),
                shutdown,
            }),
        }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    pub(crate) fn time_store(&self) -> Arc<dyn TimeStore> {
        self.inner.time_store.clone()
    }

    pub(crate) fn backend(&self) -> &dyn ExamBackend {
        self.inner.backend.as_ref()
    }

    pub(crate) fn shutdown(&self) -> &Shutdown {
        &self.inner.shutdown
    }

    /// Serialises starts of one session id. Starts of different ids do not wait on each other.
    pub(crate) async fn start_guard(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.start_locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(session_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    pub(crate) async fn session(&self, session_id: &str) -> Option<SharedSession> {
        self.inner.sessions.read().await.get(session_id).cloned()
    }

    /// Registers a live session. Returns the already registered one and `false` on a race.
    pub(crate) async fn register_session(
        &self,
        session_id: &str,
        session: SharedSession,
    ) -> (SharedSession, bool) {
        let mut sessions = self.inner.sessions.write().await;
        if let Some(existing) = sessions.get(session_id) {
            return (existing.clone(), false);
        }
        sessions.insert(session_id.to_string(), session.clone());
        (session, true)
    }

    pub(crate) async fn release_session(&self, session_id: &str) {
        self.inner.sessions.write().await.remove(session_id);
    }

    pub(crate) async fn session_count(&self) -> usize {
        self.inner.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_support::{self, FakeBackend};

    #[tokio::test]
    async fn start_guard_is_per_session_id() {
        let ctx = test_support::setup_test_context(FakeBackend::new(1)).await;

        let held = ctx.state.start_guard("contest-1:student-1").await;
        let other = tokio::time::timeout(
            Duration::from_millis(100),
            ctx.state.start_guard("contest-1:student-2"),
        )
        .await;
        assert!(other.is_ok());

        let same = tokio::time::timeout(
            Duration::from_millis(50),
            ctx.state.start_guard("contest-1:student-1"),
        )
        .await;
        assert!(same.is_err());

        drop(held);
        let reacquired = tokio::time::timeout(
            Duration::from_millis(100),
            ctx.state.start_guard("contest-1:student-1"),
        )
        .await;
        assert!(reacquired.is_ok());
    }
}
