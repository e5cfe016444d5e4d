use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::core::time::format_offset;
use crate::session::lifecycle::SectionState;
use crate::session::model::{AnswerRecord, ReviewMarks, ViolationCounters};
use crate::session::payload::SubmissionPayload;

const KEY_PREFIX: &str = "proctor";

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("store backend unavailable")]
    Unavailable,
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("failed to encode stored value: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Raw durable key/value backend. Keys arrive fully namespaced.
#[async_trait]
pub(crate) trait TimeStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
    /// Like [`TimeStore::set`], but the key never expires.
    async fn set_permanent(&self, key: &str, value: String) -> Result<(), StoreError>;
    async fn delete(&self, keys: &[String]) -> Result<(), StoreError>;
}

#[derive(Default)]
pub(crate) struct MemoryTimeStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryTimeStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TimeStore for MemoryTimeStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn set_permanent(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.set(key, value).await
    }

    async fn delete(&self, keys: &[String]) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entity {
    RemainingTimes,
    SectionStates,
    Violations,
    OverallRemaining,
    StartedAt,
    Answers,
    Reviews,
    FrozenPayload,
    Finished,
}

impl Entity {
    const ALL: [Entity; 9] = [
        Entity::RemainingTimes,
        Entity::SectionStates,
        Entity::Violations,
        Entity::OverallRemaining,
        Entity::StartedAt,
        Entity::Answers,
        Entity::Reviews,
        Entity::FrozenPayload,
        Entity::Finished,
    ];

    fn suffix(self) -> &'static str {
        match self {
            Self::RemainingTimes => "section_remaining",
            Self::SectionStates => "section_states",
            Self::Violations => "violations",
            Self::OverallRemaining => "overall_remaining",
            Self::StartedAt => "started_at",
            Self::Answers => "answers",
            Self::Reviews => "reviews",
            Self::FrozenPayload => "payload",
            Self::Finished => "finished",
        }
    }

    /// The frozen payload and finished marker outlive the state TTL; they are what keeps
    /// a second payload from ever being built for the session.
    fn is_permanent(self) -> bool {
        matches!(self, Self::FrozenPayload | Self::Finished)
    }
}

/// Durable finished marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum FinishMarker {
    /// Payload frozen, backend has not confirmed it yet.
    Frozen,
    /// Backend accepted the payload.
    Acknowledged,
}

/// Everything a reload needs to rebuild a session.
#[derive(Debug, Clone, Default)]
pub(crate) struct PersistedSession {
    pub(crate) remaining_times: Option<Vec<u64>>,
    pub(crate) section_states: Option<Vec<SectionState>>,
    pub(crate) violations: Option<ViolationCounters>,
    pub(crate) overall_remaining: Option<u64>,
    pub(crate) started_at: Option<OffsetDateTime>,
    pub(crate) answers: Option<AnswerRecord>,
    pub(crate) reviews: Option<ReviewMarks>,
    pub(crate) frozen_payload: Option<SubmissionPayload>,
    pub(crate) finished: Option<FinishMarker>,
}

impl PersistedSession {
    pub(crate) fn is_empty(&self) -> bool {
        self.remaining_times.is_none()
            && self.section_states.is_none()
            && self.overall_remaining.is_none()
            && self.started_at.is_none()
            && self.finished.is_none()
    }
}

/// Typed view of one session's keys inside a [`TimeStore`].
#[derive(Clone)]
pub(crate) struct SessionStore {
    backend: Arc<dyn TimeStore>,
    session_id: String,
}

impl SessionStore {
    pub(crate) fn new(backend: Arc<dyn TimeStore>, session_id: impl Into<String>) -> Self {
        Self { backend, session_id: session_id.into() }
    }

    fn key(&self, entity: Entity) -> String {
        format!("{KEY_PREFIX}:{}:{}", self.session_id, entity.suffix())
    }

    pub(crate) async fn load(&self) -> Result<PersistedSession, StoreError> {
        Ok(PersistedSession {
            remaining_times: self.load_remaining_times().await?,
            section_states: self.get_json(Entity::SectionStates).await?,
            violations: self.get_json(Entity::Violations).await?,
            overall_remaining: self.load_overall_remaining().await?,
            started_at: self.load_started_at().await?,
            answers: self.get_json(Entity::Answers).await?,
            reviews: self.get_json(Entity::Reviews).await?,
            frozen_payload: self.get_json(Entity::FrozenPayload).await?,
            finished: self.get_json(Entity::Finished).await?,
        })
    }

    pub(crate) async fn load_remaining_times(&self) -> Result<Option<Vec<u64>>, StoreError> {
        let raw: Option<Vec<serde_json::Value>> = self.get_json(Entity::RemainingTimes).await?;
        Ok(raw.map(|values| values.iter().map(sanitize_seconds).collect()))
    }

    pub(crate) async fn save_remaining_times(&self, remaining: &[u64]) -> Result<(), StoreError> {
        self.set_json(Entity::RemainingTimes, &remaining).await
    }

    pub(crate) async fn save_section_states(&self, states: &[SectionState]) -> Result<(), StoreError> {
        self.set_json(Entity::SectionStates, &states).await
    }

    pub(crate) async fn save_violations(&self, counters: &ViolationCounters) -> Result<(), StoreError> {
        self.set_json(Entity::Violations, counters).await
    }

    pub(crate) async fn load_overall_remaining(&self) -> Result<Option<u64>, StoreError> {
        let raw: Option<serde_json::Value> = self.get_json(Entity::OverallRemaining).await?;
        Ok(raw.as_ref().map(sanitize_seconds))
    }

    pub(crate) async fn save_overall_remaining(&self, remaining: u64) -> Result<(), StoreError> {
        self.set_json(Entity::OverallRemaining, &remaining).await
    }

    pub(crate) async fn load_started_at(&self) -> Result<Option<OffsetDateTime>, StoreError> {
        let Some(raw) = self.backend.get(&self.key(Entity::StartedAt)).await? else {
            return Ok(None);
        };
        match OffsetDateTime::parse(raw.trim(), &Rfc3339) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    error = %err,
                    "Discarding unparsable session start timestamp"
                );
                Ok(None)
            }
        }
    }

    pub(crate) async fn save_started_at(&self, started_at: OffsetDateTime) -> Result<(), StoreError> {
        self.backend.set(&self.key(Entity::StartedAt), format_offset(started_at)).await
    }

    pub(crate) async fn save_answers(&self, answers: &AnswerRecord) -> Result<(), StoreError> {
        self.set_json(Entity::Answers, answers).await
    }

    pub(crate) async fn save_reviews(&self, reviews: &ReviewMarks) -> Result<(), StoreError> {
        self.set_json(Entity::Reviews, reviews).await
    }

    pub(crate) async fn save_frozen_payload(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<(), StoreError> {
        self.set_json(Entity::FrozenPayload, payload).await
    }

    pub(crate) async fn save_finish_marker(&self, marker: FinishMarker) -> Result<(), StoreError> {
        self.set_json(Entity::Finished, &marker).await
    }

    /// Drops every key of the session except the finished marker.
    pub(crate) async fn discard_state(&self) -> Result<(), StoreError> {
        let keys: Vec<String> = Entity::ALL
            .iter()
            .filter(|entity| **entity != Entity::Finished)
            .map(|entity| self.key(*entity))
            .collect();
        self.backend.delete(&keys).await
    }

    async fn get_json<T: DeserializeOwned>(&self, entity: Entity) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.backend.get(&self.key(entity)).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    entity = entity.suffix(),
                    error = %err,
                    "Discarding unreadable stored value"
                );
                Ok(None)
            }
        }
    }

    async fn set_json<T: Serialize + ?Sized>(&self, entity: Entity, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        if entity.is_permanent() {
            self.backend.set_permanent(&self.key(entity), raw).await
        } else {
            self.backend.set(&self.key(entity), raw).await
        }
    }
}

/// Restored remaining time. Negative or non-numeric values count as expired.
fn sanitize_seconds(value: &serde_json::Value) -> u64 {
    match value {
        serde_json::Value::Number(number) => {
            if let Some(seconds) = number.as_u64() {
                seconds
            } else {
                match number.as_f64() {
                    Some(seconds) if seconds.is_finite() && seconds > 0.0 => seconds.floor() as u64,
                    _ => 0,
                }
            }
        }
        serde_json::Value::String(raw) => match raw.trim().parse::<f64>() {
            Ok(seconds) if seconds.is_finite() && seconds > 0.0 => seconds.floor() as u64,
            _ => 0,
        },
        _ => 0,
    }
}
