use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::api;
use crate::core::{config::Settings, redis::RedisHandle, shutdown::Shutdown, state::AppState};
use crate::schemas::definition::{DurationSpec, QuestionDefinition, SectionDefinition};
use crate::services::exam_backend::{BackendError, ExamBackend};
use crate::session::escalation::ViolationThresholds;
use crate::session::model::{Question, Section, SessionConfig, TimingMode};
use crate::session::payload::SubmissionPayload;
use crate::session::store::MemoryTimeStore;

const OPTIONS: [&str; 4] = ["A", "B", "C", "D"];
const QUESTIONS_PER_SECTION: usize = 2;
const FIXTURE_SECTION_SECONDS: f64 = 60.0;

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: Router,
    pub(crate) backend: Arc<FakeBackend>,
    pub(crate) time_store: Arc<MemoryTimeStore>,
    _guard: OwnedMutexGuard<()>,
}

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    std::env::set_var("PROCTOR_ENV", "test");
    std::env::set_var("PROCTOR_STRICT_CONFIG", "0");
    std::env::set_var("PROCTOR_STORE", "memory");
    std::env::set_var("EXAM_API_URL", "http://exam-api.test");
    std::env::set_var("REDIS_HOST", "127.0.0.1");
    std::env::set_var("REDIS_PORT", "6379");
    std::env::set_var("REDIS_DB", "1");
    std::env::remove_var("REDIS_PASSWORD");
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    std::env::remove_var("API_V1_STR");
    std::env::remove_var("TICK_INTERVAL_MS");
    std::env::remove_var("VIOLATION_DEBOUNCE_MS");
    std::env::remove_var("VISIBILITY_GRACE_MS");
    std::env::remove_var("BACKEND_CORS_ORIGINS");
    std::env::remove_var("PROJECT_NAME");
}

/// Router over an in-memory store and the given scripted backend.
pub(crate) async fn setup_test_context(backend: FakeBackend) -> TestContext {
    let guard = env_lock().await;
    set_test_env();

    let settings = Settings::load().expect("settings");
    let redis = RedisHandle::new(settings.redis().redis_url());
    let backend = Arc::new(backend);
    let time_store = Arc::new(MemoryTimeStore::new());
    let state =
        AppState::new(settings, redis, time_store.clone(), backend.clone(), Shutdown::new());
    let app = api::router::router(state.clone());

    TestContext { state, app, backend, time_store, _guard: guard }
}

pub(crate) fn sample_config(contest_id: &str, student_id: &str) -> SessionConfig {
    SessionConfig {
        session_id: format!("{contest_id}:{student_id}"),
        contest_id: contest_id.to_string(),
        candidate_id: student_id.to_string(),
        mode: TimingMode::Section,
        total_seconds: 0,
        pass_percentage: 50.0,
        thresholds: ViolationThresholds::default(),
        fullscreen_enforced: true,
        result_visibility: "Host control".to_string(),
        debounce_ms: 100,
        visibility_grace_ms: 500,
    }
}

/// One section per duration, two four-option questions each.
pub(crate) fn sample_sections(durations: &[u64]) -> Vec<Section> {
    durations
        .iter()
        .enumerate()
        .map(|(section, seconds)| Section {
            name: format!("Section {}", section + 1),
            questions: (0..QUESTIONS_PER_SECTION)
                .map(|question| Question {
                    id: format!("s{section}-q{question}"),
                    text: question_text(section, question),
                    options: OPTIONS.iter().map(|option| option.to_string()).collect(),
                    correct_option: correct_option(question).to_string(),
                })
                .collect(),
            nominal_seconds: *seconds,
        })
        .collect()
}

pub(crate) fn sample_definitions(count: usize) -> Vec<SectionDefinition> {
    (0..count)
        .map(|section| SectionDefinition {
            section_name: format!("Section {}", section + 1),
            questions: (0..QUESTIONS_PER_SECTION)
                .map(|question| QuestionDefinition {
                    id: None,
                    text: question_text(section, question),
                    options: OPTIONS.iter().map(|option| option.to_string()).collect(),
                    correct_answer: correct_option(question).to_string(),
                })
                .collect(),
            duration: Some(DurationSpec::Seconds(FIXTURE_SECTION_SECONDS)),
        })
        .collect()
}

fn question_text(section: usize, question: usize) -> String {
    format!("S{} question {}", section + 1, question + 1)
}

fn correct_option(question: usize) -> &'static str {
    OPTIONS[(question + 1) % OPTIONS.len()]
}

/// Scripted exam backend. Every submit attempt is recorded, failed ones included,
/// before the configured latency elapses.
pub(crate) struct FakeBackend {
    definitions: Vec<SectionDefinition>,
    fetch_status: Option<u16>,
    latency: Option<Duration>,
    fetches: AtomicUsize,
    failures_left: Mutex<usize>,
    submissions: Mutex<Vec<SubmissionPayload>>,
}

impl FakeBackend {
    pub(crate) fn new(section_count: usize) -> Self {
        Self {
            definitions: sample_definitions(section_count),
            fetch_status: None,
            latency: None,
            fetches: AtomicUsize::new(0),
            failures_left: Mutex::new(0),
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing_fetch(status: u16) -> Self {
        Self { fetch_status: Some(status), ..Self::new(0) }
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub(crate) fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    pub(crate) async fn fail_next_submissions(&self, count: usize) {
        *self.failures_left.lock().await = count;
    }

    pub(crate) async fn submissions(&self) -> Vec<SubmissionPayload> {
        self.submissions.lock().await.clone()
    }
}

#[async_trait]
impl ExamBackend for FakeBackend {
    async fn fetch_sections(&self, _contest_id: &str) -> Result<Vec<SectionDefinition>, BackendError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        match self.fetch_status {
            Some(status) => {
                Err(BackendError::Status { status, body: "definition unavailable".to_string() })
            }
            None => Ok(self.definitions.clone()),
        }
    }

    async fn submit(&self, payload: &SubmissionPayload) -> Result<(), BackendError> {
        self.submissions.lock().await.push(payload.clone());
        self.wait().await;

        let mut failures_left = self.failures_left.lock().await;
        if *failures_left > 0 {
            *failures_left -= 1;
            return Err(BackendError::Status { status: 503, body: "grading busy".to_string() });
        }
        Ok(())
    }
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}
