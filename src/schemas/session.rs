use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::schemas::definition::ExamConfig;
use crate::services::definition::DeviceClass;
use crate::session::integrity::{Directive, Signal};
use crate::session::orchestrator::{
    FinishOutcome, FinishStatus, MutationOutcome, SectionSubmitOutcome, SessionEvent,
};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct StartSessionRequest {
    #[serde(alias = "contestId")]
    #[validate(length(min = 1, message = "contest_id must not be empty"))]
    pub(crate) contest_id: String,
    #[serde(alias = "studentId")]
    #[validate(length(min = 1, message = "student_id must not be empty"))]
    pub(crate) student_id: String,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) exam: ExamConfig,
    #[serde(default)]
    #[serde(alias = "deviceClass")]
    pub(crate) device_class: DeviceClass,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnswerRequest {
    pub(crate) section: usize,
    pub(crate) question: usize,
    pub(crate) option: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuestionRef {
    pub(crate) section: usize,
    pub(crate) question: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ViewRequest {
    pub(crate) section: usize,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ConfirmRequest {
    #[serde(default)]
    pub(crate) confirmed: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignalRequest {
    pub(crate) signal: Signal,
    /// Client monotonic timestamp used for debouncing.
    #[serde(alias = "atMs")]
    pub(crate) at_ms: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FullscreenReport {
    pub(crate) succeeded: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct MutationResponse {
    pub(crate) outcome: MutationOutcome,
}

#[derive(Debug, Serialize)]
pub(crate) struct SectionSubmitResponse {
    pub(crate) outcome: SectionSubmitOutcome,
    pub(crate) finish: FinishStatus,
}

#[derive(Debug, Serialize)]
pub(crate) struct DirectivesResponse {
    pub(crate) directives: Vec<Directive>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FinishResponse {
    pub(crate) outcome: FinishOutcome,
    pub(crate) status: FinishStatus,
    pub(crate) submission_id: Option<Uuid>,
    pub(crate) delivery_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EventsResponse {
    pub(crate) events: Vec<SessionEvent>,
}
