use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::core::time::elapsed_seconds;
use crate::session::model::{
    AnswerRecord, Section, SessionConfig, SubmitReason, ViolationCounters, NOT_ATTENDED,
};

const IMMEDIATE_RELEASE: &str = "Immediate release";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum FinishReason {
    User,
    Expiry,
    Escalation,
    /// Every section was submitted on its own.
    Completed,
}

impl FinishReason {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Expiry => "expiry",
            Self::Escalation => "escalation",
            Self::Completed => "completed",
        }
    }

    /// Reason recorded on sections that were still open when the session finished.
    pub(crate) fn section_reason(self) -> SubmitReason {
        match self {
            Self::User | Self::Completed => SubmitReason::User,
            Self::Expiry => SubmitReason::Expiry,
            Self::Escalation => SubmitReason::Escalation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum Grade {
    Pass,
    Fail,
}

/// Terminal record of one sitting. Built once, never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmissionPayload {
    pub(crate) submission_id: Uuid,
    pub(crate) session_id: String,
    pub(crate) contest_id: String,
    pub(crate) student_id: String,
    /// Section name to question text to chosen option.
    pub(crate) answers: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(rename = "FullscreenWarning")]
    pub(crate) fullscreen_warning: u32,
    #[serde(rename = "TabSwitchWarning")]
    pub(crate) tab_switch_warning: u32,
    #[serde(rename = "NoiseWarning")]
    pub(crate) noise_warning: u32,
    #[serde(rename = "FaceWarning")]
    pub(crate) face_warning: u32,
    pub(crate) correct_answers: u32,
    pub(crate) total_questions: u32,
    pub(crate) percentage: f64,
    pub(crate) pass_percentage: f64,
    pub(crate) grade: Grade,
    pub(crate) is_publish: bool,
    pub(crate) result_visibility: String,
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) finish_time: OffsetDateTime,
    pub(crate) duration_in_seconds: u64,
    pub(crate) finish_reason: FinishReason,
}

pub(crate) struct PayloadInputs<'a> {
    pub(crate) config: &'a SessionConfig,
    pub(crate) sections: &'a [Section],
    pub(crate) answers: &'a AnswerRecord,
    pub(crate) counters: ViolationCounters,
    pub(crate) started_at: OffsetDateTime,
    pub(crate) finished_at: OffsetDateTime,
    pub(crate) reason: FinishReason,
}

pub(crate) fn assemble(inputs: PayloadInputs<'_>) -> SubmissionPayload {
    let PayloadInputs { config, sections, answers, counters, started_at, finished_at, reason } =
        inputs;

    let mut answer_map = BTreeMap::new();
    let mut correct_answers = 0u32;
    let mut total_questions = 0u32;

    for (section_index, section) in sections.iter().enumerate() {
        let section_answers = answer_map.entry(section.name.clone()).or_insert_with(BTreeMap::new);
        for (question_index, question) in section.questions.iter().enumerate() {
            total_questions += 1;
            let chosen = answers.get(section_index, question_index);
            if chosen == Some(question.correct_option.as_str()) {
                correct_answers += 1;
            }
            section_answers.insert(
                question.text.clone(),
                chosen.unwrap_or(NOT_ATTENDED).to_string(),
            );
        }
    }

    let percentage = percentage(correct_answers, total_questions);
    let grade = if percentage >= config.pass_percentage { Grade::Pass } else { Grade::Fail };

    SubmissionPayload {
        submission_id: Uuid::new_v4(),
        session_id: config.session_id.clone(),
        contest_id: config.contest_id.clone(),
        student_id: config.candidate_id.clone(),
        answers: answer_map,
        fullscreen_warning: counters.fullscreen_exit,
        tab_switch_warning: counters.tab_switch,
        noise_warning: counters.ambient_noise,
        face_warning: counters.face_absence,
        correct_answers,
        total_questions,
        percentage,
        pass_percentage: config.pass_percentage,
        grade,
        is_publish: config.result_visibility == IMMEDIATE_RELEASE,
        result_visibility: config.result_visibility.clone(),
        start_time: started_at,
        finish_time: finished_at,
        duration_in_seconds: elapsed_seconds(started_at, finished_at),
        finish_reason: reason,
    }
}

fn percentage(correct: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = f64::from(correct) / f64::from(total) * 100.0;
    (raw * 100.0).round() / 100.0
}
