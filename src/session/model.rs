use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::session::escalation::ViolationThresholds;
use crate::session::shuffle::presented_options;

pub(crate) const NOT_ATTENDED: &str = "notattended";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum TimingMode {
    #[default]
    #[serde(alias = "Section")]
    Section,
    #[serde(alias = "Overall")]
    Overall,
}

#[derive(Debug, Clone)]
pub(crate) struct Section {
    pub(crate) name: String,
    pub(crate) questions: Vec<Question>,
    pub(crate) nominal_seconds: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) options: Vec<String>,
    pub(crate) correct_option: String,
}

/// What the rendering layer is allowed to see of a question.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct QuestionView {
    pub(crate) id: String,
    pub(crate) section_index: usize,
    pub(crate) question_index: usize,
    pub(crate) text: String,
    pub(crate) options: Vec<String>,
    pub(crate) marked_for_review: bool,
}

impl Question {
    pub(crate) fn view(&self, section_index: usize, question_index: usize) -> QuestionView {
        QuestionView {
            id: self.id.clone(),
            section_index,
            question_index,
            text: self.text.clone(),
            options: presented_options(section_index, question_index, &self.options),
            marked_for_review: false,
        }
    }

    pub(crate) fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|candidate| candidate == option)
    }
}

/// Resolved, read-only configuration of one running session.
#[derive(Debug, Clone)]
pub(crate) struct SessionConfig {
    pub(crate) session_id: String,
    pub(crate) contest_id: String,
    pub(crate) candidate_id: String,
    pub(crate) mode: TimingMode,
    pub(crate) total_seconds: u64,
    pub(crate) pass_percentage: f64,
    pub(crate) thresholds: ViolationThresholds,
    pub(crate) fullscreen_enforced: bool,
    pub(crate) result_visibility: String,
    pub(crate) debounce_ms: u64,
    pub(crate) visibility_grace_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SectionTimerState {
    pub(crate) remaining_seconds: u64,
    pub(crate) is_active: bool,
    pub(crate) is_finished: bool,
    pub(crate) is_submitted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ViolationKind {
    Fullscreen,
    TabSwitch,
    Noise,
    FaceAbsent,
}

impl ViolationKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Fullscreen => "fullscreen",
            Self::TabSwitch => "tab_switch",
            Self::Noise => "noise",
            Self::FaceAbsent => "face_absent",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ViolationCounters {
    pub(crate) fullscreen_exit: u32,
    pub(crate) tab_switch: u32,
    pub(crate) ambient_noise: u32,
    pub(crate) face_absence: u32,
}

impl ViolationCounters {
    /// Increments the category and returns its new value.
    pub(crate) fn record(&mut self, kind: ViolationKind) -> u32 {
        let slot = match kind {
            ViolationKind::Fullscreen => &mut self.fullscreen_exit,
            ViolationKind::TabSwitch => &mut self.tab_switch,
            ViolationKind::Noise => &mut self.ambient_noise,
            ViolationKind::FaceAbsent => &mut self.face_absence,
        };
        *slot = slot.saturating_add(1);
        *slot
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum SubmitReason {
    User,
    Expiry,
    Escalation,
}

impl SubmitReason {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Expiry => "expiry",
            Self::Escalation => "escalation",
        }
    }
}

/// Chosen option per (section, question). Absence means "not attended".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct AnswerRecord {
    sections: Vec<BTreeMap<usize, String>>,
}

impl AnswerRecord {
    pub(crate) fn with_sections(count: usize) -> Self {
        Self { sections: vec![BTreeMap::new(); count] }
    }

    pub(crate) fn get(&self, section: usize, question: usize) -> Option<&str> {
        self.sections.get(section).and_then(|answers| answers.get(&question)).map(String::as_str)
    }

    pub(crate) fn set(&mut self, section: usize, question: usize, option: String) {
        self.ensure_len(section + 1);
        self.sections[section].insert(question, option);
    }

    /// Pads or truncates a restored record to the fetched section count.
    pub(crate) fn fit_to(&mut self, count: usize) {
        self.sections.truncate(count);
        self.ensure_len(count);
    }

    fn ensure_len(&mut self, count: usize) {
        if self.sections.len() < count {
            self.sections.resize_with(count, BTreeMap::new);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ReviewMarks {
    sections: Vec<BTreeMap<usize, bool>>,
}

impl ReviewMarks {
    pub(crate) fn with_sections(count: usize) -> Self {
        Self { sections: vec![BTreeMap::new(); count] }
    }

    pub(crate) fn is_marked(&self, section: usize, question: usize) -> bool {
        self.sections
            .get(section)
            .and_then(|marks| marks.get(&question))
            .copied()
            .unwrap_or(false)
    }

    /// Flips the mark and returns the new value.
    pub(crate) fn toggle(&mut self, section: usize, question: usize) -> bool {
        if self.sections.len() <= section {
            self.sections.resize_with(section + 1, BTreeMap::new);
        }
        let mark = self.sections[section].entry(question).or_insert(false);
        *mark = !*mark;
        *mark
    }

    pub(crate) fn fit_to(&mut self, count: usize) {
        self.sections.truncate(count);
        if self.sections.len() < count {
            self.sections.resize_with(count, BTreeMap::new);
        }
    }
}
