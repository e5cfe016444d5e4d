use serde::Deserialize;
use validator::Validate;

use crate::session::escalation::ViolationThresholds;
use crate::session::model::TimingMode;

/// One section as returned by the exam definition endpoint.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SectionDefinition {
    #[serde(alias = "sectionName")]
    pub(crate) section_name: String,
    #[serde(default)]
    pub(crate) questions: Vec<QuestionDefinition>,
    #[serde(default)]
    pub(crate) duration: Option<DurationSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct QuestionDefinition {
    #[serde(default)]
    #[serde(alias = "_id", alias = "questionId")]
    pub(crate) id: Option<String>,
    #[serde(alias = "question")]
    pub(crate) text: String,
    #[serde(default)]
    pub(crate) options: Vec<String>,
    #[serde(alias = "correctAnswer")]
    pub(crate) correct_answer: String,
}

/// Loose integer: the definition service sends both `"1"` and `1`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum LooseNumber {
    Number(f64),
    Text(String),
}

impl LooseNumber {
    /// Leading-digit parse. Anything unreadable or negative yields zero.
    pub(crate) fn value(&self) -> u64 {
        match self {
            Self::Number(number) if number.is_finite() && *number > 0.0 => number.floor() as u64,
            Self::Number(_) => 0,
            Self::Text(raw) => {
                let digits: String =
                    raw.trim().chars().take_while(|ch| ch.is_ascii_digit()).collect();
                digits.parse().unwrap_or(0)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum DurationSpec {
    Seconds(f64),
    Text(String),
    Parts {
        #[serde(default)]
        hours: Option<LooseNumber>,
        #[serde(default)]
        minutes: Option<LooseNumber>,
    },
}

/// Exam-level settings supplied by the rendering layer when a sitting starts.
#[derive(Debug, Clone, Deserialize, Validate)]
pub(crate) struct ExamConfig {
    #[serde(default)]
    #[serde(alias = "timingType")]
    pub(crate) timing_type: TimingMode,
    /// Overall duration such as `"1 hours 30 minutes"`.
    #[serde(default)]
    pub(crate) duration: Option<String>,
    #[serde(default)]
    #[serde(alias = "totalDurationSeconds")]
    pub(crate) total_duration_seconds: Option<u64>,
    #[serde(default = "default_pass_percentage")]
    #[serde(alias = "passPercentage")]
    #[validate(range(min = 0.0, max = 100.0, message = "pass_percentage must be within 0..=100"))]
    pub(crate) pass_percentage: f64,
    #[serde(default)]
    #[serde(alias = "fullScreenMode")]
    pub(crate) full_screen_mode: bool,
    #[serde(default)]
    #[serde(alias = "fullScreenModeCount")]
    pub(crate) full_screen_mode_count: Option<LooseNumber>,
    #[serde(default)]
    pub(crate) thresholds: Option<ViolationThresholds>,
    #[serde(default)]
    #[serde(alias = "deviceRestriction")]
    pub(crate) device_restriction: bool,
    #[serde(default)]
    #[serde(alias = "resultVisibility")]
    pub(crate) result_visibility: String,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            timing_type: TimingMode::Section,
            duration: None,
            total_duration_seconds: None,
            pass_percentage: default_pass_percentage(),
            full_screen_mode: false,
            full_screen_mode_count: None,
            thresholds: None,
            device_restriction: false,
            result_visibility: String::new(),
        }
    }
}

impl ExamConfig {
    /// `fullScreenModeCount` overrides the fullscreen limit of any explicit thresholds.
    pub(crate) fn thresholds(&self) -> ViolationThresholds {
        let mut thresholds = self.thresholds.unwrap_or_default();
        if let Some(count) = &self.full_screen_mode_count {
            thresholds.fullscreen = u32::try_from(count.value()).unwrap_or(u32::MAX);
        }
        thresholds
    }
}

fn default_pass_percentage() -> f64 {
    50.0
}
