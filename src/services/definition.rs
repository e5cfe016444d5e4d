use serde::Deserialize;

use crate::core::config::SessionSettings;
use crate::schemas::definition::{ExamConfig, SectionDefinition};
use crate::session::error::SessionError;
use crate::session::model::{Question, Section, SessionConfig};
use crate::services::work_timing::TimingPlan;

const MIN_OPTIONS: usize = 2;
const MAX_OPTIONS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum DeviceClass {
    #[default]
    Desktop,
    Mobile,
    Tablet,
}

impl DeviceClass {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
        }
    }
}

pub(crate) fn session_id(contest_id: &str, student_id: &str) -> String {
    format!("{contest_id}:{student_id}")
}

/// Refuses handheld devices when the exam is restricted to desktops.
pub(crate) fn check_device(exam: &ExamConfig, device: DeviceClass) -> Result<(), SessionError> {
    if exam.device_restriction && device != DeviceClass::Desktop {
        return Err(SessionError::DeviceRestricted(device.as_str().to_string()));
    }
    Ok(())
}

pub(crate) fn build_sections(
    definitions: Vec<SectionDefinition>,
    plan: &TimingPlan,
) -> Result<Vec<Section>, SessionError> {
    if definitions.is_empty() {
        return Err(SessionError::EmptyDefinition);
    }

    definitions
        .into_iter()
        .enumerate()
        .map(|(section_index, definition)| {
            let questions = definition
                .questions
                .into_iter()
                .enumerate()
                .map(|(question_index, question)| {
                    if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&question.options.len()) {
                        return Err(SessionError::MalformedQuestion {
                            section: section_index,
                            question: question_index,
                        });
                    }
                    Ok(Question {
                        id: question
                            .id
                            .unwrap_or_else(|| format!("s{section_index}-q{question_index}")),
                        text: question.text,
                        options: question.options,
                        correct_option: question.correct_answer,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Section {
                name: definition.section_name,
                questions,
                nominal_seconds: plan.section_seconds.get(section_index).copied().unwrap_or(0),
            })
        })
        .collect()
}

pub(crate) fn resolve_config(
    contest_id: &str,
    student_id: &str,
    exam: &ExamConfig,
    plan: &TimingPlan,
    settings: &SessionSettings,
) -> SessionConfig {
    SessionConfig {
        session_id: session_id(contest_id, student_id),
        contest_id: contest_id.to_string(),
        candidate_id: student_id.to_string(),
        mode: plan.mode,
        total_seconds: plan.total_seconds,
        pass_percentage: exam.pass_percentage,
        thresholds: exam.thresholds(),
        fullscreen_enforced: exam.full_screen_mode,
        result_visibility: exam.result_visibility.clone(),
        debounce_ms: settings.violation_debounce_ms,
        visibility_grace_ms: settings.visibility_grace_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::definition::QuestionDefinition;
    use crate::services::work_timing;
    use crate::session::model::TimingMode;

    fn question(options: &[&str]) -> QuestionDefinition {
        QuestionDefinition {
            id: None,
            text: "Pick one".to_string(),
            options: options.iter().map(|option| option.to_string()).collect(),
            correct_answer: options.first().map(|option| option.to_string()).unwrap_or_default(),
        }
    }

    fn definition(questions: Vec<QuestionDefinition>) -> SectionDefinition {
        SectionDefinition { section_name: "Logic".to_string(), questions, duration: None }
    }

    #[test]
    fn builds_sections_with_planned_durations() {
        let definitions = vec![definition(vec![question(&["a", "b", "c"])])];
        let plan = work_timing::plan(&ExamConfig::default(), &definitions);
        let sections = build_sections(definitions, &plan).expect("sections");

        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].nominal_seconds, 300);
        assert_eq!(sections[0].questions[0].id, "s0-q0");
        assert_eq!(sections[0].questions[0].correct_option, "a");
    }

    #[test]
    fn empty_definition_is_fatal() {
        let plan = TimingPlan { mode: TimingMode::Section, total_seconds: 0, section_seconds: vec![] };
        assert!(matches!(build_sections(Vec::new(), &plan), Err(SessionError::EmptyDefinition)));
    }

    #[test]
    fn option_count_is_bounded() {
        let definitions = vec![definition(vec![question(&["a", "b"]), question(&["only"])])];
        let plan = work_timing::plan(&ExamConfig::default(), &definitions);
        let result = build_sections(definitions, &plan);
        assert!(matches!(result, Err(SessionError::MalformedQuestion { section: 0, question: 1 })));
    }

    #[test]
    fn device_restriction_refuses_handhelds() {
        let exam = ExamConfig { device_restriction: true, ..ExamConfig::default() };
        assert!(check_device(&exam, DeviceClass::Desktop).is_ok());
        assert!(matches!(
            check_device(&exam, DeviceClass::Tablet),
            Err(SessionError::DeviceRestricted(device)) if device == "tablet"
        ));
        assert!(check_device(&ExamConfig::default(), DeviceClass::Mobile).is_ok());
    }

    #[test]
    fn resolved_config_carries_exam_settings() {
        let exam = ExamConfig {
            full_screen_mode: true,
            pass_percentage: 70.0,
            result_visibility: "Immediate release".to_string(),
            ..ExamConfig::default()
        };
        let plan = TimingPlan { mode: TimingMode::Section, total_seconds: 120, section_seconds: vec![120] };
        let settings = SessionSettings {
            tick_interval_ms: 1000,
            violation_debounce_ms: 100,
            visibility_grace_ms: 500,
        };
        let config = resolve_config("c-1", "s-1", &exam, &plan, &settings);

        assert_eq!(config.session_id, "c-1:s-1");
        assert!(config.fullscreen_enforced);
        assert_eq!(config.pass_percentage, 70.0);
        assert_eq!(config.total_seconds, 120);
        assert_eq!(config.debounce_ms, 100);
    }
}
