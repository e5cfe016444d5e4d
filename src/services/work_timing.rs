use crate::schemas::definition::{DurationSpec, ExamConfig, SectionDefinition};
use crate::session::model::TimingMode;

pub(crate) const DEFAULT_SECTION_SECONDS: u64 = 300;
pub(crate) const DEFAULT_OVERALL_SECONDS: u64 = 1800;
/// Longest duration accepted for a section or the overall pool: one week.
pub(crate) const MAX_DURATION_SECONDS: u64 = 7 * 24 * 3600;

/// Resolved durations for one sitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TimingPlan {
    pub(crate) mode: TimingMode,
    pub(crate) total_seconds: u64,
    pub(crate) section_seconds: Vec<u64>,
}

pub(crate) fn plan(exam: &ExamConfig, sections: &[SectionDefinition]) -> TimingPlan {
    match exam.timing_type {
        TimingMode::Section => {
            let section_seconds: Vec<u64> =
                sections.iter().map(|section| section_seconds(section.duration.as_ref())).collect();
            TimingPlan {
                mode: TimingMode::Section,
                total_seconds: section_seconds
                    .iter()
                    .fold(0, |total, seconds| total.saturating_add(*seconds)),
                section_seconds,
            }
        }
        TimingMode::Overall => {
            let total_seconds =
                overall_seconds(exam.total_duration_seconds, exam.duration.as_deref());
            let share = total_seconds / sections.len().max(1) as u64;
            TimingPlan {
                mode: TimingMode::Overall,
                total_seconds,
                section_seconds: vec![share; sections.len()],
            }
        }
    }
}

/// Section duration in seconds; zero, missing or out-of-range values fall back to five minutes.
pub(crate) fn section_seconds(duration: Option<&DurationSpec>) -> u64 {
    let seconds = match duration {
        None => None,
        Some(DurationSpec::Seconds(value)) if value.is_finite() && *value > 0.0 => {
            Some(value.floor() as u64)
        }
        Some(DurationSpec::Seconds(_)) => None,
        Some(DurationSpec::Text(raw)) => hours_and_minutes(
            number_before_unit(raw, "h").unwrap_or(0),
            number_before_unit(raw, "m").unwrap_or(0),
        ),
        Some(DurationSpec::Parts { hours, minutes }) => hours_and_minutes(
            hours.as_ref().map(|value| value.value()).unwrap_or(0),
            minutes.as_ref().map(|value| value.value()).unwrap_or(0),
        ),
    };
    within_range(seconds).unwrap_or(DEFAULT_SECTION_SECONDS)
}

/// Overall pool in seconds from an explicit value or a `"X hours Y minutes"` string.
pub(crate) fn overall_seconds(explicit: Option<u64>, duration: Option<&str>) -> u64 {
    if let Some(seconds) = within_range(explicit) {
        return seconds;
    }
    let raw = duration.unwrap_or_default();
    let parsed = hours_and_minutes(
        number_before_unit(raw, "hours").unwrap_or(0),
        number_before_unit(raw, "minutes").unwrap_or(0),
    );
    within_range(parsed).unwrap_or(DEFAULT_OVERALL_SECONDS)
}

fn hours_and_minutes(hours: u64, minutes: u64) -> Option<u64> {
    hours.checked_mul(3600)?.checked_add(minutes.checked_mul(60)?)
}

fn within_range(seconds: Option<u64>) -> Option<u64> {
    seconds.filter(|seconds| (1..=MAX_DURATION_SECONDS).contains(seconds))
}

/// First run of digits followed, after optional whitespace, by `unit` (case-insensitive).
fn number_before_unit(raw: &str, unit: &str) -> Option<u64> {
    let lower = raw.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut index = 0;
    while index < bytes.len() {
        if !bytes[index].is_ascii_digit() {
            index += 1;
            continue;
        }
        let start = index;
        while index < bytes.len() && bytes[index].is_ascii_digit() {
            index += 1;
        }
        let digits = &lower[start..index];
        let rest = lower[index..].trim_start();
        if rest.starts_with(unit) {
            return digits.parse().ok();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::definition::LooseNumber;

    fn definition(duration: Option<DurationSpec>) -> SectionDefinition {
        SectionDefinition { section_name: "S".to_string(), questions: Vec::new(), duration }
    }

    #[test]
    fn section_durations_accept_every_shape() {
        let parts = DurationSpec::Parts {
            hours: Some(LooseNumber::Text("1".to_string())),
            minutes: Some(LooseNumber::Number(15.0)),
        };
        assert_eq!(section_seconds(Some(&parts)), 4500);
        assert_eq!(section_seconds(Some(&DurationSpec::Text("1h 30m".to_string()))), 5400);
        assert_eq!(section_seconds(Some(&DurationSpec::Text("45 M".to_string()))), 2700);
        assert_eq!(section_seconds(Some(&DurationSpec::Seconds(90.0))), 90);
    }

    #[test]
    fn zero_or_missing_section_duration_defaults() {
        assert_eq!(section_seconds(None), DEFAULT_SECTION_SECONDS);
        assert_eq!(section_seconds(Some(&DurationSpec::Seconds(0.0))), DEFAULT_SECTION_SECONDS);
        assert_eq!(
            section_seconds(Some(&DurationSpec::Text("soon".to_string()))),
            DEFAULT_SECTION_SECONDS
        );
    }

    #[test]
    fn overall_duration_parses_words() {
        assert_eq!(overall_seconds(None, Some("1 hours 30 minutes")), 5400);
        assert_eq!(overall_seconds(None, Some("0 hours 0 minutes")), DEFAULT_OVERALL_SECONDS);
        assert_eq!(overall_seconds(None, None), DEFAULT_OVERALL_SECONDS);
        assert_eq!(overall_seconds(Some(900), Some("2 hours")), 900);
    }

    #[test]
    fn oversized_durations_fall_back_to_defaults() {
        assert_eq!(overall_seconds(None, Some("6000000000000000 hours")), DEFAULT_OVERALL_SECONDS);
        assert_eq!(
            overall_seconds(None, Some("1 hours 99999999999999999999 minutes")),
            DEFAULT_OVERALL_SECONDS
        );
        assert_eq!(overall_seconds(Some(u64::MAX), Some("2 hours")), 7200);

        let text = DurationSpec::Text("6000000000000000h".to_string());
        assert_eq!(section_seconds(Some(&text)), DEFAULT_SECTION_SECONDS);
        let parts = DurationSpec::Parts {
            hours: Some(LooseNumber::Number(6.0e15)),
            minutes: Some(LooseNumber::Number(30.0)),
        };
        assert_eq!(section_seconds(Some(&parts)), DEFAULT_SECTION_SECONDS);
        assert_eq!(section_seconds(Some(&DurationSpec::Seconds(1.0e30))), DEFAULT_SECTION_SECONDS);
    }

    #[test]
    fn week_long_duration_is_accepted() {
        assert_eq!(overall_seconds(None, Some("168 hours")), MAX_DURATION_SECONDS);
        assert_eq!(overall_seconds(None, Some("168 hours 1 minutes")), DEFAULT_OVERALL_SECONDS);
    }

    #[test]
    fn overall_plan_splits_evenly() {
        let exam = ExamConfig {
            timing_type: TimingMode::Overall,
            duration: Some("0 hours 30 minutes".to_string()),
            ..ExamConfig::default()
        };
        let sections = vec![definition(None), definition(None), definition(None)];
        let plan = plan(&exam, &sections);
        assert_eq!(plan.total_seconds, 1800);
        assert_eq!(plan.section_seconds, vec![600, 600, 600]);
    }

    #[test]
    fn overall_split_floors() {
        let exam = ExamConfig {
            timing_type: TimingMode::Overall,
            total_duration_seconds: Some(1000),
            ..ExamConfig::default()
        };
        let sections = vec![definition(None), definition(None), definition(None)];
        assert_eq!(plan(&exam, &sections).section_seconds, vec![333, 333, 333]);
    }

    #[test]
    fn section_plan_total_is_sum() {
        let sections = vec![definition(Some(DurationSpec::Seconds(60.0))), definition(None)];
        let plan = plan(&ExamConfig::default(), &sections);
        assert_eq!(plan.section_seconds, vec![60, 300]);
        assert_eq!(plan.total_seconds, 360);
    }
}
