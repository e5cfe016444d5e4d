use serde::{Deserialize, Serialize};

use crate::session::model::ViolationCounters;

/// Per-category limits. A limit of zero disables that category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct ViolationThresholds {
    pub(crate) fullscreen: u32,
    pub(crate) tab_switch: u32,
    pub(crate) noise: u32,
    pub(crate) face_absence: u32,
}

impl Default for ViolationThresholds {
    fn default() -> Self {
        Self { fullscreen: 3, tab_switch: 1, noise: 2, face_absence: 3 }
    }
}

/// Fullscreen exits alone are enough; the other three categories must all breach together.
pub(crate) fn should_force_submit(
    counters: &ViolationCounters,
    thresholds: &ViolationThresholds,
) -> bool {
    let fullscreen =
        thresholds.fullscreen > 0 && counters.fullscreen_exit >= thresholds.fullscreen;

    let conjunctive = thresholds.tab_switch > 0
        && thresholds.noise > 0
        && thresholds.face_absence > 0
        && counters.tab_switch >= thresholds.tab_switch
        && counters.ambient_noise >= thresholds.noise
        && counters.face_absence >= thresholds.face_absence;

    fullscreen || conjunctive
}

#[derive(Debug, Clone)]
pub(crate) struct EscalationPolicy {
    thresholds: ViolationThresholds,
    forcing: bool,
}

impl EscalationPolicy {
    pub(crate) fn new(thresholds: ViolationThresholds) -> Self {
        Self { thresholds, forcing: false }
    }

    /// Returns `true` exactly once per session, on the first breaching evaluation.
    pub(crate) fn evaluate(&mut self, counters: &ViolationCounters) -> bool {
        if self.forcing || !should_force_submit(counters, &self.thresholds) {
            return false;
        }
        self.forcing = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(fullscreen: u32, tab: u32, noise: u32, face: u32) -> ViolationCounters {
        ViolationCounters {
            fullscreen_exit: fullscreen,
            tab_switch: tab,
            ambient_noise: noise,
            face_absence: face,
        }
    }

    #[test]
    fn fullscreen_alone_forces_submission() {
        let thresholds = ViolationThresholds::default();
        assert!(!should_force_submit(&counters(2, 0, 0, 0), &thresholds));
        assert!(should_force_submit(&counters(3, 0, 0, 0), &thresholds));
    }

    #[test]
    fn conjunctive_rule_needs_every_category() {
        let thresholds = ViolationThresholds::default();
        assert!(!should_force_submit(&counters(0, 1, 2, 0), &thresholds));
        assert!(!should_force_submit(&counters(0, 5, 5, 2), &thresholds));
        assert!(should_force_submit(&counters(0, 1, 2, 3), &thresholds));
    }

    #[test]
    fn zero_threshold_disables_category() {
        let thresholds =
            ViolationThresholds { fullscreen: 0, tab_switch: 1, noise: 0, face_absence: 1 };
        assert!(!should_force_submit(&counters(50, 9, 9, 9), &thresholds));
    }

    #[test]
    fn policy_latches_after_first_breach() {
        let mut policy = EscalationPolicy::new(ViolationThresholds::default());
        assert!(!policy.evaluate(&counters(1, 0, 0, 0)));
        assert!(policy.evaluate(&counters(3, 0, 0, 0)));
        assert!(!policy.evaluate(&counters(4, 0, 0, 0)));
    }

    #[test]
    fn thresholds_fill_missing_fields_with_defaults() {
        let parsed: ViolationThresholds =
            serde_json::from_str(r#"{"fullscreen": 5}"#).expect("thresholds");
        assert_eq!(parsed.fullscreen, 5);
        assert_eq!(parsed.tab_switch, 1);
        assert_eq!(parsed.face_absence, 3);
    }
}
