use serde::{Deserialize, Serialize};

use crate::session::model::ViolationKind;

/// One environment observation reported by the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum Signal {
    FullscreenChanged {
        fullscreen: bool,
    },
    VisibilityChanged {
        hidden: bool,
    },
    WindowBlur,
    WindowFocus,
    FocusPoll {
        has_focus: bool,
    },
    KeyDown {
        key: String,
        #[serde(default)]
        ctrl: bool,
        #[serde(default)]
        alt: bool,
        #[serde(default)]
        shift: bool,
        #[serde(default)]
        meta: bool,
    },
    BeforeUnload,
    Noise,
    FaceDetection {
        detected: bool,
    },
    UserInteraction,
}

/// Side effects the rendering layer must carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Directive {
    RequestFullscreen,
    RequireAcknowledgement,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct MonitorOutcome {
    pub(crate) violation: Option<ViolationKind>,
    pub(crate) directives: Vec<Directive>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct MonitorSettings {
    pub(crate) fullscreen_enforced: bool,
    pub(crate) debounce_ms: u64,
    pub(crate) visibility_grace_ms: u64,
}

/// Duplicate suppression is per physical cause: fullscreen loss and tab switches
/// frequently fire together, noise and face events never overlap with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebounceGroup {
    Focus,
    Noise,
    Face,
}

impl DebounceGroup {
    fn of(kind: ViolationKind) -> Self {
        match kind {
            ViolationKind::Fullscreen | ViolationKind::TabSwitch => Self::Focus,
            ViolationKind::Noise => Self::Noise,
            ViolationKind::FaceAbsent => Self::Face,
        }
    }

    fn slot(self) -> usize {
        match self {
            Self::Focus => 0,
            Self::Noise => 1,
            Self::Face => 2,
        }
    }
}

/// Turns raw signals into at most one typed violation each.
#[derive(Debug, Clone)]
pub(crate) struct IntegrityMonitor {
    settings: MonitorSettings,
    in_fullscreen: bool,
    has_focus: bool,
    hidden: bool,
    face_present: bool,
    last_visibility_change_ms: Option<u64>,
    last_emitted_ms: [Option<u64>; 3],
    ack_pending: bool,
    reacquire_pending: bool,
}

impl IntegrityMonitor {
    pub(crate) fn new(settings: MonitorSettings) -> Self {
        Self {
            settings,
            in_fullscreen: false,
            has_focus: true,
            hidden: false,
            face_present: true,
            last_visibility_change_ms: None,
            last_emitted_ms: [None; 3],
            ack_pending: false,
            reacquire_pending: false,
        }
    }

    pub(crate) fn ack_pending(&self) -> bool {
        self.ack_pending
    }

    pub(crate) fn reacquire_pending(&self) -> bool {
        self.reacquire_pending
    }

    pub(crate) fn in_fullscreen(&self) -> bool {
        self.in_fullscreen
    }

    /// Directives issued when a sitting begins or resumes.
    pub(crate) fn start(&mut self) -> Vec<Directive> {
        if !self.settings.fullscreen_enforced || self.in_fullscreen {
            return Vec::new();
        }
        self.reacquire_pending = true;
        vec![Directive::RequestFullscreen]
    }

    pub(crate) fn observe(&mut self, signal: &Signal, at_ms: u64) -> MonitorOutcome {
        let candidate = match signal {
            Signal::FullscreenChanged { fullscreen: true } => {
                self.in_fullscreen = true;
                self.reacquire_pending = false;
                None
            }
            Signal::FullscreenChanged { fullscreen: false } => {
                let was_fullscreen = std::mem::replace(&mut self.in_fullscreen, false);
                was_fullscreen.then_some(ViolationKind::Fullscreen)
            }
            Signal::VisibilityChanged { hidden } => self.visibility_changed(*hidden, at_ms),
            Signal::WindowBlur | Signal::FocusPoll { has_focus: false } => {
                let had_focus = std::mem::replace(&mut self.has_focus, false);
                had_focus.then_some(ViolationKind::TabSwitch)
            }
            Signal::WindowFocus | Signal::FocusPoll { has_focus: true } => {
                self.has_focus = true;
                None
            }
            Signal::KeyDown { key, ctrl, alt, shift, meta } => {
                if self.in_fullscreen {
                    let kind = classify_shortcut(key, *ctrl, *alt, *shift, *meta);
                    if kind == Some(ViolationKind::Fullscreen) {
                        self.in_fullscreen = false;
                    }
                    kind
                } else {
                    None
                }
            }
            Signal::BeforeUnload => Some(ViolationKind::TabSwitch),
            Signal::Noise => Some(ViolationKind::Noise),
            Signal::FaceDetection { detected: true } => {
                self.face_present = true;
                None
            }
            Signal::FaceDetection { detected: false } => {
                let was_present = std::mem::replace(&mut self.face_present, false);
                was_present.then_some(ViolationKind::FaceAbsent)
            }
            Signal::UserInteraction => {
                return MonitorOutcome { violation: None, directives: self.retry_reacquire() };
            }
        };

        let Some(kind) = candidate else {
            return MonitorOutcome::default();
        };
        if !self.settings.fullscreen_enforced && DebounceGroup::of(kind) == DebounceGroup::Focus {
            return MonitorOutcome::default();
        }
        if self.debounced(kind, at_ms) {
            tracing::debug!(kind = kind.as_str(), at_ms, "Coalesced duplicate integrity signal");
            return MonitorOutcome::default();
        }

        let mut directives = Vec::new();
        if DebounceGroup::of(kind) == DebounceGroup::Focus {
            self.ack_pending = true;
            self.reacquire_pending = true;
            directives.push(Directive::RequestFullscreen);
            directives.push(Directive::RequireAcknowledgement);
        }
        MonitorOutcome { violation: Some(kind), directives }
    }

    /// Clears the blocking warning. Returns `false` when nothing was pending.
    pub(crate) fn acknowledge(&mut self) -> (bool, Vec<Directive>) {
        let was_pending = std::mem::replace(&mut self.ack_pending, false);
        (was_pending, self.retry_reacquire())
    }

    /// Records the outcome of a best-effort fullscreen request.
    pub(crate) fn report_reacquire(&mut self, succeeded: bool) {
        if succeeded {
            self.in_fullscreen = true;
            self.reacquire_pending = false;
        } else if self.settings.fullscreen_enforced {
            self.reacquire_pending = true;
        }
    }

    fn retry_reacquire(&self) -> Vec<Directive> {
        if self.settings.fullscreen_enforced && self.reacquire_pending && !self.in_fullscreen {
            vec![Directive::RequestFullscreen]
        } else {
            Vec::new()
        }
    }

    fn visibility_changed(&mut self, hidden: bool, at_ms: u64) -> Option<ViolationKind> {
        let previous = self.last_visibility_change_ms.replace(at_ms);
        if !hidden {
            self.hidden = false;
            return None;
        }
        let was_hidden = std::mem::replace(&mut self.hidden, true);
        let within_grace = previous
            .is_some_and(|last| at_ms.saturating_sub(last) < self.settings.visibility_grace_ms);
        if was_hidden || within_grace {
            return None;
        }
        Some(ViolationKind::TabSwitch)
    }

    fn debounced(&mut self, kind: ViolationKind, at_ms: u64) -> bool {
        let slot = &mut self.last_emitted_ms[DebounceGroup::of(kind).slot()];
        if let Some(last) = *slot {
            if at_ms.saturating_sub(last) < self.settings.debounce_ms {
                return true;
            }
        }
        *slot = Some(at_ms);
        false
    }
}

/// Keyboard shortcuts that leave or try to leave the exam page.
fn classify_shortcut(key: &str, ctrl: bool, alt: bool, shift: bool, meta: bool) -> Option<ViolationKind> {
    let key_lower = key.to_ascii_lowercase();
    let key = key_lower.as_str();

    if key == "escape" || key == "esc" {
        return Some(ViolationKind::Fullscreen);
    }

    let leaves_page = key == "f5"
        || (ctrl && key == "r")
        || (alt && key == "tab")
        || ((ctrl || meta) && key == "w")
        || (alt && key == "f4")
        || (ctrl && alt && (key == "delete" || key == "del"))
        || key == "meta"
        || key == "os"
        || (ctrl && shift && key == "i");

    leaves_page.then_some(ViolationKind::TabSwitch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> IntegrityMonitor {
        let mut monitor = IntegrityMonitor::new(MonitorSettings {
            fullscreen_enforced: true,
            debounce_ms: 100,
            visibility_grace_ms: 500,
        });
        monitor.observe(&Signal::FullscreenChanged { fullscreen: true }, 0);
        monitor
    }

    fn key(key: &str, ctrl: bool, alt: bool, shift: bool, meta: bool) -> Signal {
        Signal::KeyDown { key: key.to_string(), ctrl, alt, shift, meta }
    }

    #[test]
    fn fullscreen_exit_raises_directives() {
        let mut monitor = monitor();
        let outcome = monitor.observe(&Signal::FullscreenChanged { fullscreen: false }, 1_000);
        assert_eq!(outcome.violation, Some(ViolationKind::Fullscreen));
        assert_eq!(
            outcome.directives,
            vec![Directive::RequestFullscreen, Directive::RequireAcknowledgement]
        );
        assert!(monitor.ack_pending());
        assert!(monitor.reacquire_pending());
    }

    #[test]
    fn blur_and_visibility_for_one_switch_coalesce() {
        let mut monitor = monitor();
        let blur = monitor.observe(&Signal::WindowBlur, 2_000);
        let hidden = monitor.observe(&Signal::VisibilityChanged { hidden: true }, 2_040);
        assert_eq!(blur.violation, Some(ViolationKind::TabSwitch));
        assert_eq!(hidden, MonitorOutcome::default());
    }

    #[test]
    fn separate_occurrences_each_count() {
        let mut monitor = monitor();
        assert!(monitor.observe(&Signal::WindowBlur, 1_000).violation.is_some());
        monitor.observe(&Signal::WindowFocus, 1_500);
        assert!(monitor.observe(&Signal::WindowBlur, 3_000).violation.is_some());
    }

    #[test]
    fn repeated_blur_without_focus_is_one_occurrence() {
        let mut monitor = monitor();
        assert!(monitor.observe(&Signal::WindowBlur, 1_000).violation.is_some());
        assert!(monitor.observe(&Signal::FocusPoll { has_focus: false }, 5_000).violation.is_none());
    }

    #[test]
    fn hidden_within_grace_is_ignored() {
        let mut monitor = monitor();
        monitor.observe(&Signal::VisibilityChanged { hidden: false }, 10_000);
        let outcome = monitor.observe(&Signal::VisibilityChanged { hidden: true }, 10_200);
        assert!(outcome.violation.is_none());

        monitor.observe(&Signal::VisibilityChanged { hidden: false }, 11_000);
        let outcome = monitor.observe(&Signal::VisibilityChanged { hidden: true }, 12_000);
        assert_eq!(outcome.violation, Some(ViolationKind::TabSwitch));
    }

    #[test]
    fn shortcuts_only_count_in_fullscreen() {
        let mut monitor = monitor();
        let outcome = monitor.observe(&key("r", true, false, false, false), 1_000);
        assert_eq!(outcome.violation, Some(ViolationKind::TabSwitch));

        let outcome = monitor.observe(&key("Escape", false, false, false, false), 2_000);
        assert_eq!(outcome.violation, Some(ViolationKind::Fullscreen));
        assert!(!monitor.in_fullscreen());

        let outcome = monitor.observe(&key("F5", false, false, false, false), 3_000);
        assert!(outcome.violation.is_none());
    }

    #[test]
    fn plain_typing_is_not_a_violation() {
        assert_eq!(classify_shortcut("a", false, false, false, false), None);
        assert_eq!(classify_shortcut("r", false, false, false, false), None);
        assert_eq!(classify_shortcut("w", false, false, true, true), Some(ViolationKind::TabSwitch));
        assert_eq!(classify_shortcut("I", true, false, true, false), Some(ViolationKind::TabSwitch));
        assert_eq!(classify_shortcut("Delete", true, true, false, false), Some(ViolationKind::TabSwitch));
    }

    #[test]
    fn noise_and_face_debounce_independently() {
        let mut monitor = monitor();
        assert!(monitor.observe(&Signal::Noise, 1_000).violation.is_some());
        assert!(monitor.observe(&Signal::Noise, 1_050).violation.is_none());
        let face = monitor.observe(&Signal::FaceDetection { detected: false }, 1_060);
        assert_eq!(face.violation, Some(ViolationKind::FaceAbsent));
        assert!(face.directives.is_empty());
        assert!(!monitor.ack_pending());
    }

    #[test]
    fn face_absence_counts_on_transition_only() {
        let mut monitor = monitor();
        assert!(monitor.observe(&Signal::FaceDetection { detected: false }, 1_000).violation.is_some());
        assert!(monitor.observe(&Signal::FaceDetection { detected: false }, 2_000).violation.is_none());
        monitor.observe(&Signal::FaceDetection { detected: true }, 3_000);
        assert!(monitor.observe(&Signal::FaceDetection { detected: false }, 4_000).violation.is_some());
    }

    #[test]
    fn unenforced_fullscreen_ignores_focus_signals() {
        let mut monitor = IntegrityMonitor::new(MonitorSettings {
            fullscreen_enforced: false,
            debounce_ms: 100,
            visibility_grace_ms: 500,
        });
        assert!(monitor.start().is_empty());
        assert!(monitor.observe(&Signal::WindowBlur, 1_000).violation.is_none());
        assert!(monitor.observe(&Signal::BeforeUnload, 2_000).violation.is_none());
        assert_eq!(monitor.observe(&Signal::Noise, 3_000).violation, Some(ViolationKind::Noise));
    }

    #[test]
    fn failed_reacquire_retries_on_interaction() {
        let mut monitor = monitor();
        monitor.observe(&Signal::FullscreenChanged { fullscreen: false }, 1_000);
        monitor.report_reacquire(false);

        let outcome = monitor.observe(&Signal::UserInteraction, 2_000);
        assert_eq!(outcome.directives, vec![Directive::RequestFullscreen]);

        monitor.report_reacquire(true);
        assert!(monitor.observe(&Signal::UserInteraction, 3_000).directives.is_empty());
    }

    #[test]
    fn acknowledge_clears_pending_warning() {
        let mut monitor = monitor();
        monitor.observe(&Signal::FullscreenChanged { fullscreen: false }, 1_000);
        let (was_pending, directives) = monitor.acknowledge();
        assert!(was_pending);
        assert_eq!(directives, vec![Directive::RequestFullscreen]);
        assert!(!monitor.ack_pending());
        assert!(!monitor.acknowledge().0);
    }

    #[test]
    fn signal_deserializes_from_tagged_json() {
        let signal: Signal =
            serde_json::from_str(r#"{"type":"key_down","key":"Tab","alt":true}"#).expect("signal");
        assert_eq!(signal, key("Tab", false, true, false, false));
    }
}
