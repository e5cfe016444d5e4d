use serde::{Deserialize, Serialize};

use crate::session::model::SubmitReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub(crate) enum SectionState {
    Active,
    Submitted { reason: SubmitReason },
}

impl SectionState {
    pub(crate) fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Per-section `Active -> Submitted` machine. There is no way back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SectionLifecycle {
    states: Vec<SectionState>,
}

impl SectionLifecycle {
    pub(crate) fn new(count: usize) -> Self {
        Self { states: vec![SectionState::Active; count] }
    }

    /// Rebuilds from persisted states, padding unknown sections as active.
    pub(crate) fn restore(mut states: Vec<SectionState>, count: usize) -> Self {
        states.truncate(count);
        states.resize(count, SectionState::Active);
        Self { states }
    }

    pub(crate) fn states(&self) -> &[SectionState] {
        &self.states
    }

    pub(crate) fn state(&self, section: usize) -> Option<SectionState> {
        self.states.get(section).copied()
    }

    pub(crate) fn is_mutable(&self, section: usize) -> bool {
        self.state(section).is_some_and(SectionState::is_active)
    }

    pub(crate) fn is_submitted(&self, section: usize) -> bool {
        matches!(self.state(section), Some(SectionState::Submitted { .. }))
    }

    /// First section, in original order, that has not been submitted.
    pub(crate) fn responsible(&self) -> Option<usize> {
        self.states.iter().position(|state| state.is_active())
    }

    pub(crate) fn active_count(&self) -> usize {
        self.states.iter().filter(|state| state.is_active()).count()
    }

    pub(crate) fn all_submitted(&self) -> bool {
        self.active_count() == 0
    }

    /// Returns `false` when the section was already submitted or does not exist.
    pub(crate) fn submit(&mut self, section: usize, reason: SubmitReason) -> bool {
        match self.states.get_mut(section) {
            Some(state @ SectionState::Active) => {
                *state = SectionState::Submitted { reason };
                true
            }
            _ => false,
        }
    }

    /// Submits every still-active section with the same reason, returning their indices.
    pub(crate) fn submit_remaining(&mut self, reason: SubmitReason) -> Vec<usize> {
        let mut submitted = Vec::new();
        for (index, state) in self.states.iter_mut().enumerate() {
            if state.is_active() {
                *state = SectionState::Submitted { reason };
                submitted.push(index);
            }
        }
        submitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_is_one_way() {
        let mut lifecycle = SectionLifecycle::new(2);
        assert!(lifecycle.submit(0, SubmitReason::User));
        assert!(!lifecycle.submit(0, SubmitReason::Expiry));
        assert_eq!(lifecycle.state(0), Some(SectionState::Submitted { reason: SubmitReason::User }));
        assert!(!lifecycle.is_mutable(0));
        assert!(lifecycle.is_mutable(1));
    }

    #[test]
    fn responsible_is_first_active_section() {
        let mut lifecycle = SectionLifecycle::new(3);
        assert_eq!(lifecycle.responsible(), Some(0));
        lifecycle.submit(1, SubmitReason::User);
        assert_eq!(lifecycle.responsible(), Some(0));
        lifecycle.submit(0, SubmitReason::Expiry);
        assert_eq!(lifecycle.responsible(), Some(2));
        lifecycle.submit(2, SubmitReason::User);
        assert_eq!(lifecycle.responsible(), None);
        assert!(lifecycle.all_submitted());
    }

    #[test]
    fn restore_pads_to_section_count() {
        let restored =
            SectionLifecycle::restore(vec![SectionState::Submitted { reason: SubmitReason::User }], 3);
        assert_eq!(restored.states().len(), 3);
        assert!(restored.is_submitted(0));
        assert_eq!(restored.responsible(), Some(1));
    }

    #[test]
    fn unknown_section_is_not_mutable() {
        let mut lifecycle = SectionLifecycle::new(1);
        assert!(!lifecycle.is_mutable(4));
        assert!(!lifecycle.submit(4, SubmitReason::User));
    }

    #[test]
    fn state_serializes_with_tag() {
        let raw = serde_json::to_string(&SectionState::Submitted { reason: SubmitReason::Escalation })
            .expect("serialize");
        assert_eq!(raw, r#"{"state":"submitted","reason":"escalation"}"#);
    }
}
