use crate::session::model::SectionTimerState;

/// Remaining-time counter of one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SectionClock {
    remaining_seconds: u64,
}

impl SectionClock {
    pub(crate) fn new(remaining_seconds: u64) -> Self {
        Self { remaining_seconds }
    }

    pub(crate) fn remaining(&self) -> u64 {
        self.remaining_seconds
    }

    pub(crate) fn is_expired(&self) -> bool {
        self.remaining_seconds == 0
    }

    /// Decrements by one second. Returns `true` only on the transition to zero.
    pub(crate) fn tick(&mut self) -> bool {
        if self.remaining_seconds == 0 {
            return false;
        }
        self.remaining_seconds -= 1;
        self.remaining_seconds == 0
    }

    pub(crate) fn snapshot(&self, is_active: bool, is_submitted: bool) -> SectionTimerState {
        SectionTimerState {
            remaining_seconds: self.remaining_seconds,
            is_active,
            is_finished: self.is_expired(),
            is_submitted,
        }
    }
}

/// What one overall-mode tick crossed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PoolTick {
    pub(crate) section_expired: bool,
    pub(crate) pool_expired: bool,
}

/// Shared countdown of the whole sitting in overall mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SessionClock {
    remaining_seconds: u64,
}

impl SessionClock {
    pub(crate) fn new(remaining_seconds: u64) -> Self {
        Self { remaining_seconds }
    }

    pub(crate) fn remaining(&self) -> u64 {
        self.remaining_seconds
    }

    pub(crate) fn is_expired(&self) -> bool {
        self.remaining_seconds == 0
    }

    /// Debits the pool and the responsible section by one second each.
    pub(crate) fn tick(&mut self, responsible: Option<&mut SectionClock>) -> PoolTick {
        if self.remaining_seconds == 0 {
            return PoolTick::default();
        }
        self.remaining_seconds -= 1;
        let section_expired = responsible.map(SectionClock::tick).unwrap_or(false);
        PoolTick { section_expired, pool_expired: self.remaining_seconds == 0 }
    }
}
