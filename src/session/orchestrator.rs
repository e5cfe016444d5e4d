use std::collections::VecDeque;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::core::{metrics, time::now_utc};
use crate::session::clock::{SectionClock, SessionClock};
use crate::session::error::SessionError;
use crate::session::escalation::EscalationPolicy;
use crate::session::integrity::{Directive, IntegrityMonitor, MonitorSettings, Signal};
use crate::session::lifecycle::{SectionLifecycle, SectionState};
use crate::session::model::{
    AnswerRecord, QuestionView, ReviewMarks, Section, SectionTimerState, SessionConfig,
    SubmitReason, TimingMode, ViolationCounters, ViolationKind,
};
use crate::session::payload::{assemble, FinishReason, PayloadInputs, SubmissionPayload};
use crate::session::store::{FinishMarker, PersistedSession, SessionStore};

const EVENT_CAPACITY: usize = 256;
const EXPIRY_NOTICE: &str = "Time is up for this section. Your answers have been submitted.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum MutationOutcome {
    Applied,
    SectionLocked,
    AwaitingAcknowledgement,
    SessionFrozen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum SectionSubmitOutcome {
    Submitted,
    AlreadySubmitted,
    ConfirmationRequired,
    SessionFrozen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum FinishOutcome {
    /// Payload was frozen just now and is due for delivery.
    Frozen,
    /// Payload was already frozen; delivery is due again.
    Retry,
    /// A post of the frozen payload is still outstanding.
    InFlight,
    AlreadySubmitted,
    ConfirmationRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum FinishStatus {
    Open,
    Frozen,
    Submitted,
}

/// Result of claiming the frozen payload for one delivery attempt.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DeliveryClaim {
    NotDue,
    InFlight,
    Ready(Box<SubmissionPayload>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TickOutcome {
    pub(crate) expired_sections: Vec<usize>,
    pub(crate) finished: Option<FinishReason>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub(crate) struct SignalOutcome {
    pub(crate) violation: Option<ViolationKind>,
    pub(crate) directives: Vec<Directive>,
    pub(crate) forced_submission: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum SessionEvent {
    Started { resumed: bool },
    Violation { kind: ViolationKind, count: u32 },
    Directive { directive: Directive },
    SectionSubmitted { section: usize, reason: SubmitReason, notice: Option<String> },
    Escalated,
    Frozen { reason: FinishReason, submission_id: Uuid },
    SubmissionFailed { detail: String },
    Submitted { submission_id: Uuid },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SectionSummary {
    pub(crate) name: String,
    pub(crate) question_count: usize,
    pub(crate) state: SectionState,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionSnapshot {
    pub(crate) session_id: String,
    pub(crate) contest_id: String,
    pub(crate) mode: TimingMode,
    pub(crate) sections: Vec<SectionSummary>,
    pub(crate) timers: Vec<SectionTimerState>,
    pub(crate) overall_remaining_seconds: Option<u64>,
    pub(crate) responsible_section: Option<usize>,
    pub(crate) viewing_section: usize,
    pub(crate) answers: AnswerRecord,
    pub(crate) review_marks: ReviewMarks,
    pub(crate) violations: ViolationCounters,
    pub(crate) acknowledgement_pending: bool,
    pub(crate) reacquire_pending: bool,
    pub(crate) in_fullscreen: bool,
    pub(crate) finish: FinishStatus,
    pub(crate) delivering: bool,
    pub(crate) submission_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
enum Finish {
    Open,
    Frozen(Box<SubmissionPayload>),
    Acknowledged,
}

/// Single writer for one candidate's sitting.
///
/// Every transition is written through the [`SessionStore`] before the call returns,
/// so a fresh orchestrator started against the same store resumes where this one stopped.
pub(crate) struct SessionOrchestrator {
    config: SessionConfig,
    sections: Vec<Section>,
    store: SessionStore,
    lifecycle: SectionLifecycle,
    section_clocks: Vec<SectionClock>,
    session_clock: Option<SessionClock>,
    monitor: IntegrityMonitor,
    escalation: EscalationPolicy,
    counters: ViolationCounters,
    answers: AnswerRecord,
    reviews: ReviewMarks,
    viewing: usize,
    started_at: OffsetDateTime,
    finish: Finish,
    submission_due: bool,
    delivering: bool,
    events: VecDeque<SessionEvent>,
}

impl SessionOrchestrator {
    /// Starts a new sitting or resumes the one recorded in `store`.
    pub(crate) async fn start(
        config: SessionConfig,
        sections: Vec<Section>,
        store: SessionStore,
    ) -> Result<Self, SessionError> {
        if sections.is_empty() {
            return Err(SessionError::EmptyDefinition);
        }

        let persisted = store.load().await?;
        let resumed = !persisted.is_empty();
        let payload_lost =
            persisted.finished == Some(FinishMarker::Frozen) && persisted.frozen_payload.is_none();
        let mut orchestrator = Self::restore(config, sections, store, persisted);

        orchestrator.persist_all().await?;
        if payload_lost {
            tracing::warn!(
                session_id = %orchestrator.config.session_id,
                "Finished marker present without a frozen payload; refreezing"
            );
            orchestrator.freeze(FinishReason::Completed).await?;
        } else if resumed {
            orchestrator.reconcile().await?;
        }

        if !orchestrator.is_halted() {
            for directive in orchestrator.monitor.start() {
                orchestrator.push_event(SessionEvent::Directive { directive });
            }
        }
        orchestrator.push_event(SessionEvent::Started { resumed });
        metrics::record_session_started(resumed);

        tracing::info!(
            session_id = %orchestrator.config.session_id,
            contest_id = %orchestrator.config.contest_id,
            mode = ?orchestrator.config.mode,
            sections = orchestrator.sections.len(),
            resumed,
            "Exam session started"
        );

        Ok(orchestrator)
    }

    fn restore(
        config: SessionConfig,
        sections: Vec<Section>,
        store: SessionStore,
        persisted: PersistedSession,
    ) -> Self {
        let count = sections.len();
        let seeded = seed_remaining(&config, &sections);

        let mut remaining = persisted.remaining_times.unwrap_or_else(|| seeded.clone());
        remaining.truncate(count);
        let restored = remaining.len();
        remaining.extend(seeded.iter().skip(restored).copied());
        let section_clocks = remaining.into_iter().map(SectionClock::new).collect();

        let session_clock = match config.mode {
            TimingMode::Overall => {
                Some(SessionClock::new(persisted.overall_remaining.unwrap_or(config.total_seconds)))
            }
            TimingMode::Section => None,
        };

        let lifecycle = match persisted.section_states {
            Some(states) => SectionLifecycle::restore(states, count),
            None => SectionLifecycle::new(count),
        };

        let mut answers = persisted.answers.unwrap_or_else(|| AnswerRecord::with_sections(count));
        answers.fit_to(count);
        let mut reviews = persisted.reviews.unwrap_or_else(|| ReviewMarks::with_sections(count));
        reviews.fit_to(count);

        let finish = match (persisted.finished, persisted.frozen_payload) {
            (Some(FinishMarker::Acknowledged), _) => Finish::Acknowledged,
            (Some(FinishMarker::Frozen), Some(payload)) => Finish::Frozen(Box::new(payload)),
            _ => Finish::Open,
        };

        let monitor = IntegrityMonitor::new(MonitorSettings {
            fullscreen_enforced: config.fullscreen_enforced,
            debounce_ms: config.debounce_ms,
            visibility_grace_ms: config.visibility_grace_ms,
        });
        let escalation = EscalationPolicy::new(config.thresholds);
        let viewing = lifecycle.responsible().unwrap_or(0);

        Self {
            config,
            sections,
            store,
            lifecycle,
            section_clocks,
            session_clock,
            monitor,
            escalation,
            counters: persisted.violations.unwrap_or_default(),
            answers,
            reviews,
            viewing,
            started_at: persisted.started_at.unwrap_or_else(now_utc),
            finish,
            submission_due: false,
            delivering: false,
            events: VecDeque::new(),
        }
    }

    /// Replays transitions a previous process may have missed.
    async fn reconcile(&mut self) -> Result<(), SessionError> {
        if self.is_halted() {
            return Ok(());
        }

        let expired: Vec<usize> = (0..self.sections.len())
            .filter(|index| self.lifecycle.is_mutable(*index) && self.section_clocks[*index].is_expired())
            .collect();
        for index in expired {
            self.transition_section(index, SubmitReason::Expiry).await?;
        }

        if self.is_halted() {
            return Ok(());
        }
        if self.session_clock.is_some_and(|clock| clock.is_expired()) {
            self.freeze(FinishReason::Expiry).await?;
        } else if self.escalation.evaluate(&self.counters) {
            self.push_event(SessionEvent::Escalated);
            self.freeze(FinishReason::Escalation).await?;
        }
        Ok(())
    }

    pub(crate) fn session_id(&self) -> &str {
        &self.config.session_id
    }

    /// The tick loop and event intake stop once this is true.
    pub(crate) fn is_halted(&self) -> bool {
        !matches!(self.finish, Finish::Open)
    }

    pub(crate) fn finish_status(&self) -> FinishStatus {
        match self.finish {
            Finish::Open => FinishStatus::Open,
            Finish::Frozen(_) => FinishStatus::Frozen,
            Finish::Acknowledged => FinishStatus::Submitted,
        }
    }

    pub(crate) fn frozen_payload(&self) -> Option<&SubmissionPayload> {
        match &self.finish {
            Finish::Frozen(payload) => Some(payload),
            _ => None,
        }
    }

    /// Whether a frozen payload is waiting to be delivered. Reading clears the flag.
    pub(crate) fn take_submission_due(&mut self) -> bool {
        std::mem::replace(&mut self.submission_due, false)
    }

    /// Hands out the frozen payload for posting. While a post is outstanding no second
    /// claim succeeds; [`Self::acknowledge_submission`] or [`Self::submission_failed`]
    /// releases it.
    pub(crate) fn begin_delivery(&mut self) -> DeliveryClaim {
        if self.delivering {
            return DeliveryClaim::InFlight;
        }
        if !self.take_submission_due() {
            return DeliveryClaim::NotDue;
        }
        match &self.finish {
            Finish::Frozen(payload) => {
                self.delivering = true;
                DeliveryClaim::Ready(payload.clone())
            }
            _ => DeliveryClaim::NotDue,
        }
    }

    pub(crate) fn overall_remaining(&self) -> Option<u64> {
        self.session_clock.map(|clock| clock.remaining())
    }

    /// One second of exam time.
    pub(crate) async fn tick(&mut self) -> Result<TickOutcome, SessionError> {
        let mut outcome = TickOutcome::default();
        if self.is_halted() {
            return Ok(outcome);
        }
        let Some(responsible) = self.lifecycle.responsible() else {
            self.freeze(FinishReason::Completed).await?;
            outcome.finished = Some(FinishReason::Completed);
            return Ok(outcome);
        };

        // A section that reached zero without a recorded crossing is submitted now.
        let already_expired = self.section_clocks[responsible].is_expired();
        let (crossed, pool_expired) = match self.session_clock.as_mut() {
            Some(pool) => {
                let crossed = pool.tick(self.section_clocks.get_mut(responsible));
                (crossed.section_expired, crossed.pool_expired)
            }
            None => (self.section_clocks[responsible].tick(), false),
        };
        let section_expired = crossed || already_expired;
        self.persist_clocks().await?;

        if section_expired {
            outcome.expired_sections.push(responsible);
            self.transition_section(responsible, SubmitReason::Expiry).await?;
        }
        if pool_expired && !self.is_halted() {
            self.freeze(FinishReason::Expiry).await?;
        }
        if let Finish::Frozen(payload) = &self.finish {
            outcome.finished = Some(payload.finish_reason);
        }
        Ok(outcome)
    }

    pub(crate) async fn select_answer(
        &mut self,
        section: usize,
        question: usize,
        option: &str,
    ) -> Result<MutationOutcome, SessionError> {
        self.ensure_question(section, question)?;
        if let Some(blocked) = self.mutation_gate(section) {
            return Ok(blocked);
        }
        if !self.sections[section].questions[question].has_option(option) {
            return Err(SessionError::InvalidOption { section, question });
        }

        self.answers.set(section, question, option.to_string());
        self.store.save_answers(&self.answers).await?;
        Ok(MutationOutcome::Applied)
    }

    /// Toggles the review mark of one question.
    pub(crate) async fn mark_for_review(
        &mut self,
        section: usize,
        question: usize,
    ) -> Result<MutationOutcome, SessionError> {
        self.ensure_question(section, question)?;
        if let Some(blocked) = self.mutation_gate(section) {
            return Ok(blocked);
        }

        self.reviews.toggle(section, question);
        self.store.save_reviews(&self.reviews).await?;
        Ok(MutationOutcome::Applied)
    }

    /// Moves the viewing cursor. Never affects which clock runs.
    pub(crate) fn view_section(&mut self, section: usize) -> Result<(), SessionError> {
        if section >= self.sections.len() {
            return Err(SessionError::UnknownSection(section));
        }
        self.viewing = section;
        Ok(())
    }

    pub(crate) fn question_view(
        &self,
        section: usize,
        question: usize,
    ) -> Result<QuestionView, SessionError> {
        self.ensure_question(section, question)?;
        let mut view = self.sections[section].questions[question].view(section, question);
        view.marked_for_review = self.reviews.is_marked(section, question);
        Ok(view)
    }

    pub(crate) async fn submit_section(
        &mut self,
        section: usize,
        confirmed: bool,
    ) -> Result<SectionSubmitOutcome, SessionError> {
        if section >= self.sections.len() {
            return Err(SessionError::UnknownSection(section));
        }
        if self.is_halted() {
            return Ok(SectionSubmitOutcome::SessionFrozen);
        }
        if self.lifecycle.is_submitted(section) {
            return Ok(SectionSubmitOutcome::AlreadySubmitted);
        }
        if !confirmed {
            return Ok(SectionSubmitOutcome::ConfirmationRequired);
        }

        self.transition_section(section, SubmitReason::User).await?;
        Ok(SectionSubmitOutcome::Submitted)
    }

    /// Finish requested by the candidate. Also the explicit retry path after a failed delivery.
    pub(crate) async fn finish_session(
        &mut self,
        confirmed: bool,
    ) -> Result<FinishOutcome, SessionError> {
        match self.finish {
            Finish::Acknowledged => return Ok(FinishOutcome::AlreadySubmitted),
            Finish::Frozen(_) if self.delivering => return Ok(FinishOutcome::InFlight),
            Finish::Frozen(_) => {
                self.submission_due = true;
                return Ok(FinishOutcome::Retry);
            }
            Finish::Open => {}
        }
        if self.lifecycle.active_count() > 0 && !confirmed {
            return Ok(FinishOutcome::ConfirmationRequired);
        }

        self.freeze(FinishReason::User).await?;
        Ok(FinishOutcome::Frozen)
    }

    pub(crate) async fn record_signal(
        &mut self,
        signal: &Signal,
        at_ms: u64,
    ) -> Result<SignalOutcome, SessionError> {
        if self.is_halted() {
            return Ok(SignalOutcome::default());
        }

        let observed = self.monitor.observe(signal, at_ms);
        for directive in &observed.directives {
            self.push_event(SessionEvent::Directive { directive: *directive });
        }
        let mut outcome = SignalOutcome {
            violation: observed.violation,
            directives: observed.directives,
            forced_submission: false,
        };
        let Some(kind) = observed.violation else {
            return Ok(outcome);
        };

        let count = self.counters.record(kind);
        self.store.save_violations(&self.counters).await?;
        metrics::record_violation(kind.as_str());
        tracing::warn!(
            session_id = %self.config.session_id,
            kind = kind.as_str(),
            count,
            "Integrity violation recorded"
        );
        self.push_event(SessionEvent::Violation { kind, count });

        if self.escalation.evaluate(&self.counters) {
            tracing::warn!(
                session_id = %self.config.session_id,
                fullscreen_exit = self.counters.fullscreen_exit,
                tab_switch = self.counters.tab_switch,
                ambient_noise = self.counters.ambient_noise,
                face_absence = self.counters.face_absence,
                "Violation thresholds breached; forcing submission"
            );
            self.push_event(SessionEvent::Escalated);
            self.freeze(FinishReason::Escalation).await?;
            outcome.forced_submission = true;
        }
        Ok(outcome)
    }

    /// Clears the blocking warning raised by a fullscreen or tab-switch violation.
    pub(crate) fn acknowledge_warning(&mut self) -> Vec<Directive> {
        let (was_pending, directives) = self.monitor.acknowledge();
        if was_pending {
            tracing::debug!(session_id = %self.config.session_id, "Integrity warning acknowledged");
        }
        directives
    }

    pub(crate) fn report_fullscreen(&mut self, succeeded: bool) {
        if !succeeded {
            tracing::warn!(
                session_id = %self.config.session_id,
                "Fullscreen re-acquire failed; retrying on next interaction"
            );
        }
        self.monitor.report_reacquire(succeeded);
    }

    /// Marks the frozen payload as accepted by the grading backend.
    pub(crate) async fn acknowledge_submission(&mut self) -> Result<(), SessionError> {
        self.delivering = false;
        let submission_id = match &self.finish {
            Finish::Frozen(payload) => payload.submission_id,
            _ => return Ok(()),
        };

        self.store.save_finish_marker(FinishMarker::Acknowledged).await?;
        self.finish = Finish::Acknowledged;
        self.submission_due = false;
        if let Err(err) = self.store.discard_state().await {
            tracing::warn!(
                session_id = %self.config.session_id,
                error = %err,
                "Failed to discard session state after submission"
            );
        }

        metrics::record_session_submission("accepted");
        tracing::info!(
            session_id = %self.config.session_id,
            submission_id = %submission_id,
            "Exam submission acknowledged"
        );
        self.push_event(SessionEvent::Submitted { submission_id });
        Ok(())
    }

    /// The session stays frozen; only an explicit finish call posts again.
    pub(crate) fn submission_failed(&mut self, detail: &str) {
        self.delivering = false;
        metrics::record_session_submission("failed");
        tracing::error!(
            session_id = %self.config.session_id,
            error = %detail,
            "Exam submission failed"
        );
        self.push_event(SessionEvent::SubmissionFailed { detail: detail.to_string() });
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        let responsible = self.lifecycle.responsible();
        let timers = self
            .section_clocks
            .iter()
            .enumerate()
            .map(|(index, clock)| {
                clock.snapshot(
                    !self.is_halted() && responsible == Some(index),
                    self.lifecycle.is_submitted(index),
                )
            })
            .collect();
        let sections = self
            .sections
            .iter()
            .zip(self.lifecycle.states())
            .map(|(section, state)| SectionSummary {
                name: section.name.clone(),
                question_count: section.questions.len(),
                state: *state,
            })
            .collect();

        SessionSnapshot {
            session_id: self.config.session_id.clone(),
            contest_id: self.config.contest_id.clone(),
            mode: self.config.mode,
            sections,
            timers,
            overall_remaining_seconds: self.overall_remaining(),
            responsible_section: responsible,
            viewing_section: self.viewing,
            answers: self.answers.clone(),
            review_marks: self.reviews.clone(),
            violations: self.counters,
            acknowledgement_pending: self.monitor.ack_pending(),
            reacquire_pending: self.monitor.reacquire_pending(),
            in_fullscreen: self.monitor.in_fullscreen(),
            finish: self.finish_status(),
            delivering: self.delivering,
            submission_id: self.frozen_payload().map(|payload| payload.submission_id),
        }
    }

    pub(crate) fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain(..).collect()
    }

    fn ensure_question(&self, section: usize, question: usize) -> Result<(), SessionError> {
        let Some(owner) = self.sections.get(section) else {
            return Err(SessionError::UnknownSection(section));
        };
        if question >= owner.questions.len() {
            return Err(SessionError::UnknownQuestion { section, question });
        }
        Ok(())
    }

    fn mutation_gate(&self, section: usize) -> Option<MutationOutcome> {
        if self.is_halted() {
            Some(MutationOutcome::SessionFrozen)
        } else if !self.lifecycle.is_mutable(section) {
            Some(MutationOutcome::SectionLocked)
        } else if self.monitor.ack_pending() {
            Some(MutationOutcome::AwaitingAcknowledgement)
        } else {
            None
        }
    }

    /// The only place a section leaves `Active`.
    async fn transition_section(
        &mut self,
        section: usize,
        reason: SubmitReason,
    ) -> Result<bool, SessionError> {
        if !self.lifecycle.submit(section, reason) {
            return Ok(false);
        }
        self.store.save_section_states(self.lifecycle.states()).await?;
        self.persist_clocks().await?;

        if self.viewing == section {
            self.viewing = self.lifecycle.responsible().unwrap_or(section);
        }

        metrics::record_section_submission(reason.as_str());
        tracing::info!(
            session_id = %self.config.session_id,
            section,
            reason = reason.as_str(),
            remaining_seconds = self.section_clocks[section].remaining(),
            "Section submitted"
        );
        let notice = (reason == SubmitReason::Expiry).then(|| EXPIRY_NOTICE.to_string());
        self.push_event(SessionEvent::SectionSubmitted { section, reason, notice });

        if self.lifecycle.all_submitted() {
            self.freeze(FinishReason::Completed).await?;
        }
        Ok(true)
    }

    /// Closes every open section, builds the payload once and records the finished marker.
    async fn freeze(&mut self, reason: FinishReason) -> Result<(), SessionError> {
        if self.is_halted() {
            return Ok(());
        }

        let closed = self.lifecycle.submit_remaining(reason.section_reason());
        if !closed.is_empty() {
            self.store.save_section_states(self.lifecycle.states()).await?;
            for section in closed {
                metrics::record_section_submission(reason.section_reason().as_str());
                self.push_event(SessionEvent::SectionSubmitted {
                    section,
                    reason: reason.section_reason(),
                    notice: None,
                });
            }
        }

        let payload = assemble(PayloadInputs {
            config: &self.config,
            sections: &self.sections,
            answers: &self.answers,
            counters: self.counters,
            started_at: self.started_at,
            finished_at: now_utc(),
            reason,
        });
        self.store.save_frozen_payload(&payload).await?;
        self.store.save_finish_marker(FinishMarker::Frozen).await?;

        tracing::info!(
            session_id = %self.config.session_id,
            submission_id = %payload.submission_id,
            reason = reason.as_str(),
            correct = payload.correct_answers,
            total = payload.total_questions,
            "Exam session frozen"
        );
        self.push_event(SessionEvent::Frozen { reason, submission_id: payload.submission_id });
        self.finish = Finish::Frozen(Box::new(payload));
        self.submission_due = true;
        Ok(())
    }

    async fn persist_clocks(&self) -> Result<(), SessionError> {
        let remaining: Vec<u64> = self.section_clocks.iter().map(SectionClock::remaining).collect();
        self.store.save_remaining_times(&remaining).await?;
        if let Some(pool) = self.session_clock {
            self.store.save_overall_remaining(pool.remaining()).await?;
        }
        Ok(())
    }

    async fn persist_all(&self) -> Result<(), SessionError> {
        if matches!(self.finish, Finish::Acknowledged) {
            return Ok(());
        }
        self.persist_clocks().await?;
        self.store.save_section_states(self.lifecycle.states()).await?;
        self.store.save_violations(&self.counters).await?;
        self.store.save_started_at(self.started_at).await?;
        self.store.save_answers(&self.answers).await?;
        self.store.save_reviews(&self.reviews).await?;
        Ok(())
    }

    fn push_event(&mut self, event: SessionEvent) {
        if self.events.len() == EVENT_CAPACITY {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Initial remaining time per section for a fresh sitting.
fn seed_remaining(config: &SessionConfig, sections: &[Section]) -> Vec<u64> {
    match config.mode {
        TimingMode::Section => sections.iter().map(|section| section.nominal_seconds).collect(),
        TimingMode::Overall => {
            let share = config.total_seconds / sections.len().max(1) as u64;
            vec![share; sections.len()]
        }
    }
}
