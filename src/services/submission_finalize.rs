use thiserror::Error;
use uuid::Uuid;

use crate::core::state::SharedSession;
use crate::services::exam_backend::{BackendError, ExamBackend};
use crate::session::error::SessionError;
use crate::session::orchestrator::DeliveryClaim;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FinalizeMode {
    UserRequest,
    Automatic,
}

impl FinalizeMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::UserRequest => "user_request",
            Self::Automatic => "automatic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FinalizeOutcome {
    Submitted { submission_id: Uuid },
    NotDue,
    InFlight,
}

#[derive(Debug, Error)]
pub(crate) enum FinalizeError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Posts the frozen payload if a transition made it due, and records the backend's answer.
///
/// The session lock is released while the post is outstanding. The payload is never
/// rebuilt here: a retry sends the exact bytes frozen at finish time, under the same
/// idempotency key.
pub(crate) async fn deliver(
    session: &SharedSession,
    backend: &dyn ExamBackend,
    mode: FinalizeMode,
) -> Result<FinalizeOutcome, FinalizeError> {
    let claim = session.lock().await.begin_delivery();
    let payload = match claim {
        DeliveryClaim::Ready(payload) => payload,
        DeliveryClaim::NotDue => return Ok(FinalizeOutcome::NotDue),
        DeliveryClaim::InFlight => return Ok(FinalizeOutcome::InFlight),
    };

    tracing::info!(
        session_id = %payload.session_id,
        submission_id = %payload.submission_id,
        mode = mode.as_str(),
        "Delivering exam submission"
    );

    let result = backend.submit(&payload).await;
    let mut orchestrator = session.lock().await;
    match result {
        Ok(()) => {
            orchestrator.acknowledge_submission().await?;
            Ok(FinalizeOutcome::Submitted { submission_id: payload.submission_id })
        }
        Err(err) => {
            orchestrator.submission_failed(&err.to_string());
            Err(FinalizeError::Backend(err))
        }
    }
}
