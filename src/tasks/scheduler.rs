use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

use crate::core::state::{AppState, SharedSession};
use crate::services::submission_finalize::{deliver, FinalizeMode, FinalizeOutcome};
use crate::session::orchestrator::FinishStatus;

/// Spawns the one-second clock of a live session.
pub(crate) fn spawn_session_clock(state: AppState, session: SharedSession) -> JoinHandle<()> {
    let shutdown = state.shutdown().subscribe();
    tokio::spawn(session_clock_loop(state, session, shutdown))
}

async fn session_clock_loop(
    state: AppState,
    session: SharedSession,
    mut shutdown: watch::Receiver<bool>,
) {
    let session_id = session.lock().await.session_id().to_string();
    let period = Duration::from_millis(state.settings().session().tick_interval_ms);
    let mut tick = interval_at(Instant::now() + period, period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::debug!(
        session_id = %session_id,
        period_ms = period.as_millis() as u64,
        "Session clock started"
    );

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if !advance(&state, &session, &session_id).await {
                    break;
                }
            }
        }
    }

    let status = session.lock().await.finish_status();
    if status == FinishStatus::Submitted {
        state.release_session(&session_id).await;
    }
    tracing::debug!(session_id = %session_id, status = ?status, "Session clock stopped");
}

/// One tick plus any delivery it made due. Returns whether the clock keeps running.
///
/// The session lock covers the tick only; the post runs unlocked.
async fn advance(state: &AppState, session: &SharedSession, session_id: &str) -> bool {
    let running = {
        let mut orchestrator = session.lock().await;
        if let Err(err) = orchestrator.tick().await {
            tracing::error!(session_id = %session_id, error = %err, "Session tick failed");
        }
        !orchestrator.is_halted()
    };

    match deliver(session, state.backend(), FinalizeMode::Automatic).await {
        Ok(FinalizeOutcome::Submitted { submission_id }) => {
            tracing::info!(
                session_id = %session_id,
                submission_id = %submission_id,
                "Automatic submission delivered"
            );
        }
        Ok(FinalizeOutcome::NotDue | FinalizeOutcome::InFlight) => {}
        Err(err) => {
            tracing::warn!(
                session_id = %session_id,
                error = %err,
                "Automatic submission not delivered; waiting for explicit retry"
            );
        }
    }

    running
}
