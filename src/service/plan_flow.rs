use std::time::Duration;

use tokio::time::timeout;
use uuid::Uuid;

use crate::error::PlannerError;
use crate::models::plan::{PlanOutcome, PlanningDay, Proposal, TimeWindow};
use crate::service::availability::read_busy_windows;
use crate::service::calendar_service::CalendarClient;
use crate::service::event_writer::write_events;
use crate::service::openai_service::PlanProposer;
use crate::service::plan_reconciler::reconcile;

/// The proposer is the one slow collaborator in the pipeline; bound it even
/// when the concrete implementation forgets to.
const PROPOSE_TIMEOUT_SECS: u64 = 25;

fn min_gap() -> chrono::Duration {
    chrono::Duration::zero()
}

async fn propose_bounded<P: PlanProposer + ?Sized>(
    proposer: &P,
    day: &PlanningDay,
    tasks: &[String],
    busy: &[TimeWindow],
) -> Result<Vec<Proposal>, PlannerError> {
    match timeout(
        Duration::from_secs(PROPOSE_TIMEOUT_SECS),
        proposer.propose(day, tasks, busy),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(PlannerError::ProposerUnavailable(
            "proposer call timed out".to_string(),
        )),
    }
}

/// Dry run: busy windows in, raw proposals out, nothing written.
pub async fn suggest<C: CalendarClient + ?Sized, P: PlanProposer + ?Sized>(
    calendar: &C,
    proposer: &P,
    day: &PlanningDay,
    tasks: &[String],
) -> Result<Vec<Proposal>, PlannerError> {
    let busy = read_busy_windows(calendar, day, min_gap()).await?;
    propose_bounded(proposer, day, tasks, &busy).await
}

/// Full pipeline: availability -> proposal -> reconciliation -> writes.
/// The stages run strictly in sequence; the busy snapshot taken here is the
/// one the reconciler validates against.
pub async fn plan<C: CalendarClient + ?Sized, P: PlanProposer + ?Sized>(
    calendar: &C,
    proposer: &P,
    day: &PlanningDay,
    tasks: &[String],
) -> Result<PlanOutcome, PlannerError> {
    let request_id = Uuid::new_v4();
    log::info!(
        "[{}] planning {} with {} task(s)",
        request_id,
        day.date,
        tasks.len()
    );

    let busy = read_busy_windows(calendar, day, min_gap()).await?;
    let proposals = propose_bounded(proposer, day, tasks, &busy).await?;
    let result = reconcile(day, &busy, &proposals, tasks);
    log::info!(
        "[{}] reconciled: {} placed, {} unscheduled",
        request_id,
        result.placed.len(),
        result.unscheduled.len()
    );

    let outcome = write_events(calendar, result).await;
    if !outcome.failures.is_empty() {
        log::warn!(
            "[{}] {} event write(s) failed",
            request_id,
            outcome.failures.len()
        );
    }
    Ok(outcome)
}
