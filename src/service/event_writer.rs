use futures::future::join_all;

use crate::models::plan::{PlanOutcome, PlanResult, WriteFailure};
use crate::service::calendar_service::CalendarClient;

/// Persists a reconciled plan, one write per placed event. Placements are
/// already non-overlapping, so the writes commute and run concurrently. A
/// failed write is recorded against its event and never aborts the others.
pub async fn write_events<C: CalendarClient + ?Sized>(
    calendar: &C,
    result: PlanResult,
) -> PlanOutcome {
    let writes = result
        .placed
        .iter()
        .map(|event| calendar.create_event(event));
    let results = join_all(writes).await;

    let mut written = Vec::with_capacity(result.placed.len());
    let mut failures = Vec::new();
    for (event, write) in result.placed.into_iter().zip(results) {
        match write {
            Ok(()) => written.push(event),
            Err(e) => {
                log::error!("Failed to write event for {}: {}", event.task, e);
                failures.push(WriteFailure {
                    task: event.task,
                    reason: e.to_string(),
                });
            }
        }
    }

    PlanOutcome {
        written,
        failures,
        unscheduled: result.unscheduled,
    }
}
