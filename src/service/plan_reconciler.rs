use chrono::{DateTime, Duration, Utc};

use crate::models::plan::{PlacedEvent, PlanResult, PlanningDay, Proposal, TimeWindow};

/// Turns an untrusted proposal sequence into a conflict-free plan.
///
/// The proposer is advisory, never authoritative: whatever it claims about
/// availability is re-checked here against the merged busy windows, and every
/// placement is shifted forward deterministically until it is clear of both
/// the busy windows and the events placed before it. `busy` must already be
/// sorted and merged (see `availability::merge_busy_windows`).
pub fn reconcile(
    day: &PlanningDay,
    busy: &[TimeWindow],
    proposals: &[Proposal],
    tasks: &[String],
) -> PlanResult {
    // Rule 1: drop inverted or out-of-day windows outright.
    let surviving: Vec<&Proposal> = proposals
        .iter()
        .filter(|p| p.window.start < p.window.end && day.contains(&p.window))
        .collect();

    // Bind each surviving proposal to an input task by position: first
    // unclaimed task with the same description. Proposals naming a task the
    // request never asked for are discarded.
    let mut claimed = vec![false; tasks.len()];
    let mut bound: Vec<(usize, &Proposal)> = Vec::with_capacity(surviving.len());
    for proposal in surviving {
        let slot = tasks
            .iter()
            .enumerate()
            .find(|(idx, task)| !claimed[*idx] && *task == &proposal.task);
        if let Some((idx, _)) = slot {
            claimed[idx] = true;
            bound.push((idx, proposal));
        } else {
            log::warn!("Dropping proposal for unknown task: {}", proposal.task);
        }
    }

    // Rule 2: stable sort by start keeps the model's ordering on ties.
    bound.sort_by_key(|(_, p)| p.window.start);

    // Rule 3: single forward pass with a next-free-instant cursor.
    let mut placed: Vec<PlacedEvent> = Vec::with_capacity(bound.len());
    let mut placed_tasks = vec![false; tasks.len()];
    let mut cursor = day.start();
    for (idx, proposal) in bound {
        let duration = proposal.window.duration();
        let candidate = proposal.window.start.max(cursor);
        match earliest_clear_instant(candidate, duration, day.end(), busy) {
            Some(start) => {
                let window = TimeWindow::new(start, start + duration);
                cursor = window.end;
                placed_tasks[idx] = true;
                placed.push(PlacedEvent {
                    task: tasks[idx].clone(),
                    window,
                });
            }
            None => {
                // No room left today; the task stays unscheduled rather than
                // being split or pushed past midnight.
            }
        }
    }

    // Rule 4: every input task that did not end up placed is unscheduled,
    // in request order.
    let unscheduled = tasks
        .iter()
        .enumerate()
        .filter(|(idx, _)| !placed_tasks[*idx])
        .map(|(_, task)| task.clone())
        .collect();

    PlanResult { placed, unscheduled }
}

/// Earliest instant >= `from` where a window of `duration` fits before
/// `day_end` without touching any busy window. Busy windows are sorted and
/// disjoint, so each shift lands strictly later and the scan terminates.
fn earliest_clear_instant(
    from: DateTime<Utc>,
    duration: Duration,
    day_end: DateTime<Utc>,
    busy: &[TimeWindow],
) -> Option<DateTime<Utc>> {
    let mut start = from;
    loop {
        let end = start + duration;
        if end > day_end {
            return None;
        }
        let candidate = TimeWindow::new(start, end);
        match busy.iter().find(|b| b.intersects(&candidate)) {
            Some(blocker) => start = blocker.end,
            None => return Some(start),
        }
    }
}
