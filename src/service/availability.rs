use chrono::Duration;

use crate::error::PlannerError;
use crate::models::plan::{PlanningDay, TimeWindow};
use crate::service::calendar_service::CalendarClient;

/// Snapshot of the day's occupancy: clamped to day bounds, sorted by start,
/// with overlapping/touching windows (and windows closer than `min_gap`)
/// merged. Taken once per request and never re-queried mid-reconciliation.
pub async fn read_busy_windows<C: CalendarClient + ?Sized>(
    calendar: &C,
    day: &PlanningDay,
    min_gap: Duration,
) -> Result<Vec<TimeWindow>, PlannerError> {
    let raw = calendar.event_windows(day).await?;
    Ok(merge_busy_windows(clamp_to_day(raw, day), min_gap))
}

fn clamp_to_day(windows: Vec<TimeWindow>, day: &PlanningDay) -> Vec<TimeWindow> {
    windows
        .into_iter()
        .filter_map(|w| {
            let start = w.start.max(day.start());
            let end = w.end.min(day.end());
            if start < end {
                Some(TimeWindow::new(start, end))
            } else {
                None
            }
        })
        .collect()
}

/// Merges so that no two returned windows overlap or touch. Windows whose gap
/// is smaller than `min_gap` are merged as well.
pub fn merge_busy_windows(mut windows: Vec<TimeWindow>, min_gap: Duration) -> Vec<TimeWindow> {
    windows.retain(|w| w.start < w.end);
    windows.sort_by_key(|w| (w.start, w.end));

    let mut merged: Vec<TimeWindow> = Vec::with_capacity(windows.len());
    for window in windows {
        match merged.last_mut() {
            Some(last) if window.start <= last.end + min_gap => {
                if window.end > last.end {
                    last.end = window.end;
                }
            }
            _ => merged.push(window),
        }
    }
    merged
}
