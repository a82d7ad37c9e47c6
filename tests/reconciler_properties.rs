use chrono::{Duration, TimeZone, Utc};

use plannerBot::models::plan::{PlanningDay, Proposal, TimeWindow};
use plannerBot::service::availability::merge_busy_windows;
use plannerBot::service::plan_reconciler::reconcile;

fn day() -> PlanningDay {
    PlanningDay::parse("2026-03-02").unwrap()
}

fn window(start_h: u32, start_m: u32, end_h: u32, end_m: u32) -> TimeWindow {
    TimeWindow::new(
        Utc.with_ymd_and_hms(2026, 3, 2, start_h, start_m, 0).unwrap(),
        Utc.with_ymd_and_hms(2026, 3, 2, end_h, end_m, 0).unwrap(),
    )
}

fn proposal(task: &str, w: TimeWindow) -> Proposal {
    Proposal {
        task: task.to_string(),
        window: w,
    }
}

/// A messy fixture: overlapping proposals, inverted windows, out-of-day
/// windows, duplicated descriptions, tasks the model skipped and tasks the
/// model invented.
fn messy_fixture() -> (Vec<TimeWindow>, Vec<Proposal>, Vec<String>) {
    let busy = merge_busy_windows(
        vec![window(8, 0, 9, 0), window(8, 30, 9, 30), window(12, 0, 13, 0)],
        Duration::zero(),
    );
    let tasks: Vec<String> = vec![
        "write report".to_string(),
        "review".to_string(),
        "review".to_string(),
        "inbox zero".to_string(),
        "never proposed".to_string(),
    ];
    let proposals = vec![
        proposal("write report", window(8, 30, 10, 0)),
        proposal("review", window(9, 30, 10, 30)),
        proposal(
            "review",
            TimeWindow::new(
                Utc.with_ymd_and_hms(2026, 3, 2, 11, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap(),
            ),
        ),
        proposal("inbox zero", window(23, 30, 23, 59)),
        proposal("invented task", window(14, 0, 15, 0)),
    ];
    (busy, proposals, tasks)
}

#[test]
fn placed_events_never_overlap_each_other_or_busy_windows() {
    let (busy, proposals, tasks) = messy_fixture();
    let result = reconcile(&day(), &busy, &proposals, &tasks);

    for (i, a) in result.placed.iter().enumerate() {
        assert!(a.window.start < a.window.end);
        assert!(day().contains(&a.window));
        for b in busy.iter() {
            assert!(
                !a.window.intersects(b),
                "{:?} overlaps busy {:?}",
                a,
                b
            );
        }
        for b in result.placed.iter().skip(i + 1) {
            assert!(
                !a.window.intersects(&b.window),
                "{:?} overlaps {:?}",
                a,
                b
            );
        }
    }
}

#[test]
fn every_task_lands_in_exactly_one_bucket() {
    let (busy, proposals, tasks) = messy_fixture();
    let result = reconcile(&day(), &busy, &proposals, &tasks);

    // Placed + unscheduled is a permutation of the input multiset.
    let mut accounted: Vec<String> = result
        .placed
        .iter()
        .map(|e| e.task.clone())
        .chain(result.unscheduled.iter().cloned())
        .collect();
    let mut expected = tasks.clone();
    accounted.sort();
    expected.sort();
    assert_eq!(accounted, expected);
}

#[test]
fn reconciling_twice_gives_identical_placements() {
    let (busy, proposals, tasks) = messy_fixture();
    let first = reconcile(&day(), &busy, &proposals, &tasks);
    let second = reconcile(&day(), &busy, &proposals, &tasks);
    assert_eq!(first, second);
}

#[test]
fn placed_events_are_ordered_and_durations_preserved() {
    let (busy, proposals, tasks) = messy_fixture();
    let result = reconcile(&day(), &busy, &proposals, &tasks);

    for pair in result.placed.windows(2) {
        assert!(pair[0].window.end <= pair[1].window.start);
    }
    // Every placement keeps the duration its proposal asked for.
    for event in &result.placed {
        let original = proposals
            .iter()
            .find(|p| p.task == event.task && p.window.start < p.window.end)
            .unwrap();
        assert_eq!(event.window.duration(), original.window.duration());
    }
}

#[test]
fn invalid_window_tasks_are_never_placed() {
    let tasks = vec!["inverted".to_string(), "outside".to_string()];
    let proposals = vec![
        proposal(
            "inverted",
            TimeWindow::new(
                Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap(),
            ),
        ),
        proposal(
            "outside",
            TimeWindow::new(
                Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
            ),
        ),
    ];
    let result = reconcile(&day(), &[], &proposals, &tasks);
    assert!(result.placed.is_empty());
    assert_eq!(result.unscheduled, tasks);
}
