use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Half-open interval [start, end). Invariant: start < end.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn intersects(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Unvalidated task/window pairing suggested by the model.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub task: String,
    #[serde(flatten)]
    pub window: TimeWindow,
}

/// A proposal that survived reconciliation; the only thing ever written
/// to the calendar.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PlacedEvent {
    pub task: String,
    #[serde(flatten)]
    pub window: TimeWindow,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    pub task: String,
    pub reason: String,
}

/// Output of the reconciler: conflict-free placements plus the tasks that
/// did not fit anywhere in the day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanResult {
    pub placed: Vec<PlacedEvent>,
    pub unscheduled: Vec<String>,
}

/// Output of the event writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOutcome {
    pub written: Vec<PlacedEvent>,
    pub failures: Vec<WriteFailure>,
    pub unscheduled: Vec<String>,
}

/// Raw model output entry, parsed leniently before validation.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AIProposal {
    pub task: String,
    pub start: String,
    pub end: String,
}

/// The single planning day. All windows must fall inside [start, end).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanningDay {
    pub date: NaiveDate,
}

impl PlanningDay {
    pub fn parse(date: &str) -> Option<Self> {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .ok()
            .map(|date| Self { date })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.date.and_time(NaiveTime::MIN).and_utc()
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start() + Duration::days(1)
    }

    pub fn contains(&self, window: &TimeWindow) -> bool {
        window.start >= self.start() && window.end <= self.end()
    }
}
