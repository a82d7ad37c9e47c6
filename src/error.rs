use thiserror::Error;

/// Request-level failure taxonomy. Per-event write failures and tasks that
/// simply do not fit are reported in the response payload instead, never
/// through this enum.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("calendar provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("calendar rejected by provider: {0}")]
    InvalidCalendar(String),
    #[error("plan proposer unavailable: {0}")]
    ProposerUnavailable(String),
    #[error("malformed proposal payload: {0}")]
    MalformedProposal(String),
    #[error("no usable plan: {0}")]
    NoUsablePlan(String),
    #[error("request timed out")]
    RequestTimeout,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl PlannerError {
    /// Stable machine-readable kind, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            PlannerError::ProviderUnavailable(_) => "provider_unavailable",
            PlannerError::InvalidCalendar(_) => "invalid_calendar",
            PlannerError::ProposerUnavailable(_) => "proposer_unavailable",
            PlannerError::MalformedProposal(_) => "malformed_proposal",
            PlannerError::NoUsablePlan(_) => "no_usable_plan",
            PlannerError::RequestTimeout => "request_timeout",
            PlannerError::InvalidRequest(_) => "invalid_request",
            PlannerError::Config(_) => "config_error",
        }
    }
}
