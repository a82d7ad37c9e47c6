use async_trait::async_trait;

use crate::clients::google_calendar::GoogleCalendarClient;
use crate::config::PlannerConfig;
use crate::error::PlannerError;
use crate::models::plan::{PlacedEvent, PlanningDay, TimeWindow};

/// Seam to the calendar provider. The planning engine only ever sees this
/// trait; tests script it.
#[async_trait]
pub trait CalendarClient: Send + Sync {
    /// Raw occupied windows for the day, as reported by the provider.
    async fn event_windows(&self, day: &PlanningDay) -> Result<Vec<TimeWindow>, PlannerError>;

    async fn create_event(&self, event: &PlacedEvent) -> Result<(), PlannerError>;
}

pub struct GoogleCalendarService {
    client: GoogleCalendarClient,
}

impl GoogleCalendarService {
    pub fn from_config(config: &PlannerConfig) -> Result<Self, PlannerError> {
        let credentials = config.require_google_credentials()?;
        let client =
            GoogleCalendarClient::from_credentials_json(credentials, config.calendar_id.clone())?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CalendarClient for GoogleCalendarService {
    async fn event_windows(&self, day: &PlanningDay) -> Result<Vec<TimeWindow>, PlannerError> {
        self.client.list_event_windows(day).await
    }

    async fn create_event(&self, event: &PlacedEvent) -> Result<(), PlannerError> {
        self.client.insert_event(event).await
    }
}
