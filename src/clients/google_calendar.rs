use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::PlannerError;
use crate::models::plan::{PlacedEvent, PlanningDay, TimeWindow};

const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
const CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";
const PROVIDER_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    items: Vec<GoogleEvent>,
}

#[derive(Debug, Deserialize)]
struct GoogleEvent {
    status: Option<String>,
    start: Option<EventTime>,
    end: Option<EventTime>,
}

#[derive(Debug, Deserialize)]
struct EventTime {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Serialize)]
struct InsertEventBody<'a> {
    summary: &'a str,
    description: &'a str,
    start: InsertEventTime,
    end: InsertEventTime,
}

#[derive(Debug, Serialize)]
struct InsertEventTime {
    #[serde(rename = "dateTime")]
    date_time: String,
}

/// Google Calendar v3 over plain REST with a service-account token grant.
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    key: ServiceAccountKey,
    calendar_id: String,
}

impl GoogleCalendarClient {
    pub fn from_credentials_json(credentials: &str, calendar_id: String) -> Result<Self, PlannerError> {
        let key: ServiceAccountKey = serde_json::from_str(credentials)
            .map_err(|e| PlannerError::Config(format!("invalid GOOGLE_CREDENTIALS_JSON: {}", e)))?;
        Ok(Self {
            http: reqwest::Client::new(),
            key,
            calendar_id,
        })
    }

    async fn access_token(&self) -> Result<String, PlannerError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: CALENDAR_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let encoding_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| PlannerError::Config(format!("invalid service account key: {}", e)))?;
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
            .map_err(|e| PlannerError::Config(format!("failed to sign token request: {}", e)))?;

        let response = self
            .http
            .post(&self.key.token_uri)
            .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PlannerError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PlannerError::ProviderUnavailable(e.to_string()))?;
        if !status.is_success() {
            log::error!("Token endpoint returned {}: {}", status, text);
            return Err(PlannerError::ProviderUnavailable(format!(
                "token request failed with status {}",
                status
            )));
        }
        let token: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| PlannerError::ProviderUnavailable(format!("bad token response: {}", e)))?;
        Ok(token.access_token)
    }

    /// Lists the day's event windows, oldest first, as the provider reports
    /// them. All-day events come back as date-only strings and are widened to
    /// whole-day windows.
    pub async fn list_event_windows(&self, day: &PlanningDay) -> Result<Vec<TimeWindow>, PlannerError> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/calendars/{}/events",
            CALENDAR_API,
            urlencode(&self.calendar_id)
        );
        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
            .query(&[
                ("timeMin", day.start().to_rfc3339()),
                ("timeMax", day.end().to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("maxResults", "250".to_string()),
            ])
            .send()
            .await
            .map_err(|e| PlannerError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PlannerError::InvalidCalendar(self.calendar_id.clone()));
        }
        let text = response
            .text()
            .await
            .map_err(|e| PlannerError::ProviderUnavailable(e.to_string()))?;
        if !status.is_success() {
            log::error!("Calendar list returned {}: {}", status, text);
            return Err(PlannerError::ProviderUnavailable(format!(
                "event list failed with status {}",
                status
            )));
        }
        let parsed: EventsResponse = serde_json::from_str(&text)
            .map_err(|e| PlannerError::ProviderUnavailable(format!("bad event list body: {}", e)))?;

        let mut windows: Vec<TimeWindow> = Vec::new();
        for event in parsed.items {
            if event.status.as_deref() == Some("cancelled") {
                continue;
            }
            let (Some(start), Some(end)) = (event.start, event.end) else {
                continue;
            };
            let (Some(start), Some(end)) = (parse_event_time(&start), parse_event_time(&end))
            else {
                continue;
            };
            windows.push(TimeWindow::new(start, end));
        }
        Ok(windows)
    }

    pub async fn insert_event(&self, event: &PlacedEvent) -> Result<(), PlannerError> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/calendars/{}/events",
            CALENDAR_API,
            urlencode(&self.calendar_id)
        );
        let body = InsertEventBody {
            summary: &event.task,
            description: "",
            start: InsertEventTime {
                date_time: event.window.start.to_rfc3339(),
            },
            end: InsertEventTime {
                date_time: event.window.end.to_rfc3339(),
            },
        };
        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
            .json(&body)
            .send()
            .await
            .map_err(|e| PlannerError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PlannerError::InvalidCalendar(self.calendar_id.clone()));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            log::error!("Event insert returned {}: {}", status, text);
            return Err(PlannerError::ProviderUnavailable(format!(
                "event insert failed with status {}",
                status
            )));
        }
        Ok(())
    }
}

fn parse_event_time(time: &EventTime) -> Option<DateTime<Utc>> {
    if let Some(date_time) = &time.date_time {
        return DateTime::parse_from_rfc3339(date_time)
            .ok()
            .map(|dt| dt.with_timezone(&Utc));
    }
    // All-day events carry a bare date; midnight UTC widens them to day bounds.
    let date = time.date.as_deref()?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

/// Percent-encodes everything outside the RFC 3986 unreserved set, so
/// calendar ids with spaces, slashes or ampersands survive as path segments.
fn urlencode(raw: &str) -> String {
    let mut encoded = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
