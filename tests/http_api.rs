use std::sync::Arc;

use chrono::{TimeZone, Utc};

use plannerBot::config::PlannerConfig;
use plannerBot::error::PlannerError;
use plannerBot::handlers::api::{routes, ApiContext};
use plannerBot::models::plan::{PlacedEvent, PlanningDay, Proposal, TimeWindow};
use plannerBot::service::calendar_service::CalendarClient;
use plannerBot::service::openai_service::PlanProposer;

fn window(start_h: u32, end_h: u32) -> TimeWindow {
    TimeWindow::new(
        Utc.with_ymd_and_hms(2026, 3, 2, start_h, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2026, 3, 2, end_h, 0, 0).unwrap(),
    )
}

struct FakeCalendar {
    windows: Vec<TimeWindow>,
}

#[async_trait::async_trait]
impl CalendarClient for FakeCalendar {
    async fn event_windows(&self, _day: &PlanningDay) -> Result<Vec<TimeWindow>, PlannerError> {
        Ok(self.windows.clone())
    }

    async fn create_event(&self, _event: &PlacedEvent) -> Result<(), PlannerError> {
        Ok(())
    }
}

struct FixedProposer {
    proposals: Vec<Proposal>,
}

#[async_trait::async_trait]
impl PlanProposer for FixedProposer {
    async fn propose(
        &self,
        _day: &PlanningDay,
        _tasks: &[String],
        _busy: &[TimeWindow],
    ) -> Result<Vec<Proposal>, PlannerError> {
        Ok(self.proposals.clone())
    }
}

/// Provider that never answers; only timers can resolve a request using it.
struct StalledCalendar;

#[async_trait::async_trait]
impl CalendarClient for StalledCalendar {
    async fn event_windows(&self, _day: &PlanningDay) -> Result<Vec<TimeWindow>, PlannerError> {
        tokio::time::sleep(std::time::Duration::from_secs(7200)).await;
        Ok(Vec::new())
    }

    async fn create_event(&self, _event: &PlacedEvent) -> Result<(), PlannerError> {
        Ok(())
    }
}

fn config(secret: Option<&str>) -> PlannerConfig {
    PlannerConfig {
        openai_api_key: Some("test-key".to_string()),
        openai_model: "gpt-4o-mini".to_string(),
        google_credentials_json: Some("{}".to_string()),
        calendar_id: "primary".to_string(),
        agent_secret: secret.map(|s| s.to_string()),
        bind_addr: "127.0.0.1:0".to_string(),
    }
}

fn ctx(secret: Option<&str>) -> Arc<ApiContext> {
    Arc::new(ApiContext {
        config: config(secret),
        calendar: Some(Arc::new(FakeCalendar {
            windows: vec![window(9, 10)],
        })),
        proposer: Some(Arc::new(FixedProposer {
            proposals: vec![Proposal {
                task: "write report".to_string(),
                window: window(9, 10),
            }],
        })),
    })
}

fn body_json<B: AsRef<[u8]>>(res: &warp::http::Response<B>) -> serde_json::Value {
    serde_json::from_slice(res.body().as_ref()).unwrap()
}

#[tokio::test]
async fn ping_reports_configuration_flags() {
    let api = routes(ctx(None));
    let res = warp::test::request().path("/ping").reply(&api).await;
    assert_eq!(res.status(), 200);
    let body = body_json(&res);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["calendar_configured"], true);
    assert_eq!(body["openai_configured"], true);
}

#[tokio::test]
async fn events_returns_merged_busy_windows() {
    let api = routes(ctx(None));
    let res = warp::test::request()
        .path("/events?date=2026-03-02")
        .reply(&api)
        .await;
    assert_eq!(res.status(), 200);
    let body = body_json(&res);
    assert_eq!(body["date"], "2026-03-02");
    assert_eq!(body["count"], 1);
    assert_eq!(body["busy"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn bad_date_is_an_invalid_request() {
    let api = routes(ctx(None));
    let res = warp::test::request()
        .path("/events?date=tomorrow")
        .reply(&api)
        .await;
    assert_eq!(res.status(), 400);
    let body = body_json(&res);
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn plan_places_shifted_event_and_reports_buckets() {
    let api = routes(ctx(None));
    let res = warp::test::request()
        .method("POST")
        .path("/plan")
        .json(&serde_json::json!({
            "date": "2026-03-02",
            "tasks": ["write report", "never proposed"]
        }))
        .reply(&api)
        .await;
    assert_eq!(res.status(), 200);
    let body = body_json(&res);
    let placed = body["placed"].as_array().unwrap();
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0]["task"], "write report");
    // Proposal collided with the 09:00-10:00 busy window and moved to 10:00.
    assert_eq!(placed[0]["start"], "2026-03-02T10:00:00Z");
    assert_eq!(
        body["unscheduled"],
        serde_json::json!(["never proposed"])
    );
    assert_eq!(body["failures"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn suggest_is_a_dry_run() {
    let api = routes(ctx(None));
    let res = warp::test::request()
        .method("POST")
        .path("/suggest")
        .json(&serde_json::json!({"date": "2026-03-02", "tasks": ["write report"]}))
        .reply(&api)
        .await;
    assert_eq!(res.status(), 200);
    let body = body_json(&res);
    assert_eq!(body["proposals"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn secret_protected_routes_require_a_bearer_token() {
    let api = routes(ctx(Some("s3cret")));

    let missing = warp::test::request()
        .path("/events?date=2026-03-02")
        .reply(&api)
        .await;
    assert_eq!(missing.status(), 401);

    let wrong = warp::test::request()
        .path("/events?date=2026-03-02")
        .header("authorization", "Bearer nope")
        .reply(&api)
        .await;
    assert_eq!(wrong.status(), 403);

    let right = warp::test::request()
        .path("/events?date=2026-03-02")
        .header("authorization", "Bearer s3cret")
        .reply(&api)
        .await;
    assert_eq!(right.status(), 200);

    // The liveness probe stays open.
    let ping = warp::test::request().path("/ping").reply(&api).await;
    assert_eq!(ping.status(), 200);
}

#[tokio::test(start_paused = true)]
async fn stalled_request_returns_request_timeout() {
    // The calendar stall sits outside the proposer bound, so the whole-request
    // budget is what expires; paused time fast-forwards to it.
    let ctx = Arc::new(ApiContext {
        config: config(None),
        calendar: Some(Arc::new(StalledCalendar)),
        proposer: Some(Arc::new(FixedProposer { proposals: vec![] })),
    });
    let api = routes(ctx);
    let res = warp::test::request()
        .method("POST")
        .path("/plan")
        .json(&serde_json::json!({"date": "2026-03-02", "tasks": ["write report"]}))
        .reply(&api)
        .await;
    assert_eq!(res.status(), 504);
    let body = body_json(&res);
    assert_eq!(body["error"], "request_timeout");
}

#[tokio::test]
async fn unconfigured_calendar_is_a_config_error() {
    let ctx = Arc::new(ApiContext {
        config: PlannerConfig {
            google_credentials_json: None,
            ..config(None)
        },
        calendar: None,
        proposer: None,
    });
    let api = routes(ctx);
    let res = warp::test::request()
        .path("/events?date=2026-03-02")
        .reply(&api)
        .await;
    assert_eq!(res.status(), 500);
    let body = body_json(&res);
    assert_eq!(body["error"], "config_error");
}
