use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::config::PlannerConfig;
use crate::error::PlannerError;
use crate::models::plan::{PlacedEvent, PlanningDay, Proposal, TimeWindow, WriteFailure};
use crate::service::availability::read_busy_windows;
use crate::service::calendar_service::CalendarClient;
use crate::service::openai_service::PlanProposer;
use crate::service::plan_flow;

/// Whole-request budget; expiry maps to `request_timeout` with no rollback
/// of events already written.
const REQUEST_TIMEOUT_SECS: u64 = 60;

pub struct ApiContext {
    pub config: PlannerConfig,
    pub calendar: Option<Arc<dyn CalendarClient>>,
    pub proposer: Option<Arc<dyn PlanProposer>>,
}

impl ApiContext {
    fn calendar(&self) -> Result<&Arc<dyn CalendarClient>, PlannerError> {
        self.calendar
            .as_ref()
            .ok_or(PlannerError::Config("GOOGLE_CREDENTIALS_JSON not set".to_string()))
    }

    fn proposer(&self) -> Result<&Arc<dyn PlanProposer>, PlannerError> {
        self.proposer
            .as_ref()
            .ok_or(PlannerError::Config("OPENAI_API_KEY not set".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct EventsQuery {
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlanRequest {
    date: Option<String>,
    tasks: Option<Vec<String>>,
}

#[derive(Serialize)]
struct PingResponse {
    status: &'static str,
    calendar_configured: bool,
    openai_configured: bool,
}

#[derive(Serialize)]
struct EventsResponse {
    date: String,
    count: usize,
    busy: Vec<TimeWindow>,
}

#[derive(Serialize)]
struct SuggestResponse {
    date: String,
    proposals: Vec<Proposal>,
}

#[derive(Serialize)]
struct PlanResponse {
    placed: Vec<PlacedEvent>,
    unscheduled: Vec<String>,
    failures: Vec<WriteFailure>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

#[derive(Debug)]
struct ApiReject {
    status: StatusCode,
    kind: String,
    message: String,
}

impl warp::reject::Reject for ApiReject {}

fn reject(err: PlannerError) -> Rejection {
    let status = match &err {
        PlannerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        PlannerError::InvalidCalendar(_) => StatusCode::NOT_FOUND,
        PlannerError::MalformedProposal(_) | PlannerError::NoUsablePlan(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        PlannerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        PlannerError::ProviderUnavailable(_) | PlannerError::ProposerUnavailable(_) => {
            StatusCode::BAD_GATEWAY
        }
        PlannerError::RequestTimeout => StatusCode::GATEWAY_TIMEOUT,
    };
    warp::reject::custom(ApiReject {
        status,
        kind: err.kind().to_string(),
        message: err.to_string(),
    })
}

fn auth_reject(status: StatusCode, kind: &str, message: &str) -> Rejection {
    warp::reject::custom(ApiReject {
        status,
        kind: kind.to_string(),
        message: message.to_string(),
    })
}

pub fn routes(
    ctx: Arc<ApiContext>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let ping = warp::path("ping")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_ctx(ctx.clone()))
        .and_then(handle_ping);

    let events = warp::path("events")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_auth(ctx.clone()))
        .and(warp::query::<EventsQuery>())
        .and(with_ctx(ctx.clone()))
        .and_then(handle_events);

    let suggest = warp::path("suggest")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_auth(ctx.clone()))
        .and(warp::body::json::<PlanRequest>())
        .and(with_ctx(ctx.clone()))
        .and_then(handle_suggest);

    let plan = warp::path("plan")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_auth(ctx.clone()))
        .and(warp::body::json::<PlanRequest>())
        .and(with_ctx(ctx))
        .and_then(handle_plan);

    ping.or(events)
        .or(suggest)
        .or(plan)
        .recover(handle_rejection)
}

fn with_ctx(
    ctx: Arc<ApiContext>,
) -> impl Filter<Extract = (Arc<ApiContext>,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

/// Bearer auth in the manner of the original deployment: when AGENT_SECRET
/// is unset the endpoints are open.
fn with_auth(ctx: Arc<ApiContext>) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and_then(move |header: Option<String>| {
            let secret = ctx.config.agent_secret.clone();
            async move {
                let Some(secret) = secret else {
                    return Ok(());
                };
                let Some(header) = header else {
                    return Err(auth_reject(
                        StatusCode::UNAUTHORIZED,
                        "missing_authorization",
                        "Missing Authorization header",
                    ));
                };
                let mut parts = header.split_whitespace();
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(scheme), Some(token), None)
                        if scheme.eq_ignore_ascii_case("bearer") && token == secret =>
                    {
                        Ok(())
                    }
                    _ => Err(auth_reject(
                        StatusCode::FORBIDDEN,
                        "invalid_agent_secret",
                        "Invalid or missing agent secret",
                    )),
                }
            }
        })
        .untuple_one()
}

fn parse_day(date: Option<&str>) -> Result<PlanningDay, Rejection> {
    match date {
        Some(raw) => PlanningDay::parse(raw).ok_or_else(|| {
            reject(PlannerError::InvalidRequest(
                "date must be YYYY-MM-DD".to_string(),
            ))
        }),
        None => Ok(PlanningDay {
            date: Utc::now().date_naive(),
        }),
    }
}

async fn handle_ping(ctx: Arc<ApiContext>) -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&PingResponse {
        status: "ok",
        calendar_configured: ctx.config.calendar_configured(),
        openai_configured: ctx.config.openai_configured(),
    }))
}

async fn handle_events(
    query: EventsQuery,
    ctx: Arc<ApiContext>,
) -> Result<impl Reply, Rejection> {
    let day = parse_day(query.date.as_deref())?;
    let calendar = ctx.calendar().map_err(reject)?;
    let busy = read_busy_windows(calendar.as_ref(), &day, chrono::Duration::zero())
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&EventsResponse {
        date: day.date.to_string(),
        count: busy.len(),
        busy,
    }))
}

async fn handle_suggest(
    request: PlanRequest,
    ctx: Arc<ApiContext>,
) -> Result<impl Reply, Rejection> {
    let day = parse_day(request.date.as_deref())?;
    let tasks = request.tasks.unwrap_or_default();
    let calendar = ctx.calendar().map_err(reject)?;
    let proposer = ctx.proposer().map_err(reject)?;
    let proposals = plan_flow::suggest(calendar.as_ref(), proposer.as_ref(), &day, &tasks)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&SuggestResponse {
        date: day.date.to_string(),
        proposals,
    }))
}

async fn handle_plan(
    request: PlanRequest,
    ctx: Arc<ApiContext>,
) -> Result<impl Reply, Rejection> {
    let day = parse_day(request.date.as_deref())?;
    let tasks = request.tasks.unwrap_or_default();
    let calendar = ctx.calendar().map_err(reject)?;
    let proposer = ctx.proposer().map_err(reject)?;
    let outcome = match timeout(
        Duration::from_secs(REQUEST_TIMEOUT_SECS),
        plan_flow::plan(calendar.as_ref(), proposer.as_ref(), &day, &tasks),
    )
    .await
    {
        Ok(result) => result.map_err(reject)?,
        Err(_) => return Err(reject(PlannerError::RequestTimeout)),
    };
    Ok(warp::reply::json(&PlanResponse {
        placed: outcome.written,
        unscheduled: outcome.unscheduled,
        failures: outcome.failures,
    }))
}

async fn handle_rejection(rejection: Rejection) -> Result<impl Reply, Infallible> {
    let (status, body) = if let Some(api) = rejection.find::<ApiReject>() {
        (
            api.status,
            ErrorBody {
                error: api.kind.clone(),
                message: api.message.clone(),
            },
        )
    } else if rejection.is_not_found() {
        (
            StatusCode::NOT_FOUND,
            ErrorBody {
                error: "not_found".to_string(),
                message: "No such route".to_string(),
            },
        )
    } else if let Some(e) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        (
            StatusCode::BAD_REQUEST,
            ErrorBody {
                error: "invalid_request".to_string(),
                message: e.to_string(),
            },
        )
    } else if rejection.find::<warp::reject::InvalidQuery>().is_some() {
        (
            StatusCode::BAD_REQUEST,
            ErrorBody {
                error: "invalid_request".to_string(),
                message: "Invalid query string".to_string(),
            },
        )
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            ErrorBody {
                error: "method_not_allowed".to_string(),
                message: "Method not allowed".to_string(),
            },
        )
    } else {
        log::error!("Unhandled rejection: {:?}", rejection);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody {
                error: "internal_error".to_string(),
                message: "Unhandled server error".to_string(),
            },
        )
    };

    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}
