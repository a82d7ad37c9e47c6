use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};

use crate::clients::openai_client;
use crate::config::PlannerConfig;
use crate::error::PlannerError;
use crate::models::plan::{AIProposal, PlanningDay, Proposal, TimeWindow};

/// Seam to the language-model collaborator. Its output is advisory only and
/// goes through the reconciler before anything touches the calendar.
#[async_trait]
pub trait PlanProposer: Send + Sync {
    async fn propose(
        &self,
        day: &PlanningDay,
        tasks: &[String],
        busy: &[TimeWindow],
    ) -> Result<Vec<Proposal>, PlannerError>;
}

pub struct OpenAIService {
    api_key: String,
    model: String,
}

impl OpenAIService {
    pub fn new(api_key: String, model: String) -> Self {
        Self { api_key, model }
    }

    pub fn from_config(config: &PlannerConfig) -> Result<Self, PlannerError> {
        Ok(Self::new(
            config.require_openai_api_key()?.to_string(),
            config.openai_model.clone(),
        ))
    }
}

#[async_trait]
impl PlanProposer for OpenAIService {
    async fn propose(
        &self,
        day: &PlanningDay,
        tasks: &[String],
        busy: &[TimeWindow],
    ) -> Result<Vec<Proposal>, PlannerError> {
        if tasks.is_empty() {
            return Ok(Vec::new());
        }
        let prompt = openai_client::build_plan_prompt(day, tasks, busy);
        let raw = openai_client::request_plan(prompt, &self.api_key, &self.model).await?;
        parse_proposals(&raw)
    }
}

/// Parses the raw model reply into proposals. Individual malformed entries
/// are dropped; only a reply with zero usable entries fails the call.
pub fn parse_proposals(raw: &str) -> Result<Vec<Proposal>, PlannerError> {
    let body = strip_code_fences(raw);
    let entries: Vec<serde_json::Value> = match serde_json::from_str(body) {
        Ok(serde_json::Value::Array(entries)) => entries,
        Ok(_) | Err(_) => Vec::new(),
    };

    let mut proposals: Vec<Proposal> = Vec::with_capacity(entries.len());
    for entry in entries {
        match parse_entry(entry) {
            Ok(proposal) => proposals.push(proposal),
            Err(PlannerError::MalformedProposal(reason)) => {
                log::warn!("Dropping malformed proposal entry: {}", reason);
            }
            Err(other) => return Err(other),
        }
    }

    if proposals.is_empty() {
        return Err(PlannerError::NoUsablePlan(
            "model reply contained no parseable proposals".to_string(),
        ));
    }
    Ok(proposals)
}

fn parse_entry(entry: serde_json::Value) -> Result<Proposal, PlannerError> {
    let raw: AIProposal = serde_json::from_value(entry)
        .map_err(|e| PlannerError::MalformedProposal(e.to_string()))?;
    let start = parse_timestamp(&raw.start)
        .ok_or(PlannerError::MalformedProposal(format!("bad start: {}", raw.start)))?;
    let end = parse_timestamp(&raw.end)
        .ok_or(PlannerError::MalformedProposal(format!("bad end: {}", raw.end)))?;
    Ok(Proposal {
        task: raw.task,
        window: TimeWindow::new(start, end),
    })
}

/// RFC3339 first, then a bare local datetime taken as UTC (models sometimes
/// drop the offset).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_start_matches('\n')
        .trim_end_matches('`')
        .trim()
}
