use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::PlannerError;
use crate::models::plan::{PlanningDay, TimeWindow};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const PROPOSER_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: String,
}

pub fn build_plan_prompt(day: &PlanningDay, tasks: &[String], busy: &[TimeWindow]) -> String {
    let busy_lines = if busy.is_empty() {
        "- (none)".to_string()
    } else {
        busy.iter()
            .map(|w| format!("- {} -> {}", w.start.to_rfc3339(), w.end.to_rfc3339()))
            .collect::<Vec<String>>()
            .join("\n")
    };
    let task_lines = tasks
        .iter()
        .map(|t| format!("- {}", t))
        .collect::<Vec<String>>()
        .join("\n");

    format!(
        "You are a day-planning engine.\n\
         Planning date (UTC): {date}\n\
         The day runs from {day_start} to {day_end}.\n\
         Already-busy windows on the calendar (do not overlap them):\n\
         {busy_lines}\n\
         Tasks to schedule:\n\
         {task_lines}\n\
         Rules:\n\
         - Assign each task a start and end time inside the planning day.\n\
         - Copy each task description into \"task\" exactly as given, unchanged.\n\
         - Never overlap the busy windows above, and never overlap two tasks.\n\
         - Use RFC3339 UTC datetimes, e.g. \"2026-03-02T09:00:00Z\".\n\
         - Pick sensible durations (30 to 120 minutes) when the task does not imply one.\n\
         - If a task cannot fit, omit it rather than inventing an out-of-day time.\n\
         - Output ONLY raw JSON, no prose, markdown, or code fences.\n\
         - The JSON shape must be exactly:\n\
         [{{\"task\":\"<string>\",\"start\":\"<RFC3339 datetime>\",\"end\":\"<RFC3339 datetime>\"}}]",
        date = day.date,
        day_start = day.start().to_rfc3339(),
        day_end = day.end().to_rfc3339(),
        busy_lines = busy_lines,
        task_lines = task_lines,
    )
}

pub async fn request_plan(
    prompt: String,
    api_key: &str,
    model: &str,
) -> Result<String, PlannerError> {
    let request: OpenAIRequest = OpenAIRequest {
        model: model.to_string(),
        messages: vec![
            OpenAIMessage {
                role: "system".to_string(),
                content: "You are a strict JSON day-planning engine. You read a calendar \
                          summary and a task list and reply ONLY with a single JSON array, \
                          with no markdown, no backticks, and no extra text. You never place \
                          a task inside a busy window."
                    .to_string(),
            },
            OpenAIMessage {
                role: "user".to_string(),
                content: prompt,
            },
        ],
        max_tokens: 1500,
        temperature: 0.2,
    };

    let client = reqwest::Client::new();
    let response = client
        .post(OPENAI_URL)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .timeout(Duration::from_secs(PROPOSER_TIMEOUT_SECS))
        .json(&request)
        .send()
        .await
        .map_err(|e| PlannerError::ProposerUnavailable(e.to_string()))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| PlannerError::ProposerUnavailable(e.to_string()))?;

    if !status.is_success() {
        log::error!("OpenAI returned {}: {}", status, text);
        return Err(PlannerError::ProposerUnavailable(format!(
            "request failed with status {}",
            status
        )));
    }

    let parsed: OpenAIResponse = serde_json::from_str(&text).map_err(|e| {
        PlannerError::ProposerUnavailable(format!("unexpected response body: {}", e))
    })?;

    if let Some(choice) = parsed.choices.first() {
        Ok(choice.message.content.clone())
    } else {
        log::error!("No choices in OpenAI response. Raw body:\n{}", text);
        Err(PlannerError::ProposerUnavailable(
            "no choices in response".to_string(),
        ))
    }
}
