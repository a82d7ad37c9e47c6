use std::collections::HashMap;
use std::env;
use std::fs;

use crate::error::PlannerError;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_CALENDAR_ID: &str = "primary";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Raw key=value configuration file with environment fallback.
#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, String> {
        let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(format!("Invalid config line {}: {}", idx + 1, line));
            };
            let key = key.trim();
            let mut value = value.trim().to_string();
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = value[1..value.len() - 1].to_string();
            }
            values.insert(key.to_string(), value);
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .cloned()
            .or_else(|| env::var(key).ok())
    }
}

/// Everything the collaborators need, captured once at startup. Nothing
/// reads the environment after this point.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub google_credentials_json: Option<String>,
    pub calendar_id: String,
    pub agent_secret: Option<String>,
    pub bind_addr: String,
}

impl PlannerConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            openai_api_key: config.get("OPENAI_API_KEY"),
            openai_model: config
                .get("OPENAI_MODEL")
                .unwrap_or(DEFAULT_OPENAI_MODEL.to_string()),
            google_credentials_json: config.get("GOOGLE_CREDENTIALS_JSON"),
            calendar_id: config
                .get("CALENDAR_ID")
                .unwrap_or(DEFAULT_CALENDAR_ID.to_string()),
            agent_secret: config.get("AGENT_SECRET"),
            bind_addr: config
                .get("BIND_ADDR")
                .unwrap_or(DEFAULT_BIND_ADDR.to_string()),
        }
    }

    pub fn openai_configured(&self) -> bool {
        self.openai_api_key.is_some()
    }

    pub fn calendar_configured(&self) -> bool {
        self.google_credentials_json.is_some()
    }

    pub fn require_openai_api_key(&self) -> Result<&str, PlannerError> {
        self.openai_api_key
            .as_deref()
            .ok_or(PlannerError::Config("OPENAI_API_KEY not set".to_string()))
    }

    pub fn require_google_credentials(&self) -> Result<&str, PlannerError> {
        self.google_credentials_json
            .as_deref()
            .ok_or(PlannerError::Config(
                "GOOGLE_CREDENTIALS_JSON not set".to_string(),
            ))
    }
}
