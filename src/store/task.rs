// ABOUTME: Task, run result, and log entry data model
// ABOUTME: Field names match the persisted JSON snapshot contract

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Built-in multilingual fallback used when a task supplies no success keywords.
pub const DEFAULT_SUCCESS_KEYWORDS: &[&str] = &["success", "renewed", "extended", "成功", "已续期"];

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_WAIT_SECS: u64 = 5;
pub const DEFAULT_INTERVAL_HOURS: u64 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// Navigate, log in if needed, then locate and click the renew control.
    Renewal,
    /// Navigate and log in only; the page visit itself is the point.
    Keepalive,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Renewal => write!(f, "renewal"),
            ActionType::Keepalive => write!(f, "keepalive"),
        }
    }
}

/// A persisted automation definition.
///
/// Credentials are stored in plaintext in the snapshot file. That matches the
/// persisted contract of the deployments this service manages; the data dir is
/// expected to be private to the service user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub login_url: Option<String>,
    pub username: String,
    pub password: String,
    pub action_type: ActionType,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default)]
    pub selectors: IndexMap<String, String>,
    /// Overall run budget in seconds.
    pub timeout: u64,
    /// Post-navigation settle time in seconds.
    pub wait_time: u64,
    #[serde(default)]
    pub success_keywords: Vec<String>,
    /// Recurrence period in hours.
    pub interval: u64,
    pub enabled: bool,
    #[serde(rename = "lastRun", default)]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(rename = "lastResult", default)]
    pub last_result: Option<RunResult>,
}

/// Fields accepted on task creation. The id is always assigned server-side.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub login_url: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub action_type: Option<ActionType>,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default)]
    pub selectors: IndexMap<String, String>,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub wait_time: Option<u64>,
    #[serde(default)]
    pub success_keywords: Vec<String>,
    #[serde(default)]
    pub interval: Option<u64>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// Partial update applied over an existing task. An `id` field is accepted
/// but silently ignored; task ids are immutable after creation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub login_url: Option<Option<String>>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub action_type: Option<ActionType>,
    #[serde(default)]
    pub proxy: Option<Option<String>>,
    #[serde(default)]
    pub selectors: Option<IndexMap<String, String>>,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub wait_time: Option<u64>,
    #[serde(default)]
    pub success_keywords: Option<Vec<String>>,
    #[serde(default)]
    pub interval: Option<u64>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl Task {
    /// Build a stored task from creation fields, assigning a fresh id and
    /// filling defaults for omitted optional fields.
    pub fn from_new(fields: NewTask) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: fields.name.unwrap_or_else(|| "Unnamed Task".to_string()),
            url: fields.url,
            login_url: fields.login_url.filter(|u| !u.is_empty()),
            username: fields.username,
            password: fields.password,
            action_type: fields.action_type.unwrap_or(ActionType::Renewal),
            proxy: fields.proxy.filter(|p| !p.is_empty()),
            selectors: fields.selectors,
            timeout: fields.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS),
            wait_time: fields.wait_time.unwrap_or(DEFAULT_WAIT_SECS),
            success_keywords: fields.success_keywords,
            interval: fields.interval.unwrap_or(DEFAULT_INTERVAL_HOURS),
            enabled: fields.enabled.unwrap_or(true),
            last_run: None,
            last_result: None,
        }
    }

    /// Merge a partial update into this task. `patch.id` is ignored.
    pub fn apply_patch(&mut self, patch: TaskPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(url) = patch.url {
            self.url = url;
        }
        if let Some(login_url) = patch.login_url {
            self.login_url = login_url.filter(|u| !u.is_empty());
        }
        if let Some(username) = patch.username {
            self.username = username;
        }
        if let Some(password) = patch.password {
            self.password = password;
        }
        if let Some(action_type) = patch.action_type {
            self.action_type = action_type;
        }
        if let Some(proxy) = patch.proxy {
            self.proxy = proxy.filter(|p| !p.is_empty());
        }
        if let Some(selectors) = patch.selectors {
            self.selectors = selectors;
        }
        if let Some(timeout) = patch.timeout {
            self.timeout = timeout;
        }
        if let Some(wait_time) = patch.wait_time {
            self.wait_time = wait_time;
        }
        if let Some(success_keywords) = patch.success_keywords {
            self.success_keywords = success_keywords;
        }
        if let Some(interval) = patch.interval {
            self.interval = interval;
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
    }

    /// Success keywords for this task, falling back to the built-in set.
    pub fn effective_success_keywords(&self) -> Vec<String> {
        if self.success_keywords.is_empty() {
            DEFAULT_SUCCESS_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect()
        } else {
            self.success_keywords.clone()
        }
    }

    /// Start page for a run: the explicit login entry point when given,
    /// otherwise the target url itself.
    pub fn start_url(&self) -> &str {
        self.login_url.as_deref().unwrap_or(&self.url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub time: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            time: Utc::now(),
            level,
            message: message.into(),
        }
    }
}

/// Outcome of one workflow execution. Overwrites the task's `lastResult`;
/// no run history is kept beyond the latest record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub success: bool,
    /// Whether success was confirmed by a keyword match on the page text.
    /// A renewal click without textual confirmation reports `success=true`
    /// with `confirmed=false` so callers can choose their own strictness.
    pub confirmed: bool,
    pub message: String,
    #[serde(default)]
    pub screenshot_url: Option<String>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    pub timestamp: DateTime<Utc>,
}

impl RunResult {
    pub fn completed(
        message: impl Into<String>,
        confirmed: bool,
        screenshot_url: Option<String>,
        logs: Vec<LogEntry>,
    ) -> Self {
        Self {
            success: true,
            confirmed,
            message: message.into(),
            screenshot_url,
            logs,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(
        message: impl Into<String>,
        screenshot_url: Option<String>,
        logs: Vec<LogEntry>,
    ) -> Self {
        Self {
            success: false,
            confirmed: false,
            message: message.into(),
            screenshot_url,
            logs,
            timestamp: Utc::now(),
        }
    }
}
