// ABOUTME: BrowserSession capability contract consumed by the workflow engine
// ABOUTME: Implemented by the remote driver client in production and by fakes in tests

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use super::error::Result;
use crate::store::Task;

/// How link text should be matched when searching for a clickable link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMatch {
    Exact,
    Partial,
}

/// One live browser session scoped to a single workflow run.
///
/// Implementations encapsulate everything page-level: rendering, element
/// lookup, and recognition of anti-automation interstitials. The engine only
/// sequences calls; it never inspects raw page structure itself.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate to `url` and wait up to `settle` for the page to come to rest.
    async fn open(&mut self, url: &str, settle: Duration) -> Result<()>;

    /// Whether an anti-automation challenge interstitial is currently shown.
    async fn detect_challenge(&mut self) -> Result<bool>;

    /// Best-effort attempt to clear a challenge interstitial.
    async fn resolve_challenge(&mut self) -> Result<()>;

    async fn is_element_visible(&mut self, locator: &str) -> Result<bool>;

    async fn type_text(&mut self, locator: &str, text: &str) -> Result<()>;

    async fn click(&mut self, locator: &str) -> Result<()>;

    /// Click a link by its visible text. Returns whether a matching link was
    /// found and clicked; absence of a match is not an error.
    async fn click_link_text(&mut self, text: &str, mode: LinkMatch) -> Result<bool>;

    /// Evaluate a script in the page and return its result.
    async fn run_script(&mut self, script: &str) -> Result<serde_json::Value>;

    /// Visible text of the element at `locator`.
    async fn get_text(&mut self, locator: &str) -> Result<String>;

    async fn get_current_url(&mut self) -> Result<String>;

    async fn get_title(&mut self) -> Result<String>;

    /// Capture a screenshot of the current page to `path`.
    async fn screenshot(&mut self, path: &Path) -> Result<()>;

    /// Release the session. Called on every exit path of a run.
    async fn close(&mut self) -> Result<()>;
}

/// Per-run session parameters derived from the task definition.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub proxy: Option<String>,
}

impl SessionOptions {
    pub fn from_task(task: &Task) -> Self {
        Self {
            proxy: task.proxy.clone(),
        }
    }
}

/// Produces a fresh [`BrowserSession`] for each run.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open_session(&self, options: SessionOptions) -> Result<Box<dyn BrowserSession>>;
}
