// ABOUTME: Run state machine driving one browser session through a task workflow
// ABOUTME: Catches every capability error at the run boundary and emits a RunResult

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{sleep, timeout};
use tracing::{error, info, instrument, warn};

use super::error::{EngineError, Result};
use super::heuristics::{
    action_scan_script, ActionStrategy, ACTION_KEYWORDS, CONFIRM_LOCATOR, CUSTOM_ACTION_SELECTOR,
    LOGIN_URL_HINTS, PASSWORD_LOCATORS, SUBMIT_LOCATOR, USERNAME_LOCATORS,
};
use super::session::{BrowserSession, LinkMatch, SessionFactory, SessionOptions};
use crate::store::{ActionType, LogEntry, LogLevel, RunResult, Task, TaskStore};

/// Short pause after typing into a form field.
const FIELD_SETTLE: Duration = Duration::from_millis(500);
/// Wait after clicking a continue control in a two-step login.
const TWO_STEP_DELAY: Duration = Duration::from_secs(2);
/// Wait after submitting credentials before the next step.
const LOGIN_SETTLE: Duration = Duration::from_secs(5);
/// Wait before re-checking a challenge after a resolution attempt.
const CHALLENGE_RECHECK_DELAY: Duration = Duration::from_secs(4);
/// Wait after clicking the action control before verification.
const POST_CLICK_DELAY: Duration = Duration::from_secs(5);
/// Final settle before reading the page text for verification.
const VERIFY_DELAY: Duration = Duration::from_secs(2);
/// Budget for force-closing a session after a run ends.
const CLOSE_BUDGET: Duration = Duration::from_secs(10);

/// Executes one task workflow against a browser session and produces a
/// [`RunResult`]. Errors never propagate past [`WorkflowEngine::run`].
pub struct WorkflowEngine {
    factory: Arc<dyn SessionFactory>,
    store: Arc<TaskStore>,
    screenshot_dir: PathBuf,
}

/// A run that reached its terminal success state.
struct Completion {
    message: String,
    confirmed: bool,
}

/// Per-run log recorder. Entries are kept in order for the RunResult and
/// mirrored to the task's durable log file.
struct RunRecorder<'a> {
    store: &'a TaskStore,
    task_id: &'a str,
    entries: Vec<LogEntry>,
    screenshot_url: Option<String>,
}

impl<'a> RunRecorder<'a> {
    fn new(store: &'a TaskStore, task_id: &'a str) -> Self {
        Self {
            store,
            task_id,
            entries: Vec::new(),
            screenshot_url: None,
        }
    }

    async fn log(&mut self, level: LogLevel, message: String) {
        match level {
            LogLevel::Info => info!(task_id = self.task_id, "{message}"),
            LogLevel::Error => error!(task_id = self.task_id, "{message}"),
        }
        if let Err(e) = self.store.append_log(self.task_id, level, &message).await {
            warn!(task_id = self.task_id, error = %e, "failed to mirror run log entry");
        }
        self.entries.push(LogEntry::new(level, message));
    }

    async fn info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message.into()).await;
    }

    async fn error(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Error, message.into()).await;
    }
}

impl WorkflowEngine {
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        store: Arc<TaskStore>,
        screenshot_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            factory,
            store,
            screenshot_dir: screenshot_dir.into(),
        }
    }

    /// Execute one run for `task`. Always returns a RunResult; capability
    /// errors, not-found conditions, and timeouts all become failed results
    /// with a human-readable message.
    #[instrument(skip(self, task), fields(task_name = %task.name, action = %task.action_type))]
    pub async fn run(&self, task: &Task) -> RunResult {
        let mut rec = RunRecorder::new(&self.store, &task.id);
        rec.info(format!("starting {} run: {}", task.action_type, task.url))
            .await;

        let budget = Duration::from_secs(task.timeout.max(1));
        let outcome = match self
            .factory
            .open_session(SessionOptions::from_task(task))
            .await
        {
            Ok(mut session) => {
                rec.info("browser session started").await;

                let outcome = match timeout(
                    budget,
                    self.execute(task, session.as_mut(), &mut rec),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(EngineError::Timeout(task.timeout.max(1))),
                };

                // Diagnostic screenshot where the session is still reachable.
                if let Err(ref e) = outcome {
                    if !matches!(e, EngineError::Timeout(_)) && rec.screenshot_url.is_none() {
                        self.capture(session.as_mut(), "error", &mut rec).await;
                    }
                }

                // The session is released on every exit path; a wedged driver
                // gets a bounded force-close.
                if timeout(CLOSE_BUDGET, session.close()).await.is_err() {
                    warn!(task_id = %task.id, "session close timed out");
                }

                outcome
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(completion) => {
                rec.info(completion.message.clone()).await;
                RunResult::completed(
                    completion.message,
                    completion.confirmed,
                    rec.screenshot_url.clone(),
                    rec.entries,
                )
            }
            Err(e) => {
                let message = e.to_string();
                rec.error(format!("run failed: {message}")).await;
                RunResult::failed(message, rec.screenshot_url.clone(), rec.entries)
            }
        }
    }

    /// The step sequence proper. Runs inside the overall timeout budget.
    async fn execute(
        &self,
        task: &Task,
        session: &mut dyn BrowserSession,
        rec: &mut RunRecorder<'_>,
    ) -> Result<Completion> {
        let settle = Duration::from_secs(task.wait_time);
        let start_url = task.start_url();

        rec.info(format!("opening {start_url}")).await;
        session.open(start_url, settle).await?;
        self.clear_challenge(session, rec).await?;

        let explicit_login = task.login_url.is_some();
        let needs_login = explicit_login || self.looks_like_login_page(session).await?;

        let mut logged_in = false;
        if needs_login {
            self.perform_login(task, session, rec).await?;
            logged_in = true;
            self.clear_challenge(session, rec).await?;
        }

        // Login went through a dedicated entry point; move to the real target.
        if logged_in && explicit_login && task.login_url.as_deref() != Some(task.url.as_str()) {
            rec.info(format!("login complete, navigating to target: {}", task.url))
                .await;
            session.open(&task.url, settle).await?;
            self.clear_challenge(session, rec).await?;
        }

        if task.action_type == ActionType::Keepalive {
            rec.info("keepalive run: page visit completed").await;
            self.capture(session, "keepalive", rec).await;
            return Ok(Completion {
                message: "page visit succeeded (keepalive)".to_string(),
                confirmed: true,
            });
        }

        rec.info("searching for action control").await;
        if !self.find_and_click_action(task, session, rec).await? {
            rec.error("action control not found").await;
            self.capture(session, "error", rec).await;
            return Err(EngineError::ActionNotFound);
        }

        rec.info("action control clicked, waiting for result").await;
        sleep(POST_CLICK_DELAY).await;
        self.clear_challenge(session, rec).await?;

        if self.dismiss_confirmation(session).await {
            rec.info("dismissed confirmation dialog").await;
        }
        sleep(VERIFY_DELAY).await;

        let page_text = session.get_text("body").await?.to_lowercase();
        self.capture(session, "success", rec).await;

        let keywords = task.effective_success_keywords();
        if keywords
            .iter()
            .any(|kw| page_text.contains(&kw.to_lowercase()))
        {
            rec.info("success keyword detected on page").await;
            Ok(Completion {
                message: "renewal confirmed".to_string(),
                confirmed: true,
            })
        } else {
            rec.info("no success keyword detected, reporting provisional success")
                .await;
            Ok(Completion {
                message: "action clicked but success could not be verified".to_string(),
                confirmed: false,
            })
        }
    }

    /// Challenge handling is best-effort: a resolution failure or a
    /// still-present interstitial is logged and the workflow proceeds,
    /// letting later steps fail naturally.
    async fn clear_challenge(
        &self,
        session: &mut dyn BrowserSession,
        rec: &mut RunRecorder<'_>,
    ) -> Result<()> {
        if !session.detect_challenge().await? {
            return Ok(());
        }
        rec.info("challenge interstitial detected, attempting resolution")
            .await;
        if let Err(e) = session.resolve_challenge().await {
            rec.error(format!("challenge resolution failed: {e}")).await;
        }
        sleep(CHALLENGE_RECHECK_DELAY).await;
        if session.detect_challenge().await? {
            rec.error("challenge still present, continuing anyway").await;
        }
        Ok(())
    }

    /// Login is required when the page exposes a password input or the
    /// current URL looks login-like. An explicit login_url is handled by the
    /// caller before this check.
    async fn looks_like_login_page(&self, session: &mut dyn BrowserSession) -> Result<bool> {
        if session.is_element_visible("input[type='password']").await? {
            return Ok(true);
        }
        let url = session.get_current_url().await?.to_lowercase();
        Ok(LOGIN_URL_HINTS.iter().any(|hint| url.contains(hint)))
    }

    async fn first_visible(
        &self,
        session: &mut dyn BrowserSession,
        locators: &[&'static str],
    ) -> Result<Option<&'static str>> {
        for locator in locators {
            if session.is_element_visible(locator).await? {
                return Ok(Some(locator));
            }
        }
        Ok(None)
    }

    async fn perform_login(
        &self,
        task: &Task,
        session: &mut dyn BrowserSession,
        rec: &mut RunRecorder<'_>,
    ) -> Result<()> {
        rec.info("filling login form").await;

        let Some(user_field) = self.first_visible(session, USERNAME_LOCATORS).await? else {
            rec.error("username field not found").await;
            return Err(EngineError::FieldNotFound("username"));
        };
        session.type_text(user_field, &task.username).await?;
        sleep(FIELD_SETTLE).await;

        let mut pass_field = self.first_visible(session, PASSWORD_LOCATORS).await?;

        // Two-step flows reveal the password field only after a continue
        // click. One retry before giving up.
        if pass_field.is_none() && session.is_element_visible(SUBMIT_LOCATOR).await? {
            rec.info("no password field yet, trying two-step login").await;
            session.click(SUBMIT_LOCATOR).await?;
            sleep(TWO_STEP_DELAY).await;
            pass_field = self.first_visible(session, PASSWORD_LOCATORS).await?;
        }

        let Some(pass_field) = pass_field else {
            rec.error("password field not found").await;
            return Err(EngineError::FieldNotFound("password"));
        };

        session.type_text(pass_field, &task.password).await?;
        sleep(FIELD_SETTLE).await;
        session.click(SUBMIT_LOCATOR).await?;
        rec.info("submitted login form").await;
        sleep(LOGIN_SETTLE).await;
        Ok(())
    }

    /// Run the action-search strategies in priority order, stopping at the
    /// first one that clicks a control.
    async fn find_and_click_action(
        &self,
        task: &Task,
        session: &mut dyn BrowserSession,
        rec: &mut RunRecorder<'_>,
    ) -> Result<bool> {
        for strategy in ActionStrategy::ORDER {
            let clicked = match strategy {
                ActionStrategy::CustomSelector => {
                    match task.selectors.get(CUSTOM_ACTION_SELECTOR) {
                        Some(selector) if session.is_element_visible(selector).await? => {
                            session.click(selector).await?;
                            rec.info(format!("clicked custom selector: {selector}")).await;
                            true
                        }
                        _ => false,
                    }
                }
                ActionStrategy::ExactLinkText => {
                    let mut clicked = false;
                    for keyword in ACTION_KEYWORDS {
                        if session.click_link_text(keyword, LinkMatch::Exact).await? {
                            rec.info(format!("clicked link by exact text: {keyword}")).await;
                            clicked = true;
                            break;
                        }
                    }
                    clicked
                }
                ActionStrategy::PartialLinkText => {
                    let mut clicked = false;
                    for keyword in ACTION_KEYWORDS {
                        if session.click_link_text(keyword, LinkMatch::Partial).await? {
                            rec.info(format!("clicked link by partial text: {keyword}"))
                                .await;
                            clicked = true;
                            break;
                        }
                    }
                    clicked
                }
                ActionStrategy::ScriptScan => {
                    let value = session.run_script(&action_scan_script()).await?;
                    let clicked = value.as_bool().unwrap_or(false);
                    if clicked {
                        rec.info("clicked control found by script scan").await;
                    }
                    clicked
                }
            };
            if clicked {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Best-effort dismissal of an optional confirmation dialog. Failure is a
    /// visible boolean branch, never an error.
    async fn dismiss_confirmation(&self, session: &mut dyn BrowserSession) -> bool {
        match session.is_element_visible(CONFIRM_LOCATOR).await {
            Ok(true) => session.click(CONFIRM_LOCATOR).await.is_ok(),
            _ => false,
        }
    }

    /// Capture a screenshot named `{outcome}_{YYYYMMDDHHMMSS}.png` and record
    /// its reference URL. Capture failures are logged and otherwise ignored.
    async fn capture(
        &self,
        session: &mut dyn BrowserSession,
        outcome: &str,
        rec: &mut RunRecorder<'_>,
    ) {
        let name = format!("{outcome}_{}.png", Utc::now().format("%Y%m%d%H%M%S"));
        let path = self.screenshot_dir.join(&name);
        match session.screenshot(&path).await {
            Ok(()) => {
                rec.screenshot_url = Some(format!("/api/screenshots/{name}"));
            }
            Err(e) => {
                rec.error(format!("screenshot capture failed: {e}")).await;
            }
        }
    }
}
