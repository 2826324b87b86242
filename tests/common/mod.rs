// ABOUTME: Common utilities and fakes for integration tests
// ABOUTME: Provides a scripted BrowserSession double and engine/store test rigs

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Notify;

use renewd::engine::{
    BrowserSession, EngineError, LinkMatch, Result as EngineResult, SessionFactory,
    SessionOptions, WorkflowEngine,
};
use renewd::store::{ActionType, NewTask, Task, TaskStore};

/// Everything the fake sessions record across a test, shared between the
/// factory and every session it opens.
#[derive(Debug, Default)]
pub struct CallLog {
    pub sessions_opened: usize,
    pub opened_urls: Vec<String>,
    pub typed: Vec<(String, String)>,
    pub clicked: Vec<String>,
    pub link_clicks: Vec<String>,
    pub scripts_run: usize,
    pub resolve_calls: usize,
    pub screenshots: Vec<PathBuf>,
    pub close_calls: usize,
}

/// Scripted page behavior for a fake session.
#[derive(Debug, Clone, Default)]
pub struct SessionScript {
    pub current_url: String,
    pub title: String,
    pub page_text: String,
    pub visible: HashSet<String>,
    pub links: Vec<String>,
    pub challenge: bool,
    pub challenge_resolvable: bool,
    pub script_scan_clicks: bool,
    /// Locators that become visible after the keyed locator is clicked.
    pub reveal_on_click: HashMap<String, Vec<String>>,
    /// Delay navigation by this long (for timeout tests).
    pub open_delay: Option<Duration>,
    /// Block navigation until notified (for exclusivity tests).
    pub open_gate: Option<Arc<Notify>>,
    /// Fail navigation with this message.
    pub fail_open: Option<String>,
}

impl SessionScript {
    pub fn new(current_url: &str) -> Self {
        Self {
            current_url: current_url.to_string(),
            title: "Dashboard".to_string(),
            ..Default::default()
        }
    }

    pub fn with_visible(mut self, locator: &str) -> Self {
        self.visible.insert(locator.to_string());
        self
    }

    pub fn with_link(mut self, text: &str) -> Self {
        self.links.push(text.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.page_text = text.to_string();
        self
    }

    pub fn with_challenge(mut self, resolvable: bool) -> Self {
        self.challenge = true;
        self.challenge_resolvable = resolvable;
        self
    }

    pub fn with_script_scan_hit(mut self) -> Self {
        self.script_scan_clicks = true;
        self
    }

    pub fn with_reveal_on_click(mut self, clicked: &str, revealed: &[&str]) -> Self {
        self.reveal_on_click.insert(
            clicked.to_string(),
            revealed.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    pub fn with_open_gate(mut self, gate: Arc<Notify>) -> Self {
        self.open_gate = Some(gate);
        self
    }

    pub fn with_failing_open(mut self, message: &str) -> Self {
        self.fail_open = Some(message.to_string());
        self
    }
}

pub struct FakeSessionFactory {
    script: SessionScript,
    calls: Arc<Mutex<CallLog>>,
    fail_launch: Option<String>,
}

impl FakeSessionFactory {
    pub fn new(script: SessionScript) -> Self {
        Self {
            script,
            calls: Arc::new(Mutex::new(CallLog::default())),
            fail_launch: None,
        }
    }

    pub fn failing_launch(message: &str) -> Self {
        Self {
            script: SessionScript::default(),
            calls: Arc::new(Mutex::new(CallLog::default())),
            fail_launch: Some(message.to_string()),
        }
    }

    pub fn calls(&self) -> Arc<Mutex<CallLog>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl SessionFactory for FakeSessionFactory {
    async fn open_session(&self, _options: SessionOptions) -> EngineResult<Box<dyn BrowserSession>> {
        if let Some(message) = &self.fail_launch {
            return Err(EngineError::BrowserLaunch(message.clone()));
        }
        self.calls.lock().unwrap().sessions_opened += 1;
        Ok(Box::new(FakeSession {
            visible: self.script.visible.clone(),
            challenge_active: self.script.challenge,
            script: self.script.clone(),
            calls: Arc::clone(&self.calls),
        }))
    }
}

pub struct FakeSession {
    script: SessionScript,
    visible: HashSet<String>,
    challenge_active: bool,
    calls: Arc<Mutex<CallLog>>,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn open(&mut self, url: &str, _settle: Duration) -> EngineResult<()> {
        self.calls.lock().unwrap().opened_urls.push(url.to_string());
        if let Some(message) = &self.script.fail_open {
            return Err(EngineError::Session(message.clone()));
        }
        if let Some(gate) = self.script.open_gate.clone() {
            gate.notified().await;
        }
        if let Some(delay) = self.script.open_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn detect_challenge(&mut self) -> EngineResult<bool> {
        Ok(self.challenge_active)
    }

    async fn resolve_challenge(&mut self) -> EngineResult<()> {
        self.calls.lock().unwrap().resolve_calls += 1;
        if self.script.challenge_resolvable {
            self.challenge_active = false;
        }
        Ok(())
    }

    async fn is_element_visible(&mut self, locator: &str) -> EngineResult<bool> {
        Ok(self.visible.contains(locator))
    }

    async fn type_text(&mut self, locator: &str, text: &str) -> EngineResult<()> {
        self.calls
            .lock()
            .unwrap()
            .typed
            .push((locator.to_string(), text.to_string()));
        Ok(())
    }

    async fn click(&mut self, locator: &str) -> EngineResult<()> {
        self.calls.lock().unwrap().clicked.push(locator.to_string());
        if let Some(revealed) = self.script.reveal_on_click.get(locator) {
            for r in revealed {
                self.visible.insert(r.clone());
            }
        }
        Ok(())
    }

    async fn click_link_text(&mut self, text: &str, mode: LinkMatch) -> EngineResult<bool> {
        let hit = match mode {
            LinkMatch::Exact => self.script.links.iter().any(|l| l == text),
            LinkMatch::Partial => self.script.links.iter().any(|l| l.contains(text)),
        };
        if hit {
            self.calls.lock().unwrap().link_clicks.push(text.to_string());
        }
        Ok(hit)
    }

    async fn run_script(&mut self, _script: &str) -> EngineResult<serde_json::Value> {
        self.calls.lock().unwrap().scripts_run += 1;
        Ok(serde_json::Value::Bool(self.script.script_scan_clicks))
    }

    async fn get_text(&mut self, _locator: &str) -> EngineResult<String> {
        Ok(self.script.page_text.clone())
    }

    async fn get_current_url(&mut self) -> EngineResult<String> {
        Ok(self.script.current_url.clone())
    }

    async fn get_title(&mut self) -> EngineResult<String> {
        Ok(self.script.title.clone())
    }

    async fn screenshot(&mut self, path: &Path) -> EngineResult<()> {
        self.calls
            .lock()
            .unwrap()
            .screenshots
            .push(path.to_path_buf());
        Ok(())
    }

    async fn close(&mut self) -> EngineResult<()> {
        self.calls.lock().unwrap().close_calls += 1;
        Ok(())
    }
}

/// A ready-to-run engine over a fake session and a scratch store.
pub struct TestRig {
    pub engine: Arc<WorkflowEngine>,
    pub store: Arc<TaskStore>,
    pub calls: Arc<Mutex<CallLog>>,
    _data_dir: TempDir,
}

pub async fn rig(script: SessionScript) -> TestRig {
    let data_dir = TempDir::new().unwrap();
    let store = Arc::new(TaskStore::open(data_dir.path()).await.unwrap());
    let factory = FakeSessionFactory::new(script);
    let calls = factory.calls();
    let engine = Arc::new(WorkflowEngine::new(
        Arc::new(factory),
        Arc::clone(&store),
        data_dir.path().join("screenshots"),
    ));
    TestRig {
        engine,
        store,
        calls,
        _data_dir: data_dir,
    }
}

pub fn renewal_task(url: &str) -> Task {
    Task::from_new(NewTask {
        name: Some("renewal".to_string()),
        url: url.to_string(),
        username: "a".to_string(),
        password: "b".to_string(),
        ..Default::default()
    })
}

pub fn keepalive_task(url: &str) -> Task {
    let mut task = renewal_task(url);
    task.action_type = ActionType::Keepalive;
    task
}
