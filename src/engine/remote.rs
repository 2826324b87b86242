// ABOUTME: BrowserSession implementation backed by a sidecar browser-driver service
// ABOUTME: Speaks JSON over HTTP; the driver owns the actual browser and challenge handling

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::error::{EngineError, Result};
use super::session::{BrowserSession, LinkMatch, SessionFactory, SessionOptions};

/// Opens sessions against a browser-driver sidecar, one driver session per
/// workflow run. The driver shares the screenshots volume with this process,
/// so screenshot paths are passed through as-is.
pub struct RemoteSessionFactory {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteSessionFactory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Deserialize)]
struct OpenReply {
    session_id: String,
}

#[derive(Deserialize)]
struct CommandReply {
    ok: bool,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
impl SessionFactory for RemoteSessionFactory {
    async fn open_session(&self, options: SessionOptions) -> Result<Box<dyn BrowserSession>> {
        let reply = self
            .client
            .post(format!("{}/session", self.base_url))
            .json(&json!({ "proxy": options.proxy }))
            .send()
            .await
            .map_err(|e| EngineError::BrowserLaunch(e.to_string()))?
            .error_for_status()
            .map_err(|e| EngineError::BrowserLaunch(e.to_string()))?
            .json::<OpenReply>()
            .await
            .map_err(|e| EngineError::BrowserLaunch(e.to_string()))?;

        debug!(session_id = %reply.session_id, "driver session opened");
        Ok(Box::new(RemoteSession {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            session_id: reply.session_id,
        }))
    }
}

pub struct RemoteSession {
    client: reqwest::Client,
    base_url: String,
    session_id: String,
}

impl RemoteSession {
    async fn command(&self, command: &str, args: serde_json::Value) -> Result<serde_json::Value> {
        let reply = self
            .client
            .post(format!(
                "{}/session/{}/command",
                self.base_url, self.session_id
            ))
            .json(&json!({ "command": command, "args": args }))
            .send()
            .await
            .map_err(|e| EngineError::Session(e.to_string()))?
            .error_for_status()
            .map_err(|e| EngineError::Session(e.to_string()))?
            .json::<CommandReply>()
            .await
            .map_err(|e| EngineError::Session(e.to_string()))?;

        if !reply.ok {
            return Err(EngineError::Session(
                reply
                    .error
                    .unwrap_or_else(|| format!("driver rejected command {command}")),
            ));
        }
        Ok(reply.value)
    }

    async fn bool_command(&self, command: &str, args: serde_json::Value) -> Result<bool> {
        Ok(self.command(command, args).await?.as_bool().unwrap_or(false))
    }

    async fn string_command(&self, command: &str, args: serde_json::Value) -> Result<String> {
        Ok(self
            .command(command, args)
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }
}

#[async_trait]
impl BrowserSession for RemoteSession {
    async fn open(&mut self, url: &str, settle: Duration) -> Result<()> {
        self.command(
            "open",
            json!({ "url": url, "settle_seconds": settle.as_secs() }),
        )
        .await?;
        Ok(())
    }

    async fn detect_challenge(&mut self) -> Result<bool> {
        self.bool_command("detect_challenge", json!({})).await
    }

    async fn resolve_challenge(&mut self) -> Result<()> {
        self.command("resolve_challenge", json!({})).await?;
        Ok(())
    }

    async fn is_element_visible(&mut self, locator: &str) -> Result<bool> {
        self.bool_command("is_element_visible", json!({ "locator": locator }))
            .await
    }

    async fn type_text(&mut self, locator: &str, text: &str) -> Result<()> {
        self.command("type", json!({ "locator": locator, "text": text }))
            .await?;
        Ok(())
    }

    async fn click(&mut self, locator: &str) -> Result<()> {
        self.command("click", json!({ "locator": locator })).await?;
        Ok(())
    }

    async fn click_link_text(&mut self, text: &str, mode: LinkMatch) -> Result<bool> {
        let partial = mode == LinkMatch::Partial;
        self.bool_command("click_link_text", json!({ "text": text, "partial": partial }))
            .await
    }

    async fn run_script(&mut self, script: &str) -> Result<serde_json::Value> {
        self.command("run_script", json!({ "script": script })).await
    }

    async fn get_text(&mut self, locator: &str) -> Result<String> {
        self.string_command("get_text", json!({ "locator": locator }))
            .await
    }

    async fn get_current_url(&mut self) -> Result<String> {
        self.string_command("get_current_url", json!({})).await
    }

    async fn get_title(&mut self) -> Result<String> {
        self.string_command("get_title", json!({})).await
    }

    async fn screenshot(&mut self, path: &Path) -> Result<()> {
        self.command("screenshot", json!({ "path": path.to_string_lossy() }))
            .await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.client
            .delete(format!("{}/session/{}", self.base_url, self.session_id))
            .send()
            .await
            .map_err(|e| EngineError::Session(e.to_string()))?
            .error_for_status()
            .map_err(|e| EngineError::Session(e.to_string()))?;
        debug!(session_id = %self.session_id, "driver session closed");
        Ok(())
    }
}
