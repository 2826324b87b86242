// ABOUTME: Application bootstrap wiring config, store, engine, and orchestrator
// ABOUTME: Dispatches CLI commands against the orchestrator's lifecycle surface

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::args::{AddArgs, Args, Command};
use super::config::{Config, LoggingConfig};
use crate::engine::heuristics::CUSTOM_ACTION_SELECTOR;
use crate::engine::{RemoteSessionFactory, WorkflowEngine};
use crate::orchestrator::Orchestrator;
use crate::store::{ActionType, NewTask, TaskStore};

pub struct App {
    orchestrator: Arc<Orchestrator>,
}

impl App {
    pub async fn new(args: &Args) -> Result<Self> {
        let mut config = Config::load(args.config.clone())?;
        if let Some(dir) = &args.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(level) = &args.log_level {
            config.logging.level = level.clone();
        }

        init_tracing(&config.logging);

        tokio::fs::create_dir_all(&config.screenshot_dir)
            .await
            .with_context(|| {
                format!(
                    "failed to create screenshot dir {}",
                    config.screenshot_dir.display()
                )
            })?;

        let store = Arc::new(TaskStore::open(&config.data_dir).await?);
        let factory = Arc::new(RemoteSessionFactory::new(config.driver_url.clone()));
        let engine = Arc::new(WorkflowEngine::new(
            factory,
            Arc::clone(&store),
            config.screenshot_dir.clone(),
        ));
        let orchestrator = Arc::new(Orchestrator::new(
            store,
            engine,
            config.max_concurrent_runs,
        ));

        Ok(Self { orchestrator })
    }

    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Serve => self.serve().await,
            Command::Add(fields) => self.add(fields).await,
            Command::List => self.list().await,
            Command::Show { id } => self.show(&id).await,
            Command::Run { id } => self.run_task(&id).await,
            Command::Enable { id } => self.set_enabled(&id, true).await,
            Command::Disable { id } => self.set_enabled(&id, false).await,
            Command::Delete { id } => self.delete(&id).await,
            Command::Logs { id } => self.logs(&id).await,
        }
    }

    async fn serve(&self) -> Result<()> {
        self.orchestrator.start().await;
        info!("scheduler running, press ctrl-c to stop");
        tokio::signal::ctrl_c().await?;
        self.orchestrator.shutdown();
        info!("shutting down");
        Ok(())
    }

    async fn add(&self, fields: AddArgs) -> Result<()> {
        let action_type = match fields.action_type.as_str() {
            "renewal" => ActionType::Renewal,
            "keepalive" => ActionType::Keepalive,
            other => anyhow::bail!("unknown action type: {other} (expected renewal or keepalive)"),
        };
        let mut selectors = indexmap::IndexMap::new();
        if let Some(selector) = fields.renew_selector {
            selectors.insert(CUSTOM_ACTION_SELECTOR.to_string(), selector);
        }

        let task = self
            .orchestrator
            .create(NewTask {
                name: fields.name,
                url: fields.url,
                login_url: fields.login_url,
                username: fields.username,
                password: fields.password,
                action_type: Some(action_type),
                proxy: fields.proxy,
                selectors,
                timeout: fields.timeout,
                wait_time: fields.wait_time,
                success_keywords: fields.success_keywords,
                interval: fields.interval,
                enabled: Some(!fields.disabled),
            })
            .await?;
        println!("created {}  {}", task.id, task.name);
        Ok(())
    }

    async fn list(&self) -> Result<()> {
        let tasks = self.orchestrator.list().await;
        if tasks.is_empty() {
            println!("no tasks");
            return Ok(());
        }
        for task in tasks {
            let state = if task.enabled { "enabled" } else { "disabled" };
            let last = match &task.last_result {
                Some(result) if result.success => "ok",
                Some(_) => "failed",
                None => "never run",
            };
            println!(
                "{}  {}  [{} / every {}h / {}]  {}",
                task.id, task.name, task.action_type, task.interval, state, last
            );
        }
        Ok(())
    }

    async fn show(&self, id: &str) -> Result<()> {
        let task = self.orchestrator.get(id).await?;
        println!("{}", serde_json::to_string_pretty(&task)?);
        Ok(())
    }

    async fn run_task(&self, id: &str) -> Result<()> {
        let result = self.orchestrator.run_now(id).await?;
        let outcome = if result.success { "success" } else { "failure" };
        println!("{outcome}: {}", result.message);
        if let Some(screenshot) = &result.screenshot_url {
            println!("screenshot: {screenshot}");
        }
        Ok(())
    }

    async fn set_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        let task = self.orchestrator.set_enabled(id, enabled).await?;
        println!(
            "{} is now {}",
            task.name,
            if task.enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if self.orchestrator.delete(id).await? {
            println!("deleted {id}");
        } else {
            println!("no such task: {id}");
        }
        Ok(())
    }

    async fn logs(&self, id: &str) -> Result<()> {
        let logs = self.orchestrator.get_logs(id).await?;
        if logs.is_empty() {
            println!("no logs for {id}");
        } else {
            print!("{logs}");
        }
        Ok(())
    }
}

fn init_tracing(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
