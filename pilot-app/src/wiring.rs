use std::sync::Arc;

use anyhow::Result;
use pilot_actors::{ActorSystem, ScriptOutcome, SessionHandle};
use pilot_config::PilotConfig;
use pilot_drivers::browser::driver::WebDriverLauncher;
use pilot_planner::{Commander, Routed, commander_from_config};
use pilot_script::Action;
use pilot_script::inspect::DEFAULT_LANGUAGE;
use serde::Serialize;
use tracing::info;

/// Everything a command needs: the actor system hosting the browser
/// session, and the command router built from the same configuration.
pub struct Pilot {
    system: ActorSystem,
    session: SessionHandle,
    commander: Commander,
    config: PilotConfig,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    #[serde(flatten)]
    pub routed: Routed,
    pub outcome: ScriptOutcome,
}

impl Pilot {
    pub fn start(config: PilotConfig) -> Result<Self> {
        let mut system = ActorSystem::new();
        let launcher = Arc::new(WebDriverLauncher::new(config.browser.clone()));
        let session = SessionHandle::spawn(&mut system, launcher, config.limits.clone());
        let commander = commander_from_config(&config)?;
        info!(
            target: "pilot.app",
            webdriver = %config.browser.webdriver_url,
            remote_tier = config.llm.openai_api_key.is_some(),
            "pilot.started"
        );
        Ok(Self {
            system,
            session,
            commander,
            config,
        })
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn config(&self) -> &PilotConfig {
        &self.config
    }

    /// Route `command`, optionally after opening `start_url`, and execute
    /// the resulting script.
    pub async fn run(&self, command: &str, start_url: Option<&str>) -> Result<RunReport> {
        if let Some(url) = start_url {
            self.session.navigate(url).await?;
        }
        let session = self.session.clone();
        let routed = self
            .commander
            .script_for(command, move || async move {
                session
                    .detect_language()
                    .await
                    .unwrap_or_else(|_| DEFAULT_LANGUAGE.to_string())
            })
            .await;
        let outcome = self.session.execute(routed.actions.clone()).await?;
        Ok(RunReport { routed, outcome })
    }

    pub async fn exec(&self, script: Vec<Action>) -> Result<ScriptOutcome> {
        Ok(self.session.execute(script).await?)
    }

    /// Close the browser, then stop every actor.
    pub async fn shutdown(self) -> Result<()> {
        self.session.close().await;
        self.system.graceful_shutdown().await
    }
}
