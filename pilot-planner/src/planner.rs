//! Command → action script, over the model tiers with a heuristic floor.
use pilot_config::SearchSettings;
use pilot_llm::{ModelTiers, SharedLlm};
use pilot_script::Action;
use serde::Serialize;
use tracing::{debug, info};

use crate::extract::script_from_reply;
use crate::heuristics::heuristic_plan;

const ALLOWED_TYPES: &str = "navigate, click, click_by_text, fill, type_text, type_code, \
clear_editor, set_code, press_key, wait, hover, scroll, screenshot, learn_site, focus_editor, \
write_code, run_code, get_output, extract_tables";

fn system_prompt(search: &SearchSettings) -> String {
    format!(
        "You translate a user's browsing command into a JSON array of browser actions.\n\
         Each action is an object with a \"type\" field. Allowed types: {ALLOWED_TYPES}.\n\
         Fields: navigate{{url}}, click{{selector}}, click_by_text{{text}}, fill{{selector,text}}, \
         type_text{{text}}, press_key{{key,selector?}}, wait{{duration}} (ms), hover{{selector}}, \
         scroll{{deltaY}}, screenshot{{path}}, write_code{{text,delay?}}, set_code{{text}}.\n\
         To search the web, prefer {home} and fill {query} before pressing Enter.\n\
         Reply with the JSON array only.",
        home = search.home_url,
        query = search.query_selector,
    )
}

fn user_prompt(command: &str) -> String {
    format!("Command: {command}\nOutput: JSON array of actions.")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    LocalJson,
    LocalText,
    Remote,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub tier: PlanTier,
    pub actions: Vec<Action>,
}

#[derive(Clone)]
pub struct Planner {
    tiers: ModelTiers,
    search: SearchSettings,
}

impl Planner {
    pub fn new(tiers: ModelTiers, search: SearchSettings) -> Self {
        Self { tiers, search }
    }

    pub fn search(&self) -> &SearchSettings {
        &self.search
    }

    async fn free_form(&self, client: &SharedLlm, system: &str, prompt: &str) -> Option<Vec<Action>> {
        match client.generate(prompt, Some(system), None, Some(0.0)).await {
            Ok(resp) => script_from_reply(&resp.text),
            Err(e) => {
                debug!(target: "pilot.planner", provider = client.provider(), error = %e, "plan.tier_failed");
                None
            }
        }
    }

    async fn json_mode(&self, client: &SharedLlm, system: &str, prompt: &str) -> Option<Vec<Action>> {
        if !client.supports_json_mode() {
            return None;
        }
        match client.generate_json(prompt, Some(system)).await {
            Ok(resp) => script_from_reply(&resp.text),
            Err(e) => {
                debug!(target: "pilot.planner", provider = client.provider(), error = %e, "plan.tier_failed");
                None
            }
        }
    }

    /// Never fails: when every model tier is down or unusable, the heuristic
    /// tier answers.
    pub async fn plan(&self, command: &str) -> Plan {
        let system = system_prompt(&self.search);
        let prompt = user_prompt(command);

        if let Some(local) = &self.tiers.local {
            if let Some(actions) = self.json_mode(local, &system, &prompt).await {
                return self.chosen(PlanTier::LocalJson, actions);
            }
            if let Some(actions) = self.free_form(local, &system, &prompt).await {
                return self.chosen(PlanTier::LocalText, actions);
            }
        }
        if let Some(remote) = &self.tiers.remote {
            if let Some(actions) = self.free_form(remote, &system, &prompt).await {
                return self.chosen(PlanTier::Remote, actions);
            }
        }
        self.chosen(PlanTier::Heuristic, heuristic_plan(command, &self.search))
    }

    fn chosen(&self, tier: PlanTier, actions: Vec<Action>) -> Plan {
        info!(target: "pilot.planner", ?tier, steps = actions.len(), "plan.chosen");
        Plan { tier, actions }
    }
}
