//! Natural-language commands to action scripts.
//!
//! Commands first meet the intent router ([`intent::classify`]); anything it
//! does not recognize goes to the [`Planner`], which walks the model tiers
//! (local JSON mode, local free-form, remote) and lands on keyword heuristics
//! when none of them yields a usable script. Code generation follows the
//! same ladder and ends in a small library of offline snippets.
pub mod codegen;
pub mod extract;
pub mod heuristics;
pub mod intent;
pub mod planner;
pub mod stubs;

pub use codegen::{CodeGenerator, CodeTier, GeneratedCode};
pub use intent::{classify, Commander, Intent, RouteOrigin, Routed};
pub use planner::{Plan, PlanTier, Planner};

use pilot_config::PilotConfig;
use pilot_llm::ModelTiers;

/// Build the router, planner and code generator from one configuration.
pub fn commander_from_config(config: &PilotConfig) -> pilot_common::Result<Commander> {
    let tiers = ModelTiers::from_settings(&config.llm)?;
    Ok(Commander::new(
        Planner::new(tiers.clone(), config.search.clone()),
        CodeGenerator::new(tiers),
    ))
}
