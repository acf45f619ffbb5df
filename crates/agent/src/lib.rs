//! Turn orchestration for CodeClaw.
//!
//! A user request flows through three layers:
//!
//! 1. **Model client** ([`model`]): health-checked, time-bounded provider
//!    calls in front of a TTL response cache ([`cache`])
//! 2. **Intent parser** ([`intent`], [`rules`]): request text to raw
//!    actions, falling back to a keyword table whenever the model is
//!    unreachable or its output is unusable
//! 3. **Orchestrator** ([`orchestrator`]): validates each action, dispatches
//!    it to a tool and aggregates the results for the user

pub mod cache;
pub mod intent;
pub mod model;
pub mod orchestrator;
pub mod rules;
pub mod stats;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use cache::ResponseCache;
pub use intent::{IntentParser, IntentSource, ParsedIntent};
pub use model::ModelClient;
pub use orchestrator::{
    AgentPhase, EXIT_COMMANDS, NOT_PROCESSED, NOTHING_TO_DO, Orchestrator, TurnOutcome, is_exit_command,
};
pub use stats::Stats;
