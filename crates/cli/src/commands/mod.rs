pub mod agent;
pub mod doctor;
pub mod onboard;
pub mod status;

use std::path::PathBuf;

use codeclaw_config::AppConfig;

/// The session file: `--session` if given, else `agent.session_file`.
pub fn session_path(config: &AppConfig, flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| PathBuf::from(&config.agent.session_file))
}
