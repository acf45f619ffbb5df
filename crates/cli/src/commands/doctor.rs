//! `codeclaw doctor`: diagnose system health.

use std::path::PathBuf;
use std::time::Duration;

use codeclaw_config::AppConfig;
use codeclaw_core::action::GitCommand;
use codeclaw_core::session::SessionStore;
use codeclaw_tools::GitRunner;

pub async fn run(session: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    println!("CodeClaw Doctor: System Diagnostics");
    println!("===================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    let config = match AppConfig::load() {
        Ok(config) => {
            if config_path.exists() {
                println!("  [ok]   Config file valid");
            } else {
                println!("  [warn] No config file, using defaults (run `codeclaw onboard`)");
            }
            config
        }
        Err(e) => {
            println!("  [fail] Config invalid: {e}");
            issues += 1;
            AppConfig::default()
        }
    };

    let store = SessionStore::new(super::session_path(&config, session));
    match store.load() {
        Ok(record) => println!(
            "  [ok]   Session {} ({} files, {} history entries)",
            store.path().display(),
            record.files.len(),
            record.history.len()
        ),
        Err(e) => {
            println!("  [warn] {e}; a fresh session will be started");
            issues += 1;
        }
    }

    let provider = codeclaw_providers::build_from_config(&config.model);
    let timeout = Duration::from_secs(config.model.timeout_secs);
    match tokio::time::timeout(timeout, provider.health_check()).await {
        Ok(Ok(true)) => println!("  [ok]   Model provider '{}' reachable", provider.name()),
        Ok(Ok(false)) | Ok(Err(_)) | Err(_) => {
            println!(
                "  [warn] Model provider '{}' unreachable; requests use keyword rules",
                provider.name()
            );
            issues += 1;
        }
    }

    let cwd = std::env::current_dir()?;
    let git = GitRunner::new(cwd, Duration::from_secs(config.agent.command_timeout_secs), 200);
    match git.run(GitCommand::Status).await {
        Ok(_) => println!("  [ok]   git available"),
        Err(e) => {
            println!("  [warn] git: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
