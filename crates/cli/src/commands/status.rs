//! `codeclaw status`: show the effective configuration.

use std::path::PathBuf;

use codeclaw_config::AppConfig;

pub async fn run(session: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    println!("CodeClaw Status");
    println!("===============");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Session:      {}", super::session_path(&config, session).display());
    println!("  Provider:     {}", config.model.provider);
    println!("  Model:        {}", config.model.model);
    println!("  Endpoint:     {}", config.model.base_url.as_deref().unwrap_or("(provider default)"));
    println!("  Temperature:  {}", config.model.temperature);
    println!("  Model timeout: {}s", config.model.timeout_secs);
    println!(
        "  Cache:        {} entries, {}s TTL",
        config.cache.max_entries, config.cache.ttl_secs
    );
    println!("  Index:        refresh every {}s", config.index.refresh_secs);
    println!("  Actions/turn: {}", config.agent.max_actions_per_turn);

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file, using defaults (run `codeclaw onboard` to create one)");
    }

    Ok(())
}
