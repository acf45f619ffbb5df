//! `codeclaw agent`: interactive or single-message mode.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use codeclaw_agent::{Orchestrator, TurnOutcome};
use codeclaw_config::AppConfig;
use codeclaw_core::session::{SessionState, SessionStore};
use tokio::sync::mpsc;
use tracing::{debug, info};

const BLANK_HINT: &str = "Type a request, 'help' for the tool list, or 'exit' to quit.";

pub async fn run(message: Option<String>, session: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = SessionStore::new(super::session_path(&config, session));
    let mut state = store.load_state(config.agent.max_history);

    let root = std::env::current_dir()?;
    let provider = codeclaw_providers::build_from_config(&config.model);
    let mut agent = Orchestrator::new(provider, &config, root);
    agent.warm_up(&state);

    match message {
        Some(msg) => {
            if let Some(rejection) = check_length(&msg, config.agent.max_input_chars) {
                eprintln!("  {rejection}");
                return Ok(());
            }
            if let TurnOutcome::Reply(reply) = agent.execute_turn(&mut state, &msg).await {
                println!("{reply}");
            }
            store.save_state(&state);
        }
        None => interactive(&config, &store, &mut state, &mut agent).await?,
    }

    Ok(())
}

async fn interactive(
    config: &AppConfig,
    store: &SessionStore,
    state: &mut SessionState,
    agent: &mut Orchestrator,
) -> Result<(), Box<dyn std::error::Error>> {
    let available = agent.model().is_available().await;

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        CodeClaw: Interactive Mode            ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", config.model.provider);
    println!(
        "  Model:     {} ({})",
        config.model.model,
        if available { "available" } else { "offline, keyword rules only" }
    );
    println!("  Session:   {}", store.path().display());
    println!("  Context:   {} files tracked", state.files().len());
    println!();
    println!("  Type your request and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = spawn_stdin_reader();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.recv() => line,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                println!();
                break;
            }
        };
        let Some(line) = line else {
            debug!("stdin closed");
            println!();
            break;
        };

        if line.trim().is_empty() {
            println!("  {BLANK_HINT}");
            continue;
        }
        if let Some(rejection) = check_length(&line, config.agent.max_input_chars) {
            println!("  {rejection}");
            continue;
        }

        match agent.execute_turn(state, &line).await {
            TurnOutcome::Exit => break,
            TurnOutcome::Reply(reply) => {
                println!();
                for text in reply.lines() {
                    println!("  {text}");
                }
                println!();
            }
        }
        store.save_state(state);
    }

    store.save_state(state);
    println!("  Goodbye!");
    println!();
    Ok(())
}

/// Forward stdin lines to a channel until EOF or a read error.
///
/// The reader is a plain OS thread that is never joined, so a read still
/// blocked on the terminal does not hold up runtime shutdown.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(32);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines().map_while(Result::ok) {
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// A user-facing rejection if `input` exceeds `max_chars`.
fn check_length(input: &str, max_chars: usize) -> Option<String> {
    let len = input.trim().chars().count();
    (len > max_chars).then(|| format!("Input too long ({len} chars, max {max_chars}). Please shorten your request."))
}
