//! End-to-end tests for CodeClaw turns.
//!
//! These drive the full pipeline from user text to aggregated reply:
//! intent parsing (model tier and keyword rules), action validation, tool
//! dispatch against a temporary working tree and session persistence.

use std::sync::{Arc, Mutex};

use codeclaw_agent::{NOTHING_TO_DO, Orchestrator, TurnOutcome};
use codeclaw_config::AppConfig;
use codeclaw_core::error::ProviderError;
use codeclaw_core::provider::{CompletionRequest, Provider};
use codeclaw_core::session::{SessionState, SessionStore};
use codeclaw_tools::templates;
use serde_json::json;
use tempfile::TempDir;

// ── Mock Provider ────────────────────────────────────────────────────────

/// A provider that replays scripted completions and records prompts.
struct ScriptedProvider {
    healthy: bool,
    responses: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<String>) -> Self {
        Self {
            healthy: true,
            responses: Mutex::new(responses),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn offline() -> Self {
        Self {
            healthy: false,
            ..Self::new(vec![])
        }
    }

    fn plan(actions: serde_json::Value) -> String {
        json!({ "response": "On it", "actions": actions }).to_string()
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(request.prompt);
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(ProviderError::InvalidResponse("no scripted response left".into()));
        }
        Ok(responses.remove(0))
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(self.healthy)
    }
}

struct Workspace {
    dir: TempDir,
    agent: Orchestrator,
    session: SessionState,
}

impl Workspace {
    fn new(provider: Arc<ScriptedProvider>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let agent = Orchestrator::new(provider, &AppConfig::default(), dir.path());
        Self {
            dir,
            agent,
            session: SessionState::default(),
        }
    }

    fn write(&self, path: &str, content: &str) {
        let full = self.dir.path().join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
    }

    fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(path)).unwrap()
    }

    async fn turn(&mut self, text: &str) -> String {
        match self.agent.execute_turn(&mut self.session, text).await {
            TurnOutcome::Reply(reply) => reply,
            TurnOutcome::Exit => panic!("unexpected exit for {text:?}"),
        }
    }
}

// ── E2E: Offline (keyword rules) ─────────────────────────────────────────

#[tokio::test]
async fn e2e_offline_create_then_read() {
    let mut ws = Workspace::new(Arc::new(ScriptedProvider::offline()));

    let reply = ws.turn("create x.py").await;
    assert!(reply.starts_with("Created x.py"), "{reply}");
    assert_eq!(ws.read("x.py"), templates::template_for("x.py"));

    let reply = ws.turn("read x.py").await;
    assert!(reply.starts_with("Contents of x.py"), "{reply}");
    assert!(reply.contains("Hello from x.py!"));

    assert_eq!(ws.session.history(), ["create x.py", "read x.py"]);
    assert_eq!(ws.session.paths(), vec!["x.py"]);
}

#[tokio::test]
async fn e2e_offline_find_python_files_then_search_content() {
    let mut ws = Workspace::new(Arc::new(ScriptedProvider::offline()));
    ws.write("src/a.py", "def foo(): pass\n");
    ws.write("src/b.py", "def bar(): pass\n");
    ws.write("README.md", "docs\n");

    let reply = ws.turn("find python files").await;
    assert!(reply.starts_with("Found 2 files:"), "{reply}");
    assert_eq!(ws.session.paths(), vec!["src/a.py", "src/b.py"]);

    let reply = ws.turn("search for foo").await;
    assert_eq!(reply, "Found 1 matches:\n  a.py:1 - def foo(): pass");
}

#[tokio::test]
async fn e2e_offline_context_lifecycle() {
    let mut ws = Workspace::new(Arc::new(ScriptedProvider::offline()));
    ws.write("notes.md", "hello\n");

    assert!(ws.turn("add notes.md to context").await.starts_with("Added 1 files"));
    assert!(ws.turn("add notes.md to context").await.starts_with("Added 0 files"));
    assert_eq!(ws.turn("show context").await, "Context files (1):\n  1. notes.md");
    assert_eq!(ws.turn("clear context").await, "Cleared 1 files from context");
    assert_eq!(ws.turn("show context").await, "No files in context");
}

#[tokio::test]
async fn e2e_exit_is_not_recorded() {
    let mut ws = Workspace::new(Arc::new(ScriptedProvider::offline()));
    ws.turn("help").await;

    let outcome = ws.agent.execute_turn(&mut ws.session, "  QUIT ").await;
    assert_eq!(outcome, TurnOutcome::Exit);
    assert_eq!(ws.session.history(), ["help"]);
}

// ── E2E: Model tier ──────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_model_plan_runs_every_action() {
    let provider = Arc::new(ScriptedProvider::new(vec![ScriptedProvider::plan(json!([
        { "tool": "create_file", "params": { "filename": "tools/calculator.py" } },
        { "tool": "teleport" },
        { "tool": "show_context" },
    ]))]));
    let mut ws = Workspace::new(provider.clone());

    let reply = ws.turn("make me a calculator and show context").await;
    let parts: Vec<&str> = reply.split("\n\n").collect();
    assert_eq!(parts.len(), 3, "{reply}");
    assert!(parts[0].starts_with("Created tools/calculator.py"));
    assert_eq!(parts[1], "Unknown tool: teleport");
    assert_eq!(parts[2], "Context files (1):\n  1. tools/calculator.py");

    assert_eq!(ws.read("tools/calculator.py"), templates::template_for("calculator.py"));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn e2e_malformed_model_output_falls_back_to_rules() {
    let provider = Arc::new(ScriptedProvider::new(vec!["not json at all".into()]));
    let mut ws = Workspace::new(provider.clone());
    ws.write("app.py", "print('hi')\n");

    let reply = ws.turn("find python files").await;
    assert!(reply.starts_with("Found 1 files:\n  - app.py"), "{reply}");
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn e2e_empty_model_plan_is_nothing_to_do() {
    let provider = Arc::new(ScriptedProvider::new(vec![ScriptedProvider::plan(json!([]))]));
    let mut ws = Workspace::new(provider);

    assert_eq!(ws.turn("thanks").await, NOTHING_TO_DO);
}

#[tokio::test]
async fn e2e_unreachable_model_is_never_called() {
    let provider = Arc::new(ScriptedProvider {
        healthy: false,
        ..ScriptedProvider::new(vec![ScriptedProvider::plan(json!([{ "tool": "show_help" }]))])
    });
    let mut ws = Workspace::new(provider.clone());

    for text in ["what tools are there", "stats", "hmm"] {
        assert!(!ws.turn(text).await.is_empty());
    }
    assert_eq!(provider.calls(), 0);
}

// ── E2E: Session persistence ─────────────────────────────────────────────

#[tokio::test]
async fn e2e_session_survives_restart() {
    let mut ws = Workspace::new(Arc::new(ScriptedProvider::offline()));
    ws.write("lib.rs", "fn main() {}\n");
    ws.turn("track lib.rs").await;
    ws.turn("show history").await;

    let store = SessionStore::new(ws.dir.path().join("state/session.json"));
    assert!(store.save_state(&ws.session));

    let restored = store.load_state(100);
    assert_eq!(restored.paths(), vec!["lib.rs"]);
    assert_eq!(restored.history(), ["track lib.rs", "show history"]);
}

#[tokio::test]
async fn e2e_corrupt_session_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "{ definitely not json").unwrap();

    let state = SessionStore::new(&path).load_state(100);
    assert!(state.files().is_empty());
    assert!(state.history().is_empty());
}
