//! The tool orchestrator: one user turn from text to an aggregated result.
//!
//! A turn runs `Idle → ParsingIntent → ExecutingActions → Idle`:
//!
//! 1. **Exit check**: exit words short-circuit everything
//! 2. **Parse** the request into raw actions (model tier or rules)
//! 3. **Budget**: actions beyond the per-turn maximum are dropped
//! 4. **Execute** each action in order; each one is validated into a typed
//!    [`Action`] and dispatched through a single exhaustive match
//! 5. **Record** the request in history once the turn completes
//! 6. **Aggregate** the non-empty results, separated by blank lines
//!
//! Every action is isolated: a validation error, tool error or panic is
//! rendered as that action's result and the remaining actions still run.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use codeclaw_config::AppConfig;
use codeclaw_core::action::{Action, GitCommand, RawAction, ToolKind};
use codeclaw_core::error::ToolError;
use codeclaw_core::provider::Provider;
use codeclaw_core::session::{SessionState, TrackedFile, normalize_path};
use codeclaw_tools::{ContentIndex, FileStore, GitRunner, preview, resolve_path, templates};
use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::intent::IntentParser;
use crate::model::ModelClient;
use crate::rules;
use crate::stats::Stats;

/// Inputs that end the session (case-insensitive, surrounding whitespace ignored).
pub const EXIT_COMMANDS: &[&str] = &["exit", "quit", "q", "/exit", "/quit", ":q"];

pub const NOTHING_TO_DO: &str = "Nothing to do. Type 'help' to see what I can do.";

pub const NOT_PROCESSED: &str =
    "Request could not be processed. Try rephrasing it, or type 'help' for the tool list.";

const SEARCH_TRACK_LIMIT: usize = 5;
const SEARCH_LIST_LIMIT: usize = 10;
const CONTENT_LIST_LIMIT: usize = 20;
const LIST_FOLDER_LIMIT: usize = 8;
const LIST_FILE_LIMIT: usize = 12;
const HISTORY_SHOWN: usize = 10;
const ANALYZE_FILE_LIMIT: usize = 3;
const MATCH_TEXT_CHARS: usize = 120;

const ANALYZE_ROLE: &str = "analyze";
const ANALYZE_SYSTEM: &str = "You are a senior engineer reviewing code. Be concise and concrete.";

pub fn is_exit_command(text: &str) -> bool {
    let text = text.trim();
    EXIT_COMMANDS.iter().any(|cmd| cmd.eq_ignore_ascii_case(text))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The user asked to leave. Nothing was recorded.
    Exit,
    /// Aggregated, never-empty result text.
    Reply(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPhase {
    Idle,
    ParsingIntent,
    ExecutingActions,
    Exiting,
}

pub struct Orchestrator {
    store: FileStore,
    index: Arc<ContentIndex>,
    model: Arc<ModelClient>,
    parser: IntentParser,
    git: GitRunner,
    max_actions: usize,
    read_preview_chars: usize,
    analyze_preview_chars: usize,
    resolve_depth: usize,
    stats: Stats,
    phase: AgentPhase,
}

impl Orchestrator {
    /// Build an orchestrator working on the tree under `root`.
    pub fn new(provider: Arc<dyn Provider>, config: &AppConfig, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let store = FileStore::new(root.clone());
        let model = Arc::new(ModelClient::new(provider, &config.model, &config.cache));
        let agent = &config.agent;

        Self {
            index: Arc::new(ContentIndex::new(store.clone(), &config.index)),
            parser: IntentParser::new(Arc::clone(&model)),
            git: GitRunner::new(
                root,
                Duration::from_secs(agent.command_timeout_secs),
                agent.command_output_chars,
            ),
            store,
            model,
            max_actions: agent.max_actions_per_turn,
            read_preview_chars: agent.read_preview_chars,
            analyze_preview_chars: agent.analyze_preview_chars,
            resolve_depth: config.index.resolve_max_depth,
            stats: Stats::new(),
            phase: AgentPhase::Idle,
        }
    }

    pub fn phase(&self) -> AgentPhase {
        self.phase
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn index(&self) -> &Arc<ContentIndex> {
        &self.index
    }

    pub fn model(&self) -> &ModelClient {
        &self.model
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Start the background index build for a freshly loaded session.
    pub fn warm_up(&self, session: &SessionState) {
        if !session.files().is_empty() {
            self.index.spawn_rebuild(session.paths());
        }
    }

    /// Run one turn.
    pub async fn execute_turn(&mut self, session: &mut SessionState, text: &str) -> TurnOutcome {
        if is_exit_command(text) {
            info!("Exit requested");
            self.phase = AgentPhase::Exiting;
            return TurnOutcome::Exit;
        }

        let text = text.trim();
        if text.is_empty() {
            return TurnOutcome::Reply(NOTHING_TO_DO.into());
        }

        self.stats.record_query();

        self.phase = AgentPhase::ParsingIntent;
        let intent = self.parser.parse(text, session).await;
        info!(
            source = ?intent.source,
            actions = intent.actions.len(),
            message = %intent.message,
            "Intent parsed"
        );

        let mut actions = intent.actions;
        if actions.len() > self.max_actions {
            warn!(
                requested = actions.len(),
                max = self.max_actions,
                "Action budget exceeded, dropping the rest"
            );
            actions.truncate(self.max_actions);
        }

        if actions.is_empty() {
            self.phase = AgentPhase::Idle;
            session.push_history(text);
            return TurnOutcome::Reply(NOTHING_TO_DO.into());
        }

        self.phase = AgentPhase::ExecutingActions;
        let mut results = Vec::with_capacity(actions.len());
        for raw in &actions {
            let result = self.execute_action(session, raw).await;
            if !result.trim().is_empty() {
                results.push(result);
            }
        }
        self.phase = AgentPhase::Idle;
        session.push_history(text);

        if results.is_empty() {
            TurnOutcome::Reply(NOT_PROCESSED.into())
        } else {
            TurnOutcome::Reply(results.join("\n\n"))
        }
    }

    /// Validate and run a single raw action, always producing text.
    pub async fn execute_action(&mut self, session: &mut SessionState, raw: &RawAction) -> String {
        self.stats.record_tool_call();

        let action = match Action::validate(raw) {
            Ok(action) => action,
            Err(e) => {
                debug!(tool = %raw.tool, error = %e, "Rejected action");
                return e.to_string();
            }
        };
        let kind = action.kind();
        debug!(tool = %kind, "Executing action");

        match AssertUnwindSafe(self.dispatch(session, action)).catch_unwind().await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(tool = %kind, error = %e, "Tool failed");
                e.to_string()
            }
            Err(_) => {
                warn!(tool = %kind, "Tool panicked");
                format!("Tool execution error: {kind} panicked")
            }
        }
    }

    async fn dispatch(&self, session: &mut SessionState, action: Action) -> Result<String, ToolError> {
        match action {
            Action::CreateFile { path, content } => self.create_file(session, &path, content),
            Action::ReadFile { path } => Ok(self.read_file(session, &path)),
            Action::DeleteFile { path } => self.delete_file(session, &path),
            Action::ListDirectory { directory } => self.list_directory(&directory),
            Action::SearchFiles { query } => Ok(self.search_files(session, &query)),
            Action::SearchContent { query } => Ok(self.search_content(session, &query)),
            Action::AddContext { paths } => Ok(self.add_context(session, &paths)),
            Action::RemoveContext { paths } => {
                let removed = paths.iter().filter(|path| session.untrack(path)).count();
                Ok(format!("Removed {removed} files from context"))
            }
            Action::ClearContext => {
                let cleared = session.clear_files();
                Ok(format!("Cleared {cleared} files from context"))
            }
            Action::ShowContext => Ok(show_context(session)),
            Action::AnalyzeCode { paths } => self.analyze_code(session, paths).await,
            Action::Git { command } => self.git(command).await,
            Action::ShowHistory => Ok(show_history(session)),
            Action::ShowStats => Ok(self.show_stats(session).await),
            Action::ShowHelp => Ok(show_help()),
            Action::ExportHistory { path } => self.export_history(session, &path),
        }
    }

    fn track(&self, session: &mut SessionState, path: &str) -> bool {
        session.track(TrackedFile::new(path).with_modified(self.store.modified(path)))
    }

    fn create_file(
        &self,
        session: &mut SessionState,
        path: &str,
        content: Option<String>,
    ) -> Result<String, ToolError> {
        let path = normalize_path(path);
        self.store.resolve(&path)?;
        let content = match content {
            Some(content) if !templates::looks_like_json_object(&content) => content,
            _ => templates::template_for(&path),
        };

        if !self.store.write(&path, &content) {
            return Err(failed(ToolKind::CreateFile, format!("could not write {path}")));
        }
        if !self.track(session, &path) {
            session.observe(&path, self.store.modified(&path));
        }
        info!(path = %path, bytes = content.len(), "Created file");
        Ok(format!("Created {path} ({} bytes)", content.len()))
    }

    fn read_file(&self, session: &mut SessionState, path: &str) -> String {
        let Some(resolved) = resolve_path(&self.store, path, session.files(), self.resolve_depth) else {
            return format!("File not found: {path}");
        };
        let content = self.store.read(&resolved);
        session.observe(&resolved, self.store.modified(&resolved));
        format!(
            "Contents of {resolved} ({} chars):\n{}",
            content.chars().count(),
            preview(&content, self.read_preview_chars)
        )
    }

    fn delete_file(&self, session: &mut SessionState, path: &str) -> Result<String, ToolError> {
        let path = normalize_path(path);
        self.store.resolve(&path)?;
        if !self.store.exists(&path) {
            return Ok(format!("File not found: {path}"));
        }
        if !self.store.delete(&path) {
            return Err(failed(ToolKind::DeleteFile, format!("could not delete {path}")));
        }
        if session.untrack(&path) {
            Ok(format!("Deleted {path} and removed it from context"))
        } else {
            Ok(format!("Deleted {path}"))
        }
    }

    fn list_directory(&self, directory: &str) -> Result<String, ToolError> {
        let listing = self
            .store
            .list_dir(directory)
            .ok_or_else(|| failed(ToolKind::ListDirectory, format!("cannot access directory {directory}")))?;

        let mut out = format!("Directory: {}", listing.path.display());
        if !listing.folders.is_empty() {
            let _ = write!(out, "\nFolders: {}", join_capped(&listing.folders, LIST_FOLDER_LIMIT));
        }
        if !listing.files.is_empty() {
            let _ = write!(out, "\nFiles: {}", join_capped(&listing.files, LIST_FILE_LIMIT));
        }
        if listing.folders.is_empty() && listing.files.is_empty() {
            out.push_str("\n(empty)");
        }
        Ok(out)
    }

    fn search_files(&self, session: &mut SessionState, query: &str) -> String {
        let query = rules::language_extension(query).unwrap_or(query.trim()).to_string();

        let mut candidates = self.store.walk_files(self.resolve_depth);
        let mut seen: HashSet<String> = candidates.iter().cloned().collect();
        for path in session.paths() {
            if seen.insert(path.clone()) {
                candidates.push(path);
            }
        }

        let found = self.index.search_by_name_or_content(&query, &candidates);
        if found.is_empty() {
            return if query.is_empty() {
                "No files found".into()
            } else {
                format!("No files found matching '{query}'")
            };
        }

        let mut added = 0;
        for path in found.iter().take(SEARCH_TRACK_LIMIT) {
            if self.store.exists(path) && self.track(session, path) {
                added += 1;
            }
        }
        if added > 0 {
            debug!(added, "Search added files to context");
            self.index.spawn_rebuild(session.paths());
        }

        let mut out = format!("Found {} files:", found.len());
        for path in found.iter().take(SEARCH_LIST_LIMIT) {
            let _ = write!(out, "\n  - {path}");
        }
        if found.len() > SEARCH_LIST_LIMIT {
            let _ = write!(out, "\n  ... and {} more", found.len() - SEARCH_LIST_LIMIT);
        }
        out
    }

    fn search_content(&self, session: &SessionState, query: &str) -> String {
        let files = session.paths();
        if files.is_empty() {
            return "No files in context to search. Add some with add_context or search_files first.".into();
        }

        let matches = self.index.search_content(query, &files);
        if matches.is_empty() {
            return format!("No matches for '{query}' in {} tracked files", files.len());
        }

        let mut out = format!("Found {} matches:", matches.len());
        for m in matches.iter().take(CONTENT_LIST_LIMIT) {
            let _ = write!(
                out,
                "\n  {}:{} - {}",
                basename(&m.path),
                m.line,
                preview(&m.text, MATCH_TEXT_CHARS)
            );
        }
        if matches.len() > CONTENT_LIST_LIMIT {
            let _ = write!(out, "\n  ... and {} more", matches.len() - CONTENT_LIST_LIMIT);
        }
        out
    }

    fn add_context(&self, session: &mut SessionState, paths: &[String]) -> String {
        let mut added = 0;
        let mut already = 0;
        let mut missing = Vec::new();

        for path in paths {
            let path = normalize_path(path);
            let files = if self.store.exists(&path) {
                vec![path]
            } else if self.store.is_dir(&path) {
                self.store.walk_dir(&path, self.resolve_depth)
            } else {
                missing.push(path);
                continue;
            };
            for file in files {
                if self.track(session, &file) {
                    added += 1;
                } else {
                    already += 1;
                }
            }
        }
        if added > 0 {
            self.index.spawn_rebuild(session.paths());
        }

        let mut out = format!("Added {added} files to context");
        if already > 0 {
            let _ = write!(out, "\n  already tracked: {already}");
        }
        if !missing.is_empty() {
            let _ = write!(out, "\n  not found: {}", missing.join(", "));
        }
        out
    }

    async fn analyze_code(&self, session: &SessionState, paths: Vec<String>) -> Result<String, ToolError> {
        let requested = if paths.is_empty() { session.paths() } else { paths };

        let mut analyzed = Vec::new();
        let mut sections = String::new();
        let mut summaries = Vec::new();
        for path in &requested {
            if analyzed.len() >= ANALYZE_FILE_LIMIT {
                break;
            }
            let Some(resolved) = resolve_path(&self.store, path, session.files(), self.resolve_depth) else {
                continue;
            };
            let content = self.store.read(&resolved);
            if content.trim().is_empty() {
                continue;
            }
            let _ = write!(
                sections,
                "=== {resolved} ===\n{}\n\n",
                preview(&content, self.analyze_preview_chars)
            );
            summaries.push(static_summary(&resolved, &content));
            analyzed.push(resolved);
        }

        if analyzed.is_empty() {
            return Err(ToolError::InvalidArguments(
                "analyze_code needs at least one readable file; name one or add it to context".into(),
            ));
        }

        if self.model.is_available().await {
            let prompt = format!(
                "Analyze this code. Summarize what it does and point out bugs or risky spots.\n\n{sections}"
            );
            match self
                .model
                .complete(ANALYZE_ROLE, &prompt, Some(ANALYZE_SYSTEM), &analyzed)
                .await
            {
                Ok(text) if !text.is_empty() => return Ok(text),
                Ok(_) => debug!("Model returned an empty analysis"),
                Err(e) => info!(error = %e, "Analysis model call failed"),
            }
        }

        Ok(format!("Model unavailable, static summary:\n{}", summaries.join("\n")))
    }

    fn export_history(&self, session: &SessionState, path: &str) -> Result<String, ToolError> {
        let path = normalize_path(path);
        self.store.resolve(&path)?;

        let history = session.history();
        let mut content = history.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        if !self.store.write(&path, &content) {
            return Err(failed(ToolKind::ExportHistory, format!("could not write {path}")));
        }
        info!(path = %path, entries = history.len(), "Exported history");
        Ok(format!("Exported {} history entries to {path}", history.len()))
    }

    async fn git(&self, command: GitCommand) -> Result<String, ToolError> {
        self.git.run(command).await
    }

    async fn show_stats(&self, session: &SessionState) -> String {
        let lines: usize = session
            .files()
            .iter()
            .map(|f| self.store.read(&f.path).lines().count())
            .sum();
        let availability = if self.model.is_available().await {
            "available"
        } else {
            "unavailable"
        };

        format!(
            "Agent stats:\n  Files tracked: {}\n  Lines tracked: {lines}\n  History entries: {}\n  Queries: {}\n  Tool calls: {}\n  Uptime: {}s\n  Model: {} via {} ({availability})",
            session.files().len(),
            session.history().len(),
            self.stats.queries(),
            self.stats.tool_calls(),
            self.stats.uptime().as_secs(),
            self.model.model(),
            self.model.provider_name(),
        )
    }
}

fn show_context(session: &SessionState) -> String {
    if session.files().is_empty() {
        return "No files in context".into();
    }
    let mut out = format!("Context files ({}):", session.files().len());
    for (i, file) in session.files().iter().enumerate() {
        let _ = write!(out, "\n  {}. {}", i + 1, file.path);
    }
    out
}

fn show_history(session: &SessionState) -> String {
    let history = session.history();
    if history.is_empty() {
        return "No history yet".into();
    }
    let skip = history.len().saturating_sub(HISTORY_SHOWN);
    let mut out = format!("Recent requests ({} of {}):", history.len() - skip, history.len());
    for (i, entry) in history.iter().enumerate().skip(skip) {
        let _ = write!(out, "\n  {}. {entry}", i + 1);
    }
    out
}

fn show_help() -> String {
    let mut out = String::from("Available tools:");
    for kind in ToolKind::ALL {
        let _ = write!(out, "\n  {:<15} {}", kind.name(), kind.description());
    }
    out.push_str("\n\nAsk in plain words, e.g. 'find python files' or 'create calculator'. Type 'exit' to quit.");
    out
}

/// Line, definition and size counts for one file.
fn static_summary(path: &str, content: &str) -> String {
    const DEFINITION_PREFIXES: &[&str] = &[
        "def ", "async def ", "class ", "fn ", "pub fn ", "async fn ", "pub async fn ", "function ",
        "struct ", "pub struct ", "enum ", "pub enum ", "impl ", "trait ", "pub trait ",
    ];
    let lines = content.lines().count();
    let definitions = content
        .lines()
        .map(str::trim_start)
        .filter(|line| DEFINITION_PREFIXES.iter().any(|prefix| line.starts_with(prefix)))
        .count();
    format!(
        "  {path}: {lines} lines, {definitions} definitions, {} chars",
        content.chars().count()
    )
}

fn join_capped(items: &[String], limit: usize) -> String {
    let mut joined = items.iter().take(limit).cloned().collect::<Vec<_>>().join(", ");
    if items.len() > limit {
        let _ = write!(joined, ", ... (+{} more)", items.len() - limit);
    }
    joined
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn failed(kind: ToolKind, reason: String) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: kind.name().into(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ScriptedProvider, Step};
    use serde_json::json;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        agent: Orchestrator,
        provider: Arc<ScriptedProvider>,
        session: SessionState,
    }

    impl Fixture {
        fn new(provider: ScriptedProvider) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let provider = Arc::new(provider);
            let agent = Orchestrator::new(provider.clone(), &AppConfig::default(), dir.path());
            Self {
                dir,
                agent,
                provider,
                session: SessionState::default(),
            }
        }

        fn offline() -> Self {
            Self::new(ScriptedProvider::unhealthy())
        }

        fn write(&self, path: &str, content: &str) {
            assert!(self.agent.store().write(path, content));
        }

        fn read(&self, path: &str) -> String {
            std::fs::read_to_string(self.dir.path().join(path)).unwrap()
        }

        async fn turn(&mut self, text: &str) -> String {
            match self.agent.execute_turn(&mut self.session, text).await {
                TurnOutcome::Reply(text) => text,
                TurnOutcome::Exit => panic!("unexpected exit for {text:?}"),
            }
        }

        async fn run(&mut self, action: RawAction) -> String {
            self.agent.execute_action(&mut self.session, &action).await
        }
    }

    fn plan(actions: serde_json::Value) -> Step {
        Step::Text(json!({ "response": "ok", "actions": actions }).to_string())
    }

    #[tokio::test]
    async fn exit_words_leave_state_untouched() {
        let mut fx = Fixture::offline();
        fx.session.track_path("kept.py");
        fx.session.push_history("before");

        for word in ["exit", "QUIT", "  q  ", "/exit", ":q"] {
            let outcome = fx.agent.execute_turn(&mut fx.session, word).await;
            assert_eq!(outcome, TurnOutcome::Exit);
        }
        assert_eq!(fx.agent.phase(), AgentPhase::Exiting);
        assert_eq!(fx.session.history(), ["before"]);
        assert_eq!(fx.session.paths(), vec!["kept.py"]);
        assert_eq!(fx.agent.stats().queries(), 0);
    }

    #[tokio::test]
    async fn every_non_exit_input_gets_a_reply() {
        let mut fx = Fixture::offline();
        for text in ["find python files", "hmm", "", "   ", "read nothing.txt", "analyze", "exiting soon"] {
            let reply = fx.turn(text).await;
            assert!(!reply.trim().is_empty(), "empty reply for {text:?}");
        }
        assert_eq!(fx.agent.phase(), AgentPhase::Idle);
    }

    #[tokio::test]
    async fn turn_records_history_and_query() {
        let mut fx = Fixture::offline();
        fx.turn("show context").await;
        assert_eq!(fx.session.history(), ["show context"]);
        assert_eq!(fx.agent.stats().queries(), 1);
        assert_eq!(fx.agent.stats().tool_calls(), 1);
    }

    #[tokio::test]
    async fn create_without_content_uses_template_when_offline() {
        let mut fx = Fixture::offline();
        let reply = fx
            .run(RawAction::new("create_file", json!({ "filename": "x.py" })))
            .await;

        assert!(reply.starts_with("Created x.py"), "{reply}");
        assert_eq!(fx.read("x.py"), templates::template_for("x.py"));
        assert_eq!(fx.session.paths(), vec!["x.py"]);
    }

    #[tokio::test]
    async fn create_replaces_json_content_and_does_not_duplicate() {
        let mut fx = Fixture::offline();
        let action = RawAction::new(
            "create_file",
            json!({ "path": "tools/downloader.py", "content": "{\"tool\": \"create_file\"}" }),
        );
        fx.run(action.clone()).await;
        fx.run(action).await;

        assert_eq!(fx.read("tools/downloader.py"), templates::template_for("downloader.py"));
        assert_eq!(fx.session.files().len(), 1);
    }

    #[tokio::test]
    async fn add_context_is_idempotent() {
        let mut fx = Fixture::offline();
        fx.write("a.py", "x = 1");

        let first = fx.run(RawAction::new("add_context", json!({ "files": ["a.py", "ghost.py"] }))).await;
        assert!(first.starts_with("Added 1 files"), "{first}");
        assert!(first.contains("not found: ghost.py"));

        let second = fx.run(RawAction::new("add_context", json!({ "files": "./a.py" }))).await;
        assert!(second.starts_with("Added 0 files"), "{second}");
        assert_eq!(fx.session.files().len(), 1);
    }

    #[tokio::test]
    async fn add_context_expands_directories() {
        let mut fx = Fixture::offline();
        fx.write("pkg/a.py", "x = 1");
        fx.write("pkg/sub/b.py", "y = 2");
        fx.write("pkg/__pycache__/a.pyc", "");
        fx.write("other.py", "");

        let reply = fx.run(RawAction::new("add_context", json!({ "files": ["pkg/"] }))).await;
        assert_eq!(reply, "Added 2 files to context");
        assert_eq!(fx.session.paths(), vec!["pkg/a.py", "pkg/sub/b.py"]);

        let again = fx.run(RawAction::new("add_context", json!({ "files": ["pkg", "pkg/a.py"] }))).await;
        assert_eq!(again, "Added 0 files to context\n  already tracked: 3");
    }

    #[tokio::test]
    async fn file_tools_refuse_paths_outside_the_tree() {
        let outer = tempfile::tempdir().unwrap();
        let root = outer.path().join("work");
        std::fs::create_dir(&root).unwrap();
        let victim = outer.path().join("victim.txt");
        std::fs::write(&victim, "keep me").unwrap();

        let provider = Arc::new(ScriptedProvider::unhealthy());
        let mut agent = Orchestrator::new(provider, &AppConfig::default(), &root);
        let mut session = SessionState::default();
        let absolute = victim.to_string_lossy().into_owned();

        for path in ["../victim.txt", "nested/../../victim.txt", absolute.as_str()] {
            let delete = RawAction::new("delete_file", json!({ "path": path }));
            let reply = agent.execute_action(&mut session, &delete).await;
            assert!(reply.starts_with("Invalid tool arguments:"), "{reply}");
            assert!(reply.contains("outside the working tree"), "{reply}");

            let create = RawAction::new("create_file", json!({ "filename": path, "content": "pwned" }));
            let reply = agent.execute_action(&mut session, &create).await;
            assert!(reply.contains("outside the working tree"), "{reply}");

            let export = RawAction::new("export_history", json!({ "path": path }));
            let reply = agent.execute_action(&mut session, &export).await;
            assert!(reply.contains("outside the working tree"), "{reply}");
        }

        let add = RawAction::new("add_context", json!({ "files": ["../victim.txt"] }));
        let reply = agent.execute_action(&mut session, &add).await;
        assert!(reply.contains("not found: ../victim.txt"), "{reply}");

        assert_eq!(std::fs::read_to_string(&victim).unwrap(), "keep me");
        assert!(session.files().is_empty());
    }

    #[tokio::test]
    async fn export_history_writes_one_request_per_line() {
        let mut fx = Fixture::offline();
        fx.turn("show context").await;
        fx.turn("stats").await;

        let reply = fx.run(RawAction::bare(ToolKind::ExportHistory)).await;
        assert_eq!(reply, "Exported 2 history entries to export.txt");
        assert_eq!(fx.read("export.txt"), "show context\nstats\n");

        let reply = fx.turn("export history").await;
        assert_eq!(reply, "Exported 2 history entries to export.txt");
        assert_eq!(fx.session.history().last().map(String::as_str), Some("export history"));

        let reply = fx
            .run(RawAction::new("export_history", json!({ "path": "logs/requests.txt" })))
            .await;
        assert_eq!(reply, "Exported 3 history entries to logs/requests.txt");
        assert_eq!(fx.read("logs/requests.txt"), "show context\nstats\nexport history\n");
    }

    #[tokio::test]
    async fn content_search_over_tracked_files() {
        let mut fx = Fixture::offline();
        fx.write("a.py", "def foo(): pass");
        fx.write("b.py", "def bar(): pass");
        fx.session.track_path("a.py");
        fx.session.track_path("b.py");

        let reply = fx.run(RawAction::new("search_content", json!({ "query": "foo" }))).await;
        assert_eq!(reply, "Found 1 matches:\n  a.py:1 - def foo(): pass");
    }

    #[tokio::test]
    async fn content_search_without_context_explains() {
        let mut fx = Fixture::offline();
        let reply = fx.run(RawAction::new("search_content", json!({ "query": "foo" }))).await;
        assert!(reply.starts_with("No files in context"));
    }

    #[tokio::test]
    async fn search_files_maps_language_and_tracks_first_five() {
        let mut fx = Fixture::offline();
        for i in 0..7 {
            fx.write(&format!("m{i}.py"), "pass");
        }
        fx.write("notes.md", "python notes");

        let reply = fx.turn("find python files").await;
        assert!(reply.starts_with("Found 7 files:"), "{reply}");
        assert!(!reply.contains("notes.md"));
        assert_eq!(fx.session.files().len(), 5);
    }

    #[tokio::test]
    async fn read_file_resolves_and_truncates() {
        let mut fx = Fixture::offline();
        fx.write("deep/inside/long.txt", &"x".repeat(900));

        let reply = fx.run(RawAction::new("read_file", json!("long.txt"))).await;
        assert!(reply.starts_with("Contents of deep/inside/long.txt (900 chars):\n"), "{reply}");
        assert!(reply.ends_with("..."));

        let missing = fx.run(RawAction::new("read_file", json!({ "path": "nope.txt" }))).await;
        assert_eq!(missing, "File not found: nope.txt");
    }

    #[tokio::test]
    async fn delete_file_untracks() {
        let mut fx = Fixture::offline();
        fx.write("old.txt", "bye");
        fx.session.track_path("old.txt");

        let reply = fx.run(RawAction::new("delete_file", json!({ "path": "old.txt" }))).await;
        assert_eq!(reply, "Deleted old.txt and removed it from context");
        assert!(fx.session.files().is_empty());
        assert!(!fx.agent.store().exists("old.txt"));
    }

    #[tokio::test]
    async fn context_show_remove_clear() {
        let mut fx = Fixture::offline();
        assert_eq!(fx.run(RawAction::bare(ToolKind::ShowContext)).await, "No files in context");

        fx.session.track_path("a.py");
        fx.session.track_path("src/b.py");
        assert_eq!(
            fx.run(RawAction::bare(ToolKind::ShowContext)).await,
            "Context files (2):\n  1. a.py\n  2. src/b.py"
        );
        assert_eq!(
            fx.run(RawAction::new("remove_context", json!({ "paths": ["a.py", "zzz.py"] }))).await,
            "Removed 1 files from context"
        );
        assert_eq!(
            fx.run(RawAction::bare(ToolKind::ClearContext)).await,
            "Cleared 1 files from context"
        );
    }

    #[tokio::test]
    async fn list_directory_reports_folders_and_files() {
        let mut fx = Fixture::offline();
        fx.write("src/main.py", "");
        fx.write("README.md", "");

        let reply = fx.run(RawAction::bare(ToolKind::ListDirectory)).await;
        assert!(reply.starts_with("Directory: "));
        assert!(reply.contains("\nFolders: src"));
        assert!(reply.contains("\nFiles: README.md"));

        let missing = fx.run(RawAction::new("list_directory", json!({ "dir": "nowhere" }))).await;
        assert!(missing.contains("cannot access directory nowhere"), "{missing}");
    }

    #[tokio::test]
    async fn invalid_actions_do_not_stop_the_turn() {
        let mut fx = Fixture::new(ScriptedProvider::healthy(vec![plan(json!([
            { "tool": "frobnicate" },
            { "tool": "read_file", "params": {} },
            { "tool": "show_context" },
        ]))]));

        let reply = fx.turn("do things").await;
        let parts: Vec<&str> = reply.split("\n\n").collect();
        assert_eq!(parts[0], "Unknown tool: frobnicate");
        assert!(parts[1].starts_with("Invalid tool arguments: read_file requires"));
        assert_eq!(parts[2], "No files in context");
    }

    #[tokio::test]
    async fn actions_beyond_budget_are_dropped() {
        let help = json!({ "tool": "show_help" });
        let mut fx = Fixture::new(ScriptedProvider::healthy(vec![plan(json!([
            help, help, help, help, help, help, help
        ]))]));

        let reply = fx.turn("help me a lot").await;
        assert_eq!(reply.matches("Available tools:").count(), 5);
        assert_eq!(fx.agent.stats().tool_calls(), 5);
    }

    #[tokio::test]
    async fn empty_plan_yields_nothing_to_do() {
        let mut fx = Fixture::new(ScriptedProvider::healthy(vec![plan(json!([]))]));
        assert_eq!(fx.turn("ok").await, NOTHING_TO_DO);
        assert_eq!(fx.session.history(), ["ok"]);
    }

    #[tokio::test]
    async fn panicking_tool_is_isolated() {
        let mut fx = Fixture::new(ScriptedProvider::healthy(vec![
            plan(json!([
                { "tool": "analyze_code", "params": { "files": ["a.py"] } },
                { "tool": "show_context" },
            ])),
            Step::Panic,
        ]));
        fx.write("a.py", "def foo(): pass");

        let reply = fx.turn("analyze a.py").await;
        assert_eq!(reply, "Tool execution error: analyze_code panicked\n\nNo files in context");
        assert_eq!(fx.agent.phase(), AgentPhase::Idle);
    }

    #[tokio::test]
    async fn analyze_uses_model_when_available() {
        let mut fx = Fixture::new(ScriptedProvider::healthy(vec![Step::text("Looks fine.")]));
        fx.write("a.py", "def foo(): pass");
        fx.session.track_path("a.py");

        let reply = fx.run(RawAction::bare(ToolKind::AnalyzeCode)).await;
        assert_eq!(reply, "Looks fine.");
        let prompt = fx.provider.last_request().unwrap().prompt;
        assert!(prompt.contains("=== a.py ===\ndef foo(): pass"));
    }

    #[tokio::test]
    async fn analyze_falls_back_to_static_summary() {
        let mut fx = Fixture::offline();
        fx.write("a.py", "import os\n\ndef foo():\n    pass\n\nclass Bar:\n    pass\n");

        let reply = fx.run(RawAction::new("analyze_code", json!({ "files": ["a.py"] }))).await;
        assert_eq!(
            reply,
            "Model unavailable, static summary:\n  a.py: 7 lines, 2 definitions, 52 chars"
        );

        let nothing = fx.run(RawAction::bare(ToolKind::AnalyzeCode)).await;
        assert!(nothing.starts_with("Invalid tool arguments: analyze_code needs"));
    }

    #[tokio::test]
    async fn history_shows_last_ten() {
        let mut fx = Fixture::offline();
        for i in 1..=12 {
            fx.session.push_history(format!("q{i}"));
        }
        let reply = fx.run(RawAction::bare(ToolKind::ShowHistory)).await;
        assert!(reply.starts_with("Recent requests (10 of 12):\n  3. q3"));
        assert!(reply.ends_with("12. q12"));
    }

    #[tokio::test]
    async fn stats_report_counters() {
        let mut fx = Fixture::offline();
        fx.write("a.py", "1\n2\n3\n");
        fx.session.track_path("a.py");
        fx.turn("stats").await;

        let reply = fx.run(RawAction::bare(ToolKind::ShowStats)).await;
        assert!(reply.contains("Files tracked: 1"));
        assert!(reply.contains("Lines tracked: 3"));
        assert!(reply.contains("Queries: 1"));
        assert!(reply.contains("Tool calls: 2"));
        assert!(reply.contains("via scripted (unavailable)"));
    }

    #[tokio::test]
    async fn git_rejects_unsupported_subcommand() {
        let mut fx = Fixture::offline();
        let reply = fx.run(RawAction::new("git", json!({ "command": "push" }))).await;
        assert!(reply.contains("git supports status, log, diff, branch and show"), "{reply}");
    }

    #[test]
    fn exit_detection() {
        assert!(is_exit_command(" Exit "));
        assert!(is_exit_command("Q"));
        assert!(!is_exit_command("exit now"));
        assert!(!is_exit_command("quitter"));
    }
}
