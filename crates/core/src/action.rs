//! Actions: the unit of work the orchestrator executes.
//!
//! The intent parser (model tier or rule tier) emits [`RawAction`]s: a tool
//! name plus loosely-typed JSON parameters. The orchestrator validates each
//! one into a typed [`Action`] before dispatch, so every tool sees a known
//! parameter shape and malformed input becomes a [`ToolError`] instead of a
//! runtime type failure.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ToolError;

/// The closed set of tools the assistant can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    CreateFile,
    ReadFile,
    DeleteFile,
    ListDirectory,
    SearchFiles,
    SearchContent,
    AddContext,
    RemoveContext,
    ClearContext,
    ShowContext,
    AnalyzeCode,
    Git,
    ShowHistory,
    ShowStats,
    ShowHelp,
    ExportHistory,
}

impl ToolKind {
    /// Every tool, in catalogue order.
    pub const ALL: [ToolKind; 16] = [
        ToolKind::CreateFile,
        ToolKind::ReadFile,
        ToolKind::DeleteFile,
        ToolKind::ListDirectory,
        ToolKind::SearchFiles,
        ToolKind::SearchContent,
        ToolKind::AddContext,
        ToolKind::RemoveContext,
        ToolKind::ClearContext,
        ToolKind::ShowContext,
        ToolKind::AnalyzeCode,
        ToolKind::Git,
        ToolKind::ShowHistory,
        ToolKind::ShowStats,
        ToolKind::ShowHelp,
        ToolKind::ExportHistory,
    ];

    /// The wire name used in model output and the catalogue.
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::CreateFile => "create_file",
            ToolKind::ReadFile => "read_file",
            ToolKind::DeleteFile => "delete_file",
            ToolKind::ListDirectory => "list_directory",
            ToolKind::SearchFiles => "search_files",
            ToolKind::SearchContent => "search_content",
            ToolKind::AddContext => "add_context",
            ToolKind::RemoveContext => "remove_context",
            ToolKind::ClearContext => "clear_context",
            ToolKind::ShowContext => "show_context",
            ToolKind::AnalyzeCode => "analyze_code",
            ToolKind::Git => "git",
            ToolKind::ShowHistory => "show_history",
            ToolKind::ShowStats => "show_stats",
            ToolKind::ShowHelp => "show_help",
            ToolKind::ExportHistory => "export_history",
        }
    }

    /// One-line description, shown in the model prompt and in `show_help`.
    pub fn description(self) -> &'static str {
        match self {
            ToolKind::CreateFile => "create a file {filename, content?}; content defaults to a template",
            ToolKind::ReadFile => "show a file's contents {filename}",
            ToolKind::DeleteFile => "delete a file {filename}",
            ToolKind::ListDirectory => "list a directory {directory?}",
            ToolKind::SearchFiles => "find files by name or indexed content {query}",
            ToolKind::SearchContent => "grep tracked files for text {query}",
            ToolKind::AddContext => "track files in the working context {files}",
            ToolKind::RemoveContext => "stop tracking files {files}",
            ToolKind::ClearContext => "stop tracking every file",
            ToolKind::ShowContext => "list tracked files",
            ToolKind::AnalyzeCode => "review code in files {files?}; defaults to tracked files",
            ToolKind::Git => "run a read-only git command {command: status|log|diff|branch|show}",
            ToolKind::ShowHistory => "show recent requests",
            ToolKind::ShowStats => "show session statistics",
            ToolKind::ShowHelp => "describe the available tools",
            ToolKind::ExportHistory => "write request history to a file {path?}; defaults to export.txt",
        }
    }

    /// Look a tool up by wire name (case-insensitive, surrounding whitespace ignored).
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|kind| kind.name() == wanted)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A read-only git subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitCommand {
    Status,
    Log,
    Diff,
    Branch,
    Show,
}

impl GitCommand {
    /// Parse the first word of a git request (`"git status"` and `"status -s"` both work).
    pub fn parse(input: &str) -> Option<Self> {
        let mut words = input.split_whitespace();
        let mut first = words.next()?;
        if first.eq_ignore_ascii_case("git") {
            first = words.next().unwrap_or("status");
        }
        match first.to_ascii_lowercase().as_str() {
            "status" => Some(Self::Status),
            "log" => Some(Self::Log),
            "diff" => Some(Self::Diff),
            "branch" | "branches" => Some(Self::Branch),
            "show" => Some(Self::Show),
            _ => None,
        }
    }

    /// Arguments passed to the `git` executable.
    pub fn args(self) -> &'static [&'static str] {
        match self {
            GitCommand::Status => &["status", "--short", "--branch"],
            GitCommand::Log => &["log", "--oneline", "-n", "10"],
            GitCommand::Diff => &["diff", "--stat"],
            GitCommand::Branch => &["branch", "--list"],
            GitCommand::Show => &["show", "--stat", "HEAD"],
        }
    }
}

/// An unvalidated action as emitted by the intent parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAction {
    /// Tool name as written by the model or rule table
    pub tool: String,

    /// Parameters; usually an object, tolerated as null or a bare string
    #[serde(default)]
    pub params: serde_json::Value,
}

impl RawAction {
    pub fn new(tool: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            tool: tool.into(),
            params,
        }
    }

    /// An action with no parameters.
    pub fn bare(kind: ToolKind) -> Self {
        Self::new(kind.name(), serde_json::Value::Null)
    }
}

/// A validated action with a typed parameter shape per tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CreateFile { path: String, content: Option<String> },
    ReadFile { path: String },
    DeleteFile { path: String },
    ListDirectory { directory: String },
    SearchFiles { query: String },
    SearchContent { query: String },
    AddContext { paths: Vec<String> },
    RemoveContext { paths: Vec<String> },
    ClearContext,
    ShowContext,
    AnalyzeCode { paths: Vec<String> },
    Git { command: GitCommand },
    ShowHistory,
    ShowStats,
    ShowHelp,
    ExportHistory { path: String },
}

/// Where `export_history` writes when no path is given.
pub const DEFAULT_EXPORT_PATH: &str = "export.txt";

const PATH_KEYS: &[&str] = &["path", "filename", "file", "name"];
const PATHS_KEYS: &[&str] = &["paths", "files", "path", "filename", "file"];
const QUERY_KEYS: &[&str] = &["query", "pattern", "text"];
const DIRECTORY_KEYS: &[&str] = &["directory", "dir", "path"];
const CONTENT_KEYS: &[&str] = &["content", "code"];
const GIT_KEYS: &[&str] = &["command", "subcommand", "args"];

impl Action {
    /// The tool this action dispatches to.
    pub fn kind(&self) -> ToolKind {
        match self {
            Action::CreateFile { .. } => ToolKind::CreateFile,
            Action::ReadFile { .. } => ToolKind::ReadFile,
            Action::DeleteFile { .. } => ToolKind::DeleteFile,
            Action::ListDirectory { .. } => ToolKind::ListDirectory,
            Action::SearchFiles { .. } => ToolKind::SearchFiles,
            Action::SearchContent { .. } => ToolKind::SearchContent,
            Action::AddContext { .. } => ToolKind::AddContext,
            Action::RemoveContext { .. } => ToolKind::RemoveContext,
            Action::ClearContext => ToolKind::ClearContext,
            Action::ShowContext => ToolKind::ShowContext,
            Action::AnalyzeCode { .. } => ToolKind::AnalyzeCode,
            Action::Git { .. } => ToolKind::Git,
            Action::ShowHistory => ToolKind::ShowHistory,
            Action::ShowStats => ToolKind::ShowStats,
            Action::ShowHelp => ToolKind::ShowHelp,
            Action::ExportHistory { .. } => ToolKind::ExportHistory,
        }
    }

    /// Validate a raw action into a typed one.
    pub fn validate(raw: &RawAction) -> Result<Self, ToolError> {
        let kind = ToolKind::from_name(&raw.tool).ok_or_else(|| ToolError::NotFound(raw.tool.clone()))?;
        let params = Params(&raw.params);

        let action = match kind {
            ToolKind::CreateFile => Action::CreateFile {
                path: params.require(kind, PATH_KEYS)?,
                content: params.object_string(CONTENT_KEYS),
            },
            ToolKind::ReadFile => Action::ReadFile {
                path: params.require(kind, PATH_KEYS)?,
            },
            ToolKind::DeleteFile => Action::DeleteFile {
                path: params.require(kind, PATH_KEYS)?,
            },
            ToolKind::ListDirectory => Action::ListDirectory {
                directory: params.string(DIRECTORY_KEYS).unwrap_or_else(|| ".".into()),
            },
            ToolKind::SearchFiles => Action::SearchFiles {
                query: params.string(QUERY_KEYS).unwrap_or_default(),
            },
            ToolKind::SearchContent => Action::SearchContent {
                query: params.require(kind, QUERY_KEYS)?,
            },
            ToolKind::AddContext => Action::AddContext {
                paths: params.require_list(kind, PATHS_KEYS)?,
            },
            ToolKind::RemoveContext => Action::RemoveContext {
                paths: params.require_list(kind, PATHS_KEYS)?,
            },
            ToolKind::ClearContext => Action::ClearContext,
            ToolKind::ShowContext => Action::ShowContext,
            ToolKind::AnalyzeCode => Action::AnalyzeCode {
                paths: params.list(PATHS_KEYS),
            },
            ToolKind::Git => {
                let requested = params.string(GIT_KEYS).unwrap_or_else(|| "status".into());
                let command = GitCommand::parse(&requested).ok_or_else(|| {
                    ToolError::InvalidArguments(format!(
                        "git supports status, log, diff, branch and show, not '{requested}'"
                    ))
                })?;
                Action::Git { command }
            }
            ToolKind::ShowHistory => Action::ShowHistory,
            ToolKind::ShowStats => Action::ShowStats,
            ToolKind::ShowHelp => Action::ShowHelp,
            ToolKind::ExportHistory => Action::ExportHistory {
                path: params.string(PATH_KEYS).unwrap_or_else(|| DEFAULT_EXPORT_PATH.into()),
            },
        };

        Ok(action)
    }
}

/// Lenient accessor over a JSON parameter value.
///
/// A bare string stands in for the tool's primary parameter.
struct Params<'a>(&'a serde_json::Value);

impl Params<'_> {
    fn string(&self, keys: &[&str]) -> Option<String> {
        if let Some(s) = self.0.as_str() {
            return non_empty(s);
        }
        keys.iter()
            .filter_map(|key| self.0.get(*key))
            .find_map(|value| value.as_str().and_then(non_empty))
    }

    /// Like [`Params::string`] but never treats a bare string as the value.
    fn object_string(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|key| self.0.get(*key))
            .find_map(|value| value.as_str().map(str::to_string))
            .filter(|s| !s.is_empty())
    }

    fn list(&self, keys: &[&str]) -> Vec<String> {
        if let Some(s) = self.0.as_str() {
            return non_empty(s).into_iter().collect();
        }
        for key in keys {
            match self.0.get(*key) {
                Some(serde_json::Value::String(s)) => {
                    if let Some(s) = non_empty(s) {
                        return vec![s];
                    }
                }
                Some(serde_json::Value::Array(items)) => {
                    let paths: Vec<String> = items
                        .iter()
                        .filter_map(|item| item.as_str().and_then(non_empty))
                        .collect();
                    if !paths.is_empty() {
                        return paths;
                    }
                }
                _ => {}
            }
        }
        Vec::new()
    }

    fn require(&self, kind: ToolKind, keys: &[&str]) -> Result<String, ToolError> {
        self.string(keys).ok_or_else(|| missing(kind, keys))
    }

    fn require_list(&self, kind: ToolKind, keys: &[&str]) -> Result<Vec<String>, ToolError> {
        let list = self.list(keys);
        if list.is_empty() {
            return Err(missing(kind, keys));
        }
        Ok(list)
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn missing(kind: ToolKind, keys: &[&str]) -> ToolError {
    ToolError::InvalidArguments(format!("{kind} requires a '{}' parameter", keys[0]))
}
