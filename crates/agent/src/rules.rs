//! Rule-based intent parsing.
//!
//! An ordered keyword table over the lowercased request. It never fails and
//! always yields at least one action: anything unrecognised lists the
//! current directory.

use codeclaw_core::action::{RawAction, ToolKind};
use serde_json::json;

use crate::intent::{IntentSource, ParsedIntent};

const CREATE_WORDS: &[&str] = &["create", "make", "build", "generate"];
const READ_WORDS: &[&str] = &["read", "show", "open", "cat", "view", "display"];
const SEARCH_WORDS: &[&str] = &["find", "search", "look for", "locate", "grep"];
const ANALYZE_WORDS: &[&str] = &["analyze", "analyse", "review", "explain", "inspect"];

/// Language words and the extension a file search should use for them.
const LANGUAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("python", ".py"),
    ("javascript", ".js"),
    ("typescript", ".ts"),
    ("rust", ".rs"),
    ("html", ".html"),
];

/// Parse `text` with the keyword table.
pub fn parse(text: &str) -> ParsedIntent {
    let lowered = text.trim().to_lowercase();
    let file = file_token(text);
    let (message, action) = classify(&lowered, file.as_deref());
    ParsedIntent {
        message: message.to_string(),
        actions: vec![action],
        source: IntentSource::Rules,
    }
}

fn classify(lowered: &str, file: Option<&str>) -> (&'static str, RawAction) {
    let has = |word: &str| contains_word(lowered, word);
    let any = |words: &[&str]| words.iter().any(|w| has(*w));

    if has("help") || lowered.contains("what can you do") {
        return ("Showing help", RawAction::bare(ToolKind::ShowHelp));
    }
    if has("git") {
        let command = ["status", "log", "diff", "branch", "show"]
            .into_iter()
            .find(|c| has(*c))
            .unwrap_or("status");
        return ("Running git", RawAction::new("git", json!({ "command": command })));
    }
    if has("export") {
        let action = match file {
            Some(file) => RawAction::new("export_history", json!({ "path": file })),
            None => RawAction::bare(ToolKind::ExportHistory),
        };
        return ("Exporting history", action);
    }
    if has("history") {
        return ("Showing history", RawAction::bare(ToolKind::ShowHistory));
    }
    if has("stats") || has("statistics") {
        return ("Showing statistics", RawAction::bare(ToolKind::ShowStats));
    }
    if has("context") {
        if has("clear") || has("reset") {
            return ("Clearing context", RawAction::bare(ToolKind::ClearContext));
        }
        if let Some(file) = file {
            if has("remove") || has("drop") {
                return ("Removing from context", RawAction::new("remove_context", json!({ "paths": [file] })));
            }
            if has("add") || has("track") {
                return ("Adding to context", RawAction::new("add_context", json!({ "paths": [file] })));
            }
        }
        return ("Showing context", RawAction::bare(ToolKind::ShowContext));
    }
    if let Some(file) = file {
        if has("delete") || has("remove") {
            return ("Deleting file", RawAction::new("delete_file", json!({ "path": file })));
        }
        if has("add") || has("track") {
            return ("Adding to context", RawAction::new("add_context", json!({ "paths": [file] })));
        }
    }
    if any(CREATE_WORDS) {
        let (message, name) = creation_target(lowered, file);
        return (message, RawAction::new("create_file", json!({ "filename": name })));
    }
    if any(ANALYZE_WORDS) {
        let params = file.map(|f| json!({ "files": [f] })).unwrap_or_else(|| json!({}));
        return ("Analyzing code", RawAction::new("analyze_code", params));
    }
    if any(SEARCH_WORDS) {
        if let Some(ext) = language_extension(lowered) {
            return ("Finding files", RawAction::new("search_files", json!({ "query": ext })));
        }
        if let Some(term) = search_term(lowered) {
            return ("Searching file contents", RawAction::new("search_content", json!({ "query": term })));
        }
        if let Some(file) = file {
            return ("Finding files", RawAction::new("search_files", json!({ "query": file })));
        }
        return ("Finding files", RawAction::new("search_files", json!({ "query": "" })));
    }
    if any(READ_WORDS) {
        if let Some(file) = file {
            return ("Reading file", RawAction::new("read_file", json!({ "path": file })));
        }
        if has("files") {
            return ("Finding files", RawAction::new("search_files", json!({ "query": "" })));
        }
    }
    if let Some(file) = file {
        return ("Reading file", RawAction::new("read_file", json!({ "path": file })));
    }
    ("Listing directory", RawAction::bare(ToolKind::ListDirectory))
}

/// The file extension for the first language word in `text`, if any.
pub fn language_extension(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    LANGUAGE_EXTENSIONS
        .iter()
        .find(|(lang, _)| contains_word(&lowered, lang))
        .map(|(_, ext)| *ext)
}

fn creation_target<'a>(lowered: &str, file: Option<&'a str>) -> (&'static str, &'a str) {
    if let Some(file) = file {
        return ("Creating file", file);
    }
    if lowered.contains("download") || contains_word(lowered, "url") {
        ("Creating file downloader", "file_downloader.py")
    } else if lowered.contains("scrape") || lowered.contains("scraper") {
        ("Creating web scraper", "web_scraper.py")
    } else if lowered.contains("calc") {
        ("Creating calculator", "calculator.py")
    } else if lowered.contains("server") || contains_word(lowered, "api") {
        ("Creating HTTP server", "http_server.py")
    } else if lowered.contains("hello") {
        ("Creating hello world", "hello.py")
    } else {
        ("Creating Python script", "script.py")
    }
}

/// Whole-word (or whole-phrase) containment.
fn contains_word(haystack: &str, word: &str) -> bool {
    haystack.match_indices(word).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + word.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// The first word that looks like a file name: a stem, a dot and a short
/// alphanumeric extension.
fn file_token(text: &str) -> Option<String> {
    text.split_whitespace()
        .map(|word| {
            word.trim_start_matches(is_punctuation)
                .trim_end_matches(|c: char| c == '.' || is_punctuation(c))
        })
        .find(|word| {
            let Some((stem, ext)) = word.rsplit_once('.') else {
                return false;
            };
            let stem_name = stem.rsplit('/').next().unwrap_or(stem);
            !stem_name.is_empty()
                && (1..=5).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
                && ext.chars().any(|c| c.is_ascii_alphabetic())
        })
        .map(str::to_string)
}

fn is_punctuation(c: char) -> bool {
    "\"'`,;:!?()[]{}".contains(c)
}

/// What to look for in "search for X" / "find X in files" style requests.
fn search_term(lowered: &str) -> Option<String> {
    if let Some(start) = lowered.find(['"', '\'']) {
        let quote = lowered[start..].chars().next()?;
        let rest = &lowered[start + 1..];
        if let Some(end) = rest.find(quote) {
            return Some(rest[..end].to_string()).filter(|s| !s.trim().is_empty());
        }
    }
    for marker in ["containing ", "search for ", "look for ", "grep ", "usages of ", "references to "] {
        if let Some(pos) = lowered.find(marker) {
            let term = lowered[pos + marker.len()..]
                .split(" in ")
                .next()
                .unwrap_or_default()
                .trim();
            if !term.is_empty() && term != "files" {
                return Some(term.to_string());
            }
        }
    }
    None
}
