//! Local collaborators the CodeClaw orchestrator executes actions against.
//!
//! Everything here works relative to a single working-tree root:
//! reading and writing files, indexing the tracked working set,
//! resolving loosely-specified paths, and running read-only git commands.

pub mod content_index;
pub mod file_store;
pub mod git;
pub mod resolve;
pub mod templates;

pub use content_index::{ContentIndex, ContentMatch, IndexSnapshot};
pub use file_store::{DirListing, FileStore};
pub use git::GitRunner;
pub use resolve::resolve_path;

/// Truncate `text` to at most `max_chars` characters, appending `...` when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_short_text_unchanged() {
        assert_eq!(preview("hello", 10), "hello");
        assert_eq!(preview("hello", 5), "hello");
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        assert_eq!(preview("héllo wörld", 4), "héll...");
    }
}
