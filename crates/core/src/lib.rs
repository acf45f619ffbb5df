//! # CodeClaw Core
//!
//! Domain types, traits, and error definitions for the CodeClaw coding
//! assistant. This crate has **no I/O framework dependencies**; it defines
//! the model that the tool, provider, and agent crates implement against.
//!
//! ## Design Philosophy
//!
//! - Tools are a closed set ([`ToolKind`]) with typed parameters ([`Action`]).
//!   Untrusted model output arrives as [`RawAction`] and is validated once,
//!   at the orchestrator boundary.
//! - The remote model is a [`Provider`] trait object so the agent never knows
//!   which backend answers.
//! - Session state is a plain owned value; persistence is a separate
//!   collaborator ([`SessionStore`]).

pub mod action;
pub mod error;
pub mod provider;
pub mod session;

// Re-export key types at crate root for ergonomics
pub use action::{Action, RawAction, ToolKind};
pub use error::{Error, ProviderError, Result, SessionError, ToolError};
pub use provider::{CompletionRequest, Provider};
pub use session::{SessionRecord, SessionState, SessionStore, TrackedFile, normalize_path};
