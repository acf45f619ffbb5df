//! Remote model provider implementations for CodeClaw.
//!
//! All providers implement the `codeclaw_core::Provider` trait.
//! [`router::build_from_config`] selects one based on configuration.

pub mod disabled;
pub mod ollama;
pub mod openai_compat;
pub mod router;

pub use disabled::DisabledProvider;
pub use ollama::OllamaProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
