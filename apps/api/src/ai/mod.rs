//! AI invocation layer — the single point of entry for all generative-text
//! calls in the platform.
//!
//! Feature code (CV suggestions, career chatbot, skill extraction, roadmap
//! generation) builds a prompt and calls `Orchestrator::generate`; nothing else
//! talks to a vendor API directly. Provider order, fallback and credentials
//! come from the admin-editable settings held in `ConfigCache`.

pub mod cache;
pub mod clients;
pub mod error;
pub mod handlers;
pub mod orchestrator;
pub mod probe;
pub mod provider;
pub mod settings;
pub mod store;

pub use cache::ConfigCache;
pub use clients::{HttpBackend, ProviderBackend};
pub use error::AiError;
pub use orchestrator::Orchestrator;
