//! AI HealthMate: health pages that forward form input to an LLM
//! chat-completion API and render the reply.

pub mod bridge;
pub mod pages;
pub mod pdf;
pub mod prompts;
pub mod session;
#[cfg(feature = "web")]
pub mod web;

pub use bridge::{Bridge, BridgeConfig, BridgeReply, FALLBACK_REPLY};
pub use pages::Page;
pub use session::{ChatHistory, SessionState, SessionStore, WeightLog};
