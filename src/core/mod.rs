//! Core request handling
//!
//! The chat engine gates each request through the rate limiter, loads
//! short-term memory, builds the prompt and walks the provider cascade.

mod chat;
mod decorate;
mod memory;
mod rate_limit;

pub use chat::{ChatEngine, ChatError, ChatRequest, SubjectAttachment};
pub use memory::GUEST_UID;
