//! Conversation orchestration.
//!
//! [`Chat`] owns one transcript and drives the request/validate/retry loop
//! against a model provider; [`Persona`] shapes the seed system message;
//! `request_with_split` recovers from token-overflow failures by shrinking
//! the input text.

mod engine;
mod persona;
mod recovery;

pub use engine::{Chat, ChatConfig, ChatError, ChatResponse};
pub use persona::Persona;
pub use recovery::SplitOptions;
