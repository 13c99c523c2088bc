//! Ports - capability interfaces consumed by the domain.
//!
//! Following hexagonal architecture, these traits define what the
//! conversation engine needs from the outside world without coupling to
//! concrete implementations. Adapters provide the implementations.

pub mod model;
pub mod schema;

pub use model::{
    Completion, Message, MessageRole, ModelError, ModelProvider, ProviderInfo, RequestOptions,
    TokenUsage,
};
pub use schema::{Issue, PathSegment, Schema};
