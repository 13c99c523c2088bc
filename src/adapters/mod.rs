//! Adapters - concrete implementations of the ports.

pub mod mock;
pub mod openai;

pub use mock::MockModelProvider;
pub use openai::{OpenAiConfig, OpenAiProvider};
