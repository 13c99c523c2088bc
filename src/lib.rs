//! Chatflow - Typed, validated conversations with LLM chat models
//!
//! This crate turns a single logical prompt into a bounded, self-correcting
//! sequence of chat-completion calls: structured output is extracted from the
//! model's free text, validated, and re-prompted with corrective feedback
//! until it conforms or the retry budget runs out. Prompts that exceed the
//! model's token budget are recovered by recursively splitting the input into
//! smaller chunks.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
