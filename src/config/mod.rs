//! Crate-wide default constants.
//!
//! These govern the parse/retry loop, the transport retry policy, and the
//! token-overflow recovery path. Every one of them can be overridden per
//! engine, per request, or per call.

use std::time::Duration;

/// Default number of corrective re-prompts for a single logical request.
pub const PROMPT_DEFAULT_RETRIES: u32 = 3;

/// Default number of transport-level retries for one completion call.
pub const COMPLETION_DEFAULT_RETRIES: u32 = 2;

/// Default per-call timeout for completion requests.
pub const COMPLETION_DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Initial wait between transport retries. Doubles on every retry.
pub const RATE_LIMIT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Tokens reserved for the model's response when checking the prompt budget.
pub const MINIMUM_RESPONSE_TOKENS: u32 = 200;

/// Prompt-token allowance assumed for models with no configured context size.
pub const DEFAULT_CONTEXT_ALLOWANCE: u32 = 100_000;

/// Starting chunk size (in characters) for token-overflow recovery.
pub const DEFAULT_CHUNK_SIZE: usize = 50_000;

/// Smallest chunk size token-overflow recovery will shrink to.
pub const MIN_CHUNK_SIZE: usize = 1_000;

/// Upper bound on the overlap used when re-splitting during overflow recovery.
pub const SPLIT_OVERLAP_CAP: usize = 200;

/// Default chunk size for text splitters.
pub const SPLITTER_DEFAULT_CHUNK_SIZE: usize = 1_000;

/// Default overlap carried between adjacent chunks.
pub const SPLITTER_DEFAULT_CHUNK_OVERLAP: usize = 200;
