//! Integration tests for the request/validate/retry flow.
//!
//! These tests verify the end-to-end behavior of the conversation engine:
//! 1. Parse failures re-prompt the model with corrective feedback, bounded by
//!    the retry budget
//! 2. The rejected turn stays visible to the model during retries
//! 3. Transcript commits are gated by memory retention
//! 4. Token overflow shrinks the input and retries; everything else
//!    propagates unchanged
//!
//! Uses the in-crate mock provider; no network access involved.

use std::sync::Arc;

use chatflow::adapters::MockModelProvider;
use chatflow::domain::chat::{Chat, ChatConfig, ChatError, Persona, SplitOptions};
use chatflow::domain::prompt::{self, ParseOutcome, RawPrompt};
use chatflow::ports::model::{Completion, MessageRole, ModelError, RequestOptions};

// =============================================================================
// Test Infrastructure
// =============================================================================

fn persona() -> Persona {
    Persona::new("You are a test assistant.")
}

/// Honors RUST_LOG when debugging a failing flow; safe to call repeatedly.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn chat(provider: &Arc<MockModelProvider>) -> Chat {
    init_tracing();
    Chat::new(persona(), ChatConfig::new(), provider.clone())
}

fn chat_with_memory(provider: &Arc<MockModelProvider>) -> Chat {
    Chat::new(
        persona(),
        ChatConfig::new().with_retain_memory(true),
        provider.clone(),
    )
}

/// A prompt whose parse step always rejects with a corrective message.
fn always_rejecting_prompt() -> RawPrompt<String> {
    RawPrompt::new("answer me", |_completion: Completion| async {
        ParseOutcome::retry("That was not acceptable, try again.")
    })
}

// =============================================================================
// Plain requests
// =============================================================================

#[tokio::test]
async fn text_prompt_returns_the_raw_response() {
    let provider = Arc::new(MockModelProvider::new().with_reply("hello back"));
    let mut chat = chat(&provider);

    let response = chat.request(prompt::text("hello"), None).await.unwrap();

    assert_eq!(response.content, "hello back");
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn outgoing_messages_are_transcript_plus_user_message() {
    let provider = Arc::new(MockModelProvider::new());
    let mut chat = chat(&provider);

    chat.request(prompt::text("first question"), None)
        .await
        .unwrap();

    let sent = provider.last_call().unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].role, MessageRole::System);
    assert_eq!(sent[1].role, MessageRole::User);
    assert_eq!(sent[1].content, "first question");
}

// =============================================================================
// Parse retry loop
// =============================================================================

#[tokio::test]
async fn retry_budget_bounds_the_model_calls() {
    let provider = Arc::new(MockModelProvider::new());
    let mut chat = chat(&provider);

    let result = chat
        .request(always_rejecting_prompt().with_retries(2), None)
        .await;

    // 1 initial attempt + 2 retries, then a terminal parsing error.
    assert_eq!(provider.call_count(), 3);
    match result {
        Err(ChatError::ResponseParsing { attempts }) => assert_eq!(attempts, 3),
        other => panic!("expected parsing failure, got {other:?}"),
    }
}

#[tokio::test]
async fn zero_retry_budget_still_attempts_once() {
    let provider = Arc::new(MockModelProvider::new());
    let mut chat = chat(&provider);

    let result = chat
        .request(always_rejecting_prompt().with_retries(0), None)
        .await;

    assert_eq!(provider.call_count(), 1);
    assert!(matches!(result, Err(ChatError::ResponseParsing { .. })));
}

#[tokio::test]
async fn failure_without_retry_prompt_is_terminal_despite_budget() {
    let provider = Arc::new(MockModelProvider::new());
    let mut chat = chat(&provider);

    let prompt = RawPrompt::<String>::new("answer me", |_completion: Completion| async {
        ParseOutcome::fail()
    })
    .with_retries(5);
    let result = chat.request(prompt, None).await;

    assert_eq!(provider.call_count(), 1);
    assert!(matches!(result, Err(ChatError::ResponseParsing { .. })));
}

#[tokio::test]
async fn retry_pins_the_rejected_turn_as_context() {
    let provider = Arc::new(
        MockModelProvider::new()
            .with_reply("certainly not a boolean")
            .with_reply("true"),
    );
    let mut chat = chat(&provider);

    let response = chat
        .request(prompt::boolean("Is water wet?"), None)
        .await
        .unwrap();
    assert!(response.content);
    assert_eq!(provider.call_count(), 2);

    // The second call must include the rejected answer and the corrective
    // user prompt on top of the original turn.
    let retry_call = &provider.calls()[1];
    assert_eq!(retry_call.len(), 4);
    assert_eq!(retry_call[1].role, MessageRole::User);
    assert_eq!(retry_call[2].role, MessageRole::Assistant);
    assert_eq!(retry_call[2].content, "certainly not a boolean");
    assert_eq!(retry_call[3].role, MessageRole::User);
    assert!(retry_call[3].content.contains("true"));
}

#[tokio::test]
async fn corrective_feedback_lets_the_model_fix_structured_output() {
    let provider = Arc::new(
        MockModelProvider::new()
            .with_reply("- short\n- this bullet point is definitely far too long to pass")
            .with_reply("- short\n- also short"),
    );
    let mut chat = chat(&provider);

    let response = chat
        .request(
            prompt::bullet_points(
                prompt::BulletPointsPrompt::new("Two short points, please.").with_length(20),
            ),
            None,
        )
        .await
        .unwrap();

    assert_eq!(response.content, vec!["short", "also short"]);

    // The corrective prompt must name the offending element.
    let retry_call = provider.last_call().unwrap();
    let corrective = &retry_call[retry_call.len() - 1];
    assert!(corrective.content.contains("index 1"));
}

// =============================================================================
// Transcript commits
// =============================================================================

#[tokio::test]
async fn without_memory_retention_the_transcript_never_grows() {
    let provider = Arc::new(MockModelProvider::new());
    let mut chat = chat(&provider);

    chat.request(prompt::text("one"), None).await.unwrap();
    chat.request(prompt::text("two"), None).await.unwrap();
    let _ = chat
        .request(always_rejecting_prompt().with_retries(1), None)
        .await;

    assert_eq!(chat.transcript().len(), 1);
    assert_eq!(chat.transcript()[0].role, MessageRole::System);
}

#[tokio::test]
async fn with_memory_retention_successful_turns_accumulate() {
    let provider = Arc::new(MockModelProvider::new());
    let mut chat = chat_with_memory(&provider);

    chat.request(prompt::text("one"), None).await.unwrap();
    assert_eq!(chat.transcript().len(), 3);

    chat.request(prompt::text("two"), None).await.unwrap();
    assert_eq!(chat.transcript().len(), 5);

    // The second request must have seen the first turn.
    let sent = provider.last_call().unwrap();
    assert_eq!(sent.len(), 4);
}

#[tokio::test]
async fn failed_requests_never_mutate_the_transcript() {
    let provider = Arc::new(MockModelProvider::new());
    let mut chat = chat_with_memory(&provider);

    let _ = chat
        .request(always_rejecting_prompt().with_retries(2), None)
        .await;

    assert_eq!(chat.transcript().len(), 1);
}

#[tokio::test]
async fn successful_retry_commits_the_whole_turn_chain() {
    let provider = Arc::new(
        MockModelProvider::new()
            .with_reply("certainly not a boolean")
            .with_reply("true"),
    );
    let mut chat = chat_with_memory(&provider);

    chat.request(prompt::boolean("Is water wet?"), None)
        .await
        .unwrap();

    // system, user, rejected assistant, corrective user, accepted assistant.
    assert_eq!(chat.transcript().len(), 5);
    assert_eq!(chat.transcript()[4].content, "true");
}

#[tokio::test]
async fn reset_truncates_back_to_the_system_message() {
    let provider = Arc::new(MockModelProvider::new());
    let mut chat = chat_with_memory(&provider);

    chat.request(prompt::text("one"), None).await.unwrap();
    assert!(chat.transcript().len() > 1);

    chat.reset();
    assert_eq!(chat.transcript().len(), 1);
    assert_eq!(chat.transcript()[0].role, MessageRole::System);
}

// =============================================================================
// Token-overflow recovery
// =============================================================================

#[tokio::test]
async fn overflow_propagates_from_a_plain_request() {
    let provider = Arc::new(MockModelProvider::new().with_overflow_fallback(64));
    let mut chat = chat(&provider);

    let result = chat.request(prompt::text("too big"), None).await;
    assert!(matches!(
        result,
        Err(ChatError::Model(ModelError::TokenOverflow {
            overflow_tokens: 64
        }))
    ));
}

#[tokio::test]
async fn unreachable_minimum_fails_after_a_single_attempt() {
    let provider = Arc::new(MockModelProvider::new().with_overflow_fallback(500));
    let mut chat = chat(&provider);

    let result = chat
        .request_with_split(
            "some very long text",
            |text| prompt::text(text),
            None,
            SplitOptions::new(4000, 3000),
        )
        .await;

    // Halving 4000 once lands below 3000, so exactly one network attempt.
    assert_eq!(provider.call_count(), 1);
    match result {
        Err(ChatError::CannotShrink {
            chunk_size,
            min_chunk_size,
        }) => {
            assert_eq!(chunk_size, 4000);
            assert_eq!(min_chunk_size, 3000);
        }
        other => panic!("expected cannot-shrink failure, got {other:?}"),
    }
}

#[tokio::test]
async fn each_overflow_halves_the_chunk_until_the_floor() {
    let provider = Arc::new(MockModelProvider::new().with_overflow_fallback(500));
    let mut chat = chat(&provider);

    let text = "word ".repeat(1000);
    let result = chat
        .request_with_split(&text, |text| prompt::text(text), None, SplitOptions::new(4000, 1000))
        .await;

    assert!(matches!(result, Err(ChatError::CannotShrink { .. })));
    // Attempts at 4000 (full text), 2000, and 1000; halving to 500 gives up.
    assert_eq!(provider.call_count(), 3);

    let calls = provider.calls();
    let sent_len = |index: usize| calls[index].last().unwrap().content.chars().count();
    assert_eq!(sent_len(0), text.chars().count());
    assert!(sent_len(1) <= 2000);
    assert!(sent_len(2) <= 1000);
    assert!(sent_len(1) > sent_len(2));
}

#[tokio::test]
async fn overflow_recovery_retries_with_the_first_chunk_of_the_original_text() {
    let provider = Arc::new(
        MockModelProvider::new()
            .with_error(ModelError::token_overflow(120))
            .with_reply("summarized"),
    );
    let mut chat = chat(&provider);

    let text = "alpha beta gamma delta ".repeat(300);
    let response = chat
        .request_with_split(
            &text,
            |text| prompt::text(text),
            None,
            SplitOptions::new(4000, 1000),
        )
        .await
        .unwrap();

    assert_eq!(response.content, "summarized");
    assert_eq!(provider.call_count(), 2);

    let second = provider.calls()[1].last().unwrap().content.clone();
    assert!(second.chars().count() <= 2000);
    assert!(text.starts_with(second.trim_end()));
}

#[tokio::test]
async fn non_overflow_errors_propagate_unchanged() {
    let provider = Arc::new(
        MockModelProvider::new().with_error(ModelError::unavailable("maintenance window")),
    );
    let mut chat = chat(&provider);

    let result = chat
        .request_with_split(
            "some text",
            |text| prompt::text(text),
            None,
            SplitOptions::default(),
        )
        .await;

    assert_eq!(provider.call_count(), 1);
    assert!(matches!(
        result,
        Err(ChatError::Model(ModelError::Unavailable { .. }))
    ));
}

// =============================================================================
// Composed flows
// =============================================================================

#[tokio::test]
async fn parse_steps_can_consult_a_second_chat() {
    // A summary chat whose parse step fact-checks the answer with a separate
    // boolean conversation.
    let fact_provider = Arc::new(MockModelProvider::new().with_reply("true"));
    let fact_chat = Arc::new(tokio::sync::Mutex::new(Chat::new(
        Persona::new("You are a fact checker."),
        ChatConfig::new(),
        fact_provider.clone(),
    )));

    let summary_provider = Arc::new(MockModelProvider::new().with_reply("The sky is blue."));
    let mut summary_chat = chat(&summary_provider);

    let checker = Arc::clone(&fact_chat);
    let summary_prompt =
        prompt::text("Summarize the article.").with_parse(move |completion: Completion| {
            let checker = Arc::clone(&checker);
            async move {
                let verdict = checker
                    .lock()
                    .await
                    .request(prompt::boolean(completion.content.clone()), None)
                    .await;
                match verdict {
                    Ok(response) if response.content => {
                        ParseOutcome::success(completion.content)
                    }
                    Ok(_) => ParseOutcome::retry(
                        "This summary is not true, please rewrite with only true facts.",
                    ),
                    Err(_) => ParseOutcome::fail(),
                }
            }
        });

    let response = summary_chat.request(summary_prompt, None).await.unwrap();
    assert_eq!(response.content, "The sky is blue.");
    assert_eq!(fact_provider.call_count(), 1);
}

#[tokio::test]
async fn per_request_options_override_engine_defaults() {
    let provider = Arc::new(MockModelProvider::new());
    let mut chat = Chat::new(
        persona(),
        ChatConfig::new().with_default_options(RequestOptions::new().with_retries(9)),
        provider.clone(),
    );

    // Pinned messages fully replace the transcript for this request.
    let pinned = vec![chatflow::ports::model::Message::system("pinned system")];
    chat.request(
        prompt::text("hi"),
        Some(RequestOptions::new().with_messages(pinned)),
    )
    .await
    .unwrap();

    let sent = provider.last_call().unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].content, "pinned system");
}
