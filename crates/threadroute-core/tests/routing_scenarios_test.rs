//! End-to-end routing scenarios against scripted providers

mod common;

use common::{orchestrator, ScriptedProvider, ANSWER};
use std::sync::Arc;
use threadroute_core::dispatch::prompts::BRANCH_APOLOGY;
use threadroute_core::{
    BranchKey, InMemoryThreadStore, QueryRequest, QueryType, ResponsePayload, RouteError,
};

fn exploratory(payload: &ResponsePayload) -> &std::collections::BTreeMap<BranchKey, String> {
    match payload {
        ResponsePayload::Exploratory { responses, .. } => responses,
        other => panic!("expected exploratory payload, got {:?}", other),
    }
}

#[tokio::test]
async fn test_new_topic_without_thread() {
    let provider = Arc::new(ScriptedProvider::new());
    let o = orchestrator(Arc::new(InMemoryThreadStore::new()), provider.clone());

    let result = o
        .process_query(QueryRequest::new("What is machine learning?", "user-1"))
        .await
        .unwrap();

    assert_eq!(result.query_type, QueryType::NewTopic);
    assert_eq!(result.classification_confidence, 1.0);
    assert_eq!(result.context_messages_used, 0);
    assert!(!result.was_continuation);
    assert!(!result.degraded);

    let responses = exploratory(&result.response);
    assert_eq!(responses.len(), 3);
    for key in BranchKey::ALL {
        assert_eq!(responses[&key], ANSWER);
    }

    // one reframing call plus three branches
    assert_eq!(provider.prompts().len(), 4);
    assert!(result.generation.parallel_efficiency.is_some());

    let metrics = result.provider_metrics.unwrap();
    assert_eq!(metrics.total_requests, 4);
    assert_eq!(metrics.total_errors, 0);
    assert_eq!(metrics.total_tokens, 96);
}

#[tokio::test]
async fn test_follow_up_uses_context() {
    let provider = Arc::new(ScriptedProvider::new());
    let o = orchestrator(Arc::new(InMemoryThreadStore::new()), provider.clone());

    let first = o
        .process_query(QueryRequest::new("What is machine learning?", "user-1"))
        .await
        .unwrap();

    let second = o
        .process_query(
            QueryRequest::new("Can you give me examples?", "user-1").with_thread(&first.thread_id),
        )
        .await
        .unwrap();

    assert!(matches!(
        second.query_type,
        QueryType::FollowUp | QueryType::RelatedTopic
    ));
    assert!(second.was_continuation);
    assert!(second.context_messages_used > 0);
    assert!(matches!(second.response, ResponsePayload::Direct { .. }));
    assert_eq!(second.thread_id, first.thread_id);

    let last_prompt = provider.prompts().pop().unwrap();
    assert!(last_prompt.contains("User: What is machine learning?"));
    assert!(last_prompt.contains("Current user query: Can you give me examples?"));

    let history = o.history(&first.thread_id, 10).await.unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn test_clarification_uses_last_exchange() {
    let o = orchestrator(
        Arc::new(InMemoryThreadStore::new()),
        Arc::new(ScriptedProvider::new()),
    );

    let first = o
        .process_query(QueryRequest::new("What is machine learning?", "user-1"))
        .await
        .unwrap();
    o.process_query(
        QueryRequest::new("Can you give me examples?", "user-1").with_thread(&first.thread_id),
    )
    .await
    .unwrap();

    let result = o
        .process_query(QueryRequest::new("I don't understand", "user-1").with_thread(&first.thread_id))
        .await
        .unwrap();

    assert_eq!(result.query_type, QueryType::Clarification);
    assert_eq!(result.context_messages_used, 2);
}

#[tokio::test]
async fn test_failed_branch_does_not_fail_request() {
    // only the systems question mentions "components"
    let provider = Arc::new(ScriptedProvider::failing_on("training components"));
    let o = orchestrator(Arc::new(InMemoryThreadStore::new()), provider);

    let result = o
        .process_query(QueryRequest::new("What is machine learning?", "user-1"))
        .await
        .unwrap();

    let responses = exploratory(&result.response);
    assert_eq!(responses[&BranchKey::Systems], BRANCH_APOLOGY);
    assert_eq!(responses[&BranchKey::Primary], ANSWER);
    assert_eq!(responses[&BranchKey::Applied], ANSWER);
    assert!(result.degraded);
    assert_eq!(result.provider_metrics.unwrap().total_errors, 1);

    let history = o.history(&result.thread_id, 10).await.unwrap();
    assert_eq!(history[0].ai_response, ANSWER);
}

#[tokio::test]
async fn test_unknown_thread_starts_fresh() {
    let o = orchestrator(
        Arc::new(InMemoryThreadStore::new()),
        Arc::new(ScriptedProvider::new()),
    );
    let result = o
        .process_query(QueryRequest::new("Tell me more", "user-1").with_thread("thread_missing"))
        .await
        .unwrap();

    assert_eq!(result.thread_id, "thread_missing");
    assert_eq!(result.query_type, QueryType::NewTopic);
    assert!(o.thread_exists("thread_missing").await.unwrap());
}

#[tokio::test]
async fn test_provider_tag_normalised() {
    let o = orchestrator(
        Arc::new(InMemoryThreadStore::new()),
        Arc::new(ScriptedProvider::new()),
    );

    let ok = o
        .process_query(QueryRequest::new("What is Rust?", "u").with_provider("LLMProvider.OLLAMA"))
        .await;
    assert!(ok.is_ok());

    let err = o
        .process_query(QueryRequest::new("What is Rust?", "u").with_provider("bard"))
        .await
        .unwrap_err();
    assert!(matches!(err, RouteError::InvalidInput(_)));
}
