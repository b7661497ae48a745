//! Threadroute Core Library
//!
//! Conversation routing for multi-turn assistants: decides whether a query
//! continues its thread or opens a new topic, and answers it accordingly.
//!
//! # Features
//! - Query classification from lexical cues and embedding relevance
//! - Clean thread memory (one stored answer per interaction) on SQLite
//! - Three-way parallel exploration for new topics, direct contextual answers
//!   for continuations
//! - Ollama and OpenAI-compatible providers behind one trait

pub mod cache;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod llm;
pub mod memory;
pub mod orchestrator;
pub mod routing;
pub mod types;

pub use config::Config;
pub use db::Database;
pub use dispatch::{BranchKey, DispatchOutcome, GenerationMetadata, ResponseDispatcher};
pub use error::{Error, Result, RouteError};
pub use llm::{
    ChatMessage, Completion, Embedder, GenerationParams, HashEmbedder, HttpEmbedder,
    LlmProvider, MetricsSnapshot, OllamaClient, OpenAiClient, ProviderKind, ProviderRegistry,
};
pub use memory::{
    ConversationMemory, InMemoryThreadStore, MemoryStats, SqliteThreadStore, ThreadStore,
    ThreadSummary,
};
pub use orchestrator::{QueryRequest, ResponsePayload, RoutingResult, ThreadOrchestrator};
pub use routing::{QueryClassifier, RelevanceScorer};
pub use types::{ClassificationResult, Message, QueryType, RelevanceResult, ThreadDocument};

/// Default cache directory name
pub const CACHE_DIR_NAME: &str = "threadroute";

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "threadroute";
