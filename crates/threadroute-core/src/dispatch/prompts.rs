//! Prompt templates and parsing of the reframing reply

use crate::types::Message;
use lazy_static::lazy_static;
use regex::Regex;

/// Replaces a branch answer that failed or timed out
pub const BRANCH_APOLOGY: &str = "I apologize, but I encountered an error generating this response variation. Please try again.";

/// Replaces a direct answer that failed or timed out
pub const DIRECT_APOLOGY: &str = "I apologize, but I encountered an error while processing your follow-up question. Please try rephrasing your query.";

const NO_CONTEXT: &str = "No previous conversation context.";

/// Number of reframed questions, one per exploratory branch
pub const QUESTION_COUNT: usize = 3;

/// Unnumbered lines shorter than this are treated as chatter, not questions
const MIN_UNNUMBERED_LEN: usize = 20;

lazy_static! {
    static ref NUMBERED_RE: Regex = Regex::new(r"^\s*(?:[-*]\s*)?\(?([1-9])\s*[.):]\s*(.*)$").unwrap();
    static ref BRACKET_LABEL_RE: Regex = Regex::new(r"^\s*\[[^\]]*\]\s*:?\s*").unwrap();
    static ref NAMED_LABEL_RE: Regex =
        Regex::new(r"(?i)^\s*(essence|systems|application)\s+question(\s*\([abc]\))?\s*:\s*").unwrap();
}

/// Ask for three questions that look at `query` from different angles
pub fn reframe_prompt(query: &str) -> String {
    format!(
        r#"Original query:
{query}

Write three distinct questions that, answered in depth, together give a complete understanding of the original query.

Essence Question (A):
Ask about the fundamental concepts, core principles and theory behind the query. It should uncover the "why".

Systems Question (B):
Ask how the parts involved relate to, depend on and interact with each other. It should uncover the "how".

Application Question (C):
Ask about practical use: real-world examples, implementation, challenges and actionable advice. It should uncover the "what".

Every question must stay on the original query, cover a different dimension, and be answerable in detail.

Reply with exactly three numbered questions and nothing else:
1. [Essence Question]
2. [Systems Question]
3. [Application Question]"#
    )
}

/// Questions used when the reframing call itself fails
pub fn fallback_questions(query: &str) -> Vec<String> {
    vec![
        format!("What are the fundamental concepts and principles behind: {}?", query),
        format!(
            "How do the different components and systems related to '{}' work together?",
            query
        ),
        format!(
            "What are the practical applications and real-world implementations of: {}?",
            query
        ),
    ]
}

/// Extract exactly [`QUESTION_COUNT`] questions from a reframing reply.
///
/// Numbered lines (`1.`, `2)`, `3:`) are taken first-come; unnumbered lines
/// longer than 20 characters fill in while fewer than three were found.
/// Missing questions are padded, extra ones dropped.
pub fn parse_reframed_questions(reply: &str) -> Vec<String> {
    let mut questions: Vec<String> = Vec::with_capacity(QUESTION_COUNT);

    for line in reply.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(caps) = NUMBERED_RE.captures(line) {
            let question = clean(caps.get(2).map_or("", |m| m.as_str()));
            if !question.is_empty() {
                questions.push(question);
            }
        } else if questions.len() < QUESTION_COUNT && line.chars().count() > MIN_UNNUMBERED_LEN {
            let question = clean(line);
            if !question.is_empty() {
                questions.push(question);
            }
        }
    }

    questions.truncate(QUESTION_COUNT);
    while questions.len() < QUESTION_COUNT {
        questions.push(format!(
            "Please provide more details about this topic (variation {}).",
            questions.len() + 1
        ));
    }
    questions
}

fn clean(raw: &str) -> String {
    let stripped = raw.replace("**", "");
    let stripped = NAMED_LABEL_RE.replace(&stripped, "");
    let stripped = BRACKET_LABEL_RE.replace(&stripped, "");
    stripped.trim().to_string()
}

/// Render prior exchanges for the contextual prompt
pub fn format_context(context: &[Message]) -> String {
    if context.is_empty() {
        return NO_CONTEXT.to_string();
    }

    let mut parts = Vec::with_capacity(context.len() * 4);
    for (i, message) in context.iter().enumerate() {
        parts.push(format!("Exchange {}:", i + 1));
        parts.push(format!("User: {}", message.user_query));
        parts.push(format!("Assistant: {}", message.ai_response));
        parts.push(String::new());
    }
    parts.join("\n")
}

/// Single prompt carrying the context window and the current query
pub fn contextual_prompt(context: &[Message], query: &str) -> String {
    format!(
        r#"You are an expert AI assistant in the middle of an ongoing conversation.

Previous conversation context:
{context}

Current user query: {query}

Using the conversation above, write a thorough answer that:
- Addresses the current query directly
- Draws on what was already discussed where it is relevant
- Keeps the conversation coherent
- Gives helpful, detailed information

Response:"#,
        context = format_context(context),
        query = query
    )
}
