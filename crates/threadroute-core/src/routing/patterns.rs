//! Lexical cues used by the query classifier
//!
//! Each set is scored as the fraction of its patterns that match a query.

use lazy_static::lazy_static;
use regex::Regex;

/// One cue; `unless_followed_by` rejects a match when the rest of the query
/// contains that pattern
pub struct LexicalPattern {
    re: Regex,
    unless_followed_by: Option<&'static Regex>,
}

impl LexicalPattern {
    fn new(pattern: &str) -> Self {
        Self {
            re: compile(pattern),
            unless_followed_by: None,
        }
    }

    fn unless(pattern: &str, guard: &'static Regex) -> Self {
        Self {
            re: compile(pattern),
            unless_followed_by: Some(guard),
        }
    }

    pub fn is_match(&self, query: &str) -> bool {
        match self.unless_followed_by {
            None => self.re.is_match(query),
            Some(guard) => self
                .re
                .find_iter(query)
                .any(|m| !guard.is_match(&query[m.end()..])),
        }
    }
}

fn compile(pattern: &str) -> Regex {
    // patterns are literals in this file; a bad one is a programming error
    Regex::new(&format!("(?i){}", pattern)).unwrap()
}

lazy_static! {
    static ref BACK_REFERENCE_RE: Regex = compile(r"\b(it|this|that)\b");

    /// Signals that the query leans on what was said before
    pub static ref FOLLOW_UP_PATTERNS: Vec<LexicalPattern> = vec![
        LexicalPattern::new(r"\b(can you|could you|would you|will you)\b"),
        LexicalPattern::new(r"\b(tell me more|explain|elaborate|describe)\b"),
        LexicalPattern::new(r"\b(give me|show me|provide|list)\b"),
        LexicalPattern::new(r"\b(what about|how about|what if)\b"),
        LexicalPattern::new(r"\b(also|additionally|furthermore|moreover)\b"),
        LexicalPattern::new(r"\b(it|this|that|they|them|those|these)\b"),
        LexicalPattern::new(r"\b(he|she|his|her|their)\b"),
        LexicalPattern::new(r"^\s*(why|how|when|where|who|which)\b"),
        LexicalPattern::new(r"\b(examples?|instances?|case|sample)\b"),
        LexicalPattern::new(r"\b(and|but|however|although|though)\b"),
        LexicalPattern::new(r"\b(next|then|after|before|during)\b"),
    ];

    /// Requests to restate the previous answer, grouped by kind of request
    pub static ref CLARIFICATION_PATTERNS: Vec<LexicalPattern> = vec![
        LexicalPattern::new(
            r"\b(what do you mean|i don['’]?t understand|i do not understand|unclear|confusing|i['’]?m confused|not sure|don['’]?t get it)\b"
        ),
        LexicalPattern::new(r"\b(can you clarify|clarify|explain better|more detail|be more specific)\b"),
        LexicalPattern::new(r"\b(rephrase|say that again|repeat)\b"),
    ];

    /// Self-contained question openers
    pub static ref NEW_TOPIC_PATTERNS: Vec<LexicalPattern> = vec![
        LexicalPattern::new(r"\b(what is|what are|define|definition)\b"),
        LexicalPattern::unless(r"\b(tell me about|explain|describe)\b", &BACK_REFERENCE_RE),
        LexicalPattern::unless(r"\b(how does|how do|how can|how to)\b", &BACK_REFERENCE_RE),
        LexicalPattern::new(r"\b(compare|difference between|versus|vs)\b"),
        LexicalPattern::new(r"\b(pros and cons|advantages|disadvantages)\b"),
    ];
}

/// Fraction of `patterns` matching `query`, in 0-1
pub fn pattern_score(query: &str, patterns: &[LexicalPattern]) -> f64 {
    if patterns.is_empty() {
        return 0.0;
    }
    let matches = patterns.iter().filter(|p| p.is_match(query)).count();
    matches as f64 / patterns.len() as f64
}
