//! Detecting statements that contradict each other.

use std::fmt;

use serde::{Deserialize, Serialize};

use specmem_core::text::{jaccard, tokenize};

/// Two statements from different versions of one spec that cannot both hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contradiction {
    pub spec_id: String,
    pub earlier_version: String,
    pub later_version: String,
    pub earlier_text: String,
    pub later_text: String,
}

/// Decides whether two statements contradict each other.
///
/// Implementations must be symmetric: `conflicts(a, b) == conflicts(b, a)`.
pub trait ContradictionDetector: fmt::Debug + Send + Sync {
    fn conflicts(&self, a: &str, b: &str) -> bool;
}

/// Lexical negation check.
///
/// Both statements are reduced to canonical tokens: negation cues are
/// removed and opposed words are mapped onto one form, each counting as a
/// negation. Statements conflict when their canonical tokens are nearly the
/// same and their negation counts differ in parity.
#[derive(Debug, Clone)]
pub struct NegationHeuristic {
    min_similarity: f64,
}

impl Default for NegationHeuristic {
    fn default() -> Self {
        Self {
            min_similarity: 0.8,
        }
    }
}

/// A statement reduced for comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Canonical {
    pub tokens: Vec<String>,
    pub negations: usize,
}

impl NegationHeuristic {
    pub fn new(min_similarity: f64) -> Self {
        Self { min_similarity }
    }

    /// Reduce a statement to its canonical tokens and negation count.
    pub fn canonicalize(text: &str) -> Canonical {
        let mut tokens = Vec::new();
        let mut negations = 0;
        for token in tokenize(text) {
            let (word, negated) = canonical_word(&token);
            if negated {
                negations += 1;
            }
            if let Some(w) = word {
                tokens.push(w);
            }
        }
        Canonical { tokens, negations }
    }

    /// True when `a` and `b` say the same thing with opposite polarity.
    pub fn is_polarity_flip(&self, a: &str, b: &str) -> bool {
        let a = Self::canonicalize(a);
        let b = Self::canonicalize(b);
        if a.tokens.is_empty() || b.tokens.is_empty() {
            return false;
        }
        a.negations % 2 != b.negations % 2 && jaccard(&a.tokens, &b.tokens) >= self.min_similarity
    }
}

impl ContradictionDetector for NegationHeuristic {
    fn conflicts(&self, a: &str, b: &str) -> bool {
        self.is_polarity_flip(a, b)
    }
}

/// Canonical form of one token and whether it carries a negation.
fn canonical_word(token: &str) -> (Option<String>, bool) {
    match token {
        "not" | "no" | "non" => (None, true),
        "never" => (Some("always".into()), true),
        "cannot" => (Some("can".into()), true),
        "won't" => (Some("will".into()), true),
        "can't" => (Some("can".into()), true),
        "shan't" => (Some("shall".into()), true),
        "disable" | "disabled" | "disables" => (Some("enable".into()), true),
        "enabled" | "enables" => (Some("enable".into()), false),
        "forbid" | "forbidden" | "forbids" | "prohibit" | "prohibited" | "prohibits" | "deny"
        | "denied" | "denies" | "disallow" | "disallowed" | "disallows" => {
            (Some("allow".into()), true)
        }
        "allowed" | "allows" | "permit" | "permitted" | "permits" => (Some("allow".into()), false),
        "optional" => (Some("required".into()), true),
        "mandatory" => (Some("required".into()), false),
        _ => match token.strip_suffix("n't") {
            Some(stem) if !stem.is_empty() => (Some(stem.to_string()), true),
            _ => (Some(token.to_string()), false),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flip(a: &str, b: &str) -> bool {
        NegationHeuristic::default().conflicts(a, b)
    }

    #[test]
    fn plain_negation() {
        assert!(flip("Shall support X", "Shall NOT support X"));
        assert!(flip("Shall NOT support X", "Shall support X"));
    }

    #[test]
    fn opposed_words() {
        assert!(flip("Guests are allowed to comment.", "Guests are forbidden to comment."));
        assert!(flip("Caching is enabled by default", "Caching is disabled by default"));
        assert!(flip("The field is mandatory", "The field is optional"));
        assert!(flip("Users always see the banner", "Users never see the banner"));
    }

    #[test]
    fn double_negation_is_agreement() {
        assert!(!flip("Users may not disable logging", "Users may enable logging"));
        assert!(!flip("Logging is not disabled", "Logging is enabled"));
    }

    #[test]
    fn contractions() {
        assert!(flip("The service does retry", "The service doesn't retry"));
        assert!(flip("Clients can cache tokens", "Clients cannot cache tokens"));
    }

    #[test]
    fn unrelated_statements() {
        assert!(!flip("Shall support X", "Billing runs nightly and not hourly"));
        assert!(!flip("Shall support X", "Shall support X"));
        assert!(!flip("", "not"));
    }

    #[test]
    fn canonical_form() {
        let c = NegationHeuristic::canonicalize("Never store passwords");
        assert_eq!(c.tokens, vec!["always", "store", "passwords"]);
        assert_eq!(c.negations, 1);
    }
}
