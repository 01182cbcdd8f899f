//! Lexical helpers shared by link suggestion, diffing and contradiction
//! detection.

use std::collections::BTreeSet;

/// Lowercased word tokens. Apostrophes inside a word are kept so that
/// contractions like `can't` survive as a single token.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\'').to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Split a path or identifier into lowercase words, breaking on
/// separators and camelCase boundaries.
pub fn split_identifier(ident: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in ident.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current).to_lowercase());
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current).to_lowercase());
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current.to_lowercase());
    }
    words
}

/// Jaccard similarity of the token sets. Two empty inputs are identical.
pub fn jaccard<S: AsRef<str>>(a: &[S], b: &[S]) -> f64 {
    let a: BTreeSet<&str> = a.iter().map(AsRef::as_ref).collect();
    let b: BTreeSet<&str> = b.iter().map(AsRef::as_ref).collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let inter = a.intersection(&b).count() as f64;
    let union = a.union(&b).count() as f64;
    inter / union
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_keeps_contractions() {
        assert_eq!(
            tokenize("The system CAN'T store 'raw' passwords."),
            vec!["the", "system", "can't", "store", "raw", "passwords"]
        );
    }

    #[test]
    fn split_identifier_handles_camel_and_paths() {
        assert_eq!(
            split_identifier("src/auth/AuthService_v2.py"),
            vec!["src", "auth", "auth", "service", "v2", "py"]
        );
        assert_eq!(split_identifier("HTTPServer"), vec!["httpserver"]);
        assert_eq!(split_identifier("getHTTP"), vec!["get", "http"]);
    }

    #[test]
    fn jaccard_bounds() {
        assert_eq!(jaccard::<&str>(&[], &[]), 1.0);
        assert_eq!(jaccard(&["a", "b"], &["a", "b"]), 1.0);
        assert_eq!(jaccard(&["a"], &["b"]), 0.0);
        let s = jaccard(&["shall", "support", "x"], &["shall", "not", "support", "x"]);
        assert!((s - 0.75).abs() < 1e-9);
    }
}
