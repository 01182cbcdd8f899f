//! Splitting spec text into comparable statements.

const SENTENCE_BREAKS: &[&str] = &[". ", "! ", "? ", "; "];

/// Statements of `text`: lines, then sentences within each line. The
/// terminating punctuation stays with its sentence; surrounding whitespace
/// and blank statements are dropped.
pub fn segments(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for line in text.lines() {
        let mut rest = line;
        while let Some(cut) = next_break(rest) {
            push(&mut out, &rest[..cut]);
            rest = &rest[cut..];
        }
        push(&mut out, rest);
    }
    out
}

/// Byte offset just past the punctuation of the earliest sentence break.
fn next_break(s: &str) -> Option<usize> {
    SENTENCE_BREAKS
        .iter()
        .filter_map(|b| s.find(b))
        .min()
        .map(|i| i + 1)
}

fn push(out: &mut Vec<String>, raw: &str) {
    let s = raw.trim();
    if !s.is_empty() {
        out.push(s.to_string());
    }
}
