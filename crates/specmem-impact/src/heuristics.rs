//! Path classification and lexical link strength.

use std::collections::BTreeSet;
use std::path::Path;

use specmem_core::text::{split_identifier, tokenize};
use specmem_core::NodeKind;

/// Directories never descended into when discovering source files.
pub const SKIPPED_DIRS: &[&str] = &[
    "target",
    "node_modules",
    "__pycache__",
    "venv",
    "dist",
    "build",
];

/// Upper bound for a suggested edge's confidence.
pub const MAX_SUGGESTED_CONFIDENCE: f64 = 0.9;

const SOURCE_EXTENSIONS: &[&str] = &[
    "py", "rs", "js", "jsx", "ts", "tsx", "go", "java", "kt", "rb", "c", "h", "cc", "cpp", "hpp",
    "cs", "swift", "php", "scala",
];

const TEST_DIRS: &[&str] = &["test", "tests", "__tests__", "spec", "specs"];

/// Path words too common to indicate a relation.
const GENERIC_TOKENS: &[&str] = &[
    "src", "lib", "main", "index", "init", "mod", "util", "utils", "common", "core", "test",
    "tests", "spec", "specs", "app", "pkg", "internal", "impl", "base",
];

/// True when the path looks like a test file.
pub fn is_test_path(path: &str) -> bool {
    let unified = path.replace('\\', "/");
    let mut parts: Vec<&str> = unified.split('/').filter(|p| !p.is_empty()).collect();
    let Some(file) = parts.pop() else {
        return false;
    };
    if parts
        .iter()
        .any(|d| TEST_DIRS.contains(&d.to_ascii_lowercase().as_str()))
    {
        return true;
    }
    let stem = file.split_once('.').map_or(file, |(s, _)| s);
    let full_stem = file.rsplit_once('.').map_or(file, |(s, _)| s);
    let lower = full_stem.to_ascii_lowercase();
    if stem.to_ascii_lowercase().starts_with("test_")
        || lower.ends_with("_test")
        || lower.ends_with(".test")
        || lower.ends_with("_spec")
        || lower.ends_with(".spec")
    {
        return true;
    }
    stem.starts_with(|c: char| c.is_ascii_uppercase())
        && (stem.ends_with("Test") || stem.ends_with("Tests"))
}

/// Code or test, by path.
pub fn classify_path(path: &str) -> NodeKind {
    if is_test_path(path) {
        NodeKind::Test
    } else {
        NodeKind::Code
    }
}

/// True for files with a recognized source extension.
pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Distinctive words of a path: at least three characters, not a generic
/// directory name or a file extension.
pub fn significant_path_tokens(path: &str) -> BTreeSet<String> {
    split_identifier(path)
        .into_iter()
        .filter(|t| t.len() >= 3)
        .filter(|t| !GENERIC_TOKENS.contains(&t.as_str()))
        .filter(|t| !SOURCE_EXTENSIONS.contains(&t.as_str()))
        .filter(|t| !t.chars().all(|c| c.is_ascii_digit()))
        .collect()
}

/// Fraction of the path's significant tokens that occur in the spec text.
/// Zero when the path has no significant tokens.
pub fn link_strength(path: &str, spec_text: &str) -> f64 {
    let path_tokens = significant_path_tokens(path);
    if path_tokens.is_empty() {
        return 0.0;
    }
    let text_tokens: BTreeSet<String> = tokenize(spec_text)
        .iter()
        .flat_map(|t| split_identifier(t))
        .collect();
    let hits = path_tokens
        .iter()
        .filter(|t| text_tokens.contains(*t))
        .count();
    hits as f64 / path_tokens.len() as f64
}

/// Confidence assigned to a suggestion of the given strength.
pub fn suggested_confidence(strength: f64) -> f64 {
    (MAX_SUGGESTED_CONFIDENCE * strength.clamp(0.0, 1.0)).min(MAX_SUGGESTED_CONFIDENCE)
}
