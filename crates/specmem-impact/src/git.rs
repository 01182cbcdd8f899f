//! Changed-file extraction from unified git diffs.

use std::collections::BTreeSet;

use specmem_core::normalize_path;

/// Paths touched by a `git diff` patch, sorted and de-duplicated.
///
/// Reads `diff --git a/<old> b/<new>` headers and `+++ b/<path>` lines.
/// Deleted files (`+++ /dev/null`) contribute their old path through the
/// header.
pub fn parse_git_diff(diff: &str) -> Vec<String> {
    let mut paths = BTreeSet::new();
    for line in diff.lines() {
        if let Some(rest) = line.strip_prefix("diff --git a/") {
            if let Some((old, _)) = rest.split_once(" b/") {
                insert(&mut paths, old);
            }
        } else if let Some(rest) = line.strip_prefix("+++ b/") {
            insert(&mut paths, rest);
        }
    }
    paths.into_iter().collect()
}

fn insert(paths: &mut BTreeSet<String>, raw: &str) {
    let normalized = normalize_path(raw.trim_end_matches('\t'));
    if !normalized.is_empty() {
        paths.insert(normalized);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATCH: &str = "\
diff --git a/src/auth.py b/src/auth.py
index 83db48f..bf269f4 100644
--- a/src/auth.py
+++ b/src/auth.py
@@ -1,3 +1,3 @@
-old
+new
diff --git a/tests/test_auth.py b/tests/test_auth.py
new file mode 100644
--- /dev/null
+++ b/tests/test_auth.py
@@ -0,0 +1 @@
+def test(): pass
diff --git a/old.py b/old.py
deleted file mode 100644
--- a/old.py
+++ /dev/null
";

    #[test]
    fn extracts_sorted_unique_paths() {
        assert_eq!(
            parse_git_diff(PATCH),
            vec!["old.py", "src/auth.py", "tests/test_auth.py"]
        );
    }

    #[test]
    fn empty_input() {
        assert!(parse_git_diff("").is_empty());
        assert!(parse_git_diff("not a diff\n").is_empty());
    }

    #[test]
    fn renames_contribute_both_sides() {
        let patch = "diff --git a/a/old.rs b/a/new.rs\nsimilarity index 90%\n--- a/a/old.rs\n+++ b/a/new.rs\n";
        assert_eq!(parse_git_diff(patch), vec!["a/new.rs", "a/old.rs"]);
    }
}
