//! Ordered glob-group resolution
//!
//! Pipelines declare their inputs as an ordered list of glob patterns.
//! The declared order determines concatenation order; within a single
//! pattern matches are sorted lexicographically so resolution never
//! depends on filesystem enumeration order. A file matched by more than
//! one pattern keeps its first position.

use glob::glob;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Resolve an ordered list of patterns relative to `base`.
///
/// Patterns that match nothing contribute nothing; a missing file named
/// literally (no wildcard) is simply absent from the result.
pub fn resolve(base: &Path, patterns: &[&str]) -> Result<Vec<PathBuf>, glob::PatternError> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut ordered = Vec::new();

    for pattern in patterns {
        let full = format!("{}/{}", base.display(), pattern);
        let mut matches: Vec<PathBuf> =
            glob(&full)?.filter_map(Result::ok).filter(|p| p.is_file()).collect();
        matches.sort();
        for path in matches {
            if seen.insert(path.clone()) {
                ordered.push(path);
            }
        }
    }

    Ok(ordered)
}

/// Read and concatenate the resolved files in order, newline-joined.
pub fn concat(paths: &[PathBuf]) -> io::Result<String> {
    let mut combined = String::new();
    for path in paths {
        let content = fs::read_to_string(path)?;
        combined.push_str(&content);
        if !content.ends_with('\n') {
            combined.push('\n');
        }
    }
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn touch(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut file = File::create(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_declared_order_beats_alphabetical() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "Aaa/one.scss", "");
        touch(temp.path(), "Zzz/two.scss", "");

        let order = resolve(temp.path(), &["Zzz/*.scss", "Aaa/*.scss"]).unwrap();
        assert_eq!(order, vec![temp.path().join("Zzz/two.scss"), temp.path().join("Aaa/one.scss")]);
    }

    #[test]
    fn test_first_match_wins_on_overlap() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "Base/Reset.scss", "");
        touch(temp.path(), "Base/Type.scss", "");

        // Reset.scss matches both the literal entry and the wildcard
        let order = resolve(temp.path(), &["Base/Reset.scss", "Base/*.scss"]).unwrap();
        assert_eq!(
            order,
            vec![temp.path().join("Base/Reset.scss"), temp.path().join("Base/Type.scss")]
        );
    }

    #[test]
    fn test_missing_pattern_is_empty_not_error() {
        let temp = TempDir::new().unwrap();
        let order = resolve(temp.path(), &["Nope/*.scss", "Sprite.scss"]).unwrap();
        assert!(order.is_empty());
    }

    #[test]
    fn test_concat_joins_with_newlines() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a.js", "var a = 1;");
        touch(temp.path(), "b.js", "var b = 2;\n");

        let order = resolve(temp.path(), &["a.js", "b.js"]).unwrap();
        let combined = concat(&order).unwrap();
        assert_eq!(combined, "var a = 1;\nvar b = 2;\n");
    }
}
