use ignore::WalkBuilder;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::ResourceConfig;

/// Decides whether a path is a source artifact.
#[derive(Debug, Clone)]
pub enum SourcePredicate {
    /// Matches file extensions, case-insensitively.
    Extensions(Vec<String>),
    Custom(fn(&Path) -> bool),
}

impl SourcePredicate {
    pub fn from_config(config: &ResourceConfig) -> Self {
        SourcePredicate::Extensions(
            config
                .source_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        )
    }

    pub fn is_source(&self, path: &Path) -> bool {
        match self {
            SourcePredicate::Extensions(extensions) => path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e))),
            SourcePredicate::Custom(f) => f(path),
        }
    }
}

impl Default for SourcePredicate {
    fn default() -> Self {
        SourcePredicate::Extensions(vec!["java".to_string()])
    }
}

/// Lists candidate source files under `root`, sorted.
///
/// A file root is its own only candidate. A missing root is an error; a root
/// without matches is not.
pub fn scan_sources(
    root: &Path,
    predicate: &SourcePredicate,
    include_hidden: bool,
) -> io::Result<Vec<PathBuf>> {
    let metadata = std::fs::metadata(root)?;
    if metadata.is_file() {
        return Ok(if predicate.is_source(root) {
            vec![root.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let walker = WalkBuilder::new(root)
        .hidden(!include_hidden)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .ignore(false)
        .parents(false)
        .build();

    let mut found = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!("skipping unreadable entry under {}: {err}", root.display());
                continue;
            }
        };
        let path = entry.path();
        if entry.file_type().is_some_and(|t| t.is_file()) && predicate.is_source(path) {
            found.push(path.to_path_buf());
        }
    }

    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_dir(prefix: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!(
            "{prefix}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        p
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let predicate = SourcePredicate::from_config(&ResourceConfig {
            source_extensions: vec![".java".to_string()],
            ..ResourceConfig::default()
        });
        assert!(predicate.is_source(Path::new("a/B.java")));
        assert!(predicate.is_source(Path::new("a/B.JAVA")));
        assert!(!predicate.is_source(Path::new("a/B.class")));
        assert!(!predicate.is_source(Path::new("java")));
    }

    #[test]
    fn custom_predicate() {
        fn only_tests(path: &Path) -> bool {
            path.to_string_lossy().ends_with("Test.java")
        }
        let predicate = SourcePredicate::Custom(only_tests);
        assert!(predicate.is_source(Path::new("FooTest.java")));
        assert!(!predicate.is_source(Path::new("Foo.java")));
    }

    #[test]
    fn walks_directories_sorted_and_skips_hidden() {
        let root = temp_dir("class-workspace-scan");
        fs::create_dir_all(root.join("b/c")).unwrap();
        fs::create_dir_all(root.join(".hidden")).unwrap();
        fs::write(root.join("b/c/Z.java"), "class Z {}").unwrap();
        fs::write(root.join("A.java"), "class A {}").unwrap();
        fs::write(root.join("notes.txt"), "x").unwrap();
        fs::write(root.join(".hidden/H.java"), "class H {}").unwrap();

        let found = scan_sources(&root, &SourcePredicate::default(), false).unwrap();
        assert_eq!(found, vec![root.join("A.java"), root.join("b/c/Z.java")]);

        let with_hidden = scan_sources(&root, &SourcePredicate::default(), true).unwrap();
        assert_eq!(with_hidden.len(), 3);

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn file_root_is_its_own_candidate() {
        let root = temp_dir("class-workspace-scan-file");
        fs::create_dir_all(&root).unwrap();
        let file = root.join("Bar.java");
        fs::write(&file, "class Bar {}").unwrap();
        let other = root.join("Bar.kt");
        fs::write(&other, "class Bar").unwrap();

        assert_eq!(
            scan_sources(&file, &SourcePredicate::default(), false).unwrap(),
            vec![file.clone()]
        );
        assert!(
            scan_sources(&other, &SourcePredicate::default(), false)
                .unwrap()
                .is_empty()
        );

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn missing_root_is_an_error() {
        let root = temp_dir("class-workspace-scan-missing");
        assert!(scan_sources(&root, &SourcePredicate::default(), false).is_err());
    }
}
