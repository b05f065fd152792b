//! Post-edit structured-data check for source files.
//!
//! Editors run this after a file is written. The exit code tells them what to
//! do: 0 accept, 1 accept with warnings, 2 reject the edit.

use std::path::Path;

use crate::findings::Finding;
use crate::schema::{self, RuleSet};

/// Extensions of files that may carry JSON-LD markup, compared without case.
pub const HOOK_EXTENSIONS: [&str; 8] = ["html", "htm", "jsx", "tsx", "vue", "svelte", "php", "ejs"];

#[derive(Debug, Clone, PartialEq)]
pub enum HookOutcome {
    /// Missing, unreadable or not a markup file
    Skipped,
    Clean,
    Warnings(Vec<Finding>),
    Blocked {
        warnings: Vec<Finding>,
        blocking: Vec<Finding>,
    },
}

impl HookOutcome {
    /// Splits findings by severity, keeping generation order within each side.
    pub fn from_findings(findings: Vec<Finding>) -> Self {
        if findings.is_empty() {
            return HookOutcome::Clean;
        }
        let (blocking, warnings): (Vec<_>, Vec<_>) =
            findings.into_iter().partition(Finding::is_blocking);
        if blocking.is_empty() {
            HookOutcome::Warnings(warnings)
        } else {
            HookOutcome::Blocked { warnings, blocking }
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            HookOutcome::Skipped | HookOutcome::Clean => 0,
            HookOutcome::Warnings(_) => 1,
            HookOutcome::Blocked { .. } => 2,
        }
    }
}

pub fn is_markup_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| HOOK_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Validates the JSON-LD regions of the file at `path`.
pub fn check_file(path: &Path, rules: &RuleSet) -> HookOutcome {
    if !path.is_file() || !is_markup_file(path) {
        ::log::debug!("Skipping {}", path.display());
        return HookOutcome::Skipped;
    }

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            ::log::warn!("Failed to read {}: {}", path.display(), e);
            return HookOutcome::Skipped;
        }
    };
    let source = String::from_utf8_lossy(&bytes);

    HookOutcome::from_findings(schema::validate_source(&source, rules))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_extensions() {
        assert!(is_markup_file(Path::new("index.html")));
        assert!(is_markup_file(Path::new("src/App.TSX")));
        assert!(is_markup_file(Path::new("views/page.ejs")));
        assert!(!is_markup_file(Path::new("data.json")));
        assert!(!is_markup_file(Path::new("Makefile")));
    }

    #[test]
    fn test_missing_and_foreign_files_skip() {
        let rules = RuleSet::default();
        assert_eq!(check_file(Path::new("/nonexistent/a.html"), &rules), HookOutcome::Skipped);

        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "schema.json",
            r#"<script type="application/ld+json">{"@type": "HowTo"}</script>"#,
        );
        let outcome = check_file(&path, &rules);
        assert_eq!(outcome, HookOutcome::Skipped);
        assert_eq!(outcome.exit_code(), 0);
    }

    #[test]
    fn test_no_markup_is_clean() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "index.html", "<html><body>hi</body></html>");
        let outcome = check_file(&path, &RuleSet::default());
        assert_eq!(outcome, HookOutcome::Clean);
        assert_eq!(outcome.exit_code(), 0);
    }

    #[test]
    fn test_warnings_exit_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "Page.vue",
            r#"<template><script type="application/ld+json">{"@type": "Organization"}</script></template>"#,
        );
        let outcome = check_file(&path, &RuleSet::default());
        assert_eq!(outcome.exit_code(), 1);
        match outcome {
            HookOutcome::Warnings(warnings) => {
                assert_eq!(warnings.len(), 1);
                assert_eq!(warnings[0].message(), "Block 1: Missing @context");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_blocking_exit_two() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "page.jsx",
            r#"const s = `<script type='application/ld+json'>{"@context": "https://schema.org", "@type": "LocalBusiness", "name": "[Business Name]", "url": "x"}</script>`;
               <script type="application/ld+json">{"@type": "Thing"}</script>"#,
        );
        let outcome = check_file(&path, &RuleSet::default());
        assert_eq!(outcome.exit_code(), 2);
        match outcome {
            HookOutcome::Blocked { warnings, blocking } => {
                assert_eq!(blocking.len(), 1);
                assert_eq!(blocking[0].block, Some(1));
                assert_eq!(warnings.len(), 1);
                assert_eq!(warnings[0].block, Some(2));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_invalid_utf8_is_read_lossily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.php");
        let mut bytes = b"<p>\xff\xfe</p>".to_vec();
        bytes.extend_from_slice(br#"<script type="application/ld+json">{"@type": "HowTo"}</script>"#);
        std::fs::write(&path, bytes).unwrap();

        assert_eq!(check_file(&path, &RuleSet::default()).exit_code(), 2);
    }
}
