//! Looks for credentials written straight into source files.

use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};
use walkdir::WalkDir;

use crate::errors::SnowflakeResult;

const ASSIGNMENT_PATTERNS: &[&str] = &[
    r#"password\s*=\s*['"][^'"]+['"]"#,
    r#"user\s*=\s*['"][^'"]+['"]"#,
    r#"account\s*=\s*['"][^'"]+['"]"#,
];

/// A suspicious line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub line: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    pub findings: Vec<Finding>,
}

pub struct CredentialScanner {
    patterns: Vec<Regex>,
}

impl CredentialScanner {
    /// The built-in assignment patterns plus `literals`, which are matched verbatim
    ///
    /// Pass the real account name or user here to catch them anywhere in a file.
    pub fn new(literals: &[String]) -> SnowflakeResult<CredentialScanner> {
        let mut patterns = Vec::with_capacity(ASSIGNMENT_PATTERNS.len() + literals.len());
        for pattern in ASSIGNMENT_PATTERNS {
            patterns.push(RegexBuilder::new(pattern).case_insensitive(true).build()?);
        }
        for literal in literals.iter().filter(|l| !l.is_empty()) {
            patterns.push(
                RegexBuilder::new(&regex::escape(literal))
                    .case_insensitive(true)
                    .build()?,
            );
        }
        Ok(CredentialScanner { patterns })
    }

    pub fn scan_text(&self, text: &str) -> Vec<Finding> {
        text.lines()
            .enumerate()
            .filter(|(_, line)| self.patterns.iter().any(|p| p.is_match(line)))
            .map(|(i, line)| Finding {
                line: i + 1,
                text: line.trim().to_owned(),
            })
            .collect()
    }

    /// Scan every file under `root` whose extension is in `extensions`
    ///
    /// Hidden directories and `target/` are skipped. Files that cannot be read
    /// are logged and left out of the report.
    pub fn scan_dir(&self, root: impl AsRef<Path>, extensions: &[String]) -> Vec<FileReport> {
        let walker = WalkDir::new(root.as_ref())
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                entry.depth() == 0 || !(name.starts_with('.') || name == "target")
            });

        let mut reports = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !has_extension(entry.path(), extensions) {
                continue;
            }
            match std::fs::read_to_string(entry.path()) {
                Ok(text) => reports.push(FileReport {
                    path: entry.path().to_owned(),
                    findings: self.scan_text(&text),
                }),
                Err(e) => log::warn!("Error reading {}: {}", entry.path().display(), e),
            }
        }
        reports
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |ext| {
            extensions
                .iter()
                .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_are_flagged() {
        let scanner = CredentialScanner::new(&[]).unwrap();
        let findings = scanner.scan_text(
            "let config = load();\n    PASSWORD = \"hunter2\"\nuser = std::env::var(\"SNOWFLAKE_USER\")\n",
        );
        assert_eq!(
            findings,
            vec![Finding {
                line: 2,
                text: "PASSWORD = \"hunter2\"".into()
            }]
        );
    }

    #[test]
    fn literals_match_anywhere() {
        let scanner = CredentialScanner::new(&["ORG-ACCT1".to_string(), String::new()]).unwrap();
        let findings = scanner.scan_text("url = format!(\"https://org-acct1.snowflakecomputing.com\")");
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn scans_matching_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clean.rs"), "fn main() {}\n").unwrap();
        std::fs::write(dir.path().join("leaky.py"), "x = 1\naccount = 'abc-123'\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "password = 'ignored'\n").unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git").join("config.py"), "password = 'x'\n").unwrap();

        let scanner = CredentialScanner::new(&[]).unwrap();
        let reports = scanner.scan_dir(dir.path(), &["rs".to_string(), ".py".to_string()]);
        assert_eq!(reports.len(), 2);
        assert!(reports[0].path.ends_with("clean.rs"));
        assert!(reports[0].findings.is_empty());
        assert!(reports[1].path.ends_with("leaky.py"));
        assert_eq!(reports[1].findings[0].line, 2);
    }
}
