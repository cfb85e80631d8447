//! Playbooks: an ordered list of SQL steps, some of them carrying a question.
//!
//! ```yaml
//! title: Tasty Bytes menu
//! steps:
//!   - title: Count warm snacks
//!     sql: SELECT COUNT(*) AS n FROM menu WHERE item_subcategory = 'Warm Option'
//!     question:
//!       prompt: How many warm snack items are there?
//!       expect: { kind: first_row, column: n }
//!       options: [5, 9, 3, 7]
//! ```

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::checker::{Question, Verdict};
use crate::errors::{SnowflakeError, SnowflakeResult};
use crate::runner::QueryRunner;
use crate::warehouse::Warehouse;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playbook {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Halt at the first failing statement instead of carrying on
    #[serde(default)]
    pub stop_on_error: bool,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub title: String,
    pub sql: String,
    #[serde(default)]
    pub description: Option<String>,
    /// What the operator should see, for the generated guide
    #[serde(default)]
    pub expected: Option<String>,
    #[serde(default)]
    pub question: Option<Question>,
}

/// Outcome counts for one playbook run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub executed: usize,
    pub failed: usize,
    pub answered: usize,
    pub unexpected: usize,
    pub unanswerable: usize,
    /// Set when `stop_on_error` cut the run short
    pub stopped_early: bool,
}

impl Playbook {
    pub fn load(path: impl AsRef<Path>) -> SnowflakeResult<Playbook> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Playbook::parse(&text)
    }

    pub fn parse(text: &str) -> SnowflakeResult<Playbook> {
        let playbook: Playbook = serde_yaml::from_str(text)?;
        playbook.validate()?;
        Ok(playbook)
    }

    fn validate(&self) -> SnowflakeResult<()> {
        if self.steps.is_empty() {
            return Err(SnowflakeError::Playbook(format!(
                "{} has no steps",
                self.title
            )));
        }
        for (i, step) in self.steps.iter().enumerate() {
            if step.sql.trim().is_empty() {
                return Err(SnowflakeError::Playbook(format!(
                    "step {} ({}) has no SQL",
                    i + 1,
                    step.title
                )));
            }
            if let Some(question) = &step.question {
                if question.options.is_empty() {
                    return Err(SnowflakeError::Playbook(format!(
                        "step {} ({}) asks a question without options",
                        i + 1,
                        step.title
                    )));
                }
            }
        }
        Ok(())
    }

    /// Run every step in order, checking questions as their results arrive
    pub async fn run<H: Warehouse, W: Write>(
        &self,
        warehouse: &H,
        runner: &mut QueryRunner<W>,
    ) -> RunSummary {
        let rule = "=".repeat(60);
        runner.say(&rule);
        runner.say(self.title.to_uppercase());
        runner.say(&rule);

        let mut summary = RunSummary::default();
        for (i, step) in self.steps.iter().enumerate() {
            let label = format!("Step {}: {}", i + 1, step.title);
            summary.executed += 1;
            let result = match runner.try_run(warehouse, &step.sql, &label).await {
                Ok(result) => result,
                Err(_) => {
                    summary.failed += 1;
                    if self.stop_on_error {
                        log::warn!("Stopping {} after failed step {}", self.title, i + 1);
                        summary.stopped_early = true;
                        break;
                    }
                    continue;
                }
            };
            if let Some(question) = &step.question {
                let verdict = question.check(&result);
                runner.say(format_args!("\nAnswer for {}:", question.prompt));
                runner.say(&verdict);
                match verdict {
                    Verdict::Matched { .. } => summary.answered += 1,
                    Verdict::Unexpected { .. } => summary.unexpected += 1,
                    Verdict::NoData { .. } => summary.unanswerable += 1,
                }
            }
        }

        runner.say(format_args!("\n{rule}"));
        runner.say(format_args!(
            "{} statements, {} failed; {} answered, {} unexpected, {} unanswerable",
            summary.executed,
            summary.failed,
            summary.answered,
            summary.unexpected,
            summary.unanswerable
        ));
        runner.say(&rule);
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cells::RawCell;
    use crate::warehouse::stub::{single_column, StubWarehouse};

    const MENU: &str = r#"
title: Menu questions
steps:
  - title: Count warm snacks
    sql: SELECT COUNT(*) AS snack_warm_count FROM menu
    question:
      prompt: How many warm snacks?
      expect: { kind: first_row, column: snack_warm_count }
      options: [5, 9, 3, 7]
  - title: Drop scratch table
    sql: DROP TABLE scratch
  - title: Count rows
    sql: SELECT COUNT(*) AS row_count FROM menu
    question:
      prompt: How many rows?
      expect: { kind: first_row, column: row_count }
      options: [100]
"#;

    #[test]
    fn parses_and_validates() {
        let playbook = Playbook::parse(MENU).unwrap();
        assert_eq!(playbook.steps.len(), 3);
        assert!(!playbook.stop_on_error);
        assert!(playbook.steps[1].question.is_none());

        let err = Playbook::parse("title: empty\nsteps: []\n").unwrap_err();
        assert!(matches!(err, SnowflakeError::Playbook(_)));
        let err = Playbook::parse("title: t\nsteps:\n  - title: blank\n    sql: '  '\n").unwrap_err();
        assert!(err.to_string().contains("has no SQL"));
    }

    #[test]
    fn bundled_playbooks_parse() {
        for text in [
            include_str!("../playbooks/menu_questions.yaml"),
            include_str!("../playbooks/warehouse_questions.yaml"),
            include_str!("../playbooks/tasty_bytes_setup.yaml"),
        ] {
            let playbook = Playbook::parse(text).unwrap();
            assert!(!playbook.steps.is_empty());
        }
    }

    #[tokio::test]
    async fn continues_past_failures_by_default() {
        let playbook = Playbook::parse(MENU).unwrap();
        let stub = StubWarehouse::new()
            .returns(single_column("SNACK_WARM_COUNT", RawCell::Fixed, &["5"]))
            .fails("Table 'SCRATCH' does not exist")
            .returns(single_column("ROW_COUNT", RawCell::Fixed, &["42"]));
        let mut runner = QueryRunner::new(Vec::new());
        let summary = playbook.run(&stub, &mut runner).await;

        assert_eq!(
            summary,
            RunSummary {
                executed: 3,
                failed: 1,
                answered: 1,
                unexpected: 1,
                unanswerable: 0,
                stopped_early: false,
            }
        );
        let out = String::from_utf8(runner.into_inner()).unwrap();
        assert!(out.contains("✅ Correct! Answer is 5"));
        assert!(out.contains("❌ Unexpected result: 42"));
    }

    #[tokio::test]
    async fn stop_on_error_halts() {
        let mut playbook = Playbook::parse(MENU).unwrap();
        playbook.stop_on_error = true;
        let stub = StubWarehouse::new()
            .returns(single_column("SNACK_WARM_COUNT", RawCell::Fixed, &["5"]))
            .fails("nope");
        let mut runner = QueryRunner::new(Vec::new());
        let summary = playbook.run(&stub, &mut runner).await;
        assert!(summary.stopped_early);
        assert_eq!(summary.executed, 2);
        assert_eq!(stub.executed().len(), 2);
    }
}
