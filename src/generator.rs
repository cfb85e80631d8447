//! Worksheet and guide files generated from a playbook.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::errors::SnowflakeResult;
use crate::playbook::{Playbook, Step};

pub const COMPLETE_SQL_FILE: &str = "complete_assignment.sql";
pub const GUIDE_FILE: &str = "STEP_BY_STEP_GUIDE.md";

const DEFAULT_EXPECTED: &str = "Command executed successfully";

/// Every step in one worksheet, ready to paste and "Run All"
pub fn complete_sql(playbook: &Playbook) -> String {
    let mut sql = format!(
        "-- {}\n-- Copy and paste this entire block into a Snowflake worksheet\n-- and use \"Run All\".\n\n",
        playbook.title
    );
    for (i, step) in playbook.steps.iter().enumerate() {
        let _ = writeln!(sql, "-- Step {}: {}", i + 1, step.title);
        let _ = writeln!(sql, "{}\n", terminated(&step.sql));
    }
    sql
}

/// Markdown walkthrough with one section per step
pub fn guide_markdown(playbook: &Playbook) -> String {
    let mut guide = format!("# {} - Step-by-Step Guide\n\n", playbook.title);
    if let Some(description) = &playbook.description {
        let _ = writeln!(guide, "{}\n", description.trim());
    }
    let _ = write!(
        guide,
        "## Instructions\n\n\
         ### Quick setup\n\
         1. Open a Snowflake worksheet\n\
         2. Paste the contents of `{COMPLETE_SQL_FILE}`\n\
         3. Use \"Run All\"\n\n\
         ### Step by step\n\n"
    );
    for (i, step) in playbook.steps.iter().enumerate() {
        let _ = writeln!(guide, "#### Step {}: {}", i + 1, step.title);
        if let Some(description) = &step.description {
            let _ = writeln!(guide, "**Description:** {}\n", description.trim());
        }
        let _ = writeln!(guide, "**SQL Command:**\n```sql\n{}\n```\n", terminated(&step.sql));
        let _ = writeln!(
            guide,
            "**Expected Result:** {}\n",
            step.expected.as_deref().unwrap_or(DEFAULT_EXPECTED).trim()
        );
        if let Some(question) = &step.question {
            let _ = writeln!(guide, "**Question:** {}\n", question.prompt);
            for (letter, option) in ('A'..='Z').zip(&question.options) {
                let _ = writeln!(guide, "- {letter}. {option}");
            }
            guide.push('\n');
        }
        guide.push_str("---\n\n");
    }
    guide
}

/// `step_03_create_menu_table.sql`
pub fn step_file_name(number: usize, step: &Step) -> String {
    let slug: String = step
        .title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let slug = slug
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    format!("step_{number:02}_{slug}.sql")
}

pub fn step_file(number: usize, step: &Step) -> String {
    let mut content = format!("-- Step {}: {}\n", number, step.title);
    if let Some(description) = &step.description {
        let _ = writeln!(content, "-- {}", description.trim());
    }
    content.push('\n');
    content.push_str(&terminated(&step.sql));
    content.push('\n');
    content
}

/// Write the worksheet, the guide and one file per step into `dir`
pub fn write_all(playbook: &Playbook, dir: impl AsRef<Path>) -> SnowflakeResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(playbook.steps.len() + 2);
    let mut write = |name: String, content: String| -> SnowflakeResult<()> {
        let path = dir.join(name);
        std::fs::write(&path, content)?;
        log::info!("Generated: {}", path.display());
        written.push(path);
        Ok(())
    };
    write(COMPLETE_SQL_FILE.into(), complete_sql(playbook))?;
    write(GUIDE_FILE.into(), guide_markdown(playbook))?;
    for (i, step) in playbook.steps.iter().enumerate() {
        write(step_file_name(i + 1, step), step_file(i + 1, step))?;
    }
    Ok(written)
}

fn terminated(sql: &str) -> String {
    let sql = sql.trim();
    if sql.ends_with(';') {
        sql.to_owned()
    } else {
        format!("{sql};")
    }
}
