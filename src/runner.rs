use std::io::{self, Write};

use crate::errors::SnowflakeResult;
use crate::result::ResultSet;
use crate::warehouse::Warehouse;

/// Runs statements one by one and echoes each statement and its rows for the operator
///
/// The echo goes to `out` (stdout for the CLI) and is the thing a person
/// actually reads; `log` only gets a condensed copy.
pub struct QueryRunner<W: Write> {
    out: W,
}

impl QueryRunner<io::Stdout> {
    pub fn stdout() -> QueryRunner<io::Stdout> {
        QueryRunner::new(io::stdout())
    }
}

impl<W: Write> QueryRunner<W> {
    pub fn new(out: W) -> QueryRunner<W> {
        QueryRunner { out }
    }

    /// Execute `sql` and return its rows, or an empty result if it failed
    ///
    /// Never returns an error: the failure is echoed and logged and the
    /// caller carries on with its next statement.
    pub async fn run<H: Warehouse>(
        &mut self,
        warehouse: &H,
        sql: &str,
        label: &str,
    ) -> ResultSet {
        self.try_run(warehouse, sql, label)
            .await
            .unwrap_or_else(|_| ResultSet::empty())
    }

    /// Like [`QueryRunner::run`], but hands the error back as well
    pub async fn try_run<H: Warehouse>(
        &mut self,
        warehouse: &H,
        sql: &str,
        label: &str,
    ) -> SnowflakeResult<ResultSet> {
        self.echo(format_args!("\n--- {label} ---"));
        self.echo(format_args!("Query: {}", sql.trim()));
        match warehouse.execute(sql).await {
            Ok(result) if result.is_empty() => {
                log::info!("{}: no results", label);
                self.echo(format_args!("No results found"));
                Ok(result)
            }
            Ok(result) => {
                log::info!("{}: {} row(s)", label, result.num_rows());
                self.echo(format_args!("Results: {result}"));
                Ok(result)
            }
            Err(e) => {
                log::error!("{}: statement failed: {}: {}", label, sql.trim(), e);
                self.echo(format_args!("Error executing query: {e}"));
                Err(e)
            }
        }
    }

    /// Write a free-form line into the same stream as the statement echo
    pub fn say(&mut self, line: impl std::fmt::Display) {
        self.echo(format_args!("{line}"));
    }

    fn echo(&mut self, line: std::fmt::Arguments<'_>) {
        if let Err(e) = writeln!(self.out, "{line}") {
            log::warn!("Could not write query output: {}", e);
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
