//! Run course SQL against Snowflake and check the answers.
//!
//! The crate has three layers:
//!
//! - [`connect`] turns [`ConnectionSettings`] (usually read from the environment)
//!   into a live session, or logs why it could not and returns `None`.
//! - [`QueryRunner`] executes one statement at a time, echoes the statement and
//!   its rows, and never fails: errors become empty results.
//! - [`Question`]s compare a value read by column name against a list of
//!   candidate answers; [`Playbook`]s string steps and questions together.
//!
//! Example usage:
//!
//! ```rust,no_run
//! use snowquiz::{connect, ConnectionSettings, QueryRunner, SnowflakeBackend};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let settings = ConnectionSettings::from_env();
//!     let Some(session) = connect(&SnowflakeBackend, &settings).await else {
//!         return;
//!     };
//!     let mut runner = QueryRunner::stdout();
//!     let result = runner
//!         .run(
//!             &session,
//!             "SELECT COUNT(*) AS warm_snacks FROM menu WHERE item_subcategory = 'Warm Option'",
//!             "Warm Snack Count",
//!         )
//!         .await;
//!     if let Some(row) = result.first() {
//!         println!("Answer: {:?}", row.get("WARM_SNACKS"));
//!     }
//!     let _ = session.close().await;
//! }
//! ```

mod cells;
mod checker;
mod config;
mod connector;
mod errors;
pub mod generator;
mod playbook;
mod result;
mod runner;
pub mod scan;
mod session;
mod warehouse;

pub use cells::{Cell, RawCell};
pub use checker::{Answer, Choice, Expectation, Question, Verdict};
pub use config::{account_candidates, ConnectionConfig, ConnectionSettings};
pub use connector::{connect, connect_with_fallback};
pub use errors::{ErrorKind, SnowflakeError, SnowflakeResult};
pub use playbook::{Playbook, RunSummary, Step};
pub use result::{Column, ResultSet, Row};
pub use runner::QueryRunner;
pub use session::{Session, SnowflakeClient};
pub use warehouse::{Backend, SnowflakeBackend, Warehouse};
