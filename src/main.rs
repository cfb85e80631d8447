use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use snowquiz::scan::CredentialScanner;
use snowquiz::{
    connect, connect_with_fallback, generator, ConnectionSettings, Playbook, QueryRunner, Session,
    SnowflakeBackend,
};

#[derive(Parser)]
#[command(name = "snowquiz")]
#[command(about = "Run course SQL against Snowflake and check the answers", long_about = None)]
#[command(version)]
struct Cli {
    /// Log connection and statement details (RUST_LOG overrides this)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and print the server version and the session context
    Check {
        /// Retry with other spellings of SNOWFLAKE_ACCOUNT if the login is rejected
        #[arg(long)]
        try_account_formats: bool,
    },

    /// Execute a single SQL statement and print its rows
    Exec {
        sql: String,

        #[arg(long, default_value = "Ad-hoc query")]
        label: String,
    },

    /// Run every step of a playbook and check its questions
    Run { playbook: PathBuf },

    /// Write the worksheet, guide and per-step SQL files for a playbook
    Generate {
        playbook: PathBuf,

        #[arg(long, short, default_value = ".")]
        out: PathBuf,
    },

    /// Look for hardcoded credentials in source files
    Scan {
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// File extensions to inspect
        #[arg(long, value_delimiter = ',', default_value = "rs,py,sql,toml,yaml,yml")]
        ext: Vec<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Commands::Check {
            try_account_formats,
        } => check(try_account_formats).await,
        Commands::Exec { sql, label } => {
            let Some(session) = open().await else {
                return Ok(ExitCode::FAILURE);
            };
            QueryRunner::stdout().run(&session, &sql, &label).await;
            close(session).await;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run { playbook } => {
            let playbook = Playbook::load(&playbook)
                .with_context(|| format!("reading playbook {}", playbook.display()))?;
            let Some(session) = open().await else {
                return Ok(ExitCode::FAILURE);
            };
            let mut runner = QueryRunner::stdout();
            playbook.run(&session, &mut runner).await;
            close(session).await;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Generate { playbook, out } => {
            let playbook = Playbook::load(&playbook)
                .with_context(|| format!("reading playbook {}", playbook.display()))?;
            for path in generator::write_all(&playbook, &out)? {
                println!("Generated: {}", path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Scan { dir, ext } => scan(&dir, &ext),
    }
}

async fn open() -> Option<Session> {
    let settings = ConnectionSettings::from_env();
    let session = connect(&SnowflakeBackend, &settings).await;
    match &session {
        Some(_) => println!("Successfully connected to Snowflake!"),
        None => eprintln!("Failed to establish connection (run with -v for details)"),
    }
    session
}

async fn close(session: Session) {
    if let Err(e) = session.close().await {
        log::warn!("Could not close session: {}", e);
    }
}

async fn check(try_account_formats: bool) -> anyhow::Result<ExitCode> {
    let session = if try_account_formats {
        let settings = ConnectionSettings::from_env();
        match connect_with_fallback(&SnowflakeBackend, &settings).await {
            Some((session, account)) => {
                println!("Connection successful! Use account format: {account}");
                session
            }
            None => {
                eprintln!("All connection attempts failed. Please check your credentials.");
                return Ok(ExitCode::FAILURE);
            }
        }
    } else {
        match open().await {
            Some(session) => session,
            None => return Ok(ExitCode::FAILURE),
        }
    };

    let mut runner = QueryRunner::stdout();
    let version = runner
        .run(&session, "SELECT CURRENT_VERSION()", "Server version")
        .await;
    if let Some(version) = version.first().and_then(|row| row.get_index(0)) {
        println!("Snowflake version: {version}");
    }
    let context = runner
        .run(
            &session,
            "SELECT CURRENT_ROLE(), CURRENT_WAREHOUSE(), CURRENT_DATABASE()",
            "Session context",
        )
        .await;
    if let Some(row) = context.first() {
        println!("Current role: {}", row.get_index(0).unwrap_or("None"));
        println!("Current warehouse: {}", row.get_index(1).unwrap_or("None"));
        println!("Current database: {}", row.get_index(2).unwrap_or("None"));
    }
    close(session).await;
    println!("Connection test completed successfully!");
    Ok(ExitCode::SUCCESS)
}

fn scan(dir: &Path, extensions: &[String]) -> anyhow::Result<ExitCode> {
    // The configured account and user are worth catching verbatim too.
    let settings = ConnectionSettings::from_env();
    let literals: Vec<String> = [settings.account, settings.user]
        .into_iter()
        .flatten()
        .collect();
    let scanner = CredentialScanner::new(&literals)?;

    println!("Scanning {} for hardcoded credentials...", dir.display());
    let mut issues = 0;
    for report in scanner.scan_dir(dir, extensions) {
        if report.findings.is_empty() {
            continue;
        }
        println!("\n{}: {} potential issue(s)", report.path.display(), report.findings.len());
        for finding in &report.findings {
            println!("  Line {}: {}", finding.line, finding.text);
        }
        issues += report.findings.len();
    }

    if issues == 0 {
        println!("\nNo hardcoded credentials found.");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("\n{issues} potential issue(s) found. Move credentials to the environment or a .env file kept out of version control.");
        Ok(ExitCode::FAILURE)
    }
}
