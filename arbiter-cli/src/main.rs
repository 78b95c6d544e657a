#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        clippy::dbg_macro,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        reason = "Test-only output and panic-based assertions are permitted."
    )
)]
// arbiter-cli/src/main.rs
// ============================================================================
// Module: Arbiter CLI Entry Point
// Description: Command dispatcher for the `serve` and `audit-verify` commands.
// Purpose: Give operators a single binary to run the server or check an
//          audit log's hash chain, without reaching for the library crates
//          directly.
// Dependencies: clap, arbiter-config, arbiter-server, arbiter-audit, tokio
// ============================================================================

//! ## Overview
//! `arbiter serve` loads configuration and runs the HTTP transport until a
//! shutdown signal arrives. `arbiter audit-verify` re-derives an audit log's
//! hash chain offline and reports the first point of divergence, if any.
//! Exit codes: `0` success, `2` usage (enforced by `clap` itself), non-zero
//! on any other failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "arbiter", arg_required_else_help = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Arbiter HTTP server.
    Serve(ServeArgs),
    /// Verify an audit log's hash chain, and optionally its mirror.
    AuditVerify(AuditVerifyArgs),
}

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
struct ServeArgs {
    /// Path to `arbiter.toml`; falls back to `ARBITER_CONFIG` then the
    /// default file name in the current directory.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for the `audit-verify` command.
#[derive(Args, Debug)]
struct AuditVerifyArgs {
    /// Path to the primary JSONL audit log.
    #[arg(long, value_name = "PATH")]
    path: PathBuf,
    /// Optional path to the immutable mirror log to compare against.
    #[arg(long, value_name = "PATH")]
    mirror_path: Option<PathBuf>,
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match run().await {
        Ok(code) => code,
        Err(message) => {
            let _ = write_stderr_line(&message);
            ExitCode::FAILURE
        }
    }
}

/// Executes the selected subcommand.
async fn run() -> Result<ExitCode, String> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => command_serve(args).await,
        Commands::AuditVerify(args) => command_audit_verify(&args),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Loads configuration and runs the HTTP server until shutdown.
async fn command_serve(args: ServeArgs) -> Result<ExitCode, String> {
    let config = arbiter_config::ArbiterConfig::load(args.config.as_deref())
        .map_err(|err| format!("failed to load configuration: {err}"))?;
    arbiter_server::serve(config).await.map_err(|err| format!("server failed: {err}"))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Audit Verify Command
// ============================================================================

/// Re-derives the audit log's hash chain and reports the outcome.
fn command_audit_verify(args: &AuditVerifyArgs) -> Result<ExitCode, String> {
    match arbiter_audit::verify_file(&args.path, args.mirror_path.as_deref()) {
        Ok(report) => {
            write_stdout_line(&format!(
                "ok: {} records verified{}",
                report.records_verified,
                if report.mirror_checked { ", mirror matches" } else { "" }
            ))
            .map_err(|err| err.to_string())?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            write_stderr_line(&err.to_string()).map_err(|err| err.to_string())?;
            Ok(ExitCode::FAILURE)
        }
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}
