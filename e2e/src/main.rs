//! model-gateway e2e test runner
//!
//! Default (no args): finds the gateway binary, writes a temp model record
//! directory pointing at the mock upstream, spawns the gateway, runs all
//! tests, kills it.
//!
//!   cargo run                          # auto-detect gateway binary, run all tests
//!   cargo run -- list                  # list all tests
//!   cargo run -- run                   # connect to already-running gateway
//!   cargo run -- spawn-and-run [opts]  # explicit paths / ports

mod backend;
mod client;
mod runner;
mod tests;
mod types;

use clap::{Parser, Subcommand};
use colored::Colorize;
use runner::{list_tests, run_tests, TestContext};
use std::path::Path;
use tests::all_tests;

/// Default gateway binary candidates, tried in order
const DEFAULT_GATEWAY_BINS: &[&str] = &["../target/release/model-gateway", "../target/debug/model-gateway"];

const DEFAULT_UPSTREAM_PORT: u16 = 18090;
const DEFAULT_GATEWAY_PORT: u16 = 18000;

#[derive(Parser)]
#[command(
    name = "e2e",
    about = "End-to-end tests for model-gateway",
    long_about = "Runs all e2e tests by default (no arguments needed).\n\
                  Spawns the gateway binary automatically, runs tests, then kills it."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Only run tests whose name contains this string (applies to default run)
    #[arg(long, short, global = true)]
    filter: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Connect to an already-running gateway and run tests
    ///
    /// The gateway's records must include demo (pointing at the mock
    /// upstream), down (nothing listening) and local (no endpoint).
    Run {
        /// Address of the real gateway
        #[arg(long, default_value = "127.0.0.1:18000")]
        gateway_addr: String,

        /// Port for the mock upstream - must not conflict with real services
        #[arg(long, default_value_t = DEFAULT_UPSTREAM_PORT)]
        upstream_port: u16,

        /// Only run tests whose name contains this string
        #[arg(long, short)]
        filter: Option<String>,
    },

    /// List all available tests
    List,

    /// Spawn the gateway binary, run all tests, then kill it
    SpawnAndRun {
        /// Path to the model-gateway binary
        #[arg(long)]
        gateway_bin: Option<String>,

        /// Port for the mock upstream
        #[arg(long, default_value_t = DEFAULT_UPSTREAM_PORT)]
        upstream_port: u16,

        /// Gateway listen port
        #[arg(long, default_value_t = DEFAULT_GATEWAY_PORT)]
        gateway_port: u16,

        /// Only run tests whose name contains this string
        #[arg(long, short)]
        filter: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // ── No subcommand: default full run ──────────────────────────────────
        None => {
            let gateway_bin = find_gateway_bin()?;
            do_spawn_and_run(gateway_bin, DEFAULT_UPSTREAM_PORT, DEFAULT_GATEWAY_PORT, cli.filter).await?;
        }

        // ── list ─────────────────────────────────────────────────────────────
        Some(Command::List) => {
            list_tests(&all_tests());
        }

        // ── run (connect to existing gateway) ─────────────────────────────────
        Some(Command::Run {
            gateway_addr,
            upstream_port,
            filter,
        }) => {
            let filter = filter.or(cli.filter);
            println!("Starting mock upstream on port {}...", upstream_port);
            let upstream_state = backend::start(upstream_port).await?;
            println!("Mock upstream running on 127.0.0.1:{}", upstream_port);

            let ctx = TestContext {
                gateway_addr,
                upstream_state,
                http_client: client::build_client(),
                models_dir: None,
            };

            let results = run_tests(all_tests(), ctx, filter.as_deref()).await;
            exit_on_failure(&results);
        }

        // ── spawn-and-run ─────────────────────────────────────────────────────
        Some(Command::SpawnAndRun {
            gateway_bin,
            upstream_port,
            gateway_port,
            filter,
        }) => {
            let filter = filter.or(cli.filter);
            let gateway_bin = match gateway_bin {
                Some(p) => p,
                None => find_gateway_bin()?,
            };
            do_spawn_and_run(gateway_bin, upstream_port, gateway_port, filter).await?;
        }
    }

    Ok(())
}

/// Shared implementation for spawn-and-run (used by both default and explicit subcommand)
async fn do_spawn_and_run(
    gateway_bin: String,
    upstream_port: u16,
    gateway_port: u16,
    filter: Option<String>,
) -> anyhow::Result<()> {
    println!("Starting mock upstream on port {}...", upstream_port);
    let upstream_state = backend::start(upstream_port).await?;
    println!("Mock upstream running on 127.0.0.1:{}", upstream_port);

    let models_dir = tempfile::TempDir::new()?;
    write_model_records(models_dir.path(), upstream_port)?;

    println!(
        "Spawning gateway: {} run --config-dir {} --port {}",
        gateway_bin,
        models_dir.path().display(),
        gateway_port
    );
    let mut gateway_process = tokio::process::Command::new(&gateway_bin)
        .arg("run")
        .arg("--config-dir")
        .arg(models_dir.path())
        .arg("--host")
        .arg("127.0.0.1")
        .arg("--port")
        .arg(gateway_port.to_string())
        .env_remove("UPSTREAM_URL")
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| anyhow::anyhow!("Failed to spawn '{}': {}", gateway_bin, e))?;

    let gateway_addr = format!("127.0.0.1:{}", gateway_port);
    println!("Waiting for gateway at {}...", gateway_addr);
    wait_for_gateway(&gateway_addr).await?;
    println!("Gateway is ready!\n");

    let ctx = TestContext {
        gateway_addr,
        upstream_state,
        http_client: client::build_client(),
        models_dir: Some(models_dir.path().to_path_buf()),
    };

    let results = run_tests(all_tests(), ctx, filter.as_deref()).await;

    gateway_process.kill().await.ok();

    exit_on_failure(&results);
    Ok(())
}

/// Write the record set the tests expect into `dir`
fn write_model_records(dir: &Path, upstream_port: u16) -> anyhow::Result<()> {
    let closed_port = unused_port()?;

    std::fs::write(
        dir.join("demo.yaml"),
        format!(
            "api:\n  url: http://127.0.0.1:{}/v1/chat/completions\nparameters:\n  temperature: 0.2\n",
            upstream_port
        ),
    )?;
    std::fs::write(
        dir.join("down.yml"),
        format!("api:\n  url: http://127.0.0.1:{}/v1/chat/completions\n", closed_port),
    )?;
    std::fs::write(dir.join("local.yaml"), "model:\n  path: /models/local.gguf\n")?;
    std::fs::write(dir.join("empty.yaml"), "")?;
    std::fs::write(dir.join("notes.txt"), "not a model record\n")?;
    Ok(())
}

/// A local port with nothing listening on it
fn unused_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// Find the gateway binary, trying release then debug builds
fn find_gateway_bin() -> anyhow::Result<String> {
    for candidate in DEFAULT_GATEWAY_BINS {
        if std::path::Path::new(candidate).exists() {
            println!("Using gateway binary: {}", candidate.bright_cyan());
            return Ok(candidate.to_string());
        }
    }
    Err(anyhow::anyhow!(
        "No gateway binary found. Tried: {}\nBuild with: cd .. && cargo build --release",
        DEFAULT_GATEWAY_BINS.join(", ")
    ))
}

/// Exit with code 1 if any tests failed (skips do not count)
fn exit_on_failure(results: &[crate::types::TestResult]) {
    if results.iter().any(|r| r.failed()) {
        std::process::exit(1);
    }
}

/// Wait for the gateway to start accepting connections (retry with backoff)
async fn wait_for_gateway(addr: &str) -> anyhow::Result<()> {
    let client = client::build_client();
    let health_url = format!("http://{}/health", addr);

    for attempt in 0..30 {
        tokio::time::sleep(tokio::time::Duration::from_millis(200 + attempt * 100)).await;
        if client.get(&health_url).send().await.is_ok() {
            return Ok(());
        }
    }

    Err(anyhow::anyhow!(
        "Gateway did not start within timeout. Is the binary correct? Check: {}",
        addr
    ))
}
