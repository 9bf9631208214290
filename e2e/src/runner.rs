//! Runs registered cases against a live gateway, grouped by area

use colored::Colorize;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Instant;

use crate::types::{Outcome, SharedUpstreamState, Skip, TestResult};

pub type TestFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// A single test case, named `area/case`
pub struct TestCase {
    pub name: &'static str,
    pub description: &'static str,
    pub run: Box<dyn Fn(TestContext) -> TestFuture + Send + Sync>,
}

impl TestCase {
    /// The part of the name before the first `/`
    pub fn area(&self) -> &'static str {
        self.name.split_once('/').map_or(self.name, |(area, _)| area)
    }
}

/// What every case gets: where the gateway is and the mock upstream it talks to
#[derive(Clone)]
pub struct TestContext {
    pub gateway_addr: String,
    pub upstream_state: SharedUpstreamState,
    pub http_client: reqwest::Client,
    /// Model record directory the gateway was started with, when we own it
    pub models_dir: Option<PathBuf>,
}

impl TestContext {
    /// Forget queued replies and captured requests from the previous case
    fn reset_upstream(&self) {
        let mut state = match self.upstream_state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.response_queue.clear();
        state.received_requests.clear();
    }
}

fn classify(result: anyhow::Result<()>) -> Outcome {
    match result {
        Ok(()) => Outcome::Passed,
        Err(e) => match e.downcast_ref::<Skip>() {
            Some(skip) => Outcome::Skipped(skip.0.clone()),
            None => {
                let mut message = e.to_string();
                for cause in e.chain().skip(1) {
                    message.push_str(&format!("\n      caused by: {}", cause));
                }
                Outcome::Failed(message)
            }
        },
    }
}

/// Run the selected cases one after another, in registration order
pub async fn run_tests(cases: Vec<TestCase>, ctx: TestContext, filter: Option<&str>) -> Vec<TestResult> {
    let selected: Vec<&TestCase> = cases
        .iter()
        .filter(|c| filter.map_or(true, |f| c.name.contains(f)))
        .collect();

    let rule = "━".repeat(56);
    println!("\n{}", rule.bright_blue());
    println!("  {}", "model-gateway e2e".bright_white().bold());
    println!("  gateway {}  ·  {} case(s)", ctx.gateway_addr.bright_cyan(), selected.len());
    if let Some(f) = filter {
        println!("  filter  {}", f.yellow());
    }
    println!("{}", rule.bright_blue());

    let suite_start = Instant::now();
    let mut results = Vec::with_capacity(selected.len());
    let mut current_area = "";

    for case in selected {
        if case.area() != current_area {
            current_area = case.area();
            println!("\n  {}", current_area.to_uppercase().bright_white().bold());
        }

        ctx.reset_upstream();
        let start = Instant::now();
        let outcome = classify((case.run)(ctx.clone()).await);
        let duration_ms = start.elapsed().as_millis() as u64;

        let label = case.name.strip_prefix(current_area).unwrap_or(case.name).trim_start_matches('/');
        match &outcome {
            Outcome::Passed => {
                println!("    {} {:<28} {}", "✓".bright_green(), label, format!("{duration_ms}ms").dimmed());
            }
            Outcome::Skipped(reason) => {
                println!("    {} {:<28} {}", "-".yellow(), label, reason.yellow());
            }
            Outcome::Failed(message) => {
                println!("    {} {:<28} {}", "✗".bright_red(), label, format!("{duration_ms}ms").dimmed());
                println!("      {}", message.bright_red());
            }
        }

        results.push(TestResult {
            name: case.name.to_string(),
            outcome,
            duration_ms,
        });
    }

    print_summary(&results, suite_start.elapsed().as_secs_f64());
    results
}

fn print_summary(results: &[TestResult], elapsed_secs: f64) {
    let passed = results.iter().filter(|r| r.outcome == Outcome::Passed).count();
    let skipped = results.iter().filter(|r| matches!(r.outcome, Outcome::Skipped(_))).count();
    let failures: Vec<&TestResult> = results.iter().filter(|r| r.failed()).collect();

    println!("\n{}", "━".repeat(56).bright_blue());
    if !failures.is_empty() {
        println!("  {}", "Failed:".bright_red().bold());
        for failure in &failures {
            println!("    {}", failure.name.bright_red());
        }
        println!();
    }

    if let Some(slowest) = results.iter().max_by_key(|r| r.duration_ms) {
        println!("  slowest: {} ({}ms)", slowest.name, slowest.duration_ms);
    }

    let line = format!(
        "  {} passed, {} failed, {} skipped in {:.1}s",
        passed,
        failures.len(),
        skipped,
        elapsed_secs
    );
    if failures.is_empty() {
        println!("{}\n", line.bright_green().bold());
    } else {
        println!("{}\n", line.bright_red().bold());
    }
}

/// Print every registered case under its area
pub fn list_tests(cases: &[TestCase]) {
    let mut current_area = "";
    for case in cases {
        if case.area() != current_area {
            current_area = case.area();
            println!("\n{}", current_area.bright_white().bold());
        }
        println!("  {:<36} {}", case.name.bright_cyan(), case.description);
    }
    println!();
}
