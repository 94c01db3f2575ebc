pub mod context;
pub mod events;
pub mod executor;
pub mod state;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::driver::web::{BrowserEngine, WebDriver, WebDriverConfig};
use crate::error::SetupError;
use crate::parser::types::VerificationFlow;
use crate::parser::yaml::parse_flow_file;
use context::RunContext;
use events::{ConsoleEventListener, EventEmitter, RunEvent};
use executor::StepExecutor;
use state::RunSummary;

/// Options assembled from the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub base_url: Option<String>,
    pub output_dir: PathBuf,
    pub headless: bool,
    pub browser: Option<String>,
    pub nav_timeout_ms: Option<u64>,
    pub wait_timeout_ms: Option<u64>,
    pub settle_ms: Option<u64>,
    pub env: Vec<(String, String)>,
}

/// Run every flow file under `path` (a file or a directory), one browser
/// session per flow. Setup failures abort immediately; verification failures
/// are collected into the summary.
pub async fn run_flows(path: &Path, options: &RunOptions) -> Result<RunSummary> {
    let files = collect_flow_files(path)?;
    if files.is_empty() {
        anyhow::bail!("No flow files found under {}", path.display());
    }

    std::fs::create_dir_all(&options.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            options.output_dir.display()
        )
    })?;

    let (emitter, receiver) = EventEmitter::new();
    tokio::spawn(ConsoleEventListener::listen(receiver));

    let mut summary = RunSummary::default();

    for file in &files {
        let flow = parse_flow_file(file)?;
        let run_state = run_one(file, &flow, options, &emitter).await?;
        summary.absorb(&run_state);
    }

    emitter.emit(RunEvent::SessionFinished {
        summary: summary.clone(),
    });

    // Let the console listener drain before the process exits.
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    Ok(summary)
}

/// Parse flow files and print their steps without launching a browser.
pub fn check_flows(path: &Path) -> Result<usize> {
    let files = collect_flow_files(path)?;
    if files.is_empty() {
        anyhow::bail!("No flow files found under {}", path.display());
    }

    for file in &files {
        let flow = parse_flow_file(file)?;
        println!(
            "{} ({} steps)",
            flow.name.as_deref().unwrap_or("unnamed"),
            flow.steps.len()
        );
        for (i, step) in flow.steps.iter().enumerate() {
            println!("  [{i}] {}", step.display_name());
        }
    }

    Ok(files.len())
}

/// One flow, one session: acquire, run, release. The session is closed on
/// every exit path, including when the run failed.
async fn run_one(
    file: &Path,
    flow: &VerificationFlow,
    options: &RunOptions,
    emitter: &EventEmitter,
) -> Result<state::RunState> {
    let config = driver_config(flow, options);
    let context = build_context(file, flow, options);

    let driver = WebDriver::launch(config)
        .await
        .map_err(|e: SetupError| anyhow::anyhow!(e))?;

    let mut executor = StepExecutor::new(Box::new(driver), context, emitter.clone());
    let run_state = executor.run_flow(flow).await;
    executor.shutdown().await;

    Ok(run_state)
}

fn driver_config(flow: &VerificationFlow, options: &RunOptions) -> WebDriverConfig {
    let engine_name = flow
        .browser
        .clone()
        .or_else(|| options.browser.clone())
        .unwrap_or_default();

    WebDriverConfig {
        engine: BrowserEngine::parse(&engine_name),
        headless: flow.headless.unwrap_or(options.headless),
        viewport: flow.viewport.unwrap_or_default(),
    }
}

fn build_context(file: &Path, flow: &VerificationFlow, options: &RunOptions) -> RunContext {
    let base_dir = file.parent().unwrap_or(Path::new("."));
    let mut context = RunContext::new(base_dir, &options.output_dir);

    // An absolute flow `url` overrides the CLI base URL for this flow.
    context.base_url = match flow.url {
        Some(ref url) if url.starts_with("http://") || url.starts_with("https://") => {
            Some(url.clone())
        }
        _ => options.base_url.clone(),
    };

    if let Some(t) = flow.default_timeout_ms.or(options.wait_timeout_ms) {
        context.wait_timeout_ms = t;
    }
    if let Some(t) = options.nav_timeout_ms {
        context.nav_timeout_ms = t;
    }
    if let Some(t) = options.settle_ms {
        context.settle_ms = t;
    }

    for (k, v) in &options.env {
        context.env.insert(k.clone(), v.clone());
    }
    if let Some(ref env) = flow.env {
        for (k, v) in env {
            context.env.insert(k.clone(), v.clone());
        }
    }

    context
}

/// Collect flow files: the path itself, or every `.yaml`/`.yml` under it.
fn collect_flow_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        anyhow::bail!("Path does not exist: {}", path.display());
    }
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .map_or(false, |ext| ext == "yaml" || ext == "yml")
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    Ok(files)
}
