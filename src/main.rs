use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;

use uiprobe::runner::{self, RunOptions};

/// Exit codes: 0 = all runs passed, 1 = a verification failed, 2 = setup
/// error (browser launch failure, unreadable flow file).
const EXIT_FAILED: u8 = 1;
const EXIT_SETUP: u8 = 2;

#[derive(Parser)]
#[command(name = "uiprobe")]
#[command(version = "0.1.0")]
#[command(about = "Browser-driven UI verification CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run verification flow file(s) or a directory of flows
    Run {
        /// Path to a flow file or directory
        path: PathBuf,

        /// Base URL joined onto relative step URLs
        #[arg(short, long)]
        base_url: Option<String>,

        /// Run the browser headless (pass `--headless false` for a window)
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        headless: bool,

        /// Browser engine (chromium, firefox, webkit). Flow headers win.
        #[arg(long)]
        browser: Option<String>,

        /// Output directory for screenshot artifacts
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Navigation timeout in milliseconds
        #[arg(long)]
        nav_timeout: Option<u64>,

        /// Element wait timeout in milliseconds
        #[arg(long)]
        wait_timeout: Option<u64>,

        /// Default settle delay in milliseconds
        #[arg(long)]
        settle: Option<u64>,

        /// Flow variables as KEY=VALUE. Can be given multiple times.
        #[arg(short, long)]
        env: Vec<String>,
    },

    /// Parse flow file(s) and list their steps without launching a browser
    Check {
        /// Path to a flow file or directory
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            path,
            base_url,
            headless,
            browser,
            output,
            nav_timeout,
            wait_timeout,
            settle,
            env,
        } => {
            let env = match parse_env_pairs(&env) {
                Ok(env) => env,
                Err(message) => {
                    eprintln!("{} {}", "error:".red().bold(), message);
                    return ExitCode::from(EXIT_SETUP);
                }
            };

            println!(
                "{} Running verification from: {}",
                "▶".green().bold(),
                path.display()
            );
            if let Some(ref base) = base_url {
                println!("  Base URL: {}", base.cyan());
            }
            println!("  Output: {}", output.display().to_string().cyan());
            if !headless {
                println!("  Headless: {}", "disabled".yellow());
            }

            let options = RunOptions {
                base_url,
                output_dir: output,
                headless,
                browser,
                nav_timeout_ms: nav_timeout,
                wait_timeout_ms: wait_timeout,
                settle_ms: settle,
                env,
            };

            match runner::run_flows(&path, &options).await {
                Ok(summary) if summary.all_passed() => ExitCode::SUCCESS,
                Ok(_) => ExitCode::from(EXIT_FAILED),
                Err(e) => {
                    eprintln!("{} {:#}", "error:".red().bold(), e);
                    ExitCode::from(EXIT_SETUP)
                }
            }
        }

        Commands::Check { path } => match runner::check_flows(&path) {
            Ok(count) => {
                println!("\n{} {} flow file(s) OK", "✓".green(), count);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{} {:#}", "error:".red().bold(), e);
                ExitCode::from(EXIT_SETUP)
            }
        },
    }
}

fn parse_env_pairs(pairs: &[String]) -> Result<Vec<(String, String)>, String> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| format!("invalid --env value {pair:?}, expected KEY=VALUE"))
        })
        .collect()
}
