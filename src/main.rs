mod collectors;
mod config;
mod flow;
mod report;
#[cfg(test)]
mod testutil;

use clap::Parser;
use collectors::resources::SysinfoSource;
use config::{Config, EnvSettings};
use flow::{run_task, validation_flow, FlowContext, TaskName};
use std::io::Write;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "workercheck")]
#[command(version, about = "Validate that an ECS worker container is configured and reachable")]
struct Cli {
    /// Optional YAML config; built-in defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    print_default_config: bool,
    /// Run a single collector and print its record as JSON.
    #[arg(long, value_enum)]
    task: Option<TaskName>,
    /// Print the summary as JSON instead of the human-readable report.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let cfg = match &cli.config {
        Some(path) => match Config::load_from_file(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                error!(error = %err, "failed to load configuration");
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    let env = EnvSettings::from_env();
    info!(
        metadata_probe = env.metadata_uri.is_some(),
        internet_url = %cfg.internet_probe.url,
        "workercheck starting"
    );

    let ctx = FlowContext::new(cfg, env);
    let mut resources = SysinfoSource::new();
    let mut stdout = std::io::stdout();
    let mut sink = std::io::sink();

    if let Some(task) = cli.task {
        match run_task(task, &ctx, &mut resources, &mut sink).await {
            Ok(value) => print_json(&value),
            Err(err) => {
                error!(task = task.as_str(), error = %err, "task failed");
                std::process::exit(1);
            }
        }
        return;
    }

    let out: &mut dyn Write = if cli.json { &mut sink } else { &mut stdout };
    match validation_flow(&ctx, &mut resources, out).await {
        Ok(summary) if cli.json => print_json(&summary),
        Ok(summary) => println!(
            "\nFlow completed with result: {}",
            summary.validation_success
        ),
        Err(err) => {
            error!(error = %err, "validation flow aborted");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(err) => {
            error!(error = %err, "failed to encode result");
            std::process::exit(1);
        }
    }
}
