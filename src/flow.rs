use crate::collectors::checks::run_connectivity_tests;
use crate::collectors::resources::{check_resources, ResourceError, ResourceSource};
use crate::collectors::system::collect_system_info;
use crate::config::{Config, EnvSettings};
use crate::report::{now_rfc3339, ValidationSummary};
use clap::ValueEnum;
use reqwest::Client;
use serde_json::Value;
use std::io::Write;
use sysinfo::{System, SystemExt};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("resource sampling failed: {0}")]
    Resource(#[from] ResourceError),
    #[error("failed to encode task result: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Everything a run needs besides the resource source.
pub struct FlowContext {
    pub config: Config,
    pub env: EnvSettings,
    pub client: Client,
}

impl FlowContext {
    pub fn new(config: Config, env: EnvSettings) -> Self {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            config,
            env,
            client,
        }
    }
}

/// Collectors that can be run on their own with `--task`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TaskName {
    SystemInfo,
    ConnectivityTest,
    ResourceCheck,
}

impl TaskName {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskName::SystemInfo => "system-info",
            TaskName::ConnectivityTest => "connectivity-test",
            TaskName::ResourceCheck => "resource-check",
        }
    }
}

/// Runs system info, connectivity and resource checks in that order and
/// folds them into one summary. Only connectivity decides `validation_success`.
pub async fn validation_flow<S: ResourceSource>(
    ctx: &FlowContext,
    resources: &mut S,
    out: &mut dyn Write,
) -> Result<ValidationSummary, FlowError> {
    info!("starting ECS worker validation flow");
    let _ = writeln!(out, "Starting ECS Worker Validation Flow");
    let _ = writeln!(out, "{}", "=".repeat(50));

    let system_info = collect_system_info(&System::new(), &ctx.env, out);
    let connectivity_tests = run_connectivity_tests(
        &ctx.client,
        &ctx.config,
        ctx.env.metadata_uri.as_deref(),
        out,
    )
    .await;
    let resource_usage = check_resources(resources, &ctx.config.resources, out).await?;

    let summary = ValidationSummary::new(
        now_rfc3339(),
        system_info,
        connectivity_tests,
        resource_usage,
    );

    let _ = writeln!(out, "\n{}", "=".repeat(50));
    let _ = writeln!(out, "Validation Summary:");
    if summary.validation_success {
        let _ = writeln!(out, "All tests passed! ECS worker is functioning correctly.");
    } else {
        let _ = writeln!(out, "Some tests failed. Check the logs above for details.");
    }
    info!(
        validation_success = summary.validation_success,
        probes = summary.connectivity_tests.len(),
        "validation flow completed"
    );
    Ok(summary)
}

/// Runs one registered collector and returns its record as JSON.
pub async fn run_task<S: ResourceSource>(
    task: TaskName,
    ctx: &FlowContext,
    resources: &mut S,
    out: &mut dyn Write,
) -> Result<Value, FlowError> {
    info!(task = task.as_str(), "running single task");
    let value = match task {
        TaskName::SystemInfo => {
            serde_json::to_value(collect_system_info(&System::new(), &ctx.env, out))?
        }
        TaskName::ConnectivityTest => serde_json::to_value(
            run_connectivity_tests(
                &ctx.client,
                &ctx.config,
                ctx.env.metadata_uri.as_deref(),
                out,
            )
            .await,
        )?,
        TaskName::ResourceCheck => {
            serde_json::to_value(check_resources(resources, &ctx.config.resources, out).await?)?
        }
    };
    Ok(value)
}
