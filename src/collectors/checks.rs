use crate::config::Config;
use crate::report::{ConnectivityResult, ProbeKind};
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::io::Write;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub async fn run_connectivity_tests(
    client: &Client,
    cfg: &Config,
    metadata_uri: Option<&str>,
    out: &mut dyn Write,
) -> Vec<ConnectivityResult> {
    let mut results = Vec::with_capacity(2);
    results.push(run_internet_probe(client, cfg).await);
    if let Some(base) = metadata_uri {
        results.push(run_metadata_probe(client, cfg, base).await);
    }

    let _ = writeln!(out, "Connectivity Test Results:");
    for result in &results {
        let marker = if result.is_success() { "✅" } else { "❌" };
        let _ = writeln!(
            out,
            "  {marker} {}: {}",
            result.test.as_str(),
            result.status()
        );
        if let Some(error) = result.error() {
            let _ = writeln!(out, "    Error: {error}");
        }
    }
    results
}

async fn run_internet_probe(client: &Client, cfg: &Config) -> ConnectivityResult {
    let probe = &cfg.internet_probe;
    let start = Instant::now();
    let outcome = fetch_json::<Value>(client, &probe.url, probe.timeout_ms).await;
    finish(ProbeKind::InternetConnectivity, &probe.url, start, outcome)
}

async fn run_metadata_probe(client: &Client, cfg: &Config, base: &str) -> ConnectivityResult {
    let probe = &cfg.metadata_probe;
    let url = metadata_task_url(base, &probe.path);
    let start = Instant::now();
    // The `/task` document must be a JSON object; the three fields pass through as-is.
    let outcome = fetch_json::<Map<String, Value>>(client, &url, probe.timeout_ms)
        .await
        .map(|task| {
            let field = |key: &str| task.get(key).cloned().unwrap_or(Value::Null);
            json!({
                "task_arn": field("TaskARN"),
                "cluster": field("Cluster"),
                "family": field("Family"),
            })
        });
    finish(ProbeKind::EcsMetadata, &url, start, outcome)
}

fn finish(
    test: ProbeKind,
    url: &str,
    start: Instant,
    outcome: Result<Value, reqwest::Error>,
) -> ConnectivityResult {
    let latency_ms = start.elapsed().as_millis() as u64;
    match outcome {
        Ok(payload) => {
            info!(test = test.as_str(), url, latency_ms, "probe succeeded");
            ConnectivityResult::success(test, payload)
        }
        Err(err) => {
            let error = describe_error(&err);
            warn!(test = test.as_str(), url, latency_ms, error = %error, "probe failed");
            ConnectivityResult::failed(test, error)
        }
    }
}

async fn fetch_json<T>(client: &Client, url: &str, timeout_ms: u64) -> Result<T, reqwest::Error>
where
    T: serde::de::DeserializeOwned,
{
    client
        .get(url)
        .timeout(Duration::from_millis(timeout_ms))
        .send()
        .await?
        .error_for_status()?
        .json::<T>()
        .await
}

fn metadata_task_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Error message followed by its source chain, so a bare "error sending request"
/// still says whether it was a timeout, DNS failure or refused connection.
fn describe_error(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}
