use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub timestamp: String,
    pub platform: String,
    pub runtime_version: String,
    pub container_hostname: String,
    pub aws_region: String,
    pub api_url: String,
    pub task_family: String,
    pub cluster_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    InternetConnectivity,
    EcsMetadata,
}

impl ProbeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProbeKind::InternetConnectivity => "internet_connectivity",
            ProbeKind::EcsMetadata => "ecs_metadata",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Success { result: Value },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityResult {
    pub test: ProbeKind,
    #[serde(flatten)]
    pub outcome: ProbeOutcome,
}

impl ConnectivityResult {
    pub fn success(test: ProbeKind, result: Value) -> Self {
        Self {
            test,
            outcome: ProbeOutcome::Success { result },
        }
    }

    pub fn failed(test: ProbeKind, error: impl Into<String>) -> Self {
        Self {
            test,
            outcome: ProbeOutcome::Failed {
                error: error.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Success { .. })
    }

    pub fn status(&self) -> &'static str {
        if self.is_success() {
            "success"
        } else {
            "failed"
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ProbeOutcome::Failed { error } => Some(error),
            ProbeOutcome::Success { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub cpu_percent: f64,
    pub memory_total_gb: f64,
    pub memory_used_gb: f64,
    pub memory_percent: f64,
    pub disk_total_gb: f64,
    pub disk_used_gb: f64,
    pub disk_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub flow_status: String,
    pub timestamp: String,
    pub system_info: SystemInfo,
    pub connectivity_tests: Vec<ConnectivityResult>,
    pub resource_usage: ResourceUsage,
    pub validation_success: bool,
}

impl ValidationSummary {
    pub fn new(
        timestamp: String,
        system_info: SystemInfo,
        connectivity_tests: Vec<ConnectivityResult>,
        resource_usage: ResourceUsage,
    ) -> Self {
        let validation_success = all_passed(&connectivity_tests);
        Self {
            flow_status: "completed".to_string(),
            timestamp,
            system_info,
            connectivity_tests,
            resource_usage,
            validation_success,
        }
    }
}

/// True when every probe succeeded; an empty slice passes.
pub fn all_passed(results: &[ConnectivityResult]) -> bool {
    results.iter().all(ConnectivityResult::is_success)
}

pub fn now_rfc3339() -> String {
    humantime::format_rfc3339_millis(std::time::SystemTime::now()).to_string()
}
