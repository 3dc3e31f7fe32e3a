use crate::config::EnvSettings;
use crate::report::{now_rfc3339, SystemInfo};
use std::io::Write;
use sysinfo::{System, SystemExt};
use tracing::debug;

pub fn collect_system_info(
    system: &System,
    env: &EnvSettings,
    out: &mut dyn Write,
) -> SystemInfo {
    let info = SystemInfo {
        timestamp: now_rfc3339(),
        platform: platform_descriptor(system),
        runtime_version: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        container_hostname: env.container_hostname.clone(),
        aws_region: env.aws_region.clone(),
        api_url: env.api_url.clone(),
        task_family: env.task_family.clone(),
        cluster_name: env.cluster_name.clone(),
    };
    debug!(platform = %info.platform, host = %info.container_hostname, "system info collected");

    let _ = writeln!(out, "🔍 System Information:");
    for (key, value) in fields(&info) {
        let _ = writeln!(out, "  {key}: {value}");
    }
    info
}

/// `<os>-<kernel>-<arch>`, e.g. `Linux-6.1.0-x86_64`.
fn platform_descriptor(system: &System) -> String {
    let os = system
        .name()
        .unwrap_or_else(|| std::env::consts::OS.to_string());
    match system.kernel_version() {
        Some(kernel) => format!("{os}-{kernel}-{}", std::env::consts::ARCH),
        None => format!("{os}-{}", std::env::consts::ARCH),
    }
}

fn fields(info: &SystemInfo) -> [(&'static str, &str); 8] {
    [
        ("timestamp", info.timestamp.as_str()),
        ("platform", info.platform.as_str()),
        ("runtime_version", info.runtime_version.as_str()),
        ("container_hostname", info.container_hostname.as_str()),
        ("aws_region", info.aws_region.as_str()),
        ("api_url", info.api_url.as_str()),
        ("task_family", info.task_family.as_str()),
        ("cluster_name", info.cluster_name.as_str()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_environment_uses_sentinels() {
        let env = EnvSettings::from_lookup(|_| None);
        let mut out = Vec::new();
        let info = collect_system_info(&System::new(), &env, &mut out);

        assert_eq!(info.container_hostname, "unknown");
        assert_eq!(info.aws_region, "unknown");
        assert_eq!(info.api_url, "not_set");
        assert_eq!(info.task_family, "unknown");
        assert_eq!(info.cluster_name, "unknown");
        assert!(info.platform.ends_with(std::env::consts::ARCH));
        assert!(info.runtime_version.starts_with("workercheck "));
    }

    #[test]
    fn environment_values_pass_through() {
        let env = EnvSettings::from_lookup(|name| match name {
            "ECS_CLUSTER" => Some("prod-cluster".to_string()),
            "PREFECT_API_URL" => Some("https://api.example.com".to_string()),
            _ => None,
        });
        let mut out = Vec::new();
        let info = collect_system_info(&System::new(), &env, &mut out);

        assert_eq!(info.cluster_name, "prod-cluster");
        assert_eq!(info.api_url, "https://api.example.com");
        assert_eq!(info.aws_region, "unknown");
    }

    #[test]
    fn prints_every_field() {
        let env = EnvSettings::from_lookup(|_| None);
        let mut out = Vec::new();
        collect_system_info(&System::new(), &env, &mut out);
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("🔍 System Information:"));
        assert!(text.contains("  api_url: not_set\n"));
        assert!(text.contains("  cluster_name: unknown\n"));
        assert_eq!(text.lines().count(), 9);
    }
}
