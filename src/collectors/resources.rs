use crate::config::ResourceConfig;
use crate::report::ResourceUsage;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sysinfo::{CpuExt, DiskExt, System, SystemExt};
use thiserror::Error;
use tracing::debug;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("no CPUs reported by the operating system")]
    CpuUnavailable,
    #[error("total memory reported as zero")]
    MemoryUnavailable,
    #[error("no filesystem mounted at {0}")]
    DiskNotFound(PathBuf),
    #[cfg(unix)]
    #[error("statvfs failed for {path}: {source}")]
    Statvfs {
        path: PathBuf,
        source: nix::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
}

/// Raw OS counters behind the resource check.
pub trait ResourceSource {
    fn refresh_cpu(&mut self);
    /// Global CPU usage since the previous `refresh_cpu`.
    fn cpu_usage_percent(&self) -> Result<f64, ResourceError>;
    fn memory(&mut self) -> Result<ByteUsage, ResourceError>;
    fn disk(&mut self, mount: &Path) -> Result<ByteUsage, ResourceError>;
}

pub struct SysinfoSource {
    system: System,
}

impl SysinfoSource {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceSource for SysinfoSource {
    fn refresh_cpu(&mut self) {
        self.system.refresh_cpu();
    }

    fn cpu_usage_percent(&self) -> Result<f64, ResourceError> {
        if self.system.cpus().is_empty() {
            return Err(ResourceError::CpuUnavailable);
        }
        Ok(self.system.global_cpu_info().cpu_usage() as f64)
    }

    fn memory(&mut self) -> Result<ByteUsage, ResourceError> {
        self.system.refresh_memory();
        let total_bytes = self.system.total_memory();
        if total_bytes == 0 {
            return Err(ResourceError::MemoryUnavailable);
        }
        Ok(ByteUsage {
            total_bytes,
            used_bytes: self.system.used_memory(),
        })
    }

    fn disk(&mut self, path: &Path) -> Result<ByteUsage, ResourceError> {
        self.system.refresh_disks_list();
        self.system.refresh_disks();
        let mounts = self
            .system
            .disks()
            .iter()
            .map(|d| (d.mount_point(), d.total_space(), d.available_space()));
        if let Some(usage) = usage_for_path(mounts, path) {
            return Ok(usage);
        }
        debug!(path = %path.display(), "no listed mount covers path, asking statvfs");
        statvfs_usage(path)
    }
}

#[cfg(unix)]
fn statvfs_usage(path: &Path) -> Result<ByteUsage, ResourceError> {
    let stats = nix::sys::statvfs::statvfs(path).map_err(|source| ResourceError::Statvfs {
        path: path.to_path_buf(),
        source,
    })?;
    let unit = stats.fragment_size() as u64;
    let total = stats.blocks() as u64 * unit;
    let available = stats.blocks_available() as u64 * unit;
    Ok(ByteUsage {
        total_bytes: total,
        used_bytes: total.saturating_sub(available),
    })
}

#[cfg(not(unix))]
fn statvfs_usage(path: &Path) -> Result<ByteUsage, ResourceError> {
    Err(ResourceError::DiskNotFound(path.to_path_buf()))
}

/// Usage of the filesystem holding `path`: the listed mount with the longest prefix of it.
/// sysinfo leaves rootfs/tmpfs/squashfs out of its list, so callers fall back to statvfs.
fn usage_for_path<'a, I>(mounts: I, path: &Path) -> Option<ByteUsage>
where
    I: IntoIterator<Item = (&'a Path, u64, u64)>,
{
    mounts
        .into_iter()
        .filter(|(mount, _, _)| path.starts_with(mount))
        .max_by_key(|(mount, _, _)| mount.components().count())
        .map(|(_, total, available)| ByteUsage {
            total_bytes: total,
            used_bytes: total.saturating_sub(available),
        })
}

/// Samples CPU over `cfg.cpu_sample_ms`, then memory and the configured mount.
/// Errors are returned as-is; a failed sample aborts the whole validation run.
pub async fn check_resources<S: ResourceSource>(
    source: &mut S,
    cfg: &ResourceConfig,
    out: &mut dyn Write,
) -> Result<ResourceUsage, ResourceError> {
    source.refresh_cpu();
    tokio::time::sleep(Duration::from_millis(cfg.cpu_sample_ms)).await;
    source.refresh_cpu();
    let cpu_percent = source.cpu_usage_percent()?;

    let memory = source.memory()?;
    let disk = source.disk(Path::new(&cfg.disk_mount))?;

    let usage = ResourceUsage {
        cpu_percent: round2(cpu_percent.clamp(0.0, 100.0)),
        memory_total_gb: bytes_to_gb(memory.total_bytes),
        memory_used_gb: bytes_to_gb(memory.used()),
        memory_percent: percent(memory.used(), memory.total_bytes),
        disk_total_gb: bytes_to_gb(disk.total_bytes),
        disk_used_gb: bytes_to_gb(disk.used()),
        disk_percent: percent(disk.used(), disk.total_bytes),
    };
    debug!(?usage, mount = %cfg.disk_mount, "resources sampled");

    let _ = writeln!(out, "Resource Usage:");
    let _ = writeln!(out, "  CPU: {}%", usage.cpu_percent);
    let _ = writeln!(
        out,
        "  Memory: {}GB / {}GB ({}%)",
        usage.memory_used_gb, usage.memory_total_gb, usage.memory_percent
    );
    let _ = writeln!(
        out,
        "  Disk: {}GB / {}GB ({}%)",
        usage.disk_used_gb, usage.disk_total_gb, usage.disk_percent
    );
    Ok(usage)
}

impl ByteUsage {
    /// Used bytes capped at the total.
    fn used(&self) -> u64 {
        self.used_bytes.min(self.total_bytes)
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn bytes_to_gb(bytes: u64) -> f64 {
    round2(bytes as f64 / BYTES_PER_GB)
}

fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2((used as f64 / total as f64) * 100.0)
}
