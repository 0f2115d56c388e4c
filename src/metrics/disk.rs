//! Filesystem usage of a mount point

use nix::sys::statvfs::statvfs;
use std::path::PathBuf;

use super::{gib, MetricSource, Reading, SourceError};

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Filesystem usage in bytes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiskUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    /// Blocks free for root only (`bfree - bavail`)
    pub reserved: u64,
}

impl DiskUsage {
    /// Same accounting as `df`: free is what unprivileged users can still allocate.
    pub fn from_blocks(fragment_size: u64, blocks: u64, blocks_free: u64, blocks_available: u64) -> Self {
        let total = blocks * fragment_size;
        let used = blocks.saturating_sub(blocks_free) * fragment_size;
        let free = blocks_available * fragment_size;
        Self {
            total,
            used,
            free,
            reserved: total.saturating_sub(used + free),
        }
    }

    pub fn used_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        100.0 * self.used as f64 / self.total as f64
    }
}

pub struct DiskSource {
    mount: PathBuf,
}

impl DiskSource {
    pub fn new(mount: PathBuf) -> Self {
        Self { mount }
    }

    fn usage(&self) -> Result<DiskUsage, SourceError> {
        let stat = statvfs(self.mount.as_path()).map_err(|source| SourceError::Statvfs {
            path: self.mount.clone(),
            source,
        })?;

        Ok(DiskUsage::from_blocks(
            stat.fragment_size() as u64,
            stat.blocks() as u64,
            stat.blocks_free() as u64,
            stat.blocks_available() as u64,
        ))
    }
}

impl MetricSource for DiskSource {
    fn title(&self) -> &str {
        "DISK SPACE"
    }

    fn collect(&self) -> Result<Reading, SourceError> {
        let usage = self.usage()?;
        tracing::trace!(mount = %self.mount.display(), ?usage, "disk usage");

        let keys = ["Total", "Used", "Free", "Reserved", "Used %"];
        let values = vec![
            gib(usage.total as f64 / BYTES_PER_GIB),
            gib(usage.used as f64 / BYTES_PER_GIB),
            gib(usage.free as f64 / BYTES_PER_GIB),
            gib(usage.reserved as f64 / BYTES_PER_GIB),
            format!("{:.2}%", usage.used_percent()),
        ];

        Ok(Reading::Rows(vec![
            keys.iter().map(|k| k.to_string()).collect(),
            values,
        ]))
    }
}
