//! Drives one dump end to end: pick the source, size it, unmount it, copy it.
use crate::dump::{self, DumpSummary, StopReason};
use crate::error::{Error, Result};
use crate::job::{DeviceType, DumpJob, OpenMode};
use crate::locate;
use crate::platform::{Platform, UnmountOutcome};
use crate::progress::DumpProgress;
use crate::size::{self, SizeEstimate};
use crate::unmount;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing::{info, warn};

/// Destination used when none is given.
pub const DEFAULT_DESTINATION: &str = "cwa-dump.img";

/// What the operator asked for, before any device has been resolved.
#[derive(Clone, Debug)]
pub struct DumpRequest {
    /// Explicit source device. `None` means auto-detect.
    pub source: Option<PathBuf>,
    pub destination: PathBuf,
    pub mode: OpenMode,
    pub device_type: Option<DeviceType>,
}

impl Default for DumpRequest {
    fn default() -> Self {
        Self {
            source: None,
            destination: PathBuf::from(DEFAULT_DESTINATION),
            mode: OpenMode::default(),
            device_type: None,
        }
    }
}

/// The explicit source, or the single auto-detected sensor drive.
pub fn resolve_source(platform: &dyn Platform, request: &DumpRequest) -> Result<PathBuf> {
    if let Some(source) = &request.source {
        return Ok(source.clone());
    }
    info!("Determining source...");
    locate::select_single(platform).ok_or(Error::NoSource)
}

/// Resolves source and size into a job. Nothing is opened or created yet.
pub fn plan(platform: &dyn Platform, request: &DumpRequest) -> Result<(DumpJob, SizeEstimate)> {
    let source = resolve_source(platform, request)?;
    let estimate = size::resolve(platform, &source, request.device_type);
    if estimate == SizeEstimate::Unknown {
        return Err(Error::SizeUnresolved {
            device_type: request.device_type,
        });
    }

    let job = DumpJob::new(source, &request.destination, request.mode)
        .with_device_type(request.device_type)
        .with_estimate(&estimate);
    Ok((job, estimate))
}

/// Whether a finished dump stopped at a default table size and so may have
/// left data on the drive.
pub fn may_be_truncated(summary: &DumpSummary, estimate: &SizeEstimate) -> bool {
    summary.stop == StopReason::SizeBound && estimate.is_fallback()
}

/// The advice to log alongside [`Error::DeviceBusy`], given how the unmount went.
pub fn busy_notice(unmounted: &UnmountOutcome) -> Option<String> {
    match unmounted {
        UnmountOutcome::Unmounted => None,
        other => Some(format!(
            "The device is probably still mounted; unmounting it was not possible ({other:?})."
        )),
    }
}

/// Runs the whole dump for `request`.
pub fn run<F>(
    platform: &dyn Platform,
    request: &DumpRequest,
    running: Arc<AtomicBool>,
    on_start: impl FnOnce(&DumpProgress),
    on_progress: F,
) -> Result<DumpSummary>
where
    F: FnMut(&DumpProgress),
{
    let (job, estimate) = plan(platform, request)?;
    info!(
        source = %job.source.display(),
        destination = %job.destination.display(),
        mode = ?job.mode,
        "DriveDump"
    );

    let unmounted = unmount::request_unmount(platform, &job.source);

    let summary = match dump::run(&job, running, on_start, on_progress) {
        Ok(summary) => summary,
        Err(err @ Error::DeviceBusy { .. }) => {
            if let Some(notice) = busy_notice(&unmounted) {
                warn!("{notice}");
            }
            return Err(err);
        }
        Err(err) => return Err(err),
    };

    if may_be_truncated(&summary, &estimate) {
        warn!(
            offset = summary.final_offset,
            "Stopped at the default drive size for {}; the drive may hold more data than was dumped.",
            job.device_type.map_or("this device", |t| t.name())
        );
    }
    info!(
        bytes = summary.bytes_written,
        offset = summary.final_offset,
        blocks = summary.blocks,
        "Dump complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn summary(stop: StopReason) -> DumpSummary {
        DumpSummary {
            start_offset: 0,
            final_offset: 4096,
            bytes_written: 4096,
            blocks: 1,
            elapsed: Duration::from_secs(1),
            stop,
        }
    }

    #[test]
    fn default_size_stop_may_truncate() {
        let fallback = SizeEstimate::DefaultForType(DeviceType::Ax3, 4096);
        assert!(may_be_truncated(&summary(StopReason::SizeBound), &fallback));
        assert!(!may_be_truncated(&summary(StopReason::SourceExhausted), &fallback));
    }

    #[test]
    fn measured_size_stop_is_expected() {
        let measured = SizeEstimate::Measured(4096);
        assert!(!may_be_truncated(&summary(StopReason::SizeBound), &measured));
    }

    #[test]
    fn busy_after_failed_unmount_says_still_mounted() {
        let notice = busy_notice(&UnmountOutcome::Failed("EBUSY".into())).unwrap();
        assert!(notice.contains("probably still mounted"));
        assert!(notice.contains("EBUSY"));
        assert!(busy_notice(&UnmountOutcome::NotSupported).is_some());
        assert_eq!(busy_notice(&UnmountOutcome::Unmounted), None);
    }
}
