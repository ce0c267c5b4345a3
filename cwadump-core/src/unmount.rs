//! Best-effort unmount before the raw read. The dump goes ahead whatever
//! the outcome.
use crate::platform::{Platform, UnmountOutcome};
use std::path::Path;
use tracing::{info, warn};

pub fn request_unmount(platform: &dyn Platform, device: &Path) -> UnmountOutcome {
    let outcome = platform.request_unmount(device);
    match &outcome {
        UnmountOutcome::Unmounted => info!(device = %device.display(), "Device unmounted"),
        UnmountOutcome::NotSupported => info!(
            "...{}: automatically unmounting is not supported on this platform.",
            platform.name()
        ),
        UnmountOutcome::Failed(reason) => {
            warn!("Problem unmounting {}, continuing anyway: {reason}", device.display())
        }
    }
    outcome
}
