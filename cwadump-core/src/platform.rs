//! Provides platform-specific functionality.
//!
//! Everything the dump needs from the operating system goes through the
//! [`Platform`] capability trait: probing a drive's size, enumerating sensor
//! drives, unmounting, and checking for (or requesting) elevated privileges.
//!
//! Conditional compilation (`#[cfg]`) selects the implementation for the
//! target OS, and [`native`] hands it out at startup. Operating systems without
//! an implementation get [`Unsupported`], which answers every question with an
//! explicit "unsupported" outcome rather than an error.

use crate::device::DeviceCandidate;
use anyhow::Result;
use std::path::Path;

mod parse;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use self::linux::Linux;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
pub use self::macos::MacOs;

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
pub use self::windows::Windows;

/// Result of asking the platform for a drive's raw capacity in bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SizeProbe {
    Measured(u64),
    /// The platform has a probe, but it did not yield a usable number.
    Failed(String),
    Unsupported,
}

/// Result of enumerating signature-matched drives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Discovery {
    Found(Vec<DeviceCandidate>),
    /// Auto-detection is not available here; the source must be given explicitly.
    Unsupported,
}

/// Result of an advisory unmount request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnmountOutcome {
    Unmounted,
    NotSupported,
    Failed(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Elevation {
    Elevated,
    NotElevated,
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relaunch {
    /// An elevated copy of this process was started; this one should exit.
    Spawned,
    Unsupported,
}

/// The operating-system capabilities a dump relies on.
pub trait Platform {
    /// Short OS name used in diagnostics.
    fn name(&self) -> &'static str;

    fn probe_size(&self, device: &Path) -> SizeProbe;

    fn enumerate_devices(&self) -> Result<Discovery>;

    fn request_unmount(&self, device: &Path) -> UnmountOutcome;

    fn elevation(&self) -> Elevation;

    /// Re-launches the current command line with elevated privileges.
    fn rerun_elevated(&self) -> Result<Relaunch>;
}

/// A platform with no native support: every capability reports "unsupported".
#[derive(Clone, Copy, Debug, Default)]
pub struct Unsupported;

impl Platform for Unsupported {
    fn name(&self) -> &'static str {
        std::env::consts::OS
    }

    fn probe_size(&self, _device: &Path) -> SizeProbe {
        SizeProbe::Unsupported
    }

    fn enumerate_devices(&self) -> Result<Discovery> {
        Ok(Discovery::Unsupported)
    }

    fn request_unmount(&self, _device: &Path) -> UnmountOutcome {
        UnmountOutcome::NotSupported
    }

    fn elevation(&self) -> Elevation {
        Elevation::Unknown
    }

    fn rerun_elevated(&self) -> Result<Relaunch> {
        Ok(Relaunch::Unsupported)
    }
}

/// Returns the implementation for the OS this binary was built for.
pub fn native() -> Box<dyn Platform> {
    #[cfg(target_os = "linux")]
    {
        Box::new(Linux)
    }
    #[cfg(target_os = "macos")]
    {
        Box::new(MacOs)
    }
    #[cfg(target_os = "windows")]
    {
        Box::new(Windows)
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        Box::new(Unsupported)
    }
}
