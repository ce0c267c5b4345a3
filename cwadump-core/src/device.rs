use std::fmt;
use std::path::PathBuf;

/// A device that matched one of the sensor signatures during discovery.
///
/// Produced by the platform enumerator through [`crate::locate`] and never
/// persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceCandidate {
    /// The raw device path (e.g., `/dev/sdb` or `\\.\PHYSICALDRIVE2`).
    pub path: PathBuf,
    /// What the platform calls the device (a model string or disk identifier).
    pub platform_identifier: String,
}

impl DeviceCandidate {
    pub fn new(path: impl Into<PathBuf>, platform_identifier: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            platform_identifier: platform_identifier.into(),
        }
    }
}

impl fmt::Display for DeviceCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<20} {}", self.path.display(), self.platform_identifier)
    }
}
