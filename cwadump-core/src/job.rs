//! The inputs of a single dump.
use crate::size::SizeEstimate;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// The sensor families the tool knows default capacities for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceType {
    /// Short-duration variant.
    Ax3,
    /// Long-duration variant.
    Ax6,
}

impl DeviceType {
    pub fn name(&self) -> &'static str {
        match self {
            DeviceType::Ax3 => "AX3",
            DeviceType::Ax6 => "AX6",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
#[error("unknown device type: {0} (expected ax3 or ax6)")]
pub struct UnknownDeviceType(pub String);

impl FromStr for DeviceType {
    type Err = UnknownDeviceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ax3" => Ok(DeviceType::Ax3),
            "ax6" => Ok(DeviceType::Ax6),
            _ => Err(UnknownDeviceType(s.to_string())),
        }
    }
}

/// How the destination image is opened.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OpenMode {
    /// Refuse to touch an existing destination.
    #[default]
    CreateExclusive,
    /// Truncate the destination and dump from the start of the device.
    Overwrite,
    /// Append to the destination; its current length is the resume offset.
    Resume,
}

/// A fully resolved dump: the engine needs nothing else to run.
///
/// Built once per invocation. Only the size is filled in afterwards, by
/// [`DumpJob::with_estimate`], before the engine starts.
#[derive(Clone, Debug)]
pub struct DumpJob {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub mode: OpenMode,
    pub device_type: Option<DeviceType>,
    pub expected_total_bytes: Option<u64>,
}

impl DumpJob {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>, mode: OpenMode) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            mode,
            device_type: None,
            expected_total_bytes: None,
        }
    }

    pub fn with_device_type(mut self, device_type: Option<DeviceType>) -> Self {
        self.device_type = device_type;
        self
    }

    pub fn with_estimate(mut self, estimate: &SizeEstimate) -> Self {
        self.expected_total_bytes = estimate.bytes();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_device_types_case_insensitively() {
        assert_eq!("ax3".parse::<DeviceType>().unwrap(), DeviceType::Ax3);
        assert_eq!("AX6".parse::<DeviceType>().unwrap(), DeviceType::Ax6);
        let err = "ax9".parse::<DeviceType>().unwrap_err();
        assert!(err.to_string().contains("ax9"));
    }

    #[test]
    fn default_mode_is_exclusive() {
        assert_eq!(OpenMode::default(), OpenMode::CreateExclusive);
    }
}
