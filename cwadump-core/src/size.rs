//! Decides how many bytes a dump expects to copy.
//!
//! The platform probe is tried first. When it is unsupported or comes back
//! unusable, a per-type default capacity is used instead, which may under- or
//! over-estimate the real drive.
use crate::job::DeviceType;
use crate::platform::{Platform, SizeProbe};
use std::path::Path;
use tracing::{error, info, warn};

pub const SECTOR_SIZE: u64 = 512;

/// Sector counts of the stock sensor drives.
const DEFAULT_SECTORS: &[(DeviceType, u64)] = &[
    (DeviceType::Ax3, 992_161),
    (DeviceType::Ax6, 1_975_995),
];

/// Default capacity in bytes for `device_type`, if the table has one.
pub fn default_size(device_type: DeviceType) -> Option<u64> {
    DEFAULT_SECTORS
        .iter()
        .find(|(t, _)| *t == device_type)
        .map(|(_, sectors)| sectors * SECTOR_SIZE)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeEstimate {
    Measured(u64),
    DefaultForType(DeviceType, u64),
    Unknown,
}

impl SizeEstimate {
    pub fn bytes(&self) -> Option<u64> {
        match *self {
            SizeEstimate::Measured(n) | SizeEstimate::DefaultForType(_, n) => Some(n),
            SizeEstimate::Unknown => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, SizeEstimate::DefaultForType(..))
    }
}

/// Probes `source` on `platform`, falling back to the table for `device_type`.
pub fn resolve(
    platform: &dyn Platform,
    source: &Path,
    device_type: Option<DeviceType>,
) -> SizeEstimate {
    info!("Detecting device physical drive size...");
    from_probe(platform.probe_size(source), device_type)
}

/// Applies the fallback policy to a probe result.
pub fn from_probe(probe: SizeProbe, device_type: Option<DeviceType>) -> SizeEstimate {
    match probe {
        SizeProbe::Measured(n) if n > 0 => {
            info!(bytes = n, "Detected drive size");
            return SizeEstimate::Measured(n);
        }
        SizeProbe::Measured(_) => warn!("Problem determining drive size: drive reports zero bytes."),
        SizeProbe::Failed(reason) => warn!("Problem determining drive size: {reason}"),
        SizeProbe::Unsupported => {
            warn!("Detecting drive size is not supported on this platform.")
        }
    }

    let Some(device_type) = device_type else {
        error!("Cannot use a default drive size as device type is unspecified.");
        return SizeEstimate::Unknown;
    };
    match default_size(device_type) {
        Some(bytes) => {
            warn!(bytes, "Using default drive size for {device_type}");
            SizeEstimate::DefaultForType(device_type, bytes)
        }
        None => {
            error!("Cannot use a default drive size for unknown device type: {device_type}");
            SizeEstimate::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Unsupported;

    #[test]
    fn defaults_follow_the_sector_table() {
        assert_eq!(default_size(DeviceType::Ax3), Some(992_161 * 512));
        assert_eq!(default_size(DeviceType::Ax6), Some(1_975_995 * 512));
    }

    #[test]
    fn unsupported_probe_falls_back_per_type() {
        let source = Path::new("/dev/sensor");
        assert_eq!(
            resolve(&Unsupported, source, Some(DeviceType::Ax3)),
            SizeEstimate::DefaultForType(DeviceType::Ax3, 992_161 * 512)
        );
        assert_eq!(
            resolve(&Unsupported, source, Some(DeviceType::Ax6)).bytes(),
            Some(1_975_995 * 512)
        );
        assert_eq!(resolve(&Unsupported, source, None), SizeEstimate::Unknown);
    }

    #[test]
    fn measurement_wins_over_the_hint() {
        let estimate = from_probe(SizeProbe::Measured(1 << 20), Some(DeviceType::Ax6));
        assert_eq!(estimate, SizeEstimate::Measured(1 << 20));
        assert!(!estimate.is_fallback());
    }

    #[test]
    fn zero_or_failed_measurement_is_not_trusted() {
        assert_eq!(from_probe(SizeProbe::Measured(0), None), SizeEstimate::Unknown);
        let estimate = from_probe(SizeProbe::Failed("garbage".into()), Some(DeviceType::Ax3));
        assert!(estimate.is_fallback());
    }
}
