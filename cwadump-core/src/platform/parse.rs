//! Parsers for the disk utilities shelled out to on Windows and macOS.
//!
//! Kept free of any process spawning so they build and test everywhere.
#![cfg_attr(
    not(any(target_os = "windows", target_os = "macos")),
    allow(dead_code)
)]

use crate::device::DeviceCandidate;
use regex::Regex;
use std::sync::LazyLock;

/// `wmic diskdrive list brief` captions of the sensor drives.
pub(crate) const WMIC_SIGNATURES: &[&str] = &[
    "AX3 AX3 Mass Storage USB Device",
    "AX6 AX6 Mass Storage USB Device",
];

const PHYSICAL_DRIVE_PREFIX: &str = r"\\.\PHYSICALDRIVE";

/// Sensor volumes are labelled e.g. `AX3_12345`.
static VOLUME_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bAX\d+_\d+\b").expect("valid volume regex"));

static DISK_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bdisk\d+s\d+\b").expect("valid disk regex"));

static TOTAL_SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<key>TotalSize</key>\s*<integer>(\d+)</integer>").expect("valid plist regex")
});

/// Size column of the `wmic` line that mentions `drive`.
pub(crate) fn wmic_drive_size(listing: &str, drive: &str) -> Option<u64> {
    listing.lines().find_map(|line| {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.iter().any(|p| p.eq_ignore_ascii_case(drive)) {
            parts.last()?.parse().ok()
        } else {
            None
        }
    })
}

pub(crate) fn wmic_devices(listing: &str) -> Vec<DeviceCandidate> {
    let mut found = Vec::new();
    for line in listing.lines() {
        let Some(signature) = WMIC_SIGNATURES.iter().find(|s| line.starts_with(*s)) else {
            continue;
        };
        for part in line.split_whitespace() {
            if part.starts_with(PHYSICAL_DRIVE_PREFIX) {
                found.push(DeviceCandidate::new(part, *signature));
            }
        }
    }
    found
}

/// Disk identifiers (`diskNsM`) of every `diskutil list` line holding a sensor volume.
pub(crate) fn diskutil_devices(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter(|line| VOLUME_NAME.is_match(line))
        .flat_map(|line| DISK_IDENTIFIER.find_iter(line).map(|m| m.as_str().to_string()))
        .collect()
}

/// `TotalSize` from `diskutil info -plist`.
pub(crate) fn diskutil_total_size(plist: &str) -> Option<u64> {
    TOTAL_SIZE
        .captures(plist)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
