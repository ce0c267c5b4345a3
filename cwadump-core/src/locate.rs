//! Finds the one sensor drive to dump.
//!
//! Several matching drives is never resolved by guessing: the operator has to
//! name the source explicitly.
use crate::device::DeviceCandidate;
use crate::platform::{Discovery, Platform};
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    Single(DeviceCandidate),
    NoneFound,
    Ambiguous(Vec<DeviceCandidate>),
    /// The platform cannot auto-detect; an explicit source is required.
    Unsupported,
}

impl Selection {
    /// Operator-facing description of the outcome. Lists every candidate when
    /// the match is ambiguous.
    pub fn diagnostic(&self) -> String {
        match self {
            Selection::Single(candidate) => format!("Found path: {}", candidate.path.display()),
            Selection::NoneFound => "Found no matching drive (expecting one).".to_string(),
            Selection::Ambiguous(candidates) => {
                let mut msg = format!(
                    "Found too many matching drives ({}, expecting at most one):",
                    candidates.len()
                );
                for candidate in candidates {
                    let _ = write!(msg, "\n  {candidate}");
                }
                msg
            }
            Selection::Unsupported => {
                "Unable to find drive path: automatic detection is not supported on this platform."
                    .to_string()
            }
        }
    }
}

/// Enumerates candidates. Enumeration errors count as "nothing found".
pub fn find_candidates(platform: &dyn Platform) -> Discovery {
    match platform.enumerate_devices() {
        Ok(discovery) => discovery,
        Err(err) => {
            warn!(
                "Problem detecting device physical drive -- please check the device is connected: {err:#}"
            );
            Discovery::Found(Vec::new())
        }
    }
}

pub fn select(discovery: Discovery) -> Selection {
    match discovery {
        Discovery::Unsupported => Selection::Unsupported,
        Discovery::Found(mut candidates) => match candidates.len() {
            0 => Selection::NoneFound,
            1 => Selection::Single(candidates.remove(0)),
            _ => Selection::Ambiguous(candidates),
        },
    }
}

/// The path of the only matching drive, or `None` with a logged reason.
pub fn select_single(platform: &dyn Platform) -> Option<PathBuf> {
    let selection = select(find_candidates(platform));
    let diagnostic = selection.diagnostic();
    match selection {
        Selection::Single(candidate) => {
            info!("{diagnostic}");
            Some(candidate.path)
        }
        Selection::Unsupported => {
            warn!("{diagnostic} Specify the device with --source.");
            None
        }
        Selection::NoneFound | Selection::Ambiguous(_) => {
            warn!("{diagnostic}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Unsupported;

    fn candidate(path: &str) -> DeviceCandidate {
        DeviceCandidate::new(path, "AX3 Mass Storage")
    }

    #[test]
    fn exactly_one_candidate_is_selected() {
        let selection = select(Discovery::Found(vec![candidate("/dev/sdb")]));
        assert_eq!(selection, Selection::Single(candidate("/dev/sdb")));
    }

    #[test]
    fn zero_candidates_selects_nothing() {
        let selection = select(Discovery::Found(vec![]));
        assert_eq!(selection, Selection::NoneFound);
        assert_eq!(selection.diagnostic(), "Found no matching drive (expecting one).");
    }

    #[test]
    fn several_candidates_are_listed_not_guessed() {
        let selection = select(Discovery::Found(vec![
            candidate("/dev/sdb"),
            candidate("/dev/sdc"),
            candidate("/dev/sdd"),
        ]));
        let Selection::Ambiguous(ref all) = selection else {
            panic!("expected an ambiguous selection, got {selection:?}");
        };
        assert_eq!(all.len(), 3);

        let diagnostic = selection.diagnostic();
        for path in ["/dev/sdb", "/dev/sdc", "/dev/sdd"] {
            assert!(diagnostic.contains(path), "{path} missing from {diagnostic}");
        }
    }

    #[test]
    fn unsupported_is_not_the_same_as_none_found() {
        assert_eq!(select(Discovery::Unsupported), Selection::Unsupported);
        assert_eq!(select_single(&Unsupported), None);
    }
}
