use super::parse;
use super::{Discovery, Elevation, Platform, Relaunch, SizeProbe, UnmountOutcome};
use crate::device::DeviceCandidate;
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

pub struct MacOs;

fn diskutil(args: &[&str]) -> Result<String> {
    let output = Command::new("diskutil")
        .args(args)
        .output()
        .context("failed to run diskutil")?;
    if !output.status.success() {
        bail!(
            "diskutil {} exited with {}: {}",
            args.join(" "),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// `/dev/disk4s1` -> `disk4s1`, the form `diskutil info` accepts.
fn disk_identifier(device: &Path) -> String {
    device
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| device.to_string_lossy().into_owned())
}

impl Platform for MacOs {
    fn name(&self) -> &'static str {
        "macOS"
    }

    fn probe_size(&self, device: &Path) -> SizeProbe {
        info!("...macOS: detecting physical drive size...");
        let identifier = disk_identifier(device);
        match diskutil(&["info", "-plist", &identifier]) {
            Ok(plist) => match parse::diskutil_total_size(&plist) {
                Some(size) => SizeProbe::Measured(size),
                None => SizeProbe::Failed(format!("no TotalSize reported for {identifier}")),
            },
            Err(err) => SizeProbe::Failed(format!("{err:#}")),
        }
    }

    fn enumerate_devices(&self) -> Result<Discovery> {
        info!("...macOS: detecting device physical drive...");
        let listing = diskutil(&["list"])?;
        let found = parse::diskutil_devices(&listing)
            .into_iter()
            .map(|id| DeviceCandidate::new(PathBuf::from("/dev/").join(&id), id))
            .collect();
        Ok(Discovery::Found(found))
    }

    fn request_unmount(&self, device: &Path) -> UnmountOutcome {
        let path = device.to_string_lossy();
        info!("...macOS: unmounting device: diskutil unmountDisk {path}");
        match diskutil(&["unmountDisk", &path]) {
            Ok(response) => {
                info!("...macOS: response: {}", response.trim());
                UnmountOutcome::Unmounted
            }
            Err(err) => UnmountOutcome::Failed(format!("{err:#}")),
        }
    }

    fn elevation(&self) -> Elevation {
        if nix::unistd::geteuid().is_root() {
            Elevation::Elevated
        } else {
            Elevation::NotElevated
        }
    }

    fn rerun_elevated(&self) -> Result<Relaunch> {
        Ok(Relaunch::Unsupported)
    }
}
