use super::{Discovery, Elevation, Platform, Relaunch, SizeProbe, UnmountOutcome};
use crate::device::DeviceCandidate;
use anyhow::Result;
use nix::ioctl_read;
use std::fs::{self, File};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

ioctl_read!(blkgetsize64, 0x12, 114, u64);

/// `/sys/block/<dev>/device/model` of the sensor drives.
const MODEL_SIGNATURES: &[&str] = &["AX3 Mass Storage", "AX6 Mass Storage"];

const SECTOR_SIZE: u64 = 512;

pub struct Linux;

/// Helper to read a file below `/sys/block/<device_name>/`.
fn read_sys_file(device_name: &str, file: &str) -> io::Result<String> {
    let path = PathBuf::from("/sys/block").join(device_name).join(file);
    fs::read_to_string(path).map(|s| s.trim().to_string())
}

fn ioctl_size(device: &Path) -> io::Result<u64> {
    let file = File::open(device)?;
    let mut size_bytes: u64 = 0;
    unsafe {
        blkgetsize64(file.as_raw_fd(), &mut size_bytes)?;
    }
    Ok(size_bytes)
}

fn sysfs_size(device: &Path) -> io::Result<u64> {
    let name = device
        .file_name()
        .ok_or_else(|| io::Error::from(io::ErrorKind::InvalidInput))?
        .to_string_lossy();
    read_sys_file(&name, "size")?
        .parse::<u64>()
        .map(|sectors| sectors * SECTOR_SIZE)
        .map_err(|_| io::Error::from(io::ErrorKind::InvalidData))
}

/// Whether `candidate` names `disk` itself or one of its partitions
/// (`/dev/sdb` -> `/dev/sdb1`, `/dev/mmcblk0` -> `/dev/mmcblk0p1`).
///
/// A disk whose name ends in a digit numbers its partitions after a `p`, so
/// `/dev/nvme0n10` is a different disk from `/dev/nvme0n1`.
fn is_same_disk(disk: &Path, candidate: &Path) -> bool {
    let disk = disk.to_string_lossy();
    let candidate = candidate.to_string_lossy();
    let Some(rest) = candidate.strip_prefix(disk.as_ref()) else {
        return false;
    };
    if rest.is_empty() {
        return true;
    }
    let digits = if disk.ends_with(|c: char| c.is_ascii_digit()) {
        match rest.strip_prefix('p') {
            Some(digits) => digits,
            None => return false,
        }
    } else {
        rest
    };
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

impl Platform for Linux {
    fn name(&self) -> &'static str {
        "Linux"
    }

    fn probe_size(&self, device: &Path) -> SizeProbe {
        info!("...Linux: detecting physical drive size...");
        match fs::metadata(device) {
            Ok(meta) if meta.is_file() => return SizeProbe::Measured(meta.len()),
            Ok(_) => {}
            Err(err) => return SizeProbe::Failed(err.to_string()),
        }

        match ioctl_size(device) {
            Ok(size) => SizeProbe::Measured(size),
            Err(err) => {
                debug!(error = %err, "BLKGETSIZE64 failed, falling back to sysfs");
                sysfs_size(device)
                    .map(SizeProbe::Measured)
                    .unwrap_or_else(|_| SizeProbe::Failed(err.to_string()))
            }
        }
    }

    /// Scans `/sys/block` for drives whose model string carries a sensor signature.
    fn enumerate_devices(&self) -> Result<Discovery> {
        info!("...Linux: detecting device physical drive...");
        let mut found = Vec::new();

        for entry in fs::read_dir("/sys/block")?.filter_map(|e| e.ok()) {
            let device_name = entry.file_name().to_string_lossy().to_string();
            if device_name.starts_with("loop") {
                continue;
            }

            let Ok(model) = read_sys_file(&device_name, "device/model") else {
                continue;
            };
            if !MODEL_SIGNATURES.iter().any(|s| model.contains(s)) {
                continue;
            }

            let vendor = read_sys_file(&device_name, "device/vendor").unwrap_or_default();
            found.push(DeviceCandidate::new(
                PathBuf::from("/dev/").join(&device_name),
                format!("{vendor} {model}").trim().to_string(),
            ));
        }

        found.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(Discovery::Found(found))
    }

    fn request_unmount(&self, device: &Path) -> UnmountOutcome {
        let disks = sysinfo::Disks::new_with_refreshed_list();
        let mount_points: Vec<PathBuf> = disks
            .iter()
            .filter(|disk| is_same_disk(device, &PathBuf::from("/dev/").join(disk.name())))
            .map(|disk| disk.mount_point().to_path_buf())
            .collect();

        if mount_points.is_empty() {
            debug!(device = %device.display(), "nothing mounted from device");
            return UnmountOutcome::Unmounted;
        }

        let mut failures = Vec::new();
        for mount_point in &mount_points {
            info!("...Linux: unmounting {}", mount_point.display());
            if let Err(errno) = nix::mount::umount(mount_point.as_path()) {
                failures.push(format!("{}: {}", mount_point.display(), errno));
            }
        }

        if failures.is_empty() {
            UnmountOutcome::Unmounted
        } else {
            UnmountOutcome::Failed(failures.join("; "))
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_belong_to_their_disk() {
        let sdb = Path::new("/dev/sdb");
        assert!(is_same_disk(sdb, Path::new("/dev/sdb")));
        assert!(is_same_disk(sdb, Path::new("/dev/sdb1")));
        assert!(!is_same_disk(sdb, Path::new("/dev/sdba")));
        assert!(!is_same_disk(sdb, Path::new("/dev/sda1")));

        let mmc = Path::new("/dev/mmcblk0");
        assert!(is_same_disk(mmc, Path::new("/dev/mmcblk0p2")));
        assert!(!is_same_disk(mmc, Path::new("/dev/mmcblk0p")));

        assert!(!is_same_disk(Path::new("/dev/mmcblk1"), Path::new("/dev/mmcblk10")));
        assert!(!is_same_disk(Path::new("/dev/mmcblk1"), Path::new("/dev/mmcblk10p1")));

        let nvme = Path::new("/dev/nvme0n1");
        assert!(is_same_disk(nvme, Path::new("/dev/nvme0n1p3")));
        assert!(!is_same_disk(nvme, Path::new("/dev/nvme0n10")));
        assert!(!is_same_disk(nvme, Path::new("/dev/nvme0n12")));
    }

    #[test]
    fn regular_file_probes_as_its_length() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), vec![0u8; 4096]).unwrap();
        assert_eq!(Linux.probe_size(file.path()), SizeProbe::Measured(4096));
    }

    #[test]
    fn missing_device_fails_the_probe() {
        let probe = Linux.probe_size(Path::new("/dev/definitely-not-a-drive"));
        assert!(matches!(probe, SizeProbe::Failed(_)));
    }
}
