//! Platform-specific open flags for the dump source and destination.
use crate::job::OpenMode;
use std::fs::OpenOptions;
use std::path::Path;

/// Read-only options for the source.
///
/// A Unix block device is opened with `O_EXCL`, so the open fails with
/// `EBUSY` while any of its partitions is mounted. A Windows physical drive
/// has to be shared for read and write to open at all.
pub(crate) fn source_options(path: &Path) -> OpenOptions {
    let mut options = OpenOptions::new();
    options.read(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
        let is_block_device = std::fs::metadata(path)
            .map(|m| m.file_type().is_block_device())
            .unwrap_or(false);
        if is_block_device {
            options.custom_flags(libc::O_EXCL);
        }
    }

    #[cfg(windows)]
    {
        use std::os::windows::fs::OpenOptionsExt;
        use windows_sys::Win32::Storage::FileSystem::{FILE_SHARE_READ, FILE_SHARE_WRITE};
        let _ = path;
        options.share_mode(FILE_SHARE_READ | FILE_SHARE_WRITE);
    }

    #[cfg(not(any(unix, windows)))]
    let _ = path;

    options
}

pub(crate) fn destination_options(mode: OpenMode) -> OpenOptions {
    let mut options = OpenOptions::new();
    match mode {
        OpenMode::CreateExclusive => options.write(true).create_new(true),
        OpenMode::Overwrite => options.write(true).create(true).truncate(true),
        OpenMode::Resume => options.append(true).create(true),
    };
    options
}
