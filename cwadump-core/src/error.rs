//! The error taxonomy surfaced by a dump.
//!
//! Errors fall into three groups. Configuration errors ([`Error::NoSource`],
//! [`Error::SizeUnresolved`]) are raised before any file is opened.
//! Precondition errors ([`Error::AlreadyExists`], [`Error::PermissionDenied`])
//! are raised while opening. Runtime errors abort the copy loop; whatever was
//! flushed to the destination before that stays valid as a resume point.
use crate::job::DeviceType;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no device specified or found")]
    NoSource,

    #[error("cannot use a default drive size {}", unresolved_reason(.device_type))]
    SizeUnresolved { device_type: Option<DeviceType> },

    #[error("output file already exists: {}", .path.display())]
    AlreadyExists { path: PathBuf },

    #[error("permission denied: {}", .path.display())]
    PermissionDenied { path: PathBuf },

    #[error("resource busy, the device is in use: {}", .path.display())]
    DeviceBusy { path: PathBuf },

    #[error("problem writing all of the data, wrote {written} of {requested} bytes")]
    ShortWrite { written: usize, requested: usize },

    #[error("dump interrupted at offset {offset}")]
    Interrupted { offset: u64 },

    #[error("problem accessing {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn unresolved_reason(device_type: &Option<DeviceType>) -> String {
    match device_type {
        None => "as device type is unspecified".to_string(),
        Some(t) => format!("for device type {t}"),
    }
}

impl Error {
    /// Classifies an OS-level failure on `path` into the dump taxonomy.
    pub fn from_io(path: impl AsRef<Path>, err: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        match err.kind() {
            io::ErrorKind::AlreadyExists => Error::AlreadyExists { path },
            io::ErrorKind::PermissionDenied => Error::PermissionDenied { path },
            _ if is_busy(&err) => Error::DeviceBusy { path },
            _ => Error::Io { path, source: err },
        }
    }

    /// The remediation an operator should try, if there is one.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::NoSource => {
                Some("connect exactly one device, or name it explicitly with --source")
            }
            Error::SizeUnresolved { .. } => Some("specify the device type with --type ax3 or --type ax6"),
            Error::AlreadyExists { .. } => {
                Some("remove or rename it, or use the --overwrite or --resume options")
            }
            Error::PermissionDenied { .. } => Some(elevate_hint()),
            Error::DeviceBusy { .. } => Some("check that the device is not mounted"),
            Error::ShortWrite { .. } => {
                Some("check free space on the destination, then re-run with --resume")
            }
            Error::Interrupted { .. } => Some("re-run with --resume to continue the dump"),
            Error::Io { .. } => None,
        }
    }
}

#[cfg(windows)]
fn elevate_hint() -> &'static str {
    "run this from an elevated prompt: Ctrl+Shift+Esc, Alt+F, N, cmd, 'Create this task with administrative privileges.'"
}

#[cfg(not(windows))]
fn elevate_hint() -> &'static str {
    "run this as root, try running prefixed with: sudo"
}

fn is_busy(err: &io::Error) -> bool {
    #[cfg(unix)]
    let busy_code = Some(libc::EBUSY);
    #[cfg(windows)]
    let busy_code = Some(windows_sys::Win32::Foundation::ERROR_SHARING_VIOLATION as i32);
    #[cfg(not(any(unix, windows)))]
    let busy_code: Option<i32> = None;

    err.kind() == io::ErrorKind::ResourceBusy
        || (busy_code.is_some() && err.raw_os_error() == busy_code)
}
