use super::parse;
use super::{Discovery, Elevation, Platform, Relaunch, SizeProbe, UnmountOutcome};
use anyhow::{Context, Result, anyhow, bail};
use std::ffi::OsStr;
use std::iter;
use std::os::windows::ffi::OsStrExt;
use std::path::Path;
use std::process::Command;
use std::ptr;
use tracing::{debug, info};
use windows_sys::Win32::UI::Shell::{IsUserAnAdmin, ShellExecuteW};
use windows_sys::Win32::UI::WindowsAndMessaging::SW_SHOWNORMAL;

pub struct Windows;

fn wmic_brief() -> Result<String> {
    let output = Command::new("wmic")
        .args(["diskdrive", "list", "brief"])
        .output()
        .context("failed to run wmic")?;
    if !output.status.success() {
        bail!("wmic exited with {}", output.status);
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn wide(s: &OsStr) -> Vec<u16> {
    s.encode_wide().chain(iter::once(0)).collect()
}

impl Platform for Windows {
    fn name(&self) -> &'static str {
        "Windows"
    }

    fn probe_size(&self, device: &Path) -> SizeProbe {
        info!("...Windows: detecting physical drive size...");
        let drive = device.to_string_lossy();
        match wmic_brief() {
            Ok(listing) => match parse::wmic_drive_size(&listing, &drive) {
                Some(size) => SizeProbe::Measured(size),
                None => SizeProbe::Failed(format!("{drive} not listed by wmic")),
            },
            Err(err) => SizeProbe::Failed(format!("{err:#}")),
        }
    }

    fn enumerate_devices(&self) -> Result<Discovery> {
        info!("...Windows: detecting device physical drive...");
        Ok(Discovery::Found(parse::wmic_devices(&wmic_brief()?)))
    }

    fn request_unmount(&self, device: &Path) -> UnmountOutcome {
        debug!(device = %device.display(), "raw physical drive reads do not require unmounting");
        UnmountOutcome::NotSupported
    }

    fn elevation(&self) -> Elevation {
        if unsafe { IsUserAnAdmin() } != 0 {
            Elevation::Elevated
        } else {
            Elevation::NotElevated
        }
    }

    fn rerun_elevated(&self) -> Result<Relaunch> {
        let exe = std::env::current_exe()?;
        let params = std::env::args()
            .skip(1)
            .map(|arg| format!("\"{arg}\""))
            .collect::<Vec<_>>()
            .join(" ");
        info!("...Windows: spawning version with admin rights... {} {}", exe.display(), params);

        let verb = wide(OsStr::new("runas"));
        let file = wide(exe.as_os_str());
        let params = wide(OsStr::new(&params));
        let instance = unsafe {
            ShellExecuteW(
                0,
                verb.as_ptr(),
                file.as_ptr(),
                params.as_ptr(),
                ptr::null(),
                SW_SHOWNORMAL,
            )
        };
        // ShellExecuteW reports success with a value greater than 32.
        if instance <= 32 {
            return Err(anyhow!("ShellExecuteW failed with code {instance}"));
        }
        Ok(Relaunch::Spawned)
    }
}
