//! The core, UI-agnostic library for the `cwadump` raw drive dump utility.
//!
//! `cwadump-core` finds the sensor's mass-storage drive, works out how many
//! bytes to copy, and dumps the raw device to an image file that can be resumed
//! after any interruption.
//!
//! The library is structured into several key modules:
//! - [`platform`]: The [`platform::Platform`] capability trait and its per-OS
//!   implementations (size probe, drive enumeration, unmount, elevation).
//! - [`locate`]: Picks exactly one candidate drive, or none.
//! - [`size`]: Measured size, or a per-type default.
//! - [`unmount`]: Advisory unmount before reading.
//! - [`mod@dump`]: The resumable copy loop.
//! - [`session`]: Ties the above together in order.
//!
//! Progress is reported through callbacks, so the caller can display it in any
//! way it chooses.
//!
//! ## Example: Dumping the Attached Sensor
//!
//! ```rust,no_run
//! use cwadump_core::{platform, session::{self, DumpRequest}};
//! use cwadump_core::job::{DeviceType, OpenMode};
//! use std::sync::{Arc, atomic::AtomicBool};
//!
//! fn main() -> anyhow::Result<()> {
//!     let platform = platform::native();
//!     let request = DumpRequest {
//!         mode: OpenMode::Resume,
//!         device_type: Some(DeviceType::Ax3),
//!         ..Default::default()
//!     };
//!
//!     let running = Arc::new(AtomicBool::new(true));
//!     let summary = session::run(
//!         platform.as_ref(),
//!         &request,
//!         running,
//!         |_| {},
//!         |p| println!("{p}"),
//!     )?;
//!
//!     println!("{} bytes in {} blocks", summary.bytes_written, summary.blocks);
//!     Ok(())
//! }
//! ```

pub mod device;
pub mod dump;
pub mod error;
pub mod job;
pub mod locate;
mod os_options;
pub mod platform;
pub mod progress;
pub mod session;
pub mod size;
pub mod unmount;

pub use error::{Error, Result};
