mod cli;
mod logging;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, DumpArgs};
use console::style;
use cwadump_core::locate;
use cwadump_core::platform::{self, Discovery, Elevation, Platform, Relaunch};
use cwadump_core::progress::{DumpProgress, format_duration};
use cwadump_core::session::{self, DumpRequest};
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use std::io::{IsTerminal, stdin};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

#[cfg(unix)]
use libc::ECHOCTL;
#[cfg(unix)]
use std::io::stdout;
#[cfg(unix)]
use std::os::unix::io::AsRawFd;
#[cfg(unix)]
use termios::{TCSANOW, Termios, tcsetattr};

/// Turns off `ECHOCTL` on a Unix terminal so Ctrl+C isn't echoed as `^C`
/// over the progress bar. The saved settings are restored on drop.
struct EchoGuard {
    #[cfg(unix)]
    saved: Option<Termios>,
}

impl EchoGuard {
    fn new() -> Self {
        #[cfg(unix)]
        {
            Self {
                saved: disable_echoctl(),
            }
        }
        #[cfg(not(unix))]
        {
            Self {}
        }
    }
}

#[cfg(unix)]
fn disable_echoctl() -> Option<Termios> {
    if !stdout().is_terminal() {
        return None;
    }
    let fd = stdout().as_raw_fd();
    let saved = Termios::from_fd(fd).ok()?;
    let mut quiet = saved;
    quiet.c_lflag &= !ECHOCTL;
    tcsetattr(fd, TCSANOW, &quiet).ok()?;
    Some(saved)
}

impl Drop for EchoGuard {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Some(ref saved) = self.saved {
            tcsetattr(stdout().as_raw_fd(), TCSANOW, saved).ok();
        }
    }
}

enum Finish {
    Done,
    /// An elevated copy took over; exit without pausing.
    Relaunched,
}

fn pause() {
    if !stdin().is_terminal() {
        return;
    }
    let _ = dialoguer::Input::<String>::new()
        .with_prompt("Press Enter to continue...")
        .allow_empty(true)
        .interact_text();
}

fn list(platform: &dyn Platform) -> Result<Finish> {
    match locate::find_candidates(platform) {
        Discovery::Unsupported => {
            println!(
                "Automatically finding the device path is not supported on {}; pass --source.",
                platform.name()
            );
        }
        Discovery::Found(devices) if devices.is_empty() => println!("No matching devices found."),
        Discovery::Found(devices) => {
            println!("Found {} matching devices:", devices.len());
            println!("\n  {:<20} {}", "DEVICE", "IDENTIFIER");
            println!("  {:-<20} {:-<30}", "", "");
            for device in devices {
                println!("  {device}");
            }
        }
    }
    Ok(Finish::Done)
}

/// Asks for elevation when the platform says we lack it and can re-launch us.
fn elevate(platform: &dyn Platform, attempt: bool) -> Result<Option<Finish>> {
    info!("Checking whether likely needs to run with elevated permissions...");
    if platform.elevation() != Elevation::NotElevated {
        return Ok(None);
    }
    info!("...it is likely to need to run with elevated permissions.");
    if !attempt {
        return Ok(None);
    }

    info!("...attempting to elevate...");
    match platform.rerun_elevated()? {
        Relaunch::Spawned => Ok(Some(Finish::Relaunched)),
        Relaunch::Unsupported => {
            warn!(
                "...{}: Not running with elevated permissions and will not attempt to automatically re-run on this platform -- try re-running the command prefixed with: sudo",
                platform.name()
            );
            Ok(None)
        }
    }
}

fn dump(args: &DumpArgs, platform: &dyn Platform, running: Arc<AtomicBool>) -> Result<Finish> {
    let request = args.request()?;
    info!(
        "Using output file in mode={:?}: {}",
        request.mode,
        request.destination.display()
    );

    let source = session::resolve_source(platform, &request)?;
    if let Some(finish) = elevate(platform, !args.no_elevate)? {
        return Ok(finish);
    }
    let request = DumpRequest {
        source: Some(source.clone()),
        ..request
    };

    let bar_style = ProgressStyle::default_bar()
        .template(
            "{prefix:10} [{elapsed_precise}] [{bar:40.green/black}] {bytes}/{total_bytes} ({percent}%) {msg}",
        )?
        .progress_chars("■ ");
    let dump_pb = ProgressBar::new(0);

    let on_start = |p: &DumpProgress| {
        dump_pb.set_style(bar_style.clone());
        dump_pb.set_prefix("Dumping");
        dump_pb.set_length(p.total());
        dump_pb.set_position(p.offset());
    };
    let on_progress = |p: &DumpProgress| {
        dump_pb.set_length(p.total().max(p.offset()));
        dump_pb.set_position(p.offset());
        dump_pb.set_message(format!(
            "{}/s, ETA {}",
            HumanBytes(p.rate() as u64),
            format_duration(p.remaining())
        ));
    };

    let result = session::run(platform, &request, running, on_start, on_progress);
    match result {
        Ok(summary) => {
            dump_pb.finish_with_message("Dump complete.");
            println!(
                "\n✨ Successfully dumped {} ({} this session) to {}.",
                style(source.display()).cyan(),
                HumanBytes(summary.bytes_written),
                style(request.destination.display()).cyan()
            );
            Ok(Finish::Done)
        }
        Err(err) => {
            dump_pb.abandon_with_message("❌ Dump failed.");
            Err(err.into())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    // Dropped when main() returns, restoring the terminal.
    let _echo_guard = EchoGuard::new();

    // Cleared by Ctrl+C; the dump stops once the current block is on disk.
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Could not install the Ctrl+C handler: {err}");
    }

    let platform = platform::native();
    let result = match cli.command {
        Some(Commands::List) => list(platform.as_ref()),
        None => dump(&cli.dump, platform.as_ref(), running),
    };

    let code = match result {
        Ok(Finish::Relaunched) => return ExitCode::SUCCESS,
        Ok(Finish::Done) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            if let Some(hint) = err
                .downcast_ref::<cwadump_core::Error>()
                .and_then(|e| e.hint())
            {
                error!("{hint}");
            }
            ExitCode::FAILURE
        }
    };

    if !cli.no_pause {
        pause();
    }
    code
}
