use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use cwadump_core::job::{DeviceType, OpenMode};
use cwadump_core::session::{DEFAULT_DESTINATION, DumpRequest};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cwadump")]
#[command(about = "Dump an AX3/AX6 sensor drive to a raw image file, resumably", version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub dump: DumpArgs,

    /// Don't wait for Enter before exiting
    #[arg(long, global = true)]
    pub no_pause: bool,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List attached sensor drives
    List,
}

#[derive(Args)]
pub struct DumpArgs {
    /// `DEST`, or `SOURCE DEST`
    #[arg(value_name = "PATHS", num_args = 0..=2)]
    pub paths: Vec<PathBuf>,

    /// Source device (auto-detected when omitted)
    #[arg(long, value_name = "DEVICE")]
    pub source: Option<PathBuf>,

    /// Output image file [default: cwa-dump.img]
    #[arg(long, value_name = "FILE")]
    pub dest: Option<PathBuf>,

    #[command(flatten)]
    pub mode: ModeArgs,

    /// Device type, used for the default size when the drive can't be measured
    #[arg(long = "type", value_name = "ax3|ax6")]
    pub device_type: Option<DeviceType>,

    /// Don't try to re-launch with elevated permissions
    #[arg(long)]
    pub no_elevate: bool,
}

#[derive(Args)]
#[group(multiple = false)]
pub struct ModeArgs {
    /// Fail if the output file exists (default)
    #[arg(long)]
    pub no_overwrite: bool,

    /// Replace an existing output file
    #[arg(long)]
    pub overwrite: bool,

    /// Continue an interrupted dump from the end of the output file
    #[arg(long)]
    pub resume: bool,
}

impl ModeArgs {
    pub fn open_mode(&self) -> OpenMode {
        if self.overwrite {
            OpenMode::Overwrite
        } else if self.resume {
            OpenMode::Resume
        } else {
            OpenMode::CreateExclusive
        }
    }
}

impl DumpArgs {
    /// One positional path is the destination; two are source then destination.
    /// `--source` and `--dest` take precedence over positionals.
    pub fn request(&self) -> Result<DumpRequest> {
        let (source, dest) = match self.paths.as_slice() {
            [] => (None, None),
            [dest] => (None, Some(dest.clone())),
            [source, dest] => (Some(source.clone()), Some(dest.clone())),
            [_, _, extra, ..] => bail!("Unrecognized positional argument: {}", extra.display()),
        };

        Ok(DumpRequest {
            source: self.source.clone().or(source),
            destination: self
                .dest
                .clone()
                .or(dest)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DESTINATION)),
            mode: self.mode.open_mode(),
            device_type: self.device_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("cwadump").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_to_exclusive_dump_into_default_file() {
        let request = parse(&[]).dump.request().unwrap();
        assert_eq!(request.source, None);
        assert_eq!(request.destination, PathBuf::from("cwa-dump.img"));
        assert_eq!(request.mode, OpenMode::CreateExclusive);
        assert_eq!(request.device_type, None);
    }

    #[test]
    fn positionals_are_dest_or_source_then_dest() {
        let request = parse(&["out.img"]).dump.request().unwrap();
        assert_eq!(request.destination, PathBuf::from("out.img"));
        assert_eq!(request.source, None);

        let request = parse(&["/dev/sdb", "out.img"]).dump.request().unwrap();
        assert_eq!(request.source, Some(PathBuf::from("/dev/sdb")));
        assert_eq!(request.destination, PathBuf::from("out.img"));
    }

    #[test]
    fn flags_select_mode_and_type() {
        let cli = parse(&["--resume", "--type", "ax6", "--source", "/dev/sdc"]);
        let request = cli.dump.request().unwrap();
        assert_eq!(request.mode, OpenMode::Resume);
        assert_eq!(request.device_type, Some(DeviceType::Ax6));
        assert_eq!(request.source, Some(PathBuf::from("/dev/sdc")));
    }

    #[test]
    fn modes_are_mutually_exclusive() {
        let result = Cli::try_parse_from(["cwadump", "--overwrite", "--resume"]);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(Cli::try_parse_from(["cwadump", "--type", "ax9"]).is_err());
    }

    #[test]
    fn list_subcommand_parses() {
        let cli = parse(&["list", "--no-pause"]);
        assert!(matches!(cli.command, Some(Commands::List)));
        assert!(cli.no_pause);
    }
}
