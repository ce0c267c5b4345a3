//! Contains the logic for dumping a raw device to an image file.
//!
//! The copy is resumable: the destination's length is the only checkpoint.
//! Every block is flushed to durable storage before the next read, so after
//! any interruption the image holds exactly the bytes that made it to disk,
//! and a later [`OpenMode::Resume`] run continues from there.
use crate::error::{Error, Result};
use crate::job::{DumpJob, OpenMode};
use crate::os_options::{destination_options, source_options};
use crate::progress::DumpProgress;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Bytes requested from the source per read.
pub const BLOCK_SIZE: usize = 128 * 1024;

/// Emit a debug progress line every this many blocks (8 MiB).
const LOG_EVERY_BLOCKS: u64 = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The source returned no more data.
    SourceExhausted,
    /// The offset reached the expected total before the source ran out.
    SizeBound,
}

#[derive(Clone, Debug)]
pub struct DumpSummary {
    pub start_offset: u64,
    pub final_offset: u64,
    pub bytes_written: u64,
    pub blocks: u64,
    pub elapsed: Duration,
    pub stop: StopReason,
}

/// A destination that can be made durable after each block.
pub trait Sink: Write {
    fn sync_block(&mut self) -> io::Result<()>;
}

impl Sink for File {
    fn sync_block(&mut self) -> io::Result<()> {
        self.flush()?;
        self.sync_data()
    }
}

/// Dumps `job.source` into `job.destination`.
///
/// # Arguments
///
/// * `job` - The resolved job. `expected_total_bytes` must be set.
/// * `running` - Cleared by the caller (e.g. a Ctrl+C handler) to stop the dump
///   after the current block has been flushed.
/// * `on_start` - Called once after both files are open, with the resume offset
///   already applied.
/// * `on_progress` - Called after every flushed block.
///
/// # Errors
///
/// Any failure ends the run; nothing is retried. Opening the destination under
/// [`OpenMode::CreateExclusive`] fails with [`Error::AlreadyExists`] and leaves
/// the existing file untouched.
pub fn run<F>(
    job: &DumpJob,
    running: Arc<AtomicBool>,
    on_start: impl FnOnce(&DumpProgress),
    on_progress: F,
) -> Result<DumpSummary>
where
    F: FnMut(&DumpProgress),
{
    let total = job.expected_total_bytes.ok_or(Error::SizeUnresolved {
        device_type: job.device_type,
    })?;

    let mut source = source_options(&job.source)
        .open(&job.source)
        .map_err(|e| Error::from_io(&job.source, e))?;
    let mut image = destination_options(job.mode)
        .open(&job.destination)
        .map_err(|e| Error::from_io(&job.destination, e))?;

    let start_offset = match job.mode {
        OpenMode::Resume => image
            .metadata()
            .map_err(|e| Error::from_io(&job.destination, e))?
            .len(),
        OpenMode::CreateExclusive | OpenMode::Overwrite => 0,
    };
    if start_offset > 0 {
        info!(offset = start_offset, "Resuming dump");
        source
            .seek(SeekFrom::Start(start_offset))
            .map_err(|e| Error::from_io(&job.source, e))?;
    }

    let mut progress = DumpProgress::new(start_offset, total);
    on_start(&progress);

    let stop = copy(
        job,
        &mut source,
        &mut image,
        &mut progress,
        &running,
        BLOCK_SIZE,
        on_progress,
    )?;

    Ok(DumpSummary {
        start_offset,
        final_offset: progress.offset(),
        bytes_written: progress.bytes_written(),
        blocks: progress.blocks(),
        elapsed: progress.elapsed(),
        stop,
    })
}

/// The copy loop. `source` must already be positioned at `progress.offset()`.
pub(crate) fn copy<R, W, F>(
    job: &DumpJob,
    source: &mut R,
    sink: &mut W,
    progress: &mut DumpProgress,
    running: &AtomicBool,
    block_size: usize,
    mut on_progress: F,
) -> Result<StopReason>
where
    R: Read,
    W: Sink,
    F: FnMut(&DumpProgress),
{
    let mut buffer = vec![0u8; block_size];

    loop {
        if progress.is_complete() {
            return Ok(StopReason::SizeBound);
        }
        if !running.load(Ordering::SeqCst) {
            return Err(Error::Interrupted {
                offset: progress.offset(),
            });
        }

        let size = fill_block(source, &mut buffer).map_err(|e| Error::from_io(&job.source, e))?;
        if size == 0 {
            return Ok(StopReason::SourceExhausted);
        }

        let written = write_block(sink, &buffer[..size])
            .and_then(|written| sink.sync_block().map(|()| written))
            .map_err(|e| Error::from_io(&job.destination, e))?;
        if written != size {
            return Err(Error::ShortWrite {
                written,
                requested: size,
            });
        }

        progress.record(size as u64);
        if progress.blocks() % LOG_EVERY_BLOCKS == 0 {
            debug!("{progress}");
        }
        on_progress(&*progress);
    }
}

/// Reads until `buffer` is full or the source is exhausted.
fn fill_block<R: Read>(source: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match source.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Writes as much of `block` as the sink accepts and reports how much that was.
fn write_block<W: Write>(sink: &mut W, block: &[u8]) -> io::Result<usize> {
    let mut written = 0;
    while written < block.len() {
        match sink.write(&block[written..]) {
            Ok(0) => break,
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Sink that keeps everything in memory and counts syncs.
    #[derive(Default)]
    struct MemorySink {
        data: Vec<u8>,
        syncs: usize,
        capacity: Option<usize>,
    }

    impl Write for MemorySink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let room = self.capacity.map_or(buf.len(), |c| c - self.data.len());
            let n = room.min(buf.len());
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Sink for MemorySink {
        fn sync_block(&mut self) -> io::Result<()> {
            self.syncs += 1;
            Ok(())
        }
    }

    /// Source whose reads halve in length until they reach zero.
    struct ShrinkingSource {
        next: usize,
    }

    impl Read for ShrinkingSource {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.next.min(buf.len());
            buf[..n].fill(0xAB);
            self.next /= 2;
            Ok(n)
        }
    }

    fn job() -> DumpJob {
        DumpJob::new("/dev/sensor", "image.img", OpenMode::CreateExclusive)
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn copies_whole_blocks_and_syncs_each() {
        let data = pattern(1_048_576);
        let mut sink = MemorySink::default();
        let mut progress = DumpProgress::new(0, data.len() as u64);
        let running = AtomicBool::new(true);

        let stop = copy(
            &job(),
            &mut Cursor::new(&data),
            &mut sink,
            &mut progress,
            &running,
            BLOCK_SIZE,
            |_| {},
        )
        .unwrap();

        assert_eq!(stop, StopReason::SizeBound);
        assert_eq!(sink.data, data);
        assert_eq!(sink.syncs, 8);
        assert_eq!(progress.blocks(), 8);
        assert_eq!(progress.offset(), 1_048_576);
    }

    #[test]
    fn shrinking_reads_terminate_below_the_estimate() {
        let mut source = ShrinkingSource { next: 4096 };
        let mut sink = MemorySink::default();
        let mut progress = DumpProgress::new(0, 1 << 30);
        let running = AtomicBool::new(true);

        let stop = copy(&job(), &mut source, &mut sink, &mut progress, &running, 8192, |_| {})
            .unwrap();

        assert_eq!(stop, StopReason::SourceExhausted);
        assert_eq!(sink.data.len(), 8191);
        assert_eq!(progress.blocks(), 1);
        assert!(progress.offset() < progress.total());
    }

    #[test]
    fn source_longer_than_estimate_stops_at_bound() {
        let data = pattern(4 * 1024);
        let mut sink = MemorySink::default();
        let mut progress = DumpProgress::new(0, 2 * 1024);
        let running = AtomicBool::new(true);

        let stop = copy(
            &job(),
            &mut Cursor::new(&data),
            &mut sink,
            &mut progress,
            &running,
            1024,
            |_| {},
        )
        .unwrap();

        assert_eq!(stop, StopReason::SizeBound);
        assert_eq!(sink.data, data[..2048]);
    }

    #[test]
    fn reached_bound_reads_nothing_more() {
        let data = pattern(4 * 1024);
        let mut source = Cursor::new(&data);
        let mut sink = MemorySink::default();
        let mut progress = DumpProgress::new(2 * 1024, 2 * 1024);
        let running = AtomicBool::new(true);

        let stop = copy(&job(), &mut source, &mut sink, &mut progress, &running, 1024, |_| {})
            .unwrap();

        assert_eq!(stop, StopReason::SizeBound);
        assert!(sink.data.is_empty());
        assert_eq!(sink.syncs, 0);
        assert_eq!(source.position(), 0);
        assert_eq!(progress.blocks(), 0);
    }

    #[test]
    fn short_write_aborts() {
        let data = pattern(3000);
        let mut sink = MemorySink {
            capacity: Some(1500),
            ..Default::default()
        };
        let mut progress = DumpProgress::new(0, 3000);
        let running = AtomicBool::new(true);

        let err = copy(
            &job(),
            &mut Cursor::new(&data),
            &mut sink,
            &mut progress,
            &running,
            1000,
            |_| {},
        )
        .unwrap_err();

        assert!(matches!(
            err,
            Error::ShortWrite {
                written: 500,
                requested: 1000
            }
        ));
        assert_eq!(progress.offset(), 1000);
    }

    #[test]
    fn cleared_flag_interrupts_between_blocks() {
        let data = pattern(8 * 1024);
        let mut sink = MemorySink::default();
        let mut progress = DumpProgress::new(0, data.len() as u64);
        let running = AtomicBool::new(true);

        let err = copy(
            &job(),
            &mut Cursor::new(&data),
            &mut sink,
            &mut progress,
            &running,
            1024,
            |p| {
                if p.blocks() == 3 {
                    running.store(false, Ordering::SeqCst);
                }
            },
        )
        .unwrap_err();

        assert!(matches!(err, Error::Interrupted { offset: 3072 }));
        assert_eq!(sink.data, data[..3072]);
        assert_eq!(sink.syncs, 3);
    }
}
