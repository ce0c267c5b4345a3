//! Live progress of a dump: absolute offset, session throughput and ETA.
//!
//! The offset includes bytes carried over from an earlier session, but the
//! rate only counts bytes written in this one.
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct DumpProgress {
    started: Instant,
    start_offset: u64,
    offset: u64,
    written: u64,
    total: u64,
    last_block: u64,
    blocks: u64,
}

impl DumpProgress {
    pub fn new(start_offset: u64, total: u64) -> Self {
        Self {
            started: Instant::now(),
            start_offset,
            offset: start_offset,
            written: 0,
            total,
            last_block: 0,
            blocks: 0,
        }
    }

    pub(crate) fn record(&mut self, block: u64) {
        self.offset += block;
        self.written += block;
        self.last_block = block;
        self.blocks += 1;
    }

    /// Absolute position in the source, resumed bytes included.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn start_offset(&self) -> u64 {
        self.start_offset
    }

    /// Bytes written during this session only.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn last_block(&self) -> u64 {
        self.last_block
    }

    pub fn blocks(&self) -> u64 {
        self.blocks
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Session throughput in bytes per second.
    pub fn rate(&self) -> f64 {
        throughput(self.written, self.elapsed())
    }

    pub fn remaining(&self) -> Duration {
        remaining(self.total, self.offset, self.rate())
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * self.offset as f64 / self.total as f64
        }
    }

    pub fn is_complete(&self) -> bool {
        self.offset >= self.total
    }
}

impl fmt::Display for DumpProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = self.elapsed();
        let rate = throughput(self.written, elapsed);
        write!(
            f,
            "Dumping {} ={} @{} /{} ({:.1}%) in {}, {:.3} kB/s, ETA {}.",
            self.last_block,
            self.written,
            self.offset,
            self.total,
            self.percent(),
            format_duration(elapsed),
            rate / 1024.0,
            format_duration(remaining(self.total, self.offset, rate)),
        )
    }
}

pub fn throughput(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { bytes as f64 / secs } else { 0.0 }
}

/// Time left at `rate` bytes per second; zero when nothing is left or no rate is known.
pub fn remaining(total: u64, offset: u64, rate: f64) -> Duration {
    if rate <= 0.0 || offset >= total {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64((total - offset) as f64 / rate).unwrap_or(Duration::MAX)
}

/// `H:MM:SS`, whole seconds.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_is_zero_before_time_passes() {
        assert_eq!(throughput(1024, Duration::ZERO), 0.0);
        assert_eq!(throughput(2048, Duration::from_secs(2)), 1024.0);
    }

    #[test]
    fn remaining_is_guarded() {
        assert_eq!(remaining(1000, 0, 0.0), Duration::ZERO);
        assert_eq!(remaining(1000, 1000, 10.0), Duration::ZERO);
        assert_eq!(remaining(1000, 2000, 10.0), Duration::ZERO);
        assert_eq!(remaining(1000, 500, 100.0), Duration::from_secs(5));
    }

    #[test]
    fn resumed_bytes_are_offset_but_not_rate() {
        let mut progress = DumpProgress::new(393_216, 1_048_576);
        progress.record(131_072);
        assert_eq!(progress.offset(), 524_288);
        assert_eq!(progress.bytes_written(), 131_072);
        assert_eq!(progress.start_offset(), 393_216);
        assert_eq!(progress.blocks(), 1);
        assert!((progress.percent() - 50.0).abs() < f64::EPSILON);
        assert!(!progress.is_complete());
    }

    #[test]
    fn durations_print_like_a_clock() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0:00:00");
        assert_eq!(format_duration(Duration::from_secs(75)), "0:01:15");
        assert_eq!(format_duration(Duration::from_secs(3 * 3600 + 7)), "3:00:07");
    }
}
