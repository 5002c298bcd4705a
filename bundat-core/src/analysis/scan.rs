//! Offset-major column scan with cooperative checkpoints.

use crate::analysis::stats::{ColumnStats, observe};
use crate::dat::file::DatFile;
use crate::dat::width::{P32, P64, SizeT, Width};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Rows scanned between two clock reads.
const CLOCK_EVERY: usize = 256;

#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Wall-clock time to run between two yields.
    pub yield_interval: Duration,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self { yield_interval: Duration::from_millis(10) }
    }
}

#[derive(Debug)]
pub enum Step {
    /// Budget spent; call `resume` again.
    Pending,
    Done(Vec<ColumnStats>),
}

/// Resumable scan state. The cursor is `(offset, row)`.
pub struct Analyzer<'a> {
    dat: DatFile<'a>,
    rows: usize,
    offset: usize,
    row: usize,
    stats: Vec<ColumnStats>,
}

impl<'a> Analyzer<'a> {
    pub fn new(dat: DatFile<'a>) -> Self {
        Self::with_rows(dat, dat.row_count)
    }

    /// Scans only the first `rows` rows; key bounds still use the full row count.
    pub fn with_rows(dat: DatFile<'a>, rows: usize) -> Self {
        let w = dat.width.bytes();
        let stats = (0..dat.row_length)
            .map(|bi| ColumnStats::initial(dat.row_length - bi, w))
            .collect();
        Self { dat, rows: rows.min(dat.row_count), offset: 0, row: 0, stats }
    }

    /// Byte offsets fully scanned so far, out of `row_length`.
    pub fn progress(&self) -> (usize, usize) {
        (self.offset, self.dat.row_length)
    }

    pub fn resume(&mut self, budget: Duration) -> Step {
        let done = match self.dat.width {
            Width::Four => self.run::<P32>(budget),
            Width::Eight => self.run::<P64>(budget),
        };
        if done {
            debug!(columns = self.stats.len(), rows = self.rows, "analysis finished");
            Step::Done(std::mem::take(&mut self.stats))
        } else {
            trace!(offset = self.offset, row = self.row, "analysis checkpoint");
            Step::Pending
        }
    }

    fn run<S: SizeT>(&mut self, budget: Duration) -> bool {
        let started = Instant::now();
        let dat = self.dat;
        let w = S::SIZE;
        while self.offset < self.stats.len() {
            let bi = self.offset;
            let space = dat.row_length - bi;
            let stat = &mut self.stats[bi];
            while self.row < self.rows {
                if stat.is_settled(space, w) {
                    self.row = self.rows;
                    break;
                }
                observe::<S>(stat, &dat, self.row, bi);
                self.row += 1;
                if self.row % CLOCK_EVERY == 0 && started.elapsed() >= budget {
                    return false;
                }
            }
            self.offset += 1;
            self.row = 0;
            if started.elapsed() >= budget && self.offset < self.stats.len() {
                return false;
            }
        }
        true
    }
}

pub fn analyze(dat: &DatFile<'_>) -> Vec<ColumnStats> {
    run_to_end(Analyzer::new(*dat))
}

/// Stats over the first `rows` rows only.
pub fn analyze_rows(dat: &DatFile<'_>, rows: usize) -> Vec<ColumnStats> {
    run_to_end(Analyzer::with_rows(*dat, rows))
}

/// Runs the scan, calling `on_yield` each time `yield_interval` elapses.
pub fn analyze_yielding(
    dat: &DatFile<'_>,
    opts: &AnalyzeOptions,
    mut on_yield: impl FnMut(),
) -> Vec<ColumnStats> {
    let mut analyzer = Analyzer::new(*dat);
    loop {
        match analyzer.resume(opts.yield_interval) {
            Step::Pending => on_yield(),
            Step::Done(stats) => return stats,
        }
    }
}

fn run_to_end(mut analyzer: Analyzer<'_>) -> Vec<ColumnStats> {
    loop {
        if let Step::Done(stats) = analyzer.resume(Duration::MAX) {
            return stats;
        }
    }
}
