//! Trace sinks — firing logs for offline analysis.
//!
//! Tracers are probes: attach one to the events of interest with
//! `sim.add_trace(ev, &tracer)` and every firing produces one record.
//!
//! `Probe::probe` is infallible from the engine's perspective, so write
//! errors are stored internally and retrieved with `take_error`; `finish`
//! flushes and is idempotent.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use csv::Writer;
use des_engine::{FiredEvent, Probe};

use crate::error::{StatsError, StatsResult};

// ── TextTracer ────────────────────────────────────────────────────────────────

/// Plain-text firing log: one `[<time>] <label> fired` line per firing.
pub struct TextTracer<W: Write> {
    out: W,
    finished: bool,
    error: Option<StatsError>,
}

impl TextTracer<BufWriter<File>> {
    /// Open (or create) a text trace file.
    pub fn to_file<P: AsRef<Path>>(path: P) -> StatsResult<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> TextTracer<W> {
    pub fn new(out: W) -> Self {
        TextTracer {
            out,
            finished: false,
            error: None,
        }
    }

    /// First write error since the last call, if any.
    pub fn take_error(&mut self) -> Option<StatsError> {
        self.error.take()
    }

    /// Flush the sink.  Idempotent.
    pub fn finish(&mut self) -> StatsResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.out.flush()?;
        Ok(())
    }

    /// Recover the underlying writer (flushing first).
    pub fn into_inner(mut self) -> StatsResult<W> {
        self.finish()?;
        Ok(self.out)
    }
}

impl<W: Write> Probe for TextTracer<W> {
    fn probe(&mut self, ev: &FiredEvent<'_>) {
        let label = if ev.label.is_empty() { "event" } else { ev.label };
        let result = writeln!(self.out, "[{}] {} fired", ev.last_time, label);
        if let Err(e) = result {
            self.error.get_or_insert(StatsError::Io(e));
        }
    }
}

// ── CsvTracer ─────────────────────────────────────────────────────────────────

/// CSV firing log with a `time,event,priority` header row.
pub struct CsvTracer<W: Write> {
    writer: Writer<W>,
    finished: bool,
    error: Option<StatsError>,
}

impl CsvTracer<File> {
    /// Open (or create) a CSV trace file and write the header row.
    pub fn to_file<P: AsRef<Path>>(path: P) -> StatsResult<Self> {
        Self::from_writer(File::create(path)?)
    }
}

impl<W: Write> CsvTracer<W> {
    pub fn from_writer(out: W) -> StatsResult<Self> {
        let mut writer = Writer::from_writer(out);
        writer.write_record(["time", "event", "priority"])?;
        Ok(CsvTracer {
            writer,
            finished: false,
            error: None,
        })
    }

    pub fn take_error(&mut self) -> Option<StatsError> {
        self.error.take()
    }

    /// Flush the sink.  Idempotent.
    pub fn finish(&mut self) -> StatsResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.writer.flush()?;
        Ok(())
    }

    /// Recover the underlying writer (flushing first).
    pub fn into_inner(mut self) -> StatsResult<W> {
        self.finish()?;
        self.writer.into_inner().map_err(|e| {
            StatsError::Io(io::Error::new(io::ErrorKind::Other, e.to_string()))
        })
    }
}

impl<W: Write> Probe for CsvTracer<W> {
    fn probe(&mut self, ev: &FiredEvent<'_>) {
        let result = self.writer.write_record(&[
            ev.last_time.to_string(),
            ev.label.to_owned(),
            ev.priority.to_string(),
        ]);
        if let Err(e) = result {
            self.error.get_or_insert(StatsError::Csv(e));
        }
    }
}
