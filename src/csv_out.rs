//! csv_out.rs
//!
//! Writes the key-press schedule:
//!
//! ```text
//! # initial_tempo=120 bpm
//! # tempo_change_tick=0 bpm=120
//! time_ms,key,shift
//! 500,t,0
//! 750,Ctrl+1,0
//! ```
//!
//! The `#` lines are informational and skipped by the player.

use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::tempo::TempoMap;

const HEADER: [&str; 3] = ["time_ms", "key", "shift"];

/// One key press in the output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutputRow {
    pub time_ms: u64,
    /// Key label, `Ctrl+` prefixed for the extended ranges
    pub key: String,
    /// 1 when Shift is held
    pub shift: u8,
}

/// Write the tempo comments, header and rows to `out`.
pub fn write<W: Write>(mut out: W, tempo: &TempoMap, rows: &[OutputRow]) -> Result<()> {
    writeln!(out, "# initial_tempo={} bpm", tempo.initial().bpm())?;
    for change in tempo.changes() {
        writeln!(out, "# tempo_change_tick={} bpm={}", change.tick, change.bpm())?;
    }

    // Comments end in LF, CSV records in CRLF.
    // Header is written by hand so it is present even with no rows
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::CRLF)
        .from_writer(out);
    wtr.write_record(HEADER)?;
    for row in rows {
        wtr.serialize(row).context("writing CSV row")?;
    }
    wtr.flush()?;
    Ok(())
}

/// Render the whole document into a string.
#[cfg(test)]
pub fn to_string(tempo: &TempoMap, rows: &[OutputRow]) -> Result<String> {
    let mut buf = Vec::new();
    write(&mut buf, tempo, rows)?;
    Ok(String::from_utf8(buf)?)
}
