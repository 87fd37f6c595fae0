//! convert.rs
//!
//! The MIDI -> key CSV pipeline: parse, extract, time, map, write.

use std::{fs, io::BufWriter, path::Path};

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::csv_out::{self, OutputRow};
use crate::keymap::{map_note, note_name};
use crate::midi::{self, NoteEvent};
use crate::tempo::{DEFAULT_US_PER_BEAT, TempoMap};

/// Knobs that have no CLI flag.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Tempo assumed from tick 0 until the file says otherwise
    pub default_us_per_beat: u32,
    /// Ticks per beat for SMPTE-timed files
    pub fallback_ticks_per_beat: u16,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            default_us_per_beat: DEFAULT_US_PER_BEAT,
            fallback_ticks_per_beat: 480,
        }
    }
}

/// Everything needed to write the CSV.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub ticks_per_beat: u16,
    pub tempo: TempoMap,
    pub rows: Vec<OutputRow>,
    /// Note-ons with no key on the virtual piano
    pub dropped: usize,
}

/// Time every note against the tempo map and map it to a key.
///
/// `notes` must be sorted by tick.
pub fn schedule(notes: &[NoteEvent], tempo: TempoMap, ticks_per_beat: u16) -> Schedule {
    let mut rows = Vec::with_capacity(notes.len());
    let mut dropped = 0;

    let mut cursor = tempo.cursor(ticks_per_beat);
    for n in notes {
        // Advance for every note, mapped or not, so the cursor stays in order
        let time_ms = cursor.millis_at(n.tick);
        let Some(press) = map_note(n.note) else {
            dropped += 1;
            continue;
        };
        debug!(
            "tick {} {} ({}) vel {} @ {} µs/beat -> {} ms key={} shift={}",
            n.tick,
            note_name(n.note),
            n.note,
            n.velocity,
            cursor.us_per_beat(),
            time_ms,
            press.label(),
            press.shift as u8
        );
        rows.push(OutputRow { time_ms, key: press.label(), shift: press.shift as u8 });
    }

    Schedule { ticks_per_beat, tempo, rows, dropped }
}

/// Convert SMF bytes into a schedule.
pub fn convert_bytes(bytes: &[u8], opts: &ConvertOptions) -> Result<Schedule> {
    let smf = midi::parse(bytes)?;
    let ppq = midi::ticks_per_beat(&smf, opts.fallback_ticks_per_beat)?;
    let ex = midi::extract_smf(&smf)?;
    info!(
        "{} track(s), {} ticks per beat, {} tempo change(s), {} note-on(s)",
        smf.tracks.len(),
        ppq,
        ex.tempos.len(),
        ex.notes.len()
    );

    let tempo = TempoMap::new(opts.default_us_per_beat, ex.tempos);
    if tempo.has_declared_tick0() {
        warn!(
            "file sets tempo at tick 0 ({} bpm); initial_tempo still reports the {} bpm default",
            tempo.changes()[1].bpm(),
            tempo.initial().bpm()
        );
    }

    let sched = schedule(&ex.notes, tempo, ppq);
    if sched.dropped > 0 {
        warn!("{} note(s) outside MIDI 21..=108 skipped", sched.dropped);
    }
    Ok(sched)
}

/// Convert a MIDI file on disk into a key CSV on disk.
pub fn convert_file(input: &Path, output: &Path, opts: &ConvertOptions) -> Result<Schedule> {
    let bytes = fs::read(input).with_context(|| format!("reading {:?}", input))?;
    let sched = convert_bytes(&bytes, opts).with_context(|| format!("converting {:?}", input))?;

    let f = fs::File::create(output).with_context(|| format!("creating {:?}", output))?;
    csv_out::write(BufWriter::new(f), &sched.tempo, &sched.rows)
        .with_context(|| format!("writing {:?}", output))?;
    Ok(sched)
}
