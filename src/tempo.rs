//! tempo.rs
//!
//! Tempo map and tick-to-time integration.
//!
//! A MIDI file measures time in ticks; how long a tick lasts depends on the
//! ticks-per-beat value from the header and on the tempo (microseconds per
//! quarter note) in force at that point. Tempo can change any number of times,
//! so the elapsed time at a tick is the sum over every tempo segment before it.
//!
//! `TempoCursor` walks the map forward once, carrying the running total, so a
//! whole sorted note list is timed in a single pass.

/// 500,000 µs per quarter note = 120 BPM
pub const DEFAULT_US_PER_BEAT: u32 = 500_000;

/// A tempo change at an absolute tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TempoChange {
    pub tick: u64,
    pub us_per_beat: u32,
}

impl TempoChange {
    pub fn bpm(&self) -> u32 {
        bpm(self.us_per_beat)
    }
}

/// Beats per minute for a tempo, rounded half to even. `us_per_beat` must be > 0.
pub fn bpm(us_per_beat: u32) -> u32 {
    (60_000_000.0 / us_per_beat as f64).round_ties_even() as u32
}

/// Tempo changes sorted by tick. Always starts with the implicit default at tick 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TempoMap {
    changes: Vec<TempoChange>,
}

impl TempoMap {
    /// Build a map from file-declared changes in any order.
    ///
    /// The default is placed first and the sort is stable, so a change the file
    /// declares at tick 0 comes after the default and wins from tick 0 on.
    pub fn new(default_us_per_beat: u32, declared: impl IntoIterator<Item = TempoChange>) -> Self {
        let mut changes = vec![TempoChange { tick: 0, us_per_beat: default_us_per_beat }];
        changes.extend(declared);
        changes.sort_by_key(|c| c.tick);
        Self { changes }
    }

    pub fn changes(&self) -> &[TempoChange] {
        &self.changes
    }

    /// The first entry. This is the synthetic default, even if the file sets a tempo at tick 0.
    pub fn initial(&self) -> TempoChange {
        self.changes[0]
    }

    /// True when the file itself declared a tempo at tick 0.
    pub fn has_declared_tick0(&self) -> bool {
        self.changes.len() > 1 && self.changes[1].tick == 0
    }

    pub fn cursor(&self, ticks_per_beat: u16) -> TempoCursor<'_> {
        TempoCursor {
            map: &self.changes,
            ticks_per_beat,
            idx: 0,
            last_tick: 0,
            us_per_beat: self.changes[0].us_per_beat,
            seconds: 0.0,
        }
    }
}

/// Forward-only position in a tempo map.
///
/// Feed it non-decreasing ticks; each call only advances over the tempo
/// changes between the previous tick and the new one.
#[derive(Clone, Debug)]
pub struct TempoCursor<'a> {
    map: &'a [TempoChange],
    ticks_per_beat: u16,
    idx: usize,
    last_tick: u64,
    us_per_beat: u32,
    seconds: f64,
}

impl TempoCursor<'_> {
    /// Seconds elapsed from tick 0 to `tick`.
    ///
    /// `tick` must not be less than the tick passed on the previous call.
    pub fn seconds_at(&mut self, tick: u64) -> f64 {
        debug_assert!(tick >= self.last_tick, "tempo cursor moved backwards");

        while let Some(next) = self.map.get(self.idx + 1) {
            if next.tick > tick {
                break;
            }
            self.advance_to(next.tick);
            self.us_per_beat = next.us_per_beat;
            self.idx += 1;
        }
        self.advance_to(tick);
        self.seconds
    }

    /// Milliseconds elapsed from tick 0 to `tick`, rounded half to even.
    pub fn millis_at(&mut self, tick: u64) -> u64 {
        (self.seconds_at(tick) * 1000.0).round_ties_even() as u64
    }

    /// Tempo currently in force.
    pub fn us_per_beat(&self) -> u32 {
        self.us_per_beat
    }

    fn advance_to(&mut self, tick: u64) {
        let delta = tick.saturating_sub(self.last_tick);
        self.seconds += ticks_to_seconds(delta, self.us_per_beat, self.ticks_per_beat);
        self.last_tick = tick;
    }
}

/// Duration of `ticks` at a constant tempo.
pub fn ticks_to_seconds(ticks: u64, us_per_beat: u32, ticks_per_beat: u16) -> f64 {
    // Exact integer product first so the only rounding is the final division.
    let num = ticks as u128 * us_per_beat as u128;
    num as f64 / (ticks_per_beat as f64 * 1_000_000.0)
}
