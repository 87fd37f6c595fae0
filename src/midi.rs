//! midi.rs
//!
//! Pulls the two things the converter cares about out of a Standard MIDI File:
//! tempo changes and key presses (note-on with non-zero velocity).
//!
//! ### Quick primer on MIDI timing
//! - Each track is a list of events, and every event carries a *delta*: the number of
//!   ticks since the previous event in the same track.
//! - Summing the deltas gives an absolute tick. Tracks run in parallel, each with its
//!   own running sum, so events from different tracks are only comparable once they
//!   are absolute.
//! - The header says how many ticks make up a quarter note (ticks per beat). Tempo
//!   meta events say how many microseconds a quarter note lasts.
//!
//! Everything here works on ticks. Turning ticks into time is `tempo`'s job.

use log::warn;
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

use crate::tempo::TempoChange;

#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    #[error("not a standard MIDI file")]
    NotMidi,
    #[error("MIDI parse error: {0}")]
    Parse(#[from] midly::Error),
    #[error("tempo of 0 µs per beat at tick {tick}")]
    ZeroTempo { tick: u64 },
    #[error("header declares 0 ticks per beat")]
    ZeroTicksPerBeat,
}

/// The subset of MIDI messages the converter looks at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Msg {
    /// Set tempo, in microseconds per quarter note
    Tempo(u32),
    /// Note on: (key, velocity). Velocity 0 means note off.
    NoteOn(u8, u8),
    /// Anything else, note offs included
    Other,
}

impl Msg {
    pub fn from_kind(kind: &TrackEventKind<'_>) -> Self {
        match *kind {
            TrackEventKind::Meta(MetaMessage::Tempo(tp)) => Msg::Tempo(tp.as_int()),
            TrackEventKind::Midi { message, .. } => match message {
                MidiMessage::NoteOn { key, vel } => Msg::NoteOn(key.as_int(), vel.as_int()),
                _ => Msg::Other,
            },
            _ => Msg::Other,
        }
    }
}

/// One track message: ticks since the previous message in the same track, and the message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackMsg {
    pub delta: u32,
    pub msg: Msg,
}

impl From<&TrackEvent<'_>> for TrackMsg {
    fn from(ev: &TrackEvent<'_>) -> Self {
        TrackMsg { delta: ev.delta.as_int(), msg: Msg::from_kind(&ev.kind) }
    }
}

/// A key press at an absolute tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteEvent {
    pub tick: u64,
    pub note: u8,
    pub velocity: u8,
}

/// Tempo changes and note-ons from all tracks, each list sorted by tick.
///
/// `tempos` holds only what the file declares; the default is added by `TempoMap`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Extracted {
    pub tempos: Vec<TempoChange>,
    pub notes: Vec<NoteEvent>,
}

/// Walk every track, accumulating deltas into absolute ticks, and collect
/// tempo changes and sounding note-ons.
///
/// Ties across tracks keep track order (stable sort), then message order.
pub fn extract<T, I>(tracks: T) -> Result<Extracted, ConvertError>
where
    T: IntoIterator<Item = I>,
    I: IntoIterator<Item = TrackMsg>,
{
    let mut out = Extracted::default();

    for track in tracks {
        let mut abs_ticks: u64 = 0;
        for ev in track {
            // A message's own delta applies to itself
            abs_ticks += ev.delta as u64;

            match ev.msg {
                Msg::Tempo(0) => return Err(ConvertError::ZeroTempo { tick: abs_ticks }),
                Msg::Tempo(us_per_beat) => {
                    out.tempos.push(TempoChange { tick: abs_ticks, us_per_beat });
                }
                // NoteOn with velocity=0 is a note off
                Msg::NoteOn(note, velocity) if velocity > 0 => {
                    out.notes.push(NoteEvent { tick: abs_ticks, note, velocity });
                }
                _ => {}
            }
        }
    }

    out.tempos.sort_by_key(|t| t.tick);
    out.notes.sort_by_key(|n| n.tick);
    Ok(out)
}

/// Parse a Standard MIDI File from memory.
pub fn parse(bytes: &[u8]) -> Result<Smf<'_>, ConvertError> {
    if !bytes.starts_with(b"MThd") {
        return Err(ConvertError::NotMidi);
    }
    Ok(Smf::parse(bytes)?)
}

/// Extract events from a parsed file.
pub fn extract_smf(smf: &Smf<'_>) -> Result<Extracted, ConvertError> {
    extract(smf.tracks.iter().map(|tr| tr.iter().map(TrackMsg::from)))
}

/// Ticks per quarter note from the header.
///
/// SMPTE timecode files have no such value; `fallback` is used for them.
/// Zero is rejected, since no tick could then be turned into time.
pub fn ticks_per_beat(smf: &Smf<'_>, fallback: u16) -> Result<u16, ConvertError> {
    let ppq = match smf.header.timing {
        Timing::Metrical(t) => t.as_int(),
        Timing::Timecode(fps, sub) => {
            warn!(
                "SMPTE timing ({} fps, {} subframes) has no ticks per beat, assuming {}",
                fps.as_f32(),
                sub,
                fallback
            );
            fallback
        }
    };
    if ppq == 0 {
        return Err(ConvertError::ZeroTicksPerBeat);
    }
    Ok(ppq)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use midly::{Format, Header, num::{u4, u7, u15, u24, u28}};

    fn m(delta: u32, msg: Msg) -> TrackMsg {
        TrackMsg { delta, msg }
    }

    fn ne(tick: u64, note: u8, velocity: u8) -> NoteEvent {
        NoteEvent { tick, note, velocity }
    }

    pub(crate) fn tempo(delta: u32, us: u32) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::from(delta),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::from(us))),
        }
    }

    pub(crate) fn note_on(delta: u32, key: u8, vel: u8) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::from(delta),
            kind: TrackEventKind::Midi {
                channel: u4::from(0),
                message: MidiMessage::NoteOn { key: u7::from(key), vel: u7::from(vel) },
            },
        }
    }

    pub(crate) fn note_off(delta: u32, key: u8) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::from(delta),
            kind: TrackEventKind::Midi {
                channel: u4::from(0),
                message: MidiMessage::NoteOff { key: u7::from(key), vel: u7::from(0) },
            },
        }
    }

    pub(crate) fn end() -> TrackEvent<'static> {
        TrackEvent { delta: u28::from(0), kind: TrackEventKind::Meta(MetaMessage::EndOfTrack) }
    }

    /// Serialize tracks into SMF bytes with the given ticks per beat.
    pub(crate) fn smf_bytes(ppq: u16, tracks: Vec<Vec<TrackEvent<'static>>>) -> Vec<u8> {
        let format = if tracks.len() > 1 { Format::Parallel } else { Format::SingleTrack };
        let smf = Smf { header: Header::new(format, Timing::Metrical(u15::from(ppq))), tracks };
        let mut buf = Vec::new();
        smf.write_std(&mut buf).unwrap();
        buf
    }

    #[test]
    fn deltas_accumulate_per_track() {
        let tracks = vec![
            vec![m(10, Msg::NoteOn(60, 100)), m(5, Msg::NoteOn(62, 100))],
            vec![m(3, Msg::Tempo(400_000)), m(9, Msg::NoteOn(64, 90))],
        ];
        let ex = extract(tracks).unwrap();
        assert_eq!(ex.notes, vec![ne(10, 60, 100), ne(12, 64, 90), ne(15, 62, 100)]);
        assert_eq!(ex.tempos, vec![TempoChange { tick: 3, us_per_beat: 400_000 }]);
    }

    #[test]
    fn note_offs_and_zero_velocity_are_dropped() {
        let tracks = vec![vec![
            m(0, Msg::NoteOn(60, 80)),
            m(10, Msg::NoteOn(60, 0)),
            m(0, Msg::Other),
            m(0, Msg::Other),
            m(5, Msg::NoteOn(61, 1)),
        ]];
        let ex = extract(tracks).unwrap();
        assert_eq!(ex.notes, vec![ne(0, 60, 80), ne(15, 61, 1)]);
        assert!(ex.tempos.is_empty());
    }

    #[test]
    fn ties_keep_track_order() {
        let tracks = vec![
            vec![m(100, Msg::NoteOn(70, 1)), m(0, Msg::Tempo(300_000))],
            vec![m(100, Msg::NoteOn(50, 1)), m(0, Msg::Tempo(600_000))],
        ];
        let ex = extract(tracks).unwrap();
        assert_eq!(ex.notes, vec![ne(100, 70, 1), ne(100, 50, 1)]);
        assert_eq!(
            ex.tempos,
            vec![
                TempoChange { tick: 100, us_per_beat: 300_000 },
                TempoChange { tick: 100, us_per_beat: 600_000 },
            ]
        );
    }

    #[test]
    fn zero_tempo_is_rejected() {
        let tracks = vec![vec![m(7, Msg::Tempo(0))]];
        let err = extract(tracks).unwrap_err();
        assert!(matches!(err, ConvertError::ZeroTempo { tick: 7 }));
    }

    #[test]
    fn no_tracks() {
        let ex = extract(Vec::<Vec<TrackMsg>>::new()).unwrap();
        assert_eq!(ex, Extracted::default());
    }

    #[test]
    fn reads_midly_events() {
        let bytes = smf_bytes(
            480,
            vec![
                vec![tempo(0, 500_000), tempo(480, 1_000_000), end()],
                vec![note_on(480, 60, 100), note_off(240, 60), note_on(240, 64, 0), note_on(0, 67, 90), end()],
            ],
        );
        let smf = parse(&bytes).unwrap();
        assert_eq!(ticks_per_beat(&smf, 999).unwrap(), 480);

        let ex = extract_smf(&smf).unwrap();
        assert_eq!(
            ex.tempos,
            vec![
                TempoChange { tick: 0, us_per_beat: 500_000 },
                TempoChange { tick: 480, us_per_beat: 1_000_000 },
            ]
        );
        assert_eq!(ex.notes, vec![ne(480, 60, 100), ne(960, 67, 90)]);
    }

    #[test]
    fn non_midi_is_rejected() {
        assert!(matches!(parse(b"MUS\x1A0000000000000"), Err(ConvertError::NotMidi)));
        assert!(matches!(parse(b""), Err(ConvertError::NotMidi)));
    }

    #[test]
    fn truncated_midi_is_a_parse_error() {
        let bytes = smf_bytes(96, vec![vec![note_on(0, 60, 100), end()]]);
        // Header chunk cut off after its length field
        let cut = &bytes[..9];
        let err = parse(cut).unwrap_err();
        assert!(matches!(err, ConvertError::Parse(_)));
        assert!(format!("{err}").starts_with("MIDI parse error"));
    }

    #[test]
    fn smpte_timing_falls_back() {
        let smf = Smf {
            header: Header::new(Format::SingleTrack, Timing::Timecode(midly::Fps::Fps25, 40)),
            tracks: vec![vec![end()]],
        };
        assert_eq!(ticks_per_beat(&smf, 480).unwrap(), 480);
        assert!(matches!(ticks_per_beat(&smf, 0), Err(ConvertError::ZeroTicksPerBeat)));
    }

    #[test]
    fn zero_ticks_per_beat_is_rejected() {
        let bytes = smf_bytes(0, vec![vec![note_on(0, 60, 100), end()]]);
        let smf = parse(&bytes).unwrap();
        let err = ticks_per_beat(&smf, 480).unwrap_err();
        assert!(matches!(err, ConvertError::ZeroTicksPerBeat));
        assert_eq!(format!("{err}"), "header declares 0 ticks per beat");
    }
}
