//! keymap.rs
//!
//! Maps MIDI note numbers onto the keys of a 61-key virtual piano that is
//! played with a computer keyboard.
//!
//! The playable range is split in three:
//! - MIDI 21..=35 (A0..B2): low extension, reached by holding Ctrl
//! - MIDI 36..=96 (C2..C7): the regular layout, Shift for the black keys
//! - MIDI 97..=108 (C#7..C8): high extension, again with Ctrl
//!
//! Anything outside 21..=108 has no key and is dropped by the caller.

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

// Ctrl-extended ranges and the keys in them that also need Shift.
const LOW_CTRL_KEYS: &[u8] = b"1234567890qwert";
const LOW_CTRL_BLACK_KEYS: &[u8] = b"2570wr";
const HIGH_CTRL_KEYS: &[u8] = b"yuiopasdfghj";
const HIGH_CTRL_BLACK_KEYS: &[u8] = b"yiadg";

/// First note of the regular layout.
const MAIN_FIRST: u8 = 36;

/// Regular layout, indexed by `note - 36`. (key, shift)
///
/// This follows the physical keyboard convention of the target piano, so it
/// is written out rather than computed.
const MAIN_KEYS: [(char, bool); 61] = [
    ('1', false), ('1', true), ('2', false), ('2', true), ('3', false), // 36..=40
    ('4', false), ('4', true), ('5', false), ('5', true), ('6', false), // 41..=45
    ('6', true), ('7', false), ('8', false), ('8', true), ('9', false), // 46..=50
    ('9', true), ('0', false), ('q', false), ('q', true), ('w', false), // 51..=55
    ('w', true), ('e', false), ('e', true), ('r', false), ('t', false), // 56..=60
    ('t', true), ('y', false), ('y', true), ('u', false), ('i', false), // 61..=65
    ('i', true), ('o', false), ('o', true), ('p', false), ('p', true), // 66..=70
    ('a', false), ('s', false), ('s', true), ('d', false), ('d', true), // 71..=75
    ('f', false), ('g', false), ('g', true), ('h', false), ('h', true), // 76..=80
    ('j', false), ('j', true), ('k', false), ('l', false), ('l', true), // 81..=85
    ('z', false), ('z', true), ('x', false), ('c', false), ('c', true), // 86..=90
    ('v', false), ('v', true), ('b', false), ('b', true), ('n', false), // 91..=95
    ('m', false),                                                      // 96
];

/// A single key press on the virtual piano.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyPress {
    pub key: char,
    /// Hold Shift (black key)
    pub shift: bool,
    /// Hold Ctrl (extended range)
    pub ctrl: bool,
}

impl KeyPress {
    /// Key field as written to the CSV, e.g. `t` or `Ctrl+1`.
    pub fn label(&self) -> String {
        if self.ctrl {
            format!("Ctrl+{}", self.key)
        } else {
            self.key.to_string()
        }
    }
}

/// Look up the key for a MIDI note. `None` when the note is out of range.
pub fn map_note(note: u8) -> Option<KeyPress> {
    match note {
        21..=35 => Some(ctrl_key(LOW_CTRL_KEYS, LOW_CTRL_BLACK_KEYS, note - 21)),
        36..=96 => {
            let (key, shift) = MAIN_KEYS[(note - MAIN_FIRST) as usize];
            Some(KeyPress { key, shift, ctrl: false })
        }
        97..=108 => Some(ctrl_key(HIGH_CTRL_KEYS, HIGH_CTRL_BLACK_KEYS, note - 97)),
        _ => None,
    }
}

fn ctrl_key(keys: &[u8], black: &[u8], idx: u8) -> KeyPress {
    let key = keys[idx as usize];
    KeyPress {
        key: key as char,
        shift: black.contains(&key),
        ctrl: true,
    }
}

/// Scientific pitch name, e.g. 60 -> "C4".
pub fn note_name(note: u8) -> String {
    let octave = (note / 12) as i8 - 1;
    format!("{}{}", NOTE_NAMES[(note % 12) as usize], octave)
}
