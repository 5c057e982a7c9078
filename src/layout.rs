//! Fixed 24-key drum layout shared by the session, the auto-mapper and the exporter.

use serde::{Deserialize, Serialize};

use crate::catalog::Sample;

/// Number of keys in the drum layout.
pub const KEY_COUNT: usize = 24;

/// Octave offset that lines the layout up with the hardware note numbers (F2 -> 53).
const MIDI_OCTAVE_OFFSET: i32 = 2;

/// Note names of the layout, lowest key first.
pub const LAYOUT_NOTES: [&str; KEY_COUNT] = [
    "F2", "F#2", "G2", "G#2", "A2", "A#2", "B2", "C3", "C#3", "D3", "D#3", "E3", "F3", "F#3",
    "G3", "G#3", "A3", "A#3", "B3", "C4", "C#4", "D4", "D#4", "E4",
];

/// One key of the layout with its optional sample assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Key {
    pub note: String,
    #[serde(default)]
    pub assigned_sample: Option<Sample>,
    pub is_black_key: bool,
    /// Set while the assigned sample is being decoded for playback.
    #[serde(skip)]
    pub loading: bool,
}

impl Key {
    fn empty(note: &str) -> Self {
        Self {
            note: note.to_string(),
            assigned_sample: None,
            is_black_key: note.contains('#'),
            loading: false,
        }
    }

    /// MIDI note number for this key, if the note name parses.
    pub fn midi_note(&self) -> Option<u8> {
        midi_note(&self.note)
    }
}

/// Build the empty 24-key layout.
pub fn default_keys() -> Vec<Key> {
    LAYOUT_NOTES.iter().map(|note| Key::empty(note)).collect()
}

/// Position of a note name within the layout.
pub fn key_index(note: &str) -> Option<usize> {
    LAYOUT_NOTES
        .iter()
        .position(|candidate| candidate.eq_ignore_ascii_case(note))
}

/// Semitone offset within the octave for a pitch name.
fn semitone(name: &str) -> Option<i32> {
    let value = match name {
        "C" => 0,
        "C#" | "Db" => 1,
        "D" => 2,
        "D#" | "Eb" => 3,
        "E" => 4,
        "F" => 5,
        "F#" | "Gb" => 6,
        "G" => 7,
        "G#" | "Ab" => 8,
        "A" => 9,
        "A#" | "Bb" => 10,
        "B" => 11,
        _ => return None,
    };
    Some(value)
}

/// Convert a note name such as `F#2` into its MIDI note number.
pub fn midi_note(note: &str) -> Option<u8> {
    let split = note.find(|c: char| c.is_ascii_digit() || c == '-')?;
    let (name, octave) = note.split_at(split);
    let octave: i32 = octave.parse().ok()?;
    let value = (octave + MIDI_OCTAVE_OFFSET) * 12 + semitone(name)?;
    u8::try_from(value).ok().filter(|midi| *midi <= 127)
}
