//! `patch.json` model for OP-XY drum presets.
//!
//! Field order matches the device's own files, which list keys alphabetically.

use serde::{Deserialize, Serialize};

pub const PLATFORM: &str = "OP-XY";
pub const PATCH_TYPE: &str = "drum";
pub const PATCH_VERSION: u32 = 4;
pub const PITCH_KEYCENTER: u8 = 60;
pub const PLAYMODE_ONESHOT: &str = "oneshot";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub engine: Engine,
    pub envelope: Envelope,
    pub fx: Effect,
    pub lfo: Effect,
    pub octave: i32,
    pub platform: String,
    pub regions: Vec<Region>,
    #[serde(rename = "type")]
    pub kind: String,
    pub version: u32,
}

impl Patch {
    /// Drum patch with the fixed default parameter block and the given regions.
    pub fn drum(regions: Vec<Region>) -> Self {
        Self {
            engine: Engine::default(),
            envelope: Envelope::default(),
            fx: Effect {
                active: false,
                params: [19660, 19660, 19660, 19660, 19660, 0, 0, 0],
                kind: "ladder".to_string(),
            },
            lfo: Effect {
                active: false,
                params: [20295, 0, 14989, 0, 0, 0, 0, 0],
                kind: "element".to_string(),
            },
            octave: 0,
            platform: PLATFORM.to_string(),
            regions,
            kind: PATCH_TYPE.to_string(),
            version: PATCH_VERSION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Engine {
    pub bendrange: i32,
    pub highpass: i32,
    pub modulation: Modulation,
    pub params: [i32; 8],
    pub playmode: String,
    #[serde(rename = "portamento.amount")]
    pub portamento_amount: i32,
    #[serde(rename = "portamento.type")]
    pub portamento_type: i32,
    pub transpose: i32,
    #[serde(rename = "tuning.root")]
    pub tuning_root: i32,
    #[serde(rename = "tuning.scale")]
    pub tuning_scale: i32,
    #[serde(rename = "velocity.sensitivity")]
    pub velocity_sensitivity: i32,
    pub volume: i32,
    pub width: i32,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            bendrange: 8191,
            highpass: 0,
            modulation: Modulation::default(),
            params: [16384; 8],
            playmode: "poly".to_string(),
            portamento_amount: 0,
            portamento_type: 32767,
            transpose: 0,
            tuning_root: 0,
            tuning_scale: 0,
            velocity_sensitivity: 19660,
            volume: 18348,
            width: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modulation {
    pub aftertouch: ModRoute,
    pub modwheel: ModRoute,
    pub pitchbend: ModRoute,
    pub velocity: ModRoute,
}

impl Default for Modulation {
    fn default() -> Self {
        let route = ModRoute {
            amount: 16384,
            target: 0,
        };
        Self {
            aftertouch: route.clone(),
            modwheel: route.clone(),
            pitchbend: route.clone(),
            velocity: route,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModRoute {
    pub amount: i32,
    pub target: i32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Envelope {
    pub amp: AmpEnvelope,
    /// Drum patches carry an empty filter envelope.
    pub filter: FilterEnvelope,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmpEnvelope {
    pub attack: i32,
    pub decay: i32,
    pub release: i32,
    pub sustain: i32,
}

impl Default for AmpEnvelope {
    fn default() -> Self {
        Self {
            attack: 0,
            decay: 0,
            release: 1000,
            sustain: 14745,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterEnvelope {}

/// Shared shape of the `fx` and `lfo` blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub active: bool,
    pub params: [i32; 8],
    #[serde(rename = "type")]
    pub kind: String,
}

/// One key's sample mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    #[serde(rename = "fade.in")]
    pub fade_in: u32,
    #[serde(rename = "fade.out")]
    pub fade_out: u32,
    pub framecount: u64,
    pub hikey: u8,
    pub lokey: u8,
    pub pan: i32,
    #[serde(rename = "pitch.keycenter")]
    pub pitch_keycenter: u8,
    pub playmode: String,
    pub reverse: bool,
    pub sample: String,
    #[serde(rename = "sample.end")]
    pub sample_end: u64,
    pub transpose: i32,
    pub tune: i32,
}

impl Region {
    /// One-shot region playing `sample` on a single MIDI note.
    pub fn one_shot(note: u8, sample: &str, framecount: u64) -> Self {
        Self {
            fade_in: 0,
            fade_out: 0,
            framecount,
            hikey: note,
            lokey: note,
            pan: 0,
            pitch_keycenter: PITCH_KEYCENTER,
            playmode: PLAYMODE_ONESHOT.to_string(),
            reverse: false,
            sample: sample.to_string(),
            sample_end: framecount,
            transpose: 0,
            tune: 0,
        }
    }
}
