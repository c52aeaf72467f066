//! Sound descriptor played by the renderer when a dialog opens.

use serde::{Deserialize, Serialize};

/// Oscillator waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundType {
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

/// A short tone, embedded verbatim in the bootstrap document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sound {
    #[serde(rename = "type")]
    pub kind: SoundType,
    /// Frequency in Hz
    pub freq: f32,
    /// Duration in seconds
    pub duration: f32,
}

impl Sound {
    pub fn new(kind: SoundType, freq: f32, duration: f32) -> Self {
        Self {
            kind,
            freq,
            duration,
        }
    }
}
