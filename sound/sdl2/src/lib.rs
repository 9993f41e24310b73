//! SDL2 audio output for a `SynthEngine`.
//!
//! The device runs mono signed 16-bit PCM. Every device callback locks the
//! shared engine once, renders a block of accumulator samples and rescales
//! them with `to_pcm16`. A poisoned lock yields silence instead of a panic on
//! the audio thread.

mod player;

pub use player::{AudioSettings, SynthCallback, SynthPlayer};

#[cfg(test)]
mod test_sdl2;
