//! The seam between the patch editor and whatever turns register writes into
//! audio. A synthesis engine only needs to accept register writes and produce
//! accumulator samples; everything else (the register layout, the device
//! callback) lives on either side of this crate.

use std::{
    error::Error,
    fmt::{Debug, Display},
    sync::{Arc, Mutex, MutexGuard},
};

use log::error;

/// Gain applied when rescaling 32-bit accumulator samples to 16-bit PCM.
pub const PCM_GAIN: i32 = (1 << 15) / (1 << 12);

/// One of the two register address spaces of the chip. Each bank holds 9
/// channels and 18 operators.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bank {
    #[default]
    Primary = 0,
    Secondary = 1,
}

impl Bank {
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The 9-bit register base the chip uses for this bank
    pub const fn base(self) -> u32 {
        (self as u32) << 8
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SynthError {
    /// The engine can't run at the requested output rate
    InvalidSampleRate(u32),
}

impl Display for SynthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SynthError::InvalidSampleRate(rate) => {
                write!(f, "unsupported sample rate: {rate}Hz")
            }
        }
    }
}

impl Error for SynthError {}

/// A synthesis engine driven purely through chip registers.
///
/// Implementors must be `Send` as the engine is shared between the input
/// thread (register writes) and the audio thread (sample generation).
pub trait SynthEngine: Send {
    /// Prepare internal tables for the given output rate. Must be called
    /// before any samples are generated.
    fn setup(&mut self, sample_rate: u32) -> Result<(), SynthError>;

    /// Write `value` to `register` in `bank`
    fn write_register(&mut self, bank: Bank, register: u8, value: u8);

    /// Fill `out` with mono accumulator samples
    fn generate_samples(&mut self, out: &mut [i32]);
}

impl<E: SynthEngine + ?Sized> SynthEngine for Box<E> {
    fn setup(&mut self, sample_rate: u32) -> Result<(), SynthError> {
        (**self).setup(sample_rate)
    }

    fn write_register(&mut self, bank: Bank, register: u8, value: u8) {
        (**self).write_register(bank, register, value)
    }

    fn generate_samples(&mut self, out: &mut [i32]) {
        (**self).generate_samples(out)
    }
}

/// Rescale accumulator samples to signed 16-bit PCM. Samples outside the
/// 16-bit range are saturated rather than wrapped.
pub fn to_pcm16(acc: &[i32], out: &mut [i16]) {
    for (o, &s) in out.iter_mut().zip(acc.iter()) {
        *o = s
            .saturating_mul(PCM_GAIN)
            .clamp(i16::MIN as i32, i16::MAX as i32) as i16;
    }
}

/// A cloneable handle to a synthesis engine behind a single mutex.
///
/// Every register-flush batch and every sample-generation call must happen
/// inside one `lock`/`with_engine` scope so that writes never interleave with
/// an in-progress render.
pub struct SharedSynth<E> {
    inner: Arc<Mutex<E>>,
}

impl<E> Clone for SharedSynth<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: SynthEngine> SharedSynth<E> {
    pub fn new(engine: E) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Take the lock. `None` if a previous holder panicked while holding it.
    pub fn lock(&self) -> Option<MutexGuard<'_, E>> {
        match self.inner.lock() {
            Ok(guard) => Some(guard),
            Err(e) => {
                error!("Synth lock poisoned: {e}");
                None
            }
        }
    }

    /// Run `f` with exclusive access to the engine, returning its result, or
    /// `None` if the lock is poisoned.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut E) -> R) -> Option<R> {
        self.lock().map(|mut engine| f(&mut engine))
    }
}
