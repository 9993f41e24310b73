//! A synthesis engine that makes no sound. It keeps the last value of every
//! register so the editor can run headless, and can log each write for tests.

use log::{debug, info};
use sound_traits::{Bank, SynthEngine, SynthError};

/// A register write as seen by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Write {
    pub bank: Bank,
    pub register: u8,
    pub value: u8,
}

#[derive(Debug, Default)]
pub struct NullSynth {
    sample_rate: u32,
    /// Append every write to `writes`
    record: bool,
    writes: Vec<Write>,
    /// Last value written per 9-bit register address
    registers: Vec<u8>,
}

impl NullSynth {
    /// Keeps the register image only
    pub fn new() -> Self {
        Self {
            sample_rate: 0,
            record: false,
            writes: Vec::new(),
            registers: vec![0; 0x200],
        }
    }

    /// Also logs every write until it is taken with `take_writes`
    pub fn recording() -> Self {
        Self {
            record: true,
            ..Self::new()
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Every write since creation or the last `take_writes`, oldest first.
    /// Always empty unless created with `recording`.
    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub fn take_writes(&mut self) -> Vec<Write> {
        std::mem::take(&mut self.writes)
    }

    /// The last value written to `register` in `bank`
    pub fn register(&self, bank: Bank, register: u8) -> u8 {
        self.registers
            .get((bank.base() | register as u32) as usize)
            .copied()
            .unwrap_or(0)
    }
}

impl SynthEngine for NullSynth {
    fn setup(&mut self, sample_rate: u32) -> Result<(), SynthError> {
        if sample_rate == 0 {
            return Err(SynthError::InvalidSampleRate(sample_rate));
        }
        if self.registers.is_empty() {
            self.registers = vec![0; 0x200];
        }
        self.sample_rate = sample_rate;
        info!("Null synth running at {sample_rate}Hz, no audio output");
        Ok(())
    }

    fn write_register(&mut self, bank: Bank, register: u8, value: u8) {
        debug!("{bank:?} {register:#04x} <- {value:#04x}");
        let addr = (bank.base() | register as u32) as usize;
        if let Some(reg) = self.registers.get_mut(addr) {
            *reg = value;
        }
        if self.record {
            self.writes.push(Write {
                bank,
                register,
                value,
            });
        }
    }

    fn generate_samples(&mut self, out: &mut [i32]) {
        out.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_writes_in_order() {
        let mut synth = NullSynth::recording();
        synth.write_register(Bank::Primary, 0xA0, 0x44);
        synth.write_register(Bank::Secondary, 0x05, 0x01);
        assert_eq!(
            synth.writes(),
            &[
                Write {
                    bank: Bank::Primary,
                    register: 0xA0,
                    value: 0x44
                },
                Write {
                    bank: Bank::Secondary,
                    register: 0x05,
                    value: 0x01
                },
            ]
        );
        assert_eq!(synth.register(Bank::Secondary, 0x05), 0x01);
        assert_eq!(synth.register(Bank::Primary, 0x05), 0x00);

        let taken = synth.take_writes();
        assert_eq!(taken.len(), 2);
        assert!(synth.writes().is_empty());
        assert_eq!(synth.register(Bank::Primary, 0xA0), 0x44);
    }

    #[test]
    fn test_plain_synth_keeps_no_log() {
        let mut synth = NullSynth::new();
        for value in 0..=255 {
            synth.write_register(Bank::Primary, 0x40, value);
        }
        assert!(synth.writes().is_empty());
        assert_eq!(synth.register(Bank::Primary, 0x40), 255);
    }

    #[test]
    fn test_silent_output() {
        let mut synth = NullSynth::new();
        synth.setup(44100).unwrap();
        assert_eq!(synth.sample_rate(), 44100);
        let mut buf = [7i32; 16];
        synth.generate_samples(&mut buf);
        assert!(buf.iter().all(|s| *s == 0));
    }

    #[test]
    fn test_setup_rejects_zero_rate() {
        let mut synth = NullSynth::default();
        assert_eq!(synth.setup(0), Err(SynthError::InvalidSampleRate(0)));
        assert!(synth.setup(8000).is_ok());
        synth.write_register(Bank::Primary, 0x20, 1);
        assert_eq!(synth.register(Bank::Primary, 0x20), 1);
    }
}
