//! # Chip Implementation
//!
//! Register decoding for both banks and per-sample mixing of all voices.

use log::{debug, trace};
use sound_traits::{Bank, SynthEngine, SynthError};

use crate::*;

/// Output rates the rate tables stay accurate for
const SAMPLE_RATES: std::ops::RangeInclusive<u32> = 8000..=192000;

impl Chip {
    /// Creates a chip with every register cleared. `setup` must be called
    /// before it produces sound.
    pub fn new() -> Self {
        init_tables();
        Self::default()
    }

    /// Prepare the rate tables for an output sample rate
    ///
    /// # Arguments
    /// * `rate` - Output sample rate in Hz
    pub fn setup(&mut self, rate: u32) -> Result<(), SynthError> {
        if !SAMPLE_RATES.contains(&rate) {
            return Err(SynthError::InvalidSampleRate(rate));
        }
        self.rate = rate;
        self.tables = RateTables::new(rate);
        self.lfo = Lfo::new(rate);
        for op in self.ops.iter_mut() {
            op.refresh(&self.tables);
        }
        debug!("OPL3 emulator set up for {rate}Hz");
        Ok(())
    }

    /// Output sample rate, 0 before `setup`
    pub fn sample_rate(&self) -> u32 {
        self.rate
    }

    pub fn is_opl3(&self) -> bool {
        self.opl3_active
    }

    /// Last value written to 0xBD. Rhythm mode is not rendered.
    pub fn rhythm_register(&self) -> u8 {
        self.reg_bd
    }

    /// Chip-wide channel `index` (0-17)
    pub fn channel(&self, index: usize) -> Option<&Channel> {
        self.chan.get(index)
    }

    /// Chip-wide operator `index` (0-35)
    pub fn operator(&self, index: usize) -> Option<&Operator> {
        self.ops.get(index)
    }

    /// Is channel `index` currently part of a 4-operator voice
    pub fn is_four_op(&self, index: usize) -> bool {
        self.voice_role(index) != VoiceRole::Single
    }

    pub(crate) fn voice_role(&self, index: usize) -> VoiceRole {
        if !self.opl3_active {
            return VoiceRole::Single;
        }
        for (bit, &(first, second)) in FOUR_OP_PAIRS.iter().enumerate() {
            if self.reg104 & (1 << bit) == 0 {
                continue;
            }
            if index == first {
                return VoiceRole::Primary(second);
            }
            if index == second {
                return VoiceRole::Secondary;
            }
        }
        VoiceRole::Single
    }

    /// Operators sounding for the voice led by channel `index`
    fn voice_operators(&self, index: usize) -> Vec<usize> {
        let mut ops = self.chan[index].ops.to_vec();
        if let VoiceRole::Primary(second) = self.voice_role(index) {
            ops.extend_from_slice(&self.chan[second].ops);
        }
        ops
    }

    fn update_voice_frequency(&mut self, index: usize) {
        let (fnum, block) = (self.chan[index].fnum, self.chan[index].block);
        for op in self.voice_operators(index) {
            self.ops[op].set_frequency(&self.tables, fnum, block);
        }
    }

    fn update_voice_key(&mut self, index: usize) {
        let key_on = self.chan[index].key_on;
        for op in self.voice_operators(index) {
            if key_on {
                self.ops[op].key_on();
            } else {
                self.ops[op].key_off();
            }
        }
    }

    fn write_104(&mut self, val: u8) {
        let val = val & 0x3F;
        if self.reg104 == val {
            return;
        }
        self.reg104 = val;
        self.sync_pairs();
        trace!("4-op connection select {val:#04x}");
    }

    /// Newly joined secondaries follow the frequency of their primary
    fn sync_pairs(&mut self) {
        for (first, _) in FOUR_OP_PAIRS {
            if matches!(self.voice_role(first), VoiceRole::Primary(_)) {
                self.update_voice_frequency(first);
            }
        }
    }

    fn write_105(&mut self, val: u8) {
        let active = val & 1 != 0;
        if active != self.opl3_active {
            self.opl3_active = active;
            self.update_wave_forms();
            self.sync_pairs();
            debug!("OPL3 mode {}", if active { "enabled" } else { "disabled" });
        }
    }

    fn update_wave_forms(&mut self) {
        let mask = if self.opl3_active {
            7
        } else {
            self.wave_form_mask
        };
        for op in self.ops.iter_mut() {
            op.apply_wave_mask(mask);
        }
    }

    fn write_operator(&mut self, bank: usize, reg: u8, val: u8) {
        let Some(op) = SLOT_OPERATOR[(reg & 0x1F) as usize] else {
            return;
        };
        let index = bank * 18 + op;
        let tables = &self.tables;
        let op = &mut self.ops[index];
        match reg >> 5 {
            0x1 => op.write_20(tables, val),
            0x2 => op.write_40(val),
            0x3 => op.write_60(tables, val),
            0x4 => op.write_80(tables, val),
            0x7 => {
                let mask = if self.opl3_active {
                    7
                } else {
                    self.wave_form_mask
                };
                op.write_e0(val, mask);
            }
            _ => {}
        }
    }

    fn write_channel(&mut self, bank: usize, reg: u8, val: u8) {
        let local = (reg & 0x0F) as usize;
        if local > 8 {
            if bank == 0 && reg == 0xBD {
                self.reg_bd = val;
            }
            return;
        }
        let index = bank * 9 + local;
        let role = self.voice_role(index);

        match reg >> 4 {
            0xA => {
                if role == VoiceRole::Secondary {
                    return;
                }
                if self.chan[index].write_a0(val) {
                    self.update_voice_frequency(index);
                }
            }
            0xB => {
                if role == VoiceRole::Secondary {
                    return;
                }
                let (freq, key) = self.chan[index].write_b0(val);
                if freq {
                    self.update_voice_frequency(index);
                }
                if key {
                    self.update_voice_key(index);
                }
            }
            0xC => self.chan[index].write_c0(val),
            _ => {}
        }
    }

    /// Writes a value to a chip register
    ///
    /// # Arguments
    /// * `reg` - 9-bit register address, bit 8 selects the second bank
    /// * `val` - The value to write
    pub fn write_reg(&mut self, reg: u32, val: u8) {
        let bank = ((reg >> 8) & 1) as usize;
        let reg = (reg & 0xFF) as u8;

        if bank == 1 {
            match reg {
                0x04 => return self.write_104(val),
                0x05 => return self.write_105(val),
                _ if !self.opl3_active => {
                    trace!("Ignoring bank 1 write {reg:#04x} while OPL3 is disabled");
                    return;
                }
                _ => {}
            }
        }

        match reg >> 4 {
            0x0 => {
                if bank == 0 && reg == 0x01 {
                    self.wave_form_mask = if val & 0x20 != 0 { 3 } else { 0 };
                    self.update_wave_forms();
                }
            }
            0x2..=0x9 | 0xE | 0xF => self.write_operator(bank, reg, val),
            0xA..=0xC => self.write_channel(bank, reg, val),
            _ => {}
        }
    }

    /// Fill `output` with mono samples
    ///
    /// # Arguments
    /// * `output` - Buffer to fill, one sample per frame
    pub fn generate_block(&mut self, output: &mut [i32]) {
        if self.rate == 0 {
            output.fill(0);
            return;
        }

        for sample in output.iter_mut() {
            self.lfo.advance();
            let mut acc = 0;
            for index in 0..NUM_CHANNELS {
                match self.voice_role(index) {
                    VoiceRole::Single => {
                        acc += self.chan[index].synth_two(&mut self.ops, &self.lfo);
                    }
                    VoiceRole::Primary(second) => {
                        let (ops, additive) = (self.chan[second].ops, self.chan[second].additive);
                        acc += self.chan[index].synth_four(ops, additive, &mut self.ops, &self.lfo);
                    }
                    VoiceRole::Secondary => {}
                }
            }
            *sample = acc;
        }
    }
}

impl SynthEngine for Chip {
    fn setup(&mut self, sample_rate: u32) -> Result<(), SynthError> {
        Chip::setup(self, sample_rate)
    }

    fn write_register(&mut self, bank: Bank, register: u8, value: u8) {
        self.write_reg(bank.base() | register as u32, value);
    }

    fn generate_samples(&mut self, out: &mut [i32]) {
        self.generate_block(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The instrument the editor starts with, on channel 0
    fn default_patch(chip: &mut Chip, base: u32) {
        chip.write_reg(base | 0x20, 0x68);
        chip.write_reg(base | 0x40, 0x1F);
        chip.write_reg(base | 0x60, 0xE4);
        chip.write_reg(base | 0x80, 0x96);
        chip.write_reg(base | 0x23, 0x22);
        chip.write_reg(base | 0x43, 0x00);
        chip.write_reg(base | 0x63, 0xE4);
        chip.write_reg(base | 0x83, 0x44);
        chip.write_reg(base | 0xA0, 0x44);
    }

    fn peak(chip: &mut Chip, samples: usize) -> i32 {
        let mut buf = vec![0i32; samples];
        chip.generate_block(&mut buf);
        buf.iter().map(|s| s.abs()).max().unwrap_or(0)
    }

    fn chip() -> Chip {
        let mut chip = Chip::new();
        chip.setup(44100).unwrap();
        chip
    }

    #[test]
    fn test_chip_creation() {
        let chip = Chip::new();
        assert_eq!(chip.sample_rate(), 0);
        assert!(!chip.is_opl3());
        assert!(chip.channel(17).is_some());
        assert!(chip.channel(18).is_none());
        assert!(chip.operator(35).is_some());
    }

    #[test]
    fn test_setup_rejects_bad_rates() {
        let mut chip = Chip::new();
        assert_eq!(chip.setup(0), Err(SynthError::InvalidSampleRate(0)));
        assert_eq!(
            chip.setup(1_000_000),
            Err(SynthError::InvalidSampleRate(1_000_000))
        );
        assert!(chip.setup(48000).is_ok());
        assert_eq!(chip.sample_rate(), 48000);
    }

    #[test]
    fn test_silent_before_setup() {
        let mut chip = Chip::new();
        default_patch(&mut chip, 0);
        chip.write_reg(0xB0, 0x32);
        assert_eq!(peak(&mut chip, 256), 0);
    }

    #[test]
    fn test_operator_slot_decode() {
        let mut chip = chip();
        // Slot 8 is operator 6, the modulator of channel 3
        chip.write_reg(0x28, 0x21);
        assert_eq!(chip.ops[6].reg20, 0x21);
        chip.write_reg(0x35, 0x07);
        assert_eq!(chip.ops[17].reg20, 0x07);
        // Unused slots are ignored
        chip.write_reg(0x26, 0x33);
        chip.write_reg(0x2E, 0x33);
        assert!(chip.ops.iter().all(|op| op.reg20 != 0x33));
    }

    #[test]
    fn test_bank_one_gated_by_opl3_enable() {
        let mut chip = chip();
        chip.write_reg(0x120, 0x01);
        assert_eq!(chip.ops[18].reg20, 0);

        chip.write_reg(0x105, 0x01);
        assert!(chip.is_opl3());
        chip.write_reg(0x120, 0x01);
        assert_eq!(chip.ops[18].reg20, 0x01);
        assert_eq!(chip.ops[0].reg20, 0);

        chip.write_reg(0x1A0, 0x44);
        assert_eq!(chip.chan[9].fnum, 0x44);
    }

    #[test]
    fn test_key_on_produces_sound() {
        let mut chip = chip();
        default_patch(&mut chip, 0);
        assert_eq!(peak(&mut chip, 1024), 0);

        chip.write_reg(0xB0, 0x32);
        assert!(chip.channel(0).unwrap().is_keyed());
        assert!(peak(&mut chip, 4096) > 0);
    }

    #[test]
    fn test_key_off_fast_release_goes_silent() {
        let mut chip = chip();
        default_patch(&mut chip, 0);
        chip.write_reg(0x80, 0x9F);
        chip.write_reg(0x83, 0x4F);
        chip.write_reg(0xB0, 0x32);
        assert!(peak(&mut chip, 2048) > 0);

        chip.write_reg(0xB0, 0x12);
        peak(&mut chip, 4410);
        assert_eq!(peak(&mut chip, 1024), 0);
    }

    #[test]
    fn test_second_bank_voice() {
        let mut chip = chip();
        chip.write_reg(0x105, 0x01);
        default_patch(&mut chip, 0x100);
        chip.write_reg(0x1B0, 0x32);
        assert!(peak(&mut chip, 4096) > 0);
        assert!(chip.ops[18].key_on);
        assert!(!chip.ops[0].key_on);
    }

    #[test]
    fn test_four_op_pairing() {
        let mut chip = chip();
        chip.write_reg(0x105, 0x01);
        chip.write_reg(0x104, 0x01);
        assert!(chip.is_four_op(0));
        assert!(chip.is_four_op(3));
        assert!(!chip.is_four_op(1));

        chip.write_reg(0xA0, 0x44);
        chip.write_reg(0xB0, 0x32);
        // Primary drives the frequency and key of all four operators
        for op in [0, 3, 6, 9] {
            assert_eq!(chip.ops[op].fnum, 0x244);
            assert!(chip.ops[op].key_on);
        }

        // Frequency writes to the secondary are ignored
        chip.write_reg(0xA3, 0x10);
        assert_eq!(chip.chan[3].fnum, 0);
        assert_eq!(chip.ops[6].fnum, 0x244);
    }

    #[test]
    fn test_four_op_needs_opl3() {
        let mut chip = chip();
        chip.write_reg(0x104, 0x3F);
        assert!(!chip.is_four_op(0));
        chip.write_reg(0x105, 0x01);
        assert!(chip.is_four_op(14));
    }

    #[test]
    fn test_synth_engine_interface() {
        let mut chip = Chip::new();
        SynthEngine::setup(&mut chip, 44100).unwrap();
        chip.write_register(Bank::Secondary, 0x05, 0x01);
        chip.write_register(Bank::Secondary, 0x20, 0x02);
        assert_eq!(chip.ops[18].reg20, 0x02);

        let mut buf = [1i32; 32];
        chip.generate_samples(&mut buf);
        assert!(buf.iter().all(|s| *s == 0));
    }

    #[test]
    fn test_waveform_select_enable() {
        let mut chip = chip();
        chip.write_reg(0xE0, 0x06);
        assert_eq!(chip.ops[0].wave_form, 0);
        chip.write_reg(0x01, 0x20);
        assert_eq!(chip.ops[0].wave_form, 2);
        chip.write_reg(0x105, 0x01);
        assert_eq!(chip.ops[0].wave_form, 6);
    }
}
