//! # Operator Implementation
//!
//! Register decoding, envelope generation and waveform output for a single
//! operator. An operator is either a modulator (its output bends the phase of
//! the next operator) or a carrier (its output is heard), depending only on
//! the connection of the channel it belongs to.

use crate::*;

impl Operator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current envelope phase
    pub fn envelope_state(&self) -> EnvelopeState {
        self.state
    }

    /// Current envelope attenuation in 0.1875dB steps, excluding total level
    pub fn envelope_volume(&self) -> i32 {
        self.volume
    }

    /// Is the operator producing no output at all
    pub fn is_silent(&self) -> bool {
        self.state == EnvelopeState::Off || env_silent(self.volume + self.total_level)
    }

    /// Write register 0x20 (tremolo, vibrato, sustain, KSR, multiplier)
    ///
    /// # Arguments
    /// * `tables` - Rate tables for the current sample rate
    /// * `val` - Register value
    pub(crate) fn write_20(&mut self, tables: &RateTables, val: u8) {
        let change = self.reg20 ^ val;
        if change == 0 {
            return;
        }
        self.reg20 = val;
        if change & 0x0F != 0 {
            self.freq_mul = tables.freq_mul[(val & 0x0F) as usize];
            self.update_frequency();
        }
        if change & MASK_KSR != 0 {
            self.update_rates(tables);
        }
    }

    /// Write register 0x40 (key scale level, total level)
    pub(crate) fn write_40(&mut self, val: u8) {
        if self.reg40 == val {
            return;
        }
        self.reg40 = val;
        self.update_attenuation();
    }

    /// Write register 0x60 (attack rate, decay rate)
    pub(crate) fn write_60(&mut self, tables: &RateTables, val: u8) {
        if self.reg60 == val {
            return;
        }
        self.reg60 = val;
        self.update_rates(tables);
    }

    /// Write register 0x80 (sustain level, release rate)
    pub(crate) fn write_80(&mut self, tables: &RateTables, val: u8) {
        if self.reg80 == val {
            return;
        }
        self.reg80 = val;

        let mut sustain = (val >> 4) as i32;
        // Sustain level 15 means the full 93dB range
        sustain |= (sustain + 1) & 0x10;
        self.sustain_level = sustain << 4;
        self.update_rates(tables);
    }

    /// Write register 0xE0 (waveform select)
    ///
    /// # Arguments
    /// * `val` - Register value
    /// * `mask` - Waveforms currently enabled on the chip
    pub(crate) fn write_e0(&mut self, val: u8, mask: u8) {
        self.reg_e0 = val;
        self.apply_wave_mask(mask);
    }

    /// Re-derive the playing waveform after the chip's waveform enable changed
    pub(crate) fn apply_wave_mask(&mut self, mask: u8) {
        self.wave_form = self.reg_e0 & mask;
    }

    /// Set the frequency of the channel driving this operator
    ///
    /// # Arguments
    /// * `tables` - Rate tables for the current sample rate
    /// * `fnum` - 10-bit f-number
    /// * `block` - 3-bit octave
    pub(crate) fn set_frequency(&mut self, tables: &RateTables, fnum: u16, block: u8) {
        self.fnum = fnum & 0x3FF;
        self.block = block & 7;
        self.update_frequency();
        self.update_attenuation();
        self.update_rates(tables);
    }

    /// Re-derive everything that depends on the sample rate
    pub(crate) fn refresh(&mut self, tables: &RateTables) {
        self.freq_mul = tables.freq_mul[(self.reg20 & 0x0F) as usize];
        self.update_frequency();
        self.update_rates(tables);
    }

    fn update_frequency(&mut self) {
        let scaled = (self.fnum as u64) << self.block;
        self.phase_add = (scaled * self.freq_mul as u64) as u32;
        self.vibrato_depth = ((((self.fnum >> 7) as u64) << self.block) * self.freq_mul as u64
            >> 1) as u32;
    }

    fn update_attenuation(&mut self) {
        let ksl_base = ksl_table()[(self.block as usize) * 16 + (self.fnum >> 6) as usize] as u32;
        let ksl = ksl_base >> KSL_SHIFT_TABLE[(self.reg40 >> 6) as usize];
        self.total_level = ((self.reg40 & 0x3F) as i32) * 4 + ksl as i32;
    }

    fn update_rates(&mut self, tables: &RateTables) {
        let key_code = (self.block << 1) | ((self.fnum >> 9) & 1) as u8;
        self.ksr = if self.reg20 & MASK_KSR != 0 {
            key_code
        } else {
            key_code >> 2
        };

        let ksr = self.ksr;
        let index = |rate: u8| ((rate << 2) + ksr).min(RATE_COUNT as u8 - 1) as usize;

        let attack = self.reg60 >> 4;
        self.attack_add = if attack != 0 {
            tables.attack[index(attack)]
        } else {
            0
        };
        let decay = self.reg60 & 0x0F;
        self.decay_add = if decay != 0 {
            tables.linear[index(decay)]
        } else {
            0
        };
        let release = self.reg80 & 0x0F;
        self.release_add = if release != 0 {
            tables.linear[index(release)]
        } else {
            0
        };
    }

    pub(crate) fn key_on(&mut self) {
        if self.key_on {
            return;
        }
        self.key_on = true;
        self.phase = 0;
        self.rate_counter = 0;
        self.state = EnvelopeState::Attack;
    }

    pub(crate) fn key_off(&mut self) {
        if !self.key_on {
            return;
        }
        self.key_on = false;
        if self.state != EnvelopeState::Off {
            self.state = EnvelopeState::Release;
        }
    }

    /// Advance the rate counter by `add`, returning whole steps taken
    fn rate_forward(&mut self, add: u32) -> i32 {
        self.rate_counter = self.rate_counter.wrapping_add(add);
        let steps = self.rate_counter >> RATE_SH;
        self.rate_counter &= RATE_MASK;
        steps as i32
    }

    /// Run one sample of the envelope generator
    fn envelope_step(&mut self) {
        match self.state {
            EnvelopeState::Off => {
                self.volume = ENV_MAX;
            }
            EnvelopeState::Attack => {
                let change = self.rate_forward(self.attack_add);
                if change == 0 {
                    return;
                }
                // Exponential approach, each step closes an eighth of the gap
                self.volume += ((!self.volume) * change) >> 3;
                if self.volume <= ENV_MIN {
                    self.volume = ENV_MIN;
                    self.rate_counter = 0;
                    self.state = EnvelopeState::Decay;
                }
            }
            EnvelopeState::Decay => {
                self.volume += self.rate_forward(self.decay_add);
                if self.volume >= self.sustain_level {
                    self.volume = self.sustain_level;
                    self.rate_counter = 0;
                    self.state = EnvelopeState::Sustain;
                }
            }
            EnvelopeState::Sustain => {
                // Without the sustain flag the note keeps fading at the release rate
                if self.reg20 & MASK_SUSTAIN == 0 {
                    self.volume += self.rate_forward(self.release_add);
                    if self.volume >= ENV_MAX {
                        self.volume = ENV_MAX;
                        self.state = EnvelopeState::Off;
                    }
                }
            }
            EnvelopeState::Release => {
                self.volume += self.rate_forward(self.release_add);
                if self.volume >= ENV_MAX {
                    self.volume = ENV_MAX;
                    self.state = EnvelopeState::Off;
                }
            }
        }
    }

    /// Produce one output sample and advance phase and envelope
    ///
    /// # Arguments
    /// * `lfo` - Chip LFO state for tremolo and vibrato
    /// * `modulation` - Phase offset in waveform table units
    ///
    /// # Returns
    /// The operator output, roughly +-4084 at full volume
    pub(crate) fn sample(&mut self, lfo: &Lfo, modulation: i32) -> i32 {
        self.envelope_step();

        let mut add = self.phase_add;
        if self.reg20 & MASK_VIBRATO != 0 {
            let offset = lfo.vibrato as i64 * self.vibrato_depth as i64;
            add = add.wrapping_add_signed(offset as i32);
        }
        let index = (self.phase >> WAVE_SH).wrapping_add(modulation as u32);
        self.phase = self.phase.wrapping_add(add);

        let mut atten = self.volume + self.total_level;
        if self.reg20 & MASK_TREMOLO != 0 {
            atten += lfo.tremolo;
        }
        if self.state == EnvelopeState::Off || env_silent(atten) {
            return 0;
        }
        (wave_sample(self.wave_form, index) * attenuation_gain(atten)) >> MUL_SH
    }
}
