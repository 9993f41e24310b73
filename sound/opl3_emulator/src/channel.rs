//! # Channel Implementation
//!
//! A channel holds the frequency, key-on and connection of a voice and mixes
//! the output of its operators. In 4-operator mode the first channel of a
//! pair drives the operators of both channels.

use crate::*;

impl Channel {
    /// Create the channel at chip-wide `index` (0-17), wired to its operators
    pub fn new(index: usize) -> Self {
        let bank = index / 9;
        let [a, b] = CHANNEL_OPERATORS[index % 9];
        Self {
            ops: [bank * 18 + a, bank * 18 + b],
            ..Default::default()
        }
    }

    /// Chip-wide indices of this channel's operators
    pub fn operators(&self) -> [usize; 2] {
        self.ops
    }

    pub fn fnum(&self) -> u16 {
        self.fnum
    }

    pub fn block(&self) -> u8 {
        self.block
    }

    pub fn is_keyed(&self) -> bool {
        self.key_on
    }

    /// Last value written to register 0xC0
    pub fn c0(&self) -> u8 {
        self.reg_c0
    }

    /// Latch register 0xA0 (f-number low byte). Returns true if the
    /// frequency changed.
    pub(crate) fn write_a0(&mut self, val: u8) -> bool {
        let fnum = (self.fnum & 0x300) | val as u16;
        let changed = fnum != self.fnum;
        self.fnum = fnum;
        changed
    }

    /// Latch register 0xB0 (key-on, block, f-number high bits)
    ///
    /// # Returns
    /// `(frequency_changed, key_changed)`
    pub(crate) fn write_b0(&mut self, val: u8) -> (bool, bool) {
        let fnum = (self.fnum & 0xFF) | (((val & 3) as u16) << 8);
        let block = (val >> 2) & 7;
        let key_on = val & 0x20 != 0;

        let freq_changed = fnum != self.fnum || block != self.block;
        let key_changed = key_on != self.key_on;
        self.fnum = fnum;
        self.block = block;
        self.key_on = key_on;
        (freq_changed, key_changed)
    }

    /// Latch register 0xC0 (feedback, connection). The stereo output bits are
    /// kept but not used.
    pub(crate) fn write_c0(&mut self, val: u8) {
        self.reg_c0 = val;
        self.feedback = (val >> 1) & 7;
        self.additive = val & 1 != 0;
    }

    /// Run the first operator of the voice with self feedback
    fn synth_first(&mut self, op: &mut Operator, lfo: &Lfo) -> i32 {
        let modulation = if self.feedback > 0 {
            (self.old[0] + self.old[1]) >> (9 - self.feedback)
        } else {
            0
        };
        let out = op.sample(lfo, modulation);
        self.old = [self.old[1], out];
        out
    }

    /// Render one sample of a 2-operator voice
    ///
    /// # Arguments
    /// * `ops` - All chip operators
    /// * `lfo` - Chip LFO state
    pub(crate) fn synth_two(&mut self, ops: &mut [Operator], lfo: &Lfo) -> i32 {
        let [a, b] = self.ops;
        let first = self.synth_first(&mut ops[a], lfo);
        if self.additive {
            first + ops[b].sample(lfo, 0)
        } else {
            ops[b].sample(lfo, first)
        }
    }

    /// Render one sample of a 4-operator voice led by this channel
    ///
    /// The connection bit of this channel (`cnt1`) and of the paired channel
    /// (`cnt2`) select the algorithm:
    /// - `00`: 1 -> 2 -> 3 -> 4
    /// - `01`: (1 -> 2) + (3 -> 4)
    /// - `10`: 1 + (2 -> 3 -> 4)
    /// - `11`: 1 + (2 -> 3) + 4
    ///
    /// # Arguments
    /// * `second` - Operator indices of the paired channel
    /// * `second_additive` - Connection bit of the paired channel
    /// * `ops` - All chip operators
    /// * `lfo` - Chip LFO state
    pub(crate) fn synth_four(
        &mut self,
        second: [usize; 2],
        second_additive: bool,
        ops: &mut [Operator],
        lfo: &Lfo,
    ) -> i32 {
        let [op1, op2] = self.ops;
        let [op3, op4] = second;
        let out1 = self.synth_first(&mut ops[op1], lfo);

        match (self.additive, second_additive) {
            (false, false) => {
                let out2 = ops[op2].sample(lfo, out1);
                let out3 = ops[op3].sample(lfo, out2);
                ops[op4].sample(lfo, out3)
            }
            (false, true) => {
                let out2 = ops[op2].sample(lfo, out1);
                let out3 = ops[op3].sample(lfo, 0);
                out2 + ops[op4].sample(lfo, out3)
            }
            (true, false) => {
                let out2 = ops[op2].sample(lfo, 0);
                let out3 = ops[op3].sample(lfo, out2);
                out1 + ops[op4].sample(lfo, out3)
            }
            (true, true) => {
                let out2 = ops[op2].sample(lfo, 0);
                let out3 = ops[op3].sample(lfo, out2);
                out1 + out3 + ops[op4].sample(lfo, 0)
            }
        }
    }
}
