//! Packing of logical channel and operator state into chip registers.
//!
//! Write order within an entity matters: key-on is latched by the 0xB0 write,
//! which must follow the f-number low byte.

use sound_traits::Bank;

use crate::index::{Model, RegisterAddress};
use crate::store::{ChannelState, OperatorState};

/// F-number low byte
pub const REG_FNUM_LO: u8 = 0xA0;
/// Key-on, block and f-number high bits
pub const REG_KEYON_BLOCK: u8 = 0xB0;
/// Feedback and connection
pub const REG_FEEDBACK: u8 = 0xC0;
/// Tremolo, vibrato, sustain, KSR and multiplier
pub const REG_CHARACTER: u8 = 0x20;
/// Key scale level and output level
pub const REG_LEVELS: u8 = 0x40;
/// Attack and decay rates
pub const REG_ATTACK_DECAY: u8 = 0x60;
/// Sustain level and release rate
pub const REG_SUSTAIN_RELEASE: u8 = 0x80;

/// Waveform enable and test register
pub const REG_TEST: u8 = 0x01;
/// Bank 1 only: 4-operator connection select
pub const REG_FOUR_OP: u8 = 0x04;
/// Bank 1 only: OPL3 mode enable
pub const REG_OPL3_ENABLE: u8 = 0x05;

/// Every 4-op capable channel pair joined
const FOUR_OP_ALL: u8 = 0x3F;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWrite {
    pub bank: Bank,
    pub register: u8,
    pub value: u8,
}

impl RegisterWrite {
    pub const fn new(bank: Bank, register: u8, value: u8) -> Self {
        Self {
            bank,
            register,
            value,
        }
    }
}

/// Encode a channel as its three register writes, in write order
pub fn encode_channel(state: &ChannelState, address: RegisterAddress) -> [RegisterWrite; 3] {
    let RegisterAddress { bank, offset } = address;
    let fnum = state.f_number();
    let b0 = (state.key_on() as u8) << 5 | state.octave() << 2 | (fnum >> 8) as u8;
    [
        RegisterWrite::new(bank, REG_FNUM_LO | offset, (fnum & 0xFF) as u8),
        RegisterWrite::new(bank, REG_KEYON_BLOCK | offset, b0),
        // Connection bit stays clear: the second operator is always FM
        // modulated by the first
        RegisterWrite::new(bank, REG_FEEDBACK | offset, state.feedback() << 1),
    ]
}

/// Encode an operator as its four register writes, in write order
pub fn encode_operator(state: &OperatorState, address: RegisterAddress) -> [RegisterWrite; 4] {
    let RegisterAddress { bank, offset } = address;
    let character = (state.tremolo() as u8) << 7
        | (state.vibrato() as u8) << 6
        | (state.sustain_enable() as u8) << 5
        | (state.key_scale_rate() as u8) << 4
        | state.multiplier();
    [
        RegisterWrite::new(bank, REG_CHARACTER + offset, character),
        RegisterWrite::new(
            bank,
            REG_LEVELS + offset,
            state.key_scale_level() << 6 | state.output_level(),
        ),
        RegisterWrite::new(
            bank,
            REG_ATTACK_DECAY + offset,
            state.attack() << 4 | state.decay(),
        ),
        RegisterWrite::new(
            bank,
            REG_SUSTAIN_RELEASE + offset,
            state.sustain_level() << 4 | state.release(),
        ),
    ]
}

/// Chip-wide writes issued once before editing starts: clear the test
/// register, enable OPL3 mode so the second bank responds, and join the
/// 4-operator pairs when the model uses them.
pub fn encode_chip_setup(model: Model) -> [RegisterWrite; 3] {
    let four_op = match model {
        Model::TwoOp => 0,
        Model::FourOp => FOUR_OP_ALL,
    };
    [
        RegisterWrite::new(Bank::Primary, REG_TEST, 0),
        RegisterWrite::new(Bank::Secondary, REG_OPL3_ENABLE, 1),
        RegisterWrite::new(Bank::Secondary, REG_FOUR_OP, four_op),
    ]
}
