//! Strongly typed channel and operator indices and the chip's static
//! register address map.

use std::fmt::Display;
use std::str::FromStr;

use sound_traits::Bank;

pub const NUM_CHANNELS: usize = 18;
pub const NUM_OPERATORS: usize = 36;
pub const CHANNELS_PER_BANK: usize = 9;
pub const OPERATORS_PER_BANK: usize = 18;

/// Register offset of each operator within a bank. The chip leaves a gap of
/// two unused slots after every six operators.
pub const OPERATOR_OFFSETS: [u8; OPERATORS_PER_BANK] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x10, 0x11, 0x12, 0x13,
    0x14, 0x15,
];

/// Operators (within a bank) wired to each channel of that bank
const CHANNEL_OPERATORS: [[usize; 2]; CHANNELS_PER_BANK] = [
    [0, 3],
    [1, 4],
    [2, 5],
    [6, 9],
    [7, 10],
    [8, 11],
    [12, 15],
    [13, 16],
    [14, 17],
];

/// Local channels of each bank able to lead a 4-operator voice
const FOUR_OP_CHANNELS: usize = 3;

/// Where a channel or operator lives in the chip's register space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterAddress {
    pub bank: Bank,
    /// Offset added to (or or'd into) the register group base
    pub offset: u8,
}

/// A validated channel index, `0..18`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u8);

impl ChannelId {
    pub const fn new(index: usize) -> Option<Self> {
        if index < NUM_CHANNELS {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn bank(self) -> Bank {
        if self.index() < CHANNELS_PER_BANK {
            Bank::Primary
        } else {
            Bank::Secondary
        }
    }

    /// Offset within the bank, `0..9`
    pub const fn offset(self) -> u8 {
        (self.index() - self.bank() as usize * CHANNELS_PER_BANK) as u8
    }

    pub const fn address(self) -> RegisterAddress {
        RegisterAddress {
            bank: self.bank(),
            offset: self.offset(),
        }
    }

    /// The two operators wired to this channel
    pub fn operators(self) -> [OperatorId; 2] {
        let base = self.bank() as usize * OPERATORS_PER_BANK;
        CHANNEL_OPERATORS[self.offset() as usize].map(|op| OperatorId(base as u8 + op as u8))
    }

    /// The channel whose operators extend this one in 4-operator mode
    pub fn four_op_partner(self) -> Option<ChannelId> {
        if (self.offset() as usize) < FOUR_OP_CHANNELS {
            ChannelId::new(self.index() + FOUR_OP_CHANNELS)
        } else {
            None
        }
    }

    /// The channel that leads this one in 4-operator mode, for the second
    /// channel of a pair
    pub fn four_op_primary(self) -> Option<ChannelId> {
        let offset = self.offset() as usize;
        if (FOUR_OP_CHANNELS..2 * FOUR_OP_CHANNELS).contains(&offset) {
            ChannelId::new(self.index() - FOUR_OP_CHANNELS)
        } else {
            None
        }
    }

    pub fn all() -> impl Iterator<Item = ChannelId> {
        (0..NUM_CHANNELS as u8).map(ChannelId)
    }
}

impl Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated operator index, `0..36`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperatorId(u8);

impl OperatorId {
    pub const fn new(index: usize) -> Option<Self> {
        if index < NUM_OPERATORS {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn bank(self) -> Bank {
        if self.index() < OPERATORS_PER_BANK {
            Bank::Primary
        } else {
            Bank::Secondary
        }
    }

    /// Register offset within the bank, from `OPERATOR_OFFSETS`
    pub const fn offset(self) -> u8 {
        OPERATOR_OFFSETS[self.index() % OPERATORS_PER_BANK]
    }

    pub const fn address(self) -> RegisterAddress {
        RegisterAddress {
            bank: self.bank(),
            offset: self.offset(),
        }
    }

    pub fn all() -> impl Iterator<Item = OperatorId> {
        (0..NUM_OPERATORS as u8).map(OperatorId)
    }
}

impl Display for OperatorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How many operators a channel exposes for editing
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Model {
    /// Every channel is a 2-operator voice
    #[default]
    TwoOp,
    /// The first three channels of each bank lead a 4-operator voice made of
    /// their own operators plus those of the channel three places above
    FourOp,
}

impl Model {
    /// Number of operator slots addressable on `channel`
    pub fn slot_count(self, channel: ChannelId) -> usize {
        match self {
            Model::FourOp if channel.four_op_partner().is_some() => 4,
            _ => 2,
        }
    }

    /// Whether `channel` can hold the cursor. Under `FourOp` the second
    /// channel of each pair is only reachable through slots 2-3 of its
    /// primary, the chip ignores its frequency and key-on.
    pub fn is_selectable(self, channel: ChannelId) -> bool {
        match self {
            Model::TwoOp => true,
            Model::FourOp => channel.four_op_primary().is_none(),
        }
    }

    /// The operator behind `slot` of `channel`, if the slot is addressable
    pub fn operator(self, channel: ChannelId, slot: usize) -> Option<OperatorId> {
        if slot >= self.slot_count(channel) {
            return None;
        }
        match slot {
            0 | 1 => Some(channel.operators()[slot]),
            _ => channel
                .four_op_partner()
                .map(|partner| partner.operators()[slot - 2]),
        }
    }

    /// Every addressable operator of `channel`, in slot order
    pub fn operators(self, channel: ChannelId) -> impl Iterator<Item = OperatorId> {
        (0..self.slot_count(channel)).filter_map(move |slot| self.operator(channel, slot))
    }
}

impl FromStr for Model {
    type Err = std::io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "two-op" | "2op" | "opl2" => Ok(Self::TwoOp),
            "four-op" | "4op" | "opl3" => Ok(Self::FourOp),
            _ => Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "Invalid operator model",
            )),
        }
    }
}

impl Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Model::TwoOp => write!(f, "two-op"),
            Model::FourOp => write!(f, "four-op"),
        }
    }
}
