//! The editable parameters and their bit widths.

use std::fmt::Display;

/// Per-channel parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelParam {
    FNumber,
    Feedback,
    Octave,
    KeyOn,
}

impl ChannelParam {
    pub const ALL: [ChannelParam; 4] = [
        ChannelParam::FNumber,
        ChannelParam::Feedback,
        ChannelParam::Octave,
        ChannelParam::KeyOn,
    ];

    pub const fn width(self) -> u32 {
        match self {
            ChannelParam::FNumber => 10,
            ChannelParam::Feedback => 3,
            ChannelParam::Octave => 3,
            ChannelParam::KeyOn => 1,
        }
    }

    pub const fn mask(self) -> u16 {
        mask(self.width())
    }

    pub const fn name(self) -> &'static str {
        match self {
            ChannelParam::FNumber => "f-number",
            ChannelParam::Feedback => "feedback",
            ChannelParam::Octave => "octave",
            ChannelParam::KeyOn => "key-on",
        }
    }
}

/// Per-operator parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorParam {
    Tremolo,
    Vibrato,
    SustainEnable,
    KeyScaleRate,
    Multiplier,
    KeyScaleLevel,
    OutputLevel,
    Attack,
    Decay,
    SustainLevel,
    Release,
}

impl OperatorParam {
    pub const ALL: [OperatorParam; 11] = [
        OperatorParam::Tremolo,
        OperatorParam::Vibrato,
        OperatorParam::SustainEnable,
        OperatorParam::KeyScaleRate,
        OperatorParam::Multiplier,
        OperatorParam::KeyScaleLevel,
        OperatorParam::OutputLevel,
        OperatorParam::Attack,
        OperatorParam::Decay,
        OperatorParam::SustainLevel,
        OperatorParam::Release,
    ];

    pub const fn width(self) -> u32 {
        match self {
            OperatorParam::Tremolo
            | OperatorParam::Vibrato
            | OperatorParam::SustainEnable
            | OperatorParam::KeyScaleRate => 1,
            OperatorParam::KeyScaleLevel => 2,
            OperatorParam::OutputLevel => 6,
            OperatorParam::Multiplier
            | OperatorParam::Attack
            | OperatorParam::Decay
            | OperatorParam::SustainLevel
            | OperatorParam::Release => 4,
        }
    }

    pub const fn mask(self) -> u16 {
        mask(self.width())
    }

    pub const fn name(self) -> &'static str {
        match self {
            OperatorParam::Tremolo => "tremolo",
            OperatorParam::Vibrato => "vibrato",
            OperatorParam::SustainEnable => "sustain",
            OperatorParam::KeyScaleRate => "ksr",
            OperatorParam::Multiplier => "multiplier",
            OperatorParam::KeyScaleLevel => "ksl",
            OperatorParam::OutputLevel => "level",
            OperatorParam::Attack => "attack",
            OperatorParam::Decay => "decay",
            OperatorParam::SustainLevel => "sustain level",
            OperatorParam::Release => "release",
        }
    }
}

/// The parameter a `Set` or `Step` applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    Channel(ChannelParam),
    Operator(OperatorParam),
}

impl Default for Param {
    fn default() -> Self {
        Param::Channel(ChannelParam::FNumber)
    }
}

impl Param {
    pub const fn width(self) -> u32 {
        match self {
            Param::Channel(p) => p.width(),
            Param::Operator(p) => p.width(),
        }
    }

    pub const fn mask(self) -> u16 {
        mask(self.width())
    }

    pub const fn name(self) -> &'static str {
        match self {
            Param::Channel(p) => p.name(),
            Param::Operator(p) => p.name(),
        }
    }
}

impl From<ChannelParam> for Param {
    fn from(p: ChannelParam) -> Self {
        Param::Channel(p)
    }
}

impl From<OperatorParam> for Param {
    fn from(p: OperatorParam) -> Self {
        Param::Operator(p)
    }
}

impl Display for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

const fn mask(width: u32) -> u16 {
    ((1u32 << width) - 1) as u16
}

/// `(value + delta) mod 2^width`
pub(crate) fn wrap(value: u16, delta: i32, width: u32) -> u16 {
    (value as i32).wrapping_add(delta).rem_euclid(1 << width) as u16
}
