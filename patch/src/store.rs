//! Logical state of every channel and operator, with dirty tracking.
//!
//! Values are only ever stored masked to their bit width. Writes go through
//! the `Editor` (which marks entities dirty) and `flush` (which clears them).

use log::debug;

use crate::index::{ChannelId, NUM_CHANNELS, NUM_OPERATORS, OperatorId};
use crate::param::{ChannelParam, OperatorParam, wrap};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChannelState {
    f_number: u16,
    feedback: u8,
    octave: u8,
    key_on: bool,
}

impl ChannelState {
    pub fn f_number(&self) -> u16 {
        self.f_number
    }

    pub fn feedback(&self) -> u8 {
        self.feedback
    }

    pub fn octave(&self) -> u8 {
        self.octave
    }

    pub fn key_on(&self) -> bool {
        self.key_on
    }

    pub fn get(&self, param: ChannelParam) -> u16 {
        match param {
            ChannelParam::FNumber => self.f_number,
            ChannelParam::Feedback => self.feedback as u16,
            ChannelParam::Octave => self.octave as u16,
            ChannelParam::KeyOn => self.key_on as u16,
        }
    }

    /// Store `value` masked to the width of `param`. Returns true if the
    /// stored value changed.
    pub fn set(&mut self, param: ChannelParam, value: u16) -> bool {
        let value = value & param.mask();
        let old = self.get(param);
        match param {
            ChannelParam::FNumber => self.f_number = value,
            ChannelParam::Feedback => self.feedback = value as u8,
            ChannelParam::Octave => self.octave = value as u8,
            ChannelParam::KeyOn => self.key_on = value != 0,
        }
        old != value
    }

    /// Builder form of `set`
    pub fn with(mut self, param: ChannelParam, value: u16) -> Self {
        self.set(param, value);
        self
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OperatorState {
    tremolo: bool,
    vibrato: bool,
    sustain_enable: bool,
    key_scale_rate: bool,
    multiplier: u8,
    key_scale_level: u8,
    output_level: u8,
    attack: u8,
    decay: u8,
    sustain_level: u8,
    release: u8,
}

impl OperatorState {
    pub fn tremolo(&self) -> bool {
        self.tremolo
    }

    pub fn vibrato(&self) -> bool {
        self.vibrato
    }

    pub fn sustain_enable(&self) -> bool {
        self.sustain_enable
    }

    pub fn key_scale_rate(&self) -> bool {
        self.key_scale_rate
    }

    pub fn multiplier(&self) -> u8 {
        self.multiplier
    }

    pub fn key_scale_level(&self) -> u8 {
        self.key_scale_level
    }

    pub fn output_level(&self) -> u8 {
        self.output_level
    }

    pub fn attack(&self) -> u8 {
        self.attack
    }

    pub fn decay(&self) -> u8 {
        self.decay
    }

    pub fn sustain_level(&self) -> u8 {
        self.sustain_level
    }

    pub fn release(&self) -> u8 {
        self.release
    }

    pub fn get(&self, param: OperatorParam) -> u16 {
        let v = match param {
            OperatorParam::Tremolo => self.tremolo as u8,
            OperatorParam::Vibrato => self.vibrato as u8,
            OperatorParam::SustainEnable => self.sustain_enable as u8,
            OperatorParam::KeyScaleRate => self.key_scale_rate as u8,
            OperatorParam::Multiplier => self.multiplier,
            OperatorParam::KeyScaleLevel => self.key_scale_level,
            OperatorParam::OutputLevel => self.output_level,
            OperatorParam::Attack => self.attack,
            OperatorParam::Decay => self.decay,
            OperatorParam::SustainLevel => self.sustain_level,
            OperatorParam::Release => self.release,
        };
        v as u16
    }

    /// Store `value` masked to the width of `param`. Returns true if the
    /// stored value changed.
    pub fn set(&mut self, param: OperatorParam, value: u16) -> bool {
        let value = value & param.mask();
        let old = self.get(param);
        let v = value as u8;
        match param {
            OperatorParam::Tremolo => self.tremolo = v != 0,
            OperatorParam::Vibrato => self.vibrato = v != 0,
            OperatorParam::SustainEnable => self.sustain_enable = v != 0,
            OperatorParam::KeyScaleRate => self.key_scale_rate = v != 0,
            OperatorParam::Multiplier => self.multiplier = v,
            OperatorParam::KeyScaleLevel => self.key_scale_level = v,
            OperatorParam::OutputLevel => self.output_level = v,
            OperatorParam::Attack => self.attack = v,
            OperatorParam::Decay => self.decay = v,
            OperatorParam::SustainLevel => self.sustain_level = v,
            OperatorParam::Release => self.release = v,
        }
        old != value
    }

    /// Builder form of `set`
    pub fn with(mut self, param: OperatorParam, value: u16) -> Self {
        self.set(param, value);
        self
    }
}

/// The start-up instrument: a bright modulator over a full-level carrier
const DEFAULT_PATCH: [[(OperatorParam, u16); 11]; 2] = [
    [
        (OperatorParam::Tremolo, 0),
        (OperatorParam::Vibrato, 1),
        (OperatorParam::SustainEnable, 1),
        (OperatorParam::KeyScaleRate, 0),
        (OperatorParam::Multiplier, 8),
        (OperatorParam::KeyScaleLevel, 0),
        (OperatorParam::OutputLevel, 0x1F),
        (OperatorParam::Attack, 0xE),
        (OperatorParam::Decay, 0x4),
        (OperatorParam::SustainLevel, 0x9),
        (OperatorParam::Release, 0x6),
    ],
    [
        (OperatorParam::Tremolo, 0),
        (OperatorParam::Vibrato, 0),
        (OperatorParam::SustainEnable, 1),
        (OperatorParam::KeyScaleRate, 0),
        (OperatorParam::Multiplier, 2),
        (OperatorParam::KeyScaleLevel, 0),
        (OperatorParam::OutputLevel, 0),
        (OperatorParam::Attack, 0xE),
        (OperatorParam::Decay, 0x4),
        (OperatorParam::SustainLevel, 0x4),
        (OperatorParam::Release, 0x4),
    ],
];

/// All channel and operator state of the chip plus one dirty flag per entity
#[derive(Debug, Clone)]
pub struct ParameterStore {
    channels: [ChannelState; NUM_CHANNELS],
    operators: [OperatorState; NUM_OPERATORS],
    channel_dirty: [bool; NUM_CHANNELS],
    operator_dirty: [bool; NUM_OPERATORS],
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterStore {
    /// Every channel and operator zeroed and clean
    pub fn new() -> Self {
        Self {
            channels: [ChannelState::default(); NUM_CHANNELS],
            operators: [OperatorState::default(); NUM_OPERATORS],
            channel_dirty: [false; NUM_CHANNELS],
            operator_dirty: [false; NUM_OPERATORS],
        }
    }

    pub fn channel(&self, id: ChannelId) -> &ChannelState {
        &self.channels[id.index()]
    }

    pub fn operator(&self, id: OperatorId) -> &OperatorState {
        &self.operators[id.index()]
    }

    pub fn is_channel_dirty(&self, id: ChannelId) -> bool {
        self.channel_dirty[id.index()]
    }

    pub fn is_operator_dirty(&self, id: OperatorId) -> bool {
        self.operator_dirty[id.index()]
    }

    /// Is anything waiting to be flushed
    pub fn has_dirty(&self) -> bool {
        self.channel_dirty.iter().chain(self.operator_dirty.iter()).any(|d| *d)
    }

    pub fn dirty_channels(&self) -> impl Iterator<Item = ChannelId> + '_ {
        ChannelId::all().filter(|id| self.is_channel_dirty(*id))
    }

    pub fn dirty_operators(&self) -> impl Iterator<Item = OperatorId> + '_ {
        OperatorId::all().filter(|id| self.is_operator_dirty(*id))
    }

    /// Seed the two operators of `channel` with the start-up instrument. They
    /// are marked dirty so the next flush writes them.
    pub fn load_default_patch(&mut self, channel: ChannelId) {
        for (op, values) in channel.operators().into_iter().zip(DEFAULT_PATCH.iter()) {
            for &(param, value) in values {
                self.operators[op.index()].set(param, value);
            }
            self.operator_dirty[op.index()] = true;
        }
        debug!("Loaded default patch on channel {channel}");
    }

    pub(crate) fn set_channel(&mut self, id: ChannelId, param: ChannelParam, value: u16) -> bool {
        let changed = self.channels[id.index()].set(param, value);
        if changed {
            self.channel_dirty[id.index()] = true;
        }
        changed
    }

    pub(crate) fn set_operator(
        &mut self,
        id: OperatorId,
        param: OperatorParam,
        value: u16,
    ) -> bool {
        let changed = self.operators[id.index()].set(param, value);
        if changed {
            self.operator_dirty[id.index()] = true;
        }
        changed
    }

    /// Step with wrap-around. Always marks the channel dirty.
    pub(crate) fn step_channel(&mut self, id: ChannelId, param: ChannelParam, delta: i32) -> u16 {
        let state = &mut self.channels[id.index()];
        let value = wrap(state.get(param), delta, param.width());
        state.set(param, value);
        self.channel_dirty[id.index()] = true;
        value
    }

    /// Step with wrap-around. Always marks the operator dirty.
    pub(crate) fn step_operator(
        &mut self,
        id: OperatorId,
        param: OperatorParam,
        delta: i32,
    ) -> u16 {
        let state = &mut self.operators[id.index()];
        let value = wrap(state.get(param), delta, param.width());
        state.set(param, value);
        self.operator_dirty[id.index()] = true;
        value
    }

    pub(crate) fn clear_channel_dirty(&mut self, id: ChannelId) {
        self.channel_dirty[id.index()] = false;
    }

    pub(crate) fn clear_operator_dirty(&mut self, id: OperatorId) {
        self.operator_dirty[id.index()] = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_store_is_zeroed_and_clean() {
        let store = ParameterStore::new();
        assert!(!store.has_dirty());
        for id in ChannelId::all() {
            assert_eq!(*store.channel(id), ChannelState::default());
        }
        for id in OperatorId::all() {
            assert_eq!(*store.operator(id), OperatorState::default());
        }
    }

    #[test]
    fn test_channel_set_masks() {
        let mut ch = ChannelState::default();
        assert!(ch.set(ChannelParam::Feedback, 0xFF));
        assert_eq!(ch.feedback(), 7);
        assert!(ch.set(ChannelParam::FNumber, 0x1FFF));
        assert_eq!(ch.f_number(), 0x3FF);
        assert!(!ch.set(ChannelParam::FNumber, 0x3FF));
        assert!(ch.set(ChannelParam::KeyOn, 3));
        assert!(ch.key_on());
    }

    #[test]
    fn test_operator_set_masks() {
        let mut op = OperatorState::default();
        assert!(op.set(OperatorParam::OutputLevel, 0xFF));
        assert_eq!(op.output_level(), 0x3F);
        assert!(op.set(OperatorParam::KeyScaleLevel, 0x7));
        assert_eq!(op.key_scale_level(), 3);
        // Only bit 0 of a flag is kept
        assert!(!op.set(OperatorParam::Tremolo, 2));
        assert!(!op.tremolo());
    }

    #[test]
    fn test_dirty_only_on_change() {
        let mut store = ParameterStore::new();
        let ch = ChannelId::new(4).unwrap();
        assert!(store.set_channel(ch, ChannelParam::Octave, 3));
        assert!(store.is_channel_dirty(ch));
        store.clear_channel_dirty(ch);

        assert!(!store.set_channel(ch, ChannelParam::Octave, 3));
        assert!(!store.is_channel_dirty(ch));
        assert!(!store.has_dirty());
    }

    #[test]
    fn test_step_always_dirty() {
        let mut store = ParameterStore::new();
        let op = OperatorId::new(7).unwrap();
        assert_eq!(store.step_operator(op, OperatorParam::Tremolo, 2), 0);
        assert!(store.is_operator_dirty(op));
        assert_eq!(store.dirty_operators().collect::<Vec<_>>(), vec![op]);
    }

    #[test]
    fn test_default_patch() {
        let mut store = ParameterStore::new();
        let ch = ChannelId::new(0).unwrap();
        store.load_default_patch(ch);

        let [modulator, carrier] = ch.operators();
        let m = store.operator(modulator);
        assert!(m.vibrato() && m.sustain_enable() && !m.tremolo());
        assert_eq!(m.multiplier(), 8);
        assert_eq!(m.output_level(), 0x1F);
        assert_eq!((m.attack(), m.decay()), (0xE, 0x4));
        assert_eq!((m.sustain_level(), m.release()), (0x9, 0x6));

        let c = store.operator(carrier);
        assert_eq!(c.multiplier(), 2);
        assert_eq!(c.output_level(), 0);
        assert_eq!((c.sustain_level(), c.release()), (0x4, 0x4));

        assert_eq!(store.dirty_operators().count(), 2);
        assert_eq!(store.dirty_channels().count(), 0);
    }
}
