//! Discrete edit commands applied through a single selection cursor.

use log::debug;

use crate::index::{ChannelId, Model, OperatorId};
use crate::param::{ChannelParam, Param};
use crate::store::ParameterStore;

/// What subsequent `Set`/`Step` commands apply to
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub channel: ChannelId,
    /// Operator slot within the channel, `0..Model::slot_count`
    pub slot: usize,
    pub param: Param,
}

/// A single edit produced by the input layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditCommand {
    SelectChannel(usize),
    SelectOperatorSlot(usize),
    SelectParameter(Param),
    /// Write a value into the selected parameter
    Set(u16),
    /// Add a signed delta to the selected parameter, wrapping at its width
    Step(i32),
    KeyOn,
    KeyOff,
}

#[derive(Debug, Default, Clone)]
pub struct Editor {
    model: Model,
    cursor: Cursor,
}

impl Editor {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            cursor: Cursor::default(),
        }
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// The operator the cursor slot resolves to on the current channel.
    /// `None` if the slot is not addressable there.
    pub fn current_operator(&self) -> Option<OperatorId> {
        self.model.operator(self.cursor.channel, self.cursor.slot)
    }

    /// Select a channel. Out of range indices, and channels the model joins
    /// to a 4-operator primary, are ignored and the previous selection kept.
    /// Returns true if the selection was accepted.
    pub fn select_channel(&mut self, index: usize) -> bool {
        match ChannelId::new(index) {
            Some(channel) if !self.model.is_selectable(channel) => {
                debug!("Ignoring channel {channel}, it is part of a {} voice", self.model);
                false
            }
            Some(channel) => {
                self.cursor.channel = channel;
                debug!("Selected channel {channel}");
                true
            }
            None => {
                debug!("Ignoring out of range channel {index}");
                false
            }
        }
    }

    /// Select an operator slot of the current channel. Ignored unless the
    /// slot is addressable under the active model.
    pub fn select_operator_slot(&mut self, slot: usize) -> bool {
        if slot < self.model.slot_count(self.cursor.channel) {
            self.cursor.slot = slot;
            debug!("Selected operator slot {slot}");
            true
        } else {
            debug!(
                "Ignoring operator slot {slot} on channel {} ({})",
                self.cursor.channel, self.model
            );
            false
        }
    }

    pub fn select_parameter(&mut self, param: Param) {
        self.cursor.param = param;
        debug!("Selected parameter {param}");
    }

    /// Write `value`, masked to the parameter width, into the selected
    /// parameter. Returns true if the stored value changed (and the entity
    /// was marked dirty).
    pub fn set_parameter(&self, store: &mut ParameterStore, value: u16) -> bool {
        match self.cursor.param {
            Param::Channel(param) => store.set_channel(self.cursor.channel, param, value),
            Param::Operator(param) => match self.current_operator() {
                Some(op) => store.set_operator(op, param, value),
                None => false,
            },
        }
    }

    /// Add `delta` to the selected parameter modulo `2^width`. The entity is
    /// always marked dirty. Returns the new value, or `None` if the cursor
    /// resolves to no operator.
    pub fn step_parameter(&self, store: &mut ParameterStore, delta: i32) -> Option<u16> {
        match self.cursor.param {
            Param::Channel(param) => Some(store.step_channel(self.cursor.channel, param, delta)),
            Param::Operator(param) => self
                .current_operator()
                .map(|op| store.step_operator(op, param, delta)),
        }
    }

    /// Set key-on of the current channel regardless of the selected
    /// parameter. Returns true if it changed.
    pub fn key_on(&self, store: &mut ParameterStore, pressed: bool) -> bool {
        store.set_channel(self.cursor.channel, ChannelParam::KeyOn, pressed as u16)
    }

    pub fn apply(&mut self, store: &mut ParameterStore, command: EditCommand) {
        match command {
            EditCommand::SelectChannel(index) => {
                self.select_channel(index);
            }
            EditCommand::SelectOperatorSlot(slot) => {
                self.select_operator_slot(slot);
            }
            EditCommand::SelectParameter(param) => self.select_parameter(param),
            EditCommand::Set(value) => {
                self.set_parameter(store, value);
            }
            EditCommand::Step(delta) => {
                if let Some(value) = self.step_parameter(store, delta) {
                    debug!("{} -> {value}", self.cursor.param);
                }
            }
            EditCommand::KeyOn => {
                self.key_on(store, true);
            }
            EditCommand::KeyOff => {
                self.key_on(store, false);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::OperatorParam;

    fn channel(index: usize) -> ChannelId {
        ChannelId::new(index).unwrap()
    }

    #[test]
    fn test_select_channel_out_of_range_keeps_previous() {
        let mut editor = Editor::default();
        assert!(editor.select_channel(5));
        assert!(!editor.select_channel(18));
        assert_eq!(editor.cursor().channel, channel(5));
    }

    #[test]
    fn test_select_does_not_mutate() {
        let mut store = ParameterStore::new();
        let mut editor = Editor::default();
        editor.apply(&mut store, EditCommand::SelectChannel(2));
        editor.apply(&mut store, EditCommand::SelectOperatorSlot(1));
        editor.apply(
            &mut store,
            EditCommand::SelectParameter(OperatorParam::Attack.into()),
        );
        assert!(!store.has_dirty());
    }

    #[test]
    fn test_slot_limits_follow_model() {
        let mut editor = Editor::new(Model::TwoOp);
        assert!(editor.select_operator_slot(1));
        assert!(!editor.select_operator_slot(2));
        assert_eq!(editor.cursor().slot, 1);

        let mut editor = Editor::new(Model::FourOp);
        assert!(editor.select_operator_slot(3));
        assert_eq!(editor.current_operator().map(|o| o.index()), Some(9));

        editor.select_channel(6);
        assert!(!editor.select_operator_slot(2));
    }

    #[test]
    fn test_four_op_secondary_channel_not_selectable() {
        let mut store = ParameterStore::new();
        let mut editor = Editor::new(Model::FourOp);
        editor.apply(&mut store, EditCommand::SelectChannel(1));
        for index in [3, 4, 5, 12, 13, 14] {
            assert!(!editor.select_channel(index));
        }
        assert_eq!(editor.cursor().channel, channel(1));

        // Key-on and frequency land on the primary that drives the voice
        editor.select_parameter(ChannelParam::FNumber.into());
        editor.apply(&mut store, EditCommand::SelectChannel(4));
        editor.apply(&mut store, EditCommand::Set(0x155));
        editor.apply(&mut store, EditCommand::KeyOn);
        assert_eq!(store.channel(channel(1)).f_number(), 0x155);
        assert!(store.channel(channel(1)).key_on());
        assert!(!store.is_channel_dirty(channel(4)));

        let mut editor = Editor::new(Model::TwoOp);
        assert!(editor.select_channel(4));
    }

    #[test]
    fn test_set_same_value_dirty_once() {
        let mut store = ParameterStore::new();
        let mut editor = Editor::default();
        editor.select_parameter(ChannelParam::Octave.into());
        assert!(editor.set_parameter(&mut store, 4));
        assert!(store.is_channel_dirty(channel(0)));

        store.clear_channel_dirty(channel(0));
        assert!(!editor.set_parameter(&mut store, 4));
        assert!(!store.is_channel_dirty(channel(0)));
    }

    #[test]
    fn test_set_masks_value() {
        let mut store = ParameterStore::new();
        let mut editor = Editor::default();
        editor.select_operator_slot(1);
        editor.select_parameter(OperatorParam::OutputLevel.into());
        editor.set_parameter(&mut store, 0x1FF);
        let op = editor.current_operator().unwrap();
        assert_eq!(store.operator(op).output_level(), 0x3F);
        assert!(store.is_operator_dirty(op));
    }

    #[test]
    fn test_step_wrap_closure_for_every_parameter() {
        let mut store = ParameterStore::new();
        let mut editor = Editor::default();
        editor.select_channel(7);
        editor.select_operator_slot(1);

        let params = ChannelParam::ALL
            .iter()
            .map(|p| Param::from(*p))
            .chain(OperatorParam::ALL.iter().map(|p| Param::from(*p)));
        for param in params {
            editor.select_parameter(param);
            editor.set_parameter(&mut store, 1);
            for _ in 0..(1u32 << param.width()) {
                editor.step_parameter(&mut store, 1).unwrap();
            }
            let value = editor.step_parameter(&mut store, 0).unwrap();
            assert_eq!(value, 1, "{param}");
        }
    }

    #[test]
    fn test_step_feedback_down_from_zero() {
        let mut store = ParameterStore::new();
        let mut editor = Editor::default();
        editor.select_parameter(ChannelParam::Feedback.into());
        editor.apply(&mut store, EditCommand::Step(-1));
        assert_eq!(store.channel(channel(0)).feedback(), 7);
        assert!(store.is_channel_dirty(channel(0)));
    }

    #[test]
    fn test_step_marks_dirty_even_when_unchanged() {
        let mut store = ParameterStore::new();
        let mut editor = Editor::default();
        editor.select_parameter(ChannelParam::KeyOn.into());
        assert_eq!(editor.step_parameter(&mut store, 2), Some(0));
        assert!(store.is_channel_dirty(channel(0)));
    }

    #[test]
    fn test_key_on_bypasses_cursor() {
        let mut store = ParameterStore::new();
        let mut editor = Editor::default();
        editor.select_channel(3);
        editor.select_parameter(OperatorParam::Decay.into());
        editor.apply(&mut store, EditCommand::KeyOn);
        assert!(store.channel(channel(3)).key_on());
        editor.apply(&mut store, EditCommand::KeyOff);
        assert!(!store.channel(channel(3)).key_on());
        assert_eq!(store.operator(OperatorId::new(6).unwrap()).decay(), 0);
    }

    #[test]
    fn test_operator_edit_without_operator_is_noop() {
        let mut store = ParameterStore::new();
        let mut editor = Editor::new(Model::FourOp);
        editor.select_operator_slot(3);
        editor.select_parameter(OperatorParam::Attack.into());
        // Channel 6 only has two slots, slot 3 no longer resolves
        editor.select_channel(6);
        assert_eq!(editor.current_operator(), None);
        assert!(!editor.set_parameter(&mut store, 9));
        assert_eq!(editor.step_parameter(&mut store, 1), None);
        assert!(!store.has_dirty());
    }
}
