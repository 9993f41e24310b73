//! A read-only copy of the editor state for the display.

use crate::editor::{Cursor, Editor};
use crate::index::{ChannelId, Model, NUM_CHANNELS, NUM_OPERATORS, OperatorId};
use crate::param::Param;
use crate::store::{ChannelState, OperatorState, ParameterStore};

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub cursor: Cursor,
    pub model: Model,
    pub channels: [ChannelState; NUM_CHANNELS],
    pub operators: [OperatorState; NUM_OPERATORS],
    pub channel_dirty: [bool; NUM_CHANNELS],
    pub operator_dirty: [bool; NUM_OPERATORS],
}

impl Snapshot {
    pub fn take(store: &ParameterStore, editor: &Editor) -> Self {
        Self {
            cursor: editor.cursor(),
            model: editor.model(),
            channels: std::array::from_fn(|i| {
                ChannelId::new(i).map(|id| *store.channel(id)).unwrap_or_default()
            }),
            operators: std::array::from_fn(|i| {
                OperatorId::new(i).map(|id| *store.operator(id)).unwrap_or_default()
            }),
            channel_dirty: std::array::from_fn(|i| {
                ChannelId::new(i).is_some_and(|id| store.is_channel_dirty(id))
            }),
            operator_dirty: std::array::from_fn(|i| {
                OperatorId::new(i).is_some_and(|id| store.is_operator_dirty(id))
            }),
        }
    }

    pub fn channel(&self, id: ChannelId) -> &ChannelState {
        &self.channels[id.index()]
    }

    pub fn operator(&self, id: OperatorId) -> &OperatorState {
        &self.operators[id.index()]
    }

    /// The operator the cursor points at, if any
    pub fn current_operator(&self) -> Option<OperatorId> {
        self.model.operator(self.cursor.channel, self.cursor.slot)
    }

    /// Current value of the selected parameter, `None` if it resolves to no
    /// operator
    pub fn selected_value(&self) -> Option<u16> {
        match self.cursor.param {
            Param::Channel(p) => Some(self.channel(self.cursor.channel).get(p)),
            Param::Operator(p) => self.current_operator().map(|op| self.operator(op).get(p)),
        }
    }

    /// One line summary of the cursor for the window title
    pub fn title(&self) -> String {
        let value = self
            .selected_value()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "operatic [{}] ch {} op {} {} = {}",
            self.model, self.cursor.channel, self.cursor.slot, self.cursor.param, value
        )
    }
}
