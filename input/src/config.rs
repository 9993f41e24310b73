use std::collections::HashMap;

use log::warn;
use nanoserde::{DeRon, SerRon};
use patch::{ChannelParam, EditCommand, OperatorParam, Param};
use sdl2::keyboard::Scancode;

/// Key bindings as stored in the user config. Codes are SDL scancodes.
#[derive(Debug, Clone, PartialEq, DeRon, SerRon)]
pub struct KeyBindings {
    /// Select channels 0, 1, 2...
    pub(crate) channels: Vec<i32>,
    /// Select operator slots 0, 1, 2...
    pub(crate) slots: Vec<i32>,
    pub(crate) key_fnumber: i32,
    pub(crate) key_feedback: i32,
    pub(crate) key_octave: i32,
    pub(crate) key_tremolo: i32,
    pub(crate) key_vibrato: i32,
    pub(crate) key_sustain: i32,
    pub(crate) key_ksr: i32,
    pub(crate) key_multiplier: i32,
    pub(crate) key_ksl: i32,
    pub(crate) key_level: i32,
    pub(crate) key_attack: i32,
    pub(crate) key_decay: i32,
    pub(crate) key_sustain_level: i32,
    pub(crate) key_release: i32,
    pub(crate) key_step_up: i32,
    pub(crate) key_step_down: i32,
    /// Held for key-on, released for key-off
    pub(crate) key_note: i32,
}

impl Default for KeyBindings {
    fn default() -> Self {
        KeyBindings {
            channels: [
                Scancode::F1,
                Scancode::F2,
                Scancode::F3,
                Scancode::F4,
                Scancode::F5,
                Scancode::F6,
                Scancode::F7,
                Scancode::F8,
                Scancode::F9,
                Scancode::F10,
                Scancode::F11,
                Scancode::F12,
            ]
            .iter()
            .map(|sc| *sc as i32)
            .collect(),
            slots: [Scancode::Num1, Scancode::Num2, Scancode::Num3, Scancode::Num4]
                .iter()
                .map(|sc| *sc as i32)
                .collect(),

            key_fnumber: Scancode::P as i32,
            key_feedback: Scancode::F as i32,
            key_octave: Scancode::O as i32,

            key_tremolo: Scancode::T as i32,
            key_vibrato: Scancode::V as i32,
            key_sustain: Scancode::E as i32,
            key_ksr: Scancode::K as i32,
            key_multiplier: Scancode::M as i32,
            key_ksl: Scancode::L as i32,
            key_level: Scancode::U as i32,
            key_attack: Scancode::A as i32,
            key_decay: Scancode::D as i32,
            key_sustain_level: Scancode::S as i32,
            key_release: Scancode::R as i32,

            key_step_up: Scancode::Up as i32,
            key_step_down: Scancode::Down as i32,
            key_note: Scancode::Space as i32,
        }
    }
}

/// Resolved bindings: scancode to edit command
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    down: HashMap<Scancode, EditCommand>,
    note: Option<Scancode>,
}

impl KeyMap {
    /// The command for a key press, `None` for unmapped keys
    pub fn key_down(&self, sc: Scancode) -> Option<EditCommand> {
        if Some(sc) == self.note {
            return Some(EditCommand::KeyOn);
        }
        self.down.get(&sc).copied()
    }

    /// The command for a key release. Only the note key acts on release.
    pub fn key_up(&self, sc: Scancode) -> Option<EditCommand> {
        if Some(sc) == self.note {
            Some(EditCommand::KeyOff)
        } else {
            None
        }
    }

    fn bind(&mut self, code: i32, command: EditCommand) {
        match Scancode::from_i32(code) {
            Some(sc) => {
                if let Some(old) = self.down.insert(sc, command) {
                    warn!("{sc:?} bound twice, {old:?} replaced by {command:?}");
                }
            }
            None => warn!("Ignoring binding of invalid scancode {code} to {command:?}"),
        }
    }
}

impl From<&KeyBindings> for KeyMap {
    fn from(k: &KeyBindings) -> Self {
        let mut map = KeyMap {
            note: Scancode::from_i32(k.key_note),
            ..KeyMap::default()
        };
        if map.note.is_none() {
            warn!("Invalid note key scancode {}", k.key_note);
        }

        for (i, code) in k.channels.iter().enumerate() {
            map.bind(*code, EditCommand::SelectChannel(i));
        }
        for (i, code) in k.slots.iter().enumerate() {
            map.bind(*code, EditCommand::SelectOperatorSlot(i));
        }

        let params: [(i32, Param); 14] = [
            (k.key_fnumber, ChannelParam::FNumber.into()),
            (k.key_feedback, ChannelParam::Feedback.into()),
            (k.key_octave, ChannelParam::Octave.into()),
            (k.key_tremolo, OperatorParam::Tremolo.into()),
            (k.key_vibrato, OperatorParam::Vibrato.into()),
            (k.key_sustain, OperatorParam::SustainEnable.into()),
            (k.key_ksr, OperatorParam::KeyScaleRate.into()),
            (k.key_multiplier, OperatorParam::Multiplier.into()),
            (k.key_ksl, OperatorParam::KeyScaleLevel.into()),
            (k.key_level, OperatorParam::OutputLevel.into()),
            (k.key_attack, OperatorParam::Attack.into()),
            (k.key_decay, OperatorParam::Decay.into()),
            (k.key_sustain_level, OperatorParam::SustainLevel.into()),
            (k.key_release, OperatorParam::Release.into()),
        ];
        for (code, param) in params {
            map.bind(code, EditCommand::SelectParameter(param));
        }

        map.bind(k.key_step_up, EditCommand::Step(1));
        map.bind(k.key_step_down, EditCommand::Step(-1));
        map
    }
}
