//! Keyboard input for the patch editor. SDL events are translated to
//! `EditCommand`s through a configurable `KeyMap`.

pub mod config;

use config::KeyMap;
use log::debug;
use patch::EditCommand;
use sdl2::EventPump;
use sdl2::event::Event;

/// Fetch all input
pub struct Input {
    pump: EventPump,
    pub keys: KeyMap,
    quit: bool,
}

impl Input {
    pub fn new(mut pump: EventPump, keys: KeyMap) -> Input {
        pump.pump_events();
        Input {
            pump,
            keys,
            quit: false,
        }
    }

    /// Drain every pending event. Mapped key presses and releases are passed
    /// to `command_callback` in the order they arrived; unmapped keys are
    /// ignored. A window close sets the quit flag.
    pub fn update(&mut self, mut command_callback: impl FnMut(EditCommand)) {
        while let Some(event) = self.pump.poll_event() {
            match event {
                Event::KeyDown {
                    scancode: Some(sc), ..
                } => {
                    debug!("Key down: {sc:?}");
                    if let Some(command) = self.keys.key_down(sc) {
                        command_callback(command);
                    }
                }
                Event::KeyUp {
                    scancode: Some(sc), ..
                } => {
                    debug!("Key up: {sc:?}");
                    if let Some(command) = self.keys.key_up(sc) {
                        command_callback(command);
                    }
                }
                Event::Quit { .. } => self.quit = true, // Early out if Quit
                _ => {}
            }
        }
    }

    pub fn get_quit(&self) -> bool {
        self.quit
    }
}
