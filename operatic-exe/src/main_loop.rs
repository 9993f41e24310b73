//! The main loop driver. Each cycle drains input into the editor, flushes the
//! dirty patch state to the synth once, then draws the result.

use std::error::Error;

use input::Input;
use log::info;
use patch::{Editor, ParameterStore, Snapshot, flush_shared};
use sound_traits::{SharedSynth, SynthEngine};

use crate::display::Display;

/// Runs until the window is closed
pub fn edit_loop<E: SynthEngine>(
    mut store: ParameterStore,
    mut editor: Editor,
    synth: SharedSynth<E>,
    mut input: Input,
    mut display: Display,
) -> Result<(), Box<dyn Error>> {
    loop {
        input.update(|command| editor.apply(&mut store, command));

        flush_shared(&mut store, &synth);

        if input.get_quit() {
            break;
        }

        display.draw(&Snapshot::take(&store, &editor))?;
    }
    info!("Quit requested, shutting down");
    Ok(())
}
