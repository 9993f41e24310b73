//! `operatic`: edit the registers of an OPL3 voice live from the keyboard
//! while it plays.

mod cli;
mod config;
mod display;
mod main_loop;

use std::error::Error;

use cli::*;
use config::UserConfig;
use display::{Display, SCREEN_HEIGHT, SCREEN_WIDTH};
use input::Input;
use log::{error, info};
use main_loop::edit_loop;
use mimalloc::MiMalloc;
use opl3_emulator::Chip;
use patch::{ChannelId, Editor, ParameterStore, encode_chip_setup, write_shared};
use simplelog::TermLogger;
use sound_nosnd::NullSynth;
use sound_sdl2::SynthPlayer;
use sound_traits::{SharedSynth, SynthEngine};

const BASE_DIR: &str = "operatic/";

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<(), Box<dyn Error>> {
    let mut options: CLIOptions = argh::from_env();

    TermLogger::init(
        options.verbose.unwrap_or(log::LevelFilter::Info),
        simplelog::ConfigBuilder::default()
            .set_time_level(log::LevelFilter::Trace)
            .build(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let mut user_config = UserConfig::load();
    user_config.sync_cli(&mut options);
    user_config.write();

    let model = options.model.unwrap_or_else(|| user_config.model());
    let audio = user_config.audio();
    info!("Model: {model}, {}Hz, {} frame buffer", audio.sample_rate, audio.buffer_size);

    let sdl_ctx = sdl2::init().inspect_err(|e| error!("Could not init SDL2: {e}"))?;
    info!("Init SDL2 main");
    let video_ctx = sdl_ctx
        .video()
        .inspect_err(|e| error!("Could not init SDL2 video: {e}"))?;
    info!("Init SDL2 video");

    let engine: Box<dyn SynthEngine> = if options.no_audio {
        info!("Audio disabled, register writes go to a null synth");
        Box::new(NullSynth::new())
    } else {
        Box::new(Chip::new())
    };
    let synth = SharedSynth::new(engine);
    synth
        .with_engine(|engine| engine.setup(audio.sample_rate))
        .ok_or("Synth lock poisoned")?
        .inspect_err(|e| error!("Could not set up synth: {e}"))?;

    if !write_shared(&synth, &encode_chip_setup(model)) {
        return Err("Could not write chip setup".into());
    }
    let mut store = ParameterStore::new();
    store.load_default_patch(ChannelId::default());
    let editor = Editor::new(model);

    // Playback stops when this drops
    let _player = if options.no_audio {
        None
    } else {
        let snd_ctx = sdl_ctx
            .audio()
            .inspect_err(|e| error!("Could not init SDL2 sound: {e}"))?;
        info!("Init SDL2 sound");
        let player = SynthPlayer::open(&snd_ctx, synth.clone(), audio)
            .inspect_err(|e| error!("Could not open audio device: {e}"))?;
        Some(player)
    };

    let window = video_ctx
        .window("operatic", SCREEN_WIDTH, SCREEN_HEIGHT)
        .position_centered()
        .build()
        .inspect_err(|e| error!("Could not create window: {e}"))?;
    let display =
        Display::new(window).inspect_err(|e| error!("Could not create renderer: {e}"))?;

    let input = Input::new(sdl_ctx.event_pump()?, (&user_config.keys).into());

    edit_loop(store, editor, synth, input, display)?;
    Ok(())
}
