use opl3_emulator::Chip;
use sound_traits::{Bank, SharedSynth, SynthEngine};

use crate::{AudioSettings, SynthPlayer};

#[test]
#[ignore = "SDL2 can only initialise once (and CI doesn't have sound)"]
fn play_default_tone() {
    let sdl = sdl2::init().unwrap();
    let audio = sdl.audio().unwrap();

    let mut chip = Chip::new();
    chip.setup(44100).unwrap();
    let synth = SharedSynth::new(chip);
    let player = SynthPlayer::open(&audio, synth.clone(), AudioSettings::default()).unwrap();
    assert!(player.sample_rate() > 0);

    synth
        .with_engine(|e| {
            for (reg, val) in [
                (0x20, 0x01),
                (0x23, 0x01),
                (0x43, 0x00),
                (0x63, 0xF0),
                (0x83, 0x05),
                (0xA0, 0x44),
                (0xB0, 0x32),
            ] {
                e.write_register(Bank::Primary, reg, val);
            }
        })
        .unwrap();
    std::thread::sleep(std::time::Duration::from_millis(1000));

    synth
        .with_engine(|e| e.write_register(Bank::Primary, 0xB0, 0x12))
        .unwrap();
    std::thread::sleep(std::time::Duration::from_millis(500));
}
