use log::{info, warn};
use sdl2::AudioSubsystem;
use sdl2::audio::{AudioCallback, AudioDevice, AudioSpecDesired};
use sound_traits::{SharedSynth, SynthEngine, to_pcm16};

/// Requested output format. The device may hand back something different.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioSettings {
    pub sample_rate: u32,
    /// Frames per device callback
    pub buffer_size: u16,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 256,
        }
    }
}

/// Pulls mono samples from the shared engine on the SDL audio thread.
pub struct SynthCallback<E: SynthEngine + 'static> {
    synth: SharedSynth<E>,
    /// Accumulator samples before conversion, grown on demand
    scratch: Vec<i32>,
}

impl<E: SynthEngine + 'static> SynthCallback<E> {
    pub fn new(synth: SharedSynth<E>, buffer_size: usize) -> Self {
        Self {
            synth,
            scratch: vec![0; buffer_size],
        }
    }
}

impl<E: SynthEngine + 'static> AudioCallback for SynthCallback<E> {
    type Channel = i16;

    fn callback(&mut self, out: &mut [i16]) {
        if self.scratch.len() < out.len() {
            self.scratch.resize(out.len(), 0);
        }
        let acc = &mut self.scratch[..out.len()];
        if self
            .synth
            .with_engine(|engine| engine.generate_samples(acc))
            .is_some()
        {
            to_pcm16(acc, out);
        } else {
            out.fill(0);
        }
    }
}

/// An open, running playback device fed by a `SharedSynth`
pub struct SynthPlayer<E: SynthEngine + 'static> {
    device: AudioDevice<SynthCallback<E>>,
    sample_rate: u32,
}

impl<E: SynthEngine + 'static> SynthPlayer<E> {
    /// Open the default playback device and start pulling samples.
    ///
    /// If the device runs at a different rate than requested the engine is
    /// set up again for the rate actually obtained.
    pub fn open(
        audio: &AudioSubsystem,
        synth: SharedSynth<E>,
        settings: AudioSettings,
    ) -> Result<Self, String> {
        let desired_spec = AudioSpecDesired {
            freq: Some(settings.sample_rate as i32),
            channels: Some(1),
            samples: Some(settings.buffer_size),
        };

        let callback_synth = synth.clone();
        let device = audio.open_playback(None, &desired_spec, |spec| {
            SynthCallback::new(callback_synth, spec.samples as usize)
        })?;

        let obtained = device.spec();
        let sample_rate = obtained.freq as u32;
        if sample_rate != settings.sample_rate {
            warn!(
                "Requested {}Hz, audio device opened at {sample_rate}Hz",
                settings.sample_rate
            );
            synth
                .with_engine(|engine| engine.setup(sample_rate))
                .ok_or_else(|| "Synth lock poisoned".to_string())?
                .map_err(|e| e.to_string())?;
        }
        info!(
            "Opened audio device: {}Hz, {} channel, {} frame buffer",
            obtained.freq, obtained.channels, obtained.samples
        );

        device.resume();
        Ok(Self {
            device,
            sample_rate,
        })
    }

    /// The rate the device is actually running at
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn pause(&mut self) {
        self.device.pause();
    }

    pub fn resume(&mut self) {
        self.device.resume();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sound_traits::{Bank, SynthError};

    struct Constant(i32);

    impl SynthEngine for Constant {
        fn setup(&mut self, _: u32) -> Result<(), SynthError> {
            Ok(())
        }

        fn write_register(&mut self, _: Bank, _: u8, _: u8) {}

        fn generate_samples(&mut self, out: &mut [i32]) {
            out.fill(self.0);
        }
    }

    #[test]
    fn test_callback_converts_to_pcm() {
        let mut cb = SynthCallback::new(SharedSynth::new(Constant(100)), 4);
        let mut out = [1i16; 4];
        cb.callback(&mut out);
        assert_eq!(out, [800; 4]);
    }

    #[test]
    fn test_callback_grows_scratch() {
        let mut cb = SynthCallback::new(SharedSynth::new(Constant(-1)), 0);
        let mut out = [0i16; 64];
        cb.callback(&mut out);
        assert!(out.iter().all(|s| *s == -8));
    }

    #[test]
    fn test_callback_silent_on_poisoned_lock() {
        let synth = SharedSynth::new(Constant(100));
        let poison = synth.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poison.lock();
            panic!("poison the synth lock");
        })
        .join();

        let mut cb = SynthCallback::new(synth, 8);
        let mut out = [5i16; 8];
        cb.callback(&mut out);
        assert_eq!(out, [0; 8]);
    }
}
