use argh::FromArgs;
use patch::Model;

/// A live patch editor for the OPL3 FM chip
#[derive(Debug, Clone, FromArgs)]
pub struct CLIOptions {
    /// verbose level: off, error, warn, info, debug
    #[argh(option)]
    pub verbose: Option<log::LevelFilter>,
    /// operator model <two-op, four-op>
    #[argh(option)]
    pub model: Option<Model>,
    /// audio output rate in Hz
    #[argh(option)]
    pub sample_rate: Option<u32>,
    /// audio buffer size in frames
    #[argh(option)]
    pub buffer_size: Option<u16>,
    /// run without opening an audio device, register writes are only logged
    #[argh(switch)]
    pub no_audio: bool,
}
