//! # OPL3 Emulator
//!
//! A compact emulator of the Yamaha YMF262 (OPL3) register interface with a
//! table driven FM voice renderer. It follows the structure of the DOSBox
//! emulator: a `Chip` owning 18 `Channel`s and 36 `Operator`s, integer-only
//! sample generation and lazily built lookup tables.
//!
//! It is not cycle exact. The aim is that every register a patch editor
//! writes audibly does what the datasheet says it does.
//!
//! ## Register Reference
//!
//! Addresses are 9 bit: bit 8 selects the bank (`0x000` / `0x100`).
//!
//! - `0x01`: Waveform select enable (bit 5)
//! - `0x104`: 4-operator connection select (bits 0-5)
//! - `0x105`: OPL3 enable (bit 0). Bank 1 is ignored while this is clear
//! - `0x20-0x35`: Operator AM/VIB/EG/KSR/MULT
//! - `0x40-0x55`: Operator KSL/TL
//! - `0x60-0x75`: Operator AR/DR
//! - `0x80-0x95`: Operator SL/RR
//! - `0xA0-0xA8`: Channel f-number low byte
//! - `0xB0-0xB8`: Channel key-on, block, f-number high bits
//! - `0xC0-0xC8`: Channel feedback and connection
//! - `0xE0-0xF5`: Operator waveform select
//!
//! Rhythm mode (`0xBD`) is latched but not rendered, and the stereo routing
//! bits of `0xC0` are ignored: output is a mono mix of all voices.
//!
//! ## Usage
//!
//! ```rust
//! use opl3_emulator::Chip;
//!
//! let mut chip = Chip::new();
//! chip.setup(44100).unwrap();
//!
//! chip.write_reg(0x20, 0x01); // Modulator MULT
//! chip.write_reg(0x23, 0x01); // Carrier MULT
//! chip.write_reg(0x43, 0x00); // Carrier full volume
//! chip.write_reg(0x63, 0xF0); // Carrier fast attack
//! chip.write_reg(0xA0, 0x44); // F-number low byte
//! chip.write_reg(0xB0, 0x32); // Key on, block 4
//!
//! let mut output = vec![0i32; 1024];
//! chip.generate_block(&mut output);
//! ```

use std::f64::consts::PI;
use std::sync::OnceLock;

pub mod channel;
pub mod chip;
pub mod operator;

/// The base OPL clock rate in Hz (approximately 49.716 kHz)
pub const OPLRATE: f64 = 14318180.0 / 288.0;

pub const NUM_CHANNELS: usize = 18;
pub const NUM_OPERATORS: usize = 36;

/// Number of bits of the waveform table index
const WAVE_BITS: u32 = 10;
/// Phase accumulator shift down to a table index
const WAVE_SH: u32 = 32 - WAVE_BITS;
const WAVE_LEN: usize = 1 << WAVE_BITS;
/// Peak amplitude of a single operator
const WAVE_PEAK: i32 = 4084;

/// Envelope attenuation is counted in 0.1875dB steps over 9 bits
const ENV_BITS: u32 = 9;
/// Loudest
const ENV_MIN: i32 = 0;
/// Silent
const ENV_MAX: i32 = (1 << ENV_BITS) - 1;
/// Anything at or past this is treated as silence
const ENV_LIMIT: i32 = (12 * 256) >> 3;

/// Rate counter fixed point shift
const RATE_SH: u32 = 24;
const RATE_MASK: u32 = (1 << RATE_SH) - 1;
/// Number of effective envelope rates (4 * rate + key scale offset)
const RATE_COUNT: usize = 64;
/// Multiplication table fixed point shift
const MUL_SH: u32 = 16;

/// Register masks for the 0x20 operator register
const MASK_KSR: u8 = 0x10;
const MASK_SUSTAIN: u8 = 0x20;
const MASK_VIBRATO: u8 = 0x40;
const MASK_TREMOLO: u8 = 0x80;

/// Frequency multiplier, doubled so that MULT 0 (x0.5) stays integral
static FREQ_CREATE_TABLE: [u8; 16] = [1, 2, 4, 6, 8, 10, 12, 14, 16, 18, 20, 20, 24, 24, 30, 30];

/// Lookup table for KSL (Key Scale Level) calculation
static KSL_CREATE_TABLE: [u8; 16] = [64, 32, 24, 19, 16, 12, 11, 10, 8, 6, 5, 4, 3, 2, 1, 0];

/// KSL shift per register setting: off, 3dB, 1.5dB, 6dB per octave
static KSL_SHIFT_TABLE: [u8; 4] = [31, 1, 2, 0];

/// Vibrato deviation steps over one LFO period
static VIBRATO_TABLE: [i32; 8] = [0, 1, 2, 1, 0, -1, -2, -1];

/// Register slot (low 5 bits of an operator register) to operator within a
/// bank. Slots 6, 7, 14 and 15 of every group are unused by the chip.
static SLOT_OPERATOR: [Option<usize>; 32] = [
    Some(0),
    Some(1),
    Some(2),
    Some(3),
    Some(4),
    Some(5),
    None,
    None,
    Some(6),
    Some(7),
    Some(8),
    Some(9),
    Some(10),
    Some(11),
    None,
    None,
    Some(12),
    Some(13),
    Some(14),
    Some(15),
    Some(16),
    Some(17),
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    None,
];

/// Operators (within a bank) making up each channel of that bank
static CHANNEL_OPERATORS: [[usize; 2]; 9] = [
    [0, 3],
    [1, 4],
    [2, 5],
    [6, 9],
    [7, 10],
    [8, 11],
    [12, 15],
    [13, 16],
    [14, 17],
];

/// Channel pairs joined into one voice by the bits of register 0x104
static FOUR_OP_PAIRS: [(usize, usize); 6] = [(0, 3), (1, 4), (2, 5), (9, 12), (10, 13), (11, 14)];

static SIN_TABLE: OnceLock<[i16; WAVE_LEN]> = OnceLock::new();
static MUL_TABLE: OnceLock<[u32; ENV_MAX as usize + 1]> = OnceLock::new();
static KSL_TABLE: OnceLock<[u8; 8 * 16]> = OnceLock::new();

/// Initialize all lookup tables used by the emulator. Called by `Chip::new`,
/// safe to call any number of times from any thread.
pub fn init_tables() {
    sin_table();
    mul_table();
    ksl_table();
}

fn sin_table() -> &'static [i16; WAVE_LEN] {
    SIN_TABLE.get_or_init(|| {
        let mut table = [0i16; WAVE_LEN];
        for (i, v) in table.iter_mut().enumerate() {
            *v = (((i as f64 + 0.5) * (2.0 * PI / WAVE_LEN as f64)).sin() * WAVE_PEAK as f64)
                as i16;
        }
        table
    })
}

fn mul_table() -> &'static [u32; ENV_MAX as usize + 1] {
    MUL_TABLE.get_or_init(|| {
        let mut table = [0u32; ENV_MAX as usize + 1];
        for (i, v) in table.iter_mut().enumerate() {
            // 32 steps of 0.1875dB halve the amplitude
            *v = (0.5 + 2.0_f64.powf(-(i as f64) / 32.0) * (1 << MUL_SH) as f64) as u32;
        }
        table
    })
}

fn ksl_table() -> &'static [u8; 8 * 16] {
    KSL_TABLE.get_or_init(|| {
        let mut table = [0u8; 8 * 16];
        for oct in 0..8 {
            let base: usize = oct * 8;
            for i in 0..16 {
                let val = base.saturating_sub(KSL_CREATE_TABLE[i] as usize);
                table[oct * 16 + i] = (val * 4) as u8;
            }
        }
        table
    })
}

/// Checks if an attenuation value represents silence
pub fn env_silent(x: i32) -> bool {
    x >= ENV_LIMIT
}

/// Amplitude scale for an attenuation in envelope steps
fn attenuation_gain(atten: i32) -> i32 {
    mul_table()[atten.clamp(ENV_MIN, ENV_MAX) as usize] as i32
}

/// Sample one of the 8 OPL3 waveforms. `index` wraps at the table length.
fn wave_sample(wave_form: u8, index: u32) -> i32 {
    let sine = sin_table();
    let i = index as usize & (WAVE_LEN - 1);
    let half = WAVE_LEN / 2;
    let quarter = WAVE_LEN / 4;
    match wave_form & 7 {
        // Sine
        0 => sine[i] as i32,
        // Half sine
        1 if i < half => sine[i] as i32,
        // Absolute sine
        2 => sine[i & (half - 1)] as i32,
        // Quarter sine pulses
        3 if (i / quarter) % 2 == 0 => sine[i & (quarter - 1)] as i32,
        // Alternating sine
        4 if i < half => sine[(i * 2) & (WAVE_LEN - 1)] as i32,
        // Camel sine
        5 if i < half => sine[(i * 2) & (half - 1)] as i32,
        // Square
        6 => {
            if i < half {
                WAVE_PEAK
            } else {
                -WAVE_PEAK
            }
        }
        // Derived square
        7 => {
            if i < half {
                WAVE_PEAK >> (i / 32).min(15)
            } else {
                -(WAVE_PEAK >> ((WAVE_LEN - 1 - i) / 32).min(15))
            }
        }
        _ => 0,
    }
}

/// Envelope phase of an operator
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum EnvelopeState {
    /// Silent, not keyed
    #[default]
    Off,
    /// Volume decreasing after key off
    Release,
    /// Holding at the sustain level
    Sustain,
    /// Volume decreasing towards the sustain level
    Decay,
    /// Volume increasing from silence
    Attack,
}

/// Rate tables derived from the output sample rate
#[derive(Debug, Clone)]
pub(crate) struct RateTables {
    /// Phase increment per f-number unit for each MULT setting
    freq_mul: [u32; 16],
    /// Attack steps per sample, `RATE_SH` fixed point
    attack: [u32; RATE_COUNT],
    /// Decay and release envelope units per sample, `RATE_SH` fixed point
    linear: [u32; RATE_COUNT],
}

impl Default for RateTables {
    fn default() -> Self {
        Self {
            freq_mul: [0; 16],
            attack: [0; RATE_COUNT],
            linear: [0; RATE_COUNT],
        }
    }
}

impl RateTables {
    fn new(rate: u32) -> Self {
        let mut tables = Self::default();
        let rate = rate as f64;

        // A full phase cycle is 2^32, the chip counts f-numbers in 2^-20
        // fractions of its own clock, and MULT is stored doubled.
        for (i, mul) in tables.freq_mul.iter_mut().enumerate() {
            *mul = (0.5 + FREQ_CREATE_TABLE[i] as f64 * OPLRATE / rate * 2048.0) as u32;
        }

        // Rate 1 (index 4) takes 2826ms to attack and 39280ms to decay through
        // 96dB; every 4 indices halve that time.
        for i in 4..RATE_COUNT {
            let scale = 2.0_f64.powf((i as f64 - 4.0) / 4.0);
            let fixed = (1u64 << RATE_SH) as f64;

            tables.attack[i] = if i >= 60 {
                8 << RATE_SH
            } else {
                let samples = 2.82624 / scale * rate;
                (0.5 + 47.0 / samples * fixed) as u32
            };

            let samples = 39.28064 / scale * rate;
            tables.linear[i] = (0.5 + (ENV_MAX + 1) as f64 / samples * fixed) as u32;
        }
        tables
    }
}

/// Tremolo and vibrato oscillators shared by every operator
#[derive(Debug, Default, Clone)]
pub(crate) struct Lfo {
    tremolo_phase: u32,
    tremolo_add: u32,
    vibrato_phase: u32,
    vibrato_add: u32,
    /// Current tremolo attenuation in envelope steps
    tremolo: i32,
    /// Current vibrato step, see `VIBRATO_TABLE`
    vibrato: i32,
}

impl Lfo {
    fn new(rate: u32) -> Self {
        let per_hz = (1u64 << 32) as f64 / rate as f64;
        Self {
            tremolo_add: (3.7 * per_hz) as u32,
            vibrato_add: (6.1 * per_hz) as u32,
            ..Self::default()
        }
    }

    fn advance(&mut self) {
        self.tremolo_phase = self.tremolo_phase.wrapping_add(self.tremolo_add);
        self.vibrato_phase = self.vibrato_phase.wrapping_add(self.vibrato_add);

        // Triangle of 0..=26 steps (4.8dB), scaled down to the 1dB depth
        let t = (self.tremolo_phase >> 24) as i32;
        let tri = if t < 128 { t } else { 255 - t };
        self.tremolo = (tri * 26 / 127) >> 2;
        self.vibrato = VIBRATO_TABLE[(self.vibrato_phase >> 29) as usize];
    }
}

/// A single FM operator: a phase generator, an envelope generator and a
/// waveform lookup. Operators are owned by the `Chip` and grouped into voices
/// by the channel tables.
#[derive(Debug, Clone)]
pub struct Operator {
    /// Register 0x20 value (AM/VIB/EG/KSR/MULT)
    reg20: u8,
    /// Register 0x40 value (KSL/TL)
    reg40: u8,
    /// Register 0x60 value (AR/DR)
    reg60: u8,
    /// Register 0x80 value (SL/RR)
    reg80: u8,
    /// Register 0xE0 value (waveform select)
    reg_e0: u8,
    wave_form: u8,
    /// Phase accumulator, a full cycle is 2^32
    phase: u32,
    phase_add: u32,
    /// Phase deviation per vibrato step
    vibrato_depth: u32,
    /// Phase increment per f-number unit for the current MULT
    freq_mul: u32,
    /// F-number and block of the channel driving this operator
    fnum: u16,
    block: u8,
    /// Total level plus key scaling, in envelope steps
    total_level: i32,
    sustain_level: i32,
    /// Current envelope attenuation
    volume: i32,
    state: EnvelopeState,
    attack_add: u32,
    decay_add: u32,
    release_add: u32,
    /// Fractional envelope steps carried between samples
    rate_counter: u32,
    /// Key scale rate offset currently applied
    ksr: u8,
    key_on: bool,
}

impl Default for Operator {
    fn default() -> Self {
        Self {
            reg20: 0,
            reg40: 0,
            reg60: 0,
            reg80: 0,
            reg_e0: 0,
            wave_form: 0,
            phase: 0,
            phase_add: 0,
            vibrato_depth: 0,
            freq_mul: 0,
            fnum: 0,
            block: 0,
            total_level: 0,
            sustain_level: 0,
            volume: ENV_MAX,
            state: EnvelopeState::Off,
            attack_add: 0,
            decay_add: 0,
            release_add: 0,
            rate_counter: 0,
            ksr: 0,
            key_on: false,
        }
    }
}

/// One 2-operator voice slot. Frequency, key-on and the operator connection
/// live here; the operators themselves are indexed through
/// `CHANNEL_OPERATORS`.
#[derive(Debug, Default, Clone)]
pub struct Channel {
    /// Chip-wide indices of the two operators
    ops: [usize; 2],
    fnum: u16,
    block: u8,
    key_on: bool,
    /// Feedback amount 0-7 for the first operator
    feedback: u8,
    /// Connection bit: `false` for FM, `true` for additive
    additive: bool,
    /// Register 0xC0 value
    reg_c0: u8,
    /// Previous first-operator output samples for feedback
    old: [i32; 2],
}

/// How a channel takes part in 4-operator mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum VoiceRole {
    /// Plain 2-operator channel
    Single,
    /// First channel of a joined pair, carrying the frequency and key-on
    Primary(usize),
    /// Second channel of a joined pair, silent on its own
    Secondary,
}

/// The OPL3 chip: 18 channels, 36 operators and the global registers.
#[derive(Debug, Clone)]
pub struct Chip {
    /// Output sample rate, 0 until `setup` succeeds
    rate: u32,
    tables: RateTables,
    lfo: Lfo,
    chan: [Channel; NUM_CHANNELS],
    ops: [Operator; NUM_OPERATORS],
    /// Register 0x104 value (4-op connection select)
    reg104: u8,
    /// Register 0xBD value (rhythm mode, unused)
    reg_bd: u8,
    /// Waveform select mask from register 0x01
    wave_form_mask: u8,
    /// Register 0x105 bit 0
    opl3_active: bool,
}

impl Default for Chip {
    fn default() -> Self {
        Self {
            rate: 0,
            tables: RateTables::default(),
            lfo: Lfo::default(),
            chan: std::array::from_fn(Channel::new),
            ops: std::array::from_fn(|_| Operator::default()),
            reg104: 0,
            reg_bd: 0,
            wave_form_mask: 0,
            opl3_active: false,
        }
    }
}
