//! Serialising dirty entities into the synthesis engine.

use log::{debug, warn};
use sound_traits::{SharedSynth, SynthEngine};

use crate::codec::{RegisterWrite, encode_channel, encode_operator};
use crate::index::{ChannelId, OperatorId};
use crate::store::ParameterStore;

/// What one flush wrote
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub channels: usize,
    pub operators: usize,
}

impl FlushReport {
    pub fn is_empty(&self) -> bool {
        self.channels == 0 && self.operators == 0
    }

    /// Total register writes issued
    pub fn writes(&self) -> usize {
        self.channels * 3 + self.operators * 4
    }
}

fn write_all<E: SynthEngine + ?Sized>(engine: &mut E, writes: &[RegisterWrite]) {
    for w in writes {
        engine.write_register(w.bank, w.register, w.value);
    }
}

/// Write every dirty channel, then every dirty operator (ascending), to
/// `engine` and clear their dirty flags.
///
/// The caller must hold exclusive access to the engine for the whole call so
/// that a batch never interleaves with sample generation.
pub fn flush<E: SynthEngine + ?Sized>(store: &mut ParameterStore, engine: &mut E) -> FlushReport {
    let mut report = FlushReport::default();

    for id in ChannelId::all() {
        if !store.is_channel_dirty(id) {
            continue;
        }
        write_all(engine, &encode_channel(store.channel(id), id.address()));
        store.clear_channel_dirty(id);
        report.channels += 1;
    }

    for id in OperatorId::all() {
        if !store.is_operator_dirty(id) {
            continue;
        }
        write_all(engine, &encode_operator(store.operator(id), id.address()));
        store.clear_operator_dirty(id);
        report.operators += 1;
    }

    if !report.is_empty() {
        debug!(
            "Flushed {} channels, {} operators",
            report.channels, report.operators
        );
    }
    report
}

/// `flush` inside one lock scope of a shared engine. If the lock is poisoned
/// nothing is written and the dirty flags stay set.
pub fn flush_shared<E: SynthEngine>(
    store: &mut ParameterStore,
    synth: &SharedSynth<E>,
) -> Option<FlushReport> {
    if !store.has_dirty() {
        return Some(FlushReport::default());
    }
    let report = synth.with_engine(|engine| flush(store, engine));
    if report.is_none() {
        warn!("Skipping register flush, synth unavailable");
    }
    report
}

/// Issue raw writes (chip setup) through the shared engine lock
pub fn write_shared<E: SynthEngine>(synth: &SharedSynth<E>, writes: &[RegisterWrite]) -> bool {
    synth
        .with_engine(|engine| write_all(engine, writes))
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_chip_setup;
    use crate::editor::{EditCommand, Editor};
    use crate::index::Model;
    use crate::param::{ChannelParam, OperatorParam};
    use sound_traits::{Bank, SynthError};

    /// Records writes as `(bank, register, value)`
    #[derive(Default)]
    struct Recorder(Vec<(Bank, u8, u8)>);

    impl SynthEngine for Recorder {
        fn setup(&mut self, _: u32) -> Result<(), SynthError> {
            Ok(())
        }

        fn write_register(&mut self, bank: Bank, register: u8, value: u8) {
            self.0.push((bank, register, value));
        }

        fn generate_samples(&mut self, out: &mut [i32]) {
            out.fill(0);
        }
    }

    #[test]
    fn test_flush_clean_store_writes_nothing() {
        let mut store = ParameterStore::new();
        let mut engine = Recorder::default();
        let report = flush(&mut store, &mut engine);
        assert!(report.is_empty());
        assert!(engine.0.is_empty());
    }

    #[test]
    fn test_f_number_scenario() {
        let mut store = ParameterStore::new();
        let mut editor = Editor::default();
        let mut engine = Recorder::default();

        editor.apply(&mut store, EditCommand::SelectChannel(3));
        editor.apply(
            &mut store,
            EditCommand::SelectParameter(ChannelParam::FNumber.into()),
        );
        editor.apply(&mut store, EditCommand::Set(0x3FF));
        let report = flush(&mut store, &mut engine);

        assert_eq!(
            report,
            FlushReport {
                channels: 1,
                operators: 0
            }
        );
        assert_eq!(
            engine.0,
            vec![
                (Bank::Primary, 0xA3, 0xFF),
                (Bank::Primary, 0xB3, 0x03),
                (Bank::Primary, 0xC3, 0x00),
            ]
        );
        assert!(!store.has_dirty());
    }

    #[test]
    fn test_flag_stays_clear_until_next_change() {
        let mut store = ParameterStore::new();
        let mut editor = Editor::default();
        let mut engine = Recorder::default();
        editor.select_parameter(ChannelParam::Octave.into());
        editor.set_parameter(&mut store, 2);
        flush(&mut store, &mut engine);

        editor.set_parameter(&mut store, 2);
        assert!(flush(&mut store, &mut engine).is_empty());
        assert_eq!(engine.0.len(), 3);

        editor.set_parameter(&mut store, 3);
        assert_eq!(flush(&mut store, &mut engine).channels, 1);
        assert_eq!(engine.0.len(), 6);
    }

    #[test]
    fn test_repeated_changes_collapse() {
        let mut store = ParameterStore::new();
        let mut editor = Editor::default();
        let mut engine = Recorder::default();
        editor.select_parameter(ChannelParam::FNumber.into());
        for _ in 0..10 {
            editor.step_parameter(&mut store, 1);
        }
        flush(&mut store, &mut engine);
        assert_eq!(engine.0.len(), 3);
        assert_eq!(engine.0[0], (Bank::Primary, 0xA0, 10));
    }

    #[test]
    fn test_key_press_release_before_flush() {
        let mut store = ParameterStore::new();
        let mut editor = Editor::default();
        let mut engine = Recorder::default();
        editor.apply(&mut store, EditCommand::KeyOn);
        editor.apply(&mut store, EditCommand::KeyOff);
        flush(&mut store, &mut engine);
        // Last write wins, nothing is queued
        assert!(engine.0.iter().all(|(_, reg, value)| *reg != 0xB0 || value & 0x20 == 0));
    }

    #[test]
    fn test_channels_before_operators_ascending() {
        let mut store = ParameterStore::new();
        let mut editor = Editor::default();
        let mut engine = Recorder::default();

        editor.select_channel(10);
        editor.select_operator_slot(1);
        editor.select_parameter(OperatorParam::Attack.into());
        editor.set_parameter(&mut store, 0xF);
        editor.select_parameter(ChannelParam::Octave.into());
        editor.set_parameter(&mut store, 1);
        editor.select_channel(1);
        editor.set_parameter(&mut store, 1);

        let report = flush(&mut store, &mut engine);
        assert_eq!(report.writes(), engine.0.len());
        let order: Vec<(Bank, u8)> = engine.0.iter().map(|(b, r, _)| (*b, *r)).collect();
        assert_eq!(
            order,
            vec![
                (Bank::Primary, 0xA1),
                (Bank::Primary, 0xB1),
                (Bank::Primary, 0xC1),
                (Bank::Secondary, 0xA1),
                (Bank::Secondary, 0xB1),
                (Bank::Secondary, 0xC1),
                // Operator 22 is the carrier of channel 10
                (Bank::Secondary, 0x24),
                (Bank::Secondary, 0x44),
                (Bank::Secondary, 0x64),
                (Bank::Secondary, 0x84),
            ]
        );
    }

    #[test]
    fn test_flush_shared() {
        let synth = SharedSynth::new(Recorder::default());
        let mut store = ParameterStore::new();
        store.load_default_patch(ChannelId::new(0).unwrap());

        assert!(write_shared(&synth, &encode_chip_setup(Model::FourOp)));
        let report = flush_shared(&mut store, &synth).unwrap();
        assert_eq!(report.operators, 2);

        let engine = synth.lock().unwrap();
        assert_eq!(engine.0.len(), 3 + 8);
        assert_eq!(engine.0[3], (Bank::Primary, 0x20, 0x68));
        assert_eq!(engine.0[7], (Bank::Primary, 0x23, 0x22));
        assert_eq!(engine.0[10], (Bank::Primary, 0x83, 0x44));
    }

    #[test]
    fn test_poisoned_lock_keeps_flags() {
        let synth = SharedSynth::new(Recorder::default());
        let poison = synth.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poison.lock();
            panic!("poison the synth lock");
        })
        .join();

        let mut store = ParameterStore::new();
        store.load_default_patch(ChannelId::new(0).unwrap());
        assert_eq!(flush_shared(&mut store, &synth), None);
        assert!(store.has_dirty());
    }
}
