//! Logical patch state of an OPL3 chip and the protocol that keeps the chip
//! in sync with it.
//!
//! - `store`: every channel and operator, masked to register widths, with a
//!   dirty flag per entity
//! - `editor`: select/set/step commands applied through one cursor
//! - `codec`: packing into the chip's register layout
//! - `flush`: writing dirty entities into a `SynthEngine` under its lock
//!
//! ```rust
//! use patch::{Editor, EditCommand, ChannelParam, ParameterStore, flush};
//! # use sound_traits::{Bank, SynthEngine, SynthError};
//! # struct Dummy;
//! # impl SynthEngine for Dummy {
//! #     fn setup(&mut self, _: u32) -> Result<(), SynthError> { Ok(()) }
//! #     fn write_register(&mut self, _: Bank, _: u8, _: u8) {}
//! #     fn generate_samples(&mut self, out: &mut [i32]) { out.fill(0) }
//! # }
//! # let mut engine = Dummy;
//!
//! let mut store = ParameterStore::new();
//! let mut editor = Editor::default();
//! editor.apply(&mut store, EditCommand::SelectParameter(ChannelParam::FNumber.into()));
//! editor.apply(&mut store, EditCommand::Set(0x244));
//! let report = flush(&mut store, &mut engine);
//! assert_eq!(report.channels, 1);
//! ```

pub mod codec;
pub mod editor;
pub mod flush;
pub mod index;
pub mod param;
pub mod snapshot;
pub mod store;

pub use codec::{RegisterWrite, encode_channel, encode_chip_setup, encode_operator};
pub use editor::{Cursor, EditCommand, Editor};
pub use flush::{FlushReport, flush, flush_shared, write_shared};
pub use index::{ChannelId, Model, OperatorId, RegisterAddress};
pub use param::{ChannelParam, OperatorParam, Param};
pub use snapshot::Snapshot;
pub use store::{ChannelState, OperatorState, ParameterStore};
