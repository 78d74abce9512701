//! Time-slicing engine for bar- and track-based music notation.
//!
//! Notes, chords, and lyrics live in slots on a beat-line. The engine keeps
//! that timeline consistent while notes of arbitrary length are written into
//! it, and cuts it into bars and printable note lengths for display.

pub mod api;
pub mod breakdown;
pub mod config;
pub mod degree;
pub mod duration;
pub mod error;
pub mod insert;
pub mod layout;
pub mod model;
pub mod replace;
pub mod semantic;

pub use api::{breakdown_json, insert_json, layout_json, score_from_json, score_to_json};
pub use breakdown::break_down_notes_within_bar;
pub use config::EngineConfig;
pub use duration::{classify, is_dotted, underline_count, AllowedDurations, NoteValue, VOCABULARY};
pub use error::*;
pub use insert::{insert_score, split_slot, Insertion, SplitResult};
pub use layout::{
    layout_rows, merge_bars_into_track, split_bars_into_rows, split_notes_into_bars, BarView,
    SlotView,
};
pub use model::*;
pub use replace::replace_or_insert_slot;
pub use semantic::{validate_bars, validate_score, validate_track};
