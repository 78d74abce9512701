//! # JSON API
//!
//! Document-level entry points for collaborators that speak JSON (the editor
//! UI, the command line). Each call reads a score document, runs the engine,
//! and writes a fresh document; the input text is never reused.
//!
//! ## Functions
//!
//! - [`score_from_json()`] / [`score_to_json()`] - persistence boundary
//! - [`insert_json()`] - insert a note into a bar-oriented score
//! - [`layout_json()`] - lay every track out as rows of bars
//! - [`breakdown_json()`] - the same rows, cut into printable note lengths
//!
//! Bar-oriented scores are laid out as a single track named `main`, using the
//! score's own `beatsPerBar`. Track scores use the configured bar length.
//!
//! ## Typical Usage
//!
//! ```rust
//! use timeslice::api::insert_json;
//! use timeslice::EngineConfig;
//!
//! let doc = r#"{"key":"C","tempo":120,"beatsPerBar":4,
//!               "bars":[{"barNumber":1,"slots":[{"beat":0,"duration":4,"note":""}]}]}"#;
//!
//! let out = insert_json(doc, 1, 0.0, "E4", 1.0, &EngineConfig::default())?;
//! assert!(out.contains(r#""nextBeat": 1.0"#));
//! # Ok::<(), timeslice::SliceError>(())
//! ```

use log::debug;
use serde::Serialize;

use crate::breakdown::break_down_notes_within_bar;
use crate::config::EngineConfig;
use crate::error::SliceError;
use crate::insert::insert_score;
use crate::layout::{layout_rows, BarView};
use crate::model::{BarScore, Payload, Score};

/// Track id used when laying out a bar-oriented score.
pub const BAR_SCORE_TRACK_ID: &str = "main";

/// Rows of bars for one track.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackLayout {
    pub id: String,
    pub beats_per_bar: f64,
    pub rows: Vec<Vec<BarView>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertResponse {
    score: BarScore,
    next_bar_number: usize,
    next_beat: f64,
}

/// Read a score document in either form.
pub fn score_from_json(json: &str) -> Result<Score, SliceError> {
    serde_json::from_str(json).map_err(|e| SliceError::SerializationError(e.to_string()))
}

/// Write a score document, pretty-printed.
pub fn score_to_json(score: &Score) -> Result<String, SliceError> {
    to_json(score)
}

fn to_json<T: Serialize>(value: &T) -> Result<String, SliceError> {
    serde_json::to_string_pretty(value).map_err(|e| SliceError::SerializationError(e.to_string()))
}

/// Insert `content` at `bar_number` / `beat` and return
/// `{ score, nextBarNumber, nextBeat }`.
///
/// The new payload takes the kind of the slot it lands on, so a chord score
/// gets a chord and a lyric score gets text. `notes` content is a list
/// separated by spaces or commas.
///
/// # Errors
/// [`SliceError::SerializationError`] for unreadable documents or track
/// scores; otherwise whatever [`insert_score`] reports.
pub fn insert_json(
    score_json: &str,
    bar_number: usize,
    beat: f64,
    content: &str,
    duration: f64,
    config: &EngineConfig,
) -> Result<String, SliceError> {
    let mut score = match score_from_json(score_json)? {
        Score::Bars(score) => score,
        Score::Tracks(_) => {
            return Err(SliceError::SerializationError(
                "insertion needs a bar-oriented score".to_string(),
            ))
        }
    };

    let payload = score
        .bar(bar_number)
        .and_then(|bar| bar.slots.iter().find(|slot| slot.starts_at(beat)))
        .map_or_else(|| Payload::note(content), |slot| slot.payload.with_content(content));

    let insertion = insert_score(
        &score,
        bar_number,
        beat,
        payload,
        duration,
        &config.allowed_durations,
    )?;
    score.bars = insertion.bars;

    to_json(&InsertResponse {
        score,
        next_bar_number: insertion.next_bar_number,
        next_beat: insertion.next_beat,
    })
}

/// Lay out every track of `score` as display rows.
pub fn layout_score(score: &Score, config: &EngineConfig) -> Result<Vec<TrackLayout>, SliceError> {
    match score {
        Score::Bars(score) => {
            let slots = score.to_track_slots();
            let rows = layout_rows(&slots, score.beats_per_bar, config.bars_per_row)?;
            Ok(vec![TrackLayout {
                id: BAR_SCORE_TRACK_ID.to_string(),
                beats_per_bar: score.beats_per_bar,
                rows,
            }])
        }
        Score::Tracks(score) => score
            .tracks
            .iter()
            .map(|track| {
                debug!("layout_score: track {} ({} slots)", track.id, track.slots.len());
                Ok(TrackLayout {
                    id: track.id.clone(),
                    beats_per_bar: config.beats_per_bar,
                    rows: layout_rows(&track.slots, config.beats_per_bar, config.bars_per_row)?,
                })
            })
            .collect(),
    }
}

/// Replace every bar's slots with their printable pieces.
pub fn break_down_layout(layouts: Vec<TrackLayout>) -> Vec<TrackLayout> {
    layouts
        .into_iter()
        .map(|mut layout| {
            for bar in layout.rows.iter_mut().flatten() {
                bar.slots = break_down_notes_within_bar(&bar.slots);
            }
            layout
        })
        .collect()
}

/// Layout of a score document as JSON.
pub fn layout_json(score_json: &str, config: &EngineConfig) -> Result<String, SliceError> {
    let score = score_from_json(score_json)?;
    to_json(&layout_score(&score, config)?)
}

/// Printable breakdown of a score document as JSON.
pub fn breakdown_json(score_json: &str, config: &EngineConfig) -> Result<String, SliceError> {
    let score = score_from_json(score_json)?;
    to_json(&break_down_layout(layout_score(&score, config)?))
}
