//! # Semantic Validation Module
//!
//! Checks that bars and tracks satisfy the model invariants.
//!
//! ## Validation Rules
//!
//! ### Bars
//! - Bar numbers run 1, 2, 3, ... with no holes
//! - Slots are sorted by beat and start inside the bar
//! - No two slots overlap and none leaves a gap
//! - Slot durations add up to exactly `beatsPerBar`
//!
//! ### Tracks
//! - Slots are sorted by beat
//! - Each slot ends exactly where the next one starts
//! - Durations are positive
//!
//! The engine's mutators keep these invariants; validation is for documents
//! coming from outside (persistence, other editors).
//!
//! ## Example
//! ```rust
//! use timeslice::{validate_bars, BarScore};
//!
//! let score = BarScore::empty("C", 120.0, 4.0, 2);
//! assert!(validate_bars(&score).is_ok());
//! ```

use crate::duration::{approx_eq, EPSILON, MAX_TRACK_BEATS};
use crate::error::SliceError;
use crate::model::{Bar, BarScore, Score, Slot};

/// Validate either score form: bar invariants for bar scores, the track
/// invariant for every track of a track score.
pub fn validate_score(score: &Score) -> Result<(), SliceError> {
    match score {
        Score::Bars(score) => validate_bars(score),
        Score::Tracks(score) => score
            .tracks
            .iter()
            .try_for_each(|track| validate_track(&track.slots)),
    }
}

/// Validate every bar of a bar-oriented score.
pub fn validate_bars(score: &BarScore) -> Result<(), SliceError> {
    if !score.beats_per_bar.is_finite() || score.beats_per_bar <= EPSILON {
        return Err(SliceError::InvalidBeatsPerBar(score.beats_per_bar));
    }

    let length = score.bars.len() as f64 * score.beats_per_bar;
    if length > MAX_TRACK_BEATS {
        return Err(SliceError::SemanticError {
            bar: score.bars.len(),
            message: format!(
                "Score spans {} beats, over the {} beat limit",
                length, MAX_TRACK_BEATS
            ),
        });
    }

    for (i, bar) in score.bars.iter().enumerate() {
        let expected_number = i + 1;
        if bar.bar_number != expected_number {
            return Err(SliceError::SemanticError {
                bar: expected_number,
                message: format!(
                    "Bar numbers must be contiguous: expected {}, found {}",
                    expected_number, bar.bar_number
                ),
            });
        }
        validate_bar(bar, score.beats_per_bar)?;
    }

    Ok(())
}

/// Validate a single bar against the bar length.
pub fn validate_bar(bar: &Bar, beats_per_bar: f64) -> Result<(), SliceError> {
    let mut expected_beat = 0.0;

    for slot in &bar.slots {
        check_slot_duration(slot, bar.bar_number)?;
        if !approx_eq(slot.beat, expected_beat) {
            return Err(SliceError::SemanticError {
                bar: bar.bar_number,
                message: gap_or_overlap_message(expected_beat, slot.beat),
            });
        }
        expected_beat = slot.end();
    }

    let total = bar.total_duration();
    if !approx_eq(total, beats_per_bar) {
        return Err(SliceError::SemanticError {
            bar: bar.bar_number,
            message: format!(
                "Bar duration mismatch: expected {} beats, got {} beats",
                beats_per_bar, total
            ),
        });
    }

    Ok(())
}

/// Validate a track's slot list.
///
/// Errors report bar 0 since tracks are not divided into bars.
pub fn validate_track(slots: &[Slot]) -> Result<(), SliceError> {
    for slot in slots {
        check_slot_duration(slot, 0)?;
    }

    for pair in slots.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        if !approx_eq(current.end(), next.beat) {
            return Err(SliceError::SemanticError {
                bar: 0,
                message: gap_or_overlap_message(current.end(), next.beat),
            });
        }
    }

    Ok(())
}

fn check_slot_duration(slot: &Slot, bar: usize) -> Result<(), SliceError> {
    if !slot.duration.is_finite() || slot.duration <= EPSILON {
        return Err(SliceError::SemanticError {
            bar,
            message: format!("Slot at beat {} has invalid duration {}", slot.beat, slot.duration),
        });
    }
    if !slot.beat.is_finite() || slot.beat < -EPSILON {
        return Err(SliceError::SemanticError {
            bar,
            message: format!("Slot has invalid beat {}", slot.beat),
        });
    }
    if slot.end() > MAX_TRACK_BEATS {
        return Err(SliceError::SemanticError {
            bar,
            message: format!(
                "Slot at beat {} ends past the {} beat limit",
                slot.beat, MAX_TRACK_BEATS
            ),
        });
    }
    Ok(())
}

fn gap_or_overlap_message(expected: f64, found: f64) -> String {
    if found > expected {
        format!("Gap between beat {} and beat {}", expected, found)
    } else {
        format!("Slot at beat {} overlaps the previous slot ending at {}", found, expected)
    }
}
