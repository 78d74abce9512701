//! # Bar Insertion
//!
//! Insert a note of any length into a bar-oriented score, starting at a
//! bar/beat position.
//!
//! ## Algorithm
//! 1. Find the slot that starts at `(bar, beat)`
//! 2. [`split_slot`] it with the duration still to place
//! 3. Put the returned fragments in place of the slot
//! 4. Advance the cursor by what was placed; if time remains, continue at the
//!    next slot, wrapping into the next bar at `beatsPerBar`
//! 5. When the cursor leaves the last bar, a new bar with one empty slot is
//!    appended, so the returned cursor always names an existing bar
//!
//! Every fragment after the first is marked `sustain`. The slot right after
//! the inserted note starts a new sound and has `sustain` cleared.
//!
//! The loop ends because each pass either places a positive amount of time or
//! appends a bar of positive length that the next pass consumes from.
//!
//! ## Example
//! ```rust
//! use timeslice::{insert_score, AllowedDurations, BarScore, Payload};
//!
//! let score = BarScore::empty("C", 120.0, 4.0, 1);
//! let allowed = AllowedDurations::default();
//! let result = insert_score(&score, 1, 0.0, Payload::note("C4"), 6.0, &allowed).unwrap();
//!
//! assert_eq!(result.bars.len(), 2);
//! assert_eq!(result.bars[0].slots[0].duration, 4.0);
//! assert!(result.bars[1].slots[0].sustain);
//! assert_eq!((result.next_bar_number, result.next_beat), (2, 2.0));
//! ```

use log::{debug, trace};
use serde::Serialize;

use crate::duration::{
    check_beat, check_duration, round_beats, AllowedDurations, EPSILON, MAX_BARS, MAX_TRACK_BEATS,
};
use crate::error::SliceError;
use crate::model::{Bar, BarScore, Payload, Slot};

/// Fragments produced by [`split_slot`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitResult {
    /// Replacement for the split slot; the inserted portion comes first.
    pub new_slots: Vec<Slot>,
    /// Time still to place in the following slots.
    pub remaining_duration: f64,
}

/// Outcome of [`insert_score`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insertion {
    pub bars: Vec<Bar>,
    /// Cursor position right after the inserted note.
    pub next_bar_number: usize,
    pub next_beat: f64,
}

/// Write `payload` over the start of `slot` for up to `inserted_duration` beats.
///
/// - If the insertion covers the slot, the whole slot takes the new payload and
///   the uncovered part of `inserted_duration` is returned as `remaining_duration`.
/// - Otherwise the slot is split into the inserted portion followed by the rest
///   of the old slot, decomposed with `allowed` and keeping the old payload.
///   The first rest fragment is a fresh onset; later ones are sustained.
///
/// # Errors
/// [`SliceError::UnfillableGap`] if the rest of the slot cannot be decomposed.
pub fn split_slot(
    slot: &Slot,
    payload: &Payload,
    inserted_duration: f64,
    allowed: &AllowedDurations,
    sustain: bool,
) -> Result<SplitResult, SliceError> {
    let inserted_duration = round_beats(check_duration(inserted_duration)?);

    if inserted_duration >= slot.duration - EPSILON {
        return Ok(SplitResult {
            new_slots: vec![Slot {
                beat: slot.beat,
                duration: slot.duration,
                payload: payload.clone(),
                sustain,
            }],
            remaining_duration: round_beats(inserted_duration - slot.duration).max(0.0),
        });
    }

    let gap = round_beats(slot.duration - inserted_duration);
    let pieces = allowed.decompose(gap)?;
    trace!("split_slot: gap of {} beats -> {:?}", gap, pieces);

    let mut new_slots = Vec::with_capacity(pieces.len() + 1);
    new_slots.push(Slot {
        beat: slot.beat,
        duration: inserted_duration,
        payload: payload.clone(),
        sustain,
    });

    let mut beat = round_beats(slot.beat + inserted_duration);
    for (i, piece) in pieces.into_iter().enumerate() {
        new_slots.push(Slot {
            beat,
            duration: piece,
            payload: slot.payload.clone(),
            sustain: i > 0 && !slot.payload.is_empty(),
        });
        beat = round_beats(beat + piece);
    }

    Ok(SplitResult {
        new_slots,
        remaining_duration: 0.0,
    })
}

/// Insert `payload` lasting `duration` beats at `bar_number` (1-indexed) / `slot_beat`.
///
/// Returns the updated bars and the cursor position after the note. An empty
/// payload is a no-op: the bars come back unchanged with the cursor where it was.
/// The input score is never modified.
///
/// # Errors
/// - [`SliceError::PositionNotFound`] when no slot starts at the target
/// - [`SliceError::UnfillableGap`] when a split slot cannot be re-tiled
/// - [`SliceError::InvalidDuration`] / [`SliceError::InvalidBeatsPerBar`] for bad numbers,
///   including a note longer than [`MAX_TRACK_BEATS`] or one that would grow the
///   score past [`MAX_BARS`] bars
pub fn insert_score(
    score: &BarScore,
    bar_number: usize,
    slot_beat: f64,
    payload: Payload,
    duration: f64,
    allowed: &AllowedDurations,
) -> Result<Insertion, SliceError> {
    if payload.is_empty() {
        debug!("insert_score: empty payload, nothing to do");
        return Ok(Insertion {
            bars: score.bars.clone(),
            next_bar_number: bar_number,
            next_beat: slot_beat,
        });
    }

    let beats_per_bar = score.beats_per_bar;
    if !beats_per_bar.is_finite() || beats_per_bar <= EPSILON {
        return Err(SliceError::InvalidBeatsPerBar(beats_per_bar));
    }
    let mut remaining = round_beats(check_duration(duration)?);
    if remaining > MAX_TRACK_BEATS {
        return Err(SliceError::InvalidDuration(duration));
    }
    let mut beat = round_beats(check_beat(slot_beat)?);
    debug!(
        "insert_score: {} {} beats at bar {} beat {}",
        payload.kind_name(),
        remaining,
        bar_number,
        beat
    );

    let mut bars = score.bars.clone();
    let mut bar_index = bar_number
        .checked_sub(1)
        .filter(|&index| index < bars.len())
        .ok_or(SliceError::PositionNotFound {
            bar: bar_number,
            beat,
        })?;

    let mut first = true;
    loop {
        let bar = &mut bars[bar_index];
        let slot_index = bar.slot_index_at(beat).ok_or(SliceError::PositionNotFound {
            bar: bar_index + 1,
            beat,
        })?;

        let split = split_slot(&bar.slots[slot_index], &payload, remaining, allowed, !first)?;
        let placed = split.new_slots[0].duration;
        trace!(
            "placed {} beats at bar {} beat {}, {} remaining",
            placed,
            bar_index + 1,
            beat,
            split.remaining_duration
        );
        bar.slots.splice(slot_index..=slot_index, split.new_slots);

        remaining = split.remaining_duration;
        beat = round_beats(beat + placed);
        first = false;

        if beat >= beats_per_bar - EPSILON {
            bar_index += 1;
            beat = round_beats(beat - beats_per_bar).max(0.0);
            if bar_index == bars.len() {
                if bars.len() >= MAX_BARS {
                    return Err(SliceError::InvalidDuration(duration));
                }
                debug!("insert_score: appending bar {}", bar_index + 1);
                bars.push(Bar::empty(bar_index + 1, beats_per_bar, &payload));
            }
        }

        if remaining <= EPSILON {
            break;
        }
    }

    clear_sustain_at(&mut bars[bar_index], beat);

    Ok(Insertion {
        bars,
        next_bar_number: bar_index + 1,
        next_beat: beat,
    })
}

/// The slot starting at `beat` follows a freshly inserted note, so it is an onset.
fn clear_sustain_at(bar: &mut Bar, beat: f64) {
    if let Some(index) = bar.slot_index_at(beat) {
        bar.slots[index].sustain = false;
    }
}

impl BarScore {
    /// Insert a note, updating this score and returning the next cursor position.
    ///
    /// The score is only updated when the insertion succeeds.
    pub fn insert(
        &mut self,
        bar_number: usize,
        slot_beat: f64,
        payload: Payload,
        duration: f64,
        allowed: &AllowedDurations,
    ) -> Result<(usize, f64), SliceError> {
        let insertion = insert_score(self, bar_number, slot_beat, payload, duration, allowed)?;
        self.bars = insertion.bars;
        Ok((insertion.next_bar_number, insertion.next_beat))
    }
}
