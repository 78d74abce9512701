//! # Slot Replacement
//!
//! Replace or insert one slot on a continuous track, resolving duration
//! conflicts with the slots around it.
//!
//! ## Cases
//! With `new` landing on an existing slot `old` that starts at the same beat:
//! - **Same length** - `old` is replaced
//! - **Shorter** - `old` shrinks by `new.duration` and moves forward; `new` goes in front
//! - **Longer** - following slots are consumed until `new.duration` is covered;
//!   the unconsumed tail of the last one is kept right after `new`
//!
//! When no slot starts at `new.beat`:
//! - a slot that straddles the beat is cut in two there, then the cases above apply
//! - a beat before the first slot gets a rest up to that slot, then the cases above apply
//! - a beat at or past the end of the track appends `new`, with a rest filling any gap
//!
//! The slot that ends up right after `new` is an onset again, so its `sustain`
//! flag is cleared.
//!
//! ## Errors
//! - [`SliceError::InsufficientTrackLength`] when `new` runs past the last slot
//! - [`SliceError::InvalidDuration`] for a non-positive duration or negative beat
//!
//! ## Example
//! ```rust
//! use timeslice::{replace_or_insert_slot, Slot};
//!
//! let slots = vec![Slot::note(0.0, 2.0, "C4"), Slot::note(2.0, 2.0, "D4")];
//! let result = replace_or_insert_slot(&slots, Slot::note(0.0, 1.0, "E4")).unwrap();
//!
//! assert_eq!(result[0], Slot::note(0.0, 1.0, "E4"));
//! assert_eq!(result[1], Slot::note(1.0, 1.0, "C4"));
//! assert_eq!(result[2], Slot::note(2.0, 2.0, "D4"));
//! ```

use log::{debug, trace, warn};

use crate::duration::{approx_eq, check_beat, check_duration, round_beats, EPSILON};
use crate::error::SliceError;
use crate::model::{Slot, Track};

/// Replace or insert `new_slot` in a sorted slot list, returning the new list.
///
/// The input is never modified; on error nothing has changed.
pub fn replace_or_insert_slot(slots: &[Slot], new_slot: Slot) -> Result<Vec<Slot>, SliceError> {
    let beat = round_beats(check_beat(new_slot.beat)?);
    let duration = round_beats(check_duration(new_slot.duration)?);
    let new_slot = Slot {
        beat,
        duration,
        ..new_slot
    };
    debug!(
        "replace_or_insert_slot: {} {} beats at beat {}",
        new_slot.payload.kind_name(),
        duration,
        beat
    );

    let mut slots = slots.to_vec();
    slots.sort_by(|a, b| a.beat.total_cmp(&b.beat));

    split_straddling_slot(&mut slots, beat);

    let index = match slots.iter().position(|s| s.starts_at(beat)) {
        Some(index) => index,
        None => {
            let track_end = slots.last().map(Slot::end).unwrap_or(0.0);
            if beat >= track_end - EPSILON {
                append_past_end(&mut slots, new_slot, track_end);
                return Ok(slots);
            }
            // Before the first slot: pad up to it so the beat has an owner.
            let first_beat = slots[0].beat;
            warn!(
                "replace_or_insert_slot: filling leading gap {}..{} with a rest",
                beat, first_beat
            );
            slots.insert(
                0,
                Slot::new(beat, first_beat - beat, new_slot.payload.emptied()),
            );
            0
        }
    };

    let existing = &slots[index];
    if approx_eq(existing.duration, duration) {
        trace!("exact match at index {}", index);
        slots[index] = new_slot;
    } else if duration < existing.duration {
        trace!("shrinking slot at index {} by {}", index, duration);
        let remainder = &mut slots[index];
        remainder.beat = round_beats(remainder.beat + duration);
        remainder.duration = round_beats(remainder.duration - duration);
        slots.insert(index, new_slot);
    } else {
        consume_following(&mut slots, index, new_slot)?;
    }

    if let Some(next) = slots.get_mut(index + 1) {
        next.sustain = false;
    }

    Ok(slots)
}

/// Cut the slot straddling `beat` (if any) into two slots meeting at `beat`.
fn split_straddling_slot(slots: &mut Vec<Slot>, beat: f64) {
    let Some(index) = slots.iter().position(|s| s.contains(beat)) else {
        return;
    };

    let slot = &mut slots[index];
    let tail = Slot {
        beat,
        duration: round_beats(slot.end() - beat),
        payload: slot.payload.clone(),
        sustain: !slot.payload.is_empty(),
    };
    slot.duration = round_beats(beat - slot.beat);
    trace!("split slot {} at beat {}", index, beat);
    slots.insert(index + 1, tail);
}

fn append_past_end(slots: &mut Vec<Slot>, new_slot: Slot, track_end: f64) {
    if new_slot.beat > track_end + EPSILON {
        warn!(
            "replace_or_insert_slot: filling gap {}..{} with a rest",
            track_end, new_slot.beat
        );
        slots.push(Slot::new(
            track_end,
            new_slot.beat - track_end,
            new_slot.payload.emptied(),
        ));
    }
    slots.push(new_slot);
}

/// Consume slots from `index` until `new_slot` is covered, keeping the
/// unconsumed tail of the last one.
fn consume_following(
    slots: &mut Vec<Slot>,
    index: usize,
    new_slot: Slot,
) -> Result<(), SliceError> {
    let mut consumed = 0.0;
    let mut end = index;

    while consumed < new_slot.duration - EPSILON {
        let Some(slot) = slots.get(end) else {
            return Err(SliceError::InsufficientTrackLength {
                beat: new_slot.beat,
                needed: new_slot.duration,
                available: round_beats(consumed),
            });
        };
        consumed += slot.duration;
        end += 1;
    }

    let overshoot = round_beats(consumed - new_slot.duration);
    trace!(
        "consumed slots {}..{} ({} beats, {} left over)",
        index,
        end,
        consumed,
        overshoot
    );

    let mut replacement = Vec::with_capacity(2);
    let tail = (overshoot > EPSILON).then(|| Slot {
        beat: new_slot.end(),
        duration: overshoot,
        ..slots[end - 1].clone()
    });
    replacement.push(new_slot);
    replacement.extend(tail);

    slots.splice(index..end, replacement);
    Ok(())
}

impl Track {
    /// Replace or insert a slot on this track.
    ///
    /// The track is only updated when the replacement succeeds.
    pub fn replace_or_insert(&mut self, slot: Slot) -> Result<(), SliceError> {
        self.slots = replace_or_insert_slot(&self.slots, slot)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Payload, TrackKind};
    use crate::semantic::validate_track;
    use pretty_assertions::assert_eq;

    fn quarters(names: &[&str]) -> Vec<Slot> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| Slot::note(i as f64, 1.0, *n))
            .collect()
    }

    #[test]
    fn test_insert_into_empty_track() {
        let result = replace_or_insert_slot(&[], Slot::note(0.0, 1.0, "C4")).unwrap();
        assert_eq!(result, vec![Slot::note(0.0, 1.0, "C4")]);
    }

    #[test]
    fn test_exact_match_replaces() {
        let slots = quarters(&["C4", "D4", "E4"]);
        let result = replace_or_insert_slot(&slots, Slot::note(1.0, 1.0, "G4")).unwrap();
        assert_eq!(result, quarters(&["C4", "G4", "E4"]));
    }

    #[test]
    fn test_shorter_shrinks_and_shifts() {
        let slots = vec![Slot::note(0.0, 2.0, "C4"), Slot::note(2.0, 2.0, "D4")];
        let result = replace_or_insert_slot(&slots, Slot::note(2.0, 0.5, "F4")).unwrap();
        assert_eq!(
            result,
            vec![
                Slot::note(0.0, 2.0, "C4"),
                Slot::note(2.0, 0.5, "F4"),
                Slot::note(2.5, 1.5, "D4"),
            ]
        );
    }

    #[test]
    fn test_longer_consumes_whole_slots() {
        let slots = quarters(&["C4", "D4", "E4", "F4"]);
        let result = replace_or_insert_slot(&slots, Slot::note(1.0, 2.0, "A4")).unwrap();
        assert_eq!(
            result,
            vec![
                Slot::note(0.0, 1.0, "C4"),
                Slot::note(1.0, 2.0, "A4"),
                Slot::note(3.0, 1.0, "F4"),
            ]
        );
    }

    #[test]
    fn test_longer_keeps_partial_tail() {
        let slots = quarters(&["C4", "D4", "E4", "F4"]);
        let result = replace_or_insert_slot(&slots, Slot::note(0.0, 1.5, "B4")).unwrap();
        assert_eq!(
            result,
            vec![
                Slot::note(0.0, 1.5, "B4"),
                Slot::note(1.5, 0.5, "D4"),
                Slot::note(2.0, 1.0, "E4"),
                Slot::note(3.0, 1.0, "F4"),
            ]
        );
    }

    #[test]
    fn test_longer_past_end_fails() {
        let slots = quarters(&["C4", "D4"]);
        let err = replace_or_insert_slot(&slots, Slot::note(1.0, 3.0, "E4")).unwrap_err();
        assert_eq!(
            err,
            SliceError::InsufficientTrackLength {
                beat: 1.0,
                needed: 3.0,
                available: 1.0
            }
        );
    }

    #[test]
    fn test_append_at_end() {
        let slots = quarters(&["C4", "D4"]);
        let result = replace_or_insert_slot(&slots, Slot::note(2.0, 2.0, "E4")).unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(result[2], Slot::note(2.0, 2.0, "E4"));
    }

    #[test]
    fn test_append_past_end_fills_gap() {
        let slots = quarters(&["C4"]);
        let result = replace_or_insert_slot(&slots, Slot::note(3.0, 1.0, "G4")).unwrap();
        assert_eq!(
            result,
            vec![
                Slot::note(0.0, 1.0, "C4"),
                Slot::rest(1.0, 2.0),
                Slot::note(3.0, 1.0, "G4"),
            ]
        );
        assert!(validate_track(&result).is_ok());
    }

    #[test]
    fn test_beat_inside_slot_splits_it() {
        let slots = vec![Slot::note(0.0, 4.0, "C4")];
        let result = replace_or_insert_slot(&slots, Slot::note(1.0, 1.0, "E4")).unwrap();
        assert_eq!(
            result,
            vec![
                Slot::note(0.0, 1.0, "C4"),
                Slot::note(1.0, 1.0, "E4"),
                Slot::note(2.0, 2.0, "C4"),
            ]
        );
    }

    #[test]
    fn test_rejects_bad_duration() {
        let slots = quarters(&["C4"]);
        assert_eq!(
            replace_or_insert_slot(&slots, Slot::note(0.0, 0.0, "E4")).unwrap_err(),
            SliceError::InvalidDuration(0.0)
        );
        assert!(replace_or_insert_slot(&slots, Slot::note(-1.0, 1.0, "E4")).is_err());
    }

    #[test]
    fn test_following_slot_loses_sustain() {
        let slots = vec![
            Slot::note(0.0, 1.0, "C4"),
            Slot::note(1.0, 1.0, "C4").sustained(true),
        ];
        let result = replace_or_insert_slot(&slots, Slot::note(0.0, 1.0, "D4")).unwrap();
        assert!(!result[1].sustain);
    }

    #[test]
    fn test_output_sorted_without_overlap() {
        let mut slots = quarters(&["C4", "D4", "E4", "F4", "G4", "A4"]);
        let edits = [
            Slot::note(0.5, 1.0, "B4"),
            Slot::note(3.0, 2.5, "C5"),
            Slot::note(0.0, 0.25, "D5"),
            Slot::note(6.0, 1.0, "E5"),
        ];
        for edit in edits {
            slots = replace_or_insert_slot(&slots, edit).unwrap();
            assert!(validate_track(&slots).is_ok(), "invalid track: {:?}", slots);
        }
        assert_eq!(slots.last().map(Slot::end), Some(7.0));
    }

    #[test]
    fn test_track_replace_keeps_track_on_error() {
        let mut track = Track::new("melody", TrackKind::Melody);
        track.slots = quarters(&["C4", "D4"]);
        let before = track.clone();
        assert!(track.replace_or_insert(Slot::note(0.0, 5.0, "E4")).is_err());
        assert_eq!(track, before);

        track
            .replace_or_insert(Slot::new(0.0, 1.0, Payload::note("E4")))
            .unwrap();
        assert_eq!(track.slots[0].payload, Payload::note("E4"));
    }
}
