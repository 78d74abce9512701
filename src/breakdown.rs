//! # Notation Breakdown
//!
//! Cut bar-local slots into printable note lengths.
//!
//! Numbered notation can only print the lengths in [`VOCABULARY`]; anything
//! else is written as a chain of tied pieces. For each slot:
//! 1. A slot of 2 beats or more is printed beat by beat: whole beats are
//!    peeled off while at least one beat remains
//! 2. The rest is decomposed greedily against the vocabulary, largest first
//!
//! The first piece of a slot keeps the slot's own `sustain` flag; every later
//! piece is a `sustain` continuation. Pieces keep `originalBeat` and
//! `originalDuration` so clicks map back to the editable slot.
//!
//! A residual shorter than a thirty-second note (only possible for durations
//! off the 4-digit grid) is emitted as a final piece so nothing is lost.
//! Slots that are not finite or run past [`MAX_TRACK_BEATS`] are passed through
//! as a single piece.
//!
//! ## Example
//! ```rust
//! use timeslice::{break_down_notes_within_bar, Slot, SlotView};
//!
//! let pieces = break_down_notes_within_bar(&[SlotView::of(&Slot::note(0.0, 2.75, "C4"))]);
//! let shape: Vec<(f64, bool)> = pieces.iter().map(|p| (p.duration, p.sustain)).collect();
//! assert_eq!(shape, vec![(1.0, false), (1.0, true), (0.75, true)]);
//! ```

use log::{trace, warn};

use crate::duration::{greedy_decompose, round_beats, EPSILON, MAX_TRACK_BEATS, VOCABULARY};
use crate::layout::SlotView;

/// Slots this long or longer are printed one beat at a time.
const BEAT_BY_BEAT_THRESHOLD: f64 = 2.0;

/// Break every slot of a bar into printable pieces, in order.
pub fn break_down_notes_within_bar(bar_slots: &[SlotView]) -> Vec<SlotView> {
    bar_slots.iter().flat_map(break_down_slot).collect()
}

/// Printable lengths for one slot, in order.
fn piece_lengths(duration: f64) -> Vec<f64> {
    let mut lengths = Vec::new();
    let mut remaining = round_beats(duration);

    if remaining >= BEAT_BY_BEAT_THRESHOLD - EPSILON {
        while remaining >= 1.0 - EPSILON {
            lengths.push(1.0);
            remaining = round_beats(remaining - 1.0);
        }
    }

    let (pieces, residual) = greedy_decompose(remaining, &VOCABULARY);
    lengths.extend(pieces);
    if residual > EPSILON {
        lengths.push(residual);
    }
    lengths
}

fn break_down_slot(slot: &SlotView) -> Vec<SlotView> {
    if !slot.duration.is_finite() || slot.duration > MAX_TRACK_BEATS {
        warn!("break_down_slot: leaving {} beats whole", slot.duration);
        return vec![slot.clone()];
    }

    let lengths = piece_lengths(slot.duration);
    trace!("break_down_slot: {} -> {:?}", slot.duration, lengths);

    let mut beat = slot.beat;
    lengths
        .into_iter()
        .enumerate()
        .map(|(i, length)| {
            let piece = SlotView {
                beat,
                duration: length,
                payload: slot.payload.clone(),
                sustain: slot.sustain || i > 0,
                original_beat: slot.original_beat,
                original_duration: slot.original_duration,
            };
            beat = round_beats(beat + length);
            piece
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::{is_dotted, underline_count};
    use crate::model::Slot;
    use pretty_assertions::assert_eq;

    fn lengths(duration: f64) -> Vec<f64> {
        break_down_notes_within_bar(&[SlotView::of(&Slot::note(0.0, duration, "C4"))])
            .iter()
            .map(|p| p.duration)
            .collect()
    }

    #[test]
    fn test_vocabulary_lengths_stay_whole() {
        for d in VOCABULARY {
            assert_eq!(lengths(d), vec![d]);
        }
    }

    #[test]
    fn test_long_notes_go_beat_by_beat() {
        assert_eq!(lengths(2.0), vec![1.0, 1.0]);
        assert_eq!(lengths(4.0), vec![1.0, 1.0, 1.0, 1.0]);
        assert_eq!(lengths(2.75), vec![1.0, 1.0, 0.75]);
        assert_eq!(lengths(3.5), vec![1.0, 1.0, 1.0, 0.5]);
    }

    #[test]
    fn test_short_notes_decompose_greedily() {
        assert_eq!(lengths(1.75), vec![1.5, 0.25]);
        assert_eq!(lengths(0.625), vec![0.5, 0.125]);
        assert_eq!(lengths(1.25), vec![1.0, 0.25]);
    }

    #[test]
    fn test_sustain_and_original_position() {
        let slot = SlotView {
            beat: 1.0,
            duration: 2.5,
            payload: crate::model::Payload::note("E4"),
            sustain: false,
            original_beat: 9.0,
            original_duration: 2.5,
        };
        let pieces = break_down_notes_within_bar(&[slot]);
        let shape: Vec<(f64, f64, bool)> =
            pieces.iter().map(|p| (p.beat, p.duration, p.sustain)).collect();
        assert_eq!(shape, vec![(1.0, 1.0, false), (2.0, 1.0, true), (3.0, 0.5, true)]);
        assert!(pieces.iter().all(|p| p.original_beat == 9.0 && p.original_duration == 2.5));
    }

    #[test]
    fn test_sustained_slot_stays_sustained() {
        let slot = SlotView::of(&Slot::note(0.0, 0.75, "G4").sustained(true));
        let pieces = break_down_notes_within_bar(&[slot]);
        assert_eq!(pieces.len(), 1);
        assert!(pieces[0].sustain);
    }

    #[test]
    fn test_durations_conserved() {
        for steps in 1..=64 {
            let duration = steps as f64 * 0.0625;
            let total: f64 = lengths(duration).iter().sum();
            assert!((total - duration).abs() < 1e-4, "{} broke into {}", duration, total);
        }
    }

    #[test]
    fn test_off_grid_residual_kept() {
        assert_eq!(lengths(0.2), vec![0.1875, 0.0125]);
    }

    #[test]
    fn test_oversized_slot_left_whole() {
        let slot = SlotView::of(&Slot::note(0.0, 1e300, "C4"));
        let pieces = break_down_notes_within_bar(&[slot.clone()]);
        assert_eq!(pieces, vec![slot]);
    }

    #[test]
    fn test_pieces_render() {
        let pieces = break_down_notes_within_bar(&[SlotView::of(&Slot::note(0.0, 1.875, "D4"))]);
        let marks: Vec<(u8, bool)> = pieces
            .iter()
            .map(|p| (underline_count(p.duration), is_dotted(p.duration)))
            .collect();
        assert_eq!(marks, vec![(0, true), (2, true)]);
    }

    #[test]
    fn test_multiple_slots_in_order() {
        let slots = [
            SlotView::of(&Slot::note(0.0, 0.5, "C4")),
            SlotView::of(&Slot::note(0.5, 3.5, "D4")),
        ];
        let beats: Vec<f64> = break_down_notes_within_bar(&slots).iter().map(|p| p.beat).collect();
        assert_eq!(beats, vec![0.0, 0.5, 1.5, 2.5, 3.5]);
    }
}
