//! # Bar Layout
//!
//! Partition a continuous track into bars for display.
//!
//! ## Purpose
//! Tracks are edited as one long beat-line. To draw them, every slot is cut at
//! each bar line it crosses, producing one fragment per bar. Fragments after
//! the first are `sustain` continuations.
//!
//! Every fragment remembers the slot it came from through `originalBeat` and
//! `originalDuration`, so a click on a fragment maps back to the editable slot
//! on the track (see [`merge_bars_into_track`] for the inverse).
//!
//! ## Rows
//! Display rows group a fixed number of bars ([`split_bars_into_rows`]). An
//! empty track lays out as a single row holding an empty 4-bar grid.
//!
//! Layout never touches its input; every call builds a fresh view.

use log::debug;
use serde::Serialize;

use crate::duration::{
    check_beat, check_duration, round_beats, EPSILON, MAX_BARS, MAX_TRACK_BEATS,
};
use crate::error::SliceError;
use crate::model::{is_false, Payload, Slot};

/// Bars in the empty grid shown for a track with no slots.
pub const EMPTY_GRID_BARS: usize = 4;

/// A displayed fragment of a track slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
    /// Bar-local start
    pub beat: f64,
    pub duration: f64,
    #[serde(flatten)]
    pub payload: Payload,
    #[serde(skip_serializing_if = "is_false")]
    pub sustain: bool,
    /// Track beat of the source slot
    pub original_beat: f64,
    pub original_duration: f64,
}

impl SlotView {
    /// View of a slot that maps back to itself.
    pub fn of(slot: &Slot) -> Self {
        Self {
            beat: slot.beat,
            duration: slot.duration,
            payload: slot.payload.clone(),
            sustain: slot.sustain,
            original_beat: slot.beat,
            original_duration: slot.duration,
        }
    }

    pub fn end(&self) -> f64 {
        round_beats(self.beat + self.duration)
    }
}

/// A displayed bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarView {
    pub bar_number: usize,
    pub slots: Vec<SlotView>,
}

impl BarView {
    fn empty(bar_number: usize) -> Self {
        Self {
            bar_number,
            slots: Vec::new(),
        }
    }
}

fn check_beats_per_bar(beats_per_bar: f64) -> Result<f64, SliceError> {
    if beats_per_bar.is_finite() && beats_per_bar > EPSILON {
        Ok(beats_per_bar)
    } else {
        Err(SliceError::InvalidBeatsPerBar(beats_per_bar))
    }
}

/// Number of bars needed to hold `end` beats (at least one).
///
/// Fails rather than allocate more than [`MAX_BARS`] bars.
fn bars_needed(end: f64, beats_per_bar: f64) -> Result<usize, SliceError> {
    if end > MAX_TRACK_BEATS {
        return Err(SliceError::InvalidDuration(end));
    }
    let bars = (round_beats(end / beats_per_bar) - EPSILON).ceil();
    if bars > MAX_BARS as f64 {
        return Err(SliceError::InvalidDuration(end));
    }
    Ok(if bars < 1.0 { 1 } else { bars as usize })
}

/// Split track slots into bars of `beats_per_bar` beats.
///
/// # Example
/// ```rust
/// use timeslice::{split_notes_into_bars, Slot};
///
/// let slots = vec![Slot::note(0.0, 3.0, "C4"), Slot::note(3.0, 3.0, "E4")];
/// let bars = split_notes_into_bars(&slots, 4.0).unwrap();
///
/// assert_eq!(bars.len(), 2);
/// assert_eq!(bars[0].slots[1].duration, 1.0);
/// assert_eq!(bars[1].slots[0].duration, 2.0);
/// assert!(bars[1].slots[0].sustain);
/// assert_eq!(bars[1].slots[0].original_beat, 3.0);
/// ```
///
/// # Errors
/// - [`SliceError::InvalidBeatsPerBar`] for a non-positive bar length
/// - [`SliceError::InvalidDuration`] for a bad slot, or a track ending past
///   [`MAX_TRACK_BEATS`] or needing more than [`MAX_BARS`] bars
pub fn split_notes_into_bars(
    track_slots: &[Slot],
    beats_per_bar: f64,
) -> Result<Vec<BarView>, SliceError> {
    let beats_per_bar = check_beats_per_bar(beats_per_bar)?;
    for slot in track_slots {
        check_beat(slot.beat)?;
        check_duration(slot.duration)?;
    }

    let end = track_slots.iter().map(Slot::end).fold(0.0, f64::max);
    let bar_count = bars_needed(end, beats_per_bar)?;
    debug!(
        "split_notes_into_bars: {} slots over {} beats -> {} bars",
        track_slots.len(),
        end,
        bar_count
    );

    let mut bars: Vec<BarView> = (1..=bar_count).map(BarView::empty).collect();

    for slot in track_slots {
        let mut start = slot.beat;
        let mut remaining = slot.duration;
        let mut first = true;

        while remaining > EPSILON {
            let bar_index = ((start / beats_per_bar) + EPSILON).floor() as usize;
            let local = round_beats(start - bar_index as f64 * beats_per_bar);
            let piece = round_beats(remaining.min(beats_per_bar - local));

            if let Some(bar) = bars.get_mut(bar_index) {
                bar.slots.push(SlotView {
                    beat: local,
                    duration: piece,
                    payload: slot.payload.clone(),
                    sustain: slot.sustain || !first,
                    original_beat: slot.beat,
                    original_duration: slot.duration,
                });
            }

            start = round_beats(start + piece);
            remaining = round_beats(remaining - piece);
            first = false;
        }
    }

    for bar in &mut bars {
        bar.slots.sort_by(|a, b| a.beat.total_cmp(&b.beat));
    }

    Ok(bars)
}

/// Rebuild the canonical track slots from laid-out bars.
///
/// Fragments are grouped by `originalBeat`; each group becomes one slot with
/// the original beat and duration. The first fragment of a group is the head
/// of the source slot, so its `sustain` flag is the slot's own.
pub fn merge_bars_into_track(bars: &[BarView]) -> Vec<Slot> {
    let mut slots: Vec<Slot> = Vec::new();

    for view in bars.iter().flat_map(|bar| bar.slots.iter()) {
        if slots.iter().any(|s| s.starts_at(view.original_beat)) {
            continue;
        }
        slots.push(Slot {
            beat: view.original_beat,
            duration: view.original_duration,
            payload: view.payload.clone(),
            sustain: view.sustain,
        });
    }

    slots.sort_by(|a, b| a.beat.total_cmp(&b.beat));
    slots
}

/// Group bars into display rows of `bars_per_row` bars.
pub fn split_bars_into_rows(bars: Vec<BarView>, bars_per_row: usize) -> Vec<Vec<BarView>> {
    let bars_per_row = bars_per_row.max(1);
    let mut rows = Vec::with_capacity((bars.len() + bars_per_row - 1) / bars_per_row);
    let mut bars = bars.into_iter().peekable();

    while bars.peek().is_some() {
        rows.push(bars.by_ref().take(bars_per_row).collect());
    }

    rows
}

/// Lay a track out as rows of bars.
///
/// An empty track yields one row of [`EMPTY_GRID_BARS`] empty bars.
pub fn layout_rows(
    track_slots: &[Slot],
    beats_per_bar: f64,
    bars_per_row: usize,
) -> Result<Vec<Vec<BarView>>, SliceError> {
    if track_slots.is_empty() {
        check_beats_per_bar(beats_per_bar)?;
        return Ok(vec![(1..=EMPTY_GRID_BARS).map(BarView::empty).collect()]);
    }
    let bars = split_notes_into_bars(track_slots, beats_per_bar)?;
    Ok(split_bars_into_rows(bars, bars_per_row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn melody() -> Vec<Slot> {
        vec![
            Slot::note(0.0, 1.0, "C4"),
            Slot::note(1.0, 2.5, "D4"),
            Slot::rest(3.5, 1.0),
            Slot::note(4.5, 6.0, "E4"),
            Slot::note(10.5, 1.5, "F4"),
        ]
    }

    #[test]
    fn test_empty_track_is_one_empty_bar() {
        let bars = split_notes_into_bars(&[], 4.0).unwrap();
        assert_eq!(bars, vec![BarView { bar_number: 1, slots: vec![] }]);
    }

    #[test]
    fn test_slot_within_one_bar() {
        let bars = split_notes_into_bars(&[Slot::note(1.0, 2.0, "G4")], 4.0).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].slots, vec![SlotView::of(&Slot::note(1.0, 2.0, "G4"))]);
    }

    #[test]
    fn test_straddling_slots_are_split() {
        let bars = split_notes_into_bars(&melody(), 4.0).unwrap();
        assert_eq!(bars.len(), 3);

        let shape: Vec<Vec<(f64, f64, bool)>> = bars
            .iter()
            .map(|b| b.slots.iter().map(|s| (s.beat, s.duration, s.sustain)).collect())
            .collect();
        assert_eq!(
            shape,
            vec![
                vec![(0.0, 1.0, false), (1.0, 2.5, false), (3.5, 0.5, false)],
                vec![(0.0, 0.5, true), (0.5, 3.5, false)],
                vec![(0.0, 2.5, true), (2.5, 1.5, false)],
            ]
        );
        assert_eq!(bars[2].slots[0].original_beat, 4.5);
        assert_eq!(bars[2].slots[0].original_duration, 6.0);
    }

    #[test]
    fn test_slot_spanning_three_bars() {
        let bars = split_notes_into_bars(&[Slot::note(2.0, 9.0, "A4")], 4.0).unwrap();
        let durations: Vec<f64> = bars
            .iter()
            .flat_map(|b| b.slots.iter().map(|s| s.duration))
            .collect();
        assert_eq!(durations, vec![2.0, 4.0, 3.0]);
        let onsets = bars.iter().flat_map(|b| b.slots.iter()).filter(|s| !s.sustain).count();
        assert_eq!(onsets, 1);
    }

    #[test]
    fn test_round_trip() {
        let slots = melody();
        let bars = split_notes_into_bars(&slots, 3.0).unwrap();
        assert_eq!(merge_bars_into_track(&bars), slots);
    }

    #[test]
    fn test_round_trip_keeps_source_sustain() {
        let slots = vec![Slot::note(0.0, 1.0, "C4").sustained(true), Slot::note(1.0, 4.0, "D4")];
        let bars = split_notes_into_bars(&slots, 2.0).unwrap();
        assert_eq!(merge_bars_into_track(&bars), slots);
    }

    #[test]
    fn test_invalid_beats_per_bar() {
        assert_eq!(
            split_notes_into_bars(&melody(), 0.0).unwrap_err(),
            SliceError::InvalidBeatsPerBar(0.0)
        );
    }

    #[test]
    fn test_huge_track_rejected() {
        let slots = vec![Slot::note(0.0, 1e300, "C4")];
        assert!(matches!(
            split_notes_into_bars(&slots, 4.0),
            Err(SliceError::InvalidDuration(_))
        ));
        assert!(layout_rows(&slots, 4.0, 4).is_err());
    }

    #[test]
    fn test_too_many_bars_rejected() {
        let slots = vec![Slot::note(0.0, 100.0, "C4")];
        assert!(split_notes_into_bars(&slots, 0.001).is_err());
        assert_eq!(split_notes_into_bars(&slots, 1.0).unwrap().len(), 100);
    }

    #[test]
    fn test_bad_slot_rejected() {
        let slots = vec![Slot::note(0.0, 1.0, "C4"), Slot::note(1.0, -2.0, "D4")];
        assert_eq!(
            split_notes_into_bars(&slots, 4.0).unwrap_err(),
            SliceError::InvalidDuration(-2.0)
        );
    }

    #[test]
    fn test_rows() {
        let slots = vec![Slot::note(0.0, 20.0, "C4")];
        let rows = layout_rows(&slots, 4.0, 2).unwrap();
        assert_eq!(rows.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 2, 1]);
        assert_eq!(rows[2][0].bar_number, 5);
    }

    #[test]
    fn test_empty_rows_grid() {
        let rows = layout_rows(&[], 4.0, 4).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), EMPTY_GRID_BARS);
        assert!(rows[0].iter().all(|b| b.slots.is_empty()));
    }

    #[test]
    fn test_slot_view_json() {
        let bars = split_notes_into_bars(&[Slot::note(3.0, 2.0, "C4")], 4.0).unwrap();
        let json = serde_json::to_string(&bars[1].slots[0]).unwrap();
        assert_eq!(
            json,
            r#"{"beat":0.0,"duration":1.0,"note":"C4","sustain":true,"originalBeat":3.0,"originalDuration":2.0}"#
        );
        let head = serde_json::to_string(&bars[0].slots[0]).unwrap();
        assert!(!head.contains("sustain"), "{}", head);
    }
}
