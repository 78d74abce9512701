//! # Duration Vocabulary
//!
//! Canonical note lengths, measured in quarter-note beats, and the greedy
//! decomposition used to tile timing gaps.
//!
//! ## Two Lists
//! - [`VOCABULARY`] - the fixed atomic lengths used to break notes down for
//!   printing: `1.5, 1, 0.75, 0.5, 0.375, 0.25, 0.1875, 0.125`
//! - [`AllowedDurations`] - a caller-supplied set used when an insertion leaves
//!   a gap in a slot (commonly `[4, 2, 1, 0.5, 0.25]`)
//!
//! Both are consumed largest first. The decomposition is greedy, not optimal:
//! it picks the first value that still fits and never backtracks.
//!
//! ## Rendering Helpers
//! Numbered notation draws short notes with underlines (one per halving below a
//! quarter) and dotted notes with an augmentation dot. [`underline_count`] and
//! [`is_dotted`] answer both questions from a duration alone.

use serde::Deserialize;

use crate::error::SliceError;

/// Tolerance for beat comparisons.
pub const EPSILON: f64 = 1e-4;

/// Atomic printable lengths, descending.
pub const VOCABULARY: [f64; 8] = [1.5, 1.0, 0.75, 0.5, 0.375, 0.25, 0.1875, 0.125];

/// The smallest vocabulary unit (a thirty-second note).
pub const SMALLEST_UNIT: f64 = 0.125;

pub const DEFAULT_ALLOWED_DURATIONS: [f64; 5] = [4.0, 2.0, 1.0, 0.5, 0.25];

/// Longest timeline the engine lays out or extends, in beats.
pub const MAX_TRACK_BEATS: f64 = 65_536.0;

/// Most bars a layout or insertion may produce.
pub const MAX_BARS: usize = 16_384;

/// Round a beat value to 4 decimal digits.
pub fn round_beats(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

/// Reject non-finite or non-positive durations.
pub fn check_duration(duration: f64) -> Result<f64, SliceError> {
    if duration.is_finite() && duration > EPSILON {
        Ok(duration)
    } else {
        Err(SliceError::InvalidDuration(duration))
    }
}

/// Reject non-finite or negative beats.
pub fn check_beat(beat: f64) -> Result<f64, SliceError> {
    if beat.is_finite() && beat > -EPSILON {
        Ok(beat.max(0.0))
    } else {
        Err(SliceError::InvalidDuration(beat))
    }
}

/// Undotted note values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteValue {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
}

impl NoteValue {
    pub const ALL: [NoteValue; 6] = [
        NoteValue::Whole,
        NoteValue::Half,
        NoteValue::Quarter,
        NoteValue::Eighth,
        NoteValue::Sixteenth,
        NoteValue::ThirtySecond,
    ];

    /// Length in quarter-note beats
    pub fn beats(&self) -> f64 {
        match self {
            NoteValue::Whole => 4.0,
            NoteValue::Half => 2.0,
            NoteValue::Quarter => 1.0,
            NoteValue::Eighth => 0.5,
            NoteValue::Sixteenth => 0.25,
            NoteValue::ThirtySecond => 0.125,
        }
    }

    /// Underlines drawn under a numbered-notation digit
    pub fn underlines(&self) -> u8 {
        match self {
            NoteValue::Whole | NoteValue::Half | NoteValue::Quarter => 0,
            NoteValue::Eighth => 1,
            NoteValue::Sixteenth => 2,
            NoteValue::ThirtySecond => 3,
        }
    }
}

/// Find the note value (and dot) that spells `duration` exactly.
pub fn classify(duration: f64) -> Option<(NoteValue, bool)> {
    NoteValue::ALL.iter().find_map(|value| {
        if approx_eq(value.beats(), duration) {
            Some((*value, false))
        } else if approx_eq(value.beats() * 1.5, duration) {
            Some((*value, true))
        } else {
            None
        }
    })
}

/// Number of underlines for a fragment of this length.
///
/// Lengths that are not in the vocabulary fall into the band they belong to,
/// so a stray residual still renders.
pub fn underline_count(duration: f64) -> u8 {
    if let Some((value, _)) = classify(duration) {
        return value.underlines();
    }
    if duration >= 1.0 - EPSILON {
        0
    } else if duration >= 0.5 - EPSILON {
        1
    } else if duration >= 0.25 - EPSILON {
        2
    } else {
        3
    }
}

pub fn is_dotted(duration: f64) -> bool {
    matches!(classify(duration), Some((_, true)))
}

/// Greedy decomposition of `gap` against `candidates` (must be descending).
///
/// Returns the pieces taken and whatever could not be covered.
pub(crate) fn greedy_decompose(gap: f64, candidates: &[f64]) -> (Vec<f64>, f64) {
    let mut pieces = Vec::new();
    let mut remaining = round_beats(gap);

    while remaining > EPSILON {
        match candidates.iter().find(|&&c| c <= remaining + EPSILON) {
            Some(&piece) => {
                pieces.push(piece);
                remaining = round_beats(remaining - piece);
            }
            None => break,
        }
    }

    (pieces, remaining.max(0.0))
}

/// Durations an insertion may use to fill the leftover part of a slot.
///
/// Always held sorted descending without duplicates.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Vec<f64>")]
pub struct AllowedDurations(Vec<f64>);

impl AllowedDurations {
    pub fn new(values: impl IntoIterator<Item = f64>) -> Result<Self, SliceError> {
        let mut durations = values
            .into_iter()
            .map(|v| check_duration(v).map(round_beats))
            .collect::<Result<Vec<_>, _>>()?;

        if durations.is_empty() {
            return Err(SliceError::ConfigError(
                "allowed durations must not be empty".to_string(),
            ));
        }

        durations.sort_by(|a, b| b.total_cmp(a));
        durations.dedup_by(|a, b| approx_eq(*a, *b));
        Ok(Self(durations))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// True when every gap on the thirty-second grid can be tiled.
    pub fn is_total(&self) -> bool {
        self.0.iter().any(|&d| approx_eq(d, SMALLEST_UNIT))
    }

    /// Split `gap` into allowed durations, largest first.
    ///
    /// # Example
    /// ```
    /// use timeslice::AllowedDurations;
    ///
    /// let allowed = AllowedDurations::default();
    /// assert_eq!(allowed.decompose(3.5).unwrap(), vec![2.0, 1.0, 0.5]);
    /// assert!(allowed.decompose(0.125).is_err());
    /// ```
    pub fn decompose(&self, gap: f64) -> Result<Vec<f64>, SliceError> {
        if !gap.is_finite() || gap > MAX_TRACK_BEATS {
            return Err(SliceError::InvalidDuration(gap));
        }
        let (pieces, residual) = greedy_decompose(gap, &self.0);
        if residual > EPSILON {
            return Err(SliceError::UnfillableGap {
                gap: round_beats(gap),
                residual,
            });
        }
        Ok(pieces)
    }
}

impl Default for AllowedDurations {
    fn default() -> Self {
        Self(DEFAULT_ALLOWED_DURATIONS.to_vec())
    }
}

impl TryFrom<Vec<f64>> for AllowedDurations {
    type Error = SliceError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_value_beats() {
        assert_eq!(NoteValue::Whole.beats(), 4.0);
        assert_eq!(NoteValue::ThirtySecond.beats(), 0.125);
    }

    #[test]
    fn test_classify_plain_and_dotted() {
        assert_eq!(classify(1.0), Some((NoteValue::Quarter, false)));
        assert_eq!(classify(0.75), Some((NoteValue::Eighth, true)));
        assert_eq!(classify(3.0), Some((NoteValue::Half, true)));
        assert_eq!(classify(0.6), None);
    }

    #[test]
    fn test_underline_count_table() {
        assert_eq!(underline_count(1.5), 0);
        assert_eq!(underline_count(1.0), 0);
        assert_eq!(underline_count(0.75), 1);
        assert_eq!(underline_count(0.5), 1);
        assert_eq!(underline_count(0.375), 2);
        assert_eq!(underline_count(0.25), 2);
        assert_eq!(underline_count(0.1875), 3);
        assert_eq!(underline_count(0.125), 3);
    }

    #[test]
    fn test_underline_count_off_vocabulary() {
        assert_eq!(underline_count(0.6), 1);
        assert_eq!(underline_count(0.05), 3);
    }

    #[test]
    fn test_is_dotted() {
        for d in [1.5, 0.75, 0.375, 0.1875] {
            assert!(is_dotted(d), "{} should be dotted", d);
        }
        for d in [1.0, 0.5, 0.25, 0.125] {
            assert!(!is_dotted(d), "{} should not be dotted", d);
        }
    }

    #[test]
    fn test_allowed_durations_sorted_and_deduped() {
        let allowed = AllowedDurations::new([0.5, 2.0, 1.0, 0.5]).unwrap();
        assert_eq!(allowed.as_slice(), &[2.0, 1.0, 0.5]);
    }

    #[test]
    fn test_allowed_durations_rejects_bad_values() {
        assert!(AllowedDurations::new([1.0, 0.0]).is_err());
        assert!(AllowedDurations::new([f64::NAN]).is_err());
        assert!(AllowedDurations::new(Vec::new()).is_err());
    }

    #[test]
    fn test_decompose_greedy() {
        let allowed = AllowedDurations::default();
        assert_eq!(allowed.decompose(3.75).unwrap(), vec![2.0, 1.0, 0.5, 0.25]);
        assert_eq!(allowed.decompose(4.0).unwrap(), vec![4.0]);
    }

    #[test]
    fn test_decompose_unfillable() {
        let allowed = AllowedDurations::default();
        let err = allowed.decompose(0.875).unwrap_err();
        assert_eq!(
            err,
            SliceError::UnfillableGap {
                gap: 0.875,
                residual: 0.125
            }
        );
    }

    #[test]
    fn test_decompose_huge_gap_rejected() {
        let allowed = AllowedDurations::default();
        assert_eq!(allowed.decompose(1e300), Err(SliceError::InvalidDuration(1e300)));
        assert!(allowed.decompose(f64::INFINITY).is_err());
    }

    #[test]
    fn test_allowed_durations_deserialize_validated() {
        let allowed: AllowedDurations = serde_json::from_str("[0.5, 2, 0.5]").unwrap();
        assert_eq!(allowed.as_slice(), &[2.0, 0.5]);
        assert!(serde_json::from_str::<AllowedDurations>("[1, 0]").is_err());
        assert!(serde_json::from_str::<AllowedDurations>("[]").is_err());
    }

    #[test]
    fn test_is_total() {
        assert!(!AllowedDurations::default().is_total());
        assert!(AllowedDurations::new([1.0, 0.5, 0.125]).unwrap().is_total());
    }

    #[test]
    fn test_greedy_decompose_vocabulary() {
        let (pieces, residual) = greedy_decompose(1.75, &VOCABULARY);
        assert_eq!(pieces, vec![1.5, 0.25]);
        assert_eq!(residual, 0.0);
    }
}
