//! Scale degrees for numbered notation.
//!
//! Numbered notation writes pitches as degrees 1-7 of the current key, with an
//! accidental in front and octave dots above or below. The tonic of octave 4
//! is the reference: `C4` in C is plain `1`, `C5` is `1` with one dot above.
//!
//! Minor keys are read against their relative major, so in A minor the tonic
//! `A4` displays as `6` and `C4` as `1`.
//!
//! Only what the display needs is parsed; unusual spellings are accepted as
//! written and no musical checks are made.

use std::fmt;

/// Semitones above the tonic for each major-scale degree.
const MAJOR_SCALE: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

const TONIC_OCTAVE: i32 = 4;

/// A displayed scale degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Degree {
    /// 1 through 7
    pub number: u8,
    /// Semitones away from the scale tone: -1 flat, 1 sharp
    pub accidental: i8,
    /// Octaves above (positive) or below the tonic octave
    pub octave: i8,
}

impl fmt::Display for Degree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.accidental < 0 { "b" } else { "#" };
        for _ in 0..self.accidental.unsigned_abs() {
            write!(f, "{}", sign)?;
        }
        write!(f, "{}", self.number)?;
        let mark = if self.octave < 0 { "," } else { "'" };
        for _ in 0..self.octave.unsigned_abs() {
            write!(f, "{}", mark)?;
        }
        Ok(())
    }
}

/// A letter step (C=0 .. B=6) and its pitch class.
#[derive(Debug, Clone, Copy)]
struct Spelling {
    step: i32,
    semitone: i32,
}

fn letter(c: char) -> Option<(i32, i32)> {
    match c {
        'C' => Some((0, 0)),
        'D' => Some((1, 2)),
        'E' => Some((2, 4)),
        'F' => Some((3, 5)),
        'G' => Some((4, 7)),
        'A' => Some((5, 9)),
        'B' => Some((6, 11)),
        _ => None,
    }
}

/// Parse a letter with trailing accidentals, returning the unparsed rest.
fn parse_spelling(s: &str) -> Option<(Spelling, &str)> {
    let mut chars = s.chars();
    let (step, base) = letter(chars.next()?)?;
    let rest = chars.as_str();

    let accidentals = rest.chars().take_while(|c| *c == '#' || *c == 'b').count();
    let offset: i32 = rest[..accidentals]
        .chars()
        .map(|c| if c == '#' { 1 } else { -1 })
        .sum();

    Some((
        Spelling {
            step,
            semitone: (base + offset).rem_euclid(12),
        },
        &rest[accidentals..],
    ))
}

/// The spelling that reads as degree 1 in `key`.
fn key_tonic(key: &str) -> Option<Spelling> {
    let key = key.trim();
    let (root, minor) = match key.strip_suffix('m') {
        Some(root) if !root.is_empty() => (root, true),
        _ => (key, false),
    };

    let (tonic, rest) = parse_spelling(root)?;
    if !rest.is_empty() {
        return None;
    }

    if minor {
        Some(Spelling {
            step: (tonic.step + 2) % 7,
            semitone: (tonic.semitone + 3) % 12,
        })
    } else {
        Some(tonic)
    }
}

/// Degree of `note` (e.g. `F#5`, `Bb3`) in `key` (e.g. `G`, `Eb`, `F#m`).
///
/// Returns `None` for rests and anything that does not parse.
///
/// # Example
/// ```rust
/// use timeslice::degree::note_degree;
///
/// let d = note_degree("F#4", "G").unwrap();
/// assert_eq!((d.number, d.accidental, d.octave), (7, 0, -1));
/// assert_eq!(d.to_string(), "7,");
/// ```
pub fn note_degree(note: &str, key: &str) -> Option<Degree> {
    let tonic = key_tonic(key)?;
    let (pitch, rest) = parse_spelling(note.trim())?;
    let octave: i32 = rest.parse().ok()?;

    let steps = (octave * 7 + pitch.step) - (TONIC_OCTAVE * 7 + tonic.step);
    let index = steps.rem_euclid(7);

    let expected = (tonic.semitone + MAJOR_SCALE[index as usize]) % 12;
    let mut accidental = (pitch.semitone - expected).rem_euclid(12);
    if accidental > 6 {
        accidental -= 12;
    }

    Some(Degree {
        number: index as u8 + 1,
        accidental: accidental as i8,
        octave: steps.div_euclid(7) as i8,
    })
}
