//! # Score Model
//!
//! This module defines the data model shared by every engine component.
//!
//! ## Type Hierarchy
//! ```text
//! Score (untagged)
//!   ├── BarScore   { key, tempo, beatsPerBar, bars: Vec<Bar> }
//!   │     └── Bar  { barNumber, slots: Vec<Slot> }     (beats local to the bar)
//!   └── TrackScore { key, tempo, tracks: Vec<Track> }
//!         └── Track { id, type, slots: Vec<Slot> }     (beats from track start)
//!
//! Slot { beat, duration, payload, sustain }
//!   └── Payload (enum)
//!         ├── Note(String)        "note": "C4"
//!         ├── Chord(String)       "chord": "Am7"
//!         ├── Text(String)        "text": "la"
//!         └── Notes(Vec<String>)  "notes": ["C3", "G3"]
//! ```
//!
//! ## Key Concepts
//!
//! ### Rests
//! A slot whose payload is empty (`""` or `[]`) is a rest/placeholder. Rests
//! keep the payload kind of the track they live in.
//!
//! ### Sustain
//! `sustain = true` marks a continuation fragment of a longer note that was
//! split at a bar or slot boundary. It is not a new onset.
//!
//! ### Invariants
//! - Bar: slots sorted by beat, no overlaps, durations sum to `beatsPerBar`
//! - Track: slots sorted by beat, each slot ends where the next begins
//!
//! See `semantic` for the checks.

use serde::{Deserialize, Serialize};

use crate::duration::{approx_eq, round_beats, EPSILON};

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}

/// Content of a slot. Exactly one kind per slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Payload {
    Note(String),
    Chord(String),
    Text(String),
    Notes(Vec<String>),
}

impl Payload {
    pub fn note(name: impl Into<String>) -> Self {
        Payload::Note(name.into())
    }

    pub fn chord(symbol: impl Into<String>) -> Self {
        Payload::Chord(symbol.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Payload::Text(text.into())
    }

    pub fn notes<S: Into<String>>(notes: impl IntoIterator<Item = S>) -> Self {
        Payload::Notes(notes.into_iter().map(Into::into).collect())
    }

    /// True for a rest/placeholder.
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Note(s) | Payload::Chord(s) | Payload::Text(s) => s.is_empty(),
            Payload::Notes(notes) => notes.iter().all(|n| n.is_empty()),
        }
    }

    /// An empty payload of the same kind.
    pub fn emptied(&self) -> Self {
        match self {
            Payload::Note(_) => Payload::Note(String::new()),
            Payload::Chord(_) => Payload::Chord(String::new()),
            Payload::Text(_) => Payload::Text(String::new()),
            Payload::Notes(_) => Payload::Notes(Vec::new()),
        }
    }

    /// A payload of the same kind holding `content`.
    ///
    /// For `notes`, the content is a list separated by spaces or commas.
    pub fn with_content(&self, content: &str) -> Self {
        match self {
            Payload::Note(_) => Payload::note(content),
            Payload::Chord(_) => Payload::chord(content),
            Payload::Text(_) => Payload::text(content),
            Payload::Notes(_) => Payload::notes(
                content
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|n| !n.is_empty()),
            ),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Payload::Note(_) => "note",
            Payload::Chord(_) => "chord",
            Payload::Text(_) => "text",
            Payload::Notes(_) => "notes",
        }
    }
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Note(String::new())
    }
}

/// The atomic unit of content over a time span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub beat: f64,
    pub duration: f64,
    #[serde(flatten)]
    pub payload: Payload,
    #[serde(default, skip_serializing_if = "is_false")]
    pub sustain: bool,
}

impl Slot {
    pub fn new(beat: f64, duration: f64, payload: Payload) -> Self {
        Self {
            beat: round_beats(beat),
            duration: round_beats(duration),
            payload,
            sustain: false,
        }
    }

    pub fn note(beat: f64, duration: f64, name: impl Into<String>) -> Self {
        Self::new(beat, duration, Payload::note(name))
    }

    /// An empty note slot.
    pub fn rest(beat: f64, duration: f64) -> Self {
        Self::new(beat, duration, Payload::default())
    }

    pub fn sustained(mut self, sustain: bool) -> Self {
        self.sustain = sustain;
        self
    }

    /// Beat at which this slot ends
    pub fn end(&self) -> f64 {
        round_beats(self.beat + self.duration)
    }

    pub fn is_rest(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn starts_at(&self, beat: f64) -> bool {
        approx_eq(self.beat, beat)
    }

    /// True when `beat` lies strictly inside this slot.
    pub fn contains(&self, beat: f64) -> bool {
        beat > self.beat + EPSILON && beat < self.end() - EPSILON
    }
}

/// A fixed-length container of slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bar {
    pub bar_number: usize,
    pub slots: Vec<Slot>,
}

impl Bar {
    /// A bar holding a single empty slot that spans it.
    pub fn empty(bar_number: usize, beats_per_bar: f64, kind: &Payload) -> Self {
        Self {
            bar_number,
            slots: vec![Slot::new(0.0, beats_per_bar, kind.emptied())],
        }
    }

    pub fn total_duration(&self) -> f64 {
        round_beats(self.slots.iter().map(|s| s.duration).sum())
    }

    pub fn slot_index_at(&self, beat: f64) -> Option<usize> {
        self.slots.iter().position(|s| s.starts_at(beat))
    }
}

/// Kind of content a track carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Melody,
    Chord,
    Lyric,
    Accompaniment,
}

impl TrackKind {
    /// Empty payload used for rests on this track.
    pub fn rest_payload(&self) -> Payload {
        match self {
            TrackKind::Melody => Payload::Note(String::new()),
            TrackKind::Chord => Payload::Chord(String::new()),
            TrackKind::Lyric => Payload::Text(String::new()),
            TrackKind::Accompaniment => Payload::Notes(Vec::new()),
        }
    }
}

/// A continuous, bar-agnostic sequence of slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TrackKind,
    pub slots: Vec<Slot>,
}

impl Track {
    pub fn new(id: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: id.into(),
            kind,
            slots: Vec::new(),
        }
    }

    /// Beat at which the last slot ends (0 for an empty track)
    pub fn end(&self) -> f64 {
        self.slots.iter().map(Slot::end).fold(0.0, f64::max)
    }
}

/// Bar-oriented score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarScore {
    pub key: String,
    pub tempo: f64,
    pub beats_per_bar: f64,
    pub bars: Vec<Bar>,
}

impl BarScore {
    /// A score of `bar_count` bars, each holding one empty note slot.
    pub fn empty(key: impl Into<String>, tempo: f64, beats_per_bar: f64, bar_count: usize) -> Self {
        let kind = Payload::default();
        Self {
            key: key.into(),
            tempo,
            beats_per_bar,
            bars: (1..=bar_count)
                .map(|n| Bar::empty(n, beats_per_bar, &kind))
                .collect(),
        }
    }

    pub fn bar(&self, bar_number: usize) -> Option<&Bar> {
        bar_number
            .checked_sub(1)
            .and_then(|index| self.bars.get(index))
    }

    pub fn total_duration(&self) -> f64 {
        round_beats(self.bars.iter().map(Bar::total_duration).sum())
    }

    /// Flatten bars into one continuous slot list with track-relative beats.
    ///
    /// Bar-local beats are offset by `(barNumber - 1) * beatsPerBar`; slots are
    /// copied as they are, sustain fragments included.
    pub fn to_track_slots(&self) -> Vec<Slot> {
        self.bars
            .iter()
            .enumerate()
            .flat_map(|(index, bar)| {
                let offset = index as f64 * self.beats_per_bar;
                bar.slots.iter().map(move |slot| Slot {
                    beat: round_beats(slot.beat + offset),
                    ..slot.clone()
                })
            })
            .collect()
    }
}

/// Track-oriented score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackScore {
    pub key: String,
    pub tempo: f64,
    pub tracks: Vec<Track>,
}

impl TrackScore {
    pub fn track(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }
}

/// Either score form, as read from a persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Score {
    Bars(BarScore),
    Tracks(TrackScore),
}

impl Score {
    pub fn key(&self) -> &str {
        match self {
            Score::Bars(score) => &score.key,
            Score::Tracks(score) => &score.key,
        }
    }
}
