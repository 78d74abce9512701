//! # Error Types
//!
//! This module defines all error types for the time-slicing engine.
//!
//! Errors carry the bar number and beat (or track beat) where the problem was found
//! so that an editor can point the user at the offending position.
//!
//! ## Error Types
//! - `PositionNotFound` - An insertion targeted a bar/beat with no slot
//! - `UnfillableGap` - Greedy decomposition could not tile a timing gap
//! - `InsufficientTrackLength` - A replacement ran off the end of a track
//! - `SemanticError` - A bar or track violates the model invariants
//! - `ConfigError` / `SerializationError` - Bad YAML configuration or JSON document
//!
//! ## Usage
//! ```rust
//! use timeslice::{insert_score, AllowedDurations, BarScore, Payload, SliceError};
//!
//! let score = BarScore::empty("C", 120.0, 4.0, 1);
//! let allowed = AllowedDurations::default();
//! match insert_score(&score, 3, 0.0, Payload::note("G4"), 1.0, &allowed) {
//!     Err(SliceError::PositionNotFound { bar, beat }) => {
//!         eprintln!("No slot at bar {} beat {}", bar, beat);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//!     Ok(_) => {}
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SliceError {
    /// The insertion target does not exist.
    ///
    /// # Example
    /// ```
    /// # use timeslice::SliceError;
    /// let err = SliceError::PositionNotFound { bar: 3, beat: 1.5 };
    /// assert_eq!(err.to_string(), "No slot starts at bar 3, beat 1.5");
    /// ```
    #[error("No slot starts at bar {bar}, beat {beat}")]
    PositionNotFound { bar: usize, beat: f64 },

    /// The allowed durations cannot exactly tile a gap.
    ///
    /// `residual` is the part of `gap` left over after greedy decomposition.
    #[error("Cannot fill a gap of {gap} beats with the allowed durations ({residual} beats left over)")]
    UnfillableGap { gap: f64, residual: f64 },

    /// A replacement needed more beats than the track holds after `beat`.
    #[error("Track too short at beat {beat}: needed {needed} beats, only {available} available")]
    InsufficientTrackLength {
        beat: f64,
        needed: f64,
        available: f64,
    },

    /// Durations must be finite and positive; beats must be finite and non-negative.
    #[error("Invalid duration or beat: {0}")]
    InvalidDuration(f64),

    #[error("Invalid beats per bar: {0}")]
    InvalidBeatsPerBar(f64),

    /// Invariant violation found by validation.
    ///
    /// # Example
    /// ```
    /// # use timeslice::SliceError;
    /// let err = SliceError::SemanticError {
    ///     bar: 2,
    ///     message: "Bar duration mismatch: expected 4 beats, got 3.5 beats".to_string(),
    /// };
    /// assert_eq!(
    ///     err.to_string(),
    ///     "Semantic error at bar 2: Bar duration mismatch: expected 4 beats, got 3.5 beats"
    /// );
    /// ```
    #[error("Semantic error at bar {bar}: {message}")]
    SemanticError { bar: usize, message: String },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Invalid score document: {0}")]
    SerializationError(String),
}
