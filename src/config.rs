//! Engine configuration.
//!
//! Bar length, the durations an insertion may use to fill gaps, and how many
//! bars a display row holds. Read from YAML with kebab-case keys:
//!
//! ```yaml
//! time-signature: 3/4
//! allowed-durations: [2, 1, 0.5, 0.25, 0.125]
//! bars-per-row: 4
//! ```
//!
//! `beats-per-bar: 3` may be given instead of `time-signature`, but not both.

use serde::Deserialize;

use crate::duration::{AllowedDurations, EPSILON};
use crate::error::SliceError;

pub const DEFAULT_BEATS_PER_BAR: f64 = 4.0;
pub const DEFAULT_BARS_PER_ROW: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub beats_per_bar: f64,
    pub allowed_durations: AllowedDurations,
    pub bars_per_row: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            beats_per_bar: DEFAULT_BEATS_PER_BAR,
            allowed_durations: AllowedDurations::default(),
            bars_per_row: DEFAULT_BARS_PER_ROW,
        }
    }
}

/// Raw configuration for YAML deserialization
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawConfig {
    time_signature: Option<String>,
    beats_per_bar: Option<f64>,
    allowed_durations: Option<AllowedDurations>,
    bars_per_row: Option<usize>,
}

impl EngineConfig {
    /// Parse a YAML configuration document. Missing keys take their defaults.
    ///
    /// # Example
    /// ```rust
    /// use timeslice::EngineConfig;
    ///
    /// let config = EngineConfig::from_yaml("time-signature: 6/8\nbars-per-row: 2").unwrap();
    /// assert_eq!(config.beats_per_bar, 3.0);
    /// assert_eq!(config.bars_per_row, 2);
    /// ```
    pub fn from_yaml(content: &str) -> Result<Self, SliceError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| SliceError::ConfigError(e.to_string()))?;

        let beats_per_bar = match (&raw.time_signature, raw.beats_per_bar) {
            (Some(_), Some(_)) => {
                return Err(SliceError::ConfigError(
                    "time-signature and beats-per-bar are mutually exclusive".to_string(),
                ))
            }
            (Some(ts), None) => parse_time_signature(ts)?,
            (None, Some(bpb)) => {
                if !bpb.is_finite() || bpb <= EPSILON {
                    return Err(SliceError::InvalidBeatsPerBar(bpb));
                }
                bpb
            }
            (None, None) => DEFAULT_BEATS_PER_BAR,
        };

        let allowed_durations = raw.allowed_durations.unwrap_or_default();

        let bars_per_row = match raw.bars_per_row {
            Some(0) => {
                return Err(SliceError::ConfigError(
                    "bars-per-row must be at least 1".to_string(),
                ))
            }
            Some(n) => n,
            None => DEFAULT_BARS_PER_ROW,
        };

        Ok(Self {
            beats_per_bar,
            allowed_durations,
            bars_per_row,
        })
    }
}

/// `N/D` to a bar length in quarter-note beats.
fn parse_time_signature(s: &str) -> Result<f64, SliceError> {
    let parts: Vec<&str> = s.split('/').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(SliceError::ConfigError(format!("Invalid time signature: {}", s)));
    }

    let beats: u32 = parts[0]
        .parse()
        .map_err(|_| SliceError::ConfigError(format!("Invalid time signature beats: {}", s)))?;
    let beat_type: u32 = parts[1]
        .parse()
        .map_err(|_| SliceError::ConfigError(format!("Invalid time signature beat type: {}", s)))?;

    if beats == 0 || beat_type == 0 {
        return Err(SliceError::ConfigError(format!("Invalid time signature: {}", s)));
    }

    Ok(beats as f64 * 4.0 / beat_type as f64)
}
