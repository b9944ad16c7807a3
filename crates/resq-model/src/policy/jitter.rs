use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::error::{ModelError, ModelResult};

/// Multiplicative jitter applied to a backoff delay.
///
/// Every delay is `base * uniform(min_factor, max_factor)`, so randomised retries
/// spread out instead of hitting a recovering backend in lock-step.
/// Both factors lie in `[0, 1]`, so jitter only ever shortens the base delay.
///
/// Named presets accepted by [`FromStr`]:
/// - `none`:  `[1.0, 1.0]`, deterministic delays.
/// - `equal`: `[0.5, 1.0]`, the default.
/// - `full`:  `[0.0, 1.0]`, most collision-resistant.
///
/// An explicit range is written as `"min..max"`, e.g. `"0.75..1.0"`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct JitterRange {
    pub min_factor: f64,
    pub max_factor: f64,
}

impl JitterRange {
    pub const NONE: JitterRange = JitterRange {
        min_factor: 1.0,
        max_factor: 1.0,
    };
    pub const EQUAL: JitterRange = JitterRange {
        min_factor: 0.5,
        max_factor: 1.0,
    };
    pub const FULL: JitterRange = JitterRange {
        min_factor: 0.0,
        max_factor: 1.0,
    };

    /// Build a validated range.
    pub fn new(min_factor: f64, max_factor: f64) -> ModelResult<Self> {
        let range = Self {
            min_factor,
            max_factor,
        };
        range.validate()?;
        Ok(range)
    }

    /// Rules: both factors finite, within `[0, 1]`, and `min <= max`.
    pub fn validate(&self) -> ModelResult<()> {
        let in_unit = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        if !in_unit(self.min_factor) || !in_unit(self.max_factor) {
            return Err(ModelError::UnknownJitter(format!(
                "factors must lie within [0, 1], got {self}"
            )));
        }
        if self.min_factor > self.max_factor {
            return Err(ModelError::UnknownJitter(format!(
                "min factor exceeds max factor in {self}"
            )));
        }
        Ok(())
    }

    /// Returns `true` if the range always yields the base delay unchanged.
    pub fn is_deterministic(&self) -> bool {
        self.min_factor == 1.0 && self.max_factor == 1.0
    }
}

impl Default for JitterRange {
    fn default() -> Self {
        JitterRange::EQUAL
    }
}

impl fmt::Display for JitterRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.min_factor, self.max_factor)
    }
}

impl FromStr for JitterRange {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        let norm = s.trim().to_ascii_lowercase();
        match norm.as_str() {
            "" | "none" => Ok(JitterRange::NONE),
            "equal" | "default" => Ok(JitterRange::EQUAL),
            "full" => Ok(JitterRange::FULL),
            other => {
                let (lo, hi) = other
                    .split_once("..")
                    .ok_or_else(|| ModelError::UnknownJitter(s.to_string()))?;
                let parse = |v: &str| {
                    v.trim()
                        .parse::<f64>()
                        .map_err(|_| ModelError::UnknownJitter(s.to_string()))
                };
                JitterRange::new(parse(lo)?, parse(hi)?)
            }
        }
    }
}
