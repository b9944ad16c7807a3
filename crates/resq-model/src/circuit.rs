use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// State of one circuit.
///
/// - `Closed`: calls pass through; consecutive failures are counted.
/// - `Open`: calls fail fast without touching the backend.
/// - `HalfOpen`: a bounded number of trial calls probe whether the backend recovered.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CircuitState {
    #[default]
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

impl FromStr for CircuitState {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "closed" => Ok(CircuitState::Closed),
            "open" => Ok(CircuitState::Open),
            "half_open" | "halfopen" => Ok(CircuitState::HalfOpen),
            other => Err(ModelError::UnknownCircuitState(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_closed() {
        assert_eq!(CircuitState::default(), CircuitState::Closed);
    }

    #[test]
    fn parses_labels() {
        assert_eq!("half-open".parse::<CircuitState>().unwrap(), CircuitState::HalfOpen);
        assert_eq!("OPEN".parse::<CircuitState>().unwrap(), CircuitState::Open);
        assert!("ajar".parse::<CircuitState>().is_err());
    }
}
