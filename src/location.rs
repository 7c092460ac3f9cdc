use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Device position captured once at startup and passed read-only into every turn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum LocationParseError {
    #[error("expected \"<latitude>,<longitude>\", got {0:?}")]
    Format(String),
    #[error("invalid coordinate {0:?}")]
    Coordinate(String),
    #[error("coordinate out of range: latitude {0}, longitude {1}")]
    Range(f64, f64),
}

impl FromStr for Location {
    type Err = LocationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| LocationParseError::Format(s.to_string()))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .map_err(|_| LocationParseError::Coordinate(v.trim().to_string()))
        };
        let (latitude, longitude) = (parse(lat)?, parse(lng)?);
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(LocationParseError::Range(latitude, longitude));
        }
        Ok(Self { latitude, longitude })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "纬度 {}, 经度 {}", self.latitude, self.longitude)
    }
}
