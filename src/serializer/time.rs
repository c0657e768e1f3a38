//! Second-precision UTC timestamps.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::EncodingError;
use crate::serializer::{ByteBuffer, Encode};

const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Seconds since the Unix epoch, as the chain stores them (u32).
///
/// JSON form is `YYYY-MM-DDTHH:MM:SS` without a zone suffix. Parsing also
/// accepts a trailing `Z` and fractional seconds, which are truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimePointSec(pub u32);

impl TimePointSec {
    pub fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    pub fn secs(self) -> u32 {
        self.0
    }

    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Clamps to the u32 range the chain can represent.
    pub fn from_datetime(time: DateTime<Utc>) -> Self {
        Self(time.timestamp().clamp(0, i64::from(u32::MAX)) as u32)
    }

    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(i64::from(self.0), 0)
    }

    pub fn saturating_add_secs(self, secs: u32) -> Self {
        Self(self.0.saturating_add(secs))
    }
}

impl FromStr for TimePointSec {
    type Err = EncodingError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = || EncodingError::InvalidTime {
            input: input.to_string(),
        };
        let trimmed = input.strip_suffix('Z').unwrap_or(input);
        let whole = trimmed.split('.').next().unwrap_or(trimmed);
        let naive = NaiveDateTime::parse_from_str(whole, FORMAT).map_err(|_| invalid())?;
        let secs = naive.and_utc().timestamp();
        u32::try_from(secs).map(Self).map_err(|_| invalid())
    }
}

impl fmt::Display for TimePointSec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(time) => write!(f, "{}", time.format(FORMAT)),
            None => write!(f, "{}", self.0),
        }
    }
}

impl Encode for TimePointSec {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), EncodingError> {
        buf.write_u32(self.0);
        Ok(())
    }
}

impl Serialize for TimePointSec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimePointSec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
