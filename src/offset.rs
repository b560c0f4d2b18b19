//! Stream position markers
//!
//! An [`Offset`] is carried as an opaque string but is numerically
//! comparable: ordering is defined by its base-10 integer value. The agent
//! uses the numeric form only for the monotonicity check; backends persist
//! and return the string form unchanged.

use crate::error::{CheckpointerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a consumer within a partition's stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Offset(String);

impl Offset {
    /// Sentinel for a consumer that has not read anything yet
    pub const START_OF_STREAM: &'static str = "-1";

    /// Create an offset from its string form
    pub fn new(value: impl Into<String>) -> Self {
        Offset(value.into())
    }

    /// The start-of-stream sentinel offset
    pub fn start_of_stream() -> Self {
        Offset(Self::START_OF_STREAM.to_string())
    }

    /// String form of the offset
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value used for ordering
    ///
    /// Valid offsets are base-10 integer strings; anything else is rejected
    /// as [`CheckpointerError::InvalidOffset`].
    pub fn numeric(&self) -> Result<i64> {
        self.0
            .parse::<i64>()
            .map_err(|_| CheckpointerError::InvalidOffset(self.0.clone()))
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Offset {
    fn from(value: String) -> Self {
        Offset(value)
    }
}

impl From<&str> for Offset {
    fn from(value: &str) -> Self {
        Offset(value.to_string())
    }
}
