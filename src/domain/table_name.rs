use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// PostgreSQL `NAMEDATALEN - 1`.
pub const MAX_IDENTIFIER_BYTES: usize = 63;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableNameError {
    #[error("Table name cannot be empty")]
    Empty,
    #[error("Table name too long: {len} bytes (max {max})")]
    TooLong { len: usize, max: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(String);

impl TableName {
    pub fn new(name: impl Into<String>) -> Result<Self, TableNameError> {
        let name = name.into();
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(TableNameError::Empty);
        }

        if trimmed.len() > MAX_IDENTIFIER_BYTES {
            return Err(TableNameError::TooLong {
                len: trimmed.len(),
                max: MAX_IDENTIFIER_BYTES,
            });
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Candidate for the given creation attempt; `None` is the bare name.
    pub fn with_suffix(&self, attempt: Option<u32>) -> Result<Self, TableNameError> {
        match attempt {
            None => Ok(self.clone()),
            Some(n) => Self::new(format!("{}{}", self.0, n)),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for TableName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TableName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        TableName::new(s).map_err(serde::de::Error::custom)
    }
}
