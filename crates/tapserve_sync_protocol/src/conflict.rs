//! Manual conflict resolution choices.

use std::fmt;
use std::str::FromStr;

/// How to settle a divergence between a local unsynced record and the
/// server's version of it.
///
/// The sync cycle never picks one of these on its own; a caller (usually an
/// operator action) passes the choice to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResolution {
    /// Keep the local edit and queue it for push; the server copy is discarded.
    Local,
    /// Accept the server copy; the local edit is discarded.
    Server,
    /// Server fields as base, local fields on top, queued as an update.
    Merge,
}

impl ConflictResolution {
    /// Returns the lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictResolution::Local => "local",
            ConflictResolution::Server => "server",
            ConflictResolution::Merge => "merge",
        }
    }

    /// Converts to a code.
    pub fn to_code(&self) -> u8 {
        match self {
            ConflictResolution::Local => 1,
            ConflictResolution::Server => 2,
            ConflictResolution::Merge => 3,
        }
    }

    /// Converts from a code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(ConflictResolution::Local),
            2 => Some(ConflictResolution::Server),
            3 => Some(ConflictResolution::Merge),
            _ => None,
        }
    }
}

impl fmt::Display for ConflictResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown resolution name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseResolutionError(String);

impl fmt::Display for ParseResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown conflict resolution '{}' (expected local, server or merge)",
            self.0
        )
    }
}

impl std::error::Error for ParseResolutionError {}

impl FromStr for ConflictResolution {
    type Err = ParseResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(ConflictResolution::Local),
            "server" => Ok(ConflictResolution::Server),
            "merge" => Ok(ConflictResolution::Merge),
            _ => Err(ParseResolutionError(s.to_string())),
        }
    }
}
