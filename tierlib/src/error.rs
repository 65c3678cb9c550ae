use thiserror::Error;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, SimulationError>;

/// Everything that can stop a simulation from being configured or started
///
/// Note that cancellation and progress callback failures are deliberately absent, neither of them
/// is an error from the point of view of the caller
#[derive(Debug, Error)]
pub enum SimulationError {
    /// A configuration value is out of range or inconsistent with the rest of the configuration
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The requested search structure isn't one of bst, hash, or trie
    #[error("unknown search structure '{0}', expected one of bst, hash, trie")]
    UnknownStructure(String),

    /// A cache level was given a capacity it can't hold entries with
    #[error("cache level {level} has invalid capacity {capacity}: {reason}")]
    InvalidCapacity {
        level: String,
        capacity: usize,
        reason: String,
    },

    /// An externally measured result couldn't be normalised
    #[error("invalid external measurement: {0}")]
    InvalidMeasurement(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimulationError {
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration(reason.into())
    }

    pub fn invalid_capacity(level: impl Into<String>, capacity: usize, reason: impl Into<String>) -> Self {
        Self::InvalidCapacity {
            level: level.into(),
            capacity,
            reason: reason.into(),
        }
    }
}
