use std::io;

use thiserror::Error;

/// Errors that abort a build or a configuration load.
///
/// Recoverable input problems (bad restriction relations, unparseable
/// levels, ways matching no rule) never surface here; they are logged and
/// the build continues with a default.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Two ways claim incompatible labels for the same level of one
    /// elevator node.
    #[error("node {node} has conflicting labels {existing:?} and {claimed:?} at level {level}")]
    LevelConflict {
        node: i64,
        level: i64,
        existing: String,
        claimed: String,
    },

    #[error("malformed specifier {spec:?}: fragment {fragment:?} is not key=value")]
    MalformedSpecifier { spec: String, fragment: String },

    #[error("unknown permission {0:?}")]
    UnknownPermission(String),

    #[error("safety multiplier {value} for {spec:?} must not be negative")]
    NegativeSafety { spec: String, value: f64 },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = BuildError> = std::result::Result<T, E>;
