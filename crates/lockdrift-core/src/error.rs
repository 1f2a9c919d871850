//! Error types for lockdrift-core.

use thiserror::Error;

/// Result type alias using the lockdrift-core Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading either manifest.
///
/// The diff itself is never an error; only unreadable or malformed inputs
/// are. Loads fail as a whole, with no partial recovery.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error reading an input file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The lockfile is not valid JSON.
    #[error("lockfile JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The lockfile parsed as JSON but does not have the expected shape
    /// (sections mapping package names to metadata records).
    #[error("malformed lockfile: {detail}")]
    LockFormat {
        /// What was wrong with the document structure.
        detail: String,
    },

    /// A requirement line could not be parsed or its marker evaluated.
    #[error("invalid requirement on line {line}: {reason} (in `{text}`)")]
    Requirement {
        /// 1-based number of the logical line's first physical line.
        line: usize,
        /// The offending line text.
        text: String,
        /// What failed.
        reason: String,
    },
}
