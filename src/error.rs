/// Error taxonomy for the tagging core
///
/// Every error is scoped to the single operation that produced it.
/// Nothing here is fatal to the process.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::state::photo::Version;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// No photo record is registered under this identity
    #[error("no photo registered under identity '{0}'")]
    PhotoNotFound(String),

    /// The requested history entry does not exist
    #[error("photo '{identity}' has no snapshot at version {version}")]
    SnapshotNotFound { identity: String, version: Version },

    /// A different file already owns this identity
    #[error("'{}' has the same identity '{identity}' as the known photo '{}'", .selected.display(), .recorded.display())]
    IdentityConflict {
        identity: String,
        recorded: PathBuf,
        selected: PathBuf,
    },

    /// The tag name cannot be encoded into a filename
    #[error("invalid tag name '{name}': {reason}")]
    InvalidTagName { name: String, reason: &'static str },

    /// Physical rename or store I/O failed
    #[error("file I/O error{}: {source}; path: '{}'", context_suffix(.context), .path.display())]
    FileIo {
        path: PathBuf,
        context: Option<String>,
        #[source]
        source: std::io::Error,
    },

    /// The rename target is already taken by a different file
    #[error("cannot rename '{}' to '{}': destination already exists", .from.display(), .to.display())]
    DestinationExists { from: PathBuf, to: PathBuf },

    /// A store blob could not be encoded or decoded
    #[error("failed to (de)serialize '{}': {source}", .path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Tag and photo indices disagree about who carries what
    #[error("index consistency violation: {0}")]
    ConsistencyViolation(String),
}

fn context_suffix(context: &Option<String>) -> String {
    context
        .as_ref()
        .map(|msg| format!(" ({msg})"))
        .unwrap_or_default()
}

impl Error {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::FileIo {
            path: path.as_ref().to_path_buf(),
            context: None,
            source,
        }
    }

    pub fn io_with_context(
        path: impl AsRef<Path>,
        source: std::io::Error,
        context: impl Into<String>,
    ) -> Self {
        Self::FileIo {
            path: path.as_ref().to_path_buf(),
            context: Some(context.into()),
            source,
        }
    }

    /// NotFound-class errors are benign: the caller addressed something absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PhotoNotFound(_) | Self::SnapshotNotFound { .. })
    }
}
