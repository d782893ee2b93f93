//! Errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that may be returned by this crate.
///
/// Tree mutation and event dispatch never return these; misuse there is a logged no-op.
#[derive(Debug, Error)]
pub enum Error {
    /// The text is not a component identifier.
    #[error("invalid component id: {0:?}")]
    InvalidId(String),

    /// A settings file could not be read.
    #[error("failed to read settings from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A settings document could not be parsed.
    #[error("invalid settings: {0}")]
    Settings(#[from] serde_json::Error),

    /// A component cannot be mounted as the root of a tree: it does not exist, has an owner, or
    /// is a dialog.
    #[error("cannot mount {0} as root")]
    Mount(crate::id::ComponentId),

    /// An event payload could not be interpreted by the receiving component.
    #[error("malformed payload for {kind}: {payload:?}")]
    MalformedPayload { kind: &'static str, payload: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
