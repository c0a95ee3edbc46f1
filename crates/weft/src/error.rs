use thiserror::Error;

use crate::host::HostError;

/// Errors surfaced by the engine's public entry points.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The caller supplied an element the engine has no instantiation rule
    /// for. Rejected eagerly at element construction, and re-checked when a
    /// fiber reaches materialization.
    #[error("malformed element: {0}")]
    MalformedElement(&'static str),

    /// A host primitive failed. Mutations already applied before the failure
    /// are not rolled back; the current committed tree pointer is left
    /// unadvanced so a subsequent schedule retries from a clean slate.
    #[error(transparent)]
    Host(#[from] HostError),
}
