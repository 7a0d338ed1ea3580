//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and session execution.

use std::path::PathBuf;

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: cryptopolis_core::config::ConfigError,
    },

    /// The initial state could not be built.
    #[error("state error: {source}")]
    State {
        /// The underlying state error.
        #[from]
        source: cryptopolis_core::state::StateError,
    },

    /// The session loop failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: cryptopolis_core::runner::RunnerError,
    },

    /// The final snapshot could not be produced.
    #[error("snapshot error: {source}")]
    Snapshot {
        /// The underlying snapshot error.
        #[from]
        source: cryptopolis_core::snapshot::SnapshotError,
    },

    /// A snapshot file could not be read or written.
    #[error("snapshot file {}: {source}", path.display())]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
