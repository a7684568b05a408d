//! Crate-wide error taxonomy.
//!
//! Configuration and correlation errors are fatal: they are raised before or
//! during factor-space construction and abort the run. Evaluation failures
//! are deliberately *not* part of [`Error`]; they are recovered by the
//! driver loop and recorded as failing responses (see [`crate::evaluate`]).

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or invalid project files, or bad strategy parameters.
    /// Always raised before any experiment runs.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The round-trip sanity check failed: the marker-stripped annotated tree
    /// does not render back to the reference source. A wrong correlation
    /// would silently corrupt every subsequent deletion, so this aborts
    /// factor-space construction immediately.
    #[error("correlation sanity check failed for {file}: {detail}")]
    Correlation { file: PathBuf, detail: String },

    /// The external structural toolchain failed or produced unparseable
    /// output.
    #[error("toolchain error: {0}")]
    Toolchain(String),

    /// A persisted plan file does not match the expected shape.
    #[error("plan format error in {path}: {detail}")]
    PlanFormat { path: PathBuf, detail: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn configuration(detail: impl Into<String>) -> Self {
        Error::Configuration(detail.into())
    }

    pub fn toolchain(detail: impl Into<String>) -> Self {
        Error::Toolchain(detail.into())
    }
}
