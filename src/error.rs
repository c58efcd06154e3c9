//! # `rs_recorder` Error module
//!
//! Provides abstractions over errors which can occur during this crate's use.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::path::PathBuf;

use serde_any;
use thiserror;

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

/// Result type used by faillible functions inside the `rs_recorder` crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad failure categories, used at the CLI boundary to decide how to report an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// No compatible device could be found or opened.
    SourceUnavailable,

    /// The camera SDK reported a failure while executing an operation.
    Collaborator,

    /// Everything else: I/O, encoding, configuration.
    Generic,
}

/// Represents errors which can occur during use of the `rs_recorder` crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("No compatible camera available: {0}")]
    SourceUnavailable(String),

    #[error("RealSense error calling {operation}({args}):\n    {message}")]
    Collaborator {
        operation: String,
        args: String,
        message: String,
    },

    #[error("Cannot find file at {0:?}")]
    FileNotFound(PathBuf),

    #[error("Error deserialising data: {0}")]
    DeserialisationError(serde_any::Error),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Error encoding image to {path:?}: {source}")]
    Encode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error(
        "Cannot encode a {width}x{height} buffer with {bytes_per_pixel} bytes per pixel and a \
        stride of {stride} bytes from {len} bytes of data"
    )]
    UnsupportedPixelLayout {
        width: u32,
        height: u32,
        bytes_per_pixel: u32,
        stride: u32,
        len: usize,
    },

    #[error("Cannot spawn persistence worker {name}: {source}")]
    WorkerSpawn {
        name: String,
        source: std::io::Error,
    },

    #[error("Persistence worker {0} panicked")]
    WorkerPanicked(String),

    #[error("Error building recorder: {0}")]
    BuildError(String),

    #[error("{failures} frame artifact(s) could not be written")]
    PersistenceFailed { failures: usize },
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Error {
    /// Get the category this error falls into.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::SourceUnavailable(_) => ErrorCategory::SourceUnavailable,
            Error::Collaborator { .. } => ErrorCategory::Collaborator,
            _ => ErrorCategory::Generic,
        }
    }

    /// Shorthand for wrapping an SDK failure.
    pub fn collaborator<O, A, M>(operation: O, args: A, message: M) -> Self
    where
        O: Into<String>,
        A: Into<String>,
        M: Into<String>,
    {
        Error::Collaborator {
            operation: operation.into(),
            args: args.into(),
            message: message.into(),
        }
    }

    pub(crate) fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
