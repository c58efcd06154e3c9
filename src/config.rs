//! # Recorder Configuration
//!
//! Settings for a recording run, loadable from any file format supported by
//! [`serde_any`](https://docs.rs/serde_any/0.5.0/serde_any/), e.g. `recorder.toml`:
//!
//! ```toml
//! warmup = 30
//! dispatch = "asynchronous"
//! output_root = "."
//! label = "raspi1"
//! layout = "flat"
//!
//! [depth]
//! width = 640
//! height = 480
//! fps = 90
//!
//! [color]
//! width = 640
//! height = 360
//! fps = 90
//! ```

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::naming::OutputLayout;
use crate::recorder::{Dispatch, DEFAULT_WARMUP};
use crate::source::StreamSpec;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Everything needed to set up a recording run. Missing fields take their default value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Depth stream resolution and rate
    pub depth: StreamSpec,

    /// Colour stream resolution and rate
    pub color: StreamSpec,

    /// Number of frame sets discarded before recording starts
    pub warmup: u32,

    /// Whether frames are persisted inline or on worker threads
    pub dispatch: Dispatch,

    /// Directory the output layout is rooted at
    pub output_root: PathBuf,

    /// Label used in file names when recording a single, unnamed device
    pub label: String,

    pub layout: OutputLayout,

    /// Serial numbers of the devices to record, empty to record the first available device
    pub devices: Vec<String>,

    /// Create the output directories before recording
    pub create_dirs: bool,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            depth: StreamSpec::DEPTH,
            color: StreamSpec::COLOR,
            warmup: DEFAULT_WARMUP,
            dispatch: Dispatch::Asynchronous,
            output_root: PathBuf::from("."),
            label: String::from("raspi1"),
            layout: OutputLayout::Flat,
            devices: Vec::new(),
            create_dirs: false,
        }
    }
}

impl RecorderConfig {
    /// Load the configuration from a file.
    ///
    /// The file type will be guessed from its extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        // Check the file exists
        if !path.as_ref().exists() {
            return Err(Error::FileNotFound(path.as_ref().to_path_buf()));
        }

        serde_any::from_file(path).map_err(Error::DeserialisationError)
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "rs_recorder_config_{}_{}",
            std::process::id(),
            name
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let path = write_config(
            "partial.toml",
            "warmup = 5\ndispatch = \"synchronous\"\nlayout = \"device_scoped\"\n\n\
             [color]\nwidth = 4\nheight = 2\nfps = 15\n",
        );

        let config = RecorderConfig::from_file(&path).unwrap();
        assert_eq!(config.warmup, 5);
        assert_eq!(config.dispatch, Dispatch::Synchronous);
        assert_eq!(config.layout, OutputLayout::DeviceScoped);
        assert_eq!(config.color, StreamSpec::new(4, 2, 15));
        assert_eq!(config.depth, StreamSpec::DEPTH);
        assert_eq!(config.label, "raspi1");

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_json_devices() {
        let path = write_config(
            "devices.json",
            r#"{ "devices": ["138322250306", "141322252882"], "output_root": "captures" }"#,
        );

        let config = RecorderConfig::from_file(&path).unwrap();
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.output_root, PathBuf::from("captures"));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_file() {
        let err = RecorderConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn test_malformed_file() {
        let path = write_config("bad.toml", "warmup = \"lots\"\n");
        let err = RecorderConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, Error::DeserialisationError(_)));
        std::fs::remove_file(path).unwrap();
    }
}
