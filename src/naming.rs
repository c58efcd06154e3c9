//! # Output Naming Module
//!
//! Derives the paths frame artifacts are written to. Every path is a pure function of the
//! layout, the device label, the stream kind and the frame number, so two workers persisting
//! different frames or streams can never target the same file.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::frame::StreamKind;

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

/// How output files are arranged below the output root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    /// Shared `depth/`, `colour/`, `depth_metadata/` and `colour_metadata/` directories, the
    /// label is prefixed to each file name, metadata tables are `.txt` files.
    Flat,

    /// One `camera_<label>/` directory per device holding the four stream directories, files
    /// are named by frame number only, metadata tables are `.csv` files.
    DeviceScoped,
}

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Immutable per-device parameters used to name output files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingContext {
    root: PathBuf,
    label: String,
    layout: OutputLayout,
    image_extension: &'static str,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Default for OutputLayout {
    fn default() -> Self {
        OutputLayout::Flat
    }
}

impl NamingContext {
    /// Create a new naming context writing PNG colour images.
    pub fn new<P: AsRef<Path>, L: Into<String>>(root: P, label: L, layout: OutputLayout) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            label: label.into(),
            layout,
            image_extension: "png",
        }
    }

    /// Set the extension used for colour image files.
    pub fn image_extension(mut self, extension: &'static str) -> Self {
        self.image_extension = extension;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Directory holding the data files of a stream.
    pub fn data_dir(&self, stream: StreamKind) -> PathBuf {
        self.base().join(stream.file_stem())
    }

    /// Directory holding the metadata tables of a stream.
    pub fn metadata_dir(&self, stream: StreamKind) -> PathBuf {
        self.base().join(format!("{}_metadata", stream.file_stem()))
    }

    /// Path of the data file (depth grid or colour image) of a frame.
    pub fn data_path(&self, stream: StreamKind, frame_number: u64) -> PathBuf {
        let ext = match stream {
            StreamKind::Depth => "csv",
            StreamKind::Color => self.image_extension,
        };

        let name = match self.layout {
            OutputLayout::Flat => {
                format!("{}_{}_{}.{}", self.label, stream.file_stem(), frame_number, ext)
            }
            OutputLayout::DeviceScoped => format!("{}.{}", frame_number, ext),
        };

        self.data_dir(stream).join(name)
    }

    /// Path of the metadata table of a frame.
    pub fn metadata_path(&self, stream: StreamKind, frame_number: u64) -> PathBuf {
        let name = match self.layout {
            OutputLayout::Flat => format!(
                "{}_{}_metadata_{}.txt",
                self.label,
                stream.file_stem(),
                frame_number
            ),
            OutputLayout::DeviceScoped => format!("{}.csv", frame_number),
        };

        self.metadata_dir(stream).join(name)
    }

    /// Every directory this context writes into.
    pub fn directories(&self) -> Vec<PathBuf> {
        StreamKind::ALL
            .iter()
            .flat_map(|s| vec![self.data_dir(*s), self.metadata_dir(*s)])
            .collect()
    }

    /// Create the output directories, optionally removing any existing ones (and their
    /// contents) first.
    ///
    /// Recording never creates directories itself, this must be called beforehand.
    pub fn prepare(&self, clean: bool) -> Result<()> {
        for dir in self.directories() {
            if clean && dir.exists() {
                fs::remove_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
            }

            fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        }

        Ok(())
    }

    fn base(&self) -> PathBuf {
        match self.layout {
            OutputLayout::Flat => self.root.clone(),
            OutputLayout::DeviceScoped => self.root.join(format!("camera_{}", self.label)),
        }
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_paths() {
        let ctx = NamingContext::new("out", "raspi1", OutputLayout::Flat);

        assert_eq!(
            ctx.data_path(StreamKind::Depth, 42),
            Path::new("out/depth/raspi1_depth_42.csv")
        );
        assert_eq!(
            ctx.metadata_path(StreamKind::Depth, 42),
            Path::new("out/depth_metadata/raspi1_depth_metadata_42.txt")
        );
        assert_eq!(
            ctx.data_path(StreamKind::Color, 42),
            Path::new("out/colour/raspi1_colour_42.png")
        );
        assert_eq!(
            ctx.metadata_path(StreamKind::Color, 42),
            Path::new("out/colour_metadata/raspi1_colour_metadata_42.txt")
        );
    }

    #[test]
    fn test_device_scoped_paths() {
        let ctx = NamingContext::new("", "138322250306", OutputLayout::DeviceScoped);

        assert_eq!(
            ctx.data_path(StreamKind::Depth, 3),
            Path::new("camera_138322250306/depth/3.csv")
        );
        assert_eq!(
            ctx.metadata_path(StreamKind::Color, 3),
            Path::new("camera_138322250306/colour_metadata/3.csv")
        );
    }

    #[test]
    fn test_paths_never_collide() {
        let ctx = NamingContext::new("out", "cam", OutputLayout::Flat);
        let mut paths = std::collections::HashSet::new();

        for n in 0..50 {
            for s in StreamKind::ALL.iter() {
                assert!(paths.insert(ctx.data_path(*s, n)));
                assert!(paths.insert(ctx.metadata_path(*s, n)));
            }
        }
    }

    #[test]
    fn test_directories() {
        let ctx = NamingContext::new("out", "cam", OutputLayout::DeviceScoped);
        let dirs = ctx.directories();

        assert_eq!(dirs.len(), 4);
        assert!(dirs.contains(&PathBuf::from("out/camera_cam/colour_metadata")));
    }
}
