//! # `RecorderBuilder` implementation
//!
//! This module implements the builder for recorder objects.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::config::RecorderConfig;
use crate::encoder::{ImageEncoder, PngEncoder};
use crate::error::{Error, Result};
use crate::naming::{NamingContext, OutputLayout};
use crate::recorder::{DeviceContext, Dispatch, Recorder};
use crate::source::{CaptureSession, FrameSource, StreamConfig, StreamSpec};

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Builds a [`Recorder`] from a configuration and a frame source.
pub struct RecorderBuilder {
    config: RecorderConfig,

    encoder: Arc<dyn ImageEncoder>,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Default for RecorderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderBuilder {
    pub fn new() -> Self {
        Self {
            config: RecorderConfig::default(),
            encoder: Arc::new(PngEncoder),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: RecorderConfig) -> Self {
        self.config = config;

        self
    }

    /// Load the configuration from a file, replacing anything set so far.
    pub fn config_from_file<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        Ok(self.config(RecorderConfig::from_file(path)?))
    }

    /// Get the configuration as it currently stands.
    pub fn current_config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Set the number of frame sets discarded before recording.
    ///
    /// Default value is 30.
    pub fn warmup(mut self, warmup: u32) -> Self {
        self.config.warmup = warmup;

        self
    }

    /// Set how frames are dispatched to persistence.
    ///
    /// Default value is `Dispatch::Asynchronous`.
    pub fn dispatch(mut self, dispatch: Dispatch) -> Self {
        self.config.dispatch = dispatch;

        self
    }

    /// Set the directory output is written below.
    ///
    /// Default value is the working directory.
    pub fn output_root<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.config.output_root = root.as_ref().to_path_buf();

        self
    }

    /// Set the label used in file names when recording a single, unnamed device.
    ///
    /// Default value is `raspi1`.
    pub fn label<S: Into<String>>(mut self, label: S) -> Self {
        self.config.label = label.into();

        self
    }

    /// Set the output layout.
    ///
    /// Default value is `OutputLayout::Flat`.
    pub fn layout(mut self, layout: OutputLayout) -> Self {
        self.config.layout = layout;

        self
    }

    /// Add a device to record by serial number.
    pub fn device<S: Into<String>>(mut self, serial: S) -> Self {
        self.config.devices.push(serial.into());

        self
    }

    /// Set the depth stream resolution and rate.
    ///
    /// Default value is 640x480 at 90 fps.
    pub fn depth(mut self, spec: StreamSpec) -> Self {
        self.config.depth = spec;

        self
    }

    /// Set the colour stream resolution and rate.
    ///
    /// Default value is 640x360 at 90 fps.
    pub fn color(mut self, spec: StreamSpec) -> Self {
        self.config.color = spec;

        self
    }

    /// Set the same resolution and rate on both streams.
    pub fn resolution(self, width: u32, height: u32, fps: u32) -> Self {
        let spec = StreamSpec::new(width, height, fps);

        self.depth(spec).color(spec)
    }

    /// Whether to create the output directories while building.
    ///
    /// Default value is `false`, in which case they must already exist.
    pub fn create_dirs(mut self, create: bool) -> Self {
        self.config.create_dirs = create;

        self
    }

    /// Set the encoder used for colour frames.
    pub fn encoder<E: ImageEncoder + 'static>(mut self, encoder: E) -> Self {
        self.encoder = Arc::new(encoder);

        self
    }

    /// Build the recorder, configuring one session from `source` per device.
    ///
    /// This function can fail if the source rejects the stream configuration or the output
    /// directories cannot be created.
    pub fn build<F: FrameSource>(self, source: &mut F) -> Result<Recorder<F::Session>> {
        let config = self.config;

        // Check for the same device being requested twice, which would make output collide
        let mut seen = HashSet::new();
        if let Some(dup) = config.devices.iter().find(|s| !seen.insert(s.as_str())) {
            return Err(Error::BuildError(format!(
                "Device {} requested more than once",
                dup
            )));
        }

        let requested: Vec<Option<String>> = if config.devices.is_empty() {
            vec![None]
        } else {
            config.devices.iter().cloned().map(Some).collect()
        };
        let named_by_serial =
            !config.devices.is_empty() || config.layout == OutputLayout::DeviceScoped;

        let mut devices = Vec::with_capacity(requested.len());
        for device in requested {
            let stream_config = StreamConfig {
                device,
                depth: config.depth,
                color: config.color,
            };
            let session = source.configure(&stream_config)?;

            let label = if named_by_serial {
                session.serial().to_string()
            } else {
                config.label.clone()
            };
            let naming = NamingContext::new(&config.output_root, label, config.layout)
                .image_extension(self.encoder.extension());

            if config.create_dirs {
                naming.prepare(false)?;
            }

            devices.push(DeviceContext::new(session, naming));
        }

        Ok(Recorder::new(
            devices,
            self.encoder,
            config.warmup,
            config.dispatch,
        ))
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use super::*;
    use crate::synthetic::SyntheticSource;

    /// Test that a single unnamed device uses the configured label
    #[test]
    fn test_single_device_label() {
        let recorder = RecorderBuilder::new()
            .label("raspi2")
            .build(&mut SyntheticSource::new())
            .expect("Cannot build recorder");

        assert_eq!(recorder.devices().len(), 1);
        assert_eq!(recorder.devices()[0].naming().label(), "raspi2");
        assert_eq!(recorder.dispatch(), Dispatch::Asynchronous);
    }

    /// Test that explicitly requested devices are named by serial number
    #[test]
    fn test_devices_named_by_serial() {
        let mut source = SyntheticSource::with_devices(vec!["138322250306", "141322252882"]);
        let recorder = RecorderBuilder::new()
            .layout(OutputLayout::DeviceScoped)
            .device("138322250306")
            .device("141322252882")
            .build(&mut source)
            .expect("Cannot build recorder");

        let labels = recorder
            .devices()
            .iter()
            .map(|d| d.naming().label().to_string())
            .collect::<Vec<_>>();
        assert_eq!(labels, vec!["138322250306", "141322252882"]);
    }

    /// Test that requesting the same device twice is rejected
    #[test]
    fn test_duplicate_device() {
        let result = RecorderBuilder::new()
            .device("synthetic0")
            .device("synthetic0")
            .build(&mut SyntheticSource::new());

        assert!(matches!(result, Err(Error::BuildError(_))));
    }
}
