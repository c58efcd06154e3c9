//! # Frame Source Module
//!
//! Traits over the camera SDK: a source is configured into a session, which is started and then
//! pulled for frame sets.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::error::Result;
use crate::frame::FrameSet;

// -----------------------------------------------------------------------------------------------
// TRAITS
// -----------------------------------------------------------------------------------------------

/// A provider of capture sessions, e.g. a camera SDK context.
pub trait FrameSource {
    /// The session type returned by `configure`.
    type Session: CaptureSession;

    /// Prepare a session streaming according to `config`.
    fn configure(&mut self, config: &StreamConfig) -> Result<Self::Session>;
}

/// A configured stream of frame sets from one device.
pub trait CaptureSession {
    /// Start streaming.
    ///
    /// Fails with `Error::SourceUnavailable` when no compatible device is present.
    fn start(&mut self) -> Result<()>;

    /// Block until the next frame set is available.
    fn next_frameset(&mut self) -> Result<FrameSet>;

    /// Serial number of the device behind the session.
    fn serial(&self) -> &str;
}

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Resolution and rate of a single stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StreamSpec {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// The streams a session should deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Serial number of the device to open, `None` for the first one available
    pub device: Option<String>,

    /// Z16 depth stream
    pub depth: StreamSpec,

    /// RGB8 colour stream
    pub color: StreamSpec,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl StreamSpec {
    pub const fn new(width: u32, height: u32, fps: u32) -> Self {
        Self { width, height, fps }
    }

    /// Default depth stream, 640x480 at 90 fps.
    pub const DEPTH: StreamSpec = StreamSpec::new(640, 480, 90);

    /// Default colour stream, 640x360 at 90 fps.
    pub const COLOR: StreamSpec = StreamSpec::new(640, 360, 90);
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            device: None,
            depth: StreamSpec::DEPTH,
            color: StreamSpec::COLOR,
        }
    }
}

impl StreamConfig {
    /// Request a specific device by serial number.
    pub fn with_device<S: Into<String>>(mut self, serial: S) -> Self {
        self.device = Some(serial.into());
        self
    }
}
