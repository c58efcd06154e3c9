//! # Synthetic Source Module
//!
//! An in-process camera producing deterministic frames, for running the recorder without
//! hardware.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use ndarray::Array2;

use crate::error::{Error, Result};
use crate::frame::{ColorImage, DepthImage, Frame, FrameSet, Payload, StreamKind};
use crate::metadata::{FrameMetadata, MetadataAttribute};
use crate::source::{CaptureSession, FrameSource, StreamConfig};

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Metres per raw depth unit, as reported by most D400 cameras.
const DEPTH_UNITS: f32 = 0.001;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTS
// -----------------------------------------------------------------------------------------------

/// Source of synthetic devices.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    serials: Vec<String>,
    motion_color: bool,
    fail_after: Option<u64>,
}

/// A started (or startable) stream from one synthetic device.
#[derive(Debug)]
pub struct SyntheticSession {
    serial: String,
    present: bool,
    started: bool,
    config: StreamConfig,
    motion_color: bool,
    fail_after: Option<u64>,
    next_number: u64,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticSource {
    /// A source with a single device, serial `synthetic0`.
    pub fn new() -> Self {
        Self::with_devices(vec!["synthetic0"])
    }

    /// A source with one device per serial.
    pub fn with_devices<S: Into<String>>(serials: Vec<S>) -> Self {
        Self {
            serials: serials.into_iter().map(Into::into).collect(),
            motion_color: false,
            fail_after: None,
        }
    }

    /// A source with no devices attached.
    pub fn absent() -> Self {
        Self::with_devices(Vec::<String>::new())
    }

    /// Make the colour stream deliver frames without a raster.
    pub fn motion_color(mut self) -> Self {
        self.motion_color = true;
        self
    }

    /// Make sessions fail once `count` frame sets have been delivered.
    pub fn fail_after(mut self, count: u64) -> Self {
        self.fail_after = Some(count);
        self
    }
}

impl FrameSource for SyntheticSource {
    type Session = SyntheticSession;

    fn configure(&mut self, config: &StreamConfig) -> Result<Self::Session> {
        let serial = match config.device {
            Some(ref s) => Some(s.clone()),
            None => self.serials.first().cloned(),
        };
        let present = serial
            .as_ref()
            .map(|s| self.serials.contains(s))
            .unwrap_or(false);

        Ok(SyntheticSession {
            serial: serial.unwrap_or_default(),
            present,
            started: false,
            config: config.clone(),
            motion_color: self.motion_color,
            fail_after: self.fail_after,
            next_number: 0,
        })
    }
}

impl CaptureSession for SyntheticSession {
    fn start(&mut self) -> Result<()> {
        if !self.present {
            return Err(Error::SourceUnavailable(if self.serial.is_empty() {
                "no synthetic devices attached".to_string()
            } else {
                format!("no synthetic device with serial {}", self.serial)
            }));
        }

        self.started = true;
        Ok(())
    }

    fn next_frameset(&mut self) -> Result<FrameSet> {
        if !self.started {
            return Err(Error::collaborator(
                "wait_for_frames",
                self.serial.clone(),
                "pipeline not started",
            ));
        }

        if let Some(limit) = self.fail_after {
            if self.next_number >= limit {
                return Err(Error::collaborator(
                    "wait_for_frames",
                    self.serial.clone(),
                    "Frame didn't arrive within 5000",
                ));
            }
        }

        let n = self.next_number;
        self.next_number += 1;

        let color_payload = if self.motion_color {
            Payload::Motion
        } else {
            Payload::Color(color_image(&self.config, n))
        };

        Ok(FrameSet {
            depth: Frame {
                number: n,
                timestamp_ms: timestamp_ms(n, self.config.depth.fps),
                stream: StreamKind::Depth,
                metadata: metadata(StreamKind::Depth, n, self.config.depth.fps),
                payload: Payload::Depth(depth_image(&self.config, n)),
            },
            color: Frame {
                number: n,
                timestamp_ms: timestamp_ms(n, self.config.color.fps),
                stream: StreamKind::Color,
                metadata: metadata(StreamKind::Color, n, self.config.color.fps),
                payload: color_payload,
            },
        })
    }

    fn serial(&self) -> &str {
        &self.serial
    }
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

fn timestamp_ms(n: u64, fps: u32) -> f64 {
    n as f64 * 1000.0 / fps.max(1) as f64
}

/// A slanted plane between 0.3 and 4.3 metres which drifts with the frame number.
fn depth_image(config: &StreamConfig, n: u64) -> DepthImage {
    let spec = config.depth;
    let data = Array2::from_shape_fn((spec.height as usize, spec.width as usize), |(y, x)| {
        (300 + (x as u64 + y as u64 + n) % 4000) as u16
    });

    DepthImage::new(data, DEPTH_UNITS)
}

/// A packed RGB8 gradient, red across, green down, blue cycling with the frame number.
fn color_image(config: &StreamConfig, n: u64) -> ColorImage {
    let spec = config.color;
    let (w, h) = (spec.width.max(1), spec.height.max(1));
    let mut data = Vec::with_capacity((spec.width * spec.height * 3) as usize);

    for y in 0..spec.height {
        for x in 0..spec.width {
            data.push((x * 255 / w) as u8);
            data.push((y * 255 / h) as u8);
            data.push((n % 256) as u8);
        }
    }

    ColorImage {
        width: spec.width,
        height: spec.height,
        bytes_per_pixel: 3,
        stride: spec.width * 3,
        data,
    }
}

fn metadata(stream: StreamKind, n: u64, fps: u32) -> FrameMetadata {
    let ts = timestamp_ms(n, fps) as i64;
    let md = FrameMetadata::new()
        .with(MetadataAttribute::FrameCounter, n as i64)
        .with(MetadataAttribute::FrameTimestamp, ts * 1000)
        .with(MetadataAttribute::SensorTimestamp, ts * 1000 - 150)
        .with(MetadataAttribute::ActualExposure, 8500)
        .with(MetadataAttribute::GainLevel, 16)
        .with(MetadataAttribute::AutoExposure, 1)
        .with(MetadataAttribute::TimeOfArrival, ts)
        .with(MetadataAttribute::BackendTimestamp, ts)
        .with(MetadataAttribute::ActualFps, fps as i64);

    match stream {
        StreamKind::Depth => md
            .with(MetadataAttribute::FrameLaserPower, 150)
            .with(MetadataAttribute::FrameLaserPowerMode, 1)
            .with(MetadataAttribute::ExposurePriority, 0)
            .with(MetadataAttribute::FrameEmitterMode, 1),
        StreamKind::Color => md
            .with(MetadataAttribute::WhiteBalance, 4600)
            .with(MetadataAttribute::Brightness, 0)
            .with(MetadataAttribute::Contrast, 50)
            .with(MetadataAttribute::Saturation, 64)
            .with(MetadataAttribute::Sharpness, 50)
            .with(MetadataAttribute::Gamma, 300)
            .with(MetadataAttribute::Hue, 0),
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::source::StreamSpec;

    fn small() -> StreamConfig {
        StreamConfig {
            device: None,
            depth: StreamSpec::new(4, 2, 30),
            color: StreamSpec::new(4, 2, 30),
        }
    }

    #[test]
    fn test_frame_numbers_strictly_increase() {
        let mut session = SyntheticSource::new().configure(&small()).unwrap();
        session.start().unwrap();

        let mut last = None;
        for _ in 0..10 {
            let set = session.next_frameset().unwrap();
            assert_eq!(set.depth.number, set.color.number);
            if let Some(prev) = last {
                assert!(set.depth.number > prev);
            }
            last = Some(set.depth.number);
        }
    }

    #[test]
    fn test_frames_match_requested_resolution() {
        let mut session = SyntheticSource::new().configure(&small()).unwrap();
        session.start().unwrap();
        let set = session.next_frameset().unwrap();

        let depth = set.depth.as_depth().unwrap();
        assert_eq!((depth.width(), depth.height()), (4, 2));

        let color = set.color.as_color().unwrap();
        assert_eq!((color.width, color.height), (4, 2));
        assert!(color.is_well_formed());
    }

    #[test]
    fn test_absent_device_fails_to_start() {
        let mut session = SyntheticSource::absent().configure(&small()).unwrap();
        let err = session.start().unwrap_err();
        assert_eq!(err.category(), ErrorCategory::SourceUnavailable);
    }

    #[test]
    fn test_unknown_serial_fails_to_start() {
        let mut source = SyntheticSource::with_devices(vec!["a", "b"]);
        let mut session = source.configure(&small().with_device("c")).unwrap();
        assert!(session.start().is_err());

        let mut session = source.configure(&small().with_device("b")).unwrap();
        session.start().unwrap();
        assert_eq!(session.serial(), "b");
    }

    #[test]
    fn test_pull_before_start_is_a_collaborator_error() {
        let mut session = SyntheticSource::new().configure(&small()).unwrap();
        let err = session.next_frameset().unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Collaborator);
    }
}
