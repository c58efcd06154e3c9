//! # RealSense Source Module
//!
//! Frame source backed by the RealSense SDK through
//! [`realsense-rust`](https://docs.rs/realsense-rust). Only available with the `realsense`
//! feature, which requires librealsense2 and its headers to be installed.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::collections::HashSet;
use std::convert::TryFrom;
use std::ffi::CString;
use std::time::Duration;

use log::warn;
use ndarray::Array2;
use realsense_rust::{
    config::Config,
    context::Context,
    frame::{ColorFrame, DepthFrame, FrameEx, PixelKind},
    kind::{Rs2CameraInfo, Rs2Format, Rs2FrameMetadata, Rs2StreamKind},
    pipeline::{ActivePipeline, InactivePipeline},
};

use crate::error::{Error, Result};
use crate::frame::{ColorImage, DepthImage, Frame, FrameSet, Payload, StreamKind};
use crate::metadata::{FrameMetadata, MetadataAttribute};
use crate::source::{CaptureSession, FrameSource, StreamConfig};

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// How long to wait for a frame set before giving up.
const FRAME_TIMEOUT: Duration = Duration::from_millis(5000);

// -----------------------------------------------------------------------------------------------
// DATA STRUCTS
// -----------------------------------------------------------------------------------------------

/// Source of sessions on locally attached RealSense cameras.
#[derive(Debug, Default)]
pub struct RealSenseSource;

/// A depth and colour pipeline on one RealSense camera.
pub struct RealSenseSession {
    context: Context,
    config: StreamConfig,
    serial: String,
    pipeline: Option<ActivePipeline>,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl RealSenseSource {
    pub fn new() -> Self {
        Self
    }
}

impl FrameSource for RealSenseSource {
    type Session = RealSenseSession;

    fn configure(&mut self, config: &StreamConfig) -> Result<Self::Session> {
        let context = Context::new()
            .map_err(|e| Error::collaborator("rs2_create_context", "", e.to_string()))?;

        Ok(RealSenseSession {
            context,
            config: config.clone(),
            serial: config.device.clone().unwrap_or_default(),
            pipeline: None,
        })
    }
}

impl CaptureSession for RealSenseSession {
    fn start(&mut self) -> Result<()> {
        let devices = self.context.query_devices(HashSet::new());
        if devices.is_empty() {
            return Err(Error::SourceUnavailable(
                "No RealSense devices found!".to_string(),
            ));
        }

        // Pick the requested device, or the first one attached
        let serials = devices
            .iter()
            .filter_map(|d| d.info(Rs2CameraInfo::SerialNumber))
            .map(|s| s.to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        let serial = match self.config.device {
            Some(ref wanted) if serials.contains(wanted) => wanted.clone(),
            Some(ref wanted) => {
                return Err(Error::SourceUnavailable(format!(
                    "No RealSense device with serial {}, found {:?}",
                    wanted, serials
                )))
            }
            None => serials.first().cloned().ok_or_else(|| {
                Error::SourceUnavailable("RealSense device has no serial number".to_string())
            })?,
        };

        let serial_cstr = CString::new(serial.clone())
            .map_err(|e| Error::collaborator("rs2_config_enable_device", &serial, e.to_string()))?;

        let depth = self.config.depth;
        let color = self.config.color;
        let mut config = Config::new();
        config
            .enable_device_from_serial(&serial_cstr)
            .and_then(|c| c.disable_all_streams())
            .and_then(|c| {
                c.enable_stream(
                    Rs2StreamKind::Depth,
                    None,
                    depth.width as usize,
                    depth.height as usize,
                    Rs2Format::Z16,
                    depth.fps as usize,
                )
            })
            .and_then(|c| {
                c.enable_stream(
                    Rs2StreamKind::Color,
                    None,
                    color.width as usize,
                    color.height as usize,
                    Rs2Format::Rgb8,
                    color.fps as usize,
                )
            })
            .map_err(|e| {
                Error::collaborator(
                    "rs2_config_enable_stream",
                    format!("{:?}, {:?}", depth, color),
                    e.to_string(),
                )
            })?;

        let pipeline = InactivePipeline::try_from(&self.context)
            .map_err(|e| Error::collaborator("rs2_create_pipeline", "", e.to_string()))?;
        let pipeline = pipeline
            .start(Some(config))
            .map_err(|e| Error::collaborator("rs2_pipeline_start", &serial, e.to_string()))?;

        self.serial = serial;
        self.pipeline = Some(pipeline);

        Ok(())
    }

    fn next_frameset(&mut self) -> Result<FrameSet> {
        let serial = &self.serial;
        let pipeline = self.pipeline.as_mut().ok_or_else(|| {
            Error::collaborator("rs2_pipeline_wait_for_frames", serial, "pipeline not started")
        })?;

        let frames = pipeline.wait(Some(FRAME_TIMEOUT)).map_err(|e| {
            Error::collaborator("rs2_pipeline_wait_for_frames", serial, e.to_string())
        })?;

        let depth = frames
            .frames_of_type::<DepthFrame>()
            .into_iter()
            .next()
            .map(|f| convert_depth(&f))
            .transpose()?;
        let color = frames
            .frames_of_type::<ColorFrame>()
            .into_iter()
            .next()
            .map(|f| convert_color(&f));

        // A missing stream becomes a frame without a raster, which is skipped when persisting
        let number = match (&depth, &color) {
            (Some(d), _) => d.number,
            (None, Some(c)) => c.number,
            (None, None) => {
                return Err(Error::collaborator(
                    "rs2_pipeline_wait_for_frames",
                    serial,
                    "frame set holds neither depth nor colour",
                ))
            }
        };

        Ok(FrameSet {
            depth: depth.unwrap_or_else(|| missing(StreamKind::Depth, number)),
            color: color.unwrap_or_else(|| missing(StreamKind::Color, number)),
        })
    }

    fn serial(&self) -> &str {
        &self.serial
    }
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

fn missing(stream: StreamKind, number: u64) -> Frame {
    warn!("Frame set {} has no {} frame", number, stream);
    Frame {
        number,
        timestamp_ms: 0.0,
        stream,
        metadata: FrameMetadata::new(),
        payload: Payload::Motion,
    }
}

fn convert_depth(frame: &DepthFrame) -> Result<Frame> {
    let units = frame
        .depth_units()
        .map_err(|e| Error::collaborator("rs2_get_depth_scale", "", e.to_string()))?;

    let data = Array2::from_shape_fn((frame.height(), frame.width()), |(y, x)| {
        match frame.get(x, y) {
            Some(PixelKind::Z16 { depth }) => *depth,
            _ => 0,
        }
    });

    Ok(Frame {
        number: frame.frame_number(),
        timestamp_ms: frame.timestamp(),
        stream: StreamKind::Depth,
        metadata: metadata(frame),
        payload: Payload::Depth(DepthImage::new(data, units)),
    })
}

fn convert_color(frame: &ColorFrame) -> Frame {
    let mut data = Vec::with_capacity(frame.width() * frame.height() * 3);
    let mut packed = true;

    for px in frame.iter() {
        match px {
            PixelKind::Rgb8 { r, g, b } | PixelKind::Bgr8 { r, g, b } => {
                data.extend_from_slice(&[*r, *g, *b])
            }
            _ => {
                packed = false;
                break;
            }
        }
    }

    let payload = if packed {
        Payload::Color(ColorImage {
            width: frame.width() as u32,
            height: frame.height() as u32,
            bytes_per_pixel: 3,
            stride: frame.width() as u32 * 3,
            data,
        })
    } else {
        Payload::Motion
    };

    Frame {
        number: frame.frame_number(),
        timestamp_ms: frame.timestamp(),
        stream: StreamKind::Color,
        metadata: metadata(frame),
        payload,
    }
}

fn metadata<F: FrameEx>(frame: &F) -> FrameMetadata {
    let mut md = FrameMetadata::new();

    for attr in MetadataAttribute::ALL.iter() {
        let kind = rs2_metadata(*attr);
        if frame.supports_metadata(kind) {
            if let Some(value) = frame.metadata(kind) {
                md.set(*attr, value as i64);
            }
        }
    }

    md
}

fn rs2_metadata(attr: MetadataAttribute) -> Rs2FrameMetadata {
    use MetadataAttribute as M;
    use Rs2FrameMetadata as R;

    match attr {
        M::FrameCounter => R::FrameCounter,
        M::FrameTimestamp => R::FrameTimestamp,
        M::SensorTimestamp => R::SensorTimestamp,
        M::ActualExposure => R::ActualExposure,
        M::GainLevel => R::GainLevel,
        M::AutoExposure => R::AutoExposure,
        M::WhiteBalance => R::WhiteBalance,
        M::TimeOfArrival => R::TimeOfArrival,
        M::Temperature => R::Temperature,
        M::BackendTimestamp => R::BackendTimestamp,
        M::ActualFps => R::ActualFps,
        M::FrameLaserPower => R::FrameLaserPower,
        M::FrameLaserPowerMode => R::FrameLaserPowerMode,
        M::ExposurePriority => R::ExposurePriority,
        M::ExposureRoiLeft => R::ExposureRoiLeft,
        M::ExposureRoiRight => R::ExposureRoiRight,
        M::ExposureRoiTop => R::ExposureRoiTop,
        M::ExposureRoiBottom => R::ExposureRoiBottom,
        M::Brightness => R::Brightness,
        M::Contrast => R::Contrast,
        M::Saturation => R::Saturation,
        M::Sharpness => R::Sharpness,
        M::AutoWhiteBalanceTemperature => R::AutoWhiteBalanceTemperature,
        M::BacklightCompensation => R::BacklightCompensation,
        M::Hue => R::Hue,
        M::Gamma => R::Gamma,
        M::ManualWhiteBalance => R::ManualWhiteBalance,
        M::PowerLineFrequency => R::PowerLineFrequency,
        M::LowLightCompensation => R::LowLightCompensation,
        M::FrameEmitterMode => R::FrameEmitterMode,
        M::FrameLedPower => R::FrameLedPower,
        M::RawFrameSize => R::RawFrameSize,
    }
}
