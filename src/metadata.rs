//! # Frame Metadata Module
//!
//! Per-frame metadata attributes and their textual table representation.
//!
//! The table written for each frame looks like:
//!
//! ```text
//! Stream,Depth
//! Metadata Attribute,Value
//! Frame Counter,31
//! Frame Timestamp,1052
//! ```
//!
//! with one row per attribute the frame supports, in the order of [`MetadataAttribute::ALL`].

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::io::Write;

use derive_more::Display;

use crate::frame::Frame;

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

/// The fixed set of metadata attributes a camera can attach to a frame.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataAttribute {
    #[display(fmt = "Frame Counter")]
    FrameCounter,
    #[display(fmt = "Frame Timestamp")]
    FrameTimestamp,
    #[display(fmt = "Sensor Timestamp")]
    SensorTimestamp,
    #[display(fmt = "Actual Exposure")]
    ActualExposure,
    #[display(fmt = "Gain Level")]
    GainLevel,
    #[display(fmt = "Auto Exposure")]
    AutoExposure,
    #[display(fmt = "White Balance")]
    WhiteBalance,
    #[display(fmt = "Time Of Arrival")]
    TimeOfArrival,
    #[display(fmt = "Temperature")]
    Temperature,
    #[display(fmt = "Backend Timestamp")]
    BackendTimestamp,
    #[display(fmt = "Actual Fps")]
    ActualFps,
    #[display(fmt = "Frame Laser Power")]
    FrameLaserPower,
    #[display(fmt = "Frame Laser Power Mode")]
    FrameLaserPowerMode,
    #[display(fmt = "Exposure Priority")]
    ExposurePriority,
    #[display(fmt = "Exposure Roi Left")]
    ExposureRoiLeft,
    #[display(fmt = "Exposure Roi Right")]
    ExposureRoiRight,
    #[display(fmt = "Exposure Roi Top")]
    ExposureRoiTop,
    #[display(fmt = "Exposure Roi Bottom")]
    ExposureRoiBottom,
    #[display(fmt = "Brightness")]
    Brightness,
    #[display(fmt = "Contrast")]
    Contrast,
    #[display(fmt = "Saturation")]
    Saturation,
    #[display(fmt = "Sharpness")]
    Sharpness,
    #[display(fmt = "Auto White Balance Temperature")]
    AutoWhiteBalanceTemperature,
    #[display(fmt = "Backlight Compensation")]
    BacklightCompensation,
    #[display(fmt = "Hue")]
    Hue,
    #[display(fmt = "Gamma")]
    Gamma,
    #[display(fmt = "Manual White Balance")]
    ManualWhiteBalance,
    #[display(fmt = "Power Line Frequency")]
    PowerLineFrequency,
    #[display(fmt = "Low Light Compensation")]
    LowLightCompensation,
    #[display(fmt = "Frame Emitter Mode")]
    FrameEmitterMode,
    #[display(fmt = "Frame Led Power")]
    FrameLedPower,
    #[display(fmt = "Raw Frame Size")]
    RawFrameSize,
}

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Values of the metadata attributes a frame supports.
///
/// Storage is indexed by attribute, so each attribute holds at most one value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameMetadata {
    values: [Option<i64>; MetadataAttribute::COUNT],
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl MetadataAttribute {
    pub const COUNT: usize = 32;

    /// Every attribute, in enumeration order.
    pub const ALL: [MetadataAttribute; MetadataAttribute::COUNT] = [
        MetadataAttribute::FrameCounter,
        MetadataAttribute::FrameTimestamp,
        MetadataAttribute::SensorTimestamp,
        MetadataAttribute::ActualExposure,
        MetadataAttribute::GainLevel,
        MetadataAttribute::AutoExposure,
        MetadataAttribute::WhiteBalance,
        MetadataAttribute::TimeOfArrival,
        MetadataAttribute::Temperature,
        MetadataAttribute::BackendTimestamp,
        MetadataAttribute::ActualFps,
        MetadataAttribute::FrameLaserPower,
        MetadataAttribute::FrameLaserPowerMode,
        MetadataAttribute::ExposurePriority,
        MetadataAttribute::ExposureRoiLeft,
        MetadataAttribute::ExposureRoiRight,
        MetadataAttribute::ExposureRoiTop,
        MetadataAttribute::ExposureRoiBottom,
        MetadataAttribute::Brightness,
        MetadataAttribute::Contrast,
        MetadataAttribute::Saturation,
        MetadataAttribute::Sharpness,
        MetadataAttribute::AutoWhiteBalanceTemperature,
        MetadataAttribute::BacklightCompensation,
        MetadataAttribute::Hue,
        MetadataAttribute::Gamma,
        MetadataAttribute::ManualWhiteBalance,
        MetadataAttribute::PowerLineFrequency,
        MetadataAttribute::LowLightCompensation,
        MetadataAttribute::FrameEmitterMode,
        MetadataAttribute::FrameLedPower,
        MetadataAttribute::RawFrameSize,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl FrameMetadata {
    /// Create an empty set, supporting no attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value of an attribute, if supported.
    pub fn get(&self, attr: MetadataAttribute) -> Option<i64> {
        self.values[attr.index()]
    }

    /// Set the value of an attribute, marking it supported.
    pub fn set(&mut self, attr: MetadataAttribute, value: i64) {
        self.values[attr.index()] = Some(value);
    }

    /// Builder style version of [`FrameMetadata::set`].
    pub fn with(mut self, attr: MetadataAttribute, value: i64) -> Self {
        self.set(attr, value);
        self
    }

    /// Iterate over supported attributes and their values, in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (MetadataAttribute, i64)> + '_ {
        MetadataAttribute::ALL
            .iter()
            .filter_map(move |attr| self.get(*attr).map(|v| (*attr, v)))
    }
}

/// Write the metadata table of `frame` into `sink`.
///
/// Attributes the frame does not support are left out of the table.
pub fn write_metadata<W: Write>(frame: &Frame, sink: &mut W) -> std::io::Result<()> {
    write!(sink, "Stream,{}\nMetadata Attribute,Value\n", frame.stream)?;

    for (attr, value) in frame.metadata.iter() {
        writeln!(sink, "{},{}", attr, value)?;
    }

    Ok(())
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
