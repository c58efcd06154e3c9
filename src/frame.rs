//! # Frame Module
//!
//! The frame data model shared by sources, serialisers and the recorder.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use derive_more::Display;
use ndarray::Array2;

use crate::metadata::FrameMetadata;

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

/// The kind of stream a frame was captured from.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    #[display(fmt = "Depth")]
    Depth,

    #[display(fmt = "Color")]
    Color,
}

/// The pixel content of a frame.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Z16 depth raster
    Depth(DepthImage),

    /// Packed colour raster
    Color(ColorImage),

    /// A frame with no raster, e.g. from an IMU stream
    Motion,
}

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// A depth raster of raw Z16 samples.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthImage {
    /// Raw samples, indexed `[row, column]`
    pub data: Array2<u16>,

    /// Metres represented by one raw unit
    pub depth_units: f32,
}

/// A colour raster as delivered by the camera, rows may be padded out to `stride` bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorImage {
    pub width: u32,
    pub height: u32,
    pub bytes_per_pixel: u32,

    /// Number of bytes between the start of two consecutive rows
    pub stride: u32,

    pub data: Vec<u8>,
}

/// A single frame from one stream.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Frame number, strictly increasing per stream within a session
    pub number: u64,

    /// Capture timestamp in milliseconds
    pub timestamp_ms: f64,

    /// The stream this frame came from
    pub stream: StreamKind,

    /// Per-frame metadata attributes
    pub metadata: FrameMetadata,

    pub payload: Payload,
}

/// A time aligned pair of depth and colour frames.
#[derive(Debug, Clone)]
pub struct FrameSet {
    pub depth: Frame,
    pub color: Frame,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl StreamKind {
    /// Both stream kinds, in the order they are persisted.
    pub const ALL: [StreamKind; 2] = [StreamKind::Depth, StreamKind::Color];

    /// The stem used when naming directories and files for this stream.
    pub fn file_stem(self) -> &'static str {
        match self {
            StreamKind::Depth => "depth",
            StreamKind::Color => "colour",
        }
    }
}

impl DepthImage {
    /// Create a new depth image from raw samples.
    pub fn new(data: Array2<u16>, depth_units: f32) -> Self {
        Self { data, depth_units }
    }

    /// Get the width of the image in pixels
    pub fn width(&self) -> u32 {
        self.data.ncols() as u32
    }

    /// Get the height of the image in pixels
    pub fn height(&self) -> u32 {
        self.data.nrows() as u32
    }
}

impl ColorImage {
    /// Whether the buffer is large enough to hold `height` rows of `stride` bytes, each holding
    /// `width` pixels.
    pub fn is_well_formed(&self) -> bool {
        let row_bytes = self.width as u64 * self.bytes_per_pixel as u64;
        self.width > 0
            && self.height > 0
            && self.bytes_per_pixel > 0
            && self.stride as u64 >= row_bytes
            && (self.data.len() as u64)
                >= self.stride as u64 * (self.height as u64 - 1) + row_bytes
    }

    /// Copy the pixel rows into a tightly packed buffer, dropping any row padding.
    pub fn packed(&self) -> Vec<u8> {
        let row_bytes = (self.width * self.bytes_per_pixel) as usize;
        if self.stride as usize == row_bytes {
            return self.data[..row_bytes * self.height as usize].to_vec();
        }

        self.data
            .chunks(self.stride as usize)
            .take(self.height as usize)
            .flat_map(|row| &row[..row_bytes])
            .copied()
            .collect()
    }
}

impl Frame {
    /// Get the depth raster of this frame, if it has one.
    pub fn as_depth(&self) -> Option<&DepthImage> {
        match self.payload {
            Payload::Depth(ref d) => Some(d),
            _ => None,
        }
    }

    /// Get the colour raster of this frame, if it has one.
    pub fn as_color(&self) -> Option<&ColorImage> {
        match self.payload {
            Payload::Color(ref c) => Some(c),
            _ => None,
        }
    }
}

impl FrameSet {
    /// Split the set into its frames, depth first.
    pub fn into_parts(self) -> [(StreamKind, Frame); 2] {
        [(StreamKind::Depth, self.depth), (StreamKind::Color, self.color)]
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
