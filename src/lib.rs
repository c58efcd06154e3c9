//! # Depth camera recorder
//!
//! This crate records depth and colour frames from a depth camera to disk. Each depth frame is
//! written as a text grid of distances in metres, each colour frame as a PNG image, and every
//! frame gets a sibling table of its metadata attributes.
//!
//! Cameras are accessed through the [`FrameSource`] and [`CaptureSession`] traits. A
//! [`SyntheticSource`] is always available, physical RealSense cameras are supported through
//! the `realsense` feature.
//!
//! ## Dependencies
//!
//! The `realsense` feature requires librealsense2, including the dev headers.
//!
//! ### Ubuntu
//!
//! ```shell
//! sudo apt install librealsense2-dev
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rs_recorder::prelude::*;
//!
//! # fn main() -> rs_recorder::Result<()> {
//! let mut recorder = RecorderBuilder::new()
//!     // Discard 30 frame sets while auto exposure settles
//!     .warmup(30)
//!     // Persist each frame on its own worker thread
//!     .dispatch(Dispatch::Asynchronous)
//!     // Write below ./captures, which must hold depth/, colour/, depth_metadata/ and
//!     // colour_metadata/ directories
//!     .output_root("captures")
//!     .label("raspi1")
//!     .build(&mut SyntheticSource::new())?;
//!
//! let report = recorder.run(FrameLimit::Count(100))?;
//! println!("Wrote {} frames", report.written);
//! # Ok(())
//! # }
//! ```

// -----------------------------------------------------------------------------------------------
// EXPORTS
// -----------------------------------------------------------------------------------------------

pub use builder::RecorderBuilder;
pub use config::RecorderConfig;
pub use encoder::{ImageEncoder, PngEncoder};
pub use error::{Error, ErrorCategory, Result};
pub use frame::{ColorImage, DepthImage, Frame, FrameSet, Payload, StreamKind};
pub use metadata::{FrameMetadata, MetadataAttribute};
pub use naming::{NamingContext, OutputLayout};
pub use persist::{persist_frame, PersistJob, Persisted};
#[cfg(feature = "realsense")]
pub use realsense::{RealSenseSession, RealSenseSource};
pub use recorder::{
    CaptureReport, DeviceContext, Dispatch, FrameLimit, Recorder, RecorderState, StopHandle,
    DEFAULT_WARMUP,
};
pub use source::{CaptureSession, FrameSource, StreamConfig, StreamSpec};
pub use synthetic::{SyntheticSession, SyntheticSource};

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

mod builder;
mod config;
pub mod depth;
mod encoder;
mod error;
mod frame;
pub mod metadata;
mod naming;
mod persist;
#[cfg(feature = "realsense")]
mod realsense;
mod recorder;
mod source;
mod synthetic;

pub mod prelude {
    pub use crate::{CaptureSession, FrameSource, RecorderBuilder, SyntheticSource};
    pub use crate::{Dispatch, FrameLimit, OutputLayout, Recorder, StopHandle};
}
