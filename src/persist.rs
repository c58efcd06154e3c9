//! # Persistence Module
//!
//! Writes a single frame's artifacts to disk: the data file (depth grid or colour image) and
//! its sibling metadata table.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};

use crate::depth;
use crate::encoder::ImageEncoder;
use crate::error::{Error, Result};
use crate::frame::{Frame, StreamKind};
use crate::metadata;
use crate::naming::NamingContext;

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

/// What persisting a frame produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persisted {
    /// Both artifacts were written.
    Written { data: PathBuf, metadata: PathBuf },

    /// The frame has no raster of the requested kind, nothing was written.
    Skipped,
}

// -----------------------------------------------------------------------------------------------
// DATA STRUCTS
// -----------------------------------------------------------------------------------------------

/// A self-contained unit of persistence work, owning everything it needs so it can be moved
/// onto a worker thread.
pub struct PersistJob {
    pub stream: StreamKind,
    pub frame: Frame,
    pub naming: Arc<NamingContext>,
    pub encoder: Arc<dyn ImageEncoder>,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl PersistJob {
    /// A short name for this job, used to name its worker thread.
    pub fn name(&self) -> String {
        format!(
            "{}-{}-{}",
            self.naming.label(),
            self.stream.file_stem(),
            self.frame.number
        )
    }

    /// Execute the job.
    pub fn run(self) -> Result<Persisted> {
        persist_frame(&self.frame, self.stream, &self.naming, self.encoder.as_ref())
    }
}

// -----------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Persist `frame` as a frame of the `stream` kind.
///
/// Frames which cannot be interpreted as a raster of that kind are skipped. Any failure to
/// write either artifact is returned, a data file may be left behind without its metadata.
pub fn persist_frame(
    frame: &Frame,
    stream: StreamKind,
    naming: &NamingContext,
    encoder: &dyn ImageEncoder,
) -> Result<Persisted> {
    let data = naming.data_path(stream, frame.number);

    match stream {
        StreamKind::Depth => {
            let depth = match frame.as_depth() {
                Some(d) => d,
                None => return Ok(skip(frame, stream)),
            };
            write_text(&data, |w| depth::write_grid(depth, w))?;
        }
        StreamKind::Color => {
            let color = match frame.as_color() {
                Some(c) => c,
                None => return Ok(skip(frame, stream)),
            };
            encoder.encode(&data, color)?;
        }
    }
    info!("Saved {}", data.display());

    let table = naming.metadata_path(stream, frame.number);
    write_text(&table, |w| metadata::write_metadata(frame, w))?;

    Ok(Persisted::Written {
        data,
        metadata: table,
    })
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

fn skip(frame: &Frame, stream: StreamKind) -> Persisted {
    debug!(
        "Frame {} has no {} raster, skipping",
        frame.number,
        stream.file_stem()
    );
    Persisted::Skipped
}

/// Create `path` and fill it using `body`, the directory must already exist.
fn write_text<F>(path: &Path, body: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = BufWriter::new(file);

    body(&mut writer).map_err(|e| Error::io(path, e))?;
    writer.flush().map_err(|e| Error::io(path, e))
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
