//! # Recorder Module
//!
//! Drives a recording run: starts each device's session, discards a warm-up period, then pulls
//! frame sets and hands every frame to a persistence job, either inline or on its own worker
//! thread. All dispatched workers are joined before the run returns.
//!
//! A run moves through `Idle -> WarmingUp -> Capturing -> Draining -> Terminated`.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use derive_more::Display;
use log::{debug, error, info, warn};
use serde::Deserialize;

use crate::encoder::ImageEncoder;
use crate::error::{Error, Result};
use crate::frame::StreamKind;
use crate::naming::NamingContext;
use crate::persist::{PersistJob, Persisted};
use crate::source::CaptureSession;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Frame sets discarded at startup so auto exposure and gain can settle.
pub const DEFAULT_WARMUP: u32 = 30;

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

/// How frames are handed to persistence.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dispatch {
    /// Persist depth then colour before pulling the next frame set.
    #[display(fmt = "synchronous")]
    Synchronous,

    /// Persist each frame on a fresh worker thread and keep pulling immediately. Finished
    /// workers are joined between iterations. There is no backpressure, workers pile up if the
    /// disk cannot keep up.
    #[display(fmt = "asynchronous")]
    Asynchronous,
}

/// How many frame sets to record per device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLimit {
    Count(u64),

    /// Record until stopped through a [`StopHandle`]
    Unbounded,
}

/// Lifecycle of a recorder.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    WarmingUp,
    Capturing,
    Draining,
    Terminated,
}

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Requests a running recorder to stop after the current iteration.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

/// A device being recorded, with the naming used for its files.
pub struct DeviceContext<S> {
    session: S,
    naming: Arc<NamingContext>,

    /// Last frame number persisted for each stream, indexed like `StreamKind::ALL`
    last_numbers: [Option<u64>; 2],
}

/// Summary of a finished run.
#[derive(Debug, Default)]
pub struct CaptureReport {
    /// Frame sets pulled after warm-up, over all devices
    pub captured: u64,

    /// Frames whose data and metadata files were both written
    pub written: u64,

    /// Frames left out, either without a raster or out of order
    pub skipped: u64,

    /// Errors of the persistence jobs that failed
    pub failures: Vec<Error>,

    /// Most asynchronous workers left running at the start of an iteration
    pub peak_pending: usize,
}

/// Records frame sets from one or more devices to disk.
pub struct Recorder<S> {
    devices: Vec<DeviceContext<S>>,
    encoder: Arc<dyn ImageEncoder>,
    warmup: u32,
    dispatch: Dispatch,
    stop: StopHandle,
    state: RecorderState,
}

type Worker = (String, JoinHandle<Result<Persisted>>);

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl From<Option<u64>> for FrameLimit {
    fn from(count: Option<u64>) -> Self {
        match count {
            Some(n) => FrameLimit::Count(n),
            None => FrameLimit::Unbounded,
        }
    }
}

impl FrameLimit {
    fn reached(self, iterations: u64) -> bool {
        match self {
            FrameLimit::Count(n) => iterations >= n,
            FrameLimit::Unbounded => false,
        }
    }
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the recorder to stop. Frames already dispatched are still persisted.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: CaptureSession> DeviceContext<S> {
    pub fn new(session: S, naming: NamingContext) -> Self {
        Self {
            session,
            naming: Arc::new(naming),
            last_numbers: [None, None],
        }
    }

    pub fn naming(&self) -> &NamingContext {
        &self.naming
    }

    pub fn serial(&self) -> &str {
        self.session.serial()
    }

    /// Record `number` as the latest frame of `stream`, returns false if it does not advance.
    fn advance(&mut self, stream: StreamKind, number: u64) -> bool {
        let last = &mut self.last_numbers[stream as usize];
        match *last {
            Some(prev) if number <= prev => false,
            _ => {
                *last = Some(number);
                true
            }
        }
    }
}

impl CaptureReport {
    /// Number of persistence jobs which failed.
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Turn a report with failures into an error.
    pub fn into_result(self) -> Result<Self> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(Error::PersistenceFailed {
                failures: self.failures.len(),
            })
        }
    }

    fn record(&mut self, name: &str, outcome: Result<Persisted>) {
        match outcome {
            Ok(Persisted::Written { .. }) => self.written += 1,
            Ok(Persisted::Skipped) => self.skipped += 1,
            Err(e) => {
                error!("Failed to persist {}: {}", name, e);
                self.failures.push(e);
            }
        }
    }
}

impl<S: CaptureSession> Recorder<S> {
    /// Create a new recorder over the given devices.
    pub fn new(
        devices: Vec<DeviceContext<S>>,
        encoder: Arc<dyn ImageEncoder>,
        warmup: u32,
        dispatch: Dispatch,
    ) -> Self {
        Self {
            devices,
            encoder,
            warmup,
            dispatch,
            stop: StopHandle::new(),
            state: RecorderState::Idle,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn dispatch(&self) -> Dispatch {
        self.dispatch
    }

    pub fn devices(&self) -> &[DeviceContext<S>] {
        &self.devices
    }

    /// Get a handle which can stop this recorder from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run the recorder until `limit` frame sets have been pulled from every device, or it is
    /// stopped.
    ///
    /// A failing persistence job does not end the run, it is reported in the returned
    /// [`CaptureReport`]. A failing session ends the run with that error once every job
    /// already dispatched has finished.
    pub fn run(&mut self, limit: FrameLimit) -> Result<CaptureReport> {
        if self.state != RecorderState::Idle {
            return Err(Error::BuildError(format!(
                "recorder can only be run once, it is {}",
                self.state
            )));
        }

        self.transition(RecorderState::WarmingUp);
        self.warm_up()?;

        self.transition(RecorderState::Capturing);
        let mut report = CaptureReport::default();
        let mut workers = Vec::new();
        let captured = self.capture(limit, &mut report, &mut workers);

        self.transition(RecorderState::Draining);
        debug!("Waiting for {} persistence workers", workers.len());
        for (name, handle) in workers {
            let outcome = join(&name, handle);
            report.record(&name, outcome);
        }

        self.transition(RecorderState::Terminated);
        captured?;

        info!(
            "Captured {} frame sets, wrote {} frames, skipped {}, {} failures, at most {} workers pending",
            report.captured,
            report.written,
            report.skipped,
            report.failure_count(),
            report.peak_pending
        );

        Ok(report)
    }

    fn transition(&mut self, to: RecorderState) {
        debug!("Recorder {} -> {}", self.state, to);
        self.state = to;
    }

    fn warm_up(&mut self) -> Result<()> {
        for device in self.devices.iter_mut() {
            device.session.start()?;
            info!("Started device {}", device.serial());
        }

        for i in 0..self.warmup {
            if self.stop.is_stopped() {
                break;
            }
            for device in self.devices.iter_mut() {
                device.session.next_frameset()?;
            }
            debug!("Warm-up frame set {}/{}", i + 1, self.warmup);
        }

        Ok(())
    }

    /// The capture loop. Errors from sessions end the loop and are returned, workers spawned up
    /// to that point are left in `workers` for draining.
    fn capture(
        &mut self,
        limit: FrameLimit,
        report: &mut CaptureReport,
        workers: &mut Vec<Worker>,
    ) -> Result<()> {
        let mut iterations = 0;

        while !limit.reached(iterations) && !self.stop.is_stopped() {
            reap(workers, report);
            report.peak_pending = report.peak_pending.max(workers.len());

            for device in self.devices.iter_mut() {
                let frameset = device.session.next_frameset()?;
                report.captured += 1;

                for (stream, frame) in frameset.into_parts() {
                    if !device.advance(stream, frame.number) {
                        warn!(
                            "Frame {} of {} {} is out of order, skipping",
                            frame.number,
                            device.serial(),
                            stream
                        );
                        report.skipped += 1;
                        continue;
                    }

                    let job = PersistJob {
                        stream,
                        frame,
                        naming: device.naming.clone(),
                        encoder: self.encoder.clone(),
                    };
                    let name = job.name();

                    match self.dispatch {
                        Dispatch::Synchronous => report.record(&name, job.run()),
                        Dispatch::Asynchronous => {
                            match thread::Builder::new()
                                .name(name.clone())
                                .spawn(move || job.run())
                            {
                                Ok(handle) => workers.push((name, handle)),
                                Err(e) => report.record(
                                    &name,
                                    Err(Error::WorkerSpawn {
                                        name: name.clone(),
                                        source: e,
                                    }),
                                ),
                            }
                        }
                    }
                }
            }

            iterations += 1;
        }

        Ok(())
    }
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Join the workers which have already finished and record their outcome, leaving the rest
/// pending. A finished thread keeps its stack until joined.
fn reap(workers: &mut Vec<Worker>, report: &mut CaptureReport) {
    let mut pending = Vec::with_capacity(workers.len());

    for (name, handle) in workers.drain(..) {
        if handle.is_finished() {
            let outcome = join(&name, handle);
            report.record(&name, outcome);
        } else {
            pending.push((name, handle));
        }
    }

    *workers = pending;
}

fn join(name: &str, handle: JoinHandle<Result<Persisted>>) -> Result<Persisted> {
    handle
        .join()
        .unwrap_or_else(|_| Err(Error::WorkerPanicked(name.to_string())))
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
