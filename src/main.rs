//! rs-recorder binary, records depth and colour frame sets to disk.

use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use log::info;

use rs_recorder::{
    Dispatch, Error, ErrorCategory, FrameLimit, FrameSource, OutputLayout, RecorderBuilder,
    Result, SyntheticSource,
};

/// Record depth grids, colour images and per-frame metadata from a depth camera.
#[derive(Debug, Parser)]
#[command(name = "rs-recorder", version)]
struct Cli {
    /// Number of frame sets to record per device, records until Ctrl-C if omitted
    frames: Option<u64>,

    /// Configuration file (TOML, JSON, YAML, ...), flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of frame sets to discard before recording
    #[arg(long)]
    warmup: Option<u32>,

    /// Persist frames inline instead of on worker threads
    #[arg(long)]
    sync: bool,

    /// Directory to write output below
    #[arg(long)]
    output: Option<PathBuf>,

    /// Label used in file names when recording a single, unnamed device
    #[arg(long)]
    label: Option<String>,

    #[arg(long, value_enum)]
    layout: Option<LayoutArg>,

    /// Serial number of a device to record, may be given several times
    #[arg(long = "device")]
    devices: Vec<String>,

    #[arg(long, value_enum, default_value_t = SourceArg::DEFAULT)]
    source: SourceArg,

    /// Create the output directories before recording
    #[arg(long)]
    prepare: bool,

    /// Delete existing output directories first, requires --prepare
    #[arg(long, requires = "prepare")]
    clean: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LayoutArg {
    Flat,
    DeviceScoped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceArg {
    Synthetic,
    Realsense,
}

impl SourceArg {
    #[cfg(feature = "realsense")]
    const DEFAULT: SourceArg = SourceArg::Realsense;
    #[cfg(not(feature = "realsense"))]
    const DEFAULT: SourceArg = SourceArg::Synthetic;
}

impl From<LayoutArg> for OutputLayout {
    fn from(layout: LayoutArg) -> Self {
        match layout {
            LayoutArg::Flat => OutputLayout::Flat,
            LayoutArg::DeviceScoped => OutputLayout::DeviceScoped,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(err) = run(&cli) {
        match err.category() {
            ErrorCategory::SourceUnavailable | ErrorCategory::Collaborator => eprintln!("{}", err),
            ErrorCategory::Generic => eprintln!("Error: {}", err),
        }
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let builder = configure(cli)?;

    match cli.source {
        SourceArg::Synthetic => {
            let devices = &builder.current_config().devices;
            let mut source = if devices.is_empty() {
                SyntheticSource::new()
            } else {
                SyntheticSource::with_devices(devices.clone())
            };
            record(builder, &mut source, cli)
        }
        #[cfg(feature = "realsense")]
        SourceArg::Realsense => record(builder, &mut rs_recorder::RealSenseSource::new(), cli),
        #[cfg(not(feature = "realsense"))]
        SourceArg::Realsense => Err(Error::BuildError(
            "built without RealSense support, rebuild with --features realsense".to_string(),
        )),
    }
}

/// Apply the config file, then the command line flags.
fn configure(cli: &Cli) -> Result<RecorderBuilder> {
    let mut builder = RecorderBuilder::new();

    if let Some(ref path) = cli.config {
        builder = builder.config_from_file(path)?;
    }
    if let Some(warmup) = cli.warmup {
        builder = builder.warmup(warmup);
    }
    if cli.sync {
        builder = builder.dispatch(Dispatch::Synchronous);
    }
    if let Some(ref output) = cli.output {
        builder = builder.output_root(output);
    }
    if let Some(ref label) = cli.label {
        builder = builder.label(label.as_str());
    }
    if let Some(layout) = cli.layout {
        builder = builder.layout(layout.into());
    }
    for serial in cli.devices.iter() {
        builder = builder.device(serial.as_str());
    }

    Ok(builder)
}

fn record<F: FrameSource>(builder: RecorderBuilder, source: &mut F, cli: &Cli) -> Result<()> {
    let mut recorder = builder.build(source)?;

    if cli.prepare {
        for device in recorder.devices() {
            device.naming().prepare(cli.clean)?;
        }
    }

    // Ctrl-C ends the run at the next iteration boundary, after which workers are drained
    let stop = recorder.stop_handle();
    ctrlc::set_handler(move || {
        info!("Stopping after the current frame set");
        stop.stop();
    })
    .map_err(|e| Error::BuildError(format!("Cannot install Ctrl-C handler: {}", e)))?;

    let limit = FrameLimit::from(cli.frames);

    info!("Recording with {} dispatch", recorder.dispatch());
    recorder.run(limit)?.into_result()?;

    Ok(())
}
