//! # Recording Tests
//!
//! Runs the recorder end to end against synthetic cameras.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use rs_recorder::prelude::*;
use rs_recorder::{Error, ErrorCategory, RecorderState, StreamKind};

// -----------------------------------------------------------------------------------------------
// HELPERS
// -----------------------------------------------------------------------------------------------

/// A fresh, empty directory for one test.
fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("rs_recorder_it_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn small(root: &Path) -> RecorderBuilder {
    RecorderBuilder::new()
        .output_root(root)
        .resolution(4, 2, 30)
        .warmup(0)
        .create_dirs(true)
}

fn names(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn files(dir: &Path) -> BTreeSet<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[test]
fn two_synchronous_frame_sets() {
    let root = scratch("sync");
    let mut recorder = small(&root)
        .dispatch(Dispatch::Synchronous)
        .build(&mut SyntheticSource::new())
        .unwrap();

    let report = recorder.run(FrameLimit::Count(2)).unwrap();
    assert_eq!(report.captured, 2);
    assert_eq!(report.written, 4);
    assert!(report.failures.is_empty());

    assert_eq!(
        files(&root.join("depth")),
        names(&["raspi1_depth_0.csv", "raspi1_depth_1.csv"])
    );
    assert_eq!(files(&root.join("colour")).len(), 2);
    assert_eq!(files(&root.join("depth_metadata")).len(), 2);
    assert_eq!(files(&root.join("colour_metadata")).len(), 2);

    let grid = fs::read_to_string(root.join("depth/raspi1_depth_0.csv")).unwrap();
    let lines = grid.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 2);
    for line in lines {
        let values = line.split(", ").collect::<Vec<_>>();
        assert_eq!(values.len(), 4);
        for v in values {
            v.parse::<f32>().unwrap();
            assert_eq!(v.split('.').nth(1).map(str::len), Some(2));
        }
    }

    let table = fs::read_to_string(root.join("colour_metadata/raspi1_colour_metadata_1.txt"))
        .unwrap();
    assert!(table.starts_with("Stream,Color\nMetadata Attribute,Value\nFrame Counter,1\n"));

    assert_eq!(
        image::image_dimensions(root.join("colour/raspi1_colour_1.png")).unwrap(),
        (4, 2)
    );

    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn asynchronous_run_drains_every_worker() {
    let root = scratch("async");
    let mut recorder = small(&root)
        .warmup(3)
        .dispatch(Dispatch::Asynchronous)
        .build(&mut SyntheticSource::new())
        .unwrap();

    let report = recorder.run(FrameLimit::Count(12)).unwrap();
    assert_eq!(recorder.state(), RecorderState::Terminated);
    assert_eq!(report.captured, 12);
    assert_eq!(report.written, 24);

    // Warm-up consumed frames 0 to 2
    let expected = (3..15).collect::<BTreeSet<u64>>();
    for stream in StreamKind::ALL.iter() {
        let stem = stream.file_stem();
        let numbers = files(&root.join(stem))
            .iter()
            .map(|name| {
                let digits = name
                    .trim_start_matches(&format!("raspi1_{}_", stem))
                    .split('.')
                    .next()
                    .unwrap()
                    .to_string();
                digits.parse::<u64>().unwrap()
            })
            .collect::<BTreeSet<_>>();
        assert_eq!(numbers, expected);
        assert_eq!(files(&root.join(format!("{}_metadata", stem))).len(), 12);
    }

    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn device_scoped_layout_for_several_cameras() {
    let root = scratch("multi");
    let mut source = SyntheticSource::with_devices(vec!["138322250306", "141322252882"]);
    let mut recorder = small(&root)
        .layout(OutputLayout::DeviceScoped)
        .device("138322250306")
        .device("141322252882")
        .build(&mut source)
        .unwrap();

    let report = recorder.run(FrameLimit::Count(3)).unwrap();
    assert_eq!(report.captured, 6);
    assert_eq!(report.written, 12);

    for serial in ["138322250306", "141322252882"].iter() {
        let camera = root.join(format!("camera_{}", serial));
        assert_eq!(
            files(&camera.join("depth")),
            names(&["0.csv", "1.csv", "2.csv"])
        );
        assert_eq!(
            files(&camera.join("colour_metadata")),
            names(&["0.csv", "1.csv", "2.csv"])
        );
    }

    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn missing_directories_fail_each_job_but_not_the_run() {
    let root = scratch("nodirs");
    let mut recorder = small(&root)
        .create_dirs(false)
        .build(&mut SyntheticSource::new())
        .unwrap();

    let report = recorder.run(FrameLimit::Count(3)).unwrap();
    assert_eq!(report.captured, 3);
    assert_eq!(report.written, 0);
    assert_eq!(report.failure_count(), 6);
    assert!(matches!(
        report.into_result(),
        Err(Error::PersistenceFailed { failures: 6 })
    ));
    assert!(files(&root).is_empty());

    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn absent_camera_is_source_unavailable() {
    let root = scratch("absent");
    let mut recorder = small(&root).build(&mut SyntheticSource::absent()).unwrap();

    let err = recorder.run(FrameLimit::Count(2)).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::SourceUnavailable);
    assert!(files(&root.join("depth")).is_empty());

    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn non_video_frames_are_skipped() {
    let root = scratch("motion");
    let mut recorder = small(&root)
        .build(&mut SyntheticSource::new().motion_color())
        .unwrap();

    let report = recorder.run(FrameLimit::Count(4)).unwrap();
    assert_eq!(report.written, 4);
    assert_eq!(report.skipped, 4);
    assert!(report.failures.is_empty());
    assert!(files(&root.join("colour")).is_empty());
    assert!(files(&root.join("colour_metadata")).is_empty());
    assert_eq!(files(&root.join("depth")).len(), 4);

    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn source_failure_still_drains_dispatched_work() {
    let root = scratch("srcfail");
    let mut recorder = small(&root)
        .dispatch(Dispatch::Asynchronous)
        .build(&mut SyntheticSource::new().fail_after(3))
        .unwrap();

    let err = recorder.run(FrameLimit::Count(10)).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Collaborator);
    assert_eq!(recorder.state(), RecorderState::Terminated);

    assert_eq!(files(&root.join("depth")).len(), 3);
    assert_eq!(files(&root.join("colour")).len(), 3);
    assert_eq!(files(&root.join("depth_metadata")).len(), 3);
    assert_eq!(files(&root.join("colour_metadata")).len(), 3);

    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn unbounded_run_stops_between_iterations() {
    let root = scratch("stop");
    let mut recorder = small(&root)
        .dispatch(Dispatch::Synchronous)
        .build(&mut SyntheticSource::new())
        .unwrap();

    let stop = recorder.stop_handle();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        stop.stop();
    });

    let report = recorder.run(FrameLimit::Unbounded).unwrap();
    stopper.join().unwrap();

    assert!(report.captured > 0);
    assert_eq!(report.written, report.captured * 2);
    assert_eq!(files(&root.join("depth")).len() as u64, report.captured);
    assert_eq!(files(&root.join("colour_metadata")).len() as u64, report.captured);

    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn unbounded_asynchronous_run_drains_complete_pairs() {
    let root = scratch("stop_async");
    let mut recorder = small(&root)
        .dispatch(Dispatch::Asynchronous)
        .build(&mut SyntheticSource::new())
        .unwrap();

    let stop = recorder.stop_handle();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        stop.stop();
    });

    let report = recorder.run(FrameLimit::Unbounded).unwrap();
    stopper.join().unwrap();

    assert_eq!(recorder.state(), RecorderState::Terminated);
    assert!(report.captured > 0);
    assert!(report.failures.is_empty());
    assert_eq!(report.written, report.captured * 2);

    // Every data file has its metadata table and nothing else was left behind
    for stream in StreamKind::ALL.iter() {
        let stem = stream.file_stem();
        let data = files(&root.join(stem));
        let tables = files(&root.join(format!("{}_metadata", stem)));
        assert_eq!(data.len() as u64, report.captured);
        assert_eq!(tables.len() as u64, report.captured);

        for name in data.iter() {
            let number = name
                .trim_start_matches(&format!("raspi1_{}_", stem))
                .split('.')
                .next()
                .unwrap()
                .to_string();
            assert!(tables.contains(&format!("raspi1_{}_metadata_{}.txt", stem, number)));
        }
    }

    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn counted_run_stops_early_and_drains() {
    let root = scratch("stop_counted");
    let mut recorder = small(&root)
        .dispatch(Dispatch::Asynchronous)
        .build(&mut SyntheticSource::new())
        .unwrap();

    let stop = recorder.stop_handle();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        stop.stop();
    });

    let report = recorder.run(FrameLimit::Count(u64::MAX)).unwrap();
    stopper.join().unwrap();

    assert!(report.captured > 0);
    assert_eq!(report.written, report.captured * 2);
    assert_eq!(files(&root.join("colour")).len() as u64, report.captured);
    assert_eq!(files(&root.join("colour_metadata")).len() as u64, report.captured);

    fs::remove_dir_all(&root).unwrap();
}
