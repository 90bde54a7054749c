//! Run the tap-detection pipeline over a directory of frame images.
//!
//! Usage: `detect_taps <frames_dir> [report.json]`
//!
//! Frames are processed in lexicographic filename order, so extracted video
//! frames named `frame_0001.png`, `frame_0002.png`, ... work out of the box.
//! The first frames calibrate the skin-color model; hold a hand over the
//! frame center until calibration finishes.

use std::{env, fs, path::PathBuf, time::Instant};

use image::ImageReader;
use serde::Serialize;

use tap_detect::convert::frame_from_dynamic;
use tap_detect::{FrameOutput, SessionParams, TapSession};

#[derive(Debug, Serialize)]
struct TapEvent {
    frame: String,
    x: f32,
    y: f32,
}

#[derive(Debug, Serialize)]
struct Report {
    frames: usize,
    calibration_frames: usize,
    taps: Vec<TapEvent>,
    total_ms: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tap_detect::core::init_with_level(log::LevelFilter::Info)?;

    let args: Vec<String> = env::args().collect();
    let frames_dir = args
        .get(1)
        .map(PathBuf::from)
        .ok_or("usage: detect_taps <frames_dir> [report.json]")?;
    let report_path = args.get(2).map(PathBuf::from);

    let mut frame_paths: Vec<PathBuf> = fs::read_dir(&frames_dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    frame_paths.sort();
    if frame_paths.is_empty() {
        return Err(format!("no frames found in {}", frames_dir.display()).into());
    }

    let mut session = TapSession::new(SessionParams::default());
    let mut report = Report {
        frames: frame_paths.len(),
        calibration_frames: 0,
        taps: Vec::new(),
        total_ms: 0,
    };

    let t_total = Instant::now();
    for path in &frame_paths {
        let img = ImageReader::open(path)?.decode()?;
        let frame = frame_from_dynamic(&img);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match session.advance(&frame.view())? {
            FrameOutput::Calibrating { ratio, samples, .. } => {
                report.calibration_frames = samples as usize;
                log::info!("{name}: calibrating (sample {samples}, skin ratio {ratio:.2})");
            }
            FrameOutput::Detection { tips, taps } => {
                log::debug!("{name}: {} tip(s) tracked", tips.len());
                for tap in taps {
                    println!("{name}: tap at ({:.0}, {:.0})", tap.x, tap.y);
                    report.taps.push(TapEvent {
                        frame: name.clone(),
                        x: tap.x,
                        y: tap.y,
                    });
                }
            }
            FrameOutput::Throttled => {}
        }
    }
    report.total_ms = t_total.elapsed().as_millis() as u64;

    println!(
        "{} frame(s), {} calibration frame(s), {} tap(s) in {} ms",
        report.frames,
        report.calibration_frames,
        report.taps.len(),
        report.total_ms
    );

    if let Some(path) = report_path {
        fs::write(&path, serde_json::to_string_pretty(&report)?)?;
        log::info!("wrote report JSON to {}", path.display());
    }

    Ok(())
}
