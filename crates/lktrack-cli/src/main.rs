//! LKTrack - keypoint tracking from the command line.
//!
//! ```text
//! lktrack track <job.json> [out.json]
//! lktrack iou <x> <y> <w> <h> <x> <y> <w> <h>
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use lktrack_core::{iou, Frame, Keypoint, Rect};
use lktrack_tracking::{track_features, TrackerConfig, Trajectory};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const USAGE: &str = "usage:
  lktrack track <job.json> [out.json]
  lktrack iou <x> <y> <w> <h> <x> <y> <w> <h>";

/// A tracking job: frames, starting keypoints, and optional configuration.
#[derive(Debug, Deserialize)]
struct Job {
    #[serde(default)]
    config: TrackerConfig,
    keypoints: Vec<Keypoint>,
    frames: Vec<Frame>,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("track") => match &args[1..] {
            [job] => run_track(Path::new(job), None),
            [job, out] => run_track(Path::new(job), Some(Path::new(out))),
            _ => bail!("{USAGE}"),
        },
        Some("iou") => {
            let score = run_iou(&args[1..])?;
            println!("{score}");
            Ok(())
        }
        _ => bail!("{USAGE}"),
    }
}

fn run_track(job_path: &Path, out_path: Option<&Path>) -> Result<()> {
    let file = File::open(job_path)
        .with_context(|| format!("Failed to open job file {}", job_path.display()))?;
    let job: Job = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse job file {}", job_path.display()))?;

    info!(
        frames = job.frames.len(),
        keypoints = job.keypoints.len(),
        "Tracking job loaded"
    );
    let trajectory = track_features(&job.frames, &job.keypoints, &job.config)
        .context("Tracking failed")?;
    info!(
        surviving = trajectory.frames.last().map_or(0, |f| f.len()),
        "Tracking finished"
    );

    match out_path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_trajectory(BufWriter::new(file), &trajectory)
        }
        None => write_trajectory(std::io::stdout().lock(), &trajectory),
    }
}

fn write_trajectory(mut out: impl Write, trajectory: &Trajectory) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, trajectory)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

fn run_iou(args: &[String]) -> Result<f32> {
    let values = args
        .iter()
        .map(|a| {
            a.parse::<f32>()
                .with_context(|| format!("Not a number: {a:?}"))
        })
        .collect::<Result<Vec<f32>>>()?;
    let [x1, y1, w1, h1, x2, y2, w2, h2] = values[..] else {
        bail!("iou needs 8 numbers, got {}\n{USAGE}", values.len());
    };
    Ok(iou(Rect::new(x1, y1, w1, h1), Rect::new(x2, y2, w2, h2)))
}
