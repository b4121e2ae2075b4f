mod background;
mod config;
mod event_log;
mod overlay;
mod pipeline;
mod regions;
mod segmentation;
#[cfg(test)]
mod testutil;
mod time_gate;
mod types;
mod video_io;

use crate::background::BackgroundModel;
use crate::pipeline::{Pipeline, SystemClock};
use crate::segmentation::SegmentationController;
use crate::time_gate::DetectionWindow;
use crate::types::Config;
use crate::video_io::{CameraSource, DiskStore, DisplayWindow, KeyboardPoll};
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const PREVIEW_WINDOW: &str = "Motion Sentry";

fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());
    let config = Config::load(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("motion_sentry={}", config.logging.level).into()),
        )
        .init();
    info!("Loaded configuration from {config_path}");

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        if let Err(err) = ctrlc::set_handler(move || running.store(false, Ordering::SeqCst)) {
            warn!("Failed to install interrupt handler: {err}");
        }
    }

    let mut source = CameraSource::open(config.video.camera_index, config.video.fallback_fps)?;
    let mut display = DisplayWindow::create(PREVIEW_WINDOW)?;
    let mut commands = KeyboardPoll;
    let mut clock = SystemClock;

    let store = DiskStore::new(&config.video.output_dir);
    let mut controller = SegmentationController::new(
        store,
        config.recording.rollover_hours,
        source.fps(),
        source.width(),
        source.height(),
    );

    let window = DetectionWindow::parse(
        &config.detection.window_start,
        &config.detection.window_end,
    )?;
    let model = BackgroundModel::new(
        config.detection.background_history,
        config.detection.background_sensitivity,
        config.detection.foreground_threshold,
    );

    let pipeline = Pipeline::new(model, window, config.detection.clone());
    let stats = pipeline.run(
        &mut source,
        &mut display,
        &mut commands,
        &mut clock,
        &mut controller,
        &running,
    )?;

    opencv::highgui::destroy_all_windows().context("failed to tear down preview windows")?;

    info!(
        total_frames = stats.total_frames,
        frames_with_motion = stats.frames_with_motion,
        raw_regions = stats.raw_regions,
        qualifying_regions = stats.qualifying_regions,
        disabled_frames = stats.disabled_frames,
        rollovers = stats.rollovers,
        "Run complete"
    );
    Ok(())
}
