use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub video: VideoConfig,
    pub detection: DetectionConfig,
    pub recording: RecordingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    pub camera_index: i32,
    pub fallback_fps: f64,
    pub output_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    pub window_start: String,
    pub window_end: String,
    pub foreground_threshold: u8,
    pub min_region_area: u32,
    pub background_history: usize,
    pub background_sensitivity: f32,
    pub adapt_while_idle: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    pub rollover_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// One captured image, BGR interleaved, owned for a single pipeline iteration.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub index: u64,
}

/// Binary foreground classification with the same dimensions as its frame.
/// Pixels are 0 (background) or 255 (foreground).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundMask {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

impl ForegroundMask {
    pub fn is_set(&self, x: usize, y: usize) -> bool {
        self.data[y * self.width + x] != 0
    }
}

/// Bounding rectangle of one connected cluster of foreground pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub area: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    None,
    Quit,
    TogglePause,
}

/// Per-run counters reported when the pipeline exits.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunStats {
    pub total_frames: u64,
    pub frames_with_motion: u64,
    pub raw_regions: u64,
    pub qualifying_regions: u64,
    pub disabled_frames: u64,
    pub rollovers: u64,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("frame is {got_width}x{got_height} but the model was built for {width}x{height}")]
    DimensionMismatch {
        width: usize,
        height: usize,
        got_width: usize,
        got_height: usize,
    },
}
