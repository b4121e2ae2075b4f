use crate::event_log::EventLog;
use crate::pipeline::{CommandSource, FrameDisplay, FrameSource};
use crate::segmentation::SegmentStore;
use crate::types::{Frame, OperatorCommand};
use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use opencv::core::{Mat, Size};
use opencv::prelude::*;
use opencv::{highgui, videoio};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Owned BGR matrix backed by a copy of the frame's pixel buffer.
pub(crate) fn frame_to_mat(frame: &Frame) -> Result<Mat> {
    let flat = Mat::from_slice(&frame.data).context("failed to wrap frame buffer")?;
    let shaped = flat
        .reshape(3, frame.height as i32)
        .context("failed to shape frame matrix")?;
    shaped.try_clone().context("failed to copy frame matrix")
}

pub(crate) fn mat_into_frame(mat: &Mat, frame: &mut Frame) -> Result<()> {
    let bytes = mat.data_bytes().context("failed to read frame matrix")?;
    frame.data.copy_from_slice(bytes);
    Ok(())
}

/// Live capture device. Frame dimensions and rate are read from the driver
/// at open time; a driver that reports no usable rate falls back to the
/// configured one.
pub struct CameraSource {
    capture: videoio::VideoCapture,
    next_index: u64,
    width: usize,
    height: usize,
    fps: f64,
}

impl CameraSource {
    pub fn open(camera_index: i32, fallback_fps: f64) -> Result<Self> {
        let capture = videoio::VideoCapture::new(camera_index, videoio::CAP_ANY)
            .context("failed to initialize video capture")?;
        if !capture.is_opened().context("failed to query capture state")? {
            bail!("camera {camera_index} could not be opened");
        }

        let width = capture
            .get(videoio::CAP_PROP_FRAME_WIDTH)
            .context("failed to read frame width")? as usize;
        let height = capture
            .get(videoio::CAP_PROP_FRAME_HEIGHT)
            .context("failed to read frame height")? as usize;
        let mut fps = capture
            .get(videoio::CAP_PROP_FPS)
            .context("failed to read frame rate")?;
        if !fps.is_finite() || fps <= 0.0 {
            warn!("Camera reports no frame rate, assuming {fallback_fps} fps");
            fps = fallback_fps;
        }

        info!("Camera {camera_index} opened: {width}x{height} at {fps} fps");
        Ok(Self {
            capture,
            next_index: 0,
            width,
            height,
            fps,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut mat = Mat::default();
        if !self
            .capture
            .read(&mut mat)
            .context("failed to read from camera")?
        {
            return Ok(None);
        }

        let bytes = mat.data_bytes().context("failed to access captured pixels")?;
        let frame = Frame {
            data: bytes.to_vec(),
            width: mat.cols() as usize,
            height: mat.rows() as usize,
            index: self.next_index,
        };
        self.next_index += 1;
        Ok(Some(frame))
    }
}

pub struct DisplayWindow {
    name: String,
}

impl DisplayWindow {
    pub fn create(name: &str) -> Result<Self> {
        highgui::named_window(name, highgui::WINDOW_AUTOSIZE)
            .context("failed to create preview window")?;
        Ok(Self {
            name: name.to_string(),
        })
    }
}

impl FrameDisplay for DisplayWindow {
    fn show(&mut self, frame: &Frame) -> Result<()> {
        let mat = frame_to_mat(frame)?;
        highgui::imshow(&self.name, &mat).context("failed to display frame")?;
        Ok(())
    }
}

/// Keyboard input through the preview window: `q` quits, `p` toggles pause.
/// The wait doubles as the inter-frame pacing delay.
pub struct KeyboardPoll;

impl CommandSource for KeyboardPoll {
    fn poll(&mut self) -> Result<OperatorCommand> {
        let key = highgui::wait_key(30).context("failed to poll keyboard")?;
        Ok(match key {
            k if k == 'q' as i32 => OperatorCommand::Quit,
            k if k == 'p' as i32 => OperatorCommand::TogglePause,
            _ => OperatorCommand::None,
        })
    }
}

/// On-disk segment layout: one directory per segment under the output root,
/// holding `<name>.avi` (MJPG) and its `log.txt`.
pub struct DiskStore {
    root: PathBuf,
}

pub struct DiskSegment {
    writer: videoio::VideoWriter,
    log: EventLog,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SegmentStore for DiskStore {
    type Segment = DiskSegment;

    fn open_segment(
        &mut self,
        name: &str,
        fps: f64,
        width: usize,
        height: usize,
    ) -> Result<DiskSegment> {
        let dir = self.root.join(name);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create segment directory {}", dir.display()))?;

        let video_path = dir.join(format!("{name}.avi"));
        let fourcc = videoio::VideoWriter::fourcc('M', 'J', 'P', 'G')
            .context("failed to build MJPG fourcc")?;
        let writer = videoio::VideoWriter::new(
            video_path
                .to_str()
                .context("segment path is not valid UTF-8")?,
            fourcc,
            fps,
            Size::new(width as i32, height as i32),
            true,
        )
        .context("failed to create video writer")?;
        if !writer.is_opened().context("failed to query writer state")? {
            bail!("video writer rejected {}", video_path.display());
        }

        let log = EventLog::create(&dir)?;
        Ok(DiskSegment { writer, log })
    }

    fn write_frame(&mut self, segment: &mut DiskSegment, frame: &Frame) -> Result<()> {
        let mat = frame_to_mat(frame)?;
        segment
            .writer
            .write(&mat)
            .context("failed to write video frame")?;
        Ok(())
    }

    fn append_log(
        &mut self,
        segment: &mut DiskSegment,
        timestamp: NaiveDateTime,
        message: &str,
    ) -> Result<()> {
        segment.log.append(timestamp, message)
    }

    fn close_segment(&mut self, mut segment: DiskSegment) -> Result<()> {
        segment
            .writer
            .release()
            .context("failed to finalize video file")?;
        Ok(())
    }
}
