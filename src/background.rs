use crate::types::{ForegroundMask, Frame, PipelineError};

/// Variance assigned to a pixel the first time it is observed.
const INITIAL_VARIANCE: f32 = 225.0;
/// Floor that keeps fully settled pixels from matching on sensor noise.
const MIN_VARIANCE: f32 = 4.0;
/// Cap on the per-pixel variance; a transient object raises the deviation
/// enormously and an unbounded variance would stop all detection afterwards.
const MAX_VARIANCE: f32 = 1125.0;

/// Adaptive per-pixel background statistics over a blurred grayscale view of
/// the incoming frames.
///
/// Each pixel keeps a running mean and variance updated with learning rate
/// `1 / min(frames_seen, history)`, so the model tracks slow illumination
/// drift while the bounded history keeps it responsive. Classification uses
/// the statistics as they stood before the current frame is absorbed: the
/// squared deviation is scored against `sensitivity` times the pixel
/// variance, scaled to 0-255, and binarized against the configured
/// foreground threshold.
pub struct BackgroundModel {
    width: usize,
    height: usize,
    mean: Vec<f32>,
    variance: Vec<f32>,
    frames_seen: u64,
    history: usize,
    sensitivity: f32,
    threshold: u8,
}

impl BackgroundModel {
    pub fn new(history: usize, sensitivity: f32, threshold: u8) -> Self {
        Self {
            width: 0,
            height: 0,
            mean: Vec::new(),
            variance: Vec::new(),
            frames_seen: 0,
            history: history.max(1),
            sensitivity: sensitivity.max(1.0),
            threshold,
        }
    }

    /// Absorb one frame and classify it against the model as it stood
    /// beforehand. The first frame seeds the statistics and yields an empty
    /// mask. Frames must keep the dimensions established by the first call.
    pub fn update(&mut self, frame: &Frame) -> Result<ForegroundMask, PipelineError> {
        let sample = blurred_luminance(frame);

        if self.frames_seen == 0 {
            self.width = frame.width;
            self.height = frame.height;
            self.mean = sample;
            self.variance = vec![INITIAL_VARIANCE; frame.width * frame.height];
            self.frames_seen = 1;
            return Ok(ForegroundMask {
                data: vec![0; frame.width * frame.height],
                width: frame.width,
                height: frame.height,
            });
        }

        if frame.width != self.width || frame.height != self.height {
            return Err(PipelineError::DimensionMismatch {
                width: self.width,
                height: self.height,
                got_width: frame.width,
                got_height: frame.height,
            });
        }

        let mut mask = vec![0u8; self.width * self.height];
        let alpha = 1.0 / (self.frames_seen.min(self.history as u64) as f32);

        for i in 0..sample.len() {
            let value = sample[i];
            let deviation = value - self.mean[i];
            let squared = deviation * deviation;

            let tolerance = self.sensitivity * self.variance[i].max(MIN_VARIANCE);
            let score = ((squared / tolerance) * 255.0).min(255.0) as u8;
            if score > self.threshold {
                mask[i] = 255;
            }

            self.mean[i] += alpha * deviation;
            self.variance[i] =
                (self.variance[i] + alpha * (squared - self.variance[i])).min(MAX_VARIANCE);
        }

        self.frames_seen += 1;

        Ok(ForegroundMask {
            data: mask,
            width: self.width,
            height: self.height,
        })
    }
}

/// Grayscale conversion followed by the 5-tap Gaussian smoothing pass that
/// suppresses sensor noise before the pixels reach the statistics.
fn blurred_luminance(frame: &Frame) -> Vec<f32> {
    let (w, h) = (frame.width, frame.height);
    let mut gray = vec![0.0f32; w * h];

    for (i, px) in frame.data.chunks_exact(3).enumerate() {
        // BGR channel order.
        gray[i] = 0.114 * px[0] as f32 + 0.587 * px[1] as f32 + 0.299 * px[2] as f32;
    }

    gaussian_blur(&gray, w, h)
}

/// Separable 5x5 Gaussian (kernel 1-4-6-4-1, replicated borders).
fn gaussian_blur(src: &[f32], width: usize, height: usize) -> Vec<f32> {
    const KERNEL: [f32; 5] = [1.0 / 16.0, 4.0 / 16.0, 6.0 / 16.0, 4.0 / 16.0, 1.0 / 16.0];

    let mut horizontal = vec![0.0f32; src.len()];
    for y in 0..height {
        let row = y * width;
        for x in 0..width {
            let mut acc = 0.0;
            for (k, weight) in KERNEL.iter().enumerate() {
                let sx = (x as isize + k as isize - 2).clamp(0, width as isize - 1) as usize;
                acc += weight * src[row + sx];
            }
            horizontal[row + x] = acc;
        }
    }

    let mut out = vec![0.0f32; src.len()];
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0;
            for (k, weight) in KERNEL.iter().enumerate() {
                let sy = (y as isize + k as isize - 2).clamp(0, height as isize - 1) as usize;
                acc += weight * horizontal[sy * width + x];
            }
            out[y * width + x] = acc;
        }
    }

    out
}
