use crate::background::BackgroundModel;
use crate::overlay;
use crate::regions::extract_regions;
use crate::segmentation::{SegmentStore, SegmentationController};
use crate::time_gate::DetectionWindow;
use crate::types::{DetectionConfig, Frame, OperatorCommand, RunStats};
use anyhow::Result;
use chrono::NaiveDateTime;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Produces frames until the stream ends. `None` means the source is
/// exhausted, not an error.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Live preview sink.
pub trait FrameDisplay {
    fn show(&mut self, frame: &Frame) -> Result<()>;
}

/// Non-blocking operator input, polled once per iteration.
pub trait CommandSource {
    fn poll(&mut self) -> Result<OperatorCommand>;
}

/// Wall-clock reading, one per iteration. Every decision in that iteration
/// (window gate, log stamps, rollover) uses the same reading.
pub trait Clock {
    fn now(&mut self) -> NaiveDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&mut self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Per-frame detection driver: gates on the schedule, classifies motion,
/// annotates frames, and feeds everything into the recording segments.
pub struct Pipeline {
    model: BackgroundModel,
    window: DetectionWindow,
    config: DetectionConfig,
    paused: bool,
    stats: RunStats,
}

impl Pipeline {
    pub fn new(model: BackgroundModel, window: DetectionWindow, config: DetectionConfig) -> Self {
        Self {
            model,
            window,
            config,
            paused: false,
            stats: RunStats::default(),
        }
    }

    /// Drive the full capture loop until the source ends, the operator
    /// quits, or the interrupt flag clears. The recording is finalized on
    /// every exit path, including errors mid-loop.
    pub fn run<S: SegmentStore>(
        mut self,
        source: &mut dyn FrameSource,
        display: &mut dyn FrameDisplay,
        commands: &mut dyn CommandSource,
        clock: &mut dyn Clock,
        controller: &mut SegmentationController<S>,
        running: &AtomicBool,
    ) -> Result<RunStats> {
        controller.begin(clock.now())?;
        let outcome = self.drive(source, display, commands, clock, controller, running);
        let finished = controller.finish(clock.now());
        outcome.and(finished)?;
        Ok(self.stats)
    }

    fn drive<S: SegmentStore>(
        &mut self,
        source: &mut dyn FrameSource,
        display: &mut dyn FrameDisplay,
        commands: &mut dyn CommandSource,
        clock: &mut dyn Clock,
        controller: &mut SegmentationController<S>,
        running: &AtomicBool,
    ) -> Result<()> {
        while running.load(Ordering::SeqCst) {
            let Some(mut frame) = source.next_frame()? else {
                info!("Frame source ended");
                break;
            };
            self.stats.total_frames += 1;

            let now = clock.now();
            let active = self.window.contains(now.time());

            if active && !self.paused {
                self.detect(&mut frame, now, controller)?;
            } else {
                if !active {
                    overlay::draw_disabled_banner(&mut frame)?;
                    controller.log(now, "Detection disabled - outside schedule")?;
                    self.stats.disabled_frames += 1;
                }
                if self.config.adapt_while_idle {
                    // Keep the statistics tracking the scene so re-enabling
                    // does not greet a stale background with a wall of
                    // spurious motion.
                    self.model.update(&frame)?;
                }
            }

            controller.write_frame(&frame)?;
            display.show(&frame)?;

            match commands.poll()? {
                OperatorCommand::Quit => {
                    info!("Operator requested quit");
                    controller.log(now, "Recording stopped")?;
                    return Ok(());
                }
                OperatorCommand::TogglePause => {
                    self.paused = !self.paused;
                    let message = if self.paused {
                        "Recording paused"
                    } else {
                        "Recording resumed"
                    };
                    info!("{message}");
                    controller.log(now, message)?;
                }
                OperatorCommand::None => {}
            }

            if controller.roll_if_due(now)? {
                self.stats.rollovers += 1;
            }
        }

        if !running.load(Ordering::SeqCst) {
            info!("Interrupt received, shutting down");
        }
        Ok(())
    }

    fn detect<S: SegmentStore>(
        &mut self,
        frame: &mut Frame,
        now: NaiveDateTime,
        controller: &mut SegmentationController<S>,
    ) -> Result<()> {
        let mask = self.model.update(frame)?;
        let scan = extract_regions(&mask, self.config.min_region_area);

        if !scan.regions.is_empty() {
            overlay::draw_regions(frame, &scan.regions)?;
            self.stats.qualifying_regions += scan.regions.len() as u64;
        }

        if scan.raw_count > 0 {
            self.stats.frames_with_motion += 1;
            self.stats.raw_regions += scan.raw_count as u64;
            debug!(raw = scan.raw_count, kept = scan.regions.len(), "motion");
            controller.log(now, &format!("Motion detected: {} region(s)", scan.raw_count))?;
        }
        Ok(())
    }
}
