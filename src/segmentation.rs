use crate::types::Frame;
use anyhow::{bail, Result};
use chrono::{Duration, NaiveDateTime, NaiveTime};
use tracing::info;

/// Persistence collaborator for recording segments: a video sink plus the
/// segment's event log, both living in one directory per segment.
pub trait SegmentStore {
    type Segment;

    fn open_segment(
        &mut self,
        name: &str,
        fps: f64,
        width: usize,
        height: usize,
    ) -> Result<Self::Segment>;

    fn write_frame(&mut self, segment: &mut Self::Segment, frame: &Frame) -> Result<()>;

    fn append_log(
        &mut self,
        segment: &mut Self::Segment,
        timestamp: NaiveDateTime,
        message: &str,
    ) -> Result<()>;

    fn close_segment(&mut self, segment: Self::Segment) -> Result<()>;
}

struct ActiveSegment<T> {
    name: String,
    started_at: NaiveDateTime,
    inner: T,
}

/// Owns the active recording segment and rolls it over whenever a
/// period-aligned wall-clock boundary passes.
///
/// Boundaries sit at midnight plus whole multiples of the rollover period
/// (12h gives 00:00 and 12:00). Rollover triggers as soon as the boundary
/// has passed, independent of second or minute alignment, so a slow
/// iteration can never skip one. Exactly one segment is open at any time and
/// the closed segment is flushed before its successor opens.
pub struct SegmentationController<S: SegmentStore> {
    store: S,
    period: Duration,
    fps: f64,
    width: usize,
    height: usize,
    active: Option<ActiveSegment<S::Segment>>,
    next_boundary: NaiveDateTime,
}

impl<S: SegmentStore> SegmentationController<S> {
    pub fn new(store: S, rollover_hours: i64, fps: f64, width: usize, height: usize) -> Self {
        Self {
            store,
            period: Duration::hours(rollover_hours.max(1)),
            fps,
            width,
            height,
            active: None,
            next_boundary: NaiveDateTime::MAX,
        }
    }

    /// Open the first segment. Called once at pipeline startup.
    pub fn begin(&mut self, now: NaiveDateTime) -> Result<()> {
        if self.active.is_some() {
            bail!("recording already started");
        }
        self.open(now)?;
        Ok(())
    }

    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let Some(segment) = self.active.as_mut() else {
            bail!("no active segment");
        };
        self.store.write_frame(&mut segment.inner, frame)
    }

    pub fn log(&mut self, now: NaiveDateTime, message: &str) -> Result<()> {
        let Some(segment) = self.active.as_mut() else {
            bail!("no active segment");
        };
        self.store.append_log(&mut segment.inner, now, message)
    }

    /// Roll the recording into a new segment if a boundary has passed.
    /// Returns whether a rollover happened. The frame written in the same
    /// iteration lands in the old segment; everything after lands in the new
    /// one.
    pub fn roll_if_due(&mut self, now: NaiveDateTime) -> Result<bool> {
        if self.active.is_none() || now < self.next_boundary {
            return Ok(false);
        }

        info!("Rolling over recording segment");
        self.close()?;
        let name = self.open(now)?;
        self.log(now, &format!("Video segment rolled over: {name}.avi"))?;
        Ok(true)
    }

    /// Finalize the active segment. Safe to call when nothing is open.
    pub fn finish(&mut self, _now: NaiveDateTime) -> Result<()> {
        self.close()
    }

    fn open(&mut self, now: NaiveDateTime) -> Result<String> {
        let name = now.format("%Y-%m-%d_%H-%M-%S").to_string();
        let mut inner = self
            .store
            .open_segment(&name, self.fps, self.width, self.height)?;
        self.store
            .append_log(&mut inner, now, &format!("Recording started: {name}.avi"))?;

        info!("Opened recording segment {name}");
        self.active = Some(ActiveSegment {
            name: name.clone(),
            started_at: now,
            inner,
        });
        self.next_boundary = next_boundary_after(now, self.period);
        Ok(name)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(segment) = self.active.take() {
            info!(
                "Closing recording segment {} (started {})",
                segment.name, segment.started_at
            );
            self.store.close_segment(segment.inner)?;
        }
        Ok(())
    }
}

/// Earliest instant aligned to midnight plus a whole multiple of `period`
/// that lies strictly after `start`.
fn next_boundary_after(start: NaiveDateTime, period: Duration) -> NaiveDateTime {
    let midnight = NaiveDateTime::new(start.date(), NaiveTime::MIN);
    let elapsed = (start - midnight).num_seconds();
    let period_secs = period.num_seconds();
    let steps = elapsed / period_secs + 1;
    midnight + Duration::seconds(steps * period_secs)
}
