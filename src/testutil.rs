use crate::pipeline::{Clock, CommandSource, FrameDisplay, FrameSource};
use crate::segmentation::SegmentStore;
use crate::types::{ForegroundMask, Frame, OperatorCommand};
use anyhow::Result;
use chrono::{Duration, NaiveDateTime};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

pub fn solid_frame(width: usize, height: usize, value: u8, index: u64) -> Frame {
    Frame {
        data: vec![value; width * height * 3],
        width,
        height,
        index,
    }
}

/// Black frame with a white square of the given size at (x, y).
pub fn square_frame(width: usize, height: usize, index: u64, x: usize, y: usize, size: usize) -> Frame {
    let mut frame = solid_frame(width, height, 0, index);
    for sy in y..(y + size).min(height) {
        for sx in x..(x + size).min(width) {
            let base = (sy * width + sx) * 3;
            frame.data[base] = 255;
            frame.data[base + 1] = 255;
            frame.data[base + 2] = 255;
        }
    }
    frame
}

/// Build a mask from ASCII art rows; `X` marks foreground.
pub fn mask_from_rows(rows: &[&str]) -> ForegroundMask {
    let height = rows.len();
    let width = rows[0].len();
    let mut data = vec![0u8; width * height];
    for (y, row) in rows.iter().enumerate() {
        assert_eq!(row.len(), width, "ragged mask rows");
        for (x, ch) in row.bytes().enumerate() {
            if ch == b'X' {
                data[y * width + x] = 255;
            }
        }
    }
    ForegroundMask {
        data,
        width,
        height,
    }
}

#[derive(Debug, Clone)]
pub struct ClosedSegment {
    pub name: String,
    pub frames: Vec<Frame>,
    pub log: Vec<(NaiveDateTime, String)>,
}

#[derive(Debug, Default)]
pub struct Ledger {
    pub closed: Vec<ClosedSegment>,
    pub open_now: usize,
    pub max_open: usize,
}

pub type SharedLedger = Rc<RefCell<Ledger>>;

/// In-memory stand-in for the disk store; every opened segment ends up in
/// the shared ledger once closed.
pub struct MemoryStore {
    ledger: SharedLedger,
}

pub struct MemorySegment {
    name: String,
    frames: Vec<Frame>,
    log: Vec<(NaiveDateTime, String)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            ledger: Rc::new(RefCell::new(Ledger::default())),
        }
    }

    pub fn ledger(&self) -> SharedLedger {
        self.ledger.clone()
    }
}

impl SegmentStore for MemoryStore {
    type Segment = MemorySegment;

    fn open_segment(
        &mut self,
        name: &str,
        _fps: f64,
        _width: usize,
        _height: usize,
    ) -> Result<Self::Segment> {
        let mut ledger = self.ledger.borrow_mut();
        ledger.open_now += 1;
        ledger.max_open = ledger.max_open.max(ledger.open_now);
        Ok(MemorySegment {
            name: name.to_string(),
            frames: Vec::new(),
            log: Vec::new(),
        })
    }

    fn write_frame(&mut self, segment: &mut Self::Segment, frame: &Frame) -> Result<()> {
        segment.frames.push(frame.clone());
        Ok(())
    }

    fn append_log(
        &mut self,
        segment: &mut Self::Segment,
        timestamp: NaiveDateTime,
        message: &str,
    ) -> Result<()> {
        segment.log.push((timestamp, message.to_string()));
        Ok(())
    }

    fn close_segment(&mut self, segment: Self::Segment) -> Result<()> {
        let mut ledger = self.ledger.borrow_mut();
        ledger.open_now -= 1;
        ledger.closed.push(ClosedSegment {
            name: segment.name,
            frames: segment.frames,
            log: segment.log,
        });
        Ok(())
    }
}

pub struct ScriptedSource {
    pub frames: VecDeque<Frame>,
}

impl ScriptedSource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
        }
    }
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.pop_front())
    }
}

pub struct NullDisplay {
    pub shown: u64,
}

impl NullDisplay {
    pub fn new() -> Self {
        Self { shown: 0 }
    }
}

impl FrameDisplay for NullDisplay {
    fn show(&mut self, _frame: &Frame) -> Result<()> {
        self.shown += 1;
        Ok(())
    }
}

/// Pops one scripted command per poll, then reports `None` forever.
pub struct ScriptedCommands {
    pub queue: VecDeque<OperatorCommand>,
}

impl ScriptedCommands {
    pub fn new(commands: Vec<OperatorCommand>) -> Self {
        Self {
            queue: commands.into(),
        }
    }

    pub fn idle() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }
}

impl CommandSource for ScriptedCommands {
    fn poll(&mut self) -> Result<OperatorCommand> {
        Ok(self.queue.pop_front().unwrap_or(OperatorCommand::None))
    }
}

/// Deterministic clock that advances by a fixed step on every reading.
pub struct SteppingClock {
    current: NaiveDateTime,
    step: Duration,
}

impl SteppingClock {
    pub fn new(start: NaiveDateTime, step: Duration) -> Self {
        Self {
            current: start,
            step,
        }
    }
}

impl Clock for SteppingClock {
    fn now(&mut self) -> NaiveDateTime {
        let now = self.current;
        self.current += self.step;
        now
    }
}
