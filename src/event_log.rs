use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Append-only `log.txt` living next to its segment's video file. The log
/// belongs to the segment and is never rotated on its own.
pub struct EventLog {
    file: File,
}

impl EventLog {
    pub fn create(dir: &Path) -> Result<Self> {
        let path = dir.join("log.txt");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open event log {}", path.display()))?;
        Ok(Self { file })
    }

    pub fn append(&mut self, timestamp: NaiveDateTime, message: &str) -> Result<()> {
        writeln!(
            self.file,
            "{} - {}",
            timestamp.format("%Y-%m-%d %H:%M:%S"),
            message
        )
        .context("failed to append to event log")?;
        self.file.flush().context("failed to flush event log")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 30, 7)
            .unwrap()
    }

    #[test]
    fn appends_formatted_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = EventLog::create(dir.path()).unwrap();
        log.append(stamp(), "Recording started: test.avi").unwrap();
        log.append(stamp(), "Motion detected: 2 region(s)").unwrap();

        let contents = std::fs::read_to_string(dir.path().join("log.txt")).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "2024-03-05 14:30:07 - Recording started: test.avi");
        assert_eq!(lines[1], "2024-03-05 14:30:07 - Motion detected: 2 region(s)");
    }

    #[test]
    fn reopening_appends_rather_than_truncates() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut log = EventLog::create(dir.path()).unwrap();
            log.append(stamp(), "first").unwrap();
        }
        {
            let mut log = EventLog::create(dir.path()).unwrap();
            log.append(stamp(), "second").unwrap();
        }
        let contents = std::fs::read_to_string(dir.path().join("log.txt")).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
