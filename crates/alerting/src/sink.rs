//! Alarm outputs

use std::io::Write;
use std::time::Duration;
use tracing::{debug, warn};

use crate::AlarmError;

/// Where the alarm sound goes. `start`/`stop` are fire-and-forget;
/// `tick` is called once per frame while the alarm sounds.
pub trait AlarmSink {
    fn start(&mut self) -> Result<(), AlarmError>;

    fn stop(&mut self) -> Result<(), AlarmError>;

    fn tick(&mut self, _now: Duration) -> Result<(), AlarmError> {
        Ok(())
    }
}

/// Rings the terminal bell, repeating every `interval` while active
pub struct TerminalBell<W: Write> {
    out: W,
    interval: Duration,
    last_beep: Option<Duration>,
    active: bool,
}

impl TerminalBell<std::io::Stderr> {
    pub fn stderr(interval: Duration) -> Self {
        Self::new(std::io::stderr(), interval)
    }
}

impl<W: Write> TerminalBell<W> {
    pub fn new(out: W, interval: Duration) -> Self {
        Self {
            out,
            interval,
            last_beep: None,
            active: false,
        }
    }

    fn beep(&mut self) -> Result<(), AlarmError> {
        self.out.write_all(b"\x07")?;
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> AlarmSink for TerminalBell<W> {
    fn start(&mut self) -> Result<(), AlarmError> {
        self.active = true;
        self.last_beep = None;
        debug!("Bell on");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AlarmError> {
        self.active = false;
        debug!("Bell off");
        Ok(())
    }

    fn tick(&mut self, now: Duration) -> Result<(), AlarmError> {
        if !self.active {
            return Ok(());
        }
        let due = match self.last_beep {
            Some(last) => now.saturating_sub(last) >= self.interval,
            None => true,
        };
        if due {
            self.last_beep = Some(now);
            self.beep()?;
        }
        Ok(())
    }
}

/// Logs instead of sounding (headless runs)
#[derive(Debug, Default)]
pub struct LogSink;

impl AlarmSink for LogSink {
    fn start(&mut self) -> Result<(), AlarmError> {
        warn!("ALARM!");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AlarmError> {
        Ok(())
    }
}

/// Counts calls, for tests
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub starts: usize,
    pub stops: usize,
    pub ticks: usize,
}

impl AlarmSink for RecordingSink {
    fn start(&mut self) -> Result<(), AlarmError> {
        self.starts += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AlarmError> {
        self.stops += 1;
        Ok(())
    }

    fn tick(&mut self, _now: Duration) -> Result<(), AlarmError> {
        self.ticks += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_bell_repeats_at_interval() {
        let mut bell = TerminalBell::new(Vec::new(), ms(300));
        bell.start().unwrap();
        for t in [0, 100, 200, 300, 400, 650] {
            bell.tick(ms(t)).unwrap();
        }
        // beeps at 0, 300, 650
        assert_eq!(bell.into_inner(), b"\x07\x07\x07".to_vec());
    }

    #[test]
    fn test_bell_silent_when_stopped() {
        let mut bell = TerminalBell::new(Vec::new(), ms(300));
        bell.tick(ms(0)).unwrap();
        bell.start().unwrap();
        bell.stop().unwrap();
        bell.tick(ms(1000)).unwrap();
        assert!(bell.into_inner().is_empty());
    }
}
