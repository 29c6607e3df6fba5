//! Alarm lifecycle

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use crate::sink::AlarmSink;
use crate::AlarmError;

/// Alarm configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    /// Sound the alarm at all (toggled at runtime)
    pub enabled: bool,
    /// Maximum time a single alarm sounds (milliseconds)
    pub duration_ms: u64,
    /// Gap between beeps while sounding (milliseconds)
    pub beep_interval_ms: u64,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_ms: 5000,
            beep_interval_ms: 300,
        }
    }
}

impl AlarmConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// Why a sounding alarm was silenced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Ran for the full alarm duration
    Expired,
    /// Driver no longer drowsy
    DriverAwake,
    /// Reset command or sound turned off
    Manual,
}

/// Lifecycle change reported by [`AlarmController::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmEvent {
    Started,
    Stopped(StopReason),
}

/// Whether an alarm started at `started` must stop at `now`.
///
/// Stops on whichever comes first: `max_duration` elapsed or the driver no
/// longer drowsy.
pub fn stop_reason(
    started: Duration,
    now: Duration,
    is_drowsy: bool,
    max_duration: Duration,
) -> Option<StopReason> {
    if now.saturating_sub(started) >= max_duration {
        Some(StopReason::Expired)
    } else if !is_drowsy {
        Some(StopReason::DriverAwake)
    } else {
        None
    }
}

/// Sounds the alarm while the DMS trigger flag is set and the driver is
/// drowsy, and stops it per [`stop_reason`].
///
/// An alarm silenced by a no-face frame, by expiry or by the sound toggle
/// starts again on the next frame that still qualifies.
pub struct AlarmController {
    config: AlarmConfig,
    /// When the current alarm started
    active_since: Option<Duration>,
    /// Alarms started this session
    fire_count: usize,
}

impl AlarmController {
    pub fn new(config: AlarmConfig) -> Self {
        info!("Creating alarm controller with config: {:?}", config);
        Self {
            config,
            active_since: None,
            fire_count: 0,
        }
    }

    /// Feed one frame's DMS decision
    pub fn update(
        &mut self,
        alarm_triggered: bool,
        is_drowsy: bool,
        now: Duration,
        sink: &mut dyn AlarmSink,
    ) -> Result<Option<AlarmEvent>, AlarmError> {
        if let Some(started) = self.active_since {
            if let Some(reason) = stop_reason(started, now, is_drowsy, self.config.duration()) {
                self.active_since = None;
                sink.stop()?;
                info!("Alarm stopped ({:?})", reason);
                return Ok(Some(AlarmEvent::Stopped(reason)));
            }
            sink.tick(now)?;
            return Ok(None);
        }

        if alarm_triggered && is_drowsy && self.config.enabled {
            self.active_since = Some(now);
            self.fire_count += 1;
            sink.start()?;
            sink.tick(now)?;
            return Ok(Some(AlarmEvent::Started));
        }

        Ok(None)
    }

    /// Silence immediately (reset command)
    pub fn stop(&mut self, sink: &mut dyn AlarmSink) -> Result<Option<AlarmEvent>, AlarmError> {
        if self.active_since.take().is_some() {
            sink.stop()?;
            info!("Alarm stopped (manual)");
            return Ok(Some(AlarmEvent::Stopped(StopReason::Manual)));
        }
        Ok(None)
    }

    /// Flip the sound toggle; turning it off silences a running alarm
    pub fn toggle_enabled(&mut self, sink: &mut dyn AlarmSink) -> Result<bool, AlarmError> {
        self.config.enabled = !self.config.enabled;
        if !self.config.enabled {
            self.stop(sink)?;
        }
        info!("Sound {}", if self.config.enabled { "ON" } else { "OFF" });
        Ok(self.config.enabled)
    }

    pub fn is_active(&self) -> bool {
        self.active_since.is_some()
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn fire_count(&self) -> usize {
        self.fire_count
    }

    pub fn config(&self) -> &AlarmConfig {
        &self.config
    }
}

impl Default for AlarmController {
    fn default() -> Self {
        Self::new(AlarmConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RecordingSink;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_stop_reason() {
        let max = ms(5000);
        assert_eq!(stop_reason(ms(0), ms(4999), true, max), None);
        assert_eq!(stop_reason(ms(0), ms(5000), true, max), Some(StopReason::Expired));
        assert_eq!(stop_reason(ms(0), ms(100), false, max), Some(StopReason::DriverAwake));
        // expiry wins when both hold
        assert_eq!(stop_reason(ms(0), ms(6000), false, max), Some(StopReason::Expired));
    }

    #[test]
    fn test_starts_when_triggered_and_drowsy() {
        let mut alarm = AlarmController::default();
        let mut sink = RecordingSink::default();

        assert_eq!(alarm.update(false, true, ms(0), &mut sink).unwrap(), None);
        assert_eq!(alarm.update(true, false, ms(50), &mut sink).unwrap(), None);
        assert_eq!(
            alarm.update(true, true, ms(100), &mut sink).unwrap(),
            Some(AlarmEvent::Started)
        );
        assert!(alarm.is_active());
        // already sounding: no second start
        assert_eq!(alarm.update(true, true, ms(200), &mut sink).unwrap(), None);
        assert_eq!(sink.starts, 1);
    }

    #[test]
    fn test_restarts_after_expiry() {
        let mut alarm = AlarmController::default();
        let mut sink = RecordingSink::default();

        alarm.update(true, true, ms(0), &mut sink).unwrap();
        assert_eq!(
            alarm.update(true, true, ms(5000), &mut sink).unwrap(),
            Some(AlarmEvent::Stopped(StopReason::Expired))
        );
        assert_eq!(
            alarm.update(true, true, ms(5033), &mut sink).unwrap(),
            Some(AlarmEvent::Started)
        );
        assert_eq!(sink.starts, 2);
        assert_eq!(sink.stops, 1);
    }

    #[test]
    fn test_restarts_after_face_dropout() {
        let mut alarm = AlarmController::default();
        let mut sink = RecordingSink::default();

        alarm.update(true, true, ms(2400), &mut sink).unwrap();
        // no-face frame: not drowsy, trigger flag still set
        assert_eq!(
            alarm.update(true, false, ms(2500), &mut sink).unwrap(),
            Some(AlarmEvent::Stopped(StopReason::DriverAwake))
        );
        assert_eq!(
            alarm.update(true, true, ms(2600), &mut sink).unwrap(),
            Some(AlarmEvent::Started)
        );
        assert!(alarm.is_active());
        assert_eq!(alarm.fire_count(), 2);
    }

    #[test]
    fn test_stops_when_driver_wakes() {
        let mut alarm = AlarmController::default();
        let mut sink = RecordingSink::default();

        alarm.update(true, true, ms(0), &mut sink).unwrap();
        assert_eq!(
            alarm.update(false, false, ms(800), &mut sink).unwrap(),
            Some(AlarmEvent::Stopped(StopReason::DriverAwake))
        );

        // next episode fires again
        assert_eq!(
            alarm.update(true, true, ms(5000), &mut sink).unwrap(),
            Some(AlarmEvent::Started)
        );
        assert_eq!(alarm.fire_count(), 2);
    }

    #[test]
    fn test_disabled_never_starts() {
        let mut alarm = AlarmController::new(AlarmConfig {
            enabled: false,
            ..Default::default()
        });
        let mut sink = RecordingSink::default();
        assert_eq!(alarm.update(true, true, ms(0), &mut sink).unwrap(), None);
        assert_eq!(sink.starts, 0);
    }

    #[test]
    fn test_toggle_off_silences() {
        let mut alarm = AlarmController::default();
        let mut sink = RecordingSink::default();
        alarm.update(true, true, ms(0), &mut sink).unwrap();

        assert!(!alarm.toggle_enabled(&mut sink).unwrap());
        assert!(!alarm.is_active());
        assert_eq!(sink.stops, 1);
        assert_eq!(alarm.update(true, true, ms(100), &mut sink).unwrap(), None);

        // sound back on mid-episode
        assert!(alarm.toggle_enabled(&mut sink).unwrap());
        assert_eq!(
            alarm.update(true, true, ms(200), &mut sink).unwrap(),
            Some(AlarmEvent::Started)
        );
    }

    #[test]
    fn test_manual_stop() {
        let mut alarm = AlarmController::default();
        let mut sink = RecordingSink::default();
        assert_eq!(alarm.stop(&mut sink).unwrap(), None);

        alarm.update(true, true, ms(0), &mut sink).unwrap();
        assert_eq!(
            alarm.stop(&mut sink).unwrap(),
            Some(AlarmEvent::Stopped(StopReason::Manual))
        );
    }
}
