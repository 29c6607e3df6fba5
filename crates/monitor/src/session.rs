//! Monitoring session: the per-frame loop

use chrono::Local;
use std::fs::File;
use std::io::BufWriter;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use alerting::{AlarmController, AlarmEvent, AlarmSink};
use camera_capture::VideoFrame;
use dms::replay::ReplayWriter;
use dms::{DmsError, DmsModule, DriverStatus, FrameResult, Observation, THRESHOLD_STEP};
use storage::{LogRecord, SessionLog, SessionStats};

use crate::commands::Command;
use crate::overlay::{AnnotationWriter, Scene};
use crate::pipeline::Captured;
use crate::settings::Settings;

/// Whether the loop keeps going after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// Owns the pipeline, the alarm and the outputs for one run
pub struct Session {
    dms: DmsModule,
    alarm: AlarmController,
    sink: Box<dyn AlarmSink>,
    log: Option<SessionLog<BufWriter<File>>>,
    recorder: Option<ReplayWriter<BufWriter<File>>>,
    annotator: Option<AnnotationWriter>,
    stats: SessionStats,
    /// 0 = unlimited
    max_frames: u64,
    last_result: FrameResult,
    last_status: Option<DriverStatus>,
    last_timestamp: Option<Duration>,
    fps: f32,
}

impl Session {
    pub fn new(settings: &Settings, sink: Box<dyn AlarmSink>) -> Result<Self, DmsError> {
        Ok(Self {
            dms: DmsModule::new(settings.dms.clone())?,
            alarm: AlarmController::new(settings.alarm.clone()),
            sink,
            log: None,
            recorder: None,
            annotator: None,
            stats: SessionStats::default(),
            max_frames: 0,
            last_result: FrameResult::default(),
            last_status: None,
            last_timestamp: None,
            fps: 0.0,
        })
    }

    pub fn with_log(mut self, log: SessionLog<BufWriter<File>>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn with_recorder(mut self, recorder: ReplayWriter<BufWriter<File>>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn with_annotator(mut self, annotator: AnnotationWriter) -> Self {
        self.annotator = Some(annotator);
        self
    }

    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Process observations until the stream ends, a quit command arrives,
    /// the frame limit is reached or acquisition fails
    pub fn run<I, T>(
        &mut self,
        observations: I,
        commands: &mut mpsc::Receiver<Command>,
    ) -> SessionStats
    where
        I: IntoIterator<Item = Result<T, DmsError>>,
        T: Into<Captured>,
    {
        info!("Session started");
        for next in observations {
            match next {
                Ok(item) => {
                    let captured: Captured = item.into();
                    let result = self.step(&captured.observation);
                    if let Some(frame) = &captured.frame {
                        self.annotate(frame, &captured.observation, &result);
                    }
                }
                Err(DmsError::Acquisition(message)) => {
                    error!("Camera read error: {}", message);
                    break;
                }
                Err(DmsError::Io(e)) => {
                    error!("Input read error: {}", e);
                    break;
                }
                Err(e) => {
                    warn!("Skipping frame: {}", e);
                }
            }

            if self.drain(commands) == Control::Quit {
                info!("Quit requested");
                break;
            }
            if self.max_frames > 0 && self.stats.total_frames >= self.max_frames {
                info!("Reached frame limit ({})", self.max_frames);
                break;
            }
        }

        if let Err(e) = self.alarm.stop(self.sink.as_mut()) {
            warn!("Failed to silence alarm: {}", e);
        }
        info!("Session ended after {} frames", self.stats.total_frames);
        self.stats.clone()
    }

    /// One frame: decide, drive the alarm, log
    pub fn step(&mut self, observation: &Observation) -> FrameResult {
        let failed = match &mut self.recorder {
            Some(recorder) => recorder.write(observation).err(),
            None => None,
        };
        if let Some(e) = failed {
            warn!("Detection recording stopped: {}", e);
            self.recorder = None;
        }

        let now = observation.timestamp;
        let result = self.dms.observe(observation);

        match self.alarm.update(
            self.dms.alarm_triggered(),
            result.is_drowsy,
            now,
            self.sink.as_mut(),
        ) {
            Ok(Some(AlarmEvent::Started)) => {
                self.stats.record_alarm();
                warn!(
                    "DROWSINESS ALERT! Closed frames: {}, EAR: {:.3} < {:.3}",
                    self.dms.consecutive_closed_frames(),
                    result.ear,
                    self.dms.threshold()
                );
            }
            Ok(_) => {}
            Err(e) => warn!("Alarm output failed: {}", e),
        }

        let failed = match &mut self.log {
            Some(log) => log.append(&LogRecord::from_result(&result, Local::now())).err(),
            None => None,
        };
        if let Some(e) = failed {
            warn!("Session log stopped: {}", e);
            self.log = None;
        }

        self.stats.record(&result);
        self.update_fps(now);
        self.report(&result);
        self.last_result = result;
        result
    }

    /// Save the annotated frame when frame output is on
    pub fn annotate(
        &mut self,
        frame: &VideoFrame,
        observation: &Observation,
        result: &FrameResult,
    ) {
        let scene = Scene {
            detections: &observation.detections,
            result,
            threshold: self.dms.threshold(),
            alarm_active: self.alarm.is_active(),
            fps: self.fps,
            calibration: (!self.dms.is_calibrated()).then(|| self.dms.calibration_progress()),
            timestamp: observation.timestamp,
        };
        let failed = match &mut self.annotator {
            Some(annotator) => annotator.write(frame, &scene).err(),
            None => None,
        };
        if let Some(e) = failed {
            warn!("Frame annotation stopped: {}", e);
            self.annotator = None;
        }
    }

    /// Apply every pending command
    pub fn drain(&mut self, commands: &mut mpsc::Receiver<Command>) -> Control {
        while let Ok(command) = commands.try_recv() {
            if self.handle(command) == Control::Quit {
                return Control::Quit;
            }
        }
        Control::Continue
    }

    pub fn handle(&mut self, command: Command) -> Control {
        match command {
            Command::Quit => return Control::Quit,
            Command::Reset => {
                if let Err(e) = self.alarm.stop(self.sink.as_mut()) {
                    warn!("Failed to silence alarm: {}", e);
                }
                self.dms.reset_state();
                info!("System reset");
            }
            Command::ToggleSound => {
                if let Err(e) = self.alarm.toggle_enabled(self.sink.as_mut()) {
                    warn!("Failed to toggle sound: {}", e);
                }
            }
            Command::ThresholdUp => {
                let threshold = self.dms.adjust_threshold(THRESHOLD_STEP);
                info!("EAR threshold: {:.2}", threshold);
            }
            Command::ThresholdDown => {
                let threshold = self.dms.adjust_threshold(-THRESHOLD_STEP);
                info!("EAR threshold: {:.2}", threshold);
            }
            Command::Info => println!("{}", self.info_report()),
        }
        Control::Continue
    }

    /// Answer to the info command
    pub fn info_report(&self) -> String {
        let snapshot = self.dms.snapshot();
        let calibration = match snapshot.baseline {
            Some(baseline) => format!("yes (reference EAR {:.3})", baseline),
            None => format!(
                "no ({}/{} frames)",
                snapshot.calibration_progress.0, snapshot.calibration_progress.1
            ),
        };
        [
            format!("Current EAR: {:.3}", self.last_result.ear),
            format!("Threshold: {:.2}", snapshot.threshold),
            format!("Eye state: {}", self.last_result.eye_state),
            format!("Eyes detected: {}", self.last_result.eyes_detected),
            format!(
                "Closed frames: {}/{}",
                snapshot.consecutive_closed_frames, snapshot.consec_frames
            ),
            format!("Blinks: {}", snapshot.blink_count),
            format!("Calibrated: {}", calibration),
            format!("Sound: {}", if self.alarm.is_enabled() { "ON" } else { "OFF" }),
        ]
        .join("\n")
    }

    /// End-of-session summary
    pub fn summary(&self) -> String {
        let snapshot = self.dms.snapshot();
        let mut lines = vec![
            "=== Session summary ===".to_string(),
            format!(
                "Frames: {} (face visible in {})",
                self.stats.total_frames, self.stats.face_frames
            ),
            format!("Blinks: {}", self.stats.blinks),
            format!("Alarms: {}", self.stats.alarms),
            format!(
                "Eyes closed: {:.1}% of face frames",
                self.stats.closed_ratio() * 100.0
            ),
            format!("Final threshold: {:.2}", snapshot.threshold),
            match snapshot.baseline {
                Some(baseline) => format!("Reference EAR: {:.3}", baseline),
                None => "Calibration incomplete".to_string(),
            },
        ];
        if let Some(path) = self.log.as_ref().and_then(|log| log.path()) {
            lines.push(format!("Log: {}", path.display()));
        }
        if let Some(annotator) = &self.annotator {
            lines.push(format!(
                "Annotated frames: {} in {}",
                annotator.written(),
                annotator.directory().display()
            ));
        }
        lines.join("\n")
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn dms(&self) -> &DmsModule {
        &self.dms
    }

    pub fn alarm(&self) -> &AlarmController {
        &self.alarm
    }

    /// Frames per second, smoothed over recent frames
    pub fn fps(&self) -> f32 {
        self.fps
    }

    fn update_fps(&mut self, now: Duration) {
        if let Some(previous) = self.last_timestamp {
            let dt = now.saturating_sub(previous).as_secs_f32();
            if dt > 0.0 {
                let instant = 1.0 / dt;
                self.fps = if self.fps == 0.0 {
                    instant
                } else {
                    0.9 * self.fps + 0.1 * instant
                };
            }
        }
        self.last_timestamp = Some(now);
    }

    fn report(&mut self, result: &FrameResult) {
        let status = result.status();
        if self.last_status != Some(status) {
            if status.is_warning() {
                warn!("Status: {}", status);
            } else {
                info!("Status: {}", status);
            }
            self.last_status = Some(status);
        }

        let (done, required) = self.dms.calibration_progress();
        let calibration = if self.dms.is_calibrated() {
            String::new()
        } else {
            format!(" | calibrating {}/{}", done, required)
        };
        debug!(
            "{} | EAR {:.3} (threshold {:.2}) | closed {}/{} | blinks {} | {:.1} fps{}",
            status,
            result.ear,
            self.dms.threshold(),
            self.dms.consecutive_closed_frames(),
            self.dms.config().consec_frames,
            result.blink_count,
            self.fps,
            calibration
        );
    }
}
