//! Layered settings: preset, settings file, environment, command line

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use alerting::AlarmConfig;
use camera_capture::CameraConfig;
use dms::DmsConfig;
use storage::LogConfig;

use crate::args::{Args, Profile};
use crate::overlay::AnnotateConfig;

/// Environment variable prefix, e.g. `DROWSY__DMS__EAR_THRESHOLD=0.22`
pub const ENV_PREFIX: &str = "DROWSY";

/// Everything the monitor needs to start a session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub camera: CameraConfig,
    pub dms: DmsConfig,
    pub alarm: AlarmConfig,
    pub log: LogConfig,
    pub annotate: AnnotateConfig,
}

impl Settings {
    /// Defaults with the DMS preset for `profile`
    pub fn with_profile(profile: Profile) -> Self {
        let dms = match profile {
            Profile::Default => DmsConfig::default(),
            Profile::Strict => DmsConfig::strict(),
            Profile::Lenient => DmsConfig::lenient(),
        };
        Self {
            dms,
            ..Self::default()
        }
    }

    /// Layer the preset, an optional settings file and `DROWSY__*` variables
    pub fn load(path: Option<&Path>, profile: Profile) -> Result<Self, ConfigError> {
        let mut builder =
            Config::builder().add_source(Config::try_from(&Self::with_profile(profile))?);
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Command line flags win over every other layer
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(device) = &args.device {
            self.camera.device = device.clone();
        }
        if let Some(model) = &args.face_model {
            self.dms.face_model_path = Some(model.clone());
        }
        if let Some(threshold) = args.threshold {
            self.dms.set_ear_threshold(threshold);
        }
        if let Some(frames) = args.consec_frames {
            self.dms.consec_frames = frames;
        }
        if args.no_beep {
            self.alarm.enabled = false;
        }
        if args.no_log {
            self.log.enabled = false;
        }
        if let Some(dir) = &args.log_dir {
            self.log.directory = dir.clone();
        }
        if let Some(dir) = &args.annotate_dir {
            self.annotate.directory = Some(dir.clone());
        }
        if let Some(font) = &args.font {
            self.annotate.font_path = Some(font.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_defaults_without_sources() {
        let settings = Settings::load(None, Profile::Default).unwrap();
        assert_eq!(settings.dms.ear_threshold, 0.20);
        assert_eq!(settings.dms.consec_frames, 10);
        assert_eq!(settings.alarm.duration_ms, 5000);
        assert!(settings.log.enabled);
        assert_eq!(settings.camera.device, "/dev/video0");
        assert!(settings.annotate.directory.is_none());
        assert_eq!(settings.annotate.every_n_frames, 1);
    }

    #[test]
    fn test_file_overrides_preset() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[dms]\nconsec_frames = 15\n\n[alarm]\nduration_ms = 3000\n\n[camera]\ndevice = \"/dev/video2\""
        )
        .unwrap();

        let settings = Settings::load(Some(file.path()), Profile::Strict).unwrap();
        assert_eq!(settings.dms.consec_frames, 15);
        // Untouched keys keep the strict preset
        assert_eq!(settings.dms.ear_threshold, DmsConfig::strict().ear_threshold);
        assert_eq!(settings.alarm.duration_ms, 3000);
        assert_eq!(settings.camera.device, "/dev/video2");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = Settings::load(Some(Path::new("/nonexistent/drowsy.toml")), Profile::Default);
        assert!(result.is_err());
    }

    #[test]
    fn test_args_win() {
        let args = Args::parse_from([
            "drowsiness-monitor",
            "--threshold",
            "0.9",
            "--consec-frames",
            "6",
            "--no-beep",
            "--no-log",
            "--annotate-dir",
            "frames",
        ]);
        let mut settings = Settings::default();
        settings.apply_args(&args);

        // Clamped to the allowed range
        assert_eq!(settings.dms.ear_threshold, 0.35);
        assert_eq!(settings.dms.consec_frames, 6);
        assert!(!settings.alarm.enabled);
        assert!(!settings.log.enabled);
        assert_eq!(
            settings.annotate.directory,
            Some(std::path::PathBuf::from("frames"))
        );
    }
}
