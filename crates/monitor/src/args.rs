//! Command line arguments

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Threshold preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Profile {
    Default,
    Strict,
    Lenient,
}

/// Webcam drowsiness monitor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Settings file (TOML); environment variables DROWSY__<SECTION>__<KEY> override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Threshold preset applied before the settings file
    #[arg(long, value_enum, default_value = "default")]
    pub profile: Profile,

    /// Camera device (e.g. /dev/video0)
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// SeetaFace face model file
    #[arg(long, value_name = "FILE")]
    pub face_model: Option<String>,

    /// Replay recorded detections (JSON lines) instead of the camera
    #[arg(long, value_name = "FILE", conflicts_with = "device")]
    pub replay: Option<PathBuf>,

    /// Record detections to a JSON-lines file for later replay
    #[arg(long, value_name = "FILE")]
    pub record: Option<PathBuf>,

    /// EAR threshold (0.15 - 0.35)
    #[arg(long, value_name = "THRESHOLD")]
    pub threshold: Option<f32>,

    /// Consecutive closed frames before drowsiness
    #[arg(long, value_name = "COUNT")]
    pub consec_frames: Option<u32>,

    /// Start with the alarm sound off
    #[arg(long)]
    pub no_beep: bool,

    /// Do not write the CSV session log
    #[arg(long)]
    pub no_log: bool,

    /// Directory for the CSV session log
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Save annotated camera frames (PNG) to this directory
    #[arg(long, value_name = "DIR")]
    pub annotate_dir: Option<PathBuf>,

    /// TrueType font for the text on annotated frames
    #[arg(long, value_name = "FILE")]
    pub font: Option<PathBuf>,

    /// Stop after this many frames (0 = unlimited)
    #[arg(long, default_value = "0", value_name = "COUNT")]
    pub max_frames: u64,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", value_name = "LEVEL")]
    pub log_level: String,
}
