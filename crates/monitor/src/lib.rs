//! Drowsiness Monitor
//!
//! Wires capture, detection, the DMS pipeline, the alarm and the session log
//! into one frame loop driven from the command line.

pub mod args;
pub mod commands;
pub mod overlay;
pub mod pipeline;
pub mod session;
pub mod settings;

use anyhow::{Context, Result};
use chrono::Local;
use std::fs::File;
use std::io::{BufWriter, IsTerminal};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use alerting::{AlarmSink, LogSink, TerminalBell};
use camera_capture::open_camera;
use dms::replay::ReplayWriter;
use dms::{CascadeDetector, DmsError, ReplaySource};
use storage::SessionLog;

use args::Args;
use overlay::AnnotationWriter;
use pipeline::{CameraObservations, Captured};
use session::Session;
use settings::Settings;

/// Initialize logging; logs go to stderr so stdout stays for reports
pub fn init_logging(level: &str) -> Result<()> {
    let level: Level = level
        .parse()
        .with_context(|| format!("Invalid log level {:?}", level))?;
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Run a monitoring session
pub fn run(args: Args) -> Result<()> {
    let mut settings =
        Settings::load(args.config.as_deref(), args.profile).context("Failed to load settings")?;
    settings.apply_args(&args);

    let observations: Box<dyn Iterator<Item = Result<Captured, DmsError>>> = match &args.replay {
        Some(path) => {
            let source = ReplaySource::open(path)
                .with_context(|| format!("Cannot open replay {}", path.display()))?;
            if settings.annotate.directory.is_some() {
                info!("Replay has no frames to annotate");
            }
            Box::new(source.map(|item| item.map(Captured::from)))
        }
        None => {
            let detector =
                CascadeDetector::new(&settings.dms).context("Face detector unavailable")?;
            let camera = open_camera(&settings.camera).context("Could not open camera")?;
            Box::new(CameraObservations::new(camera, Box::new(detector)))
        }
    };

    let beep_interval = std::time::Duration::from_millis(settings.alarm.beep_interval_ms);
    let sink: Box<dyn AlarmSink> = if std::io::stderr().is_terminal() {
        Box::new(TerminalBell::stderr(beep_interval))
    } else {
        Box::new(LogSink)
    };

    let mut session = Session::new(&settings, sink)?.with_max_frames(args.max_frames);
    if settings.log.enabled {
        std::fs::create_dir_all(&settings.log.directory)
            .with_context(|| format!("Cannot create {}", settings.log.directory.display()))?;
        let log = SessionLog::create(&settings.log.directory, Local::now())
            .context("Failed to create session log")?;
        session = session.with_log(log);
    }
    if let Some(annotator) =
        AnnotationWriter::create(&settings.annotate).context("Failed to set up frame annotation")?
    {
        session = session.with_annotator(annotator);
    }
    if let Some(path) = &args.record {
        let file = File::create(path)
            .with_context(|| format!("Cannot create recording {}", path.display()))?;
        info!("Recording detections to {}", path.display());
        session = session.with_recorder(ReplayWriter::new(BufWriter::new(file)));
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("Failed to start runtime")?;
    let mut commands = commands::spawn_listeners(runtime.handle());

    info!("Controls: q quit | r reset | s sound on/off | +/- threshold | c info (then Enter)");
    session.run(observations, &mut commands);
    println!("{}", session.summary());

    // stdin reader may still be blocked on a read
    runtime.shutdown_background();
    Ok(())
}
