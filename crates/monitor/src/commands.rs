//! Runtime keyboard commands
//!
//! Commands arrive on stdin (one or more keys per line) and from Ctrl-C.
//! Both listeners run on the tokio runtime and feed a channel the frame loop
//! drains once per frame.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Commands the frame loop understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `q`: end the session
    Quit,
    /// `r`: clear counters and silence the alarm
    Reset,
    /// `s`: toggle the alarm sound
    ToggleSound,
    /// `+`: raise the EAR threshold one step
    ThresholdUp,
    /// `-`: lower the EAR threshold one step
    ThresholdDown,
    /// `c`: print calibration and state info
    Info,
}

impl Command {
    pub fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            'q' => Some(Command::Quit),
            'r' => Some(Command::Reset),
            's' => Some(Command::ToggleSound),
            '+' | '=' => Some(Command::ThresholdUp),
            '-' | '_' => Some(Command::ThresholdDown),
            'c' => Some(Command::Info),
            _ => None,
        }
    }
}

/// Every recognised key on a line, in order
pub fn parse_line(line: &str) -> Vec<Command> {
    line.chars()
        .filter(|c| !c.is_whitespace())
        .filter_map(|c| {
            let command = Command::from_key(c);
            if command.is_none() {
                debug!("Ignoring key {:?}", c);
            }
            command
        })
        .collect()
}

/// Start the stdin and Ctrl-C listeners on `handle`
pub fn spawn_listeners(handle: &Handle) -> mpsc::Receiver<Command> {
    let (tx, rx) = mpsc::channel(32);

    let signal_tx = tx.clone();
    handle.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received");
            let _ = signal_tx.send(Command::Quit).await;
        }
    });

    handle.spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            for command in parse_line(&line) {
                if tx.send(command).await.is_err() {
                    return;
                }
            }
        }
        debug!("stdin closed");
    });

    rx
}
