//! Recorded detections (JSON lines) replayed through the pipeline
//!
//! One object per line:
//! `{"t_ms": 100, "face": {"x": 0, "y": 0, "width": 200, "height": 200}, "eyes": [...]}`.
//! Blank lines and lines starting with `#` are skipped.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::detector::{Detections, Observation};
use crate::DmsError;

/// One recorded frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayRecord {
    /// Milliseconds since the recording started
    pub t_ms: u64,
    #[serde(flatten)]
    pub detections: Detections,
}

impl From<&Observation> for ReplayRecord {
    fn from(obs: &Observation) -> Self {
        Self {
            t_ms: obs.timestamp.as_millis() as u64,
            detections: obs.detections.clone(),
        }
    }
}

impl From<ReplayRecord> for Observation {
    fn from(record: ReplayRecord) -> Self {
        Observation {
            timestamp: Duration::from_millis(record.t_ms),
            detections: record.detections,
        }
    }
}

/// Iterator of observations read from a JSON-lines recording
pub struct ReplaySource<R> {
    lines: std::io::Lines<R>,
    line_no: usize,
    /// Set after a read error; the stream yields nothing more
    finished: bool,
}

impl ReplaySource<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DmsError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        info!("Replaying detections from {}", path.display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            finished: false,
        }
    }
}

impl<R: BufRead> Iterator for ReplaySource<R> {
    type Item = Result<Observation, DmsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(DmsError::Io(e)));
                }
            };
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            return Some(
                serde_json::from_str::<ReplayRecord>(trimmed)
                    .map(Observation::from)
                    .map_err(|e| DmsError::Replay {
                        line: self.line_no,
                        message: e.to_string(),
                    }),
            );
        }
    }
}

/// Appends observations to a JSON-lines recording
pub struct ReplayWriter<W: Write> {
    out: W,
}

impl<W: Write> ReplayWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn write(&mut self, observation: &Observation) -> Result<(), DmsError> {
        let line = serde_json::to_string(&ReplayRecord::from(observation)).map_err(|e| {
            DmsError::Replay {
                line: 0,
                message: e.to_string(),
            }
        })?;
        writeln!(self.out, "{}", line)?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::Rect;
    use std::io::Cursor;

    #[test]
    fn test_parses_lines_and_skips_comments() {
        let input = r#"
# recorded at desk
{"t_ms": 0, "face": {"x": 0, "y": 0, "width": 200, "height": 200}, "eyes": [{"x": 30, "y": 50, "width": 40, "height": 18}]}
{"t_ms": 33}

{"t_ms": 66, "face": {"x": 0, "y": 0, "width": 200, "height": 200}}
"#;
        let obs: Vec<Observation> = ReplaySource::new(Cursor::new(input))
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(obs.len(), 3);
        assert_eq!(obs[0].detections.eyes.len(), 1);
        assert_eq!(obs[1].timestamp, Duration::from_millis(33));
        assert!(!obs[1].detections.face_detected());
        assert!(obs[2].detections.face_detected());
        assert!(obs[2].detections.eyes.is_empty());
    }

    #[test]
    fn test_reports_bad_line_number() {
        let input = "{\"t_ms\": 0}\nnot json\n";
        let mut source = ReplaySource::new(Cursor::new(input));
        assert!(source.next().unwrap().is_ok());
        match source.next().unwrap() {
            Err(DmsError::Replay { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_writer_output_replays() {
        let obs = Observation {
            timestamp: Duration::from_millis(120),
            detections: Detections::face_only(Rect::new(1.0, 2.0, 150.0, 150.0)),
        };
        let mut writer = ReplayWriter::new(Vec::new());
        writer.write(&obs).unwrap();
        let bytes = writer.into_inner();

        let back: Vec<Observation> = ReplaySource::new(Cursor::new(bytes))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(back, vec![obs]);
    }

    /// Every read fails, like a file on a dying disk
    struct FailingRead;

    impl std::io::Read for FailingRead {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "EIO"))
        }
    }

    #[test]
    fn test_read_error_ends_stream() {
        let mut source = ReplaySource::new(BufReader::new(FailingRead));
        assert!(matches!(source.next(), Some(Err(DmsError::Io(_)))));
        assert!(source.next().is_none());
    }
}
