//! Event Sink
//!
//! Two append-only streams: one row per camera per tick, and one row per
//! resolved blur episode. Tabular outputs carry their header exactly once.

use crate::error::{SinkError, SinkStream};
use crate::model::{BlurEpisode, TickRecord};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const TICK_HEADER: [&str; 3] = ["ts_iso", "camera_id", "is_blurry"];
pub const EPISODE_HEADER: [&str; 5] = [
    "camera_id",
    "blur_start_iso",
    "cleared_iso",
    "duration_seconds",
    "alert_was_raised",
];

/// Durable destination for tick and episode records.
///
/// Each call stands alone: a failed write is reported for that record only
/// and the caller keeps going.
pub trait EventSink {
    fn append_tick(&mut self, record: &TickRecord) -> Result<(), SinkError>;
    fn append_episode(&mut self, episode: &BlurEpisode) -> Result<(), SinkError>;
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn append_tick(&mut self, record: &TickRecord) -> Result<(), SinkError> {
        (**self).append_tick(record)
    }

    fn append_episode(&mut self, episode: &BlurEpisode) -> Result<(), SinkError> {
        (**self).append_episode(episode)
    }
}

/// CSV files, opened in append mode for every record.
#[derive(Debug, Clone)]
pub struct CsvEventSink {
    events_path: PathBuf,
    episodes_path: PathBuf,
}

impl CsvEventSink {
    pub fn new(events_path: impl Into<PathBuf>, episodes_path: impl Into<PathBuf>) -> Self {
        Self {
            events_path: events_path.into(),
            episodes_path: episodes_path.into(),
        }
    }

    pub fn events_path(&self) -> &Path {
        &self.events_path
    }

    pub fn episodes_path(&self) -> &Path {
        &self.episodes_path
    }

    /// Create both files with their headers if they do not exist yet.
    pub fn prepare(&self) -> Result<(), SinkError> {
        open_with_header(&self.events_path, SinkStream::Ticks, &TICK_HEADER)?;
        open_with_header(&self.episodes_path, SinkStream::Episodes, &EPISODE_HEADER)?;
        Ok(())
    }
}

impl EventSink for CsvEventSink {
    fn append_tick(&mut self, record: &TickRecord) -> Result<(), SinkError> {
        let mut file = open_with_header(&self.events_path, SinkStream::Ticks, &TICK_HEADER)?;
        let row = [
            record.timestamp.to_rfc3339(),
            record.camera_id.to_string(),
            flag(record.is_blurry).to_string(),
        ];
        write_row(&mut file, SinkStream::Ticks, &row)
    }

    fn append_episode(&mut self, episode: &BlurEpisode) -> Result<(), SinkError> {
        let mut file = open_with_header(&self.episodes_path, SinkStream::Episodes, &EPISODE_HEADER)?;
        let row = [
            episode.camera_id().to_string(),
            episode.started_at().to_rfc3339(),
            episode.cleared_at().to_rfc3339(),
            format!("{:.3}", episode.duration_seconds()),
            flag(episode.alert_was_raised()).to_string(),
        ];
        write_row(&mut file, SinkStream::Episodes, &row)
    }
}

fn flag(value: bool) -> u8 {
    if value {
        1
    } else {
        0
    }
}

fn open_with_header(path: &Path, stream: SinkStream, header: &[&str]) -> Result<File, SinkError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| SinkError::Open {
            stream,
            path: path.to_path_buf(),
            source,
        })?;

    let len = file
        .metadata()
        .map_err(|source| SinkError::Open {
            stream,
            path: path.to_path_buf(),
            source,
        })?
        .len();

    if len == 0 {
        write_row(&mut file, stream, header)?;
    }
    Ok(file)
}

fn write_row<T: AsRef<str>>(file: &mut File, stream: SinkStream, fields: &[T]) -> Result<(), SinkError> {
    let line = fields
        .iter()
        .map(|field| escape_field(field.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    writeln!(file, "{}", line).map_err(|source| SinkError::Write { stream, source })
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// In-memory sink, handy for embedding and tests. Can be told to fail.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub ticks: Vec<TickRecord>,
    pub episodes: Vec<BlurEpisode>,
    pub fail_ticks: bool,
    pub fail_episodes: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for MemorySink {
    fn append_tick(&mut self, record: &TickRecord) -> Result<(), SinkError> {
        if self.fail_ticks {
            return Err(SinkError::Rejected {
                stream: SinkStream::Ticks,
                reason: "sink configured to fail".to_string(),
            });
        }
        self.ticks.push(record.clone());
        Ok(())
    }

    fn append_episode(&mut self, episode: &BlurEpisode) -> Result<(), SinkError> {
        if self.fail_episodes {
            return Err(SinkError::Rejected {
                stream: SinkStream::Episodes,
                reason: "sink configured to fail".to_string(),
            });
        }
        self.episodes.push(episode.clone());
        Ok(())
    }
}
