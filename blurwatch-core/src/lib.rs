//! Blurwatch core: blur episode tracking, site-wide aggregation and washdown
//! filtering for a fleet of production-line cameras.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod model;
pub mod monitor;
pub mod notify;
pub mod sampler;
pub mod sink;
pub mod tracker;
pub mod washdown;

pub use aggregator::{AggregatePolicy, Aggregator};
pub use config::BlurwatchConfig;
pub use error::{ConfigError, SinkError, SinkStream};
pub use model::{AggregateAlert, BlurEpisode, Camera, CameraAlert, CameraId, CameraState, ClearOutcome, TickRecord};
pub use monitor::{BlurMonitor, ClearReport, FleetSnapshot, TickReport};
pub use notify::{Notification, Notifier, RecordingNotifier};
pub use sampler::{BlurSampler, ScriptedSampler};
pub use sink::{CsvEventSink, EventSink, MemorySink};
pub use tracker::{AlertPolicy, EpisodeTracker, SampleOutcome};
pub use washdown::{WashdownClock, WashdownFilter, WashdownSchedule, WashdownWindow};
