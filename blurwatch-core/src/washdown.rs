//! Washdown Filter
//!
//! Scheduled cleaning makes lenses look blurry on purpose. During a washdown
//! window new alerts are not raised; sampling, accumulation and logging carry on.

use crate::error::ConfigError;
use chrono::{DateTime, Local, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// A time-of-day interval, inclusive at both ends. `start > end` wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WashdownWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl WashdownWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, ConfigError> {
        if start == end {
            return Err(ConfigError::Washdown {
                input: format!("{}-{}", start.format("%H:%M"), end.format("%H:%M")),
                reason: "start and end are equal, window is empty".to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn wraps_midnight(&self) -> bool {
        self.start > self.end
    }

    /// Whether `time` falls inside the window, using offsets modulo one day
    /// so that windows crossing midnight need no special casing.
    pub fn contains(&self, time: NaiveTime) -> bool {
        let start = self.start.num_seconds_from_midnight() as i64;
        let end = self.end.num_seconds_from_midnight() as i64;
        let now = time.num_seconds_from_midnight() as i64;

        let span = (end - start).rem_euclid(SECONDS_PER_DAY);
        let offset = (now - start).rem_euclid(SECONDS_PER_DAY);
        offset <= span
    }
}

impl FromStr for WashdownWindow {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ConfigError::Washdown {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let (start, end) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| invalid("expected HH:MM-HH:MM"))?;
        let start = NaiveTime::parse_from_str(start.trim(), "%H:%M")
            .map_err(|_| invalid("start is not a HH:MM time"))?;
        let end = NaiveTime::parse_from_str(end.trim(), "%H:%M")
            .map_err(|_| invalid("end is not a HH:MM time"))?;

        WashdownWindow::new(start, end)
    }
}

impl TryFrom<String> for WashdownWindow {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WashdownWindow> for String {
    fn from(window: WashdownWindow) -> Self {
        window.to_string()
    }
}

impl fmt::Display for WashdownWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

/// The configured set of washdown windows. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WashdownSchedule {
    windows: Vec<WashdownWindow>,
}

impl WashdownSchedule {
    pub fn new(windows: Vec<WashdownWindow>) -> Self {
        Self { windows }
    }

    pub fn windows(&self) -> &[WashdownWindow] {
        &self.windows
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn is_active(&self, time: NaiveTime) -> bool {
        self.windows.iter().any(|window| window.contains(time))
    }
}

/// Parses a comma separated list such as `06:00-06:30,23:00-01:00`.
impl FromStr for WashdownSchedule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let windows = s
            .split(',')
            .map(str::trim)
            .filter(|chunk| !chunk.is_empty())
            .map(WashdownWindow::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { windows })
    }
}

/// Which wall clock the schedule is written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WashdownClock {
    #[default]
    Local,
    Utc,
}

impl WashdownClock {
    pub fn time_of_day(&self, at: DateTime<Utc>) -> NaiveTime {
        match self {
            WashdownClock::Local => at.with_timezone(&Local).time(),
            WashdownClock::Utc => at.time(),
        }
    }
}

/// Gate consulted before raising a new individual alert.
#[derive(Debug, Clone, Default)]
pub struct WashdownFilter {
    schedule: WashdownSchedule,
    clock: WashdownClock,
}

impl WashdownFilter {
    pub fn new(schedule: WashdownSchedule, clock: WashdownClock) -> Self {
        Self { schedule, clock }
    }

    pub fn schedule(&self) -> &WashdownSchedule {
        &self.schedule
    }

    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        !self.schedule.is_empty() && self.schedule.is_active(self.clock.time_of_day(at))
    }
}
