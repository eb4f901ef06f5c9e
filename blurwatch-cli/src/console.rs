//! Terminal notifier
//!
//! Prints alert, aggregate and resolution lines for the operator, either as
//! human-readable text or as one JSON object per line.

use crate::cli::OutputFormat;
use blurwatch_core::{AggregateAlert, BlurEpisode, CameraAlert, FleetSnapshot, Notifier};
use chrono::{DateTime, Local, Utc};
use serde_json::json;
use std::io::{self, Stdout, Write};
use tracing::warn;

pub struct ConsoleNotifier<W = Stdout> {
    out: W,
    format: OutputFormat,
}

impl ConsoleNotifier<Stdout> {
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(io::stdout(), format)
    }
}

impl<W: Write> ConsoleNotifier<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format }
    }

    #[cfg(test)]
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Print the `status` operator view.
    pub fn print_status(&mut self, snapshot: &FleetSnapshot) {
        let line = match self.format {
            OutputFormat::Json => json!({
                "event": "status",
                "site_id": snapshot.site_id,
                "aggregate_active": snapshot.aggregate_active,
                "cameras": snapshot.cameras.iter().map(|(id, state)| json!({
                    "camera_id": id,
                    "is_blurry": state.is_blurry,
                    "alert_active": state.alert_active,
                    "blur_started_at": state.blur_started_at,
                    "accumulated_blur_seconds": state.accumulated_blur_seconds,
                })).collect::<Vec<_>>(),
            })
            .to_string(),
            OutputFormat::Text => {
                let mut lines = vec![format!(
                    "Site {}: aggregate alert {}",
                    snapshot.site_id,
                    if snapshot.aggregate_active { "ACTIVE" } else { "clear" }
                )];
                for (id, state) in &snapshot.cameras {
                    let streak = match state.blur_started_at {
                        Some(since) => format!("blurry since {}", clock_label(since)),
                        None => "clean".to_string(),
                    };
                    lines.push(format!(
                        "  {} {}{}",
                        id,
                        streak,
                        if state.alert_active { " [ALERT]" } else { "" }
                    ));
                }
                lines.join("\n")
            }
        };
        self.emit(&line);
    }

    pub fn print_message(&mut self, message: &str) {
        let line = match self.format {
            OutputFormat::Json => json!({ "event": "message", "message": message }).to_string(),
            OutputFormat::Text => message.to_string(),
        };
        self.emit(&line);
    }

    fn emit(&mut self, line: &str) {
        if let Err(err) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            warn!("Failed to write notification: {}", err);
        }
    }
}

fn clock_label(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%I:%M %p").to_string()
}

impl<W: Write> Notifier for ConsoleNotifier<W> {
    fn on_alert_raised(&mut self, alert: &CameraAlert) {
        let line = match self.format {
            OutputFormat::Json => json!({ "event": "alert", "alert": alert }).to_string(),
            OutputFormat::Text => {
                let line_display = alert
                    .line_number
                    .filter(|line| *line > 0)
                    .map(|line| line.to_string())
                    .unwrap_or_else(|| "?".to_string());
                format!(
                    "[ALERT] Camera #{} (Line {}) blurry for {} min, since {}. Action: please wipe lens. ({})",
                    alert.camera_id.label(),
                    line_display,
                    alert.minutes_blurry(),
                    clock_label(alert.blur_since),
                    alert.raised_at.to_rfc3339()
                )
            }
        };
        self.emit(&line);
    }

    fn on_aggregate_alert_raised(&mut self, alert: &AggregateAlert) {
        let line = match self.format {
            OutputFormat::Json => json!({ "event": "aggregate_alert", "alert": alert }).to_string(),
            OutputFormat::Text => {
                let ids = alert
                    .camera_ids
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut text = format!(
                    "[ALERT][AGG] Site {}: {} cameras blurry ({}). Action: please wipe lenses. ({})",
                    alert.site_id,
                    alert.camera_ids.len(),
                    ids,
                    alert.raised_at.to_rfc3339()
                );
                if alert.washdown_hint {
                    text.push_str(" (Likely washdown window.)");
                }
                text
            }
        };
        self.emit(&line);
    }

    fn on_alert_cleared(&mut self, episode: &BlurEpisode) {
        let line = match self.format {
            OutputFormat::Json => json!({ "event": "resolved", "episode": episode }).to_string(),
            OutputFormat::Text => format!(
                "[RESOLVED] Camera {}: blur cleared after {} min. ({})",
                episode.camera_id(),
                (episode.duration_seconds() / 60.0).floor() as i64,
                episode.cleared_at().to_rfc3339()
            ),
        };
        self.emit(&line);
    }

    fn on_aggregate_cleared(&mut self, site_id: &str, at: DateTime<Utc>) {
        let line = match self.format {
            OutputFormat::Json => {
                json!({ "event": "aggregate_resolved", "site_id": site_id, "at": at }).to_string()
            }
            OutputFormat::Text => format!("[RESOLVED][AGG] Site {}. ({})", site_id, at.to_rfc3339()),
        };
        self.emit(&line);
    }
}
