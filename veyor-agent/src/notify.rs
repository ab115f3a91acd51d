//! Webhook reporting: interval reports, threshold alerts, shift summaries.
//!
//! Message building is kept in pure functions so formatting is testable
//! without a network; the notifier itself only posts `{"text": ...}`
//! payloads and remembers which threshold alerts it already sent.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;
use tracing::info;
use url::Url;

use veyor_core::ThresholdAlert;
use veyor_model::{DowntimeEvent, LocationId, LocationSummary};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook delivery failed")]
    Http(#[from] reqwest::Error),
}

/// Severity marker for system-level notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemAlertKind {
    Error,
    Warning,
    Info,
    Success,
}

impl SystemAlertKind {
    fn label(self) -> &'static str {
        match self {
            SystemAlertKind::Error => "ERROR",
            SystemAlertKind::Warning => "WARNING",
            SystemAlertKind::Info => "INFO",
            SystemAlertKind::Success => "OK",
        }
    }
}

/// Posts formatted notifications to the configured webhook.
///
/// Threshold alerts are deduplicated here: the engine's derivation is
/// idempotent, so the same location keeps coming back until shift reset, and
/// the reporter must send each one exactly once per shift.
#[derive(Debug)]
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: Url,
    alerted: HashSet<LocationId>,
}

impl WebhookNotifier {
    pub fn new(url: Url) -> Self {
        WebhookNotifier {
            http: reqwest::Client::new(),
            url,
            alerted: HashSet::new(),
        }
    }

    pub async fn send(&self, text: &str) -> Result<(), NotifyError> {
        self.http
            .post(self.url.clone())
            .json(&json!({ "text": text }))
            .send()
            .await?
            .error_for_status()?;
        info!("webhook notification sent");
        Ok(())
    }

    pub async fn send_interval_report(
        &self,
        summaries: &BTreeMap<LocationId, LocationSummary>,
        at: DateTime<Utc>,
    ) -> Result<(), NotifyError> {
        self.send(&format_interval_report(summaries, at)).await
    }

    /// Send any threshold alerts not yet delivered this shift.
    pub async fn send_threshold_alerts(
        &mut self,
        alerts: &[ThresholdAlert],
    ) -> Result<(), NotifyError> {
        for alert in alerts {
            if self.alerted.contains(&alert.location) {
                continue;
            }
            self.send(&format_threshold_alert(alert)).await?;
            self.alerted.insert(alert.location.clone());
        }
        Ok(())
    }

    pub async fn send_downtime_alert(
        &self,
        event: &DowntimeEvent,
    ) -> Result<(), NotifyError> {
        self.send(&format_downtime_alert(event)).await
    }

    pub async fn send_shift_summary(
        &self,
        summaries: &BTreeMap<LocationId, LocationSummary>,
        shift_start: &str,
        shift_end: &str,
    ) -> Result<(), NotifyError> {
        self.send(&format_shift_summary(summaries, shift_start, shift_end))
            .await
    }

    pub async fn send_system_alert(
        &self,
        kind: SystemAlertKind,
        title: &str,
        details: &str,
    ) -> Result<(), NotifyError> {
        self.send(&format!("[{}] {title}\n\n{details}", kind.label()))
            .await
    }

    /// Forget which locations were alerted; called at shift reset.
    pub fn reset_alert_dedup(&mut self) {
        self.alerted.clear();
    }
}

/// Periodic report: per-location event counts with a category breakdown.
pub fn format_interval_report(
    summaries: &BTreeMap<LocationId, LocationSummary>,
    at: DateTime<Utc>,
) -> String {
    let mut lines = Vec::new();
    let mut total_events = 0;
    let mut total_downtime = 0;

    for (location, summary) in summaries {
        if summary.event_count == 0 {
            continue;
        }
        let categories: Vec<String> = summary
            .category_counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(name, count)| format!("{name}: {count}"))
            .collect();
        let category_text = if categories.is_empty() {
            String::new()
        } else {
            format!(" ({})", categories.join(", "))
        };
        lines.push(format!(
            "{location}: {} events{category_text} Total: {}s",
            summary.event_count, summary.total_downtime_seconds
        ));
        total_events += summary.event_count;
        total_downtime += summary.total_downtime_seconds;
    }

    let title =
        format!("Induct Downtime Report - {}", at.format("%H:%M UTC"));
    if lines.is_empty() {
        return format!(
            "{title}\n\nNo significant downtime events in this interval"
        );
    }
    format!(
        "{title}\n\n{}\n\nSummary: {total_events} total events, {total_downtime}s total downtime",
        lines.join("\n")
    )
}

pub fn format_threshold_alert(alert: &ThresholdAlert) -> String {
    format!(
        "Shift End Alert - {} Excessive Downtime\n\n\
         {} has exceeded {}s of downtime\n\
         Current: {}s ({} events)",
        alert.location,
        alert.location,
        alert.threshold_seconds,
        alert.total_downtime_seconds,
        alert.event_count
    )
}

pub fn format_downtime_alert(event: &DowntimeEvent) -> String {
    format!(
        "Significant Downtime - {}\n\n\
         Location: {}\n\
         Duration: {}s ({})\n\
         From: {} -> {}\n\
         Time: {} - {}",
        event.location,
        event.location,
        event.duration_seconds,
        event.category,
        event.start_status,
        event.end_status,
        event.start_timestamp.format("%H:%M:%S"),
        event.end_timestamp.format("%H:%M:%S"),
    )
}

/// End-of-shift rollup, locations sorted worst-first.
pub fn format_shift_summary(
    summaries: &BTreeMap<LocationId, LocationSummary>,
    shift_start: &str,
    shift_end: &str,
) -> String {
    let total_events: usize =
        summaries.values().map(|s| s.event_count).sum();
    let total_downtime: i64 =
        summaries.values().map(|s| s.total_downtime_seconds).sum();
    let active = summaries.values().filter(|s| s.event_count > 0).count();
    let location_count = summaries.len().max(1);

    let mut lines = vec![
        format!("Shift Summary Report ({shift_start} - {shift_end})"),
        String::new(),
        "Shift Overview:".to_string(),
        format!("  - Total downtime events: {total_events}"),
        format!(
            "  - Total downtime: {total_downtime}s ({:.1} minutes)",
            total_downtime as f64 / 60.0
        ),
        format!("  - Active locations: {active}/{}", summaries.len()),
        format!(
            "  - Average per location: {}s",
            total_downtime / location_count as i64
        ),
        String::new(),
        "Location Breakdown:".to_string(),
    ];

    let mut sorted: Vec<(&LocationId, &LocationSummary)> =
        summaries.iter().collect();
    sorted.sort_by(|a, b| {
        b.1.total_downtime_seconds.cmp(&a.1.total_downtime_seconds)
    });

    for (location, summary) in sorted {
        if summary.event_count == 0 {
            continue;
        }
        lines.push(format!(
            "  - {location}: {}s ({} events, avg: {}s)",
            summary.total_downtime_seconds,
            summary.event_count,
            summary.average_downtime_seconds
        ));
        if summary.event_count >= 3 {
            let categories: Vec<String> = summary
                .category_counts
                .iter()
                .filter(|(_, count)| **count > 0)
                .map(|(name, count)| format!("{name}: {count}"))
                .collect();
            if !categories.is_empty() {
                lines.push(format!("      {}", categories.join(", ")));
            }
        }
    }

    lines.join("\n")
}
