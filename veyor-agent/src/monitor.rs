//! Shift-gated orchestration of poll, store, analyze, and report.

use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Local, NaiveTime, Utc};
use tracing::{error, info, warn};

use veyor_config::MonitorConfig;
use veyor_core::{DowntimeEngine, locations_over_threshold};

use crate::ingest::DashboardClient;
use crate::notify::{SystemAlertKind, WebhookNotifier};
use crate::store::ScanStore;

/// Consecutive fetch failures before the monitor raises a system alert.
const MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// How often the run loop wakes to check whether work is due.
const TICK: Duration = Duration::from_secs(10);

/// Drives the whole pipeline: polls the dashboard on a cadence, feeds the
/// engine, persists output, and reports over the webhook. Owns the single
/// engine instance for the shift; nothing else mutates cursor state.
pub struct Monitor {
    config: MonitorConfig,
    engine: DowntimeEngine,
    client: DashboardClient,
    store: ScanStore,
    notifier: WebhookNotifier,
    consecutive_failures: u32,
    last_poll_at: Option<DateTime<Utc>>,
    last_report_at: Option<DateTime<Utc>>,
    shift_was_active: bool,
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("consecutive_failures", &self.consecutive_failures)
            .field("shift_was_active", &self.shift_was_active)
            .finish_non_exhaustive()
    }
}

impl Monitor {
    pub async fn new(config: MonitorConfig) -> anyhow::Result<Self> {
        let engine = DowntimeEngine::new(
            config.downtime.bands.clone(),
            config.tracked.locations.iter().cloned(),
            config.tracked.statuses.iter().cloned(),
        );
        let client = DashboardClient::new(
            &config.dashboard,
            &config.tracked,
            &config.auth,
        )
        .context("failed to build dashboard client")?;
        let store = ScanStore::open(&config.storage.database_path)
            .await
            .context("failed to open scan store")?;
        let notifier =
            WebhookNotifier::new(config.reporting.webhook_url.clone());

        Ok(Monitor {
            config,
            engine,
            client,
            store,
            notifier,
            consecutive_failures: 0,
            last_poll_at: None,
            last_report_at: None,
            shift_was_active: false,
        })
    }

    fn local_time(&self) -> NaiveTime {
        Local::now().time()
    }

    /// One scrape-and-analyze cycle. Fetch failures are transient: counted,
    /// escalated at the cap, never fatal to the monitor.
    pub async fn poll_cycle(&mut self) -> anyhow::Result<()> {
        if !self.config.shift.is_active(self.local_time()) {
            info!("shift not active, skipping poll");
            return Ok(());
        }

        let scans = match self.client.fetch_with_retry().await {
            Ok(scans) => scans,
            Err(err) if err.is_transient() => {
                self.consecutive_failures += 1;
                error!(
                    %err,
                    failures = self.consecutive_failures,
                    "dashboard fetch failed"
                );
                if self.consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                    self.notifier
                        .send_system_alert(
                            SystemAlertKind::Error,
                            "Dashboard fetch failing",
                            &format!(
                                "{} consecutive fetch failures: {err}",
                                self.consecutive_failures
                            ),
                        )
                        .await
                        .ok();
                }
                return Ok(());
            }
            Err(err) => return Err(err).context("dashboard fetch failed"),
        };
        self.consecutive_failures = 0;

        let stored = self
            .store
            .insert_scans(&scans)
            .await
            .context("failed to store raw scans")?;
        info!(fetched = scans.len(), stored, "poll cycle stored raw scans");

        let outcome = self.engine.process_batch(&scans);
        if outcome.rejected > 0 {
            warn!(rejected = outcome.rejected, "rejected out-of-order scans");
        }

        if !outcome.events.is_empty() {
            info!(count = outcome.events.len(), "new downtime events");
            self.store
                .insert_events(&outcome.events)
                .await
                .context("failed to store downtime events")?;

            // Immediate alert for gaps long enough to land in the top band.
            let alert_floor = self.engine.bands().top_band().min_seconds;
            for event in &outcome.events {
                if event.duration_seconds >= alert_floor {
                    if let Err(err) =
                        self.notifier.send_downtime_alert(event).await
                    {
                        warn!(%err, "downtime alert delivery failed");
                    }
                }
            }
        }

        let alerts = locations_over_threshold(
            &self.engine.summaries(),
            self.config.reporting.shift_end_threshold_seconds,
        );
        if let Err(err) = self.notifier.send_threshold_alerts(&alerts).await {
            warn!(%err, "threshold alert delivery failed");
        }

        self.last_poll_at = Some(Utc::now());
        Ok(())
    }

    /// Periodic downtime report; suppressed outside the shift and during the
    /// scheduled break, when break-length gaps are expected.
    pub async fn send_interval_report(&mut self) -> anyhow::Result<()> {
        let now = self.local_time();
        if !self.config.shift.is_active(now) || self.config.shift.in_break(now)
        {
            info!("skipping interval report (shift inactive or break time)");
            return Ok(());
        }

        self.notifier
            .send_interval_report(&self.engine.summaries(), Utc::now())
            .await
            .context("interval report delivery failed")?;
        self.last_report_at = Some(Utc::now());
        Ok(())
    }

    /// End-of-shift: summary out, daily rollup persisted, engine and alert
    /// dedup reset for the next shift.
    pub async fn close_shift(&mut self) -> anyhow::Result<()> {
        info!("shift ended, sending summary and resetting");
        let summaries = self.engine.summaries();

        self.notifier
            .send_shift_summary(
                &summaries,
                &self.config.shift.start.format("%H:%M").to_string(),
                &self.config.shift.end.format("%H:%M").to_string(),
            )
            .await
            .context("shift summary delivery failed")?;

        self.store
            .upsert_daily_summaries(Local::now().date_naive(), &summaries)
            .await
            .context("failed to store daily summary")?;

        self.engine.reset(None);
        self.notifier.reset_alert_dedup();
        Ok(())
    }

    /// Continuous monitoring loop. Wakes every few seconds and runs whatever
    /// is due: polls on the poll cadence, reports on the report cadence, and
    /// the shift close exactly once per active-to-inactive transition.
    pub async fn run(mut self) -> anyhow::Result<()> {
        info!("starting continuous monitoring");
        self.notifier
            .send_system_alert(
                SystemAlertKind::Info,
                "Veyor monitor started",
                &format!("Started at {}", Utc::now().format("%Y-%m-%d %H:%M:%S")),
            )
            .await
            .ok();

        let mut ticker = tokio::time::interval(TICK);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("monitoring stopped by user");
                    self.notifier
                        .send_system_alert(
                            SystemAlertKind::Info,
                            "Veyor monitor stopped",
                            "Stopped by user",
                        )
                        .await
                        .ok();
                    return Ok(());
                }
            }

            let active = self.config.shift.is_active(self.local_time());
            if self.shift_was_active && !active {
                if let Err(err) = self.close_shift().await {
                    error!(%err, "shift close failed");
                }
            }
            self.shift_was_active = active;

            if due(self.last_poll_at, self.config.dashboard.poll_interval) {
                if let Err(err) = self.poll_cycle().await {
                    error!(%err, "poll cycle failed");
                    self.consecutive_failures += 1;
                }
                // Poll attempts count even on failure, so a dead dashboard
                // does not busy-loop the monitor.
                self.last_poll_at = Some(Utc::now());
            }

            if active
                && due(
                    self.last_report_at,
                    self.config.reporting.report_interval,
                )
            {
                if let Err(err) = self.send_interval_report().await {
                    error!(%err, "interval report failed");
                }
                self.last_report_at = Some(Utc::now());
            }
        }
    }

    /// Exercise each collaborator once and report what works. Used by the
    /// `check` subcommand before leaving the agent unattended.
    pub async fn check(&mut self) -> anyhow::Result<()> {
        info!("running component checks");

        println!("Checking webhook delivery...");
        match self
            .notifier
            .send_system_alert(
                SystemAlertKind::Info,
                "Veyor connection test",
                &format!("Test at {}", Utc::now().format("%Y-%m-%d %H:%M:%S")),
            )
            .await
        {
            Ok(()) => println!("  webhook OK"),
            Err(err) => {
                println!("  webhook FAILED: {err}");
                return Err(err).context("webhook check failed");
            }
        }

        println!("Checking dashboard fetch...");
        let scans = self
            .client
            .fetch_with_retry()
            .await
            .context("dashboard check failed")?;
        println!("  dashboard OK ({} records)", scans.len());

        println!("Checking scan store...");
        let stored = self
            .store
            .insert_scans(&scans)
            .await
            .context("store check failed")?;
        println!("  store OK ({stored} new rows)");

        println!("Checking downtime analysis...");
        let outcome = self.engine.process_batch(&scans);
        println!(
            "  analysis OK ({} events, {} rejected)",
            outcome.events.len(),
            outcome.rejected
        );

        println!("All component checks passed");
        Ok(())
    }
}

/// Whether a recurring task is due given when it last ran.
fn due(last: Option<DateTime<Utc>>, every: Duration) -> bool {
    match last {
        None => true,
        Some(last) => {
            let elapsed = Utc::now().signed_duration_since(last);
            elapsed.num_seconds() >= every.as_secs() as i64
        }
    }
}
