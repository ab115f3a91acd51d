//! SQLite persistence for raw scans, downtime events, and daily summaries.
//!
//! The schema keeps enough fields that per-shift totals can be rebuilt from
//! history alone. Raw scans are insert-ignore on `(tracking_id, timestamp)`,
//! so re-storing an overlapping poll window is harmless.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::info;

use veyor_model::{
    DowntimeEvent, LocationId, LocationSummary, ScanRecord, TrackingId,
};

#[derive(Debug, Clone)]
pub struct ScanStore {
    pool: SqlitePool,
}

impl ScanStore {
    /// Open (creating if needed) the database file and apply the schema.
    pub async fn open(path: &Path) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        let store = ScanStore { pool };
        store.init_schema().await?;
        info!(path = %path.display(), "scan store ready");
        Ok(store)
    }

    /// In-memory database, used by tests and `veyor-agent check`.
    pub async fn open_in_memory() -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = ScanStore { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS raw_scans (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tracking_id TEXT NOT NULL,
                location TEXT NOT NULL,
                status TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                raw_timestamp TEXT,
                scraped_at TEXT NOT NULL,
                UNIQUE(tracking_id, timestamp)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS downtime_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                location TEXT NOT NULL,
                duration_seconds INTEGER NOT NULL,
                category TEXT NOT NULL,
                start_timestamp TEXT NOT NULL,
                end_timestamp TEXT NOT NULL,
                start_tracking_id TEXT NOT NULL,
                end_tracking_id TEXT NOT NULL,
                start_status TEXT NOT NULL,
                end_status TEXT NOT NULL,
                detected_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS daily_summaries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                location TEXT NOT NULL,
                total_downtime_seconds INTEGER NOT NULL,
                event_count INTEGER NOT NULL,
                category_counts TEXT NOT NULL,
                average_downtime_seconds INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(date, location)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_raw_scans_location_timestamp \
             ON raw_scans(location, timestamp)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_downtime_events_location \
             ON downtime_events(location)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_downtime_events_detected_at \
             ON downtime_events(detected_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persist raw scans, ignoring rows already stored. Returns the number
    /// of newly inserted rows.
    pub async fn insert_scans(
        &self,
        scans: &[ScanRecord],
    ) -> Result<u64, sqlx::Error> {
        let mut inserted = 0;
        for scan in scans {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO raw_scans
                    (tracking_id, location, status, timestamp, raw_timestamp, scraped_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(scan.tracking_id.as_str())
            .bind(scan.location.as_str())
            .bind(&scan.status)
            .bind(scan.timestamp)
            .bind(&scan.raw_timestamp)
            .bind(scan.scraped_at)
            .execute(&self.pool)
            .await?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    pub async fn insert_events(
        &self,
        events: &[DowntimeEvent],
    ) -> Result<(), sqlx::Error> {
        for event in events {
            sqlx::query(
                r#"
                INSERT INTO downtime_events
                    (location, duration_seconds, category, start_timestamp,
                     end_timestamp, start_tracking_id, end_tracking_id,
                     start_status, end_status, detected_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(event.location.as_str())
            .bind(event.duration_seconds)
            .bind(&event.category)
            .bind(event.start_timestamp)
            .bind(event.end_timestamp)
            .bind(event.start_tracking_id.as_str())
            .bind(event.end_tracking_id.as_str())
            .bind(&event.start_status)
            .bind(&event.end_status)
            .bind(event.detected_at)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    /// Upsert the per-location rollup for a shift date.
    pub async fn upsert_daily_summaries(
        &self,
        date: NaiveDate,
        summaries: &BTreeMap<LocationId, LocationSummary>,
    ) -> Result<(), sqlx::Error> {
        let date_text = date.format("%Y-%m-%d").to_string();
        let created_at = Utc::now();
        for (location, summary) in summaries {
            let category_counts = serde_json::to_string(&summary.category_counts)
                .unwrap_or_else(|_| "{}".to_string());
            sqlx::query(
                r#"
                INSERT INTO daily_summaries
                    (date, location, total_downtime_seconds, event_count,
                     category_counts, average_downtime_seconds, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(date, location) DO UPDATE SET
                    total_downtime_seconds = excluded.total_downtime_seconds,
                    event_count = excluded.event_count,
                    category_counts = excluded.category_counts,
                    average_downtime_seconds = excluded.average_downtime_seconds,
                    created_at = excluded.created_at
                "#,
            )
            .bind(&date_text)
            .bind(location.as_str())
            .bind(summary.total_downtime_seconds)
            .bind(summary.event_count as i64)
            .bind(category_counts)
            .bind(summary.average_downtime_seconds)
            .bind(created_at)
            .execute(&self.pool)
            .await?;
        }
        info!(date = %date_text, locations = summaries.len(), "daily summary stored");
        Ok(())
    }

    /// Raw scans at or after `since`, newest first, optionally restricted to
    /// one location.
    pub async fn recent_scans(
        &self,
        location: Option<&LocationId>,
        since: DateTime<Utc>,
    ) -> Result<Vec<ScanRecord>, sqlx::Error> {
        let rows = match location {
            Some(location) => {
                sqlx::query(
                    "SELECT tracking_id, location, status, timestamp, \
                     raw_timestamp, scraped_at FROM raw_scans \
                     WHERE timestamp >= ? AND location = ? \
                     ORDER BY timestamp DESC",
                )
                .bind(since)
                .bind(location.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT tracking_id, location, status, timestamp, \
                     raw_timestamp, scraped_at FROM raw_scans \
                     WHERE timestamp >= ? ORDER BY timestamp DESC",
                )
                .bind(since)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter()
            .map(|row| {
                Ok(ScanRecord {
                    tracking_id: TrackingId::new(
                        row.try_get::<String, _>("tracking_id")?,
                    ),
                    location: LocationId::new(
                        row.try_get::<String, _>("location")?,
                    ),
                    status: row.try_get("status")?,
                    timestamp: row.try_get("timestamp")?,
                    raw_timestamp: row
                        .try_get::<Option<String>, _>("raw_timestamp")?
                        .unwrap_or_default(),
                    scraped_at: row.try_get("scraped_at")?,
                })
            })
            .collect()
    }

    /// Count of stored downtime events, mostly for self-tests.
    pub async fn event_count(&self) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM downtime_events")
            .fetch_one(&self.pool)
            .await?;
        row.try_get("n")
    }
}
