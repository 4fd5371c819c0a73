//! Sqlite storage backend.

use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::info;

use skywatch_core::{
    AircraftState, Notification, NotificationKind, NotificationPriority, NotificationStatus,
    ReportSource, VerificationStatus,
};

use super::{Storage, StorageError};

#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (creating if necessary) the database at `db_path` and run
    /// migrations.
    pub async fn connect(db_path: &str, max_connections: u32) -> Result<Self, StorageError> {
        if let Some(parent) = Path::new(db_path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path);
        info!("Connecting to database: {}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&db_url)
            .await?;

        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn run_migrations(pool: &SqlitePool) -> Result<(), StorageError> {
    let migration_sql = include_str!("../../migrations/001_init.sql");

    info!("Running database migrations...");
    for statement in migration_sql.split(';') {
        let statement: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }

        if let Err(e) = sqlx::query(statement).execute(pool).await {
            // "already exists" is expected on re-runs
            if e.to_string().contains("already exists") {
                continue;
            }
            return Err(e.into());
        }
    }
    info!("Database migrations complete");
    Ok(())
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn save_aircraft(&self, state: &AircraftState) -> Result<(), StorageError> {
        let sources = serde_json::to_string(&state.sources)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;
        sqlx::query(
            r#"
            INSERT INTO aircraft (id, callsign, lat, lon, altitude_ft, heading_deg, speed_kt, origin, destination, verification, sources, needs_assistance, sector_id, last_seen)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ON CONFLICT(id) DO UPDATE SET
                callsign = ?2, lat = ?3, lon = ?4, altitude_ft = ?5,
                heading_deg = ?6, speed_kt = ?7,
                origin = COALESCE(?8, origin), destination = COALESCE(?9, destination),
                verification = ?10, sources = ?11,
                needs_assistance = ?12, sector_id = ?13, last_seen = ?14
            "#,
        )
        .bind(&state.id)
        .bind(&state.callsign)
        .bind(state.lat)
        .bind(state.lon)
        .bind(state.altitude_ft)
        .bind(state.heading_deg)
        .bind(state.speed_kt)
        .bind(&state.origin)
        .bind(&state.destination)
        .bind(format!("{:?}", state.verification))
        .bind(sources)
        .bind(state.needs_assistance)
        .bind(&state.sector_id)
        .bind(state.last_seen.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_all_aircraft(&self) -> Result<Vec<AircraftState>, StorageError> {
        let rows = sqlx::query_as::<_, AircraftRow>(
            "SELECT id, callsign, lat, lon, altitude_ft, heading_deg, speed_kt, origin, destination, verification, sources, needs_assistance, sector_id, last_seen FROM aircraft",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(AircraftState::try_from).collect()
    }

    async fn delete_aircraft(&self, id: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM aircraft WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn save_notification(&self, notification: &Notification) -> Result<(), StorageError> {
        let aircraft = serde_json::to_string(&notification.aircraft)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;
        sqlx::query(
            r#"
            INSERT INTO notifications (id, kind, priority, status, aircraft, sector_id, message, created_at, resolved_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                status = ?4, resolved_at = ?9
            "#,
        )
        .bind(&notification.id)
        .bind(format!("{:?}", notification.kind))
        .bind(format!("{:?}", notification.priority))
        .bind(format!("{:?}", notification.status))
        .bind(aircraft)
        .bind(&notification.sector_id)
        .bind(&notification.message)
        .bind(notification.created_at.to_rfc3339())
        .bind(notification.resolved_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_notification(&self, id: &str) -> Result<Option<Notification>, StorageError> {
        let row = sqlx::query_as::<_, NotificationRow>(
            "SELECT id, kind, priority, status, aircraft, sector_id, message, created_at, resolved_at FROM notifications WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Notification::try_from).transpose()
    }

    async fn list_pending_notifications(&self) -> Result<Vec<Notification>, StorageError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            "SELECT id, kind, priority, status, aircraft, sector_id, message, created_at, resolved_at FROM notifications WHERE status = 'Pending' ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn list_notifications_by_sector(
        &self,
        sector: &str,
    ) -> Result<Vec<Notification>, StorageError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            "SELECT id, kind, priority, status, aircraft, sector_id, message, created_at, resolved_at FROM notifications WHERE sector_id = ?1 ORDER BY created_at",
        )
        .bind(sector)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Notification::try_from).collect()
    }
}

// Internal row types for SQLx

#[derive(sqlx::FromRow)]
struct AircraftRow {
    id: String,
    callsign: String,
    lat: f64,
    lon: f64,
    altitude_ft: f64,
    heading_deg: f64,
    speed_kt: f64,
    origin: Option<String>,
    destination: Option<String>,
    verification: String,
    sources: String,
    needs_assistance: bool,
    sector_id: Option<String>,
    last_seen: String,
}

impl TryFrom<AircraftRow> for AircraftState {
    type Error = StorageError;

    fn try_from(row: AircraftRow) -> Result<Self, StorageError> {
        let verification = match row.verification.as_str() {
            "Unverified" => VerificationStatus::Unverified,
            "PartiallyVerified" => VerificationStatus::PartiallyVerified,
            "Verified" => VerificationStatus::Verified,
            other => {
                return Err(StorageError::Corrupt(format!(
                    "unknown verification status {other:?}"
                )))
            }
        };
        let sources: BTreeSet<ReportSource> = serde_json::from_str(&row.sources)
            .map_err(|e| StorageError::Corrupt(format!("bad source set: {e}")))?;

        Ok(AircraftState {
            id: row.id,
            callsign: row.callsign,
            lat: row.lat,
            lon: row.lon,
            altitude_ft: row.altitude_ft,
            heading_deg: row.heading_deg,
            speed_kt: row.speed_kt,
            origin: row.origin,
            destination: row.destination,
            verification,
            sources,
            needs_assistance: row.needs_assistance,
            sector_id: row.sector_id,
            last_seen: parse_timestamp(&row.last_seen)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: String,
    kind: String,
    priority: String,
    status: String,
    aircraft: String,
    sector_id: Option<String>,
    message: String,
    created_at: String,
    resolved_at: Option<String>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = StorageError;

    fn try_from(row: NotificationRow) -> Result<Self, StorageError> {
        let kind = match row.kind.as_str() {
            "Collision" => NotificationKind::Collision,
            "Handoff" => NotificationKind::Handoff,
            "Airspace" => NotificationKind::Airspace,
            "Assistance" => NotificationKind::Assistance,
            "System" => NotificationKind::System,
            other => {
                return Err(StorageError::Corrupt(format!(
                    "unknown notification kind {other:?}"
                )))
            }
        };
        let priority = match row.priority.as_str() {
            "High" => NotificationPriority::High,
            "Normal" => NotificationPriority::Normal,
            "Low" => NotificationPriority::Low,
            other => {
                return Err(StorageError::Corrupt(format!(
                    "unknown notification priority {other:?}"
                )))
            }
        };
        let status = match row.status.as_str() {
            "Pending" => NotificationStatus::Pending,
            "Resolved" => NotificationStatus::Resolved,
            other => {
                return Err(StorageError::Corrupt(format!(
                    "unknown notification status {other:?}"
                )))
            }
        };
        let aircraft: Vec<String> = serde_json::from_str(&row.aircraft)
            .map_err(|e| StorageError::Corrupt(format!("bad aircraft list: {e}")))?;

        Ok(Notification {
            id: row.id,
            kind,
            priority,
            status,
            aircraft,
            sector_id: row.sector_id,
            message: row.message,
            created_at: parse_timestamp(&row.created_at)?,
            resolved_at: row
                .resolved_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt(format!("bad timestamp {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use skywatch_core::VerificationReport;

    fn sample_aircraft() -> AircraftState {
        let report = VerificationReport {
            aircraft_id: "N100".into(),
            callsign: Some("SWA101".into()),
            source: ReportSource::AdsB,
            lat: 39.10,
            lon: -94.60,
            altitude_ft: 35_000.0,
            heading_deg: 270.0,
            speed_kt: 440.0,
            origin: Some("MCI".into()),
            destination: Some("DEN".into()),
            needs_assistance: None,
            timestamp: Utc::now(),
        };
        let mut state = AircraftState::from_report(&report);
        state.sources.insert(ReportSource::AdsB);
        state.sources.insert(ReportSource::Radar);
        state.verification = VerificationStatus::Verified;
        state.sector_id = Some("ZKC".into());
        state
    }

    #[tokio::test]
    async fn aircraft_round_trips_through_sqlite() {
        let storage = SqliteStorage::connect(":memory:", 1).await.unwrap();
        let state = sample_aircraft();
        storage.save_aircraft(&state).await.unwrap();

        let loaded = storage.load_all_aircraft().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "N100");
        assert_eq!(loaded[0].verification, VerificationStatus::Verified);
        assert_eq!(loaded[0].sources, state.sources);
        assert_eq!(loaded[0].sector_id.as_deref(), Some("ZKC"));

        storage.delete_aircraft("N100").await.unwrap();
        assert!(storage.load_all_aircraft().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn notification_queries_filter_by_status_and_sector() {
        let storage = SqliteStorage::connect(":memory:", 1).await.unwrap();
        let now = Utc::now();
        let pending = Notification {
            id: "n1".into(),
            kind: NotificationKind::Collision,
            priority: NotificationPriority::High,
            status: NotificationStatus::Pending,
            aircraft: vec!["N100".into(), "N200".into()],
            sector_id: Some("ZKC".into()),
            message: "loss of separation".into(),
            created_at: now,
            resolved_at: None,
        };
        let mut resolved = pending.clone();
        resolved.id = "n2".into();
        resolved.status = NotificationStatus::Resolved;
        resolved.resolved_at = Some(now);
        resolved.sector_id = Some("ZDV".into());

        storage.save_notification(&pending).await.unwrap();
        storage.save_notification(&resolved).await.unwrap();

        let listed = storage.list_pending_notifications().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "n1");

        let by_sector = storage.list_notifications_by_sector("ZDV").await.unwrap();
        assert_eq!(by_sector.len(), 1);
        assert_eq!(by_sector[0].id, "n2");

        let loaded = storage.load_notification("n2").await.unwrap().unwrap();
        assert_eq!(loaded.status, NotificationStatus::Resolved);
        assert!(loaded.resolved_at.is_some());
    }
}
