//! Synthetic traffic feed for exercising the engine end to end.
//!
//! Spawns the tick loop, subscribes a logger to the event stream and feeds
//! randomized multi-source reports for a small fleet until ctrl-c. Two of
//! the aircraft fly a converging track so collision notifications show up
//! within the first few ticks.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skywatch_core::{geo, ReportSource, VerificationReport};
use skywatch_engine::boundary::NoSectors;
use skywatch_engine::loops::tick_loop::run_tick_loop;
use skywatch_engine::{
    Engine, EngineConfig, EngineEvent, MemoryStorage, SqliteStorage, Storage,
};

const FLEET_SIZE: usize = 8;
// Share of aircraft visible to a second and third source. Demo values for
// exercising the verification ladder, not a separation standard.
const RADAR_COVERAGE: f64 = 0.7;
const GPS_COVERAGE: f64 = 0.5;

struct SimAircraft {
    id: String,
    callsign: String,
    lat: f64,
    lon: f64,
    altitude_ft: f64,
    heading_deg: f64,
    speed_kt: f64,
    on_radar: bool,
    on_gps: bool,
}

impl SimAircraft {
    fn advance(&mut self, secs: f64, rng: &mut StdRng) {
        self.heading_deg =
            (self.heading_deg + rng.random_range(-2.0..2.0)).rem_euclid(360.0);
        let distance_nm = self.speed_kt * secs / 3600.0;
        let (lat, lon) = geo::offset_by_bearing(
            self.lat,
            self.lon,
            distance_nm,
            self.heading_deg.to_radians(),
        );
        self.lat = lat;
        self.lon = lon;
    }

    fn report(&self, source: ReportSource) -> VerificationReport {
        VerificationReport {
            aircraft_id: self.id.clone(),
            callsign: Some(self.callsign.clone()),
            source,
            lat: self.lat,
            lon: self.lon,
            altitude_ft: self.altitude_ft,
            heading_deg: self.heading_deg,
            speed_kt: self.speed_kt,
            origin: None,
            destination: None,
            needs_assistance: None,
            timestamp: Utc::now(),
        }
    }
}

fn spawn_fleet(rng: &mut StdRng) -> Vec<SimAircraft> {
    let mut fleet = Vec::with_capacity(FLEET_SIZE);
    for i in 0..FLEET_SIZE {
        fleet.push(SimAircraft {
            id: format!("SIM{:03}", i + 1),
            callsign: format!("SWX{}", 100 + i),
            lat: 39.10 + rng.random_range(-0.8..0.8),
            lon: -94.60 + rng.random_range(-0.8..0.8),
            altitude_ft: rng.random_range(28_000.0..37_000.0),
            heading_deg: rng.random_range(0.0..360.0),
            speed_kt: rng.random_range(380.0..470.0),
            on_radar: rng.random_bool(RADAR_COVERAGE),
            on_gps: rng.random_bool(GPS_COVERAGE),
        });
    }

    // Put the first two on a converging track at the same level.
    if fleet.len() >= 2 {
        fleet[0].lat = 39.10;
        fleet[0].lon = -94.45;
        fleet[0].heading_deg = 270.0;
        fleet[0].altitude_ft = 35_000.0;
        fleet[1].lat = 39.10;
        fleet[1].lon = -94.75;
        fleet[1].heading_deg = 90.0;
        fleet[1].altitude_ft = 35_200.0;
    }
    fleet
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("skywatch_engine=info".parse()?)
                .add_directive("simulate_traffic=info".parse()?),
        )
        .init();

    let config = EngineConfig::from_env();
    let storage: Arc<dyn Storage> = match &config.db_path {
        Some(path) => Arc::new(SqliteStorage::connect(path, 4).await?),
        None => Arc::new(MemoryStorage::new()),
    };
    let engine = Engine::new(config, storage, Arc::new(NoSectors)).await?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let loop_handle = tokio::spawn(run_tick_loop(engine.clone(), shutdown_tx.subscribe()));

    let mut events = engine.subscribe();
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            match event {
                EngineEvent::NotificationCreated { notification } => tracing::warn!(
                    kind = ?notification.kind,
                    priority = ?notification.priority,
                    aircraft = ?notification.aircraft,
                    "notification created"
                ),
                EngineEvent::NotificationResolved { notification } => {
                    tracing::info!(id = %notification.id, "notification resolved")
                }
                EngineEvent::Resync { missed } => {
                    tracing::warn!(missed, "event stream resynchronized")
                }
                EngineEvent::AircraftRemoved { id } => {
                    tracing::info!(aircraft = %id, "aircraft dropped from tracking")
                }
                EngineEvent::AircraftUpdated { .. } => {}
            }
        }
    });

    let mut rng = StdRng::from_os_rng();
    let mut fleet = spawn_fleet(&mut rng);
    tracing::info!(fleet = fleet.len(), "feeding synthetic traffic, ctrl-c to stop");

    let feed_engine = engine.clone();
    let feed = async move {
        loop {
            for aircraft in &mut fleet {
                aircraft.advance(1.0, &mut rng);
                let mut reports = vec![aircraft.report(ReportSource::AdsB)];
                if aircraft.on_radar {
                    reports.push(aircraft.report(ReportSource::Radar));
                }
                if aircraft.on_gps {
                    reports.push(aircraft.report(ReportSource::Gps));
                }
                for report in reports {
                    if let Err(err) = feed_engine.apply_report(report) {
                        tracing::warn!(error = %err, "report rejected");
                    }
                }
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    };

    tokio::select! {
        _ = feed => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }

    let _ = shutdown_tx.send(());
    let _ = loop_handle.await;
    Ok(())
}
