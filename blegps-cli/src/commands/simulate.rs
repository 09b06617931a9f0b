//! Two-device simulation.
//!
//! A broadcaster walks a small circle around the given point while a
//! receiver on the same simulated radio injects what it hears into a
//! location sink. Every admitted fix is printed with its age.

use std::f64::consts::TAU;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use blegps::broadcaster::{spawn_position_feed, BroadcasterEngine};
use blegps::config::BeaconConfig;
use blegps::frame::Position;
use blegps::radio::memory::{Airwaves, StaticCapabilities};
use blegps::radio::RadioPorts;
use blegps::service::{event_channel, Role, RoleController, ServiceEventKind};
use blegps::sink::ChannelSink;

use crate::error::CliError;
use crate::runner::CliRunner;

const METERS_PER_DEGREE: f64 = 111_320.0;

/// Arguments for `blegps simulate`.
#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// How long to run, in seconds
    #[arg(long, default_value = "20")]
    pub duration_secs: u64,

    /// Simulated capture-to-delivery delay, in milliseconds
    #[arg(long, default_value = "300")]
    pub delay_ms: u64,

    /// Latitude of the circle's center
    #[arg(long, default_value = "60.169418", allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude of the circle's center
    #[arg(long, default_value = "24.938379", allow_hyphen_values = true)]
    pub lon: f64,

    /// Radius of the walked circle, in meters
    #[arg(long, default_value = "50")]
    pub radius_m: f64,

    /// Interval between host location updates, in milliseconds
    #[arg(long, default_value = "1000")]
    pub update_ms: u64,
}

/// Run the simulation.
pub fn run(args: SimulateArgs, debug: bool) -> Result<(), CliError> {
    let runner = CliRunner::with_debug(debug)?;
    runner.log_startup("simulate");
    let config = runner.beacon_config();

    runner.block_on(simulate(config, args))?
}

async fn simulate(config: BeaconConfig, args: SimulateArgs) -> Result<(), CliError> {
    let airwaves = Airwaves::new();
    airwaves.set_delay(Duration::from_millis(args.delay_ms));

    let sink = ChannelSink::new(64);
    let mut fixes = sink.subscribe();

    // Receiving device.
    let mut receiver = RoleController::new(config, ports(&airwaves), Arc::new(sink));
    let mut receiver_events = receiver.subscribe();
    receiver.start_receiver().await?;

    // Broadcasting device.
    let (events_tx, _events) = event_channel();
    let broadcaster = BroadcasterEngine::new(
        config,
        Arc::new(airwaves.advertiser()),
        Arc::new(StaticCapabilities::all()),
        events_tx,
    )
    .start()?;

    let shutdown = CancellationToken::new();
    let (positions_tx, positions_rx) = mpsc::channel(16);
    let feed = spawn_position_feed(broadcaster.updater(), positions_rx, shutdown.clone());
    let walker = tokio::spawn(walk_circle(
        Walk::from_args(&args),
        positions_tx,
        shutdown.clone(),
    ));

    println!(
        "Simulating for {}s with {} ms link delay (max accepted age {} ms)",
        args.duration_secs,
        args.delay_ms,
        config.max_acceptable_delay().as_millis()
    );
    println!();

    let deadline = tokio::time::sleep(Duration::from_secs(args.duration_secs));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,

            fix = fixes.recv() => match fix {
                Ok(fix) => println!("  {}  age {} ms", fix.frame, fix.age_ms),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Fix output lagging");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },

            event = receiver_events.recv() => {
                if let Ok(event) = event {
                    if let (Role::Receiver, ServiceEventKind::Stopped(reason)) =
                        (event.role, &event.kind)
                    {
                        println!();
                        println!("Receiver stopped: {}", reason);
                        break;
                    }
                }
            }
        }
    }

    shutdown.cancel();
    let forwarded = feed.await.unwrap_or_default();
    let _ = walker.await;
    broadcaster.stop().await;

    let stats = receiver.receiver().map(|handle| handle.stats());
    receiver.stop().await;

    let broadcast_stats = broadcaster.stats();
    println!();
    println!("Summary");
    println!("=======");
    println!("  Positions fed:       {}", forwarded);
    println!("  Advertisements:      {}", broadcast_stats.advertisements);
    if let Some(stats) = stats {
        println!("  Admitted:            {}", stats.admitted);
        println!("  Stale:               {}", stats.stale);
        println!("  Malformed:           {}", stats.malformed);
        println!("  Scan restarts:       {}", stats.scan_restarts);
        if let Some(average) = stats.average_delay_ms {
            println!("  Average delay:       {:.0} ms", average);
        }
    }
    info!(forwarded, "Simulation finished");

    Ok(())
}

fn ports(airwaves: &Airwaves) -> RadioPorts {
    RadioPorts {
        advertiser: Arc::new(airwaves.advertiser()),
        scanner: Arc::new(airwaves.scanner()),
        capabilities: Arc::new(StaticCapabilities::all()),
    }
}

/// Parameters of the walked circle.
#[derive(Debug, Clone, Copy)]
struct Walk {
    center_lat: f64,
    center_lon: f64,
    radius_m: f64,
    step: Duration,
}

impl Walk {
    fn from_args(args: &SimulateArgs) -> Self {
        Self {
            center_lat: args.lat,
            center_lon: args.lon,
            radius_m: args.radius_m,
            step: Duration::from_millis(args.update_ms.max(1)),
        }
    }
}

/// One lap per minute.
const LAP: Duration = Duration::from_secs(60);

fn position_at(walk: &Walk, elapsed: Duration) -> Position {
    let theta = TAU * (elapsed.as_secs_f64() / LAP.as_secs_f64()).fract();
    let north = walk.radius_m * theta.cos();
    let east = walk.radius_m * theta.sin();
    let lon_scale = METERS_PER_DEGREE * walk.center_lat.to_radians().cos().max(1e-6);

    // Tangent to the circle, clockwise seen from above.
    let bearing = (theta.to_degrees() + 90.0).rem_euclid(360.0);
    let speed = TAU * walk.radius_m / LAP.as_secs_f64();

    Position::new(
        walk.center_lat + north / METERS_PER_DEGREE,
        walk.center_lon + east / lon_scale,
    )
    .with_accuracy(4.0)
    .with_speed(speed as f32)
    .with_bearing(bearing as f32)
}

async fn walk_circle(walk: Walk, positions: mpsc::Sender<Position>, shutdown: CancellationToken) {
    let started = tokio::time::Instant::now();
    let mut ticker = tokio::time::interval(walk.step);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let position = position_at(&walk, started.elapsed());
                if positions.send(position).await.is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk() -> Walk {
        Walk {
            center_lat: 60.0,
            center_lon: 25.0,
            radius_m: 100.0,
            step: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_walk_starts_north_of_center() {
        let p = position_at(&walk(), Duration::ZERO);
        assert!((p.latitude - (60.0 + 100.0 / METERS_PER_DEGREE)).abs() < 1e-9);
        assert!((p.longitude - 25.0).abs() < 1e-9);
        assert_eq!(p.bearing, Some(90.0));
    }

    #[test]
    fn test_walk_quarter_lap_is_east() {
        let p = position_at(&walk(), LAP / 4);
        assert!(p.longitude > 25.0);
        assert!((p.latitude - 60.0).abs() < 1e-6);
        assert!((p.bearing.unwrap() - 180.0).abs() < 1e-3);
    }

    #[test]
    fn test_walk_speed_matches_lap() {
        let p = position_at(&walk(), Duration::from_secs(7));
        let expected = TAU * 100.0 / 60.0;
        assert!((p.speed.unwrap() as f64 - expected).abs() < 1e-3);
    }
}
