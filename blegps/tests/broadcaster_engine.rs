//! Integration tests for the broadcaster engine.
//!
//! Drives a `BroadcasterEngine` over the in-memory radio with virtual time:
//! - Start gating and the empty initial advertisement
//! - Throttling of position updates and the refresh tick
//! - Radio failures ending the run
//! - Feeding positions from a host channel
//!
//! Run with: `cargo test --test broadcaster_engine`

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use blegps::broadcaster::{spawn_position_feed, BroadcasterEngine, BroadcasterHandle};
use blegps::config::BeaconConfig;
use blegps::frame::{encode, Position, MANUFACTURER_ID};
use blegps::radio::memory::{Airwaves, MemoryAdvertiser, StaticCapabilities};
use blegps::radio::{AdvertiseFailure, Capability, RadioError};
use blegps::service::{
    event_channel, RunState, ServiceEvent, ServiceEventKind, StartError, StopReason,
};

// ============================================================================
// Test Helpers
// ============================================================================

struct Rig {
    advertiser: MemoryAdvertiser,
    events: broadcast::Receiver<ServiceEvent>,
    handle: BroadcasterHandle,
}

fn start_on(advertiser: MemoryAdvertiser) -> Rig {
    let (events_tx, events) = event_channel();
    let handle = BroadcasterEngine::new(
        BeaconConfig::default(),
        Arc::new(advertiser.clone()),
        Arc::new(StaticCapabilities::all()),
        events_tx,
    )
    .start()
    .expect("broadcaster should start");

    Rig {
        advertiser,
        events,
        handle,
    }
}

fn start() -> Rig {
    start_on(Airwaves::new().advertiser())
}

fn try_start(
    advertiser: MemoryAdvertiser,
    capabilities: StaticCapabilities,
) -> Result<(), StartError> {
    let (events_tx, _events) = event_channel();
    BroadcasterEngine::new(
        BeaconConfig::default(),
        Arc::new(advertiser),
        Arc::new(capabilities),
        events_tx,
    )
    .start()
    .map(|_| ())
}

async fn next_kind(events: &mut broadcast::Receiver<ServiceEvent>) -> ServiceEventKind {
    events.recv().await.expect("event channel closed").kind
}

async fn next_advertised(events: &mut broadcast::Receiver<ServiceEvent>) -> Position {
    loop {
        if let ServiceEventKind::PositionAdvertised(position) = next_kind(events).await {
            return position;
        }
    }
}

/// Lets the engine task drain its queues.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

fn helsinki() -> Position {
    Position::new(60.169418, 24.938379)
        .with_altitude(12.0)
        .with_accuracy(4.0)
}

fn tampere() -> Position {
    Position::new(61.497753, 23.760954)
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_start_puts_empty_payload_on_air() {
    let mut rig = start();

    assert_eq!(next_kind(&mut rig.events).await, ServiceEventKind::Started);
    assert_eq!(rig.handle.state(), RunState::Running);

    let active = rig.advertiser.active().expect("advertising");
    assert_eq!(active.vendor_id, MANUFACTURER_ID);
    assert!(active.payload.is_empty());
    assert_eq!(rig.handle.stats().advertisements, 1);
}

#[tokio::test(start_paused = true)]
async fn test_start_requires_location_permission() {
    let advertiser = Airwaves::new().advertiser();

    let result = try_start(
        advertiser.clone(),
        StaticCapabilities::all().without(Capability::Location),
    );

    assert_eq!(
        result,
        Err(StartError::PermissionDenied(Capability::Location))
    );
    assert_eq!(advertiser.start_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_start_requires_available_advertiser() {
    let advertiser = Airwaves::new().advertiser();
    advertiser.set_available(false);

    let result = try_start(advertiser, StaticCapabilities::all());

    assert_eq!(result, Err(StartError::AdvertiserUnavailable));
}

#[tokio::test(start_paused = true)]
async fn test_rejected_advertisement_fails_start() {
    let advertiser = Airwaves::new().advertiser();
    advertiser.reject_starts(true);

    let result = try_start(advertiser.clone(), StaticCapabilities::all());

    assert!(matches!(
        result,
        Err(StartError::Radio(RadioError::AdvertiseRejected(_)))
    ));
    assert!(!advertiser.is_advertising());
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent() {
    let mut rig = start();
    assert_eq!(next_kind(&mut rig.events).await, ServiceEventKind::Started);

    rig.handle.stop().await;
    rig.handle.stop().await;
    settle().await;

    assert_eq!(rig.handle.state(), RunState::Stopped);
    assert!(!rig.advertiser.is_advertising());
    assert!(!rig.handle.update_position(helsinki()));
    assert_eq!(
        next_kind(&mut rig.events).await,
        ServiceEventKind::Stopped(StopReason::Requested)
    );
    assert!(matches!(
        rig.events.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));
}

// ============================================================================
// Advertising
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_first_position_advertised_immediately() {
    let start_time = Instant::now();
    let mut rig = start();

    rig.handle.update_position(helsinki());

    assert_eq!(next_advertised(&mut rig.events).await, helsinki());
    assert_eq!(start_time.elapsed(), Duration::ZERO);

    let active = rig.advertiser.active().unwrap();
    assert_eq!(&active.payload[..], &encode(&helsinki())[..]);
    assert_eq!(rig.handle.stats().on_air, Some(helsinki()));
}

#[tokio::test(start_paused = true)]
async fn test_updates_within_interval_are_throttled() {
    let start_time = Instant::now();
    let mut rig = start();

    rig.handle.update_position(helsinki());
    assert_eq!(next_advertised(&mut rig.events).await, helsinki());

    tokio::time::sleep(Duration::from_millis(500)).await;
    rig.handle.update_position(tampere());
    settle().await;

    let stats = rig.handle.stats();
    assert_eq!(stats.positions_received, 2);
    assert_eq!(stats.on_air, Some(helsinki()));

    // The refresh tick puts the held-back position on air.
    assert_eq!(next_advertised(&mut rig.events).await, tampere());
    assert_eq!(start_time.elapsed(), Duration::from_millis(2000));
}

#[tokio::test(start_paused = true)]
async fn test_refresh_readvertises_unchanged_position() {
    let start_time = Instant::now();
    let mut rig = start();

    rig.handle.update_position(helsinki());
    assert_eq!(next_advertised(&mut rig.events).await, helsinki());

    assert_eq!(next_advertised(&mut rig.events).await, helsinki());
    assert_eq!(start_time.elapsed(), Duration::from_millis(2000));
    assert_eq!(next_advertised(&mut rig.events).await, helsinki());
    assert_eq!(start_time.elapsed(), Duration::from_millis(4000));

    // Empty payload plus three advertisements of the same position.
    assert_eq!(rig.advertiser.history().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_without_position_keeps_empty_payload() {
    let rig = start();

    tokio::time::sleep(Duration::from_secs(7)).await;

    assert_eq!(rig.advertiser.history().len(), 1);
    assert!(rig.advertiser.active().unwrap().payload.is_empty());
    assert!(rig.handle.is_running());
}

// ============================================================================
// Radio failures
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_advertise_failure_stops_broadcaster() {
    let mut rig = start();
    assert_eq!(next_kind(&mut rig.events).await, ServiceEventKind::Started);

    rig.advertiser.report_failure(AdvertiseFailure::InternalError);

    let ServiceEventKind::Stopped(StopReason::RadioFailure(detail)) =
        next_kind(&mut rig.events).await
    else {
        panic!("advertise failure must stop the broadcaster");
    };
    assert!(detail.contains("code 4"));
    assert_eq!(rig.handle.state(), RunState::Stopped);
    assert!(!rig.advertiser.is_advertising());
}

#[tokio::test(start_paused = true)]
async fn test_initial_advertise_failure_reported_after_start() {
    let advertiser = Airwaves::new().advertiser();
    advertiser.fail_next_start(AdvertiseFailure::DataTooLarge);

    let mut rig = start_on(advertiser);

    assert_eq!(next_kind(&mut rig.events).await, ServiceEventKind::Started);
    assert!(matches!(
        next_kind(&mut rig.events).await,
        ServiceEventKind::Stopped(StopReason::RadioFailure(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_rejected_update_stops_broadcaster() {
    let mut rig = start();
    assert_eq!(next_kind(&mut rig.events).await, ServiceEventKind::Started);

    rig.advertiser.reject_starts(true);
    rig.handle.update_position(helsinki());

    assert!(matches!(
        next_kind(&mut rig.events).await,
        ServiceEventKind::Stopped(StopReason::RadioFailure(_))
    ));
}

// ============================================================================
// Position feed
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_feed_forwards_until_source_closes() {
    let rig = start();
    let (tx, rx) = mpsc::channel(8);
    let feed = spawn_position_feed(rig.handle.updater(), rx, CancellationToken::new());

    tx.send(helsinki()).await.unwrap();
    tx.send(tampere()).await.unwrap();
    tx.send(helsinki()).await.unwrap();
    drop(tx);

    assert_eq!(feed.await.unwrap(), 3);
    settle().await;
    assert_eq!(rig.handle.stats().positions_received, 3);
}

#[tokio::test(start_paused = true)]
async fn test_feed_ends_when_broadcaster_stops() {
    let rig = start();
    let (tx, rx) = mpsc::channel(8);
    let feed = spawn_position_feed(rig.handle.updater(), rx, CancellationToken::new());

    rig.handle.stop().await;
    tx.send(helsinki()).await.unwrap();

    assert_eq!(feed.await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_feed_ends_on_cancel() {
    let rig = start();
    let (_tx, rx) = mpsc::channel::<Position>(8);
    let shutdown = CancellationToken::new();
    let feed = spawn_position_feed(rig.handle.updater(), rx, shutdown.clone());

    shutdown.cancel();

    assert_eq!(feed.await.unwrap(), 0);
    assert!(rig.handle.is_running());
}
