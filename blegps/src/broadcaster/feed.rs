//! Position source wiring.
//!
//! Hosts deliver location updates on their own schedule. The feed forwards
//! them from a channel into a running broadcaster until the source closes,
//! the broadcaster stops or the feed is cancelled.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::engine::PositionUpdater;
use crate::frame::Position;

/// Spawns a task forwarding `source` into the broadcaster behind `updater`.
///
/// Returns the number of positions forwarded when the task ends.
pub fn spawn_position_feed(
    updater: PositionUpdater,
    mut source: mpsc::Receiver<Position>,
    shutdown: CancellationToken,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut forwarded = 0u64;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Position feed cancelled");
                    break;
                }
                next = source.recv() => {
                    let Some(position) = next else {
                        debug!("Position source closed");
                        break;
                    };
                    if !updater.update(position) {
                        debug!("Broadcaster stopped, ending position feed");
                        break;
                    }
                    forwarded += 1;
                }
            }
        }

        info!(forwarded, "Position feed ended");
        forwarded
    })
}
