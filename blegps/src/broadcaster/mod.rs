//! Broadcaster role.
//!
//! Advertises the local position as a frame under the configured vendor id:
//!
//! - [`BroadcasterEngine`] - lifecycle, throttling and the refresh tick
//! - [`spawn_position_feed`] - forwards a host location stream into it
//!
//! The broadcaster runs until stopped or until the advertiser reports a
//! failure.

mod engine;
mod feed;

pub use engine::{
    BroadcasterEngine, BroadcasterHandle, BroadcasterStats, PositionUpdater,
    BROADCASTER_CAPABILITIES,
};
pub use feed::spawn_position_feed;
