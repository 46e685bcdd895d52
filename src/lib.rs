//! # nearpeer
//!
//! Bluetooth LE proximity beacon engine. Every participating device
//! broadcasts a fixed 23-byte identity packet while scanning for the same
//! packet from peers, estimates peer distance from received signal
//! strength, and tracks per-peer visibility over time.
//!
//! The physical radio stays outside this crate: implement [`Broadcaster`]
//! and [`Listener`] against your platform's BLE stack, feed matched frames
//! to [`ProximitySession::handle_frame`], and supply the radio-enabled
//! signal as a watch channel. The session takes care of the rest —
//! sequencing start/stop, deriving the combined run state, folding decoded
//! frames into the sightings cache and hiding peers that go quiet.
//!
//! ## Modules
//!
//! - [`beacon::packet`] - identity-packet codec and scan-filter material
//! - [`beacon::distance`] - signal-strength to distance estimation
//! - [`beacon::sightings`] - deduplicating peer cache with aging sweep
//! - [`beacon::session`] - start/stop session controller
//! - [`config`] - validated caller-supplied configuration
//! - [`error`] - error taxonomy
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use nearpeer::{Broadcaster, Listener, ProximityConfig, ProximitySession};
//! use tokio::sync::watch;
//!
//! # async fn run(broadcaster: Arc<dyn Broadcaster>, listener: Arc<dyn Listener>) -> nearpeer::Result<()> {
//! let config = ProximityConfig::builder("e2c56db5-dffb-48d2-b060-d0f5a71096e0")
//!     .major(10)
//!     .minor(1)
//!     .build()?;
//!
//! let (_radio_tx, radio_rx) = watch::channel(true);
//! let session = ProximitySession::new(config, broadcaster, listener, radio_rx);
//!
//! session.start().await?;
//! let mut sightings = session.subscribe_sightings();
//! while sightings.changed().await.is_ok() {
//!     for (key, sighting) in sightings.borrow_and_update().iter() {
//!         println!("{key}: {:.1}m near={}", sighting.current_distance, sighting.is_near);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod beacon;
pub mod config;
pub mod error;

pub use beacon::{
    combined_state, estimate_distance, Advertisement, Broadcaster, Listener, PeerObservation,
    ProximitySession, RawFrame, RunState, ScanFilter, Sighting, SightingsCache, SightingsMap,
    UNDETERMINABLE_DISTANCE,
};
pub use config::{ProximityConfig, ProximityConfigBuilder};
pub use error::{ProximityError, Result};
