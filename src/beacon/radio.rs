//! Radio collaborator seams.
//!
//! The physical radio lives outside this crate. A [`Broadcaster`] puts the
//! encoded identity packet on the air, a [`Listener`] matches incoming
//! frames against the scan filter and delivers them as [`RawFrame`]s.
//! Both expose the same start/stop/state surface and are driven as one
//! logical unit by the session controller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Run state of a broadcaster, a listener, or the combined session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// Not running.
    Stopped,
    /// Actively broadcasting or scanning.
    Started,
}

/// Transmit side of the radio: broadcasts the identity packet.
///
/// Implementations receive the [`Advertisement`](crate::beacon::packet::Advertisement)
/// payload when they are constructed. Stopping an already-stopped
/// broadcaster is a no-op success.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Begin broadcasting. Resolves once the platform confirms.
    async fn start(&self) -> Result<()>;

    /// Stop broadcasting. Resolves once the platform confirms.
    async fn stop(&self) -> Result<()>;

    /// Current run state.
    fn state(&self) -> RunState;
}

/// Receive side of the radio: scans for peer identity packets.
///
/// Implementations receive the [`ScanFilter`](crate::beacon::packet::ScanFilter)
/// when they are constructed and deliver every matched frame to
/// [`ProximitySession::handle_frame`](crate::beacon::session::ProximitySession::handle_frame).
/// Stopping an already-stopped listener is a no-op success.
#[async_trait]
pub trait Listener: Send + Sync {
    /// Begin scanning. Resolves once the platform confirms.
    async fn start(&self) -> Result<()>;

    /// Stop scanning. Resolves once the platform confirms.
    async fn stop(&self) -> Result<()>;

    /// Current run state.
    fn state(&self) -> RunState;
}

/// A raw advertisement frame as delivered by a listener.
///
/// Frames arrive on whatever thread the radio layer uses for its callbacks;
/// nothing here is decoded yet.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    /// Hardware address of the sender.
    pub address: String,
    /// Received signal strength; 0 when the measurement is unusable.
    pub rssi: i32,
    /// Calibrated reference power reported alongside the frame.
    pub tx_power: i32,
    /// The advertisement bytes, manufacturer-data header included.
    pub data: Vec<u8>,
    /// Service UUIDs of the outer discovery frame (side channel).
    pub service_uuids: Vec<Uuid>,
}
