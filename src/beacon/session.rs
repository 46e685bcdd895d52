//! Proximity session controller.
//!
//! Drives a [`Broadcaster`] and a [`Listener`] as one logical unit: start
//! sequences the broadcaster before the listener, stop always winds both
//! down, and a transition of the radio-enabled signal to `false` forces a
//! stop without caller involvement. The session also owns the sightings
//! cache and the decode → estimate → report path for incoming frames.

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::watch;

use crate::beacon::distance::estimate_distance;
use crate::beacon::packet;
use crate::beacon::radio::{Broadcaster, Listener, RawFrame, RunState};
use crate::beacon::sightings::{PeerObservation, SightingsCache, SightingsMap};
use crate::config::ProximityConfig;
use crate::error::{ProximityError, Result};

/// Merge two observed sub-states into the session state.
///
/// Both known and in agreement yields that value; disagreement or an
/// unknown sub-state yields [`RunState::Stopped`].
pub fn combined_state(broadcaster: Option<RunState>, listener: Option<RunState>) -> RunState {
    match (broadcaster, listener) {
        (Some(b), Some(l)) if b == l => b,
        _ => RunState::Stopped,
    }
}

/// Coordinates broadcasting and listening as a single start/stop unit.
///
/// The session state is derived from the two collaborator states via
/// [`combined_state`] and republished on every transition; it is never set
/// directly. Construction must happen inside a tokio runtime: the watcher
/// for the radio-enabled signal is spawned once, here.
#[derive(Clone)]
pub struct ProximitySession {
    config: ProximityConfig,
    broadcaster: Arc<dyn Broadcaster>,
    listener: Arc<dyn Listener>,
    cache: Arc<SightingsCache>,
    radio_enabled: watch::Receiver<bool>,
    state: Arc<watch::Sender<RunState>>,
}

impl ProximitySession {
    /// Build a session around the two radio collaborators and the
    /// radio-enabled signal.
    pub fn new(
        config: ProximityConfig,
        broadcaster: Arc<dyn Broadcaster>,
        listener: Arc<dyn Listener>,
        radio_enabled: watch::Receiver<bool>,
    ) -> Self {
        let (state, _) = watch::channel(RunState::Stopped);
        let cache = Arc::new(SightingsCache::new(
            config.visibility_timeout(),
            config.visibility_distance(),
        ));

        let session = Self {
            config,
            broadcaster,
            listener,
            cache,
            radio_enabled,
            state: Arc::new(state),
        };
        session.spawn_radio_watch();
        session
    }

    /// Start broadcasting and listening.
    ///
    /// Fails with [`ProximityError::RadioUnavailable`] while the radio is
    /// disabled, touching neither collaborator. Otherwise the broadcaster
    /// starts first; only on its success does the listener start, and only
    /// on the listener's success does the sightings cache begin its aging
    /// sweep. The first failure is returned and no further step runs, so
    /// the sub-states reflect exactly which steps succeeded.
    pub async fn start(&self) -> Result<()> {
        if !self.is_radio_enabled() {
            return Err(ProximityError::RadioUnavailable(
                "radio is disabled".into(),
            ));
        }

        info!(
            "starting proximity session, identity packet {}",
            hex::encode(self.config.advertisement().packet)
        );

        let broadcast_result = self.broadcaster.start().await;
        self.publish_state();
        broadcast_result?;

        let listen_result = self.listener.start().await;
        self.publish_state();
        listen_result?;

        self.cache.start();
        info!("proximity session started");
        Ok(())
    }

    /// Stop broadcasting and listening.
    ///
    /// The broadcaster is stopped first; the listener and the cache are
    /// stopped regardless of the broadcaster's outcome. Stopping an
    /// already-stopped session is a no-op success. The first collaborator
    /// error, if any, is returned after both were attempted.
    pub async fn stop(&self) -> Result<()> {
        let broadcast_result = self.broadcaster.stop().await;
        self.publish_state();

        let listen_result = self.listener.stop().await;
        self.cache.stop();
        self.publish_state();

        info!("proximity session stopped");
        broadcast_result.and(listen_result)
    }

    /// Decode a matched frame, estimate the distance and fold the result
    /// into the sightings cache.
    ///
    /// Frames missing any essential identity field (major, minor,
    /// organization UUID) are dropped silently; the radio-level filter is
    /// coarse and unrelated broadcasters do reach this point. Callable from
    /// any thread.
    pub fn handle_frame(&self, frame: RawFrame) {
        let major = packet::decode_major(&frame.data);
        let minor = packet::decode_minor(&frame.data);
        let organization_uuid = packet::decode_organization_uuid(&frame.data);

        let (Some(major), Some(minor), Some(organization_uuid)) =
            (major, minor, organization_uuid)
        else {
            debug!(
                "dropping frame from {}: incomplete identity fields",
                frame.address
            );
            return;
        };

        let distance = estimate_distance(frame.rssi, frame.tx_power);
        self.cache.report(PeerObservation {
            address: frame.address,
            organization_uuid,
            major,
            minor,
            user_uuid: packet::decode_user_uuid(&frame.service_uuids),
            distance,
        });
    }

    /// Current derived session state.
    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Subscribe to session-state changes. Only distinct values are
    /// published.
    pub fn subscribe_state(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// The most recently published sightings snapshot.
    pub fn sightings(&self) -> Arc<SightingsMap> {
        self.cache.snapshot()
    }

    /// Subscribe to sightings snapshots.
    pub fn subscribe_sightings(&self) -> watch::Receiver<Arc<SightingsMap>> {
        self.cache.subscribe()
    }

    /// Whether the environment currently reports the radio as enabled.
    pub fn is_radio_enabled(&self) -> bool {
        *self.radio_enabled.borrow()
    }

    /// The configuration this session runs with.
    pub fn config(&self) -> &ProximityConfig {
        &self.config
    }

    /// Session status summary.
    pub fn statistics(&self) -> serde_json::Value {
        serde_json::json!({
            "state": self.state(),
            "broadcaster": self.broadcaster.state(),
            "listener": self.listener.state(),
            "radio_enabled": self.is_radio_enabled(),
            "sightings": self.cache.statistics(),
        })
    }

    fn publish_state(&self) {
        let next = combined_state(
            Some(self.broadcaster.state()),
            Some(self.listener.state()),
        );
        self.state.send_if_modified(|current| {
            if *current != next {
                *current = next;
                true
            } else {
                false
            }
        });
    }

    fn spawn_radio_watch(&self) {
        let session = self.clone();
        let mut enabled = self.radio_enabled.clone();
        tokio::spawn(async move {
            while enabled.changed().await.is_ok() {
                if !*enabled.borrow() {
                    info!("radio disabled, stopping proximity session");
                    if let Err(err) = session.stop().await {
                        warn!("forced stop after radio shutdown failed: {err}");
                    }
                }
            }
        });
    }
}
