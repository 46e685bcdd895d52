//! Sightings cache.
//!
//! Stateful store of the last-known information per discovered peer. Every
//! decoded observation is folded into the map under a stable key, minimum
//! observed distance is tracked across the whole session, and a periodic
//! aging sweep hides peers that stop being heard. Entries are never removed
//! while a session runs: a peer that drops out of range keeps its history
//! and is only marked invisible.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// The published key → sighting mapping.
pub type SightingsMap = HashMap<String, Sighting>;

/// A decoded peer observation, ready to be folded into the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerObservation {
    /// Hardware address the frame arrived from.
    pub address: String,
    /// Organization UUID decoded from the identity packet.
    pub organization_uuid: Uuid,
    /// Major value decoded from the identity packet.
    pub major: u16,
    /// Minor value decoded from the identity packet.
    pub minor: u16,
    /// Session user identifier from the side channel, if the peer sent one.
    pub user_uuid: Option<Uuid>,
    /// Estimated distance in meters; -1.0 when undeterminable.
    pub distance: f64,
}

impl PeerObservation {
    /// Cache key for this peer: the session user identifier when present,
    /// otherwise the hardware address. Addresses rotate on most platforms,
    /// so peers advertising a user identifier stay deduplicated across
    /// rotations.
    pub fn key(&self) -> String {
        match self.user_uuid {
            Some(uuid) => uuid.to_string(),
            None => self.address.clone(),
        }
    }
}

/// Last-known state of a discovered peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sighting {
    /// Hardware address of the most recent observation.
    pub address: String,
    /// Organization UUID the peer broadcasts.
    pub organization_uuid: Uuid,
    /// Beacon major value.
    pub major: u16,
    /// Beacon minor value.
    pub minor: u16,
    /// Session user identifier, if the peer advertises one.
    pub user_uuid: Option<Uuid>,
    /// When the peer was last decoded.
    pub last_seen: DateTime<Utc>,
    /// Most recent distance estimate in meters; -1.0 when undeterminable.
    pub current_distance: f64,
    /// Minimum distance ever observed for this peer this session.
    pub min_distance: f64,
    /// Whether the most recent estimate is inside the near threshold.
    pub is_near: bool,
    /// False once the aging sweep ran without hearing from the peer.
    pub is_visible: bool,
}

/// Deduplicating store of peer sightings with a background aging sweep.
///
/// `report` may be called from any thread; the map mutation is the single
/// synchronization point, and observers only ever see immutable snapshots.
pub struct SightingsCache {
    visibility_timeout: Duration,
    visibility_distance: f64,
    sightings: Arc<Mutex<SightingsMap>>,
    snapshot: Arc<watch::Sender<Arc<SightingsMap>>>,
    sweep: Mutex<Option<JoinHandle<()>>>,
}

impl SightingsCache {
    /// Create a cache. Nothing runs until [`start`](Self::start).
    pub fn new(visibility_timeout: Duration, visibility_distance: f64) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(SightingsMap::new()));
        Self {
            visibility_timeout,
            visibility_distance,
            sightings: Arc::new(Mutex::new(SightingsMap::new())),
            snapshot: Arc::new(snapshot),
            sweep: Mutex::new(None),
        }
    }

    /// Reset the mapping and (re)start the aging sweep.
    ///
    /// Calling while already running discards the previous sweep task and
    /// all prior sightings. Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut sweep = self.sweep.lock();
        if let Some(task) = sweep.take() {
            task.abort();
        }

        self.sightings.lock().clear();
        self.snapshot.send_replace(Arc::new(SightingsMap::new()));

        info!(
            "sightings cache started, visibility timeout {}ms",
            self.visibility_timeout.as_millis()
        );

        let sightings = Arc::clone(&self.sightings);
        let snapshot = Arc::clone(&self.snapshot);
        let timeout = self.visibility_timeout;
        *sweep = Some(tokio::spawn(async move {
            let mut ticks = tokio::time::interval(timeout);
            loop {
                ticks.tick().await;
                let horizon =
                    Utc::now() - chrono::Duration::milliseconds(timeout.as_millis() as i64);
                let published = {
                    let mut map = sightings.lock();
                    let hidden = age_out(&mut map, horizon);
                    if hidden > 0 {
                        debug!("aging sweep hid {hidden} peer(s)");
                    }
                    Arc::new(map.clone())
                };
                snapshot.send_replace(published);
            }
        }));
    }

    /// Cancel the aging sweep. The last published snapshot stays readable
    /// so observers can still inspect final state. Safe to call when the
    /// cache never started.
    pub fn stop(&self) {
        if let Some(task) = self.sweep.lock().take() {
            task.abort();
            info!("sightings cache stopped");
        }
    }

    /// Fold a newly decoded observation into the mapping and publish an
    /// updated snapshot.
    pub fn report(&self, observation: PeerObservation) {
        let key = observation.key();
        let now = Utc::now();

        let published = {
            let mut map = self.sightings.lock();
            let min_distance = match map.get(&key) {
                Some(existing) => existing.min_distance.min(observation.distance),
                None => observation.distance,
            };
            map.insert(
                key,
                Sighting {
                    address: observation.address,
                    organization_uuid: observation.organization_uuid,
                    major: observation.major,
                    minor: observation.minor,
                    user_uuid: observation.user_uuid,
                    last_seen: now,
                    current_distance: observation.distance,
                    min_distance,
                    is_near: observation.distance < self.visibility_distance,
                    is_visible: true,
                },
            );
            Arc::new(map.clone())
        };
        self.snapshot.send_replace(published);
    }

    /// Subscribe to snapshot updates. Every `report` and every sweep pass
    /// publishes a fresh immutable snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<SightingsMap>> {
        self.snapshot.subscribe()
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Arc<SightingsMap> {
        self.snapshot.borrow().clone()
    }

    /// Summary counters over the current snapshot.
    pub fn statistics(&self) -> serde_json::Value {
        let snapshot = self.snapshot();
        let visible = snapshot.values().filter(|s| s.is_visible).count();
        let near = snapshot.values().filter(|s| s.is_near).count();

        serde_json::json!({
            "total_peers": snapshot.len(),
            "visible_peers": visible,
            "near_peers": near,
        })
    }
}

impl Drop for SightingsCache {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Hide every visible sighting last seen before `horizon`. Returns how many
/// were flipped; entries are never removed.
fn age_out(sightings: &mut SightingsMap, horizon: DateTime<Utc>) -> usize {
    let mut hidden = 0;
    for sighting in sightings.values_mut().filter(|s| s.is_visible) {
        if sighting.last_seen < horizon {
            sighting.is_visible = false;
            hidden += 1;
        }
    }
    hidden
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(address: &str, distance: f64) -> PeerObservation {
        PeerObservation {
            address: address.to_string(),
            organization_uuid: Uuid::parse_str("e2c56db5-dffb-48d2-b060-d0f5a71096e0").unwrap(),
            major: 1,
            minor: 1,
            user_uuid: None,
            distance,
        }
    }

    #[test]
    fn key_prefers_user_uuid_over_address() {
        let user = Uuid::new_v4();
        let mut obs = observation("AA:BB:CC:DD:EE:FF", 2.0);
        assert_eq!(obs.key(), "AA:BB:CC:DD:EE:FF");

        obs.user_uuid = Some(user);
        assert_eq!(obs.key(), user.to_string());
    }

    #[tokio::test]
    async fn report_creates_and_updates_sightings() {
        let cache = SightingsCache::new(Duration::from_millis(10_000), 1.0);
        cache.start();

        cache.report(observation("aa", 2.5));
        let snapshot = cache.snapshot();
        let sighting = &snapshot["aa"];
        assert_eq!(sighting.current_distance, 2.5);
        assert_eq!(sighting.min_distance, 2.5);
        assert!(!sighting.is_near);
        assert!(sighting.is_visible);

        cache.report(observation("aa", 0.4));
        let snapshot = cache.snapshot();
        let sighting = &snapshot["aa"];
        assert_eq!(sighting.current_distance, 0.4);
        assert_eq!(sighting.min_distance, 0.4);
        assert!(sighting.is_near);

        cache.stop();
    }

    #[tokio::test]
    async fn min_distance_is_monotonic_regardless_of_order() {
        let cache = SightingsCache::new(Duration::from_millis(10_000), 1.0);
        cache.start();

        for distance in [5.0, 3.0, 4.0, 7.0] {
            cache.report(observation("aa", distance));
        }
        assert_eq!(cache.snapshot()["aa"].min_distance, 3.0);
        assert_eq!(cache.snapshot()["aa"].current_distance, 7.0);

        cache.report(observation("aa", 2.0));
        cache.report(observation("aa", 10.0));
        assert_eq!(cache.snapshot()["aa"].min_distance, 2.0);

        cache.stop();
    }

    #[tokio::test]
    async fn undeterminable_distance_sticks_in_minimum() {
        let cache = SightingsCache::new(Duration::from_millis(10_000), 1.0);
        cache.start();

        cache.report(observation("aa", 4.0));
        cache.report(observation("aa", -1.0));
        cache.report(observation("aa", 3.0));

        let snapshot = cache.snapshot();
        let sighting = &snapshot["aa"];
        assert_eq!(sighting.min_distance, -1.0);
        assert_eq!(sighting.current_distance, 3.0);

        cache.stop();
    }

    #[test]
    fn age_out_hides_only_stale_visible_entries() {
        let mut map = SightingsMap::new();
        let now = Utc::now();
        let timeout = chrono::Duration::milliseconds(10_000);

        let mut stale = Sighting {
            address: "aa".into(),
            organization_uuid: Uuid::new_v4(),
            major: 1,
            minor: 1,
            user_uuid: None,
            last_seen: now - timeout - chrono::Duration::milliseconds(1),
            current_distance: 2.0,
            min_distance: 2.0,
            is_near: false,
            is_visible: true,
        };
        let fresh = Sighting {
            address: "bb".into(),
            last_seen: now,
            ..stale.clone()
        };
        map.insert("aa".into(), stale.clone());
        map.insert("bb".into(), fresh);

        assert_eq!(age_out(&mut map, now - timeout), 1);
        assert!(!map["aa"].is_visible);
        assert!(map["bb"].is_visible);

        // a second pass flips nothing further, and nothing is removed
        assert_eq!(age_out(&mut map, now - timeout), 0);
        assert_eq!(map.len(), 2);

        // already-hidden entries stay hidden no matter how stale
        stale.is_visible = false;
        map.insert("aa".into(), stale);
        assert_eq!(age_out(&mut map, now), 0);
    }

    #[tokio::test]
    async fn sweep_hides_silent_peers_and_report_revives_them() {
        let cache = SightingsCache::new(Duration::from_millis(50), 1.0);
        cache.start();

        cache.report(observation("aa", 2.0));
        assert!(cache.snapshot()["aa"].is_visible);

        // two sweep periods without hearing from the peer
        tokio::time::sleep(Duration::from_millis(130)).await;
        let snapshot = cache.snapshot();
        let sighting = &snapshot["aa"];
        assert!(!sighting.is_visible);
        assert_eq!(sighting.min_distance, 2.0);

        cache.report(observation("aa", 3.0));
        let snapshot = cache.snapshot();
        let sighting = &snapshot["aa"];
        assert!(sighting.is_visible);
        assert_eq!(sighting.min_distance, 2.0);

        cache.stop();
    }

    #[tokio::test]
    async fn sweep_republishes_even_without_changes() {
        let cache = SightingsCache::new(Duration::from_millis(40), 1.0);
        let mut updates = cache.subscribe();
        cache.start();
        updates.changed().await.unwrap(); // the cleared snapshot from start

        // no reports at all: ticks alone must keep publishing snapshots
        tokio::time::timeout(Duration::from_millis(500), async {
            updates.changed().await.unwrap();
            updates.changed().await.unwrap();
        })
        .await
        .expect("sweep stopped publishing");
        assert!(updates.borrow_and_update().is_empty());

        cache.stop();
    }

    #[tokio::test]
    async fn stop_keeps_last_snapshot_and_restart_clears() {
        let cache = SightingsCache::new(Duration::from_millis(10_000), 1.0);
        cache.start();
        cache.report(observation("aa", 1.5));

        cache.stop();
        assert_eq!(cache.snapshot().len(), 1);

        // stop is safe to repeat and safe before any start
        cache.stop();
        SightingsCache::new(Duration::from_millis(10), 1.0).stop();

        cache.start();
        assert!(cache.snapshot().is_empty());
        cache.stop();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reports_never_lose_the_minimum() {
        let cache = Arc::new(SightingsCache::new(Duration::from_millis(10_000), 1.0));
        cache.start();

        let mut tasks = Vec::new();
        for offset in 0..8u32 {
            let cache = Arc::clone(&cache);
            tasks.push(tokio::spawn(async move {
                for step in 0..50u32 {
                    let distance = 1.0 + f64::from((offset + step) % 17);
                    cache.report(observation("aa", distance));
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        // every task eventually reports distance 1.0 (when (offset+step)%17==0)
        assert_eq!(cache.snapshot()["aa"].min_distance, 1.0);
        cache.stop();
    }

    #[tokio::test]
    async fn statistics_counts_visibility_and_nearness() {
        let cache = SightingsCache::new(Duration::from_millis(10_000), 1.0);
        cache.start();

        cache.report(observation("aa", 0.3));
        cache.report(observation("bb", 5.0));

        let stats = cache.statistics();
        assert_eq!(stats["total_peers"], 2);
        assert_eq!(stats["visible_peers"], 2);
        assert_eq!(stats["near_peers"], 1);

        cache.stop();
    }
}
