//! Proximity beacon engine.
//!
//! Identity-packet codec, signal-to-distance estimation, the sightings
//! cache and the session controller that drives the radio collaborators.

pub mod distance;
pub mod packet;
pub mod radio;
pub mod session;
pub mod sightings;

pub use distance::{estimate_distance, UNDETERMINABLE_DISTANCE};
pub use packet::{Advertisement, ScanFilter};
pub use radio::{Broadcaster, Listener, RawFrame, RunState};
pub use session::{combined_state, ProximitySession};
pub use sightings::{PeerObservation, Sighting, SightingsCache, SightingsMap};
