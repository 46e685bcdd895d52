//! Engine configuration.
//!
//! All caller-supplied knobs are collected through [`ProximityConfigBuilder`]
//! and validated once, when [`build`](ProximityConfigBuilder::build) runs.
//! A [`ProximityConfig`] that exists is therefore always valid.

use std::time::Duration;

use uuid::Uuid;

use crate::beacon::packet::{self, Advertisement, ScanFilter};
use crate::error::{ProximityError, Result};

/// Default visibility timeout: a peer unheard for this long is marked hidden.
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Default distance threshold below which a peer counts as near, in meters.
pub const DEFAULT_VISIBILITY_DISTANCE: f64 = 1.0;

/// Default manufacturer identifier carried in the advertisement frame.
pub const DEFAULT_MANUFACTURER_ID: u16 = 0x4C00;

/// Default beacon major value.
pub const DEFAULT_MAJOR: u16 = 1;

/// Default beacon minor value.
pub const DEFAULT_MINOR: u16 = 1;

/// Validated configuration for a proximity session.
#[derive(Debug, Clone)]
pub struct ProximityConfig {
    organization_uuid: Uuid,
    user_uuid: Option<Uuid>,
    manufacturer_id: u16,
    major: u16,
    minor: u16,
    visibility_timeout: Duration,
    visibility_distance: f64,
}

impl ProximityConfig {
    /// Start building a configuration for the given organization UUID.
    ///
    /// The UUID distinguishes this deployment's beacons from every other
    /// broadcaster sharing the radio band; peers filter on it before decode.
    pub fn builder(organization_uuid: impl Into<String>) -> ProximityConfigBuilder {
        ProximityConfigBuilder {
            organization_uuid: organization_uuid.into(),
            user_uuid: None,
            manufacturer_id: DEFAULT_MANUFACTURER_ID,
            major: DEFAULT_MAJOR,
            minor: DEFAULT_MINOR,
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
            visibility_distance: DEFAULT_VISIBILITY_DISTANCE,
        }
    }

    /// Organization UUID embedded in every broadcast packet.
    pub fn organization_uuid(&self) -> Uuid {
        self.organization_uuid
    }

    /// Session-scoped user identifier, if one was configured.
    ///
    /// Peers that receive it key this device by the identifier instead of
    /// its hardware address, which most platforms rotate for privacy.
    pub fn user_uuid(&self) -> Option<Uuid> {
        self.user_uuid
    }

    /// Manufacturer identifier for the advertisement frame.
    pub fn manufacturer_id(&self) -> u16 {
        self.manufacturer_id
    }

    /// Beacon major value (1–65535).
    pub fn major(&self) -> u16 {
        self.major
    }

    /// Beacon minor value (1–65535).
    pub fn minor(&self) -> u16 {
        self.minor
    }

    /// How long a peer may stay unheard before the aging sweep hides it.
    pub fn visibility_timeout(&self) -> Duration {
        self.visibility_timeout
    }

    /// Distance threshold below which a peer counts as near, in meters.
    pub fn visibility_distance(&self) -> f64 {
        self.visibility_distance
    }

    /// The payload a broadcaster transmits for this configuration.
    pub fn advertisement(&self) -> Advertisement {
        Advertisement {
            manufacturer_id: self.manufacturer_id,
            packet: packet::identity_packet(&self.organization_uuid, self.major, self.minor),
            user_uuid: self.user_uuid,
        }
    }

    /// The radio-level pre-filter a listener applies before decoding frames.
    pub fn scan_filter(&self) -> ScanFilter {
        ScanFilter {
            manufacturer_id: self.manufacturer_id,
            prefix: packet::scan_filter_prefix(&self.organization_uuid),
            mask: packet::scan_filter_mask(),
        }
    }
}

/// Builder for [`ProximityConfig`].
#[derive(Debug, Clone)]
pub struct ProximityConfigBuilder {
    organization_uuid: String,
    user_uuid: Option<String>,
    manufacturer_id: u16,
    major: u16,
    minor: u16,
    visibility_timeout: Duration,
    visibility_distance: f64,
}

impl ProximityConfigBuilder {
    /// Set the session-scoped user identifier advertised over the side
    /// channel. Without one, peers fall back to this device's hardware
    /// address as the cache key.
    pub fn user_uuid(mut self, value: impl Into<String>) -> Self {
        self.user_uuid = Some(value.into());
        self
    }

    /// Override the manufacturer identifier.
    pub fn manufacturer_id(mut self, value: u16) -> Self {
        self.manufacturer_id = value;
        self
    }

    /// Set the beacon major value. Must be in 1–65535; 0 is reserved.
    pub fn major(mut self, value: u16) -> Self {
        self.major = value;
        self
    }

    /// Set the beacon minor value. Must be in 1–65535; 0 is reserved.
    pub fn minor(mut self, value: u16) -> Self {
        self.minor = value;
        self
    }

    /// Set the visibility timeout in milliseconds.
    pub fn visibility_timeout_ms(mut self, value: u64) -> Self {
        self.visibility_timeout = Duration::from_millis(value);
        self
    }

    /// Set the near/far distance threshold in meters.
    pub fn visibility_distance_m(mut self, value: f64) -> Self {
        self.visibility_distance = value;
        self
    }

    /// Validate every supplied value and produce the configuration.
    pub fn build(self) -> Result<ProximityConfig> {
        let organization_uuid = Uuid::parse_str(&self.organization_uuid).map_err(|_| {
            ProximityError::InvalidArgument(format!(
                "organization UUID '{}' is not a valid UUID",
                self.organization_uuid
            ))
        })?;

        let user_uuid = match &self.user_uuid {
            Some(raw) => Some(Uuid::parse_str(raw).map_err(|_| {
                ProximityError::InvalidArgument(format!("user UUID '{raw}' is not a valid UUID"))
            })?),
            None => None,
        };

        if self.major == 0 {
            return Err(ProximityError::InvalidArgument(
                "major must be between 1 and 65535".into(),
            ));
        }
        if self.minor == 0 {
            return Err(ProximityError::InvalidArgument(
                "minor must be between 1 and 65535".into(),
            ));
        }

        Ok(ProximityConfig {
            organization_uuid,
            user_uuid,
            manufacturer_id: self.manufacturer_id,
            major: self.major,
            minor: self.minor,
            visibility_timeout: self.visibility_timeout,
            visibility_distance: self.visibility_distance,
        })
    }
}
