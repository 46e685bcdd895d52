//! Identity packet codec.
//!
//! Encodes and decodes the fixed-layout 23-byte identity payload every
//! device broadcasts, plus the scan-filter material listeners hand to the
//! radio layer so unrelated frames are dropped before decode is attempted.

use uuid::Uuid;

use crate::error::{ProximityError, Result};

/// Total length of an encoded identity packet.
pub const IDENTITY_PACKET_LEN: usize = 23;

/// Length of the scan-filter prefix and mask (identifier bytes + UUID).
pub const SCAN_FILTER_LEN: usize = 18;

/// Fixed identifier bytes at the head of every identity packet.
pub const PACKET_IDENTIFIER: [u8; 2] = [0x02, 0x15];

/// Fixed calibrated reference-power marker in the last packet byte.
pub const REFERENCE_POWER_MARKER: u8 = 0xB5;

/// Advertisement-frame offsets of the decodable fields. The frame wraps the
/// packet in a 4-byte manufacturer-data header (length, type, 2-byte
/// manufacturer id), so packet offsets shift by 4.
const FRAME_UUID_RANGE: std::ops::Range<usize> = 6..22;
const FRAME_MAJOR_RANGE: std::ops::Range<usize> = 22..24;
const FRAME_MINOR_RANGE: std::ops::Range<usize> = 24..26;

const FRAME_HEADER_LEN: usize = 4;
const MANUFACTURER_DATA_TYPE: u8 = 0xFF;

/// Everything a broadcaster needs to put this device on the air.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// Manufacturer identifier for the outer frame.
    pub manufacturer_id: u16,
    /// The encoded identity packet.
    pub packet: [u8; IDENTITY_PACKET_LEN],
    /// Session user identifier to advertise over the side channel, if any.
    pub user_uuid: Option<Uuid>,
}

/// Radio-level pre-filter a listener applies to incoming frames.
///
/// The prefix covers the identifier bytes and the organization UUID; the
/// all-ones mask leaves major, minor and the reference-power byte
/// unconstrained so every peer of the organization matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFilter {
    /// Manufacturer identifier the radio layer filters on.
    pub manufacturer_id: u16,
    /// First [`SCAN_FILTER_LEN`] bytes of an encoded packet.
    pub prefix: [u8; SCAN_FILTER_LEN],
    /// Mask with every bit set, same length as the prefix.
    pub mask: [u8; SCAN_FILTER_LEN],
}

/// Encode the identity packet for an organization UUID given in string form.
///
/// Fails with [`ProximityError::InvalidArgument`] if the string is not a
/// valid 128-bit UUID.
pub fn encode_identity_packet(
    organization_uuid: &str,
    major: u16,
    minor: u16,
) -> Result<[u8; IDENTITY_PACKET_LEN]> {
    let uuid = Uuid::parse_str(organization_uuid).map_err(|_| {
        ProximityError::InvalidArgument(format!(
            "organization UUID '{organization_uuid}' is not a valid UUID"
        ))
    })?;
    Ok(identity_packet(&uuid, major, minor))
}

/// Encode the identity packet from an already-parsed organization UUID.
pub fn identity_packet(
    organization_uuid: &Uuid,
    major: u16,
    minor: u16,
) -> [u8; IDENTITY_PACKET_LEN] {
    let mut packet = [0u8; IDENTITY_PACKET_LEN];
    packet[..2].copy_from_slice(&PACKET_IDENTIFIER);
    packet[2..18].copy_from_slice(organization_uuid.as_bytes());
    packet[18..20].copy_from_slice(&major.to_be_bytes());
    packet[20..22].copy_from_slice(&minor.to_be_bytes());
    packet[22] = REFERENCE_POWER_MARKER;
    packet
}

/// The identifier + organization UUID prefix used for radio-level filtering.
pub fn scan_filter_prefix(organization_uuid: &Uuid) -> [u8; SCAN_FILTER_LEN] {
    let mut prefix = [0u8; SCAN_FILTER_LEN];
    prefix[..2].copy_from_slice(&PACKET_IDENTIFIER);
    prefix[2..].copy_from_slice(organization_uuid.as_bytes());
    prefix
}

/// All-ones mask matching the full scan-filter prefix.
pub fn scan_filter_mask() -> [u8; SCAN_FILTER_LEN] {
    [0xFF; SCAN_FILTER_LEN]
}

/// Extract the major value from a raw advertisement frame.
///
/// Returns `None` when the frame is too short to carry the field; frames
/// from unrelated broadcasters routinely are.
pub fn decode_major(frame: &[u8]) -> Option<u16> {
    let bytes = frame.get(FRAME_MAJOR_RANGE)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Extract the minor value from a raw advertisement frame.
pub fn decode_minor(frame: &[u8]) -> Option<u16> {
    let bytes = frame.get(FRAME_MINOR_RANGE)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Extract the organization UUID from a raw advertisement frame.
///
/// The 16 bytes are combined most-significant-first into a 128-bit value.
pub fn decode_organization_uuid(frame: &[u8]) -> Option<Uuid> {
    let bytes = frame.get(FRAME_UUID_RANGE)?;
    let mut raw = [0u8; 16];
    raw.copy_from_slice(bytes);
    Some(Uuid::from_bytes(raw))
}

/// Extract the side-channel session user identifier.
///
/// Peers that advertise one carry it as the first service UUID of the outer
/// discovery frame, separate from the identity packet. Absence is valid and
/// means the peer is keyed by hardware address.
pub fn decode_user_uuid(service_uuids: &[Uuid]) -> Option<Uuid> {
    service_uuids.first().copied()
}

/// Wrap an identity packet in the manufacturer-data advertisement frame the
/// radio layer emits: length byte, data type, manufacturer id
/// (little-endian), then the packet itself.
pub fn advertisement_frame(
    manufacturer_id: u16,
    packet: &[u8; IDENTITY_PACKET_LEN],
) -> Vec<u8> {
    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + IDENTITY_PACKET_LEN);
    frame.push((IDENTITY_PACKET_LEN + FRAME_HEADER_LEN - 1) as u8);
    frame.push(MANUFACTURER_DATA_TYPE);
    frame.extend_from_slice(&manufacturer_id.to_le_bytes());
    frame.extend_from_slice(packet);
    frame
}
