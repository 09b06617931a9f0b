//! Position frame codec.
//!
//! A frame is the fixed 19-byte vendor payload carried in every beacon
//! advertisement. All multi-byte fields are little-endian:
//!
//! ```text
//! offset  size  field
//!      0     6  application identifier ("BLEGPS")
//!      6     4  latitude   i32, degrees × 1e6
//!     10     4  longitude  i32, degrees × 1e6
//!     14     2  altitude   u16, meters + 32767
//!     16     1  accuracy   u8, meters (clamped)
//!     17     1  speed      u8, km/h (clamped)
//!     18     1  bearing    u8, degrees × 256/360
//! ```
//!
//! Encoding never fails. Decoding only checks length and identifier; any bit
//! pattern in the numeric fields is a valid frame.

mod types;

#[cfg(test)]
mod tests;

pub use types::{
    DecodeError, Position, PositionFrame, ALTITUDE_OFFSET, APP_IDENTIFIER, COORD_SCALE,
    FRAME_LEN, MANUFACTURER_ID, MPS_TO_KMH, PAYLOAD_LEN,
};

const LAT_OFFSET: usize = APP_IDENTIFIER.len();
const LON_OFFSET: usize = LAT_OFFSET + 4;
const ALT_OFFSET: usize = LON_OFFSET + 4;
const ACC_OFFSET: usize = ALT_OFFSET + 2;
const SPEED_OFFSET: usize = ACC_OFFSET + 1;
const BEARING_OFFSET: usize = SPEED_OFFSET + 1;

/// Encodes a position into a frame.
///
/// Absent optional fields encode as zero meters / zero speed / north.
#[inline]
pub fn encode(position: &Position) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    frame[..LAT_OFFSET].copy_from_slice(&APP_IDENTIFIER);
    frame[LAT_OFFSET..LON_OFFSET]
        .copy_from_slice(&encode_coordinate(position.latitude).to_le_bytes());
    frame[LON_OFFSET..ALT_OFFSET]
        .copy_from_slice(&encode_coordinate(position.longitude).to_le_bytes());
    frame[ALT_OFFSET..ACC_OFFSET]
        .copy_from_slice(&encode_altitude(position.altitude).to_le_bytes());
    frame[ACC_OFFSET] = encode_accuracy(position.accuracy);
    frame[SPEED_OFFSET] = encode_speed(position.speed);
    frame[BEARING_OFFSET] = encode_bearing(position.bearing);
    frame
}

/// Decodes a frame.
///
/// Trailing bytes beyond [`FRAME_LEN`] are ignored.
pub fn decode(bytes: &[u8]) -> Result<PositionFrame, DecodeError> {
    if bytes.len() < FRAME_LEN {
        return Err(DecodeError::TooShort { len: bytes.len() });
    }

    if let Some(index) = APP_IDENTIFIER
        .iter()
        .zip(bytes)
        .position(|(expected, actual)| expected != actual)
    {
        return Err(DecodeError::BadMagic { index });
    }

    let lat_raw = i32::from_le_bytes([
        bytes[LAT_OFFSET],
        bytes[LAT_OFFSET + 1],
        bytes[LAT_OFFSET + 2],
        bytes[LAT_OFFSET + 3],
    ]);
    let lon_raw = i32::from_le_bytes([
        bytes[LON_OFFSET],
        bytes[LON_OFFSET + 1],
        bytes[LON_OFFSET + 2],
        bytes[LON_OFFSET + 3],
    ]);
    let alt_raw = u16::from_le_bytes([bytes[ALT_OFFSET], bytes[ALT_OFFSET + 1]]);

    Ok(PositionFrame {
        latitude: lat_raw as f64 / COORD_SCALE,
        longitude: lon_raw as f64 / COORD_SCALE,
        altitude: alt_raw as i32 - ALTITUDE_OFFSET,
        accuracy: bytes[ACC_OFFSET],
        speed: bytes[SPEED_OFFSET] as f32 / MPS_TO_KMH,
        bearing: bytes[BEARING_OFFSET] as f32 * (360.0 / 256.0),
    })
}

/// Degrees to microdegrees, truncated toward zero.
fn encode_coordinate(degrees: f64) -> i32 {
    (degrees * COORD_SCALE) as i32
}

fn encode_altitude(altitude: Option<f64>) -> u16 {
    let meters = altitude.map(|a| a as i32).unwrap_or(0);
    let max = u16::MAX as i32 - ALTITUDE_OFFSET;
    (meters.clamp(-ALTITUDE_OFFSET, max) + ALTITUDE_OFFSET) as u16
}

fn encode_accuracy(accuracy: Option<f32>) -> u8 {
    accuracy.map(|a| a as i32).unwrap_or(0).clamp(0, 255) as u8
}

/// m/s to whole km/h, truncated.
fn encode_speed(speed: Option<f32>) -> u8 {
    speed
        .map(|s| (s * MPS_TO_KMH) as i32)
        .unwrap_or(0)
        .clamp(0, 255) as u8
}

/// `round(bearing / 360 * 256) mod 256`, so 359.9° wraps to north.
fn encode_bearing(bearing: Option<f32>) -> u8 {
    bearing
        .map(|b| ((b as f64 / 360.0 * 256.0).round() as i64).rem_euclid(256) as u8)
        .unwrap_or(0)
}
