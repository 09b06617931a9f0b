//! Frame type definitions

use std::fmt;

use thiserror::Error;

/// Application identifier at the head of every frame ("BLEGPS").
pub const APP_IDENTIFIER: [u8; 6] = *b"BLEGPS";

/// Vendor (manufacturer) id the frame is tagged with inside the advertisement.
pub const MANUFACTURER_ID: u16 = 1001;

/// Bytes following the identifier: lat(4) + lon(4) + alt(2) + acc(1) + speed(1) + bearing(1).
pub const PAYLOAD_LEN: usize = 4 + 4 + 2 + 1 + 1 + 1;

/// Total encoded frame size.
pub const FRAME_LEN: usize = APP_IDENTIFIER.len() + PAYLOAD_LEN;

/// Fixed-point scale for latitude and longitude (microdegrees).
pub const COORD_SCALE: f64 = 1_000_000.0;

/// Offset applied to altitude so negative meters fit the unsigned field.
pub const ALTITUDE_OFFSET: i32 = 32_767;

/// Meters per second to kilometers per hour.
pub const MPS_TO_KMH: f32 = 3.6;

/// A sanitized position record ready for encoding.
///
/// Optional fields carry the presence flag the host reported. The wire
/// format has no presence bits, so absent fields travel as their
/// zero-offset defaults and come back as present zeros.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Altitude in meters
    pub altitude: Option<f64>,
    /// Horizontal accuracy in meters
    pub accuracy: Option<f32>,
    /// Speed over ground in meters per second
    pub speed: Option<f32>,
    /// Bearing in degrees, [0, 360)
    pub bearing: Option<f32>,
}

impl Position {
    /// Position with only coordinates present.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            ..Default::default()
        }
    }

    pub fn with_altitude(mut self, meters: f64) -> Self {
        self.altitude = Some(meters);
        self
    }

    pub fn with_accuracy(mut self, meters: f32) -> Self {
        self.accuracy = Some(meters);
        self
    }

    pub fn with_speed(mut self, meters_per_second: f32) -> Self {
        self.speed = Some(meters_per_second);
        self
    }

    pub fn with_bearing(mut self, degrees: f32) -> Self {
        self.bearing = Some(degrees);
        self
    }
}

/// A decoded position frame in physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFrame {
    /// Latitude in decimal degrees (1e-6 resolution)
    pub latitude: f64,
    /// Longitude in decimal degrees (1e-6 resolution)
    pub longitude: f64,
    /// Altitude in whole meters
    pub altitude: i32,
    /// Accuracy in whole meters
    pub accuracy: u8,
    /// Speed in meters per second (1 km/h resolution)
    pub speed: f32,
    /// Bearing in degrees (360/256 resolution)
    pub bearing: f32,
}

impl PositionFrame {
    /// Converts back into a position record with every field present.
    pub fn to_position(&self) -> Position {
        Position {
            latitude: self.latitude,
            longitude: self.longitude,
            altitude: Some(self.altitude as f64),
            accuracy: Some(self.accuracy as f32),
            speed: Some(self.speed),
            bearing: Some(self.bearing),
        }
    }
}

impl fmt::Display for PositionFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.6}, {:.6} alt={}m acc={}m speed={:.1}m/s bearing={:.1}°",
            self.latitude, self.longitude, self.altitude, self.accuracy, self.speed, self.bearing
        )
    }
}

/// Errors returned when a buffer is not a position frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Buffer is shorter than a full frame.
    #[error("Frame too short: {len} < {} bytes", FRAME_LEN)]
    TooShort { len: usize },

    /// Leading identifier does not match.
    #[error("Invalid application identifier at byte {index}")]
    BadMagic { index: usize },
}
