//! Frame codec commands.
//!
//! `encode` prints the frame a broadcaster would put on air for a position;
//! `decode` shows what a receiver would make of a captured payload.

use clap::Args;

use blegps::frame::{decode, encode, Position, FRAME_LEN, MANUFACTURER_ID};

use crate::error::CliError;

/// Arguments for `blegps encode`.
#[derive(Debug, Args)]
pub struct EncodeArgs {
    /// Latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Altitude in meters
    #[arg(long = "alt", allow_hyphen_values = true)]
    pub altitude: Option<f64>,

    /// Horizontal accuracy in meters
    #[arg(long)]
    pub accuracy: Option<f32>,

    /// Speed in meters per second
    #[arg(long)]
    pub speed: Option<f32>,

    /// Bearing in degrees
    #[arg(long)]
    pub bearing: Option<f32>,
}

impl EncodeArgs {
    fn position(&self) -> Position {
        Position {
            latitude: self.lat,
            longitude: self.lon,
            altitude: self.altitude,
            accuracy: self.accuracy,
            speed: self.speed,
            bearing: self.bearing,
        }
    }
}

/// Arguments for `blegps decode`.
#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Frame bytes as hex; spaces, colons and a leading 0x are ignored
    pub hex: String,
}

/// Encode a position and print the frame.
pub fn run_encode(args: EncodeArgs) -> Result<(), CliError> {
    let frame = encode(&args.position());

    println!("{}", to_hex(&frame));
    println!();
    println!("  Vendor id: {} (0x{:04x})", MANUFACTURER_ID, MANUFACTURER_ID);
    println!("  Length:    {} bytes", frame.len());

    Ok(())
}

/// Decode a frame and print its fields.
pub fn run_decode(args: DecodeArgs) -> Result<(), CliError> {
    let bytes = parse_hex(&args.hex)?;
    let frame = decode(&bytes)?;

    println!("Position frame");
    println!("==============");
    println!("  Latitude:  {:.6}", frame.latitude);
    println!("  Longitude: {:.6}", frame.longitude);
    println!("  Altitude:  {} m", frame.altitude);
    println!("  Accuracy:  {} m", frame.accuracy);
    println!("  Speed:     {:.2} m/s", frame.speed);
    println!("  Bearing:   {:.1}°", frame.bearing);

    if bytes.len() > FRAME_LEN {
        println!();
        println!("  ({} trailing bytes ignored)", bytes.len() - FRAME_LEN);
    }

    Ok(())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn parse_hex(input: &str) -> Result<Vec<u8>, CliError> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: Vec<char> = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();

    if digits.len() % 2 != 0 {
        return Err(CliError::InvalidHex(format!(
            "odd number of digits ({})",
            digits.len()
        )));
    }

    digits
        .chunks(2)
        .map(|pair| {
            let text: String = pair.iter().collect();
            u8::from_str_radix(&text, 16)
                .map_err(|_| CliError::InvalidHex(format!("'{}' is not a hex byte", text)))
        })
        .collect()
}
