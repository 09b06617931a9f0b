//! Tests for the position frame codec

use super::*;

fn helsinki() -> Position {
    Position::new(60.169418, 24.938379)
        .with_altitude(50.0)
        .with_accuracy(5.0)
        .with_speed(10.0)
        .with_bearing(90.0)
}

#[test]
fn test_frame_len() {
    assert_eq!(FRAME_LEN, 19);
    assert_eq!(encode(&Position::default()).len(), FRAME_LEN);
}

#[test]
fn test_encode_known_byte_layout() {
    let frame = encode(&helsinki());

    let mut expected = Vec::with_capacity(FRAME_LEN);
    expected.extend_from_slice(b"BLEGPS");
    expected.extend_from_slice(&60_169_418i32.to_le_bytes());
    expected.extend_from_slice(&24_938_379i32.to_le_bytes());
    expected.extend_from_slice(&32_817u16.to_le_bytes());
    expected.push(5); // accuracy m
    expected.push(36); // 10 m/s = 36 km/h
    expected.push(64); // 90°

    assert_eq!(frame.as_slice(), expected.as_slice());
}

#[test]
fn test_decode_known_byte_layout() {
    let decoded = decode(&encode(&helsinki())).unwrap();

    assert!((decoded.latitude - 60.169418).abs() < 5e-7);
    assert!((decoded.longitude - 24.938379).abs() < 5e-7);
    assert_eq!(decoded.altitude, 50);
    assert_eq!(decoded.accuracy, 5);
    assert!((decoded.speed - 10.0).abs() < 1e-4);
    assert!((decoded.bearing - 90.0).abs() < 1e-4);
}

#[test]
fn test_round_trip_within_quantization() {
    let cases = [
        (90.0, 180.0, 32_767.0, 255.0, 70.0, 359.0),
        (-90.0, -180.0, -32_767.0, 0.0, 0.0, 0.0),
        (-33.868820, 151.209296, 58.0, 12.0, 5.0, 181.4),
        (0.000001, -0.000001, 0.0, 3.0, 25.0, 45.0),
        (51.477928, -0.001545, -12.0, 99.0, 14.0, 271.0),
    ];

    for (lat, lon, alt, acc, kmh, bearing) in cases {
        let position = Position::new(lat, lon)
            .with_altitude(alt)
            .with_accuracy(acc)
            .with_speed(kmh / MPS_TO_KMH)
            .with_bearing(bearing);

        let decoded = decode(&encode(&position)).unwrap();

        // Coordinates and speed truncate, so they lose less than one step.
        assert!((decoded.latitude - lat).abs() < 1e-6, "lat {lat}");
        assert!((decoded.longitude - lon).abs() < 1e-6, "lon {lon}");
        assert_eq!(decoded.altitude as f64, alt, "alt {alt}");
        assert_eq!(decoded.accuracy as f32, acc, "acc {acc}");
        let speed_loss = kmh - decoded.speed * MPS_TO_KMH;
        assert!(
            (-1e-3..1.0 + 1e-3).contains(&speed_loss),
            "speed {kmh} decoded as {} km/h",
            decoded.speed * MPS_TO_KMH
        );
        assert!(
            (decoded.bearing - bearing).abs() <= 360.0 / 256.0,
            "bearing {bearing} decoded as {}",
            decoded.bearing
        );
    }
}

#[test]
fn test_coordinates_and_speed_truncate_toward_zero() {
    let frame = encode(&Position::new(60.1694187, -24.9383795).with_speed(2.95));

    assert_eq!(frame[6..10], 60_169_418i32.to_le_bytes());
    assert_eq!(frame[10..14], (-24_938_379i32).to_le_bytes());
    assert_eq!(frame[17], 10); // 10.62 km/h
}

#[test]
fn test_accuracy_clamped() {
    let frame = encode(&Position::new(0.0, 0.0).with_accuracy(300.0));
    assert_eq!(decode(&frame).unwrap().accuracy, 255);

    let frame = encode(&Position::new(0.0, 0.0).with_accuracy(-4.0));
    assert_eq!(decode(&frame).unwrap().accuracy, 0);
}

#[test]
fn test_speed_clamped() {
    let frame = encode(&Position::new(0.0, 0.0).with_speed(100.0)); // 360 km/h
    assert_eq!(frame[17], 255);

    let frame = encode(&Position::new(0.0, 0.0).with_speed(-3.0));
    assert_eq!(frame[17], 0);
    assert_eq!(decode(&frame).unwrap().speed, 0.0);
}

#[test]
fn test_bearing_wraps_to_north() {
    assert_eq!(encode(&Position::new(0.0, 0.0).with_bearing(359.9))[18], 0);
    assert_eq!(encode(&Position::new(0.0, 0.0).with_bearing(359.0))[18], 255);
    assert_eq!(encode(&Position::new(0.0, 0.0).with_bearing(180.0))[18], 128);
    assert_eq!(encode(&Position::new(0.0, 0.0).with_bearing(-90.0))[18], 192);
}

#[test]
fn test_absent_fields_decode_as_zero_offsets() {
    let decoded = decode(&encode(&Position::new(12.5, -7.25))).unwrap();

    assert_eq!(decoded.altitude, 0);
    assert_eq!(decoded.accuracy, 0);
    assert_eq!(decoded.speed, 0.0);
    assert_eq!(decoded.bearing, 0.0);

    // No presence bits on the wire: everything comes back present.
    let position = decoded.to_position();
    assert_eq!(position.altitude, Some(0.0));
    assert_eq!(position.bearing, Some(0.0));
}

#[test]
fn test_altitude_extremes_clamped() {
    let frame = encode(&Position::new(0.0, 0.0).with_altitude(-40_000.0));
    assert_eq!(decode(&frame).unwrap().altitude, -32_767);

    let frame = encode(&Position::new(0.0, 0.0).with_altitude(40_000.0));
    assert_eq!(decode(&frame).unwrap().altitude, 32_768);
}

#[test]
fn test_decode_too_short() {
    let frame = encode(&helsinki());
    assert_eq!(
        decode(&frame[..18]),
        Err(DecodeError::TooShort { len: 18 })
    );
    assert_eq!(decode(&[]), Err(DecodeError::TooShort { len: 0 }));
}

#[test]
fn test_decode_bad_magic() {
    let mut frame = encode(&helsinki());
    frame[0] ^= 0xFF;
    assert_eq!(decode(&frame), Err(DecodeError::BadMagic { index: 0 }));

    let mut frame = encode(&helsinki());
    frame[5] = b'X';
    assert_eq!(decode(&frame), Err(DecodeError::BadMagic { index: 5 }));
}

#[test]
fn test_decode_ignores_trailing_bytes() {
    let mut bytes = encode(&helsinki()).to_vec();
    bytes.extend_from_slice(&[0xAA, 0xBB]);
    assert!(decode(&bytes).is_ok());
}

#[test]
fn test_decode_accepts_any_numeric_pattern() {
    let mut frame = [0xFFu8; FRAME_LEN];
    frame[..6].copy_from_slice(&APP_IDENTIFIER);

    let decoded = decode(&frame).unwrap();
    assert_eq!(decoded.latitude, -0.000001);
    assert_eq!(decoded.altitude, 32_768);
    assert_eq!(decoded.accuracy, 255);
    assert!((decoded.bearing - 358.59375).abs() < 1e-4);
}

#[test]
fn test_display() {
    let decoded = decode(&encode(&helsinki())).unwrap();
    let text = decoded.to_string();
    assert!(text.starts_with("60.169418, 24.938379"));
    assert!(text.contains("alt=50m"));
}
