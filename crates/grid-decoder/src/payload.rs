//! Raw payload conversion.
//!
//! Every SNODAS product stores scaled integers: physical value = raw / 1000.
//! The same rule applies to every variable, including the sub-centimetre
//! snap to zero. That snap is debatable for the melt and accumulation
//! products, whose daily values are routinely tiny, but it is kept uniform.

use snow_common::NODATA_RAW;

/// Divisor from raw integers to meters.
pub const SCALE_FACTOR: f64 = 1000.0;

/// Magnitudes below this are reported as exactly zero.
pub const ZERO_THRESHOLD: f64 = 0.01;

/// Convert one raw integer to its physical value.
///
/// The sentinel is checked on the raw integer, before scaling, so it always
/// becomes `NaN` and never collides with the zero snap.
#[inline]
pub fn convert_raw(raw: i16) -> f32 {
    if raw == NODATA_RAW {
        return f32::NAN;
    }
    let value = raw as f64 / SCALE_FACTOR;
    if value.abs() < ZERO_THRESHOLD {
        0.0
    } else {
        value as f32
    }
}

/// Decode a big-endian `i16` payload into physical values.
///
/// The caller guarantees an even length; a trailing odd byte is ignored.
pub fn decode_payload(payload: &[u8]) -> Vec<f32> {
    payload
        .chunks_exact(2)
        .map(|pair| convert_raw(i16::from_be_bytes([pair[0], pair[1]])))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_is_nan() {
        assert!(convert_raw(-9999).is_nan());
    }

    #[test]
    fn test_scaling() {
        assert_eq!(convert_raw(1500), 1.5);
        assert_eq!(convert_raw(-250), -0.25);
        assert_eq!(convert_raw(10), 0.01);
    }

    #[test]
    fn test_small_magnitudes_snap_to_zero() {
        for raw in -9..=9 {
            let v = convert_raw(raw);
            assert_eq!(v, 0.0);
            assert!(v.is_sign_positive(), "raw {raw} must give +0.0");
        }
    }

    #[test]
    fn test_decode_payload_big_endian() {
        let payload = [0x05, 0xDC, 0xD8, 0xF1, 0x00, 0x05];
        let values = decode_payload(&payload);
        assert_eq!(values.len(), 3);
        assert_eq!(values[0], 1.5);
        assert!(values[1].is_nan());
        assert_eq!(values[2], 0.0);
    }
}
