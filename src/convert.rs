//! Unit conversions between zigbee2mqtt's raw bulb values and
//! human-friendly units (percent brightness, Kelvin color temperature).

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConvertError {
    #[error("reciprocal conversion received a zero input")]
    DivisionByZero,
}

/// Mireds to Kelvin (and back, the scale is its own inverse): `1_000_000 / x`.
///
/// Callers must never pass zero. Zigbee bulbs never report a zero mired
/// value in practice, but inbound payloads are client-controlled.
pub fn scale_invert(x: f64) -> Result<f64, ConvertError> {
    if x == 0.0 {
        return Err(ConvertError::DivisionByZero);
    }

    Ok(1_000_000.0 / x)
}

pub fn raw_to_percent(raw: f64, max_raw: f64) -> f64 {
    (raw / max_raw) * 100.0
}

pub fn percent_to_raw(percent: f64, max_raw: f64) -> f64 {
    (percent / 100.0) * max_raw
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_RAW: f64 = 254.0;

    #[test]
    fn should_invert_mireds_to_kelvin() {
        assert_eq!(scale_invert(370.0).unwrap().round(), 2703.0);
        assert_eq!(scale_invert(250.0).unwrap(), 4000.0);
    }

    #[test]
    fn should_fail_scale_inversion_on_zero() {
        assert_eq!(scale_invert(0.0), Err(ConvertError::DivisionByZero));
    }

    #[test]
    fn should_roundtrip_scale_inversion() {
        for v in [1.0, 153.0, 370.0, 500.0, 6500.0] {
            let there_and_back = scale_invert(scale_invert(v).unwrap()).unwrap();
            assert!((there_and_back - v).abs() < 1e-9);
        }
    }

    #[test]
    fn should_map_raw_brightness_to_percent() {
        assert_eq!(raw_to_percent(0.0, MAX_RAW), 0.0);
        assert_eq!(raw_to_percent(127.0, MAX_RAW), 50.0);
        assert_eq!(raw_to_percent(254.0, MAX_RAW), 100.0);
    }

    #[test]
    fn should_roundtrip_percent_and_raw() {
        for raw in 0..=254 {
            let raw = f64::from(raw);
            let there_and_back = percent_to_raw(raw_to_percent(raw, MAX_RAW), MAX_RAW);
            assert!((there_and_back - raw).abs() < 1e-9);
        }
    }
}
