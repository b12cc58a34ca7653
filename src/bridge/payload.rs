use std::fmt::Write;

/// Combined multi-attribute snapshot emitted towards a bulb's `set` topic.
///
/// zigbee2mqtt accepts a JSON object here, but the field set is fixed and
/// tiny, so the payload is built by hand rather than through a serializer:
/// field order is always {brightness, color_temp} and numbers carry exactly
/// two decimals, matching what the bulbs have always been sent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CombinedPayload {
    pub brightness: Option<f64>,
    pub color_temp: Option<f64>,
}

impl CombinedPayload {
    pub fn is_empty(&self) -> bool {
        self.brightness.is_none() && self.color_temp.is_none()
    }

    pub fn to_wire(&self) -> String {
        let mut fields = String::new();

        if let Some(brightness) = self.brightness {
            let _ = write!(fields, "\"brightness\": {brightness:.2}");
        }

        if let Some(color_temp) = self.color_temp {
            if !fields.is_empty() {
                fields.push_str(", ");
            }
            let _ = write!(fields, "\"color_temp\": {color_temp:.2}");
        }

        format!("{{{fields}}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_format_both_fields_in_fixed_order() {
        let payload = CombinedPayload {
            brightness: Some(12.0),
            color_temp: Some(370.0),
        };

        assert_eq!(
            payload.to_wire(),
            r#"{"brightness": 12.00, "color_temp": 370.00}"#
        );
    }

    #[test]
    fn should_format_single_fields() {
        let brightness_only = CombinedPayload {
            brightness: Some(0.0),
            color_temp: None,
        };
        assert_eq!(brightness_only.to_wire(), r#"{"brightness": 0.00}"#);

        let color_temp_only = CombinedPayload {
            brightness: None,
            color_temp: Some(454.5),
        };
        assert_eq!(color_temp_only.to_wire(), r#"{"color_temp": 454.50}"#);
    }

    #[test]
    fn should_emit_valid_json() {
        let payload = CombinedPayload {
            brightness: Some(99.994),
            color_temp: Some(2702.7027),
        };

        let parsed: serde_json::Value = serde_json::from_str(&payload.to_wire()).unwrap();
        assert_eq!(parsed["brightness"], 99.99);
        assert_eq!(parsed["color_temp"], 2702.70);
    }
}
