use std::time::{Duration, Instant};

use crate::{convert, settings::BridgeSettings};

use super::payload::CombinedPayload;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attribute {
    Brightness,
    ColorTemp,
}

impl Attribute {
    pub fn from_topic_segment(segment: &str) -> Option<Self> {
        match segment {
            "brightness" => Some(Self::Brightness),
            "color_temp" => Some(Self::ColorTemp),
            _ => None,
        }
    }

    pub fn topic_segment(&self) -> &'static str {
        match self {
            Self::Brightness => "brightness",
            Self::ColorTemp => "color_temp",
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct AttributeSample {
    value: f64,
    received_at: Instant,
}

/// Process-wide combine behaviour, fixed at startup.
#[derive(Clone, Debug)]
pub struct CombinePolicy {
    pub combine_threshold: Duration,
    pub suppress_color_temp_when_off: bool,
    pub convert_units: bool,
    pub max_raw_brightness: f64,
}

impl CombinePolicy {
    pub fn from_settings(settings: &BridgeSettings) -> Self {
        Self {
            combine_threshold: Duration::from_secs_f64(settings.combine_threshold_seconds),
            suppress_color_temp_when_off: settings.suppress_color_temp_when_off,
            convert_units: settings.convert_units,
            max_raw_brightness: settings.max_raw_brightness,
        }
    }
}

/// Per-bulb debounce state.
///
/// Every accepted update immediately re-snapshots the bulb and produces a
/// combined payload; the combine threshold only decides which previously
/// seen attributes are still fresh enough to ride along. There is no
/// timer-delayed batching, and staleness is only ever evaluated when the
/// next update for the same bulb arrives.
#[derive(Debug, Default)]
pub struct BulbState {
    brightness: Option<AttributeSample>,
    color_temp: Option<AttributeSample>,

    /// Set when a color temp arrives while the bulb is off (brightness zero
    /// or unknown). The bulb ignores color commands while off, so the value
    /// is kept past its normal expiry until the bulb is turned back on.
    color_temp_held_while_off: bool,
}

impl BulbState {
    /// Record a single-attribute update and return the combined snapshot to
    /// publish, if there is anything left to publish after purging stale
    /// samples and applying suppression.
    pub fn apply_update(
        &mut self,
        policy: &CombinePolicy,
        attribute: Attribute,
        value: f64,
        now: Instant,
    ) -> Option<CombinedPayload> {
        let sample = AttributeSample {
            value,
            received_at: now,
        };

        match attribute {
            Attribute::Brightness => {
                self.brightness = Some(sample);

                // Purge before releasing a held color temp so that the value
                // set while the bulb was off still makes it into the payload
                // that turns the bulb on. It expires normally afterwards.
                self.purge_stale(policy, now);

                if value > 0.0 {
                    self.color_temp_held_while_off = false;
                }
            }
            Attribute::ColorTemp => {
                self.color_temp = Some(sample);

                if self.brightness.map_or(true, |b| b.value == 0.0) {
                    self.color_temp_held_while_off = true;
                }

                self.purge_stale(policy, now);
            }
        }

        let payload = self.snapshot(policy);
        (!payload.is_empty()).then_some(payload)
    }

    fn purge_stale(&mut self, policy: &CombinePolicy, now: Instant) {
        let expired = |sample: AttributeSample| {
            now.duration_since(sample.received_at) > policy.combine_threshold
        };

        if self.brightness.is_some_and(expired) {
            self.brightness = None;
        }

        if self.color_temp.is_some_and(expired) {
            if self.color_temp_held_while_off {
                if let Some(sample) = self.color_temp.as_mut() {
                    sample.received_at = now;
                }
            } else {
                self.color_temp = None;
            }
        }
    }

    fn snapshot(&self, policy: &CombinePolicy) -> CombinedPayload {
        let mut payload = CombinedPayload::default();

        if let Some(sample) = self.brightness {
            payload.brightness = Some(if policy.convert_units {
                convert::raw_to_percent(sample.value, policy.max_raw_brightness)
            } else {
                sample.value
            });
        }

        // An unknown brightness does not count as "off" here; suppression
        // only kicks in when we have positively seen a zero brightness.
        let bulb_is_off = self.brightness.is_some_and(|b| b.value == 0.0);

        if let Some(sample) = self.color_temp {
            if !(policy.suppress_color_temp_when_off && bulb_is_off) {
                payload.color_temp = if policy.convert_units {
                    convert::scale_invert(sample.value).ok()
                } else {
                    Some(sample.value)
                };
            }
        }

        payload
    }
}
