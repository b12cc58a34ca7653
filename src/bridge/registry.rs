use std::collections::HashMap;

use super::bulb::BulbState;

/// All bulbs seen so far, keyed by the identifier segment of their topics.
///
/// Entries are created lazily on the first update for an identifier and are
/// never removed; the population is bounded by the physical installation.
#[derive(Debug, Default)]
pub struct BulbRegistry {
    bulbs: HashMap<String, BulbState>,
}

impl BulbRegistry {
    pub fn get_or_create(&mut self, id: &str) -> &mut BulbState {
        self.bulbs.entry(id.to_string()).or_default()
    }

    pub fn len(&self) -> usize {
        self.bulbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bulbs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::bridge::bulb::{Attribute, CombinePolicy};

    fn test_policy() -> CombinePolicy {
        CombinePolicy {
            combine_threshold: Duration::from_secs(1),
            suppress_color_temp_when_off: true,
            convert_units: false,
            max_raw_brightness: 254.0,
        }
    }

    #[test]
    fn should_create_one_entry_per_identifier() {
        let mut registry = BulbRegistry::default();
        assert!(registry.is_empty());

        registry.get_or_create("livingroom");
        registry.get_or_create("bedroom");
        registry.get_or_create("livingroom");

        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn should_return_the_same_state_across_lookups() {
        let policy = test_policy();
        let mut registry = BulbRegistry::default();
        let t0 = Instant::now();

        registry
            .get_or_create("livingroom")
            .apply_update(&policy, Attribute::Brightness, 127.0, t0);

        // A later lookup must see the earlier brightness in its snapshot.
        let payload = registry
            .get_or_create("livingroom")
            .apply_update(
                &policy,
                Attribute::ColorTemp,
                370.0,
                t0 + Duration::from_millis(500),
            )
            .unwrap();

        assert_eq!(payload.brightness, Some(127.0));
        assert_eq!(payload.color_temp, Some(370.0));
    }
}
