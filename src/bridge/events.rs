use std::time::Instant;

use color_eyre::Result;
use log::{info, warn};

use crate::{
    convert::{self, ConvertError},
    protocols::mqtt::{publish_command, InboundMessage, MqttClient},
    settings::Settings,
};

use super::{
    bulb::{Attribute, CombinePolicy},
    registry::BulbRegistry,
};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("topic does not match any recognized pattern: {0}")]
    MalformedTopic(String),

    #[error("payload is not a decimal number: {0:?}")]
    InvalidPayload(String),

    #[error(transparent)]
    Convert(#[from] ConvertError),
}

/// An outbound publish produced by the bridge.
#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    pub topic: String,
    pub payload: String,
}

enum InboundTopic<'a> {
    /// `<subscribe_prefix>/<id>/set/<attribute>` — a single-attribute update
    /// from the control namespace, feeding the debounce state machine.
    ControlSet {
        bulb_id: &'a str,
        attribute: Attribute,
    },

    /// `<device_prefix>/<id>/<attribute>` — a raw bulb status report,
    /// passed through with unit conversion only (conversion mode).
    BulbStatus {
        bulb_id: &'a str,
        attribute: Attribute,
    },
}

pub struct Bridge {
    registry: BulbRegistry,
    policy: CombinePolicy,
    subscribe_prefix: String,
    device_prefix: String,
}

impl Bridge {
    pub fn new(settings: &Settings) -> Self {
        Self {
            registry: BulbRegistry::default(),
            policy: CombinePolicy::from_settings(&settings.bridge),
            subscribe_prefix: settings.bridge.subscribe_prefix.clone(),
            device_prefix: settings.bridge.device_prefix.clone(),
        }
    }

    /// Route one inbound message to the owning bulb's state machine (or
    /// through the stateless conversion passthrough) and return the command
    /// to publish, if any. Errors leave all bulb state untouched.
    pub fn dispatch(
        &mut self,
        topic: &str,
        payload: &[u8],
        now: Instant,
    ) -> Result<Option<Command>, DispatchError> {
        let inbound = self
            .parse_topic(topic)
            .ok_or_else(|| DispatchError::MalformedTopic(topic.to_string()))?;
        let value = parse_value(payload)?;

        match inbound {
            InboundTopic::ControlSet { bulb_id, attribute } => {
                // The reciprocal conversion must never see a zero, so reject
                // it here before it is recorded anywhere.
                if attribute == Attribute::ColorTemp
                    && self.policy.convert_units
                    && value == 0.0
                {
                    return Err(ConvertError::DivisionByZero.into());
                }

                let combined = self.registry.get_or_create(bulb_id).apply_update(
                    &self.policy,
                    attribute,
                    value,
                    now,
                );

                Ok(combined.map(|payload| Command {
                    topic: format!("{}/{}/set", self.device_prefix, bulb_id),
                    payload: payload.to_wire(),
                }))
            }
            InboundTopic::BulbStatus { bulb_id, attribute } => {
                if !self.policy.convert_units {
                    return Ok(None);
                }

                let converted = match attribute {
                    Attribute::Brightness => {
                        convert::raw_to_percent(value, self.policy.max_raw_brightness)
                    }
                    Attribute::ColorTemp => convert::scale_invert(value)?,
                };

                Ok(Some(Command {
                    topic: format!(
                        "{}/{}/{}",
                        self.subscribe_prefix,
                        bulb_id,
                        attribute.topic_segment()
                    ),
                    payload: format!("{converted:.2}"),
                }))
            }
        }
    }

    fn parse_topic<'a>(&self, topic: &'a str) -> Option<InboundTopic<'a>> {
        let segments: Vec<&str> = topic.split('/').collect();

        match segments.as_slice() {
            &[prefix, bulb_id, "set", attribute] if prefix == self.subscribe_prefix => {
                Some(InboundTopic::ControlSet {
                    bulb_id,
                    attribute: Attribute::from_topic_segment(attribute)?,
                })
            }
            &[prefix, bulb_id, attribute] if prefix == self.device_prefix => {
                Some(InboundTopic::BulbStatus {
                    bulb_id,
                    attribute: Attribute::from_topic_segment(attribute)?,
                })
            }
            _ => None,
        }
    }
}

fn parse_value(payload: &[u8]) -> Result<f64, DispatchError> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| DispatchError::InvalidPayload(String::from_utf8_lossy(payload).into_owned()))?;

    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| DispatchError::InvalidPayload(text.to_string()))?;

    if !value.is_finite() {
        return Err(DispatchError::InvalidPayload(text.to_string()));
    }

    Ok(value)
}

pub fn start_bridge_events_loop(mqtt_client: &MqttClient, settings: &Settings) {
    let mqtt_client = mqtt_client.clone();
    let settings = settings.clone();
    let mut bridge = Bridge::new(&settings);

    tokio::spawn(async move {
        loop {
            let next_message = {
                let mut unhandled_messages = mqtt_client.unhandled_messages.write().await;
                unhandled_messages.pop_front()
            };

            match next_message {
                Some(message) => {
                    let result =
                        process_next_message(&mut bridge, &mqtt_client, &settings, message).await;

                    if let Err(e) = result {
                        warn!("Dropping message: {e:?}");
                    }
                }
                None => {
                    // Wait until we get notified that there are new messages.
                    mqtt_client.notify.notified().await;
                }
            }
        }
    });
}

async fn process_next_message(
    bridge: &mut Bridge,
    mqtt_client: &MqttClient,
    settings: &Settings,
    message: InboundMessage,
) -> Result<()> {
    let command = bridge.dispatch(&message.topic, &message.payload, Instant::now())?;

    if let Some(command) = command {
        info!("{} {}", command.topic, command.payload);
        publish_command(mqtt_client, settings, &command).await?;
    }

    Ok(())
}
