use std::{collections::VecDeque, sync::Arc, time::Duration};

use color_eyre::Result;
use eyre::eyre;
use log::{debug, error, info};
use rumqttc::{AsyncClient, LastWill, MqttOptions, QoS};
use tokio::{
    sync::{Notify, RwLock},
    task,
};

use crate::{bridge::events::Command, settings::Settings};

/// A publish received from the broker, queued for the bridge loop.
#[derive(Debug)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

#[derive(Clone)]
pub struct MqttClient {
    pub client: AsyncClient,
    pub unhandled_messages: Arc<RwLock<VecDeque<InboundMessage>>>,
    pub notify: Arc<Notify>,
}

pub fn qos_from_level(level: u8) -> Result<QoS> {
    match level {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        _ => Err(eyre!("Invalid QoS level in settings: {}", level)),
    }
}

pub async fn mk_mqtt_client(settings: &Settings) -> Result<MqttClient> {
    // Fail fast on an unusable QoS setting instead of at first publish.
    qos_from_level(settings.mqtt.qos)?;

    let mut options = MqttOptions::new(
        settings.mqtt.id.clone(),
        settings.mqtt.host.clone(),
        settings.mqtt.port,
    );
    options.set_keep_alive(Duration::from_secs(settings.mqtt.keepalive_seconds));

    if settings.bridge.report_status {
        // The broker announces our death for us if the connection drops
        // without a clean disconnect.
        options.set_last_will(LastWill::new(
            &settings.bridge.status_topic,
            "offline",
            QoS::AtLeastOnce,
            true,
        ));
    }

    let (client, mut eventloop) = AsyncClient::new(options, 10);

    let mqtt_client = MqttClient {
        client,
        unhandled_messages: Default::default(),
        notify: Arc::new(Notify::new()),
    };

    {
        let mqtt_client = mqtt_client.clone();
        let settings = settings.clone();

        task::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(notification) => {
                        let result =
                            handle_incoming_mqtt_event(notification, &mqtt_client, &settings).await;

                        if let Err(e) = result {
                            error!("MQTT error: {e:?}");
                        }
                    }
                    Err(e) => {
                        error!("MQTT connection error, retrying in 5 seconds... {e:?}");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        });
    }

    Ok(mqtt_client)
}

async fn handle_incoming_mqtt_event(
    event: rumqttc::Event,
    mqtt_client: &MqttClient,
    settings: &Settings,
) -> Result<()> {
    match event {
        rumqttc::Event::Incoming(rumqttc::Packet::ConnAck(_)) => {
            info!("Connected to MQTT broker at {}", settings.mqtt.host);

            // (Re)subscribe on every ConnAck so a broker reconnect restores
            // our subscriptions.
            subscribe_bridge_topics(mqtt_client, settings).await?;

            if settings.bridge.report_status {
                mqtt_client
                    .client
                    .publish(
                        settings.bridge.status_topic.clone(),
                        QoS::AtLeastOnce,
                        true,
                        "online",
                    )
                    .await?;
            }
        }
        rumqttc::Event::Incoming(rumqttc::Packet::Publish(msg)) => {
            debug!("Received message on {}", msg.topic);

            {
                let mut unhandled_messages = mqtt_client.unhandled_messages.write().await;
                unhandled_messages.push_back(InboundMessage {
                    topic: msg.topic.clone(),
                    payload: msg.payload.to_vec(),
                });
            }

            // Notify the bridge loop that there are new messages
            mqtt_client.notify.notify_one();
        }
        _ => {}
    }

    Ok(())
}

async fn subscribe_bridge_topics(mqtt_client: &MqttClient, settings: &Settings) -> Result<()> {
    let prefix = &settings.bridge.subscribe_prefix;

    mqtt_client
        .client
        .subscribe(format!("{prefix}/+/set/brightness"), QoS::AtMostOnce)
        .await?;
    mqtt_client
        .client
        .subscribe(format!("{prefix}/+/set/color_temp"), QoS::AtMostOnce)
        .await?;

    // In conversion mode we also watch the bulbs' own status reports so
    // they can be republished in human-friendly units.
    if settings.bridge.convert_units {
        let device_prefix = &settings.bridge.device_prefix;

        mqtt_client
            .client
            .subscribe(format!("{device_prefix}/+/brightness"), QoS::AtMostOnce)
            .await?;
        mqtt_client
            .client
            .subscribe(format!("{device_prefix}/+/color_temp"), QoS::AtMostOnce)
            .await?;
    }

    Ok(())
}

pub async fn publish_command(
    mqtt_client: &MqttClient,
    settings: &Settings,
    command: &Command,
) -> Result<()> {
    let qos = qos_from_level(settings.mqtt.qos)?;

    mqtt_client
        .client
        .publish(
            command.topic.clone(),
            qos,
            settings.mqtt.retain,
            command.payload.clone(),
        )
        .await?;

    Ok(())
}
