use serde::Deserialize;

#[derive(Clone, Deserialize, Debug)]
pub struct MqttSettings {
    pub id: String,
    pub host: String,
    pub port: u16,
    pub keepalive_seconds: u64,
    pub qos: u8,
    pub retain: bool,
}

#[derive(Clone, Deserialize, Debug)]
pub struct BridgeSettings {
    pub subscribe_prefix: String,
    pub device_prefix: String,
    pub combine_threshold_seconds: f64,
    pub convert_units: bool,
    pub suppress_color_temp_when_off: bool,
    pub max_raw_brightness: f64,
    pub report_status: bool,
    pub status_topic: String,
}

#[derive(Clone, Deserialize, Debug)]
pub struct Settings {
    pub mqtt: MqttSettings,
    pub bridge: BridgeSettings,
}

pub fn read_settings() -> Result<Settings, config::ConfigError> {
    config::Config::builder()
        .add_source(config::File::with_name("Settings"))
        .build()?
        .try_deserialize::<Settings>()
}
