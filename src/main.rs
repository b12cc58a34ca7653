use bridge::events::start_bridge_events_loop;
use color_eyre::Result;
use protocols::mqtt::mk_mqtt_client;

use crate::settings::read_settings;

mod bridge;
mod convert;
mod protocols;
mod settings;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    pretty_env_logger::init();

    let settings = read_settings()?;
    let mqtt_client = mk_mqtt_client(&settings).await?;

    start_bridge_events_loop(&mqtt_client, &settings);

    tokio::signal::ctrl_c().await?;

    Ok(())
}
