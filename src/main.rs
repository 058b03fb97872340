#![cfg(not(tarpaulin_include))]

use env_logger::Env;
use guesthouse::app;
use guesthouse::config::Config;
use log::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    info!(
        "guests tab '{}' on {:?} backend",
        config.guests_tab, config.backend
    );

    // Start the web application
    app::run(config).await?;

    Ok(())
}
