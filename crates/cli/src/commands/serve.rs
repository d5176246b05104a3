//! `askfolio serve`: Start the HTTP chat endpoint.

use std::path::Path;

use super::load_config;

pub async fn run(
    config_path: Option<&Path>,
    host_override: Option<String>,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(config_path)?;

    if let Some(host) = host_override {
        config.gateway.host = host;
    }
    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("askfolio gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Chat:      POST http://{}:{}/api/chat", config.gateway.host, config.gateway.port);
    println!("   Model:     {} ({})", config.provider.model, config.provider.name);
    if !config.has_api_key() {
        println!("   Warning:   no API key configured, chat requests will fail");
    }

    askfolio_gateway::start(config).await?;

    Ok(())
}
