use clap::Parser;

use synapse_gateway::client::{
    ClientConfig, DEFAULT_GATEWAY_URL, FallbackClient, Tier, analyze_sentiment,
};
use synapse_gateway::config::settings::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use synapse_gateway::logging;

/// Ask the SYNAPSE mentor a question through the gateway, with direct and static fallbacks.
#[derive(Parser, Debug)]
#[command(name = "synapse-ask", version)]
struct Cli {
    /// Message to send
    #[arg(required = true)]
    message: Vec<String>,

    /// Gateway base URL
    #[arg(long, env = "SYNAPSE_GATEWAY_URL", default_value = DEFAULT_GATEWAY_URL)]
    gateway_url: String,

    /// Bearer token for gateways that require one
    #[arg(long, env = "SYNAPSE_GATEWAY_TOKEN", hide_env_values = true)]
    gateway_token: Option<String>,

    /// Client-side key used only when the gateway is unreachable
    #[arg(long, env = "VITE_GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Provider base URL for the direct fallback
    #[arg(long, env = "GEMINI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    provider_base_url: String,

    /// Model for the direct fallback
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Send the message as-is instead of wrapping it in the mentor prompt
    #[arg(long)]
    raw: bool,

    /// Also print the mood detected in the message
    #[arg(long)]
    mood: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    logging::init_logging();

    let cli = Cli::parse();
    let message = cli.message.join(" ");

    let client = FallbackClient::new(ClientConfig {
        gateway_url: cli.gateway_url,
        gateway_token: cli.gateway_token,
        client_api_key: cli.api_key,
        provider_base_url: cli.provider_base_url,
        model: cli.model,
        timeout_secs: cli.timeout_secs,
    })?;

    let reply = if cli.raw {
        client.generate_raw(&message).await
    } else {
        client.generate_response(&message).await
    };

    if reply.tier != Tier::Gateway {
        tracing::info!("Answered by {:?} tier", reply.tier);
    }
    if cli.mood {
        println!("[{}]", analyze_sentiment(&message));
    }
    println!("{}", reply.text);

    Ok(())
}
