//! Configuration module for environment variables and application settings

use std::env;
use once_cell::sync::Lazy;

/// Global application configuration loaded from environment variables
pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);

#[derive(Debug, Clone)]
pub struct Config {
    /// OpenAI API key for advisory oracle calls
    pub openai_api_key: String,

    /// OpenAI model used by the oracle and the chat surface
    pub openai_model: String,

    /// Launchpad REST API base URL
    pub pump_api_url: String,

    /// Spot price feed base URL
    pub price_api_url: String,

    /// Solana JSON-RPC endpoint
    pub rpc_url: String,

    /// Agent wallet public key; empty disables deploy
    pub wallet_pubkey: String,

    /// Server configuration
    pub server: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables. Every key has a
    /// default so the server can boot in a bare environment; an empty
    /// OpenAI key degrades the oracle to its fallback answers.
    pub fn from_env() -> Self {
        Self {
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),

            openai_model: env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),

            pump_api_url: env::var("PUMP_API_URL")
                .unwrap_or_else(|_| "https://frontend-api.pump.fun".to_string()),

            price_api_url: env::var("PRICE_API_URL")
                .unwrap_or_else(|_| "https://api.coingecko.com/api/v3".to_string()),

            rpc_url: env::var("SOLANA_RPC_URL")
                .unwrap_or_else(|_| "https://api.mainnet-beta.solana.com".to_string()),

            wallet_pubkey: env::var("AGENT_WALLET_PUBKEY").unwrap_or_default(),

            server: ServerConfig {
                host: env::var("SERVER_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
            },
        }
    }
}
