//! Client for the launchpad's public REST API.
//!
//! Every operation is a single GET; transport errors and non-success
//! statuses are recovered locally to an empty collection (or `None` for
//! single-item fetches) with a warning. No retries, no caching.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::warn;

use crate::agent::types::{AgentError, Listing, Trade};
use crate::config::CONFIG;

const LAMPORTS_PER_SOL_F64: f64 = 1_000_000_000.0;

#[derive(Debug, Clone)]
pub struct MarketDataClient {
    client: Client,
    base_url: String,
}

impl MarketDataClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: CONFIG.pump_api_url.clone(),
        }
    }

    /// Latest listings, newest first.
    pub async fn fetch_latest_listings(&self, limit: usize) -> Vec<Listing> {
        let url = format!(
            "{}/coins?offset=0&limit={}&sort=created_timestamp&order=DESC&includeNsfw=false",
            self.base_url, limit
        );
        match self.get_json(&url).await {
            Ok(json) => parse_listing_array(&json),
            Err(e) => {
                warn!("Failed to fetch latest listings: {}", e);
                Vec::new()
            }
        }
    }

    /// The listing currently closest to graduation.
    pub async fn fetch_king_of_the_hill(&self) -> Option<Listing> {
        let url = format!(
            "{}/coins/king-of-the-hill?includeNsfw=false",
            self.base_url
        );
        match self.get_json(&url).await {
            Ok(json) => parse_listing(&json),
            Err(e) => {
                warn!("Failed to fetch king of the hill: {}", e);
                None
            }
        }
    }

    pub async fn fetch_listing(&self, mint: &str) -> Option<Listing> {
        let url = format!("{}/coins/{}", self.base_url, mint);
        match self.get_json(&url).await {
            Ok(json) => parse_listing(&json),
            Err(e) => {
                warn!("Failed to fetch listing {}: {}", mint, e);
                None
            }
        }
    }

    /// Recent trades for one listing, newest first.
    pub async fn fetch_trades(&self, mint: &str, limit: usize) -> Vec<Trade> {
        let url = format!(
            "{}/trades/all/{}?limit={}&offset=0",
            self.base_url, mint, limit
        );
        match self.get_json(&url).await {
            Ok(json) => parse_trade_array(&json, mint),
            Err(e) => {
                warn!("Failed to fetch trades for {}: {}", mint, e);
                Vec::new()
            }
        }
    }

    /// Listings that completed their bonding curve, most recent first.
    pub async fn fetch_graduated_listings(&self, limit: usize) -> Vec<Listing> {
        let url = format!(
            "{}/coins?offset=0&limit={}&sort=last_trade_timestamp&order=DESC&complete=true",
            self.base_url, limit
        );
        match self.get_json(&url).await {
            Ok(json) => parse_listing_array(&json),
            Err(e) => {
                warn!("Failed to fetch graduated listings: {}", e);
                Vec::new()
            }
        }
    }

    /// Free-text search over the catalog. The query is passed as an HTTP
    /// query parameter so the client percent-encodes it (narrative
    /// searches regularly carry emoji and accents).
    pub async fn search_listings(&self, query: &str) -> Vec<Listing> {
        match self.request_json(self.search_request(query)).await {
            Ok(json) => parse_listing_array(&json),
            Err(e) => {
                warn!("Failed to search listings for '{}': {}", query, e);
                Vec::new()
            }
        }
    }

    fn search_request(&self, query: &str) -> reqwest::RequestBuilder {
        self.client.get(format!("{}/coins", self.base_url)).query(&[
            ("offset", "0"),
            ("limit", "50"),
            ("searchTerm", query),
        ])
    }

    async fn get_json(&self, url: &str) -> Result<Value, AgentError> {
        self.request_json(self.client.get(url)).await
    }

    async fn request_json(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, AgentError> {
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(AgentError::Market(format!(
                "HTTP {} from {}",
                response.status(),
                response.url()
            )));
        }

        Ok(response.json().await?)
    }
}

impl Default for MarketDataClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Coerce one upstream coin object into a `Listing`, defaulting missing
/// fields. Returns `None` only when the mint is absent.
pub(crate) fn parse_listing(json: &Value) -> Option<Listing> {
    let mint = json["mint"].as_str()?.to_string();

    Some(Listing {
        mint,
        name: json["name"].as_str().unwrap_or("").to_string(),
        symbol: json["symbol"].as_str().unwrap_or("").to_string(),
        description: json["description"].as_str().unwrap_or("").to_string(),
        image_uri: json["image_uri"].as_str().map(String::from),
        creator: json["creator"].as_str().unwrap_or("").to_string(),
        usd_market_cap: json["usd_market_cap"].as_f64().unwrap_or(0.0),
        complete: json["complete"].as_bool().unwrap_or(false),
        created_timestamp: json["created_timestamp"].as_i64().unwrap_or(0),
    })
}

fn parse_listing_array(json: &Value) -> Vec<Listing> {
    json.as_array()
        .map(|items| items.iter().filter_map(parse_listing).collect())
        .unwrap_or_default()
}

/// Coerce one upstream trade object; lamport amounts are normalized to SOL.
pub(crate) fn parse_trade(json: &Value, fallback_mint: &str) -> Option<Trade> {
    let signature = json["signature"].as_str()?.to_string();

    Some(Trade {
        signature,
        mint: json["mint"]
            .as_str()
            .unwrap_or(fallback_mint)
            .to_string(),
        is_buy: json["is_buy"].as_bool().unwrap_or(false),
        sol_amount: json["sol_amount"].as_u64().unwrap_or(0) as f64 / LAMPORTS_PER_SOL_F64,
        user: json["user"].as_str().unwrap_or("").to_string(),
        timestamp: json["timestamp"].as_i64().unwrap_or(0),
    })
}

fn parse_trade_array(json: &Value, mint: &str) -> Vec<Trade> {
    json.as_array()
        .map(|items| items.iter().filter_map(|t| parse_trade(t, mint)).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_listing_with_defaults() {
        let raw = json!({
            "mint": "AbcMint111",
            "name": "Test Coin",
            "symbol": "TEST",
            "usd_market_cap": 42_000.5,
        });
        let listing = parse_listing(&raw).expect("listing");
        assert_eq!(listing.mint, "AbcMint111");
        assert_eq!(listing.symbol, "TEST");
        assert_eq!(listing.usd_market_cap, 42_000.5);
        assert_eq!(listing.description, "");
        assert!(!listing.complete);
        assert!(listing.image_uri.is_none());
    }

    #[test]
    fn listing_without_mint_is_rejected() {
        assert!(parse_listing(&json!({ "name": "no mint" })).is_none());
    }

    #[test]
    fn trade_amounts_are_normalized_to_sol() {
        let raw = json!({
            "signature": "sig1",
            "is_buy": true,
            "sol_amount": 2_500_000_000u64,
            "user": "wallet1",
            "timestamp": 1_700_000_000,
        });
        let trade = parse_trade(&raw, "MintX").expect("trade");
        assert_eq!(trade.sol_amount, 2.5);
        assert_eq!(trade.mint, "MintX");
        assert!(trade.is_buy);
    }

    #[test]
    fn malformed_array_degrades_to_empty() {
        assert!(super::parse_listing_array(&json!({"error": "nope"})).is_empty());
        assert!(super::parse_trade_array(&json!("oops"), "m").is_empty());
    }

    #[test]
    fn search_terms_are_encoded_as_utf8_bytes() {
        let client = MarketDataClient::new();
        let request = client
            .search_request("rocket 🚀 café")
            .build()
            .expect("request");
        let url = request.url().as_str();

        // Multi-byte characters must be percent-encoded per UTF-8 byte,
        // never by codepoint.
        assert!(url.contains("%F0%9F%9A%80"), "rocket emoji in {url}");
        assert!(url.contains("caf%C3%A9"), "accented e in {url}");
        assert!(url.contains("searchTerm="));
        assert!(!url.contains('🚀'));
    }
}
