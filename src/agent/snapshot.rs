//! Builds point-in-time market snapshots from launchpad data and a spot
//! price feed.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::agent::market_data::MarketDataClient;
use crate::agent::types::{GAS_PRICE_SOL, Listing, MarketSnapshot, Sentiment};
use crate::config::CONFIG;

/// USD market cap at which a listing graduates off its bonding curve.
/// Distinct from the 85-SOL curve reserve threshold used on chain.
pub const GRADUATION_MCAP_USD: f64 = 69_000.0;

/// Narrative buckets checked in priority order; first match wins,
/// Culture is the fallback.
const NARRATIVE_KEYWORDS: &[(&str, &[&str])] = &[
    ("AI", &["ai", "gpt", "agent", "neural", "llm", "bot"]),
    ("Meme", &["pepe", "wojak", "doge", "meme", "chad", "moon"]),
    ("Animal", &["cat", "dog", "frog", "hamster", "monkey", "capy"]),
    ("Political", &["trump", "biden", "maga", "election", "president"]),
    ("Gaming", &["game", "play", "pixel", "quest", "arcade"]),
];

const FALLBACK_NARRATIVE: &str = "Culture";

#[derive(Debug, Clone)]
pub struct MarketSnapshotBuilder {
    market: MarketDataClient,
    price_client: Client,
    price_url: String,
}

impl MarketSnapshotBuilder {
    pub fn new(market: MarketDataClient) -> Self {
        let price_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            market,
            price_client,
            price_url: CONFIG.price_api_url.clone(),
        }
    }

    /// Build a fresh snapshot. The sub-fetches run concurrently and each
    /// degrades independently, so a partial upstream outage still yields
    /// a usable (if sparse) snapshot.
    pub async fn build(&self) -> MarketSnapshot {
        let (latest, king, graduated, sol_price_usd) = tokio::join!(
            self.market.fetch_latest_listings(100),
            self.market.fetch_king_of_the_hill(),
            self.market.fetch_graduated_listings(10),
            self.fetch_sol_price(),
        );

        debug!(
            "Snapshot inputs: {} latest, king={}, {} graduated, SOL=${}",
            latest.len(),
            king.is_some(),
            graduated.len(),
            sol_price_usd
        );

        let trending_narratives = rank_narratives(&latest);

        // King of the hill joins the top-gainer candidate pool.
        let mut candidates: Vec<Listing> = latest;
        if let Some(k) = king {
            if !candidates.iter().any(|l| l.mint == k.mint) {
                candidates.push(k);
            }
        }
        candidates.retain(|l| l.usd_market_cap > 0.0);
        candidates.sort_by(|a, b| {
            b.usd_market_cap
                .partial_cmp(&a.usd_market_cap)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(10);

        let sentiment = sentiment_from_avg_mcap(average_market_cap(&candidates));

        let recent_graduates: Vec<Listing> = graduated.into_iter().take(5).collect();

        MarketSnapshot {
            timestamp: Utc::now(),
            sol_price_usd,
            sentiment,
            trending_narratives,
            top_gainers: candidates,
            recent_graduates,
            gas_price_sol: GAS_PRICE_SOL,
        }
    }

    /// SOL/USD spot price; any failure yields 0.0 rather than an error.
    async fn fetch_sol_price(&self) -> f64 {
        let url = format!(
            "{}/simple/price?ids=solana&vs_currencies=usd",
            self.price_url
        );

        let json: Value = match self.price_client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.json().await {
                Ok(json) => json,
                Err(e) => {
                    warn!("Failed to decode SOL price response: {}", e);
                    return 0.0;
                }
            },
            Ok(resp) => {
                warn!("Price feed returned HTTP {}", resp.status());
                return 0.0;
            }
            Err(e) => {
                warn!("Failed to fetch SOL price: {}", e);
                return 0.0;
            }
        };

        json["solana"]["usd"].as_f64().unwrap_or(0.0)
    }
}

/// Classify a listing into a narrative bucket by case-insensitive
/// substring match over name + symbol + description, fixed priority
/// order, first match wins.
pub fn classify_narrative(listing: &Listing) -> &'static str {
    let haystack = format!(
        "{} {} {}",
        listing.name, listing.symbol, listing.description
    )
    .to_lowercase();

    for (label, keywords) in NARRATIVE_KEYWORDS {
        if keywords.iter().any(|kw| haystack.contains(kw)) {
            return label;
        }
    }
    FALLBACK_NARRATIVE
}

/// Count narrative buckets across a listing batch and return the top 5
/// labels by count descending.
pub fn rank_narratives(listings: &[Listing]) -> Vec<String> {
    let mut counts: HashMap<&'static str, usize> = HashMap::new();
    for listing in listings {
        *counts.entry(classify_narrative(listing)).or_insert(0) += 1;
    }

    let mut ranked: Vec<(&'static str, usize)> = counts.into_iter().collect();
    // Secondary order by label keeps equal counts deterministic.
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(5)
        .map(|(label, _)| label.to_string())
        .collect()
}

pub fn average_market_cap(listings: &[Listing]) -> f64 {
    if listings.is_empty() {
        return 0.0;
    }
    listings.iter().map(|l| l.usd_market_cap).sum::<f64>() / listings.len() as f64
}

/// Five-level sentiment from average top-gainer market cap. Strict
/// greater-than cascade, evaluated top-down.
pub fn sentiment_from_avg_mcap(avg: f64) -> Sentiment {
    if avg > 100_000.0 {
        Sentiment::ExtremeGreed
    } else if avg > 50_000.0 {
        Sentiment::Greed
    } else if avg > 10_000.0 {
        Sentiment::Neutral
    } else if avg > 5_000.0 {
        Sentiment::Fear
    } else {
        Sentiment::ExtremeFear
    }
}

/// How far a listing is along its USD market-cap graduation track.
pub fn graduation_progress_pct(usd_market_cap: f64) -> f64 {
    (usd_market_cap / GRADUATION_MCAP_USD * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(name: &str, symbol: &str, description: &str, mcap: f64) -> Listing {
        Listing {
            mint: format!("mint-{symbol}"),
            name: name.to_string(),
            symbol: symbol.to_string(),
            description: description.to_string(),
            image_uri: None,
            creator: "creator".to_string(),
            usd_market_cap: mcap,
            complete: false,
            created_timestamp: 0,
        }
    }

    #[test]
    fn narrative_priority_order_first_match_wins() {
        // Mentions both AI and a dog; AI is checked first.
        let l = listing("AI Dog", "AIDOG", "an ai dog agent", 100.0);
        assert_eq!(classify_narrative(&l), "AI");

        let l = listing("Doge Classic", "DOGE", "much wow", 100.0);
        assert_eq!(classify_narrative(&l), "Meme");

        let l = listing("Plain Token", "PLN", "nothing notable", 100.0);
        assert_eq!(classify_narrative(&l), "Culture");
    }

    #[test]
    fn narrative_ranking_is_count_ordered() {
        let listings = vec![
            listing("Cat One", "CAT1", "a cat", 1.0),
            listing("Cat Two", "CAT2", "another cat", 1.0),
            listing("GPT Coin", "GPT", "ai stuff", 1.0),
            listing("Plain", "PLN", "", 1.0),
        ];
        let ranked = rank_narratives(&listings);
        assert_eq!(ranked[0], "Animal");
        assert!(ranked.contains(&"AI".to_string()));
        assert!(ranked.len() <= 5);
    }

    #[test]
    fn sentiment_boundaries_are_strict() {
        assert_eq!(sentiment_from_avg_mcap(100_001.0), Sentiment::ExtremeGreed);
        assert_eq!(sentiment_from_avg_mcap(100_000.0), Sentiment::Greed);
        assert_eq!(sentiment_from_avg_mcap(50_000.0), Sentiment::Neutral);
        assert_eq!(sentiment_from_avg_mcap(10_000.0), Sentiment::Fear);
        assert_eq!(sentiment_from_avg_mcap(5_000.0), Sentiment::ExtremeFear);
        assert_eq!(sentiment_from_avg_mcap(0.0), Sentiment::ExtremeFear);
    }

    #[test]
    fn empty_top_gainers_means_extreme_fear() {
        assert_eq!(average_market_cap(&[]), 0.0);
        assert_eq!(sentiment_from_avg_mcap(average_market_cap(&[])), Sentiment::ExtremeFear);
    }

    #[test]
    fn scenario_avg_of_two_large_caps_is_extreme_greed() {
        let gainers = vec![
            listing("A", "A", "", 200_000.0),
            listing("B", "B", "", 150_000.0),
        ];
        let avg = average_market_cap(&gainers);
        assert_eq!(avg, 175_000.0);
        assert_eq!(sentiment_from_avg_mcap(avg), Sentiment::ExtremeGreed);
    }

    #[test]
    fn graduation_progress_is_clamped() {
        assert_eq!(graduation_progress_pct(0.0), 0.0);
        assert_eq!(graduation_progress_pct(34_500.0), 50.0);
        assert_eq!(graduation_progress_pct(69_000.0), 100.0);
        assert_eq!(graduation_progress_pct(200_000.0), 100.0);
    }
}
