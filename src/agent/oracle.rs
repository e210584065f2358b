//! Advisory oracle: typed queries against a hosted LLM.
//!
//! Every query is a single structured-output round trip. The oracle is
//! treated as an unreliable advisor: any transport or parse failure
//! degrades to a deterministic, conservative fallback so the orchestrator
//! can always proceed. Composite scores are computed locally and never
//! trusted from the model.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::warn;
use uuid::Uuid;

use crate::agent::snapshot::graduation_progress_pct;
use crate::agent::types::{
    AgentAction, AgentError, AiDecision, DEFAULT_TOKEN_SUPPLY, ExitAdvice, Listing,
    MarketSnapshot, Momentum, NarrativeAnalysis, OracleRecommendation, TokenCategory,
    TokenEvaluation, TokenIdea, TokenStatus, TradeAnalysis,
};
use crate::config::CONFIG;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Weighted composite for token evaluation:
/// 0.30 viral + 0.20 timing + 0.20 narrative + 0.15 uniqueness + 0.15 (100 - risk).
pub fn evaluation_overall_score(
    viral: u8,
    timing: u8,
    narrative_strength: u8,
    uniqueness: u8,
    risk: u8,
) -> u8 {
    let score = 0.30 * viral as f64
        + 0.20 * timing as f64
        + 0.20 * narrative_strength as f64
        + 0.15 * uniqueness as f64
        + 0.15 * (100.0 - risk as f64);
    score.round() as u8
}

/// Weighted composite for generated ideas, intentionally a different
/// formula from `evaluation_overall_score`:
/// 0.40 viral + 0.25 (100 - risk) + 0.35 timing.
pub fn idea_overall_score(viral: u8, risk: u8, timing: u8) -> u8 {
    let score =
        0.40 * viral as f64 + 0.25 * (100.0 - risk as f64) + 0.35 * timing as f64;
    score.round() as u8
}

/// The five advisory queries. Implementations never raise; they fall back
/// to the documented conservative defaults instead.
#[async_trait]
pub trait AdvisoryOracle: Send + Sync {
    async fn analyze_market_conditions(&self, snapshot: &MarketSnapshot) -> AiDecision;

    async fn analyze_narrative(
        &self,
        narrative: &str,
        related: &[Listing],
        snapshot: &MarketSnapshot,
    ) -> NarrativeAnalysis;

    async fn evaluate_token(
        &self,
        listing: &Listing,
        trades: &TradeAnalysis,
        snapshot: &MarketSnapshot,
    ) -> TokenEvaluation;

    async fn generate_token_ideas(
        &self,
        snapshot: &MarketSnapshot,
        count: u32,
    ) -> Vec<TokenIdea>;

    async fn advise_exit(
        &self,
        name: &str,
        current_mcap: f64,
        initial_investment: f64,
        current_value: f64,
        trades: &TradeAnalysis,
        snapshot: &MarketSnapshot,
    ) -> ExitAdvice;
}

/// Fallback decision when the oracle returns nothing usable.
pub fn decision_fallback() -> AiDecision {
    AiDecision {
        action: AgentAction::Wait,
        confidence: 0,
        reasoning: "Failed to analyze market conditions".to_string(),
        target_narrative: None,
        suggested_count: None,
    }
}

pub fn narrative_fallback() -> NarrativeAnalysis {
    NarrativeAnalysis {
        strength: 0,
        momentum: Momentum::Dead,
        saturation: 100,
        recommendation: OracleRecommendation::Avoid,
        reasoning: "Failed to analyze narrative".to_string(),
    }
}

pub fn evaluation_fallback(listing: &Listing) -> TokenEvaluation {
    TokenEvaluation {
        mint: listing.mint.clone(),
        symbol: listing.symbol.clone(),
        viral_score: 0,
        risk_score: 100,
        timing_score: 0,
        narrative_strength: 0,
        uniqueness: 0,
        overall_score: 0,
        recommendation: OracleRecommendation::Avoid,
        reasoning: "Failed to evaluate token".to_string(),
    }
}

/// Without oracle advice, exit once unrealized PnL exceeds 200%.
pub fn exit_fallback(initial_investment: f64, current_value: f64) -> ExitAdvice {
    let pnl_pct = if initial_investment > 0.0 {
        (current_value - initial_investment) / initial_investment * 100.0
    } else {
        0.0
    };

    ExitAdvice {
        should_exit: pnl_pct > 200.0,
        exit_percentage: 100,
        reasoning: format!("Fallback exit rule: unrealized PnL {:.1}%", pnl_pct),
        price_target: None,
    }
}

/// OpenAI-backed oracle using JSON-mode chat completions.
pub struct OpenAiOracle {
    client: Client,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiOracle {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key: CONFIG.openai_api_key.clone(),
            model: CONFIG.openai_model.clone(),
            temperature: 0.7,
        }
    }

    /// One chat-completions round trip; the content must parse as JSON.
    async fn query(&self, system_prompt: &str, user_prompt: &str) -> Result<Value, AgentError> {
        if self.api_key.is_empty() {
            return Err(AgentError::Oracle("No OpenAI API key configured".to_string()));
        }

        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt }
            ],
            "temperature": self.temperature,
            "response_format": { "type": "json_object" }
        });

        let response = self
            .client
            .post(OPENAI_CHAT_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Oracle(format!(
                "OpenAI API error {}: {}",
                status, body
            )));
        }

        let json: Value = response.json().await?;
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AgentError::Oracle("No content in response".to_string()))?;

        Ok(serde_json::from_str(content)?)
    }

    fn snapshot_summary(snapshot: &MarketSnapshot) -> String {
        let gainers: Vec<String> = snapshot
            .top_gainers
            .iter()
            .map(|l| {
                format!(
                    "{} ({}): ${:.0} mcap, {:.0}% to graduation",
                    l.name,
                    l.symbol,
                    l.usd_market_cap,
                    graduation_progress_pct(l.usd_market_cap)
                )
            })
            .collect();

        format!(
            "SOL price: ${:.2}\nSentiment: {:?}\nTrending narratives: {}\nTop gainers:\n{}\nRecent graduates: {}",
            snapshot.sol_price_usd,
            snapshot.sentiment,
            snapshot.trending_narratives.join(", "),
            gainers.join("\n"),
            snapshot
                .recent_graduates
                .iter()
                .map(|l| l.symbol.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        )
    }

    fn trade_summary(trades: &TradeAnalysis) -> String {
        format!(
            "buys {} / sells {}, buy volume {:.2} SOL, sell volume {:.2} SOL, net flow {:.2} SOL, buy pressure {:.0}%, whale activity {}, largest trade {:.2} SOL",
            trades.total_buys,
            trades.total_sells,
            trades.buy_volume,
            trades.sell_volume,
            trades.net_flow,
            trades.buy_pressure,
            trades.is_whale_activity,
            trades.largest_trade,
        )
    }
}

impl Default for OpenAiOracle {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_score(value: &Value) -> u8 {
    value.as_f64().unwrap_or(0.0).clamp(0.0, 100.0).round() as u8
}

fn parse_recommendation(value: &Value) -> OracleRecommendation {
    match value.as_str() {
        Some("launch") => OracleRecommendation::Launch,
        Some("wait") => OracleRecommendation::Wait,
        _ => OracleRecommendation::Avoid,
    }
}

#[async_trait]
impl AdvisoryOracle for OpenAiOracle {
    async fn analyze_market_conditions(&self, snapshot: &MarketSnapshot) -> AiDecision {
        let system = "You are the decision module of a memecoin launchpad agent. \
                      Answer strictly in JSON with keys: action (one of generate, deploy, \
                      hold, exit, wait), confidence (0-100), reasoning (string), \
                      targetNarrative (string or null), suggestedCount (number or null).";
        let user = format!(
            "Given this market snapshot, decide the agent's next action.\n\n{}",
            Self::snapshot_summary(snapshot)
        );

        let json = match self.query(system, &user).await {
            Ok(json) => json,
            Err(e) => {
                warn!("Market-condition query failed: {}", e);
                return decision_fallback();
            }
        };

        let action = match json["action"].as_str() {
            Some("generate") => AgentAction::Generate,
            Some("deploy") => AgentAction::Deploy,
            Some("hold") => AgentAction::Hold,
            Some("exit") => AgentAction::Exit,
            Some("wait") => AgentAction::Wait,
            other => {
                warn!("Unrecognized oracle action {:?}, treating as wait", other);
                AgentAction::Wait
            }
        };

        AiDecision {
            action,
            confidence: clamp_score(&json["confidence"]),
            reasoning: json["reasoning"].as_str().unwrap_or("").to_string(),
            target_narrative: json["targetNarrative"].as_str().map(String::from),
            suggested_count: json["suggestedCount"].as_u64().map(|n| n as u32),
        }
    }

    async fn analyze_narrative(
        &self,
        narrative: &str,
        related: &[Listing],
        snapshot: &MarketSnapshot,
    ) -> NarrativeAnalysis {
        let system = "You analyze memecoin narratives. Answer strictly in JSON with keys: \
                      strength (0-100), momentum (rising|peaking|declining|dead), \
                      saturation (0-100), recommendation (launch|wait|avoid), reasoning.";
        let related_lines: Vec<String> = related
            .iter()
            .take(10)
            .map(|l| format!("{} ({}): ${:.0} mcap", l.name, l.symbol, l.usd_market_cap))
            .collect();
        let user = format!(
            "Narrative: {}\nRelated listings:\n{}\n\nMarket context:\n{}",
            narrative,
            related_lines.join("\n"),
            Self::snapshot_summary(snapshot)
        );

        let json = match self.query(system, &user).await {
            Ok(json) => json,
            Err(e) => {
                warn!("Narrative query failed for '{}': {}", narrative, e);
                return narrative_fallback();
            }
        };

        let momentum = match json["momentum"].as_str() {
            Some("rising") => Momentum::Rising,
            Some("peaking") => Momentum::Peaking,
            Some("declining") => Momentum::Declining,
            _ => Momentum::Dead,
        };

        NarrativeAnalysis {
            strength: clamp_score(&json["strength"]),
            momentum,
            saturation: clamp_score(&json["saturation"]),
            recommendation: parse_recommendation(&json["recommendation"]),
            reasoning: json["reasoning"].as_str().unwrap_or("").to_string(),
        }
    }

    async fn evaluate_token(
        &self,
        listing: &Listing,
        trades: &TradeAnalysis,
        snapshot: &MarketSnapshot,
    ) -> TokenEvaluation {
        let system = "You evaluate memecoin listings. Answer strictly in JSON with keys: \
                      viralScore, riskScore, timingScore, narrativeStrength, uniqueness \
                      (all 0-100), recommendation (launch|wait|avoid), reasoning.";
        let user = format!(
            "Listing: {} ({})\nDescription: {}\nMarket cap: ${:.0}\nTrade flow: {}\n\nMarket context:\n{}",
            listing.name,
            listing.symbol,
            listing.description,
            listing.usd_market_cap,
            Self::trade_summary(trades),
            Self::snapshot_summary(snapshot)
        );

        let json = match self.query(system, &user).await {
            Ok(json) => json,
            Err(e) => {
                warn!("Evaluation query failed for {}: {}", listing.symbol, e);
                return evaluation_fallback(listing);
            }
        };

        let viral_score = clamp_score(&json["viralScore"]);
        let risk_score = clamp_score(&json["riskScore"]);
        let timing_score = clamp_score(&json["timingScore"]);
        let narrative_strength = clamp_score(&json["narrativeStrength"]);
        let uniqueness = clamp_score(&json["uniqueness"]);

        TokenEvaluation {
            mint: listing.mint.clone(),
            symbol: listing.symbol.clone(),
            viral_score,
            risk_score,
            timing_score,
            narrative_strength,
            uniqueness,
            overall_score: evaluation_overall_score(
                viral_score,
                timing_score,
                narrative_strength,
                uniqueness,
                risk_score,
            ),
            recommendation: parse_recommendation(&json["recommendation"]),
            reasoning: json["reasoning"].as_str().unwrap_or("").to_string(),
        }
    }

    async fn generate_token_ideas(
        &self,
        snapshot: &MarketSnapshot,
        count: u32,
    ) -> Vec<TokenIdea> {
        let system = "You invent speculative memecoin concepts. Answer strictly in JSON: \
                      {\"ideas\": [{\"name\", \"ticker\", \"description\", \"narrative\", \
                      \"imagePrompt\", \"category\", \"viralScore\", \"riskScore\", \
                      \"timingScore\", \"reasoning\"}]}. Scores 0-100. Category one of: \
                      meme, ai, animal, political, gaming, celebrity, sports, tech, culture.";
        let user = format!(
            "Generate exactly {} token ideas that fit the current market.\n\n{}",
            count,
            Self::snapshot_summary(snapshot)
        );

        let json = match self.query(system, &user).await {
            Ok(json) => json,
            Err(e) => {
                warn!("Idea-generation query failed: {}", e);
                return Vec::new();
            }
        };

        let items = match json["ideas"].as_array() {
            Some(items) => items.clone(),
            None => {
                warn!("Idea-generation response had no ideas array");
                return Vec::new();
            }
        };

        items
            .iter()
            .take(count as usize)
            .map(|item| {
                let viral_score = clamp_score(&item["viralScore"]);
                let risk_score = clamp_score(&item["riskScore"]);
                let timing_score = clamp_score(&item["timingScore"]);

                TokenIdea {
                    id: Uuid::new_v4().to_string(),
                    name: item["name"].as_str().unwrap_or("Unnamed").to_string(),
                    ticker: item["ticker"].as_str().unwrap_or("").to_uppercase(),
                    description: item["description"].as_str().unwrap_or("").to_string(),
                    narrative: item["narrative"].as_str().unwrap_or("").to_string(),
                    image_prompt: item["imagePrompt"].as_str().unwrap_or("").to_string(),
                    category: TokenCategory::from_label(
                        item["category"].as_str().unwrap_or("meme"),
                    ),
                    viral_score,
                    risk_score,
                    timing_score,
                    overall_score: idea_overall_score(viral_score, risk_score, timing_score),
                    reasoning: item["reasoning"].as_str().unwrap_or("").to_string(),
                    suggested_supply: DEFAULT_TOKEN_SUPPLY,
                    created_at: Utc::now(),
                    status: TokenStatus::Idea,
                }
            })
            .collect()
    }

    async fn advise_exit(
        &self,
        name: &str,
        current_mcap: f64,
        initial_investment: f64,
        current_value: f64,
        trades: &TradeAnalysis,
        snapshot: &MarketSnapshot,
    ) -> ExitAdvice {
        let system = "You advise on memecoin exit strategy. Answer strictly in JSON with \
                      keys: shouldExit (bool), exitPercentage (0-100), reasoning, \
                      priceTarget (number or null).";
        let user = format!(
            "Position: {}\nCurrent market cap: ${:.0}\nInitial investment: {:.3} SOL\nCurrent value: {:.3} SOL\nTrade flow: {}\n\nMarket context:\n{}",
            name,
            current_mcap,
            initial_investment,
            current_value,
            Self::trade_summary(trades),
            Self::snapshot_summary(snapshot)
        );

        let json = match self.query(system, &user).await {
            Ok(json) => json,
            Err(e) => {
                warn!("Exit-advice query failed for {}: {}", name, e);
                return exit_fallback(initial_investment, current_value);
            }
        };

        ExitAdvice {
            should_exit: json["shouldExit"].as_bool().unwrap_or(false),
            exit_percentage: clamp_score(&json["exitPercentage"]),
            reasoning: json["reasoning"].as_str().unwrap_or("").to_string(),
            price_target: json["priceTarget"].as_f64(),
        }
    }
}
