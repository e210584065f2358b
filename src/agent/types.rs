//! Shared data model for the launchpad agent: configuration, state,
//! market structures and the advisory oracle response shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::CONFIG;

/// Activity log is bounded to this many entries, newest first.
pub const LOG_CAP: usize = 500;

/// Every generated idea suggests the same fixed total supply.
pub const DEFAULT_TOKEN_SUPPLY: u64 = 1_000_000_000;

/// Flat per-transaction gas estimate carried on each snapshot.
pub const GAS_PRICE_SOL: f64 = 0.000005;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Market data error: {0}")]
    Market(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    Manual,
    SemiAuto,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTolerance {
    Conservative,
    Balanced,
    Aggressive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenCategory {
    Meme,
    Ai,
    Animal,
    Political,
    Gaming,
    Celebrity,
    Sports,
    Tech,
    Culture,
}

impl TokenCategory {
    /// Lenient parse for oracle-supplied category labels.
    pub fn from_label(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "ai" => Self::Ai,
            "animal" => Self::Animal,
            "political" => Self::Political,
            "gaming" => Self::Gaming,
            "celebrity" => Self::Celebrity,
            "sports" => Self::Sports,
            "tech" => Self::Tech,
            "culture" => Self::Culture,
            _ => Self::Meme,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    ExtremeFear,
    Fear,
    Neutral,
    Greed,
    ExtremeGreed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    Idea,
    Approved,
    Deploying,
    Live,
    Monitoring,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentPhase {
    Idle,
    Scan,
    Analyze,
    Generate,
    Deploy,
    Monitor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Success,
    Ai,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentAction {
    Generate,
    Deploy,
    Hold,
    Exit,
    Wait,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Momentum {
    Rising,
    Peaking,
    Declining,
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleRecommendation {
    Launch,
    Wait,
    Avoid,
}

/// Agent operating configuration. Mutated only through a merge update;
/// replaced wholesale on reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub mode: OperatingMode,
    pub risk_tolerance: RiskTolerance,
    /// Maximum SOL the deploy phase may commit to an initial buy.
    pub max_budget_sol: f64,
    pub autonomous: bool,
    pub scan_interval_ms: u64,
    pub target_categories: Vec<TokenCategory>,
    pub min_viral_score: u8,
    pub min_overall_score: u8,
    pub max_concurrent_tokens: usize,
    pub rpc_url: String,
    /// Empty string means no wallet; deploy is refused.
    pub wallet_pubkey: String,
}

impl AgentConfig {
    pub fn defaults() -> Self {
        Self {
            mode: OperatingMode::Manual,
            risk_tolerance: RiskTolerance::Balanced,
            max_budget_sol: 0.5,
            autonomous: false,
            scan_interval_ms: 60_000,
            target_categories: vec![
                TokenCategory::Meme,
                TokenCategory::Ai,
                TokenCategory::Animal,
            ],
            min_viral_score: 60,
            min_overall_score: 65,
            max_concurrent_tokens: 3,
            rpc_url: CONFIG.rpc_url.clone(),
            wallet_pubkey: CONFIG.wallet_pubkey.clone(),
        }
    }
}

/// Partial configuration update; only present fields are applied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfigPatch {
    pub mode: Option<OperatingMode>,
    pub risk_tolerance: Option<RiskTolerance>,
    pub max_budget_sol: Option<f64>,
    pub autonomous: Option<bool>,
    pub scan_interval_ms: Option<u64>,
    pub target_categories: Option<Vec<TokenCategory>>,
    pub min_viral_score: Option<u8>,
    pub min_overall_score: Option<u8>,
    pub max_concurrent_tokens: Option<usize>,
    pub rpc_url: Option<String>,
    pub wallet_pubkey: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentLogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub module: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A token/coin record from the launchpad catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub mint: String,
    pub name: String,
    pub symbol: String,
    pub description: String,
    pub image_uri: Option<String>,
    pub creator: String,
    pub usd_market_cap: f64,
    pub complete: bool,
    pub created_timestamp: i64,
}

/// A single trade against a listing's bonding curve, amounts in SOL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub signature: String,
    pub mint: String,
    pub is_buy: bool,
    pub sol_amount: f64,
    pub user: String,
    pub timestamp: i64,
}

/// Stateless aggregate over one batch of trades.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeAnalysis {
    pub total_buys: usize,
    pub total_sells: usize,
    pub buy_volume: f64,
    pub sell_volume: f64,
    pub net_flow: f64,
    pub unique_buyers: usize,
    pub unique_sellers: usize,
    pub avg_buy_size: f64,
    pub avg_sell_size: f64,
    pub buy_pressure: f64,
    pub is_whale_activity: bool,
    pub largest_trade: f64,
}

/// Immutable point-in-time market summary produced by each scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub timestamp: DateTime<Utc>,
    pub sol_price_usd: f64,
    pub sentiment: Sentiment,
    pub trending_narratives: Vec<String>,
    pub top_gainers: Vec<Listing>,
    pub recent_graduates: Vec<Listing>,
    pub gas_price_sol: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenIdea {
    pub id: String,
    pub name: String,
    pub ticker: String,
    pub description: String,
    pub narrative: String,
    pub image_prompt: String,
    pub category: TokenCategory,
    pub viral_score: u8,
    pub risk_score: u8,
    pub timing_score: u8,
    /// Composite of the three sub-scores; always computed locally.
    pub overall_score: u8,
    pub reasoning: String,
    pub suggested_supply: u64,
    pub created_at: DateTime<Utc>,
    pub status: TokenStatus,
}

/// An idea that made it on chain, plus live metadata. The current deploy
/// phase never constructs one of these; an external signer completes the
/// transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployedToken {
    pub idea: TokenIdea,
    pub mint_address: String,
    pub bonding_curve_address: String,
    pub deployed_at: DateTime<Utc>,
    pub initial_buy_sol: f64,
    pub market_cap_usd: f64,
    pub status: TokenStatus,
}

/// The whole of the agent's in-memory state. Lives for the process
/// lifetime; replaced wholesale on reset.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentState {
    pub running: bool,
    pub phase: AgentPhase,
    pub config: AgentConfig,
    pub ideas: Vec<TokenIdea>,
    pub deployed_tokens: Vec<DeployedToken>,
    pub sessions_completed: u64,
    pub last_scan: Option<DateTime<Utc>>,
    pub last_snapshot: Option<MarketSnapshot>,
    pub logs: Vec<AgentLogEntry>,
}

impl AgentState {
    pub fn defaults() -> Self {
        Self {
            running: false,
            phase: AgentPhase::Idle,
            config: AgentConfig::defaults(),
            ideas: Vec::new(),
            deployed_tokens: Vec::new(),
            sessions_completed: 0,
            last_scan: None,
            last_snapshot: None,
            logs: Vec::new(),
        }
    }
}

/// Market-condition decision from the advisory oracle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiDecision {
    pub action: AgentAction,
    pub confidence: u8,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_narrative: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeAnalysis {
    pub strength: u8,
    pub momentum: Momentum,
    pub saturation: u8,
    pub recommendation: OracleRecommendation,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenEvaluation {
    pub mint: String,
    pub symbol: String,
    pub viral_score: u8,
    pub risk_score: u8,
    pub timing_score: u8,
    pub narrative_strength: u8,
    pub uniqueness: u8,
    pub overall_score: u8,
    pub recommendation: OracleRecommendation,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitAdvice {
    pub should_exit: bool,
    pub exit_percentage: u8,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_target: Option<f64>,
}
