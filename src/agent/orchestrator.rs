//! Phase orchestrator for the launchpad agent.
//!
//! Holds the single in-memory `AgentState` behind a `RwLock` and exposes
//! the scan / analyze / generate / deploy / monitor phases plus the
//! full-cycle driver. Phases may be invoked in any order; the current
//! phase on the state is a label, not a transition guard. All mutation
//! goes through the lock, so concurrent deploys of the same idea cannot
//! both pass the gate.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agent::market_data::MarketDataClient;
use crate::agent::oracle::AdvisoryOracle;
use crate::agent::snapshot::MarketSnapshotBuilder;
use crate::agent::trade_flow::analyze_trade_flow;
use crate::agent::types::{
    AgentAction, AgentConfig, AgentConfigPatch, AgentError, AgentLogEntry, AgentPhase,
    AgentState, AiDecision, DeployedToken, GAS_PRICE_SOL, LOG_CAP, LogLevel, MarketSnapshot,
    NarrativeAnalysis, TokenEvaluation, TokenIdea, TokenStatus,
};
use crate::onchain::rpc::ChainReader;
use crate::onchain::tx_builder::{
    InstructionDraft, bonding_curve_address, build_buy_instruction, build_create_instruction,
    build_sell_instruction, graduation_progress,
};

/// Rough tokens-per-SOL at the start of a fresh bonding curve, used only
/// to size the draft initial buy.
const INITIAL_CURVE_TOKENS_PER_SOL: f64 = 35_000_000.0;

const TOKEN_DECIMALS_FACTOR: f64 = 1_000_000.0;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOutcome {
    pub snapshot: MarketSnapshot,
    pub decision: AiDecision,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative_analysis: Option<NarrativeAnalysis>,
    pub token_evaluations: Vec<TokenEvaluation>,
}

/// Prepared-but-unsigned deploy artifacts. Requires an external signer
/// to become a real on-chain action.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentPackage {
    pub idea_id: String,
    pub mint: String,
    pub bonding_curve: String,
    pub create_instruction: InstructionDraft,
    pub initial_buy_instruction: InstructionDraft,
    pub initial_buy_sol: f64,
    pub estimated_cost_sol: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<DeploymentPackage>,
}

impl DeployOutcome {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            package: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorReport {
    pub symbol: String,
    /// Position PnL is not computed yet; always 0.
    pub pnl: f64,
    pub should_exit: bool,
    pub reasoning: String,
    /// Bonding-curve graduation progress from on-chain lamports, 0-100.
    pub curve_progress_pct: f64,
    pub recent_tx_count: usize,
    /// Whether the newest on-chain transaction for the mint succeeded;
    /// `None` when no signatures were found or the lookup failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_tx_confirmed: Option<bool>,
    /// Unsigned sell draft, present only when an exit is advised.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_draft: Option<InstructionDraft>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleOutcome {
    pub phase: String,
    pub results: Value,
}

pub struct AgentOrchestrator {
    market: MarketDataClient,
    snapshots: MarketSnapshotBuilder,
    oracle: Arc<dyn AdvisoryOracle>,
    state: RwLock<AgentState>,
}

impl AgentOrchestrator {
    pub fn new(
        market: MarketDataClient,
        snapshots: MarketSnapshotBuilder,
        oracle: Arc<dyn AdvisoryOracle>,
    ) -> Self {
        Self {
            market,
            snapshots,
            oracle,
            state: RwLock::new(AgentState::defaults()),
        }
    }

    /// Deep copy of the current state; callers cannot mutate the
    /// canonical record through it.
    pub async fn get_state(&self) -> AgentState {
        self.state.read().await.clone()
    }

    /// Append a bounded, newest-first activity log entry.
    pub async fn log(
        &self,
        level: LogLevel,
        module: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) {
        let entry = AgentLogEntry {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            level,
            module: module.to_string(),
            message: message.into(),
            data,
        };

        let mut state = self.state.write().await;
        state.logs.insert(0, entry);
        state.logs.truncate(LOG_CAP);
    }

    async fn set_phase(&self, phase: AgentPhase) {
        self.state.write().await.phase = phase;
    }

    /// Reuse the last snapshot when one exists, otherwise build and
    /// store a fresh one.
    async fn current_snapshot(&self) -> MarketSnapshot {
        if let Some(snapshot) = self.state.read().await.last_snapshot.clone() {
            return snapshot;
        }
        let snapshot = self.snapshots.build().await;
        let mut state = self.state.write().await;
        state.last_snapshot = Some(snapshot.clone());
        snapshot
    }

    /// Scan phase: fresh snapshot plus an oracle decision. Unlike the
    /// other phases, errors here surface to the caller after logging.
    pub async fn scan(&self) -> Result<ScanOutcome, AgentError> {
        self.set_phase(AgentPhase::Scan).await;
        info!("Scan phase started");

        let snapshot = self.snapshots.build().await;
        {
            let mut state = self.state.write().await;
            state.last_snapshot = Some(snapshot.clone());
            state.last_scan = Some(Utc::now());
        }
        self.log(
            LogLevel::Info,
            "scan",
            format!(
                "Market scanned: sentiment {:?}, {} trending narratives",
                snapshot.sentiment,
                snapshot.trending_narratives.len()
            ),
            None,
        )
        .await;

        let decision = self.oracle.analyze_market_conditions(&snapshot).await;
        self.log(
            LogLevel::Ai,
            "scan",
            format!(
                "Oracle decision: {:?} ({}% confidence)",
                decision.action, decision.confidence
            ),
            Some(json!({ "reasoning": decision.reasoning })),
        )
        .await;

        Ok(ScanOutcome { snapshot, decision })
    }

    /// Analyze phase: optional narrative deep-dive plus evaluation of up
    /// to five active listings. Per-listing problems degrade to partial
    /// results.
    pub async fn analyze(&self, narrative: Option<String>) -> AnalyzeOutcome {
        self.set_phase(AgentPhase::Analyze).await;
        let snapshot = self.current_snapshot().await;

        let narrative_analysis = match narrative {
            Some(name) if !name.is_empty() => {
                let related = self.market.search_listings(&name).await;
                let analysis = self
                    .oracle
                    .analyze_narrative(&name, &related, &snapshot)
                    .await;
                self.log(
                    LogLevel::Ai,
                    "analyze",
                    format!(
                        "Narrative '{}': strength {}, momentum {:?}",
                        name, analysis.strength, analysis.momentum
                    ),
                    None,
                )
                .await;
                Some(analysis)
            }
            _ => None,
        };

        let latest = self.market.fetch_latest_listings(20).await;
        let candidates: Vec<_> = latest
            .into_iter()
            .filter(|l| l.usd_market_cap > 1_000.0)
            .take(5)
            .collect();

        let mut token_evaluations = Vec::with_capacity(candidates.len());
        for listing in &candidates {
            let trades = self.market.fetch_trades(&listing.mint, 50).await;
            if trades.is_empty() {
                warn!("No trades available for {}, evaluating cold", listing.symbol);
            }
            let analysis = analyze_trade_flow(&trades);
            let evaluation = self
                .oracle
                .evaluate_token(listing, &analysis, &snapshot)
                .await;
            token_evaluations.push(evaluation);
        }

        self.log(
            LogLevel::Info,
            "analyze",
            format!("Evaluated {} listings", token_evaluations.len()),
            None,
        )
        .await;

        AnalyzeOutcome {
            narrative_analysis,
            token_evaluations,
        }
    }

    /// Generate phase: request ideas, keep only those clearing the
    /// configured score thresholds, prepend survivors newest-first.
    pub async fn generate(&self, count: u32) -> Vec<TokenIdea> {
        self.set_phase(AgentPhase::Generate).await;
        let snapshot = self.current_snapshot().await;

        let ideas = self.oracle.generate_token_ideas(&snapshot, count).await;
        let requested = ideas.len();

        let (min_viral, min_overall) = {
            let state = self.state.read().await;
            (state.config.min_viral_score, state.config.min_overall_score)
        };

        let survivors: Vec<TokenIdea> = ideas
            .into_iter()
            .filter(|idea| {
                idea.viral_score >= min_viral && idea.overall_score >= min_overall
            })
            .collect();
        let filtered_out = requested - survivors.len();

        {
            let mut state = self.state.write().await;
            for idea in survivors.iter().rev() {
                state.ideas.insert(0, idea.clone());
            }
        }

        for idea in &survivors {
            self.log(
                LogLevel::Success,
                "generate",
                format!(
                    "New idea: {} (${}) scored {} overall",
                    idea.name, idea.ticker, idea.overall_score
                ),
                None,
            )
            .await;
        }
        if filtered_out > 0 {
            self.log(
                LogLevel::Warn,
                "generate",
                format!(
                    "{} of {} ideas filtered out below thresholds (viral >= {}, overall >= {})",
                    filtered_out, requested, min_viral, min_overall
                ),
                None,
            )
            .await;
        }

        survivors
    }

    /// Deploy phase: gate, flip the idea to `deploying`, and return an
    /// unsigned deployment package. No `DeployedToken` is appended; an
    /// external signer completes the transition.
    pub async fn deploy(&self, idea_id: &str) -> DeployOutcome {
        self.set_phase(AgentPhase::Deploy).await;

        // Gate checks and the status flip happen under one write lock so
        // a second deploy of the same idea cannot slip through.
        let (idea, config) = {
            let mut state = self.state.write().await;

            let Some(index) = state.ideas.iter().position(|i| i.id == idea_id) else {
                return DeployOutcome::failure("Idea not found");
            };
            if state.config.wallet_pubkey.is_empty() {
                return DeployOutcome::failure("No wallet configured");
            }
            if state.config.max_budget_sol <= 0.0 {
                return DeployOutcome::failure("Deploy budget is 0");
            }
            let active = state
                .deployed_tokens
                .iter()
                .filter(|t| matches!(t.status, TokenStatus::Live | TokenStatus::Monitoring))
                .count();
            if active >= state.config.max_concurrent_tokens {
                return DeployOutcome::failure(format!(
                    "Max concurrent tokens reached ({})",
                    state.config.max_concurrent_tokens
                ));
            }

            state.ideas[index].status = TokenStatus::Deploying;
            (state.ideas[index].clone(), state.config.clone())
        };

        match self.build_deployment_package(&idea, &config) {
            Ok(package) => {
                self.log(
                    LogLevel::Success,
                    "deploy",
                    format!(
                        "Deployment package prepared for {} (${})",
                        idea.name, idea.ticker
                    ),
                    Some(json!({ "mint": package.mint })),
                )
                .await;
                DeployOutcome {
                    success: true,
                    message: format!("Deployment package ready for {}", idea.ticker),
                    package: Some(package),
                }
            }
            Err(e) => {
                {
                    let mut state = self.state.write().await;
                    if let Some(i) = state.ideas.iter_mut().find(|i| i.id == idea_id) {
                        i.status = TokenStatus::Rejected;
                    }
                }
                self.log(
                    LogLevel::Error,
                    "deploy",
                    format!("Deploy failed for {}: {}", idea.ticker, e),
                    None,
                )
                .await;
                DeployOutcome::failure(e.to_string())
            }
        }
    }

    fn build_deployment_package(
        &self,
        idea: &TokenIdea,
        config: &AgentConfig,
    ) -> Result<DeploymentPackage, AgentError> {
        let creator = Pubkey::from_str(&config.wallet_pubkey)
            .map_err(|e| AgentError::Configuration(format!("Invalid wallet pubkey: {}", e)))?;

        // Ephemeral keypair stands in for the mint; the signer regenerates
        // it when the package is actually signed.
        let mint = Keypair::new().pubkey();
        let metadata_uri = format!("https://launchpad.invalid/meta/{}.json", idea.id);

        let create = build_create_instruction(
            &creator,
            &mint,
            &idea.name,
            &idea.ticker,
            &metadata_uri,
        );

        let initial_buy_sol = config.max_budget_sol;
        let max_sol_cost = (initial_buy_sol * 1e9) as u64;
        let token_amount =
            (initial_buy_sol * INITIAL_CURVE_TOKENS_PER_SOL * TOKEN_DECIMALS_FACTOR) as u64;
        let buy = build_buy_instruction(&creator, &mint, token_amount, max_sol_cost);

        Ok(DeploymentPackage {
            idea_id: idea.id.clone(),
            mint: mint.to_string(),
            bonding_curve: bonding_curve_address(&mint).to_string(),
            create_instruction: InstructionDraft::from(&create),
            initial_buy_instruction: InstructionDraft::from(&buy),
            initial_buy_sol,
            estimated_cost_sol: initial_buy_sol + 2.0 * GAS_PRICE_SOL,
        })
    }

    /// Unsigned sell draft sized as a share of the suggested supply. The
    /// slippage floor is left at zero for the signer to set.
    fn build_exit_draft(
        &self,
        token: &DeployedToken,
        exit_percentage: u8,
        config: &AgentConfig,
    ) -> Option<InstructionDraft> {
        let seller = Pubkey::from_str(&config.wallet_pubkey).ok()?;
        let mint = Pubkey::from_str(&token.mint_address).ok()?;
        let token_amount = (token.idea.suggested_supply as f64
            * (exit_percentage as f64 / 100.0)
            * TOKEN_DECIMALS_FACTOR) as u64;
        let sell = build_sell_instruction(&seller, &mint, token_amount, 0);
        Some(InstructionDraft::from(&sell))
    }

    /// Monitor phase: exit advice plus on-chain health for every live or
    /// monitoring token. Per-token failures are logged and skipped.
    pub async fn monitor(&self) -> Vec<MonitorReport> {
        self.set_phase(AgentPhase::Monitor).await;
        let snapshot = self.current_snapshot().await;

        let (tracked, config) = {
            let state = self.state.read().await;
            let tracked: Vec<_> = state
                .deployed_tokens
                .iter()
                .filter(|t| matches!(t.status, TokenStatus::Live | TokenStatus::Monitoring))
                .cloned()
                .collect();
            (tracked, state.config.clone())
        };
        if tracked.is_empty() {
            return Vec::new();
        }

        let chain = ChainReader::new(&config.rpc_url);
        if !config.wallet_pubkey.is_empty() {
            match chain.balance(&config.wallet_pubkey).await {
                Ok(lamports) => {
                    info!("Wallet balance: {:.4} SOL", lamports as f64 / 1e9);
                }
                Err(e) => warn!("Wallet balance lookup failed: {}", e),
            }
        }

        let mut reports = Vec::with_capacity(tracked.len());
        for token in &tracked {
            let trades = self.market.fetch_trades(&token.mint_address, 50).await;
            let analysis = analyze_trade_flow(&trades);

            let curve_progress_pct =
                match chain.account(&token.bonding_curve_address).await {
                    Ok(Some(account)) => graduation_progress(account.lamports),
                    Ok(None) => {
                        warn!(
                            "Bonding curve account missing for ${}",
                            token.idea.ticker
                        );
                        0.0
                    }
                    Err(e) => {
                        warn!("Curve lookup failed for ${}: {}", token.idea.ticker, e);
                        0.0
                    }
                };

            let signatures = chain
                .recent_signatures(&token.mint_address, 10)
                .await
                .unwrap_or_else(|e| {
                    warn!("Signature lookup failed for ${}: {}", token.idea.ticker, e);
                    Vec::new()
                });
            let last_tx_confirmed = match signatures.first() {
                Some(newest) => chain
                    .signature_status(newest)
                    .await
                    .ok()
                    .flatten()
                    .map(|status| status.is_ok()),
                None => None,
            };

            // Refresh market cap from the catalog; fall back to the
            // recorded value when the listing is gone.
            let market_cap_usd = match self.market.fetch_listing(&token.mint_address).await
            {
                Some(listing) => listing.usd_market_cap,
                None => token.market_cap_usd,
            };

            // Stand-in valuation until real position accounting exists:
            // market cap scaled down by the idea's overall score.
            let current_value = market_cap_usd / token.idea.overall_score.max(1) as f64;

            let advice = self
                .oracle
                .advise_exit(
                    &token.idea.name,
                    market_cap_usd,
                    token.initial_buy_sol,
                    current_value,
                    &analysis,
                    &snapshot,
                )
                .await;

            let exit_draft = if advice.should_exit {
                self.log(
                    LogLevel::Warn,
                    "monitor",
                    format!("Exit advised for ${}: {}", token.idea.ticker, advice.reasoning),
                    None,
                )
                .await;
                self.build_exit_draft(token, advice.exit_percentage, &config)
            } else {
                None
            };

            reports.push(MonitorReport {
                symbol: token.idea.ticker.clone(),
                pnl: 0.0,
                should_exit: advice.should_exit,
                reasoning: advice.reasoning,
                curve_progress_pct,
                recent_tx_count: signatures.len(),
                last_tx_confirmed,
                exit_draft,
            });
        }

        reports
    }

    /// One full autonomous cycle: scan, then branch on the oracle's
    /// decision. Top-level errors are reported, never propagated.
    pub async fn full_cycle(&self) -> CycleOutcome {
        {
            let mut state = self.state.write().await;
            state.sessions_completed += 1;
        }

        let scan = match self.scan().await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Full cycle failed during scan: {}", e);
                self.log(
                    LogLevel::Error,
                    "cycle",
                    format!("Cycle aborted: {}", e),
                    None,
                )
                .await;
                return CycleOutcome {
                    phase: "error".to_string(),
                    results: json!({ "error": e.to_string() }),
                };
            }
        };

        match scan.decision.action {
            AgentAction::Generate => {
                let ideas = self.generate(3).await;
                CycleOutcome {
                    phase: "generate".to_string(),
                    results: json!({ "ideas": ideas }),
                }
            }
            AgentAction::Deploy => {
                let best = {
                    let state = self.state.read().await;
                    state
                        .ideas
                        .iter()
                        .filter(|i| {
                            matches!(i.status, TokenStatus::Idea | TokenStatus::Approved)
                        })
                        .max_by_key(|i| i.overall_score)
                        .map(|i| i.id.clone())
                };
                match best {
                    Some(idea_id) => {
                        let outcome = self.deploy(&idea_id).await;
                        CycleOutcome {
                            phase: "deploy".to_string(),
                            results: serde_json::to_value(outcome)
                                .unwrap_or_else(|_| json!({})),
                        }
                    }
                    None => {
                        let ideas = self.generate(3).await;
                        CycleOutcome {
                            phase: "generate".to_string(),
                            results: json!({ "ideas": ideas }),
                        }
                    }
                }
            }
            AgentAction::Hold | AgentAction::Exit => {
                let reports = self.monitor().await;
                CycleOutcome {
                    phase: "monitor".to_string(),
                    results: json!({ "positions": reports }),
                }
            }
            AgentAction::Wait => {
                let interval_ms = self.state.read().await.config.scan_interval_ms;
                CycleOutcome {
                    phase: "wait".to_string(),
                    results: json!({ "nextScanInSeconds": interval_ms / 1000 }),
                }
            }
        }
    }

    /// Shallow field-by-field merge; only present keys override.
    pub async fn update_config(&self, patch: AgentConfigPatch) -> AgentConfig {
        let mut state = self.state.write().await;
        let config = &mut state.config;

        if let Some(v) = patch.mode {
            config.mode = v;
        }
        if let Some(v) = patch.risk_tolerance {
            config.risk_tolerance = v;
        }
        if let Some(v) = patch.max_budget_sol {
            config.max_budget_sol = v;
        }
        if let Some(v) = patch.autonomous {
            config.autonomous = v;
        }
        if let Some(v) = patch.scan_interval_ms {
            config.scan_interval_ms = v;
        }
        if let Some(v) = patch.target_categories {
            config.target_categories = v;
        }
        if let Some(v) = patch.min_viral_score {
            config.min_viral_score = v;
        }
        if let Some(v) = patch.min_overall_score {
            config.min_overall_score = v;
        }
        if let Some(v) = patch.max_concurrent_tokens {
            config.max_concurrent_tokens = v;
        }
        if let Some(v) = patch.rpc_url {
            config.rpc_url = v;
        }
        if let Some(v) = patch.wallet_pubkey {
            config.wallet_pubkey = v;
        }

        config.clone()
    }

    pub async fn clear_logs(&self) {
        self.state.write().await.logs.clear();
    }

    /// Replace the whole state with defaults, then record one entry
    /// announcing the reset.
    pub async fn reset(&self) {
        {
            let mut state = self.state.write().await;
            *state = AgentState::defaults();
        }
        self.log(LogLevel::Info, "agent", "Agent state reset", None)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::oracle::idea_overall_score;
    use crate::agent::types::{
        DeployedToken, ExitAdvice, Listing, Momentum, NarrativeAnalysis,
        OracleRecommendation, Sentiment, TokenCategory, TradeAnalysis, TokenEvaluation,
        DEFAULT_TOKEN_SUPPLY,
    };
    use async_trait::async_trait;

    /// Deterministic oracle used instead of the network-backed one.
    struct StubOracle {
        ideas: Vec<(u8, u8, u8)>, // (viral, risk, timing)
    }

    #[async_trait]
    impl AdvisoryOracle for StubOracle {
        async fn analyze_market_conditions(&self, _snapshot: &MarketSnapshot) -> AiDecision {
            AiDecision {
                action: AgentAction::Wait,
                confidence: 50,
                reasoning: "stub".to_string(),
                target_narrative: None,
                suggested_count: None,
            }
        }

        async fn analyze_narrative(
            &self,
            _narrative: &str,
            _related: &[Listing],
            _snapshot: &MarketSnapshot,
        ) -> NarrativeAnalysis {
            NarrativeAnalysis {
                strength: 10,
                momentum: Momentum::Rising,
                saturation: 20,
                recommendation: OracleRecommendation::Wait,
                reasoning: "stub".to_string(),
            }
        }

        async fn evaluate_token(
            &self,
            listing: &Listing,
            _trades: &TradeAnalysis,
            _snapshot: &MarketSnapshot,
        ) -> TokenEvaluation {
            crate::agent::oracle::evaluation_fallback(listing)
        }

        async fn generate_token_ideas(
            &self,
            _snapshot: &MarketSnapshot,
            count: u32,
        ) -> Vec<TokenIdea> {
            self.ideas
                .iter()
                .take(count as usize)
                .enumerate()
                .map(|(i, &(viral, risk, timing))| TokenIdea {
                    id: format!("idea-{i}"),
                    name: format!("Stub {i}"),
                    ticker: format!("STB{i}"),
                    description: String::new(),
                    narrative: "AI".to_string(),
                    image_prompt: String::new(),
                    category: TokenCategory::Ai,
                    viral_score: viral,
                    risk_score: risk,
                    timing_score: timing,
                    overall_score: idea_overall_score(viral, risk, timing),
                    reasoning: String::new(),
                    suggested_supply: DEFAULT_TOKEN_SUPPLY,
                    created_at: Utc::now(),
                    status: TokenStatus::Idea,
                })
                .collect()
        }

        async fn advise_exit(
            &self,
            _name: &str,
            _current_mcap: f64,
            _initial_investment: f64,
            _current_value: f64,
            _trades: &TradeAnalysis,
            _snapshot: &MarketSnapshot,
        ) -> ExitAdvice {
            ExitAdvice {
                should_exit: false,
                exit_percentage: 0,
                reasoning: "stub".to_string(),
                price_target: None,
            }
        }
    }

    fn orchestrator_with(ideas: Vec<(u8, u8, u8)>) -> AgentOrchestrator {
        let market = MarketDataClient::new();
        let snapshots = MarketSnapshotBuilder::new(market.clone());
        AgentOrchestrator::new(market, snapshots, Arc::new(StubOracle { ideas }))
    }

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot {
            timestamp: Utc::now(),
            sol_price_usd: 150.0,
            sentiment: Sentiment::Neutral,
            trending_narratives: vec!["AI".to_string()],
            top_gainers: Vec::new(),
            recent_graduates: Vec::new(),
            gas_price_sol: GAS_PRICE_SOL,
        }
    }

    async fn seed_snapshot(orch: &AgentOrchestrator) {
        orch.state.write().await.last_snapshot = Some(snapshot());
    }

    fn seeded_idea(id: &str, overall: u8) -> TokenIdea {
        TokenIdea {
            id: id.to_string(),
            name: "Seed".to_string(),
            ticker: "SEED".to_string(),
            description: String::new(),
            narrative: "Meme".to_string(),
            image_prompt: String::new(),
            category: TokenCategory::Meme,
            viral_score: 70,
            risk_score: 30,
            timing_score: 70,
            overall_score: overall,
            reasoning: String::new(),
            suggested_supply: DEFAULT_TOKEN_SUPPLY,
            created_at: Utc::now(),
            status: TokenStatus::Idea,
        }
    }

    fn live_token(n: usize) -> DeployedToken {
        DeployedToken {
            idea: seeded_idea(&format!("live-{n}"), 80),
            mint_address: format!("Mint{n}"),
            bonding_curve_address: format!("Curve{n}"),
            deployed_at: Utc::now(),
            initial_buy_sol: 0.5,
            market_cap_usd: 10_000.0,
            status: TokenStatus::Live,
        }
    }

    // System program id: a valid base58 pubkey with no special meaning here.
    const WALLET: &str = "11111111111111111111111111111111";

    #[tokio::test]
    async fn log_is_capped_and_newest_first() {
        let orch = orchestrator_with(vec![]);
        for i in 0..=(LOG_CAP) {
            orch.log(LogLevel::Info, "test", format!("entry {i}"), None)
                .await;
        }
        let state = orch.get_state().await;
        assert_eq!(state.logs.len(), LOG_CAP);
        assert_eq!(state.logs[0].message, format!("entry {}", LOG_CAP));
        // Oldest entry ("entry 0") was dropped.
        assert_eq!(state.logs.last().unwrap().message, "entry 1");
    }

    #[tokio::test]
    async fn deploy_gating_rejects_without_mutating_status() {
        let orch = orchestrator_with(vec![]);

        // Unknown idea.
        let outcome = orch.deploy("missing").await;
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Idea not found");

        // No wallet.
        {
            let mut state = orch.state.write().await;
            state.ideas.push(seeded_idea("i1", 80));
            state.config.wallet_pubkey = String::new();
        }
        let outcome = orch.deploy("i1").await;
        assert!(!outcome.success);
        assert_eq!(outcome.message, "No wallet configured");

        // Zero budget.
        {
            let mut state = orch.state.write().await;
            state.config.wallet_pubkey = WALLET.to_string();
            state.config.max_budget_sol = 0.0;
        }
        let outcome = orch.deploy("i1").await;
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Deploy budget is 0");

        // Concurrency cap.
        {
            let mut state = orch.state.write().await;
            state.config.max_budget_sol = 0.5;
            state.config.max_concurrent_tokens = 2;
            state.deployed_tokens.push(live_token(1));
            state.deployed_tokens.push(live_token(2));
        }
        let outcome = orch.deploy("i1").await;
        assert!(!outcome.success);
        assert!(outcome.message.contains("2"));

        // None of the failures touched the idea's status.
        let state = orch.get_state().await;
        assert_eq!(state.ideas[0].status, TokenStatus::Idea);
    }

    #[tokio::test]
    async fn deploy_success_flips_status_and_builds_package() {
        let orch = orchestrator_with(vec![]);
        {
            let mut state = orch.state.write().await;
            state.ideas.push(seeded_idea("i1", 80));
            state.config.wallet_pubkey = WALLET.to_string();
            state.config.max_budget_sol = 0.25;
        }

        let outcome = orch.deploy("i1").await;
        assert!(outcome.success, "{}", outcome.message);
        let package = outcome.package.expect("package");
        assert_eq!(package.idea_id, "i1");
        assert_eq!(package.initial_buy_sol, 0.25);
        assert!(!package.create_instruction.accounts.is_empty());

        let state = orch.get_state().await;
        assert_eq!(state.ideas[0].status, TokenStatus::Deploying);
        // Deploy prepares a package but never appends a DeployedToken.
        assert!(state.deployed_tokens.is_empty());
    }

    #[tokio::test]
    async fn generate_filters_and_prepends_survivors() {
        // Two strong ideas (84 overall) and one weak one.
        let orch = orchestrator_with(vec![(80, 20, 90), (80, 20, 90), (10, 90, 10)]);
        seed_snapshot(&orch).await;
        {
            let mut state = orch.state.write().await;
            state.config.min_viral_score = 70;
            state.config.min_overall_score = 65;
            state.ideas.push(seeded_idea("old", 50));
        }

        let survivors = orch.generate(3).await;
        assert_eq!(survivors.len(), 2);
        assert!(survivors.iter().all(|i| i.overall_score == 84));

        let state = orch.get_state().await;
        assert_eq!(state.ideas.len(), 3);
        // Survivors sit in front of the pre-existing idea, order kept.
        assert_eq!(state.ideas[0].id, "idea-0");
        assert_eq!(state.ideas[1].id, "idea-1");
        assert_eq!(state.ideas[2].id, "old");

        // One warning about the filtered idea was recorded.
        assert!(
            state
                .logs
                .iter()
                .any(|l| l.level == LogLevel::Warn && l.message.contains("1 of 3"))
        );
    }

    #[tokio::test]
    async fn get_state_is_idempotent() {
        let orch = orchestrator_with(vec![]);
        orch.log(LogLevel::Info, "test", "one entry", None).await;
        let a = serde_json::to_value(orch.get_state().await).unwrap();
        let b = serde_json::to_value(orch.get_state().await).unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn reset_restores_defaults_with_announcement() {
        let orch = orchestrator_with(vec![]);
        {
            let mut state = orch.state.write().await;
            state.ideas.push(seeded_idea("i1", 80));
            state.sessions_completed = 7;
            state.config.max_budget_sol = 99.0;
        }
        orch.log(LogLevel::Info, "test", "before reset", None).await;

        orch.reset().await;

        let state = orch.get_state().await;
        assert!(state.ideas.is_empty());
        assert_eq!(state.sessions_completed, 0);
        assert_eq!(state.config, AgentConfig::defaults());
        assert_eq!(state.logs.len(), 1);
        assert_eq!(state.logs[0].message, "Agent state reset");
    }

    #[tokio::test]
    async fn config_merge_only_touches_present_fields() {
        let orch = orchestrator_with(vec![]);
        let before = orch.get_state().await.config;

        let merged = orch
            .update_config(AgentConfigPatch {
                max_budget_sol: Some(1.5),
                min_viral_score: Some(80),
                ..Default::default()
            })
            .await;

        assert_eq!(merged.max_budget_sol, 1.5);
        assert_eq!(merged.min_viral_score, 80);
        assert_eq!(merged.scan_interval_ms, before.scan_interval_ms);
        assert_eq!(merged.max_concurrent_tokens, before.max_concurrent_tokens);
    }

    #[tokio::test]
    async fn clear_logs_empties_the_log() {
        let orch = orchestrator_with(vec![]);
        orch.log(LogLevel::Info, "test", "entry", None).await;
        orch.clear_logs().await;
        assert!(orch.get_state().await.logs.is_empty());
    }

    #[tokio::test]
    async fn monitor_with_no_tracked_tokens_is_empty() {
        let orch = orchestrator_with(vec![]);
        seed_snapshot(&orch).await;
        assert!(orch.monitor().await.is_empty());
    }
}
