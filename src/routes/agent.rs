use axum::{
    Router,
    extract::{Json, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::agent::AgentOrchestrator;
use crate::agent::types::AgentConfigPatch;
use crate::server::AppState;

const VALID_COMMANDS: &[&str] = &[
    "scan",
    "analyze",
    "generate",
    "deploy",
    "monitor",
    "cycle",
    "config",
    "clear_logs",
    "reset",
    "state",
];

/// Generate count is clamped to this range regardless of what the
/// caller (or the chat model) asks for.
const MAX_GENERATE_COUNT: u64 = 5;

/// Single command envelope accepted by `/api/v1/agent/command`.
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    /// Command-specific parameters; absent means `null`.
    #[serde(default)]
    pub params: Value,
}

/// Dispatch one agent command and build its response envelope.
///
/// Invalid input (unknown command, missing required params) maps to 400;
/// operational failures from the phases come back as
/// `{"success": false, "error": ...}` with 200; serialization problems
/// map to 500. The chat tool loop reuses this so both surfaces behave
/// identically.
pub async fn dispatch_command(
    orchestrator: &AgentOrchestrator,
    command: &str,
    params: &Value,
) -> Result<Value, (StatusCode, String)> {
    let result = match command {
        "scan" => match orchestrator.scan().await {
            Ok(outcome) => to_value(&outcome)?,
            Err(e) => {
                return Ok(json!({
                    "success": false,
                    "command": "scan",
                    "error": e.to_string(),
                }));
            }
        },
        "analyze" => {
            let narrative = params
                .get("narrative")
                .and_then(Value::as_str)
                .map(str::to_string);
            to_value(&orchestrator.analyze(narrative).await)?
        }
        "generate" => {
            let count = params
                .get("count")
                .and_then(Value::as_u64)
                .unwrap_or(3)
                .clamp(1, MAX_GENERATE_COUNT) as u32;
            json!({ "ideas": orchestrator.generate(count).await })
        }
        "deploy" => {
            let Some(idea_id) = params.get("ideaId").and_then(Value::as_str) else {
                return Err((
                    StatusCode::BAD_REQUEST,
                    "deploy requires params.ideaId".to_string(),
                ));
            };
            let outcome = orchestrator.deploy(idea_id).await;
            let success = outcome.success;
            return Ok(json!({
                "success": success,
                "command": "deploy",
                "result": to_value(&outcome)?,
            }));
        }
        "monitor" => json!({ "positions": orchestrator.monitor().await }),
        "cycle" => to_value(&orchestrator.full_cycle().await)?,
        "config" => {
            let patch: AgentConfigPatch = serde_json::from_value(params.clone())
                .map_err(|e| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("Invalid config patch: {}", e),
                    )
                })?;
            to_value(&orchestrator.update_config(patch).await)?
        }
        "clear_logs" => {
            orchestrator.clear_logs().await;
            json!({ "cleared": true })
        }
        "reset" => {
            orchestrator.reset().await;
            json!({ "reset": true })
        }
        "state" => state_payload(orchestrator).await?,
        other => {
            return Err((
                StatusCode::BAD_REQUEST,
                format!(
                    "Unknown command '{}'. Valid commands: {}",
                    other,
                    VALID_COMMANDS.join(", ")
                ),
            ));
        }
    };

    Ok(json!({
        "success": true,
        "command": command,
        "result": result,
    }))
}

/// Deep state snapshot plus derived counters for the dashboard.
async fn state_payload(
    orchestrator: &AgentOrchestrator,
) -> Result<Value, (StatusCode, String)> {
    let state = orchestrator.get_state().await;
    let mut value = to_value(&state)?;
    if let Some(object) = value.as_object_mut() {
        object.insert("ideaCount".to_string(), json!(state.ideas.len()));
        object.insert(
            "deployedCount".to_string(),
            json!(state.deployed_tokens.len()),
        );
        object.insert("logCount".to_string(), json!(state.logs.len()));
    }
    Ok(value)
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, (StatusCode, String)> {
    serde_json::to_value(value).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Serialization error: {}", e),
        )
    })
}

/// Run one agent command.
///
/// # Route
/// - **Method**: POST
/// - **Path**: `/api/v1/agent/command`
/// - **Body**: `{"command": "...", "params": {...}}`
pub async fn run_agent_command(
    State(state): State<AppState>,
    Json(request): Json<CommandRequest>,
) -> Result<ResponseJson<Value>, (StatusCode, String)> {
    info!("Agent command received: {}", request.command);
    let envelope =
        dispatch_command(&state.orchestrator, &request.command, &request.params).await?;
    Ok(ResponseJson(envelope))
}

/// Deep snapshot of the agent state.
///
/// # Route
/// - **Method**: GET
/// - **Path**: `/api/v1/agent/state`
pub async fn get_agent_state(
    State(state): State<AppState>,
) -> Result<ResponseJson<Value>, (StatusCode, String)> {
    Ok(ResponseJson(state_payload(&state.orchestrator).await?))
}

/// Create agent routes
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/agent/command", post(run_agent_command))
        .route("/api/v1/agent/state", get(get_agent_state))
        .route("/api/v1/agent/chat", post(crate::routes::chat::chat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::market_data::MarketDataClient;
    use crate::agent::oracle::OpenAiOracle;
    use crate::agent::orchestrator::AgentOrchestrator;
    use crate::agent::snapshot::MarketSnapshotBuilder;
    use std::sync::Arc;

    fn orchestrator() -> AgentOrchestrator {
        let market = MarketDataClient::new();
        let snapshots = MarketSnapshotBuilder::new(market.clone());
        AgentOrchestrator::new(market, snapshots, Arc::new(OpenAiOracle::new()))
    }

    #[tokio::test]
    async fn unknown_command_is_a_bad_request() {
        let orch = orchestrator();
        let err = dispatch_command(&orch, "launch_rocket", &Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert!(err.1.contains("launch_rocket"));
        // The error names every valid command.
        for command in VALID_COMMANDS {
            assert!(err.1.contains(command), "missing {command}");
        }
    }

    #[tokio::test]
    async fn deploy_without_idea_id_is_a_bad_request() {
        let orch = orchestrator();
        let err = dispatch_command(&orch, "deploy", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert!(err.1.contains("ideaId"));
    }

    #[tokio::test]
    async fn deploy_failure_reports_success_false() {
        let orch = orchestrator();
        let envelope = dispatch_command(&orch, "deploy", &json!({ "ideaId": "missing" }))
            .await
            .unwrap();
        assert_eq!(envelope["success"], json!(false));
        assert_eq!(envelope["result"]["message"], json!("Idea not found"));
    }

    #[tokio::test]
    async fn clear_logs_envelope_shape() {
        let orch = orchestrator();
        let envelope = dispatch_command(&orch, "clear_logs", &Value::Null)
            .await
            .unwrap();
        assert_eq!(envelope["success"], json!(true));
        assert_eq!(envelope["command"], json!("clear_logs"));
        assert_eq!(envelope["result"]["cleared"], json!(true));
    }

    #[tokio::test]
    async fn state_command_carries_derived_counters() {
        let orch = orchestrator();
        let envelope = dispatch_command(&orch, "state", &Value::Null)
            .await
            .unwrap();
        let result = &envelope["result"];
        assert_eq!(result["ideaCount"], json!(0));
        assert_eq!(result["deployedCount"], json!(0));
        assert_eq!(result["logCount"], json!(0));
        assert_eq!(result["phase"], json!("idle"));
    }

    #[tokio::test]
    async fn malformed_config_patch_is_a_bad_request() {
        let orch = orchestrator();
        let err = dispatch_command(&orch, "config", &json!({ "maxBudgetSol": "lots" }))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn config_command_merges_and_echoes() {
        let orch = orchestrator();
        let envelope = dispatch_command(&orch, "config", &json!({ "maxBudgetSol": 1.25 }))
            .await
            .unwrap();
        assert_eq!(envelope["success"], json!(true));
        assert_eq!(envelope["result"]["maxBudgetSol"], json!(1.25));
    }
}
