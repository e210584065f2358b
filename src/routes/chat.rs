//! Conversational endpoint: an SSE stream where the LLM can drive the
//! agent through the same command surface the dashboard uses. Tool calls
//! are dispatched through `routes::agent::dispatch_command`, so chat and
//! direct commands cannot drift apart.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::StreamExt;
use futures::channel::mpsc::{self, UnboundedSender};
use futures::stream::Stream;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::agent::AgentOrchestrator;
use crate::agent::types::AgentError;
use crate::config::CONFIG;
use crate::routes::agent::dispatch_command;
use crate::server::AppState;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Upper bound on LLM round trips per chat message. Each round may carry
/// several tool calls.
const MAX_TOOL_ROUNDS: usize = 4;

const SYSTEM_PROMPT: &str = "You are the conversational interface of a memecoin \
    launchpad agent. You can inspect the market, analyze narratives, generate \
    token ideas, prepare deployments and report agent status through the tools \
    provided. Deployments only prepare unsigned transactions; nothing is ever \
    signed or submitted. Be concise and factual; never invent market data.";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Prior turns, oldest first. Roles other than user/assistant are
    /// dropped.
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

/// Conversational agent session.
///
/// # Route
/// - **Method**: POST
/// - **Path**: `/api/v1/agent/chat`
/// - **Body**: `{"message": "...", "history": [{"role", "content"}]}`
/// - **Response**: SSE stream of `tool`, `tool_result`, `message`,
///   `error` and a final `done` event.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::unbounded();
    let orchestrator = Arc::clone(&state.orchestrator);

    tokio::spawn(async move {
        run_session(orchestrator, request, tx).await;
    });

    Sse::new(rx.map(Ok)).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

async fn run_session(
    orchestrator: Arc<AgentOrchestrator>,
    request: ChatRequest,
    tx: UnboundedSender<Event>,
) {
    let send = |event: &str, data: Value| {
        // Receiver dropping just means the client went away.
        let _ = tx.unbounded_send(Event::default().event(event).data(data.to_string()));
    };

    if CONFIG.openai_api_key.is_empty() {
        send("error", json!({ "error": "No OpenAI API key configured" }));
        send("done", json!({}));
        return;
    }

    let client = match Client::builder().timeout(Duration::from_secs(60)).build() {
        Ok(client) => client,
        Err(e) => {
            send("error", json!({ "error": format!("HTTP client error: {}", e) }));
            send("done", json!({}));
            return;
        }
    };

    let mut messages = vec![json!({ "role": "system", "content": SYSTEM_PROMPT })];
    for turn in &request.history {
        if turn.role == "user" || turn.role == "assistant" {
            messages.push(json!({ "role": turn.role, "content": turn.content }));
        }
    }
    messages.push(json!({ "role": "user", "content": request.message }));

    let mut answered = false;
    for _ in 0..MAX_TOOL_ROUNDS {
        let response = match chat_completion(&client, &messages).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Chat completion failed: {}", e);
                send("error", json!({ "error": e.to_string() }));
                break;
            }
        };

        let message = response["choices"][0]["message"].clone();
        let tool_calls = message["tool_calls"].as_array().cloned().unwrap_or_default();

        if tool_calls.is_empty() {
            let content = message["content"].as_str().unwrap_or("").to_string();
            send("message", json!({ "content": content }));
            answered = true;
            break;
        }

        messages.push(message);
        for call in &tool_calls {
            let call_id = call["id"].as_str().unwrap_or_default().to_string();
            let name = call["function"]["name"].as_str().unwrap_or_default().to_string();
            let arguments: Value = call["function"]["arguments"]
                .as_str()
                .and_then(|raw| serde_json::from_str(raw).ok())
                .unwrap_or_else(|| json!({}));

            send("tool", json!({ "name": name, "arguments": arguments }));

            let result =
                match dispatch_command(&orchestrator, tool_command(&name), &arguments).await
                {
                    Ok(envelope) => envelope,
                    Err((_, error)) => json!({ "success": false, "error": error }),
                };

            send("tool_result", json!({ "name": name, "result": result }));
            messages.push(json!({
                "role": "tool",
                "tool_call_id": call_id,
                "content": result.to_string(),
            }));
        }
    }

    if !answered {
        send(
            "message",
            json!({ "content": "Stopped before completing: tool budget exhausted." }),
        );
    }
    send("done", json!({}));
}

/// The chat tool names map onto the command surface; `status` is the
/// conversational alias for `state`.
fn tool_command(name: &str) -> &str {
    match name {
        "status" => "state",
        other => other,
    }
}

async fn chat_completion(client: &Client, messages: &[Value]) -> Result<Value, AgentError> {
    let payload = json!({
        "model": CONFIG.openai_model,
        "messages": messages,
        "tools": tool_definitions(),
        "tool_choice": "auto",
        "temperature": 0.7,
    });

    let response = client
        .post(OPENAI_CHAT_URL)
        .header("Authorization", format!("Bearer {}", CONFIG.openai_api_key))
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

    Ok(response.json().await?)
}

fn tool_definitions() -> Value {
    json!([
        {
            "type": "function",
            "function": {
                "name": "scan",
                "description": "Scan the launchpad market and get a fresh snapshot plus a recommended next action.",
                "parameters": { "type": "object", "properties": {} }
            }
        },
        {
            "type": "function",
            "function": {
                "name": "analyze",
                "description": "Evaluate currently active listings, optionally with a deep dive into one narrative.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "narrative": { "type": "string", "description": "Narrative to analyze, e.g. 'AI' or 'Animal'." }
                    }
                }
            }
        },
        {
            "type": "function",
            "function": {
                "name": "generate",
                "description": "Generate new token ideas fitted to the current market.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "count": { "type": "integer", "minimum": 1, "maximum": 5 }
                    }
                }
            }
        },
        {
            "type": "function",
            "function": {
                "name": "deploy",
                "description": "Prepare an unsigned deployment package for an existing idea. Nothing is signed or submitted.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "ideaId": { "type": "string" }
                    },
                    "required": ["ideaId"]
                }
            }
        },
        {
            "type": "function",
            "function": {
                "name": "cycle",
                "description": "Run one full autonomous cycle: scan, then act on the recommendation.",
                "parameters": { "type": "object", "properties": {} }
            }
        },
        {
            "type": "function",
            "function": {
                "name": "status",
                "description": "Report the agent's full current state, including ideas, positions and recent activity.",
                "parameters": { "type": "object", "properties": {} }
            }
        }
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_tool_aliases_the_state_command() {
        assert_eq!(tool_command("status"), "state");
        assert_eq!(tool_command("scan"), "scan");
        assert_eq!(tool_command("deploy"), "deploy");
    }

    #[test]
    fn tool_definitions_cover_the_chat_surface() {
        let tools = tool_definitions();
        let names: Vec<&str> = tools
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["function"]["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec!["scan", "analyze", "generate", "deploy", "cycle", "status"]
        );
    }

    #[test]
    fn history_defaults_to_empty() {
        let request: ChatRequest =
            serde_json::from_value(json!({ "message": "hi" })).unwrap();
        assert!(request.history.is_empty());
        assert_eq!(request.message, "hi");
    }
}
