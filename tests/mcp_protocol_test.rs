//! Integration tests for MCP protocol handling
//!
//! Feeds newline-delimited JSON-RPC through `McpServer::serve` and checks the responses a
//! client would read back, including query -> feedback round trips.

mod common;

use std::sync::Arc;

use serde_json::{json, Value};

use common::{test_config, FakeGateway, FakeIndex, RecordingTickets, ScriptedGenerator};
use mcp_support_router::agents::{Collaborators, QueryRouter};
use mcp_support_router::server::{AppState, McpServer};
use mcp_support_router::storage::{FeedbackType, SqliteStorage, Storage};

async fn server(generator: ScriptedGenerator) -> (McpServer, Arc<SqliteStorage>) {
    let config = test_config();
    let storage = Arc::new(SqliteStorage::new_in_memory().await.unwrap());
    let deps = Collaborators {
        generator: Arc::new(generator),
        storage: storage.clone(),
        gateway: Arc::new(FakeGateway::new()),
        index: Arc::new(FakeIndex::with_units(&[("Clans can hold at most 50 members.", 0.9)])),
        tickets: Arc::new(RecordingTickets::new()),
    };
    let router = QueryRouter::from_config(deps, &config);
    let state = Arc::new(AppState::new(config, storage.clone(), router));
    (McpServer::new(state), storage)
}

fn static_generator() -> ScriptedGenerator {
    ScriptedGenerator::new()
        .reply("support-classifier-v1", "STATIC")
        .reply("support-static-qa-v1", "A clan can hold up to 50 members.")
}

/// Send each request line and return every response line, parsed.
async fn exchange(server: &McpServer, requests: &[Value]) -> Vec<Value> {
    let input: String = requests
        .iter()
        .map(|r| format!("{}\n", r))
        .collect();
    let mut output = Vec::new();

    server.serve(input.as_bytes(), &mut output).await.unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).expect("Failed to parse JSON-RPC response"))
        .collect()
}

/// Verify JSON-RPC 2.0 response structure
fn assert_valid_jsonrpc_response(response: &Value) {
    assert_eq!(response["jsonrpc"], "2.0", "Invalid JSON-RPC version");
    assert!(
        response.get("result").is_some() != response.get("error").is_some(),
        "Response must have exactly one of result or error"
    );
}

fn tool_payload(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

#[cfg(test)]
mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn test_handshake_and_tool_listing() {
        let (server, _) = server(ScriptedGenerator::new()).await;

        let responses = exchange(
            &server,
            &[
                json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "method": "initialize",
                    "params": {
                        "protocolVersion": "2024-11-05",
                        "capabilities": {},
                        "clientInfo": {"name": "test-client", "version": "1.0.0"}
                    }
                }),
                json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
                json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
                json!({"jsonrpc": "2.0", "id": 3, "method": "ping"}),
            ],
        )
        .await;

        assert_eq!(responses.len(), 3);
        responses.iter().for_each(assert_valid_jsonrpc_response);

        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[0]["result"]["protocolVersion"], "2024-11-05");

        let tools = responses[1]["result"]["tools"].as_array().unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["support_query", "support_feedback"]);

        assert_eq!(responses[2]["id"], 3);
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let (server, _) = server(ScriptedGenerator::new()).await;

        let responses = exchange(
            &server,
            &[
                json!({"jsonrpc": "2.0", "id": "a", "method": "prompts/list"}),
                json!({"jsonrpc": "2.0", "id": "b", "method": "tools/call", "params": {"arguments": {}}}),
            ],
        )
        .await;

        assert_eq!(responses[0]["id"], "a");
        assert_eq!(responses[0]["error"]["code"], -32601);
        assert_eq!(responses[1]["id"], "b");
        assert_eq!(responses[1]["error"]["code"], -32602);
    }
}

#[cfg(test)]
mod tool_tests {
    use super::*;

    #[tokio::test]
    async fn test_query_then_feedback() {
        let (server, storage) = server(static_generator()).await;

        let responses = exchange(
            &server,
            &[json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "tools/call",
                "params": {
                    "name": "support_query",
                    "arguments": {
                        "text": "How many members can a clan have?",
                        "user_context": {"username": "IceWarden", "role": "player"}
                    }
                }
            })],
        )
        .await;

        let result = tool_payload(&responses[0]);
        assert_eq!(result["answer"], "A clan can hold up to 50 members.");
        assert_eq!(result["source_type"], "STATIC");
        assert!(result.get("ticket_id").is_none());
        let query_id = result["query_id"].as_str().unwrap().to_string();

        let responses = exchange(
            &server,
            &[json!({
                "jsonrpc": "2.0",
                "id": 2,
                "method": "tools/call",
                "params": {
                    "name": "support_feedback",
                    "arguments": {
                        "query_id": query_id,
                        "feedback_type": "negative",
                        "comment": "Officers count too?"
                    }
                }
            })],
        )
        .await;

        let feedback = tool_payload(&responses[0]);
        assert_eq!(feedback["status"], "success");

        let record = storage.get_query_record(&query_id).await.unwrap().unwrap();
        assert_eq!(record.username, "IceWarden");
        let stored = record.feedback.unwrap();
        assert_eq!(stored.feedback_type, FeedbackType::Negative);
        assert_eq!(stored.comment.as_deref(), Some("Officers count too?"));
    }

    #[tokio::test]
    async fn test_history_trace_links_turns() {
        let (server, storage) = server(static_generator()).await;

        let first = exchange(
            &server,
            &[json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "tools/call",
                "params": {"name": "support_query", "arguments": {"text": "How big can a clan be?"}}
            })],
        )
        .await;
        let first = tool_payload(&first[0]);

        let second = exchange(
            &server,
            &[json!({
                "jsonrpc": "2.0",
                "id": 2,
                "method": "tools/call",
                "params": {
                    "name": "support_query",
                    "arguments": {
                        "text": "And how many officers?",
                        "history": [
                            {"role": "user", "content": "How big can a clan be?"},
                            {
                                "role": "assistant",
                                "content": first["answer"],
                                "trace": {
                                    "run_id": first["trace"]["run_id"],
                                    "query_id": first["query_id"],
                                    "source_type": "STATIC"
                                }
                            }
                        ]
                    }
                }
            })],
        )
        .await;
        let second = tool_payload(&second[0]);

        assert_eq!(second["trace"]["parent_run_id"], first["trace"]["run_id"]);

        let record = storage
            .get_query_record(second["query_id"].as_str().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            record.parent_run_id.as_deref(),
            first["trace"]["run_id"].as_str()
        );
        assert_eq!(record.username, "guest");
    }

    #[tokio::test]
    async fn test_feedback_for_unknown_query_is_tool_error() {
        let (server, _) = server(ScriptedGenerator::new()).await;

        let responses = exchange(
            &server,
            &[json!({
                "jsonrpc": "2.0",
                "id": 9,
                "method": "tools/call",
                "params": {
                    "name": "support_feedback",
                    "arguments": {"query_id": "does-not-exist", "feedback_type": "positive"}
                }
            })],
        )
        .await;

        let result = &responses[0]["result"];
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Query not found: does-not-exist"));
    }

    #[tokio::test]
    async fn test_empty_query_is_tool_error() {
        let (server, _) = server(ScriptedGenerator::new()).await;

        let responses = exchange(
            &server,
            &[json!({
                "jsonrpc": "2.0",
                "id": 10,
                "method": "tools/call",
                "params": {"name": "support_query", "arguments": {"text": "  "}}
            })],
        )
        .await;

        assert_eq!(responses[0]["result"]["isError"], true);
    }
}
