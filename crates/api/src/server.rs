//! MCP tool server built on the `rmcp` SDK.
//!
//! Tool failures come back as results flagged `isError` so the calling
//! agent can read the message. Only an unknown tool name is a protocol
//! error.

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, JsonObject, ListToolsResult,
    PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{ErrorData as McpError, ServerHandler, ServiceExt};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::registry::find_tool;
use crate::router::ToolRouter;

pub const SERVER_NAME: &str = "spotdesk";

const INSTRUCTIONS: &str = "Binance spot trading tools. Call configure_api_keys first \
     unless keys are already stored; other tools fail with 'Binance client not initialized' \
     until then.";

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("MCP handshake failed: {0}")]
    Handshake(String),
    #[error("MCP service task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Exposes the tool router as an MCP server.
#[derive(Clone)]
pub struct SpotdeskServer {
    router: ToolRouter,
}

impl SpotdeskServer {
    pub fn new(router: ToolRouter) -> Self {
        Self { router }
    }

    /// The registry's descriptors in MCP form.
    pub fn tools(&self) -> Vec<Tool> {
        self.router.tools().iter().map(|tool| tool.to_tool()).collect()
    }

    /// Run one tool call through the router.
    pub async fn call(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, McpError> {
        if find_tool(name).is_none() {
            return Err(McpError::invalid_params(
                format!("Unknown tool: {}", name),
                None,
            ));
        }

        let args = arguments.map(Value::Object).unwrap_or(Value::Null);
        match self.router.call(name, args).await {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result)
                    .unwrap_or_else(|_| result.to_string());
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(err) => Ok(CallToolResult::error(vec![Content::text(format!(
                "Error [{}]: {}",
                err.kind(),
                err
            ))])),
        }
    }
}

impl ServerHandler for SpotdeskServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.call(&request.name, request.arguments).await
    }
}

/// Serve on the process's stdin/stdout until the client disconnects.
pub async fn serve_stdio(server: SpotdeskServer) -> Result<(), ServeError> {
    info!("Tool server listening on stdio");
    let service = server
        .serve(rmcp::transport::stdio())
        .await
        .map_err(|e| ServeError::Handshake(e.to_string()))?;
    let reason = service.waiting().await?;
    info!(?reason, "Tool server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::ClientInfo;
    use serde_json::json;
    use spotdesk_brokers_common::{SimulatedConnector, SimulatedExchange};
    use spotdesk_engine::SpotTrader;
    use spotdesk_keystore::MemoryKeyStore;
    use std::sync::Arc;

    fn server() -> SpotdeskServer {
        let trader = SpotTrader::new(
            Arc::new(MemoryKeyStore::new()),
            Arc::new(SimulatedConnector::new(Arc::new(SimulatedExchange::default()))),
        );
        SpotdeskServer::new(ToolRouter::new(Arc::new(trader)))
    }

    fn args(value: Value) -> Option<JsonObject> {
        match value {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    fn text_of(result: &CallToolResult) -> String {
        let value = serde_json::to_value(result).unwrap();
        value["content"][0]["text"].as_str().unwrap().to_string()
    }

    fn is_error(result: &CallToolResult) -> bool {
        let value = serde_json::to_value(result).unwrap();
        value["isError"].as_bool().unwrap_or(false)
    }

    #[test]
    fn test_server_info_advertises_tools() {
        let info = server().get_info();
        assert_eq!(info.server_info.name, SERVER_NAME);
        assert_eq!(info.protocol_version, ProtocolVersion::V_2024_11_05);
        assert!(info.capabilities.tools.is_some());
    }

    #[test]
    fn test_tools_carry_registry_schemas() {
        let tools = server().tools();
        assert_eq!(tools.len(), 5);
        assert_eq!(tools[1].name, "create_spot_order");

        let value = serde_json::to_value(&tools[1]).unwrap();
        assert!(value["inputSchema"]["properties"]["timeInForce"].is_object());
        assert_eq!(
            value["inputSchema"]["required"],
            json!(["symbol", "side", "type", "quantity"])
        );
    }

    #[tokio::test]
    async fn test_tool_error_is_reported_in_result() {
        let result = server().call("get_balances", None).await.unwrap();

        assert!(is_error(&result));
        let text = text_of(&result);
        assert!(text.contains("uninitialized_client"));
        assert!(text.contains("not initialized"));
    }

    #[tokio::test]
    async fn test_configure_then_balances() {
        let server = server();
        let configured = server
            .call(
                "configure_api_keys",
                args(json!({ "apiKey": "k", "apiSecret": "s" })),
            )
            .await
            .unwrap();
        assert!(!is_error(&configured));

        let result = server.call("get_balances", None).await.unwrap();
        assert!(!is_error(&result));
        let balances: Value = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(balances[0]["asset"], "USDT");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_protocol_error() {
        let err = server().call("withdraw", None).await.unwrap_err();
        assert!(err.message.contains("withdraw"));
    }

    #[tokio::test]
    async fn test_session_over_duplex_stream() {
        let (server_io, client_io) = tokio::io::duplex(64 * 1024);
        tokio::spawn(async move {
            if let Ok(running) = server().serve(server_io).await {
                let _ = running.waiting().await;
            }
        });

        let client = ClientInfo::default().serve(client_io).await.unwrap();
        let tools = client.list_all_tools().await.unwrap();
        assert_eq!(tools.len(), 5);

        let result = client
            .call_tool(CallToolRequestParam {
                name: "get_open_orders".into(),
                arguments: None,
            })
            .await
            .unwrap();
        assert!(is_error(&result));
        assert!(text_of(&result).contains("not initialized"));

        client.cancel().await.unwrap();
    }
}
