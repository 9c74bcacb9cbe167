// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON-RPC 2.0 front end for a [`ToolLayer`].
//!
//! Supports `initialize`, `tools/list` and `tools/call`. Tool results are
//! returned as a single pretty-printed text content block.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use shopdesk_core::{ShopdeskError, ToolLayer, ToolName};
use strum::{Display, EnumString};
use tracing::{debug, error};

use crate::schema;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum ToolMethod {
    #[strum(serialize = "initialize")]
    Initialize,
    #[strum(serialize = "tools/list")]
    ListTools,
    #[strum(serialize = "tools/call")]
    CallTool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Option<Value>, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

pub struct ToolServer {
    tools: Arc<dyn ToolLayer>,
    name: String,
    version: String,
}

impl ToolServer {
    pub fn new(tools: Arc<dyn ToolLayer>) -> Self {
        Self {
            tools,
            name: "shopdesk-tools".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }

    /// Handles an untyped JSON-RPC message.
    pub async fn handle_value(&self, raw: Value) -> RpcResponse {
        let id = raw.get("id").cloned();
        match serde_json::from_value::<RpcRequest>(raw) {
            Ok(request) => self.handle(request).await,
            Err(e) => RpcResponse::failure(id, INVALID_REQUEST, format!("Invalid request: {e}")),
        }
    }

    pub async fn handle(&self, request: RpcRequest) -> RpcResponse {
        let Ok(method) = ToolMethod::from_str(&request.method) else {
            return RpcResponse::failure(request.id, METHOD_NOT_FOUND, "Method not found");
        };
        debug!(method = %method, "tool server request");
        match method {
            ToolMethod::Initialize => RpcResponse::success(
                request.id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {"tools": {"listChanged": false}},
                    "serverInfo": {"name": self.name, "version": self.version},
                }),
            ),
            ToolMethod::ListTools => {
                RpcResponse::success(request.id, json!({"tools": schema::all()}))
            }
            ToolMethod::CallTool => self.call_tool(request.id, request.params).await,
        }
    }

    async fn call_tool(&self, id: Option<Value>, params: Value) -> RpcResponse {
        let params: CallParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => return RpcResponse::failure(id, INVALID_PARAMS, format!("Invalid params: {e}")),
        };
        let Ok(tool) = ToolName::from_str(&params.name) else {
            return RpcResponse::failure(
                id,
                INVALID_PARAMS,
                format!("Tool '{}' not found", params.name),
            );
        };

        match self.tools.call(tool, params.arguments).await {
            Ok(result) => match serde_json::to_string_pretty(&result) {
                Ok(text) => RpcResponse::success(
                    id,
                    json!({"content": [{"type": "text", "text": text}]}),
                ),
                Err(e) => RpcResponse::failure(id, INTERNAL_ERROR, format!("Tool execution failed: {e}")),
            },
            Err(ShopdeskError::Tool { message, .. }) => RpcResponse::failure(id, INVALID_PARAMS, message),
            Err(e) => {
                error!(tool = %tool, error = %e, "tool execution failed");
                RpcResponse::failure(id, INTERNAL_ERROR, format!("Tool execution failed: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use shopdesk_core::{AdapterType, HealthStatus, PluginAdapter};

    use super::*;

    struct StaticTools;

    #[async_trait]
    impl PluginAdapter for StaticTools {
        fn name(&self) -> &str {
            "static"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 0, 1)
        }
        fn adapter_type(&self) -> AdapterType {
            AdapterType::Tools
        }
        async fn health_check(&self) -> Result<HealthStatus, ShopdeskError> {
            Ok(HealthStatus::Healthy)
        }
        async fn shutdown(&self) -> Result<(), ShopdeskError> {
            Ok(())
        }
    }

    #[async_trait]
    impl ToolLayer for StaticTools {
        async fn call(&self, tool: ToolName, args: Value) -> Result<Value, ShopdeskError> {
            match tool {
                ToolName::SalesAnalytics => Ok(json!({"echo": args})),
                ToolName::InventoryStatus => Err(ShopdeskError::Tool {
                    tool: tool.to_string(),
                    message: "invalid arguments: bad".into(),
                }),
                _ => Err(ShopdeskError::Internal("db gone".into())),
            }
        }
    }

    fn server() -> ToolServer {
        ToolServer::new(Arc::new(StaticTools))
    }

    async fn send(raw: Value) -> RpcResponse {
        server().handle_value(raw).await
    }

    #[tokio::test]
    async fn initialize_reports_server_info() {
        let resp = send(json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"})).await;
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "shopdesk-tools");
        assert_eq!(resp.id, Some(json!(1)));
    }

    #[tokio::test]
    async fn list_tools_includes_all_four() {
        let resp = send(json!({"id": "a", "method": "tools/list"})).await;
        let tools = resp.result.unwrap()["tools"].as_array().unwrap().clone();
        assert_eq!(tools.len(), 4);
        assert_eq!(tools[0]["name"], "get_sales_analytics");
        assert!(tools[0]["inputSchema"]["properties"]["period"].is_object());
    }

    #[tokio::test]
    async fn call_wraps_result_in_text_content() {
        let resp = send(json!({
            "id": 2,
            "method": "tools/call",
            "params": {"name": "get_sales_analytics", "arguments": {"period": "7days"}}
        }))
        .await;
        let text = resp.result.unwrap()["content"][0]["text"]
            .as_str()
            .unwrap()
            .to_string();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["echo"]["period"], "7days");
    }

    #[tokio::test]
    async fn error_codes() {
        let code = |resp: RpcResponse| resp.error.unwrap().code;
        assert_eq!(code(send(json!({"id": 1, "method": "resources/list"})).await), METHOD_NOT_FOUND);
        assert_eq!(
            code(send(json!({"id": 1, "method": "tools/call", "params": {"name": "nope"}})).await),
            INVALID_PARAMS
        );
        assert_eq!(
            code(send(json!({"id": 1, "method": "tools/call", "params": {"name": "get_inventory_status"}})).await),
            INVALID_PARAMS
        );
        assert_eq!(
            code(send(json!({"id": 1, "method": "tools/call", "params": {"name": "get_order_management"}})).await),
            INTERNAL_ERROR
        );
        assert_eq!(code(send(json!({"id": 1})).await), INVALID_REQUEST);
    }
}
