// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool descriptions and JSON Schemas advertised by `tools/list`.

use serde::Serialize;
use serde_json::{Value, json};
use shopdesk_core::ToolName;

/// A tool as advertised to clients.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: ToolName,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

pub fn describe(tool: ToolName) -> ToolDefinition {
    let (description, input_schema) = match tool {
        ToolName::SalesAnalytics => (
            "Retrieve sales analytics including revenue, orders and trends",
            json!({
                "type": "object",
                "properties": {
                    "period": {
                        "type": "string",
                        "enum": ["today", "7days", "30days", "90days", "1year", "all_time"]
                    },
                    "metrics": {
                        "type": "array",
                        "items": {
                            "type": "string",
                            "enum": ["revenue", "orders", "avg_order_value", "top_products", "customer_segments"]
                        }
                    },
                    "group_by": {
                        "type": "string",
                        "enum": ["day", "week", "month", "category", "customer"]
                    }
                }
            }),
        ),
        ToolName::InventoryStatus => (
            "Check stock levels, low and out-of-stock alerts, and reorder recommendations",
            json!({
                "type": "object",
                "properties": {
                    "product_ids": {"type": "array", "items": {"type": "integer"}},
                    "category": {"type": "string"},
                    "alert_level": {"type": "string", "enum": ["low_stock", "out_of_stock", "all"]},
                    "include_recommendations": {"type": "boolean"}
                }
            }),
        ),
        ToolName::CustomerInsights => (
            "Analyze customer behavior, segments and lifetime value",
            json!({
                "type": "object",
                "properties": {
                    "segment": {
                        "type": "string",
                        "enum": ["high_value", "frequent_buyers", "new_customers", "all"]
                    },
                    "analysis_type": {"type": "string", "enum": ["ltv", "behavior"]},
                    "time_period": {"type": "string", "enum": ["30days", "90days", "1year", "all_time"]}
                }
            }),
        ),
        ToolName::OrderManagement => (
            "Analyze orders by status, date range and customer",
            json!({
                "type": "object",
                "properties": {
                    "status": {
                        "type": "string",
                        "enum": ["pending", "processing", "shipped", "delivered", "cancelled", "all"]
                    },
                    "date_range": {
                        "type": "object",
                        "properties": {
                            "start": {"type": "string", "format": "date"},
                            "end": {"type": "string", "format": "date"}
                        }
                    },
                    "customer_id": {"type": "integer"},
                    "analytics": {"type": "boolean"}
                }
            }),
        ),
    };
    ToolDefinition {
        name: tool,
        description,
        input_schema,
    }
}

/// Definitions for every tool, in a stable order.
pub fn all() -> Vec<ToolDefinition> {
    ToolName::ALL.into_iter().map(describe).collect()
}
