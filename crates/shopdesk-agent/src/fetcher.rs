// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routes a classified intent to the data tool that answers it.

use std::sync::Arc;

use serde_json::{Value, json};
use shopdesk_core::{Intent, RequestContext, ShopdeskError, ToolLayer, ToolName};
use tracing::{debug, error, warn};

pub struct DataFetcher {
    tools: Arc<dyn ToolLayer>,
}

impl DataFetcher {
    pub fn new(tools: Arc<dyn ToolLayer>) -> Self {
        Self { tools }
    }

    /// Fetches the data behind an answer for `intent`.
    ///
    /// Intents without a handler produce an `{"error": ...}` payload rather
    /// than an error. Tool failures collapse into a single
    /// [`ShopdeskError::DataFetch`] naming the intent.
    pub async fn fetch_data(
        &self,
        intent: Intent,
        query: &str,
        ctx: &RequestContext,
    ) -> Result<Value, ShopdeskError> {
        debug!(user_id = ctx.user_id(), %intent, "fetching data");
        let outcome = match intent {
            Intent::InventoryStatus => {
                self.call(
                    ToolName::InventoryStatus,
                    json!({"alert_level": "all", "include_recommendations": true}),
                )
                .await
            }
            Intent::SalesData => {
                self.call(
                    ToolName::SalesAnalytics,
                    json!({
                        "period": extract_period(query),
                        "metrics": ["revenue", "orders", "avg_order_value", "top_products"],
                        "group_by": "day",
                    }),
                )
                .await
            }
            Intent::ProductPerformance => {
                self.call(
                    ToolName::SalesAnalytics,
                    json!({"period": "30days", "metrics": ["top_products", "customer_segments"]}),
                )
                .await
            }
            Intent::OrderStatus => {
                self.call(
                    ToolName::OrderManagement,
                    json!({"status": "all", "analytics": true}),
                )
                .await
            }
            Intent::CustomerInsights => {
                self.call(
                    ToolName::CustomerInsights,
                    json!({"segment": "all", "analysis_type": "behavior", "time_period": "90days"}),
                )
                .await
            }
            Intent::RevenueAnalysis => {
                self.call(
                    ToolName::SalesAnalytics,
                    json!({"period": "30days", "metrics": ["revenue"], "group_by": "day"}),
                )
                .await
            }
            Intent::GeneralStats => Ok(self.general_stats().await),
            Intent::GrowthTrends
            | Intent::TopProducts
            | Intent::UserManagement
            | Intent::SystemHealth
            | Intent::RecommendationsRequest => {
                warn!(%intent, "no data handler for intent");
                return Ok(json!({ "error": format!("No handler for intent '{intent}'") }));
            }
        };

        outcome.map_err(|e| {
            error!(user_id = ctx.user_id(), %intent, error = %e, "data fetch failed");
            ShopdeskError::DataFetch {
                message: format!("Failed to fetch data for {intent}"),
                source: Some(Box::new(e)),
            }
        })
    }

    async fn call(&self, tool: ToolName, args: Value) -> Result<Value, ShopdeskError> {
        self.tools.call(tool, args).await
    }

    async fn general_stats(&self) -> Value {
        let inventory = self
            .call(ToolName::InventoryStatus, json!({"alert_level": "all"}))
            .await;
        let sales = self
            .call(
                ToolName::SalesAnalytics,
                json!({"period": "30days", "metrics": ["revenue", "orders"]}),
            )
            .await;

        match (inventory, sales) {
            (Ok(inventory), Ok(sales)) => json!({
                "message": "Here's your business overview",
                "inventory_summary": inventory.get("summary").cloned().unwrap_or_else(|| json!({})),
                "sales_summary": {
                    "total_revenue": sales.pointer("/revenue/total").cloned().unwrap_or(json!(0)),
                    "total_orders": sales.pointer("/orders/total").cloned().unwrap_or(json!(0)),
                },
                "suggestions": [
                    "Show me inventory alerts",
                    "What are my top selling products?",
                    "Show me customer insights",
                    "Display order analytics",
                ],
            }),
            (inventory, sales) => {
                if let Err(e) = inventory.and(sales) {
                    warn!(error = %e, "business overview unavailable, answering with capabilities");
                }
                json!({
                    "message": "I can provide information about sales, inventory, orders, customers, and revenue. What would you like to know?",
                    "available_insights": [
                        "Sales performance and trends",
                        "Inventory levels and stock status",
                        "Order management and tracking",
                        "Customer behavior and insights",
                        "Revenue analysis and forecasting",
                    ],
                })
            }
        }
    }
}

/// Picks the sales reporting window mentioned in `query`.
pub fn extract_period(query: &str) -> &'static str {
    let q = query.to_lowercase();
    if q.contains("today") {
        "today"
    } else if q.contains("week") || q.contains("7 days") {
        "7days"
    } else if q.contains("month") || q.contains("30 days") {
        "30days"
    } else if q.contains("quarter") || q.contains("90 days") {
        "90days"
    } else if q.contains("year") {
        "1year"
    } else {
        "30days"
    }
}

#[cfg(test)]
mod tests {
    use shopdesk_test_utils::MockTools;

    use super::*;

    fn ctx() -> RequestContext {
        RequestContext::new("u1", "s1")
    }

    #[test]
    fn period_keywords() {
        assert_eq!(extract_period("sales TODAY"), "today");
        assert_eq!(extract_period("what are my sales this week?"), "7days");
        assert_eq!(extract_period("last 7 days"), "7days");
        assert_eq!(extract_period("this month"), "30days");
        assert_eq!(extract_period("Q3 quarter"), "90days");
        assert_eq!(extract_period("last 90 days"), "90days");
        assert_eq!(extract_period("year to date"), "1year");
        assert_eq!(extract_period("how are we doing"), "30days");
    }

    #[tokio::test]
    async fn sales_intent_passes_extracted_period() {
        let tools = Arc::new(MockTools::new());
        let fetcher = DataFetcher::new(tools.clone());
        fetcher
            .fetch_data(Intent::SalesData, "what are my sales this week?", &ctx())
            .await
            .unwrap();
        let calls = tools.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, ToolName::SalesAnalytics);
        assert_eq!(calls[0].1["period"], "7days");
        assert_eq!(calls[0].1["group_by"], "day");
    }

    #[tokio::test]
    async fn routable_intents_map_to_tools() {
        let cases = [
            (Intent::InventoryStatus, ToolName::InventoryStatus),
            (Intent::ProductPerformance, ToolName::SalesAnalytics),
            (Intent::OrderStatus, ToolName::OrderManagement),
            (Intent::CustomerInsights, ToolName::CustomerInsights),
            (Intent::RevenueAnalysis, ToolName::SalesAnalytics),
        ];
        for (intent, tool) in cases {
            let tools = Arc::new(MockTools::new());
            DataFetcher::new(tools.clone())
                .fetch_data(intent, "q", &ctx())
                .await
                .unwrap();
            assert_eq!(tools.calls()[0].0, tool, "{intent}");
        }
    }

    #[tokio::test]
    async fn auxiliary_intents_have_no_handler() {
        let tools = Arc::new(MockTools::new());
        let data = DataFetcher::new(tools.clone())
            .fetch_data(Intent::GrowthTrends, "q", &ctx())
            .await
            .unwrap();
        assert_eq!(data, json!({"error": "No handler for intent 'growth_trends'"}));
        assert!(tools.calls().is_empty());
    }

    #[tokio::test]
    async fn tool_failure_becomes_data_fetch_error() {
        let tools = Arc::new(MockTools::new().failing(ToolName::OrderManagement));
        let err = DataFetcher::new(tools)
            .fetch_data(Intent::OrderStatus, "q", &ctx())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch data for order_status");
        assert!(err.is_user_facing());
    }

    #[tokio::test]
    async fn general_stats_summarizes_both_tools() {
        let tools = Arc::new(MockTools::new());
        let data = DataFetcher::new(tools.clone())
            .fetch_data(Intent::GeneralStats, "hi", &ctx())
            .await
            .unwrap();
        assert_eq!(data["message"], "Here's your business overview");
        assert!(data["sales_summary"].get("total_revenue").is_some());
        assert_eq!(tools.calls().len(), 2);
    }

    #[tokio::test]
    async fn general_stats_degrades_to_capabilities() {
        let tools = Arc::new(MockTools::new().failing(ToolName::SalesAnalytics));
        let data = DataFetcher::new(tools)
            .fetch_data(Intent::GeneralStats, "hi", &ctx())
            .await
            .unwrap();
        assert!(data.get("available_insights").is_some());
        assert!(data.get("error").is_none());
    }
}
