// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data-retrieval tool layer trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::ShopdeskError;
use crate::traits::adapter::PluginAdapter;

/// The data tools available to the pipeline.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum ToolName {
    #[strum(serialize = "get_sales_analytics")]
    #[serde(rename = "get_sales_analytics")]
    SalesAnalytics,
    #[strum(serialize = "get_inventory_status")]
    #[serde(rename = "get_inventory_status")]
    InventoryStatus,
    #[strum(serialize = "get_customer_insights")]
    #[serde(rename = "get_customer_insights")]
    CustomerInsights,
    #[strum(serialize = "get_order_management")]
    #[serde(rename = "get_order_management")]
    OrderManagement,
}

impl ToolName {
    pub const ALL: [ToolName; 4] = [
        ToolName::SalesAnalytics,
        ToolName::InventoryStatus,
        ToolName::CustomerInsights,
        ToolName::OrderManagement,
    ];
}

/// Executes a named data tool with JSON arguments and returns a JSON result.
#[async_trait]
pub trait ToolLayer: PluginAdapter {
    async fn call(
        &self,
        tool: ToolName,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ShopdeskError>;
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn tool_names_use_wire_names() {
        assert_eq!(ToolName::SalesAnalytics.to_string(), "get_sales_analytics");
        assert_eq!(
            ToolName::from_str("get_order_management").unwrap(),
            ToolName::OrderManagement
        );
        assert_eq!(
            serde_json::to_string(&ToolName::InventoryStatus).unwrap(),
            "\"get_inventory_status\""
        );
    }
}
