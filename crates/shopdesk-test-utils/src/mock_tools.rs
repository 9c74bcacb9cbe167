// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock tool layer returning canned reports and recording every call.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{Value, json};
use shopdesk_core::{
    AdapterType, HealthStatus, PluginAdapter, ShopdeskError, ToolLayer, ToolName,
};

#[derive(Debug, Default)]
pub struct MockTools {
    failing: HashSet<ToolName>,
    panicking: HashSet<ToolName>,
    calls: Mutex<Vec<(ToolName, Value)>>,
}

impl MockTools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call to `tool` fail.
    pub fn failing(mut self, tool: ToolName) -> Self {
        self.failing.insert(tool);
        self
    }

    /// Makes every call to `tool` panic, like a buggy adapter would.
    pub fn panicking(mut self, tool: ToolName) -> Self {
        self.panicking.insert(tool);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(ToolName, Value)>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Recorded `(tool, args)` pairs, oldest first.
    pub fn calls(&self) -> Vec<(ToolName, Value)> {
        self.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().len()
    }
}

/// The report a tool returns when it is not told to fail.
pub fn canned_report(tool: ToolName, args: &Value) -> Value {
    match tool {
        ToolName::SalesAnalytics => json!({
            "period": args.get("period").cloned().unwrap_or(json!("30days")),
            "total_records": 3,
            "revenue": {"total": 180.0, "average_order_value": 60.0},
            "orders": {"total": 3, "completed": 2, "processing": 1},
            "top_products": [{"name": "Linen Shirt", "quantity": 4, "revenue": 120.0}],
        }),
        ToolName::InventoryStatus => json!({
            "summary": {"total_products": 12, "total_stock_value": 5400.0, "alert_count": 1},
            "alerts": [{"sku": "TS-BLK-M", "name": "Black Tee M", "stock_quantity": 0, "alert_type": "out_of_stock"}],
        }),
        ToolName::CustomerInsights => json!({
            "segment": "all",
            "total_customers": 2,
            "top_customers": [{"name": "Ada", "total_spent": 1200.0, "order_count": 6}],
        }),
        ToolName::OrderManagement => json!({
            "total_orders": 3,
            "filters": {"status": "all"},
            "recent_orders": [],
        }),
    }
}

#[async_trait]
impl PluginAdapter for MockTools {
    fn name(&self) -> &str {
        "mock-tools"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
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
impl ToolLayer for MockTools {
    async fn call(&self, tool: ToolName, args: Value) -> Result<Value, ShopdeskError> {
        self.lock().push((tool, args.clone()));
        if self.panicking.contains(&tool) {
            panic!("mock tool {tool} panicked");
        }
        if self.failing.contains(&tool) {
            return Err(ShopdeskError::Tool {
                tool: tool.to_string(),
                message: "mock failure".into(),
            });
        }
        Ok(canned_report(tool, &args))
    }
}
