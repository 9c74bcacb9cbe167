// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the pipeline stages and adapters.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

impl HealthStatus {
    /// Short lowercase label used in health reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded(_) => "degraded",
            Self::Unhealthy(_) => "unhealthy",
        }
    }
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Store,
    Provider,
    Tools,
    Storage,
}

/// Permissions that bypass the sensitive-keyword check.
const ADMIN_PERMISSIONS: [&str; 2] = ["admin", "superuser"];

/// Immutable per-request identity and authorization context.
///
/// Built once at request entry with the `with_*` methods and then only read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RequestContextRecord")]
pub struct RequestContext {
    user_id: String,
    session_id: String,
    permissions: BTreeSet<String>,
    rate_limit_key: String,
    metadata: BTreeMap<String, serde_json::Value>,
}

impl RequestContext {
    /// Creates a context with no permissions and the default `user:{id}` quota key.
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        Self {
            rate_limit_key: default_rate_limit_key(&user_id),
            user_id,
            session_id: session_id.into(),
            permissions: BTreeSet::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    /// Overrides the partition key used for rate limiting.
    pub fn with_rate_limit_key(mut self, key: impl Into<String>) -> Self {
        self.rate_limit_key = key.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Permissions in sorted order.
    pub fn permissions(&self) -> &BTreeSet<String> {
        &self.permissions
    }

    pub fn rate_limit_key(&self) -> &str {
        &self.rate_limit_key
    }

    pub fn metadata(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// True when the context carries an `admin` or `superuser` permission.
    pub fn is_admin(&self) -> bool {
        ADMIN_PERMISSIONS.iter().any(|p| self.has_permission(p))
    }
}

fn default_rate_limit_key(user_id: &str) -> String {
    format!("user:{user_id}")
}

#[derive(Deserialize)]
struct RequestContextRecord {
    user_id: String,
    session_id: String,
    #[serde(default)]
    permissions: BTreeSet<String>,
    #[serde(default)]
    rate_limit_key: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, serde_json::Value>,
}

impl From<RequestContextRecord> for RequestContext {
    fn from(record: RequestContextRecord) -> Self {
        let rate_limit_key = record
            .rate_limit_key
            .filter(|k| !k.trim().is_empty())
            .unwrap_or_else(|| default_rate_limit_key(&record.user_id));
        Self {
            user_id: record.user_id,
            session_id: record.session_id,
            permissions: record.permissions,
            rate_limit_key,
            metadata: record.metadata,
        }
    }
}

/// The closed set of query categories the classifier may produce.
///
/// Only the first seven are routed to a data handler; the rest are accepted
/// from the classifier but answered with a "no handler" payload.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Intent {
    InventoryStatus,
    SalesData,
    ProductPerformance,
    OrderStatus,
    CustomerInsights,
    RevenueAnalysis,
    GeneralStats,
    GrowthTrends,
    TopProducts,
    UserManagement,
    SystemHealth,
    RecommendationsRequest,
}

impl Intent {
    pub const ALL: [Intent; 12] = [
        Intent::InventoryStatus,
        Intent::SalesData,
        Intent::ProductPerformance,
        Intent::OrderStatus,
        Intent::CustomerInsights,
        Intent::RevenueAnalysis,
        Intent::GeneralStats,
        Intent::GrowthTrends,
        Intent::TopProducts,
        Intent::UserManagement,
        Intent::SystemHealth,
        Intent::RecommendationsRequest,
    ];

    /// Whether a data handler exists for this intent.
    pub fn is_routable(self) -> bool {
        matches!(
            self,
            Intent::InventoryStatus
                | Intent::SalesData
                | Intent::ProductPerformance
                | Intent::OrderStatus
                | Intent::CustomerInsights
                | Intent::RevenueAnalysis
                | Intent::GeneralStats
        )
    }

    /// Human-readable form, e.g. `"Sales Data"`.
    pub fn display_name(self) -> String {
        self.to_string()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
