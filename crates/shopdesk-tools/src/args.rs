// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed tool arguments.
//!
//! Every tool accepts a JSON object; missing fields take the defaults below
//! and unknown enum values are rejected as invalid parameters.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shopdesk_core::{ShopdeskError, ToolName};

/// Reporting window ending now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "7days")]
    SevenDays,
    #[default]
    #[serde(rename = "30days")]
    ThirtyDays,
    #[serde(rename = "90days")]
    NinetyDays,
    #[serde(rename = "1year")]
    OneYear,
    #[serde(rename = "all_time")]
    AllTime,
}

impl Period {
    /// Start of the window, or `None` for an unbounded one.
    pub fn start(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Period::Today => now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map(|midnight| midnight.and_utc()),
            Period::SevenDays => Some(now - Duration::days(7)),
            Period::ThirtyDays => Some(now - Duration::days(30)),
            Period::NinetyDays => Some(now - Duration::days(90)),
            Period::OneYear => Some(now - Duration::days(365)),
            Period::AllTime => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalesMetric {
    Revenue,
    Orders,
    AvgOrderValue,
    TopProducts,
    CustomerSegments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    Day,
    Week,
    Month,
    Category,
    Customer,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SalesArgs {
    pub period: Period,
    pub metrics: Vec<SalesMetric>,
    pub group_by: GroupBy,
}

impl Default for SalesArgs {
    fn default() -> Self {
        Self {
            period: Period::ThirtyDays,
            metrics: vec![
                SalesMetric::Revenue,
                SalesMetric::Orders,
                SalesMetric::AvgOrderValue,
            ],
            group_by: GroupBy::Day,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    LowStock,
    OutOfStock,
    #[default]
    All,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InventoryArgs {
    pub product_ids: Option<Vec<i64>>,
    pub category: Option<String>,
    pub alert_level: AlertLevel,
    pub include_recommendations: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    HighValue,
    FrequentBuyers,
    NewCustomers,
    #[default]
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    Ltv,
    #[default]
    Behavior,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CustomerArgs {
    pub segment: Segment,
    pub analysis_type: AnalysisType,
    pub time_period: Period,
}

impl Default for CustomerArgs {
    fn default() -> Self {
        Self {
            segment: Segment::All,
            analysis_type: AnalysisType::Behavior,
            time_period: Period::NinetyDays,
        }
    }
}

/// Order status filter. Customer-facing names map onto stored statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    #[default]
    All,
}

impl StatusFilter {
    /// The stored `orders.status` value, or `None` for no filter.
    pub fn stored_status(self) -> Option<&'static str> {
        match self {
            StatusFilter::Pending | StatusFilter::Processing => Some("processing"),
            StatusFilter::Shipped => Some("in_transit"),
            StatusFilter::Delivered => Some("completed"),
            StatusFilter::Cancelled => Some("rejected"),
            StatusFilter::All => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrderArgs {
    pub status: StatusFilter,
    pub date_range: Option<DateRange>,
    pub customer_id: Option<i64>,
    pub analytics: bool,
}

/// Parses tool arguments, treating `null` as an empty object.
pub fn parse<T>(tool: ToolName, args: serde_json::Value) -> Result<T, ShopdeskError>
where
    T: for<'de> Deserialize<'de>,
{
    let args = if args.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| ShopdeskError::Tool {
        tool: tool.to_string(),
        message: format!("invalid arguments: {e}"),
    })
}

/// Formats a bound the way catalog timestamps are stored.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn sales_args_defaults_and_wire_names() {
        let args: SalesArgs = parse(ToolName::SalesAnalytics, json!({})).unwrap();
        assert_eq!(args, SalesArgs::default());

        let args: SalesArgs = parse(
            ToolName::SalesAnalytics,
            json!({"period": "7days", "metrics": ["top_products"], "group_by": "week"}),
        )
        .unwrap();
        assert_eq!(args.period, Period::SevenDays);
        assert_eq!(args.metrics, vec![SalesMetric::TopProducts]);
        assert_eq!(args.group_by, GroupBy::Week);
    }

    #[test]
    fn null_args_use_defaults() {
        let args: OrderArgs = parse(ToolName::OrderManagement, serde_json::Value::Null).unwrap();
        assert_eq!(args.status, StatusFilter::All);
        assert!(!args.analytics);
    }

    #[test]
    fn unknown_values_are_rejected() {
        let err = parse::<SalesArgs>(ToolName::SalesAnalytics, json!({"period": "decade"}))
            .unwrap_err();
        assert!(matches!(err, ShopdeskError::Tool { ref tool, .. } if tool == "get_sales_analytics"));
        assert!(parse::<InventoryArgs>(ToolName::InventoryStatus, json!({"bogus": 1})).is_err());
    }

    #[test]
    fn status_filter_maps_to_stored_values() {
        assert_eq!(StatusFilter::Shipped.stored_status(), Some("in_transit"));
        assert_eq!(StatusFilter::Delivered.stored_status(), Some("completed"));
        assert_eq!(StatusFilter::Cancelled.stored_status(), Some("rejected"));
        assert_eq!(StatusFilter::All.stored_status(), None);
    }

    #[test]
    fn period_windows() {
        let now = DateTime::parse_from_rfc3339("2026-05-10T15:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(timestamp(Period::Today.start(now).unwrap()), "2026-05-10T00:00:00Z");
        assert_eq!(timestamp(Period::SevenDays.start(now).unwrap()), "2026-05-03T15:30:00Z");
        assert!(Period::AllTime.start(now).is_none());
    }
}
