// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The final outcome of one chat query.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Intent;

/// Results at or above this confidence are considered confident.
pub const CONFIDENT_THRESHOLD: f64 = 0.7;

/// Outcome of one pipeline run.
///
/// Confidence is always within `[0, 1]` and execution time is never negative,
/// however the value was built (including deserialization from the cache).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PipelineResultRecord")]
pub struct PipelineResult {
    query: String,
    intent: Intent,
    response: String,
    data: serde_json::Value,
    timestamp: DateTime<Utc>,
    execution_time: f64,
    confidence: f64,
    session_id: String,
    message_id: Uuid,
    error: Option<String>,
    metadata: BTreeMap<String, serde_json::Value>,
}

impl PipelineResult {
    /// Creates a result stamped with the current time and a fresh message id.
    pub fn new(
        query: impl Into<String>,
        intent: Intent,
        response: impl Into<String>,
        data: serde_json::Value,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            intent,
            response: response.into(),
            data,
            timestamp: Utc::now(),
            execution_time: 0.0,
            confidence: 0.0,
            session_id: session_id.into(),
            message_id: Uuid::new_v4(),
            error: None,
            metadata: BTreeMap::new(),
        }
    }

    /// The degraded result reported when a query could not be answered.
    pub fn failed(
        query: impl Into<String>,
        session_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        let mut result = Self::new(
            query,
            Intent::GeneralStats,
            message.clone(),
            serde_json::json!({ "error": message }),
            session_id,
        );
        result.error = Some(message);
        result
    }

    pub fn with_execution_time(mut self, seconds: f64) -> Self {
        self.execution_time = clamp_non_negative(seconds);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = clamp_unit(confidence);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn intent(&self) -> Intent {
        self.intent
    }

    /// The narrative answer text.
    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Elapsed processing time in seconds.
    pub fn execution_time(&self) -> f64 {
        self.execution_time
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn message_id(&self) -> Uuid {
        self.message_id
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }

    pub fn is_confident(&self) -> bool {
        self.confidence >= CONFIDENT_THRESHOLD
    }

    pub fn is_successful(&self) -> bool {
        self.error.is_none()
    }
}

/// Clamps to `[0, 1]`; NaN becomes 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

/// Clamps to a finite non-negative number; NaN and infinities become 0.
pub fn clamp_non_negative(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

#[derive(Deserialize)]
struct PipelineResultRecord {
    query: String,
    intent: Intent,
    response: String,
    #[serde(default)]
    data: serde_json::Value,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    execution_time: f64,
    #[serde(default)]
    confidence: f64,
    session_id: String,
    message_id: Uuid,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, serde_json::Value>,
}

impl From<PipelineResultRecord> for PipelineResult {
    fn from(r: PipelineResultRecord) -> Self {
        Self {
            query: r.query,
            intent: r.intent,
            response: r.response,
            data: r.data,
            timestamp: r.timestamp,
            execution_time: clamp_non_negative(r.execution_time),
            confidence: clamp_unit(r.confidence),
            session_id: r.session_id,
            message_id: r.message_id,
            error: r.error,
            metadata: r.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    fn sample() -> PipelineResult {
        PipelineResult::new(
            "what are my sales?",
            Intent::SalesData,
            "Sales are up.",
            json!({"revenue": 10}),
            "s-1",
        )
    }

    #[test]
    fn confidence_is_clamped_into_unit_interval() {
        assert_eq!(sample().with_confidence(1.7).confidence(), 1.0);
        assert_eq!(sample().with_confidence(-0.2).confidence(), 0.0);
        assert_eq!(sample().with_confidence(f64::NAN).confidence(), 0.0);
        assert_eq!(sample().with_confidence(0.85).confidence(), 0.85);
    }

    #[test]
    fn execution_time_is_never_negative() {
        assert_eq!(sample().with_execution_time(-3.0).execution_time(), 0.0);
        assert_eq!(sample().with_execution_time(f64::INFINITY).execution_time(), 0.0);
        assert_eq!(sample().with_execution_time(1.25).execution_time(), 1.25);
    }

    #[test]
    fn confident_threshold_is_inclusive() {
        assert!(sample().with_confidence(0.7).is_confident());
        assert!(!sample().with_confidence(0.69).is_confident());
    }

    #[test]
    fn failed_result_is_degraded_general_stats() {
        let r = PipelineResult::failed("q", "s-1", "Rate limit exceeded");
        assert_eq!(r.intent(), Intent::GeneralStats);
        assert_eq!(r.response(), "Rate limit exceeded");
        assert_eq!(r.data(), &json!({"error": "Rate limit exceeded"}));
        assert_eq!(r.error(), Some("Rate limit exceeded"));
        assert_eq!(r.confidence(), 0.0);
        assert_eq!(r.execution_time(), 0.0);
        assert!(!r.is_successful());
    }

    #[test]
    fn deserialization_clamps_out_of_range_values() {
        let mut value = serde_json::to_value(sample()).unwrap();
        value["confidence"] = json!(3.5);
        value["execution_time"] = json!(-1.0);
        let r: PipelineResult = serde_json::from_value(value).unwrap();
        assert_eq!(r.confidence(), 1.0);
        assert_eq!(r.execution_time(), 0.0);
    }

    #[test]
    fn serialized_result_round_trips() {
        let original = sample().with_confidence(0.8).with_execution_time(0.5);
        let text = serde_json::to_string(&original).unwrap();
        let back: PipelineResult = serde_json::from_str(&text).unwrap();
        assert_eq!(back, original);
    }

    proptest! {
        #[test]
        fn any_confidence_input_lands_in_range(c in proptest::num::f64::ANY) {
            let r = sample().with_confidence(c);
            prop_assert!((0.0..=1.0).contains(&r.confidence()));
        }

        #[test]
        fn any_execution_time_input_is_non_negative(t in proptest::num::f64::ANY) {
            let r = sample().with_execution_time(t);
            prop_assert!(r.execution_time() >= 0.0);
        }
    }
}
