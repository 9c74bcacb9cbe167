// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Confidence scoring for finished answers.

use serde_json::Value;
use shopdesk_core::Intent;

/// Scores how well the fetched data supports an answer.
pub trait ConfidencePolicy: Send + Sync {
    /// Returns a score in `[0, 1]`.
    fn score(&self, intent: Intent, data: &Value) -> f64;
}

/// Rewards richer payloads: 0.75 plus 0.05 per top-level key, capped at 1.
///
/// Empty data or data carrying an `error` key scores 0.1.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConfidence;

impl ConfidencePolicy for DefaultConfidence {
    fn score(&self, _intent: Intent, data: &Value) -> f64 {
        let keys = match data {
            Value::Object(map) if map.contains_key("error") => return 0.1,
            Value::Object(map) => map.len(),
            Value::Array(items) => items.len(),
            Value::Null => 0,
            _ => 1,
        };
        if keys == 0 {
            return 0.1;
        }
        let score = 0.75 + 0.05 * keys as f64;
        ((score * 100.0).round() / 100.0).min(1.0)
    }
}
