// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query validation and sanitization.
//!
//! Runs before anything else touches the query: length bounds, the
//! injection blocklist, and the sensitive-keyword permission gate.

use regex::{RegexSet, RegexSetBuilder};
use shopdesk_config::model::QueryConfig;
use shopdesk_core::{RequestContext, ShopdeskError};
use tracing::warn;

#[derive(Debug)]
pub struct QueryValidator {
    max_length: usize,
    blocked: RegexSet,
    sensitive_keywords: Vec<String>,
}

impl QueryValidator {
    /// Compiles the configured blocklist. An invalid pattern is a configuration error.
    pub fn new(config: &QueryConfig) -> Result<Self, ShopdeskError> {
        let blocked = RegexSetBuilder::new(&config.blocked_patterns)
            .case_insensitive(true)
            .build()
            .map_err(|e| ShopdeskError::Config(format!("invalid blocked query pattern: {e}")))?;
        Ok(Self {
            max_length: config.max_query_length,
            blocked,
            sensitive_keywords: config
                .sensitive_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
        })
    }

    /// Returns the trimmed, HTML-escaped query or the reason it was refused.
    pub fn validate_and_sanitize(
        &self,
        raw: &str,
        ctx: &RequestContext,
    ) -> Result<String, ShopdeskError> {
        let query = raw.trim();
        if query.is_empty() {
            return Err(ShopdeskError::Validation("Query cannot be empty".into()));
        }
        if raw.chars().count() > self.max_length {
            return Err(ShopdeskError::Validation(format!(
                "Query too long. Max {} chars",
                self.max_length
            )));
        }

        if self.blocked.is_match(raw) {
            warn!(
                user_id = ctx.user_id(),
                session_id = ctx.session_id(),
                "query rejected by blocklist"
            );
            return Err(ShopdeskError::Validation(
                "Query contains prohibited content".into(),
            ));
        }

        let lowered = raw.to_lowercase();
        if !ctx.is_admin()
            && self
                .sensitive_keywords
                .iter()
                .any(|k| lowered.contains(k.as_str()))
        {
            warn!(user_id = ctx.user_id(), "sensitive query without admin permission");
            return Err(ShopdeskError::Validation("Insufficient permissions".into()));
        }

        Ok(escape_html(query))
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}
