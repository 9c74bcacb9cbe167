// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM-backed intent classification and answer generation.
//!
//! Both calls run in JSON mode behind separate circuit breakers. They return
//! `Err` only for transport failures or an open breaker; the pipeline picks
//! the fallback at the call site.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shopdesk_core::{
    ChatMessage, CompletionRequest, Intent, LlmProvider, RequestContext, ShopdeskError,
};
use shopdesk_resilience::{BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig};
use tracing::{debug, error, warn};

const CLASSIFIER_SYSTEM_PROMPT: &str = "You are an expert intent classifier for e-commerce analytics questions.";

const GENERATOR_SYSTEM_PROMPT: &str = r#"You are a world-class e-commerce analytics assistant. Turn raw data into a clear, actionable and structured JSON response for a business intelligence dashboard.

Respond with a JSON object with three keys: "narrative", "data" and "ui_components".
1. "narrative": a concise (2-4 sentences) summary of the key insights. Conversational but professional.
2. "data": the raw or processed data behind the narrative, as a JSON object or array.
3. "ui_components": suggested visualizations. Valid types are "table", "bar_chart", "line_chart" and "kpi".
   - "table" carries "headers" (array of strings) and "rows" (array of arrays).
   - "bar_chart" and "line_chart" carry "x_axis_key" and "y_axis_key" naming keys in "data".
   - "kpi" carries a "label" and a "value_key" naming a key in "data".

Always base the answer on the provided data. If data is missing or incomplete, say so in the narrative."#;

const CLASSIFY_TEMPERATURE: f32 = 0.0;
const CLASSIFY_MAX_TOKENS: u32 = 150;
const GENERATE_TEMPERATURE: f32 = 0.3;
const GENERATE_MAX_TOKENS: u32 = 1500;
/// Narrative used when the model leaves it out.
const DEFAULT_NARRATIVE: &str = "Response generated";

/// A visualization hint attached to a generated answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiComponent {
    Table {
        #[serde(default)]
        headers: Vec<String>,
        #[serde(default)]
        rows: Vec<Vec<serde_json::Value>>,
    },
    BarChart {
        x_axis_key: String,
        y_axis_key: String,
    },
    LineChart {
        x_axis_key: String,
        y_axis_key: String,
    },
    Kpi {
        label: String,
        value_key: String,
    },
}

/// The structured answer shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedResponse {
    pub narrative: String,
    pub data: serde_json::Value,
    pub ui_components: Vec<UiComponent>,
}

impl GeneratedResponse {
    /// Substituted when generation fails outright.
    pub fn unavailable() -> Self {
        Self {
            narrative: "I apologize, but I'm having trouble generating a response right now. Please try again.".into(),
            data: serde_json::Value::Null,
            ui_components: Vec::new(),
        }
    }

    fn data_error(data: &serde_json::Value, error: &serde_json::Value) -> Self {
        let error = match error {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self {
            narrative: format!(
                "I encountered an issue retrieving the data: {error}. Please try rephrasing your question"
            ),
            data: data.clone(),
            ui_components: Vec::new(),
        }
    }

    fn malformed(raw: &str) -> Self {
        Self {
            narrative: "I generated a response, but it was formatted incorrectly. This may indicate a problem with the data provided.".into(),
            data: serde_json::json!({ "raw_response": raw }),
            ui_components: Vec::new(),
        }
    }

    /// Parses model output, dropping components of unknown type.
    fn parse(raw: &str) -> Option<Self> {
        #[derive(Deserialize)]
        struct Loose {
            #[serde(default)]
            narrative: Option<String>,
            #[serde(default)]
            data: serde_json::Value,
            #[serde(default)]
            ui_components: Option<Vec<serde_json::Value>>,
        }

        let loose: Loose = serde_json::from_str(raw).ok()?;
        let ui_components = loose
            .ui_components
            .unwrap_or_default()
            .into_iter()
            .filter_map(|c| match serde_json::from_value::<UiComponent>(c) {
                Ok(component) => Some(component),
                Err(e) => {
                    debug!(error = %e, "dropping unrecognized ui component");
                    None
                }
            })
            .collect();
        Some(Self {
            narrative: loose
                .narrative
                .unwrap_or_else(|| DEFAULT_NARRATIVE.to_string()),
            data: loose.data,
            ui_components,
        })
    }

    /// The response as a JSON object.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "narrative": self.narrative,
            "data": self.data,
            "ui_components": serde_json::to_value(&self.ui_components)
                .unwrap_or(serde_json::Value::Array(Vec::new())),
        })
    }
}

pub struct ResponseGenerator {
    provider: Arc<dyn LlmProvider>,
    model: String,
    classify_breaker: CircuitBreaker,
    generate_breaker: CircuitBreaker,
}

impl ResponseGenerator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: impl Into<String>,
        breaker: CircuitBreakerConfig,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            classify_breaker: CircuitBreaker::new("intent_classifier", breaker),
            generate_breaker: CircuitBreaker::new("response_generator", breaker),
        }
    }

    /// Classifies `query` into one [`Intent`].
    ///
    /// A reply that cannot be mapped to an intent is not a failure and yields
    /// [`Intent::GeneralStats`].
    pub async fn classify_intent(&self, query: &str) -> Result<Intent, ShopdeskError> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(CLASSIFIER_SYSTEM_PROMPT),
                ChatMessage::user(classification_prompt(query)),
            ],
            temperature: CLASSIFY_TEMPERATURE,
            max_tokens: CLASSIFY_MAX_TOKENS,
            json_mode: true,
        };
        let response = self
            .classify_breaker
            .call(|| self.provider.complete(request))
            .await?;
        Ok(parse_intent(&response.content).unwrap_or_else(|| {
            warn!(query, "classifier reply carried no usable intent");
            Intent::GeneralStats
        }))
    }

    /// Turns fetched `data` into a narrative with visualization hints.
    pub async fn generate_response(
        &self,
        query: &str,
        intent: Intent,
        data: &serde_json::Value,
        ctx: &RequestContext,
    ) -> Result<GeneratedResponse, ShopdeskError> {
        if let Some(error) = data.get("error") {
            debug!(user_id = ctx.user_id(), %intent, "data carries an error, skipping generation");
            return Ok(GeneratedResponse::data_error(data, error));
        }

        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(GENERATOR_SYSTEM_PROMPT),
                ChatMessage::user(generation_prompt(query, intent, data)),
            ],
            temperature: GENERATE_TEMPERATURE,
            max_tokens: GENERATE_MAX_TOKENS,
            json_mode: true,
        };
        let response = self
            .generate_breaker
            .call(|| self.provider.complete(request))
            .await?;
        Ok(GeneratedResponse::parse(&response.content).unwrap_or_else(|| {
            error!(user_id = ctx.user_id(), %intent, "generation reply was not valid JSON");
            GeneratedResponse::malformed(&response.content)
        }))
    }

    pub fn breaker_snapshots(&self) -> [BreakerSnapshot; 2] {
        [
            self.classify_breaker.snapshot(),
            self.generate_breaker.snapshot(),
        ]
    }
}

fn parse_intent(raw: &str) -> Option<Intent> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    let name = value.get("intent")?.as_str()?;
    name.trim().parse().ok()
}

fn classification_prompt(query: &str) -> String {
    let intents: serde_json::Map<String, serde_json::Value> = Intent::ALL
        .iter()
        .map(|i| (i.to_string(), serde_json::Value::String(i.display_name())))
        .collect();
    let intents = serde_json::to_string_pretty(&intents).unwrap_or_default();
    format!(
        r#"Analyze the user's e-commerce analytics question and classify it into exactly one of the predefined intents. Respond in JSON.

Available intents:
{intents}

Examples:
1. Query: "How many black t-shirts do we have in stock?"
   Intent: "inventory_status"
2. Query: "What were our total sales last month?"
   Intent: "sales_data"
3. Query: "Who are our top 10 customers by spending?"
   Intent: "customer_insights"
4. Query: "Show me our revenue for Q2"
   Intent: "revenue_analysis"

Query to classify:
"{query}"

Respond with a JSON object containing a single key "intent", for example {{"intent": "sales_data"}}."#
    )
}

fn generation_prompt(query: &str, intent: Intent, data: &serde_json::Value) -> String {
    let data = match data {
        serde_json::Value::Null => "{}".to_string(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| "{}".to_string()),
    };
    format!(
        "Based on the following e-commerce data, answer the user's question.\n\
         User question: \"{query}\"\n\
         Classified intent: {intent}\n\
         Data provided:\n```json\n{data}\n```\n\n\
         Generate the JSON response according to the system instructions."
    )
}
