// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end pipeline behavior over mock adapters and temp SQLite.

use futures::StreamExt;
use shopdesk_core::{Intent, PipelineEvent, ToolName};
use shopdesk_test_utils::{TestHarness, classification, generation};

fn names(events: &[PipelineEvent]) -> Vec<&'static str> {
    events.iter().map(PipelineEvent::name).collect()
}

fn terminal_count(events: &[PipelineEvent]) -> usize {
    events.iter().filter(|e| e.is_terminal()).count()
}

#[tokio::test]
async fn sales_question_flows_through_every_stage() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec![
            classification(Intent::SalesData),
            generation("Sales are up this week."),
        ])
        .build()
        .await
        .unwrap();

    let events = harness
        .events("what are my sales this week?", TestHarness::context("u1"))
        .await;
    assert_eq!(
        names(&events),
        [
            "status_update",
            "intent_classified",
            "status_update",
            "data_fetched",
            "status_update",
            "final_response",
        ]
    );
    assert_eq!(
        events[1],
        PipelineEvent::IntentClassified {
            intent: Intent::SalesData
        }
    );
    assert_eq!(
        events[2],
        PipelineEvent::status("Fetching data for : sales data...")
    );
    match &events[3] {
        PipelineEvent::DataFetched { data_summary } => {
            assert!(data_summary.ends_with(" bytes of data received"), "{data_summary}")
        }
        other => panic!("unexpected {other:?}"),
    }

    let calls = harness.tools.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, ToolName::SalesAnalytics);
    assert_eq!(calls[0].1["period"], "7days");

    let PipelineEvent::FinalResponse(result) = &events[5] else {
        panic!("expected final response");
    };
    assert_eq!(result.query(), "what are my sales this week?");
    assert_eq!(result.intent(), Intent::SalesData);
    assert_eq!(result.response(), "Sales are up this week.");
    assert_eq!(result.data()["narrative"], "Sales are up this week.");
    assert_eq!(result.data()["ui_components"][0]["type"], "kpi");
    assert!(result.confidence() >= 0.75);
    assert!(result.is_successful());
    assert_eq!(result.session_id(), "session-u1");
}

#[tokio::test]
async fn answered_queries_are_persisted() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec![
            classification(Intent::InventoryStatus),
            generation("One product is out of stock."),
        ])
        .build()
        .await
        .unwrap();

    let result = harness
        .ask("how is inventory looking?", TestHarness::context("u1"))
        .await;
    assert!(result.is_successful());

    let messages = harness.stored_messages("session-u1").await.unwrap();
    assert_eq!(messages.len(), 1);
    let message = &messages[0];
    assert_eq!(message.id, result.message_id().to_string());
    assert_eq!(message.query, "how is inventory looking?");
    assert_eq!(message.response, "One product is out of stock.");
    assert_eq!(message.intent, "inventory_status");
    assert_eq!(message.metadata["user_permissions"], serde_json::json!(["read"]));
    assert_eq!(
        message.metadata["structured_response"]["narrative"],
        "One product is out of stock."
    );
}

#[tokio::test]
async fn repeated_query_is_served_from_cache() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec![
            classification(Intent::SalesData),
            generation("Revenue was 180."),
        ])
        .build()
        .await
        .unwrap();

    let first = harness
        .ask("What were sales this month?", TestHarness::context("u1"))
        .await;
    assert_eq!(harness.provider.call_count(), 2);
    assert_eq!(harness.tools.call_count(), 1);

    let events = harness
        .events("  what were sales this MONTH?  ", TestHarness::context("u1"))
        .await;
    assert_eq!(names(&events), ["final_response"]);
    let PipelineEvent::FinalResponse(cached) = &events[0] else {
        panic!("expected final response");
    };
    assert_eq!(cached, &first);
    assert_eq!(harness.provider.call_count(), 2);
    assert_eq!(harness.tools.call_count(), 1);
}

#[tokio::test]
async fn cache_is_partitioned_by_permissions() {
    let harness = TestHarness::new().await.unwrap();
    harness
        .ask("show me sales", TestHarness::context("u1"))
        .await;
    let calls = harness.provider.call_count();

    let admin = TestHarness::context("u1").with_permissions(["read", "admin"]);
    harness.ask("show me sales", admin).await;
    assert!(harness.provider.call_count() > calls);
}

#[tokio::test]
async fn over_length_query_yields_only_an_error() {
    let harness = TestHarness::builder()
        .with_config(|c| c.query.max_query_length = 10)
        .build()
        .await
        .unwrap();
    let events = harness
        .events("this query is far too long", TestHarness::context("u1"))
        .await;
    assert_eq!(
        events,
        vec![PipelineEvent::error("Query too long. Max 10 chars")]
    );
    assert_eq!(harness.provider.call_count(), 0);
}

#[tokio::test]
async fn blocked_query_is_rejected() {
    let harness = TestHarness::new().await.unwrap();
    let result = harness
        .ask("sales; DROP TABLE orders", TestHarness::context("u1"))
        .await;
    assert_eq!(result.error(), Some("Query contains prohibited content"));
    assert_eq!(result.response(), "Query contains prohibited content");
    assert_eq!(result.intent(), Intent::GeneralStats);
    assert_eq!(result.confidence(), 0.0);
}

#[tokio::test]
async fn over_limit_user_gets_a_single_error() {
    let harness = TestHarness::builder()
        .with_config(|c| {
            c.rate_limit.requests_per_minute = 2;
            c.rate_limit.requests_per_hour = 2;
        })
        .build()
        .await
        .unwrap();

    harness.ask("first question", TestHarness::context("u1")).await;
    harness.ask("second question", TestHarness::context("u1")).await;
    let calls = harness.provider.call_count();

    let events = harness
        .events("third question", TestHarness::context("u1"))
        .await;
    assert_eq!(names(&events), ["error"]);
    match &events[0] {
        PipelineEvent::Error { message } => {
            assert!(message.starts_with("Rate limit exceeded: 2/2 requests per"), "{message}")
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(harness.provider.call_count(), calls);

    // Another user is unaffected.
    let other = harness
        .events("third question", TestHarness::context("u2"))
        .await;
    assert!(other.iter().any(|e| matches!(e, PipelineEvent::FinalResponse(_))));
}

#[tokio::test]
async fn store_outage_falls_back_to_local_limits() {
    let harness = TestHarness::builder()
        .with_config(|c| {
            c.rate_limit.requests_per_minute = 1;
            c.rate_limit.requests_per_hour = 10;
        })
        .build()
        .await
        .unwrap();
    harness.store.set_failing(true);

    let first = harness.ask("inventory please", TestHarness::context("u1")).await;
    assert!(first.is_successful(), "{:?}", first.error());

    let second = harness.ask("orders please", TestHarness::context("u1")).await;
    assert_eq!(
        second.error(),
        Some("Rate limit exceeded: 1/1 requests per minute (fallback)")
    );
}

#[tokio::test]
async fn classification_failure_falls_back_to_general_stats() {
    let harness = TestHarness::new().await.unwrap();
    harness.provider.add_failure("upstream 503").await;
    harness.provider.add_response(generation("Here is an overview.")).await;

    let events = harness
        .events("how are we doing?", TestHarness::context("u1"))
        .await;
    assert!(events.contains(&PipelineEvent::IntentClassified {
        intent: Intent::GeneralStats
    }));
    let tools: Vec<ToolName> = harness.tools.calls().into_iter().map(|(t, _)| t).collect();
    assert_eq!(tools, [ToolName::InventoryStatus, ToolName::SalesAnalytics]);
    assert_eq!(terminal_count(&events), 1);
    let Some(PipelineEvent::FinalResponse(result)) = events.last() else {
        panic!("expected final response");
    };
    assert_eq!(result.response(), "Here is an overview.");
}

#[tokio::test]
async fn generation_failure_returns_apology() {
    let harness = TestHarness::new().await.unwrap();
    harness
        .provider
        .add_response(classification(Intent::OrderStatus))
        .await;
    harness.provider.add_failure("timeout").await;

    let result = harness.ask("order status?", TestHarness::context("u1")).await;
    assert!(result.is_successful());
    assert!(result.response().starts_with("I apologize"));
    assert_eq!(result.data()["data"], serde_json::Value::Null);
    assert_eq!(result.data()["ui_components"], serde_json::json!([]));
}

#[tokio::test]
async fn auxiliary_intent_answers_without_calling_generator() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec![classification(Intent::SystemHealth)])
        .build()
        .await
        .unwrap();
    let result = harness
        .ask("is the system healthy?", TestHarness::context("u1"))
        .await;
    assert_eq!(harness.provider.call_count(), 1);
    assert!(
        result
            .response()
            .starts_with("I encountered an issue retrieving the data: No handler for intent 'system_health'")
    );
    assert_eq!(result.confidence(), 0.1);
}

#[tokio::test]
async fn data_fetch_failure_ends_with_error() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec![classification(Intent::OrderStatus)])
        .with_failing_tool(ToolName::OrderManagement)
        .build()
        .await
        .unwrap();
    let events = harness
        .events("where are my orders?", TestHarness::context("u1"))
        .await;
    assert_eq!(
        events.last(),
        Some(&PipelineEvent::error("Failed to fetch data for order_status"))
    );
    assert!(!events.iter().any(|e| matches!(e, PipelineEvent::DataFetched { .. })));
    assert_eq!(terminal_count(&events), 1);
    harness.pipeline.wait_for_background_tasks().await;
    assert!(harness.stored_messages("session-u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn panicking_tool_ends_with_unexpected_error() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec![classification(Intent::OrderStatus)])
        .with_panicking_tool(ToolName::OrderManagement)
        .build()
        .await
        .unwrap();
    let events = harness
        .events("where are my orders?", TestHarness::context("u1"))
        .await;
    assert_eq!(
        names(&events),
        ["status_update", "intent_classified", "status_update", "error"]
    );
    assert_eq!(
        events.last(),
        Some(&PipelineEvent::error("An unexpected server error occurred"))
    );
    assert_eq!(terminal_count(&events), 1);
    harness.pipeline.wait_for_background_tasks().await;
    assert!(harness.stored_messages("session-u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn dropped_stream_skips_persistence() {
    let harness = TestHarness::new().await.unwrap();
    let stream = harness
        .pipeline
        .process_stream("inventory", TestHarness::context("u1"));
    drop(stream);
    harness.pipeline.wait_for_background_tasks().await;
    assert!(harness.stored_messages("session-u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn analytics_count_answered_queries() {
    let harness = TestHarness::new().await.unwrap();
    harness.ask("inventory", TestHarness::context("u1")).await;
    harness.ask("orders", TestHarness::context("u2")).await;
    let summary = harness
        .pipeline
        .analytics()
        .get_analytics_summary(7)
        .await
        .unwrap();
    assert_eq!(summary.total_queries, 2);
    assert_eq!(summary.execution_times_sample.len(), 2);
}

#[tokio::test]
async fn catalog_tools_answer_from_sqlite() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec![
            classification(Intent::InventoryStatus),
            generation("Nothing in stock yet."),
        ])
        .with_catalog_tools()
        .build()
        .await
        .unwrap();
    let mut stream = harness
        .pipeline
        .process_stream("inventory levels", TestHarness::context("u1"));
    let mut fetched = false;
    while let Some(event) = stream.next().await {
        if let PipelineEvent::DataFetched { .. } = event {
            fetched = true;
        }
    }
    assert!(fetched);
    assert_eq!(harness.tools.call_count(), 0);
}

#[tokio::test]
async fn health_report_covers_every_collaborator() {
    let harness = TestHarness::new().await.unwrap();
    let report = harness.pipeline.health().await;
    assert!(report.is_healthy(), "{report:?}");
    for service in ["store", "provider", "tools", "storage"] {
        assert!(report.services.contains_key(service), "{service}");
    }
    assert_eq!(report.circuit_breakers.len(), 3);

    harness.store.set_failing(true);
    let report = harness.pipeline.health().await;
    assert_eq!(report.status, "unhealthy");
    assert_eq!(report.services["store"].status, "unhealthy");
}
