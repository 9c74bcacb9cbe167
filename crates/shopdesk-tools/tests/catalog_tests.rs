// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use shopdesk_core::{ShopdeskError, ToolLayer, ToolName};
use shopdesk_storage::Database;
use shopdesk_storage::queries::catalog::{
    NewCustomer, NewOrder, NewOrderItem, NewProduct, insert_customer, insert_order, insert_product,
};
use shopdesk_tools::{SqliteTools, ToolServer};

fn days_ago(days: i64) -> String {
    (Utc::now() - Duration::days(days)).to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

fn product(sku: &str, category: &str, price: f64, stock: i64) -> NewProduct {
    NewProduct {
        sku: sku.into(),
        name: format!("{sku} name"),
        category: category.into(),
        price,
        cost: price / 2.0,
        stock_quantity: stock,
        reorder_level: 5,
        reorder_quantity: 20,
        created_at: days_ago(200),
    }
}

async fn seeded() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("catalog.db"), false)
        .await
        .unwrap();

    let tee = insert_product(&db, &product("TEE", "apparel", 20.0, 3)).await.unwrap();
    let boot = insert_product(&db, &product("BOOT", "shoes", 120.0, 0)).await.unwrap();
    insert_product(&db, &product("CAP", "apparel", 10.0, 100)).await.unwrap();

    let ada = insert_customer(
        &db,
        &NewCustomer {
            email: "ada@example.com".into(),
            name: "Ada".into(),
            created_at: days_ago(400),
        },
    )
    .await
    .unwrap();

    let orders = [
        (Some(ada), "completed", 2, vec![(tee, 2, 20.0)]),
        (Some(ada), "in_transit", 3, vec![(boot, 1, 120.0)]),
        (None, "processing", 1, vec![(tee, 1, 20.0)]),
        (Some(ada), "completed", 45, vec![(boot, 10, 100.0)]),
    ];
    for (customer_id, status, age, items) in orders {
        insert_order(
            &db,
            &NewOrder {
                customer_id,
                status: status.into(),
                created_at: days_ago(age),
                items: items
                    .into_iter()
                    .map(|(product_id, quantity, unit_price)| NewOrderItem {
                        product_id,
                        quantity,
                        unit_price,
                    })
                    .collect(),
            },
        )
        .await
        .unwrap();
    }
    (dir, db)
}

#[tokio::test]
async fn sales_for_the_last_week() {
    let (_dir, db) = seeded().await;
    let tools = SqliteTools::new(db);
    let result = tools
        .call(
            ToolName::SalesAnalytics,
            json!({
                "period": "7days",
                "metrics": ["revenue", "orders", "avg_order_value", "top_products"],
                "group_by": "day"
            }),
        )
        .await
        .unwrap();

    assert_eq!(result["total_records"], 3);
    assert_eq!(result["revenue"]["total"], 180.0);
    assert_eq!(result["orders"]["completed"], 1);
    assert_eq!(result["orders"]["in_transit"], 1);
    assert_eq!(result["top_products"][0]["name"], "BOOT name");
    assert_eq!(result["top_products"][1]["quantity_sold"], 3);
    assert!(result.get("error").is_none());
}

#[tokio::test]
async fn inventory_alerts_and_recommendations() {
    let (_dir, db) = seeded().await;
    let tools = SqliteTools::new(db);
    let result = tools
        .call(
            ToolName::InventoryStatus,
            json!({"alert_level": "all", "include_recommendations": true}),
        )
        .await
        .unwrap();
    assert_eq!(result["summary"]["total_products"], 3);
    assert_eq!(result["summary"]["alert_count"], 2);
    assert_eq!(result["recommendations"].as_array().unwrap().len(), 2);

    let apparel = tools
        .call(ToolName::InventoryStatus, json!({"category": "APPAREL"}))
        .await
        .unwrap();
    assert_eq!(apparel["summary"]["total_products"], 2);
}

#[tokio::test]
async fn customers_and_orders() {
    let (_dir, db) = seeded().await;
    let tools = SqliteTools::new(db);

    let customers = tools
        .call(
            ToolName::CustomerInsights,
            json!({"segment": "all", "analysis_type": "behavior", "time_period": "90days"}),
        )
        .await
        .unwrap();
    assert_eq!(customers["total_customers"], 1);
    assert_eq!(customers["top_customers"][0]["total_orders"], 3);

    let orders = tools
        .call(ToolName::OrderManagement, json!({"status": "all", "analytics": true}))
        .await
        .unwrap();
    assert_eq!(orders["total_orders"], 4);
    assert_eq!(orders["status_distribution"][0]["status"], "completed");
    assert_eq!(orders["recent_orders"][0]["customer"], "Guest");

    let shipped = tools
        .call(ToolName::OrderManagement, json!({"status": "shipped"}))
        .await
        .unwrap();
    assert_eq!(shipped["total_orders"], 1);
}

#[tokio::test]
async fn invalid_arguments_are_tool_errors() {
    let (_dir, db) = seeded().await;
    let tools = SqliteTools::new(db);
    let err = tools
        .call(ToolName::SalesAnalytics, json!({"period": "fortnight"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ShopdeskError::Tool { .. }));
}

#[tokio::test]
async fn tool_server_over_sqlite() {
    let (_dir, db) = seeded().await;
    let server = ToolServer::new(Arc::new(SqliteTools::new(db)));
    let resp = server
        .handle_value(json!({
            "jsonrpc": "2.0",
            "id": 9,
            "method": "tools/call",
            "params": {"name": "get_inventory_status", "arguments": {"alert_level": "out_of_stock"}}
        }))
        .await;
    let text = resp.result.unwrap()["content"][0]["text"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(text.contains("out_of_stock"));
}
