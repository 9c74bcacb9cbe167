// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `get_sales_analytics`: revenue, order counts and best sellers over a window.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde_json::{Map, Value, json};
use shopdesk_core::ShopdeskError;
use shopdesk_storage::Database;
use shopdesk_storage::database::map_tr_err;

use super::money;
use crate::args::{GroupBy, SalesArgs, SalesMetric, timestamp};

const ORDER_STATUSES: [&str; 5] = ["completed", "processing", "in_transit", "on_hold", "rejected"];

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OrderRow {
    pub customer_id: Option<i64>,
    pub customer_name: Option<String>,
    pub status: String,
    pub total_amount: f64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ItemRow {
    pub product_id: i64,
    pub product_name: String,
    pub category: String,
    pub quantity: i64,
    pub unit_price: f64,
}

pub async fn run(db: &Database, args: SalesArgs, now: DateTime<Utc>) -> Result<Value, ShopdeskError> {
    let start = args.period.start(now).map(timestamp).unwrap_or_default();
    let end = timestamp(now);
    let (orders, items) = {
        let (start, end) = (start.clone(), end.clone());
        db.connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT o.customer_id, c.name, o.status, o.total_amount, o.created_at
                     FROM orders o LEFT JOIN customers c ON c.id = o.customer_id
                     WHERE (?1 = '' OR julianday(o.created_at) >= julianday(?1))
                       AND julianday(o.created_at) <= julianday(?2)",
                )?;
                let orders = stmt
                    .query_map(params![start, end], |row| {
                        Ok(OrderRow {
                            customer_id: row.get(0)?,
                            customer_name: row.get(1)?,
                            status: row.get(2)?,
                            total_amount: row.get(3)?,
                            created_at: row.get(4)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                let mut stmt = conn.prepare(
                    "SELECT p.id, p.name, p.category, i.quantity, i.unit_price
                     FROM order_items i
                     JOIN orders o ON o.id = i.order_id
                     JOIN products p ON p.id = i.product_id
                     WHERE (?1 = '' OR julianday(o.created_at) >= julianday(?1))
                       AND julianday(o.created_at) <= julianday(?2)",
                )?;
                let items = stmt
                    .query_map(params![start, end], |row| {
                        Ok(ItemRow {
                            product_id: row.get(0)?,
                            product_name: row.get(1)?,
                            category: row.get(2)?,
                            quantity: row.get(3)?,
                            unit_price: row.get(4)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((orders, items))
            })
            .await
            .map_err(map_tr_err)?
    };

    let period = if start.is_empty() {
        format!("all time to {end}")
    } else {
        format!("{start} to {end}")
    };
    Ok(report(&args, period, &orders, &items))
}

pub(crate) fn report(args: &SalesArgs, period: String, orders: &[OrderRow], items: &[ItemRow]) -> Value {
    let mut result = Map::new();
    result.insert("period".into(), json!(period));
    result.insert("total_records".into(), json!(orders.len()));

    let revenue: f64 = orders.iter().map(|o| o.total_amount).sum();
    let average = if orders.is_empty() {
        0.0
    } else {
        revenue / orders.len() as f64
    };

    for metric in &args.metrics {
        match metric {
            SalesMetric::Revenue => {
                result.insert(
                    "revenue".into(),
                    json!({"total": money(revenue), "average_order_value": money(average)}),
                );
            }
            SalesMetric::AvgOrderValue => {
                result.insert("avg_order_value".into(), json!(money(average)));
            }
            SalesMetric::Orders => {
                let mut counts = Map::new();
                counts.insert("total".into(), json!(orders.len()));
                for status in ORDER_STATUSES {
                    let n = orders.iter().filter(|o| o.status == status).count();
                    counts.insert(status.into(), json!(n));
                }
                result.insert("orders".into(), Value::Object(counts));
            }
            SalesMetric::TopProducts => {
                result.insert("top_products".into(), top_products(items));
            }
            SalesMetric::CustomerSegments => {
                result.insert("top_customers".into(), top_customers(orders, 20));
            }
        }
    }

    match args.group_by {
        GroupBy::Day | GroupBy::Week | GroupBy::Month => {
            result.insert("timeline".into(), timeline(orders, args.group_by));
        }
        GroupBy::Category => {
            result.insert("by_category".into(), by_category(items));
        }
        GroupBy::Customer => {
            if !result.contains_key("top_customers") {
                result.insert("top_customers".into(), top_customers(orders, 20));
            }
        }
    }

    Value::Object(result)
}

fn top_products(items: &[ItemRow]) -> Value {
    let mut totals: BTreeMap<i64, (String, i64, f64)> = BTreeMap::new();
    for item in items {
        let entry = totals
            .entry(item.product_id)
            .or_insert_with(|| (item.product_name.clone(), 0, 0.0));
        entry.1 += item.quantity;
        entry.2 += item.quantity as f64 * item.unit_price;
    }
    let mut ranked: Vec<_> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.2.total_cmp(&a.1.2));
    ranked
        .into_iter()
        .take(10)
        .map(|(id, (name, sold, revenue))| {
            json!({"id": id, "name": name, "quantity_sold": sold, "revenue": money(revenue)})
        })
        .collect()
}

fn top_customers(orders: &[OrderRow], limit: usize) -> Value {
    let mut totals: BTreeMap<i64, (Option<String>, u64, f64)> = BTreeMap::new();
    for order in orders {
        let Some(id) = order.customer_id else { continue };
        let entry = totals
            .entry(id)
            .or_insert_with(|| (order.customer_name.clone(), 0, 0.0));
        entry.1 += 1;
        entry.2 += order.total_amount;
    }
    let mut ranked: Vec<_> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.2.total_cmp(&a.1.2));
    ranked
        .into_iter()
        .take(limit)
        .map(|(id, (name, count, spent))| {
            json!({
                "customer_id": id,
                "name": name,
                "order_count": count,
                "total_spent": money(spent),
            })
        })
        .collect()
}

/// Bucket label for an RFC 3339 timestamp.
fn bucket(created_at: &str, group_by: GroupBy) -> String {
    let parsed = DateTime::parse_from_rfc3339(created_at).map(|d| d.with_timezone(&Utc));
    match (parsed, group_by) {
        (Ok(at), GroupBy::Week) => at.format("%G-W%V").to_string(),
        (Ok(at), GroupBy::Month) => at.format("%Y-%m").to_string(),
        (Ok(at), _) => at.format("%Y-%m-%d").to_string(),
        (Err(_), _) => created_at.chars().take(10).collect(),
    }
}

fn timeline(orders: &[OrderRow], group_by: GroupBy) -> Value {
    let mut buckets: BTreeMap<String, (u64, f64)> = BTreeMap::new();
    for order in orders {
        let entry = buckets.entry(bucket(&order.created_at, group_by)).or_default();
        entry.0 += 1;
        entry.1 += order.total_amount;
    }
    buckets
        .into_iter()
        .map(|(label, (count, revenue))| {
            json!({"date": label, "orders": count, "revenue": money(revenue)})
        })
        .collect()
}

fn by_category(items: &[ItemRow]) -> Value {
    let mut categories: BTreeMap<&str, (i64, f64)> = BTreeMap::new();
    for item in items {
        let entry = categories.entry(item.category.as_str()).or_default();
        entry.0 += item.quantity;
        entry.1 += item.quantity as f64 * item.unit_price;
    }
    categories
        .into_iter()
        .map(|(category, (sold, revenue))| {
            json!({"category": category, "quantity_sold": sold, "revenue": money(revenue)})
        })
        .collect()
}
