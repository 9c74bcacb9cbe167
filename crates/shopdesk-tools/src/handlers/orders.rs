// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `get_order_management`: filtered order listing with optional analytics.

use std::collections::BTreeMap;

use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use serde_json::{Value, json};
use shopdesk_core::ShopdeskError;
use shopdesk_storage::Database;
use shopdesk_storage::database::map_tr_err;

use super::money;
use crate::args::OrderArgs;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OrderRow {
    pub id: i64,
    pub customer: Option<String>,
    pub status: String,
    pub total_amount: f64,
    pub created_at: String,
    pub items_count: i64,
}

pub async fn run(db: &Database, args: OrderArgs) -> Result<Value, ShopdeskError> {
    let mut sql = String::from(
        "SELECT o.id, c.name, o.status, o.total_amount, o.created_at,
                (SELECT COUNT(*) FROM order_items i WHERE i.order_id = o.id)
         FROM orders o LEFT JOIN customers c ON c.id = o.customer_id
         WHERE 1 = 1",
    );
    let mut bind: Vec<SqlValue> = Vec::new();
    if let Some(status) = args.status.stored_status() {
        sql.push_str(" AND o.status = ?");
        bind.push(SqlValue::Text(status.to_string()));
    }
    if let Some(range) = &args.date_range {
        if let Some(start) = range.start {
            sql.push_str(" AND julianday(o.created_at) >= julianday(?)");
            bind.push(SqlValue::Text(start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = range.end {
            // Inclusive of the whole end day.
            sql.push_str(" AND julianday(o.created_at) < julianday(?, '+1 day')");
            bind.push(SqlValue::Text(end.format("%Y-%m-%d").to_string()));
        }
    }
    if let Some(customer_id) = args.customer_id {
        sql.push_str(" AND o.customer_id = ?");
        bind.push(SqlValue::Integer(customer_id));
    }
    sql.push_str(" ORDER BY julianday(o.created_at) DESC, o.id DESC");

    let rows = db
        .connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(bind), |row| {
                    Ok(OrderRow {
                        id: row.get(0)?,
                        customer: row.get(1)?,
                        status: row.get(2)?,
                        total_amount: row.get(3)?,
                        created_at: row.get(4)?,
                        items_count: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)?;

    Ok(report(&args, &rows))
}

/// Builds the report from rows already sorted newest first.
pub(crate) fn report(args: &OrderArgs, rows: &[OrderRow]) -> Value {
    let mut result = json!({
        "total_orders": rows.len(),
        "filters": {
            "status": args.status,
            "date_range": args.date_range,
            "customer_id": args.customer_id,
        },
    });

    if args.analytics {
        let mut by_status: BTreeMap<&str, u64> = BTreeMap::new();
        for row in rows {
            *by_status.entry(row.status.as_str()).or_default() += 1;
        }
        let mut distribution: Vec<(&str, u64)> = by_status.into_iter().collect();
        distribution.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        result["status_distribution"] = distribution
            .into_iter()
            .map(|(status, count)| json!({"status": status, "count": count}))
            .collect();

        let total: f64 = rows.iter().map(|r| r.total_amount).sum();
        let average = if rows.is_empty() { 0.0 } else { total / rows.len() as f64 };
        result["revenue_analytics"] = json!({
            "total": money(total),
            "average_order_value": money(average),
        });
    }

    result["recent_orders"] = rows
        .iter()
        .take(10)
        .map(|r| {
            json!({
                "id": r.id.to_string(),
                "customer": r.customer.as_deref().unwrap_or("Guest"),
                "status": r.status,
                "total_amount": money(r.total_amount),
                "created_at": r.created_at,
                "items_count": r.items_count,
            })
        })
        .collect();
    result
}
