// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `get_customer_insights`: segment sizes, lifetime value and top spenders.

use chrono::{DateTime, Duration, Utc};
use rusqlite::params;
use serde_json::{Value, json};
use shopdesk_core::ShopdeskError;
use shopdesk_storage::Database;
use shopdesk_storage::database::map_tr_err;

use super::money;
use crate::args::{AnalysisType, CustomerArgs, Segment, timestamp};

const HIGH_VALUE_SPEND: f64 = 1000.0;
const FREQUENT_ORDERS: u64 = 5;
const NEW_CUSTOMER_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CustomerRow {
    pub id: i64,
    pub name: String,
    pub joined_at: String,
    pub total_orders: u64,
    pub total_spent: f64,
}

impl CustomerRow {
    fn avg_order_value(&self) -> f64 {
        if self.total_orders == 0 {
            0.0
        } else {
            self.total_spent / self.total_orders as f64
        }
    }
}

pub async fn run(db: &Database, args: CustomerArgs, now: DateTime<Utc>) -> Result<Value, ShopdeskError> {
    let start = args.time_period.start(now).map(timestamp).unwrap_or_default();
    let rows = db
        .connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.name, c.created_at, COUNT(o.id), COALESCE(SUM(o.total_amount), 0)
                 FROM customers c
                 JOIN orders o ON o.customer_id = c.id
                 WHERE (?1 = '' OR julianday(o.created_at) >= julianday(?1))
                 GROUP BY c.id
                 HAVING COUNT(o.id) > 0",
            )?;
            let rows = stmt
                .query_map(params![start], |row| {
                    Ok(CustomerRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        joined_at: row.get(2)?,
                        total_orders: row.get::<_, i64>(3)?.max(0) as u64,
                        total_spent: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)?;

    Ok(report(&args, rows, now))
}

fn in_segment(row: &CustomerRow, segment: Segment, now: DateTime<Utc>) -> bool {
    match segment {
        Segment::All => true,
        Segment::HighValue => row.total_spent >= HIGH_VALUE_SPEND,
        Segment::FrequentBuyers => row.total_orders >= FREQUENT_ORDERS,
        Segment::NewCustomers => DateTime::parse_from_rfc3339(&row.joined_at)
            .is_ok_and(|joined| joined.with_timezone(&Utc) >= now - Duration::days(NEW_CUSTOMER_DAYS)),
    }
}

pub(crate) fn report(args: &CustomerArgs, rows: Vec<CustomerRow>, now: DateTime<Utc>) -> Value {
    let mut customers: Vec<CustomerRow> = rows
        .into_iter()
        .filter(|row| in_segment(row, args.segment, now))
        .collect();

    let mut result = json!({
        "segment": args.segment,
        "analysis_type": args.analysis_type,
        "time_period": args.time_period,
        "total_customers": customers.len(),
    });

    match args.analysis_type {
        AnalysisType::Ltv => {
            let total: f64 = customers.iter().map(|c| c.total_spent).sum();
            let orders: u64 = customers.iter().map(|c| c.total_orders).sum();
            let n = customers.len().max(1) as f64;
            result["lifetime_value"] = json!({
                "average": money(total / n),
                "total": money(total),
                "average_orders": money(orders as f64 / n),
            });
        }
        AnalysisType::Behavior => {
            customers.sort_by(|a, b| b.total_spent.total_cmp(&a.total_spent));
            result["top_customers"] = customers
                .iter()
                .take(10)
                .map(|c| {
                    json!({
                        "id": c.id,
                        "name": c.name,
                        "total_orders": c.total_orders,
                        "total_spent": money(c.total_spent),
                        "avg_order_value": money(c.avg_order_value()),
                    })
                })
                .collect();
        }
    }
    result
}
