// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `get_inventory_status`: stock summary, low/out-of-stock alerts and reorder advice.

use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use serde_json::{Value, json};
use shopdesk_core::ShopdeskError;
use shopdesk_storage::Database;
use shopdesk_storage::database::map_tr_err;

use super::money;
use crate::args::{AlertLevel, InventoryArgs};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StockRow {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub cost: f64,
    pub stock_quantity: i64,
    pub reorder_level: i64,
    pub reorder_quantity: i64,
}

impl StockRow {
    fn alert(&self) -> Option<AlertLevel> {
        if self.stock_quantity <= 0 {
            Some(AlertLevel::OutOfStock)
        } else if self.stock_quantity <= self.reorder_level {
            Some(AlertLevel::LowStock)
        } else {
            None
        }
    }
}

pub async fn run(db: &Database, args: InventoryArgs) -> Result<Value, ShopdeskError> {
    let mut sql = String::from(
        "SELECT id, name, category, cost, stock_quantity, reorder_level, reorder_quantity
         FROM products WHERE is_active = 1",
    );
    let mut bind: Vec<SqlValue> = Vec::new();
    if let Some(ids) = args.product_ids.as_ref().filter(|ids| !ids.is_empty()) {
        let placeholders = vec!["?"; ids.len()].join(", ");
        sql.push_str(&format!(" AND id IN ({placeholders})"));
        bind.extend(ids.iter().map(|id| SqlValue::Integer(*id)));
    }
    if let Some(category) = args.category.as_ref().filter(|c| !c.trim().is_empty()) {
        sql.push_str(" AND category LIKE ?");
        bind.push(SqlValue::Text(format!("%{}%", category.trim())));
    }
    sql.push_str(" ORDER BY id");

    let rows = db
        .connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(bind), |row| {
                    Ok(StockRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        category: row.get(2)?,
                        cost: row.get(3)?,
                        stock_quantity: row.get(4)?,
                        reorder_level: row.get(5)?,
                        reorder_quantity: row.get(6)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)?;

    Ok(report(&args, &rows))
}

pub(crate) fn report(args: &InventoryArgs, rows: &[StockRow]) -> Value {
    let wanted = |level: AlertLevel| args.alert_level == AlertLevel::All || args.alert_level == level;

    let flagged: Vec<(&StockRow, AlertLevel)> = rows
        .iter()
        .filter_map(|row| row.alert().filter(|level| wanted(*level)).map(|l| (row, l)))
        .collect();

    let alerts: Vec<Value> = flagged
        .iter()
        .map(|(row, level)| match level {
            AlertLevel::OutOfStock => json!({
                "type": "out_of_stock",
                "product_id": row.id.to_string(),
                "product_name": row.name,
                "current_stock": 0,
                "category": row.category,
            }),
            _ => json!({
                "type": "low_stock",
                "product_id": row.id.to_string(),
                "product_name": row.name,
                "current_stock": row.stock_quantity,
                "threshold": row.reorder_level,
                "category": row.category,
            }),
        })
        .collect();

    let stock_value: f64 = rows
        .iter()
        .map(|r| r.stock_quantity.max(0) as f64 * r.cost)
        .sum();

    let mut result = json!({
        "summary": {
            "total_products": rows.len(),
            "total_stock_value": money(stock_value),
            "alert_count": alerts.len(),
        },
        "alerts": alerts,
    });

    if args.include_recommendations {
        let recommendations: Vec<Value> = flagged
            .iter()
            .map(|(row, level)| {
                json!({
                    "product_id": row.id.to_string(),
                    "product_name": row.name,
                    "recommended_quantity": row.reorder_quantity,
                    "estimated_cost": money(row.cost * row.reorder_quantity as f64),
                    "priority": if *level == AlertLevel::OutOfStock { "high" } else { "medium" },
                })
            })
            .collect();
        result["recommendations"] = Value::Array(recommendations);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, stock: i64) -> StockRow {
        StockRow {
            id,
            name: format!("p{id}"),
            category: "apparel".into(),
            cost: 4.0,
            stock_quantity: stock,
            reorder_level: 10,
            reorder_quantity: 25,
        }
    }

    #[test]
    fn classifies_alerts_and_values_stock() {
        let rows = [row(1, 0), row(2, 5), row(3, 50)];
        let report = report(
            &InventoryArgs {
                include_recommendations: true,
                ..Default::default()
            },
            &rows,
        );
        assert_eq!(report["summary"]["total_products"], 3);
        assert_eq!(report["summary"]["total_stock_value"], 220.0);
        assert_eq!(report["summary"]["alert_count"], 2);
        assert_eq!(report["alerts"][0]["type"], "out_of_stock");
        assert_eq!(report["alerts"][1]["threshold"], 10);
        assert_eq!(report["recommendations"][0]["priority"], "high");
        assert_eq!(report["recommendations"][1]["estimated_cost"], 100.0);
    }

    #[test]
    fn alert_level_filters() {
        let rows = [row(1, 0), row(2, 5)];
        let report = report(
            &InventoryArgs {
                alert_level: AlertLevel::LowStock,
                ..Default::default()
            },
            &rows,
        );
        assert_eq!(report["summary"]["alert_count"], 1);
        assert_eq!(report["alerts"][0]["product_id"], "2");
        assert!(report.get("recommendations").is_none());
    }
}
