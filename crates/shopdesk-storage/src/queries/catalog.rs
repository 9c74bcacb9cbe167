// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catalog writes: products, customers and orders.
//!
//! The tool layer reads these tables directly; this module only covers the
//! inserts needed to populate them.

use rusqlite::params;
use shopdesk_core::ShopdeskError;

use crate::database::{Database, map_tr_err};

#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub cost: f64,
    pub stock_quantity: i64,
    pub reorder_level: i64,
    pub reorder_quantity: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub email: String,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: f64,
}

/// An order and its line items. `total_amount` is derived from the items.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub customer_id: Option<i64>,
    pub status: String,
    pub created_at: String,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    pub fn total_amount(&self) -> f64 {
        self.items
            .iter()
            .map(|i| i.quantity as f64 * i.unit_price)
            .sum()
    }
}

/// Inserts a product and returns its row id.
pub async fn insert_product(db: &Database, product: &NewProduct) -> Result<i64, ShopdeskError> {
    let p = product.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO products
                 (sku, name, category, price, cost, stock_quantity, reorder_level, reorder_quantity, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    p.sku,
                    p.name,
                    p.category,
                    p.price,
                    p.cost,
                    p.stock_quantity,
                    p.reorder_level,
                    p.reorder_quantity,
                    p.created_at,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn insert_customer(db: &Database, customer: &NewCustomer) -> Result<i64, ShopdeskError> {
    let c = customer.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO customers (email, name, created_at) VALUES (?1, ?2, ?3)",
                params![c.email, c.name, c.created_at],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Inserts an order with all of its items in one transaction.
pub async fn insert_order(db: &Database, order: &NewOrder) -> Result<i64, ShopdeskError> {
    let order = order.clone();
    let total = order.total_amount();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO orders (customer_id, status, total_amount, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![order.customer_id, order.status, total, order.created_at],
            )?;
            let order_id = tx.last_insert_rowid();
            for item in &order.items {
                tx.execute(
                    "INSERT INTO order_items (order_id, product_id, quantity, unit_price)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![order_id, item.product_id, item.quantity, item.unit_price],
                )?;
            }
            tx.commit()?;
            Ok(order_id)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn order_total_is_sum_of_items() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("c.db"), false).await.unwrap();
        let product_id = insert_product(
            &db,
            &NewProduct {
                sku: "TEE-1".into(),
                name: "Tee".into(),
                category: "apparel".into(),
                price: 20.0,
                cost: 8.0,
                stock_quantity: 40,
                reorder_level: 10,
                reorder_quantity: 50,
                created_at: "2026-01-01T00:00:00Z".into(),
            },
        )
        .await
        .unwrap();
        let order = NewOrder {
            customer_id: None,
            status: "completed".into(),
            created_at: "2026-01-02T00:00:00Z".into(),
            items: vec![
                NewOrderItem {
                    product_id,
                    quantity: 2,
                    unit_price: 20.0,
                },
                NewOrderItem {
                    product_id,
                    quantity: 1,
                    unit_price: 15.5,
                },
            ],
        };
        let order_id = insert_order(&db, &order).await.unwrap();

        let total: f64 = db
            .connection()
            .call(move |conn| {
                conn.query_row(
                    "SELECT total_amount FROM orders WHERE id = ?1",
                    params![order_id],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert!((total - 55.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn duplicate_customer_email_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("c.db"), false).await.unwrap();
        let customer = NewCustomer {
            email: "a@example.com".into(),
            name: "A".into(),
            created_at: "2026-01-01T00:00:00Z".into(),
        };
        insert_customer(&db, &customer).await.unwrap();
        let err = insert_customer(&db, &customer).await.unwrap_err();
        assert!(matches!(err, ShopdeskError::Storage { .. }));
    }
}
