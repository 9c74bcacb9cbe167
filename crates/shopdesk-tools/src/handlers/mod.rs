// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One handler per tool. Each loads rows in a single database call and
//! builds its report in plain Rust.

pub mod customers;
pub mod inventory;
pub mod orders;
pub mod sales;

/// Rounds money to cents for reporting.
pub(crate) fn money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
