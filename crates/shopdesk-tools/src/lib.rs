// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data-retrieval tools for the Shopdesk chat pipeline.
//!
//! [`SqliteTools`] answers the four catalog tools from the SQLite store, and
//! [`ToolServer`] exposes any [`shopdesk_core::ToolLayer`] over JSON-RPC.

pub mod args;
pub mod handlers;
pub mod schema;
pub mod server;
pub mod sqlite;

pub use server::{RpcRequest, RpcResponse, ToolMethod, ToolServer};
pub use sqlite::SqliteTools;
