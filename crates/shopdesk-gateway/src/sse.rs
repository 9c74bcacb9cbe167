// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events streaming for POST /v1/chat.
//!
//! Each pipeline event becomes one SSE frame named after the event, with the
//! event payload as JSON data:
//!
//! ```text
//! event: status_update
//! data: {"message":"Classifying query..."}
//!
//! event: final_response
//! data: {"query":"...","intent":"sales_data",...}
//! ```
//!
//! The stream ends after `final_response` or `error`. A client that
//! disconnects drops the stream, which abandons the query.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use shopdesk_core::PipelineEvent;

/// Renders one pipeline event as an SSE frame.
pub fn to_sse_event(event: &PipelineEvent) -> Event {
    Event::default()
        .event(event.name())
        .data(event.data_json().to_string())
}

/// Wraps a pipeline event stream as an SSE response.
pub fn event_stream<S>(events: S) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: Stream<Item = PipelineEvent> + Send + 'static,
{
    Sse::new(events.map(|event| Ok(to_sse_event(&event)))).keep_alive(KeepAlive::default())
}
