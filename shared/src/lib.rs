//! Lantern Shared Library
//!
//! Core of the Lantern gateway console: turns captured gateway traffic into
//! execution traces, explains failures, and buffers live event feeds.
//!
//! # Modules
//!
//! - [`duration`] - text and wire forms of durations
//! - [`models`] - raw entries, traces, diagnostics and live event records
//! - [`payload`] - decoding of captured request and response bodies
//! - [`assembler`] - builds execution trees from raw entries
//! - [`diagnostics`] - classifies failed traces
//! - [`live`] - push-fed log and protocol-inspector buffers
//!
//! # Example
//!
//! ```
//! use shared::assembler::assemble_trace;
//! use shared::diagnostics::analyze_trace;
//! use shared::models::RawEntry;
//!
//! let entry = RawEntry::new("req-1", "POST", "/mcp", 500)
//!     .with_request_body(r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"search"}}"#)
//!     .with_response_body(r#"{"error":"Tool not found: search"}"#);
//!
//! let trace = assemble_trace(&entry);
//! assert_eq!(trace.root_span.children[0].name, "search");
//! assert_eq!(analyze_trace(&trace)[0].title, "Tool Not Found");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod assembler;
pub mod diagnostics;
pub mod duration;
pub mod live;
pub mod models;
pub mod payload;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde;
pub use serde_json;
