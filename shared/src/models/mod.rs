//! Data models for the Lantern console.
//!
//! This module contains the wire records received from the gateway, the assembled
//! trace tree, diagnostics, and live event records.

pub mod diagnostic;
pub mod event;
pub mod raw;
pub mod trace;

pub use diagnostic::{Diagnostic, DiagnosticType};
pub use event::{EnrichedEvent, EventRecord, LogLevel};
pub use raw::{HeaderMap, HeaderValue, RawEntry, RawSpan, RawSpanStatus};
pub use trace::{Span, SpanIter, SpanKind, SpanStatus, Trace};
