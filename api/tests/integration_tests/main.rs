//! Integration tests for the Lantern API.
//!
//! These tests drive the complete router: traces assembled from captured
//! entries, diagnostics, and the live log and inspector feeds.

mod common;
mod health_tests;
mod inspector_tests;
mod logs_tests;
mod traces_tests;
