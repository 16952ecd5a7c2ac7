//! Shared test utilities for pdfintake integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated test execution with a temp watch folder and
//!   an in-memory database
//! - `PdfBuilder` for generating small text-layer PDFs

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{fast_retry, TestHarness};
