//! Core utilities for graphex.
//!
//! This crate provides foundational types shared by the parser, the runtime
//! and the command-line interface:
//! - `span`: Source location tracking
//! - `diagnostics`: Error reporting

pub mod diagnostics;
pub mod span;

pub use diagnostics::{codes, Diagnostic, DiagnosticBag};
pub use span::{LineColumn, Span};
