//! Shared types for the numjit compiler.
//!
//! Every crate in the workspace locates nodes and diagnostics through the
//! byte-offset [`Span`] defined here.

pub mod span;

pub use span::{LineIndex, Span};
