//! Shared types for the gravy workspace.

pub mod span;

pub use span::{LineIndex, Span};
