//! Semantic analysis.
//!
//! Walks the parsed program once, in source order, and:
//!
//! - resolves every name through a chain of nested scopes
//! - checks assignability, unit agreement, call arity and argument types
//! - writes each expression's type into the tree and fills inferred `let` types
//! - stops at the first diagnostic
//!
//! The [`registry::TypeRegistry`] supplies named types and unit conversions.

pub mod registry;
pub mod scope;
pub mod type_checker;
