//! Parser module for building an Abstract Syntax Tree (AST).
//!
//! Transforms a stream of tokens into a [`crate::ast::ast::Program`]. It uses
//! a Pratt parser for expressions with operator precedence and handles:
//!
//! - Statement parsing (declarations, `show`, control flow, `spawn`/`wait`)
//! - Expression parsing (binary ops, pipelines, calls, literals, function literals)
//! - Type parsing for annotations
//!
//! The parser uses NUD (null denotation) and LED (left denotation) functions
//! for expression parsing with binding power for precedence handling.

pub mod expr;
pub mod lookups;
pub mod parser;
pub mod stmt;
pub mod types;

#[cfg(test)]
mod tests;
