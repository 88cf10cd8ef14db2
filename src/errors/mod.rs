//! Error types for every compilation phase.
//!
//! Two disjoint families live here:
//!
//! - [`errors::Error`] carries front-end diagnostics (tokenizer, parser and
//!   semantic analyzer) together with the source position they point at
//! - [`errors::CodegenError`] carries faults raised while lowering to IR
//!
//! Both are fatal for the compilation unit they were raised in.

pub mod errors;

#[cfg(test)]
mod tests;
