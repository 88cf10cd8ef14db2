//! Code generation.
//!
//! Lowers an analyzed program into an LLVM module of functions and basic
//! blocks:
//!
//! - top-level statements become the body of `i32 main()`
//! - function literals and `spawn` bodies become internal functions
//! - `show`, unit literals, `spawn` and `wait` call into the runtime
//!   declared in [`runtime`]
//! - [`compiler::Compiler::run_passes`] is the optimizer hook

pub mod compiler;
pub mod expr;
pub mod runtime;
pub mod stmt;

#[cfg(test)]
mod tests;
