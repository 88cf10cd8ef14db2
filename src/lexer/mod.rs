//! Lexical analysis.
//!
//! Converts source text into a flat stream of tokens:
//!
//! - keywords, identifiers, number and string literals, operators
//! - byte-offset spans on every token for error reporting
//! - `//` comments and whitespace are skipped

pub mod lexer;
pub mod tokens;
