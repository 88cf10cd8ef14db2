use crate::Span;

use super::statements::Stmt;

/// Program
///
/// The root of the tree: the top-level statements of one compilation unit,
/// in source order.
#[derive(Debug, Clone)]
pub struct Program {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

impl Program {
    pub fn new(statements: Vec<Stmt>, span: Span) -> Self {
        Program { statements, span }
    }
}
