use crate::Span;

use super::{expressions::Expr, types::Type};

/// Statement
#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Stmt { kind, span }
    }

    pub fn get_span(&self) -> &Span {
        &self.span
    }
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Expression(Expr),
    /// `ty` holds the annotation when one was written; otherwise the
    /// analyzer fills it with the initializer's type.
    Let {
        name: String,
        ty: Option<Type>,
        initializer: Expr,
    },
    Show(Expr),
    Block(Vec<Stmt>),
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    /// `for i in bound by step body`
    For {
        variable: String,
        iterator: Expr,
        step: Option<Expr>,
        body: Box<Stmt>,
    },
    Match {
        scrutinee: Expr,
        cases: Vec<MatchCase>,
        default: Option<Box<Stmt>>,
    },
    Spawn(Box<Stmt>),
    Wait(Expr),
    Return(Option<Expr>),
}

#[derive(Debug, Clone)]
pub struct MatchCase {
    pub pattern: Expr,
    pub body: Stmt,
}
