use std::fmt::Display;

use crate::{
    errors::errors::{Error, ErrorImpl},
    Position, Span,
};

use super::{statements::Stmt, types::Type};

/// Expression
///
/// Every expression owns its children. `ty` starts empty and is written once
/// by the semantic analyzer; the code generator only reads it.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub ty: Option<Type>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr {
            kind,
            span,
            ty: None,
        }
    }

    pub fn get_span(&self) -> &Span {
        &self.span
    }

    pub fn get_position(&self) -> Position {
        self.span.start.clone()
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// `5`, `5.5 km`
    Number { value: f64, unit: String },
    String(String),
    Boolean(bool),
    Variable(String),
    Assignment {
        name: String,
        value: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },
    /// `value |> function`
    Pipeline {
        value: Box<Expr>,
        function: Box<Expr>,
    },
    Function(FunctionExpr),
}

/// Function literal: `(x: number) -> number { return x; }`
#[derive(Debug, Clone)]
pub struct FunctionExpr {
    pub params: Vec<Param>,
    pub return_type: Type,
    pub body: Vec<Stmt>,
}

impl FunctionExpr {
    pub fn get_type(&self) -> Type {
        Type::function(
            self.params.iter().map(|param| param.ty.clone()).collect(),
            self.return_type.clone(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
}

impl BinaryOp {
    /// Parses an operator tag, failing with `InvalidOperator` for anything
    /// that is not one of the ten binary operators.
    pub fn from_tag(tag: &str, position: Position) -> Result<Self, Error> {
        match tag {
            "+" => Ok(BinaryOp::Add),
            "-" => Ok(BinaryOp::Subtract),
            "*" => Ok(BinaryOp::Multiply),
            "/" => Ok(BinaryOp::Divide),
            "==" => Ok(BinaryOp::Equal),
            "!=" => Ok(BinaryOp::NotEqual),
            "<" => Ok(BinaryOp::Less),
            ">" => Ok(BinaryOp::Greater),
            "<=" => Ok(BinaryOp::LessEqual),
            ">=" => Ok(BinaryOp::GreaterEqual),
            _ => Err(Error::new(
                ErrorImpl::InvalidOperator {
                    operator: tag.to_string(),
                },
                position,
            )),
        }
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide
        )
    }

    pub fn is_comparison(&self) -> bool {
        !self.is_arithmetic()
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessEqual => "<=",
            BinaryOp::GreaterEqual => ">=",
        };
        write!(f, "{}", tag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

impl UnaryOp {
    pub fn from_tag(tag: &str, position: Position) -> Result<Self, Error> {
        match tag {
            "-" => Ok(UnaryOp::Negate),
            "!" => Ok(UnaryOp::Not),
            _ => Err(Error::new(
                ErrorImpl::InvalidOperator {
                    operator: tag.to_string(),
                },
                position,
            )),
        }
    }
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOp::Negate => write!(f, "-"),
            UnaryOp::Not => write!(f, "!"),
        }
    }
}
