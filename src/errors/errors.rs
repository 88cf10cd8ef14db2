use std::fmt::Display;

use inkwell::builder::BuilderError;
use thiserror::Error;

use crate::Position;

/// A front-end diagnostic: something wrong with the program text itself.
#[derive(Debug, Clone)]
pub struct Error {
    internal_error: ErrorImpl,
    position: Position,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Position) -> Self {
        Error {
            internal_error: error_impl,
            position,
        }
    }

    pub fn get_position(&self) -> &Position {
        &self.position
    }

    pub fn get_internal_error(&self) -> &ErrorImpl {
        &self.internal_error
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. } => "UnrecognisedToken",
            ErrorImpl::UnexpectedToken { .. } => "UnexpectedToken",
            ErrorImpl::UnexpectedTokenDetailed { .. } => "UnexpectedTokenDetailed",
            ErrorImpl::NumberParseError { .. } => "NumberParseError",
            ErrorImpl::DuplicateDeclaration { .. } => "DuplicateDeclaration",
            ErrorImpl::UndefinedName { .. } => "UndefinedName",
            ErrorImpl::TypeMismatch { .. } => "TypeMismatch",
            ErrorImpl::UnitMismatch { .. } => "UnitMismatch",
            ErrorImpl::ArityMismatch { .. } => "ArityMismatch",
            ErrorImpl::ArgumentTypeMismatch { .. } => "ArgumentTypeMismatch",
            ErrorImpl::InvalidPipeline { .. } => "InvalidPipeline",
            ErrorImpl::NonBooleanCondition { .. } => "NonBooleanCondition",
            ErrorImpl::PatternTypeMismatch { .. } => "PatternTypeMismatch",
            ErrorImpl::ReturnOutsideFunction => "ReturnOutsideFunction",
            ErrorImpl::InvalidOperator { .. } => "InvalidOperator",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. } => ErrorTip::None,
            ErrorImpl::UnexpectedToken { token } => ErrorTip::Suggestion(format!(
                "Unexpected token: `{}`, did you miss a semicolon?",
                token
            )),
            ErrorImpl::UnexpectedTokenDetailed { token, message } => {
                ErrorTip::Suggestion(format!("Unexpected token: `{}`, {}", token, message))
            }
            ErrorImpl::NumberParseError { token } => {
                ErrorTip::Suggestion(format!("Invalid number: `{}`", token))
            }
            ErrorImpl::DuplicateDeclaration { name } => ErrorTip::Suggestion(format!(
                "`{}` is already declared in this scope, declare it in a nested block to shadow it",
                name
            )),
            ErrorImpl::UndefinedName { name } => {
                ErrorTip::Suggestion(format!("Declare `{}` with `let` before using it", name))
            }
            ErrorImpl::TypeMismatch { expected, received } => ErrorTip::Suggestion(format!(
                "Expected type `{}`, received `{}`",
                expected, received
            )),
            ErrorImpl::UnitMismatch { left, right } => ErrorTip::Suggestion(format!(
                "Convert one side so both operands are `{}` or both are `{}`",
                left, right
            )),
            ErrorImpl::ArityMismatch { expected, received } => ErrorTip::Suggestion(format!(
                "Expected {} arguments, received {}",
                expected, received
            )),
            ErrorImpl::ArgumentTypeMismatch {
                index,
                expected,
                received,
            } => ErrorTip::Suggestion(format!(
                "Argument {} should be `{}`, received `{}`",
                index, expected, received
            )),
            ErrorImpl::InvalidPipeline { .. } => ErrorTip::Suggestion(String::from(
                "The right side of `|>` must be a function taking exactly one argument",
            )),
            ErrorImpl::NonBooleanCondition { received, .. } => ErrorTip::Suggestion(format!(
                "Conditions must be `boolean`, received `{}`",
                received
            )),
            ErrorImpl::PatternTypeMismatch { .. } => ErrorTip::None,
            ErrorImpl::ReturnOutsideFunction => ErrorTip::Suggestion(String::from(
                "`return` can only appear inside a function body",
            )),
            ErrorImpl::InvalidOperator { .. } => ErrorTip::None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.get_error_name(), self.internal_error)
    }
}

impl std::error::Error for Error {}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorImpl {
    #[error("unrecognised token: {token:?}")]
    UnrecognisedToken { token: String },
    #[error("unexpected token: {token:?}")]
    UnexpectedToken { token: String },
    #[error("unexpected token ({message}): {token:?}")]
    UnexpectedTokenDetailed { token: String, message: String },
    #[error("error parsing number: {token:?}")]
    NumberParseError { token: String },
    #[error("variable '{name}' already declared in this scope")]
    DuplicateDeclaration { name: String },
    #[error("undefined variable '{name}'")]
    UndefinedName { name: String },
    #[error("type mismatch: expected {expected}, received {received}")]
    TypeMismatch { expected: String, received: String },
    #[error("cannot perform arithmetic on values with different units ({left} and {right})")]
    UnitMismatch { left: String, right: String },
    #[error("expected {expected} arguments, received {received}")]
    ArityMismatch { expected: usize, received: usize },
    #[error("argument {index} has wrong type: expected {expected}, received {received}")]
    ArgumentTypeMismatch {
        index: usize,
        expected: String,
        received: String,
    },
    #[error("invalid pipeline: {reason}")]
    InvalidPipeline { reason: String },
    #[error("{construct} condition must be boolean, received {received}")]
    NonBooleanCondition { construct: String, received: String },
    #[error("pattern of type {received} cannot match a value of type {expected}")]
    PatternTypeMismatch { expected: String, received: String },
    #[error("cannot return outside of a function")]
    ReturnOutsideFunction,
    #[error("invalid operator {operator:?}")]
    InvalidOperator { operator: String },
}

/// A fault raised while lowering a checked program to IR.
///
/// These are never user diagnostics: each one means the generator met a tree
/// the analyzer should already have rejected, or an internal invariant broke.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodegenError {
    #[error("no conversion function from unit {from:?} to {to:?}")]
    UnknownConversion { from: String, to: String },
    #[error("unknown identifier {name:?}")]
    UnknownIdentifier { name: String },
    #[error("{callee} is not a callable function")]
    NotCallable { callee: String },
    #[error("call expects {expected} arguments, received {received}")]
    ArityMismatch { expected: usize, received: usize },
    #[error("return outside of a function")]
    ReturnOutsideFunction,
    #[error("cannot iterate over a value of type {found}")]
    NotIterable { found: String },
    #[error("{operation} cannot take an operand of type {found}")]
    InvalidOperand { operation: String, found: String },
    #[error("binding {name:?} has no resolved type")]
    UntypedBinding { name: String },
    #[error("IR builder failure: {0}")]
    Builder(String),
    #[error("module verification failed: {0}")]
    Verification(String),
}

impl From<BuilderError> for CodegenError {
    fn from(error: BuilderError) -> Self {
        CodegenError::Builder(format!("{:?}", error))
    }
}
