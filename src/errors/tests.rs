//! Unit tests for error handling.

use crate::errors::errors::{CodegenError, Error, ErrorImpl, ErrorTip};
use crate::Position;
use std::rc::Rc;

fn at(pos: u32) -> Position {
    Position(pos, Rc::new("test.gehu".to_string()))
}

#[test]
fn test_error_creation() {
    let error = Error::new(
        ErrorImpl::UnrecognisedToken {
            token: "@".to_string(),
        },
        at(10),
    );

    assert_eq!(error.get_error_name(), "UnrecognisedToken");
    assert_eq!(error.get_position().0, 10);
}

#[test]
fn test_duplicate_declaration_message() {
    let error = Error::new(
        ErrorImpl::DuplicateDeclaration {
            name: "x".to_string(),
        },
        at(0),
    );

    assert_eq!(error.get_error_name(), "DuplicateDeclaration");
    assert_eq!(
        error.to_string(),
        "DuplicateDeclaration: variable 'x' already declared in this scope"
    );
}

#[test]
fn test_undefined_name_message() {
    let error = Error::new(
        ErrorImpl::UndefinedName {
            name: "speed".to_string(),
        },
        at(4),
    );

    assert_eq!(error.get_error_name(), "UndefinedName");
    assert!(error.to_string().contains("undefined variable 'speed'"));
}

#[test]
fn test_unit_mismatch_message() {
    let error = Error::new(
        ErrorImpl::UnitMismatch {
            left: "km".to_string(),
            right: "s".to_string(),
        },
        at(0),
    );

    assert_eq!(error.get_error_name(), "UnitMismatch");
    assert!(error
        .to_string()
        .contains("cannot perform arithmetic on values with different units"));
}

#[test]
fn test_argument_type_mismatch_index() {
    let error = Error::new(
        ErrorImpl::ArgumentTypeMismatch {
            index: 2,
            expected: "number".to_string(),
            received: "string".to_string(),
        },
        at(0),
    );

    assert_eq!(error.get_error_name(), "ArgumentTypeMismatch");
    assert!(error.to_string().contains("argument 2 has wrong type"));
}

#[test]
fn test_return_outside_function() {
    let error = Error::new(ErrorImpl::ReturnOutsideFunction, at(0));

    assert_eq!(error.get_error_name(), "ReturnOutsideFunction");
    assert!(matches!(error.get_tip(), ErrorTip::Suggestion(_)));
}

#[test]
fn test_error_tip_none() {
    let error = Error::new(
        ErrorImpl::InvalidOperator {
            operator: "%".to_string(),
        },
        at(0),
    );

    assert!(matches!(error.get_tip(), ErrorTip::None));
}

#[test]
fn test_error_tip_display() {
    let tip = ErrorTip::Suggestion("Try this instead".to_string());
    assert_eq!(tip.to_string(), "Try this instead");

    let tip = ErrorTip::None;
    assert_eq!(tip.to_string(), "");
}

#[test]
fn test_codegen_error_messages() {
    let error = CodegenError::UnknownConversion {
        from: "parsec".to_string(),
        to: String::new(),
    };
    assert_eq!(
        error.to_string(),
        "no conversion function from unit \"parsec\" to \"\""
    );

    let error = CodegenError::ArityMismatch {
        expected: 1,
        received: 2,
    };
    assert_eq!(error.to_string(), "call expects 1 arguments, received 2");
}
