//! Unit tests for the parser module.

use std::rc::Rc;

use super::parser::parse;
use crate::{
    ast::{
        ast::Program,
        expressions::{BinaryOp, ExprKind, UnaryOp},
        statements::StmtKind,
        types::Type,
    },
    errors::errors::Error,
    lexer::lexer::tokenize,
};

fn parse_source(source: &str) -> Result<Program, Error> {
    let tokens = tokenize(source.to_string(), Some("test.gehu".to_string())).unwrap();
    parse(tokens, Rc::new("test.gehu".to_string()))
}

#[test]
fn test_parse_let_with_inferred_type() {
    let program = parse_source("let x = 42;").unwrap();

    match &program.statements[0].kind {
        StmtKind::Let {
            name,
            ty,
            initializer,
        } => {
            assert_eq!(name, "x");
            assert!(ty.is_none());
            assert!(matches!(initializer.kind, ExprKind::Number { value, .. } if value == 42.0));
        }
        other => panic!("expected let, found {:?}", other),
    }
}

#[test]
fn test_parse_unit_literal_and_annotation() {
    let program = parse_source("let d: number<km> = 5.5 km;").unwrap();

    match &program.statements[0].kind {
        StmtKind::Let {
            ty, initializer, ..
        } => {
            assert_eq!(ty, &Some(Type::number_with_unit("km")));
            match &initializer.kind {
                ExprKind::Number { value, unit } => {
                    assert_eq!(*value, 5.5);
                    assert_eq!(unit, "km");
                }
                other => panic!("expected number, found {:?}", other),
            }
        }
        other => panic!("expected let, found {:?}", other),
    }
}

#[test]
fn test_parse_precedence() {
    let program = parse_source("let r = 5 + 3 * 2;").unwrap();

    let StmtKind::Let { initializer, .. } = &program.statements[0].kind else {
        panic!("expected let");
    };
    match &initializer.kind {
        ExprKind::Binary { op, right, .. } => {
            assert_eq!(*op, BinaryOp::Add);
            assert!(matches!(
                right.kind,
                ExprKind::Binary {
                    op: BinaryOp::Multiply,
                    ..
                }
            ));
        }
        other => panic!("expected binary, found {:?}", other),
    }
}

#[test]
fn test_parse_negation_binds_tighter_than_addition() {
    let program = parse_source("show -a + b;").unwrap();

    let StmtKind::Show(value) = &program.statements[0].kind else {
        panic!("expected show");
    };
    match &value.kind {
        ExprKind::Binary { op, left, .. } => {
            assert_eq!(*op, BinaryOp::Add);
            assert!(matches!(
                left.kind,
                ExprKind::Unary {
                    op: UnaryOp::Negate,
                    ..
                }
            ));
        }
        other => panic!("expected binary, found {:?}", other),
    }
}

#[test]
fn test_parse_function_literal_and_pipeline() {
    let program =
        parse_source("let f = (x: number) -> number { return x; }; let r = 5 |> f;").unwrap();

    let StmtKind::Let { initializer, .. } = &program.statements[0].kind else {
        panic!("expected let");
    };
    match &initializer.kind {
        ExprKind::Function(literal) => {
            assert_eq!(literal.params.len(), 1);
            assert_eq!(literal.params[0].name, "x");
            assert_eq!(literal.return_type, Type::number());
            assert_eq!(literal.body.len(), 1);
        }
        other => panic!("expected function literal, found {:?}", other),
    }

    let StmtKind::Let { initializer, .. } = &program.statements[1].kind else {
        panic!("expected let");
    };
    assert!(matches!(initializer.kind, ExprKind::Pipeline { .. }));
}

#[test]
fn test_parse_grouping_is_not_a_function() {
    let program = parse_source("show (1 + 2) * 3;").unwrap();

    let StmtKind::Show(value) = &program.statements[0].kind else {
        panic!("expected show");
    };
    assert!(matches!(
        value.kind,
        ExprKind::Binary {
            op: BinaryOp::Multiply,
            ..
        }
    ));
}

#[test]
fn test_parse_function_type_annotation() {
    let program =
        parse_source("let g: fn(number, string) -> boolean = (a: number, b: string) -> boolean { return true; };")
            .unwrap();

    let StmtKind::Let { ty, .. } = &program.statements[0].kind else {
        panic!("expected let");
    };
    assert_eq!(
        ty,
        &Some(Type::function(
            vec![Type::number(), Type::String],
            Type::Boolean
        ))
    );
}

#[test]
fn test_parse_call() {
    let program = parse_source("add(1, 2);").unwrap();

    let StmtKind::Expression(expr) = &program.statements[0].kind else {
        panic!("expected expression statement");
    };
    match &expr.kind {
        ExprKind::Call { callee, arguments } => {
            assert!(matches!(&callee.kind, ExprKind::Variable(name) if name == "add"));
            assert_eq!(arguments.len(), 2);
        }
        other => panic!("expected call, found {:?}", other),
    }
}

#[test]
fn test_parse_control_flow() {
    let program = parse_source(
        "if x > 0 { show x; } else { show 0; }\n\
         while x < 10 { x = x + 1; }\n\
         for i in 10 by 2 { show i; }",
    )
    .unwrap();

    assert!(matches!(
        program.statements[0].kind,
        StmtKind::If {
            else_branch: Some(_),
            ..
        }
    ));
    assert!(matches!(program.statements[1].kind, StmtKind::While { .. }));
    match &program.statements[2].kind {
        StmtKind::For { variable, step, .. } => {
            assert_eq!(variable, "i");
            assert!(step.is_some());
        }
        other => panic!("expected for, found {:?}", other),
    }
}

#[test]
fn test_parse_match() {
    let program = parse_source("match x { 1 => show 1;, 2 => { show 2; } _ => show 0; }").unwrap();

    match &program.statements[0].kind {
        StmtKind::Match { cases, default, .. } => {
            assert_eq!(cases.len(), 2);
            assert!(default.is_some());
        }
        other => panic!("expected match, found {:?}", other),
    }
}

#[test]
fn test_parse_spawn_wait_return() {
    let program = parse_source("spawn show 1; wait 0; return;").unwrap();

    assert!(matches!(program.statements[0].kind, StmtKind::Spawn(_)));
    assert!(matches!(program.statements[1].kind, StmtKind::Wait(_)));
    assert!(matches!(program.statements[2].kind, StmtKind::Return(None)));
}

#[test]
fn test_parse_missing_semicolon() {
    let error = parse_source("let x = 1").unwrap_err();
    assert_eq!(error.get_error_name(), "UnexpectedToken");
}

#[test]
fn test_parse_let_requires_initializer() {
    let error = parse_source("let x: number;").unwrap_err();
    assert_eq!(error.get_error_name(), "UnexpectedTokenDetailed");
}

#[test]
fn test_parse_invalid_assignment_target() {
    let error = parse_source("1 = 2;").unwrap_err();
    assert_eq!(error.get_error_name(), "UnexpectedTokenDetailed");
}

#[test]
fn test_parse_duplicate_default_case() {
    let error = parse_source("match x { _ => show 1; _ => show 2; }").unwrap_err();
    assert_eq!(error.get_error_name(), "UnexpectedTokenDetailed");
}
