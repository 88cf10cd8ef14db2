use log::debug;

use crate::{
    ast::{
        ast::Program,
        expressions::{BinaryOp, Expr, ExprKind, FunctionExpr, UnaryOp},
        statements::{Stmt, StmtKind},
        types::Type,
    },
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::{registry::TypeRegistry, scope::ScopeChain};

/// Analysis state for one compilation unit.
///
/// Holds the scope chain (with the global scope already pushed) and the
/// return type of the function body being checked, `None` at top level.
#[derive(Debug)]
pub struct TypeChecker<'r> {
    scopes: ScopeChain,
    registry: &'r TypeRegistry,
    return_type: Option<Type>,
}

impl<'r> TypeChecker<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        let mut scopes = ScopeChain::new();
        scopes.enter_scope();

        TypeChecker {
            scopes,
            registry,
            return_type: None,
        }
    }

    pub fn scopes(&self) -> &ScopeChain {
        &self.scopes
    }

    pub fn current_return_type(&self) -> Option<&Type> {
        self.return_type.as_ref()
    }

    /// Runs `check` inside a fresh nested scope, popping it on every path.
    fn scoped<T>(
        &mut self,
        check: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        self.scopes.enter_scope();
        let result = check(self);
        self.scopes.exit_scope();
        result
    }
}

fn type_mismatch(expected: impl ToString, received: impl ToString, position: Position) -> Error {
    Error::new(
        ErrorImpl::TypeMismatch {
            expected: expected.to_string(),
            received: received.to_string(),
        },
        position,
    )
}

fn expect_number(ty: &Type, position: Position) -> Result<(), Error> {
    if ty.is_number() {
        Ok(())
    } else {
        Err(type_mismatch("number", ty, position))
    }
}

/// Checks one expression, records its type in `expr.ty` and returns it.
pub fn type_check_expr(type_checker: &mut TypeChecker, expr: &mut Expr) -> Result<Type, Error> {
    let position = expr.get_position();

    let ty = match &mut expr.kind {
        ExprKind::Number { unit, .. } => Type::number_with_unit(unit),
        ExprKind::String(_) => Type::String,
        ExprKind::Boolean(_) => Type::Boolean,
        ExprKind::Variable(name) => type_checker.scopes.resolve(name, position)?.clone(),
        ExprKind::Assignment { name, value } => {
            let value_type = type_check_expr(type_checker, value)?;
            let target = type_checker.scopes.resolve(name, position.clone())?;

            if !target.is_assignable_from(&value_type) {
                return Err(type_mismatch(target, &value_type, position));
            }

            value_type
        }
        ExprKind::Binary { op, left, right } => {
            let left_type = type_check_expr(type_checker, left)?;
            let right_type = type_check_expr(type_checker, right)?;

            type_check_binary(*op, &left_type, &right_type, left, right)?
        }
        ExprKind::Unary { op, operand } => {
            let operand_type = type_check_expr(type_checker, operand)?;

            match op {
                UnaryOp::Negate => {
                    expect_number(&operand_type, operand.get_position())?;
                    operand_type
                }
                UnaryOp::Not => {
                    if !operand_type.is_boolean() {
                        return Err(type_mismatch(
                            Type::Boolean,
                            &operand_type,
                            operand.get_position(),
                        ));
                    }
                    Type::Boolean
                }
            }
        }
        ExprKind::Call { callee, arguments } => {
            let callee_type = type_check_expr(type_checker, callee)?;

            let (params, return_type) = match callee_type {
                Type::Function {
                    params,
                    return_type,
                } => (params, return_type),
                other => return Err(type_mismatch("function", &other, callee.get_position())),
            };

            if params.len() != arguments.len() {
                return Err(Error::new(
                    ErrorImpl::ArityMismatch {
                        expected: params.len(),
                        received: arguments.len(),
                    },
                    position,
                ));
            }

            for (index, (argument, param)) in arguments.iter_mut().zip(params.iter()).enumerate() {
                let argument_type = type_check_expr(type_checker, argument)?;

                if !param.is_assignable_from(&argument_type) {
                    return Err(Error::new(
                        ErrorImpl::ArgumentTypeMismatch {
                            index: index + 1,
                            expected: param.to_string(),
                            received: argument_type.to_string(),
                        },
                        argument.get_position(),
                    ));
                }
            }

            *return_type
        }
        ExprKind::Pipeline { value, function } => {
            let value_type = type_check_expr(type_checker, value)?;
            let function_type = type_check_expr(type_checker, function)?;

            type_check_pipeline(&value_type, function_type, position)?
        }
        ExprKind::Function(literal) => type_check_function(type_checker, literal, position)?,
    };

    expr.ty = Some(ty.clone());
    Ok(ty)
}

fn type_check_binary(
    op: BinaryOp,
    left_type: &Type,
    right_type: &Type,
    left: &Expr,
    right: &Expr,
) -> Result<Type, Error> {
    if op.is_comparison() {
        if !left_type.is_comparable_with(right_type) {
            return Err(type_mismatch(left_type, right_type, right.get_position()));
        }
        return Ok(Type::Boolean);
    }

    expect_number(left_type, left.get_position())?;
    expect_number(right_type, right.get_position())?;

    let left_unit = left_type.unit().unwrap_or_default();
    let right_unit = right_type.unit().unwrap_or_default();

    if !left_unit.is_empty() && !right_unit.is_empty() && left_unit != right_unit {
        return Err(Error::new(
            ErrorImpl::UnitMismatch {
                left: left_unit.to_string(),
                right: right_unit.to_string(),
            },
            left.get_position(),
        ));
    }

    // The result always carries the left operand's unit.
    Ok(Type::number_with_unit(left_unit))
}

fn type_check_pipeline(
    value_type: &Type,
    function_type: Type,
    position: Position,
) -> Result<Type, Error> {
    let invalid = |reason: String| {
        Error::new(ErrorImpl::InvalidPipeline { reason }, position.clone())
    };

    match function_type {
        Type::Function {
            params,
            return_type,
        } if params.len() == 1 => {
            if params[0].is_assignable_from(value_type) {
                Ok(*return_type)
            } else {
                Err(invalid(format!(
                    "function expects {}, received {}",
                    params[0], value_type
                )))
            }
        }
        Type::Function { params, .. } => Err(invalid(format!(
            "function takes {} arguments, a pipeline passes exactly 1",
            params.len()
        ))),
        other => Err(invalid(format!("{} is not a function", other))),
    }
}

fn type_check_function(
    type_checker: &mut TypeChecker,
    literal: &mut FunctionExpr,
    position: Position,
) -> Result<Type, Error> {
    for param in literal.params.iter_mut() {
        param.ty = type_checker.registry.resolve(&param.ty);
    }
    literal.return_type = type_checker.registry.resolve(&literal.return_type);

    let function_type = literal.get_type();
    let previous_return = type_checker.return_type.replace(literal.return_type.clone());

    let result = type_checker.scoped(|type_checker| {
        for param in literal.params.iter() {
            type_checker
                .scopes
                .declare(&param.name, param.ty.clone(), position.clone())?;
        }

        for stmt in literal.body.iter_mut() {
            type_check_stmt(type_checker, stmt)?;
        }

        Ok(())
    });

    type_checker.return_type = previous_return;
    result?;

    Ok(function_type)
}

fn expect_condition(
    type_checker: &mut TypeChecker,
    condition: &mut Expr,
    construct: &str,
) -> Result<(), Error> {
    let condition_type = type_check_expr(type_checker, condition)?;

    if !condition_type.is_boolean() {
        return Err(Error::new(
            ErrorImpl::NonBooleanCondition {
                construct: construct.to_string(),
                received: condition_type.to_string(),
            },
            condition.get_position(),
        ));
    }

    Ok(())
}

fn type_check_scoped_stmt(type_checker: &mut TypeChecker, stmt: &mut Stmt) -> Result<(), Error> {
    type_checker.scoped(|type_checker| type_check_stmt(type_checker, stmt))
}

pub fn type_check_stmt(type_checker: &mut TypeChecker, stmt: &mut Stmt) -> Result<(), Error> {
    let position = stmt.get_span().start.clone();

    match &mut stmt.kind {
        StmtKind::Expression(expr) => {
            type_check_expr(type_checker, expr)?;
        }
        StmtKind::Let {
            name,
            ty,
            initializer,
        } => {
            let initializer_type = type_check_expr(type_checker, initializer)?;

            let declared = match ty.as_ref() {
                Some(annotation) => {
                    let annotation = type_checker.registry.resolve(annotation);
                    if !annotation.is_assignable_from(&initializer_type) {
                        return Err(type_mismatch(
                            &annotation,
                            &initializer_type,
                            initializer.get_position(),
                        ));
                    }
                    annotation
                }
                None => initializer_type,
            };

            *ty = Some(declared.clone());
            type_checker.scopes.declare(name, declared, position)?;
        }
        StmtKind::Show(expr) => {
            type_check_expr(type_checker, expr)?;
        }
        StmtKind::Block(body) => {
            type_checker.scoped(|type_checker| {
                body.iter_mut()
                    .try_for_each(|stmt| type_check_stmt(type_checker, stmt))
            })?;
        }
        StmtKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            expect_condition(type_checker, condition, "if")?;
            type_check_scoped_stmt(type_checker, then_branch)?;

            if let Some(else_branch) = else_branch {
                type_check_scoped_stmt(type_checker, else_branch)?;
            }
        }
        StmtKind::While { condition, body } => {
            expect_condition(type_checker, condition, "while")?;
            type_check_scoped_stmt(type_checker, body)?;
        }
        StmtKind::For {
            variable,
            iterator,
            step,
            body,
        } => {
            // Iterable types are not modelled; the loop variable is a number.
            type_check_expr(type_checker, iterator)?;

            type_checker.scoped(|type_checker| {
                type_checker
                    .scopes
                    .declare(variable, Type::number(), position.clone())?;

                if let Some(step) = step {
                    let step_type = type_check_expr(type_checker, step)?;
                    expect_number(&step_type, step.get_position())?;
                }

                type_check_stmt(type_checker, body)
            })?;
        }
        StmtKind::Match {
            scrutinee,
            cases,
            default,
        } => {
            let value_type = type_check_expr(type_checker, scrutinee)?;

            for case in cases.iter_mut() {
                let pattern_type = type_check_expr(type_checker, &mut case.pattern)?;

                if !value_type.is_assignable_from(&pattern_type) {
                    return Err(Error::new(
                        ErrorImpl::PatternTypeMismatch {
                            expected: value_type.to_string(),
                            received: pattern_type.to_string(),
                        },
                        case.pattern.get_position(),
                    ));
                }

                type_check_scoped_stmt(type_checker, &mut case.body)?;
            }

            if let Some(default) = default {
                type_check_scoped_stmt(type_checker, default)?;
            }
        }
        // Handles and futures are not typed: both are checked for their
        // inner types only.
        StmtKind::Spawn(inner) => type_check_stmt(type_checker, inner)?,
        StmtKind::Wait(expr) => {
            type_check_expr(type_checker, expr)?;
        }
        StmtKind::Return(value) => {
            let Some(return_type) = type_checker.return_type.clone() else {
                return Err(Error::new(ErrorImpl::ReturnOutsideFunction, position));
            };

            match value {
                Some(value) => {
                    let value_type = type_check_expr(type_checker, value)?;
                    if !return_type.is_assignable_from(&value_type) {
                        return Err(type_mismatch(
                            &return_type,
                            &value_type,
                            value.get_position(),
                        ));
                    }
                }
                // A bare `return` is only accepted in number-returning functions.
                None if return_type.is_number() => {}
                None => return Err(type_mismatch(&return_type, "no value", position)),
            }
        }
    }

    Ok(())
}

/// Checks a whole program against a fresh analyzer, annotating it in place.
pub fn type_check(program: &mut Program, registry: &TypeRegistry) -> Result<(), Error> {
    debug!("type checking {} statements", program.statements.len());

    let mut type_checker = TypeChecker::new(registry);

    for stmt in program.statements.iter_mut() {
        type_check_stmt(&mut type_checker, stmt)?;
    }

    debug!("type checking finished");
    Ok(())
}
