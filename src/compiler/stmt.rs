use inkwell::{
    module::Linkage,
    values::{BasicValueEnum, IntValue},
    AddressSpace, FloatPredicate, IntPredicate,
};
use log::{debug, trace};

use crate::{
    ast::{
        expressions::{BinaryOp, Expr},
        statements::{MatchCase, Stmt, StmtKind},
        types::Type,
    },
    errors::errors::CodegenError,
};

use super::{
    compiler::{Binding, Compiler},
    expr::{expect_float, gen_comparison, gen_expression, gen_value},
};

/// Generates IR for the given statement.
pub fn gen_statement<'a>(compiler: &mut Compiler<'a>, statement: &Stmt) -> Result<(), CodegenError> {
    match &statement.kind {
        StmtKind::Expression(expression) => {
            gen_expression(compiler, expression)?;
            Ok(())
        }
        StmtKind::Let {
            name,
            ty,
            initializer,
        } => gen_let(compiler, name, ty.as_ref(), initializer),
        StmtKind::Show(expression) => gen_show(compiler, expression),
        StmtKind::Block(statements) => {
            compiler.enter_scope();
            for statement in statements.iter() {
                gen_statement(compiler, statement)?;
            }
            compiler.exit_scope();
            Ok(())
        }
        StmtKind::If {
            condition,
            then_branch,
            else_branch,
        } => gen_if(compiler, condition, then_branch, else_branch.as_deref()),
        StmtKind::While { condition, body } => gen_while(compiler, condition, body),
        StmtKind::For {
            variable,
            iterator,
            step,
            body,
        } => gen_for(compiler, variable, iterator, step.as_ref(), body),
        StmtKind::Match {
            scrutinee,
            cases,
            default,
        } => gen_match(compiler, scrutinee, cases, default.as_deref()),
        StmtKind::Spawn(body) => gen_spawn(compiler, body),
        StmtKind::Wait(handle) => gen_wait(compiler, handle),
        StmtKind::Return(value) => gen_return(compiler, value.as_ref()),
    }
}

/// Generates a statement inside its own storage scope.
fn gen_scoped<'a>(compiler: &mut Compiler<'a>, statement: &Stmt) -> Result<(), CodegenError> {
    compiler.enter_scope();
    let result = gen_statement(compiler, statement);
    compiler.exit_scope();
    result
}

fn gen_let<'a>(
    compiler: &mut Compiler<'a>,
    name: &str,
    ty: Option<&Type>,
    initializer: &Expr,
) -> Result<(), CodegenError> {
    let ty = ty
        .or(initializer.ty.as_ref())
        .cloned()
        .ok_or_else(|| CodegenError::UntypedBinding {
            name: name.to_string(),
        })?;

    let (value, function) = gen_value(compiler, initializer, Some(name))?;

    let slot = compiler.create_entry_alloca(name, compiler.basic_type(&ty))?;
    compiler.builder.build_store(slot, value)?;

    let owner = compiler.current_function()?;
    compiler.bind(
        name,
        Binding {
            slot,
            ty,
            owner: Some(owner),
            function,
        },
    );

    Ok(())
}

fn gen_show<'a>(compiler: &mut Compiler<'a>, expression: &Expr) -> Result<(), CodegenError> {
    let value = gen_expression(compiler, expression)?;
    let runtime = compiler.runtime;

    match value {
        BasicValueEnum::FloatValue(number) => {
            compiler
                .builder
                .build_call(runtime.print, &[number.into()], "")?;
        }
        BasicValueEnum::IntValue(flag) => {
            let number = compiler.builder.build_unsigned_int_to_float(
                flag,
                compiler.context.f64_type(),
                "shown",
            )?;
            compiler
                .builder
                .build_call(runtime.print, &[number.into()], "")?;
        }
        BasicValueEnum::PointerValue(text) if text.get_type() == string_pointer(compiler) => {
            compiler
                .builder
                .build_call(runtime.print_string, &[text.into()], "")?;
        }
        other => {
            return Err(CodegenError::InvalidOperand {
                operation: String::from("show"),
                found: format!("{:?}", other.get_type()),
            })
        }
    }

    Ok(())
}

/// Turns a boolean or number into a branch condition: anything but zero is
/// taken.
fn gen_condition<'a>(
    compiler: &mut Compiler<'a>,
    condition: &Expr,
) -> Result<IntValue<'a>, CodegenError> {
    match gen_expression(compiler, condition)? {
        BasicValueEnum::IntValue(flag) => Ok(compiler.builder.build_int_compare(
            IntPredicate::NE,
            flag,
            flag.get_type().const_zero(),
            "cond",
        )?),
        BasicValueEnum::FloatValue(number) => Ok(compiler.builder.build_float_compare(
            FloatPredicate::ONE,
            number,
            number.get_type().const_zero(),
            "cond",
        )?),
        other => Err(CodegenError::InvalidOperand {
            operation: String::from("condition"),
            found: format!("{:?}", other.get_type()),
        }),
    }
}

fn gen_if<'a>(
    compiler: &mut Compiler<'a>,
    condition: &Expr,
    then_branch: &Stmt,
    else_branch: Option<&Stmt>,
) -> Result<(), CodegenError> {
    let condition = gen_condition(compiler, condition)?;

    let then_block = compiler.append_block("then")?;
    let else_block = compiler.append_block("else")?;
    let merge_block = compiler.append_block("ifcont")?;

    compiler
        .builder
        .build_conditional_branch(condition, then_block, else_block)?;

    compiler.builder.position_at_end(then_block);
    gen_scoped(compiler, then_branch)?;
    compiler.branch_if_open(merge_block)?;

    compiler.builder.position_at_end(else_block);
    if let Some(else_branch) = else_branch {
        gen_scoped(compiler, else_branch)?;
    }
    compiler.branch_if_open(merge_block)?;

    compiler.builder.position_at_end(merge_block);
    Ok(())
}

fn gen_while<'a>(
    compiler: &mut Compiler<'a>,
    condition: &Expr,
    body: &Stmt,
) -> Result<(), CodegenError> {
    let cond_block = compiler.append_block("while.cond")?;
    let body_block = compiler.append_block("while.body")?;
    let end_block = compiler.append_block("while.end")?;

    compiler.builder.build_unconditional_branch(cond_block)?;

    compiler.builder.position_at_end(cond_block);
    let condition = gen_condition(compiler, condition)?;
    compiler
        .builder
        .build_conditional_branch(condition, body_block, end_block)?;

    compiler.builder.position_at_end(body_block);
    gen_scoped(compiler, body)?;
    compiler.branch_if_open(cond_block)?;

    compiler.builder.position_at_end(end_block);
    Ok(())
}

/// `for i in bound by step body`: `i` counts from zero while it is below
/// `bound`, which is evaluated once.
fn gen_for<'a>(
    compiler: &mut Compiler<'a>,
    variable: &str,
    iterator: &Expr,
    step: Option<&Expr>,
    body: &Stmt,
) -> Result<(), CodegenError> {
    let bound = match gen_expression(compiler, iterator)? {
        BasicValueEnum::FloatValue(bound) => bound,
        other => {
            return Err(CodegenError::NotIterable {
                found: format!("{:?}", other.get_type()),
            })
        }
    };

    let f64_type = compiler.context.f64_type();

    compiler.enter_scope();

    let slot = compiler.create_entry_alloca(variable, f64_type.into())?;
    compiler.builder.build_store(slot, f64_type.const_zero())?;
    let owner = compiler.current_function()?;
    compiler.bind(
        variable,
        Binding {
            slot,
            ty: Type::number(),
            owner: Some(owner),
            function: None,
        },
    );

    let cond_block = compiler.append_block("for.cond")?;
    let body_block = compiler.append_block("for.body")?;
    let step_block = compiler.append_block("for.step")?;
    let end_block = compiler.append_block("for.end")?;

    compiler.builder.build_unconditional_branch(cond_block)?;

    compiler.builder.position_at_end(cond_block);
    let current = compiler.builder.build_load(slot, variable)?.into_float_value();
    let in_range =
        compiler
            .builder
            .build_float_compare(FloatPredicate::OLT, current, bound, "for.test")?;
    compiler
        .builder
        .build_conditional_branch(in_range, body_block, end_block)?;

    compiler.builder.position_at_end(body_block);
    gen_statement(compiler, body)?;
    compiler.branch_if_open(step_block)?;

    compiler.builder.position_at_end(step_block);
    let increment = match step {
        Some(step) => expect_float(gen_expression(compiler, step)?, "for step")?,
        None => f64_type.const_float(1.0),
    };
    let current = compiler.builder.build_load(slot, variable)?.into_float_value();
    let next = compiler
        .builder
        .build_float_add(current, increment, "for.next")?;
    compiler.builder.build_store(slot, next)?;
    compiler.builder.build_unconditional_branch(cond_block)?;

    compiler.builder.position_at_end(end_block);
    compiler.exit_scope();

    Ok(())
}

/// Tests the cases in order; the first equal pattern runs and control
/// leaves the match.
fn gen_match<'a>(
    compiler: &mut Compiler<'a>,
    scrutinee: &Expr,
    cases: &[MatchCase],
    default: Option<&Stmt>,
) -> Result<(), CodegenError> {
    let value = gen_expression(compiler, scrutinee)?;
    let end_block = compiler.append_block("match.end")?;

    for (index, case) in cases.iter().enumerate() {
        trace!("match case {}", index);

        let pattern = gen_expression(compiler, &case.pattern)?;
        let matched = gen_comparison(compiler, BinaryOp::Equal, value, pattern)?;

        let case_block = compiler.append_block(&format!("case.{}", index))?;
        let next_block = compiler.append_block(&format!("next.{}", index))?;
        compiler
            .builder
            .build_conditional_branch(matched, case_block, next_block)?;

        compiler.builder.position_at_end(case_block);
        gen_scoped(compiler, &case.body)?;
        compiler.branch_if_open(end_block)?;

        compiler.builder.position_at_end(next_block);
    }

    if let Some(default) = default {
        gen_scoped(compiler, default)?;
    }
    compiler.branch_if_open(end_block)?;

    // Keep the end block after every case block.
    if let Some(last) = compiler.builder.get_insert_block() {
        end_block.move_after(last).map_err(|_| {
            CodegenError::Builder(String::from("could not reorder match blocks"))
        })?;
    }
    compiler.builder.position_at_end(end_block);

    Ok(())
}

/// Wraps the statement in a private `void()` function and hands it to the
/// runtime, which starts it concurrently.
fn gen_spawn<'a>(compiler: &mut Compiler<'a>, body: &Stmt) -> Result<(), CodegenError> {
    let name = compiler.unique_function_name("spawn");
    let function_type = compiler.context.void_type().fn_type(&[], false);
    let function = compiler.create_function(&name, function_type, Linkage::Private);
    debug!("generating spawned body {}", name);

    let previous = compiler.begin_function(function, None);
    gen_statement(compiler, body)?;
    compiler.end_function(previous)?;

    let entry = compiler.builder.build_pointer_cast(
        function.as_global_value().as_pointer_value(),
        string_pointer(compiler),
        "spawn.fn",
    )?;
    compiler
        .builder
        .build_call(compiler.runtime.spawn_thread, &[entry.into()], "spawn.handle")?;

    Ok(())
}

/// Blocks until the thread behind `handle` finishes. Numbers are taken as
/// raw handle bits.
fn gen_wait<'a>(compiler: &mut Compiler<'a>, handle: &Expr) -> Result<(), CodegenError> {
    let handle_type = string_pointer(compiler);
    let value = gen_expression(compiler, handle)?;

    let handle = match value {
        BasicValueEnum::PointerValue(pointer) => {
            compiler
                .builder
                .build_pointer_cast(pointer, handle_type, "handle")?
        }
        BasicValueEnum::FloatValue(number) => {
            let bits = compiler.builder.build_float_to_unsigned_int(
                number,
                compiler.context.i64_type(),
                "handle.bits",
            )?;
            compiler
                .builder
                .build_int_to_ptr(bits, handle_type, "handle")?
        }
        BasicValueEnum::IntValue(bits) => {
            compiler
                .builder
                .build_int_to_ptr(bits, handle_type, "handle")?
        }
        other => {
            return Err(CodegenError::InvalidOperand {
                operation: String::from("wait"),
                found: format!("{:?}", other.get_type()),
            })
        }
    };

    compiler
        .builder
        .build_call(compiler.runtime.wait_thread, &[handle.into()], "")?;

    Ok(())
}

fn gen_return<'a>(compiler: &mut Compiler<'a>, value: Option<&Expr>) -> Result<(), CodegenError> {
    let return_type = compiler
        .current_return_type()
        .cloned()
        .ok_or(CodegenError::ReturnOutsideFunction)?;

    let value = match value {
        Some(value) => gen_expression(compiler, value)?,
        None => compiler.zero_value(compiler.basic_type(&return_type))?,
    };
    compiler.builder.build_return(Some(&value))?;

    // Anything after the return lands in an unreachable block.
    let after = compiler.append_block("after.return")?;
    compiler.builder.position_at_end(after);

    Ok(())
}

fn string_pointer<'a>(compiler: &Compiler<'a>) -> inkwell::types::PointerType<'a> {
    compiler.context.i8_type().ptr_type(AddressSpace::default())
}
