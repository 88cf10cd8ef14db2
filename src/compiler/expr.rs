use inkwell::{
    module::Linkage,
    types::AnyTypeEnum,
    values::{
        BasicMetadataValueEnum, BasicValueEnum, CallableValue, FloatValue, FunctionValue,
        IntValue, PointerValue,
    },
    AddressSpace, FloatPredicate, IntPredicate,
};
use log::debug;

use crate::{
    ast::expressions::{BinaryOp, Expr, ExprKind, FunctionExpr, UnaryOp},
    errors::errors::CodegenError,
};

use super::{
    compiler::{Binding, Compiler},
    runtime::conversion_name,
    stmt::gen_statement,
};

/// Generates IR for the given expression.
pub fn gen_expression<'a>(
    compiler: &mut Compiler<'a>,
    expression: &Expr,
) -> Result<BasicValueEnum<'a>, CodegenError> {
    match &expression.kind {
        ExprKind::Number { value, unit } => gen_number(compiler, *value, unit),
        ExprKind::String(value) => Ok(compiler
            .builder
            .build_global_string_ptr(value, "str")?
            .as_pointer_value()
            .into()),
        ExprKind::Boolean(value) => Ok(compiler
            .context
            .bool_type()
            .const_int(*value as u64, false)
            .into()),
        ExprKind::Variable(name) => {
            let binding = compiler.resolve(name)?;
            Ok(compiler.builder.build_load(binding.slot, name)?)
        }
        ExprKind::Assignment { name, value } => {
            let (stored, _) = gen_value(compiler, value, Some(name))?;
            let binding = compiler.resolve(name)?;

            compiler.builder.build_store(binding.slot, stored)?;

            Ok(stored)
        }
        ExprKind::Binary { op, left, right } => {
            let lhs = gen_expression(compiler, left)?;
            let rhs = gen_expression(compiler, right)?;

            gen_binary(compiler, *op, lhs, rhs)
        }
        ExprKind::Unary { op, operand } => {
            let value = gen_expression(compiler, operand)?;

            match op {
                UnaryOp::Negate => Ok(compiler
                    .builder
                    .build_float_neg(expect_float(value, "-")?, "negtmp")?
                    .into()),
                UnaryOp::Not => Ok(compiler
                    .builder
                    .build_not(expect_int(value, "!")?, "nottmp")?
                    .into()),
            }
        }
        ExprKind::Call { callee, arguments } => {
            let function = gen_callee(compiler, callee)?;

            let mut values: Vec<BasicMetadataValueEnum<'a>> = Vec::with_capacity(arguments.len());
            for argument in arguments.iter() {
                values.push(gen_expression(compiler, argument)?.into());
            }

            gen_call(compiler, function, &values)
        }
        ExprKind::Pipeline { value, function } => {
            let argument = gen_expression(compiler, value)?;
            let function = gen_callee(compiler, function)?;

            gen_call(compiler, function, &[argument.into()])
        }
        ExprKind::Function(literal) => {
            let function = gen_function(compiler, literal, None)?;
            Ok(function.as_global_value().as_pointer_value().into())
        }
    }
}

/// Generates a value that is about to be stored under `name`, along with the
/// function it is known to be, if any.
pub fn gen_value<'a>(
    compiler: &mut Compiler<'a>,
    expression: &Expr,
    name: Option<&str>,
) -> Result<(BasicValueEnum<'a>, Option<FunctionValue<'a>>), CodegenError> {
    match &expression.kind {
        ExprKind::Function(literal) => {
            let function = gen_function(compiler, literal, name)?;
            Ok((
                function.as_global_value().as_pointer_value().into(),
                Some(function),
            ))
        }
        ExprKind::Variable(variable) => {
            let binding: Binding<'a> = compiler.resolve(variable)?;
            let value = compiler.builder.build_load(binding.slot, variable)?;
            Ok((value, binding.function))
        }
        _ => Ok((gen_expression(compiler, expression)?, None)),
    }
}

/// A unit literal is its magnitude converted to the plain number.
fn gen_number<'a>(
    compiler: &Compiler<'a>,
    value: f64,
    unit: &str,
) -> Result<BasicValueEnum<'a>, CodegenError> {
    let magnitude = compiler.context.f64_type().const_float(value);
    if unit.is_empty() {
        return Ok(magnitude.into());
    }

    let converter = compiler
        .module
        .get_function(&conversion_name(unit, ""))
        .ok_or_else(|| CodegenError::UnknownConversion {
            from: unit.to_string(),
            to: String::new(),
        })?;

    gen_call(compiler, Callee::Direct(converter), &[magnitude.into()])
}

fn gen_binary<'a>(
    compiler: &Compiler<'a>,
    op: BinaryOp,
    lhs: BasicValueEnum<'a>,
    rhs: BasicValueEnum<'a>,
) -> Result<BasicValueEnum<'a>, CodegenError> {
    let operator = op.to_string();
    let builder = &compiler.builder;

    let value = match op {
        BinaryOp::Add => builder.build_float_add(
            expect_float(lhs, &operator)?,
            expect_float(rhs, &operator)?,
            "addtmp",
        )?,
        BinaryOp::Subtract => builder.build_float_sub(
            expect_float(lhs, &operator)?,
            expect_float(rhs, &operator)?,
            "subtmp",
        )?,
        BinaryOp::Multiply => builder.build_float_mul(
            expect_float(lhs, &operator)?,
            expect_float(rhs, &operator)?,
            "multmp",
        )?,
        BinaryOp::Divide => builder.build_float_div(
            expect_float(lhs, &operator)?,
            expect_float(rhs, &operator)?,
            "divtmp",
        )?,
        _ => return Ok(gen_comparison(compiler, op, lhs, rhs)?.into()),
    };

    Ok(value.into())
}

/// Compares two values of the same kind: floats ordered, booleans unsigned,
/// strings through `strcmp` and any other pointer by address.
pub fn gen_comparison<'a>(
    compiler: &Compiler<'a>,
    op: BinaryOp,
    lhs: BasicValueEnum<'a>,
    rhs: BasicValueEnum<'a>,
) -> Result<IntValue<'a>, CodegenError> {
    let builder = &compiler.builder;

    match (lhs, rhs) {
        (BasicValueEnum::FloatValue(lhs), BasicValueEnum::FloatValue(rhs)) => Ok(builder
            .build_float_compare(float_predicate(op)?, lhs, rhs, "cmptmp")?),
        (BasicValueEnum::IntValue(lhs), BasicValueEnum::IntValue(rhs)) => Ok(builder
            .build_int_compare(int_predicate(op, false)?, lhs, rhs, "cmptmp")?),
        (BasicValueEnum::PointerValue(lhs), BasicValueEnum::PointerValue(rhs))
            if lhs.get_type() == compiler.context.i8_type().ptr_type(AddressSpace::default()) =>
        {
            let order = builder
                .build_call(compiler.runtime.strcmp, &[lhs.into(), rhs.into()], "strcmp")?
                .try_as_basic_value()
                .left()
                .ok_or_else(|| CodegenError::Builder(String::from("strcmp returned no value")))?
                .into_int_value();
            let zero = compiler.context.i32_type().const_zero();

            Ok(builder.build_int_compare(int_predicate(op, true)?, order, zero, "cmptmp")?)
        }
        (BasicValueEnum::PointerValue(lhs), BasicValueEnum::PointerValue(rhs)) => {
            let address_type = compiler.context.i64_type();
            let lhs = builder.build_ptr_to_int(lhs, address_type, "lhs_addr")?;
            let rhs = builder.build_ptr_to_int(rhs, address_type, "rhs_addr")?;

            Ok(builder.build_int_compare(int_predicate(op, false)?, lhs, rhs, "cmptmp")?)
        }
        (lhs, _) => Err(CodegenError::InvalidOperand {
            operation: op.to_string(),
            found: format!("{:?}", lhs.get_type()),
        }),
    }
}

fn float_predicate(op: BinaryOp) -> Result<FloatPredicate, CodegenError> {
    match op {
        BinaryOp::Equal => Ok(FloatPredicate::OEQ),
        BinaryOp::NotEqual => Ok(FloatPredicate::ONE),
        BinaryOp::Less => Ok(FloatPredicate::OLT),
        BinaryOp::Greater => Ok(FloatPredicate::OGT),
        BinaryOp::LessEqual => Ok(FloatPredicate::OLE),
        BinaryOp::GreaterEqual => Ok(FloatPredicate::OGE),
        _ => Err(not_a_comparison(op)),
    }
}

fn int_predicate(op: BinaryOp, signed: bool) -> Result<IntPredicate, CodegenError> {
    match (op, signed) {
        (BinaryOp::Equal, _) => Ok(IntPredicate::EQ),
        (BinaryOp::NotEqual, _) => Ok(IntPredicate::NE),
        (BinaryOp::Less, false) => Ok(IntPredicate::ULT),
        (BinaryOp::Greater, false) => Ok(IntPredicate::UGT),
        (BinaryOp::LessEqual, false) => Ok(IntPredicate::ULE),
        (BinaryOp::GreaterEqual, false) => Ok(IntPredicate::UGE),
        (BinaryOp::Less, true) => Ok(IntPredicate::SLT),
        (BinaryOp::Greater, true) => Ok(IntPredicate::SGT),
        (BinaryOp::LessEqual, true) => Ok(IntPredicate::SLE),
        (BinaryOp::GreaterEqual, true) => Ok(IntPredicate::SGE),
        _ => Err(not_a_comparison(op)),
    }
}

fn not_a_comparison(op: BinaryOp) -> CodegenError {
    CodegenError::InvalidOperand {
        operation: op.to_string(),
        found: String::from("comparison"),
    }
}

/// What a call goes through.
#[derive(Debug, Clone, Copy)]
pub enum Callee<'a> {
    /// A function known at generation time
    Direct(FunctionValue<'a>),
    /// A function pointer loaded at run time
    Indirect(PointerValue<'a>),
}

/// Calls through a name that never changes are direct. Every other callee is
/// evaluated to a function pointer and called indirectly.
fn gen_callee<'a>(
    compiler: &mut Compiler<'a>,
    callee: &Expr,
) -> Result<Callee<'a>, CodegenError> {
    match &callee.kind {
        ExprKind::Variable(name) => {
            let known = compiler
                .lookup(name)
                .ok_or_else(|| CodegenError::UnknownIdentifier { name: name.clone() })?
                .function;
            if let Some(function) = known {
                return Ok(Callee::Direct(function));
            }
        }
        ExprKind::Function(literal) => {
            return Ok(Callee::Direct(gen_function(compiler, literal, None)?));
        }
        _ => {}
    }

    match gen_expression(compiler, callee)? {
        BasicValueEnum::PointerValue(pointer) => Ok(Callee::Indirect(pointer)),
        _ => Err(CodegenError::NotCallable {
            callee: callee_name(callee),
        }),
    }
}

fn callee_name(callee: &Expr) -> String {
    match &callee.kind {
        ExprKind::Variable(name) => name.clone(),
        _ => String::from("expression"),
    }
}

pub fn gen_call<'a>(
    compiler: &Compiler<'a>,
    callee: Callee<'a>,
    arguments: &[BasicMetadataValueEnum<'a>],
) -> Result<BasicValueEnum<'a>, CodegenError> {
    let (callable, expected) = match callee {
        Callee::Direct(function) => (CallableValue::from(function), function.count_params()),
        Callee::Indirect(pointer) => {
            let not_callable = || CodegenError::NotCallable {
                callee: format!("{:?}", pointer.get_type()),
            };
            let expected = match pointer.get_type().get_element_type() {
                AnyTypeEnum::FunctionType(function_type) => function_type.count_param_types(),
                _ => return Err(not_callable()),
            };
            let callable = CallableValue::try_from(pointer).map_err(|_| not_callable())?;
            (callable, expected)
        }
    };

    let expected = expected as usize;
    if expected != arguments.len() {
        return Err(CodegenError::ArityMismatch {
            expected,
            received: arguments.len(),
        });
    }

    compiler
        .builder
        .build_call(callable, arguments, "calltmp")?
        .try_as_basic_value()
        .left()
        .ok_or_else(|| CodegenError::InvalidOperand {
            operation: String::from("call"),
            found: String::from("void"),
        })
}

/// Emits a function literal as an internal function named after `name`
/// (or `lambda`), made unique within the module.
pub fn gen_function<'a>(
    compiler: &mut Compiler<'a>,
    literal: &FunctionExpr,
    name: Option<&str>,
) -> Result<FunctionValue<'a>, CodegenError> {
    let param_types = literal
        .params
        .iter()
        .map(|param| param.ty.clone())
        .collect::<Vec<_>>();
    let function_type = compiler.function_type(&param_types, &literal.return_type);

    let name = compiler.unique_function_name(name.unwrap_or("lambda"));
    let function = compiler.create_function(&name, function_type, Linkage::Internal);
    debug!("generating function {}", name);

    let previous = compiler.begin_function(function, Some(literal.return_type.clone()));

    for (param, value) in literal.params.iter().zip(function.get_param_iter()) {
        let slot = compiler.create_entry_alloca(&param.name, compiler.basic_type(&param.ty))?;
        compiler.builder.build_store(slot, value)?;
        compiler.bind(
            &param.name,
            Binding {
                slot,
                ty: param.ty.clone(),
                owner: Some(function),
                function: None,
            },
        );
    }

    for statement in literal.body.iter() {
        gen_statement(compiler, statement)?;
    }

    compiler.end_function(previous)?;

    Ok(function)
}

pub fn expect_float<'a>(
    value: BasicValueEnum<'a>,
    operation: &str,
) -> Result<FloatValue<'a>, CodegenError> {
    match value {
        BasicValueEnum::FloatValue(value) => Ok(value),
        other => Err(CodegenError::InvalidOperand {
            operation: operation.to_string(),
            found: format!("{:?}", other.get_type()),
        }),
    }
}

fn expect_int<'a>(value: BasicValueEnum<'a>, operation: &str) -> Result<IntValue<'a>, CodegenError> {
    match value {
        BasicValueEnum::IntValue(value) => Ok(value),
        other => Err(CodegenError::InvalidOperand {
            operation: operation.to_string(),
            found: format!("{:?}", other.get_type()),
        }),
    }
}
