//! Unit tests for code generation.

use std::rc::Rc;

use inkwell::{context::Context, module::Linkage, values::AnyValue};

use super::{
    compiler::{compile, CompileOptions, Compiler},
    expr::{gen_call, Callee},
    runtime::conversion_name,
};
use crate::{
    ast::ast::Program,
    errors::errors::CodegenError,
    lexer::lexer::tokenize,
    parser::parser::parse,
    type_checker::{registry::TypeRegistry, type_checker::type_check},
};

fn parse_source(source: &str) -> Program {
    let tokens = tokenize(source.to_string(), Some("test.gehu".to_string())).unwrap();
    parse(tokens, Rc::new("test.gehu".to_string())).unwrap()
}

/// Verified but unoptimized, so the IR still mirrors the source.
fn unoptimized() -> CompileOptions {
    CompileOptions {
        optimize: false,
        ..CompileOptions::default()
    }
}

fn generate_with<'a>(
    source: &str,
    registry: &TypeRegistry,
    context: &'a Context,
) -> Result<Compiler<'a>, CodegenError> {
    let mut program = parse_source(source);
    type_check(&mut program, registry).unwrap();

    compile(&program, registry, &unoptimized(), context)
}

fn generate<'a>(source: &str, context: &'a Context) -> Compiler<'a> {
    match generate_with(source, &TypeRegistry::with_default_units(), context) {
        Ok(compiler) => compiler,
        Err(error) => panic!("generation failed: {}", error),
    }
}

fn generate_err(source: &str, registry: &TypeRegistry) -> CodegenError {
    let context = Context::create();
    let result = match generate_with(source, registry, &context) {
        Ok(compiler) => panic!("expected a failure, generated:\n{}", compiler.print_ir()),
        Err(error) => error,
    };
    result
}

/// Generation without analysis, for faults only the generator catches.
fn generate_unchecked_err(source: &str) -> CodegenError {
    let context = Context::create();
    let registry = TypeRegistry::with_default_units();
    let program = parse_source(source);

    let result = match compile(&program, &registry, &unoptimized(), &context) {
        Ok(compiler) => panic!("expected a failure, generated:\n{}", compiler.print_ir()),
        Err(error) => error,
    };
    result
}

fn assert_blocks_terminated(compiler: &Compiler) {
    for function in compiler.module.get_functions() {
        for block in function.get_basic_blocks() {
            assert!(
                block.get_terminator().is_some(),
                "block {:?} of {:?} is left open",
                block.get_name(),
                function.get_name()
            );
        }
    }
}

#[test]
fn test_sum_program() {
    let context = Context::create();
    let compiler = generate("let a = 5; let b = 3; let sum = a + b; show sum;", &context);
    let ir = compiler.print_ir();

    assert_eq!(ir.matches("alloca double").count(), 3);
    assert!(ir.contains("fadd double"));
    assert!(ir.contains("call void @print(double"));
    assert_blocks_terminated(&compiler);
}

#[test]
fn test_unit_literal_calls_conversion() {
    let context = Context::create();
    let compiler = generate("let d = 5.5 km; show d;", &context);
    let ir = compiler.print_ir();

    assert_eq!(conversion_name("km", ""), "convert_km_to_");
    assert!(ir.contains("call double @convert_km_to_(double"));
    assert!(ir.contains("call void @print(double"));
}

#[test]
fn test_unknown_conversion() {
    let error = generate_err("let d = 5.5 km;", &TypeRegistry::new());

    assert_eq!(
        error,
        CodegenError::UnknownConversion {
            from: "km".to_string(),
            to: String::new(),
        }
    );
}

#[test]
fn test_runtime_declarations() {
    let context = Context::create();
    let compiler = generate("show 1;", &context);

    for name in ["print", "print_string", "strcmp", "spawn_thread", "wait_thread"] {
        let function = compiler.module.get_function(name).unwrap();
        assert_eq!(function.count_basic_blocks(), 0, "{} should only be declared", name);
    }

    let convert = compiler.module.get_function("convert_h_to_").unwrap();
    assert_eq!(convert.count_params(), 1);
    assert!(compiler.module.get_function("convert_km_to_m").is_some());
}

#[test]
fn test_function_literal_and_direct_call() {
    let context = Context::create();
    let compiler = generate(
        "let add = (a: number, b: number) -> number { return a + b; }; show add(1, 2);",
        &context,
    );

    let add = compiler.module.get_function("add").unwrap();
    assert_eq!(add.count_params(), 2);
    assert_eq!(add.get_linkage(), Linkage::Internal);
    assert!(compiler.print_ir().contains("call double @add("));
    assert_blocks_terminated(&compiler);
}

#[test]
fn test_pipeline_calls_function() {
    let context = Context::create();
    let compiler = generate(
        "let f = (x: number) -> number { return x * 2; }; let r = 5 |> f; show r;",
        &context,
    );

    assert!(compiler.print_ir().contains("call double @f(double 5.000000e+00)"));
}

#[test]
fn test_function_names_are_unique() {
    let context = Context::create();
    let compiler = generate(
        "let f = () -> number { return 1; }; { let f = () -> number { return 2; }; show f(); }",
        &context,
    );

    assert!(compiler.module.get_function("f").is_some());
    assert!(compiler.module.get_function("f.1").is_some());
}

#[test]
fn test_missing_return_yields_zero() {
    let context = Context::create();
    let compiler = generate("let f = () -> number { show 1; }; show f();", &context);

    assert!(compiler.print_ir().contains("ret double 0.000000e+00"));
    assert_blocks_terminated(&compiler);
}

#[test]
fn test_control_flow_blocks() {
    let context = Context::create();
    let compiler = generate(
        "let i = 0;
         while i < 3 { i = i + 1; }
         if i == 3 { show 1; } else { show 0; }
         for j in 10 by 2 { show j; }
         match i { 1 => show 1; 3 => { show 3; } _ => show 0; }",
        &context,
    );
    let ir = compiler.print_ir();

    for label in [
        "while.cond:",
        "while.body:",
        "while.end:",
        "then:",
        "else:",
        "ifcont:",
        "for.cond:",
        "for.body:",
        "for.step:",
        "for.end:",
        "case.0:",
        "next.1:",
        "match.end:",
    ] {
        assert!(ir.contains(label), "missing block {}", label);
    }
    assert!(ir.contains("fcmp olt"));
    assert!(ir.contains("fcmp oeq"));
    assert_blocks_terminated(&compiler);
}

#[test]
fn test_return_inside_branch() {
    let context = Context::create();
    let compiler = generate(
        "let abs = (x: number) -> number { if x < 0 { return -x; } return x; }; show abs(-2);",
        &context,
    );

    assert!(compiler.print_ir().contains("fneg double"));
    assert_blocks_terminated(&compiler);
}

#[test]
fn test_show_string_and_boolean() {
    let context = Context::create();
    let compiler = generate(
        "show \"hello\"; let same = \"a\" == \"b\"; show same;",
        &context,
    );
    let ir = compiler.print_ir();

    assert!(ir.contains("call void @print_string(i8*"));
    assert!(ir.contains("call i32 @strcmp("));
    assert!(ir.contains("uitofp i1"));
}

#[test]
fn test_outer_locals_are_captured() {
    let context = Context::create();
    let compiler = generate(
        "let scale = 2; let f = (x: number) -> number { return x * scale; }; show f(3);",
        &context,
    );

    let global = compiler.module.get_global("f.scale").unwrap();
    assert_eq!(global.get_linkage(), Linkage::Private);
    assert_blocks_terminated(&compiler);
}

#[test]
fn test_spawn_and_wait() {
    let context = Context::create();
    let compiler = generate("let x = 1; spawn show x; wait 0;", &context);
    let ir = compiler.print_ir();

    let spawned = compiler.module.get_function("spawn").unwrap();
    assert_eq!(spawned.get_linkage(), Linkage::Private);
    assert_eq!(spawned.count_params(), 0);
    assert!(ir.contains("@spawn_thread("));
    assert!(ir.contains("call void @wait_thread("));
    assert_blocks_terminated(&compiler);
}

#[test]
fn test_return_at_top_level() {
    let error = generate_unchecked_err("return 1;");

    assert_eq!(error, CodegenError::ReturnOutsideFunction);
}

#[test]
fn test_return_inside_spawn() {
    // Accepted by analysis: the spawned statement is checked in place.
    let error = generate_err(
        "let f = () -> number { spawn return 1; return 2; };",
        &TypeRegistry::with_default_units(),
    );

    assert_eq!(error, CodegenError::ReturnOutsideFunction);
}

#[test]
fn test_untyped_binding() {
    let error = generate_unchecked_err("let x = 1;");

    assert_eq!(
        error,
        CodegenError::UntypedBinding {
            name: "x".to_string(),
        }
    );
}

#[test]
fn test_calls_through_parameters_are_indirect() {
    let context = Context::create();
    let compiler = generate(
        "let apply = (g: fn(number) -> number) -> number { return g(1); };
         let twice = (x: number) -> number { return x * 2; };
         show apply(twice);",
        &context,
    );

    let apply = compiler.module.get_function("apply").unwrap();
    assert!(apply.print_to_string().to_string().contains("call double %"));
    assert!(compiler.print_ir().contains("call double @apply(double (double)* %"));
}

#[test]
fn test_assignment_in_untaken_branch_keeps_call_dynamic() {
    let context = Context::create();
    let compiler = generate(
        "let f = (x: number) -> number { return x; };
         let g = (x: number) -> number { return x * 2; };
         if false { f = g; }
         show f(1);",
        &context,
    );

    let main = compiler.module.get_function("main").unwrap();
    let ir = main.print_to_string().to_string();
    assert!(!ir.contains("call double @g("), "{}", ir);
    assert!(!ir.contains("call double @f("), "{}", ir);
    assert!(ir.contains("call double %"), "{}", ir);
}

#[test]
fn test_assignment_in_loop_body_reaches_earlier_calls() {
    let context = Context::create();
    let compiler = generate(
        "let f = (x: number) -> number { return x; };
         let g = (x: number) -> number { return x * 2; };
         let i = 0;
         while i < 2 { show f(1); f = g; i = i + 1; }",
        &context,
    );

    let ir = compiler.print_ir();
    assert!(!ir.contains("call double @f("), "{}", ir);
    assert!(ir.contains("call double %"), "{}", ir);
    assert_blocks_terminated(&compiler);
}

#[test]
fn test_number_is_not_callable() {
    let error = generate_unchecked_err("5(1);");

    assert_eq!(
        error,
        CodegenError::NotCallable {
            callee: "expression".to_string(),
        }
    );
}

#[test]
fn test_show_function_is_invalid_operand() {
    let error = generate_err(
        "let f = () -> number { return 1; }; show f;",
        &TypeRegistry::with_default_units(),
    );

    assert!(
        matches!(error, CodegenError::InvalidOperand { ref operation, .. } if operation == "show"),
        "{:?}",
        error
    );
}

#[test]
fn test_call_arity_is_rechecked() {
    let context = Context::create();
    let registry = TypeRegistry::with_default_units();
    let compiler = Compiler::new(&context, &registry, "test");

    let main = compiler.create_function(
        "main",
        context.i32_type().fn_type(&[], false),
        Linkage::External,
    );
    compiler
        .builder
        .position_at_end(context.append_basic_block(main, "entry"));

    let error = gen_call(&compiler, Callee::Direct(compiler.runtime.print), &[]).unwrap_err();
    assert_eq!(
        error,
        CodegenError::ArityMismatch {
            expected: 1,
            received: 0,
        }
    );
}

#[test]
fn test_optimized_module_still_verifies() {
    let context = Context::create();
    let registry = TypeRegistry::with_default_units();
    let mut program = parse_source(
        "let a = 5; let b = 3; let sum = a + b; show sum; for i in 3 { show i; }",
    );
    type_check(&mut program, &registry).unwrap();

    let compiler = compile(&program, &registry, &CompileOptions::default(), &context).unwrap_or_else(
        |error| panic!("generation failed: {}", error),
    );

    assert!(compiler.verify().is_ok());
    assert!(compiler.print_ir().contains("@print("));
}
