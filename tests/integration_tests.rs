//! Integration tests for end-to-end compilation.
//!
//! These run the whole pipeline from source text through tokenizing,
//! parsing, analysis and IR generation, and inspect the resulting module.

use gehu::{
    compile_source,
    compiler::compiler::{CompileOptions, Compiler},
    errors::errors::{CodegenError, ErrorImpl},
    type_checker::registry::TypeRegistry,
    CompileError,
};
use inkwell::context::Context;

fn options(optimize: bool) -> CompileOptions {
    CompileOptions {
        module_name: String::from("integration"),
        optimize,
        verify: true,
    }
}

fn compile_ok<'a>(source: &str, context: &'a Context) -> Compiler<'a> {
    let registry = TypeRegistry::with_default_units();

    match compile_source(source, "test.gehu", &registry, &options(false), context) {
        Ok(compiler) => compiler,
        Err(error) => panic!("compilation failed: {}", error),
    }
}

fn compile_err(source: &str, registry: &TypeRegistry) -> CompileError {
    let context = Context::create();

    let result = match compile_source(source, "test.gehu", registry, &options(false), &context) {
        Ok(compiler) => panic!("expected a failure, generated:\n{}", compiler.print_ir()),
        Err(error) => error,
    };
    result
}

fn count_defined_functions(compiler: &Compiler) -> usize {
    compiler
        .module
        .get_functions()
        .filter(|function| function.count_basic_blocks() > 0)
        .count()
}

#[test]
fn test_compile_simple_program() {
    let context = Context::create();
    let compiler = compile_ok("let a = 5; let b = 3; let sum = a + b; show sum;", &context);
    let ir = compiler.print_ir();

    assert_eq!(compiler.module.get_name().to_str(), Ok("integration"));
    assert!(ir.contains("define i32 @main()"));
    assert!(ir.contains("fadd double"));
    assert!(ir.contains("call void @print("));
    assert_eq!(count_defined_functions(&compiler), 1);
}

#[test]
fn test_compile_units() {
    let context = Context::create();
    let compiler = compile_ok(
        "let d = 5.5 km; let t = 30 min; let pace = t / d; show pace;",
        &context,
    );
    let ir = compiler.print_ir();

    assert!(ir.contains("@convert_km_to_("));
    assert!(ir.contains("@convert_min_to_("));
    assert!(ir.contains("fdiv double"));
}

#[test]
fn test_compile_functions() {
    let context = Context::create();
    let compiler = compile_ok(
        "let double = (x: number) -> number { return x * 2; };
         let twice = (x: number) -> number { return double(double(x)); };
         show 5 |> twice;",
        &context,
    );

    assert_eq!(count_defined_functions(&compiler), 3);
    assert!(compiler.verify().is_ok());
}

#[test]
fn test_compile_concurrency() {
    let context = Context::create();
    let compiler = compile_ok(
        "let total = 0;
         spawn { let part = 10 km; show part; }
         spawn show total;
         wait 0;",
        &context,
    );

    assert!(compiler.module.get_function("spawn").is_some());
    assert!(compiler.module.get_function("spawn.1").is_some());
    assert_eq!(
        compiler.print_ir().matches("@spawn_thread(").count(),
        // One declaration plus two calls.
        3
    );
}

#[test]
fn test_compile_control_flow() {
    let context = Context::create();
    let compiler = compile_ok(
        "let limit = 5;
         let total = 0;
         for i in limit by 1 {
             if i > 2 { total = total + i; }
         }
         while total > 0 { total = total - 1; }
         match total { 0 => show \"done\"; _ => show total; }
         let ok = !(total != 0);
         show ok;",
        &context,
    );

    for function in compiler.module.get_functions() {
        for block in function.get_basic_blocks() {
            assert!(block.get_terminator().is_some());
        }
    }
}

#[test]
fn test_compile_optimized() {
    let context = Context::create();
    let registry = TypeRegistry::with_default_units();
    let source = "let f = (x: number) -> number { return x + 0; }; show f(2) + f(2);";

    let compiler = compile_source(source, "test.gehu", &registry, &options(true), &context)
        .unwrap_or_else(|error| panic!("compilation failed: {}", error));

    assert!(compiler.verify().is_ok());
}

#[test]
fn test_diagnostics_stop_compilation() {
    let registry = TypeRegistry::with_default_units();

    match compile_err("let a = 5 km + 2 s;", &registry) {
        CompileError::Diagnostic(error) => {
            assert_eq!(
                error.get_internal_error(),
                &ErrorImpl::UnitMismatch {
                    left: "km".to_string(),
                    right: "s".to_string(),
                }
            );
            assert_eq!(error.get_position().0, 8);
        }
        other => panic!("expected a diagnostic, found {}", other),
    }

    match compile_err("let a = 1 @ 2;", &registry) {
        CompileError::Diagnostic(error) => {
            assert_eq!(error.get_error_name(), "UnrecognisedToken")
        }
        other => panic!("expected a diagnostic, found {}", other),
    }

    match compile_err("let = 1;", &registry) {
        CompileError::Diagnostic(error) => {
            assert_eq!(error.get_error_name(), "UnexpectedTokenDetailed")
        }
        other => panic!("expected a diagnostic, found {}", other),
    }
}

#[test]
fn test_unknown_conversion_is_fatal() {
    let mut registry = TypeRegistry::new();
    registry.register_unit_conversion("km", "", 1000.0);

    match compile_err("let d = 5 km; let e = 3 parsec;", &registry) {
        CompileError::Codegen(error) => assert_eq!(
            error,
            CodegenError::UnknownConversion {
                from: "parsec".to_string(),
                to: String::new(),
            }
        ),
        other => panic!("expected a generation failure, found {}", other),
    }
}
