use std::{env, fs, path::Path, process, time::Instant};

use gehu::{
    compile_source, compiler::compiler::CompileOptions, display_error,
    type_checker::registry::TypeRegistry, CompileError,
};
use inkwell::context::Context;
use log::{error, info};

const USAGE: &str = "usage: gehu <source> [-o <out.ll>] [--no-opt]";

struct Args {
    source: String,
    output: Option<String>,
    optimize: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut source = None;
    let mut output = None;
    let mut optimize = true;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-o" => match args.next() {
                Some(path) => output = Some(path),
                None => return Err(String::from("-o expects a path")),
            },
            "--no-opt" => optimize = false,
            _ if source.is_none() => source = Some(arg),
            _ => return Err(format!("unexpected argument {:?}", arg)),
        }
    }

    let source = source.ok_or_else(|| String::from("no source file given"))?;

    Ok(Args {
        source,
        output,
        optimize,
    })
}

fn main() {
    env_logger::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}\n{}", message, USAGE);
            process::exit(2);
        }
    };

    let file_name = Path::new(&args.source)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.source.clone());

    let source = match fs::read_to_string(&args.source) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Failed to read {}: {}", args.source, err);
            process::exit(1);
        }
    };

    let options = CompileOptions {
        optimize: args.optimize,
        ..CompileOptions::default()
    };
    let registry = TypeRegistry::with_default_units();
    let context = Context::create();

    let start = Instant::now();

    let compiler = match compile_source(&source, &file_name, &registry, &options, &context) {
        Ok(compiler) => compiler,
        Err(CompileError::Diagnostic(err)) => {
            display_error(&err, &source);
            process::exit(1);
        }
        Err(CompileError::Codegen(err)) => {
            error!("code generation failed for {}", file_name);
            eprintln!("Error: {}", err);
            process::exit(1);
        }
    };

    info!("Compiled {} in {:?}", file_name, start.elapsed());

    let ir = compiler.print_ir();
    match args.output {
        Some(path) => {
            if let Err(err) = fs::write(&path, ir) {
                eprintln!("Failed to write {}: {}", path, err);
                process::exit(1);
            }
            info!("Wrote IR to {}", path);
        }
        None => print!("{}", ir),
    }
}
