#![allow(clippy::module_inception)]

use std::rc::Rc;

use inkwell::context::Context;
use log::debug;
use thiserror::Error;

use crate::{
    compiler::compiler::{compile, CompileOptions, Compiler},
    errors::errors::{CodegenError, Error, ErrorTip},
    lexer::lexer::tokenize,
    parser::parser::parse,
    type_checker::{registry::TypeRegistry, type_checker::type_check},
};

pub mod ast;
pub mod compiler;
pub mod errors;
pub mod lexer;
pub mod macros;
pub mod parser;
pub mod type_checker;

extern crate regex;

/// Byte offset into a named source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Position(pub u32, pub Rc<String>);

impl Position {
    pub fn null() -> Self {
        Position(0, Rc::new(String::from("<null>")))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn null() -> Self {
        Span {
            start: Position::null(),
            end: Position::null(),
        }
    }
}

/// Either family of failure a compilation unit can end with.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    Diagnostic(#[from] Error),
    #[error(transparent)]
    Codegen(#[from] CodegenError),
}

/// Runs the whole pipeline over one source text: tokenize, parse, analyze,
/// generate and (optionally) optimize.
///
/// On failure nothing of the unit survives: the partially built module is
/// dropped together with the generator.
pub fn compile_source<'a>(
    source: &str,
    file_name: &str,
    registry: &TypeRegistry,
    options: &CompileOptions,
    context: &'a Context,
) -> Result<Compiler<'a>, CompileError> {
    let tokens = tokenize(source.to_string(), Some(file_name.to_string()))?;
    debug!("{} tokens read from {}", tokens.len(), file_name);

    let mut program = parse(tokens, Rc::new(file_name.to_string()))?;
    type_check(&mut program, registry)?;

    Ok(compile(&program, registry, options, context)?)
}

/// Finds the line holding byte offset `position`.
///
/// Returns the 1-based line number, the line text and the offset inside the
/// line. Offsets at the very end of the source point past the last line.
pub fn get_line_at_position(source: &str, position: u32) -> Option<(usize, String, usize)> {
    let pos = position as usize;

    if pos > source.len() {
        return None;
    }

    let mut start = 0;
    let mut line_number = 1;
    let mut last = None;

    for line in source.split_inclusive('\n') {
        let end = start + line.len();

        if (start..end).contains(&pos) {
            return Some((line_number, line.to_string(), pos - start));
        }

        last = Some((line_number, line.to_string(), pos - start));
        start = end;
        line_number += 1;
    }

    last.or_else(|| Some((1, String::new(), 0)))
}

pub fn display_error(error: &Error, source: &str) {
    /*
        error: message
        -> trip.gehu
           |
        20 | let a = 5 km + 2 s;
           | --------^
    */

    let position = error.get_position();

    if let ErrorTip::None = error.get_tip() {
        eprintln!("Error: {}", error.get_error_name());
    } else {
        eprintln!("Error: {} ({})", error.get_error_name(), error.get_tip());
    }
    eprintln!("-> {}", position.1);

    let Some((line, line_text, line_pos)) = get_line_at_position(source, position.0) else {
        return;
    };

    let line_string = line.to_string();
    let padding = line_string.len() + 2;

    eprintln!("{:>padding$}", "|");

    let (line_text_removed, removed_whitespace) = remove_starting_whitespace(&line_text);
    eprintln!("{} | {}", line_string, line_text_removed.trim_end());

    let arrows = line_pos.saturating_sub(removed_whitespace) + 1;

    eprintln!("{:>padding$} {:->arrows$}", "|", "^");
}

fn remove_starting_whitespace(string: &str) -> (String, usize) {
    let start = string.chars().take_while(|c| *c == ' ').count();

    (String::from(&string[start..]), start)
}
