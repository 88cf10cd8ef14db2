//! Type annotation parsing.
//!
//! Supports `number`, `number<unit>`, `string`, `boolean`,
//! `fn(T, ...) -> T` and bare names. A bare name becomes a nominal
//! [`Type::Unit`] tag; the analyzer swaps it for a registered named type
//! when one exists.

use std::collections::HashMap;

use crate::{
    ast::types::Type,
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
};

use super::parser::Parser;

/// Type alias for type null denotation handler functions.
pub type TypeNUDHandler = fn(&mut Parser) -> Result<Type, Error>;

/// Type alias for type NUD lookup table.
pub type TypeNUDLookup = HashMap<TokenKind, TypeNUDHandler>;

pub fn create_token_type_lookups(parser: &mut Parser) {
    parser.type_nud(TokenKind::Identifier, parse_named_type);
    parser.type_nud(TokenKind::Fn, parse_function_type);
}

pub fn parse_named_type(parser: &mut Parser) -> Result<Type, Error> {
    let name = parser.expect(TokenKind::Identifier)?.value;

    match name.as_str() {
        "number" if parser.current_token_kind() == TokenKind::Less => {
            parser.advance();
            let error = parser.unexpected("expected a unit name");
            let unit = parser.expect_error(TokenKind::Identifier, Some(error))?.value;
            parser.expect(TokenKind::Greater)?;
            Ok(Type::Number { unit })
        }
        "number" => Ok(Type::number()),
        "string" => Ok(Type::String),
        "boolean" => Ok(Type::Boolean),
        _ => Ok(Type::Unit(name)),
    }
}

pub fn parse_function_type(parser: &mut Parser) -> Result<Type, Error> {
    parser.expect(TokenKind::Fn)?;
    parser.expect(TokenKind::OpenParen)?;

    let mut params = vec![];
    while parser.current_token_kind() != TokenKind::CloseParen {
        params.push(parse_type(parser)?);

        if parser.current_token_kind() != TokenKind::CloseParen {
            parser.expect(TokenKind::Comma)?;
        }
    }
    parser.expect(TokenKind::CloseParen)?;

    parser.expect(TokenKind::Arrow)?;
    let return_type = parse_type(parser)?;

    Ok(Type::function(params, return_type))
}

pub fn parse_type(parser: &mut Parser) -> Result<Type, Error> {
    let token_kind = parser.current_token_kind();
    let Some(handler) = parser.get_type_nud_lookup().get(&token_kind).copied() else {
        return Err(Error::new(
            ErrorImpl::UnexpectedToken {
                token: parser.current_token().value.clone(),
            },
            parser.get_position(),
        ));
    };

    handler(parser)
}
