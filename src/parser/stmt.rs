use crate::{
    ast::statements::{MatchCase, Stmt, StmtKind},
    errors::errors::Error,
    lexer::tokens::TokenKind,
    parser::{expr::parse_expr, lookups::BindingPower},
};

use super::{parser::Parser, types::parse_type};

pub fn parse_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    if let Some(handler) = parser
        .get_stmt_lookup()
        .get(&parser.current_token_kind())
        .copied()
    {
        return handler(parser);
    }

    let expression = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::Semicolon)?;

    let span = parser.span_from(expression.span.start.clone());
    Ok(Stmt::new(StmtKind::Expression(expression), span))
}

/// `{ stmt* }`, returning the statements without wrapping them.
pub fn parse_block_body(parser: &mut Parser) -> Result<Vec<Stmt>, Error> {
    let error = parser.unexpected("expected `{`");
    parser.expect_error(TokenKind::OpenCurly, Some(error))?;

    let mut statements = Vec::new();
    while parser.current_token_kind() != TokenKind::CloseCurly {
        statements.push(parse_stmt(parser)?);
    }

    parser.expect(TokenKind::CloseCurly)?;
    Ok(statements)
}

pub fn parse_let_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();

    let error = parser.unexpected("expected identifier during variable declaration");
    let name = parser.expect_error(TokenKind::Identifier, Some(error))?.value;

    let ty = if parser.current_token_kind() == TokenKind::Colon {
        parser.advance();
        Some(parse_type(parser)?)
    } else {
        None
    };

    let error = parser.unexpected("a declaration needs an initial value");
    parser.expect_error(TokenKind::Assignment, Some(error))?;
    let initializer = parse_expr(parser, BindingPower::Default)?;

    parser.expect(TokenKind::Semicolon)?;

    Ok(Stmt::new(
        StmtKind::Let {
            name,
            ty,
            initializer,
        },
        parser.span_from(start),
    ))
}

pub fn parse_show_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();
    let value = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::Semicolon)?;

    Ok(Stmt::new(StmtKind::Show(value), parser.span_from(start)))
}

pub fn parse_block_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.get_position();
    let body = parse_block_body(parser)?;

    Ok(Stmt::new(StmtKind::Block(body), parser.span_from(start)))
}

pub fn parse_if_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();

    let condition = parse_expr(parser, BindingPower::Default)?;
    let then_branch = Box::new(parse_stmt(parser)?);

    let else_branch = if parser.current_token_kind() == TokenKind::Else {
        parser.advance();
        Some(Box::new(parse_stmt(parser)?))
    } else {
        None
    };

    Ok(Stmt::new(
        StmtKind::If {
            condition,
            then_branch,
            else_branch,
        },
        parser.span_from(start),
    ))
}

pub fn parse_while_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();

    let condition = parse_expr(parser, BindingPower::Default)?;
    let body = Box::new(parse_stmt(parser)?);

    Ok(Stmt::new(
        StmtKind::While { condition, body },
        parser.span_from(start),
    ))
}

/// `for i in bound [by step] body`
pub fn parse_for_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();

    let error = parser.unexpected("expected loop variable");
    let variable = parser.expect_error(TokenKind::Identifier, Some(error))?.value;
    parser.expect(TokenKind::In)?;

    let iterator = parse_expr(parser, BindingPower::Default)?;

    let step = if parser.current_token_kind() == TokenKind::By {
        parser.advance();
        Some(parse_expr(parser, BindingPower::Default)?)
    } else {
        None
    };

    let body = Box::new(parse_stmt(parser)?);

    Ok(Stmt::new(
        StmtKind::For {
            variable,
            iterator,
            step,
            body,
        },
        parser.span_from(start),
    ))
}

/// `match value { pattern => stmt, ..., _ => stmt }`
pub fn parse_match_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();

    let scrutinee = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::OpenCurly)?;

    let mut cases = vec![];
    let mut default = None;

    while parser.current_token_kind() != TokenKind::CloseCurly {
        let is_default = parser.current_token_kind() == TokenKind::Identifier
            && parser.current_token().value == "_"
            && parser.peek_kind(1) == TokenKind::FatArrow;

        if is_default {
            if default.is_some() {
                return Err(parser.unexpected("a match can only have one default case"));
            }
            parser.advance();
            parser.expect(TokenKind::FatArrow)?;
            default = Some(Box::new(parse_stmt(parser)?));
        } else {
            let pattern = parse_expr(parser, BindingPower::Default)?;
            parser.expect(TokenKind::FatArrow)?;
            let body = parse_stmt(parser)?;
            cases.push(MatchCase { pattern, body });
        }

        if parser.current_token_kind() == TokenKind::Comma {
            parser.advance();
        }
    }

    parser.expect(TokenKind::CloseCurly)?;

    Ok(Stmt::new(
        StmtKind::Match {
            scrutinee,
            cases,
            default,
        },
        parser.span_from(start),
    ))
}

pub fn parse_spawn_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();
    let body = parse_stmt(parser)?;

    Ok(Stmt::new(
        StmtKind::Spawn(Box::new(body)),
        parser.span_from(start),
    ))
}

pub fn parse_wait_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();
    let handle = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::Semicolon)?;

    Ok(Stmt::new(StmtKind::Wait(handle), parser.span_from(start)))
}

pub fn parse_return_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();

    let value = if parser.current_token_kind() != TokenKind::Semicolon {
        Some(parse_expr(parser, BindingPower::Default)?)
    } else {
        None
    };

    parser.expect(TokenKind::Semicolon)?;

    Ok(Stmt::new(StmtKind::Return(value), parser.span_from(start)))
}
