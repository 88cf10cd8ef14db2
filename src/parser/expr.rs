use crate::{
    ast::expressions::{BinaryOp, Expr, ExprKind, FunctionExpr, Param, UnaryOp},
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
    Span,
};

use super::{lookups::BindingPower, parser::Parser, stmt::parse_block_body, types::parse_type};

pub fn parse_expr(parser: &mut Parser, bp: BindingPower) -> Result<Expr, Error> {
    // First parse NUD
    let token_kind = parser.current_token_kind();
    let Some(nud) = parser.get_nud_lookup().get(&token_kind).copied() else {
        return Err(Error::new(
            ErrorImpl::UnexpectedToken {
                token: parser.current_token().value.clone(),
            },
            parser.get_position(),
        ));
    };

    let mut left = nud(parser)?;

    // While the next operator binds tighter than `bp`, keep extending lhs
    loop {
        let token_kind = parser.current_token_kind();
        let Some(next_bp) = parser.get_bp_lookup().get(&token_kind).copied() else {
            break;
        };
        if next_bp <= bp {
            break;
        }

        let Some(led) = parser.get_led_lookup().get(&token_kind).copied() else {
            return Err(Error::new(
                ErrorImpl::UnexpectedToken {
                    token: parser.current_token().value.clone(),
                },
                parser.get_position(),
            ));
        };

        left = led(parser, left, next_bp)?;
    }

    Ok(left)
}

pub fn parse_primary_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let token = parser.advance().clone();

    let kind = match token.kind {
        TokenKind::Number => {
            let value = token.value.parse::<f64>().map_err(|_| {
                Error::new(
                    ErrorImpl::NumberParseError {
                        token: token.value.clone(),
                    },
                    token.span.start.clone(),
                )
            })?;

            // `5.5 km`: an identifier right after a number is its unit
            let unit = if parser.current_token_kind() == TokenKind::Identifier {
                parser.advance().value.clone()
            } else {
                String::new()
            };

            ExprKind::Number { value, unit }
        }
        TokenKind::Identifier => ExprKind::Variable(token.value.clone()),
        TokenKind::String => ExprKind::String(token.value.clone()),
        TokenKind::True => ExprKind::Boolean(true),
        TokenKind::False => ExprKind::Boolean(false),
        _ => {
            return Err(Error::new(
                ErrorImpl::UnexpectedToken { token: token.value },
                token.span.start,
            ))
        }
    };

    Ok(Expr::new(kind, parser.span_from(token.span.start)))
}

pub fn parse_binary_expr(parser: &mut Parser, left: Expr, bp: BindingPower) -> Result<Expr, Error> {
    let operator_token = parser.advance().clone();
    let op = BinaryOp::from_tag(&operator_token.value, operator_token.span.start.clone())?;

    let right = parse_expr(parser, bp)?;

    let span = Span {
        start: left.span.start.clone(),
        end: right.span.end.clone(),
    };
    Ok(Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    ))
}

pub fn parse_prefix_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let operator_token = parser.advance().clone();
    let op = UnaryOp::from_tag(&operator_token.value, operator_token.span.start.clone())?;

    let operand = parse_expr(parser, BindingPower::Unary)?;

    let span = Span {
        start: operator_token.span.start,
        end: operand.span.end.clone(),
    };
    Ok(Expr::new(
        ExprKind::Unary {
            op,
            operand: Box::new(operand),
        },
        span,
    ))
}

pub fn parse_assignment_expr(
    parser: &mut Parser,
    left: Expr,
    _bp: BindingPower,
) -> Result<Expr, Error> {
    let ExprKind::Variable(name) = left.kind else {
        return Err(parser.unexpected("only variables can be assigned to"));
    };
    parser.advance();

    // Right associative: `a = b = c` assigns `c` to both
    let value = parse_expr(parser, BindingPower::Default)?;

    let span = Span {
        start: left.span.start,
        end: value.span.end.clone(),
    };
    Ok(Expr::new(
        ExprKind::Assignment {
            name,
            value: Box::new(value),
        },
        span,
    ))
}

pub fn parse_pipeline_expr(
    parser: &mut Parser,
    left: Expr,
    bp: BindingPower,
) -> Result<Expr, Error> {
    parser.advance();
    let function = parse_expr(parser, bp)?;

    let span = Span {
        start: left.span.start.clone(),
        end: function.span.end.clone(),
    };
    Ok(Expr::new(
        ExprKind::Pipeline {
            value: Box::new(left),
            function: Box::new(function),
        },
        span,
    ))
}

/// `(` opens either a parenthesised expression or a function literal.
pub fn parse_grouping_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let starts_function = matches!(
        (parser.peek_kind(1), parser.peek_kind(2)),
        (TokenKind::CloseParen, TokenKind::Arrow) | (TokenKind::Identifier, TokenKind::Colon)
    );
    if starts_function {
        return parse_function_expr(parser);
    }

    parser.advance();
    let expr = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::CloseParen)?;

    Ok(expr)
}

pub fn parse_function_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let start = parser.expect(TokenKind::OpenParen)?.span.start;

    let mut params = vec![];
    while parser.current_token_kind() != TokenKind::CloseParen {
        let error = parser.unexpected("expected parameter name");
        let name = parser.expect_error(TokenKind::Identifier, Some(error))?.value;
        parser.expect(TokenKind::Colon)?;
        let ty = parse_type(parser)?;
        params.push(Param { name, ty });

        if parser.current_token_kind() != TokenKind::CloseParen {
            parser.expect(TokenKind::Comma)?;
        }
    }
    parser.expect(TokenKind::CloseParen)?;

    let error = parser.unexpected("expected `->` and a return type");
    parser.expect_error(TokenKind::Arrow, Some(error))?;
    let return_type = parse_type(parser)?;

    let body = parse_block_body(parser)?;

    Ok(Expr::new(
        ExprKind::Function(FunctionExpr {
            params,
            return_type,
            body,
        }),
        parser.span_from(start),
    ))
}

pub fn parse_call_expr(parser: &mut Parser, left: Expr, _bp: BindingPower) -> Result<Expr, Error> {
    parser.advance();

    let mut arguments = vec![];

    while parser.current_token_kind() != TokenKind::CloseParen {
        arguments.push(parse_expr(parser, BindingPower::Default)?);

        if parser.current_token_kind() != TokenKind::CloseParen {
            parser.expect(TokenKind::Comma)?;
        }
    }

    parser.expect(TokenKind::CloseParen)?;

    let span = parser.span_from(left.span.start.clone());
    Ok(Expr::new(
        ExprKind::Call {
            callee: Box::new(left),
            arguments,
        },
        span,
    ))
}
