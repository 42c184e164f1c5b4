//! Recursive-descent statement parser with precedence-climbed expressions.
//!
//! Binding power ladder, low to high: `||`, `&&`, `==`/`!=`, `<`/`>`,
//! `+`/`-`, `*`/`/`, unary `!`, call/index postfix. Every `fn` literal's
//! capture-name list is computed immediately after its body
//! is parsed, by [`free_vars::collect_captures`].

use crate::arena::Arena;
use crate::ast::{BinaryOp, Expr, FunctionExpr, Stmt};
use crate::error::ParseError;
use crate::span::Span;
use crate::token::{Token, TokenKind};

mod free_vars;

pub struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    arena: &'a Arena<'a>,
    next_fn_id: u32,
}

type PResult<T> = Result<T, ParseError>;

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token<'a>>, arena: &'a Arena<'a>) -> Self {
        Self { tokens, pos: 0, arena, next_fn_id: 0 }
    }

    pub fn parse_program(&mut self) -> PResult<&'a [&'a Stmt<'a>]> {
        let mut stmts = Vec::new();
        while !self.at_eof() {
            stmts.push(self.parse_statement()?);
        }
        Ok(self.arena.alloc_stmt_slice(stmts))
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn peek(&self) -> &Token<'a> {
        &self.tokens[self.pos]
    }

    fn peek_at(&self, n: usize) -> &Token<'a> {
        self.tokens.get(self.pos + n).unwrap_or_else(|| self.tokens.last().expect("token stream always ends in Eof"))
    }

    fn advance(&mut self) -> Token<'a> {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, kind: &TokenKind<'a>) -> PResult<Token<'a>> {
        if &self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(ParseError { message: format!("Expected '{kind}', found '{}'", self.peek().kind), span: self.peek().span })
        }
    }

    fn expect_ident(&mut self) -> PResult<(&'a str, Span)> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok((name, tok.span))
            }
            other => Err(ParseError { message: format!("Expected identifier, found '{other}'"), span: tok.span }),
        }
    }

    fn next_fn_id(&mut self) -> u32 {
        let id = self.next_fn_id;
        self.next_fn_id += 1;
        id
    }

    // ---- statements ----

    fn parse_statement(&mut self) -> PResult<&'a Stmt<'a>> {
        match &self.peek().kind {
            TokenKind::Let => self.parse_let(),
            TokenKind::Return => self.parse_return(),
            TokenKind::If => self.parse_if(),
            TokenKind::LBrace => self.parse_block(),
            TokenKind::Ident(_) if self.peek_at(1).kind == TokenKind::Assign => self.parse_reassign(),
            _ => self.parse_expr_or_tail_stmt(),
        }
    }

    fn parse_let(&mut self) -> PResult<&'a Stmt<'a>> {
        let start = self.eat(&TokenKind::Let)?.span;
        let (name, _) = self.expect_ident()?;
        self.eat(&TokenKind::Assign)?;
        let value = self.parse_expression()?;
        let end = self.eat(&TokenKind::Semicolon)?.span;
        Ok(self.arena.alloc_stmt(Stmt::Let { name, value, span: start.to(end) }))
    }

    fn parse_reassign(&mut self) -> PResult<&'a Stmt<'a>> {
        let (name, start) = self.expect_ident()?;
        self.eat(&TokenKind::Assign)?;
        let value = self.parse_expression()?;
        let end = self.eat(&TokenKind::Semicolon)?.span;
        Ok(self.arena.alloc_stmt(Stmt::Reassign { name, value, span: start.to(end) }))
    }

    fn parse_return(&mut self) -> PResult<&'a Stmt<'a>> {
        let start = self.eat(&TokenKind::Return)?.span;
        let value = if matches!(self.peek().kind, TokenKind::Semicolon) { None } else { Some(self.parse_expression()?) };
        let end = self.eat(&TokenKind::Semicolon)?.span;
        Ok(self.arena.alloc_stmt(Stmt::Return { value, span: start.to(end) }))
    }

    fn parse_if(&mut self) -> PResult<&'a Stmt<'a>> {
        let start = self.eat(&TokenKind::If)?.span;
        self.eat(&TokenKind::LParen)?;
        let cond = self.parse_expression()?;
        self.eat(&TokenKind::RParen)?;
        let (then_block, mut end) = self.parse_block_body()?;
        let else_block = if matches!(self.peek().kind, TokenKind::Else) {
            self.advance();
            let (body, else_end) = self.parse_block_body()?;
            end = else_end;
            Some(body)
        } else {
            None
        };
        Ok(self.arena.alloc_stmt(Stmt::If { cond, then_block, else_block, span: start.to(end) }))
    }

    fn parse_block(&mut self) -> PResult<&'a Stmt<'a>> {
        let (body, span) = self.parse_block_body()?;
        Ok(self.arena.alloc_stmt(Stmt::Block { body, span }))
    }

    /// Parses `{ statement* }`, returning the body and the closing brace's
    /// span so callers can widen their own span without re-deriving it.
    fn parse_block_body(&mut self) -> PResult<(&'a [&'a Stmt<'a>], Span)> {
        let start = self.eat(&TokenKind::LBrace)?.span;
        let mut stmts = Vec::new();
        while !matches!(self.peek().kind, TokenKind::RBrace | TokenKind::Eof) {
            stmts.push(self.parse_statement()?);
        }
        let end = self.eat(&TokenKind::RBrace)?.span;
        let _ = start;
        Ok((self.arena.alloc_stmt_slice(stmts), end))
    }

    /// Parses an expression-led statement. A trailing `;` makes it an
    /// ordinary `ExprStmt` (call expressions only, as the grammar
    /// mandates); with no `;` it must instead sit directly before the
    /// block's closing `}`, in which case it becomes a `TailExpr` whose
    /// value is the enclosing block's implicit return value.
    fn parse_expr_or_tail_stmt(&mut self) -> PResult<&'a Stmt<'a>> {
        let expr = self.parse_expression()?;
        if matches!(self.peek().kind, TokenKind::Semicolon) {
            let end = self.advance().span;
            if !expr.is_call() {
                return Err(ParseError {
                    message: "Only call expressions may appear as statements".to_owned(),
                    span: expr.span(),
                });
            }
            let span = expr.span().to(end);
            return Ok(self.arena.alloc_stmt(Stmt::ExprStmt { expr, span }));
        }
        if !matches!(self.peek().kind, TokenKind::RBrace) {
            return Err(ParseError {
                message: format!("Expected ';' or '}}', found '{}'", self.peek().kind),
                span: self.peek().span,
            });
        }
        let span = expr.span();
        Ok(self.arena.alloc_stmt(Stmt::TailExpr { expr, span }))
    }

    // ---- expressions, precedence-climbed low to high ----

    fn parse_expression(&mut self) -> PResult<&'a Expr<'a>> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> PResult<&'a Expr<'a>> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek().kind, TokenKind::Or) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = self.binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> PResult<&'a Expr<'a>> {
        let mut lhs = self.parse_equality()?;
        while matches!(self.peek().kind, TokenKind::And) {
            self.advance();
            let rhs = self.parse_equality()?;
            lhs = self.binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> PResult<&'a Expr<'a>> {
        let mut lhs = self.parse_comparison()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_comparison()?;
            lhs = self.binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> PResult<&'a Expr<'a>> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Gt => BinaryOp::Gt,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = self.binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> PResult<&'a Expr<'a>> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = self.binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> PResult<&'a Expr<'a>> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = self.binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn binary(&self, op: BinaryOp, lhs: &'a Expr<'a>, rhs: &'a Expr<'a>) -> &'a Expr<'a> {
        let span = lhs.span().to(rhs.span());
        self.arena.alloc_expr(Expr::Binary { op, lhs, rhs, span })
    }

    fn parse_unary(&mut self) -> PResult<&'a Expr<'a>> {
        if matches!(self.peek().kind, TokenKind::Bang) {
            let start = self.advance().span;
            let operand = self.parse_unary()?;
            let span = start.to(operand.span());
            return Ok(self.arena.alloc_expr(Expr::Not(operand, span)));
        }
        self.parse_postfix()
    }

    /// Call and index are left-associative postfix operators applied
    /// repeatedly to a primary expression (`f(1)(2)`, `a[0][1]`, `f()[0]`).
    fn parse_postfix(&mut self) -> PResult<&'a Expr<'a>> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek().kind {
                TokenKind::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    if !matches!(self.peek().kind, TokenKind::RParen) {
                        args.push(self.parse_expression()?);
                        while matches!(self.peek().kind, TokenKind::Comma) {
                            self.advance();
                            args.push(self.parse_expression()?);
                        }
                    }
                    let end = self.eat(&TokenKind::RParen)?.span;
                    let span = expr.span().to(end);
                    let args = self.arena.alloc_expr_slice(args);
                    expr = self.arena.alloc_expr(Expr::Call { callee: expr, args, span });
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    let end = self.eat(&TokenKind::RBracket)?.span;
                    let span = expr.span().to(end);
                    expr = self.arena.alloc_expr(Expr::Index { collection: expr, index, span });
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> PResult<&'a Expr<'a>> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Int(n) => {
                self.advance();
                Ok(self.arena.alloc_expr(Expr::Int(n, tok.span)))
            }
            TokenKind::Str(s) => {
                self.advance();
                let text = self.arena.alloc_str(s);
                Ok(self.arena.alloc_expr(Expr::Str(text, tok.span)))
            }
            TokenKind::True => {
                self.advance();
                Ok(self.arena.alloc_expr(Expr::Bool(true, tok.span)))
            }
            TokenKind::False => {
                self.advance();
                Ok(self.arena.alloc_expr(Expr::Bool(false, tok.span)))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(self.arena.alloc_expr(Expr::Var(name, tok.span)))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                let end = self.eat(&TokenKind::RParen)?.span;
                Ok(self.arena.alloc_expr(Expr::Paren(inner, tok.span.to(end))))
            }
            TokenKind::LBracket => self.parse_array_lit(),
            TokenKind::LBrace => self.parse_dict_lit(),
            TokenKind::Fn => self.parse_fn_lit(),
            other => Err(ParseError { message: format!("Unexpected token '{other}'"), span: tok.span }),
        }
    }

    fn parse_array_lit(&mut self) -> PResult<&'a Expr<'a>> {
        let start = self.eat(&TokenKind::LBracket)?.span;
        let mut items = Vec::new();
        if !matches!(self.peek().kind, TokenKind::RBracket) {
            items.push(self.parse_expression()?);
            while matches!(self.peek().kind, TokenKind::Comma) {
                self.advance();
                items.push(self.parse_expression()?);
            }
        }
        let end = self.eat(&TokenKind::RBracket)?.span;
        let items = self.arena.alloc_expr_slice(items);
        Ok(self.arena.alloc_expr(Expr::Array(items, start.to(end))))
    }

    fn parse_dict_lit(&mut self) -> PResult<&'a Expr<'a>> {
        let start = self.eat(&TokenKind::LBrace)?.span;
        let mut entries = Vec::new();
        if !matches!(self.peek().kind, TokenKind::RBrace) {
            entries.push(self.parse_dict_entry()?);
            while matches!(self.peek().kind, TokenKind::Comma) {
                self.advance();
                entries.push(self.parse_dict_entry()?);
            }
        }
        let end = self.eat(&TokenKind::RBrace)?.span;
        let entries = self.arena.alloc_dict_entries(entries);
        Ok(self.arena.alloc_expr(Expr::Dict(entries, start.to(end))))
    }

    fn parse_dict_entry(&mut self) -> PResult<(&'a Expr<'a>, &'a Expr<'a>)> {
        let key = self.parse_expression()?;
        self.eat(&TokenKind::Colon)?;
        let value = self.parse_expression()?;
        Ok((key, value))
    }

    fn parse_fn_lit(&mut self) -> PResult<&'a Expr<'a>> {
        let start = self.eat(&TokenKind::Fn)?.span;
        self.eat(&TokenKind::LParen)?;
        let mut params = Vec::new();
        if !matches!(self.peek().kind, TokenKind::RParen) {
            params.push(self.expect_ident()?.0);
            while matches!(self.peek().kind, TokenKind::Comma) {
                self.advance();
                params.push(self.expect_ident()?.0);
            }
        }
        self.eat(&TokenKind::RParen)?;
        let (body, end) = self.parse_block_body()?;
        let params = self.arena.alloc_str_slice(params);
        let captures = self.arena.alloc_str_slice(free_vars::collect_captures(params, body));
        let id = self.next_fn_id();
        let span = start.to(end);
        Ok(self.arena.alloc_expr(Expr::Function(FunctionExpr { id, params, body, captures, span })))
    }
}
