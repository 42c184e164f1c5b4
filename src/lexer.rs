//! Hand-written scanner producing a token stream with source spans.
//!
//! There is no external grammar crate for this small language, so lexing is
//! owned here rather than delegated to one. Identifiers and string contents
//! are allocated into
//! the [`Arena`] so the rest of the pipeline can borrow `'arena str` instead
//! of cloning owned `String`s per token.

use crate::arena::Arena;
use crate::error::{LexError, LexErrorKind};
use crate::span::{locate, Span};
use crate::token::{Token, TokenKind};

pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    arena: &'a Arena<'a>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, arena: &'a Arena<'a>) -> Self {
        Self { source, bytes: source.as_bytes(), pos: 0, arena }
    }

    /// Scans the entire source into a token vector, terminated by `Eof`.
    ///
    /// Lexing errors are collected and returned eagerly rather than
    /// interleaved with tokens: a malformed string literal or stray
    /// character is always a hard stop before parsing begins.
    pub fn tokenize(mut self) -> Result<Vec<Token<'a>>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = matches!(token.kind, TokenKind::Eof);
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(locate(self.source, start), locate(self.source, self.pos))
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => {
                    self.pos += 1;
                }
                Some(b'#') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Token<'a>, LexError> {
        self.skip_trivia();
        let start = self.pos;
        let Some(b) = self.peek() else {
            return Ok(Token { kind: TokenKind::Eof, span: self.span_from(start) });
        };

        let kind = match b {
            b'0'..=b'9' => self.lex_int(),
            b'"' => self.lex_string()?,
            b'_' | b'a'..=b'z' | b'A'..=b'Z' => self.lex_ident_or_keyword(),
            b'+' => self.single(TokenKind::Plus),
            b'-' => self.single(TokenKind::Minus),
            b'*' => self.single(TokenKind::Star),
            b'/' => self.single(TokenKind::Slash),
            b',' => self.single(TokenKind::Comma),
            b':' => self.single(TokenKind::Colon),
            b';' => self.single(TokenKind::Semicolon),
            b'(' => self.single(TokenKind::LParen),
            b')' => self.single(TokenKind::RParen),
            b'{' => self.single(TokenKind::LBrace),
            b'}' => self.single(TokenKind::RBrace),
            b'[' => self.single(TokenKind::LBracket),
            b']' => self.single(TokenKind::RBracket),
            b'!' => {
                self.pos += 1;
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                }
            }
            b'=' => {
                self.pos += 1;
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    TokenKind::Eq
                } else {
                    TokenKind::Assign
                }
            }
            b'<' => self.single(TokenKind::Lt),
            b'>' => self.single(TokenKind::Gt),
            b'&' if self.peek_at(1) == Some(b'&') => {
                self.pos += 2;
                TokenKind::And
            }
            b'|' if self.peek_at(1) == Some(b'|') => {
                self.pos += 2;
                TokenKind::Or
            }
            other => {
                let loc = locate(self.source, start);
                return Err(LexError { kind: LexErrorKind::UnexpectedChar(other as char), loc });
            }
        };
        Ok(Token { kind, span: self.span_from(start) })
    }

    fn single(&mut self, kind: TokenKind<'a>) -> TokenKind<'a> {
        self.pos += 1;
        kind
    }

    fn lex_int(&mut self) -> TokenKind<'a> {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        let text = &self.source[start..self.pos];
        // Parser-level arithmetic keeps integers within i64; a literal that
        // overflows is clamped rather than silently wrapping, since there is
        // no numeric coercion path in this language to recover from it.
        let value = text.parse::<i64>().unwrap_or(i64::MAX);
        TokenKind::Int(value)
    }

    fn lex_string(&mut self) -> Result<TokenKind<'a>, LexError> {
        let start_loc = locate(self.source, self.pos);
        self.pos += 1; // opening quote
        let mut out = String::new();
        loop {
            match self.advance() {
                None => return Err(LexError { kind: LexErrorKind::UnterminatedString, loc: start_loc }),
                Some(b'"') => break,
                Some(b'\\') => match self.advance() {
                    Some(b'n') => out.push('\n'),
                    Some(b't') => out.push('\t'),
                    Some(b'\\') => out.push('\\'),
                    Some(b'"') => out.push('"'),
                    Some(other) => out.push(other as char),
                    None => return Err(LexError { kind: LexErrorKind::UnterminatedString, loc: start_loc }),
                },
                Some(b) if b.is_ascii() => out.push(b as char),
                Some(_) => {
                    // Re-decode the UTF-8 sequence starting one byte back.
                    let rest = &self.source[self.pos - 1..];
                    let ch = rest.chars().next().expect("valid utf8 boundary");
                    out.push(ch);
                    self.pos += ch.len_utf8() - 1;
                }
            }
        }
        Ok(TokenKind::Str(out))
    }

    fn lex_ident_or_keyword(&mut self) -> TokenKind<'a> {
        let start = self.pos;
        while matches!(self.peek(), Some(b'_' | b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9')) {
            self.pos += 1;
        }
        let text = &self.source[start..self.pos];
        match text {
            "let" => TokenKind::Let,
            "fn" => TokenKind::Fn,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "return" => TokenKind::Return,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            _ => TokenKind::Ident(self.arena.alloc_str(text)),
        }
    }
}
