/// Recursive descent parser with Pratt expression parsing.
use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{parse_number_literal, Lexer, NumberLit};
use crate::token::{kind_name, Token, TokenKind};

/// Parse a complete source chunk.
///
/// ```
/// use lunette_parser::parse_chunk;
///
/// let chunk = parse_chunk(b"local x = 1 + 2 return x").unwrap();
/// assert_eq!(chunk.block.stmts.len(), 2);
/// ```
pub fn parse_chunk(source: &[u8]) -> Result<Chunk, ParseError> {
    let tokens = Lexer::tokenize(source)?;
    let mut parser = Parser::new(tokens);
    let block = parser.parse_block()?;
    if !parser.at(TokenKind::Eof) {
        return Err(parser.unexpected("<eof>"));
    }
    Ok(Chunk { block })
}

/// Binding power of unary operators; only `^` binds tighter.
const UNARY_BP: u8 = 13;

/// Deepest nesting of blocks and expressions a chunk may use. Every later
/// pass recurses over the tree, so this also bounds the compiler.
pub const MAX_SYNTAX_LEVELS: usize = 200;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Blocks and expressions currently open.
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Fails once `extra` more levels on top of the open ones would pass
    /// [`MAX_SYNTAX_LEVELS`].
    fn check_levels(&self, extra: usize) -> Result<(), ParseError> {
        if self.depth + extra <= MAX_SYNTAX_LEVELS {
            return Ok(());
        }
        let sp = &self.peek().span;
        Err(ParseError::new(
            "chunk has too many syntax levels",
            sp.line,
            sp.col,
        ))
    }

    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        self.check_levels(1)?;
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> TokenKind {
        self.tokens[self.pos].kind
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn span(&self) -> Span {
        self.peek().span.clone()
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let tok = self.peek();
        ParseError::new(
            format!("expected `{}`, found `{}`", expected, tok_display(tok)),
            tok.span.line,
            tok.span.col,
        )
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(kind_name(kind)))
        }
    }

    /// Expect a closing token, naming the opener when it sits on another line.
    fn expect_match(
        &mut self,
        close: TokenKind,
        open: TokenKind,
        open_span: &Span,
    ) -> Result<(), ParseError> {
        if self.eat(close) {
            return Ok(());
        }
        if open_span.line == self.peek().span.line {
            return Err(self.unexpected(kind_name(close)));
        }
        let tok = self.peek();
        Err(ParseError::new(
            format!(
                "expected `{}` (to close `{}` at line {}), found `{}`",
                kind_name(close),
                kind_name(open),
                open_span.line,
                tok_display(tok)
            ),
            tok.span.line,
            tok.span.col,
        ))
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        Ok(self.expect(TokenKind::Ident)?.text())
    }

    fn block_follows(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Eof | TokenKind::End | TokenKind::Else | TokenKind::Elseif | TokenKind::Until
        )
    }

    // ========================================================================
    // Blocks and statements
    // ========================================================================

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        self.nested(Self::parse_block_body)
    }

    fn parse_block_body(&mut self) -> Result<Block, ParseError> {
        let sp = self.span();
        let mut stmts = Vec::new();
        while !self.block_follows() {
            if self.eat(TokenKind::Semicolon) {
                continue;
            }
            if self.at(TokenKind::Return) {
                stmts.push(self.parse_return()?);
                break;
            }
            stmts.push(self.parse_stmt()?);
        }
        Ok(Block { stmts, span: sp })
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        let sp = self.span();
        match self.peek_kind() {
            TokenKind::If => self.parse_if(),
            TokenKind::While => {
                self.advance();
                let cond = self.parse_expr()?;
                self.expect(TokenKind::Do)?;
                let body = self.parse_block()?;
                self.expect_match(TokenKind::End, TokenKind::While, &sp)?;
                Ok(Stmt::While { cond, body, span: sp })
            }
            TokenKind::Do => {
                self.advance();
                let body = self.parse_block()?;
                self.expect_match(TokenKind::End, TokenKind::Do, &sp)?;
                Ok(Stmt::Do(body))
            }
            TokenKind::For => self.parse_for(),
            TokenKind::Repeat => {
                self.advance();
                let body = self.parse_block()?;
                self.expect_match(TokenKind::Until, TokenKind::Repeat, &sp)?;
                let cond = self.parse_expr()?;
                Ok(Stmt::Repeat { body, cond, span: sp })
            }
            TokenKind::Function => self.parse_function_stmt(),
            TokenKind::Local => {
                self.advance();
                if self.eat(TokenKind::Function) {
                    let name = self.expect_ident()?;
                    let func = self.parse_func_body(false, sp.clone())?;
                    Ok(Stmt::LocalFunction {
                        name,
                        func: Box::new(func),
                        span: sp,
                    })
                } else {
                    let mut names = vec![self.expect_ident()?];
                    while self.eat(TokenKind::Comma) {
                        names.push(self.expect_ident()?);
                    }
                    let values = if self.eat(TokenKind::Assign) {
                        self.parse_expr_list()?
                    } else {
                        Vec::new()
                    };
                    Ok(Stmt::Local { names, values, span: sp })
                }
            }
            TokenKind::Break => {
                self.advance();
                Ok(Stmt::Break { span: sp })
            }
            _ => self.parse_expr_stmt(),
        }
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        let sp = self.span();
        self.expect(TokenKind::Return)?;
        let values = if self.block_follows() || self.at(TokenKind::Semicolon) {
            Vec::new()
        } else {
            self.parse_expr_list()?
        };
        self.eat(TokenKind::Semicolon);
        if !self.block_follows() {
            return Err(self.unexpected("end"));
        }
        Ok(Stmt::Return { values, span: sp })
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let sp = self.span();
        self.expect(TokenKind::If)?;
        let mut branches = Vec::new();
        let cond = self.parse_expr()?;
        self.expect(TokenKind::Then)?;
        branches.push((cond, self.parse_block()?));
        let mut else_block = None;
        loop {
            if self.eat(TokenKind::Elseif) {
                let cond = self.parse_expr()?;
                self.expect(TokenKind::Then)?;
                branches.push((cond, self.parse_block()?));
            } else if self.eat(TokenKind::Else) {
                else_block = Some(self.parse_block()?);
                self.expect_match(TokenKind::End, TokenKind::If, &sp)?;
                break;
            } else {
                self.expect_match(TokenKind::End, TokenKind::If, &sp)?;
                break;
            }
        }
        Ok(Stmt::If {
            branches,
            else_block,
            span: sp,
        })
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let sp = self.span();
        self.expect(TokenKind::For)?;
        let first = self.expect_ident()?;
        if self.eat(TokenKind::Assign) {
            let start = self.parse_expr()?;
            self.expect(TokenKind::Comma)?;
            let limit = self.parse_expr()?;
            let step = if self.eat(TokenKind::Comma) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            self.expect(TokenKind::Do)?;
            let body = self.parse_block()?;
            self.expect_match(TokenKind::End, TokenKind::For, &sp)?;
            return Ok(Stmt::NumericFor {
                var: first,
                start,
                limit,
                step,
                body,
                span: sp,
            });
        }

        let mut names = vec![first];
        while self.eat(TokenKind::Comma) {
            names.push(self.expect_ident()?);
        }
        if !self.eat(TokenKind::In) {
            return Err(self.unexpected("="));
        }
        let exprs = self.parse_expr_list()?;
        self.expect(TokenKind::Do)?;
        let body = self.parse_block()?;
        self.expect_match(TokenKind::End, TokenKind::For, &sp)?;
        Ok(Stmt::GenericFor {
            names,
            exprs,
            body,
            span: sp,
        })
    }

    fn parse_function_stmt(&mut self) -> Result<Stmt, ParseError> {
        let sp = self.span();
        self.expect(TokenKind::Function)?;
        let mut path = vec![self.expect_ident()?];
        while self.eat(TokenKind::Dot) {
            path.push(self.expect_ident()?);
        }
        let method = if self.eat(TokenKind::Colon) {
            Some(self.expect_ident()?)
        } else {
            None
        };
        let func = self.parse_func_body(method.is_some(), sp.clone())?;
        Ok(Stmt::Function {
            name: FuncName { path, method },
            func: Box::new(func),
            span: sp,
        })
    }

    /// Assignment or call statement.
    fn parse_expr_stmt(&mut self) -> Result<Stmt, ParseError> {
        let sp = self.span();
        let first = self.parse_suffixed_expr()?;
        if self.at(TokenKind::Assign) || self.at(TokenKind::Comma) {
            let mut targets = vec![first];
            while self.eat(TokenKind::Comma) {
                targets.push(self.parse_suffixed_expr()?);
            }
            for t in &targets {
                if !matches!(t, Expr::Name { .. } | Expr::Index { .. }) {
                    let s = t.span();
                    return Err(ParseError::new("cannot assign to this expression", s.line, s.col));
                }
            }
            self.expect(TokenKind::Assign)?;
            let values = self.parse_expr_list()?;
            return Ok(Stmt::Assign {
                targets,
                values,
                span: sp,
            });
        }
        if !first.is_call() {
            return Err(ParseError::new("syntax error: expected a statement", sp.line, sp.col));
        }
        Ok(Stmt::Call(first))
    }

    fn parse_func_body(&mut self, is_method: bool, sp: Span) -> Result<FuncBody, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if is_method {
            params.push("self".to_string());
        }
        let mut is_vararg = false;
        if !self.at(TokenKind::RParen) {
            loop {
                if self.eat(TokenKind::Ellipsis) {
                    is_vararg = true;
                    break;
                }
                params.push(self.expect_ident()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        let body = self.parse_block()?;
        self.expect_match(TokenKind::End, TokenKind::Function, &sp)?;
        Ok(FuncBody {
            params,
            is_vararg,
            body,
            span: sp,
        })
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn parse_expr_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut exprs = vec![self.parse_expr()?];
        while self.eat(TokenKind::Comma) {
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        self.nested(|p| p.parse_expr_levels(min_bp))
    }

    fn parse_expr_levels(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = match self.peek_kind() {
            TokenKind::Minus | TokenKind::Not | TokenKind::Hash => {
                let sp = self.span();
                let op = match self.advance().kind {
                    TokenKind::Minus => UnaryOp::Neg,
                    TokenKind::Not => UnaryOp::Not,
                    _ => UnaryOp::Len,
                };
                let operand = self.parse_expr_bp(UNARY_BP)?;
                Expr::UnaryOp {
                    op,
                    operand: Box::new(operand),
                    span: sp,
                }
            }
            _ => self.parse_simple_expr()?,
        };

        // A left-associative chain deepens the tree without recursing.
        let mut chain = 0;
        while let Some((l_bp, r_bp)) = infix_bp(self.peek_kind()) {
            if l_bp < min_bp {
                break;
            }
            chain += 1;
            self.check_levels(chain)?;
            let op_tok = self.advance();
            let op = token_to_binop(op_tok.kind);
            let rhs = self.parse_expr_bp(r_bp)?;
            lhs = Expr::BinOp {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span: op_tok.span,
            };
        }

        Ok(lhs)
    }

    fn parse_simple_expr(&mut self) -> Result<Expr, ParseError> {
        let sp = self.span();
        match self.peek_kind() {
            TokenKind::Nil => {
                self.advance();
                Ok(Expr::Nil { span: sp })
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::True { span: sp })
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::False { span: sp })
            }
            TokenKind::Number => {
                let tok = self.advance();
                match parse_number_literal(&tok.lexeme) {
                    Some(NumberLit::Int(value)) => Ok(Expr::Int { value, span: sp }),
                    Some(NumberLit::Float(value)) => Ok(Expr::Number { value, span: sp }),
                    None => Err(ParseError::new(
                        format!("malformed number near `{}`", tok.text()),
                        sp.line,
                        sp.col,
                    )),
                }
            }
            TokenKind::StringLit => {
                let tok = self.advance();
                Ok(Expr::Str {
                    value: tok.lexeme,
                    span: sp,
                })
            }
            TokenKind::Ellipsis => {
                self.advance();
                Ok(Expr::VarArg { span: sp })
            }
            TokenKind::Function => {
                self.advance();
                Ok(Expr::Function(Box::new(self.parse_func_body(false, sp)?)))
            }
            TokenKind::LBrace => self.parse_table(),
            _ => self.parse_suffixed_expr(),
        }
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, ParseError> {
        let sp = self.span();
        match self.peek_kind() {
            TokenKind::Ident => {
                let name = self.advance().text();
                Ok(Expr::Name { name, span: sp })
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect_match(TokenKind::RParen, TokenKind::LParen, &sp)?;
                Ok(Expr::Paren {
                    inner: Box::new(inner),
                    span: sp,
                })
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// Primary expression followed by field, index, method and call suffixes.
    fn parse_suffixed_expr(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary_expr()?;
        let mut links = 0;
        loop {
            self.check_levels(links)?;
            links += 1;
            let sp = self.span();
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let key_sp = self.span();
                    let name = self.expect_ident()?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        key: Box::new(Expr::Str {
                            value: name.into_bytes(),
                            span: key_sp,
                        }),
                        span: sp,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let key = self.parse_expr()?;
                    self.expect(TokenKind::RBracket)?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        key: Box::new(key),
                        span: sp,
                    };
                }
                TokenKind::Colon => {
                    self.advance();
                    let name = self.expect_ident()?;
                    let args = self.parse_call_args()?;
                    expr = Expr::Method {
                        object: Box::new(expr),
                        name,
                        args,
                        span: sp,
                    };
                }
                TokenKind::LParen | TokenKind::StringLit | TokenKind::LBrace => {
                    let args = self.parse_call_args()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        span: sp,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let sp = self.span();
        match self.peek_kind() {
            TokenKind::StringLit => {
                let tok = self.advance();
                Ok(vec![Expr::Str {
                    value: tok.lexeme,
                    span: sp,
                }])
            }
            TokenKind::LBrace => Ok(vec![self.parse_table()?]),
            TokenKind::LParen => {
                self.advance();
                let args = if self.at(TokenKind::RParen) {
                    Vec::new()
                } else {
                    self.parse_expr_list()?
                };
                self.expect_match(TokenKind::RParen, TokenKind::LParen, &sp)?;
                Ok(args)
            }
            _ => Err(self.unexpected("function arguments")),
        }
    }

    fn parse_table(&mut self) -> Result<Expr, ParseError> {
        let sp = self.span();
        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.at(TokenKind::LBracket) {
                self.advance();
                let key = self.parse_expr()?;
                self.expect(TokenKind::RBracket)?;
                self.expect(TokenKind::Assign)?;
                let value = self.parse_expr()?;
                fields.push(TableField::Keyed { key, value });
            } else if self.at(TokenKind::Ident)
                && self.tokens.get(self.pos + 1).map(|t| t.kind) == Some(TokenKind::Assign)
            {
                let key_sp = self.span();
                let name = self.advance().lexeme;
                self.advance();
                let value = self.parse_expr()?;
                fields.push(TableField::Keyed {
                    key: Expr::Str {
                        value: name,
                        span: key_sp,
                    },
                    value,
                });
            } else {
                fields.push(TableField::Positional(self.parse_expr()?));
            }
            if !self.eat(TokenKind::Comma) && !self.eat(TokenKind::Semicolon) {
                break;
            }
        }
        self.expect_match(TokenKind::RBrace, TokenKind::LBrace, &sp)?;
        Ok(Expr::Table { fields, span: sp })
    }
}

// ============================================================================
// Pratt precedence helpers
// ============================================================================

/// Returns (left_bp, right_bp) for infix operators. None if not infix.
fn infix_bp(kind: TokenKind) -> Option<(u8, u8)> {
    Some(match kind {
        TokenKind::Or => (1, 2),
        TokenKind::And => (3, 4),
        TokenKind::Eq
        | TokenKind::Neq
        | TokenKind::Lt
        | TokenKind::Le
        | TokenKind::Gt
        | TokenKind::Ge => (5, 6),
        TokenKind::Concat => (8, 7), // right-associative
        TokenKind::Plus | TokenKind::Minus => (9, 10),
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => (11, 12),
        TokenKind::Caret => (15, 14), // right-associative, above unary
        _ => return None,
    })
}

fn token_to_binop(kind: TokenKind) -> BinOp {
    match kind {
        TokenKind::Plus => BinOp::Add,
        TokenKind::Minus => BinOp::Sub,
        TokenKind::Star => BinOp::Mul,
        TokenKind::Slash => BinOp::Div,
        TokenKind::Percent => BinOp::Mod,
        TokenKind::Caret => BinOp::Pow,
        TokenKind::Concat => BinOp::Concat,
        TokenKind::Eq => BinOp::Eq,
        TokenKind::Neq => BinOp::Neq,
        TokenKind::Lt => BinOp::Lt,
        TokenKind::Le => BinOp::Le,
        TokenKind::Gt => BinOp::Gt,
        TokenKind::Ge => BinOp::Ge,
        TokenKind::And => BinOp::And,
        TokenKind::Or => BinOp::Or,
        _ => unreachable!("not a binary operator: {kind:?}"),
    }
}

fn tok_display(tok: &Token) -> String {
    match tok.kind {
        TokenKind::Ident | TokenKind::Number => tok.text(),
        TokenKind::StringLit => format!("\"{}\"", tok.text()),
        other => kind_name(other).to_string(),
    }
}
