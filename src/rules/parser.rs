//! Recursive-descent parser for rule text.
//!
//! Precedence, loosest first (Python's):
//!
//! ```text
//! or  >  and  >  not  >  == != < <= > >= in, not in  >  + -  >  * // %  >  unary -  >  call, subscript
//! ```

use super::ast::{Ast, BinOp, BoolOp, CmpOp};
use super::error::CompileError;
use super::lexer::{Spanned, Tok, tokenize};

/// Parse one rule expression.
pub fn parse_rule(text: &str) -> Result<Ast, CompileError> {
    let mut parser = Parser { text, tokens: tokenize(text)?, pos: 0 };
    let ast = parser.expr()?;
    match parser.tokens.get(parser.pos) {
        None => Ok(ast),
        Some((offset, tok)) => Err(parser.error_at(*offset, format!("unexpected {tok:?} after expression"))),
    }
}

struct Parser<'t> {
    text: &'t str,
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|(_, tok)| tok)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Tok> {
        self.tokens.get(self.pos + ahead).map(|(_, tok)| tok)
    }

    fn next(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).map(|(_, tok)| tok.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Tok) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Tok::Ident(word)) if word == keyword)
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let found = self.peek_keyword(keyword);
        if found {
            self.pos += 1;
        }
        found
    }

    fn expect(&mut self, expected: Tok) -> Result<(), CompileError> {
        if self.eat(&expected) { Ok(()) } else { Err(self.error(format!("expected {expected:?}"))) }
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.text.len(), |(offset, _)| *offset)
    }

    fn error(&self, message: String) -> CompileError {
        self.error_at(self.offset(), message)
    }

    fn error_at(&self, offset: usize, message: String) -> CompileError {
        CompileError::Syntax { text: self.text.to_string(), offset, message }
    }

    // --- Grammar ------------------------------------------------------------

    fn expr(&mut self) -> Result<Ast, CompileError> {
        self.bool_op(BoolOp::Or)
    }

    fn bool_op(&mut self, op: BoolOp) -> Result<Ast, CompileError> {
        let (keyword, operand): (&str, fn(&mut Self) -> Result<Ast, CompileError>) = match op {
            BoolOp::Or => ("or", |p| p.bool_op(BoolOp::And)),
            BoolOp::And => ("and", Self::not_expr),
        };
        let first = operand(self)?;
        if !self.peek_keyword(keyword) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat_keyword(keyword) {
            values.push(operand(self)?);
        }
        Ok(Ast::BoolOp { op, values })
    }

    fn not_expr(&mut self) -> Result<Ast, CompileError> {
        if self.eat_keyword("not") {
            return Ok(Ast::Not(Box::new(self.not_expr()?)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Ast, CompileError> {
        let left = self.sum()?;
        let mut rest = Vec::new();
        while let Some(op) = self.cmp_op() {
            rest.push((op, self.sum()?));
        }
        if rest.is_empty() { Ok(left) } else { Ok(Ast::Compare { left: Box::new(left), rest }) }
    }

    fn cmp_op(&mut self) -> Option<CmpOp> {
        let op = match self.peek()? {
            Tok::EqEq => CmpOp::Eq,
            Tok::NotEq => CmpOp::NotEq,
            Tok::Lt => CmpOp::Lt,
            Tok::LtE => CmpOp::LtE,
            Tok::Gt => CmpOp::Gt,
            Tok::GtE => CmpOp::GtE,
            Tok::Ident(word) if word == "in" => CmpOp::In,
            Tok::Ident(word) if word == "not" && matches!(self.peek_at(1), Some(Tok::Ident(w)) if w == "in") => {
                self.pos += 1;
                CmpOp::NotIn
            }
            _ => return None,
        };
        self.pos += 1;
        Some(op)
    }

    fn sum(&mut self) -> Result<Ast, CompileError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Plus) => BinOp::Add,
                Some(Tok::Minus) => BinOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.term()?;
            left = Ast::BinOp { op, left: Box::new(left), right: Box::new(right) };
        }
    }

    fn term(&mut self) -> Result<Ast, CompileError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Star) => BinOp::Mul,
                Some(Tok::SlashSlash) => BinOp::FloorDiv,
                Some(Tok::Percent) => BinOp::Mod,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            left = Ast::BinOp { op, left: Box::new(left), right: Box::new(right) };
        }
    }

    fn unary(&mut self) -> Result<Ast, CompileError> {
        if self.eat(&Tok::Minus) {
            return Ok(Ast::Neg(Box::new(self.unary()?)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Ast, CompileError> {
        let offset = self.offset();
        let primary = self.primary()?;
        let is_name = matches!(primary, Ast::Name(_));
        match self.peek() {
            Some(Tok::LParen) | Some(Tok::LBracket) if !is_name => {
                Err(self.error("only plain identifiers can be called or subscripted".into()))
            }
            Some(Tok::LParen) => {
                self.pos += 1;
                let Ast::Name(func) = primary else { unreachable!() };
                let args = self.sequence(Tok::RParen)?;
                if matches!(self.peek(), Some(Tok::LParen) | Some(Tok::LBracket)) {
                    return Err(self.error_at(offset, "chained calls are not supported".into()));
                }
                Ok(Ast::Call { func, args })
            }
            Some(Tok::LBracket) => {
                self.pos += 1;
                let Ast::Name(value) = primary else { unreachable!() };
                let key = self.expr()?;
                self.expect(Tok::RBracket)?;
                Ok(Ast::Subscript { value, key: Box::new(key) })
            }
            _ => Ok(primary),
        }
    }

    /// Comma-separated expressions up to `close`, trailing comma allowed.
    fn sequence(&mut self, close: Tok) -> Result<Vec<Ast>, CompileError> {
        let mut items = Vec::new();
        while !self.eat(&close) {
            items.push(self.expr()?);
            if !self.eat(&Tok::Comma) {
                self.expect(close.clone())?;
                break;
            }
        }
        Ok(items)
    }

    fn primary(&mut self) -> Result<Ast, CompileError> {
        let offset = self.offset();
        match self.next() {
            Some(Tok::Int(n)) => Ok(Ast::Int(n)),
            Some(Tok::Decimal(d)) => Ok(Ast::Decimal(d)),
            Some(Tok::Str(s)) => Ok(Ast::Str(s)),
            Some(Tok::Ident(word)) => match word.as_str() {
                "True" => Ok(Ast::Bool(true)),
                "False" => Ok(Ast::Bool(false)),
                "and" | "or" | "not" | "in" => Err(self.error_at(offset, format!("unexpected keyword `{word}`"))),
                _ => Ok(Ast::Name(word)),
            },
            Some(Tok::LParen) => {
                if self.eat(&Tok::RParen) {
                    return Ok(Ast::Tuple(Vec::new()));
                }
                let first = self.expr()?;
                if self.eat(&Tok::RParen) {
                    return Ok(first);
                }
                self.expect(Tok::Comma)?;
                let mut items = vec![first];
                items.extend(self.sequence(Tok::RParen)?);
                Ok(Ast::Tuple(items))
            }
            Some(tok) => Err(self.error_at(offset, format!("unexpected {tok:?}"))),
            None => Err(self.error_at(offset, "unexpected end of rule".into())),
        }
    }
}
