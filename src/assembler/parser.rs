//! Recursive-descent parser (spec §4.8 pass 1b) building the AST from
//! the grammar in spec §4.8.
//!
//! Grounded on the teacher's overall hand-rolled style; recovers from a
//! malformed statement by skipping to the next end-of-line or section
//! keyword, per spec §4.8, to keep collecting diagnostics instead of
//! aborting on the first error.

use super::ast::*;
use super::token::{Token, TokenKind};
use crate::error::{Diagnostic, Location, SyntaxErrorKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0, diagnostics: Vec::new() }
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn loc(&self) -> Location {
        self.tokens[self.pos.min(self.tokens.len() - 1)].location
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.tokens[self.pos.min(self.tokens.len() - 1)].kind.clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        kind
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    fn skip_blank_lines(&mut self) {
        while matches!(self.peek(), TokenKind::Eol) {
            self.advance();
        }
    }

    fn error(&mut self, kind: SyntaxErrorKind) {
        self.diagnostics.push(Diagnostic { location: self.loc(), kind: kind.into() });
    }

    fn recover_to_eol(&mut self) {
        while !matches!(self.peek(), TokenKind::Eol | TokenKind::Eof | TokenKind::Data | TokenKind::Code) {
            self.advance();
        }
        if matches!(self.peek(), TokenKind::Eol) {
            self.advance();
        }
    }

    pub fn parse_program(mut self) -> (Program, Vec<Diagnostic>) {
        let mut program = Program::default();
        loop {
            self.skip_blank_lines();
            match self.peek() {
                TokenKind::Eof => break,
                TokenKind::Data => program.sections.push(self.parse_data_section()),
                TokenKind::Code => program.sections.push(self.parse_code_section()),
                other => {
                    let found = format!("{other:?}");
                    self.error(SyntaxErrorKind::UnexpectedToken(found));
                    self.recover_to_eol();
                }
            }
        }
        (program, self.diagnostics)
    }

    fn parse_data_section(&mut self) -> Section {
        self.advance();
        self.expect_eol();
        let mut items = Vec::new();
        loop {
            self.skip_blank_lines();
            match self.peek() {
                TokenKind::Data | TokenKind::Code | TokenKind::Eof => break,
                TokenKind::Page => {
                    let loc = self.loc();
                    self.advance();
                    if let TokenKind::Ident(name) = self.peek().clone() {
                        self.advance();
                        items.push(DataItem::Page(name, loc));
                    } else {
                        self.error(SyntaxErrorKind::UnexpectedToken(format!("{:?}", self.peek())));
                    }
                    self.expect_eol();
                }
                TokenKind::Ident(_) => {
                    if let Some(def) = self.parse_data_def() {
                        items.push(DataItem::Def(def));
                    }
                }
                other => {
                    let found = format!("{other:?}");
                    self.error(SyntaxErrorKind::UnexpectedToken(found));
                    self.recover_to_eol();
                }
            }
        }
        Section::Data(items)
    }

    fn parse_data_def(&mut self) -> Option<DataDef> {
        let loc = self.loc();
        let TokenKind::Ident(label) = self.advance() else { unreachable!() };
        if !matches!(self.peek(), TokenKind::Colon) {
            self.error(SyntaxErrorKind::UnexpectedToken(format!("{:?}", self.peek())));
            self.recover_to_eol();
            return None;
        }
        self.advance();
        let kind = match self.peek() {
            TokenKind::Db => {
                self.advance();
                DataDefKind::Db(self.parse_payload())
            }
            TokenKind::Dw => {
                self.advance();
                DataDefKind::Dw(self.parse_payload())
            }
            TokenKind::Da => {
                self.advance();
                DataDefKind::Da(self.parse_ident_list())
            }
            other => {
                self.error(SyntaxErrorKind::UnexpectedToken(format!("{other:?}")));
                self.recover_to_eol();
                return None;
            }
        };
        self.expect_eol();
        Some(DataDef { label, kind, location: loc })
    }

    fn parse_payload(&mut self) -> Payload {
        if let TokenKind::Str(s) = self.peek().clone() {
            self.advance();
            return Payload::Str(s);
        }
        let mut numbers = Vec::new();
        if matches!(self.peek(), TokenKind::LBracket) {
            self.advance();
            if !matches!(self.peek(), TokenKind::RBracket) {
                loop {
                    if let TokenKind::Number(n) = *self.peek() {
                        numbers.push(n);
                        self.advance();
                    } else {
                        self.error(SyntaxErrorKind::UnexpectedToken(format!("{:?}", self.peek())));
                        break;
                    }
                    if matches!(self.peek(), TokenKind::Comma) {
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
            if matches!(self.peek(), TokenKind::RBracket) {
                self.advance();
            } else {
                self.error(SyntaxErrorKind::UnexpectedToken(format!("{:?}", self.peek())));
            }
        } else {
            self.error(SyntaxErrorKind::UnexpectedToken(format!("{:?}", self.peek())));
        }
        Payload::Numbers(numbers)
    }

    fn parse_ident_list(&mut self) -> Vec<String> {
        let mut names = Vec::new();
        if !matches!(self.peek(), TokenKind::LBracket) {
            self.error(SyntaxErrorKind::UnexpectedToken(format!("{:?}", self.peek())));
            return names;
        }
        self.advance();
        if !matches!(self.peek(), TokenKind::RBracket) {
            loop {
                if let TokenKind::Ident(name) = self.peek().clone() {
                    names.push(name);
                    self.advance();
                } else {
                    self.error(SyntaxErrorKind::UnexpectedToken(format!("{:?}", self.peek())));
                    break;
                }
                if matches!(self.peek(), TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        if matches!(self.peek(), TokenKind::RBracket) {
            self.advance();
        }
        names
    }

    fn parse_code_section(&mut self) -> Section {
        self.advance();
        self.expect_eol();
        let mut stmts = Vec::new();
        loop {
            self.skip_blank_lines();
            match self.peek().clone() {
                TokenKind::Data | TokenKind::Code | TokenKind::Eof => break,
                TokenKind::Db | TokenKind::Dw => stmts.push(self.parse_inline_data()),
                TokenKind::Ident(name) => {
                    if self.peek_is_label() {
                        let loc = self.loc();
                        self.advance();
                        self.advance();
                        stmts.push(CodeStmt::Label(name, loc));
                        self.expect_eol();
                    } else {
                        stmts.push(self.parse_instruction());
                    }
                }
                other => {
                    self.error(SyntaxErrorKind::UnexpectedToken(format!("{other:?}")));
                    self.recover_to_eol();
                }
            }
        }
        Section::Code(stmts)
    }

    fn peek_is_label(&self) -> bool {
        matches!(self.tokens.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::Colon))
    }

    fn parse_inline_data(&mut self) -> CodeStmt {
        let loc = self.loc();
        let width = match self.advance() {
            TokenKind::Db => DataWidth::Byte,
            _ => DataWidth::Word,
        };
        let payload = self.parse_payload();
        let in_page = if matches!(self.peek(), TokenKind::In) {
            self.advance();
            if let TokenKind::Ident(name) = self.peek().clone() {
                self.advance();
                Some(name)
            } else {
                self.error(SyntaxErrorKind::UnexpectedToken(format!("{:?}", self.peek())));
                None
            }
        } else {
            None
        };
        self.expect_eol();
        CodeStmt::InlineData(InlineData { width, payload, in_page, location: loc })
    }

    fn parse_instruction(&mut self) -> CodeStmt {
        let loc = self.loc();
        let TokenKind::Ident(mnemonic) = self.advance() else { unreachable!() };
        let mut operands = Vec::new();
        if !matches!(self.peek(), TokenKind::Eol | TokenKind::Eof) {
            loop {
                operands.push(self.parse_operand());
                if matches!(self.peek(), TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect_eol();
        CodeStmt::Instruction(Instruction { mnemonic, operands, location: loc })
    }

    fn parse_operand(&mut self) -> Operand {
        match self.peek().clone() {
            TokenKind::Register(name) => {
                self.advance();
                Operand::Register(name)
            }
            TokenKind::Number(n) => {
                self.advance();
                Operand::Number(n)
            }
            TokenKind::Ident(name) => {
                let loc = self.loc();
                self.advance();
                if matches!(self.peek(), TokenKind::LBracket) {
                    self.advance();
                    let expr = self.parse_expr();
                    if matches!(self.peek(), TokenKind::RBracket) {
                        self.advance();
                    } else {
                        self.error(SyntaxErrorKind::UnexpectedToken(format!("{:?}", self.peek())));
                    }
                    Operand::IdentBracket(name, expr, loc)
                } else {
                    Operand::Ident(name)
                }
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr();
                if matches!(self.peek(), TokenKind::RParen) {
                    self.advance();
                } else {
                    self.error(SyntaxErrorKind::UnexpectedToken(format!("{:?}", self.peek())));
                }
                Operand::Paren(expr)
            }
            TokenKind::LBracket => {
                self.advance();
                let expr = self.parse_expr();
                if matches!(self.peek(), TokenKind::RBracket) {
                    self.advance();
                } else {
                    self.error(SyntaxErrorKind::UnexpectedToken(format!("{:?}", self.peek())));
                }
                Operand::Bracket(expr)
            }
            other => {
                self.error(SyntaxErrorKind::UnexpectedToken(format!("{other:?}")));
                Operand::Number(0)
            }
        }
    }

    fn parse_expr(&mut self) -> Expr {
        let mut expr = Expr { symbol: None, constant: 0, register: None };
        self.merge_term(&mut expr, 1);
        loop {
            let sign = match self.peek() {
                TokenKind::Plus => 1,
                TokenKind::Minus => -1,
                _ => break,
            };
            self.advance();
            self.merge_term(&mut expr, sign);
        }
        expr
    }

    fn merge_term(&mut self, expr: &mut Expr, sign: i64) {
        match self.peek().clone() {
            TokenKind::Number(n) => {
                self.advance();
                expr.constant += sign * n;
            }
            TokenKind::Register(name) => {
                self.advance();
                expr.register = Some(name);
            }
            TokenKind::Ident(name) => {
                self.advance();
                expr.symbol = Some(name);
            }
            other => {
                self.error(SyntaxErrorKind::UnexpectedToken(format!("{other:?}")));
            }
        }
    }

    fn expect_eol(&mut self) {
        match self.peek() {
            TokenKind::Eol | TokenKind::Eof => {
                if matches!(self.peek(), TokenKind::Eol) {
                    self.advance();
                }
            }
            other => {
                let found = format!("{other:?}");
                self.error(SyntaxErrorKind::UnexpectedToken(found));
                self.recover_to_eol();
            }
        }
    }
}
