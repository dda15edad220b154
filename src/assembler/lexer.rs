//! Tokenizer (spec §4.8 pass 1a). Comments run from `;` to end-of-line;
//! string literals support `\\`, `\n`, `\t`, `\0` escapes; numbers are
//! decimal, `0x…`, or `0b…`.
//!
//! Grounded on the teacher's overall "small, hand-written, no external
//! parsing crate" posture (the repo has no text format of its own, so
//! this follows the character-at-a-time style of the `other_examples/`
//! assemblers consulted for the pipeline's shape).

use super::token::{keyword_or_ident, Token, TokenKind};
use crate::error::{Diagnostic, Location, SyntaxErrorKind};

pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: u32,
    col: u32,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer { chars: source.chars().peekable(), line: 1, col: 1, diagnostics: Vec::new() }
    }

    fn loc(&self) -> Location {
        Location { line: self.line, col: self.col }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        match c {
            Some('\n') => {
                self.line += 1;
                self.col = 1;
            }
            Some(_) => self.col += 1,
            None => {}
        }
        c
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    pub fn tokenize(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();
        loop {
            self.skip_inline_whitespace_and_comments();
            let loc = self.loc();
            let Some(c) = self.peek() else {
                tokens.push(Token { kind: TokenKind::Eof, location: loc });
                break;
            };
            let kind = match c {
                '\n' => {
                    self.bump();
                    TokenKind::Eol
                }
                ':' => {
                    self.bump();
                    TokenKind::Colon
                }
                ',' => {
                    self.bump();
                    TokenKind::Comma
                }
                '[' => {
                    self.bump();
                    TokenKind::LBracket
                }
                ']' => {
                    self.bump();
                    TokenKind::RBracket
                }
                '(' => {
                    self.bump();
                    TokenKind::LParen
                }
                ')' => {
                    self.bump();
                    TokenKind::RParen
                }
                '+' => {
                    self.bump();
                    TokenKind::Plus
                }
                '-' => {
                    self.bump();
                    TokenKind::Minus
                }
                '"' => self.lex_string(loc),
                c if c.is_ascii_digit() => self.lex_number(),
                c if c.is_alphabetic() || c == '_' => self.lex_word(),
                other => {
                    self.bump();
                    self.diagnostics.push(Diagnostic {
                        location: loc,
                        kind: SyntaxErrorKind::UnexpectedToken(other.to_string()).into(),
                    });
                    continue;
                }
            };
            tokens.push(Token { kind, location: loc });
        }
        (tokens, self.diagnostics)
    }

    fn skip_inline_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c == ' ' || c == '\t' || c == '\r' => {
                    self.bump();
                }
                Some(';') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn lex_word(&mut self) -> TokenKind {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }
        keyword_or_ident(&word)
    }

    fn lex_number(&mut self) -> TokenKind {
        let start_loc = self.loc();
        let mut raw = String::new();
        if self.peek() == Some('0') {
            raw.push(self.bump().unwrap());
            if matches!(self.peek(), Some('x') | Some('X')) {
                raw.push(self.bump().unwrap());
                while let Some(c) = self.peek() {
                    if c.is_ascii_hexdigit() {
                        raw.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
                return match i64::from_str_radix(&raw[2..], 16) {
                    Ok(v) => TokenKind::Number(v),
                    Err(_) => {
                        self.diagnostics.push(Diagnostic {
                            location: start_loc,
                            kind: SyntaxErrorKind::InvalidNumber(raw).into(),
                        });
                        TokenKind::Number(0)
                    }
                };
            }
            if matches!(self.peek(), Some('b') | Some('B')) {
                raw.push(self.bump().unwrap());
                while let Some(c) = self.peek() {
                    if c == '0' || c == '1' {
                        raw.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
                return match i64::from_str_radix(&raw[2..], 2) {
                    Ok(v) => TokenKind::Number(v),
                    Err(_) => {
                        self.diagnostics.push(Diagnostic {
                            location: start_loc,
                            kind: SyntaxErrorKind::InvalidNumber(raw).into(),
                        });
                        TokenKind::Number(0)
                    }
                };
            }
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                raw.push(c);
                self.bump();
            } else {
                break;
            }
        }
        match raw.parse::<i64>() {
            Ok(v) => TokenKind::Number(v),
            Err(_) => {
                self.diagnostics.push(Diagnostic { location: start_loc, kind: SyntaxErrorKind::InvalidNumber(raw).into() });
                TokenKind::Number(0)
            }
        }
    }

    fn lex_string(&mut self, start_loc: Location) -> TokenKind {
        self.bump();
        let mut s = String::new();
        loop {
            match self.bump() {
                Some('"') => return TokenKind::Str(s),
                Some('\\') => match self.bump() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('0') => s.push('\0'),
                    Some('\\') => s.push('\\'),
                    Some('"') => s.push('"'),
                    Some(other) => s.push(other),
                    None => break,
                },
                Some(c) => s.push(c),
                None => break,
            }
        }
        self.diagnostics.push(Diagnostic { location: start_loc, kind: SyntaxErrorKind::UnterminatedString.into() });
        TokenKind::Str(s)
    }
}
