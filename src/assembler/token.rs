//! Lexical tokens for the assembly grammar (spec §4.8 pass 1).
//!
//! Grounded on `other_examples/`'s small hand-rolled assemblers
//! (fuel-asm/basm-rs token enums), generalized to Pendragon's grammar;
//! the teacher itself has no text format to lex.

use crate::error::Location;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Data,
    Code,
    Page,
    Db,
    Dw,
    Da,
    In,
    Ident(String),
    Register(String),
    Number(i64),
    Str(String),
    Colon,
    Comma,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Plus,
    Minus,
    Eol,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: Location,
}

pub fn keyword_or_ident(word: &str) -> TokenKind {
    match word.to_ascii_uppercase().as_str() {
        "DATA" => TokenKind::Data,
        "CODE" => TokenKind::Code,
        "PAGE" => TokenKind::Page,
        "DB" => TokenKind::Db,
        "DW" => TokenKind::Dw,
        "DA" => TokenKind::Da,
        "IN" => TokenKind::In,
        _ if is_register_name(word) => TokenKind::Register(word.to_ascii_uppercase()),
        _ => TokenKind::Ident(word.to_string()),
    }
}

pub const REGISTER_NAMES: &[&str] = &[
    "AX", "BX", "CX", "DX", "EX", "AH", "AL", "BH", "BL", "CH", "CL", "DH", "DL", "EH", "EL",
];

pub fn is_register_name(word: &str) -> bool {
    let upper = word.to_ascii_uppercase();
    REGISTER_NAMES.contains(&upper.as_str())
}
