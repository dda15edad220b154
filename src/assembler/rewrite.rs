//! Pass 1.5: sugar rewrite (spec §4.8 pass 1.5, §9 Open Questions).
//!
//! `LD reg,label[expr]` has no direct opcode — the register names a
//! half or the whole of a word, and the bracket names a memory address.
//! This pass folds the two into a single address-taking mnemonic: `LDAB`
//! when the destination is an 8-bit half, `LDA` when it is a full word.
//! Idempotent: it only fires on `LD` with a bracketed identifier
//! operand, and rewriting removes both.

use super::ast::{CodeStmt, Expr, Instruction, Operand, Program, Section};
use crate::error::{Diagnostic, LayoutErrorKind};

const BYTE_REGISTERS: &[&str] =
    &["AH", "BH", "CH", "DH", "EH", "AL", "BL", "CL", "DL", "EL"];

pub fn rewrite(program: &mut Program) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for section in &mut program.sections {
        let Section::Code(stmts) = section else { continue };
        for stmt in stmts {
            if let CodeStmt::Instruction(instr) = stmt {
                rewrite_instruction(instr, &mut diagnostics);
            }
        }
    }
    diagnostics
}

fn rewrite_instruction(instr: &mut Instruction, diagnostics: &mut Vec<Diagnostic>) {
    if instr.mnemonic != "LD" {
        return;
    }
    if instr.operands.len() != 2 {
        return;
    }
    let Operand::Register(reg) = &instr.operands[0] else { return };
    let Operand::IdentBracket(label, expr, loc) = &instr.operands[1] else { return };

    if expr.symbol.is_some() {
        diagnostics.push(Diagnostic {
            location: *loc,
            kind: LayoutErrorKind::UnresolvedReference(format!(
                "{label}[...] cannot itself reference another symbol"
            ))
            .into(),
        });
        return;
    }

    let merged = Expr { symbol: Some(label.clone()), constant: expr.constant, register: expr.register.clone() };
    let reg = reg.clone();

    instr.mnemonic =
        if BYTE_REGISTERS.contains(&reg.as_str()) { "LDAB".to_string() } else { "LDA".to_string() };
    instr.operands = vec![Operand::Register(reg), Operand::Paren(merged)];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::lexer::Lexer;
    use crate::assembler::parser::Parser;

    fn rewritten(src: &str) -> (Program, Vec<Diagnostic>) {
        let (tokens, _) = Lexer::new(src).tokenize();
        let (mut program, _) = Parser::new(tokens).parse_program();
        let diags = rewrite(&mut program);
        (program, diags)
    }

    fn only_instruction(program: &Program) -> &Instruction {
        let Section::Code(stmts) = &program.sections[0] else { panic!() };
        let CodeStmt::Instruction(instr) = &stmts[0] else { panic!() };
        instr
    }

    #[test]
    fn rewrites_high_byte_destination_to_ldab() {
        let (program, diags) = rewritten("CODE\nLD AH,text[2]\n");
        assert!(diags.is_empty());
        let instr = only_instruction(&program);
        assert_eq!(instr.mnemonic, "LDAB");
        assert_eq!(instr.operands[0], Operand::Register("AH".into()));
    }

    #[test]
    fn rewrites_low_byte_destination_to_ldab() {
        let (program, diags) = rewritten("CODE\nLD BL,text[2+BX]\n");
        assert!(diags.is_empty());
        let instr = only_instruction(&program);
        assert_eq!(instr.mnemonic, "LDAB");
        let Operand::Paren(expr) = &instr.operands[1] else { panic!() };
        assert_eq!(expr.symbol.as_deref(), Some("text"));
        assert_eq!(expr.constant, 2);
        assert_eq!(expr.register.as_deref(), Some("BX"));
    }

    #[test]
    fn rewrites_word_destination_to_lda() {
        let (program, diags) = rewritten("CODE\nLD CX,text[0]\n");
        assert!(diags.is_empty());
        assert_eq!(only_instruction(&program).mnemonic, "LDA");
    }

    #[test]
    fn is_idempotent() {
        let (mut program, _) = rewritten("CODE\nLD AH,text[2]\n");
        let diags = rewrite(&mut program);
        assert!(diags.is_empty());
        assert_eq!(only_instruction(&program).mnemonic, "LDAB");
    }

    #[test]
    fn leaves_plain_ld_untouched() {
        let (program, diags) = rewritten("CODE\nLD AX,0\n");
        assert!(diags.is_empty());
        assert_eq!(only_instruction(&program).mnemonic, "LD");
    }
}
