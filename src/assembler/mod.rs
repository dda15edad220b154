//! The five-pass assembler pipeline (spec §4.8).
//!
//! Each pass collects every diagnostic it can before the pipeline
//! aborts, per spec §7, rather than failing on the first error.

pub mod ast;
pub mod emit;
pub mod graph;
pub mod lexer;
pub mod parser;
pub mod resolve;
pub mod rewrite;
pub mod semantic;
pub mod token;

use crate::error::AssembleError;
use crate::program::Program;

pub fn assemble(source: &str, program_name: &str) -> Result<Program, AssembleError> {
    let (tokens, lex_diags) = lexer::Lexer::new(source).tokenize();
    if !lex_diags.is_empty() {
        return Err(AssembleError(lex_diags));
    }

    let (mut program, parse_diags) = parser::Parser::new(tokens).parse_program();
    if !parse_diags.is_empty() {
        return Err(AssembleError(parse_diags));
    }

    let rewrite_diags = rewrite::rewrite(&mut program);
    if !rewrite_diags.is_empty() {
        return Err(AssembleError(rewrite_diags));
    }

    let (_table, semantic_diags) = semantic::analyze(&program);
    if !semantic_diags.is_empty() {
        return Err(AssembleError(semantic_diags));
    }

    let (graph, graph_diags) = graph::build(&program);
    if !graph_diags.is_empty() {
        return Err(AssembleError(graph_diags));
    }

    let (resolved, resolve_diags) = resolve::resolve(&graph);
    if !resolve_diags.is_empty() {
        return Err(AssembleError(resolve_diags));
    }

    let (emitted, emit_diags) = emit::emit(&graph, &resolved);
    if !emit_diags.is_empty() {
        return Err(AssembleError(emit_diags));
    }

    let data_bytes = emit::patch_address_arrays(&graph, &resolved, emitted.data_bytes);

    Ok(Program { program_name: program_name.to_string(), data_bytes, code_bytes: emitted.code_bytes })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_a_minimal_program() {
        let program = assemble("CODE\nLD AX,0\nLD CX,10\nL: ADD AX,CX\nDEC CX\nJPNZ L\nHALT\n", "loop")
            .expect("assembly should succeed");
        assert_eq!(
            program.code_bytes,
            vec![0x02, 1, 0, 0, 0x02, 3, 10, 0, 0x2A, 3, 0x6B, 3, 0x20, 8, 0, 0x01]
        );
    }

    #[test]
    fn reports_undefined_symbol() {
        let err = assemble("CODE\nJMP nowhere\n", "bad").unwrap_err();
        assert!(!err.diagnostics().is_empty());
    }

    #[test]
    fn reports_unknown_mnemonic() {
        let err = assemble("CODE\nFROB AX\n", "bad").unwrap_err();
        assert!(!err.diagnostics().is_empty());
    }
}
