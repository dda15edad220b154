//! Pass 2: semantic analysis (spec §4.8 pass 2).
//!
//! Builds the symbol table (data/code labels, their type and page) and
//! the page registry, and collects every symbol/page usage so undefined
//! references can be reported once at the end of the traversal instead
//! of failing on the first forward reference.

use std::collections::HashMap;

use super::ast::{CodeStmt, DataDefKind, DataItem, Instruction, Operand, Payload, Program, Section};
use crate::error::{Diagnostic, Location, SemanticErrorKind};

const MAX_PAGE_BYTES: u32 = 65_536;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Byte,
    Word,
    Address,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub page: Option<String>,
    pub byte_size: u32,
}

#[derive(Debug, Clone)]
pub struct DaReference {
    pub label: String,
    pub refers_to: Vec<String>,
    pub location: Location,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    pub symbols: HashMap<String, Symbol>,
    pub pages: HashMap<String, u32>,
    pub da_references: Vec<DaReference>,
}

struct Usage {
    name: String,
    location: Location,
}

pub fn analyze(program: &Program) -> (SymbolTable, Vec<Diagnostic>) {
    let mut table = SymbolTable::default();
    let mut diagnostics = Vec::new();
    let mut symbol_usages: Vec<Usage> = Vec::new();
    let mut page_usages: Vec<Usage> = Vec::new();

    for section in &program.sections {
        match section {
            Section::Data(items) => {
                analyze_data_section(items, &mut table, &mut diagnostics, &mut symbol_usages)
            }
            Section::Code(stmts) => analyze_code_section(
                stmts,
                &mut table,
                &mut diagnostics,
                &mut symbol_usages,
                &mut page_usages,
            ),
        }
    }

    for usage in &symbol_usages {
        if !table.symbols.contains_key(&usage.name) {
            diagnostics.push(Diagnostic {
                location: usage.location,
                kind: SemanticErrorKind::UndefinedSymbol(usage.name.clone()).into(),
            });
        }
    }
    for usage in &page_usages {
        if !table.pages.contains_key(&usage.name) {
            diagnostics.push(Diagnostic {
                location: usage.location,
                kind: SemanticErrorKind::UndefinedSymbol(usage.name.clone()).into(),
            });
        }
    }

    (table, diagnostics)
}

fn define_symbol(
    table: &mut SymbolTable,
    diagnostics: &mut Vec<Diagnostic>,
    name: &str,
    symbol: Symbol,
    location: Location,
) {
    if table.symbols.contains_key(name) {
        diagnostics.push(Diagnostic {
            location,
            kind: SemanticErrorKind::DuplicateDefinition(name.to_string()).into(),
        });
        return;
    }
    table.symbols.insert(name.to_string(), symbol);
}

fn payload_byte_size(payload: &Payload, width_bytes: u32) -> u32 {
    match payload {
        Payload::Str(s) if width_bytes == 1 => s.len() as u32,
        Payload::Str(s) => s.chars().count() as u32 * width_bytes,
        Payload::Numbers(v) => v.len() as u32 * width_bytes,
    }
}

fn analyze_data_section(
    items: &[DataItem],
    table: &mut SymbolTable,
    diagnostics: &mut Vec<Diagnostic>,
    symbol_usages: &mut Vec<Usage>,
) {
    let mut current_page: Option<String> = None;
    for item in items {
        match item {
            DataItem::Page(name, loc) => {
                if table.pages.contains_key(name) {
                    diagnostics.push(Diagnostic {
                        location: *loc,
                        kind: SemanticErrorKind::DuplicatePage(name.clone()).into(),
                    });
                } else {
                    table.pages.insert(name.clone(), 0);
                }
                current_page = Some(name.clone());
            }
            DataItem::Def(def) => {
                let (kind, byte_size) = match &def.kind {
                    DataDefKind::Db(payload) => (SymbolKind::Byte, payload_byte_size(payload, 1)),
                    DataDefKind::Dw(payload) => (SymbolKind::Word, payload_byte_size(payload, 2)),
                    DataDefKind::Da(refs) => {
                        table.da_references.push(DaReference {
                            label: def.label.clone(),
                            refers_to: refs.clone(),
                            location: def.location,
                        });
                        for r in refs {
                            symbol_usages.push(Usage { name: r.clone(), location: def.location });
                        }
                        (SymbolKind::Address, refs.len() as u32 * 2)
                    }
                };
                if let Some(page) = &current_page {
                    if let Some(used) = table.pages.get_mut(page) {
                        *used += byte_size;
                        if *used > MAX_PAGE_BYTES {
                            diagnostics.push(Diagnostic {
                                location: def.location,
                                kind: SemanticErrorKind::PageSizeExceeded(page.clone()).into(),
                            });
                        }
                    }
                }
                define_symbol(
                    table,
                    diagnostics,
                    &def.label,
                    Symbol { kind, page: current_page.clone(), byte_size },
                    def.location,
                );
            }
        }
    }
}

fn collect_expr_usage(expr: &super::ast::Expr, loc: Location, symbol_usages: &mut Vec<Usage>) {
    if let Some(symbol) = &expr.symbol {
        symbol_usages.push(Usage { name: symbol.clone(), location: loc });
    }
}

fn collect_operand_usage(operand: &Operand, loc: Location, symbol_usages: &mut Vec<Usage>) {
    match operand {
        Operand::Ident(name) => symbol_usages.push(Usage { name: name.clone(), location: loc }),
        Operand::IdentBracket(name, expr, loc2) => {
            symbol_usages.push(Usage { name: name.clone(), location: *loc2 });
            collect_expr_usage(expr, *loc2, symbol_usages);
        }
        Operand::Paren(expr) | Operand::Bracket(expr) => collect_expr_usage(expr, loc, symbol_usages),
        Operand::Register(_) | Operand::Number(_) => {}
    }
}

fn check_ld_bracket_syntax(instr: &Instruction, diagnostics: &mut Vec<Diagnostic>) {
    if instr.mnemonic != "LD" {
        return;
    }
    for operand in &instr.operands {
        if matches!(operand, Operand::Bracket(_)) {
            diagnostics.push(Diagnostic {
                location: instr.location,
                kind: SemanticErrorKind::InvalidBracketSyntax.into(),
            });
        }
    }
}

fn analyze_code_section(
    stmts: &[CodeStmt],
    table: &mut SymbolTable,
    diagnostics: &mut Vec<Diagnostic>,
    symbol_usages: &mut Vec<Usage>,
    page_usages: &mut Vec<Usage>,
) {
    for stmt in stmts {
        match stmt {
            CodeStmt::Label(name, loc) => {
                define_symbol(
                    table,
                    diagnostics,
                    name,
                    Symbol { kind: SymbolKind::Address, page: None, byte_size: 2 },
                    *loc,
                );
            }
            CodeStmt::Instruction(instr) => {
                check_ld_bracket_syntax(instr, diagnostics);
                for operand in &instr.operands {
                    collect_operand_usage(operand, instr.location, symbol_usages);
                }
            }
            CodeStmt::InlineData(data) => {
                if let Some(page) = &data.in_page {
                    page_usages.push(Usage { name: page.clone(), location: data.location });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::lexer::Lexer;
    use crate::assembler::parser::Parser;
    use crate::assembler::rewrite::rewrite;

    fn analyzed(src: &str) -> (SymbolTable, Vec<Diagnostic>) {
        let (tokens, _) = Lexer::new(src).tokenize();
        let (mut program, _) = Parser::new(tokens).parse_program();
        rewrite(&mut program);
        analyze(&program)
    }

    #[test]
    fn registers_data_and_code_labels() {
        let (table, diags) = analyzed("DATA\nx: DB [1,2,3]\nCODE\nL: HALT\n");
        assert!(diags.is_empty(), "{diags:?}");
        assert!(table.symbols.contains_key("x"));
        assert!(table.symbols.contains_key("L"));
    }

    #[test]
    fn flags_undefined_symbol_usage() {
        let (_table, diags) = analyzed("CODE\nJMP nowhere\n");
        assert!(diags.iter().any(|d| matches!(d.kind, crate::error::AssembleErrorKind::Semantic(
            SemanticErrorKind::UndefinedSymbol(ref s)) if s == "nowhere")));
    }

    #[test]
    fn flags_duplicate_definition() {
        let (_table, diags) = analyzed("DATA\nx: DB [1]\nx: DB [2]\n");
        assert!(diags.iter().any(|d| matches!(d.kind, crate::error::AssembleErrorKind::Semantic(
            SemanticErrorKind::DuplicateDefinition(ref s)) if s == "x")));
    }

    #[test]
    fn flags_duplicate_page() {
        let (_table, diags) = analyzed("DATA\nPAGE p\nx: DB [1]\nPAGE p\ny: DB [2]\n");
        assert!(diags.iter().any(|d| matches!(d.kind, crate::error::AssembleErrorKind::Semantic(
            SemanticErrorKind::DuplicatePage(ref s)) if s == "p")));
    }

    #[test]
    fn flags_bracket_operand_on_unrewritten_ld() {
        let (_table, diags) = analyzed("CODE\nLD AX,[0]\n");
        assert!(diags.iter().any(|d| matches!(
            d.kind,
            crate::error::AssembleErrorKind::Semantic(SemanticErrorKind::InvalidBracketSyntax)
        )));
    }
}
