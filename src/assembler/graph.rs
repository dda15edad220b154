//! Pass 3: AST -> code graph (spec §4.8 pass 3).
//!
//! Lowers parsed statements to opcode bytes and operand parameters.
//! Addresses that name a symbol stay unresolved (`Param::AddressRef`)
//! until pass 4 assigns every label a concrete offset.

use super::ast::{
    CodeStmt, DataDefKind, DataItem, DataWidth, Expr, Instruction, Operand, Payload, Program, Section,
};
use crate::error::{Diagnostic, LayoutErrorKind, Location};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Byte(u8),
    /// A word-wide address reference, resolved in pass 4 and expanded
    /// to two little-endian bytes in pass 5.
    AddressRef { symbol: String, offset: i64 },
    /// A named `PAGE` operand, resolved to that page's numeric index.
    PageRef(String),
}

#[derive(Debug, Clone)]
pub enum DataNode {
    Block { label: String, page: Option<String>, bytes: Vec<u8> },
    /// `DA [a,b,c]` — each slot becomes a resolved word address in pass 5.
    AddressArray { label: String, page: Option<String>, refs: Vec<String>, location: Location },
}

#[derive(Debug, Clone)]
pub enum CodeNode {
    Label { name: String },
    Instruction { opcode: u8, params: Vec<Param>, location: Location },
}

#[derive(Debug, Default)]
pub struct CodeGraph {
    pub data_nodes: Vec<DataNode>,
    pub code_nodes: Vec<CodeNode>,
}

pub fn build(program: &Program) -> (CodeGraph, Vec<Diagnostic>) {
    let mut graph = CodeGraph::default();
    let mut diagnostics = Vec::new();
    let mut anon_counter = 0u32;

    for section in &program.sections {
        match section {
            Section::Data(items) => build_data_section(items, &mut graph),
            Section::Code(stmts) => {
                build_code_section(stmts, &mut graph, &mut diagnostics, &mut anon_counter)
            }
        }
    }

    (graph, diagnostics)
}

fn payload_bytes(payload: &Payload, width: &DataWidth) -> Vec<u8> {
    match (payload, width) {
        (Payload::Str(s), DataWidth::Byte) => s.as_bytes().to_vec(),
        (Payload::Str(s), DataWidth::Word) => {
            s.chars().flat_map(|c| (c as u16).to_le_bytes()).collect()
        }
        (Payload::Numbers(v), DataWidth::Byte) => v.iter().map(|n| *n as u8).collect(),
        (Payload::Numbers(v), DataWidth::Word) => {
            v.iter().flat_map(|n| (*n as i64 as u16).to_le_bytes()).collect()
        }
    }
}

fn build_data_section(items: &[DataItem], graph: &mut CodeGraph) {
    let mut current_page: Option<String> = None;
    for item in items {
        match item {
            DataItem::Page(name, _) => current_page = Some(name.clone()),
            DataItem::Def(def) => match &def.kind {
                DataDefKind::Db(payload) => graph.data_nodes.push(DataNode::Block {
                    label: def.label.clone(),
                    page: current_page.clone(),
                    bytes: payload_bytes(payload, &DataWidth::Byte),
                }),
                DataDefKind::Dw(payload) => graph.data_nodes.push(DataNode::Block {
                    label: def.label.clone(),
                    page: current_page.clone(),
                    bytes: payload_bytes(payload, &DataWidth::Word),
                }),
                DataDefKind::Da(refs) => graph.data_nodes.push(DataNode::AddressArray {
                    label: def.label.clone(),
                    page: current_page.clone(),
                    refs: refs.clone(),
                    location: def.location,
                }),
            },
        }
    }
}

fn build_code_section(
    stmts: &[CodeStmt],
    graph: &mut CodeGraph,
    diagnostics: &mut Vec<Diagnostic>,
    anon_counter: &mut u32,
) {
    for stmt in stmts {
        match stmt {
            CodeStmt::Label(name, _) => graph.code_nodes.push(CodeNode::Label { name: name.clone() }),
            CodeStmt::Instruction(instr) => match lower_instruction(instr) {
                Ok((opcode, params)) => {
                    graph.code_nodes.push(CodeNode::Instruction { opcode, params, location: instr.location })
                }
                Err(diag) => diagnostics.push(diag),
            },
            CodeStmt::InlineData(data) => {
                let width = match data.width {
                    DataWidth::Byte => DataWidth::Byte,
                    DataWidth::Word => DataWidth::Word,
                };
                let bytes = payload_bytes(&data.payload, &width);
                let label = format!("__inline_{anon_counter}");
                *anon_counter += 1;
                graph.data_nodes.push(DataNode::Block { label, page: data.in_page.clone(), bytes });
            }
        }
    }
}

fn register_byte(name: &str) -> u8 {
    match name.chars().next() {
        Some('A') => 1,
        Some('B') => 2,
        Some('C') => 3,
        Some('D') => 4,
        Some('E') => 5,
        _ => 0,
    }
}

fn word_bytes(n: i64) -> Vec<Param> {
    let v = n as i64 as u16;
    vec![Param::Byte((v & 0xFF) as u8), Param::Byte((v >> 8) as u8)]
}

fn shape_error(mnemonic: &str, loc: Location) -> Diagnostic {
    Diagnostic {
        location: loc,
        kind: LayoutErrorKind::InvalidOperandShape { mnemonic: mnemonic.to_string() }.into(),
    }
}

fn absolute_addr_param(operand: &Operand, mnemonic: &str, loc: Location) -> Result<Param, Diagnostic> {
    match operand {
        Operand::Ident(name) => Ok(Param::AddressRef { symbol: name.clone(), offset: 0 }),
        Operand::Paren(expr) => addr_from_expr(expr, mnemonic, loc),
        _ => Err(shape_error(mnemonic, loc)),
    }
}

fn addr_from_expr(expr: &Expr, mnemonic: &str, loc: Location) -> Result<Param, Diagnostic> {
    match (&expr.symbol, &expr.register) {
        (Some(symbol), None) => Ok(Param::AddressRef { symbol: symbol.clone(), offset: expr.constant }),
        (Some(_), Some(_)) => Err(Diagnostic {
            location: loc,
            kind: LayoutErrorKind::UnsupportedAddressing { mnemonic: mnemonic.to_string() }.into(),
        }),
        (None, _) => Err(shape_error(mnemonic, loc)),
    }
}

fn register_indirect_param(operand: &Operand) -> Option<Param> {
    if let Operand::Paren(expr) = operand {
        if expr.symbol.is_none() && expr.constant == 0 {
            if let Some(reg) = &expr.register {
                return Some(Param::Byte(register_byte(reg)));
            }
        }
    }
    None
}

/// Maps one parsed instruction to its opcode byte and parameter list.
fn lower_instruction(instr: &Instruction) -> Result<(u8, Vec<Param>), Diagnostic> {
    let m = instr.mnemonic.as_str();
    let ops = &instr.operands[..];
    let loc = instr.location;

    macro_rules! arith_family {
        ($word_op:literal, $reg_op:literal, $byte_op:literal, $high_op:literal, $low_op:literal) => {
            match m {
                // The two-operand form spells out the implicit AX
                // accumulator for readability; only the second operand
                // is actually encoded.
                _ if m == $word_op => match ops {
                    [Operand::Number(n)] | [Operand::Register(_), Operand::Number(n)] => {
                        Ok((opcode_for(m, 0)?, word_bytes(*n)))
                    }
                    [Operand::Register(r)] | [Operand::Register(_), Operand::Register(r)] => {
                        Ok((opcode_for(m, 1)?, vec![Param::Byte(register_byte(r))]))
                    }
                    _ => Err(shape_error(m, loc)),
                },
                _ if m == $byte_op => match ops {
                    [Operand::Number(n)] => Ok((opcode_for(m, 0)?, vec![Param::Byte(*n as u8)])),
                    _ => Err(shape_error(m, loc)),
                },
                _ if m == $high_op || m == $low_op => match ops {
                    [Operand::Register(r)] => Ok((opcode_for(m, 0)?, vec![Param::Byte(register_byte(r))])),
                    _ => Err(shape_error(m, loc)),
                },
                _ => unreachable!(),
            }
        };
    }

    match m {
        "NOP" | "HALT" | "RET" | "FLSH" => match ops {
            [] => Ok((opcode_for(m, 0)?, vec![])),
            _ => Err(shape_error(m, loc)),
        },

        "INC" | "DEC" => match ops {
            [Operand::Register(r)] => Ok((opcode_for(m, 0)?, vec![Param::Byte(register_byte(r))])),
            _ => Err(shape_error(m, loc)),
        },

        "SWP" => match ops {
            [Operand::Register(a), Operand::Register(b)] => {
                Ok((0x04, vec![Param::Byte(register_byte(a)), Param::Byte(register_byte(b))]))
            }
            _ => Err(shape_error(m, loc)),
        },

        "LD" => match ops {
            [Operand::Register(r), Operand::Number(n)] => {
                let mut params = vec![Param::Byte(register_byte(r))];
                params.extend(word_bytes(*n));
                Ok((0x02, params))
            }
            [Operand::Register(dest), Operand::Register(src)] => {
                Ok((0x03, vec![Param::Byte(register_byte(dest)), Param::Byte(register_byte(src))]))
            }
            _ => Err(shape_error(m, loc)),
        },

        "LDH" | "LDL" => {
            let (imm_op, reg_op): (u8, u8) = if m == "LDH" { (0x05, 0x06) } else { (0x07, 0x08) };
            match ops {
                [Operand::Register(r), Operand::Number(n)] => {
                    Ok((imm_op, vec![Param::Byte(register_byte(r)), Param::Byte(*n as u8)]))
                }
                [Operand::Register(dest), Operand::Register(src)] => {
                    Ok((reg_op, vec![Param::Byte(register_byte(dest)), Param::Byte(register_byte(src))]))
                }
                _ => Err(shape_error(m, loc)),
            }
        }

        "LDA" | "LDAH" | "LDAL" => {
            let (absolute_op, indirect_op): (u8, u8) = match m {
                "LDA" => (0x09, 0x72),
                "LDAH" => (0x0B, 0x73),
                _ => (0x0C, 0x74),
            };
            match ops {
                [Operand::Register(dest), addr] => {
                    if let Some(reg_param) = register_indirect_param(addr) {
                        Ok((indirect_op, vec![Param::Byte(register_byte(dest)), reg_param]))
                    } else {
                        let addr_param = absolute_addr_param(addr, m, loc)?;
                        Ok((absolute_op, vec![Param::Byte(register_byte(dest)), addr_param]))
                    }
                }
                _ => Err(shape_error(m, loc)),
            }
        }

        "LDAB" => match ops {
            [Operand::Register(dest), addr] => {
                let addr_param = absolute_addr_param(addr, m, loc)?;
                Ok((0x0A, vec![Param::Byte(register_byte(dest)), addr_param]))
            }
            _ => Err(shape_error(m, loc)),
        },

        "STA" | "STAH" | "STAL" => {
            let opcode = match m {
                "STA" => 0x0D,
                "STAH" => 0x0E,
                _ => 0x0F,
            };
            match ops {
                [addr, Operand::Register(r)] => {
                    let addr_param = absolute_addr_param(addr, m, loc)?;
                    Ok((opcode, vec![addr_param, Param::Byte(register_byte(r))]))
                }
                _ => Err(shape_error(m, loc)),
            }
        }

        "PUSH" | "PUSHH" | "PUSHL" | "POP" | "POPH" | "POPL" => match ops {
            [Operand::Register(r)] => Ok((opcode_for(m, 0)?, vec![Param::Byte(register_byte(r))])),
            _ => Err(shape_error(m, loc)),
        },

        "PEEKB" | "PEEKW" | "PEEKFB" | "PEEKFW" => match ops {
            [Operand::Register(r), Operand::Number(off)] => {
                let mut params = vec![Param::Byte(register_byte(r))];
                params.extend(word_bytes(*off));
                Ok((opcode_for(m, 0)?, params))
            }
            _ => Err(shape_error(m, loc)),
        },

        "PAGE" => match ops {
            [Operand::Number(n)] => Ok((0x1B, word_bytes(*n))),
            [Operand::Register(r)] => Ok((0x1C, vec![Param::Byte(register_byte(r))])),
            [Operand::Ident(name)] => Ok((0x1B, vec![Param::PageRef(name.clone())])),
            _ => Err(shape_error(m, loc)),
        },

        "SETF" => match ops {
            [Operand::Number(n)] => Ok((0x1D, word_bytes(*n))),
            _ => Err(shape_error(m, loc)),
        },

        "JMP" | "JPZ" | "JPNZ" | "JPC" | "JPNC" | "JPS" | "JPNS" | "JPO" | "JPNO" => match ops {
            [addr] => {
                let param = absolute_addr_param(addr, m, loc)?;
                Ok((opcode_for(m, 0)?, vec![param]))
            }
            _ => Err(shape_error(m, loc)),
        },

        "CALL" => match ops {
            [addr, Operand::Number(flag)] => {
                let param = absolute_addr_param(addr, m, loc)?;
                Ok((0x27, vec![param, Param::Byte(*flag as u8)]))
            }
            [addr] => {
                let param = absolute_addr_param(addr, m, loc)?;
                Ok((0x27, vec![param, Param::Byte(0)]))
            }
            _ => Err(shape_error(m, loc)),
        },

        "PUSHW" => match ops {
            [Operand::Number(n)] => Ok((0x75, word_bytes(*n))),
            _ => Err(shape_error(m, loc)),
        },
        "PUSHB" => match ops {
            [Operand::Number(n)] => Ok((0x76, vec![Param::Byte(*n as u8)])),
            _ => Err(shape_error(m, loc)),
        },

        "SYS" => match ops {
            [Operand::Number(n)] => Ok((0x7F, word_bytes(*n))),
            _ => Err(shape_error(m, loc)),
        },

        "CMP" => match ops {
            [Operand::Number(n)] => Ok((0x6C, word_bytes(*n))),
            [Operand::Register(r)] => Ok((0x6D, vec![Param::Byte(register_byte(r))])),
            _ => Err(shape_error(m, loc)),
        },
        "CPH" => match ops {
            [Operand::Number(n)] => Ok((0x6E, vec![Param::Byte(*n as u8)])),
            [Operand::Register(r)] => Ok((0x6F, vec![Param::Byte(register_byte(r))])),
            _ => Err(shape_error(m, loc)),
        },
        "CPL" => match ops {
            [Operand::Number(n)] => Ok((0x70, vec![Param::Byte(*n as u8)])),
            [Operand::Register(r)] => Ok((0x71, vec![Param::Byte(register_byte(r))])),
            _ => Err(shape_error(m, loc)),
        },

        "ADD" => arith_family!("ADD", "ADD", "ADB", "ADH", "ADL"),
        "ADB" => arith_family!("ADD", "ADD", "ADB", "ADH", "ADL"),
        "ADH" => arith_family!("ADD", "ADD", "ADB", "ADH", "ADL"),
        "ADL" => arith_family!("ADD", "ADD", "ADB", "ADH", "ADL"),

        "SUB" => arith_family!("SUB", "SUB", "SBB", "SBH", "SBL"),
        "SBB" => arith_family!("SUB", "SUB", "SBB", "SBH", "SBL"),
        "SBH" => arith_family!("SUB", "SUB", "SBB", "SBH", "SBL"),
        "SBL" => arith_family!("SUB", "SUB", "SBB", "SBH", "SBL"),

        "MUL" => arith_family!("MUL", "MUL", "MLB", "MLH", "MLL"),
        "MLB" => arith_family!("MUL", "MUL", "MLB", "MLH", "MLL"),
        "MLH" => arith_family!("MUL", "MUL", "MLB", "MLH", "MLL"),
        "MLL" => arith_family!("MUL", "MUL", "MLB", "MLH", "MLL"),

        "DIV" => arith_family!("DIV", "DIV", "DVB", "DVH", "DVL"),
        "DVB" => arith_family!("DIV", "DIV", "DVB", "DVH", "DVL"),
        "DVH" => arith_family!("DIV", "DIV", "DVB", "DVH", "DVL"),
        "DVL" => arith_family!("DIV", "DIV", "DVB", "DVH", "DVL"),

        "REM" => arith_family!("REM", "REM", "RMB", "RMH", "RML"),
        "RMB" => arith_family!("REM", "REM", "RMB", "RMH", "RML"),
        "RMH" => arith_family!("REM", "REM", "RMB", "RMH", "RML"),
        "RML" => arith_family!("REM", "REM", "RMB", "RMH", "RML"),

        "AND" => arith_family!("AND", "AND", "ANB", "ANH", "ANL"),
        "ANB" => arith_family!("AND", "AND", "ANB", "ANH", "ANL"),
        "ANH" => arith_family!("AND", "AND", "ANB", "ANH", "ANL"),
        "ANL" => arith_family!("AND", "AND", "ANB", "ANH", "ANL"),

        "OR" => arith_family!("OR", "OR", "ORB", "ORH", "ORL"),
        "ORB" => arith_family!("OR", "OR", "ORB", "ORH", "ORL"),
        "ORH" => arith_family!("OR", "OR", "ORB", "ORH", "ORL"),
        "ORL" => arith_family!("OR", "OR", "ORB", "ORH", "ORL"),

        "XOR" => arith_family!("XOR", "XOR", "XOB", "XOH", "XOL"),
        "XOB" => arith_family!("XOR", "XOR", "XOB", "XOH", "XOL"),
        "XOH" => arith_family!("XOR", "XOR", "XOB", "XOH", "XOL"),
        "XOL" => arith_family!("XOR", "XOR", "XOB", "XOH", "XOL"),

        "NOT" => arith_family!("NOT", "NOT", "NOTB", "NOTH", "NOTL"),
        "NOTB" => arith_family!("NOT", "NOT", "NOTB", "NOTH", "NOTL"),
        "NOTH" => arith_family!("NOT", "NOT", "NOTB", "NOTH", "NOTL"),
        "NOTL" => arith_family!("NOT", "NOT", "NOTB", "NOTH", "NOTL"),

        "SHL" => arith_family!("SHL", "SHL", "SLB", "SLH", "SLL"),
        "SLB" => arith_family!("SHL", "SHL", "SLB", "SLH", "SLL"),
        "SLH" => arith_family!("SHL", "SHL", "SLB", "SLH", "SLL"),
        "SLL" => arith_family!("SHL", "SHL", "SLB", "SLH", "SLL"),

        "SHR" => arith_family!("SHR", "SHR", "SRB", "SRH", "SRL"),
        "SRB" => arith_family!("SHR", "SHR", "SRB", "SRH", "SRL"),
        "SRH" => arith_family!("SHR", "SHR", "SRB", "SRH", "SRL"),
        "SRL" => arith_family!("SHR", "SHR", "SRB", "SRH", "SRL"),

        "ROL" => arith_family!("ROL", "ROL", "RLB", "RLH", "RLL"),
        "RLB" => arith_family!("ROL", "ROL", "RLB", "RLH", "RLL"),
        "RLH" => arith_family!("ROL", "ROL", "RLB", "RLH", "RLL"),
        "RLL" => arith_family!("ROL", "ROL", "RLB", "RLH", "RLL"),

        "ROR" => arith_family!("ROR", "ROR", "RRB", "RRH", "RRL"),
        "RRB" => arith_family!("ROR", "ROR", "RRB", "RRH", "RRL"),
        "RRH" => arith_family!("ROR", "ROR", "RRB", "RRH", "RRL"),
        "RRL" => arith_family!("ROR", "ROR", "RRB", "RRH", "RRL"),

        other => Err(Diagnostic {
            location: loc,
            kind: LayoutErrorKind::UnknownMnemonic(other.to_string()).into(),
        }),
    }
}

/// Looks up the opcode byte for `mnemonic` by candidate index (0 = the
/// lower/word-shaped opcode when two share a name, as laid out in
/// `opcodes::OPCODE_TABLE`).
fn opcode_for(mnemonic: &str, candidate: usize) -> Result<u8, Diagnostic> {
    let mut candidates = crate::opcodes::opcodes_for_mnemonic(mnemonic);
    candidates.sort_unstable();
    candidates.get(candidate).copied().ok_or_else(|| Diagnostic {
        location: Location::default(),
        kind: LayoutErrorKind::UnknownMnemonic(mnemonic.to_string()).into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::lexer::Lexer;
    use crate::assembler::parser::Parser;
    use crate::assembler::rewrite::rewrite;

    fn graph_for(src: &str) -> (CodeGraph, Vec<Diagnostic>) {
        let (tokens, _) = Lexer::new(src).tokenize();
        let (mut program, _) = Parser::new(tokens).parse_program();
        rewrite(&mut program);
        build(&program)
    }

    #[test]
    fn lowers_ld_immediate_and_register_forms() {
        let (graph, diags) = graph_for("CODE\nLD AX,10\nLD CX,AX\n");
        assert!(diags.is_empty(), "{diags:?}");
        let CodeNode::Instruction { opcode, params, .. } = &graph.code_nodes[0] else { panic!() };
        assert_eq!(*opcode, 0x02);
        assert_eq!(params, &[Param::Byte(1), Param::Byte(10), Param::Byte(0)]);
        let CodeNode::Instruction { opcode, .. } = &graph.code_nodes[1] else { panic!() };
        assert_eq!(*opcode, 0x03);
    }

    #[test]
    fn lowers_add_immediate_vs_register_shapes() {
        let (graph, diags) = graph_for("CODE\nADD 5\nADD CX\n");
        assert!(diags.is_empty(), "{diags:?}");
        let CodeNode::Instruction { opcode, .. } = &graph.code_nodes[0] else { panic!() };
        assert_eq!(*opcode, 0x29);
        let CodeNode::Instruction { opcode, .. } = &graph.code_nodes[1] else { panic!() };
        assert_eq!(*opcode, 0x2A);
    }

    #[test]
    fn lowers_add_with_explicit_accumulator_operand() {
        let (graph, diags) = graph_for("CODE\nADD AX,CX\n");
        assert!(diags.is_empty(), "{diags:?}");
        let CodeNode::Instruction { opcode, params, .. } = &graph.code_nodes[0] else { panic!() };
        assert_eq!(*opcode, 0x2A);
        assert_eq!(params, &[Param::Byte(3)]);
    }

    #[test]
    fn lowers_jump_to_address_ref() {
        let (graph, diags) = graph_for("CODE\nL: JPNZ L\n");
        assert!(diags.is_empty(), "{diags:?}");
        let CodeNode::Instruction { opcode, params, .. } = &graph.code_nodes[1] else { panic!() };
        assert_eq!(*opcode, 0x20);
        assert_eq!(params, &[Param::AddressRef { symbol: "L".into(), offset: 0 }]);
    }

    #[test]
    fn lowers_register_indirect_lda() {
        let (graph, diags) = graph_for("CODE\nLDA AX,(BX)\n");
        assert!(diags.is_empty(), "{diags:?}");
        let CodeNode::Instruction { opcode, params, .. } = &graph.code_nodes[0] else { panic!() };
        assert_eq!(*opcode, 0x72);
        assert_eq!(params, &[Param::Byte(1), Param::Byte(2)]);
    }

    #[test]
    fn rejects_compound_symbol_and_register_address() {
        let (_graph, diags) = graph_for("CODE\nLDA AX,(text+2+BX)\n");
        assert!(!diags.is_empty());
    }

    #[test]
    fn builds_data_blocks_and_address_arrays() {
        let (graph, _diags) = graph_for("DATA\nx: DB [1,2,3]\ny: DA [x]\n");
        assert_eq!(graph.data_nodes.len(), 2);
    }
}
