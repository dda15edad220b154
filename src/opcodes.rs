//! Byte <-> mnemonic <-> operand-length mapping (spec §3 "Opcode arity
//! table", §6.1).
//!
//! Grounded on the teacher's `CPU::OPERAND_MAP` (`cpu6502.rs`), a
//! `phf::Map<u8, Operand>` built at compile time; generalized from one
//! entry per 6502 opcode+addressing-mode pair to Pendragon's contiguous
//! opcode ranges, where arity is a function of the opcode byte alone.

use phf::phf_map;

/// Number of additional parameter bytes following an opcode byte.
pub type Arity = u8;

/// Static opcode -> (mnemonic, arity) table. `PUSHW`/`PUSHB` (0x75/0x76)
/// are the immediate-push opcodes spec §9's Open Questions calls for to
/// resolve the `PUSH`-family arity inconsistency.
pub static OPCODE_TABLE: phf::Map<u8, (&'static str, Arity)> = phf_map! {
    0x00u8 => ("NOP", 0),
    0x01u8 => ("HALT", 0),
    0x02u8 => ("LD", 3),
    0x03u8 => ("LD", 2),
    0x04u8 => ("SWP", 2),
    0x05u8 => ("LDH", 2),
    0x06u8 => ("LDH", 2),
    0x07u8 => ("LDL", 2),
    0x08u8 => ("LDL", 2),
    0x09u8 => ("LDA", 3),
    0x0Au8 => ("LDAB", 3),
    0x0Bu8 => ("LDAH", 3),
    0x0Cu8 => ("LDAL", 3),
    0x0Du8 => ("STA", 3),
    0x0Eu8 => ("STAH", 3),
    0x0Fu8 => ("STAL", 3),

    0x10u8 => ("PUSH", 1),
    0x11u8 => ("PUSHH", 1),
    0x12u8 => ("PUSHL", 1),
    0x13u8 => ("POP", 1),
    0x14u8 => ("POPH", 1),
    0x15u8 => ("POPL", 1),
    0x16u8 => ("PEEKB", 3),
    0x17u8 => ("PEEKW", 3),
    0x18u8 => ("PEEKFB", 3),
    0x19u8 => ("PEEKFW", 3),
    0x1Au8 => ("FLSH", 0),
    0x1Bu8 => ("PAGE", 2),
    0x1Cu8 => ("PAGE", 1),
    0x1Du8 => ("SETF", 2),

    0x1Eu8 => ("JMP", 2),
    0x1Fu8 => ("JPZ", 2),
    0x20u8 => ("JPNZ", 2),
    0x21u8 => ("JPC", 2),
    0x22u8 => ("JPNC", 2),
    0x23u8 => ("JPS", 2),
    0x24u8 => ("JPNS", 2),
    0x25u8 => ("JPO", 2),
    0x26u8 => ("JPNO", 2),

    0x27u8 => ("CALL", 3),
    0x28u8 => ("RET", 0),

    0x29u8 => ("ADD", 2),
    0x2Au8 => ("ADD", 1),
    0x2Bu8 => ("ADB", 1),
    0x2Cu8 => ("ADH", 1),
    0x2Du8 => ("ADL", 1),

    0x2Eu8 => ("SUB", 2),
    0x2Fu8 => ("SUB", 1),
    0x30u8 => ("SBB", 1),
    0x31u8 => ("SBH", 1),
    0x32u8 => ("SBL", 1),

    0x33u8 => ("MUL", 2),
    0x34u8 => ("MUL", 1),
    0x35u8 => ("MLB", 1),
    0x36u8 => ("MLH", 1),
    0x37u8 => ("MLL", 1),

    0x38u8 => ("DIV", 2),
    0x39u8 => ("DIV", 1),
    0x3Au8 => ("DVB", 1),
    0x3Bu8 => ("DVH", 1),
    0x3Cu8 => ("DVL", 1),

    0x3Du8 => ("REM", 2),
    0x3Eu8 => ("REM", 1),
    0x3Fu8 => ("RMB", 1),
    0x40u8 => ("RMH", 1),
    0x41u8 => ("RML", 1),

    0x42u8 => ("AND", 2),
    0x43u8 => ("AND", 1),
    0x44u8 => ("ANB", 1),
    0x45u8 => ("ANH", 1),
    0x46u8 => ("ANL", 1),

    0x47u8 => ("OR", 2),
    0x48u8 => ("OR", 1),
    0x49u8 => ("ORB", 1),
    0x4Au8 => ("ORH", 1),
    0x4Bu8 => ("ORL", 1),

    0x4Cu8 => ("XOR", 2),
    0x4Du8 => ("XOR", 1),
    0x4Eu8 => ("XOB", 1),
    0x4Fu8 => ("XOH", 1),
    0x50u8 => ("XOL", 1),

    0x51u8 => ("NOT", 2),
    0x52u8 => ("NOT", 1),
    0x53u8 => ("NOTB", 1),
    0x54u8 => ("NOTH", 1),
    0x55u8 => ("NOTL", 1),

    0x56u8 => ("SHL", 2),
    0x57u8 => ("SHL", 1),
    0x58u8 => ("SLB", 1),
    0x59u8 => ("SLH", 1),
    0x5Au8 => ("SLL", 1),

    0x5Bu8 => ("SHR", 2),
    0x5Cu8 => ("SHR", 1),
    0x5Du8 => ("SRB", 1),
    0x5Eu8 => ("SRH", 1),
    0x5Fu8 => ("SRL", 1),

    0x60u8 => ("ROL", 2),
    0x61u8 => ("ROL", 1),
    0x62u8 => ("RLB", 1),
    0x63u8 => ("RLH", 1),
    0x64u8 => ("RLL", 1),

    0x65u8 => ("ROR", 2),
    0x66u8 => ("ROR", 1),
    0x67u8 => ("RRB", 1),
    0x68u8 => ("RRH", 1),
    0x69u8 => ("RRL", 1),

    0x6Au8 => ("INC", 1),
    0x6Bu8 => ("DEC", 1),

    0x6Cu8 => ("CMP", 2),
    0x6Du8 => ("CMP", 1),
    0x6Eu8 => ("CPH", 1),
    0x6Fu8 => ("CPH", 1),
    0x70u8 => ("CPL", 1),
    0x71u8 => ("CPL", 1),

    0x72u8 => ("LDA", 2),
    0x73u8 => ("LDAH", 2),
    0x74u8 => ("LDAL", 2),

    0x75u8 => ("PUSHW", 2),
    0x76u8 => ("PUSHB", 1),

    0x7Fu8 => ("SYS", 2),
};

pub fn arity_of(opcode: u8) -> Option<Arity> {
    OPCODE_TABLE.get(&opcode).map(|(_, a)| *a)
}

pub fn mnemonic_of(opcode: u8) -> Option<&'static str> {
    OPCODE_TABLE.get(&opcode).map(|(m, _)| *m)
}

/// Reverse lookup used by the assembler's code-graph builder (pass 3).
/// Mnemonics map to more than one opcode when several operand shapes
/// share a name (e.g. `ADD` immediate-word vs `ADD` register-word); the
/// caller disambiguates by operand shape.
pub fn opcodes_for_mnemonic(mnemonic: &str) -> Vec<u8> {
    OPCODE_TABLE
        .entries()
        .filter(|(_, (m, _))| *m == mnemonic)
        .map(|(&byte, _)| byte)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_table_covers_control_opcodes() {
        assert_eq!(arity_of(0x00), Some(0));
        assert_eq!(arity_of(0x01), Some(0));
        assert_eq!(arity_of(0x1A), Some(0));
        assert_eq!(arity_of(0x28), Some(0));
    }

    #[test]
    fn unknown_opcode_has_no_arity() {
        assert_eq!(arity_of(0x80), None);
        assert_eq!(arity_of(0xFF), None);
    }

    #[test]
    fn word_immediate_loads_are_three_bytes() {
        assert_eq!(arity_of(0x02), Some(3));
        assert_eq!(arity_of(0x09), Some(3));
    }

    #[test]
    fn mnemonic_lookup() {
        assert_eq!(mnemonic_of(0x28), Some("RET"));
        assert_eq!(mnemonic_of(0x7F), Some("SYS"));
    }

    #[test]
    fn reverse_lookup_finds_all_shapes() {
        let adds = opcodes_for_mnemonic("ADD");
        assert_eq!(adds.len(), 2);
        assert!(adds.contains(&0x29));
        assert!(adds.contains(&0x2A));
    }
}
