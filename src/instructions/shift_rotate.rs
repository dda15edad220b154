//! `SHL`/`SHR`/`ROL`/`ROR` across the same five operand shapes as
//! [`crate::instructions::arithmetic`] (spec §4.5, §4.7, §6.1 opcodes
//! 0x56-0x69). The shift/rotate amount is always the operand value
//! itself, taken modulo the operand width per spec §9.
//!
//! Grounded on the teacher's `asl.rs`/`lsr.rs`/`rol.rs`/`ror.rs`,
//! generalized from a fixed one-bit shift to a variable shift/rotate
//! count carried as the instruction's operand.

use crate::alu::AluOp;
use crate::cpu::Cpu;
use crate::error::ExecutionError;

impl Cpu {
    pub(crate) fn dispatch_shift_rotate(&mut self, opcode: u8) -> Result<(), ExecutionError> {
        let (base, op) = match opcode {
            0x56..=0x5A => (0x56, AluOp::Shl),
            0x5B..=0x5F => (0x5B, AluOp::Shr),
            0x60..=0x64 => (0x60, AluOp::Rol),
            0x65..=0x69 => (0x65, AluOp::Ror),
            other => return Err(ExecutionError::UnknownOpcode(other)),
        };
        self.apply_five_shape(base, op, opcode)
    }
}
