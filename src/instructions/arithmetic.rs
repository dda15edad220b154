//! `ADD`/`SUB`/`MUL`/`DIV`/`REM`, each across the five operand shapes
//! the assembler's sugar rewriter targets: immediate word, register
//! word, immediate byte, register high byte, register low byte (spec
//! §4.5, §4.7, §6.1 opcodes 0x29-0x41).
//!
//! Grounded on the teacher's `adc.rs`/`sbc.rs` flag math, generalized
//! from 6502 addressing modes to Pendragon's shape family and routed
//! through the shared [`crate::alu::Alu`] instead of inlining carry
//! math per opcode.

use crate::alu::{Alu, AluOp};
use crate::cpu::Cpu;
use crate::error::ExecutionError;
use crate::registers::RegisterName;

fn reg(byte: u8) -> Result<RegisterName, ExecutionError> {
    RegisterName::from_byte(byte).ok_or(ExecutionError::UnknownOpcode(byte))
}

impl Cpu {
    pub(crate) fn dispatch_arithmetic(&mut self, opcode: u8) -> Result<(), ExecutionError> {
        let (base, op) = match opcode {
            0x29..=0x2D => (0x29, AluOp::Add),
            0x2E..=0x32 => (0x2E, AluOp::Sub),
            0x33..=0x37 => (0x33, AluOp::Mul),
            0x38..=0x3C => (0x38, AluOp::Div),
            0x3D..=0x41 => (0x3D, AluOp::Rem),
            other => return Err(ExecutionError::UnknownOpcode(other)),
        };
        self.apply_five_shape(base, op, opcode)
    }

    /// Dispatches one of the five operand shapes shared by the
    /// arithmetic, logical, and shift/rotate opcode families: `base`
    /// (imm16), `base+1` (reg word), `base+2` (imm8), `base+3` (reg
    /// high byte), `base+4` (reg low byte).
    pub(crate) fn apply_five_shape(&mut self, base: u8, op: AluOp, opcode: u8) -> Result<(), ExecutionError> {
        match opcode - base {
            0 => {
                let operand = u16::from_le_bytes([self.params[0], self.params[1]]);
                Alu::apply_word(op, &mut self.regs, &mut self.flags, operand)?;
            }
            1 => {
                let src = reg(self.params[0])?;
                let operand = self.regs.get_value(src);
                Alu::apply_word(op, &mut self.regs, &mut self.flags, operand)?;
            }
            2 => {
                Alu::apply_byte(op, &mut self.regs, &mut self.flags, self.params[0])?;
            }
            3 => {
                let src = reg(self.params[0])?;
                let operand = self.regs.get_high_byte(src);
                Alu::apply_byte(op, &mut self.regs, &mut self.flags, operand)?;
            }
            4 => {
                let src = reg(self.params[0])?;
                let operand = self.regs.get_low_byte(src);
                Alu::apply_byte(op, &mut self.regs, &mut self.flags, operand)?;
            }
            _ => unreachable!("BUG: opcode outside its five-shape family"),
        }
        Ok(())
    }
}
