//! `AND`/`OR`/`XOR`/`NOT` across the same five operand shapes as
//! [`crate::instructions::arithmetic`] (spec §4.5, §4.7, §6.1 opcodes
//! 0x42-0x55).
//!
//! Grounded on the teacher's `and.rs`/`ora.rs`/`eor.rs`, generalized the
//! same way the arithmetic family is. `NOT` has no left-hand operand on
//! the 6502 (`EOR #$FF` is the usual trick); Pendragon gives it all
//! five shapes anyway, so it writes the complement of its operand into
//! `AX` rather than complementing `AX` itself (spec §9).

use crate::alu::AluOp;
use crate::cpu::Cpu;
use crate::error::ExecutionError;

impl Cpu {
    pub(crate) fn dispatch_logical(&mut self, opcode: u8) -> Result<(), ExecutionError> {
        let (base, op) = match opcode {
            0x42..=0x46 => (0x42, AluOp::And),
            0x47..=0x4B => (0x47, AluOp::Or),
            0x4C..=0x50 => (0x4C, AluOp::Xor),
            0x51..=0x55 => (0x51, AluOp::Not),
            other => return Err(ExecutionError::UnknownOpcode(other)),
        };
        self.apply_five_shape(base, op, opcode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::tests::fresh_cpu;
    use crate::registers::RegisterName;
    use crate::syscall::RecordingConsole;

    #[test]
    fn and_immediate_word_masks_bits() {
        let (mut vmu, mut cpu) = fresh_cpu(16, 16, 16);
        cpu.regs.set_value(RegisterName::Ax, 0xFF0F, &mut cpu.flags);
        cpu.iu.load_program(&mut vmu, &[0x42, 0x0F, 0xF0]).unwrap();
        let mut console = RecordingConsole::default();
        cpu.step(&mut vmu, &mut console).unwrap();
        assert_eq!(cpu.regs.get_value(RegisterName::Ax), 0xF00F);
    }

    #[test]
    fn not_writes_complement_of_operand_not_of_ax() {
        let (mut vmu, mut cpu) = fresh_cpu(16, 16, 16);
        cpu.regs.set_value(RegisterName::Ax, 0x1234, &mut cpu.flags);
        cpu.regs.set_value(RegisterName::Bx, 0x00FF, &mut cpu.flags);
        cpu.iu.load_program(&mut vmu, &[0x52, 0x02]).unwrap();
        let mut console = RecordingConsole::default();
        cpu.step(&mut vmu, &mut console).unwrap();
        assert_eq!(cpu.regs.get_value(RegisterName::Ax), 0xFF00);
    }

    #[test]
    fn xor_register_low_byte() {
        let (mut vmu, mut cpu) = fresh_cpu(16, 16, 16);
        cpu.regs.set_value(RegisterName::Ax, 0x0F, &mut cpu.flags);
        cpu.regs.set_value(RegisterName::Bx, 0xFF, &mut cpu.flags);
        cpu.iu.load_program(&mut vmu, &[0x50, 0x02]).unwrap();
        let mut console = RecordingConsole::default();
        cpu.step(&mut vmu, &mut console).unwrap();
        assert_eq!(cpu.regs.get_low_byte(RegisterName::Ax), 0xF0);
    }
}
