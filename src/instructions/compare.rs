//! `CMP`/`CPH`/`CPL`: signed comparison against AX, its high byte, or
//! its low byte, written back as -1/0/1 (spec §4.5, §4.7, §6.1 opcodes
//! 0x6C-0x71).
//!
//! Grounded on the teacher's `cmp.rs`, generalized from setting
//! carry/zero flags only into also overwriting `AX` with a tri-state
//! outcome, the convention spec §4.5 uses so a `CMP` result can feed
//! straight into a conditional jump without a separate compare-and-test
//! step.

use crate::alu::Alu;
use crate::cpu::Cpu;
use crate::error::ExecutionError;
use crate::registers::RegisterName;

fn reg(byte: u8) -> Result<RegisterName, ExecutionError> {
    RegisterName::from_byte(byte).ok_or(ExecutionError::UnknownOpcode(byte))
}

impl Cpu {
    pub(crate) fn dispatch_compare(&mut self, opcode: u8) -> Result<(), ExecutionError> {
        match opcode {
            0x6C => {
                let operand = u16::from_le_bytes([self.params[0], self.params[1]]);
                Alu::compare_word(&mut self.regs, &mut self.flags, operand)
            }
            0x6D => {
                let src = reg(self.params[0])?;
                let operand = self.regs.get_value(src);
                Alu::compare_word(&mut self.regs, &mut self.flags, operand)
            }
            0x6E => Alu::compare_byte(&mut self.regs, &mut self.flags, self.params[0], true),
            0x6F => {
                let src = reg(self.params[0])?;
                let operand = self.regs.get_low_byte(src);
                Alu::compare_byte(&mut self.regs, &mut self.flags, operand, true)
            }
            0x70 => Alu::compare_byte(&mut self.regs, &mut self.flags, self.params[0], false),
            0x71 => {
                let src = reg(self.params[0])?;
                let operand = self.regs.get_low_byte(src);
                Alu::compare_byte(&mut self.regs, &mut self.flags, operand, false)
            }
            other => Err(ExecutionError::UnknownOpcode(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::tests::fresh_cpu;
    use crate::syscall::RecordingConsole;

    #[test]
    fn cmp_word_writes_tri_state_outcome() {
        let (mut vmu, mut cpu) = fresh_cpu(16, 16, 16);
        cpu.regs.set_value(RegisterName::Ax, 5, &mut cpu.flags);
        cpu.iu.load_program(&mut vmu, &[0x6C, 0x0A, 0x00]).unwrap();
        let mut console = RecordingConsole::default();
        cpu.step(&mut vmu, &mut console).unwrap();
        assert_eq!(cpu.regs.get_value(RegisterName::Ax), 0xFFFF);
    }

    #[test]
    fn cph_compares_high_byte_against_register_low_byte() {
        let (mut vmu, mut cpu) = fresh_cpu(16, 16, 16);
        cpu.regs.set_value(RegisterName::Ax, 0x0A00, &mut cpu.flags);
        cpu.regs.set_value(RegisterName::Bx, 0x0A, &mut cpu.flags);
        cpu.iu.load_program(&mut vmu, &[0x6F, 0x02]).unwrap();
        let mut console = RecordingConsole::default();
        cpu.step(&mut vmu, &mut console).unwrap();
        assert_eq!(cpu.regs.get_value(RegisterName::Ax), 0x0000);
    }
}
