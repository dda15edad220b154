//! Push/pop/peek and frame-pointer control over the data stack (spec
//! §4.3, §4.7, §6.1 opcodes 0x10-0x1A, 0x1D).
//!
//! Grounded on the teacher's `pha.rs`/`pla.rs` pair, generalized from a
//! single byte-wide accumulator push to word/high-byte/low-byte pushes
//! across all five general-purpose registers, plus the frame-relative
//! peeks the 6502's flat stack page has no equivalent for.

use crate::cpu::Cpu;
use crate::error::ExecutionError;
use crate::memory::{AccessMode, MemoryUnit};
use crate::registers::RegisterName;

fn reg(byte: u8) -> Result<RegisterName, ExecutionError> {
    RegisterName::from_byte(byte).ok_or(ExecutionError::UnknownOpcode(byte))
}

impl Cpu {
    pub(crate) fn dispatch_stack(&mut self, vmu: &mut MemoryUnit, opcode: u8) -> Result<(), ExecutionError> {
        match opcode {
            0x10 => {
                let r = reg(self.params[0])?;
                let mut acc = self.stack.get_accessor(vmu, AccessMode::ReadWrite)?;
                self.stack.push_word(&mut acc, self.regs.get_value(r))?;
            }
            0x11 => {
                let r = reg(self.params[0])?;
                let mut acc = self.stack.get_accessor(vmu, AccessMode::ReadWrite)?;
                self.stack.push_byte(&mut acc, self.regs.get_high_byte(r))?;
            }
            0x12 => {
                let r = reg(self.params[0])?;
                let mut acc = self.stack.get_accessor(vmu, AccessMode::ReadWrite)?;
                self.stack.push_byte(&mut acc, self.regs.get_low_byte(r))?;
            }
            0x13 => {
                let r = reg(self.params[0])?;
                let mut acc = self.stack.get_accessor(vmu, AccessMode::ReadWrite)?;
                let value = self.stack.pop_word(&mut acc)?;
                self.regs.set_value(r, value, &mut self.flags);
            }
            0x14 => {
                let r = reg(self.params[0])?;
                let mut acc = self.stack.get_accessor(vmu, AccessMode::ReadWrite)?;
                let value = self.stack.pop_byte(&mut acc)?;
                self.regs.set_high_byte(r, value);
            }
            0x15 => {
                let r = reg(self.params[0])?;
                let mut acc = self.stack.get_accessor(vmu, AccessMode::ReadWrite)?;
                let value = self.stack.pop_byte(&mut acc)?;
                self.regs.set_low_byte(r, value);
            }
            0x16 => {
                let r = reg(self.params[0])?;
                let off = u16::from_le_bytes([self.params[1], self.params[2]]) as u32;
                let acc = self.stack.get_accessor(vmu, AccessMode::ReadOnly)?;
                let value = self.stack.peek_byte_from_base(&acc, off)? as u16;
                self.regs.set_value(r, value, &mut self.flags);
            }
            0x17 => {
                let r = reg(self.params[0])?;
                let off = u16::from_le_bytes([self.params[1], self.params[2]]) as u32;
                let acc = self.stack.get_accessor(vmu, AccessMode::ReadOnly)?;
                let value = self.stack.peek_word_from_base(&acc, off)?;
                self.regs.set_value(r, value, &mut self.flags);
            }
            0x18 => {
                let r = reg(self.params[0])?;
                let off = i16::from_le_bytes([self.params[1], self.params[2]]) as i32;
                let acc = self.stack.get_accessor(vmu, AccessMode::ReadOnly)?;
                let value = self.stack.peek_byte_from_frame(&acc, off)? as u16;
                self.regs.set_value(r, value, &mut self.flags);
            }
            0x19 => {
                let r = reg(self.params[0])?;
                let off = i16::from_le_bytes([self.params[1], self.params[2]]) as i32;
                let acc = self.stack.get_accessor(vmu, AccessMode::ReadOnly)?;
                let value = self.stack.peek_word_from_frame(&acc, off)?;
                self.regs.set_value(r, value, &mut self.flags);
            }
            0x1A => self.stack.flush(),
            0x1D => {
                let off = i16::from_le_bytes([self.params[0], self.params[1]]);
                self.stack.set_frame_pointer(off as i32);
            }
            other => return Err(ExecutionError::UnknownOpcode(other)),
        }
        Ok(())
    }

    /// `PAGE` is a no-op on the code context (spec §4.6 fixes it to page
    /// 0); it selects the data context's current page for the following
    /// absolute-address loads/stores (spec §9).
    pub(crate) fn dispatch_page_select(&mut self, vmu: &mut MemoryUnit, opcode: u8) -> Result<(), ExecutionError> {
        let page = match opcode {
            0x1B => u16::from_le_bytes([self.params[0], self.params[1]]),
            0x1C => {
                let r = reg(self.params[0])?;
                self.regs.get_value(r)
            }
            other => return Err(ExecutionError::UnknownOpcode(other)),
        };
        let mut acc = self.data_accessor(vmu, AccessMode::ReadWrite)?;
        acc.set_page(page);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::tests::fresh_cpu;
    use crate::syscall::RecordingConsole;

    #[test]
    fn push_word_then_pop_round_trips() {
        let (mut vmu, mut cpu) = fresh_cpu(16, 16, 16);
        cpu.regs.set_value(RegisterName::Ax, 0x5678, &mut cpu.flags);
        cpu.iu.load_program(&mut vmu, &[0x10, 0x01, 0x13, 0x02]).unwrap();
        let mut console = RecordingConsole::default();
        cpu.step(&mut vmu, &mut console).unwrap();
        cpu.step(&mut vmu, &mut console).unwrap();
        assert_eq!(cpu.regs.get_value(RegisterName::Bx), 0x5678);
    }

    #[test]
    fn peek_from_base_does_not_consume() {
        let (mut vmu, mut cpu) = fresh_cpu(16, 16, 16);
        cpu.regs.set_value(RegisterName::Ax, 9, &mut cpu.flags);
        cpu.iu.load_program(&mut vmu, &[0x10, 0x01, 0x17, 0x02, 0x00, 0x00]).unwrap();
        let mut console = RecordingConsole::default();
        cpu.step(&mut vmu, &mut console).unwrap();
        cpu.step(&mut vmu, &mut console).unwrap();
        assert_eq!(cpu.regs.get_value(RegisterName::Bx), 9);
        assert_eq!(cpu.stack.sp(), 2);
    }

    #[test]
    fn flush_collapses_stack_without_touching_registers() {
        let (mut vmu, mut cpu) = fresh_cpu(16, 16, 16);
        cpu.iu.load_program(&mut vmu, &[0x10, 0x01, 0x1A]).unwrap();
        let mut console = RecordingConsole::default();
        cpu.step(&mut vmu, &mut console).unwrap();
        cpu.stack.set_frame_to_top();
        cpu.step(&mut vmu, &mut console).unwrap();
        assert_eq!(cpu.stack.sp(), 2);
    }

    #[test]
    fn page_select_switches_data_context_page() {
        let (mut vmu, mut cpu) = fresh_cpu(16, 1 << 17, 16);
        {
            let mut acc = cpu.data_accessor(&mut vmu, AccessMode::ReadWrite).unwrap();
            acc.write_byte(0, 0xAA).unwrap();
        }
        cpu.iu.load_program(&mut vmu, &[0x1B, 0x01, 0x00]).unwrap();
        let mut console = RecordingConsole::default();
        cpu.step(&mut vmu, &mut console).unwrap();
        let acc = cpu.data_accessor(&mut vmu, AccessMode::ReadOnly).unwrap();
        assert_eq!(acc.get_page(), 1);
    }
}
