//! Loads and stores: register-to-register, immediate-to-register, and
//! the four data-context addressing forms (absolute word, absolute
//! high/low byte, register-indirect) (spec §4.7, §6.1 opcodes 0x02-0x0F,
//! 0x72-0x74).
//!
//! Grounded on the teacher's `lda.rs`/`sta.rs` addressing-mode split,
//! generalized from the 6502's {immediate, zero page, absolute} modes
//! into Pendragon's {register, immediate, absolute, register-indirect}
//! operand shapes. Operand bytes are read off `self.params` in the
//! order they appear in the mnemonic's written syntax (e.g. `STA
//! addr, reg` encodes `[addr_lo, addr_hi, reg]`).

use crate::cpu::Cpu;
use crate::error::ExecutionError;
use crate::memory::{AccessMode, MemoryUnit};
use crate::registers::RegisterName;

fn reg(byte: u8) -> Result<RegisterName, ExecutionError> {
    RegisterName::from_byte(byte).ok_or(ExecutionError::UnknownOpcode(byte))
}

impl Cpu {
    pub(crate) fn dispatch_load_store(&mut self, vmu: &mut MemoryUnit, opcode: u8) -> Result<(), ExecutionError> {
        match opcode {
            0x02 => {
                let dest = reg(self.params[0])?;
                let value = u16::from_le_bytes([self.params[1], self.params[2]]);
                self.regs.set_value(dest, value, &mut self.flags);
            }
            0x03 => {
                let dest = reg(self.params[0])?;
                let src = reg(self.params[1])?;
                let value = self.regs.get_value(src);
                self.regs.set_value(dest, value, &mut self.flags);
            }
            0x04 => {
                let a = reg(self.params[0])?;
                let b = reg(self.params[1])?;
                let (va, vb) = (self.regs.get_value(a), self.regs.get_value(b));
                self.regs.set_value(a, vb, &mut self.flags);
                self.regs.set_value(b, va, &mut self.flags);
            }
            0x05 => {
                let dest = reg(self.params[0])?;
                self.regs.set_high_byte(dest, self.params[1]);
            }
            0x06 => {
                let dest = reg(self.params[0])?;
                let src = reg(self.params[1])?;
                self.regs.set_high_byte(dest, self.regs.get_low_byte(src));
            }
            0x07 => {
                let dest = reg(self.params[0])?;
                self.regs.set_low_byte(dest, self.params[1]);
            }
            0x08 => {
                let dest = reg(self.params[0])?;
                let src = reg(self.params[1])?;
                self.regs.set_low_byte(dest, self.regs.get_low_byte(src));
            }
            0x09 => {
                let dest = reg(self.params[0])?;
                let addr = u16::from_le_bytes([self.params[1], self.params[2]]);
                let acc = self.data_accessor(vmu, AccessMode::ReadOnly)?;
                let value = acc.read_word(addr)?;
                self.regs.set_value(dest, value, &mut self.flags);
            }
            0x0A => {
                let dest = reg(self.params[0])?;
                let addr = u16::from_le_bytes([self.params[1], self.params[2]]);
                let acc = self.data_accessor(vmu, AccessMode::ReadOnly)?;
                self.regs.set_low_byte(dest, acc.read_byte(addr)?);
            }
            0x0B => {
                let dest = reg(self.params[0])?;
                let addr = u16::from_le_bytes([self.params[1], self.params[2]]);
                let acc = self.data_accessor(vmu, AccessMode::ReadOnly)?;
                self.regs.set_high_byte(dest, acc.read_byte(addr)?);
            }
            0x0C => {
                let dest = reg(self.params[0])?;
                let addr = u16::from_le_bytes([self.params[1], self.params[2]]);
                let acc = self.data_accessor(vmu, AccessMode::ReadOnly)?;
                self.regs.set_low_byte(dest, acc.read_byte(addr)?);
            }
            0x0D => {
                let addr = u16::from_le_bytes([self.params[0], self.params[1]]);
                let src = reg(self.params[2])?;
                let mut acc = self.data_accessor(vmu, AccessMode::ReadWrite)?;
                acc.write_word(addr, self.regs.get_value(src))?;
            }
            0x0E => {
                let addr = u16::from_le_bytes([self.params[0], self.params[1]]);
                let src = reg(self.params[2])?;
                let mut acc = self.data_accessor(vmu, AccessMode::ReadWrite)?;
                acc.write_byte(addr, self.regs.get_high_byte(src))?;
            }
            0x0F => {
                let addr = u16::from_le_bytes([self.params[0], self.params[1]]);
                let src = reg(self.params[2])?;
                let mut acc = self.data_accessor(vmu, AccessMode::ReadWrite)?;
                acc.write_byte(addr, self.regs.get_low_byte(src))?;
            }
            0x72 => {
                let dest = reg(self.params[0])?;
                let addr_reg = reg(self.params[1])?;
                let addr = self.regs.get_value(addr_reg);
                let acc = self.data_accessor(vmu, AccessMode::ReadOnly)?;
                let value = acc.read_word(addr)?;
                self.regs.set_value(dest, value, &mut self.flags);
            }
            0x73 => {
                let dest = reg(self.params[0])?;
                let addr_reg = reg(self.params[1])?;
                let addr = self.regs.get_value(addr_reg);
                let acc = self.data_accessor(vmu, AccessMode::ReadOnly)?;
                self.regs.set_high_byte(dest, acc.read_byte(addr)?);
            }
            0x74 => {
                let dest = reg(self.params[0])?;
                let addr_reg = reg(self.params[1])?;
                let addr = self.regs.get_value(addr_reg);
                let acc = self.data_accessor(vmu, AccessMode::ReadOnly)?;
                self.regs.set_low_byte(dest, acc.read_byte(addr)?);
            }
            other => return Err(ExecutionError::UnknownOpcode(other)),
        }
        Ok(())
    }
}
