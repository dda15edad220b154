//! Unconditional and flag-conditional jumps (spec §4.7, §6.1 opcodes
//! 0x1E-0x26).
//!
//! Grounded on the teacher's `beq.rs`/`bne.rs` branch family,
//! generalized from the 6502's relative 8-bit displacement to an
//! absolute 16-bit target, and from two status flags to all four.
//! `JPO`/`JPNO` follow the corrected ZERO/SIGN/CARRY/OVERFLOW pairing
//! spec §9 settles on, not the inverted pairing the distilled table
//! first suggested.

use crate::cpu::Cpu;
use crate::error::ExecutionError;
use crate::registers::Flags;

impl Cpu {
    pub(crate) fn dispatch_jump(&mut self, opcode: u8) {
        let addr = u16::from_le_bytes([self.params[0], self.params[1]]);
        match opcode {
            0x1E => self.iu.jump_to_address(addr),
            0x1F => self.iu.jump_to_address_conditional(addr, &self.flags, Flags::ZERO, true),
            0x20 => self.iu.jump_to_address_conditional(addr, &self.flags, Flags::ZERO, false),
            0x21 => self.iu.jump_to_address_conditional(addr, &self.flags, Flags::CARRY, true),
            0x22 => self.iu.jump_to_address_conditional(addr, &self.flags, Flags::CARRY, false),
            0x23 => self.iu.jump_to_address_conditional(addr, &self.flags, Flags::SIGN, true),
            0x24 => self.iu.jump_to_address_conditional(addr, &self.flags, Flags::SIGN, false),
            0x25 => self.iu.jump_to_address_conditional(addr, &self.flags, Flags::OVERFLOW, true),
            0x26 => self.iu.jump_to_address_conditional(addr, &self.flags, Flags::OVERFLOW, false),
            _ => unreachable!("BUG: dispatch_jump called with a non-jump opcode"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::tests::fresh_cpu;
    use crate::syscall::RecordingConsole;

    #[test]
    fn unconditional_jump_sets_ir() {
        let (mut vmu, mut cpu) = fresh_cpu(16, 16, 16);
        cpu.iu.load_program(&mut vmu, &[0x1E, 0x09, 0x00]).unwrap();
        let mut console = RecordingConsole::default();
        cpu.step(&mut vmu, &mut console).unwrap();
        assert_eq!(cpu.iu.get_ir(), 9);
    }

    #[test]
    fn jpz_only_jumps_when_zero_set() {
        let (mut vmu, mut cpu) = fresh_cpu(16, 16, 16);
        cpu.flags.set_flag(Flags::ZERO, false);
        cpu.iu.load_program(&mut vmu, &[0x1F, 0x09, 0x00]).unwrap();
        let mut console = RecordingConsole::default();
        cpu.step(&mut vmu, &mut console).unwrap();
        assert_eq!(cpu.iu.get_ir(), 3, "should fall through when ZERO is clear");
    }

    #[test]
    fn jpo_jumps_when_overflow_set() {
        let (mut vmu, mut cpu) = fresh_cpu(16, 16, 16);
        cpu.flags.set_flag(Flags::OVERFLOW, true);
        cpu.iu.load_program(&mut vmu, &[0x25, 0x09, 0x00]).unwrap();
        let mut console = RecordingConsole::default();
        cpu.step(&mut vmu, &mut console).unwrap();
        assert_eq!(cpu.iu.get_ir(), 9);
    }

    #[test]
    fn jpno_jumps_when_overflow_clear() {
        let (mut vmu, mut cpu) = fresh_cpu(16, 16, 16);
        cpu.flags.set_flag(Flags::OVERFLOW, false);
        cpu.iu.load_program(&mut vmu, &[0x26, 0x09, 0x00]).unwrap();
        let mut console = RecordingConsole::default();
        cpu.step(&mut vmu, &mut console).unwrap();
        assert_eq!(cpu.iu.get_ir(), 9);
    }
}
