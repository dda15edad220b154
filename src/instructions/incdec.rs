//! `INC`/`DEC` (spec §4.4, §4.7, §6.1 opcodes 0x6A-0x6B).
//!
//! Grounded on the teacher's `inx.rs`/`dex.rs`, generalized from the
//! fixed X/Y index registers to any of the five general-purpose
//! registers. ZERO/SIGN are updated from whichever register was just
//! touched — spec §8's arithmetic-loop scenario drives its `JPNZ` off
//! `DEC CX`, which only terminates if CX's own flags are what land.

use crate::cpu::Cpu;
use crate::registers::RegisterName;

impl Cpu {
    pub(crate) fn dispatch_incdec(&mut self, opcode: u8) {
        let Some(r) = RegisterName::from_byte(self.params[0]) else {
            return;
        };
        match opcode {
            0x6A => self.regs.inc(r, &mut self.flags),
            0x6B => self.regs.dec(r, &mut self.flags),
            _ => unreachable!("BUG: dispatch_incdec called with a non-incdec opcode"),
        }
    }
}
