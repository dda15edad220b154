//! Fetch-decode-execute: the CPU owns the register file, flags, ALU, and
//! Instruction Unit, and drives the opcode-range dispatch (spec §4.7).
//!
//! Grounded on the teacher's `CPU::run` loop (`cpu6502.rs`), generalized
//! from an `OPERAND_MAP` lookup per concrete 6502 opcode+addressing-mode
//! pair into a range-dispatch over Pendragon's ~120 opcodes, with the
//! data context and syscall surface added at the sides the teacher's
//! `Bus` and missing syscall layer didn't need to model.

use crate::error::ExecutionError;
use crate::iu::InstructionUnit;
use crate::memory::{AccessMode, ContextId, MemoryMode, MemoryUnit};
use crate::opcodes;
use crate::registers::{Flags, RegisterFile};
use crate::stack::Stack;
use crate::syscall::SyscallSurface;

/// Everything one `step()` needs: registers, flags, the general-purpose
/// data context, the stack, and the instruction unit, bundled so the
/// `instructions/*` handler modules can take `&mut Cpu` without the
/// caller juggling five separate borrows.
pub struct Cpu {
    pub regs: RegisterFile,
    pub flags: Flags,
    pub iu: InstructionUnit,
    pub stack: Stack,
    pub data_context: ContextId,
    pub halted: bool,
    pub params: [u8; 3],
    /// The most recently fetched opcode byte, kept for error reporting
    /// (spec §7: the host receives the failing opcode alongside the IR).
    pub last_opcode: u8,
}

impl Cpu {
    pub fn new(vmu: &mut MemoryUnit, code_context: ContextId, data_context: ContextId, stack: Stack) -> Self {
        Cpu {
            regs: RegisterFile::new(),
            flags: Flags::empty(),
            iu: InstructionUnit::new(code_context),
            stack,
            data_context,
            halted: false,
            params: [0; 3],
            last_opcode: 0,
        }
    }

    /// Sets the VMU to PROTECTED, runs `step()` until halted, then
    /// restores UNPROTECTED (spec §4.7).
    pub fn run(&mut self, vmu: &mut MemoryUnit, surface: &mut dyn SyscallSurface) -> Result<(), ExecutionError> {
        vmu.set_mode(MemoryMode::Protected);
        let result = (|| {
            while !self.halted {
                self.step(vmu, surface)?;
            }
            Ok(())
        })();
        vmu.set_mode(MemoryMode::Unprotected);
        result
    }

    pub fn step(&mut self, vmu: &mut MemoryUnit, surface: &mut dyn SyscallSurface) -> Result<(), ExecutionError> {
        let opcode = self.iu.read_byte_at_ir(vmu)?;
        self.iu.advance_ir(1);
        self.last_opcode = opcode;
        log::trace!("fetch opcode {opcode:#04x} at ir {:#06x}", self.iu.get_ir().wrapping_sub(1));

        if opcode == 0x01 {
            self.halted = true;
            return Ok(());
        }
        if opcode == 0x00 {
            return Ok(());
        }

        let arity = opcodes::arity_of(opcode).ok_or(ExecutionError::UnknownOpcode(opcode))?;
        for slot in self.params.iter_mut().take(arity as usize) {
            *slot = self.iu.read_byte_at_ir(vmu)?;
            self.iu.advance_ir(1);
        }

        match opcode {
            0x02..=0x0F | 0x72..=0x74 => self.dispatch_load_store(vmu, opcode)?,
            0x10..=0x1A | 0x1D => self.dispatch_stack(vmu, opcode)?,
            0x1B | 0x1C => self.dispatch_page_select(vmu, opcode)?,
            0x1E..=0x26 => self.dispatch_jump(opcode),
            0x27 => self.dispatch_call(vmu, opcode)?,
            0x28 => self.iu.return_from_subroutine(vmu, &mut self.stack)?,
            0x29..=0x41 => self.dispatch_arithmetic(opcode)?,
            0x42..=0x55 => self.dispatch_logical(opcode)?,
            0x56..=0x69 => self.dispatch_shift_rotate(opcode)?,
            0x6A..=0x6B => self.dispatch_incdec(opcode),
            0x6C..=0x71 => self.dispatch_compare(opcode)?,
            0x75..=0x76 => self.dispatch_immediate_push(vmu, opcode)?,
            0x7F => self.dispatch_syscall(vmu, surface)?,
            other => return Err(ExecutionError::UnknownOpcode(other)),
        }

        Ok(())
    }

    pub fn data_accessor<'a>(&self, vmu: &'a mut MemoryUnit, mode: AccessMode) -> Result<crate::memory::accessor::PagedAccessor<'a>, ExecutionError> {
        Ok(crate::memory::accessor::PagedAccessor::new(vmu, self.data_context, mode)?)
    }
}
