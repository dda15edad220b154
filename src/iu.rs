//! Instruction Unit: program counter (IR), return stack, and the
//! call/return/syscall protocol (spec §3, §4.6).
//!
//! Grounded on the teacher's `program_counter`/`push_u16`/`pop_u16`
//! handling in `instructions/jsr.rs` and `instructions/rts.rs`,
//! generalized from a single flat-memory return address on the data
//! stack into a dedicated return stack of `{return_address, fp}`
//! records plus the spec's return-value-marker convention.

use crate::error::ExecutionError;
use crate::memory::accessor::{PagedAccessor, StackAccessor};
use crate::memory::{AccessMode, ContextId, MemoryUnit};
use crate::registers::Flags;
use crate::stack::Stack;
use crate::syscall::SyscallSurface;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReturnRecord {
    return_address: u16,
    frame_pointer: i32,
}

pub struct InstructionUnit {
    ir: u16,
    code_context: ContextId,
    return_stack: Vec<ReturnRecord>,
}

impl InstructionUnit {
    pub fn new(code_context: ContextId) -> Self {
        InstructionUnit { ir: 0, code_context, return_stack: Vec::new() }
    }

    pub fn get_ir(&self) -> u16 {
        self.ir
    }

    pub fn set_ir(&mut self, v: u16) {
        self.ir = v;
    }

    pub fn advance_ir(&mut self, n: u16) {
        self.ir = self.ir.wrapping_add(n);
    }

    fn code_reader<'a>(&self, vmu: &'a mut MemoryUnit) -> Result<PagedAccessor<'a>, ExecutionError> {
        Ok(PagedAccessor::new(vmu, self.code_context, AccessMode::ReadOnly)?)
    }

    pub fn read_byte_at_ir(&self, vmu: &mut MemoryUnit) -> Result<u8, ExecutionError> {
        let acc = self.code_reader(vmu)?;
        Ok(acc.read_byte(self.ir)?)
    }

    pub fn read_word_at_ir(&self, vmu: &mut MemoryUnit) -> Result<u16, ExecutionError> {
        let acc = self.code_reader(vmu)?;
        Ok(acc.read_word(self.ir)?)
    }

    pub fn jump_to_address(&mut self, addr: u16) {
        self.ir = addr;
    }

    pub fn jump_to_address_conditional(&mut self, addr: u16, flags: &Flags, flag: Flags, expected: bool) {
        if flags.get_flag(flag) == expected {
            self.jump_to_address(addr);
        }
    }

    /// Writes `bytes` into the code context in page-sized chunks.
    pub fn load_program(&mut self, vmu: &mut MemoryUnit, bytes: &[u8]) -> Result<(), ExecutionError> {
        const PAGE_SIZE: usize = 1 << 16;
        let mut acc = PagedAccessor::new(vmu, self.code_context, AccessMode::ReadWrite)?;
        let mut written = 0usize;
        let mut page = 0u16;
        while written < bytes.len() {
            acc.set_page(page);
            let chunk_len = (bytes.len() - written).min(PAGE_SIZE);
            let chunk = &bytes[written..written + chunk_len];
            acc.bulk_write(0, chunk)?;
            written += chunk_len;
            page += 1;
        }
        Ok(())
    }

    /// Pushes `{IR, fp}`, sets IR to the target, pushes the return-value
    /// marker byte, then pins the frame pointer at the marker (spec §4.6).
    pub fn call_subroutine(
        &mut self,
        vmu: &mut MemoryUnit,
        stack: &mut Stack,
        target: u16,
        with_return_value: bool,
    ) -> Result<(), ExecutionError> {
        self.return_stack.push(ReturnRecord { return_address: self.ir, frame_pointer: stack.fp() });
        self.ir = target;
        let mut acc = stack.get_accessor(vmu, AccessMode::ReadWrite)?;
        stack.push_byte(&mut acc, if with_return_value { 1 } else { 0 })?;
        stack.set_frame_to_top();
        Ok(())
    }

    /// Pops the return record, restores IR, and unwinds the frame per
    /// the return-value marker convention (spec §4.6).
    pub fn return_from_subroutine(&mut self, vmu: &mut MemoryUnit, stack: &mut Stack) -> Result<(), ExecutionError> {
        let record = self.return_stack.pop().ok_or(ExecutionError::ReturnStackUnderflow)?;
        self.ir = record.return_address;
        let mut acc = stack.get_accessor(vmu, AccessMode::ReadWrite)?;
        let marker = stack.peek_byte_from_frame(&acc, 0)?;
        if marker == 1 {
            let retval = stack.pop_word(&mut acc)?;
            stack.flush();
            stack.set_frame_pointer(record.frame_pointer);
            stack.pop_byte(&mut acc)?;
            stack.push_word(&mut acc, retval)?;
        } else {
            stack.flush();
            stack.set_frame_pointer(record.frame_pointer);
            stack.pop_byte(&mut acc)?;
        }
        Ok(())
    }

    pub fn system_call(
        &mut self,
        vmu: &mut MemoryUnit,
        stack: &mut Stack,
        surface: &mut dyn SyscallSurface,
        number: u16,
    ) -> Result<(), ExecutionError> {
        surface.dispatch(vmu, stack, number)
    }

    pub fn return_stack_depth(&self) -> usize {
        self.return_stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryMode;
    use crate::syscall::RecordingConsole;

    fn setup() -> (MemoryUnit, InstructionUnit, Stack) {
        let mut vmu = MemoryUnit::new();
        let code_ctx = vmu.create_context(256).unwrap();
        let stack = Stack::new(&mut vmu, 64).unwrap();
        vmu.set_mode(MemoryMode::Protected);
        (vmu, InstructionUnit::new(code_ctx), stack)
    }

    #[test]
    fn call_then_return_restores_ir_and_fp() {
        let (mut vmu, mut iu, mut stack) = setup();
        iu.set_ir(0x10);
        let fp_before = stack.fp();
        iu.call_subroutine(&mut vmu, &mut stack, 0x40, false).unwrap();
        assert_eq!(iu.get_ir(), 0x40);
        iu.return_from_subroutine(&mut vmu, &mut stack).unwrap();
        assert_eq!(iu.get_ir(), 0x10);
        assert_eq!(stack.fp(), fp_before);
        assert_eq!(iu.return_stack_depth(), 0);
    }

    #[test]
    fn call_with_return_value_leaves_one_word_on_stack() {
        let (mut vmu, mut iu, mut stack) = setup();
        iu.call_subroutine(&mut vmu, &mut stack, 0x40, true).unwrap();
        {
            let mut acc = stack.get_accessor(&mut vmu, AccessMode::ReadWrite).unwrap();
            stack.push_word(&mut acc, 49).unwrap();
        }
        iu.return_from_subroutine(&mut vmu, &mut stack).unwrap();
        let acc = stack.get_accessor(&mut vmu, AccessMode::ReadOnly).unwrap();
        assert_eq!(stack.peek_word(&acc).unwrap(), 49);
    }

    #[test]
    fn return_without_call_underflows() {
        let (mut vmu, mut iu, mut stack) = setup();
        assert_eq!(
            iu.return_from_subroutine(&mut vmu, &mut stack),
            Err(ExecutionError::ReturnStackUnderflow)
        );
    }

    #[test]
    fn load_program_is_readable_at_ir() {
        let (mut vmu, mut iu, _stack) = setup();
        iu.load_program(&mut vmu, &[0x01, 0x02, 0x03]).unwrap();
        iu.set_ir(0);
        assert_eq!(iu.read_byte_at_ir(&mut vmu).unwrap(), 0x01);
    }

    #[test]
    fn syscall_dispatches_to_surface() {
        let (mut vmu, mut iu, mut stack) = setup();
        let mut console = RecordingConsole::default();
        {
            let mut acc = stack.get_accessor(&mut vmu, AccessMode::ReadWrite).unwrap();
            stack.push_byte(&mut acc, b'!').unwrap();
            stack.push_byte(&mut acc, b'i').unwrap();
            stack.push_byte(&mut acc, b'h').unwrap();
            stack.push_word(&mut acc, 3).unwrap();
        }
        iu.system_call(&mut vmu, &mut stack, &mut console, 0x0010).unwrap();
        assert_eq!(console.output, b"hi!");
    }
}
