//! Upward-growing stack with frame-pointer semantics (spec §3, §4.3).
//!
//! Grounded on the teacher's `CPU::push_u8`/`pop_u8`/`push_u16`/`pop_u16`
//! (`cpu6502.rs`), generalized from a fixed 256-byte page addressed by an
//! 8-bit stack pointer into an arbitrary-capacity context addressed by a
//! frame-aware `sp`/`fp` pair, and backed by a pre-allocated
//! [`StackAccessor`] instead of the CPU's own flat memory array.

use crate::error::ExecutionError;
use crate::memory::accessor::StackAccessor;
use crate::memory::{AccessMode, ContextId, MemoryMode, MemoryUnit};

/// Sentinel meaning "no current frame".
pub const NO_FRAME: i32 = -1;

pub struct Stack {
    context_id: ContextId,
    capacity: u32,
    sp: u32,
    fp: i32,
}

impl Stack {
    /// Creates the backing context and pre-allocates every physical block
    /// up front so no allocation ever happens mid-execution (spec §9).
    pub fn new(vmu: &mut MemoryUnit, capacity: u32) -> Result<Self, ExecutionError> {
        if vmu.mode() != MemoryMode::Unprotected {
            return Err(crate::error::MemoryError::from(crate::error::ModeError::ContextCreateInProtected).into());
        }
        let context_id = vmu.create_context(capacity as u64)?;
        let mut addr = 0u64;
        while addr < capacity as u64 {
            vmu.ensure_physical_memory(context_id, addr)?;
            addr += crate::memory::BLOCK_SIZE as u64;
        }
        Ok(Stack { context_id, capacity, sp: 0, fp: NO_FRAME })
    }

    pub fn context_id(&self) -> ContextId {
        self.context_id
    }

    pub fn sp(&self) -> u32 {
        self.sp
    }

    pub fn fp(&self) -> i32 {
        self.fp
    }

    pub fn set_fp_raw(&mut self, fp: i32) {
        self.fp = fp;
    }

    /// Floor below which `pop*` must not read: `fp + 1`, or 0 when there
    /// is no current frame.
    fn frame_floor(&self) -> u32 {
        if self.fp == NO_FRAME {
            0
        } else {
            (self.fp + 1) as u32
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sp == self.frame_floor()
    }

    pub fn is_full(&self) -> bool {
        self.sp == self.capacity
    }

    pub fn get_accessor<'a>(&self, vmu: &'a mut MemoryUnit, mode: AccessMode) -> Result<StackAccessor<'a>, ExecutionError> {
        Ok(StackAccessor::new(vmu, self.context_id, mode)?)
    }

    pub fn push_byte(&mut self, acc: &mut StackAccessor, value: u8) -> Result<(), ExecutionError> {
        if self.is_full() {
            return Err(ExecutionError::StackOverflow);
        }
        acc.write_byte(self.sp, value)?;
        self.sp += 1;
        Ok(())
    }

    pub fn push_word(&mut self, acc: &mut StackAccessor, value: u16) -> Result<(), ExecutionError> {
        let [lo, hi] = value.to_le_bytes();
        self.push_byte(acc, lo)?;
        self.push_byte(acc, hi)?;
        Ok(())
    }

    pub fn pop_byte(&mut self, acc: &mut StackAccessor) -> Result<u8, ExecutionError> {
        if self.is_empty() {
            return Err(ExecutionError::StackUnderflow);
        }
        self.sp -= 1;
        Ok(acc.read_byte(self.sp)?)
    }

    pub fn pop_word(&mut self, acc: &mut StackAccessor) -> Result<u16, ExecutionError> {
        let hi = self.pop_byte(acc)?;
        let lo = self.pop_byte(acc)?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    pub fn peek_byte(&self, acc: &StackAccessor) -> Result<u8, ExecutionError> {
        if self.sp == 0 {
            return Err(ExecutionError::StackUnderflow);
        }
        Ok(acc.read_byte(self.sp - 1)?)
    }

    pub fn peek_word(&self, acc: &StackAccessor) -> Result<u16, ExecutionError> {
        if self.sp < 2 {
            return Err(ExecutionError::StackUnderflow);
        }
        let lo = acc.read_byte(self.sp - 2)?;
        let hi = acc.read_byte(self.sp - 1)?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    pub fn peek_byte_from_base(&self, acc: &StackAccessor, off: u32) -> Result<u8, ExecutionError> {
        Ok(acc.read_byte(off)?)
    }

    pub fn peek_word_from_base(&self, acc: &StackAccessor, off: u32) -> Result<u16, ExecutionError> {
        let lo = acc.read_byte(off)?;
        let hi = acc.read_byte(off + 1)?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    fn frame_base(&self) -> i64 {
        if self.fp == NO_FRAME {
            0
        } else {
            self.fp as i64 + 1
        }
    }

    pub fn peek_byte_from_frame(&self, acc: &StackAccessor, off: i32) -> Result<u8, ExecutionError> {
        let addr = self.frame_base() + off as i64;
        Ok(acc.read_byte(addr as u32)?)
    }

    pub fn peek_word_from_frame(&self, acc: &StackAccessor, off: i32) -> Result<u16, ExecutionError> {
        let addr = self.frame_base() + off as i64;
        let lo = acc.read_byte(addr as u32)?;
        let hi = acc.read_byte((addr + 1) as u32)?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    pub fn set_frame_pointer(&mut self, v: i32) {
        self.fp = v;
    }

    pub fn set_frame_to_top(&mut self) {
        self.fp = self.sp as i32 - 1;
    }

    /// Collapses the current frame back to its marker, preserving
    /// everything below it.
    pub fn flush(&mut self) {
        self.sp = self.frame_floor();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_stack(capacity: u32) -> (MemoryUnit, Stack) {
        let mut vmu = MemoryUnit::new();
        let stack = Stack::new(&mut vmu, capacity).unwrap();
        vmu.set_mode(MemoryMode::Protected);
        (vmu, stack)
    }

    #[test]
    fn push_pop_byte_lifo() {
        let (mut vmu, mut stack) = fresh_stack(16);
        let mut acc = stack.get_accessor(&mut vmu, AccessMode::ReadWrite).unwrap();
        stack.push_byte(&mut acc, 1).unwrap();
        stack.push_byte(&mut acc, 2).unwrap();
        stack.push_byte(&mut acc, 3).unwrap();
        assert_eq!(stack.pop_byte(&mut acc).unwrap(), 3);
        assert_eq!(stack.pop_byte(&mut acc).unwrap(), 2);
        assert_eq!(stack.pop_byte(&mut acc).unwrap(), 1);
        assert_eq!(stack.sp(), 0);
    }

    #[test]
    fn push_pop_word_endianness() {
        let (mut vmu, mut stack) = fresh_stack(16);
        let mut acc = stack.get_accessor(&mut vmu, AccessMode::ReadWrite).unwrap();
        stack.push_word(&mut acc, 0x1234).unwrap();
        assert_eq!(acc.read_byte(0).unwrap(), 0x34);
        assert_eq!(acc.read_byte(1).unwrap(), 0x12);
        assert_eq!(stack.pop_word(&mut acc).unwrap(), 0x1234);
    }

    #[test]
    fn overflow_and_underflow() {
        let (mut vmu, mut stack) = fresh_stack(1);
        let mut acc = stack.get_accessor(&mut vmu, AccessMode::ReadWrite).unwrap();
        stack.push_byte(&mut acc, 9).unwrap();
        assert_eq!(stack.push_byte(&mut acc, 9), Err(ExecutionError::StackOverflow));
        stack.pop_byte(&mut acc).unwrap();
        assert_eq!(stack.pop_byte(&mut acc), Err(ExecutionError::StackUnderflow));
    }

    #[test]
    fn pop_cannot_cross_frame_floor() {
        let (mut vmu, mut stack) = fresh_stack(16);
        let mut acc = stack.get_accessor(&mut vmu, AccessMode::ReadWrite).unwrap();
        stack.push_byte(&mut acc, 1).unwrap();
        stack.set_frame_to_top();
        assert_eq!(stack.pop_byte(&mut acc), Err(ExecutionError::StackUnderflow));
    }

    #[test]
    fn flush_collapses_to_frame_marker() {
        let (mut vmu, mut stack) = fresh_stack(16);
        let mut acc = stack.get_accessor(&mut vmu, AccessMode::ReadWrite).unwrap();
        stack.push_byte(&mut acc, 0xAA).unwrap();
        stack.set_frame_to_top();
        stack.push_byte(&mut acc, 1).unwrap();
        stack.push_byte(&mut acc, 2).unwrap();
        stack.flush();
        assert_eq!(stack.sp(), 1);
        assert_eq!(stack.peek_byte(&acc).unwrap(), 0xAA);
    }

    #[test]
    fn peek_from_frame_offsets() {
        let (mut vmu, mut stack) = fresh_stack(16);
        let mut acc = stack.get_accessor(&mut vmu, AccessMode::ReadWrite).unwrap();
        stack.push_word(&mut acc, 111).unwrap();
        stack.set_frame_to_top();
        stack.push_word(&mut acc, 222).unwrap();
        assert_eq!(stack.peek_word_from_frame(&acc, -2).unwrap(), 111);
    }
}
