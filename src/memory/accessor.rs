//! Scoped, non-owning views onto a single `Context`: the only path
//! through which program code reads or writes memory (spec §4.2, §4.3).
//!
//! Mirrors the teacher's `Bus::read_u8`/`write_u8` pair, generalized to
//! page+offset addressing over an arbitrary context and gated by the
//! VMU's PROTECTED mode instead of being unconditionally available.

use super::{AccessMode, ContextId, MemoryMode, MemoryUnit};
use crate::error::{AccessError, ModeError};

/// A page+offset view onto one context. Composes a 32-bit physical
/// address as `(page << 16) | offset` per spec §4.2.
pub struct PagedAccessor<'a> {
    vmu: &'a mut MemoryUnit,
    context_id: ContextId,
    size: u64,
    mode: AccessMode,
}

impl<'a> PagedAccessor<'a> {
    pub fn new(vmu: &'a mut MemoryUnit, context_id: ContextId, mode: AccessMode) -> Result<Self, AccessError> {
        if vmu.mode() != MemoryMode::Protected {
            return Err(ModeError::AccessorInUnprotected.into());
        }
        let size = vmu
            .get_context(context_id)
            .map(|c| c.size)
            .unwrap_or(0);
        if mode == AccessMode::ReadWrite {
            vmu.note_write_accessor_opened();
        }
        Ok(PagedAccessor { vmu, context_id, size, mode })
    }

    fn require_protected(&self) -> Result<(), AccessError> {
        if self.vmu.mode() != MemoryMode::Protected {
            return Err(ModeError::AccessorInUnprotected.into());
        }
        Ok(())
    }

    pub fn get_page(&self) -> u16 {
        self.vmu
            .get_context(self.context_id)
            .map(|c| c.get_page())
            .unwrap_or(0)
    }

    pub fn set_page(&mut self, page: u16) {
        if let Some(ctx) = self.vmu.get_context_mut(self.context_id) {
            ctx.set_page(page);
        }
    }

    fn physical_addr(&self, off: u16) -> u64 {
        ((self.get_page() as u64) << 16) | (off as u64)
    }

    fn check_bounds(&self, addr: u64) -> Result<(), AccessError> {
        if addr >= self.size {
            return Err(AccessError::AddressOutOfBounds { addr: addr as u32, size: self.size as u32 });
        }
        Ok(())
    }

    pub fn read_byte(&self, off: u16) -> Result<u8, AccessError> {
        self.require_protected()?;
        let addr = self.physical_addr(off);
        self.check_bounds(addr)?;
        Ok(self.vmu.read_byte(self.context_id, addr).unwrap_or(0))
    }

    pub fn write_byte(&mut self, off: u16, value: u8) -> Result<(), AccessError> {
        self.require_protected()?;
        if self.mode == AccessMode::ReadOnly {
            return Err(ModeError::ReadOnlyWrite.into());
        }
        let addr = self.physical_addr(off);
        self.check_bounds(addr)?;
        self.vmu
            .write_byte(self.context_id, addr, value)
            .map_err(|_| AccessError::AddressOutOfBounds { addr: addr as u32, size: self.size as u32 })
    }

    pub fn read_word(&self, off: u16) -> Result<u16, AccessError> {
        let lo = self.read_byte(off)?;
        let hi = self.read_byte(off.wrapping_add(1))?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    pub fn write_word(&mut self, off: u16, value: u16) -> Result<(), AccessError> {
        let [lo, hi] = value.to_le_bytes();
        self.write_byte(off, lo)?;
        self.write_byte(off.wrapping_add(1), hi)?;
        Ok(())
    }

    pub fn bulk_read(&self, off: u16, buf: &mut [u8]) -> Result<(), AccessError> {
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = self.read_byte(off.wrapping_add(i as u16))?;
        }
        Ok(())
    }

    pub fn bulk_write(&mut self, off: u16, bytes: &[u8]) -> Result<(), AccessError> {
        for (i, byte) in bytes.iter().enumerate() {
            self.write_byte(off.wrapping_add(i as u16), *byte)?;
        }
        Ok(())
    }
}

impl<'a> Drop for PagedAccessor<'a> {
    fn drop(&mut self) {
        if self.mode == AccessMode::ReadWrite {
            self.vmu.note_write_accessor_closed();
        }
    }
}

/// Flat 32-bit-addressed view pre-allocated at construction time, used
/// exclusively by the [`crate::stack::Stack`] (spec §4.3).
pub struct StackAccessor<'a> {
    vmu: &'a mut MemoryUnit,
    context_id: ContextId,
    capacity: u32,
    mode: AccessMode,
}

impl<'a> StackAccessor<'a> {
    pub fn new(vmu: &'a mut MemoryUnit, context_id: ContextId, mode: AccessMode) -> Result<Self, AccessError> {
        if vmu.mode() != MemoryMode::Protected {
            return Err(ModeError::AccessorInUnprotected.into());
        }
        let capacity = vmu
            .get_context(context_id)
            .map(|c| c.size as u32)
            .unwrap_or(0);
        if mode == AccessMode::ReadWrite {
            vmu.note_write_accessor_opened();
        }
        Ok(StackAccessor { vmu, context_id, capacity, mode })
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    fn check_bounds(&self, addr: u32) -> Result<(), AccessError> {
        if addr >= self.capacity {
            return Err(AccessError::AddressOutOfBounds { addr, size: self.capacity });
        }
        Ok(())
    }

    pub fn read_byte(&self, addr: u32) -> Result<u8, AccessError> {
        self.check_bounds(addr)?;
        Ok(self.vmu.read_byte(self.context_id, addr as u64).unwrap_or(0))
    }

    pub fn write_byte(&mut self, addr: u32, value: u8) -> Result<(), AccessError> {
        if self.mode == AccessMode::ReadOnly {
            return Err(ModeError::ReadOnlyWrite.into());
        }
        self.check_bounds(addr)?;
        self.vmu
            .write_byte(self.context_id, addr as u64, value)
            .map_err(|_| AccessError::AddressOutOfBounds { addr, size: self.capacity })
    }
}

impl<'a> Drop for StackAccessor<'a> {
    fn drop(&mut self) {
        if self.mode == AccessMode::ReadWrite {
            self.vmu.note_write_accessor_closed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryMode;

    fn protected_vmu_with_context(size: u64) -> (MemoryUnit, ContextId) {
        let mut vmu = MemoryUnit::new();
        let id = vmu.create_context(size).unwrap();
        vmu.set_mode(MemoryMode::Protected);
        (vmu, id)
    }

    #[test]
    fn accessor_fails_when_unprotected() {
        let mut vmu = MemoryUnit::new();
        let id = vmu.create_context(10).unwrap();
        assert!(PagedAccessor::new(&mut vmu, id, AccessMode::ReadOnly).is_err());
    }

    #[test]
    fn paged_word_round_trip() {
        let (mut vmu, id) = protected_vmu_with_context(16);
        let mut acc = PagedAccessor::new(&mut vmu, id, AccessMode::ReadWrite).unwrap();
        acc.write_word(4, 0xBEEF).unwrap();
        assert_eq!(acc.read_word(4).unwrap(), 0xBEEF);
        assert_eq!(acc.read_byte(4).unwrap(), 0xEF);
        assert_eq!(acc.read_byte(5).unwrap(), 0xBE);
    }

    #[test]
    fn read_only_accessor_rejects_writes() {
        let (mut vmu, id) = protected_vmu_with_context(16);
        let mut acc = PagedAccessor::new(&mut vmu, id, AccessMode::ReadOnly).unwrap();
        assert!(acc.write_byte(0, 1).is_err());
        assert_eq!(acc.read_byte(0).unwrap(), 0);
    }

    #[test]
    fn out_of_bounds_fails() {
        let (mut vmu, id) = protected_vmu_with_context(4);
        let acc = PagedAccessor::new(&mut vmu, id, AccessMode::ReadOnly).unwrap();
        assert!(acc.read_byte(10).is_err());
    }

    #[test]
    fn page_select_changes_physical_address() {
        let (mut vmu, id) = protected_vmu_with_context(1 << 17);
        let mut acc = PagedAccessor::new(&mut vmu, id, AccessMode::ReadWrite).unwrap();
        acc.write_byte(1, 0x11).unwrap();
        acc.set_page(1);
        acc.write_byte(1, 0x22).unwrap();
        acc.set_page(0);
        assert_eq!(acc.read_byte(1).unwrap(), 0x11);
        acc.set_page(1);
        assert_eq!(acc.read_byte(1).unwrap(), 0x22);
    }
}
