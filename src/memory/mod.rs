//! Memory Unit (VMU): owns virtual address space, contexts, and lazily
//! allocated physical blocks. Grounded on the teacher's `Bus`
//! (`bus.rs` in JulienTD-NES-Emulator), generalized from one flat 64KB
//! array mirrored by address range into a context table behind a
//! single-writer mode gate, per spec §3/§4.1.

pub mod accessor;

use crate::error::{MemoryError, ModeError};
use std::collections::HashMap;
use std::sync::Mutex;

/// Fixed physical block size; implementation-defined per spec §4.1.
pub const BLOCK_SIZE: usize = 4096;

/// Upper bound of the 40-bit virtual address space contexts are carved from.
pub const VIRTUAL_SPACE_LIMIT: u64 = 1 << 40;

pub type ContextId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryMode {
    Unprotected,
    Protected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

/// An isolated virtual-address sub-range within the VMU.
#[derive(Debug)]
pub struct Context {
    pub id: ContextId,
    pub base: u64,
    pub size: u64,
    /// Accessor-local in spirit (spec §4.2), but the repository keeps the
    /// "current page" cursor in the context so a freshly opened accessor
    /// inherits the last-selected page, matching the teacher's single
    /// shared `Bus` rather than per-view state.
    current_page: u16,
    blocks: HashMap<usize, Box<[u8; BLOCK_SIZE]>>,
}

impl Context {
    fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr < self.base + self.size
    }

    fn block_index(addr: u64) -> usize {
        (addr as usize) / BLOCK_SIZE
    }

    fn offset_in_block(addr: u64) -> usize {
        (addr as usize) % BLOCK_SIZE
    }

    fn read_byte(&self, local_addr: u64) -> u8 {
        let idx = Self::block_index(local_addr);
        let off = Self::offset_in_block(local_addr);
        self.blocks.get(&idx).map_or(0, |block| block[off])
    }

    fn write_byte(&mut self, local_addr: u64, value: u8) {
        let idx = Self::block_index(local_addr);
        let off = Self::offset_in_block(local_addr);
        let block = self
            .blocks
            .entry(idx)
            .or_insert_with(|| Box::new([0u8; BLOCK_SIZE]));
        block[off] = value;
    }

    fn ensure_block(&mut self, local_addr: u64) {
        let idx = Self::block_index(local_addr);
        self.blocks
            .entry(idx)
            .or_insert_with(|| Box::new([0u8; BLOCK_SIZE]));
    }

    pub fn get_page(&self) -> u16 {
        self.current_page
    }

    pub fn set_page(&mut self, page: u16) {
        self.current_page = page;
    }
}

/// Owns every context and physical block; the single root of all memory
/// reachable by the VM, per spec §3's ownership rules.
pub struct MemoryUnit {
    mode: MemoryMode,
    contexts: HashMap<ContextId, Context>,
    next_free: u64,
    next_id: ContextId,
    /// Count of live write-mode accessor handles; the VMU refuses to
    /// leave PROTECTED mode while this is non-zero (spec §5).
    live_write_accessors: Mutex<u32>,
}

impl Default for MemoryUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryUnit {
    pub fn new() -> Self {
        MemoryUnit {
            mode: MemoryMode::Unprotected,
            contexts: HashMap::new(),
            next_free: 0,
            next_id: 0,
            live_write_accessors: Mutex::new(0),
        }
    }

    pub fn mode(&self) -> MemoryMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: MemoryMode) {
        log::debug!("memory unit mode transition: {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
    }

    pub fn create_context(&mut self, size: u64) -> Result<ContextId, MemoryError> {
        if self.mode != MemoryMode::Unprotected {
            return Err(ModeError::ContextCreateInProtected.into());
        }
        if size == 0 {
            return Err(MemoryError::ZeroSize);
        }
        let end = self
            .next_free
            .checked_add(size)
            .ok_or(MemoryError::VirtualSpaceExhausted)?;
        if end > VIRTUAL_SPACE_LIMIT {
            return Err(MemoryError::VirtualSpaceExhausted);
        }
        let id = self.next_id;
        self.next_id += 1;
        let base = self.next_free;
        self.next_free = end;
        self.contexts.insert(
            id,
            Context {
                id,
                base,
                size,
                current_page: 0,
                blocks: HashMap::new(),
            },
        );
        log::debug!("created context {id} at [{base:#x}, {end:#x})");
        Ok(id)
    }

    pub fn destroy_context(&mut self, id: ContextId) -> Result<(), MemoryError> {
        if self.mode != MemoryMode::Unprotected {
            return Err(ModeError::ContextDestroyInProtected.into());
        }
        self.contexts
            .remove(&id)
            .map(|_| ())
            .ok_or(MemoryError::ContextNotFound(id))
    }

    pub fn get_context(&self, id: ContextId) -> Option<&Context> {
        self.contexts.get(&id)
    }

    pub fn get_context_mut(&mut self, id: ContextId) -> Option<&mut Context> {
        self.contexts.get_mut(&id)
    }

    pub fn find_context_for_address(&self, addr: u64) -> Option<&Context> {
        self.contexts.values().find(|c| c.contains(addr))
    }

    pub fn read_byte(&self, id: ContextId, addr: u64) -> Result<u8, MemoryError> {
        let ctx = self.contexts.get(&id).ok_or(MemoryError::ContextNotFound(id))?;
        if addr >= ctx.size {
            return Err(MemoryError::AddressOutOfBounds { addr, size: ctx.size });
        }
        Ok(ctx.read_byte(addr))
    }

    pub fn write_byte(&mut self, id: ContextId, addr: u64, value: u8) -> Result<(), MemoryError> {
        let ctx = self
            .contexts
            .get_mut(&id)
            .ok_or(MemoryError::ContextNotFound(id))?;
        if addr >= ctx.size {
            return Err(MemoryError::AddressOutOfBounds { addr, size: ctx.size });
        }
        ctx.write_byte(addr, value);
        Ok(())
    }

    /// Pre-allocates the physical block containing `addr`; used by the
    /// Stack Accessor at construction so the stack never allocates mid
    /// execution (spec §4.3, §9).
    pub fn ensure_physical_memory(&mut self, id: ContextId, addr: u64) -> Result<(), MemoryError> {
        let ctx = self
            .contexts
            .get_mut(&id)
            .ok_or(MemoryError::ContextNotFound(id))?;
        ctx.ensure_block(addr);
        Ok(())
    }

    pub fn note_write_accessor_opened(&self) {
        *self.live_write_accessors.lock().unwrap() += 1;
    }

    pub fn note_write_accessor_closed(&self) {
        let mut count = self.live_write_accessors.lock().unwrap();
        *count = count.saturating_sub(1);
    }

    pub fn has_live_write_accessors(&self) -> bool {
        *self.live_write_accessors.lock().unwrap() > 0
    }
}
