//! Host syscall surface: the ABI consumed by `SYS` at the stack boundary
//! (spec §6.2). The host implementation itself is out of scope per
//! spec §1, but the trait boundary and a console-backed implementation
//! are supplied here since the Instruction Unit must call *something*.
//!
//! Calling convention: arguments are popped off the stack in the order
//! the caller pushed them *last first* — a caller that wants to print a
//! forward string pushes its bytes in reverse order, then pushes the
//! length last, so the length is the first word popped and the bytes
//! pop back out in forward order.

use crate::error::ExecutionError;
use crate::memory::accessor::StackAccessor;
use crate::memory::{AccessMode, MemoryUnit};
use crate::stack::Stack;
use std::io::{self, BufRead, Write};

pub const SYS_EXIT: u16 = 0x0000;
pub const SYS_PRINT_STRING_FROM_STACK: u16 = 0x0010;
pub const SYS_PRINT_LINE_FROM_STACK: u16 = 0x0011;
pub const SYS_READ_LINE_ONTO_STACK: u16 = 0x0012;

/// The contract a host exposes at the `SYS` boundary.
pub trait SyscallSurface {
    fn dispatch(&mut self, vmu: &mut MemoryUnit, stack: &mut Stack, number: u16) -> Result<(), ExecutionError>;

    /// Set by `SYS_EXIT`; the CPU checks this to halt with a status.
    fn exit_status(&self) -> Option<u16> {
        None
    }
}

fn pop_string(stack: &mut Stack, acc: &mut StackAccessor) -> Result<Vec<u8>, ExecutionError> {
    let len = stack.pop_word(acc)?;
    let mut bytes = Vec::with_capacity(len as usize);
    for _ in 0..len {
        bytes.push(stack.pop_byte(acc)?);
    }
    Ok(bytes)
}

/// Console I/O backed by real standard streams; used by the `pendragon-vm`
/// binary.
#[derive(Default)]
pub struct StdConsole {
    exit_status: Option<u16>,
}

impl SyscallSurface for StdConsole {
    fn dispatch(&mut self, vmu: &mut MemoryUnit, stack: &mut Stack, number: u16) -> Result<(), ExecutionError> {
        match number {
            SYS_EXIT => {
                let mut acc = stack.get_accessor(vmu, AccessMode::ReadWrite)?;
                let status = stack.pop_word(&mut acc)?;
                self.exit_status = Some(status);
                Ok(())
            }
            SYS_PRINT_STRING_FROM_STACK => {
                let mut acc = stack.get_accessor(vmu, AccessMode::ReadWrite)?;
                let bytes = pop_string(stack, &mut acc)?;
                print!("{}", String::from_utf8_lossy(&bytes));
                io::stdout().flush().ok();
                Ok(())
            }
            SYS_PRINT_LINE_FROM_STACK => {
                let mut acc = stack.get_accessor(vmu, AccessMode::ReadWrite)?;
                let bytes = pop_string(stack, &mut acc)?;
                println!("{}", String::from_utf8_lossy(&bytes));
                Ok(())
            }
            SYS_READ_LINE_ONTO_STACK => {
                let mut line = String::new();
                io::stdin().lock().read_line(&mut line).ok();
                let trimmed = line.trim_end_matches(['\n', '\r']);
                let bytes = trimmed.as_bytes();
                let mut acc = stack.get_accessor(vmu, AccessMode::ReadWrite)?;
                for &b in bytes.iter().rev() {
                    stack.push_byte(&mut acc, b)?;
                }
                stack.push_word(&mut acc, bytes.len() as u16)?;
                Ok(())
            }
            other => Err(ExecutionError::UnknownSyscall(other)),
        }
    }

    fn exit_status(&self) -> Option<u16> {
        self.exit_status
    }
}

/// In-memory test double that records everything printed instead of
/// touching real stdio.
#[derive(Default)]
pub struct RecordingConsole {
    pub output: Vec<u8>,
    pub scripted_input: Vec<String>,
    exit_status: Option<u16>,
}

impl SyscallSurface for RecordingConsole {
    fn dispatch(&mut self, vmu: &mut MemoryUnit, stack: &mut Stack, number: u16) -> Result<(), ExecutionError> {
        match number {
            SYS_EXIT => {
                let mut acc = stack.get_accessor(vmu, AccessMode::ReadWrite)?;
                self.exit_status = Some(stack.pop_word(&mut acc)?);
                Ok(())
            }
            SYS_PRINT_STRING_FROM_STACK => {
                let mut acc = stack.get_accessor(vmu, AccessMode::ReadWrite)?;
                let bytes = pop_string(stack, &mut acc)?;
                self.output.extend_from_slice(&bytes);
                Ok(())
            }
            SYS_PRINT_LINE_FROM_STACK => {
                let mut acc = stack.get_accessor(vmu, AccessMode::ReadWrite)?;
                let bytes = pop_string(stack, &mut acc)?;
                self.output.extend_from_slice(&bytes);
                self.output.push(b'\n');
                Ok(())
            }
            SYS_READ_LINE_ONTO_STACK => {
                let line = self.scripted_input.pop().unwrap_or_default();
                let bytes = line.into_bytes();
                let mut acc = stack.get_accessor(vmu, AccessMode::ReadWrite)?;
                for &b in bytes.iter().rev() {
                    stack.push_byte(&mut acc, b)?;
                }
                stack.push_word(&mut acc, bytes.len() as u16)?;
                Ok(())
            }
            other => Err(ExecutionError::UnknownSyscall(other)),
        }
    }

    fn exit_status(&self) -> Option<u16> {
        self.exit_status
    }
}
