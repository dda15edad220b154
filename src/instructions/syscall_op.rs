//! Immediate pushes (`PUSHW`/`PUSHB`) and the `SYS` trap into the host
//! syscall surface (spec §4.6, §9, §6.1 opcodes 0x75-0x76, 0x7F).
//!
//! `PUSHW`/`PUSHB` supplement the distilled opcode table, which left the
//! `PUSH`-family arity inconsistent between pushing a register and
//! pushing a literal (spec §9's Open Questions); `SYS` is grounded on
//! the teacher's software-interrupt-free `main.rs` loop, generalized by
//! adding the syscall trap the NES's 6502 has no equivalent for.

use crate::cpu::Cpu;
use crate::error::ExecutionError;
use crate::memory::{AccessMode, MemoryUnit};
use crate::syscall::SyscallSurface;

impl Cpu {
    pub(crate) fn dispatch_immediate_push(&mut self, vmu: &mut MemoryUnit, opcode: u8) -> Result<(), ExecutionError> {
        let mut acc = self.stack.get_accessor(vmu, AccessMode::ReadWrite)?;
        match opcode {
            0x75 => {
                let value = u16::from_le_bytes([self.params[0], self.params[1]]);
                self.stack.push_word(&mut acc, value)?;
            }
            0x76 => self.stack.push_byte(&mut acc, self.params[0])?,
            other => return Err(ExecutionError::UnknownOpcode(other)),
        }
        Ok(())
    }

    pub(crate) fn dispatch_syscall(
        &mut self,
        vmu: &mut MemoryUnit,
        surface: &mut dyn SyscallSurface,
    ) -> Result<(), ExecutionError> {
        let number = u16::from_le_bytes([self.params[0], self.params[1]]);
        self.iu.system_call(vmu, &mut self.stack, surface, number)?;
        if surface.exit_status().is_some() {
            self.halted = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::tests::fresh_cpu;
    use crate::syscall::{RecordingConsole, SYS_PRINT_LINE_FROM_STACK};

    #[test]
    fn pushw_then_pop_round_trips() {
        let (mut vmu, mut cpu) = fresh_cpu(16, 16, 16);
        cpu.iu.load_program(&mut vmu, &[0x75, 0x2A, 0x00, 0x13, 0x01]).unwrap();
        let mut console = RecordingConsole::default();
        cpu.step(&mut vmu, &mut console).unwrap();
        cpu.step(&mut vmu, &mut console).unwrap();
        assert_eq!(cpu.regs.get_value(crate::registers::RegisterName::Ax), 0x2A);
    }

    #[test]
    fn pushb_pushes_single_byte() {
        let (mut vmu, mut cpu) = fresh_cpu(16, 16, 16);
        cpu.iu.load_program(&mut vmu, &[0x76, 0x09]).unwrap();
        let mut console = RecordingConsole::default();
        cpu.step(&mut vmu, &mut console).unwrap();
        assert_eq!(cpu.stack.sp(), 1);
    }

    #[test]
    fn sys_exit_halts_the_cpu() {
        let (mut vmu, mut cpu) = fresh_cpu(16, 16, 16);
        cpu.iu.load_program(&mut vmu, &[0x75, 0x07, 0x00, 0x7F, 0x00, 0x00]).unwrap();
        let mut console = RecordingConsole::default();
        cpu.run(&mut vmu, &mut console).unwrap();
        assert!(cpu.halted);
        assert_eq!(console.exit_status(), Some(7));
    }

    #[test]
    fn sys_print_line_reaches_the_surface() {
        let (mut vmu, mut cpu) = fresh_cpu(16, 16, 16);
        cpu.iu
            .load_program(&mut vmu, &[0x76, b'!', 0x76, b'i', 0x76, b'h', 0x75, 0x03, 0x00, 0x7F, 0x11, 0x00])
            .unwrap();
        let mut console = RecordingConsole::default();
        for _ in 0..5 {
            cpu.step(&mut vmu, &mut console).unwrap();
        }
        assert_eq!(console.output, b"hi!\n");
        let _ = SYS_PRINT_LINE_FROM_STACK;
    }
}
