//! Subroutine call (spec §4.6, §6.1 opcode 0x27); `RET` (0x28) is
//! simple enough that `cpu.rs` dispatches it straight to
//! [`crate::iu::InstructionUnit::return_from_subroutine`].
//!
//! Grounded on the teacher's `jsr.rs`, generalized from pushing a
//! single 16-bit return address onto the flat stack to pushing a
//! `{return_address, fp}` record on the dedicated return stack plus the
//! return-value marker byte spec §4.6 defines.

use crate::cpu::Cpu;
use crate::error::ExecutionError;
use crate::memory::MemoryUnit;

impl Cpu {
    pub(crate) fn dispatch_call(&mut self, vmu: &mut MemoryUnit, opcode: u8) -> Result<(), ExecutionError> {
        debug_assert_eq!(opcode, 0x27, "BUG: dispatch_call only handles CALL");
        let addr = u16::from_le_bytes([self.params[0], self.params[1]]);
        let with_return_value = self.params[2] != 0;
        self.iu.call_subroutine(vmu, &mut self.stack, addr, with_return_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::tests::fresh_cpu;
    use crate::syscall::RecordingConsole;

    #[test]
    fn call_jumps_and_ret_restores_ir() {
        let (mut vmu, mut cpu) = fresh_cpu(16, 16, 16);
        cpu.iu
            .load_program(&mut vmu, &[0x27, 0x06, 0x00, 0x00, 0x00, 0x01, 0x28])
            .unwrap();
        let mut console = RecordingConsole::default();
        cpu.step(&mut vmu, &mut console).unwrap();
        assert_eq!(cpu.iu.get_ir(), 6);
        cpu.step(&mut vmu, &mut console).unwrap();
        assert_eq!(cpu.iu.get_ir(), 4);
    }
}
