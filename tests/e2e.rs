//! End-to-end scenarios exercising the assembler and VM together.

use pendragon::assembler::assemble;
use pendragon::cpu::Cpu;
use pendragon::error::{AssembleErrorKind, ExecutionError, LayoutErrorKind};
use pendragon::memory::accessor::PagedAccessor;
use pendragon::memory::{AccessMode, MemoryMode, MemoryUnit};
use pendragon::registers::RegisterName;
use pendragon::registers::Flags;
use pendragon::stack::{Stack, NO_FRAME};
use pendragon::syscall::RecordingConsole;

const STACK_SIZE: u32 = 1024;

fn assemble_and_run(source: &str) -> (Cpu, MemoryUnit, RecordingConsole) {
    let program = assemble(source, "e2e").expect("assembly should succeed");

    let mut vmu = MemoryUnit::new();
    let code_ctx = vmu.create_context(program.code_bytes.len().max(1) as u64).unwrap();
    let data_ctx = vmu.create_context(program.data_bytes.len().max(1) as u64).unwrap();
    let stack = Stack::new(&mut vmu, STACK_SIZE).unwrap();
    let mut cpu = Cpu::new(&mut vmu, code_ctx, data_ctx, stack);

    vmu.set_mode(MemoryMode::Protected);
    cpu.iu.load_program(&mut vmu, &program.code_bytes).unwrap();
    if !program.data_bytes.is_empty() {
        let mut acc = PagedAccessor::new(&mut vmu, data_ctx, AccessMode::ReadWrite).unwrap();
        acc.bulk_write(0, &program.data_bytes).unwrap();
    }

    let mut console = RecordingConsole::default();
    cpu.run(&mut vmu, &mut console).expect("execution should succeed");
    (cpu, vmu, console)
}

#[test]
fn arithmetic_loop_sums_one_through_ten() {
    let (cpu, _vmu, _console) =
        assemble_and_run("CODE\nLD AX,0\nLD CX,10\nL: ADD AX,CX\nDEC CX\nJPNZ L\nHALT\n");
    assert_eq!(cpu.regs.get_value(RegisterName::Ax), 55);
    assert_eq!(cpu.regs.get_value(RegisterName::Cx), 0);
    assert!(cpu.flags.get_flag(Flags::ZERO));
    assert!(cpu.halted);
}

#[test]
fn call_with_return_value_leaves_result_on_stack() {
    let (mut cpu, mut vmu, _console) =
        assemble_and_run("CODE\nmain: LD AX,7\nCALL square,1\nHALT\nsquare: MUL AX,AX\nRET\n");

    vmu.set_mode(MemoryMode::Protected);
    let acc = cpu.stack.get_accessor(&mut vmu, AccessMode::ReadOnly).unwrap();
    assert_eq!(cpu.stack.peek_word(&acc).unwrap(), 49);
    drop(acc);

    assert_eq!(cpu.stack.fp(), NO_FRAME);
    assert_eq!(cpu.iu.return_stack_depth(), 0);
}

#[test]
fn string_length_count_stops_at_null_terminator() {
    // The counter lives in CX; AX is only ever the byte most recently
    // read off the pointer, since CPL overwrites AX with its tri-state
    // outcome on every iteration.
    let source = "DATA\n\
                   text: DB \"Hello, World!\\0\"\n\
                   CODE\n\
                   main:\n\
                   LD CX,0\n\
                   LD BX,text[2]\n\
                   loop:\n\
                   LDAL AL,(BX)\n\
                   CPL 0\n\
                   JPZ done\n\
                   INC CX\n\
                   INC BX\n\
                   JMP loop\n\
                   done:\n\
                   HALT\n";
    let (cpu, _vmu, _console) = assemble_and_run(source);
    assert_eq!(cpu.regs.get_value(RegisterName::Cx), 13);
}

#[test]
fn cross_page_address_array_is_rejected() {
    let source = "DATA\nPAGE p1\na: DW [1]\nPAGE p2\nb: DW [2]\narr: DA [a,b]\n";
    let err = assemble(source, "bad").unwrap_err();
    assert!(err
        .diagnostics()
        .iter()
        .any(|d| matches!(d.kind, AssembleErrorKind::Layout(LayoutErrorKind::CrossPageAddressArray))));
}

#[test]
fn read_only_accessor_rejects_writes_but_allows_reads() {
    let mut vmu = MemoryUnit::new();
    let ctx = vmu.create_context(256).unwrap();
    vmu.set_mode(MemoryMode::Protected);
    let mut acc = PagedAccessor::new(&mut vmu, ctx, AccessMode::ReadOnly).unwrap();
    assert!(acc.write_byte(0, 1).is_err());
    assert_eq!(acc.read_byte(0).unwrap(), 0);
}

#[test]
fn ret_without_call_fails_with_return_stack_underflow() {
    let program = assemble("CODE\nRET\nHALT\n", "underflow").unwrap();
    let mut vmu = MemoryUnit::new();
    let code_ctx = vmu.create_context(program.code_bytes.len().max(1) as u64).unwrap();
    let data_ctx = vmu.create_context(1).unwrap();
    let stack = Stack::new(&mut vmu, STACK_SIZE).unwrap();
    let mut cpu = Cpu::new(&mut vmu, code_ctx, data_ctx, stack);

    vmu.set_mode(MemoryMode::Protected);
    cpu.iu.load_program(&mut vmu, &program.code_bytes).unwrap();

    let mut console = RecordingConsole::default();
    let err = cpu.run(&mut vmu, &mut console).unwrap_err();
    assert_eq!(err, ExecutionError::ReturnStackUnderflow);
    assert!(!cpu.halted);
}
