//! `pendragon-vm` CLI: loads a program binary and runs it to `HALT`
//! (spec §6.3).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use pendragon::cpu::Cpu;
use pendragon::memory::accessor::PagedAccessor;
use pendragon::memory::{AccessMode, MemoryMode, MemoryUnit};
use pendragon::program::Program;
use pendragon::stack::Stack;
use pendragon::syscall::{StdConsole, SyscallSurface};

const DEFAULT_STACK_SIZE: u32 = 4096;
const PAGE_SIZE: usize = 1 << 16;

#[derive(Parser)]
#[command(name = "pendragon-vm", about = "Runs an assembled Pendragon program binary")]
struct Args {
    /// Assembled program binary to run.
    input: PathBuf,

    /// Stack context size in bytes.
    #[arg(long = "stack-size", default_value_t = DEFAULT_STACK_SIZE)]
    stack_size: u32,

    /// Code context size in bytes; defaults to the program's code segment size.
    #[arg(long = "code-size")]
    code_size: Option<u32>,

    /// Data context size in bytes; defaults to the program's data segment size.
    #[arg(long = "data-size")]
    data_size: Option<u32>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(status) => ExitCode::from(status as u8),
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<u16> {
    let bytes = std::fs::read(&args.input).with_context(|| format!("reading {}", args.input.display()))?;
    let program = Program::from_bytes(&bytes).context("parsing program file")?;

    let mut vmu = MemoryUnit::new();
    let code_size = args.code_size.unwrap_or(program.code_bytes.len() as u32).max(1);
    let data_size = args.data_size.unwrap_or(program.data_bytes.len() as u32).max(1);

    let code_context = vmu.create_context(code_size as u64)?;
    let data_context = vmu.create_context(data_size as u64)?;
    let stack = Stack::new(&mut vmu, args.stack_size)?;

    let mut cpu = Cpu::new(&mut vmu, code_context, data_context, stack);

    // Accessors only operate while PROTECTED; `Cpu::run` re-enters this
    // mode itself, so loading here just does it a step early.
    vmu.set_mode(MemoryMode::Protected);
    cpu.iu.load_program(&mut vmu, &program.code_bytes)?;
    load_data_segment(&mut vmu, data_context, &program.data_bytes)?;

    let mut console = StdConsole::default();
    match cpu.run(&mut vmu, &mut console) {
        Ok(()) => Ok(console.exit_status().unwrap_or(0)),
        Err(err) => {
            eprintln!(
                "execution failed: opcode={:#04x} ir={:#06x} error={err}",
                cpu.last_opcode,
                cpu.iu.get_ir()
            );
            anyhow::bail!(err);
        }
    }
}

/// Writes the data segment into its context in page-sized chunks,
/// mirroring `InstructionUnit::load_program`'s approach for the code
/// context.
fn load_data_segment(
    vmu: &mut MemoryUnit,
    data_context: pendragon::memory::ContextId,
    bytes: &[u8],
) -> anyhow::Result<()> {
    let mut acc = PagedAccessor::new(vmu, data_context, AccessMode::ReadWrite)?;
    let mut written = 0usize;
    let mut page = 0u16;
    while written < bytes.len() {
        acc.set_page(page);
        let chunk_len = (bytes.len() - written).min(PAGE_SIZE);
        acc.bulk_write(0, &bytes[written..written + chunk_len])?;
        written += chunk_len;
        page += 1;
    }
    Ok(())
}
