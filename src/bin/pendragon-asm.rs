//! `asm` CLI: drives the five-pass assembler pipeline (spec §6.3).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

#[derive(Parser)]
#[command(name = "asm", about = "Assembles a Pendragon source file into a program binary")]
struct Args {
    /// Source file to assemble.
    input: PathBuf,

    /// Output path for the assembled binary (defaults to the input's stem + ".bin").
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Verbose logging.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.verbose {
        unsafe {
            std::env::set_var("RUST_LOG", "debug");
        }
    }
    env_logger::init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;

    let program_name = args
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "program".to_string());

    let output_path = args.output.clone().unwrap_or_else(|| args.input.with_extension("bin"));

    match pendragon::assembler::assemble(&source, &program_name) {
        Ok(program) => {
            std::fs::write(&output_path, program.to_bytes())
                .with_context(|| format!("writing {}", output_path.display()))?;
            log::info!(
                "assembled {} -> {} ({} data bytes, {} code bytes)",
                args.input.display(),
                output_path.display(),
                program.data_bytes.len(),
                program.code_bytes.len()
            );
            Ok(())
        }
        Err(err) => {
            for diagnostic in err.diagnostics() {
                eprintln!("{diagnostic}");
            }
            anyhow::bail!("{} error(s), no output written", err.diagnostics().len());
        }
    }
}
