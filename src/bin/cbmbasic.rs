//! CBM BASIC host executable.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use sim6502::host::cbmbasic::{Benchmark, KernalDispatch, Regs};
use sim6502::host::{cbmbasic, netlist_file, Ram};
use sim6502::probe::Chip;

#[derive(Parser, Debug)]
#[command(name = "cbmbasic", about = "Run CBM BASIC on the gate-level 6502 engine")]
struct Args {
    /// Path to the netlist file describing transistors and pull-ups.
    #[arg(long)]
    netlist: PathBuf,

    /// Path to the cbmbasic ROM image (17591 bytes).
    #[arg(long)]
    rom: PathBuf,

    /// Print a cycles/sec summary and exit at the benchmark PC.
    #[arg(long)]
    benchmark: bool,
}

/// The handful of standard KERNAL jump-table entries cbmbasic actually
/// exercises for character I/O; every other slot in the table still gets
/// trapped (and its trampoline installed) but is otherwise a no-op.
const CHROUT: u16 = 0xFFD2;
const CHRIN: u16 = 0xFFCF;
const GETIN: u16 = 0xFFE4;

struct DefaultDispatch;

impl KernalDispatch for DefaultDispatch {
    fn kernal_dispatch(&mut self, regs: &mut Regs) {
        match regs.pc {
            CHROUT => {
                let _ = io::stdout().write_all(&[regs.a]);
                let _ = io::stdout().flush();
            }
            CHRIN | GETIN => {
                let mut buf = [0u8; 1];
                regs.a = match io::stdin().read(&mut buf) {
                    Ok(1) => buf[0],
                    _ => 0,
                };
            }
            _ => {}
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let loaded = match netlist_file::load(&args.netlist) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("cbmbasic: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut ram = Ram::new();
    if let Err(e) = cbmbasic::load(&mut ram, &args.rom) {
        eprintln!("cbmbasic: {e}");
        return ExitCode::FAILURE;
    }
    cbmbasic::log_startup(&args.rom, args.benchmark);

    let mut chip = Chip::new(loaded.state, loaded.nodes, ram);
    if let Err(e) = chip.reset() {
        eprintln!("cbmbasic: {e}");
        return ExitCode::FAILURE;
    }

    let mut dispatch = DefaultDispatch;
    let mut bench = Benchmark::new(args.benchmark);

    loop {
        if let Err(e) = cbmbasic::step(&mut chip, &mut dispatch, &mut bench) {
            eprintln!("cbmbasic: {e}");
            return ExitCode::FAILURE;
        }
    }
}
