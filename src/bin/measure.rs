//! Instruction-measurement harness entry point.
//!
//! Builds a fresh [`Chip`] from the same netlist file for each opcode
//! (mirroring `measure.c`'s per-phase `initAndResetChip`), then prints one
//! line per opcode: byte length, cycle count, addressing mode, and whether
//! the instruction reads and/or writes memory.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use sim6502::host::measure::{self, AddrMode};
use sim6502::host::{netlist_file, Ram};
use sim6502::probe::Chip;

#[derive(Parser, Debug)]
#[command(name = "measure", about = "Measure instruction length, cycle count, and addressing mode for every opcode")]
struct Args {
    /// Path to the netlist file describing transistors and pull-ups.
    #[arg(long)]
    netlist: PathBuf,
}

fn addr_mode_name(mode: Option<AddrMode>) -> &'static str {
    match mode {
        Some(AddrMode::Izy) => "izy",
        Some(AddrMode::Izx) => "izx",
        Some(AddrMode::Zpy) => "zpy",
        Some(AddrMode::Zpx) => "zpx",
        Some(AddrMode::Zp) => "zp",
        Some(AddrMode::Absy) => "absy",
        Some(AddrMode::Absx) => "absx",
        Some(AddrMode::Abs) => "abs",
        Some(AddrMode::Unknown) | None => "unknown",
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    // Fail fast on a bad path before spending 256 phases discovering it.
    if let Err(e) = netlist_file::load(&args.netlist) {
        eprintln!("measure: {e}");
        return ExitCode::FAILURE;
    }

    for opcode in 0u16..=0xFF {
        let opcode = opcode as u8;
        let netlist_path = args.netlist.clone();
        let make_chip = move || -> Chip<Ram> {
            let loaded = netlist_file::load(&netlist_path).expect("netlist file validated at startup");
            Chip::new(loaded.state, loaded.nodes, Ram::new())
        };

        let profile = measure::measure_opcode(make_chip, opcode);
        if profile.crashed {
            println!("{opcode:02x}: crashed (never reached BRK)");
            continue;
        }
        println!(
            "{opcode:02x}: length={} cycles={} mode={} reads={} writes={}",
            profile.length,
            profile.cycles,
            addr_mode_name(profile.addressing_mode),
            profile.reads,
            profile.writes,
        );
    }

    ExitCode::SUCCESS
}
