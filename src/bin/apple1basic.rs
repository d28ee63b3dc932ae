//! Apple-I BASIC host executable.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use sim6502::host::{apple1, netlist_file, Ram};
use sim6502::probe::Chip;

#[derive(Parser, Debug)]
#[command(name = "apple1basic", about = "Run Apple-I BASIC on the gate-level 6502 engine")]
struct Args {
    /// Path to the netlist file describing transistors and pull-ups.
    #[arg(long)]
    netlist: PathBuf,

    /// Path to the Apple-I monitor/BASIC ROM image.
    #[arg(long)]
    rom: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let loaded = match netlist_file::load(&args.netlist) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("apple1basic: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut ram = Ram::new();
    if let Err(e) = apple1::load(&mut ram, &args.rom) {
        eprintln!("apple1basic: {e}");
        return ExitCode::FAILURE;
    }
    apple1::log_startup(&args.rom);

    let mut chip = Chip::new(loaded.state, loaded.nodes, ram);
    if let Err(e) = chip.reset() {
        eprintln!("apple1basic: {e}");
        return ExitCode::FAILURE;
    }

    loop {
        if let Err(e) = apple1::step(&mut chip) {
            eprintln!("apple1basic: {e}");
            return ExitCode::FAILURE;
        }
    }
}
