//! CBM/KERNAL BASIC dispatch, reproducing `cbmbasic/runtime_init.c`'s
//! jump-table trampoline and `handle_monitor`.
//!
//! cbmbasic's reset path scribbles over the real stack pointer before it
//! reaches a sane state, so the reset vector does not point directly at
//! BASIC's cold-start entry; it points at a tiny trampoline at `$F000`
//! that `JSR`s there instead (the comment in `runtime_init.c` explains
//! why). KERNAL calls are trapped by PC rather than emulated node-by-node:
//! the jump table at `$FF90..$FFF3` is pre-filled with `JMP $F800`, and
//! `$F800` itself is rewritten on every call to carry the dispatch's
//! return values back into the 6502's registers.

use std::time::Instant;

use log::info;

use crate::engine::error::EngineError;
use crate::probe::Chip;

use super::memory::Ram;

pub const ROM_BASE: u16 = 0xA000;
pub const ROM_LEN: usize = 17591;
const KERNAL_TABLE_START: u16 = 0xFF90;
const KERNAL_TABLE_END: u16 = 0xFFF3;
const KERNAL_TABLE_STRIDE: u16 = 3;
const DISPATCH_TRAMPOLINE: u16 = 0xF800;
const BENCHMARK_EXIT_PC: u16 = 0xFFCF;

/// The subset of 6502 register state a KERNAL call reads and may mutate,
/// mirroring `runtime_init.c`'s `A`/`X`/`Y`/`S`/`P` globals.
#[derive(Debug, Clone, Copy, Default)]
pub struct Regs {
    /// The jump-table PC the trap fired at, so a dispatcher can tell which
    /// KERNAL routine was called without a second lookup.
    pub pc: u16,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    /// The full status byte as it stood on entry, including the flags
    /// (I/D/B/V and the unused bit) the KERNAL trampoline must carry back
    /// untouched. `negative`/`zero`/`carry` below are the three bits a
    /// dispatcher is expected to update.
    pub p: u8,
    pub negative: bool,
    pub zero: bool,
    pub carry: bool,
}

impl Regs {
    fn from_chip(chip: &Chip<Ram>) -> Self {
        let p = chip.read_p();
        Self {
            pc: chip.read_pc(),
            a: chip.read_a(),
            x: chip.read_x(),
            y: chip.read_y(),
            sp: chip.read_sp(),
            p,
            negative: p & 0x80 != 0,
            zero: p & 0x02 != 0,
            carry: p & 0x01 != 0,
        }
    }
}

/// Implemented by the host to service one KERNAL call (`kernal_dispatch`).
pub trait KernalDispatch {
    fn kernal_dispatch(&mut self, regs: &mut Regs);
}

pub fn load(ram: &mut Ram, rom_path: &std::path::Path) -> Result<(), String> {
    let len = ram.load_rom(rom_path, ROM_BASE)?;
    if len != ROM_LEN {
        return Err(format!(
            "expected cbmbasic image of exactly {ROM_LEN} bytes, got {len}"
        ));
    }

    let mut addr = KERNAL_TABLE_START;
    while addr < KERNAL_TABLE_END {
        ram.write_slice(addr, &[0x4C, 0x00, DISPATCH_TRAMPOLINE as u8]);
        addr += KERNAL_TABLE_STRIDE;
    }
    // $F000: JSR $E394, the real cbmbasic entry point, since a fresh
    // RESET's stack pointer is unusable for BASIC's own init code.
    ram.write_slice(0xF000, &[0x20, 0x94, 0xE3]);
    ram.set_reset_vector(0xF000);
    Ok(())
}

pub struct Benchmark {
    enabled: bool,
    start: Option<Instant>,
}

impl Benchmark {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            start: enabled.then(Instant::now),
        }
    }
}

/// Drive one half-cycle, then apply the KERNAL-trap override on the
/// falling edge. Exits the process on benchmark completion, matching the
/// original's `exit(0)`.
pub fn step<D: KernalDispatch>(
    chip: &mut Chip<Ram>,
    dispatch: &mut D,
    bench: &mut Benchmark,
) -> Result<(), EngineError> {
    chip.step()?;
    if !chip.state().is_node_high(chip.clk0()) {
        handle_monitor(chip, dispatch, bench);
    }
    Ok(())
}

fn handle_monitor<D: KernalDispatch>(chip: &mut Chip<Ram>, dispatch: &mut D, bench: &mut Benchmark) {
    let pc = chip.read_pc();

    if pc == BENCHMARK_EXIT_PC && bench.enabled {
        let elapsed = bench.start.unwrap_or_else(Instant::now).elapsed();
        let cycles_per_sec = chip.half_cycle() as f64 / elapsed.as_secs_f64();
        println!("Benchmark results:");
        println!("  Half-cycles: {}", chip.half_cycle());
        println!("  Time: {:.3} seconds", elapsed.as_secs_f64());
        println!("  Performance: {cycles_per_sec:.0} cycles/sec");
        println!("{}", chip.chip_status());
        std::process::exit(0);
    }

    if pc >= KERNAL_TABLE_START
        && pc < KERNAL_TABLE_END
        && (pc - KERNAL_TABLE_START) % KERNAL_TABLE_STRIDE == 0
    {
        let mut regs = Regs::from_chip(chip);
        dispatch.kernal_dispatch(&mut regs);

        // Preserve I/D/B/V and the unused bit from the pre-call status
        // byte; only N/Z/C are the dispatch's to set.
        let p = (regs.p & 0x7C)
            | ((regs.negative as u8) << 7)
            | ((regs.zero as u8) << 1)
            | (regs.carry as u8);

        // Rewrite $F800 to carry the dispatch's results back through the
        // register file, then RTS to the KERNAL caller.
        chip.memory_mut().write_slice(
            DISPATCH_TRAMPOLINE,
            &[
                0xA9, p,       // LDA #P
                0x48,          // PHA
                0xA9, regs.a,  // LDA #A
                0xA2, regs.x,  // LDX #X
                0xA0, regs.y,  // LDY #Y
                0x28,          // PLP
                0x60,          // RTS
            ],
        );
    }
}

pub fn log_startup(rom_path: &std::path::Path, benchmark: bool) {
    info!("cbmbasic: loading {} (benchmark={benchmark})", rom_path.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullDispatch;
    impl KernalDispatch for NullDispatch {
        fn kernal_dispatch(&mut self, _regs: &mut Regs) {}
    }

    #[test]
    fn kernal_table_install_covers_every_stride() {
        let mut ram = Ram::new();
        let mut addr = KERNAL_TABLE_START;
        while addr < KERNAL_TABLE_END {
            ram.write_slice(addr, &[0x4C, 0x00, DISPATCH_TRAMPOLINE as u8]);
            addr += KERNAL_TABLE_STRIDE;
        }
        assert_eq!(ram.read_byte(0xFF90), 0x4C);
        assert_eq!(ram.read_byte(0xFFF0), 0x4C);
    }
}
