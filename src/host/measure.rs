//! Instruction-measurement harness, reproducing `measure.c`'s technique:
//! drive the engine through a reset and a fixed
//! instruction skeleton, then discover an opcode's length, cycle count,
//! and addressing mode by watching which magic sentinel addresses appear
//! on the address bus. Built entirely on [`Chip`]'s public probe/bus
//! accessors — it has no access to engine internals.

use crate::probe::Chip;

use super::memory::Ram;

const MAX_CYCLES: u32 = 100;
const SETUP_ADDR: u16 = 0xF400;
const INSTRUCTION_ADDR: u16 = 0xF800;
const BRK_VECTOR: u16 = 0xFC00;
const BRK_LENGTH: i32 = 2;

const MAGIC_8: u16 = 0xEA;
const MAGIC_16: u16 = 0xAB1E;
const MAGIC_IZX: u16 = 0x1328;
const MAGIC_IZY: u16 = 0x1979;
const X_OFFSET: u16 = 5;
const Y_OFFSET: u16 = 10;

const INITIAL_S: u16 = SETUP_ADDR + 1;
const INITIAL_P: u16 = SETUP_ADDR + 4;
const INITIAL_A: u16 = SETUP_ADDR + 7;
const INITIAL_X: u16 = SETUP_ADDR + 9;
const INITIAL_Y: u16 = SETUP_ADDR + 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    Unknown,
    Izy,
    Izx,
    Zpy,
    Zpx,
    Zp,
    Absy,
    Absx,
    Abs,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InstructionProfile {
    pub crashed: bool,
    pub length: i32,
    pub cycles: u32,
    pub addressing_mode: Option<AddrMode>,
    pub reads: bool,
    pub writes: bool,
}

impl Default for AddrMode {
    fn default() -> Self {
        AddrMode::Unknown
    }
}

/// Write the fixed instruction skeleton from `measure.c`'s `setup_memory`:
/// a short preamble that loads `S`/`P`/`A`/`X`/`Y` then jumps to
/// `INSTRUCTION_ADDR`, which holds `opcode` followed by three zero bytes,
/// plus a reset/BRK vector pair that loops forever at `BRK_VECTOR`.
fn setup_memory(ram: &mut Ram, opcode: u8) {
    for addr in 0..=0xFFFFu32 {
        ram.write_byte(addr as u16, 0);
    }
    ram.set_reset_vector(SETUP_ADDR);

    ram.write_slice(
        SETUP_ADDR,
        &[
            0xA2, 0x7F, // LDX #$7F
            0x9A, //       TXS
            0xA9, 0x00, // LDA #$00
            0x48, //       PHA
            0xA9, 0x00, // LDA #$00
            0xA2, 0x00, // LDX #$00
            0xA0, 0x00, // LDY #$00
            0x28, //       PLP
            0x4C, (INSTRUCTION_ADDR & 0xFF) as u8, (INSTRUCTION_ADDR >> 8) as u8, // JMP INSTRUCTION_ADDR
        ],
    );

    ram.write_slice(INSTRUCTION_ADDR, &[opcode, 0, 0, 0]);

    ram.write_byte(0xFFFE, (BRK_VECTOR & 0xFF) as u8);
    ram.write_byte(0xFFFF, (BRK_VECTOR >> 8) as u8);
    ram.write_byte(BRK_VECTOR, 0x00);
}

/// `resetChip_test`: run the standard reset protocol, then settle for 62
/// more half-cycles before measurement starts.
fn reset_and_settle(chip: &mut Chip<Ram>) {
    chip.reset().expect("synthetic measurement netlist never hits the propagation cap");
    for _ in 0..62 {
        chip.step().expect("synthetic measurement netlist never hits the propagation cap");
    }
}

fn is_falling_edge(chip: &Chip<Ram>) -> bool {
    !chip.state().is_node_high(chip.clk0())
}

/// Measure one opcode's length (bytes), cycle count, and addressing mode.
/// `make_chip` builds a fresh [`Chip`] for each measurement phase, mirroring
/// the original's per-phase `initAndResetChip`.
pub fn measure_opcode(mut make_chip: impl FnMut() -> Chip<Ram>, opcode: u8) -> InstructionProfile {
    let mut profile = InstructionProfile::default();

    // Phase 1: instruction length in bytes, via the BRK return address.
    {
        let mut chip = make_chip();
        setup_memory(chip.memory_mut(), opcode);
        reset_and_settle(&mut chip);

        let mut found = false;
        for _ in 0..MAX_CYCLES {
            chip.step().unwrap();
            if is_falling_edge(&chip) && chip.read_rw() && chip.read_address_bus() == BRK_VECTOR {
                found = true;
                break;
            }
        }

        if !found {
            profile.crashed = true;
            return profile;
        }

        let sp = chip.read_sp() as u16;
        let lo = chip.memory().read_byte(0x0100 + sp + 2) as u16;
        let hi = chip.memory().read_byte(0x0100 + sp + 3) as u16;
        let brk_addr = lo | (hi << 8);
        profile.length = brk_addr as i32 - INSTRUCTION_ADDR as i32 - BRK_LENGTH;
    }

    // Phase 2: instruction length in cycles, via the IR probe reading the
    // BRK opcode it falls through to.
    {
        let mut chip = make_chip();
        setup_memory(chip.memory_mut(), opcode);
        reset_and_settle(&mut chip);

        // Mirrors `measure.c`'s `cycle`, reset to -1 by `resetChip_test`
        // before this loop and incremented once per `step`: at break time
        // it is one less than the number of steps actually taken.
        let mut half_steps: i32 = -1;
        for _ in 0..MAX_CYCLES {
            chip.step().unwrap();
            half_steps += 1;
            if chip.read_ir() == 0x00 {
                break;
            }
        }
        profile.cycles = (half_steps / 2) as u32;
    }

    // Phase 3: addressing mode, via magic sentinel addresses.
    {
        let mut chip = make_chip();
        setup_memory(chip.memory_mut(), opcode);
        let ram = chip.memory_mut();
        ram.write_byte(INITIAL_X, X_OFFSET as u8);
        ram.write_byte(INITIAL_Y, Y_OFFSET as u8);
        ram.write_byte((MAGIC_8 + X_OFFSET) as u16, (MAGIC_IZX & 0xFF) as u8);
        ram.write_byte((MAGIC_8 + X_OFFSET + 1) as u16, (MAGIC_IZX >> 8) as u8);
        ram.write_byte(MAGIC_8, (MAGIC_IZY & 0xFF) as u8);
        ram.write_byte(MAGIC_8 + 1, (MAGIC_IZY >> 8) as u8);

        reset_and_settle(&mut chip);

        if profile.length == 2 {
            chip.memory_mut().write_byte(INSTRUCTION_ADDR + 1, MAGIC_8 as u8);
        } else if profile.length == 3 {
            chip.memory_mut().write_byte(INSTRUCTION_ADDR + 1, (MAGIC_16 & 0xFF) as u8);
            chip.memory_mut().write_byte(INSTRUCTION_ADDR + 2, (MAGIC_16 >> 8) as u8);
        }

        let mut zp = false;
        let mut abs = false;
        let mut zpx = false;
        let mut absx = false;
        let mut zpy = false;
        let mut absy = false;
        let mut izx = false;
        let mut izy = false;

        for _ in 0..(profile.cycles * 2 + 2) {
            chip.step().unwrap();
            if !is_falling_edge(&chip) {
                continue;
            }
            let addr = chip.read_address_bus();
            let is_read = chip.read_rw();
            let is_write = !is_read;

            let mut hit = true;
            if addr == MAGIC_8 {
                zp = true;
            } else if addr == MAGIC_16 {
                abs = true;
            } else if addr == MAGIC_8 + X_OFFSET {
                zpx = true;
            } else if addr == MAGIC_16 + X_OFFSET {
                absx = true;
            } else if addr == MAGIC_8 + Y_OFFSET {
                zpy = true;
            } else if addr == MAGIC_16 + Y_OFFSET {
                absy = true;
            } else if addr == MAGIC_IZX {
                izx = true;
            } else if addr == MAGIC_IZY + Y_OFFSET {
                izy = true;
            } else {
                hit = false;
            }

            if hit {
                profile.reads |= is_read;
                profile.writes |= is_write;
            }
        }

        profile.addressing_mode = Some(if izy {
            AddrMode::Izy
        } else if izx {
            AddrMode::Izx
        } else if zpy {
            AddrMode::Zpy
        } else if zpx {
            AddrMode::Zpx
        } else if zp {
            AddrMode::Zp
        } else if absy {
            AddrMode::Absy
        } else if absx {
            AddrMode::Absx
        } else if abs {
            AddrMode::Abs
        } else {
            AddrMode::Unknown
        });
    }

    profile
}
