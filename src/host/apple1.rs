//! Apple-I character I/O, reproducing `apple1basic.c`'s
//! `handle_monitor`/`charout` on top of the generic
//! [`Chip`](crate::probe::Chip)/[`Ram`] pair.
//!
//! The PIA is not modeled as logic gates (it sits outside the die netlist
//! entirely): every half-cycle the falling-edge memory access already runs
//! against plain RAM, and this module re-forces the data bus for reads in
//! the `$D010`-`$D012` aliased range and snoops writes to `$D012` to
//! produce terminal output, exactly mirroring the original's post-`step`
//! override.

use std::io::{self, Read, Write};

use log::info;

use crate::engine::error::EngineError;
use crate::probe::Chip;

use super::memory::Ram;

/// 4 KiB monitor ROM base and reset entry point (`init_monitor`).
pub const ROM_BASE: u16 = 0xE000;

/// Partial address decoding used by the real PIA: only these bits
/// distinguish the three registers, so every multiple of `0x20` within
/// `0xD000..0xD020` aliases to the same register.
const PIA_MASK: u16 = 0xFF1F;
const KBD: u16 = 0xD010;
const KBD_CR: u16 = 0xD011;
const DSP: u16 = 0xD012;

/// The address a `charout` call returns to when invoked from the two
/// echo sites and from line-wrap/INPUT handling inside Apple-I BASIC;
/// these are suppressed because the host terminal already echoes.
const ECHO_CHAR: u16 = 0xe2a6;
const ECHO_CR: u16 = 0xe2b6;
const LINE_WRAP: u16 = 0xe025;
const INPUT_SITE: u16 = 0xe182;

pub fn load(ram: &mut Ram, rom_path: &std::path::Path) -> Result<(), String> {
    ram.load_rom(rom_path, ROM_BASE)?;
    ram.set_reset_vector(ROM_BASE);
    Ok(())
}

/// Drive one half-cycle, then apply the PIA override on the falling edge.
pub fn step(chip: &mut Chip<Ram>) -> Result<(), EngineError> {
    chip.step()?;
    if !chip.state().is_node_high(chip.clk0()) {
        handle_monitor(chip);
    }
    Ok(())
}

fn handle_monitor(chip: &mut Chip<Ram>) {
    if chip.read_rw() {
        let addr = chip.read_address_bus() & PIA_MASK;
        if addr == KBD {
            let mut c = read_one_byte();
            if c == 10 {
                c = 13;
            }
            chip.write_data_bus(c | 0x80);
        } else if addr == KBD_CR {
            if chip.read_pc() == 0xE006 {
                chip.write_data_bus(0x80); // a character is ready
            } else {
                chip.write_data_bus(0x00); // no STOP condition pending
            }
        } else if addr == DSP {
            chip.write_data_bus(0x00); // always ready to receive
        }
    } else {
        let addr = chip.read_address_bus() & PIA_MASK;
        if addr == DSP {
            let mut ch = chip.read_data_bus() & 0x7F;
            if ch == 13 {
                ch = 10;
            }
            charout(chip, ch);
        }
    }
}

/// Apple-I BASIC echoes every character it receives from the terminal,
/// and the host terminal already echoes too; this suppresses the
/// resulting duplicate output at its known call sites.
fn charout(chip: &mut Chip<Ram>, ch: u8) {
    let sp = chip.read_sp() as u16;
    let lo = chip.memory().read_byte(0x0100 + sp + 1) as u16;
    let hi = chip.memory().read_byte(0x0100 + ((sp + 2) & 0xFF)) as u16;
    let return_addr = (1 + lo) | (hi << 8);

    if return_addr == ECHO_CHAR || return_addr == ECHO_CR {
        return;
    }
    if return_addr == LINE_WRAP && (ch == 10 || ch == b' ') {
        return;
    }
    if return_addr == INPUT_SITE && stdin_is_a_fifo() {
        return;
    }

    let mut out = io::stdout();
    let _ = out.write_all(&[ch]);
    let _ = out.flush();
}

fn read_one_byte() -> u8 {
    let mut buf = [0u8; 1];
    match io::stdin().read(&mut buf) {
        Ok(1) => buf[0],
        _ => 0,
    }
}

/// Suppress the INPUT echo only when stdin is a pipe, matching the
/// original's POSIX branch (`fstat`/`S_ISFIFO`) rather than its `_WIN32`
/// branch (`!_isatty`): a regular file redirected onto stdin is neither a
/// tty nor a FIFO, and the original does not suppress echo for it.
#[cfg(unix)]
fn stdin_is_a_fifo() -> bool {
    use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd};
    use std::os::unix::fs::FileTypeExt;

    let fd = io::stdin().as_raw_fd();
    // SAFETY: wraps fd 0 just long enough to stat it; `into_raw_fd` hands
    // it back below instead of letting `File`'s drop close it.
    let file = unsafe { std::fs::File::from_raw_fd(fd) };
    let is_fifo = file.metadata().map(|m| m.file_type().is_fifo()).unwrap_or(false);
    let _ = file.into_raw_fd();
    is_fifo
}

#[cfg(not(unix))]
fn stdin_is_a_fifo() -> bool {
    false
}

pub fn log_startup(rom_path: &std::path::Path) {
    info!("apple1basic: loading {}", rom_path.display());
}
