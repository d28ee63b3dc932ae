#![doc = r#"
Gate-level MOS 6502 simulator library crate.

This crate exposes the simulation core modules for use by the binaries
under `src/bin/` and by tests.

Modules:
- engine: the generic node/transistor netlist simulator (no 6502 knowledge)
- probe: the 6502-specific bus/register facade, reset protocol, and clock loop
- host: host-side collaborators (RAM, ROM loading, netlist-file loading,
  and the Apple-I / CBM BASIC character-I/O and KERNAL-dispatch surfaces)
"#]

pub mod engine;
pub mod host;
pub mod probe;
