//! 6502 probe/bus facade and its host collaborators: the reset protocol and
//! clock loop.
//!
//! The netlist engine ([`crate::engine`]) knows nothing about registers,
//! buses, or a clock — it only knows nodes and transistors. Everything
//! here is built entirely on the engine's public operations
//! (`set_node`/`is_node_high`/`read_nodes`/`write_nodes`/`stabilize`) and a
//! host-supplied [`NodeMap`] naming which node indices play which role
//! (the real MOS 6502 die-extracted netlist tables are not embedded in
//! this crate; any netlist satisfying the engine's setup contract can be
//! probed this way).

use log::debug;

use crate::engine::error::EngineError;
use crate::engine::{NodeId, State};

/// Names the node indices the probe facade reads and drives. All bundles
/// are LSB-first, matching [`State::read_nodes`]/[`State::write_nodes`].
#[derive(Debug, Clone)]
pub struct NodeMap {
    pub clk0: NodeId,
    pub res: NodeId,
    pub rdy: NodeId,
    pub so: NodeId,
    pub irq: NodeId,
    pub nmi: NodeId,
    pub rw: NodeId,

    pub address_bus: Vec<NodeId>,
    pub data_bus: Vec<NodeId>,

    pub pc: Vec<NodeId>,
    pub a: Vec<NodeId>,
    pub x: Vec<NodeId>,
    pub y: Vec<NodeId>,
    pub sp: Vec<NodeId>,
    pub p: Vec<NodeId>,
    pub ir: Vec<NodeId>,
}

/// Host-side memory back-end: a 65,536-byte address space the engine
/// reads from or writes to on the falling half of `CLK0`.
pub trait Memory {
    fn read(&self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, value: u8);
}

/// A netlist [`State`] wired up as a 6502 via a [`NodeMap`], driving a
/// host-supplied [`Memory`].
pub struct Chip<M: Memory> {
    state: State,
    nodes: NodeMap,
    memory: M,
    half_cycle: u64,
}

impl<M: Memory> Chip<M> {
    pub fn new(state: State, nodes: NodeMap, memory: M) -> Self {
        Self { state, nodes, memory, half_cycle: 0 }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    pub fn half_cycle(&self) -> u64 {
        self.half_cycle
    }

    pub fn clk0(&self) -> NodeId {
        self.nodes.clk0
    }

    /// Reset protocol.
    pub fn reset(&mut self) -> Result<(), EngineError> {
        // Step 2: force control inputs. Initial CLK0 polarity is low,
        // matching `perfect6502.c`'s `initChip`.
        self.state.set_node(self.nodes.res, false)?;
        self.state.set_node(self.nodes.clk0, false)?;
        self.state.set_node(self.nodes.rdy, true)?;
        self.state.set_node(self.nodes.so, false)?;
        self.state.set_node(self.nodes.irq, true)?;
        self.state.set_node(self.nodes.nmi, true)?;

        // Step 3: stabilize.
        self.state.stabilize()?;

        // Step 4: 16 half-cycles with RES held low.
        for _ in 0..16 {
            self.step()?;
        }

        // Step 5: release RES, re-stabilize.
        self.state.set_node(self.nodes.res, true)?;
        self.state.stabilize()?;

        // Step 6.
        self.half_cycle = 0;
        Ok(())
    }

    /// Clock loop: invert `CLK0`, drive to quiescence, and on the falling
    /// half perform one memory access.
    pub fn step(&mut self) -> Result<(), EngineError> {
        let was_high = self.state.is_node_high(self.nodes.clk0);
        self.state.set_node(self.nodes.clk0, !was_high)?;

        if was_high {
            // Falling half: memory I/O driven by the address bus and R/W.
            let addr = self.read_address_bus();
            if self.read_rw() {
                let value = self.memory.read(addr);
                self.write_data_bus(value);
            } else {
                let value = self.read_data_bus();
                self.memory.write(addr, value);
            }
        }

        self.half_cycle += 1;
        debug!(
            "half-cycle {}: clk0={} addr={:#06x} rw={}",
            self.half_cycle,
            !was_high,
            self.read_address_bus(),
            self.read_rw()
        );
        Ok(())
    }

    pub fn read_pc(&self) -> u16 {
        self.state.read_nodes(&self.nodes.pc) as u16
    }

    pub fn read_a(&self) -> u8 {
        self.state.read_nodes(&self.nodes.a) as u8
    }

    pub fn read_x(&self) -> u8 {
        self.state.read_nodes(&self.nodes.x) as u8
    }

    pub fn read_y(&self) -> u8 {
        self.state.read_nodes(&self.nodes.y) as u8
    }

    pub fn read_sp(&self) -> u8 {
        self.state.read_nodes(&self.nodes.sp) as u8
    }

    pub fn read_p(&self) -> u8 {
        self.state.read_nodes(&self.nodes.p) as u8
    }

    /// The IR probe sits on an inverted net and must be XORed with `0xFF`.
    pub fn read_ir(&self) -> u8 {
        (self.state.read_nodes(&self.nodes.ir) as u8) ^ 0xFF
    }

    pub fn read_address_bus(&self) -> u16 {
        self.state.read_nodes(&self.nodes.address_bus) as u16
    }

    pub fn read_data_bus(&self) -> u8 {
        self.state.read_nodes(&self.nodes.data_bus) as u8
    }

    pub fn read_rw(&self) -> bool {
        self.state.is_node_high(self.nodes.rw)
    }

    pub fn write_data_bus(&mut self, v: u8) {
        self.state
            .write_nodes(&self.nodes.data_bus, v as u32)
            .expect("data bus nodes are never power rails");
    }

    /// Textual status dump, mirroring `perfect6502.c`'s `chipStatus`.
    pub fn chip_status(&self) -> String {
        format!(
            "half_cycle={} pc={:04x} a={:02x} x={:02x} y={:02x} sp={:02x} p={:02x} ir={:02x} addr={:04x} data={:02x} rw={}",
            self.half_cycle,
            self.read_pc(),
            self.read_a(),
            self.read_x(),
            self.read_y(),
            self.read_sp(),
            self.read_p(),
            self.read_ir(),
            self.read_address_bus(),
            self.read_data_bus(),
            self.read_rw(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::netlist;

    /// A "chip" with every probed role wired to an independent node with no
    /// transistors between them — it exercises the bus-facade mechanics
    /// (bit packing, reset sequencing, clock inversion, memory dispatch)
    /// without claiming to model real 6502 conduction. Named accordingly,
    /// since the real die netlist is not part of this crate.
    struct TestMemory([u8; 65536]);

    impl Memory for TestMemory {
        fn read(&self, addr: u16) -> u8 {
            self.0[addr as usize]
        }
        fn write(&mut self, addr: u16, value: u8) {
            self.0[addr as usize] = value;
        }
    }

    fn bundle(next: &mut NodeId, width: usize) -> Vec<NodeId> {
        (0..width).map(|_| { let n = *next; *next += 1; n }).collect()
    }

    fn mini_chip() -> Chip<TestMemory> {
        let mut n: NodeId = 2; // 0=vss, 1=vcc
        let clk0 = { let v = n; n += 1; v };
        let res = { let v = n; n += 1; v };
        let rdy = { let v = n; n += 1; v };
        let so = { let v = n; n += 1; v };
        let irq = { let v = n; n += 1; v };
        let nmi = { let v = n; n += 1; v };
        let rw = { let v = n; n += 1; v };
        let address_bus = bundle(&mut n, 16);
        let data_bus = bundle(&mut n, 8);
        let pc = bundle(&mut n, 16);
        let a = bundle(&mut n, 8);
        let x = bundle(&mut n, 8);
        let y = bundle(&mut n, 8);
        let sp = bundle(&mut n, 8);
        let p = bundle(&mut n, 8);
        let ir = bundle(&mut n, 8);

        let node_count = n as usize;
        let pullups = vec![false; node_count];
        let state = netlist::setup(node_count, 0, 1, &[], &pullups).unwrap();

        let nodes = NodeMap { clk0, res, rdy, so, irq, nmi, rw, address_bus, data_bus, pc, a, x, y, sp, p, ir };
        Chip::new(state, nodes, TestMemory([0u8; 65536]))
    }

    #[test]
    fn reset_releases_res_and_resets_half_cycle_counter() {
        let mut chip = mini_chip();
        chip.reset().unwrap();
        assert!(chip.state().is_node_high(chip.nodes.res));
        assert_eq!(chip.half_cycle(), 0);
    }

    #[test]
    fn step_toggles_clk0_each_call() {
        let mut chip = mini_chip();
        let before = chip.state().is_node_high(chip.nodes.clk0);
        chip.step().unwrap();
        assert_ne!(before, chip.state().is_node_high(chip.nodes.clk0));
        chip.step().unwrap();
        assert_eq!(before, chip.state().is_node_high(chip.nodes.clk0));
    }

    #[test]
    fn data_bus_round_trips_through_probe_accessors() {
        let mut chip = mini_chip();
        for v in [0x00u8, 0x55, 0xAA, 0xFF] {
            chip.write_data_bus(v);
            assert_eq!(chip.read_data_bus(), v);
        }
    }

    #[test]
    fn ir_probe_is_xored_against_the_inverted_net() {
        let mut chip = mini_chip();
        let ir_bundle = chip.nodes.ir.clone();
        chip.state_mut().write_nodes(&ir_bundle, 0xEA).unwrap();
        assert_eq!(chip.read_ir(), 0xEA ^ 0xFF);
    }

    #[test]
    fn falling_half_cycle_drives_a_memory_access() {
        let mut chip = mini_chip();
        chip.memory_mut().write(0x1234, 0x42);
        let addr_bundle = chip.nodes.address_bus.clone();
        chip.state_mut().write_nodes(&addr_bundle, 0x1234).unwrap();
        chip.state_mut().set_node(chip.nodes.rw, true).unwrap();

        // First step: CLK0 low->high, no memory access yet.
        chip.step().unwrap();
        // Second step: CLK0 high->low, triggers the read.
        chip.step().unwrap();
        assert_eq!(chip.read_data_bus(), 0x42);
    }
}
