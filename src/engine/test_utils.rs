//! Synthetic netlist fixtures for engine unit tests (SPEC_FULL.md's ambient
//! test-tooling note). These are small hand-built netlists exercising one
//! behavior each — not literal 6502 chip data, which is not part of this
//! crate (see [`crate::engine`] module docs).

use super::netlist;
use super::{NodeId, State};

/// A chain of `n` nMOS-with-weak-pullup inverters: node `input` feeds
/// inverter 0, whose output feeds inverter 1, and so on; `output` is the
/// final stage's node. `output` tracks `input` inverted `n` times.
pub struct InverterChain {
    pub state: State,
    pub vss: NodeId,
    pub vcc: NodeId,
    pub input: NodeId,
    pub output: NodeId,
}

pub fn inverter_chain(n: usize) -> InverterChain {
    assert!(n >= 1, "inverter_chain needs at least one stage");

    let vss: NodeId = 0;
    let vcc: NodeId = 1;
    let first_signal: NodeId = 2;
    let node_count = 2 + n + 1;

    let mut pullups = vec![false; node_count];
    let mut transistors = Vec::with_capacity(n);
    for i in 0..n {
        let gate = first_signal + i as NodeId;
        let out = first_signal + i as NodeId + 1;
        transistors.push((gate, out, vss));
        pullups[out as usize] = true;
    }

    let state = netlist::setup(node_count, vss, vcc, &transistors, &pullups)
        .expect("synthetic inverter chain netlist is well-formed");

    InverterChain {
        state,
        vss,
        vcc,
        input: first_signal,
        output: first_signal + n as NodeId,
    }
}

/// A single node with only a weak pull-up and no conducting path to
/// anything: it reads high once stabilized, with nothing else driving it.
pub struct PullupNode {
    pub state: State,
    pub vss: NodeId,
    pub vcc: NodeId,
    pub node: NodeId,
}

pub fn pullup_only() -> PullupNode {
    let vss: NodeId = 0;
    let vcc: NodeId = 1;
    let node: NodeId = 2;
    let pullups = vec![false, false, true];
    let state = netlist::setup(3, vss, vcc, &[], &pullups)
        .expect("synthetic pullup netlist is well-formed");
    PullupNode { state, vss, vcc, node }
}

/// Two signal nodes, `a` and `b`, joined by a single transmission-gate
/// transistor whose gate is `enable`. While `enable` is high the two sides
/// share one value; while low they are independent.
pub struct TransmissionGate {
    pub state: State,
    pub vss: NodeId,
    pub vcc: NodeId,
    pub enable: NodeId,
    pub a: NodeId,
    pub b: NodeId,
}

pub fn transmission_gate() -> TransmissionGate {
    let vss: NodeId = 0;
    let vcc: NodeId = 1;
    let enable: NodeId = 2;
    let a: NodeId = 3;
    let b: NodeId = 4;
    let pullups = vec![false; 5];
    let transistors = vec![(enable, a, b)];
    let state = netlist::setup(5, vss, vcc, &transistors, &pullups)
        .expect("synthetic transmission-gate netlist is well-formed");
    TransmissionGate { state, vss, vcc, enable, a, b }
}
