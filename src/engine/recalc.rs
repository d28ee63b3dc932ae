//! Node recalculator and worklist driver.
//!
//! Grounded on `netlist_sim.c`'s `recalcNode`/`recalcNodeList`. The
//! dependant-set asymmetry (`left_dependants` on a rising transition,
//! `dependants` on a falling one) is reproduced exactly rather than
//! collapsed to a single shared set, per DESIGN.md's decision.

use log::warn;

use super::error::EngineError;
use super::group::build_group;
use super::{NodeId, State, TransNum};

/// The worklist driver gives up after this many passes without reaching
/// quiescence: a netlist that never settles indicates a broken or
/// oscillating construction, not a transient the driver should spin on
/// forever.
const ITERATION_CAP: u32 = 50;

impl State {
    /// Recompute the group containing `node` and propagate any resulting
    /// value changes to `self.list_out`.
    pub(super) fn recalc_node(&mut self, node: NodeId) {
        if node == self.vss || node == self.vcc {
            return;
        }

        let vss = self.vss;
        let vcc = self.vcc;
        let group = &mut self.group;
        let trans_on = &self.trans_on;
        let pullup = &self.pullup;
        let pulldown = &self.pulldown;
        let value = &self.value;
        let channel_offset = &self.channel_offset;
        let channel_block = &self.channel_block;

        let tag = build_group(
            group,
            node,
            vss,
            vcc,
            |t: TransNum| trans_on.get(t as usize),
            |n: NodeId| pullup.get(n as usize),
            |n: NodeId| pulldown.get(n as usize),
            |n: NodeId| value.get(n as usize),
            |n: NodeId| {
                let n = n as usize;
                let start = channel_offset[n] as usize;
                let end = channel_offset[n + 1] as usize;
                &channel_block[start..end]
            },
        );
        let newv = tag.is_high();

        // `build_group` leaves its members in `self.group`; collect them so
        // the loop below can borrow `self` mutably again.
        let members: Vec<NodeId> = self.group.members().to_vec();

        for n in members {
            if self.value.get(n as usize) == newv {
                continue;
            }
            self.value.set(n as usize, newv);

            let gate_start = self.gate_offset[n as usize] as usize;
            let gate_end = self.gate_offset[n as usize + 1] as usize;
            for i in gate_start..gate_end {
                let t = self.gate_block[i];
                if Some(t) == self.broken_transistor {
                    continue;
                }
                self.trans_on.set(t as usize, newv);
            }

            let deps: &[NodeId] = if newv {
                let start = self.left_dep_offset[n as usize] as usize;
                let end = self.left_dep_offset[n as usize + 1] as usize;
                &self.left_dep_block[start..end]
            } else {
                let start = self.dep_offset[n as usize] as usize;
                let end = self.dep_offset[n as usize + 1] as usize;
                &self.dep_block[start..end]
            };
            for &d in deps {
                self.list_out.push(d);
            }
        }
    }

    /// Drain `self.list_in`, recalculating every queued node and collecting
    /// newly touched nodes into `self.list_out`, swapping the two halves
    /// each pass until the worklist empties (quiescence) or the iteration
    /// cap is hit.
    pub(super) fn recalc_node_list(&mut self) -> Result<(), EngineError> {
        let mut passes = 0u32;

        while !self.list_in.is_empty() {
            if passes >= ITERATION_CAP {
                warn!(
                    "worklist driver hit its iteration cap ({ITERATION_CAP}) without reaching quiescence"
                );
                self.list_in.clear();
                self.list_out.clear();
                return Err(EngineError::PropagationCapped { cap: ITERATION_CAP });
            }
            passes += 1;

            let nodes: Vec<NodeId> = self.list_in.iter().collect();
            for n in nodes {
                self.recalc_node(n);
            }

            self.list_in.clear();
            std::mem::swap(&mut self.list_in, &mut self.list_out);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::test_utils::inverter_chain;

    #[test]
    fn single_inverter_flips_input() {
        let mut fx = inverter_chain(1);
        fx.state.stabilize().unwrap();
        assert!(fx.state.is_node_high(fx.output)); // input floats low -> output high

        fx.state.set_node(fx.input, true).unwrap();
        assert!(!fx.state.is_node_high(fx.output));

        fx.state.set_node(fx.input, false).unwrap();
        assert!(fx.state.is_node_high(fx.output));
    }

    #[test]
    fn four_stage_chain_propagates_to_quiescence() {
        let mut fx = inverter_chain(4);
        fx.state.stabilize().unwrap();
        fx.state.set_node(fx.input, true).unwrap();
        // Four inversions of "high" is high.
        assert!(fx.state.is_node_high(fx.output));

        fx.state.set_node(fx.input, false).unwrap();
        assert!(!fx.state.is_node_high(fx.output));
    }

    #[test]
    fn recalc_node_skips_power_rails() {
        let mut fx = inverter_chain(1);
        let vss = fx.vss;
        fx.state.recalc_node(vss);
        // No panic, no change: rails never join a group.
        assert!(!fx.state.is_node_high(vss));
    }

    #[test]
    fn broken_transistor_pins_the_gated_node_off() {
        // Unbroken: driving the inverter's input high pulls its output low.
        let mut fx = inverter_chain(1);
        fx.state.stabilize().unwrap();
        fx.state.set_node(fx.input, true).unwrap();
        assert!(!fx.state.is_node_high(fx.output));

        // Same netlist, but with the inverter's sole transistor pinned off:
        // its pulldown path never engages, so the output's own weak pull-up
        // wins regardless of the input, diverging from the unbroken trace.
        let mut broken = inverter_chain(1);
        broken.state.set_broken_transistor(Some(0));
        broken.state.stabilize().unwrap();
        broken.state.set_node(broken.input, true).unwrap();
        assert!(broken.state.is_node_high(broken.output));
        assert!(!broken.state.transistor_on(0));
    }
}
