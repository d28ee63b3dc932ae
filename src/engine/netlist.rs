//! Netlist setup: compacts raw transistor records and a per-node pull-up
//! default array into the runtime layout the rest of the engine operates
//! on.
//!
//! Grounded on `netlist_sim.c`'s `setupNodesAndTransistors` (dedup pass,
//! two CSR builds, dependant-set derivation). *Dependants* is every
//! non-rail channel endpoint of every transistor a node gates;
//! *left-dependants* is one representative non-rail endpoint per such
//! transistor.

use std::collections::HashSet;

use super::bitmap::Bitmap;
use super::error::EngineError;
use super::group::Group;
use super::worklist::WorkList;
use super::{ChannelEndpoint, NodeId, State, TransNum};

/// A raw transistor record as supplied by the host: `(gate, c1, c2)`.
pub type RawTransistor = (NodeId, NodeId, NodeId);

/// Build a runtime [`State`] from raw netlist arrays.
///
/// `pullups[n]` is the default weak-pull-up bit for node `n`; nodes beyond
/// `pullups.len()` (if any) default to no pull-up. Returns
/// [`EngineError::BadNetlist`] if any transistor names a node `>=
/// node_count`.
pub fn setup(
    node_count: usize,
    vss: NodeId,
    vcc: NodeId,
    transistors: &[RawTransistor],
    pullups: &[bool],
) -> Result<State, EngineError> {
    for (idx, &(gate, c1, c2)) in transistors.iter().enumerate() {
        for node in [gate, c1, c2] {
            if node as usize >= node_count {
                return Err(EngineError::BadNetlist {
                    transistor: idx,
                    node,
                    nodes: node_count as NodeId,
                });
            }
        }
    }

    // Dedup: same gate and unordered channel pair name the same transistor.
    let mut seen = HashSet::with_capacity(transistors.len());
    let mut deduped: Vec<RawTransistor> = Vec::with_capacity(transistors.len());
    for &(gate, c1, c2) in transistors {
        let (lo, hi) = if c1 <= c2 { (c1, c2) } else { (c2, c1) };
        if seen.insert((gate, lo, hi)) {
            deduped.push((gate, c1, c2));
        }
    }
    let trans_count = deduped.len();

    // --- Gate CSR: transistors grouped by gate node. ---
    let mut gate_counts = vec![0u32; node_count];
    for &(gate, _, _) in &deduped {
        gate_counts[gate as usize] += 1;
    }
    let gate_offset = prefix_sum(&gate_counts);
    let mut gate_cursor = gate_offset.clone();
    let mut gate_block = vec![0 as TransNum; trans_count];
    for (t, &(gate, _, _)) in deduped.iter().enumerate() {
        let slot = &mut gate_cursor[gate as usize];
        gate_block[*slot as usize] = t as TransNum;
        *slot += 1;
    }

    // --- Channel CSR: two endpoints per transistor. ---
    let mut channel_counts = vec![0u32; node_count];
    for &(_, c1, c2) in &deduped {
        channel_counts[c1 as usize] += 1;
        channel_counts[c2 as usize] += 1;
    }
    let channel_offset = prefix_sum(&channel_counts);
    let mut channel_cursor = channel_offset.clone();
    let mut channel_block = vec![ChannelEndpoint { transistor: 0, other_node: 0 }; 2 * trans_count];
    for (t, &(_, c1, c2)) in deduped.iter().enumerate() {
        let slot1 = &mut channel_cursor[c1 as usize];
        channel_block[*slot1 as usize] = ChannelEndpoint { transistor: t as TransNum, other_node: c2 };
        *slot1 += 1;

        let slot2 = &mut channel_cursor[c2 as usize];
        channel_block[*slot2 as usize] = ChannelEndpoint { transistor: t as TransNum, other_node: c1 };
        *slot2 += 1;
    }

    // --- Dependants / left-dependants. ---
    let mut dep_lists: Vec<Vec<NodeId>> = vec![Vec::new(); node_count];
    let mut left_dep_lists: Vec<Vec<NodeId>> = vec![Vec::new(); node_count];
    for n in 0..node_count {
        let start = gate_offset[n] as usize;
        let end = gate_offset[n + 1] as usize;
        for &t in &gate_block[start..end] {
            let (_, c1, c2) = deduped[t as usize];
            let c1_is_rail = c1 == vss || c1 == vcc;
            let c2_is_rail = c2 == vss || c2 == vcc;

            if !c1_is_rail {
                dep_lists[n].push(c1);
            }
            if !c2_is_rail {
                dep_lists[n].push(c2);
            }

            if !c1_is_rail {
                left_dep_lists[n].push(c1);
            } else if !c2_is_rail {
                left_dep_lists[n].push(c2);
            }
        }
        dep_lists[n].sort_unstable();
        dep_lists[n].dedup();
        left_dep_lists[n].sort_unstable();
        left_dep_lists[n].dedup();
    }
    let (dep_offset, dep_block) = flatten(&dep_lists);
    let (left_dep_offset, left_dep_block) = flatten(&left_dep_lists);

    Ok(State {
        vss,
        vcc,
        node_count,
        trans_count,
        pullup: {
            let mut bm = Bitmap::new(node_count);
            for (n, &p) in pullups.iter().enumerate().take(node_count) {
                bm.set(n, p);
            }
            bm
        },
        pulldown: Bitmap::new(node_count),
        value: Bitmap::new(node_count),
        trans_on: Bitmap::new(trans_count),
        trans_gate: deduped.iter().map(|&(g, _, _)| g).collect(),
        trans_c1: deduped.iter().map(|&(_, c1, _)| c1).collect(),
        trans_c2: deduped.iter().map(|&(_, _, c2)| c2).collect(),
        gate_offset,
        gate_block,
        channel_offset,
        channel_block,
        dep_offset,
        dep_block,
        left_dep_offset,
        left_dep_block,
        list_in: WorkList::new(node_count),
        list_out: WorkList::new(node_count),
        group: Group::new(node_count),
        broken_transistor: None,
    })
}

fn prefix_sum(counts: &[u32]) -> Vec<u32> {
    let mut offsets = Vec::with_capacity(counts.len() + 1);
    let mut running = 0u32;
    offsets.push(0);
    for &c in counts {
        running += c;
        offsets.push(running);
    }
    offsets
}

fn flatten(lists: &[Vec<NodeId>]) -> (Vec<u32>, Vec<NodeId>) {
    let counts: Vec<u32> = lists.iter().map(|l| l.len() as u32).collect();
    let offsets = prefix_sum(&counts);
    let mut block = Vec::with_capacity(*offsets.last().unwrap() as usize);
    for l in lists {
        block.extend_from_slice(l);
    }
    (offsets, block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_transistor_referencing_out_of_range_node() {
        let err = setup(3, 0, 1, &[(2, 0, 5)], &[false, false, false]).unwrap_err();
        assert_eq!(
            err,
            EngineError::BadNetlist { transistor: 0, node: 5, nodes: 3 }
        );
    }

    #[test]
    fn dedups_same_gate_and_unordered_channel_pair() {
        let state = setup(
            4,
            0,
            1,
            &[(2, 3, 0), (2, 0, 3), (2, 3, 1)],
            &[false, false, false, false],
        )
        .unwrap();
        // (2,3,0) and (2,0,3) are the same transistor in unordered form.
        assert_eq!(state.transistor_count(), 2);
    }

    #[test]
    fn gate_csr_groups_transistors_by_gate_node() {
        let state = setup(
            4,
            0,
            1,
            &[(2, 3, 0), (3, 2, 1)],
            &[false, false, false, false],
        )
        .unwrap();
        let gated_by_2 = state.gate_offset[2 + 1] - state.gate_offset[2];
        let gated_by_3 = state.gate_offset[3 + 1] - state.gate_offset[3];
        assert_eq!(gated_by_2, 1);
        assert_eq!(gated_by_3, 1);
    }

    #[test]
    fn dependant_sets_exclude_rails_and_left_is_subset_sized() {
        // Node 2 gates one transistor whose channel connects 3 (non-rail) and
        // 0==VSS (rail). dependants(2) should contain {3}; left-dependants(2)
        // should also be {3} (the only non-rail endpoint).
        let state = setup(4, 0, 1, &[(2, 3, 0)], &[false, false, false, false]).unwrap();
        let dep = &state.dep_block[state.dep_offset[2] as usize..state.dep_offset[3] as usize];
        let left = &state.left_dep_block[state.left_dep_offset[2] as usize..state.left_dep_offset[3] as usize];
        assert_eq!(dep, &[3]);
        assert_eq!(left, &[3]);
    }
}
