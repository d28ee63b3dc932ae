//! Group builder: the connected component of nodes reachable from a seed
//! through currently-on transistors, plus the resolved driven value for
//! that component.
//!
//! Grounded on `netlist_sim.c`'s `addNodeToGroup`/`getGroupValue`. The
//! flood fill below uses an explicit work-stack instead of the original's
//! native recursion, so the largest connected component cannot overflow
//! the host call stack.

use super::bitmap::Bitmap;
use super::{ChannelEndpoint, NodeId};

/// The six-way value tag a group accumulates while it is built, weakest to
/// strongest: `Nothing < Hi < PullUp < PullDown < Vcc < Vss`.
///
/// Kept as an explicit enum with a derived `Ord` rather than raw integers,
/// so the ordering can't silently widen or be compared against an
/// unrelated numeric type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GroupValue {
    Nothing,
    Hi,
    PullUp,
    PullDown,
    Vcc,
    Vss,
}

impl GroupValue {
    /// The group's resolved boolean level.
    pub fn is_high(self) -> bool {
        matches!(self, GroupValue::Vcc | GroupValue::PullUp | GroupValue::Hi)
    }
}

/// Transient per-recalculation scratch buffer: an ordered member list plus a
/// membership bitmap for O(1) `contains` checks. Reused across
/// recalculations; `clear` resets it for the next seed.
pub struct Group {
    members: Vec<NodeId>,
    membership: Bitmap,
}

impl Group {
    pub fn new(nodes: usize) -> Self {
        Self {
            members: Vec::with_capacity(nodes.min(256)),
            membership: Bitmap::new(nodes),
        }
    }

    pub fn clear(&mut self) {
        self.members.clear();
        self.membership.clear();
    }

    pub fn contains(&self, n: NodeId) -> bool {
        self.membership.get(n as usize)
    }

    pub fn members(&self) -> &[NodeId] {
        &self.members
    }

    fn add(&mut self, n: NodeId) {
        self.members.push(n);
        self.membership.set(n as usize, true);
    }
}

/// Tighten `val` to `candidate` iff `candidate` is strictly stronger.
#[inline]
fn tighten(val: GroupValue, candidate: GroupValue) -> GroupValue {
    if candidate > val { candidate } else { val }
}

/// Flood-fill the seed's transistor-connected component into `group` and
/// return its resolved value tag.
///
/// `is_on` reports whether a transistor currently conducts; `pullup`/
/// `pulldown`/`value` are the per-node bitmaps read during tightening;
/// `channel_neighbors` returns the `(transistor, other-node)` pairs for a
/// node's channel-endpoint incidences (the CSR slice built at setup).
#[allow(clippy::too_many_arguments)]
pub fn build_group<'a>(
    group: &mut Group,
    seed: NodeId,
    vss: NodeId,
    vcc: NodeId,
    is_on: impl Fn(super::TransNum) -> bool,
    pullup: impl Fn(NodeId) -> bool,
    pulldown: impl Fn(NodeId) -> bool,
    value: impl Fn(NodeId) -> bool,
    channel_neighbors: impl Fn(NodeId) -> &'a [ChannelEndpoint],
) -> GroupValue {
    group.clear();

    // Explicit work-stack flood fill. Each entry is a node still to be
    // expanded; the running tag is threaded alongside rather than recursed.
    let mut stack = vec![seed];
    let mut tag = GroupValue::Nothing;

    while let Some(n) = stack.pop() {
        if n == vss {
            // VSS dominates; stop expanding through this branch.
            tag = GroupValue::Vss;
            continue;
        }
        if n == vcc {
            if tag != GroupValue::Vss {
                tag = tighten(tag, GroupValue::Vcc);
            }
            continue;
        }
        if group.contains(n) {
            continue;
        }
        group.add(n);

        if pulldown(n) {
            tag = tighten(tag, GroupValue::PullDown);
        }
        if pullup(n) {
            tag = tighten(tag, GroupValue::PullUp);
        }
        if value(n) {
            tag = tighten(tag, GroupValue::Hi);
        }

        for ChannelEndpoint { transistor, other_node } in channel_neighbors(n) {
            if is_on(*transistor) {
                stack.push(*other_node);
            }
        }
    }

    tag
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints(table: &'static [(NodeId, &'static [ChannelEndpoint])], n: NodeId) -> &'static [ChannelEndpoint] {
        table
            .iter()
            .find(|(k, _)| *k == n)
            .map(|(_, v)| *v)
            .unwrap_or(&[])
    }

    #[test]
    fn seed_alone_with_no_transistors_is_nothing_or_hi() {
        let mut group = Group::new(4);
        let val = build_group(
            &mut group,
            2,
            0,
            1,
            |_| false,
            |_| false,
            |_| false,
            |_| false,
            |_n: NodeId| -> &'static [ChannelEndpoint] { &[] },
        );
        assert_eq!(val, GroupValue::Nothing);
        assert_eq!(group.members(), &[2]);
    }

    #[test]
    fn stops_expanding_at_vss_and_vcc_without_revisiting() {
        // node 2 -- t0(on) -- VSS(0); node 2 -- t1(on) -- VCC(1)
        static EDGES: &[(NodeId, &[ChannelEndpoint])] = &[(
            2,
            &[
                ChannelEndpoint { transistor: 0, other_node: 0 },
                ChannelEndpoint { transistor: 1, other_node: 1 },
            ],
        )];
        let mut group = Group::new(4);
        let val = build_group(
            &mut group,
            2,
            0,
            1,
            |_| true,
            |_| false,
            |_| false,
            |_| false,
            |n| endpoints(EDGES, n),
        );
        // VSS dominates over VCC.
        assert_eq!(val, GroupValue::Vss);
        assert_eq!(group.members(), &[2]);
    }

    #[test]
    fn pullup_beats_hi_beats_nothing() {
        let mut group = Group::new(4);
        let val = build_group(
            &mut group, 2, 0, 1, |_| false, |n| n == 2, |_| false, |_| false,
            |_n: NodeId| -> &'static [ChannelEndpoint] { &[] },
        );
        assert_eq!(val, GroupValue::PullUp);

        let mut group2 = Group::new(4);
        let val2 = build_group(
            &mut group2, 2, 0, 1, |_| false, |_| false, |_| false, |n| n == 2,
            |_n: NodeId| -> &'static [ChannelEndpoint] { &[] },
        );
        assert_eq!(val2, GroupValue::Hi);
    }

    #[test]
    fn off_transistor_does_not_expand_component() {
        static EDGES: &[(NodeId, &[ChannelEndpoint])] =
            &[(2, &[ChannelEndpoint { transistor: 0, other_node: 3 }])];
        let mut group = Group::new(4);
        let val = build_group(
            &mut group, 2, 0, 1, |_| false, |_| false, |_| false, |_| false,
            |n| endpoints(EDGES, n),
        );
        assert_eq!(val, GroupValue::Nothing);
        assert_eq!(group.members(), &[2]);
    }
}
