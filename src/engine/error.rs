//! Error kinds for the netlist engine.

use thiserror::Error;

use super::NodeId;

/// Conditions the engine reports at its boundary.
///
/// `BadNetlist` is fatal and surfaces from setup. `PropagationCapped` is a
/// diagnostic: the worklist driver hit its iteration cap and quiescence
/// was not reached. The state remains usable but may be
/// inconsistent; callers typically re-`stabilize`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("transistor {transistor} references out-of-range node {node} (nodes = {nodes})")]
    BadNetlist {
        transistor: usize,
        node: NodeId,
        nodes: NodeId,
    },

    #[error("worklist driver hit its iteration cap ({cap}) without reaching quiescence")]
    PropagationCapped { cap: u32 },
}
