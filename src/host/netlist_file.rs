//! Netlist file loader.
//!
//! The engine's setup contract takes two parallel host-supplied arrays —
//! transistor triples and per-node pull-up booleans — without mandating
//! any particular serialization. This module defines the plain text
//! format the three executables under `src/bin/` use to obtain those
//! arrays (plus the named node indices a [`NodeMap`] needs) from a file on
//! disk, since the real MOS 6502 die-extracted node/transistor tables are
//! not bundled with this crate and must be supplied by the host.
//!
//! Format, one directive per line, blank lines and `#`-comments ignored:
//!
//! ```text
//! NODES <count> <vss> <vcc>
//! PULLUP <0|1> <0|1> ...          # exactly <count> values
//! TRANSISTOR <gate> <c1> <c2>     # one line per transistor
//! NODEMAP <ROLE> <id> [<id> ...]  # CLK0 RES RDY SO IRQ NMI RW take one id;
//!                                 # the bus/register roles take a bundle
//! ```

use std::fs;
use std::path::Path;

use log::info;

use crate::engine::netlist::{self, RawTransistor};
use crate::engine::State;
use crate::probe::NodeMap;

pub struct Loaded {
    pub state: State,
    pub nodes: NodeMap,
}

/// Single-valued `NODEMAP` roles.
const SCALAR_ROLES: &[&str] = &["CLK0", "RES", "RDY", "SO", "IRQ", "NMI", "RW"];

pub fn load(path: &Path) -> Result<Loaded, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("could not read netlist file {}: {e}", path.display()))?;

    let mut node_count: Option<usize> = None;
    let mut vss = 0u16;
    let mut vcc = 0u16;
    let mut pullups: Vec<bool> = Vec::new();
    let mut transistors: Vec<RawTransistor> = Vec::new();

    let mut clk0 = None;
    let mut res = None;
    let mut rdy = None;
    let mut so = None;
    let mut irq = None;
    let mut nmi = None;
    let mut rw = None;
    let mut address_bus = Vec::new();
    let mut data_bus = Vec::new();
    let mut pc = Vec::new();
    let mut a = Vec::new();
    let mut x = Vec::new();
    let mut y = Vec::new();
    let mut sp = Vec::new();
    let mut p = Vec::new();
    let mut ir = Vec::new();

    for (lineno, raw_line) in text.lines().enumerate() {
        let line = raw_line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let directive = fields
            .next()
            .ok_or_else(|| format!("{}:{}: empty directive", path.display(), lineno + 1))?;

        let rest: Vec<&str> = fields.collect();
        let err = |msg: String| format!("{}:{}: {msg}", path.display(), lineno + 1);
        let parse_u16 = |s: &str| -> Result<u16, String> {
            s.parse::<u16>().map_err(|_| err(format!("expected a node/transistor index, got {s:?}")))
        };

        match directive {
            "NODES" => {
                if rest.len() != 3 {
                    return Err(err("NODES wants exactly 3 fields: count vss vcc".into()));
                }
                node_count = Some(
                    rest[0]
                        .parse::<usize>()
                        .map_err(|_| err(format!("expected a node count, got {:?}", rest[0])))?,
                );
                vss = parse_u16(rest[1])?;
                vcc = parse_u16(rest[2])?;
            }
            "PULLUP" => {
                for s in rest {
                    pullups.push(match s {
                        "0" => false,
                        "1" => true,
                        other => return Err(err(format!("expected 0 or 1 in PULLUP, got {other:?}"))),
                    });
                }
            }
            "TRANSISTOR" => {
                if rest.len() != 3 {
                    return Err(err("TRANSISTOR wants exactly 3 fields: gate c1 c2".into()));
                }
                transistors.push((parse_u16(rest[0])?, parse_u16(rest[1])?, parse_u16(rest[2])?));
            }
            "NODEMAP" => {
                let role = rest
                    .first()
                    .ok_or_else(|| err("NODEMAP wants a role name".into()))?
                    .to_uppercase();
                let ids: Result<Vec<u16>, String> = rest[1..].iter().map(|s| parse_u16(s)).collect();
                let ids = ids?;

                if SCALAR_ROLES.contains(&role.as_str()) {
                    if ids.len() != 1 {
                        return Err(err(format!("NODEMAP {role} wants exactly one node id")));
                    }
                    let id = ids[0];
                    match role.as_str() {
                        "CLK0" => clk0 = Some(id),
                        "RES" => res = Some(id),
                        "RDY" => rdy = Some(id),
                        "SO" => so = Some(id),
                        "IRQ" => irq = Some(id),
                        "NMI" => nmi = Some(id),
                        "RW" => rw = Some(id),
                        _ => unreachable!(),
                    }
                } else {
                    match role.as_str() {
                        "ADDRESS_BUS" => address_bus = ids,
                        "DATA_BUS" => data_bus = ids,
                        "PC" => pc = ids,
                        "A" => a = ids,
                        "X" => x = ids,
                        "Y" => y = ids,
                        "SP" => sp = ids,
                        "P" => p = ids,
                        "IR" => ir = ids,
                        other => return Err(err(format!("unknown NODEMAP role {other:?}"))),
                    }
                }
            }
            other => return Err(err(format!("unknown directive {other:?}"))),
        }
    }

    let node_count = node_count.ok_or_else(|| format!("{}: missing NODES directive", path.display()))?;

    let state = netlist::setup(node_count, vss, vcc, &transistors, &pullups)
        .map_err(|e| format!("{}: {e}", path.display()))?;

    let nodes = NodeMap {
        clk0: clk0.ok_or_else(|| format!("{}: missing NODEMAP CLK0", path.display()))?,
        res: res.ok_or_else(|| format!("{}: missing NODEMAP RES", path.display()))?,
        rdy: rdy.ok_or_else(|| format!("{}: missing NODEMAP RDY", path.display()))?,
        so: so.ok_or_else(|| format!("{}: missing NODEMAP SO", path.display()))?,
        irq: irq.ok_or_else(|| format!("{}: missing NODEMAP IRQ", path.display()))?,
        nmi: nmi.ok_or_else(|| format!("{}: missing NODEMAP NMI", path.display()))?,
        rw: rw.ok_or_else(|| format!("{}: missing NODEMAP RW", path.display()))?,
        address_bus,
        data_bus,
        pc,
        a,
        x,
        y,
        sp,
        p,
        ir,
    };

    info!(
        "loaded netlist {} ({} nodes, {} transistors)",
        path.display(),
        state.node_count(),
        state.transistor_count()
    );

    Ok(Loaded { state, nodes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("netlist_file_test_{}.txt", contents.len()));
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    /// A minimal valid file: one inverter (gate-controlled pulldown) plus
    /// every required scalar NODEMAP role pointed at node 2, and bundles of
    /// length 1 for every bus/register role.
    fn minimal_netlist_text() -> String {
        "NODES 3 0 1\n\
         PULLUP 0 0 1\n\
         TRANSISTOR 2 0 1\n\
         NODEMAP CLK0 2\n\
         NODEMAP RES 2\n\
         NODEMAP RDY 2\n\
         NODEMAP SO 2\n\
         NODEMAP IRQ 2\n\
         NODEMAP NMI 2\n\
         NODEMAP RW 2\n\
         NODEMAP ADDRESS_BUS 2\n\
         NODEMAP DATA_BUS 2\n\
         NODEMAP PC 2\n\
         NODEMAP A 2\n\
         NODEMAP X 2\n\
         NODEMAP Y 2\n\
         NODEMAP SP 2\n\
         NODEMAP P 2\n\
         NODEMAP IR 2\n"
            .to_string()
    }

    #[test]
    fn loads_a_well_formed_netlist_file() {
        let path = write_temp(&minimal_netlist_text());
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.state.node_count(), 3);
        assert_eq!(loaded.state.transistor_count(), 1);
        assert_eq!(loaded.nodes.clk0, 2);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn rejects_a_transistor_with_an_out_of_range_node() {
        let text = "NODES 2 0 1\nPULLUP 0 0\nTRANSISTOR 0 1 5\n";
        let path = write_temp(text);
        let err = load(&path).unwrap_err();
        assert!(err.contains("out-of-range") || err.contains("BadNetlist") || err.to_lowercase().contains("node"));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn rejects_a_file_missing_the_nodes_directive() {
        let text = "TRANSISTOR 0 1 2\n";
        let path = write_temp(text);
        let err = load(&path).unwrap_err();
        assert!(err.contains("missing NODES"));
        fs::remove_file(&path).unwrap();
    }
}
