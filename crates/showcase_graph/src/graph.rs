// SPDX-License-Identifier: MIT OR Apache-2.0
//! Control-flow graph recovered from a disassembly listing.

use crate::block::{BasicBlock, BlockId};
use crate::edge::{Edge, EdgeId, EdgeKind};
use crate::instruction::{Flow, Instruction};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use showcase_playback::AsmLine;
use std::collections::{HashSet, VecDeque};

/// A function's control-flow graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlFlowGraph {
    /// Graph name
    pub name: String,
    /// Blocks in listing order
    blocks: IndexMap<BlockId, BasicBlock>,
    /// Edges in discovery order
    edges: IndexMap<EdgeId, Edge>,
}

impl ControlFlowGraph {
    /// Recover the graph of a listing.
    ///
    /// Leaders are the first row, every in-listing branch target and every
    /// row following a branch, jump or return. Rows must be in ascending
    /// address order.
    pub fn from_listing(name: impl Into<String>, lines: &[AsmLine]) -> Result<Self, CfgError> {
        let rows = parse_rows(lines)?;
        let addresses: HashSet<u64> = rows.iter().map(|r| r.address).collect();

        let mut leaders = HashSet::new();
        leaders.insert(rows[0].address);
        for (index, row) in rows.iter().enumerate() {
            if let Some(target) = row.flow.target().filter(|t| addresses.contains(t)) {
                leaders.insert(target);
            }
            if row.flow.ends_block() {
                if let Some(next) = rows.get(index + 1) {
                    leaders.insert(next.address);
                }
            }
        }

        let mut graph = Self {
            name: name.into(),
            blocks: IndexMap::new(),
            edges: IndexMap::new(),
        };

        let mut current = Vec::new();
        for row in rows {
            if leaders.contains(&row.address) && !current.is_empty() {
                graph.add_block(BasicBlock::new(std::mem::take(&mut current)));
            }
            current.push(row);
        }
        graph.add_block(BasicBlock::new(current));

        graph.link(&addresses);
        graph.assign_layers();

        tracing::debug!(
            graph = %graph.name,
            blocks = graph.block_count(),
            edges = graph.edge_count(),
            "Recovered control-flow graph"
        );
        Ok(graph)
    }

    fn add_block(&mut self, block: BasicBlock) {
        self.blocks.insert(block.id, block);
    }

    fn link(&mut self, addresses: &HashSet<u64>) {
        let order: Vec<BlockId> = self.blocks.keys().copied().collect();
        let mut exits = Vec::new();

        for (index, &id) in order.iter().enumerate() {
            let next = order.get(index + 1).copied();
            let flow = self.blocks[&id].terminator().map_or(Flow::Next, |t| t.flow);
            let inside =
                |target: Option<u64>| target.filter(|t| addresses.contains(t)).map(BlockId);

            let mut exit = false;
            let mut outgoing = Vec::new();
            match flow {
                Flow::Next => match next {
                    Some(next) => outgoing.push((next, EdgeKind::Fallthrough)),
                    None => exit = true,
                },
                Flow::Branch(target) => {
                    match next {
                        Some(next) => outgoing.push((next, EdgeKind::Fallthrough)),
                        None => exit = true,
                    }
                    match inside(target) {
                        Some(to) => outgoing.push((to, EdgeKind::Taken)),
                        None => exit = true,
                    }
                }
                Flow::Jump(target) => match inside(target) {
                    Some(to) => outgoing.push((to, EdgeKind::Jump)),
                    None => exit = true,
                },
                Flow::Return => exit = true,
            }

            for (to, kind) in outgoing {
                let edge = Edge::new(id, to, kind);
                self.edges.insert(edge.id, edge);
            }
            if exit {
                exits.push(id);
            }
        }

        for id in exits {
            if let Some(block) = self.blocks.get_mut(&id) {
                block.exit = true;
            }
        }
    }

    fn assign_layers(&mut self) {
        let mut depth: IndexMap<BlockId, usize> = IndexMap::new();
        let mut queue = VecDeque::new();
        if let Some(entry) = self.entry() {
            depth.insert(entry, 0);
            queue.push_back(entry);
        }
        while let Some(id) = queue.pop_front() {
            let layer = depth[&id];
            for to in self.successors(id).collect::<Vec<_>>() {
                if !depth.contains_key(&to) {
                    depth.insert(to, layer + 1);
                    queue.push_back(to);
                }
            }
        }

        // Unreachable blocks sit below everything else
        let floor = depth.values().copied().max().map_or(0, |d| d + 1);
        for block in self.blocks.values_mut() {
            block.layer = depth.get(&block.id).copied().unwrap_or(floor);
        }
    }

    /// Entry block (the first in the listing)
    pub fn entry(&self) -> Option<BlockId> {
        self.blocks.keys().next().copied()
    }

    /// Get a block by ID
    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(&id)
    }

    /// Get all blocks in listing order
    pub fn blocks(&self) -> impl Iterator<Item = &BasicBlock> {
        self.blocks.values()
    }

    /// Get the number of blocks
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Get an edge by ID
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// Get all edges
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Edges leaving a block
    pub fn edges_from(&self, id: BlockId) -> impl Iterator<Item = &Edge> {
        self.edges.values().filter(move |e| e.from == id)
    }

    /// Blocks reachable in one step
    pub fn successors(&self, id: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.edges_from(id).map(|e| e.to)
    }

    /// Get the number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Blocks breadth-first from the entry, then unreachable blocks in
    /// listing order
    pub fn breadth_first(&self) -> Vec<BlockId> {
        let mut seen = HashSet::new();
        let mut order = Vec::with_capacity(self.blocks.len());
        let mut queue: VecDeque<BlockId> = self.entry().into_iter().collect();
        seen.extend(self.entry());

        while let Some(id) = queue.pop_front() {
            order.push(id);
            for to in self.successors(id) {
                if seen.insert(to) {
                    queue.push_back(to);
                }
            }
        }
        for id in self.blocks.keys() {
            if seen.insert(*id) {
                order.push(*id);
            }
        }
        order
    }
}

fn parse_rows(lines: &[AsmLine]) -> Result<Vec<Instruction>, CfgError> {
    if lines.is_empty() {
        return Err(CfgError::EmptyListing);
    }

    let mut rows: Vec<Instruction> = Vec::with_capacity(lines.len());
    for (line, asm) in lines.iter().enumerate() {
        let row = Instruction::parse(asm).ok_or_else(|| CfgError::BadAddress {
            line,
            addr: asm.addr.clone(),
        })?;
        if let Some(prev) = rows.last() {
            if row.address <= prev.address {
                return Err(CfgError::UnorderedAddress {
                    line,
                    address: row.address,
                });
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Error when recovering a graph from a listing
#[derive(Debug, thiserror::Error)]
pub enum CfgError {
    /// Listing has no rows
    #[error("Listing is empty")]
    EmptyListing,

    /// Address column is not hex
    #[error("Line {line}: invalid address {addr:?}")]
    BadAddress {
        /// Row index
        line: usize,
        /// Offending address text
        addr: String,
    },

    /// Addresses must strictly increase
    #[error("Line {line}: address {address:#x} is out of order")]
    UnorderedAddress {
        /// Row index
        line: usize,
        /// Offending address
        address: u64,
    },
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn compute_sum_listing() -> Vec<AsmLine> {
        vec![
            AsmLine::new("00401000", "55", "push   ebp"),
            AsmLine::new("00401001", "89 e5", "mov    ebp,esp"),
            AsmLine::new("00401003", "83 ec 10", "sub    esp,0x10"),
            AsmLine::new("00401006", "c7 45 fc 00 00 00 00", "mov    DWORD PTR [ebp-0x4],0x0"),
            AsmLine::new("0040100a", "c7 45 f8 01 00 00 00", "mov    DWORD PTR [ebp-0x8],0x1"),
            AsmLine::new("00401011", "83 7d f8 0a", "cmp    DWORD PTR [ebp-0x8],0xa"),
            AsmLine::new("00401015", "7f 12", "jg     0x401029"),
            AsmLine::new("00401017", "8b 45 f8", "mov    eax,DWORD PTR [ebp-0x8]"),
            AsmLine::new("0040101a", "01 45 fc", "add    DWORD PTR [ebp-0x4],eax"),
            AsmLine::new("0040101d", "83 45 f8 01", "add    DWORD PTR [ebp-0x8],0x1"),
            AsmLine::new("00401021", "eb ee", "jmp    0x401011"),
            AsmLine::new("00401023", "8b 45 fc", "mov    eax,DWORD PTR [ebp-0x4]"),
            AsmLine::new("00401026", "c9 c3", "leave; ret"),
        ]
    }

    #[test]
    fn test_blocks_split_at_leaders() {
        let graph = ControlFlowGraph::from_listing("compute_sum", &compute_sum_listing()).unwrap();
        let starts: Vec<u64> = graph.blocks().map(|b| b.start()).collect();
        assert_eq!(starts, vec![0x401000, 0x401011, 0x401017, 0x401023]);
        assert_eq!(graph.block(BlockId(0x401000)).unwrap().len(), 5);
        assert_eq!(graph.block(BlockId(0x401011)).unwrap().end(), 0x401015);
    }

    #[test]
    fn test_edges_and_back_edges() {
        let graph = ControlFlowGraph::from_listing("compute_sum", &compute_sum_listing()).unwrap();
        let edges: Vec<(u64, u64, EdgeKind, bool)> = graph
            .edges()
            .map(|e| (e.from.0, e.to.0, e.kind, e.is_back_edge()))
            .collect();
        assert_eq!(
            edges,
            vec![
                (0x401000, 0x401011, EdgeKind::Fallthrough, false),
                (0x401011, 0x401017, EdgeKind::Fallthrough, false),
                (0x401017, 0x401011, EdgeKind::Jump, true),
            ]
        );
    }

    #[test]
    fn test_exit_blocks() {
        let graph = ControlFlowGraph::from_listing("compute_sum", &compute_sum_listing()).unwrap();
        let exits: Vec<u64> = graph.blocks().filter(|b| b.exit).map(|b| b.start()).collect();
        // jg leaves the listing; leave/ret returns
        assert_eq!(exits, vec![0x401011, 0x401023]);
    }

    #[test]
    fn test_breadth_first_appends_unreachable() {
        let graph = ControlFlowGraph::from_listing("compute_sum", &compute_sum_listing()).unwrap();
        let order: Vec<u64> = graph.breadth_first().into_iter().map(|b| b.0).collect();
        assert_eq!(order, vec![0x401000, 0x401011, 0x401017, 0x401023]);

        let layers: Vec<usize> = graph.blocks().map(|b| b.layer).collect();
        assert_eq!(layers, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_conditional_branch_inside_listing() {
        let listing = vec![
            AsmLine::new("10", "", "test   eax,eax"),
            AsmLine::new("12", "", "je     0x18"),
            AsmLine::new("14", "", "inc    eax"),
            AsmLine::new("18", "", "ret"),
        ];
        let graph = ControlFlowGraph::from_listing("branch", &listing).unwrap();
        assert_eq!(graph.block_count(), 3);

        let kinds: Vec<EdgeKind> = graph.edges_from(BlockId(0x10)).map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EdgeKind::Fallthrough, EdgeKind::Taken]);
        assert_eq!(graph.block(BlockId(0x18)).unwrap().layer, 1);
        assert!(graph.block(BlockId(0x18)).unwrap().exit);
        assert!(!graph.block(BlockId(0x10)).unwrap().exit);
    }

    #[test]
    fn test_malformed_listings() {
        assert!(matches!(
            ControlFlowGraph::from_listing("empty", &[]),
            Err(CfgError::EmptyListing)
        ));

        let bad = vec![AsmLine::new("00401000", "", "nop"), AsmLine::new("?", "", "nop")];
        assert!(matches!(
            ControlFlowGraph::from_listing("bad", &bad),
            Err(CfgError::BadAddress { line: 1, .. })
        ));

        let unordered = vec![AsmLine::new("20", "", "nop"), AsmLine::new("10", "", "ret")];
        assert!(matches!(
            ControlFlowGraph::from_listing("unordered", &unordered),
            Err(CfgError::UnorderedAddress { line: 1, address: 0x10 })
        ));
    }

    #[test]
    fn test_graph_survives_ron() {
        let graph = ControlFlowGraph::from_listing("compute_sum", &compute_sum_listing()).unwrap();
        let text = ron::to_string(&graph).unwrap();
        let back: ControlFlowGraph = ron::from_str(&text).unwrap();
        assert_eq!(back.block_count(), graph.block_count());
        assert_eq!(back.edge_count(), graph.edge_count());
        assert_eq!(back.breadth_first(), graph.breadth_first());
    }
}
