// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reveal plan for playing a graph back node by node.

use crate::block::BlockId;
use crate::edge::EdgeId;
use crate::graph::ControlFlowGraph;
use serde::{Deserialize, Serialize};
use showcase_playback::{Millis, RevealItem};
use std::collections::HashSet;

/// Default spacing between revealed graph elements
pub const DEFAULT_NODE_SPACING_MS: Millis = 300;

/// One step of a graph reveal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CfgElement {
    /// A basic block appears
    Block(BlockId),
    /// An edge appears
    Edge(EdgeId),
}

impl ControlFlowGraph {
    /// Build the reveal items for this graph.
    ///
    /// Blocks come in breadth-first order. Each block is followed by every
    /// edge whose endpoints are now both revealed. Items are `spacing` apart.
    pub fn reveal_plan(&self, spacing: Millis) -> Vec<RevealItem<CfgElement>> {
        let mut revealed = HashSet::new();
        let mut shown_edges = HashSet::new();
        let mut steps = Vec::with_capacity(self.block_count() + self.edge_count());

        for block in self.breadth_first() {
            revealed.insert(block);
            steps.push(CfgElement::Block(block));

            for edge in self.edges() {
                if !shown_edges.contains(&edge.id)
                    && revealed.contains(&edge.from)
                    && revealed.contains(&edge.to)
                {
                    shown_edges.insert(edge.id);
                    steps.push(CfgElement::Edge(edge.id));
                }
            }
        }

        RevealItem::staggered(steps, spacing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::compute_sum_listing;
    use showcase_playback::{total_delay, RevealSequencer, VirtualClock};

    fn graph() -> ControlFlowGraph {
        ControlFlowGraph::from_listing("compute_sum", &compute_sum_listing()).unwrap()
    }

    #[test]
    fn test_plan_covers_every_element_once() {
        let graph = graph();
        let plan = graph.reveal_plan(100);
        assert_eq!(plan.len(), graph.block_count() + graph.edge_count());

        let unique: HashSet<CfgElement> = plan.iter().map(|i| i.payload).collect();
        assert_eq!(unique.len(), plan.len());
    }

    #[test]
    fn test_edges_follow_both_endpoints() {
        let graph = graph();
        let plan = graph.reveal_plan(100);
        let position = |element: CfgElement| plan.iter().position(|i| i.payload == element);

        for edge in graph.edges() {
            let at = position(CfgElement::Edge(edge.id)).unwrap();
            assert!(position(CfgElement::Block(edge.from)).unwrap() < at);
            assert!(position(CfgElement::Block(edge.to)).unwrap() < at);
        }
    }

    #[test]
    fn test_plan_order_and_spacing() {
        let graph = graph();
        let plan = graph.reveal_plan(250);

        let kinds: Vec<&str> = plan
            .iter()
            .map(|i| match i.payload {
                CfgElement::Block(_) => "block",
                CfgElement::Edge(_) => "edge",
            })
            .collect();
        // The back edge appears with the loop body, both of its ends shown
        assert_eq!(kinds, vec!["block", "block", "edge", "block", "edge", "edge", "block"]);

        let delays: Vec<Millis> = plan.iter().map(|i| i.delay_ms).collect();
        assert_eq!(delays, vec![0, 250, 500, 750, 1000, 1250, 1500]);
        assert_eq!(total_delay(&plan), 1500);
    }

    #[test]
    fn test_plan_plays_on_sequencer() {
        let clock = VirtualClock::shared();
        let sequencer = RevealSequencer::new(clock.clone());
        let plan = graph().reveal_plan(DEFAULT_NODE_SPACING_MS);
        let total = plan.len();

        assert!(sequencer.start(plan));
        clock.advance(DEFAULT_NODE_SPACING_MS);
        assert_eq!(sequencer.visible_count(), 2);
        clock.advance(DEFAULT_NODE_SPACING_MS * total as Millis);
        assert!(sequencer.is_complete());
        assert_eq!(clock.pending(), 0);
    }
}
