// SPDX-License-Identifier: MIT OR Apache-2.0
//! Control-flow graphs for the showcase demo.
//!
//! This crate recovers a function's control-flow graph from the demo's
//! disassembly listing and turns it into reveal items:
//! - Instruction rows classified by how control leaves them
//! - Basic blocks split at leaders
//! - Fallthrough, taken and jump edges, with loops marked as back edges
//! - A breadth-first reveal plan for the playback sequencer

pub mod block;
pub mod edge;
pub mod graph;
pub mod instruction;
pub mod reveal;

pub use block::{BasicBlock, BlockId};
pub use edge::{Edge, EdgeId, EdgeKind};
pub use graph::{CfgError, ControlFlowGraph};
pub use instruction::{Flow, Instruction};
pub use reveal::{CfgElement, DEFAULT_NODE_SPACING_MS};
