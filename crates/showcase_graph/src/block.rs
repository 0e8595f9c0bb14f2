// SPDX-License-Identifier: MIT OR Apache-2.0
//! Basic block definitions for the control-flow graph.

use crate::instruction::Instruction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a basic block: its start address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u64);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loc_{:x}", self.0)
    }
}

/// A straight-line run of instructions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicBlock {
    /// Block ID (start address)
    pub id: BlockId,
    /// Instructions in listing order
    pub instructions: Vec<Instruction>,
    /// Control can leave the function from this block
    pub exit: bool,
    /// Depth from the entry block, used for layout
    pub layer: usize,
}

impl BasicBlock {
    /// Create a block from its instructions
    pub fn new(instructions: Vec<Instruction>) -> Self {
        let id = BlockId(instructions.first().map_or(0, |i| i.address));
        Self {
            id,
            instructions,
            exit: false,
            layer: 0,
        }
    }

    /// Address of the first instruction
    pub fn start(&self) -> u64 {
        self.id.0
    }

    /// Address of the last instruction
    pub fn end(&self) -> u64 {
        self.instructions.last().map_or(self.id.0, |i| i.address)
    }

    /// The block's terminating instruction
    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last()
    }

    /// Number of instruction rows
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the block has no rows
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}
