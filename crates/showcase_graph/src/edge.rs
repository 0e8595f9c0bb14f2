// SPDX-License-Identifier: MIT OR Apache-2.0
//! Edge definitions for the control-flow graph.

use crate::block::BlockId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub Uuid);

impl EdgeId {
    /// Create a new random edge ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Why control moves along an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Falls into the next block
    Fallthrough,
    /// Conditional branch taken
    Taken,
    /// Unconditional jump
    Jump,
}

impl EdgeKind {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fallthrough => "fallthrough",
            Self::Taken => "taken",
            Self::Jump => "jump",
        }
    }
}

/// A control-flow edge between two blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Unique edge ID
    pub id: EdgeId,
    /// Source block
    pub from: BlockId,
    /// Target block
    pub to: BlockId,
    /// Edge kind
    pub kind: EdgeKind,
}

impl Edge {
    /// Create a new edge
    pub fn new(from: BlockId, to: BlockId, kind: EdgeKind) -> Self {
        Self {
            id: EdgeId::new(),
            from,
            to,
            kind,
        }
    }

    /// Whether the edge points backwards in the listing (a loop)
    pub fn is_back_edge(&self) -> bool {
        self.to <= self.from
    }
}
