//! Thalamus Graph - the node runtime
//!
//! Nodes are runtime objects bound 1:1 to entries of the configuration
//! document's `nodes` sequence. The runtime watches that sequence and drives
//! each node through its lifecycle:
//!
//! ```text
//! config entry appears ──→ Constructing ──→ Stopped ⇄ Running
//!        │                      │
//!        │                      └──→ Error (retried on next config edit)
//!        └─ entry deleted ──→ Destroying ──→ gone, subscriber streams end
//! ```
//!
//! Only Running nodes produce frames. `Source` references resolve upstream
//! nodes by current name; a missing or incompatible upstream stalls the
//! downstream node silently until it resolves.

mod error;
mod node;
pub mod nodes;
mod registry;
mod runtime;

pub use error::GraphError;
pub use node::{Node, NodeContext, NodeHost, NodeOutputs};
pub use registry::{Constructor, NodeTypeEntry, Registry};
pub use runtime::{NodeRuntime, NodeSlot, NodeState};

/// Result type for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;

/// How often stalled upstream references re-resolve
pub const RESOLVE_INTERVAL_MS: u64 = 250;
